//! valet-core: the message-driven orchestration engine.
//!
//! One inbound utterance enters through the [`bus::MessageBus`], is routed to
//! a per-conversation worker by the [`agent::Orchestrator`], and leaves as a
//! finished assistant reply: rate check, context assembly, a streamed model
//! call with a bounded tool loop (risky tools gated through
//! [`confirm::ConfirmationGate`]), persistence, and fire-and-forget title
//! synthesis and fact extraction. The [`scheduler::Scheduler`] synthesizes
//! turns into the same pipeline from durable cron jobs.

pub mod agent;
pub mod bus;
pub mod confirm;
pub mod event;
pub mod llm;
pub mod repository;
pub mod scheduler;
pub mod tool;
pub mod usage;
