//! Event bus for broadcast of [`AgentEvent`]s.
//!
//! [`AgentEvent`]: valet_types::event::AgentEvent

mod bus;

pub use bus::EventBus;
