//! The agent orchestrator: one inbound utterance in, one finished reply out.
//!
//! A dispatcher task owns the bus's inbound receiver and routes each message
//! to a per-conversation worker, spawned on first use. Workers process their
//! queue strictly in order, so no two model streams are ever in flight for
//! the same conversation while different conversations proceed independently.
//!
//! Each turn runs the same pipeline: profile resolution, daily-cap check,
//! inbound persistence, context assembly, stream consumption with the tool
//! loop, then finalization. Every path, including backend failure, ends
//! with exactly one `StreamEnd` followed by a `MessageComplete`, so no
//! subscriber is ever left waiting on a stream that will not close.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use valet_types::config::AppConfig;
use valet_types::conversation::{NewTurn, TurnRole};
use valet_types::error::RepositoryError;
use valet_types::event::AgentEvent;
use valet_types::llm::{
    BackendError, StreamEvent, StreamOptions, ToolReturn, Usage, DEFAULT_MAX_STEPS,
};
use valet_types::message::{CompletedMessage, InboundMessage};
use valet_types::profile::ProfileConfig;
use valet_types::tool::{InvocationState, ToolInvocation};

use crate::agent::context::ContextAssembler;
use crate::agent::extractor::FactExtractor;
use crate::agent::title;
use crate::event::EventBus;
use crate::llm::ModelBackend;
use crate::repository::{FactRepository, PersonaStore, TurnRepository, UsageRepository};
use crate::tool::{ToolContext, ToolRegistry};
use crate::usage::UsageLedger;

/// Buffer size for per-conversation worker queues.
const WORKER_BUFFER: usize = 32;

/// A conversation's first exchange is user + assistant.
const FIRST_EXCHANGE_TURNS: u64 = 2;

/// Errors inside a turn's model phase. Degraded to an assistant-authored
/// error message; never propagated past the turn.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

/// Storage collaborators the orchestrator reads and writes.
pub struct Stores {
    pub turns: Arc<dyn TurnRepository>,
    pub facts: Arc<dyn FactRepository>,
    pub persona: Arc<dyn PersonaStore>,
    pub usage: Arc<dyn UsageRepository>,
}

/// Central state machine driving turns end-to-end.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    config: AppConfig,
    backend: Arc<dyn ModelBackend>,
    registry: Arc<ToolRegistry>,
    events: EventBus,
    ledger: UsageLedger,
    turns: Arc<dyn TurnRepository>,
    assembler: ContextAssembler,
    extractor: Option<FactExtractor>,
    workers: DashMap<Uuid, mpsc::Sender<InboundMessage>>,
    shutdown: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        config: AppConfig,
        backend: Arc<dyn ModelBackend>,
        registry: Arc<ToolRegistry>,
        events: EventBus,
        stores: Stores,
    ) -> Self {
        let assembler = ContextAssembler::new(
            Arc::clone(&stores.persona),
            Arc::clone(&stores.facts),
            Arc::clone(&stores.turns),
        );

        // Extraction runs on the first profile by name, matching how a
        // deployment designates its cheapest profile.
        let extractor = config
            .profiles
            .iter()
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(_, profile)| {
                FactExtractor::new(
                    Arc::clone(&backend),
                    Arc::clone(&stores.facts),
                    profile.clone(),
                )
            });

        Self {
            inner: Arc::new(Inner {
                config,
                backend,
                registry,
                events,
                ledger: UsageLedger::new(stores.usage),
                turns: stores.turns,
                assembler,
                extractor,
                workers: DashMap::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Start the dispatcher over the bus's inbound receiver.
    pub fn start(&self, mut inbound: mpsc::Receiver<InboundMessage>) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            info!("orchestrator started");
            loop {
                tokio::select! {
                    _ = inner.shutdown.cancelled() => break,
                    next = inbound.recv() => match next {
                        Some(msg) => inner.route(msg).await,
                        None => break,
                    },
                }
            }
            info!("orchestrator stopped");
        })
    }

    /// Stop the dispatcher and all per-conversation workers.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }
}

impl Inner {
    /// Route a message to its conversation's worker, spawning one on first use.
    ///
    /// A full worker queue applies backpressure through the inbound lane; the
    /// queue only fills when one conversation has `WORKER_BUFFER` turns
    /// already waiting.
    async fn route(self: &Arc<Self>, msg: InboundMessage) {
        let conversation_id = msg.conversation_id;

        let msg = if let Some(tx) = self
            .workers
            .get(&conversation_id)
            .map(|entry| entry.value().clone())
        {
            match tx.send(msg).await {
                Ok(()) => return,
                Err(mpsc::error::SendError(returned)) => {
                    // Worker is gone; respawn below with the message in hand.
                    self.workers.remove(&conversation_id);
                    returned
                }
            }
        } else {
            msg
        };

        let (tx, rx) = mpsc::channel(WORKER_BUFFER);
        self.workers.insert(conversation_id, tx.clone());
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            inner.worker_loop(conversation_id, rx).await;
        });

        if tx.send(msg).await.is_err() {
            warn!(%conversation_id, "fresh worker rejected message");
        }
    }

    /// Sequential processing loop for one conversation.
    async fn worker_loop(
        self: Arc<Self>,
        conversation_id: Uuid,
        mut rx: mpsc::Receiver<InboundMessage>,
    ) {
        debug!(%conversation_id, "conversation worker started");
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                next = rx.recv() => match next {
                    Some(msg) => self.handle_message(msg).await,
                    None => break,
                },
            }
        }
        self.workers.remove(&conversation_id);
        debug!(%conversation_id, "conversation worker stopped");
    }

    /// Drive one turn end-to-end. Infallible: every failure degrades to an
    /// assistant-authored error message and the turn still terminates.
    #[tracing::instrument(
        name = "turn",
        skip(self, msg),
        fields(conversation_id = %msg.conversation_id, channel = %msg.channel, profile = %msg.profile)
    )]
    async fn handle_message(&self, msg: InboundMessage) {
        // Step 1: resolve profile. Unknown profile aborts pre-persistence.
        let Some(profile) = self.config.profiles.get(&msg.profile).cloned() else {
            warn!("unknown profile");
            self.emit_terminal_reply(
                &msg,
                format!("Error: Profile \"{}\" not found.", msg.profile),
            );
            return;
        };

        // Step 2: daily cap. Denial persists nothing and never opens a stream.
        match self
            .ledger
            .check_limit(&msg.profile, profile.max_tokens_per_day)
            .await
        {
            Ok(check) if !check.allowed => {
                info!(used = check.used, limit = profile.max_tokens_per_day, "daily cap reached");
                self.emit_terminal_reply(
                    &msg,
                    format!(
                        "Daily token limit reached for profile \"{}\". Used: {}, Limit: {}.",
                        msg.profile, check.used, profile.max_tokens_per_day
                    ),
                );
                return;
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "usage check failed");
                self.emit_terminal_reply(&msg, format!("Error: {e}"));
                return;
            }
        }

        // Step 3: persist the inbound turn.
        let inbound_turn_id = match self.persist_turn(&msg, TurnRole::User, &msg.content, None).await
        {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "failed to persist inbound turn");
                None
            }
        };

        // Steps 4-7: assemble context and consume the stream. Never fails.
        let (response, usage) = match self.run_model_phase(&msg, &profile, inbound_turn_id).await {
            Ok(ok) => ok,
            Err(e) => {
                error!(error = %e, "model phase failed");
                (format!("Error: {e}"), None)
            }
        };

        // Step 8: exactly one stream-end, before the final composed message.
        self.events.publish(AgentEvent::StreamEnd {
            conversation_id: msg.conversation_id,
            channel: msg.channel.clone(),
        });

        // Step 9: persist the outbound turn with its completion-token count.
        if let Err(e) = self
            .persist_turn(
                &msg,
                TurnRole::Assistant,
                &response,
                usage.map(|u| u.completion_tokens),
            )
            .await
        {
            warn!(error = %e, "failed to persist outbound turn");
        }

        self.events.publish(AgentEvent::MessageComplete {
            message: CompletedMessage {
                id: Uuid::now_v7(),
                conversation_id: msg.conversation_id,
                channel: msg.channel.clone(),
                profile: msg.profile.clone(),
                content: response.clone(),
                timestamp: chrono::Utc::now(),
            },
        });

        // Step 10: title synthesis after the first exchange. Fire-and-forget.
        match self.turns.count_turns(msg.conversation_id).await {
            Ok(count) if count <= FIRST_EXCHANGE_TURNS => {
                self.spawn_title_task(&msg, &profile, response.clone());
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "turn count unavailable, skipping title"),
        }

        // Step 11: fact extraction over the exchange. Fire-and-forget.
        if let Some(extractor) = self.extractor.clone() {
            let user = msg.content.clone();
            let assistant = response;
            tokio::spawn(async move {
                extractor.extract(&user, &assistant).await;
            });
        }
    }

    /// Steps 4-7: context assembly, stream consumption, tool loop, usage.
    async fn run_model_phase(
        &self,
        msg: &InboundMessage,
        profile: &ProfileConfig,
        inbound_turn_id: Option<Uuid>,
    ) -> Result<(String, Option<Usage>), OrchestratorError> {
        let messages = self
            .assembler
            .assemble(msg.conversation_id, &msg.content, profile, inbound_turn_id)
            .await?;

        let options = StreamOptions {
            tools: self.registry.descriptors(),
            temperature: profile.temperature,
            top_p: profile.top_p,
            max_steps: DEFAULT_MAX_STEPS,
            max_tokens: Some(profile.max_tokens_per_message),
        };

        let mut stream = self.backend.open_stream(profile, messages, options).await?;

        let mut buffer = String::new();
        let mut usage = None;

        while let Some(event) = stream.next_event().await {
            match event? {
                StreamEvent::Text { text } => {
                    buffer.push_str(&text);
                    self.events.publish(AgentEvent::StreamFragment {
                        conversation_id: msg.conversation_id,
                        channel: msg.channel.clone(),
                        text,
                    });
                }
                StreamEvent::ToolCall {
                    invocation_id,
                    name,
                    arguments,
                } => {
                    self.events.publish(AgentEvent::ToolStarted {
                        invocation_id,
                        conversation_id: msg.conversation_id,
                        name: name.clone(),
                    });

                    let output = self.dispatch_tool(msg, invocation_id, &name, arguments).await;
                    stream
                        .submit_tool_result(ToolReturn {
                            invocation_id,
                            output,
                        })
                        .await?;

                    self.events.publish(AgentEvent::ToolCompleted {
                        invocation_id,
                        conversation_id: msg.conversation_id,
                        name,
                    });
                }
                StreamEvent::ToolResult { invocation_id, .. } => {
                    // Backend echo of a fed-back result; context only.
                    debug!(%invocation_id, "tool result folded into stream");
                }
                StreamEvent::Done { usage: reported } => {
                    // Recording failure is logged, never fatal to the turn.
                    if let Err(e) = self
                        .ledger
                        .record(&msg.profile, reported.prompt_tokens, reported.completion_tokens)
                        .await
                    {
                        warn!(error = %e, "usage recording failed");
                    }
                    usage = Some(reported);
                    break;
                }
            }
        }

        Ok((buffer, usage))
    }

    /// Execute one tool invocation. The result (success, tool failure, or
    /// unknown tool) is always text fed back to the model, never an error
    /// surfaced to the human.
    async fn dispatch_tool(
        &self,
        msg: &InboundMessage,
        invocation_id: Uuid,
        name: &str,
        arguments: serde_json::Value,
    ) -> String {
        let mut invocation = ToolInvocation::new(invocation_id, name, arguments.clone());

        let Some(tool) = self.registry.get(name) else {
            warn!(tool = name, "model requested unknown tool");
            return format!("Tool error: unknown tool \"{name}\".");
        };

        let ctx = ToolContext {
            invocation_id,
            conversation_id: msg.conversation_id,
            channel: msg.channel.clone(),
            profile: msg.profile.clone(),
        };

        let _ = invocation.transition(InvocationState::Executing);
        let result = tool.execute(arguments, &ctx).await;
        let _ = invocation.transition(InvocationState::Completed);
        debug!(tool = name, %invocation_id, state = %invocation.state, "tool dispatched");

        match result {
            Ok(output) => output,
            Err(e) => format!("Tool error: {e}"),
        }
    }

    async fn persist_turn(
        &self,
        msg: &InboundMessage,
        role: TurnRole,
        content: &str,
        token_count: Option<u32>,
    ) -> Result<Uuid, RepositoryError> {
        self.turns.ensure_conversation(msg.conversation_id).await?;
        let turn = self
            .turns
            .append_turn(NewTurn {
                conversation_id: msg.conversation_id,
                role,
                content: content.to_string(),
                profile: msg.profile.clone(),
                token_count,
            })
            .await?;
        Ok(turn.id)
    }

    /// Abort path for steps 1-2: stream-end plus one descriptive reply,
    /// nothing persisted.
    fn emit_terminal_reply(&self, msg: &InboundMessage, content: String) {
        self.events.publish(AgentEvent::StreamEnd {
            conversation_id: msg.conversation_id,
            channel: msg.channel.clone(),
        });
        self.events.publish(AgentEvent::MessageComplete {
            message: CompletedMessage {
                id: Uuid::now_v7(),
                conversation_id: msg.conversation_id,
                channel: msg.channel.clone(),
                profile: msg.profile.clone(),
                content,
                timestamp: chrono::Utc::now(),
            },
        });
    }

    fn spawn_title_task(&self, msg: &InboundMessage, profile: &ProfileConfig, response: String) {
        let backend = Arc::clone(&self.backend);
        let turns = Arc::clone(&self.turns);
        let profile = profile.clone();
        let conversation_id = msg.conversation_id;
        let user_message = msg.content.clone();

        tokio::spawn(async move {
            match title::synthesize_title(&backend, &profile, &user_message, &response).await {
                Ok(synthesized) if !synthesized.is_empty() => {
                    if let Err(e) = turns.update_title(conversation_id, &synthesized).await {
                        debug!(error = %e, "failed to store synthesized title");
                    }
                }
                Ok(_) => {}
                Err(e) => debug!(error = %e, "title synthesis failed"),
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
