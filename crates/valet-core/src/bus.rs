//! In-process message fabric linking inbound channels to the orchestrator.
//!
//! The `MessageBus` has two lanes: a bounded `mpsc` inbound lane that feeds
//! the orchestrator's dispatcher, and the broadcast [`EventBus`] outbound lane
//! carrying `AgentEvent`s back to subscribed channels. Confirmation responses
//! (`{invocation_id, approved}`) from any channel are routed through the bus
//! to the confirmation gate.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;
use uuid::Uuid;

use valet_types::event::AgentEvent;
use valet_types::message::InboundMessage;

use crate::confirm::ConfirmationGate;
use crate::event::EventBus;

/// Buffer size for the inbound message lane.
const INBOUND_BUFFER: usize = 256;

/// Errors from bus operations.
#[derive(Debug, Error)]
pub enum BusError {
    /// The inbound lane is full; the producer should back off.
    #[error("inbound lane full")]
    InboundFull,

    /// The orchestrator side of the inbound lane has shut down.
    #[error("inbound lane closed")]
    InboundClosed,
}

/// Publish/subscribe fabric between channels, orchestrator, and gate.
#[derive(Clone)]
pub struct MessageBus {
    inbound_tx: mpsc::Sender<InboundMessage>,
    events: EventBus,
    gate: Arc<ConfirmationGate>,
}

impl MessageBus {
    /// Create a bus wired to the given event lane and confirmation gate.
    ///
    /// Returns the bus and the inbound receiver the orchestrator's dispatcher
    /// consumes.
    pub fn new(
        events: EventBus,
        gate: Arc<ConfirmationGate>,
    ) -> (Self, mpsc::Receiver<InboundMessage>) {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);
        (
            Self {
                inbound_tx,
                events,
                gate,
            },
            inbound_rx,
        )
    }

    /// Push an inbound user utterance toward the orchestrator.
    pub fn submit(&self, msg: InboundMessage) -> Result<(), BusError> {
        debug!(id = %msg.id, channel = %msg.channel, "inbound message submitted");
        self.inbound_tx.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => BusError::InboundFull,
            mpsc::error::TrySendError::Closed(_) => BusError::InboundClosed,
        })
    }

    /// Subscribe to the outbound event lane.
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.events.subscribe()
    }

    /// Publish an outbound event to all subscribers.
    pub fn publish(&self, event: AgentEvent) {
        self.events.publish(event);
    }

    /// Route an external confirmation response to the gate.
    ///
    /// Returns `true` if a pending approval was resolved.
    pub fn resolve_approval(&self, invocation_id: Uuid, approved: bool) -> bool {
        self.gate.resolve(invocation_id, approved)
    }

    /// The confirmation gate behind this bus.
    pub fn gate(&self) -> &Arc<ConfirmationGate> {
        &self.gate
    }

    /// The event lane behind this bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("events", &self.events)
            .field("gate", &self.gate)
            .finish()
    }
}
