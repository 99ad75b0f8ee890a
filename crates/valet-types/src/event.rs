//! Event types for the valet event bus.
//!
//! `AgentEvent` is the unified event type broadcast while a turn runs. All
//! variants are Clone + Send + Sync for use with tokio broadcast channels.
//! Per-turn fragment ordering is preserved for every subscriber.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::CompletedMessage;

/// Events emitted during turn execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A fragment of streamed assistant output.
    StreamFragment {
        conversation_id: Uuid,
        channel: String,
        text: String,
    },

    /// The turn's stream has ended. Exactly one per turn, on every path.
    StreamEnd {
        conversation_id: Uuid,
        channel: String,
    },

    /// The finished assistant reply for a turn.
    MessageComplete { message: CompletedMessage },

    /// A sensitive tool invocation awaits human approval.
    ApprovalRequest {
        invocation_id: Uuid,
        conversation_id: Uuid,
        channel: String,
        description: String,
    },

    /// A tool invocation has been dispatched.
    ToolStarted {
        invocation_id: Uuid,
        conversation_id: Uuid,
        name: String,
    },

    /// A tool invocation has produced its result.
    ToolCompleted {
        invocation_id: Uuid,
        conversation_id: Uuid,
        name: String,
    },
}

impl AgentEvent {
    /// The conversation this event belongs to.
    pub fn conversation_id(&self) -> Uuid {
        match self {
            AgentEvent::StreamFragment {
                conversation_id, ..
            }
            | AgentEvent::StreamEnd {
                conversation_id, ..
            }
            | AgentEvent::ApprovalRequest {
                conversation_id, ..
            }
            | AgentEvent::ToolStarted {
                conversation_id, ..
            }
            | AgentEvent::ToolCompleted {
                conversation_id, ..
            } => *conversation_id,
            AgentEvent::MessageComplete { message } => message.conversation_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serde_tagging() {
        let event = AgentEvent::StreamEnd {
            conversation_id: Uuid::now_v7(),
            channel: "webchat".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"stream_end\""));
    }

    #[test]
    fn test_conversation_id_accessor() {
        let id = Uuid::now_v7();
        let event = AgentEvent::ToolStarted {
            invocation_id: Uuid::now_v7(),
            conversation_id: id,
            name: "web_search".to_string(),
        };
        assert_eq!(event.conversation_id(), id);
    }
}
