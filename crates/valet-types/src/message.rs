//! Bus message payloads.
//!
//! `InboundMessage` is what channels (web chat, chat-platform bridges, the
//! scheduler's synthetic channel) push onto the bus; `CompletedMessage` is the
//! finished assistant reply broadcast once a turn has finalized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Channel name used for turns synthesized by the scheduler.
pub const SCHEDULER_CHANNEL: &str = "scheduler";

/// One inbound user utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    /// Originating channel name, e.g. "webchat" or "telegram".
    pub channel: String,
    pub profile: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(
        conversation_id: Uuid,
        channel: impl Into<String>,
        profile: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            conversation_id,
            channel: channel.into(),
            profile: profile.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A finished assistant reply, published after the turn's stream has ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub channel: String,
    pub profile: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
