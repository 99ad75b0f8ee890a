//! Model backend request/response types.
//!
//! These types model the event-stream contract with a model backend:
//! chat messages in, an ordered stream of {text, tool-call, tool-result,
//! done} events out, terminated exactly once by `Done`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::tool::ToolDescriptor;

/// Role of a message in a model conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::System => write!(f, "system"),
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for ChatRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(ChatRole::System),
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            other => Err(format!("invalid chat role: '{other}'")),
        }
    }
}

/// A single message in a model conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Options for opening a model stream.
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// Descriptors for the tools the model may invoke. `None` when no tools
    /// are registered.
    pub tools: Option<Vec<ToolDescriptor>>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    /// Maximum tool-invocation rounds before a final answer is forced.
    pub max_steps: u32,
    pub max_tokens: Option<u32>,
}

/// Default tool-invocation round budget per turn.
pub const DEFAULT_MAX_STEPS: u32 = 5;

impl StreamOptions {
    /// Plain text-only options (no tools, default step budget).
    pub fn text_only() -> Self {
        Self {
            max_steps: 1,
            ..Self::default()
        }
    }
}

/// Token usage reported by a completed stream.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Events emitted by a model stream, in generation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A fragment of assistant text.
    Text { text: String },

    /// The model requests a tool invocation. The consumer executes the tool
    /// and feeds the result back through the stream's continuation channel.
    ToolCall {
        invocation_id: Uuid,
        name: String,
        arguments: serde_json::Value,
    },

    /// Echo of a tool result that has been folded back into generation.
    ToolResult { invocation_id: Uuid, output: String },

    /// The stream has completed. Emitted exactly once, last.
    Done { usage: Usage },
}

/// A tool result fed back into an open stream so generation resumes with it
/// in context.
#[derive(Debug, Clone)]
pub struct ToolReturn {
    pub invocation_id: Uuid,
    pub output: String,
}

/// Errors from model backend operations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend error: {0}")]
    Provider(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
