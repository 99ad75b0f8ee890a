//! Tool invocation types.
//!
//! A `ToolInvocation` tracks one model-issued request to execute a named tool
//! through its lifecycle. Transitions are driven jointly by the orchestrator
//! and the confirmation gate; `transition` rejects edges that are not part of
//! the lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Descriptor advertising a registered tool to the model backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's arguments.
    pub parameters: serde_json::Value,
}

/// Lifecycle state of a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationState {
    Requested,
    AwaitingApproval,
    Approved,
    Denied,
    Executing,
    Completed,
    TimedOut,
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InvocationState::Requested => "requested",
            InvocationState::AwaitingApproval => "awaiting_approval",
            InvocationState::Approved => "approved",
            InvocationState::Denied => "denied",
            InvocationState::Executing => "executing",
            InvocationState::Completed => "completed",
            InvocationState::TimedOut => "timed_out",
        };
        write!(f, "{s}")
    }
}

/// One model-issued request to execute a named tool with arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: Uuid,
    pub name: String,
    pub arguments: serde_json::Value,
    pub requested_at: DateTime<Utc>,
    pub state: InvocationState,
}

impl ToolInvocation {
    /// Create a new invocation in the `Requested` state.
    pub fn new(id: Uuid, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id,
            name: name.into(),
            arguments,
            requested_at: Utc::now(),
            state: InvocationState::Requested,
        }
    }

    /// Move to `next`, rejecting transitions that are not part of the
    /// invocation lifecycle.
    pub fn transition(&mut self, next: InvocationState) -> Result<(), InvalidTransition> {
        use InvocationState::*;

        let ok = matches!(
            (self.state, next),
            (Requested, AwaitingApproval)
                | (Requested, Executing)
                | (Requested, Denied)
                | (AwaitingApproval, Approved)
                | (AwaitingApproval, Denied)
                | (AwaitingApproval, TimedOut)
                | (Approved, Executing)
                | (Executing, Completed)
                | (Executing, TimedOut)
        );

        if !ok {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Whether the invocation has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            InvocationState::Denied | InvocationState::Completed | InvocationState::TimedOut
        )
    }
}

/// Error for a rejected invocation state transition.
#[derive(Debug, thiserror::Error)]
#[error("invalid invocation transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: InvocationState,
    pub to: InvocationState,
}
