//! Human-approval handshake for sensitive tool invocations.
//!
//! `ConfirmationGate` holds one pending entry per invocation id: a `oneshot`
//! resolution sender installed before the approval-request event is published.
//! Resolution happens exactly once via whichever of {external response,
//! deadline} fires first; the entry is removed atomically on resolution, so a
//! late response after timeout is a no-op and a timeout after resolution never
//! fires. Timeout denies (fail closed).
//!
//! The gate deadline is the tool execution timeout plus a safety margin, so an
//! approval granted just before the deadline still leaves the tool its full
//! execution budget.

use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use valet_types::config::AppConfig;
use valet_types::event::AgentEvent;

use crate::event::EventBus;

/// Outcome of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approved,
    Denied,
    TimedOut,
}

impl ApprovalDecision {
    /// Whether the invocation may proceed to execution.
    pub fn is_approved(&self) -> bool {
        matches!(self, ApprovalDecision::Approved)
    }
}

/// Errors from gate operations.
#[derive(Debug, Error)]
pub enum GateError {
    /// An approval request is already pending for this invocation id.
    #[error("approval already pending for invocation {0}")]
    DuplicateInvocation(Uuid),
}

/// Per-invocation approval handshake with a dual timeout race.
pub struct ConfirmationGate {
    /// Pending resolutions, keyed by invocation id. Exactly one per id.
    pending: DashMap<Uuid, oneshot::Sender<bool>>,
    events: EventBus,
    /// Deadline for external resolution (execution timeout + margin).
    timeout: Duration,
}

impl ConfirmationGate {
    pub fn new(events: EventBus, timeout: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            events,
            timeout,
        }
    }

    /// Gate with the deadline derived from configuration: the tool execution
    /// timeout plus the approval safety margin, so an approval granted just
    /// before the deadline still leaves the tool its full execution budget.
    pub fn with_margin(events: EventBus, config: &AppConfig) -> Self {
        Self::new(
            events,
            Duration::from_millis(config.max_execution_timeout_ms + config.approval_margin_ms),
        )
    }

    /// The configured approval deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of approvals currently awaiting resolution.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Request approval for an invocation and wait for the resolution.
    ///
    /// Publishes an `ApprovalRequest` event so an external surface (UI
    /// control, chat inline action) can respond via [`resolve`], then waits
    /// for whichever of {response, deadline} fires first. The deadline
    /// resolves to `TimedOut` (treated as denial by callers).
    ///
    /// [`resolve`]: ConfirmationGate::resolve
    pub async fn request_approval(
        &self,
        invocation_id: Uuid,
        conversation_id: Uuid,
        channel: &str,
        description: &str,
    ) -> Result<ApprovalDecision, GateError> {
        let (tx, mut rx) = oneshot::channel();

        // Install the pending entry before publishing so a response racing the
        // publish cannot miss it. The entry API keeps the duplicate check and
        // the insert atomic.
        match self.pending.entry(invocation_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(GateError::DuplicateInvocation(invocation_id));
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(tx);
            }
        }

        self.events.publish(AgentEvent::ApprovalRequest {
            invocation_id,
            conversation_id,
            channel: channel.to_string(),
            description: description.to_string(),
        });

        match tokio::time::timeout(self.timeout, &mut rx).await {
            Ok(Ok(approved)) => {
                debug!(%invocation_id, approved, "approval resolved externally");
                Ok(if approved {
                    ApprovalDecision::Approved
                } else {
                    ApprovalDecision::Denied
                })
            }
            Ok(Err(_)) => {
                // Sender dropped without a response (gate shutdown): fail closed.
                self.pending.remove(&invocation_id);
                Ok(ApprovalDecision::Denied)
            }
            Err(_) => {
                // Deadline elapsed. Removing the entry here is the atomic
                // claim: if remove finds nothing, a resolver won the race and
                // its answer is already buffered in the oneshot.
                if self.pending.remove(&invocation_id).is_some() {
                    warn!(%invocation_id, timeout = ?self.timeout, "approval timed out, denying");
                    Ok(ApprovalDecision::TimedOut)
                } else {
                    match rx.try_recv() {
                        Ok(approved) => Ok(if approved {
                            ApprovalDecision::Approved
                        } else {
                            ApprovalDecision::Denied
                        }),
                        Err(_) => Ok(ApprovalDecision::Denied),
                    }
                }
            }
        }
    }

    /// Resolve a pending approval from an external response.
    ///
    /// Returns `true` if a pending entry existed and was resolved; `false`
    /// when the invocation is unknown or already resolved (e.g. the caller
    /// timed out first).
    pub fn resolve(&self, invocation_id: Uuid, approved: bool) -> bool {
        if let Some((_, tx)) = self.pending.remove(&invocation_id) {
            match tx.send(approved) {
                Ok(()) => true,
                Err(_) => {
                    debug!(%invocation_id, "approval receiver already gone");
                    false
                }
            }
        } else {
            debug!(%invocation_id, "no pending approval (caller may have timed out)");
            false
        }
    }
}

impl std::fmt::Debug for ConfirmationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationGate")
            .field("pending", &self.pending.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn make_gate(timeout: Duration) -> (Arc<ConfirmationGate>, EventBus) {
        let events = EventBus::new(16);
        let gate = Arc::new(ConfirmationGate::new(events.clone(), timeout));
        (gate, events)
    }

    #[tokio::test]
    async fn approve_resolves_request() {
        let (gate, events) = make_gate(Duration::from_secs(5));
        let mut rx = events.subscribe();
        let invocation_id = Uuid::now_v7();
        let conversation_id = Uuid::now_v7();

        let gate2 = Arc::clone(&gate);
        let waiter = tokio::spawn(async move {
            gate2
                .request_approval(invocation_id, conversation_id, "webchat", "ls -la")
                .await
                .unwrap()
        });

        // The approval-request event carries the invocation id and description.
        match rx.recv().await.unwrap() {
            AgentEvent::ApprovalRequest {
                invocation_id: id,
                description,
                ..
            } => {
                assert_eq!(id, invocation_id);
                assert_eq!(description, "ls -la");
            }
            other => panic!("unexpected event: {other:?}"),
        }

        assert!(gate.resolve(invocation_id, true));
        assert_eq!(waiter.await.unwrap(), ApprovalDecision::Approved);
        assert_eq!(gate.pending_count(), 0);
    }

    #[tokio::test]
    async fn deny_resolves_request() {
        let (gate, events) = make_gate(Duration::from_secs(5));
        let mut rx = events.subscribe();
        let invocation_id = Uuid::now_v7();

        let gate2 = Arc::clone(&gate);
        let waiter = tokio::spawn(async move {
            gate2
                .request_approval(invocation_id, Uuid::now_v7(), "webchat", "rm file")
                .await
                .unwrap()
        });

        let _ = rx.recv().await.unwrap();
        assert!(gate.resolve(invocation_id, false));
        assert_eq!(waiter.await.unwrap(), ApprovalDecision::Denied);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_denies_and_removes_pending() {
        let (gate, _events) = make_gate(Duration::from_secs(40));
        let invocation_id = Uuid::now_v7();

        let decision = gate
            .request_approval(invocation_id, Uuid::now_v7(), "webchat", "sleep 100")
            .await
            .unwrap();

        assert_eq!(decision, ApprovalDecision::TimedOut);
        assert_eq!(gate.pending_count(), 0);
        // A late response after timeout is a no-op.
        assert!(!gate.resolve(invocation_id, true));
    }

    #[tokio::test]
    async fn duplicate_invocation_rejected() {
        let (gate, _events) = make_gate(Duration::from_secs(5));
        let invocation_id = Uuid::now_v7();

        let gate2 = Arc::clone(&gate);
        let waiter = tokio::spawn(async move {
            gate2
                .request_approval(invocation_id, Uuid::now_v7(), "webchat", "first")
                .await
        });

        // Wait for the first request to install its pending entry.
        while gate.pending_count() == 0 {
            tokio::task::yield_now().await;
        }

        let err = gate
            .request_approval(invocation_id, Uuid::now_v7(), "webchat", "second")
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::DuplicateInvocation(id) if id == invocation_id));

        gate.resolve(invocation_id, false);
        waiter.await.unwrap().unwrap();
    }

    #[test]
    fn margin_deadline_exceeds_execution_timeout() {
        let config = AppConfig {
            profiles: std::collections::HashMap::new(),
            data_dir: std::path::PathBuf::from("/tmp/valet-test"),
            max_execution_timeout_ms: 30_000,
            approval_margin_ms: 10_000,
            command_deny_list: None,
            search_api_key: None,
        };
        let gate = ConfirmationGate::with_margin(EventBus::new(16), &config);
        assert_eq!(gate.timeout(), Duration::from_millis(40_000));
    }

    #[tokio::test]
    async fn resolve_unknown_invocation_is_noop() {
        let (gate, _events) = make_gate(Duration::from_secs(5));
        assert!(!gate.resolve(Uuid::now_v7(), true));
    }

    #[tokio::test(start_paused = true)]
    async fn race_resolves_exactly_once() {
        // Schedule resolution right at the deadline; exactly one of the two
        // outcomes must win and the pending entry must be removed exactly once.
        let (gate, _events) = make_gate(Duration::from_millis(100));
        let invocation_id = Uuid::now_v7();

        let gate2 = Arc::clone(&gate);
        let resolver = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            gate2.resolve(invocation_id, true)
        });

        let decision = gate
            .request_approval(invocation_id, Uuid::now_v7(), "webchat", "racy")
            .await
            .unwrap();
        let resolver_won = resolver.await.unwrap();

        match decision {
            ApprovalDecision::Approved => assert!(resolver_won),
            ApprovalDecision::TimedOut => assert!(!resolver_won),
            ApprovalDecision::Denied => panic!("no denial was issued"),
        }
        assert_eq!(gate.pending_count(), 0);
    }
}
