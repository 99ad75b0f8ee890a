//! Command execution tool.
//!
//! The highest-risk built-in: runs a shell command after a deny-list check
//! and a human-approval round-trip through the confirmation gate. Execution
//! is bounded by a wall-clock timeout and the captured output by a byte
//! ceiling. Deny-list hits short-circuit with no approval request at all.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, warn};

use valet_types::config::AppConfig;

use crate::confirm::{ApprovalDecision, ConfirmationGate};

use super::{parse_args, Tool, ToolContext, ToolError};

/// Captured-output ceiling in bytes; anything past it is truncated.
const MAX_OUTPUT_BYTES: usize = 10_000;

#[derive(Debug, Deserialize, JsonSchema)]
struct RunCommandArgs {
    /// The shell command to execute.
    command: String,
}

/// Shell command execution behind the confirmation gate.
pub struct RunCommandTool {
    deny_list: Vec<String>,
    execution_timeout: Duration,
    gate: Arc<ConfirmationGate>,
}

impl RunCommandTool {
    pub fn new(config: &AppConfig, gate: Arc<ConfirmationGate>) -> Self {
        Self {
            deny_list: config.command_deny_list(),
            execution_timeout: Duration::from_millis(config.max_execution_timeout_ms),
            gate,
        }
    }

    /// First blocked pattern the command contains, if any.
    fn denied_pattern(&self, command: &str) -> Option<&str> {
        self.deny_list
            .iter()
            .find(|pattern| command.contains(pattern.as_str()))
            .map(String::as_str)
    }

    async fn run(&self, command: &str) -> String {
        let timeout = self.execution_timeout;
        let child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return format!("Failed to start command: {e}"),
            Err(_) => {
                warn!(command, ?timeout, "command timed out");
                return format!("Command timed out after {}ms.", timeout.as_millis());
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return truncate_output(&format!("Error (exit {code}): {stderr}"));
        }

        let mut result = if stdout.is_empty() {
            "(no output)".to_string()
        } else {
            stdout
        };
        if !stderr.is_empty() {
            result.push_str(&format!("\nStderr: {stderr}"));
        }
        truncate_output(&result)
    }
}

/// Clamp output at [`MAX_OUTPUT_BYTES`] with a truncation marker.
fn truncate_output(s: &str) -> String {
    if s.len() <= MAX_OUTPUT_BYTES {
        return s.to_string();
    }
    let mut end = MAX_OUTPUT_BYTES;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n... (output truncated)", &s[..end])
}

impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Execute a shell command or script. The user will be asked to approve \
         before execution. Use this to run skills you have written, system \
         commands, or other scripts."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(RunCommandArgs)).unwrap_or_default()
    }

    fn execute<'a>(
        &'a self,
        arguments: serde_json::Value,
        ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<String, ToolError>> {
        Box::pin(async move {
            let args: RunCommandArgs = parse_args(arguments)?;

            // Deny-list check first: no approval round-trip on a match.
            if let Some(pattern) = self.denied_pattern(&args.command) {
                debug!(command = %args.command, pattern, "command matched deny-list");
                return Ok(format!(
                    "Command denied: matches blocked pattern \"{pattern}\"."
                ));
            }

            let decision = self
                .gate
                .request_approval(
                    ctx.invocation_id,
                    ctx.conversation_id,
                    &ctx.channel,
                    &args.command,
                )
                .await
                .map_err(|e| ToolError::Failed(e.to_string()))?;

            match decision {
                ApprovalDecision::Approved => Ok(self.run(&args.command).await),
                ApprovalDecision::Denied => Ok("User denied the command execution.".to_string()),
                ApprovalDecision::TimedOut => {
                    Ok("Approval timed out; command was not executed.".to_string())
                }
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
