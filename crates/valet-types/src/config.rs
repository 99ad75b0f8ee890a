//! Application configuration.
//!
//! `AppConfig` is deserialized from TOML by valet-infra. Profiles are a named
//! map; timing knobs for the command tool and the confirmation gate are
//! explicit here rather than constants so deployments can tune them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::profile::ProfileConfig;

/// Default wall-clock ceiling for command execution.
pub const DEFAULT_EXECUTION_TIMEOUT_MS: u64 = 30_000;

/// Default safety margin added to the execution timeout to produce the
/// approval deadline, so an approval granted just before the deadline still
/// leaves the tool its full execution budget.
pub const DEFAULT_APPROVAL_MARGIN_MS: u64 = 10_000;

/// Substrings that cause immediate command denial with no approval round-trip.
pub const DEFAULT_COMMAND_DENY_LIST: &[&str] = &[
    "rm -rf /",
    "rm -rf ~",
    "mkfs",
    ":(){",
    "dd if=",
    "> /dev/sd",
    "chmod -R 777 /",
    "format c:",
    "del /f /s /q",
];

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Named profiles; the profile on each inbound message selects one.
    pub profiles: HashMap<String, ProfileConfig>,
    /// Root directory for durable state (database, persona, skills).
    pub data_dir: PathBuf,
    /// Command-execution wall-clock ceiling in milliseconds.
    #[serde(default = "default_execution_timeout_ms")]
    pub max_execution_timeout_ms: u64,
    /// Margin added to the execution timeout for the approval deadline.
    #[serde(default = "default_approval_margin_ms")]
    pub approval_margin_ms: u64,
    /// Override for the command deny-list; the default list applies when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_deny_list: Option<Vec<String>>,
    /// API key enabling the web-search tool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_api_key: Option<String>,
}

fn default_execution_timeout_ms() -> u64 {
    DEFAULT_EXECUTION_TIMEOUT_MS
}

fn default_approval_margin_ms() -> u64 {
    DEFAULT_APPROVAL_MARGIN_MS
}

impl AppConfig {
    /// The active command deny-list (configured override or the default).
    pub fn command_deny_list(&self) -> Vec<String> {
        match &self.command_deny_list {
            Some(list) => list.clone(),
            None => DEFAULT_COMMAND_DENY_LIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Sandbox directory for durable skill scripts.
    pub fn skills_dir(&self) -> PathBuf {
        self.data_dir.join("skills")
    }

    /// Path of the persona document.
    pub fn persona_path(&self) -> PathBuf {
        self.data_dir.join("PERSONA.md")
    }
}
