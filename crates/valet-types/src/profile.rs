//! Profile configuration.
//!
//! A profile binds a model, sampling parameters, and daily/per-message token
//! caps. Profiles are named in `AppConfig` and selected per inbound message.

use serde::{Deserialize, Serialize};

/// Named model/limits binding selected per inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Model identifier handed to the backend.
    pub model: String,
    /// Per-message completion-token ceiling.
    #[serde(default = "default_max_tokens_per_message")]
    pub max_tokens_per_message: u32,
    /// Daily total-token cap for this profile.
    pub max_tokens_per_day: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling probability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Prefix prepended to the persona document in the system prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
    /// History window override; the assembler default applies when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_history_messages: Option<usize>,
}

fn default_max_tokens_per_message() -> u32 {
    4096
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_profile_deserializes_with_defaults() {
        let toml = r#"
            model = "sonnet-4"
            max_tokens_per_day = 100000
        "#;
        let profile: ProfileConfig = toml::from_str(toml).unwrap();
        assert_eq!(profile.max_tokens_per_message, 4096);
        assert!(profile.temperature.is_none());
        assert!(profile.max_history_messages.is_none());
    }
}
