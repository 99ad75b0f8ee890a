//! Usage accounting types.

use serde::{Deserialize, Serialize};

/// One append-only token delta for a (profile, date) pair. Daily totals are a
/// fold over these records, never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub profile: String,
    /// Calendar date in `YYYY-MM-DD` (UTC).
    pub date: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl UsageRecord {
    pub fn total_tokens(&self) -> u64 {
        u64::from(self.prompt_tokens) + u64::from(self.completion_tokens)
    }
}

/// Result of checking a profile's daily cap.
#[derive(Debug, Clone, Copy)]
pub struct LimitCheck {
    pub allowed: bool,
    pub used: u64,
    pub remaining: u64,
}
