//! Usage ledger: per-profile/day token accounting and cap checks.
//!
//! Daily totals are a fold over append-only deltas; nothing is mutated in
//! place. The ledger is safe under concurrent access because all writes are
//! appends and reads aggregate.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use valet_types::error::RepositoryError;
use valet_types::usage::{LimitCheck, UsageRecord};

use crate::repository::UsageRepository;

/// Per-profile/day token accounting over a [`UsageRepository`].
#[derive(Clone)]
pub struct UsageLedger {
    repo: Arc<dyn UsageRepository>,
}

impl UsageLedger {
    pub fn new(repo: Arc<dyn UsageRepository>) -> Self {
        Self { repo }
    }

    /// Today's date key in UTC, `YYYY-MM-DD`.
    fn today() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    /// Check a profile's usage against its daily cap.
    pub async fn check_limit(
        &self,
        profile: &str,
        max_tokens_per_day: u64,
    ) -> Result<LimitCheck, RepositoryError> {
        let used = self.repo.total_for_day(profile, &Self::today()).await?;
        Ok(LimitCheck {
            allowed: used < max_tokens_per_day,
            used,
            remaining: max_tokens_per_day.saturating_sub(used),
        })
    }

    /// Append one usage delta for today.
    pub async fn record(
        &self,
        profile: &str,
        prompt_tokens: u32,
        completion_tokens: u32,
    ) -> Result<(), RepositoryError> {
        debug!(profile, prompt_tokens, completion_tokens, "recording usage");
        self.repo
            .append(UsageRecord {
                profile: profile.to_string(),
                date: Self::today(),
                prompt_tokens,
                completion_tokens,
            })
            .await
    }
}
