//! SQLite usage repository implementation.
//!
//! Append-only deltas; the daily total is a SUM fold, never mutated in place.

use futures_util::future::BoxFuture;

use valet_core::repository::UsageRepository;
use valet_types::error::RepositoryError;
use valet_types::usage::UsageRecord;

use super::pool::{map_sqlx, DatabasePool};

/// SQLite-backed implementation of `UsageRepository`.
pub struct SqliteUsageRepository {
    pool: DatabasePool,
}

impl SqliteUsageRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl UsageRepository for SqliteUsageRepository {
    fn append(&self, record: UsageRecord) -> BoxFuture<'_, Result<(), RepositoryError>> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO usage (profile, date, prompt_tokens, completion_tokens, total_tokens)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&record.profile)
            .bind(&record.date)
            .bind(record.prompt_tokens as i64)
            .bind(record.completion_tokens as i64)
            .bind(record.total_tokens() as i64)
            .execute(&self.pool.writer)
            .await
            .map_err(map_sqlx)?;
            Ok(())
        })
    }

    fn total_for_day(
        &self,
        profile: &str,
        date: &str,
    ) -> BoxFuture<'_, Result<u64, RepositoryError>> {
        let profile = profile.to_string();
        let date = date.to_string();
        Box::pin(async move {
            let total: i64 = sqlx::query_scalar(
                "SELECT COALESCE(SUM(total_tokens), 0) FROM usage WHERE profile = ? AND date = ?",
            )
            .bind(profile)
            .bind(date)
            .fetch_one(&self.pool.reader)
            .await
            .map_err(map_sqlx)?;
            Ok(total as u64)
        })
    }
}
