//! Usage repository trait definition.

use futures_util::future::BoxFuture;

use valet_types::error::RepositoryError;
use valet_types::usage::UsageRecord;

/// Storage interface for append-only usage deltas.
pub trait UsageRepository: Send + Sync {
    /// Append one usage delta. Records are never mutated in place.
    fn append(&self, record: UsageRecord) -> BoxFuture<'_, Result<(), RepositoryError>>;

    /// Total tokens recorded for a profile on a `YYYY-MM-DD` date.
    fn total_for_day(
        &self,
        profile: &str,
        date: &str,
    ) -> BoxFuture<'_, Result<u64, RepositoryError>>;
}
