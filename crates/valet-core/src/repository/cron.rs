//! Cron job repository trait definition.

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use uuid::Uuid;

use valet_types::cron::CronJob;
use valet_types::error::RepositoryError;

/// Storage interface for durable cron jobs.
pub trait CronJobRepository: Send + Sync {
    /// Persist a new job. Returns `Conflict` when the name already exists.
    fn insert(&self, job: &CronJob) -> BoxFuture<'_, Result<(), RepositoryError>>;

    /// Delete a job by name. Returns `true` if it existed.
    fn delete(&self, name: &str) -> BoxFuture<'_, Result<bool, RepositoryError>>;

    /// Fetch a job by name.
    fn get(&self, name: &str) -> BoxFuture<'_, Result<Option<CronJob>, RepositoryError>>;

    /// All jobs, ordered by name.
    fn list(&self) -> BoxFuture<'_, Result<Vec<CronJob>, RepositoryError>>;

    /// Enabled jobs only.
    fn list_enabled(&self) -> BoxFuture<'_, Result<Vec<CronJob>, RepositoryError>>;

    /// Flip the durable enabled flag. Returns `NotFound` for unknown names.
    fn set_enabled(
        &self,
        name: &str,
        enabled: bool,
    ) -> BoxFuture<'_, Result<(), RepositoryError>>;

    /// Stamp the last-run timestamp after a fire.
    fn stamp_last_run(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<(), RepositoryError>>;
}
