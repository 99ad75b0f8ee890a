//! Social post repository trait definition.

use futures_util::future::BoxFuture;

use valet_types::error::RepositoryError;
use valet_types::social::{NewSocialPost, Platform, SocialPost};

/// Storage interface for ingested social content.
///
/// Ingestion is de-duplicated on (platform, external id): upserting an
/// already-seen post is a no-op, so repeated polling reports only genuinely
/// new items.
pub trait SocialPostRepository: Send + Sync {
    /// Ingest a batch, skipping already-seen posts. Returns how many were
    /// actually inserted.
    fn upsert_many(
        &self,
        posts: Vec<NewSocialPost>,
    ) -> BoxFuture<'_, Result<u64, RepositoryError>>;

    /// Most recently posted items, optionally filtered by platform.
    fn recent(
        &self,
        platform: Option<Platform>,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<SocialPost>, RepositoryError>>;

    /// Full-text search over stored posts, best match first.
    fn search(
        &self,
        query: &str,
        platform: Option<Platform>,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<SocialPost>, RepositoryError>>;

    /// Number of stored posts, optionally filtered by platform.
    fn count(
        &self,
        platform: Option<Platform>,
    ) -> BoxFuture<'_, Result<u64, RepositoryError>>;
}
