//! Fact repository trait definition.

use futures_util::future::BoxFuture;

use valet_types::error::RepositoryError;
use valet_types::fact::{Fact, FactCategory};

/// Storage interface for remembered facts.
pub trait FactRepository: Send + Sync {
    /// Store a new fact.
    fn add(
        &self,
        content: &str,
        category: FactCategory,
        source: &str,
    ) -> BoxFuture<'_, Result<Fact, RepositoryError>>;

    /// The `limit` most relevant facts for a query, best first.
    fn search_top(
        &self,
        query: &str,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<Fact>, RepositoryError>>;
}
