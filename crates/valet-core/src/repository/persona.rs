//! Persona document source.

use futures_util::future::BoxFuture;

use valet_types::error::RepositoryError;

/// Read-only source of the persona document placed at the head of every
/// system prompt.
pub trait PersonaStore: Send + Sync {
    /// The current persona text.
    fn content(&self) -> BoxFuture<'_, Result<String, RepositoryError>>;
}
