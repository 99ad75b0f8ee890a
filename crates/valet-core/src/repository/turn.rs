//! Turn repository trait definition.

use futures_util::future::BoxFuture;
use uuid::Uuid;

use valet_types::conversation::{Conversation, ConversationTurn, NewTurn};
use valet_types::error::RepositoryError;

/// Storage interface for conversations and their append-only turns.
pub trait TurnRepository: Send + Sync {
    /// Get the conversation, creating an empty shell if it does not exist.
    fn ensure_conversation(
        &self,
        id: Uuid,
    ) -> BoxFuture<'_, Result<Conversation, RepositoryError>>;

    /// Fetch a conversation by id.
    fn get_conversation(
        &self,
        id: Uuid,
    ) -> BoxFuture<'_, Result<Option<Conversation>, RepositoryError>>;

    /// Replace a conversation's title.
    fn update_title(
        &self,
        id: Uuid,
        title: &str,
    ) -> BoxFuture<'_, Result<(), RepositoryError>>;

    /// Append one turn. The store assigns the id and creation time.
    fn append_turn(
        &self,
        turn: NewTurn,
    ) -> BoxFuture<'_, Result<ConversationTurn, RepositoryError>>;

    /// The most recent `limit` turns of a conversation, in chronological order.
    fn recent_turns(
        &self,
        conversation_id: Uuid,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<ConversationTurn>, RepositoryError>>;

    /// Number of turns stored for a conversation.
    fn count_turns(
        &self,
        conversation_id: Uuid,
    ) -> BoxFuture<'_, Result<u64, RepositoryError>>;
}
