//! SQLite turn repository implementation.
//!
//! Persists conversations and their append-only turns. Turn ordering is by
//! creation time, with the time-sortable id as tiebreaker.

use chrono::Utc;
use futures_util::future::BoxFuture;
use sqlx::Row;
use uuid::Uuid;

use valet_core::repository::TurnRepository;
use valet_types::conversation::{Conversation, ConversationTurn, NewTurn, TurnRole};
use valet_types::error::RepositoryError;

use super::pool::{map_sqlx, parse_datetime, parse_uuid, DatabasePool};

/// SQLite-backed implementation of `TurnRepository`.
pub struct SqliteTurnRepository {
    pool: DatabasePool,
}

impl SqliteTurnRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

struct TurnRow {
    id: String,
    conversation_id: String,
    role: String,
    content: String,
    profile: String,
    token_count: Option<i64>,
    created_at: String,
}

impl TurnRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            profile: row.try_get("profile")?,
            token_count: row.try_get("token_count")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_turn(self) -> Result<ConversationTurn, RepositoryError> {
        Ok(ConversationTurn {
            id: parse_uuid(&self.id)?,
            conversation_id: parse_uuid(&self.conversation_id)?,
            role: self
                .role
                .parse::<TurnRole>()
                .map_err(RepositoryError::Query)?,
            content: self.content,
            profile: self.profile,
            token_count: self.token_count.map(|t| t as u32),
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn conversation_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Conversation, RepositoryError> {
    let id: String = row.try_get("id").map_err(map_sqlx)?;
    let title: String = row.try_get("title").map_err(map_sqlx)?;
    let created_at: String = row.try_get("created_at").map_err(map_sqlx)?;
    let updated_at: String = row.try_get("updated_at").map_err(map_sqlx)?;
    Ok(Conversation {
        id: parse_uuid(&id)?,
        title,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

impl TurnRepository for SqliteTurnRepository {
    fn ensure_conversation(
        &self,
        id: Uuid,
    ) -> BoxFuture<'_, Result<Conversation, RepositoryError>> {
        Box::pin(async move {
            let now = Utc::now().to_rfc3339();
            sqlx::query(
                "INSERT OR IGNORE INTO conversations (id, title, created_at, updated_at)
                 VALUES (?, 'New Conversation', ?, ?)",
            )
            .bind(id.to_string())
            .bind(&now)
            .bind(&now)
            .execute(&self.pool.writer)
            .await
            .map_err(map_sqlx)?;

            let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
                .bind(id.to_string())
                .fetch_one(&self.pool.writer)
                .await
                .map_err(map_sqlx)?;
            conversation_from_row(&row)
        })
    }

    fn get_conversation(
        &self,
        id: Uuid,
    ) -> BoxFuture<'_, Result<Option<Conversation>, RepositoryError>> {
        Box::pin(async move {
            let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool.reader)
                .await
                .map_err(map_sqlx)?;
            row.map(|r| conversation_from_row(&r)).transpose()
        })
    }

    fn update_title(&self, id: Uuid, title: &str) -> BoxFuture<'_, Result<(), RepositoryError>> {
        let title = title.to_string();
        Box::pin(async move {
            sqlx::query("UPDATE conversations SET title = ?, updated_at = ? WHERE id = ?")
                .bind(title)
                .bind(Utc::now().to_rfc3339())
                .bind(id.to_string())
                .execute(&self.pool.writer)
                .await
                .map_err(map_sqlx)?;
            Ok(())
        })
    }

    fn append_turn(
        &self,
        turn: NewTurn,
    ) -> BoxFuture<'_, Result<ConversationTurn, RepositoryError>> {
        Box::pin(async move {
            let stored = ConversationTurn {
                id: Uuid::now_v7(),
                conversation_id: turn.conversation_id,
                role: turn.role,
                content: turn.content,
                profile: turn.profile,
                token_count: turn.token_count,
                created_at: Utc::now(),
            };

            sqlx::query(
                "INSERT INTO turns (id, conversation_id, role, content, profile, token_count, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(stored.id.to_string())
            .bind(stored.conversation_id.to_string())
            .bind(stored.role.to_string())
            .bind(&stored.content)
            .bind(&stored.profile)
            .bind(stored.token_count.map(|t| t as i64))
            .bind(stored.created_at.to_rfc3339())
            .execute(&self.pool.writer)
            .await
            .map_err(map_sqlx)?;

            Ok(stored)
        })
    }

    fn recent_turns(
        &self,
        conversation_id: Uuid,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<ConversationTurn>, RepositoryError>> {
        Box::pin(async move {
            let rows = sqlx::query(
                "SELECT * FROM (
                     SELECT * FROM turns WHERE conversation_id = ?
                     ORDER BY created_at DESC, id DESC LIMIT ?
                 ) ORDER BY created_at ASC, id ASC",
            )
            .bind(conversation_id.to_string())
            .bind(limit as i64)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(map_sqlx)?;

            rows.iter()
                .map(|row| TurnRow::from_row(row).map_err(map_sqlx)?.into_turn())
                .collect()
        })
    }

    fn count_turns(&self, conversation_id: Uuid) -> BoxFuture<'_, Result<u64, RepositoryError>> {
        Box::pin(async move {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM turns WHERE conversation_id = ?")
                .bind(conversation_id.to_string())
                .fetch_one(&self.pool.reader)
                .await
                .map_err(map_sqlx)?;
            Ok(count as u64)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
