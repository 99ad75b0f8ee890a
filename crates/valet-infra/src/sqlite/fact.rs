//! SQLite fact repository implementation.
//!
//! Relevance search runs over an FTS5 index. Queries are sanitized down to
//! alphanumeric words OR-joined, so punctuation in user utterances cannot
//! break the MATCH syntax.

use chrono::Utc;
use futures_util::future::BoxFuture;
use sqlx::Row;
use uuid::Uuid;

use valet_core::repository::FactRepository;
use valet_types::error::RepositoryError;
use valet_types::fact::{Fact, FactCategory};

use super::pool::{map_sqlx, parse_datetime, parse_uuid, DatabasePool};

/// SQLite-backed implementation of `FactRepository`.
pub struct SqliteFactRepository {
    pool: DatabasePool,
}

impl SqliteFactRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Reduce a free-text query to an FTS5 MATCH expression, or `None` when
/// nothing searchable remains.
fn fts_query(query: &str) -> Option<String> {
    let words: Vec<String> = query
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .filter(|w| w.len() > 1)
        .map(|w| format!("\"{w}\""))
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" OR "))
    }
}

fn fact_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Fact, RepositoryError> {
    let id: String = row.try_get("id").map_err(map_sqlx)?;
    let content: String = row.try_get("content").map_err(map_sqlx)?;
    let category: String = row.try_get("category").map_err(map_sqlx)?;
    let source: String = row.try_get("source").map_err(map_sqlx)?;
    let created_at: String = row.try_get("created_at").map_err(map_sqlx)?;
    let updated_at: String = row.try_get("updated_at").map_err(map_sqlx)?;

    Ok(Fact {
        id: parse_uuid(&id)?,
        content,
        category: category
            .parse::<FactCategory>()
            .unwrap_or(FactCategory::General),
        source,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

impl FactRepository for SqliteFactRepository {
    fn add(
        &self,
        content: &str,
        category: FactCategory,
        source: &str,
    ) -> BoxFuture<'_, Result<Fact, RepositoryError>> {
        let content = content.to_string();
        let source = source.to_string();
        Box::pin(async move {
            let fact = Fact {
                id: Uuid::now_v7(),
                content,
                category,
                source,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };

            sqlx::query(
                "INSERT INTO facts (id, content, category, source, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(fact.id.to_string())
            .bind(&fact.content)
            .bind(fact.category.to_string())
            .bind(&fact.source)
            .bind(fact.created_at.to_rfc3339())
            .bind(fact.updated_at.to_rfc3339())
            .execute(&self.pool.writer)
            .await
            .map_err(map_sqlx)?;

            Ok(fact)
        })
    }

    fn search_top(
        &self,
        query: &str,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<Fact>, RepositoryError>> {
        let query = query.to_string();
        Box::pin(async move {
            let Some(matcher) = fts_query(&query) else {
                return Ok(vec![]);
            };

            let rows = sqlx::query(
                "SELECT f.* FROM facts f
                 JOIN facts_fts fts ON f.rowid = fts.rowid
                 WHERE facts_fts MATCH ?
                 ORDER BY rank
                 LIMIT ?",
            )
            .bind(matcher)
            .bind(limit as i64)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(map_sqlx)?;

            rows.iter().map(fact_from_row).collect()
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
