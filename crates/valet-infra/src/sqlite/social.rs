//! SQLite social post repository implementation.
//!
//! Ingestion uses `INSERT OR IGNORE` against a UNIQUE(platform, external_id)
//! constraint: re-ingesting an already-seen post changes nothing, so the
//! inserted count reflects only genuinely new items.

use chrono::Utc;
use futures_util::future::BoxFuture;
use sqlx::Row;
use uuid::Uuid;

use valet_core::repository::SocialPostRepository;
use valet_types::error::RepositoryError;
use valet_types::social::{NewSocialPost, Platform, PostType, SocialPost};

use super::pool::{map_sqlx, parse_datetime, parse_uuid, DatabasePool};

/// SQLite-backed implementation of `SocialPostRepository`.
pub struct SqliteSocialPostRepository {
    pool: DatabasePool,
}

impl SqliteSocialPostRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn post_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<SocialPost, RepositoryError> {
    let id: String = row.try_get("id").map_err(map_sqlx)?;
    let platform: String = row.try_get("platform").map_err(map_sqlx)?;
    let post_type: String = row.try_get("post_type").map_err(map_sqlx)?;
    let posted_at: String = row.try_get("posted_at").map_err(map_sqlx)?;
    let ingested_at: String = row.try_get("ingested_at").map_err(map_sqlx)?;

    Ok(SocialPost {
        id: parse_uuid(&id)?,
        platform: platform
            .parse::<Platform>()
            .map_err(RepositoryError::Query)?,
        external_id: row.try_get("external_id").map_err(map_sqlx)?,
        author: row.try_get("author").map_err(map_sqlx)?,
        content: row.try_get("content").map_err(map_sqlx)?,
        url: row.try_get("url").map_err(map_sqlx)?,
        subreddit: row.try_get("subreddit").map_err(map_sqlx)?,
        title: row.try_get("title").map_err(map_sqlx)?,
        score: row.try_get("score").map_err(map_sqlx)?,
        reply_count: row.try_get("reply_count").map_err(map_sqlx)?,
        repost_count: row.try_get("repost_count").map_err(map_sqlx)?,
        post_type: post_type.parse::<PostType>().unwrap_or(PostType::Tweet),
        source_query: row.try_get("source_query").map_err(map_sqlx)?,
        posted_at: parse_datetime(&posted_at)?,
        ingested_at: parse_datetime(&ingested_at)?,
    })
}

/// See `fact.rs`: reduce a free-text query to an FTS5 MATCH expression.
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

impl SocialPostRepository for SqliteSocialPostRepository {
    fn upsert_many(
        &self,
        posts: Vec<NewSocialPost>,
    ) -> BoxFuture<'_, Result<u64, RepositoryError>> {
        Box::pin(async move {
            let mut tx = self.pool.writer.begin().await.map_err(map_sqlx)?;
            let now = Utc::now().to_rfc3339();
            let mut inserted = 0u64;

            for post in posts {
                let result = sqlx::query(
                    "INSERT OR IGNORE INTO social_posts
                     (id, platform, external_id, author, content, url, subreddit, title,
                      score, reply_count, repost_count, post_type, source_query,
                      posted_at, ingested_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(Uuid::now_v7().to_string())
                .bind(post.platform.to_string())
                .bind(&post.external_id)
                .bind(&post.author)
                .bind(&post.content)
                .bind(&post.url)
                .bind(&post.subreddit)
                .bind(&post.title)
                .bind(post.score)
                .bind(post.reply_count)
                .bind(post.repost_count)
                .bind(post.post_type.to_string())
                .bind(&post.source_query)
                .bind(post.posted_at.to_rfc3339())
                .bind(&now)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx)?;

                inserted += result.rows_affected();
            }

            tx.commit().await.map_err(map_sqlx)?;
            Ok(inserted)
        })
    }

    fn recent(
        &self,
        platform: Option<Platform>,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<SocialPost>, RepositoryError>> {
        Box::pin(async move {
            let rows = match platform {
                Some(p) => {
                    sqlx::query(
                        "SELECT * FROM social_posts WHERE platform = ?
                         ORDER BY posted_at DESC LIMIT ?",
                    )
                    .bind(p.to_string())
                    .bind(limit as i64)
                    .fetch_all(&self.pool.reader)
                    .await
                }
                None => {
                    sqlx::query("SELECT * FROM social_posts ORDER BY posted_at DESC LIMIT ?")
                        .bind(limit as i64)
                        .fetch_all(&self.pool.reader)
                        .await
                }
            }
            .map_err(map_sqlx)?;

            rows.iter().map(post_from_row).collect()
        })
    }

    fn search(
        &self,
        query: &str,
        platform: Option<Platform>,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<SocialPost>, RepositoryError>> {
        let query = query.to_string();
        Box::pin(async move {
            let Some(matcher) = fts_query(&query) else {
                return Ok(vec![]);
            };

            let rows = match platform {
                Some(p) => {
                    sqlx::query(
                        "SELECT sp.* FROM social_posts sp
                         JOIN social_posts_fts fts ON sp.rowid = fts.rowid
                         WHERE social_posts_fts MATCH ? AND sp.platform = ?
                         ORDER BY rank LIMIT ?",
                    )
                    .bind(matcher)
                    .bind(p.to_string())
                    .bind(limit as i64)
                    .fetch_all(&self.pool.reader)
                    .await
                }
                None => {
                    sqlx::query(
                        "SELECT sp.* FROM social_posts sp
                         JOIN social_posts_fts fts ON sp.rowid = fts.rowid
                         WHERE social_posts_fts MATCH ?
                         ORDER BY rank LIMIT ?",
                    )
                    .bind(matcher)
                    .bind(limit as i64)
                    .fetch_all(&self.pool.reader)
                    .await
                }
            }
            .map_err(map_sqlx)?;

            rows.iter().map(post_from_row).collect()
        })
    }

    fn count(&self, platform: Option<Platform>) -> BoxFuture<'_, Result<u64, RepositoryError>> {
        Box::pin(async move {
            let count: i64 = match platform {
                Some(p) => {
                    sqlx::query_scalar("SELECT COUNT(*) FROM social_posts WHERE platform = ?")
                        .bind(p.to_string())
                        .fetch_one(&self.pool.reader)
                        .await
                }
                None => {
                    sqlx::query_scalar("SELECT COUNT(*) FROM social_posts")
                        .fetch_one(&self.pool.reader)
                        .await
                }
            }
            .map_err(map_sqlx)?;
            Ok(count as u64)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
