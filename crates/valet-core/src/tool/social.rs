//! Social monitoring tools.
//!
//! `monitor_reddit` polls a read-only social API and ingests what it finds;
//! the store de-duplicates on (platform, external id), so the summary reports
//! only genuinely new items even under repeated polling. `recall_social`
//! reads back previously ingested posts.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;

use valet_types::social::{Platform, SocialPost};

use crate::repository::SocialPostRepository;

use super::search::SocialClient;
use super::{parse_args, Tool, ToolContext, ToolError};

fn summarize_post(post: &SocialPost) -> String {
    let place = post
        .subreddit
        .as_deref()
        .map(|s| format!(" in r/{s}"))
        .unwrap_or_default();
    let headline = post.title.as_deref().unwrap_or(&post.content);
    let mut line = format!(
        "- [{}] {}{}: {} (score {}, {} replies)\n  {}",
        post.platform, post.author, place, headline, post.score, post.reply_count, post.url
    );
    if line.len() > 500 {
        let mut end = 500;
        while !line.is_char_boundary(end) {
            end -= 1;
        }
        line.truncate(end);
    }
    line
}

#[derive(Debug, Deserialize, JsonSchema)]
struct MonitorRedditArgs {
    /// The search query to monitor.
    query: String,
    /// Restrict the search to one subreddit.
    subreddit: Option<String>,
    /// Maximum posts to fetch (default 25).
    limit: Option<u32>,
}

/// Poll reddit for a query and ingest the results de-duplicated.
pub struct MonitorRedditTool {
    client: Arc<dyn SocialClient>,
    store: Arc<dyn SocialPostRepository>,
}

impl MonitorRedditTool {
    pub fn new(client: Arc<dyn SocialClient>, store: Arc<dyn SocialPostRepository>) -> Self {
        Self { client, store }
    }
}

impl Tool for MonitorRedditTool {
    fn name(&self) -> &str {
        "monitor_reddit"
    }

    fn description(&self) -> &str {
        "Search reddit for posts matching a query and ingest them. Repeated \
         monitoring reports only posts not seen before."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(MonitorRedditArgs)).unwrap_or_default()
    }

    fn execute<'a>(
        &'a self,
        arguments: serde_json::Value,
        _ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<String, ToolError>> {
        Box::pin(async move {
            let args: MonitorRedditArgs = parse_args(arguments)?;
            let limit = args.limit.unwrap_or(25).clamp(1, 100);

            let posts = self
                .client
                .search(&args.query, args.subreddit.as_deref(), limit)
                .await?;
            if posts.is_empty() {
                return Ok("No posts found.".to_string());
            }

            let fetched = posts.len();
            let inserted = self
                .store
                .upsert_many(posts)
                .await
                .map_err(|e| ToolError::Failed(e.to_string()))?;

            let fresh = self
                .store
                .search(&args.query, Some(Platform::Reddit), inserted.min(10) as usize)
                .await
                .map_err(|e| ToolError::Failed(e.to_string()))?;

            let mut summary = format!(
                "Fetched {fetched} posts; {inserted} new ({} already seen).",
                fetched as u64 - inserted
            );
            if !fresh.is_empty() {
                summary.push('\n');
                summary.push_str(
                    &fresh
                        .iter()
                        .map(summarize_post)
                        .collect::<Vec<_>>()
                        .join("\n"),
                );
            }
            Ok(summary)
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RecallSocialArgs {
    /// Full-text query over stored posts; omit for the most recent posts.
    query: Option<String>,
    /// Filter by platform ("twitter" or "reddit").
    platform: Option<String>,
    /// Maximum posts to return (default 10).
    limit: Option<u32>,
}

/// Read back previously ingested posts.
pub struct RecallSocialTool {
    store: Arc<dyn SocialPostRepository>,
}

impl RecallSocialTool {
    pub fn new(store: Arc<dyn SocialPostRepository>) -> Self {
        Self { store }
    }
}

impl Tool for RecallSocialTool {
    fn name(&self) -> &str {
        "recall_social"
    }

    fn description(&self) -> &str {
        "Recall previously ingested social posts, by full-text query or most \
         recent first."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(RecallSocialArgs)).unwrap_or_default()
    }

    fn execute<'a>(
        &'a self,
        arguments: serde_json::Value,
        _ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<String, ToolError>> {
        Box::pin(async move {
            let args: RecallSocialArgs = parse_args(arguments)?;
            let limit = args.limit.unwrap_or(10).clamp(1, 50) as usize;
            let platform = match args.platform.as_deref() {
                Some(p) => Some(
                    p.parse::<Platform>()
                        .map_err(ToolError::InvalidArguments)?,
                ),
                None => None,
            };

            let posts = match args.query.as_deref() {
                Some(query) if !query.trim().is_empty() => self
                    .store
                    .search(query, platform, limit)
                    .await
                    .map_err(|e| ToolError::Failed(e.to_string()))?,
                _ => self
                    .store
                    .recent(platform, limit)
                    .await
                    .map_err(|e| ToolError::Failed(e.to_string()))?,
            };

            if posts.is_empty() {
                return Ok("No stored posts match.".to_string());
            }
            Ok(posts
                .iter()
                .map(summarize_post)
                .collect::<Vec<_>>()
                .join("\n"))
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
