//! Reddit search client.
//!
//! Uses the public `search.json` endpoints; no credentials required. Rate
//! limiting (HTTP 429) is reported as a distinct, model-readable failure.

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use serde::Deserialize;

use valet_core::tool::search::SocialClient;
use valet_core::tool::ToolError;
use valet_types::social::{NewSocialPost, Platform, PostType};

const USER_AGENT: &str = "valet/0.1";

#[derive(Debug, Deserialize)]
struct Listing {
    data: Option<ListingData>,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Option<Vec<Child>>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: ChildData,
}

#[derive(Debug, Deserialize)]
struct ChildData {
    id: String,
    author: Option<String>,
    selftext: Option<String>,
    body: Option<String>,
    title: Option<String>,
    permalink: String,
    subreddit: String,
    #[serde(default)]
    score: i64,
    num_comments: Option<i64>,
    created_utc: f64,
}

impl ChildData {
    fn into_post(self, source_query: &str) -> NewSocialPost {
        let posted_at = DateTime::<Utc>::from_timestamp(self.created_utc as i64, 0)
            .unwrap_or_else(Utc::now);
        NewSocialPost {
            platform: Platform::Reddit,
            external_id: self.id,
            author: self.author.unwrap_or_else(|| "[deleted]".to_string()),
            content: self.selftext.or(self.body).unwrap_or_default(),
            url: format!("https://www.reddit.com{}", self.permalink),
            subreddit: Some(self.subreddit),
            title: self.title,
            score: self.score,
            reply_count: self.num_comments.unwrap_or(0),
            repost_count: 0,
            post_type: PostType::Thread,
            source_query: source_query.to_string(),
            posted_at,
        }
    }
}

/// `SocialClient` implementation over reddit's public search.
pub struct RedditClient {
    http: reqwest::Client,
}

impl RedditClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for RedditClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SocialClient for RedditClient {
    fn search(
        &self,
        query: &str,
        subreddit: Option<&str>,
        limit: u32,
    ) -> BoxFuture<'_, Result<Vec<NewSocialPost>, ToolError>> {
        let query = query.to_string();
        let subreddit = subreddit.map(str::to_string);
        Box::pin(async move {
            let base = match &subreddit {
                Some(sub) => format!("https://www.reddit.com/r/{sub}/search.json"),
                None => "https://www.reddit.com/search.json".to_string(),
            };

            let limit = limit.min(100).to_string();
            let restrict = if subreddit.is_some() { "true" } else { "false" };
            let response = self
                .http
                .get(&base)
                .query(&[
                    ("q", query.as_str()),
                    ("sort", "relevance"),
                    ("limit", &limit),
                    ("restrict_sr", restrict),
                    ("type", "link"),
                ])
                .header("User-Agent", USER_AGENT)
                .send()
                .await
                .map_err(|e| ToolError::Failed(format!("reddit request failed: {e}")))?;

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(ToolError::Failed(
                    "Reddit rate limit reached. Try again in a minute.".to_string(),
                ));
            }
            if !response.status().is_success() {
                return Err(ToolError::Failed(format!(
                    "reddit search failed: HTTP {}",
                    response.status()
                )));
            }

            let listing: Listing = response
                .json()
                .await
                .map_err(|e| ToolError::Failed(format!("reddit response malformed: {e}")))?;

            Ok(listing
                .data
                .and_then(|d| d.children)
                .unwrap_or_default()
                .into_iter()
                .map(|c| c.data.into_post(&query))
                .collect())
        })
    }
}
