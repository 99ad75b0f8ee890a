//! Web search tool and the external-client traits.
//!
//! `SearchClient` and `SocialClient` are the seams to read-only external
//! APIs; valet-infra provides the HTTP implementations. The tools normalize
//! whatever the clients return into uniform text summaries.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use schemars::JsonSchema;
use serde::Deserialize;

use valet_types::social::NewSocialPost;

use super::{parse_args, Tool, ToolContext, ToolError};

/// One normalized web search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Read-only web search API.
pub trait SearchClient: Send + Sync {
    fn search(
        &self,
        query: &str,
        count: u8,
    ) -> BoxFuture<'_, Result<Vec<SearchHit>, ToolError>>;
}

/// Read-only social search API.
pub trait SocialClient: Send + Sync {
    fn search(
        &self,
        query: &str,
        subreddit: Option<&str>,
        limit: u32,
    ) -> BoxFuture<'_, Result<Vec<NewSocialPost>, ToolError>>;
}

#[derive(Debug, Deserialize, JsonSchema)]
struct WebSearchArgs {
    /// The search query.
    query: String,
    /// Number of results to return (1-10).
    count: Option<u8>,
}

/// Web search over a [`SearchClient`].
pub struct WebSearchTool {
    client: Arc<dyn SearchClient>,
}

impl WebSearchTool {
    pub fn new(client: Arc<dyn SearchClient>) -> Self {
        Self { client }
    }
}

impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information. Use this when the user asks \
         about recent events, facts you are unsure about, or anything that \
         benefits from real-time web data."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(WebSearchArgs)).unwrap_or_default()
    }

    fn execute<'a>(
        &'a self,
        arguments: serde_json::Value,
        _ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<String, ToolError>> {
        Box::pin(async move {
            let args: WebSearchArgs = parse_args(arguments)?;
            let count = args.count.unwrap_or(5).clamp(1, 10);

            let hits = self.client.search(&args.query, count).await?;
            if hits.is_empty() {
                return Ok("No results found.".to_string());
            }

            Ok(hits
                .iter()
                .enumerate()
                .map(|(i, hit)| {
                    format!(
                        "{}. **{}**\n   {}\n   {}",
                        i + 1,
                        hit.title,
                        hit.url,
                        hit.snippet
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n"))
        })
    }
}
