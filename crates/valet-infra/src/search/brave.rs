//! Brave web search client.

use futures_util::future::BoxFuture;
use serde::Deserialize;

use valet_core::tool::search::{SearchClient, SearchHit};
use valet_core::tool::ToolError;

const SEARCH_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

#[derive(Debug, Deserialize)]
struct BraveResponse {
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    results: Option<Vec<BraveResult>>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    title: String,
    url: String,
    #[serde(default)]
    description: String,
}

/// `SearchClient` implementation over the Brave Search API.
pub struct BraveSearchClient {
    http: reqwest::Client,
    api_key: String,
}

impl BraveSearchClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }
}

impl SearchClient for BraveSearchClient {
    fn search(
        &self,
        query: &str,
        count: u8,
    ) -> BoxFuture<'_, Result<Vec<SearchHit>, ToolError>> {
        let query = query.to_string();
        Box::pin(async move {
            let response = self
                .http
                .get(SEARCH_ENDPOINT)
                .query(&[("q", query.as_str()), ("count", &count.to_string())])
                .header("X-Subscription-Token", &self.api_key)
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(|e| ToolError::Failed(format!("search request failed: {e}")))?;

            if !response.status().is_success() {
                return Err(ToolError::Failed(format!(
                    "search failed: HTTP {}",
                    response.status()
                )));
            }

            let body: BraveResponse = response
                .json()
                .await
                .map_err(|e| ToolError::Failed(format!("search response malformed: {e}")))?;

            Ok(body
                .web
                .and_then(|w| w.results)
                .unwrap_or_default()
                .into_iter()
                .map(|r| SearchHit {
                    title: r.title,
                    url: r.url,
                    snippet: r.description,
                })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_shape_deserializes() {
        let body = r#"{
            "web": {
                "results": [
                    {"title": "Rust", "url": "https://rust-lang.org", "description": "lang"},
                    {"title": "NoDesc", "url": "https://x.invalid"}
                ]
            }
        }"#;
        let parsed: BraveResponse = serde_json::from_str(body).unwrap();
        let results = parsed.web.unwrap().results.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].description, "");
    }

    #[test]
    fn empty_response_deserializes() {
        let parsed: BraveResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.web.is_none());
    }
}
