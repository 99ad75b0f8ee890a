//! Background fact extraction.
//!
//! After each completed exchange the orchestrator fires `extract` over the
//! (user, assistant) pair. The extraction model is asked for a strict JSON
//! array of {content, category}. Everything that can go wrong here (backend
//! failure, malformed payload, storage error) is swallowed and logged at
//! debug level. The caller's control flow is never affected.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use valet_types::fact::FactCategory;
use valet_types::llm::{ChatMessage, StreamEvent, StreamOptions};
use valet_types::profile::ProfileConfig;

use crate::llm::ModelBackend;
use crate::repository::FactRepository;

const EXTRACT_PROMPT: &str = r#"You are a fact extraction system. Given a conversation exchange, extract any durable facts worth remembering about the user. These include:
- Personal preferences (favorite color, food, etc.)
- Biographical info (name, location, job, etc.)
- Project details they mention
- Explicit instructions ("always do X", "never do Y")

Return a JSON array of objects with "content" and "category" fields.
Categories: preference, biographical, project, instruction, general

If no facts are worth extracting, return an empty array: []

ONLY return valid JSON, nothing else."#;

/// Assistant-response clamp fed to the extraction model.
const RESPONSE_CLAMP: usize = 500;

#[derive(Debug, Deserialize)]
struct ExtractedFact {
    content: String,
    category: Option<String>,
}

/// Fire-and-forget fact extraction over completed exchanges.
#[derive(Clone)]
pub struct FactExtractor {
    backend: Arc<dyn ModelBackend>,
    facts: Arc<dyn FactRepository>,
    profile: ProfileConfig,
}

impl FactExtractor {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        facts: Arc<dyn FactRepository>,
        profile: ProfileConfig,
    ) -> Self {
        Self {
            backend,
            facts,
            profile,
        }
    }

    /// Extract and store facts from one exchange. Never fails.
    pub async fn extract(&self, user_message: &str, assistant_response: &str) {
        if let Err(e) = self.try_extract(user_message, assistant_response).await {
            debug!(error = %e, "fact extraction failed (non-critical)");
        }
    }

    async fn try_extract(
        &self,
        user_message: &str,
        assistant_response: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut clamp = assistant_response.len().min(RESPONSE_CLAMP);
        while !assistant_response.is_char_boundary(clamp) {
            clamp -= 1;
        }

        let messages = vec![
            ChatMessage::system(EXTRACT_PROMPT),
            ChatMessage::user(format!(
                "User said: \"{user_message}\"\n\nAssistant responded: \"{}\"",
                &assistant_response[..clamp]
            )),
        ];

        let options = StreamOptions {
            max_tokens: Some(500),
            ..StreamOptions::text_only()
        };

        let mut stream = self
            .backend
            .open_stream(&self.profile, messages, options)
            .await?;

        let mut raw = String::new();
        while let Some(event) = stream.next_event().await {
            match event? {
                StreamEvent::Text { text } => raw.push_str(&text),
                StreamEvent::Done { .. } => break,
                _ => {}
            }
        }

        let parsed: Vec<ExtractedFact> = serde_json::from_str(raw.trim())?;
        for fact in parsed {
            if fact.content.is_empty() {
                continue;
            }
            let category = fact
                .category
                .as_deref()
                .and_then(|c| c.parse::<FactCategory>().ok())
                .unwrap_or(FactCategory::General);
            self.facts
                .add(&fact.content, category, "auto-extracted")
                .await?;
            debug!(content = %fact.content, category = %category, "fact extracted");
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use futures_util::future::BoxFuture;
    use std::sync::Mutex;
    use uuid::Uuid;
    use valet_types::error::RepositoryError;
    use valet_types::fact::Fact;
    use valet_types::llm::{BackendError, Usage};

    use crate::llm::ModelStream;

    /// Backend that replies to every stream with a fixed body.
    struct FixedBackend {
        body: String,
    }

    impl ModelBackend for FixedBackend {
        fn open_stream(
            &self,
            _profile: &ProfileConfig,
            _messages: Vec<ChatMessage>,
            _options: StreamOptions,
        ) -> BoxFuture<'_, Result<ModelStream, BackendError>> {
            let body = self.body.clone();
            Box::pin(async move {
                let (handle, stream) = ModelStream::channel();
                tokio::spawn(async move {
                    handle.emit(StreamEvent::Text { text: body }).await;
                    handle
                        .emit(StreamEvent::Done {
                            usage: Usage::default(),
                        })
                        .await;
                });
                Ok(stream)
            })
        }
    }

    #[derive(Default)]
    struct MemFacts {
        added: Mutex<Vec<(String, FactCategory)>>,
    }

    impl FactRepository for MemFacts {
        fn add(
            &self,
            content: &str,
            category: FactCategory,
            source: &str,
        ) -> BoxFuture<'_, Result<Fact, RepositoryError>> {
            let content = content.to_string();
            let source = source.to_string();
            Box::pin(async move {
                self.added.lock().unwrap().push((content.clone(), category));
                Ok(Fact {
                    id: Uuid::now_v7(),
                    content,
                    category,
                    source,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
            })
        }

        fn search_top(
            &self,
            _query: &str,
            _limit: usize,
        ) -> BoxFuture<'_, Result<Vec<Fact>, RepositoryError>> {
            Box::pin(async move { Ok(vec![]) })
        }
    }

    fn profile() -> ProfileConfig {
        ProfileConfig {
            model: "haiku".to_string(),
            max_tokens_per_message: 500,
            max_tokens_per_day: 100_000,
            temperature: None,
            top_p: None,
            system_prompt_override: None,
            max_history_messages: None,
        }
    }

    #[tokio::test]
    async fn valid_payload_stores_facts() {
        let facts = Arc::new(MemFacts::default());
        let extractor = FactExtractor::new(
            Arc::new(FixedBackend {
                body: r#"[{"content": "Name is Sam", "category": "biographical"},
                          {"content": "Prefers tea", "category": "preference"}]"#
                    .to_string(),
            }),
            Arc::clone(&facts) as _,
            profile(),
        );

        extractor.extract("I'm Sam and I like tea", "Nice to meet you").await;

        let added = facts.added.lock().unwrap();
        assert_eq!(added.len(), 2);
        assert_eq!(added[0], ("Name is Sam".to_string(), FactCategory::Biographical));
        assert_eq!(added[1], ("Prefers tea".to_string(), FactCategory::Preference));
    }

    #[tokio::test]
    async fn unknown_category_falls_back_to_general() {
        let facts = Arc::new(MemFacts::default());
        let extractor = FactExtractor::new(
            Arc::new(FixedBackend {
                body: r#"[{"content": "Something", "category": "mystery"}]"#.to_string(),
            }),
            Arc::clone(&facts) as _,
            profile(),
        );

        extractor.extract("u", "a").await;

        let added = facts.added.lock().unwrap();
        assert_eq!(added[0].1, FactCategory::General);
    }

    #[tokio::test]
    async fn malformed_payload_is_swallowed() {
        let facts = Arc::new(MemFacts::default());
        let extractor = FactExtractor::new(
            Arc::new(FixedBackend {
                body: "Sorry, I can't produce JSON today.".to_string(),
            }),
            Arc::clone(&facts) as _,
            profile(),
        );

        // Must not panic or propagate.
        extractor.extract("u", "a").await;
        assert!(facts.added.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_array_stores_nothing() {
        let facts = Arc::new(MemFacts::default());
        let extractor = FactExtractor::new(
            Arc::new(FixedBackend {
                body: "[]".to_string(),
            }),
            Arc::clone(&facts) as _,
            profile(),
        );

        extractor.extract("u", "a").await;
        assert!(facts.added.lock().unwrap().is_empty());
    }
}
