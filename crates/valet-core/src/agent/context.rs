//! Context assembly: the ordered prompt for one model call.
//!
//! One system entry (optional per-profile override prefix, then the persona
//! document, then up to K top-relevance recalled facts tagged by category),
//! followed by the most recent H prior turns in chronological order, followed
//! by the new utterance last. Pure read path; never mutates any store.

use std::sync::Arc;

use uuid::Uuid;

use valet_types::conversation::TurnRole;
use valet_types::error::RepositoryError;
use valet_types::llm::{ChatMessage, ChatRole};
use valet_types::profile::ProfileConfig;

use crate::repository::{FactRepository, PersonaStore, TurnRepository};

/// Default history window (H) in turns.
pub const DEFAULT_HISTORY_WINDOW: usize = 20;

/// Default recalled-fact budget (K).
pub const DEFAULT_FACT_RECALL: usize = 5;

/// Builds the ordered prompt for one turn.
#[derive(Clone)]
pub struct ContextAssembler {
    persona: Arc<dyn PersonaStore>,
    facts: Arc<dyn FactRepository>,
    turns: Arc<dyn TurnRepository>,
}

impl ContextAssembler {
    pub fn new(
        persona: Arc<dyn PersonaStore>,
        facts: Arc<dyn FactRepository>,
        turns: Arc<dyn TurnRepository>,
    ) -> Self {
        Self {
            persona,
            facts,
            turns,
        }
    }

    /// Assemble the prompt for a new utterance.
    ///
    /// `exclude_turn` is the id of the already-persisted inbound turn, kept
    /// out of the history window because the utterance is appended last.
    pub async fn assemble(
        &self,
        conversation_id: Uuid,
        utterance: &str,
        profile: &ProfileConfig,
        exclude_turn: Option<Uuid>,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let mut system = String::new();
        if let Some(prefix) = &profile.system_prompt_override {
            system.push_str(prefix);
            system.push_str("\n\n");
        }
        system.push_str(&self.persona.content().await?);

        let facts = self.facts.search_top(utterance, DEFAULT_FACT_RECALL).await?;
        if !facts.is_empty() {
            system.push_str("\n\n## Remembered Facts\n");
            for fact in &facts {
                system.push_str(&format!("- [{}] {}\n", fact.category, fact.content));
            }
        }

        let mut messages = vec![ChatMessage::system(system)];

        let window = profile
            .max_history_messages
            .unwrap_or(DEFAULT_HISTORY_WINDOW);
        // Fetch one extra so the excluded turn does not shrink the window.
        let history = self
            .turns
            .recent_turns(conversation_id, window + 1)
            .await?;
        let mut history: Vec<_> = history
            .into_iter()
            .filter(|turn| exclude_turn != Some(turn.id))
            .collect();
        if history.len() > window {
            history.drain(..history.len() - window);
        }

        for turn in history {
            messages.push(ChatMessage {
                role: match turn.role {
                    TurnRole::User => ChatRole::User,
                    TurnRole::Assistant => ChatRole::Assistant,
                },
                content: turn.content,
            });
        }

        messages.push(ChatMessage::user(utterance));
        Ok(messages)
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
    use valet_types::conversation::{Conversation, ConversationTurn, NewTurn};
    use valet_types::fact::{Fact, FactCategory};

    struct FixedPersona(&'static str);

    impl PersonaStore for FixedPersona {
        fn content(&self) -> BoxFuture<'_, Result<String, RepositoryError>> {
            Box::pin(async move { Ok(self.0.to_string()) })
        }
    }

    #[derive(Default)]
    struct MemFacts {
        facts: Vec<Fact>,
    }

    impl FactRepository for MemFacts {
        fn add(
            &self,
            _content: &str,
            _category: FactCategory,
            _source: &str,
        ) -> BoxFuture<'_, Result<Fact, RepositoryError>> {
            Box::pin(async move { Err(RepositoryError::Query("read-only".into())) })
        }

        fn search_top(
            &self,
            _query: &str,
            limit: usize,
        ) -> BoxFuture<'_, Result<Vec<Fact>, RepositoryError>> {
            Box::pin(async move { Ok(self.facts.iter().take(limit).cloned().collect()) })
        }
    }

    #[derive(Default)]
    struct MemTurns {
        turns: Mutex<Vec<ConversationTurn>>,
    }

    impl TurnRepository for MemTurns {
        fn ensure_conversation(
            &self,
            id: Uuid,
        ) -> BoxFuture<'_, Result<Conversation, RepositoryError>> {
            Box::pin(async move {
                Ok(Conversation {
                    id,
                    title: "New Conversation".to_string(),
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
            })
        }

        fn get_conversation(
            &self,
            _id: Uuid,
        ) -> BoxFuture<'_, Result<Option<Conversation>, RepositoryError>> {
            Box::pin(async move { Ok(None) })
        }

        fn update_title(
            &self,
            _id: Uuid,
            _title: &str,
        ) -> BoxFuture<'_, Result<(), RepositoryError>> {
            Box::pin(async move { Ok(()) })
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
                self.turns.lock().unwrap().push(stored.clone());
                Ok(stored)
            })
        }

        fn recent_turns(
            &self,
            conversation_id: Uuid,
            limit: usize,
        ) -> BoxFuture<'_, Result<Vec<ConversationTurn>, RepositoryError>> {
            Box::pin(async move {
                let turns = self.turns.lock().unwrap();
                let mut matching: Vec<_> = turns
                    .iter()
                    .filter(|t| t.conversation_id == conversation_id)
                    .cloned()
                    .collect();
                if matching.len() > limit {
                    matching.drain(..matching.len() - limit);
                }
                Ok(matching)
            })
        }

        fn count_turns(
            &self,
            conversation_id: Uuid,
        ) -> BoxFuture<'_, Result<u64, RepositoryError>> {
            Box::pin(async move {
                Ok(self
                    .turns
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|t| t.conversation_id == conversation_id)
                    .count() as u64)
            })
        }
    }

    fn profile() -> ProfileConfig {
        ProfileConfig {
            model: "sonnet-4".to_string(),
            max_tokens_per_message: 4096,
            max_tokens_per_day: 100_000,
            temperature: None,
            top_p: None,
            system_prompt_override: None,
            max_history_messages: None,
        }
    }

    fn fact(content: &str, category: FactCategory) -> Fact {
        Fact {
            id: Uuid::now_v7(),
            content: content.to_string(),
            category,
            source: "auto-extracted".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn prompt_ordering_system_history_utterance() {
        let turns = Arc::new(MemTurns::default());
        let conversation_id = Uuid::now_v7();
        for (role, content) in [
            (TurnRole::User, "earlier question"),
            (TurnRole::Assistant, "earlier answer"),
        ] {
            turns
                .append_turn(NewTurn {
                    conversation_id,
                    role,
                    content: content.to_string(),
                    profile: "free".to_string(),
                    token_count: None,
                })
                .await
                .unwrap();
        }

        let assembler = ContextAssembler::new(
            Arc::new(FixedPersona("I am Valet.")),
            Arc::new(MemFacts {
                facts: vec![fact("Likes green", FactCategory::Preference)],
            }),
            turns,
        );

        let messages = assembler
            .assemble(conversation_id, "new question", &profile(), None)
            .await
            .unwrap();

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, ChatRole::System);
        assert!(messages[0].content.contains("I am Valet."));
        assert!(messages[0].content.contains("## Remembered Facts"));
        assert!(messages[0].content.contains("- [preference] Likes green"));
        assert_eq!(messages[1].content, "earlier question");
        assert_eq!(messages[2].content, "earlier answer");
        assert_eq!(messages[3].role, ChatRole::User);
        assert_eq!(messages[3].content, "new question");
    }

    #[tokio::test]
    async fn override_prefix_precedes_persona() {
        let assembler = ContextAssembler::new(
            Arc::new(FixedPersona("PERSONA")),
            Arc::new(MemFacts::default()),
            Arc::new(MemTurns::default()),
        );
        let mut profile = profile();
        profile.system_prompt_override = Some("OVERRIDE".to_string());

        let messages = assembler
            .assemble(Uuid::now_v7(), "hi", &profile, None)
            .await
            .unwrap();

        let system = &messages[0].content;
        let override_pos = system.find("OVERRIDE").unwrap();
        let persona_pos = system.find("PERSONA").unwrap();
        assert!(override_pos < persona_pos);
    }

    #[tokio::test]
    async fn no_facts_section_when_nothing_recalled() {
        let assembler = ContextAssembler::new(
            Arc::new(FixedPersona("PERSONA")),
            Arc::new(MemFacts::default()),
            Arc::new(MemTurns::default()),
        );

        let messages = assembler
            .assemble(Uuid::now_v7(), "hi", &profile(), None)
            .await
            .unwrap();
        assert!(!messages[0].content.contains("Remembered Facts"));
    }

    #[tokio::test]
    async fn excluded_turn_does_not_appear_or_shrink_window() {
        let turns = Arc::new(MemTurns::default());
        let conversation_id = Uuid::now_v7();
        let mut profile = profile();
        profile.max_history_messages = Some(2);

        for i in 0..3 {
            turns
                .append_turn(NewTurn {
                    conversation_id,
                    role: TurnRole::User,
                    content: format!("old {i}"),
                    profile: "free".to_string(),
                    token_count: None,
                })
                .await
                .unwrap();
        }
        let inbound = turns
            .append_turn(NewTurn {
                conversation_id,
                role: TurnRole::User,
                content: "the new utterance".to_string(),
                profile: "free".to_string(),
                token_count: None,
            })
            .await
            .unwrap();

        let assembler = ContextAssembler::new(
            Arc::new(FixedPersona("P")),
            Arc::new(MemFacts::default()),
            turns,
        );
        let messages = assembler
            .assemble(conversation_id, "the new utterance", &profile, Some(inbound.id))
            .await
            .unwrap();

        // system + 2 history + utterance; the persisted inbound turn shows up
        // only as the trailing utterance.
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content, "old 1");
        assert_eq!(messages[2].content, "old 2");
        assert_eq!(messages[3].content, "the new utterance");
    }

    #[tokio::test]
    async fn history_window_respects_profile_override() {
        let turns = Arc::new(MemTurns::default());
        let conversation_id = Uuid::now_v7();
        for i in 0..30 {
            turns
                .append_turn(NewTurn {
                    conversation_id,
                    role: TurnRole::User,
                    content: format!("m{i}"),
                    profile: "free".to_string(),
                    token_count: None,
                })
                .await
                .unwrap();
        }

        let assembler = ContextAssembler::new(
            Arc::new(FixedPersona("P")),
            Arc::new(MemFacts::default()),
            turns,
        );

        let mut small = profile();
        small.max_history_messages = Some(5);
        let messages = assembler
            .assemble(conversation_id, "q", &small, None)
            .await
            .unwrap();
        // system + 5 history + utterance, keeping the most recent turns.
        assert_eq!(messages.len(), 7);
        assert_eq!(messages[1].content, "m25");
        assert_eq!(messages[5].content, "m29");
    }
}
