//! Conversation title synthesis.
//!
//! `synthesize_title` generates a short, descriptive title from the first
//! user-assistant exchange. The orchestrator fires it in the background after
//! a conversation's first exchange; failures are logged, never surfaced.

use std::sync::Arc;

use valet_types::llm::{BackendError, ChatMessage, StreamEvent, StreamOptions};
use valet_types::profile::ProfileConfig;

use crate::llm::ModelBackend;

/// System prompt for the title generation call.
const TITLE_SYSTEM_PROMPT: &str = r#"Generate a short, descriptive title (3-7 words) for this conversation based on the first exchange. The title should capture the main topic or intent. Return ONLY the title text, nothing else.

Examples:
- "Debugging Rust lifetime errors"
- "Planning a weekend trip to Tokyo"
- "Understanding quantum computing basics"
- "Recipe ideas for dinner party""#;

/// Generate a title from the first exchange.
///
/// A lightweight call: low temperature, tiny token budget, no tools. The
/// result is trimmed of whitespace and surrounding quotes.
pub async fn synthesize_title(
    backend: &Arc<dyn ModelBackend>,
    profile: &ProfileConfig,
    first_user_message: &str,
    first_assistant_message: &str,
) -> Result<String, BackendError> {
    let messages = vec![
        ChatMessage::system(TITLE_SYSTEM_PROMPT),
        ChatMessage::user(first_user_message),
        ChatMessage::assistant(first_assistant_message),
        ChatMessage::user("Based on our exchange above, generate a title."),
    ];

    let options = StreamOptions {
        temperature: Some(0.3),
        max_tokens: Some(50),
        ..StreamOptions::text_only()
    };

    let mut stream = backend
        .open_stream(profile, messages, options)
        .await?;

    let mut raw = String::new();
    while let Some(event) = stream.next_event().await {
        match event? {
            StreamEvent::Text { text } => raw.push_str(&text),
            StreamEvent::Done { .. } => break,
            _ => {}
        }
    }

    Ok(raw
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .trim()
        .to_string())
}
