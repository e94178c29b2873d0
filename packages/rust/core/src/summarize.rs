//! Word-budget summarization with a deterministic fallback.
//!
//! Text within the word budget passes through unchanged. Longer material is
//! condensed by the generation collaborator; if that call fails, the first
//! `max_words` words plus a truncation marker stand in, so content never
//! disappears entirely on failure.

use std::sync::Arc;

use tracing::{instrument, warn};

use studybundle_shared::ActivityNotifier;

use crate::llm::{ChatClient, ChatMessage, ChatRequest};

/// Marker returned for empty/whitespace-only input.
pub const NO_CONTENT_MARKER: &str = "[No content to summarize]";

/// Appended to the deterministic truncation fallback.
const TRUNCATION_MARKER: &str = "... [truncated due to summarization error]";

/// Source text is cut to this many characters before inclusion in the
/// generation request, bounding request size.
const SOURCE_CHAR_CEILING: usize = 10_000;

/// Summarizes text down to a word budget via the generation collaborator.
#[derive(Clone)]
pub struct Summarizer {
    client: Arc<dyn ChatClient>,
    model: String,
    max_words: usize,
    notifier: Arc<dyn ActivityNotifier>,
}

impl Summarizer {
    pub fn new(
        client: Arc<dyn ChatClient>,
        model: impl Into<String>,
        max_words: usize,
        notifier: Arc<dyn ActivityNotifier>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            max_words,
            notifier,
        }
    }

    /// Cap `text` at the configured word budget.
    #[instrument(skip_all, fields(len = text.len()))]
    pub async fn summarize(&self, text: &str) -> String {
        self.notifier
            .notify(&format!("Summarizing_text_length_{}", text.len()));

        if text.trim().is_empty() {
            return NO_CONTENT_MARKER.to_string();
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() <= self.max_words {
            return text.to_string();
        }

        let excerpt = truncate_chars(text, SOURCE_CHAR_CEILING);
        let prompt = format!(
            "Please summarize the following text in no more than {} words, focusing on key \
             points relevant to an academic assignment. Only provide the summary as a block of \
             text; do not restate the task or ask any follow-up questions:\n\n{excerpt}",
            self.max_words
        );

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(
                    "You are a helpful assistant that summarizes academic materials concisely \
                     and accurately.",
                ),
                ChatMessage::user(prompt),
            ],
            temperature: 0.3,
            max_tokens: Some(1000),
        };

        match self.client.complete(request).await {
            Ok(summary) => {
                self.notifier.notify(&format!(
                    "Summarized_text_successfully_length_{}",
                    summary.len()
                ));
                summary
            }
            Err(e) => {
                warn!(error = %e, text_len = text.len(), "summarization failed, truncating instead");
                format!("{}{TRUNCATION_MARKER}", words[..self.max_words].join(" "))
            }
        }
    }
}

/// First `max_chars` characters of `s`.
fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
