//! Transcript retrieval for referenced videos.
//!
//! The [`TranscriptSource`] trait is the seam to the transcript collaborator;
//! [`TimedTextClient`] is a thin HTTP implementation against the public
//! timed-text caption endpoint. The retriever classifies unavailability into
//! distinguishable placeholders instead of conflating it with generic failure.

use std::sync::Arc;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{error, instrument, warn};

use studybundle_shared::{ActivityNotifier, Result, StudyBundleError, TranscriptError};

use crate::summarize::Summarizer;

/// Caption endpoint queried by [`TimedTextClient`].
const TIMEDTEXT_URL: &str = "https://video.google.com/timedtext";

/// User-Agent string for transcript requests.
const USER_AGENT: &str = concat!("studybundle/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// TranscriptSource trait
// ---------------------------------------------------------------------------

/// Abstraction over the transcript collaborator.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the ordered caption fragments for a video identifier.
    async fn fetch_transcript(
        &self,
        video_id: &str,
    ) -> std::result::Result<Vec<String>, TranscriptError>;
}

// ---------------------------------------------------------------------------
// Timed-text HTTP implementation
// ---------------------------------------------------------------------------

/// HTTP transcript collaborator using the timed-text caption endpoint.
///
/// The endpoint serves an empty caption document both when captions are
/// disabled and when none exist; those cases are reported as not-found here,
/// while the full classification remains available through the trait.
pub struct TimedTextClient {
    client: reqwest::Client,
}

impl TimedTextClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                StudyBundleError::config(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TranscriptSource for TimedTextClient {
    async fn fetch_transcript(
        &self,
        video_id: &str,
    ) -> std::result::Result<Vec<String>, TranscriptError> {
        let response = self
            .client
            .get(TIMEDTEXT_URL)
            .query(&[("lang", "en"), ("v", video_id)])
            .send()
            .await
            .map_err(|e| TranscriptError::Unclassified {
                video_id: video_id.into(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.as_u16() == 404 || status.as_u16() == 410 {
            return Err(TranscriptError::VideoUnavailable(video_id.into()));
        }
        if !status.is_success() {
            return Err(TranscriptError::Unclassified {
                video_id: video_id.into(),
                message: format!("HTTP {status}"),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| TranscriptError::Unclassified {
                video_id: video_id.into(),
                message: e.to_string(),
            })?;

        let fragments = parse_caption_document(&body);
        if fragments.is_empty() {
            return Err(TranscriptError::NotFound(video_id.into()));
        }
        Ok(fragments)
    }
}

static CAPTION_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<text[^>]*>(.*?)</text>").expect("valid regex"));

/// Pull caption fragments out of a timed-text XML document.
fn parse_caption_document(xml: &str) -> Vec<String> {
    CAPTION_TEXT_RE
        .captures_iter(xml)
        .map(|caps| unescape_entities(caps[1].trim()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Decode the entities the caption endpoint emits.
fn unescape_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

// ---------------------------------------------------------------------------
// TranscriptRetriever
// ---------------------------------------------------------------------------

/// Fetches, joins, and summarizes transcripts, mapping every failure onto a
/// readable placeholder.
#[derive(Clone)]
pub struct TranscriptRetriever {
    source: Arc<dyn TranscriptSource>,
    summarizer: Summarizer,
    notifier: Arc<dyn ActivityNotifier>,
}

impl TranscriptRetriever {
    pub fn new(
        source: Arc<dyn TranscriptSource>,
        summarizer: Summarizer,
        notifier: Arc<dyn ActivityNotifier>,
    ) -> Self {
        Self {
            source,
            summarizer,
            notifier,
        }
    }

    /// Retrieve the caption text for `video_id`, summarized to the word
    /// budget, or a placeholder naming the failure condition.
    #[instrument(skip(self))]
    pub async fn retrieve(&self, video_id: &str) -> String {
        self.notifier
            .notify(&format!("Fetching_transcript_{video_id}"));

        match self.source.fetch_transcript(video_id).await {
            Ok(fragments) => {
                let text = fragments.join(" ");
                self.notifier.notify(&format!(
                    "Fetched_transcript_{video_id}_length_{}",
                    text.len()
                ));
                let summary = self.summarizer.summarize(&text).await;
                self.notifier.notify(&format!(
                    "Summarized_transcript_{video_id}_length_{}",
                    summary.len()
                ));
                summary
            }
            Err(e @ TranscriptError::Unclassified { .. }) => {
                error!(video_id, error = %e, "transcript fetch failed");
                self.notifier
                    .notify(&format!("Error_transcript_{video_id}"));
                placeholder_for(video_id, &e)
            }
            Err(e) => {
                warn!(video_id, error = %e, "transcript unavailable");
                self.notifier
                    .notify(&format!("Transcript_issue_{video_id}"));
                placeholder_for(video_id, &e)
            }
        }
    }
}

/// Deterministic placeholder for each unavailability condition.
fn placeholder_for(video_id: &str, err: &TranscriptError) -> String {
    match err {
        TranscriptError::Disabled(_) => {
            format!("[Captions disabled for YouTube video ID: {video_id}]")
        }
        TranscriptError::NotFound(_) => {
            format!("[No transcript found for YouTube video ID: {video_id}]")
        }
        TranscriptError::VideoUnavailable(_) => {
            format!("[Video unavailable for YouTube video ID: {video_id}]")
        }
        TranscriptError::Unclassified { message, .. } => {
            format!("[Error fetching transcript for YouTube video ID: {video_id}: {message}]")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use studybundle_shared::SilentActivity;

    use super::*;
    use crate::testing::{FailChat, MapTranscripts, ReplyChat, TranscriptFixture};

    fn retriever(source: Arc<dyn TranscriptSource>) -> TranscriptRetriever {
        // Word budget large enough that short caption text passes through.
        let summarizer = Summarizer::new(
            Arc::new(FailChat),
            "test-model",
            500,
            Arc::new(SilentActivity),
        );
        TranscriptRetriever::new(source, summarizer, Arc::new(SilentActivity))
    }

    #[test]
    fn caption_document_parses_fragments_in_order() {
        let xml = r#"<?xml version="1.0"?><transcript>
            <text start="0.0" dur="2.5">Welcome to the course.</text>
            <text start="2.5" dur="3.0">Today we cover borrowing &amp; lifetimes.</text>
        </transcript>"#;

        let fragments = parse_caption_document(xml);
        assert_eq!(
            fragments,
            vec![
                "Welcome to the course.".to_string(),
                "Today we cover borrowing & lifetimes.".to_string(),
            ]
        );
    }

    #[test]
    fn empty_caption_document_yields_nothing() {
        assert!(parse_caption_document("<transcript></transcript>").is_empty());
        assert!(parse_caption_document("").is_empty());
    }

    #[tokio::test]
    async fn fragments_join_with_single_spaces() {
        let source = MapTranscripts(HashMap::from([(
            "abcdefghijk".to_string(),
            TranscriptFixture::Fragments(vec!["hello".into(), "world".into()]),
        )]));
        let body = retriever(Arc::new(source)).retrieve("abcdefghijk").await;
        assert_eq!(body, "hello world");
    }

    #[tokio::test]
    async fn long_transcripts_are_summarized() {
        let source = MapTranscripts(HashMap::from([(
            "abcdefghijk".to_string(),
            TranscriptFixture::Fragments(
                (0..100).map(|i| format!("fragment{i}")).collect(),
            ),
        )]));
        let summarizer = Summarizer::new(
            Arc::new(ReplyChat("condensed captions".into())),
            "test-model",
            10,
            Arc::new(SilentActivity),
        );
        let retriever =
            TranscriptRetriever::new(Arc::new(source), summarizer, Arc::new(SilentActivity));
        assert_eq!(retriever.retrieve("abcdefghijk").await, "condensed captions");
    }

    #[tokio::test]
    async fn unavailability_conditions_yield_distinct_placeholders() {
        let source = MapTranscripts(HashMap::from([
            ("disabled0000".to_string(), TranscriptFixture::Disabled),
            ("notfound0000".to_string(), TranscriptFixture::NotFound),
            ("gone00000000".to_string(), TranscriptFixture::Unavailable),
        ]));
        let retriever = retriever(Arc::new(source));

        assert_eq!(
            retriever.retrieve("disabled0000").await,
            "[Captions disabled for YouTube video ID: disabled0000]"
        );
        assert_eq!(
            retriever.retrieve("notfound0000").await,
            "[No transcript found for YouTube video ID: notfound0000]"
        );
        assert_eq!(
            retriever.retrieve("gone00000000").await,
            "[Video unavailable for YouTube video ID: gone00000000]"
        );
    }

    #[tokio::test]
    async fn unclassified_errors_embed_the_raw_message() {
        let source = MapTranscripts(HashMap::from([(
            "broken000000".to_string(),
            TranscriptFixture::Error("connection reset".into()),
        )]));
        let body = retriever(Arc::new(source)).retrieve("broken000000").await;
        assert_eq!(
            body,
            "[Error fetching transcript for YouTube video ID: broken000000: connection reset]"
        );
    }
}
