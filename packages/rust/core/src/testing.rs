//! Shared test doubles for the collaborator traits.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use studybundle_shared::{Result, StudyBundleError, TranscriptError};

use crate::llm::{ChatClient, ChatRequest};
use crate::transcript::TranscriptSource;

/// Chat collaborator that always returns the same reply.
pub(crate) struct ReplyChat(pub String);

#[async_trait]
impl ChatClient for ReplyChat {
    async fn complete(&self, _request: ChatRequest) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Chat collaborator that always fails.
pub(crate) struct FailChat;

#[async_trait]
impl ChatClient for FailChat {
    async fn complete(&self, _request: ChatRequest) -> Result<String> {
        Err(StudyBundleError::Generation("mock generation failure".into()))
    }
}

/// Fixture outcomes for [`MapTranscripts`].
pub(crate) enum TranscriptFixture {
    Fragments(Vec<String>),
    Disabled,
    NotFound,
    Unavailable,
    Error(String),
}

/// Transcript collaborator serving fixed outcomes per video id.
pub(crate) struct MapTranscripts(pub HashMap<String, TranscriptFixture>);

#[async_trait]
impl TranscriptSource for MapTranscripts {
    async fn fetch_transcript(
        &self,
        video_id: &str,
    ) -> std::result::Result<Vec<String>, TranscriptError> {
        match self.0.get(video_id) {
            Some(TranscriptFixture::Fragments(fragments)) => Ok(fragments.clone()),
            Some(TranscriptFixture::Disabled) => Err(TranscriptError::Disabled(video_id.into())),
            Some(TranscriptFixture::Unavailable) => {
                Err(TranscriptError::VideoUnavailable(video_id.into()))
            }
            Some(TranscriptFixture::Error(message)) => Err(TranscriptError::Unclassified {
                video_id: video_id.into(),
                message: message.clone(),
            }),
            Some(TranscriptFixture::NotFound) | None => {
                Err(TranscriptError::NotFound(video_id.into()))
            }
        }
    }
}

/// Transcript collaborator that sleeps per id before echoing it back,
/// used to drive completion order away from input order.
pub(crate) struct StaggeredTranscripts {
    pub delays_ms: HashMap<String, u64>,
}

#[async_trait]
impl TranscriptSource for StaggeredTranscripts {
    async fn fetch_transcript(
        &self,
        video_id: &str,
    ) -> std::result::Result<Vec<String>, TranscriptError> {
        let delay = self.delays_ms.get(video_id).copied().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(vec![video_id.to_string()])
    }
}
