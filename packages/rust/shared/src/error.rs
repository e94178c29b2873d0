//! Error types for studybundle.
//!
//! Library crates use [`StudyBundleError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-item failures ([`FetchError`], [`TranscriptError`]) carry their own
//! classification so the aggregation layer can turn each variant into a
//! readable placeholder instead of aborting the bundle.

use std::path::PathBuf;

/// Top-level error type for all studybundle operations.
#[derive(Debug, thiserror::Error)]
pub enum StudyBundleError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Upstream task source unreachable.
    #[error("connection error: {0}")]
    Connection(String),

    /// A bounded download failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Markup parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Recognized but unimplemented binary format.
    #[error("unsupported format: {filename} (from {url})")]
    UnsupportedFormat { filename: String, url: String },

    /// Transcript retrieval failed.
    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    /// Generation collaborator error or empty response.
    #[error("generation error: {0}")]
    Generation(String),

    /// Malformed structured output from the generation collaborator.
    #[error("response parse error: {0}")]
    ResponseParse(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Classified failure of a single bounded download.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Declared or streamed size exceeded the configured ceiling.
    #[error("{url}: resource exceeds size limit of {limit} bytes")]
    Oversize { url: String, limit: u64 },

    /// The download time budget elapsed.
    #[error("{url}: download timed out")]
    Timeout { url: String },

    /// Transport-level failure (DNS, TLS, connection reset, ...).
    #[error("{url}: network error: {message}")]
    Network { url: String, message: String },

    /// The server answered with an error status.
    #[error("{url}: HTTP {status}")]
    BadStatus { url: String, status: u16 },

    /// The URL is a video reference or a non-fetchable scheme.
    #[error("{url}: not a fetchable resource")]
    Unfetchable { url: String },
}

/// Classified transcript unavailability for a single video identifier.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    /// Captions are disabled for the video.
    #[error("captions disabled for video {0}")]
    Disabled(String),

    /// The video exists but has no transcript.
    #[error("no transcript found for video {0}")]
    NotFound(String),

    /// The video itself is removed or otherwise unavailable.
    #[error("video {0} is unavailable")]
    VideoUnavailable(String),

    /// Anything the collaborator could not classify.
    #[error("transcript fetch failed for video {video_id}: {message}")]
    Unclassified { video_id: String, message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, StudyBundleError>;

impl StudyBundleError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
