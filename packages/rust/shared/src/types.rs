//! Core domain types for the studybundle pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Course / Task
// ---------------------------------------------------------------------------

/// A course as reported by the task source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Identifier assigned by the task source.
    pub id: u64,
    /// Display name.
    pub name: String,
}

/// A unit of academic work plus its supplementary references.
///
/// Immutable once constructed by the extraction step. The link list and the
/// video-id list are ordered; the aggregated bundle preserves exactly this
/// order (links first, then videos).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Identifier assigned by the task source.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Cleaned description text (markup already stripped).
    pub description: String,
    /// Outbound link URLs, absolute, in document order.
    pub links: Vec<String>,
    /// Recognized video identifiers, deduplicated, in document order.
    pub video_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// ContentFragment
// ---------------------------------------------------------------------------

/// Which reference a fragment was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    /// Derived from an outbound link.
    Link,
    /// Derived from a video transcript.
    Transcript,
}

/// One normalized, labeled unit of the final bundle.
///
/// Every link and every video identifier of a task yields exactly one
/// fragment, whether the underlying retrieval succeeded or not; failures
/// carry a diagnostic placeholder in `body`.
#[derive(Debug, Clone)]
pub struct ContentFragment {
    pub kind: FragmentKind,
    /// Stable source label: `File: <name> (from <url>)`, `URL: <url>`, or the
    /// video identifier for transcript fragments.
    pub label: String,
    /// Extracted/summarized text, or a diagnostic placeholder.
    pub body: String,
}

impl ContentFragment {
    /// Render the fragment as a labeled block with begin/end markers.
    pub fn render(&self) -> String {
        match self.kind {
            FragmentKind::Link => format!(
                "--- Content from {label} ---\n{body}\n--- End Content from {label} ---",
                label = self.label,
                body = self.body
            ),
            FragmentKind::Transcript => format!(
                "--- YouTube Transcript (Video ID: {id}) ---\n{body}\n--- End Transcript (Video ID: {id}) ---",
                id = self.label,
                body = self.body
            ),
        }
    }
}

/// Marker emitted when a task has no supplementary references at all, or
/// when every reference was filtered out before producing output.
pub const NO_SUPPLEMENTARY_CONTENT: &str = "[No supplementary content processed.]";

/// Render an ordered fragment list into the final bundle text.
pub fn render_bundle(fragments: &[ContentFragment]) -> String {
    if fragments.is_empty() {
        return NO_SUPPLEMENTARY_CONTENT.to_string();
    }
    fragments
        .iter()
        .map(ContentFragment::render)
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ---------------------------------------------------------------------------
// SolutionArtifact
// ---------------------------------------------------------------------------

/// The assembled prompt, the generated answer, and bookkeeping counters for
/// one solved task. Created once per task; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct SolutionArtifact {
    /// Full prompt text sent to the generation collaborator.
    pub prompt: String,
    /// Generated answer, or an error placeholder when generation failed.
    pub answer: String,
    /// Number of supplementary fragments embedded in the prompt.
    pub supplementary_parts: usize,
    /// Prompt length in bytes.
    pub prompt_len: usize,
    /// Where the prompt was persisted, if the write succeeded.
    pub prompt_path: Option<PathBuf>,
    /// Where the answer was persisted, if generation and the write succeeded.
    pub answer_path: Option<PathBuf>,
}
