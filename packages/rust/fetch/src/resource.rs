//! Downloaded resource handle and content-kind inference.

use std::path::{Path, PathBuf};

use tracing::warn;

// ---------------------------------------------------------------------------
// ContentKind
// ---------------------------------------------------------------------------

/// Inferred content kind of a downloaded resource, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Hypertext markup — re-extracted and summarized downstream.
    Markup,
    /// Text-like formats returned verbatim (text, markdown, code,
    /// structured data, style sheets, tabular, rich text).
    PlainText,
    /// Page-layout document; recognized but extraction is not implemented.
    Pdf,
    /// Word-processor document; recognized but extraction is not implemented.
    WordDoc,
    /// Anything else — only a bounded sample is surfaced.
    Unknown,
}

impl ContentKind {
    /// Infer the kind from a lowercase file extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "html" | "htm" => Self::Markup,
            "txt" | "md" | "py" | "js" | "json" | "xml" | "css" | "csv" | "rtf" => Self::PlainText,
            "pdf" => Self::Pdf,
            "doc" | "docx" => Self::WordDoc,
            _ => Self::Unknown,
        }
    }

    /// Infer the kind from a path's extension.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| Self::from_extension(&e.to_ascii_lowercase()))
            .unwrap_or(Self::Unknown)
    }
}

// ---------------------------------------------------------------------------
// FetchedResource
// ---------------------------------------------------------------------------

/// Owning handle to a downloaded resource on local storage.
///
/// The interpretation step consumes the handle exclusively; after successful
/// text extraction the file is deleted, and it is retained only when
/// interpretation fails, for diagnosis.
#[derive(Debug)]
pub struct FetchedResource {
    /// Location on local storage.
    pub path: PathBuf,
    /// Originating URL.
    pub url: String,
    /// Bytes written to local storage.
    pub bytes: u64,
    /// Inferred content kind.
    pub kind: ContentKind,
}

impl FetchedResource {
    /// File name component of the storage location.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Remove the file from local storage, consuming the handle.
    pub async fn delete(self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn!(path = %self.path.display(), error = %e, "could not delete downloaded file");
        }
    }
}
