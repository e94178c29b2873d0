//! Content-kind dispatch for downloaded resources.
//!
//! Markup is re-extracted and summarized; text-like kinds are returned
//! verbatim (oversized plain text is deliberately left for the final prompt
//! to absorb); recognized binary kinds and unknown kinds yield diagnostic
//! placeholders. The interpreter owns the resource handle: the file is
//! deleted after successful extraction and retained on failure for diagnosis.

use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tracing::{instrument, warn};
use url::Url;

use studybundle_fetch::{ContentKind, FetchedResource};
use studybundle_shared::ActivityNotifier;

use crate::summarize::Summarizer;

/// How many bytes of an unrecognized file are surfaced as a sample.
const UNKNOWN_SAMPLE_BYTES: u64 = 2048;

/// Turns a downloaded resource into its text representation.
#[derive(Clone)]
pub struct FileInterpreter {
    summarizer: Summarizer,
    notifier: Arc<dyn ActivityNotifier>,
}

impl FileInterpreter {
    pub fn new(summarizer: Summarizer, notifier: Arc<dyn ActivityNotifier>) -> Self {
        Self {
            summarizer,
            notifier,
        }
    }

    /// Produce the text representation of `resource`.
    ///
    /// Never fails: every failure mode becomes a placeholder string naming
    /// the file and URL.
    #[instrument(skip(self, resource), fields(file = %resource.file_name(), url = original_url))]
    pub async fn interpret(&self, resource: FetchedResource, original_url: &str) -> String {
        let name = resource.file_name();

        if !resource.path.exists() {
            return format!("[File not found: {}]", resource.path.display());
        }

        self.notifier
            .notify(&format!("Reading_file_{name}_url_{original_url}"));

        // Zero-byte files short-circuit without attempting any parse.
        if resource.bytes == 0 {
            let placeholder = format!("[Empty file: {name} from {original_url}]");
            resource.delete().await;
            return placeholder;
        }

        match resource.kind {
            ContentKind::Markup => self.interpret_markup(resource, original_url).await,
            ContentKind::PlainText => self.interpret_plain_text(resource).await,
            ContentKind::Pdf => {
                // Recognized but unimplemented; file retained for diagnosis.
                format!("[PDF File: {name} from {original_url} - PDF extraction not implemented]")
            }
            ContentKind::WordDoc => format!(
                "[Word Document: {name} from {original_url} - Word extraction not implemented]"
            ),
            ContentKind::Unknown => self.sample_unknown(resource).await,
        }
    }

    /// Re-run content extraction on markup, then summarize.
    async fn interpret_markup(&self, resource: FetchedResource, original_url: &str) -> String {
        let name = resource.file_name();

        let bytes = match tokio::fs::read(&resource.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = %name, error = %e, "could not read downloaded markup");
                return format!("[Error reading/processing file: {name} - {e}]");
            }
        };
        let html = String::from_utf8_lossy(&bytes);

        if html.trim().is_empty() {
            let placeholder = format!("[Empty HTML file: {name}]");
            resource.delete().await;
            return placeholder;
        }

        self.notifier
            .notify(&format!("Processing_html_file_{name}_length_{}", html.len()));

        let Ok(base) = Url::parse(original_url) else {
            return format!("[Error reading/processing file: {name} - invalid source URL]");
        };

        let extracted = studybundle_extract::extract(&html, &base);
        if extracted.text.trim().is_empty() {
            warn!(file = %name, raw_len = html.len(), "no text extracted from markup");
            return format!(
                "[No text content extracted from HTML: {name}. Raw HTML length: {}]",
                html.len()
            );
        }

        self.notifier.notify(&format!(
            "Extracted_text_from_html_{name}_length_{}",
            extracted.text.len()
        ));

        let summary = self.summarizer.summarize(&extracted.text).await;
        self.notifier
            .notify(&format!("Summarized_html_{name}_length_{}", summary.len()));

        resource.delete().await;
        summary
    }

    /// Text-like kinds are returned verbatim; summarization of oversized
    /// plain text is deferred to prompt assembly.
    async fn interpret_plain_text(&self, resource: FetchedResource) -> String {
        let name = resource.file_name();
        match tokio::fs::read(&resource.path).await {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes).into_owned();
                self.notifier
                    .notify(&format!("Read_text_file_{name}_length_{}", content.len()));
                resource.delete().await;
                content
            }
            Err(e) => {
                warn!(file = %name, error = %e, "could not read downloaded text file");
                format!("[Error reading/processing file: {name} - {e}]")
            }
        }
    }

    /// Surface a bounded sample of an unrecognized kind.
    async fn sample_unknown(&self, resource: FetchedResource) -> String {
        let name = resource.file_name();
        let mut sample = Vec::new();
        let read = async {
            let file = tokio::fs::File::open(&resource.path).await?;
            file.take(UNKNOWN_SAMPLE_BYTES).read_to_end(&mut sample).await
        }
        .await;

        match read {
            Ok(_) => {
                let sample = String::from_utf8_lossy(&sample);
                format!("[Unknown file type content sample from {name}]:\n{sample}")
            }
            Err(e) => {
                warn!(file = %name, error = %e, "could not sample unknown file");
                format!("[Error reading/processing file: {name} - {e}]")
            }
        }
    }
}
