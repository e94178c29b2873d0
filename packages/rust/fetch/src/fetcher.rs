//! Size- and time-bounded resource downloads.
//!
//! Each download streams to local storage under a global byte ceiling and a
//! per-download time budget. Declared content lengths are checked before any
//! byte is written, and the cumulative size is re-checked mid-stream because
//! declared lengths may be absent or wrong; on overage the partial file is
//! deleted. Every failure mode maps to a distinct [`FetchError`] variant.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::LazyLock;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use regex::Regex;
use reqwest::Client;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use url::Url;

use studybundle_extract::resolve_video_id;
use studybundle_shared::{ActivityNotifier, FetchError, Result, StudyBundleError};

use crate::resource::{ContentKind, FetchedResource};

/// User-Agent string for download requests.
const USER_AGENT: &str = concat!("studybundle/", env!("CARGO_PKG_VERSION"));

static DISPOSITION_FILENAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"filename="?([^";]+)"?"#).expect("valid regex"));

static UNSAFE_FILENAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("valid regex"));

// ---------------------------------------------------------------------------
// BoundedFetcher
// ---------------------------------------------------------------------------

/// Retrieves remote resources under a hard size ceiling and time budget.
///
/// One fetcher (and its connection pool) is shared read-only across all
/// concurrent downloads of an aggregation run.
pub struct BoundedFetcher {
    client: Client,
    downloads_dir: PathBuf,
    max_bytes: u64,
    notifier: Arc<dyn ActivityNotifier>,
}

impl BoundedFetcher {
    /// Create a fetcher writing into `downloads_dir`.
    pub fn new(
        downloads_dir: impl Into<PathBuf>,
        max_bytes: u64,
        timeout: Duration,
        notifier: Arc<dyn ActivityNotifier>,
    ) -> Result<Self> {
        let downloads_dir = downloads_dir.into();
        std::fs::create_dir_all(&downloads_dir)
            .map_err(|e| StudyBundleError::io(&downloads_dir, e))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()
            .map_err(|e| {
                StudyBundleError::config(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            downloads_dir,
            max_bytes,
            notifier,
        })
    }

    /// Download `url` to local storage, enforcing the size ceiling.
    ///
    /// Video references and non-fetchable schemes are rejected without a
    /// request. Any HTTP status >= 400 is a non-fatal per-item failure.
    #[instrument(skip(self))]
    pub async fn download(&self, url: &str) -> std::result::Result<FetchedResource, FetchError> {
        if resolve_video_id(url).is_some()
            || url.starts_with("data:")
            || url.starts_with("mailto:")
        {
            self.notifier
                .notify(&format!("Skipping_download_{}", truncate_label(url, 50)));
            return Err(FetchError::Unfetchable { url: url.into() });
        }

        self.notifier.notify(&format!("Downloading_{url}"));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_transport_error(url, &e))?;

        let status = response.status().as_u16();
        if status >= 400 {
            warn!(url, status, "download failed with error status");
            self.notifier
                .notify(&format!("Download_failed_HTTP_{status}_{url}"));
            return Err(FetchError::BadStatus {
                url: url.into(),
                status,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        // Declared-length check happens before any byte hits the disk.
        if let Some(declared) = response.content_length() {
            if declared > self.max_bytes {
                warn!(url, declared, limit = self.max_bytes, "declared length over ceiling");
                self.notifier
                    .notify(&format!("Download_failed_too_large_{url}"));
                return Err(FetchError::Oversize {
                    url: url.into(),
                    limit: self.max_bytes,
                });
            }
        }

        let filename = derive_filename(url, disposition.as_deref(), &content_type);
        let path = self
            .downloads_dir
            .join(format!("{}_{filename}", Utc::now().timestamp()));

        debug!(url, path = %path.display(), "streaming download");

        let stream = Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| classify_transport_error(url, &e))),
        );

        let written = match write_bounded(stream, &path, self.max_bytes, url).await {
            Ok(written) => written,
            Err(e) => {
                let tag = match &e {
                    FetchError::Oversize { .. } => "Download_failed_exceeded_size",
                    FetchError::Timeout { .. } => "Download_timeout",
                    _ => "Download_network_error",
                };
                self.notifier.notify(&format!("{tag}_{url}"));
                return Err(e);
            }
        };

        self.notifier
            .notify(&format!("Downloaded_file_{filename}_size_{written}"));
        info!(url, bytes = written, path = %path.display(), "download complete");

        let kind = ContentKind::from_path(&path);
        Ok(FetchedResource {
            path,
            url: url.to_string(),
            bytes: written,
            kind,
        })
    }
}

// ---------------------------------------------------------------------------
// Bounded stream-to-file
// ---------------------------------------------------------------------------

/// Stream chunks to `path`, aborting the moment the cumulative size exceeds
/// `max_bytes`. The partial file never survives a failed write.
pub(crate) async fn write_bounded<S>(
    mut stream: S,
    path: &Path,
    max_bytes: u64,
    url: &str,
) -> std::result::Result<u64, FetchError>
where
    S: Stream<Item = std::result::Result<Bytes, FetchError>> + Unpin,
{
    let mut file = tokio::fs::File::create(path).await.map_err(|e| {
        FetchError::Network {
            url: url.into(),
            message: format!("cannot create {}: {e}", path.display()),
        }
    })?;

    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(path).await;
                return Err(e);
            }
        };

        written += chunk.len() as u64;
        if written > max_bytes {
            drop(file);
            let _ = tokio::fs::remove_file(path).await;
            return Err(FetchError::Oversize {
                url: url.into(),
                limit: max_bytes,
            });
        }

        if let Err(e) = file.write_all(&chunk).await {
            drop(file);
            let _ = tokio::fs::remove_file(path).await;
            return Err(FetchError::Network {
                url: url.into(),
                message: format!("write failed: {e}"),
            });
        }
    }

    file.flush().await.map_err(|e| FetchError::Network {
        url: url.into(),
        message: format!("flush failed: {e}"),
    })?;

    Ok(written)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a transport error onto the fetch taxonomy.
fn classify_transport_error(url: &str, e: &reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout { url: url.into() }
    } else {
        FetchError::Network {
            url: url.into(),
            message: e.to_string(),
        }
    }
}

/// Derive a safe local filename from a content-disposition hint or the URL
/// path, appending an extension inferred from the content type if absent.
fn derive_filename(url: &str, disposition: Option<&str>, content_type: &str) -> String {
    let raw = disposition
        .and_then(|d| DISPOSITION_FILENAME_RE.captures(d))
        .map(|caps| caps[1].to_string())
        .or_else(|| {
            Url::parse(url).ok().and_then(|u| {
                u.path_segments()
                    .and_then(|segments| {
                        segments.filter(|s| !s.is_empty()).last().map(String::from)
                    })
            })
        })
        .unwrap_or_else(|| "downloaded_file".into());

    let mut name = UNSAFE_FILENAME_RE.replace_all(&raw, "_").into_owned();
    if name.is_empty() {
        name = "downloaded_file".into();
    }

    if Path::new(&name).extension().is_none() {
        name.push_str(extension_for(content_type));
    }
    name
}

/// Pick an extension for a declared content type.
fn extension_for(content_type: &str) -> &'static str {
    if content_type.contains("html") {
        ".html"
    } else if content_type.contains("json") {
        ".json"
    } else if content_type.contains("text") {
        ".txt"
    } else {
        ".dat"
    }
}

/// Shorten a URL for activity labels.
fn truncate_label(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use futures_util::stream;
    use studybundle_shared::SilentActivity;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn fetcher(dir: &Path, max_bytes: u64, timeout_ms: u64) -> BoundedFetcher {
        BoundedFetcher::new(
            dir,
            max_bytes,
            Duration::from_millis(timeout_ms),
            Arc::new(SilentActivity),
        )
        .expect("fetcher")
    }

    fn dir_entries(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .expect("read dir")
            .map(|e| e.expect("entry").path())
            .collect()
    }

    // --- filename derivation ---

    #[test]
    fn filename_from_content_disposition() {
        let name = derive_filename(
            "https://example.com/dl?id=7",
            Some(r#"attachment; filename="week one notes.txt""#),
            "text/plain",
        );
        assert_eq!(name, "week_one_notes.txt");
    }

    #[test]
    fn filename_from_url_path() {
        let name = derive_filename("https://example.com/files/paper.pdf", None, "application/pdf");
        assert_eq!(name, "paper.pdf");
    }

    #[test]
    fn filename_fallback_and_extension_inference() {
        let name = derive_filename("https://example.com/", None, "text/html; charset=utf-8");
        assert_eq!(name, "downloaded_file.html");

        let name = derive_filename("https://example.com/api/data", None, "application/json");
        assert_eq!(name, "data.json");

        let name = derive_filename("https://example.com/blob", None, "application/octet-stream");
        assert_eq!(name, "blob.dat");
    }

    // --- bounded writer ---

    #[tokio::test]
    async fn write_bounded_accepts_stream_within_ceiling() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ok.txt");

        let chunks: Vec<std::result::Result<Bytes, FetchError>> =
            vec![Ok(Bytes::from_static(b"hello ")), Ok(Bytes::from_static(b"world"))];
        let written = write_bounded(stream::iter(chunks), &path, 64, "https://x.example")
            .await
            .expect("within ceiling");

        assert_eq!(written, 11);
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "hello world");
    }

    #[tokio::test]
    async fn write_bounded_aborts_mid_stream_and_deletes_partial() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("big.dat");

        // No declared length: the overage is only observable mid-stream.
        let chunks: Vec<std::result::Result<Bytes, FetchError>> = vec![
            Ok(Bytes::from(vec![0u8; 8])),
            Ok(Bytes::from(vec![0u8; 8])),
            Ok(Bytes::from(vec![0u8; 8])),
        ];
        let result = write_bounded(stream::iter(chunks), &path, 16, "https://x.example").await;

        assert!(matches!(result, Err(FetchError::Oversize { .. })));
        assert!(!path.exists(), "partial file must not survive");
    }

    // --- download behavior ---

    #[tokio::test]
    async fn download_rejects_video_and_non_fetchable_urls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fetcher = fetcher(dir.path(), 1024, 1000);

        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "data:text/plain;base64,aGk=",
            "mailto:prof@example.edu",
        ] {
            let result = fetcher.download(url).await;
            assert!(matches!(result, Err(FetchError::Unfetchable { .. })), "{url}");
        }
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn download_maps_error_status_to_bad_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let fetcher = fetcher(dir.path(), 1024, 1000);

        let result = fetcher.download(&format!("{}/missing", server.uri())).await;
        assert!(matches!(
            result,
            Err(FetchError::BadStatus { status: 404, .. })
        ));
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn download_streams_body_to_disk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/syllabus.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/plain")
                    .set_body_string("Week 1: ownership"),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let fetcher = fetcher(dir.path(), 1024, 1000);

        let resource = fetcher
            .download(&format!("{}/syllabus.txt", server.uri()))
            .await
            .expect("download succeeds");

        assert_eq!(resource.kind, ContentKind::PlainText);
        assert_eq!(resource.bytes, 17);
        assert!(resource.file_name().ends_with("syllabus.txt"));
        assert_eq!(
            std::fs::read_to_string(&resource.path).expect("read"),
            "Week 1: ownership"
        );
    }

    #[tokio::test]
    async fn download_rejects_declared_oversize_before_writing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/huge.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let fetcher = fetcher(dir.path(), 128, 1000);

        let result = fetcher.download(&format!("{}/huge.bin", server.uri())).await;
        assert!(matches!(result, Err(FetchError::Oversize { limit: 128, .. })));
        assert!(dir_entries(dir.path()).is_empty(), "no bytes may be written");
    }

    #[tokio::test]
    async fn download_times_out_within_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let fetcher = fetcher(dir.path(), 1024, 50);

        let result = fetcher.download(&format!("{}/slow", server.uri())).await;
        assert!(matches!(result, Err(FetchError::Timeout { .. })));
    }
}
