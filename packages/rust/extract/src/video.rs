//! Video identifier resolution.
//!
//! Pure and stateless: a URL either denotes a recognized video-hosting
//! pattern, in which case the 11-character identifier is extracted, or it
//! does not. No network access, same input always yields the same output.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Hosts recognized as video sources. `googleusercontent.com` is the CDN
/// path alias for youtube.com links rewritten by some platforms.
const VIDEO_HOSTS: [&str; 3] = ["youtube.com", "youtu.be", "googleusercontent.com"];

/// Ordered identifier patterns; the first capture wins.
static ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?:youtube\.com/(?:watch\?(?:[^&]*&)*v=|embed/|v/|shorts/|live/))([A-Za-z0-9_-]{11})",
        r"(?:youtu\.be/)([A-Za-z0-9_-]{11})",
        r"(?:googleusercontent\.com/youtube\.com/(?:watch\?(?:[^&]*&)*v=|embed/|v/))([A-Za-z0-9_-]{11})",
        r"(?:youtube\.com/.*[?&]v=)([A-Za-z0-9_-]{11})",
        r"(?:googleusercontent\.com/youtube\.com/.*[?&]v=)([A-Za-z0-9_-]{11})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid video-id pattern"))
    .collect()
});

/// Resolve a URL to a normalized video identifier, if it denotes a
/// recognized video-hosting pattern.
///
/// Returns `None` for non-http(s) schemes, unrecognized hosts, and URLs
/// whose structure matches no known pattern.
pub fn resolve_video_id(url: &str) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = Url::parse(trimmed).ok()?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }

    let host = parsed.host_str()?.to_ascii_lowercase();
    if !VIDEO_HOSTS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
    {
        return None;
    }

    for pattern in ID_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(trimmed) {
            if let Some(id) = caps.get(1) {
                return Some(id.as_str().to_string());
            }
        }
    }
    None
}
