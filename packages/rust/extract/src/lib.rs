//! Main-content extraction from raw markup.
//!
//! Given a markup string this crate isolates the main body text, enumerates
//! outbound link URLs (resolved to absolute form), and recognizes embedded
//! video identifiers, discarding navigation and other boilerplate. A URL
//! that resolves to a video identifier is never reported as a link — the
//! classification is mutually exclusive.

pub mod video;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

pub use video::resolve_video_id;

/// Elements whose subtrees never contribute text or links.
const STRIP_TAGS: [&str; 10] = [
    "script", "style", "nav", "footer", "header", "aside", "form", "button", "input", "noscript",
];

/// Main-content selectors, tried in order. Code/gist containers come first
/// so that pages embedding source files surface the file body rather than
/// the hosting chrome around it.
const CONTENT_SELECTORS: [&str; 13] = [
    ".file-box .file-data",
    ".highlight",
    ".file .data",
    ".blob-code-content",
    "article.user_content",
    "div.user_content",
    "div#content",
    "main",
    "div.content",
    "div.assignment-description",
    ".markdown-body",
    ".post-content",
    ".entry-content",
];

// ---------------------------------------------------------------------------
// ExtractedDescription
// ---------------------------------------------------------------------------

/// Output of a single extraction pass.
#[derive(Debug, Clone, Default)]
pub struct ExtractedDescription {
    /// Cleaned main-content text: line-trimmed, blank lines removed.
    pub text: String,
    /// Outbound link URLs in document order, resolved to absolute form.
    pub links: Vec<String>,
    /// Recognized video identifiers in document order, deduplicated.
    pub video_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract cleaned text, outbound links, and video identifiers from markup.
///
/// `base_url` is used to resolve relative hrefs to absolute form. In-page
/// anchors and script-pseudo-URLs are dropped.
pub fn extract(html: &str, base_url: &Url) -> ExtractedDescription {
    if html.trim().is_empty() {
        return ExtractedDescription::default();
    }

    let doc = Html::parse_document(html);

    let text = extract_text(&doc);
    let (links, video_ids) = extract_references(&doc, base_url);

    debug!(
        text_len = text.len(),
        links = links.len(),
        videos = video_ids.len(),
        "extraction complete"
    );

    ExtractedDescription {
        text,
        links,
        video_ids,
    }
}

/// Select the main-content region and collect its cleaned text.
///
/// The first selector with any match wins; multiple matches are concatenated
/// in document order. With no match at all, the document body is used.
fn extract_text(doc: &Html) -> String {
    let mut region: Vec<ElementRef> = Vec::new();

    for sel_str in &CONTENT_SELECTORS {
        let selector = Selector::parse(sel_str).expect("valid content selector");
        let matches: Vec<ElementRef> = doc
            .select(&selector)
            .filter(|el| !in_stripped_subtree(el))
            .collect();
        if !matches.is_empty() {
            region = matches;
            break;
        }
    }

    if region.is_empty() {
        let body_sel = Selector::parse("body").expect("valid selector");
        region = doc.select(&body_sel).collect();
    }

    let mut parts: Vec<String> = Vec::new();
    if region.is_empty() {
        collect_text(doc.root_element(), &mut parts);
    } else {
        for el in region {
            collect_text(el, &mut parts);
        }
    }

    parts
        .join("\n")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Recursively gather text nodes, skipping stripped subtrees.
fn collect_text(el: ElementRef<'_>, parts: &mut Vec<String>) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            parts.push(text.text.to_string());
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if !STRIP_TAGS.contains(&child_el.value().name()) {
                collect_text(child_el, parts);
            }
        }
    }
}

/// True if any ancestor is a stripped element.
fn in_stripped_subtree(el: &ElementRef<'_>) -> bool {
    el.ancestors().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|e| STRIP_TAGS.contains(&e.name()))
    })
}

/// Harvest anchors and embedded frames into (links, video_ids).
fn extract_references(doc: &Html, base_url: &Url) -> (Vec<String>, Vec<String>) {
    let mut links: Vec<String> = Vec::new();
    let mut video_ids: Vec<String> = Vec::new();

    let anchor_sel = Selector::parse("a[href]").expect("valid selector");
    for el in doc.select(&anchor_sel) {
        if in_stripped_subtree(&el) {
            continue;
        }
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.to_lowercase().starts_with("javascript:")
        {
            continue;
        }

        if let Some(id) = resolve_video_id(href) {
            push_unique(&mut video_ids, id);
        } else {
            match base_url.join(href) {
                Ok(resolved) => links.push(resolved.to_string()),
                Err(e) => warn!(href, error = %e, "could not form absolute URL for link"),
            }
        }
    }

    let iframe_sel = Selector::parse("iframe[src]").expect("valid selector");
    for el in doc.select(&iframe_sel) {
        if in_stripped_subtree(&el) {
            continue;
        }
        if let Some(src) = el.value().attr("src") {
            if let Some(id) = resolve_video_id(src.trim()) {
                push_unique(&mut video_ids, id);
            }
        }
    }

    (links, video_ids)
}

/// Append preserving first-seen order; reference lists are small.
fn push_unique(ids: &mut Vec<String>, id: String) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}
