//! Bounded resource fetching for studybundle.
//!
//! This crate provides:
//! - [`BoundedFetcher`] — streams remote resources to local storage under a
//!   hard size ceiling and a per-download time budget
//! - [`FetchedResource`] / [`ContentKind`] — the owning handle to a download
//!   and its inferred content kind

pub mod fetcher;
pub mod resource;

pub use fetcher::BoundedFetcher;
pub use resource::{ContentKind, FetchedResource};
