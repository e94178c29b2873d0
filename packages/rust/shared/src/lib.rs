//! Shared types, error model, and configuration for studybundle.
//!
//! This crate is the foundation depended on by all other studybundle crates.
//! It provides:
//! - [`StudyBundleError`] — the unified error type, with the per-item
//!   [`FetchError`] and [`TranscriptError`] classifications
//! - Domain types ([`Task`], [`ContentFragment`], [`SolutionArtifact`])
//! - Configuration ([`AppConfig`], [`PipelineLimits`], config loading)
//! - The [`ActivityNotifier`] observation hook

pub mod config;
pub mod error;
pub mod notify;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, LimitsConfig, LlmConfig, LmsConfig, PipelineLimits, config_dir,
    config_file_path, init_config, load_config, load_config_from, read_secret, validate_api_key,
};
pub use error::{FetchError, Result, StudyBundleError, TranscriptError};
pub use notify::{ActivityNotifier, SilentActivity};
pub use types::{
    ContentFragment, Course, FragmentKind, NO_SUPPLEMENTARY_CONTENT, SolutionArtifact, Task,
    render_bundle,
};
