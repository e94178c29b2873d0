//! Application configuration for studybundle.
//!
//! User config lives at `~/.studybundle/studybundle.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are referenced by environment variable name and never stored.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StudyBundleError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "studybundle.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".studybundle";

// ---------------------------------------------------------------------------
// Config structs (matching studybundle.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Task source (LMS) settings.
    #[serde(default)]
    pub lms: LmsConfig,

    /// Generation collaborator settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Download and summarization limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory where prompt/answer artifacts are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Scratch directory for downloaded resources.
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            downloads_dir: default_downloads_dir(),
        }
    }
}

fn default_output_dir() -> String {
    ".".into()
}
fn default_downloads_dir() -> String {
    "downloads".into()
}

/// `[lms]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmsConfig {
    /// Base URL of the task source API.
    #[serde(default)]
    pub base_url: String,

    /// Name of the env var holding the API token (never store the token itself).
    #[serde(default = "default_lms_token_env")]
    pub api_token_env: String,
}

impl Default for LmsConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_token_env: default_lms_token_env(),
        }
    }
}

fn default_lms_token_env() -> String {
    "STUDYBUNDLE_LMS_TOKEN".into()
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible completion API.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,

    /// Model used for summarization and reflective questions.
    #[serde(default = "default_summary_model")]
    pub summary_model: String,

    /// Model used for solution generation.
    #[serde(default = "default_solver_model")]
    pub solver_model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key_env: default_llm_key_env(),
            summary_model: default_summary_model(),
            solver_model: default_solver_model(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_llm_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_summary_model() -> String {
    "gpt-4o-mini".into()
}
fn default_solver_model() -> String {
    "gpt-4o".into()
}

/// `[limits]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Hard ceiling for a single downloaded resource, in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Per-download time budget, in seconds.
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Word ceiling above which text is summarized.
    #[serde(default = "default_summary_max_words")]
    pub summary_max_words: usize,

    /// Maximum concurrent per-item operations (0 = unbounded fan-out).
    #[serde(default)]
    pub max_concurrency: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            download_timeout_secs: default_download_timeout_secs(),
            summary_max_words: default_summary_max_words(),
            max_concurrency: 0,
        }
    }
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024
}
fn default_download_timeout_secs() -> u64 {
    30
}
fn default_summary_max_words() -> usize {
    500
}

// ---------------------------------------------------------------------------
// Pipeline limits (runtime, merged from config)
// ---------------------------------------------------------------------------

/// Runtime resource bounds handed to the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineLimits {
    /// Hard ceiling for a single downloaded resource, in bytes.
    pub max_file_size: u64,
    /// Per-download time budget.
    pub download_timeout: Duration,
    /// Word ceiling above which text is summarized.
    pub summary_max_words: usize,
    /// Maximum concurrent per-item operations (0 = unbounded fan-out).
    pub max_concurrency: usize,
}

impl From<&AppConfig> for PipelineLimits {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_file_size: config.limits.max_file_size,
            download_timeout: Duration::from_secs(config.limits.download_timeout_secs),
            summary_max_words: config.limits.summary_max_words,
            max_concurrency: config.limits.max_concurrency,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.studybundle/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| StudyBundleError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.studybundle/studybundle.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| StudyBundleError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        StudyBundleError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| StudyBundleError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| StudyBundleError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| StudyBundleError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a secret from the env var named in the config.
pub fn read_secret(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(StudyBundleError::config(format!(
            "secret not found: set the {var_name} environment variable"
        ))),
    }
}

/// Check that the generation collaborator API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    read_secret(&config.llm.api_key_env).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.limits.max_file_size, 50 * 1024 * 1024);
        assert_eq!(parsed.limits.download_timeout_secs, 30);
        assert_eq!(parsed.limits.summary_max_words, 500);
        assert_eq!(parsed.llm.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[lms]
base_url = "https://lms.example.edu"

[limits]
max_file_size = 1024
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.lms.base_url, "https://lms.example.edu");
        assert_eq!(config.limits.max_file_size, 1024);
        // Untouched sections keep their defaults
        assert_eq!(config.limits.summary_max_words, 500);
        assert_eq!(config.llm.solver_model, "gpt-4o");
    }

    #[test]
    fn pipeline_limits_from_app_config() {
        let app = AppConfig::default();
        let limits = PipelineLimits::from(&app);
        assert_eq!(limits.max_file_size, 50 * 1024 * 1024);
        assert_eq!(limits.download_timeout, Duration::from_secs(30));
        assert_eq!(limits.max_concurrency, 0);
    }

    #[test]
    fn missing_secret_is_config_error() {
        let result = read_secret("SB_TEST_NONEXISTENT_KEY_12345");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("SB_TEST_NONEXISTENT_KEY_12345")
        );
    }
}
