//! Application configuration for helpsync.
//!
//! User config lives at `~/.helpsync/helpsync.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HelpSyncError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "helpsync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".helpsync";

// ---------------------------------------------------------------------------
// Config structs (matching helpsync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Help-center catalog settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Indexing service settings.
    #[serde(default)]
    pub upload: UploadConfig,

    /// On-disk locations.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Help-center origin, e.g. `https://support.example.com`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Maximum number of articles processed per run.
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,

    /// Articles requested per listing page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Pause between listing pages.
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,

    /// Pause after each article body fetch.
    #[serde(default = "default_article_delay")]
    pub article_delay_ms: u64,

    #[serde(default = "default_list_timeout")]
    pub list_timeout_secs: u64,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_articles: default_max_articles(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay(),
            article_delay_ms: default_article_delay(),
            list_timeout_secs: default_list_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://support.optisigns.com".into()
}
fn default_max_articles() -> usize {
    40
}
fn default_page_size() -> usize {
    40
}
fn default_page_delay() -> u64 {
    1000
}
fn default_article_delay() -> u64 {
    500
}
fn default_list_timeout() -> u64 {
    10
}
fn default_fetch_timeout() -> u64 {
    15
}

/// `[upload]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Base URL of the files API (no trailing slash).
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// `purpose` form field sent with every file.
    #[serde(default = "default_purpose")]
    pub purpose: String,

    /// Maximum characters per reported chunk.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Pause after each uploaded file.
    #[serde(default = "default_upload_delay")]
    pub upload_delay_ms: u64,

    #[serde(default = "default_upload_timeout")]
    pub timeout_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_key_env: default_api_key_env(),
            purpose: default_purpose(),
            max_chunk_size: default_max_chunk_size(),
            upload_delay_ms: default_upload_delay(),
            timeout_secs: default_upload_timeout(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_purpose() -> String {
    "assistants".into()
}
fn default_max_chunk_size() -> usize {
    4000
}
fn default_upload_delay() -> u64 {
    500
}
fn default_upload_timeout() -> u64 {
    60
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one Markdown file per document.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory holding the fingerprint store, job log, and upload summary.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Maximum number of job log entries kept.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            state_dir: default_state_dir(),
            log_capacity: default_log_capacity(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_state_dir() -> PathBuf {
    PathBuf::from(".helpsync")
}
fn default_log_capacity() -> usize {
    30
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.helpsync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| HelpSyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.helpsync/helpsync.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| HelpSyncError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| HelpSyncError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| HelpSyncError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| HelpSyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| HelpSyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the indexing-service API key from the configured env var.
pub fn resolve_api_key(config: &UploadConfig) -> Result<String> {
    let var_name = &config.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(HelpSyncError::config(format!(
            "API key not found. Set the {var_name} environment variable \
             (or add it to a .env file in the working directory)."
        ))),
    }
}

/// Check that the API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    resolve_api_key(&config.upload).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("log_capacity = 30"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[source]
base_url = "https://help.example.com"
max_articles = 5

[storage]
data_dir = "/tmp/docs"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.source.base_url, "https://help.example.com");
        assert_eq!(config.source.max_articles, 5);
        assert_eq!(config.source.page_size, 40);
        assert_eq!(config.source.page_delay_ms, 1000);
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/docs"));
        assert_eq!(config.storage.state_dir, PathBuf::from(".helpsync"));
        assert_eq!(config.upload.max_chunk_size, 4000);
        assert_eq!(config.upload.purpose, "assistants");
    }

    #[test]
    fn empty_config_is_default() {
        let config: AppConfig = toml::from_str("").expect("parse empty");
        assert_eq!(config.source.max_articles, 40);
        assert_eq!(config.source.fetch_timeout_secs, 15);
        assert_eq!(config.upload.upload_delay_ms, 500);
        assert_eq!(config.storage.log_capacity, 30);
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.upload.api_key_env = "HELPSYNC_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
