//! Application configuration for SEO Studio.
//!
//! User config lives at `~/.seostudio/seostudio.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeoStudioError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "seostudio.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".seostudio";

// ---------------------------------------------------------------------------
// Config structs (matching seostudio.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Model backend settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Refinement loop settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Crawler HTTP settings.
    #[serde(default)]
    pub crawl: CrawlConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Project database path.
    #[serde(default = "default_database")]
    pub database: String,

    /// Maximum characters of scraped body text passed as page context.
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,

    /// Rows appended per store write during a crawl.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            context_chars: default_context_chars(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_database() -> String {
    "~/.seostudio/projects.db".into()
}
fn default_context_chars() -> usize {
    5000
}
fn default_batch_size() -> usize {
    25
}

/// What happens when a resolved backend fails at call time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// Stay on the backend chosen at resolution; failures surface as-is.
    #[default]
    Pinned,
    /// On a failed call, construct the next identifier in preference order and
    /// retry the same prompt with it.
    ReResolve,
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the generative language API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifiers in preference order.
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// Per-request timeout. Unset means the call may block indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Call-time fallback behavior.
    #[serde(default)]
    pub fallback: FallbackPolicy,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            models: default_models(),
            request_timeout_secs: None,
            fallback: FallbackPolicy::default(),
        }
    }
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_models() -> Vec<String> {
    vec![
        "gemini-flash-latest".into(),
        "gemini-pro-latest".into(),
        "gemini-1.5-flash".into(),
        "gemini-pro".into(),
    ]
}

/// How critique feedback is turned into scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreParsing {
    /// Every standalone 0–10 integer in the text; the first four are the scores.
    #[default]
    Lenient,
    /// Only the `SCORES: [a, b, c, d]` line is read.
    Strict,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Critique/revision iteration cap.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default)]
    pub score_parsing: ScoreParsing,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            score_parsing: ScoreParsing::default(),
        }
    }
}

fn default_max_iterations() -> u32 {
    3
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Browser-like User-Agent; many sites refuse bare clients.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// `Accept-Language` header sent with link discovery requests.
    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// Path suffixes that are never treated as pages.
    #[serde(default = "default_skip_extensions")]
    pub skip_extensions: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            skip_extensions: default_skip_extensions(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/119.0.0.0 Safari/537.36"
        .into()
}
fn default_accept_language() -> String {
    "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7".into()
}
fn default_skip_extensions() -> Vec<String> {
    [".pdf", ".docx", ".xlsx", ".png", ".jpg", ".jpeg", ".zip"]
        .into_iter()
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.seostudio/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SeoStudioError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.seostudio/seostudio.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| SeoStudioError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SeoStudioError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SeoStudioError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SeoStudioError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SeoStudioError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the API key from the env var named in the config.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.llm.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(SeoStudioError::config(format!(
            "Gemini API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Check that the API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    resolve_api_key(config).map(|_| ())
}

/// Expand a leading `~/` against the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
