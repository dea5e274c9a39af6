//! Configuration for fakao.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (DEEPSEEK_API_KEY, FAKAO_HOME, FAKAO_BASE_URL, FAKAO_MODEL)
//! 2. Config file (.fakao/config.yaml)
//! 3. Defaults (~/.fakao, https://api.deepseek.com, deepseek-reasoner)
//!
//! Config file discovery:
//! - Searches current directory and parents for .fakao/config.yaml
//! - `history.home` in the config file is relative to the .fakao/ directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::{BoundaryMode, CaseLimits};
use crate::history::{JsonFileStorage, DEFAULT_KEY, DEFAULT_MAX_ENTRIES};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Environment variables checked for the API key, in priority order
pub const API_KEY_VARS: [&str; 3] = ["DEEPSEEK_API_KEY", "DEEPSEEK_APIKEY", "OPENAI_API_KEY"];

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub limits: CaseLimits,
    #[serde(default)]
    pub assembly: AssemblyConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssemblyConfig {
    #[serde(default)]
    pub boundary: BoundaryMode,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryConfig {
    /// State directory (relative to the .fakao/ directory)
    pub home: Option<String>,
    /// Storage key, used as the file stem
    pub key: Option<String>,
    pub max_entries: Option<usize>,
}

/// Completion endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    /// End-to-end request timeout, enforced by the session
    pub request_timeout_seconds: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com".to_string(),
            model: "deepseek-reasoner".to_string(),
            temperature: 0.7,
            request_timeout_seconds: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistorySettings {
    pub key: String,
    pub max_entries: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY.to_string(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// An API key and the variable it came from. Never printed in full.
#[derive(Clone, PartialEq)]
pub struct ApiKey {
    pub var: &'static str,
    value: String,
}

impl ApiKey {
    pub fn new(var: &'static str, value: impl Into<String>) -> Self {
        Self {
            var,
            value: value.into(),
        }
    }

    pub fn expose(&self) -> &str {
        &self.value
    }

    /// First seven characters followed by "..."
    pub fn redacted(&self) -> String {
        let prefix: String = self.value.chars().take(7).collect();
        format!("{}...", prefix)
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("var", &self.var)
            .field("value", &self.redacted())
            .finish()
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to the state directory
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub provider: ProviderSettings,
    pub limits: CaseLimits,
    pub boundary: BoundaryMode,
    pub history: HistorySettings,
    /// First API key variable that is set
    pub api_key: Option<ApiKey>,
}

impl ResolvedConfig {
    /// File storage for the history list
    pub fn history_storage(&self) -> JsonFileStorage {
        JsonFileStorage::new(&self.home, &self.history.key)
    }
}

/// Find the first set, non-empty API key variable
pub fn resolve_api_key(lookup: impl Fn(&str) -> Option<String>) -> Option<ApiKey> {
    API_KEY_VARS.iter().find_map(|&var| {
        lookup(var)
            .filter(|value| !value.trim().is_empty())
            .map(|value| ApiKey::new(var, value.trim()))
    })
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".fakao").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from the process environment and working directory
fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().ok();
    load_config_from(|var| std::env::var(var).ok(), cwd.as_deref())
}

/// Load configuration from an explicit environment and search start
fn load_config_from(
    env: impl Fn(&str) -> Option<String>,
    start_dir: Option<&Path>,
) -> Result<ResolvedConfig> {
    let config_file = start_dir.and_then(find_config_file);
    let file = match config_file {
        Some(ref path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    // Resolve home path
    let home = if let Some(env_home) = env("FAKAO_HOME") {
        PathBuf::from(env_home)
    } else if let (Some(home_path), Some(config_path)) = (&file.history.home, &config_file) {
        let fakao_dir = config_path.parent().unwrap_or(Path::new("."));
        resolve_path(fakao_dir, home_path)
    } else {
        dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(".fakao")
    };

    let defaults = ProviderSettings::default();
    let provider = ProviderSettings {
        base_url: env("FAKAO_BASE_URL")
            .or(file.provider.base_url)
            .unwrap_or(defaults.base_url),
        model: env("FAKAO_MODEL")
            .or(file.provider.model)
            .unwrap_or(defaults.model),
        temperature: file.provider.temperature.unwrap_or(defaults.temperature),
        request_timeout_seconds: file
            .provider
            .request_timeout_seconds
            .unwrap_or(defaults.request_timeout_seconds),
    };

    if file.limits.min_case_chars > file.limits.max_case_chars {
        anyhow::bail!(
            "Invalid limits: min_case_chars ({}) exceeds max_case_chars ({})",
            file.limits.min_case_chars,
            file.limits.max_case_chars
        );
    }

    let history = HistorySettings {
        key: file.history.key.unwrap_or_else(|| DEFAULT_KEY.to_string()),
        max_entries: file.history.max_entries.unwrap_or(DEFAULT_MAX_ENTRIES),
    };

    Ok(ResolvedConfig {
        home,
        config_file,
        provider,
        limits: file.limits,
        boundary: file.assembly.boundary,
        history,
        api_key: resolve_api_key(env),
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the fakao state directory
pub fn fakao_home() -> Result<PathBuf> {
    Ok(config()?.home.clone())
}
