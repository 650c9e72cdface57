//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.bookshelf/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BookshelfConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CacheConfig {
    pub keep_unused_for_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    pub token_path: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_KEEP_UNUSED_FOR_SECS: u64 = 60;

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub keep_unused_for: Duration,
    /// None when no home directory exists and nothing was configured; the
    /// token then lives in memory for the life of the process.
    pub token_path: Option<PathBuf>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.bookshelf/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".bookshelf").join("config.toml"))
}

/// Load config from `~/.bookshelf/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `BookshelfConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<BookshelfConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(BookshelfConfig::default());
        }
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<BookshelfConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(BookshelfConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: BookshelfConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# Bookshelf Configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [api]
# base_url = "http://localhost:8000/api/v1/"   # Or set BOOKSHELF_BASE_URL
# timeout_secs = 30                             # Or set BOOKSHELF_TIMEOUT_SECS

# [cache]
# keep_unused_for_secs = 60     # How long unsubscribed query results are kept

# [storage]
# token_path = "/home/me/.bookshelf/secure/token"   # Or set BOOKSHELF_TOKEN_PATH
"#;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
///
/// `cli_base_url` is from the CLI flag (None = not specified).
pub fn resolve(config: &BookshelfConfig, cli_base_url: Option<&str>) -> ResolvedConfig {
    // Base URL: CLI → env → config → default
    let base_url = cli_base_url
        .map(|s| s.to_string())
        .or_else(|| std::env::var("BOOKSHELF_BASE_URL").ok())
        .or_else(|| config.api.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    // Timeout: env → config → default
    let timeout_secs = std::env::var("BOOKSHELF_TIMEOUT_SECS")
        .ok()
        .and_then(|s| match s.parse() {
            Ok(secs) => Some(secs),
            Err(_) => {
                warn!("Ignoring BOOKSHELF_TIMEOUT_SECS={s}: not a number");
                None
            }
        })
        .or(config.api.timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    // Token path: env → config → ~/.bookshelf/secure/token
    let token_path = std::env::var("BOOKSHELF_TOKEN_PATH")
        .ok()
        .or_else(|| config.storage.token_path.clone())
        .map(PathBuf::from)
        .or_else(crate::core::token_store::default_token_path);

    ResolvedConfig {
        base_url,
        timeout: Duration::from_secs(timeout_secs),
        keep_unused_for: Duration::from_secs(
            config
                .cache
                .keep_unused_for_secs
                .unwrap_or(DEFAULT_KEEP_UNUSED_FOR_SECS),
        ),
        token_path,
    }
}
