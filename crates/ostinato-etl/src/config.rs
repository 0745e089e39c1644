use anyhow::{Context, Result};
use ostinato_core::schema::ConflictPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for ostinato.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Config file (~/.config/ostinato/config.toml)
/// 3. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite database.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/ostinato/ostinato.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    /// Rows staged in memory before each transactional flush.
    ///
    /// One commit per batch, never one per row; per-row commits are
    /// the dominant cost at this data scale.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// What a re-import does when a composite key already exists.
    ///
    /// Applied uniformly to every entity table.
    #[serde(default)]
    pub on_conflict: ConflictPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            batch_size: default_batch_size(),
            on_conflict: ConflictPolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from the config file, falling back to
    /// defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        Ok(config)
    }

    /// Load configuration with a custom database path.
    ///
    /// This is used when the --db CLI flag is provided.
    pub fn load_with_db_path(db_path: PathBuf) -> Result<Self> {
        let mut config = Self::load()?;
        config.database_path = db_path;
        Ok(config)
    }
}

/// Get the default database path.
///
/// Returns: ~/.local/share/ostinato/ostinato.db (or platform equivalent)
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ostinato")
        .join("ostinato.db")
}

const fn default_batch_size() -> usize {
    1000
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/ostinato/config.toml
/// - macOS: ~/Library/Application Support/ostinato/config.toml
/// - Windows: %APPDATA%\ostinato\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ostinato")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Ostinato Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. This config file
# 3. Built-in defaults (lowest priority)

# Path to the SQLite database
#
# Can also be set via:
# - CLI: ostinato --db /custom/path.db import /data
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/ostinato.db"

# Rows per import transaction (one commit per batch)
#batch_size = 1000

# What a re-import does when a row with the same key already exists:
# "skip" keeps the stored row, "overwrite" updates it in place
#on_conflict = "skip"
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.database_path.as_os_str().is_empty());
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.on_conflict, ConflictPolicy::Skip);
    }

    #[test]
    fn test_config_toml_round_trip() {
        let raw = "batch_size = 50\non_conflict = \"overwrite\"\n";
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.on_conflict, ConflictPolicy::Overwrite);
        // Unset fields keep their defaults
        assert!(!config.database_path.as_os_str().is_empty());
    }

    #[test]
    fn test_example_config_parses_to_defaults() {
        // Every setting in the shipped example is commented out, so
        // the file must parse and yield the built-in defaults.
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.on_conflict, ConflictPolicy::Skip);
        assert_eq!(config.database_path, default_db_path());
    }

    #[test]
    fn test_config_with_custom_db_path() {
        let custom_path = PathBuf::from("/tmp/test.db");
        let config = Config::load_with_db_path(custom_path.clone());
        assert!(config.is_ok());
        assert_eq!(config.unwrap().database_path, custom_path);
    }
}
