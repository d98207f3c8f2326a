//! # Configuration Module
//!
//! Data directory, database location and runtime settings for Samplehop.
//!
//! ## Data Storage
//!
//! The catalog database lives in the platform-standard data directory:
//! - Linux: `~/.local/share/samplehop/samples.db`
//! - macOS: `~/Library/Application Support/samplehop/samples.db`
//! - Windows: `%APPDATA%\samplehop\samples.db`
//!
//! ## Runtime Settings
//!
//! An optional `config.json` in the platform config directory
//! (`~/.config/samplehop/config.json` on Linux) overrides the defaults of
//! [`RuntimeConfig`]. Command-line flags override both.

use anyhow::{Context, Result};
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Hop bound for general searches when the caller gives none.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Hop bound for the personalized analysis flow.
pub const ANALYSIS_MAX_DEPTH: usize = 2;

const APP_DIR: &str = "samplehop";

/// Returns the platform-appropriate data directory, creating it if needed.
///
/// # Errors
///
/// Fails if the platform has no data directory or it cannot be created.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let app_dir = data_dir.join(APP_DIR);
    fs::create_dir_all(&app_dir).with_context(|| {
        format!(
            "Failed to create Samplehop data directory at {}. Please check file permissions.",
            app_dir.display()
        )
    })?;

    Ok(app_dir)
}

/// Returns the default catalog database path inside [`get_data_dir`].
///
/// # Errors
///
/// Same as [`get_data_dir`].
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("samples.db"))
}

/// Location of the optional runtime configuration file.
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.json"))
}

/// Caller-facing depth policy: non-positive requests fall back to `default`.
///
/// The search engine itself never substitutes; this is applied at the edge.
#[must_use]
pub fn effective_max_depth(requested: Option<i64>, default: usize) -> usize {
    match requested {
        Some(depth) if depth > 0 => usize::try_from(depth).unwrap_or(default),
        _ => default,
    }
}

/// Configuration for runtime behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Path to the catalog database
    pub db_path: PathBuf,
    /// Hop bound for `search` when none is given
    pub default_max_depth: usize,
    /// Hop bound for `analyze`
    pub analysis_max_depth: usize,
    /// Search worker threads; 0 searches seeds on the calling thread
    /// (the database is opened with one connection per worker)
    pub workers: usize,
    /// Overall deadline for one search call
    pub timeout_secs: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            db_path: get_db_path().unwrap_or_else(|_| PathBuf::from("samples.db")),
            default_max_depth: DEFAULT_MAX_DEPTH,
            analysis_max_depth: ANALYSIS_MAX_DEPTH,
            workers: 0,
            timeout_secs: None,
        }
    }
}

impl RuntimeConfig {
    /// Loads the config file if present, otherwise defaults.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        match config_file_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Parses a JSON config file. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not valid JSON.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Create configuration with explicit database path
    #[must_use]
    pub fn with_db_path(mut self, db_path: &Path) -> Self {
        self.db_path = db_path
            .absolutize()
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| db_path.to_path_buf());
        self
    }

    /// Deadline for a search call, if one is configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_db_path_structure() {
        let path = get_db_path().expect("Should get valid path");
        assert_eq!(path.file_name().unwrap(), "samples.db");
        assert_eq!(path.parent().unwrap().file_name().unwrap(), "samplehop");
        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn test_effective_max_depth() {
        assert_eq!(effective_max_depth(None, 5), 5);
        assert_eq!(effective_max_depth(Some(0), 5), 5);
        assert_eq!(effective_max_depth(Some(-3), 2), 2);
        assert_eq!(effective_max_depth(Some(7), 5), 7);
    }

    #[test]
    fn test_runtime_config_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.default_max_depth, 5);
        assert_eq!(config.analysis_max_depth, 2);
        assert_eq!(config.workers, 0);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_config_file_partial_override() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"workers": 4, "timeout_secs": 30}"#).unwrap();

        let config = RuntimeConfig::from_file(&path).unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.default_max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_with_db_path_absolutizes() {
        let config = RuntimeConfig::default().with_db_path(Path::new("relative/samples.db"));
        assert!(config.db_path.is_absolute());
        assert!(config.db_path.ends_with("relative/samples.db"));
    }
}
