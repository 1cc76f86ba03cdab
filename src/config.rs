//! Reporter options loading.
//!
//! Option sources (highest priority first):
//! 1. Explicit path (CLI flag or `DIDIT_CONFIG`)
//! 2. Config file (.didit/config.yaml) in the current directory or a parent
//! 3. ~/.didit/config.yaml
//!
//! The file holds the run configuration (`crate_profile`, `agent`,
//! `script_path`). It is parsed loosely here and validated against its
//! profile by [`crate::core::validator`]. YAML is a superset of JSON, so
//! `.json` files load the same way.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

/// Environment variable naming the options file
pub const CONFIG_ENV: &str = "DIDIT_CONFIG";

/// Environment variable naming the crate output directory
pub const CRATE_DIR_ENV: &str = "DIDIT_CRATE_DIR";

/// Crate output directory when nothing else is configured
pub const DEFAULT_CRATE_DIR: &str = "crate";

const CONFIG_DIR: &str = ".didit";
const CONFIG_FILE: &str = "config.yaml";

/// Where the reporter writes its artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterSettings {
    /// Directory receiving `ro-crate-metadata.json`
    pub crate_dir: PathBuf,
}

impl Default for ReporterSettings {
    fn default() -> Self {
        Self {
            crate_dir: PathBuf::from(DEFAULT_CRATE_DIR),
        }
    }
}

impl ReporterSettings {
    pub fn new(crate_dir: impl Into<PathBuf>) -> Self {
        Self {
            crate_dir: crate_dir.into(),
        }
    }

    /// Settings from `DIDIT_CRATE_DIR`, falling back to the default
    pub fn from_env() -> Self {
        std::env::var(CRATE_DIR_ENV)
            .map(Self::new)
            .unwrap_or_default()
    }
}

/// Search `start` and its parents for .didit/config.yaml
fn find_config_file_from(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Find the options file from the environment and well-known locations
pub fn find_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }

    if let Some(found) = std::env::current_dir()
        .ok()
        .and_then(|cwd| find_config_file_from(&cwd))
    {
        return Some(found);
    }

    let home_config = dirs::home_dir()?.join(CONFIG_DIR).join(CONFIG_FILE);
    home_config.exists().then_some(home_config)
}

/// Parse options text (YAML or JSON)
pub fn parse_options(content: &str) -> Result<Value> {
    serde_yaml::from_str(content).context("Failed to parse reporter options")
}

/// Load and parse an options file
pub fn load_options(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read options file: {}", path.display()))?;

    parse_options(&content)
        .with_context(|| format!("Failed to parse options file: {}", path.display()))
}

/// Load options from an explicit path or the discovered config file
pub fn resolve_options(explicit: Option<&Path>) -> Result<(PathBuf, Value)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => find_config_file().with_context(|| {
            format!(
                "No options file found. Pass --config, set {} or create {}/{}",
                CONFIG_ENV, CONFIG_DIR, CONFIG_FILE
            )
        })?,
    };

    let options = load_options(&path)?;
    Ok((path, options))
}
