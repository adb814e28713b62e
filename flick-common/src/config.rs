//! Configuration loading and setting resolution
//!
//! Settings follow a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Optional settings loaded from the TOML config file
///
/// Every field may be absent; binaries merge these with CLI arguments
/// and environment variables via [`resolve_setting`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    pub omdb_api_key: Option<String>,
    pub ai_api_key: Option<String>,
    pub ai_base_url: Option<String>,
    pub ai_model: Option<String>,
    pub embedding_model: Option<String>,
}

impl Settings {
    /// Load settings from the platform config file, if one exists.
    ///
    /// A missing file is not an error: it yields empty settings so the
    /// environment/CLI layers can still apply.
    pub fn load() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Parse settings from a specific TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid config file {}: {e}", path.display())))
    }
}

/// Resolve one setting through the priority chain.
///
/// `file_value` is the already-loaded TOML value so callers load the
/// file once for all settings.
pub fn resolve_setting(
    cli_arg: Option<&str>,
    env_var_name: &str,
    file_value: Option<&str>,
) -> Option<String> {
    if let Some(value) = cli_arg {
        return Some(value.to_string());
    }

    if let Ok(value) = std::env::var(env_var_name) {
        if !value.is_empty() {
            return Some(value);
        }
    }

    file_value.map(str::to_string)
}

/// Platform config file path (`~/.config/flickstream/config.toml` on
/// Linux, the equivalent elsewhere)
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("flickstream").join("config.toml"))
}
