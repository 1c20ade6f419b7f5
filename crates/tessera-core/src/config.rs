//! Configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// Full configuration for a Tessera participant.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TesseraConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Identity settings.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Presentation defaults for claimers.
    #[serde(default)]
    pub presentation: PresentationConfig,
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdentityConfig {
    /// Path to a hex-encoded 32-byte seed file.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationConfig {
    /// Whether presentations disclose the claim owner by default.
    #[serde(default = "default_true")]
    pub reveal_owner: bool,
    /// Whether the claimer insists on zero-knowledge presentations.
    #[serde(default)]
    pub require_pe: bool,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> LogFormat {
    LogFormat::Text
}
fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            reveal_owner: default_true(),
            require_pe: false,
        }
    }
}

impl TesseraConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)
                .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }
}
