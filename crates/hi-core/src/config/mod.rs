//! Engine configuration loading and validation.
//!
//! This module handles:
//! - Loading `engine.json` (recognizer and detector tuning, default model path)
//! - Config resolution order (explicit path > dir option > env > XDG > defaults)
//! - Semantic validation of tuning values
//! - Config snapshots with content hashes for session provenance

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::events::DetectorConfig;
use crate::recognizer::RecognizerConfig;

/// Schema version accepted in `engine.json` when present.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// Environment variable naming the config directory.
pub const CONFIG_DIR_ENV: &str = "HI_CONFIG";

/// Config file name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "engine.json";

/// Default XDG config directory name.
const CONFIG_DIR_NAME: &str = "handinput";

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JSON in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },

    #[error("Invalid value for {field}: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub fn code(&self) -> u32 {
        match self {
            ConfigError::ParseError { .. } => 50,
            ConfigError::IoError { .. } => 51,
            ConfigError::VersionMismatch { .. } => 52,
            ConfigError::Invalid { .. } => 53,
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Contents of `engine.json`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    pub recognizer: RecognizerConfig,
    pub detector: DetectorConfig,
    /// Model used when none is given on the command line. Relative paths are
    /// resolved against the directory holding the config file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,
}

impl EngineConfig {
    /// Semantic validation of every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(version) = &self.schema_version {
            if version != CONFIG_SCHEMA_VERSION {
                return Err(ConfigError::VersionMismatch {
                    expected: CONFIG_SCHEMA_VERSION.to_string(),
                    actual: version.clone(),
                });
            }
        }
        self.recognizer.validate()?;
        self.detector.validate()?;
        Ok(())
    }
}

/// Resolved configuration with provenance information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub engine: EngineConfig,
    /// Path to the config file (None if using defaults).
    pub path: Option<PathBuf>,
    /// SHA-256 of the config file content (None if using defaults).
    pub hash: Option<String>,
    /// The config directory used for resolution.
    pub config_dir: PathBuf,
}

impl ResolvedConfig {
    /// Configured model path, made absolute relative to the config file.
    pub fn model_path(&self) -> Option<PathBuf> {
        let model = self.engine.model_path.as_ref()?;
        if model.is_absolute() {
            return Some(model.clone());
        }
        let base = self
            .path
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(&self.config_dir);
        Some(base.join(model))
    }

    /// Create a config snapshot for session records.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            path: self.path.clone(),
            hash: self.hash.clone(),
            config_dir: self.config_dir.clone(),
            engine: self.engine.clone(),
        }
    }
}

/// Config snapshot for logs and session records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub path: Option<PathBuf>,
    pub hash: Option<String>,
    pub config_dir: PathBuf,
    pub engine: EngineConfig,
}

/// Configuration resolution options.
#[derive(Debug, Default)]
pub struct ConfigOptions {
    /// Explicit config directory.
    pub config_dir: Option<PathBuf>,
    /// Explicit config file (highest priority).
    pub config_path: Option<PathBuf>,
}

/// Load configuration with the standard resolution order.
///
/// Resolution order (highest to lowest priority):
/// 1. Explicit config file (`ConfigOptions::config_path`)
/// 2. Explicit config directory (`ConfigOptions::config_dir`)
/// 3. Environment variable (`HI_CONFIG`)
/// 4. XDG config home (`~/.config/handinput/`)
/// 5. Built-in defaults
///
/// An explicit file must exist; a config directory without `engine.json`
/// falls through to the defaults.
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    let config_dir = resolve_config_dir(options);

    let (engine, path, hash) = match &options.config_path {
        Some(path) => {
            let (engine, hash) = load_engine_from_file(path)?;
            (engine, Some(path.clone()), Some(hash))
        }
        None => {
            let default_path = config_dir.join(CONFIG_FILE_NAME);
            if default_path.exists() {
                let (engine, hash) = load_engine_from_file(&default_path)?;
                (engine, Some(default_path), Some(hash))
            } else {
                (EngineConfig::default(), None, None)
            }
        }
    };

    engine.validate()?;

    tracing::debug!(
        target: "hi_core::config",
        path = ?path,
        config_dir = %config_dir.display(),
        "configuration resolved"
    );

    Ok(ResolvedConfig {
        engine,
        path,
        hash,
        config_dir,
    })
}

/// Resolve the config directory using the standard resolution order.
fn resolve_config_dir(options: &ConfigOptions) -> PathBuf {
    if let Some(dir) = &options.config_dir {
        return dir.clone();
    }

    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }

    let xdg_config = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .unwrap_or_else(|| PathBuf::from(".config"));

    xdg_config.join(CONFIG_DIR_NAME)
}

fn load_engine_from_file(path: &Path) -> Result<(EngineConfig, String), ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let hash = compute_hash(&content);

    let engine: EngineConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok((engine, hash))
}

fn compute_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
