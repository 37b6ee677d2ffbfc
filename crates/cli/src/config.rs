// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Driver configuration
//!
//! Read from YAML (`.yaml`, `.yml`) or JSON (`.json`), chosen by extension.
//! Every field has a default, so a config file only lists what it changes:
//!
//! ```yaml
//! output: sql
//! passes:
//!   evaluate: true
//! format:
//!   indent_width: 4
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use relq_format::FormatOptions;
use relq_rewrite::DEFAULT_RECURSION_LIMIT;
use serde::{Deserialize, Serialize};

/// Widest indent accepted from a config file
pub const MAX_INDENT_WIDTH: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported config file '{}' (expected .yaml, .yml or .json)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// What the driver prints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    Debug,
    Sql,
}

/// Passes to run, always in the order listed here
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassConfig {
    pub evaluate: bool,
    pub deduplicate_aliases: bool,
    pub remove_redundant_subqueries: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelqConfig {
    pub format: FormatOptions,
    /// Depth bound for the evaluator and formatters (debug builds)
    pub recursion_limit: usize,
    pub passes: PassConfig,
    pub output: OutputMode,
}

impl Default for RelqConfig {
    fn default() -> Self {
        Self {
            format: FormatOptions::default(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            passes: PassConfig::default(),
            output: OutputMode::default(),
        }
    }
}

impl RelqConfig {
    /// Load a config file, picking the parser by extension
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match extension.as_deref() {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        // An empty document means "all defaults"
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recursion_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "recursion_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.format.indent_width > MAX_INDENT_WIDTH {
            return Err(ConfigError::Invalid {
                field: "format.indent_width",
                reason: format!("must not exceed {}", MAX_INDENT_WIDTH),
            });
        }
        if self.format.max_sequence_items == 0 {
            return Err(ConfigError::Invalid {
                field: "format.max_sequence_items",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
