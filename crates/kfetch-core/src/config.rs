//! Configuration module for kfetch.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::InfoMask;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for kfetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub channel: ChannelConfig,
    pub fuse: FuseConfig,
    pub logging: LoggingConfig,
}

/// Channel behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Mask a freshly started channel reports with, before any client writes one.
    pub default_mask: i32,
    /// Reject written masks that carry bits outside the six known fields.
    ///
    /// Off by default: unknown bits are accepted and silently ignored.
    pub strict_mask: bool,
}

/// FUSE node settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuseConfig {
    /// Directory where the channel node is mounted.
    pub mount_point: String,
    /// File name of the node inside the mount point.
    pub node_name: String,
    /// Let other users open the node (needs `user_allow_other` in fuse.conf).
    pub allow_other: bool,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/kfetch/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("kfetch")
            .join("config.yaml")
    }
}

impl ChannelConfig {
    /// Initial mask as a domain value
    pub fn initial_mask(&self) -> InfoMask {
        InfoMask::from_raw(self.default_mask)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            default_mask: InfoMask::FULL.raw(),
            strict_mask: false,
        }
    }
}

impl Default for FuseConfig {
    fn default() -> Self {
        Self {
            mount_point: "~/.local/share/kfetch/dev".to_string(),
            node_name: "kfetch".to_string(),
            allow_other: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"fuse.node_name"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- channel ---
        let unknown = self.channel.initial_mask().unknown_bits();
        if self.channel.strict_mask && unknown != 0 {
            errors.push(ValidationError {
                field: "channel.default_mask".into(),
                message: format!(
                    "unknown info bits {:#x} set while strict_mask is enabled",
                    unknown
                ),
            });
        }

        // --- fuse ---
        if self.fuse.mount_point.trim().is_empty() {
            errors.push(ValidationError {
                field: "fuse.mount_point".into(),
                message: "must not be empty".into(),
            });
        }
        if self.fuse.node_name.is_empty() {
            errors.push(ValidationError {
                field: "fuse.node_name".into(),
                message: "must not be empty".into(),
            });
        } else if self.fuse.node_name.contains('/') || self.fuse.node_name.starts_with('.') {
            errors.push(ValidationError {
                field: "fuse.node_name".into(),
                message: format!(
                    "must be a plain file name, got '{}'",
                    self.fuse.node_name
                ),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`], starting from defaults.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- channel ---

    pub fn channel_default_mask(mut self, mask: InfoMask) -> Self {
        self.config.channel.default_mask = mask.raw();
        self
    }

    pub fn channel_strict_mask(mut self, strict: bool) -> Self {
        self.config.channel.strict_mask = strict;
        self
    }

    // --- fuse ---

    pub fn fuse_mount_point(mut self, mount_point: impl Into<String>) -> Self {
        self.config.fuse.mount_point = mount_point.into();
        self
    }

    pub fn fuse_node_name(mut self, node_name: impl Into<String>) -> Self {
        self.config.fuse.node_name = node_name.into();
        self
    }

    pub fn fuse_allow_other(mut self, allow_other: bool) -> Self {
        self.config.fuse.allow_other = allow_other;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Return the built config without validation.
    pub fn build(self) -> Config {
        self.config
    }

    /// Return the built config, or every validation error found.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let errors = self.config.validate();
        if errors.is_empty() {
            Ok(self.config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
