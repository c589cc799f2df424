//! User configuration
//!
//! Read from `$XDG_CONFIG_HOME/khef/config.toml`, or
//! `~/.config/khef/config.toml` when XDG_CONFIG_HOME is unset. A missing
//! file means defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing::level_filters::LevelFilter;

use crate::error::{ErrorCategory, ErrorKind, KhefError, Result};

pub const APP_DIR: &str = "khef";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub output: OutputSection,
    pub log: LogSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    /// Extension appended on encrypt and stripped on decrypt, without the dot.
    pub extension: String,
    /// Replace existing destinations without --force.
    pub overwrite: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            extension: "khef".to_string(),
            overwrite: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSection {
    /// Log level (off, error, warn, info, debug, trace) when neither KHEF_LOG
    /// nor -v/-q is given.
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load `path`, falling back to defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(KhefError::with_kind_and_source(
                    ErrorCategory::User,
                    ErrorKind::Config,
                    format!("failed to read config {}", path.display()),
                    e,
                ));
            }
        };
        Self::parse(&contents)
            .map_err(|e| e.with_context(format!("invalid config {}", path.display())))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(|e| {
            KhefError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Config,
                "failed to parse config",
                e,
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let ext = &self.output.extension;
        if ext.is_empty() || ext.starts_with('.') || ext.contains(['/', '\\']) {
            return Err(KhefError::with_kind(
                ErrorCategory::User,
                ErrorKind::Config,
                format!(
                    "output.extension must be a bare extension such as \"khef\", got {:?}",
                    ext
                ),
            ));
        }
        let level = &self.log.level;
        if level.trim().is_empty() || level.parse::<LevelFilter>().is_err() {
            return Err(KhefError::with_kind(
                ErrorCategory::User,
                ErrorKind::Config,
                format!(
                    "log.level must be one of off, error, warn, info, debug, trace, got {:?}",
                    level
                ),
            ));
        }
        Ok(())
    }

    /// Write this config to `path`, creating parent directories.
    ///
    /// An existing file is only replaced when `overwrite` is set.
    pub fn write(&self, path: &Path, overwrite: bool) -> Result<()> {
        if !overwrite && path.exists() {
            return Err(KhefError::with_kind(
                ErrorCategory::User,
                ErrorKind::DestinationExists,
                format!("{} already exists (use --force to replace it)", path.display()),
            ));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                KhefError::with_kind_and_source(
                    ErrorCategory::User,
                    ErrorKind::Config,
                    format!("failed to create config directory {}", parent.display()),
                    e,
                )
            })?;
        }
        let contents = toml::to_string_pretty(self).map_err(|e| {
            KhefError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Config,
                "failed to serialize config",
                e,
            )
        })?;
        fs::write(path, contents).map_err(|e| {
            KhefError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Config,
                format!("failed to write config {}", path.display()),
                e,
            )
        })
    }
}

/// Base configuration directory: XDG_CONFIG_HOME if set and non-blank,
/// otherwise `$HOME/.config`. A leading `~/` in XDG_CONFIG_HOME is expanded.
pub fn config_home(xdg_config_home: Option<&str>, home: Option<&str>) -> Result<PathBuf> {
    let home_dir = || {
        home.filter(|h| !h.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| {
                KhefError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::Config,
                    "HOME is not set; cannot resolve the config directory",
                )
            })
    };

    match xdg_config_home.filter(|v| !v.trim().is_empty()) {
        Some(value) => match value.strip_prefix("~/") {
            Some(rest) => Ok(home_dir()?.join(rest)),
            None => Ok(PathBuf::from(value)),
        },
        None => Ok(home_dir()?.join(".config")),
    }
}

/// Default config file location derived from the process environment.
pub fn default_config_path() -> Result<PathBuf> {
    let xdg = std::env::var("XDG_CONFIG_HOME").ok();
    let home = std::env::var("HOME").ok();
    Ok(config_home(xdg.as_deref(), home.as_deref())?
        .join(APP_DIR)
        .join(CONFIG_FILE))
}
