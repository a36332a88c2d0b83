//! `~/.iedit.toml` and its overrides.

use clap::ValueEnum;
use iedit_core::SegmentPolicy;
use iedit_core::segment::{DEFAULT_CONTEXT, DEFAULT_WINDOW};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_FILE_NAME: &str = ".iedit.toml";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("segmentation window must be at least 1")]
    ZeroWindow,
    #[error("model timeout must be at least 1 second")]
    ZeroTimeout,
    #[error("no model command configured; pass --model-cmd or set [model] command")]
    NoModelCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    #[default]
    Structural,
    Windowed,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Segmentation {
    pub policy: PolicyKind,
    pub window: usize,
    pub context: usize,
}

impl Default for Segmentation {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Structural,
            window: DEFAULT_WINDOW,
            context: DEFAULT_CONTEXT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelSettings {
    /// Program and arguments. The prompt is written to its stdin.
    pub command: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ModelSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub auto_apply: bool,
    pub recursive: bool,
    pub segmentation: Segmentation,
    pub model: ModelSettings,
}

impl Config {
    /// Loads `explicit` if given, else `~/.iedit.toml` if it exists, else defaults.
    ///
    /// An explicit path that is missing or malformed is an error; the
    /// default file is only read when present.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.segmentation.window == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.model.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Like [`Config::validate`], plus the checks only editing needs.
    pub fn validate_for_edit(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.model.command.is_empty() {
            return Err(ConfigError::NoModelCommand);
        }
        Ok(())
    }

    pub fn policy(&self) -> SegmentPolicy {
        match self.segmentation.policy {
            PolicyKind::Structural => SegmentPolicy::Structural,
            PolicyKind::Windowed => SegmentPolicy::Windowed {
                window: self.segmentation.window,
                context: self.segmentation.context,
            },
        }
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}
