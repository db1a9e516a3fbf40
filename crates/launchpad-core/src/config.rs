//! launchpad.toml configuration parser.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration {0:?} (expected e.g. \"500ms\", \"30s\", \"5m\", \"1h\", \"2d\")")]
    InvalidDuration(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchpadConfig {
    pub store: StoreConfig,
    pub sweep: SweepConfig,
    pub logs: LogsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the redb database file.
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// How often expired apps are looked up and killed (e.g. "30s").
    pub interval: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogsConfig {
    /// Orchestration CLI used to fetch raw app logs.
    pub program: String,
    /// Arguments; `{app}` is replaced with the app id.
    pub args: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/lib/launchpad/launchpad.redb"),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: "30s".to_string(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            program: "flynn".to_string(),
            args: vec!["-a".to_string(), "{app}".to_string(), "log".to_string()],
        }
    }
}

impl SweepConfig {
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.interval)
    }
}

impl LaunchpadConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: LaunchpadConfig = toml::from_str(content)?;
        // Reject a bad interval at load time rather than at first sweep.
        config.sweep.interval()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

/// Parse a duration string like "500ms", "30s", "5m", "1h" or "2d".
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidDuration(s.to_string());
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let value: u64 = digits.parse().map_err(|_| invalid())?;
    let secs = match unit {
        "ms" => return Ok(Duration::from_millis(value)),
        "" | "s" => value,
        "m" => value.checked_mul(60).ok_or_else(invalid)?,
        "h" => value.checked_mul(60 * 60).ok_or_else(invalid)?,
        "d" => value.checked_mul(24 * 60 * 60).ok_or_else(invalid)?,
        _ => return Err(invalid()),
    };
    Ok(Duration::from_secs(secs))
}
