use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_INTERVAL_SECS: f64 = 1.0;
pub const DEFAULT_ERROR_THRESHOLD: i64 = 4;
/// Shortest accepted probe interval.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Optional per-user defaults, stored as JSON in the platform config directory.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Defaults {
    pub host: Option<String>,
    pub interval: Option<f64>,
    pub errors: Option<i64>,
    pub logfile: Option<PathBuf>,
    pub csv: Option<PathBuf>,
}

impl Defaults {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cmon").join("config.json"))
    }

    /// Loads the defaults file. A missing file yields empty defaults; an
    /// unreadable or malformed one is a configuration error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::DefaultsRead {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::DefaultsParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Immutable settings for one monitoring run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub host: String,
    pub interval: Duration,
    pub error_threshold: u32,
    pub max_attempts: Option<u64>,
    pub log_file: Option<PathBuf>,
    pub csv_file: Option<PathBuf>,
    pub verbose: bool,
}

impl RunConfig {
    /// Builds a validated configuration from raw values.
    ///
    /// `max_attempts` of `Some(0)` is treated as unbounded.
    pub fn validate(
        host: Option<String>,
        interval_secs: f64,
        error_threshold: i64,
        max_attempts: Option<u64>,
        log_file: Option<PathBuf>,
        csv_file: Option<PathBuf>,
        verbose: bool,
    ) -> Result<Self, ConfigError> {
        let host = host
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .ok_or(ConfigError::MissingHost)?;

        if !interval_secs.is_finite() || interval_secs <= 0.0 {
            return Err(ConfigError::InvalidInterval(interval_secs));
        }
        let interval = Duration::try_from_secs_f64(interval_secs)
            .ok()
            .filter(|interval| *interval >= MIN_INTERVAL)
            .ok_or(ConfigError::InvalidInterval(interval_secs))?;

        let error_threshold = u32::try_from(error_threshold)
            .ok()
            .filter(|t| *t >= 1)
            .ok_or(ConfigError::InvalidThreshold(error_threshold))?;

        Ok(Self {
            host,
            interval,
            error_threshold,
            max_attempts: max_attempts.filter(|n| *n > 0),
            log_file,
            csv_file,
            verbose,
        })
    }

    /// Startup banner, also written to the text log.
    pub fn start_message(&self) -> String {
        let mut message = format!(
            "Start host={} interval={} maxerr={}",
            self.host,
            self.interval.as_secs_f64(),
            self.error_threshold
        );
        if let Some(times) = self.max_attempts {
            message.push_str(&format!(" times={times}"));
        }
        if let Some(csv) = &self.csv_file {
            message.push_str(&format!(" csv={}", csv.display()));
        }
        message.push_str(&format!("; v{}", env!("CARGO_PKG_VERSION")));
        message
    }
}
