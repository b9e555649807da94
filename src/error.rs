use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Invalid run configuration. Always detected before the first probe is sent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no host given (use -H/--host or set \"host\" in the defaults file)")]
    MissingHost,

    #[error("invalid host {host:?}: {reason}")]
    InvalidHost { host: String, reason: String },

    #[error("error threshold must be at least 1, got {0}")]
    InvalidThreshold(i64),

    #[error("interval must be at least 0.001 seconds, got {0}")]
    InvalidInterval(f64),

    #[error("cannot read defaults file {path}: {source}")]
    DefaultsRead { path: PathBuf, source: io::Error },

    #[error("malformed defaults file {path}: {source}")]
    DefaultsParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("cannot open log file {path} for append: {source}")]
    LogPath { path: PathBuf, source: io::Error },

    #[error("cannot create ICMP socket (raw socket privileges may be required): {0}")]
    Socket(io::Error),
}

/// Failure writing to a reporter sink. Fatal: the run stops.
#[derive(Debug, Error)]
#[error("failed writing to {sink}: {source}")]
pub struct ReportError {
    pub sink: String,
    #[source]
    pub source: io::Error,
}

impl ReportError {
    pub fn new(sink: impl Into<String>, source: io::Error) -> Self {
        Self {
            sink: sink.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

impl MonitorError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MonitorError::Config(_) => 2,
            MonitorError::Report(_) => 1,
        }
    }
}
