//! Command line interface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{DEFAULT_ERROR_THRESHOLD, DEFAULT_INTERVAL_SECS, Defaults, RunConfig};
use crate::error::ConfigError;

/// Monitor (and log) a network connection
#[derive(Debug, Parser)]
#[command(name = "cmon", version)]
pub struct Args {
    /// Host name or ip to test against
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Interval between tests in seconds (default 1.0)
    #[arg(short, long)]
    pub interval: Option<f64>,

    /// Number of errors (lost packets) before connection is considered dead (default 4)
    #[arg(short, long, allow_negative_numbers = true)]
    pub errors: Option<i64>,

    /// Maximum number of times to try (default not set = forever)
    #[arg(short, long)]
    pub times: Option<u64>,

    /// Create or append log to a file
    #[arg(short, long)]
    pub logfile: Option<PathBuf>,

    /// Create or append RTT data to a CSV file
    #[arg(short, long)]
    pub csv: Option<PathBuf>,

    /// Increase logging verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Defaults file (default: <config dir>/cmon/config.json)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Args {
    pub fn defaults_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(Defaults::default_path)
    }

    /// Overlays command line values on the stored defaults.
    pub fn merge(&self, defaults: &Defaults) -> Defaults {
        Defaults {
            host: self.host.clone().or_else(|| defaults.host.clone()),
            interval: self.interval.or(defaults.interval),
            errors: self.errors.or(defaults.errors),
            logfile: self.logfile.clone().or_else(|| defaults.logfile.clone()),
            csv: self.csv.clone().or_else(|| defaults.csv.clone()),
        }
    }

    pub fn into_run_config(&self, defaults: &Defaults) -> Result<RunConfig, ConfigError> {
        let merged = self.merge(defaults);
        RunConfig::validate(
            merged.host,
            merged.interval.unwrap_or(DEFAULT_INTERVAL_SECS),
            merged.errors.unwrap_or(DEFAULT_ERROR_THRESHOLD),
            self.times,
            merged.logfile,
            merged.csv,
            self.verbose > 0,
        )
    }
}
