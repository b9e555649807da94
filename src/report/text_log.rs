use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::config::RunConfig;
use crate::error::{ConfigError, ReportError};
use crate::report::{Reporter, RunSummary, describe_status, log_timestamp};
use crate::tracker::{StatusRecord, TransitionEvent};

/// Append-only human readable log: `<timestamp>  cmon <message>`.
pub struct TextLogReporter {
    path: PathBuf,
    out: BufWriter<File>,
    host: String,
    verbose: bool,
}

impl TextLogReporter {
    pub fn open(path: &Path, host: &str, verbose: bool) -> Result<Self, ConfigError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| ConfigError::LogPath {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            host: host.to_string(),
            verbose,
        })
    }

    fn line(&mut self, timestamp: &str, message: &str) -> Result<(), ReportError> {
        writeln!(self.out, "{timestamp}  cmon {message}")
            .and_then(|_| self.out.flush())
            .map_err(|e| ReportError::new(self.path.display().to_string(), e))
    }
}

impl Reporter for TextLogReporter {
    fn on_start(&mut self, config: &RunConfig) -> Result<(), ReportError> {
        self.line(&log_timestamp(&Local::now()), &config.start_message())
    }

    fn on_status(&mut self, record: &StatusRecord) -> Result<(), ReportError> {
        if !self.verbose {
            return Ok(());
        }
        let message = describe_status(&self.host, record);
        self.line(&log_timestamp(&record.timestamp), &message)
    }

    fn on_transition(&mut self, event: &TransitionEvent) -> Result<(), ReportError> {
        let message = event.describe(&self.host);
        self.line(&log_timestamp(&event.timestamp), &message)
    }

    fn on_finish(&mut self, summary: &RunSummary) -> Result<(), ReportError> {
        let message = summary.describe(&self.host);
        self.line(&log_timestamp(&Local::now()), &message)
    }
}
