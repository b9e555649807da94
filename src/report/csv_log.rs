use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::SecondsFormat;

use crate::error::{ConfigError, ReportError};
use crate::ping::rtt_millis;
use crate::report::Reporter;
use crate::tracker::{StatusRecord, TransitionEvent};

pub const CSV_HEADER: &str = "timestamp,rtt";

/// Appends `timestamp,rtt` rows for successful probes. Failed probes have no
/// RTT and are skipped.
pub struct CsvReporter {
    path: PathBuf,
    out: BufWriter<File>,
}

impl CsvReporter {
    /// Opens for append; writes the header only into an empty file.
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        let open_error = |source: std::io::Error| ConfigError::LogPath {
            path: path.to_path_buf(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(open_error)?;
        let is_empty = file.metadata().map_err(open_error)?.len() == 0;

        let mut reporter = Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
        };
        if is_empty {
            reporter.row(CSV_HEADER).map_err(|e| ConfigError::LogPath {
                path: path.to_path_buf(),
                source: e.source,
            })?;
        }
        Ok(reporter)
    }

    fn row(&mut self, row: &str) -> Result<(), ReportError> {
        writeln!(self.out, "{row}")
            .and_then(|_| self.out.flush())
            .map_err(|e| ReportError::new(self.path.display().to_string(), e))
    }
}

impl Reporter for CsvReporter {
    fn on_status(&mut self, record: &StatusRecord) -> Result<(), ReportError> {
        let Some(rtt) = record.outcome.rtt() else {
            return Ok(());
        };
        let row = format!(
            "{},{:.3}",
            record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, false),
            rtt_millis(rtt)
        );
        self.row(&row)
    }

    fn on_transition(&mut self, _event: &TransitionEvent) -> Result<(), ReportError> {
        Ok(())
    }
}
