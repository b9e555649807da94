//! Output sinks for probe results.
//!
//! Every reporter sees the same stream: one [`StatusRecord`] per probe, a
//! [`TransitionEvent`] whenever liveness flips, plus start and finish hooks.
//! A write failure is fatal for the run.

mod console;
mod csv_log;
mod text_log;

pub use console::ConsoleReporter;
pub use csv_log::CsvReporter;
pub use text_log::TextLogReporter;

use std::time::Duration;

use chrono::{DateTime, Local};

use crate::config::RunConfig;
use crate::error::{ConfigError, ReportError};
use crate::ping::ProbeStatistics;
use crate::tracker::{LinkState, StatusRecord, TransitionEvent};

pub(crate) const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub(crate) fn log_timestamp(timestamp: &DateTime<Local>) -> String {
    timestamp.format(LOG_TIMESTAMP_FORMAT).to_string()
}

/// One line describing a single probe.
pub fn describe_status(host: &str, record: &StatusRecord) -> String {
    if record.consecutive_failures > 0 {
        format!(
            "{host} icmp {} ({} consecutive failures, {})",
            record.outcome, record.consecutive_failures, record.state
        )
    } else {
        format!("{host} icmp {}", record.outcome)
    }
}

/// End of run totals.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub statistics: ProbeStatistics,
    pub elapsed: Duration,
    pub final_state: LinkState,
    pub interrupted: bool,
}

impl RunSummary {
    pub fn describe(&self, host: &str) -> String {
        let prefix = if self.interrupted { "Terminated: interrupted; " } else { "" };
        format!(
            "{prefix}{host} {}; {}; Elapsed: {:.3}s",
            self.final_state,
            self.statistics,
            self.elapsed.as_secs_f64()
        )
    }
}

pub trait Reporter {
    fn on_start(&mut self, _config: &RunConfig) -> Result<(), ReportError> {
        Ok(())
    }

    fn on_status(&mut self, record: &StatusRecord) -> Result<(), ReportError>;

    fn on_transition(&mut self, event: &TransitionEvent) -> Result<(), ReportError>;

    fn on_finish(&mut self, _summary: &RunSummary) -> Result<(), ReportError> {
        Ok(())
    }
}

/// Fans every record out to all configured reporters, in order.
#[derive(Default)]
pub struct Reporters {
    reporters: Vec<Box<dyn Reporter>>,
}

impl Reporters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Console output plus whichever log files the configuration names.
    /// Files are opened here, once, and stay open for the whole run.
    pub fn from_config(config: &RunConfig) -> Result<Self, ConfigError> {
        let mut reporters = Self::new();
        reporters.push(ConsoleReporter::stdout(&config.host, config.verbose));
        if let Some(path) = &config.log_file {
            reporters.push(TextLogReporter::open(path, &config.host, config.verbose)?);
        }
        if let Some(path) = &config.csv_file {
            reporters.push(CsvReporter::open(path)?);
        }
        Ok(reporters)
    }

    pub fn push(&mut self, reporter: impl Reporter + 'static) {
        self.reporters.push(Box::new(reporter));
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl Reporter for Reporters {
    fn on_start(&mut self, config: &RunConfig) -> Result<(), ReportError> {
        self.reporters.iter_mut().try_for_each(|r| r.on_start(config))
    }

    fn on_status(&mut self, record: &StatusRecord) -> Result<(), ReportError> {
        self.reporters.iter_mut().try_for_each(|r| r.on_status(record))
    }

    fn on_transition(&mut self, event: &TransitionEvent) -> Result<(), ReportError> {
        self.reporters.iter_mut().try_for_each(|r| r.on_transition(event))
    }

    fn on_finish(&mut self, summary: &RunSummary) -> Result<(), ReportError> {
        self.reporters.iter_mut().try_for_each(|r| r.on_finish(summary))
    }
}
