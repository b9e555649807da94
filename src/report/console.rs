use std::io::{self, Stdout, Write};

use crate::config::RunConfig;
use crate::error::ReportError;
use crate::report::{Reporter, RunSummary, describe_status, log_timestamp};
use crate::tracker::{StatusRecord, TransitionEvent};

/// Prints transitions and the run summary always, per-probe lines only when verbose.
pub struct ConsoleReporter<W: Write> {
    out: W,
    host: String,
    verbose: bool,
}

impl ConsoleReporter<Stdout> {
    pub fn stdout(host: &str, verbose: bool) -> Self {
        Self::new(io::stdout(), host, verbose)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, host: &str, verbose: bool) -> Self {
        Self {
            out,
            host: host.to_string(),
            verbose,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) -> Result<(), ReportError> {
        writeln!(self.out, "{text}")
            .and_then(|_| self.out.flush())
            .map_err(|e| ReportError::new("console", e))
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn on_start(&mut self, config: &RunConfig) -> Result<(), ReportError> {
        if self.verbose {
            self.line(&config.start_message())?;
        }
        Ok(())
    }

    fn on_status(&mut self, record: &StatusRecord) -> Result<(), ReportError> {
        if !self.verbose {
            return Ok(());
        }
        let text = format!(
            "{}  {}",
            log_timestamp(&record.timestamp),
            describe_status(&self.host, record)
        );
        self.line(&text)
    }

    fn on_transition(&mut self, event: &TransitionEvent) -> Result<(), ReportError> {
        let text = format!("{}  {}", log_timestamp(&event.timestamp), event.describe(&self.host));
        self.line(&text)
    }

    fn on_finish(&mut self, summary: &RunSummary) -> Result<(), ReportError> {
        let text = summary.describe(&self.host);
        self.line(&text)
    }
}
