//! Liveness tracking.
//!
//! Turns the per-probe outcome stream into a binary up/down signal.
//!
//! ```text
//! Up   → Down: consecutive failures reach the threshold (fires once per run)
//! Down → Up:   first successful probe
//! ```
//!
//! The tracker starts `Up`, so a fresh run only reports `Lost` after
//! `threshold` failures in a row. Timeouts and send errors count the same.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::error::ConfigError;
use crate::ping::ProbeOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Up,
    Down,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Up => f.write_str("UP"),
            LinkState::Down => f.write_str("DOWN"),
        }
    }
}

/// Snapshot of the tracker's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerState {
    pub consecutive_failures: u32,
    pub is_up: bool,
    pub threshold: u32,
}

/// Emitted for every probe.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusRecord {
    pub timestamp: DateTime<Local>,
    pub outcome: ProbeOutcome,
    pub consecutive_failures: u32,
    /// Liveness state after this probe was processed.
    pub state: LinkState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Lost,
    Restored,
}

/// Emitted only when the up/down state flips.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionEvent {
    pub timestamp: DateTime<Local>,
    pub kind: TransitionKind,
    /// Uptime for `Lost`, downtime for `Restored`. Both are measured to or from
    /// the first failed probe of the run that caused the loss.
    pub previous_state_duration: Option<Duration>,
}

impl TransitionEvent {
    /// Human readable form, e.g. `8.8.8.8 DOWN uptime 0:05:12`.
    pub fn describe(&self, host: &str) -> String {
        let (state, label) = match self.kind {
            TransitionKind::Lost => (LinkState::Down, "uptime"),
            TransitionKind::Restored => (LinkState::Up, "downtime"),
        };
        match self.previous_state_duration {
            Some(duration) => format!("{host} {state} {label} {}", format_duration(duration)),
            None => format!("{host} {state}"),
        }
    }
}

/// Formats as `H:MM:SS`, with fractional seconds when present.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs / 60) % 60, secs % 60);
    let millis = duration.subsec_millis();
    if millis > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}.{millis:03}")
    } else {
        format!("{hours}:{minutes:02}:{seconds:02}")
    }
}

fn elapsed(from: DateTime<Local>, to: DateTime<Local>) -> Option<Duration> {
    (to - from).to_std().ok()
}

#[derive(Debug)]
pub struct LivenessTracker {
    threshold: u32,
    consecutive_failures: u32,
    is_up: bool,
    up_since: Option<DateTime<Local>>,
    failing_since: Option<DateTime<Local>>,
}

impl LivenessTracker {
    pub fn new(threshold: u32) -> Result<Self, ConfigError> {
        if threshold == 0 {
            return Err(ConfigError::InvalidThreshold(0));
        }
        Ok(Self {
            threshold,
            consecutive_failures: 0,
            is_up: true,
            up_since: None,
            failing_since: None,
        })
    }

    pub fn state(&self) -> TrackerState {
        TrackerState {
            consecutive_failures: self.consecutive_failures,
            is_up: self.is_up,
            threshold: self.threshold,
        }
    }

    pub fn link_state(&self) -> LinkState {
        if self.is_up { LinkState::Up } else { LinkState::Down }
    }

    pub fn process(&mut self, outcome: ProbeOutcome) -> (StatusRecord, Option<TransitionEvent>) {
        self.process_at(Local::now(), outcome)
    }

    pub fn process_at(
        &mut self,
        timestamp: DateTime<Local>,
        outcome: ProbeOutcome,
    ) -> (StatusRecord, Option<TransitionEvent>) {
        let up_since = *self.up_since.get_or_insert(timestamp);

        let event = if outcome.is_success() {
            self.consecutive_failures = 0;
            let failing_since = self.failing_since.take();
            if self.is_up {
                None
            } else {
                self.is_up = true;
                self.up_since = Some(timestamp);
                Some(TransitionEvent {
                    timestamp,
                    kind: TransitionKind::Restored,
                    previous_state_duration: failing_since.and_then(|from| elapsed(from, timestamp)),
                })
            }
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            let failing_since = *self.failing_since.get_or_insert(timestamp);
            if self.is_up && self.consecutive_failures == self.threshold {
                self.is_up = false;
                Some(TransitionEvent {
                    timestamp,
                    kind: TransitionKind::Lost,
                    previous_state_duration: elapsed(up_since, failing_since),
                })
            } else {
                None
            }
        };

        let record = StatusRecord {
            timestamp,
            outcome,
            consecutive_failures: self.consecutive_failures,
            state: self.link_state(),
        };
        (record, event)
    }
}
