//! Continuous connection monitoring.
//!
//! Probes one host with ICMP echo requests at a fixed interval, declares the
//! connection down after a configurable number of consecutive failures and
//! up again on the next reply, and reports to the console, an optional text
//! log and an optional RTT CSV file.

pub mod cli;
pub mod config;
pub mod dns_cache;
pub mod error;
pub mod monitor;
pub mod ping;
pub mod ping_executor;
pub mod report;
pub mod tracker;

pub use config::RunConfig;
pub use error::{ConfigError, MonitorError, ReportError};
pub use monitor::Monitor;
pub use ping::{ProbeOutcome, ProbeStatistics};
pub use ping_executor::{IcmpProber, Prober};
pub use report::{Reporter, Reporters, RunSummary};
pub use tracker::{LinkState, LivenessTracker, StatusRecord, TrackerState, TransitionEvent, TransitionKind};
