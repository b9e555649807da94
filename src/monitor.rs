//! The probe loop.
//!
//! One probe in flight at a time. Ticks are paced from the start of each
//! probe, so a probe that overruns the interval is followed immediately by the
//! next one without accumulating delay. The stop signal is only observed
//! between ticks; a stop that arrives mid-probe takes effect as soon as that
//! probe completes.

use chrono::{DateTime, Local, TimeDelta};
use log::warn;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

use crate::config::RunConfig;
use crate::error::{ConfigError, ReportError};
use crate::ping::ProbeStatistics;
use crate::ping_executor::{IcmpProber, Prober};
use crate::report::{Reporter, Reporters, RunSummary};
use crate::tracker::{LivenessTracker, TrackerState};

/// Wall time of a tick, measured on the loop's monotonic clock.
fn wall_clock(started: DateTime<Local>, since_start: std::time::Duration) -> DateTime<Local> {
    TimeDelta::from_std(since_start)
        .ok()
        .and_then(|delta| started.checked_add_signed(delta))
        .unwrap_or_else(Local::now)
}

/// Installs the Ctrl-C handler and returns a receiver that flips to `true` on
/// the first interrupt. The handler is registered before this returns.
pub async fn listen_for_ctrl_c() -> watch::Receiver<bool> {
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = stop_tx.send(true);
            }
            Err(e) => warn!("cannot listen for Ctrl-C: {e}"),
        }
    });
    // let the listener task run up to its first await, which registers the handler
    tokio::task::yield_now().await;
    stop_rx
}

/// Resolves once a stop has been requested. A dropped sender never stops the run.
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    if stop.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Everything one run needs, constructed up front and owned by the loop.
pub struct Monitor<P, R> {
    config: RunConfig,
    prober: P,
    tracker: LivenessTracker,
    reporters: R,
    statistics: ProbeStatistics,
}

impl<P: Prober, R: Reporter> Monitor<P, R> {
    pub fn new(config: RunConfig, prober: P, reporters: R) -> Result<Self, ConfigError> {
        let tracker = LivenessTracker::new(config.error_threshold)?;
        Ok(Self {
            config,
            prober,
            tracker,
            reporters,
            statistics: ProbeStatistics::default(),
        })
    }

    pub fn tracker_state(&self) -> TrackerState {
        self.tracker.state()
    }

    pub fn statistics(&self) -> &ProbeStatistics {
        &self.statistics
    }

    pub fn prober(&self) -> &P {
        &self.prober
    }

    pub fn into_parts(self) -> (P, R) {
        (self.prober, self.reporters)
    }

    /// Probes until `max_attempts` is reached or `stop` becomes `true`.
    ///
    /// Returns early with the error if any reporter fails to write.
    pub async fn run(&mut self, mut stop: watch::Receiver<bool>) -> Result<RunSummary, ReportError> {
        let started = Instant::now();
        let started_wall = Local::now();
        let mut attempts: u64 = 0;
        let mut interrupted = false;

        self.reporters.on_start(&self.config)?;

        loop {
            if self.config.max_attempts.is_some_and(|max| attempts >= max) {
                break;
            }
            if *stop.borrow_and_update() {
                interrupted = true;
                break;
            }
            attempts += 1;
            let probe_started = Instant::now();
            let deadline = probe_started + self.config.interval;
            let timestamp = wall_clock(started_wall, probe_started - started);

            let outcome = self.prober.probe().await;
            self.statistics.record(&outcome);
            let (record, event) = self.tracker.process_at(timestamp, outcome);

            self.reporters.on_status(&record)?;
            if let Some(event) = event {
                self.reporters.on_transition(&event)?;
            }

            if self.config.max_attempts.is_some_and(|max| attempts >= max) {
                interrupted = *stop.borrow();
                break;
            }

            tokio::select! {
                biased;
                _ = stop_requested(&mut stop) => {
                    interrupted = true;
                    break;
                }
                _ = sleep_until(deadline) => {}
            }
        }

        let summary = RunSummary {
            statistics: self.statistics.clone(),
            elapsed: started.elapsed(),
            final_state: self.tracker.link_state(),
            interrupted,
        };
        self.reporters.on_finish(&summary)?;
        Ok(summary)
    }
}

impl Monitor<IcmpProber, Reporters> {
    /// Resolves the host and opens the ICMP socket before any log file is
    /// touched, so a bad host leaves no files behind.
    pub async fn connect(config: RunConfig) -> Result<Self, ConfigError> {
        let prober = IcmpProber::connect(&config.host, config.interval).await?;
        let reporters = Reporters::from_config(&config)?;
        Self::new(config, prober, reporters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ping::ProbeOutcome;
    use crate::report::Reporters;
    use crate::tracker::{LinkState, StatusRecord, TransitionEvent, TransitionKind};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::time::Duration;

    /// Replays a fixed list of outcomes, each taking `delay` to arrive.
    struct ScriptedProber {
        outcomes: VecDeque<ProbeOutcome>,
        delay: Duration,
        probed_at: Vec<Instant>,
    }

    impl ScriptedProber {
        fn new(outcomes: Vec<ProbeOutcome>, delay: Duration) -> Self {
            Self {
                outcomes: outcomes.into(),
                delay,
                probed_at: Vec::new(),
            }
        }
    }

    impl Prober for ScriptedProber {
        async fn probe(&mut self) -> ProbeOutcome {
            self.probed_at.push(Instant::now());
            tokio::time::sleep(self.delay).await;
            self.outcomes.pop_front().unwrap_or(ProbeOutcome::Timeout)
        }
    }

    #[derive(Default)]
    struct Recorded {
        statuses: Vec<StatusRecord>,
        transitions: Vec<TransitionKind>,
        finished: bool,
    }

    struct RecordingReporter(Rc<RefCell<Recorded>>);

    impl Reporter for RecordingReporter {
        fn on_status(&mut self, record: &StatusRecord) -> Result<(), ReportError> {
            self.0.borrow_mut().statuses.push(record.clone());
            Ok(())
        }

        fn on_transition(&mut self, event: &TransitionEvent) -> Result<(), ReportError> {
            self.0.borrow_mut().transitions.push(event.kind);
            Ok(())
        }

        fn on_finish(&mut self, _summary: &RunSummary) -> Result<(), ReportError> {
            self.0.borrow_mut().finished = true;
            Ok(())
        }
    }

    struct FailingReporter;

    impl Reporter for FailingReporter {
        fn on_status(&mut self, _record: &StatusRecord) -> Result<(), ReportError> {
            Err(ReportError::new(
                "rtt.csv",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            ))
        }

        fn on_transition(&mut self, _event: &TransitionEvent) -> Result<(), ReportError> {
            Ok(())
        }
    }

    fn config(interval_ms: u64, threshold: i64, times: Option<u64>) -> RunConfig {
        RunConfig::validate(
            Some("192.0.2.1".into()),
            interval_ms as f64 / 1000.0,
            threshold,
            times,
            None,
            None,
            false,
        )
        .unwrap()
    }

    fn monitor(
        config: RunConfig,
        outcomes: Vec<ProbeOutcome>,
        delay: Duration,
    ) -> (Monitor<ScriptedProber, Reporters>, Rc<RefCell<Recorded>>) {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let mut reporters = Reporters::new();
        reporters.push(RecordingReporter(recorded.clone()));
        let monitor = Monitor::new(config, ScriptedProber::new(outcomes, delay), reporters).unwrap();
        (monitor, recorded)
    }

    fn ok(ms: u64) -> ProbeOutcome {
        ProbeOutcome::success(Duration::from_millis(ms))
    }

    fn never_stop() -> watch::Receiver<bool> {
        watch::channel(false).1
    }

    fn stop_after(delay: Duration) -> watch::Receiver<bool> {
        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = stop_tx.send(true);
        });
        stop_rx
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_after_max_attempts() {
        let outcomes = vec![ok(1), ProbeOutcome::Timeout, ProbeOutcome::Timeout, ProbeOutcome::Timeout, ok(2)];
        let (mut monitor, recorded) = monitor(config(1000, 3, Some(5)), outcomes, Duration::ZERO);

        let summary = monitor.run(never_stop()).await.unwrap();

        let recorded = recorded.borrow();
        assert_eq!(recorded.statuses.len(), 5);
        assert_eq!(recorded.transitions, vec![TransitionKind::Lost, TransitionKind::Restored]);
        assert!(recorded.finished);
        assert!(!summary.interrupted);
        assert_eq!(summary.final_state, LinkState::Up);
        assert_eq!(summary.statistics.total_probes, 5);
        assert_eq!(summary.statistics.failed_probes, 3);
        // no sleep after the last probe
        assert_eq!(summary.elapsed, Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_paced_from_probe_start() {
        let (mut monitor, _) = monitor(config(1000, 1, Some(3)), vec![ok(1); 3], Duration::from_millis(300));

        monitor.run(never_stop()).await.unwrap();

        let (prober, _) = monitor.into_parts();
        let gaps: Vec<_> = prober.probed_at.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(gaps, vec![Duration::from_secs(1); 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_probe_starts_next_tick_immediately() {
        let (mut monitor, _) = monitor(config(1000, 1, Some(3)), vec![], Duration::from_millis(1500));

        monitor.run(never_stop()).await.unwrap();

        let (prober, _) = monitor.into_parts();
        let gaps: Vec<_> = prober.probed_at.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(gaps, vec![Duration::from_millis(1500); 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_between_ticks() {
        let (mut monitor, recorded) = monitor(config(1000, 2, None), vec![ok(1); 10], Duration::ZERO);

        let summary = monitor.run(stop_after(Duration::from_millis(2500))).await.unwrap();

        assert!(summary.interrupted);
        assert_eq!(recorded.borrow().statuses.len(), 3);
        assert!(recorded.borrow().finished);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_full_interval_probe_is_honoured_next_tick() {
        for _ in 0..20 {
            let (mut monitor, recorded) =
                monitor(config(1000, 1, Some(3)), vec![ok(1); 3], Duration::from_secs(1));

            let summary = monitor.run(stop_after(Duration::from_millis(500))).await.unwrap();

            assert!(summary.interrupted);
            assert_eq!(summary.statistics.total_probes, 1);
            assert_eq!(recorded.borrow().statuses.len(), 1);
            assert!(recorded.borrow().finished);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_last_probe_is_reported() {
        let (mut monitor, _) = monitor(config(1000, 1, Some(1)), vec![ok(1)], Duration::from_secs(1));

        let summary = monitor.run(stop_after(Duration::from_millis(500))).await.unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.statistics.total_probes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_stop_skips_probing() {
        let (mut monitor, recorded) = monitor(config(1000, 1, Some(3)), vec![ok(1); 3], Duration::from_secs(1));

        let (_stop_tx, stop_rx) = watch::channel(true);
        let summary = monitor.run(stop_rx).await.unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.statistics.total_probes, 0);
        assert!(recorded.borrow().finished);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_stop_sender_runs_to_completion() {
        let (mut monitor, _) = monitor(config(1000, 1, Some(3)), vec![ok(1); 3], Duration::ZERO);

        let (stop_tx, stop_rx) = watch::channel(false);
        drop(stop_tx);
        let summary = monitor.run(stop_rx).await.unwrap();

        assert!(!summary.interrupted);
        assert_eq!(summary.statistics.total_probes, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_error_stops_loop() {
        let mut reporters = Reporters::new();
        reporters.push(FailingReporter);
        let mut monitor = Monitor::new(
            config(1000, 1, None),
            ScriptedProber::new(vec![ok(1)], Duration::ZERO),
            reporters,
        )
        .unwrap();

        let err = monitor.run(never_stop()).await.unwrap_err();
        assert_eq!(err.sink, "rtt.csv");
        assert_eq!(monitor.statistics().total_probes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verbose_console_prints_each_line_once() {
        use crate::report::ConsoleReporter;

        let config = RunConfig { verbose: true, ..config(1000, 1, Some(2)) };
        let console = ConsoleReporter::new(Vec::new(), "192.0.2.1", true);
        let prober = ScriptedProber::new(vec![ProbeOutcome::Timeout, ok(1)], Duration::ZERO);
        let mut monitor = Monitor::new(config, prober, console).unwrap();

        monitor.run(never_stop()).await.unwrap();

        let (_, console) = monitor.into_parts();
        let output = String::from_utf8(console.into_inner()).unwrap();
        let count = |needle: &str| output.lines().filter(|l| l.contains(needle)).count();
        assert_eq!(count("Start host=192.0.2.1"), 1);
        assert_eq!(count("192.0.2.1 DOWN uptime"), 1);
        assert_eq!(count("192.0.2.1 UP downtime"), 1);
        assert_eq!(count("Elapsed:"), 1);
        assert_eq!(output.lines().count(), 6);
    }

    #[test]
    fn test_new_uses_threshold() {
        let (monitor, _) = monitor(config(1000, 3, None), vec![], Duration::ZERO);
        assert_eq!(monitor.tracker_state().threshold, 3);
        assert!(monitor.tracker_state().is_up);
    }
}
