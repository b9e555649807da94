use std::fmt;
use std::time::Duration;

/// Result of a single echo request.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Success { rtt: Duration },
    Timeout,
    SendError { message: String },
}

impl ProbeOutcome {
    pub fn success(rtt: Duration) -> Self {
        ProbeOutcome::Success { rtt }
    }

    pub fn send_error(message: impl Into<String>) -> Self {
        ProbeOutcome::SendError {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success { .. })
    }

    pub fn rtt(&self) -> Option<Duration> {
        match self {
            ProbeOutcome::Success { rtt } => Some(*rtt),
            _ => None,
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Success { rtt } => write!(f, "success {:.3} ms", rtt_millis(*rtt)),
            ProbeOutcome::Timeout => f.write_str("timeout"),
            ProbeOutcome::SendError { message } => write!(f, "error: {message}"),
        }
    }
}

pub fn rtt_millis(rtt: Duration) -> f64 {
    rtt.as_secs_f64() * 1000.0
}

/// Running totals over every probe of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeStatistics {
    pub total_probes: u64,
    pub successful_probes: u64,
    pub failed_probes: u64,
    pub total_response_time: f64,
    pub min_response_time: Option<f64>,
    pub max_response_time: Option<f64>,
}

impl ProbeStatistics {
    pub fn record(&mut self, outcome: &ProbeOutcome) {
        self.total_probes += 1;
        match outcome.rtt() {
            Some(rtt) => {
                let ms = rtt_millis(rtt);
                self.successful_probes += 1;
                self.total_response_time += ms;
                self.min_response_time = Some(self.min_response_time.map_or(ms, |m| m.min(ms)));
                self.max_response_time = Some(self.max_response_time.map_or(ms, |m| m.max(ms)));
            }
            None => self.failed_probes += 1,
        }
    }

    pub fn loss_rate(&self) -> f64 {
        if self.total_probes > 0 {
            (self.failed_probes as f64 / self.total_probes as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn mean_response_time(&self) -> Option<f64> {
        (self.successful_probes > 0)
            .then(|| self.total_response_time / self.successful_probes as f64)
    }
}

impl fmt::Display for ProbeStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} probes, {} ok, {} failed, {:.1}% loss",
            self.total_probes,
            self.successful_probes,
            self.failed_probes,
            self.loss_rate()
        )?;
        if let (Some(min), Some(mean), Some(max)) = (
            self.min_response_time,
            self.mean_response_time(),
            self.max_response_time,
        ) {
            write!(f, ", rtt min/avg/max {min:.3}/{mean:.3}/{max:.3} ms")?;
        }
        Ok(())
    }
}
