// src/health/summary.rs
use crate::checker::SweepResult;
use crate::probe::ProbeOutcome;
use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct HealthSummary {
    pub all_healthy: bool,
    pub failing_count: usize,
    /// Failing outcomes in target order.
    pub failing: Vec<ProbeOutcome>,
    pub timestamp: DateTime<Utc>,
    pub formatted_report: String,
}

/// How a summary relates to the one before it. Notification cadence is
/// decided by the caller from this classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTransition {
    /// No previous sweep.
    Initial,
    Unchanged,
    Recovered,
    Degraded,
    /// Still unhealthy, but a different set of targets is failing.
    FailuresChanged,
}

impl HealthTransition {
    pub fn is_change(self) -> bool {
        !matches!(self, HealthTransition::Unchanged)
    }
}

/// Reduces a sweep to its health summary. Pure: the timestamp comes from the
/// sweep itself, so equal inputs give equal summaries.
pub fn summarize(sweep: &SweepResult) -> HealthSummary {
    let failing: Vec<ProbeOutcome> = sweep.iter().filter(|o| !o.success).cloned().collect();

    let mut formatted_report = String::new();
    for outcome in sweep.iter() {
        write_report_line(&mut formatted_report, outcome);
    }

    HealthSummary {
        all_healthy: failing.is_empty(),
        failing_count: failing.len(),
        failing,
        timestamp: sweep.completed_at,
        formatted_report,
    }
}

fn write_report_line(out: &mut String, outcome: &ProbeOutcome) {
    let marker = if outcome.success { "✅" } else { "❌" };
    // Writing into a String cannot fail.
    let _ = write!(
        out,
        "{} {}: {} ({:?})",
        marker, outcome.target.name, outcome.status_code, outcome.elapsed
    );
    if let Some(error) = &outcome.error {
        let _ = write!(out, " - {}", error);
    }
    out.push('\n');
}

fn round_to_millis(elapsed: Duration) -> Duration {
    Duration::from_millis(elapsed.as_millis() as u64)
}

impl HealthSummary {
    /// Compact status for a tray title or log line, e.g. `OK (15:04)`.
    pub fn status_line(&self) -> String {
        let at = self.timestamp.format("%H:%M");
        if self.all_healthy {
            format!("OK ({})", at)
        } else {
            format!("{} failing ({})", self.failing_count, at)
        }
    }

    /// One bullet per failing target, used as a notification body.
    pub fn failure_digest(&self) -> String {
        let mut digest = String::new();
        for outcome in &self.failing {
            let reason = match &outcome.error {
                Some(error) => error.to_string(),
                None => format!("status {}", outcome.status_code),
            };
            let _ = writeln!(
                digest,
                "• {}: {} ({:?})",
                outcome.target.name,
                reason,
                round_to_millis(outcome.elapsed)
            );
        }
        digest
    }

    pub fn failing_names(&self) -> Vec<&str> {
        self.failing.iter().map(|o| o.target.name.as_str()).collect()
    }

    pub fn transition_from(&self, previous: Option<&HealthSummary>) -> HealthTransition {
        let Some(previous) = previous else {
            return HealthTransition::Initial;
        };

        match (previous.all_healthy, self.all_healthy) {
            (true, true) => HealthTransition::Unchanged,
            (true, false) => HealthTransition::Degraded,
            (false, true) => HealthTransition::Recovered,
            (false, false) if previous.failing_names() == self.failing_names() => {
                HealthTransition::Unchanged
            }
            (false, false) => HealthTransition::FailuresChanged,
        }
    }
}
