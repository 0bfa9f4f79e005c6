// src/controller/state.rs
use crate::health::HealthSummary;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Idle,
    SweepRunning,
    Paused,
    Stopped,
}

/// Mutable controller state. Always accessed under the controller's lock.
#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    pub paused: bool,
    pub sweep_in_flight: bool,
    pub stopped: bool,
    pub last_sweep_time: Option<DateTime<Utc>>,
    pub last_report: String,
    pub last_summary: Option<HealthSummary>,
    pub sweeps_completed: u64,
}

impl ControllerState {
    /// A manual sweep may run while paused, so a running sweep takes
    /// precedence over the paused flag.
    pub fn phase(&self) -> ControllerPhase {
        if self.stopped {
            ControllerPhase::Stopped
        } else if self.sweep_in_flight {
            ControllerPhase::SweepRunning
        } else if self.paused {
            ControllerPhase::Paused
        } else {
            ControllerPhase::Idle
        }
    }

    /// Claims the single sweep slot. Returns false if a sweep already holds it.
    pub fn try_begin_sweep(&mut self) -> bool {
        if self.sweep_in_flight || self.stopped {
            return false;
        }
        self.sweep_in_flight = true;
        true
    }

    pub fn record_sweep(&mut self, summary: &HealthSummary) {
        self.last_sweep_time = Some(summary.timestamp);
        self.last_report = summary.formatted_report.clone();
        self.last_summary = Some(summary.clone());
        self.sweeps_completed += 1;
    }

    pub fn end_sweep(&mut self) {
        self.sweep_in_flight = false;
    }
}
