// src/notify/observer.rs
use crate::health::{HealthSummary, HealthTransition};
use async_trait::async_trait;
use serde::Deserialize;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Receives every completed sweep. The controller never invokes an observer
/// concurrently with itself.
#[async_trait]
pub trait SweepObserver: Send + Sync {
    async fn on_sweep_complete(&self, summary: &HealthSummary);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyPolicy {
    /// Report the outcome of every sweep.
    #[default]
    EverySweep,
    /// Report only when aggregate health changes (edge-triggered).
    OnChange,
}

impl NotifyPolicy {
    pub fn should_notify(self, transition: HealthTransition) -> bool {
        match self {
            NotifyPolicy::EverySweep => true,
            NotifyPolicy::OnChange => transition.is_change(),
        }
    }
}

struct ConsoleState {
    out: Box<dyn Write + Send>,
    previous: Option<HealthSummary>,
}

/// Prints "all good" or the failure digest, subject to a notify policy.
pub struct ConsoleNotifier {
    policy: NotifyPolicy,
    state: Mutex<ConsoleState>,
}

impl ConsoleNotifier {
    pub fn new(policy: NotifyPolicy) -> Self {
        Self::with_writer(policy, Box::new(std::io::stdout()))
    }

    pub fn with_writer(policy: NotifyPolicy, out: Box<dyn Write + Send>) -> Self {
        Self {
            policy,
            state: Mutex::new(ConsoleState {
                out,
                previous: None,
            }),
        }
    }
}

#[async_trait]
impl SweepObserver for ConsoleNotifier {
    async fn on_sweep_complete(&self, summary: &HealthSummary) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let transition = summary.transition_from(state.previous.as_ref());
        state.previous = Some(summary.clone());

        if !self.policy.should_notify(transition) {
            return;
        }

        let written = if summary.all_healthy {
            writeln!(state.out, "All sites are up ({})", summary.status_line())
        } else {
            write!(
                state.out,
                "Problems detected ({}):\n{}",
                summary.status_line(),
                summary.failure_digest()
            )
        };

        if let Err(e) = written.and_then(|_| state.out.flush()) {
            warn!("Failed to write console notification: {}", e);
        }
    }
}

/// Logs the status line of every sweep.
pub struct LogObserver;

#[async_trait]
impl SweepObserver for LogObserver {
    async fn on_sweep_complete(&self, summary: &HealthSummary) {
        if summary.all_healthy {
            info!("Status: {}", summary.status_line());
        } else {
            for outcome in &summary.failing {
                warn!(
                    site = %outcome.target.name,
                    status = outcome.status_code,
                    error = %outcome.error_message(),
                    "Target unhealthy"
                );
            }
            warn!("Status: {}", summary.status_line());
        }
    }
}

/// Fans a completed sweep out to several observers, in registration order.
#[derive(Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn SweepObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn SweepObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

#[async_trait]
impl SweepObserver for ObserverSet {
    async fn on_sweep_complete(&self, summary: &HealthSummary) {
        for observer in &self.observers {
            observer.on_sweep_complete(summary).await;
        }
    }
}
