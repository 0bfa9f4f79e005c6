// src/controller/scheduler.rs
use super::state::{ControllerPhase, ControllerState};
use crate::checker::Checker;
use crate::health::{summarize, HealthSummary};
use crate::metrics::MetricsCollector;
use crate::notify::SweepObserver;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

/// Requests accepted by the controller's event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TriggerNow,
    Pause,
    Resume,
    TogglePause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepTrigger {
    Timer,
    Manual,
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("sweep interval must be greater than zero")]
    InvalidInterval,

    #[error("controller event loop already started")]
    AlreadyStarted,
}

/// Owns the periodic schedule and serializes sweeps: at most one sweep is
/// ever in flight, whether it was started by the timer or on request.
pub struct Controller {
    checker: Arc<Checker>,
    interval: Duration,
    observer: Arc<dyn SweepObserver>,
    metrics: Option<Arc<MetricsCollector>>,
    state: RwLock<ControllerState>,
    command_tx: mpsc::UnboundedSender<Command>,
    command_rx: Mutex<Option<mpsc::UnboundedReceiver<Command>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Controller {
    pub fn new(
        checker: Checker,
        interval: Duration,
        observer: Arc<dyn SweepObserver>,
    ) -> Result<Self, ControllerError> {
        if interval.is_zero() {
            return Err(ControllerError::InvalidInterval);
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            checker: Arc::new(checker),
            interval,
            observer,
            metrics: None,
            state: RwLock::new(ControllerState::default()),
            command_tx,
            command_rx: Mutex::new(Some(command_rx)),
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Runs the event loop until `shutdown()`. The first timer tick fires
    /// immediately, which gives the startup sweep. A sweep still running at
    /// shutdown is awaited before this returns.
    pub async fn start(self: Arc<Self>) -> Result<(), ControllerError> {
        let mut commands = self
            .command_rx
            .lock()
            .await
            .take()
            .ok_or(ControllerError::AlreadyStarted)?;

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown_rx = self.shutdown_rx.clone();
        let mut in_flight: Option<JoinHandle<()>> = None;

        info!(
            "Starting controller with interval {:?} for {} targets",
            self.interval,
            self.checker.targets().len()
        );

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Controller shutting down");
                        break;
                    }
                }
                Some(command) = commands.recv() => {
                    self.clone().handle_command(command, &mut in_flight).await;
                }
                _ = ticker.tick() => {
                    if self.state.read().await.paused {
                        debug!("Timer tick ignored while paused");
                        continue;
                    }
                    self.clone().launch_sweep(SweepTrigger::Timer, &mut in_flight).await;
                }
            }
        }

        if let Some(handle) = in_flight.take() {
            debug!("Waiting for in-flight sweep to finish");
            if let Err(e) = handle.await {
                error!("Sweep task join error: {}", e);
            }
        }

        let mut state = self.state.write().await;
        state.sweep_in_flight = false;
        state.stopped = true;
        info!("Controller stopped after {} sweeps", state.sweeps_completed);

        Ok(())
    }

    async fn handle_command(
        self: Arc<Self>,
        command: Command,
        in_flight: &mut Option<JoinHandle<()>>,
    ) {
        match command {
            Command::TriggerNow => {
                self.launch_sweep(SweepTrigger::Manual, in_flight).await;
            }
            Command::Pause => self.set_paused(Some(true)).await,
            Command::Resume => self.set_paused(Some(false)).await,
            Command::TogglePause => self.set_paused(None).await,
        }
    }

    async fn set_paused(&self, paused: Option<bool>) {
        let mut state = self.state.write().await;
        state.paused = paused.unwrap_or(!state.paused);
        if state.paused {
            info!("Periodic checks paused");
        } else {
            info!("Periodic checks resumed");
        }
    }

    async fn launch_sweep(
        self: Arc<Self>,
        trigger: SweepTrigger,
        in_flight: &mut Option<JoinHandle<()>>,
    ) {
        if !self.state.write().await.try_begin_sweep() {
            debug!(?trigger, "Sweep already in flight, request dropped");
            return;
        }

        // Reap the previous sweep's handle; its slot was already released.
        if let Some(handle) = in_flight.take() {
            if let Err(e) = handle.await {
                error!("Sweep task join error: {}", e);
            }
        }

        let controller = self.clone();
        *in_flight = Some(tokio::spawn(async move {
            let worker = controller.clone();
            if let Err(e) = tokio::spawn(async move { worker.run_sweep(trigger).await }).await {
                error!(?trigger, "Sweep task failed: {}", e);
            }
            // Released even when the sweep or an observer panicked.
            controller.state.write().await.end_sweep();
        }));
    }

    async fn run_sweep(&self, trigger: SweepTrigger) {
        debug!(?trigger, "Sweep started");

        let sweep = self.checker.check_all().await;
        let summary = summarize(&sweep);

        if let Some(metrics) = &self.metrics {
            metrics.record_sweep(&sweep, &summary);
        }

        self.state.write().await.record_sweep(&summary);

        // Still holding the sweep slot, so observers are never invoked concurrently.
        self.observer.on_sweep_complete(&summary).await;
    }

    fn send(&self, command: Command) {
        if self.command_tx.send(command).is_err() {
            debug!(?command, "Controller loop gone, command dropped");
        }
    }

    /// Requests an immediate sweep. Runs even while paused; dropped if a
    /// sweep is already in flight.
    pub fn trigger_now(&self) {
        self.send(Command::TriggerNow);
    }

    /// Suppresses timer-driven sweeps. Manual triggers still run.
    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    pub fn toggle_pause(&self) {
        self.send(Command::TogglePause);
    }

    /// Stops future scheduling. Does not abort a sweep already running.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Formatted report of the last completed sweep; empty before the first.
    pub async fn current_report(&self) -> String {
        self.state.read().await.last_report.clone()
    }

    pub async fn last_summary(&self) -> Option<HealthSummary> {
        self.state.read().await.last_summary.clone()
    }

    pub async fn snapshot(&self) -> ControllerState {
        self.state.read().await.clone()
    }

    pub async fn phase(&self) -> ControllerPhase {
        self.state.read().await.phase()
    }
}
