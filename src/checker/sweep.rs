// src/checker/sweep.rs
use crate::probe::{ProbeError, ProbeOutcome, Prober, Target};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CheckerError {
    #[error("concurrency limit must be at least 1, got {0}")]
    InvalidConcurrencyLimit(usize),
}

/// Outcomes of one sweep, index-aligned with the configured targets.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepResult {
    pub outcomes: Vec<ProbeOutcome>,
    pub completed_at: DateTime<Utc>,
    pub duration: Duration,
}

impl SweepResult {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProbeOutcome> {
        self.outcomes.iter()
    }
}

/// Fans probes out across all targets, at most `concurrency_limit` at a time.
pub struct Checker {
    prober: Arc<dyn Prober>,
    targets: Arc<[Target]>,
    concurrency_limit: usize,
}

impl Checker {
    pub fn new(
        prober: Arc<dyn Prober>,
        targets: Vec<Target>,
        concurrency_limit: usize,
    ) -> Result<Self, CheckerError> {
        if concurrency_limit == 0 {
            return Err(CheckerError::InvalidConcurrencyLimit(concurrency_limit));
        }

        Ok(Self {
            prober,
            targets: targets.into(),
            concurrency_limit,
        })
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Runs one sweep. Returns only after every dispatched probe finished;
    /// `result.outcomes[i]` always belongs to `targets()[i]`.
    pub async fn check_all(&self) -> SweepResult {
        let sweep_id = Uuid::new_v4();
        let span = info_span!("sweep", id = %sweep_id, targets = self.targets.len());

        async {
            let start = Instant::now();
            let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
            let mut tasks = Vec::with_capacity(self.targets.len());

            for index in 0..self.targets.len() {
                let prober = self.prober.clone();
                let targets = self.targets.clone();
                let semaphore = semaphore.clone();

                let task = tokio::spawn(
                    async move {
                        // The semaphore is never closed, so acquire only fails if
                        // that invariant is broken; treat it like a failed dispatch.
                        let _permit = match semaphore.acquire_owned().await {
                            Ok(permit) => permit,
                            Err(e) => {
                                return ProbeOutcome::from_error(
                                    targets[index].clone(),
                                    ProbeError::Connection(format!("dispatch failed: {}", e)),
                                    0,
                                    Duration::ZERO,
                                );
                            }
                        };
                        prober.probe(&targets[index]).await
                    }
                    .in_current_span(),
                );
                tasks.push(task);
            }

            // join_all keeps spawn order, which is target order.
            let joined = futures::future::join_all(tasks).await;

            let outcomes: Vec<ProbeOutcome> = joined
                .into_iter()
                .zip(self.targets.iter())
                .map(|(result, target)| match result {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!(site = %target.name, "probe task join error: {}", e);
                        ProbeOutcome::from_error(
                            target.clone(),
                            ProbeError::Connection(format!("probe task aborted: {}", e)),
                            0,
                            Duration::ZERO,
                        )
                    }
                })
                .collect();

            let duration = start.elapsed();
            let failing = outcomes.iter().filter(|o| !o.success).count();
            debug!(?duration, "all probes joined");
            info!(
                "Sweep complete: {} healthy, {} failing",
                outcomes.len() - failing,
                failing
            );

            SweepResult {
                outcomes,
                completed_at: Utc::now(),
                duration,
            }
        }
        .instrument(span)
        .await
    }
}
