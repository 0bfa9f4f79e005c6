// src/metrics/collector.rs
use crate::checker::SweepResult;
use crate::health::HealthSummary;
use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Sweep metrics
    pub sweeps_total: IntCounter,
    pub sweep_duration_seconds: Histogram,

    // Per-target metrics
    pub probe_duration_seconds: HistogramVec,
    pub target_up: IntGaugeVec,
    pub target_status_code: IntGaugeVec,

    // Aggregate metrics
    pub failing_targets: IntGauge,
    pub total_targets: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let sweeps_total = IntCounter::new("sc_sweeps_total", "Total number of completed sweeps")?;
        registry.register(Box::new(sweeps_total.clone()))?;

        let sweep_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "sc_sweep_duration_seconds",
            "Wall-clock duration of a sweep in seconds",
        ))?;
        registry.register(Box::new(sweep_duration_seconds.clone()))?;

        let probe_duration_seconds = HistogramVec::new(
            HistogramOpts::new("sc_probe_duration_seconds", "Probe duration in seconds"),
            &["target"],
        )?;
        registry.register(Box::new(probe_duration_seconds.clone()))?;

        let target_up = IntGaugeVec::new(
            Opts::new("sc_target_up", "Target health (1=healthy, 0=unhealthy)"),
            &["target"],
        )?;
        registry.register(Box::new(target_up.clone()))?;

        let target_status_code = IntGaugeVec::new(
            Opts::new(
                "sc_target_status_code",
                "Last HTTP status code per target (0=no response)",
            ),
            &["target"],
        )?;
        registry.register(Box::new(target_status_code.clone()))?;

        let failing_targets = IntGauge::new("sc_failing_targets", "Number of failing targets")?;
        registry.register(Box::new(failing_targets.clone()))?;

        let total_targets = IntGauge::new("sc_total_targets", "Total number of targets")?;
        registry.register(Box::new(total_targets.clone()))?;

        Ok(Self {
            sweeps_total,
            sweep_duration_seconds,
            probe_duration_seconds,
            target_up,
            target_status_code,
            failing_targets,
            total_targets,
        })
    }

    pub fn record_sweep(&self, sweep: &SweepResult, summary: &HealthSummary) {
        self.sweeps_total.inc();
        self.sweep_duration_seconds.observe(sweep.duration.as_secs_f64());

        for outcome in sweep.iter() {
            let name = outcome.target.name.as_str();
            self.probe_duration_seconds
                .with_label_values(&[name])
                .observe(outcome.elapsed.as_secs_f64());
            self.target_up
                .with_label_values(&[name])
                .set(if outcome.success { 1 } else { 0 });
            self.target_status_code
                .with_label_values(&[name])
                .set(i64::from(outcome.status_code));
        }

        self.failing_targets.set(summary.failing_count as i64);
        self.total_targets.set(sweep.len() as i64);
    }
}
