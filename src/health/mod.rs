// src/health/mod.rs
mod summary;

pub use summary::{summarize, HealthSummary, HealthTransition};
