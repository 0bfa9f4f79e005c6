// src/checker/mod.rs
mod sweep;

pub use sweep::{Checker, CheckerError, SweepResult};
