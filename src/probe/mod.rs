// src/probe/mod.rs
mod http;
mod outcome;

pub use http::{HttpProber, Prober, BODY_READ_LIMIT, DEFAULT_USER_AGENT};
pub use outcome::{is_success_status, FailureKind, ProbeError, ProbeOutcome, Target};
