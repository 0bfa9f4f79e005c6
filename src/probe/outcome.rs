// src/probe/outcome.rs
use std::time::Duration;

/// One configured endpoint. Immutable once loaded; shared read-only across probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub url: String,
    pub timeout: Duration,
}

impl Target {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            timeout,
        }
    }
}

/// Transport-level failures captured by a probe. An unsuccessful HTTP status
/// is not an error here; it is carried by `ProbeOutcome::status_code`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("request creation failed: {0}")]
    RequestConstruction(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("response read failed: {0}")]
    ResponseRead(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Malformed target URL. A configuration defect, not transient.
    RequestConstruction,
    /// Network, TLS or timeout failure.
    Connection,
    /// Connected, but the body could not be read. Status code is retained.
    ResponseRead,
    /// Valid exchange with a status outside [200, 300).
    UnsuccessfulStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub target: Target,
    pub success: bool,
    /// 0 when no response was received.
    pub status_code: u16,
    pub error: Option<ProbeError>,
    pub elapsed: Duration,
}

impl ProbeOutcome {
    /// Outcome of a completed HTTP exchange whose body was read cleanly.
    pub fn from_status(target: Target, status_code: u16, elapsed: Duration) -> Self {
        Self {
            target,
            success: is_success_status(status_code),
            status_code,
            error: None,
            elapsed,
        }
    }

    /// Failing outcome for a transport error. `status_code` is 0 unless the
    /// server already answered (response-read failures).
    pub fn from_error(
        target: Target,
        error: ProbeError,
        status_code: u16,
        elapsed: Duration,
    ) -> Self {
        Self {
            target,
            success: false,
            status_code,
            error: Some(error),
            elapsed,
        }
    }

    /// Empty on success and on plain status-code failures.
    pub fn error_message(&self) -> String {
        self.error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        if self.success {
            return None;
        }

        Some(match &self.error {
            Some(ProbeError::RequestConstruction(_)) => FailureKind::RequestConstruction,
            Some(ProbeError::Connection(_)) => FailureKind::Connection,
            Some(ProbeError::ResponseRead(_)) => FailureKind::ResponseRead,
            None => FailureKind::UnsuccessfulStatus,
        })
    }
}

/// Only 2xx counts as healthy. Redirects that reach the prober are failures.
pub fn is_success_status(status_code: u16) -> bool {
    (200..300).contains(&status_code)
}
