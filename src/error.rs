//! Error taxonomy for configuration, trial execution, and batch orchestration.

use std::fmt;

use thiserror::Error;

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"room.air_capacity_j_per_k"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced to the caller of a batch.
///
/// Individual trial failures are never reported here; they are counted in
/// the returned [`Batch`](crate::montecarlo::Batch). Only a batch with no
/// successful trial at all turns into [`SimError::NoSuccessfulRuns`].
#[derive(Debug, Error)]
pub enum SimError {
    /// Configuration rejected before any trial ran.
    #[error("invalid configuration: {}", ErrorList(.0))]
    InvalidConfig(Vec<ConfigError>),

    #[error("no successful runs: {failed} of {attempted} trials failed ({timed_out} timed out)")]
    NoSuccessfulRuns {
        attempted: usize,
        failed: usize,
        timed_out: usize,
    },

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Reasons a single trial is dropped from a batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrialError {
    #[error("numeric instability at t={time_s:.0}s after {events} consecutive rejected steps")]
    NumericInstability { time_s: f64, events: u32 },

    #[error("trial exceeded the batch deadline at t={time_s:.0}s")]
    Timeout { time_s: f64 },
}

impl TrialError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Batch-level result type.
pub type Result<T> = std::result::Result<T, SimError>;

struct ErrorList<'a>(&'a [ConfigError]);

impl fmt::Display for ErrorList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}
