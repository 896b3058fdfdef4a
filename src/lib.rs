//! Monte Carlo thermal and cost simulator for a data-center server room.
//!
//! A batch samples one month of stochastic weather per trial, integrates
//! the room's four-node thermal model under a sigmoidal cooling controller,
//! and reduces the per-trial electricity costs and case temperatures to
//! summary statistics.

pub mod config;
pub mod equipment;
pub mod error;
pub mod io;
pub mod montecarlo;
/// Thermal model, controller, and integrator.
pub mod sim;
pub mod stats;
pub mod telemetry;
pub mod weather;

pub use error::{ConfigError, SimError, TrialError};
pub use montecarlo::{Batch, BatchOptions, run_batch};
