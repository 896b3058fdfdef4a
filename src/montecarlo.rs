//! Monte Carlo batches of independent trials.
//!
//! Every trial owns its RNG, weather profile, controller and model; only the
//! configuration is shared, read-only. Parallel batches run on a thread pool
//! built for the batch alone, so concurrent batches never share state.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::equipment::EquipmentConfig;
use crate::error::{ConfigError, Result, SimError, TrialError};
use crate::sim::controller::SigmoidalController;
use crate::sim::integrator::{Integrator, IntegratorConfig, Trajectory, TrialResult};
use crate::sim::room::{PhysicalConfig, RoomModel};
use crate::stats::{CostStats, SafetySummary, TemperatureStats};
use crate::weather::{HOURS_PER_DAY, WeatherConfig, WeatherGenerator};

/// Batch size, scheduling and sampling options.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    pub n_trials: usize,
    pub horizon_hours: usize,
    pub parallel: bool,
    /// Upper bound on worker threads. `None` uses every available core.
    pub workers: Option<usize>,
    /// Master seed. `None` draws one from OS entropy.
    pub seed: Option<u64>,
    /// Number of leading successful trials whose full trajectory is kept.
    pub trajectory_samples: usize,
    /// Wall-clock budget for the whole batch.
    pub deadline: Option<Duration>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            n_trials: 50,
            horizon_hours: 31 * HOURS_PER_DAY,
            parallel: true,
            workers: None,
            seed: None,
            trajectory_samples: 10,
            deadline: None,
        }
    }
}

/// Result of a batch. Owned by the caller; no batch state outlives it.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Cost of every successful trial, in trial order (USD).
    pub costs: Vec<f64>,
    /// Full trajectories of the first successful trials.
    pub sample_trajectories: Vec<Trajectory>,
    /// Hourly case temperature of every successful trial.
    pub case_temperature_profiles: Vec<Vec<f64>>,
    pub max_case_temps: Vec<f64>,
    pub hours_above_case_limit: Vec<f64>,
    pub case_limit_c: f64,
    pub attempted: usize,
    /// Trials dropped for any reason, timeouts included.
    pub failed_count: usize,
    pub timed_out_count: usize,
    /// Recovered step rejections summed over successful trials.
    pub stability_warnings: u64,
    /// Master seed the trial streams were derived from.
    pub master_seed: u64,
}

impl Batch {
    pub fn successful(&self) -> usize {
        self.costs.len()
    }

    /// Share of attempted trials that were dropped, in `[0, 1]`.
    pub fn failure_ratio(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        self.failed_count as f64 / self.attempted as f64
    }

    pub fn cost_stats(&self) -> Option<CostStats> {
        CostStats::from_costs(&self.costs)
    }

    pub fn temperature_stats(&self) -> Option<TemperatureStats> {
        TemperatureStats::from_profiles(&self.case_temperature_profiles)
    }

    pub fn safety(&self) -> Option<SafetySummary> {
        SafetySummary::from_trials(
            &self.max_case_temps,
            &self.hours_above_case_limit,
            self.case_limit_c,
        )
    }

    /// Folds per-trial outcomes, in trial order, into a batch.
    fn from_outcomes(
        outcomes: Vec<std::result::Result<TrialResult, TrialError>>,
        case_limit_c: f64,
        trajectory_samples: usize,
        master_seed: u64,
    ) -> Self {
        let n = outcomes.len();
        let mut batch = Batch {
            costs: Vec::with_capacity(n),
            sample_trajectories: Vec::with_capacity(trajectory_samples.min(n)),
            case_temperature_profiles: Vec::with_capacity(n),
            max_case_temps: Vec::with_capacity(n),
            hours_above_case_limit: Vec::with_capacity(n),
            case_limit_c,
            attempted: n,
            failed_count: 0,
            timed_out_count: 0,
            stability_warnings: 0,
            master_seed,
        };

        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(result) => {
                    debug!(
                        trial = index,
                        cost_usd = result.cost_usd,
                        max_case_c = result.max_case_temp_c,
                        "trial finished"
                    );
                    if result.stability_warnings > 0 {
                        warn!(
                            trial = index,
                            rejected_steps = result.stability_warnings,
                            "trial recovered from numerical instability"
                        );
                    }
                    batch.costs.push(result.cost_usd);
                    batch.max_case_temps.push(result.max_case_temp_c);
                    batch.hours_above_case_limit.push(result.hours_above_case_limit);
                    batch.stability_warnings += u64::from(result.stability_warnings);
                    batch
                        .case_temperature_profiles
                        .push(result.trajectory.case_c.clone());
                    if batch.sample_trajectories.len() < trajectory_samples {
                        batch.sample_trajectories.push(result.trajectory);
                    }
                }
                Err(err) => {
                    warn!(trial = index, error = %err, "trial dropped");
                    batch.failed_count += 1;
                    if err.is_timeout() {
                        batch.timed_out_count += 1;
                    }
                }
            }
        }
        batch
    }
}

/// Derives the seed of trial `index` from the master seed (SplitMix64).
///
/// Neighbouring indices map to unrelated streams.
pub fn trial_seed(master: u64, index: usize) -> u64 {
    let mut z = master.wrapping_add((index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

struct TrialContext<'a> {
    physical: &'a PhysicalConfig,
    equipment: &'a EquipmentConfig,
    integrator: &'a IntegratorConfig,
    generator: WeatherGenerator,
    horizon_hours: usize,
    master_seed: u64,
    deadline: Option<Instant>,
}

impl TrialContext<'_> {
    fn run(&self, index: usize) -> std::result::Result<TrialResult, TrialError> {
        let mut rng = StdRng::seed_from_u64(trial_seed(self.master_seed, index));
        let weather = self.generator.generate_profile(&mut rng);
        let model = RoomModel::new(self.physical);
        let mut controller = SigmoidalController::new(&self.physical.control, self.equipment);
        Integrator::new(self.integrator, self.equipment, self.physical)
            .with_deadline(self.deadline)
            .run(
                &model,
                &mut controller,
                &weather,
                self.physical.initial.state(),
                self.horizon_hours,
            )
    }
}

pub(crate) fn validate_options(options: &BatchOptions, weather: &WeatherConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    if options.horizon_hours == 0 {
        errors.push(ConfigError::new("simulation.horizon_hours", "must be > 0"));
    } else if options.horizon_hours > weather.days * HOURS_PER_DAY {
        errors.push(ConfigError::new(
            "simulation.horizon_hours",
            format!(
                "must not exceed the weather span of {} h",
                weather.days * HOURS_PER_DAY
            ),
        ));
    }
    if options.workers == Some(0) {
        errors.push(ConfigError::new("simulation.workers", "must be > 0"));
    }
    if let Some(d) = options.deadline {
        if d.is_zero() {
            errors.push(ConfigError::new("simulation.deadline_s", "must be > 0"));
        }
    }
    errors
}

fn worker_count(options: &BatchOptions) -> usize {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    options
        .workers
        .unwrap_or(available)
        .min(available)
        .min(options.n_trials)
        .max(1)
}

/// Runs `options.n_trials` independent trials and collects their outcomes.
///
/// Trial `i` always draws from the same random stream for a given master
/// seed, so sequential and parallel runs of the same batch give identical
/// per-trial results.
///
/// # Arguments
///
/// * `physical` - Room parameters, shared read-only
/// * `equipment` - Cooling unit, shared read-only
/// * `weather` - Weather distribution each trial samples from
/// * `integrator` - Numerical settings
/// * `options` - Batch size and scheduling
///
/// # Errors
///
/// * [`SimError::InvalidConfig`] if any input fails validation; no trial runs
/// * [`SimError::NoSuccessfulRuns`] if `n_trials == 0` or every trial failed
/// * [`SimError::WorkerPool`] if the thread pool cannot be built
pub fn run_batch(
    physical: &PhysicalConfig,
    equipment: &EquipmentConfig,
    weather: &WeatherConfig,
    integrator: &IntegratorConfig,
    options: &BatchOptions,
) -> Result<Batch> {
    let mut errors = physical.validate();
    errors.extend(equipment.validate("equipment"));
    errors.extend(weather.validate());
    errors.extend(integrator.validate());
    errors.extend(validate_options(options, weather));
    if !errors.is_empty() {
        return Err(SimError::InvalidConfig(errors));
    }

    let n = options.n_trials;
    if n == 0 {
        return Err(SimError::NoSuccessfulRuns {
            attempted: 0,
            failed: 0,
            timed_out: 0,
        });
    }

    let generator = WeatherGenerator::new(weather).map_err(|e| SimError::InvalidConfig(vec![e]))?;
    let master_seed = options.seed.unwrap_or_else(|| rand::rng().random());
    let started = Instant::now();
    let context = TrialContext {
        physical,
        equipment,
        integrator,
        generator,
        horizon_hours: options.horizon_hours,
        master_seed,
        deadline: options.deadline.map(|d| started + d),
    };

    let outcomes: Vec<std::result::Result<TrialResult, TrialError>> = if options.parallel {
        let workers = worker_count(options);
        info!(
            trials = n,
            workers,
            horizon_h = options.horizon_hours,
            seed = master_seed,
            equipment = %equipment.name,
            "starting parallel batch"
        );
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("trial-worker-{i}"))
            .build()?;
        pool.install(|| (0..n).into_par_iter().map(|i| context.run(i)).collect())
    } else {
        info!(
            trials = n,
            horizon_h = options.horizon_hours,
            seed = master_seed,
            equipment = %equipment.name,
            "starting sequential batch"
        );
        (0..n).map(|i| context.run(i)).collect()
    };

    let batch = Batch::from_outcomes(
        outcomes,
        physical.case_limit_c,
        options.trajectory_samples,
        master_seed,
    );

    info!(
        successful = batch.successful(),
        failed = batch.failed_count,
        timed_out = batch.timed_out_count,
        failure_ratio = batch.failure_ratio(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "batch finished"
    );

    if batch.costs.is_empty() {
        return Err(SimError::NoSuccessfulRuns {
            attempted: n,
            failed: batch.failed_count,
            timed_out: batch.timed_out_count,
        });
    }
    Ok(batch)
}
