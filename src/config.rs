//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::equipment::{EquipmentConfig, EquipmentTier};
use crate::error::{ConfigError, Result, SimError};
use crate::montecarlo::{self, Batch, BatchOptions};
use crate::sim::integrator::IntegratorConfig;
use crate::sim::room::PhysicalConfig;
use crate::weather::{HOURS_PER_DAY, WeatherConfig};

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the reference scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::reference`] for the built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Batch size and scheduling.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Monthly weather distribution.
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Room thermal and economic parameters.
    #[serde(default)]
    pub room: PhysicalConfig,
    /// Cooling equipment tier and overrides.
    #[serde(default)]
    pub equipment: EquipmentSection,
    /// Numerical integration settings.
    #[serde(default)]
    pub integrator: IntegratorConfig,
}

/// Batch size and scheduling.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of Monte Carlo trials.
    pub trials: usize,
    /// Simulated span per trial (hours, must be > 0).
    pub horizon_hours: usize,
    /// Master random seed. Omit to seed from OS entropy.
    pub seed: Option<u64>,
    /// Run trials on a worker pool.
    pub parallel: bool,
    /// Worker cap. Omit to use every available core.
    pub workers: Option<usize>,
    /// Leading trials whose full trajectory is kept.
    pub trajectory_samples: usize,
    /// Wall-clock budget for the batch (seconds).
    pub deadline_s: Option<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            trials: 50,
            horizon_hours: 31 * HOURS_PER_DAY,
            seed: None,
            parallel: true,
            workers: None,
            trajectory_samples: 10,
            deadline_s: None,
        }
    }
}

/// Cooling equipment: a catalog tier plus optional per-field overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EquipmentSection {
    pub tier: EquipmentTier,
    pub nominal_cop: Option<f64>,
    pub reference_temp_c: Option<f64>,
    pub degradation_slope: Option<f64>,
    pub cop_floor: Option<f64>,
    pub nominal_power_w: Option<f64>,
    pub min_power_w: Option<f64>,
}

impl Default for EquipmentSection {
    fn default() -> Self {
        Self::tier(EquipmentTier::Efficient)
    }
}

impl EquipmentSection {
    /// A catalog tier without overrides.
    pub fn tier(tier: EquipmentTier) -> Self {
        Self {
            tier,
            nominal_cop: None,
            reference_temp_c: None,
            degradation_slope: None,
            cop_floor: None,
            nominal_power_w: None,
            min_power_w: None,
        }
    }

    /// Applies the overrides to the catalog record of the tier.
    pub fn resolve(&self) -> EquipmentConfig {
        let mut eq = self.tier.config();
        if let Some(v) = self.nominal_cop {
            eq.nominal_cop = v;
        }
        if let Some(v) = self.reference_temp_c {
            eq.reference_temp_c = v;
        }
        if let Some(v) = self.degradation_slope {
            eq.degradation_slope = v;
        }
        if let Some(v) = self.cop_floor {
            eq.cop_floor = v;
        }
        if let Some(v) = self.nominal_power_w {
            eq.nominal_power_w = v;
        }
        if let Some(v) = self.min_power_w {
            eq.min_power_w = v;
        }
        eq
    }
}

impl ScenarioConfig {
    /// Returns the reference scenario: one month, 50 trials, efficient tier.
    pub fn reference() -> Self {
        Self::default()
    }

    /// Returns the heatwave preset: hotter days and nights, wider spread.
    pub fn heatwave() -> Self {
        Self {
            weather: WeatherConfig {
                t_min_mean_c: 24.0,
                t_min_sigma_c: 1.5,
                t_min_range_c: [19.0, 28.0],
                t_max_mean_c: 40.0,
                t_max_sigma_c: 2.5,
                t_max_range_c: [33.0, 45.0],
                ..WeatherConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the quick preset: a two-day, eight-trial smoke run.
    pub fn quick() -> Self {
        Self {
            simulation: SimulationConfig {
                trials: 8,
                horizon_hours: 2 * HOURS_PER_DAY,
                seed: Some(7),
                trajectory_samples: 2,
                ..SimulationConfig::default()
            },
            weather: WeatherConfig {
                days: 2,
                ..WeatherConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["reference", "heatwave", "quick"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> std::result::Result<Self, ConfigError> {
        match name {
            "reference" => Ok(Self::reference()),
            "heatwave" => Ok(Self::heatwave()),
            "quick" => Ok(Self::quick()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> std::result::Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> std::result::Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Same scenario with a different equipment tier and no overrides.
    pub fn with_tier(&self, tier: EquipmentTier) -> Self {
        Self {
            equipment: EquipmentSection::tier(tier),
            ..self.clone()
        }
    }

    /// Batch options derived from the `[simulation]` section.
    pub fn batch_options(&self) -> BatchOptions {
        let s = &self.simulation;
        BatchOptions {
            n_trials: s.trials,
            horizon_hours: s.horizon_hours,
            parallel: s.parallel,
            workers: s.workers,
            seed: s.seed,
            trajectory_samples: s.trajectory_samples,
            deadline: s.deadline_s.and_then(|d| Duration::try_from_secs_f64(d).ok()),
        }
    }

    /// Validates all sections and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if let Some(d) = self.simulation.deadline_s {
            if !(d.is_finite() && d > 0.0) {
                errors.push(ConfigError::new(
                    "simulation.deadline_s",
                    "must be finite and > 0",
                ));
            } else if Duration::try_from_secs_f64(d).is_err() {
                errors.push(ConfigError::new(
                    "simulation.deadline_s",
                    "is too large to represent as a duration",
                ));
            }
        }
        errors.extend(montecarlo::validate_options(
            &self.batch_options(),
            &self.weather,
        ));
        errors.extend(self.weather.validate());
        errors.extend(self.room.validate());
        errors.extend(self.equipment.resolve().validate("equipment"));
        errors.extend(self.integrator.validate());
        errors
    }

    /// Validates the scenario and runs its Monte Carlo batch.
    ///
    /// # Errors
    ///
    /// See [`montecarlo::run_batch`].
    pub fn run(&self) -> Result<Batch> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(SimError::InvalidConfig(errors));
        }
        montecarlo::run_batch(
            &self.room,
            &self.equipment.resolve(),
            &self.weather,
            &self.integrator,
            &self.batch_options(),
        )
    }
}
