//! Cooling power control.

use serde::Deserialize;

use crate::equipment::EquipmentConfig;
use crate::error::ConfigError;

/// Maps a measured temperature to a cooling power command.
///
/// Implementations keep at most the last valid reading as state. The
/// integrator evaluates `power_w` at every stage of a step without side
/// effects and calls `observe` only once a step is accepted, so rejected
/// steps never leak into the controller.
pub trait CoolingController {
    /// Heat removal command (W) for a measured temperature.
    ///
    /// Invalid readings (non-finite or negative) are replaced by the last
    /// valid one. The result is always finite and within `[0, max_power_w]`.
    fn power_w(&self, temp_c: f64) -> f64;

    /// Commits a reading taken at an accepted step.
    fn observe(&mut self, temp_c: f64);

    /// Clears all state at the start of a trial.
    fn reset(&mut self, initial_c: f64);

    /// Upper bound of the emitted power (W).
    fn max_power_w(&self) -> f64;
}

/// Temperature band and curve shape of the sigmoidal controller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlConfig {
    /// At or below this temperature cooling is off (°C).
    pub min_c: f64,
    /// At or above this temperature cooling runs at full power (°C).
    pub max_c: f64,
    /// Logistic steepness across the half band.
    pub steepness: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            min_c: 15.0,
            max_c: 25.0,
            steepness: 5.0,
        }
    }
}

impl ControlConfig {
    pub fn validate(&self, prefix: &str) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if !(self.min_c.is_finite() && self.max_c.is_finite()) {
            errors.push(ConfigError::new(
                format!("{prefix}.min_c"),
                "min_c and max_c must be finite",
            ));
        } else if self.min_c >= self.max_c {
            errors.push(ConfigError::new(
                format!("{prefix}.min_c"),
                "must be < max_c",
            ));
        }
        if !(self.steepness.is_finite() && self.steepness > 0.0) {
            errors.push(ConfigError::new(
                format!("{prefix}.steepness"),
                "must be finite and > 0",
            ));
        }
        errors
    }

    /// Midpoint of the control band.
    pub fn mid_c(&self) -> f64 {
        (self.min_c + self.max_c) / 2.0
    }
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Stateless logistic control law on the server case temperature.
///
/// The logistic is rescaled so the band edges map exactly onto 0% and
/// 100%, with 50% at the midpoint.
#[derive(Debug, Clone)]
pub struct SigmoidalController {
    min_c: f64,
    max_c: f64,
    steepness: f64,
    max_power_w: f64,
    min_power_w: f64,
    last_valid_c: f64,
}

impl SigmoidalController {
    /// Builds a controller for one piece of equipment.
    ///
    /// # Arguments
    ///
    /// * `control` - Temperature band and steepness
    /// * `equipment` - Supplies the nominal (maximum) and minimum power
    pub fn new(control: &ControlConfig, equipment: &EquipmentConfig) -> Self {
        Self {
            min_c: control.min_c,
            max_c: control.max_c,
            steepness: control.steepness,
            max_power_w: equipment.nominal_power_w,
            min_power_w: equipment.min_power_w,
            last_valid_c: control.mid_c(),
        }
    }

    /// Fraction of full power in `[0, 1]` for a temperature.
    pub fn fraction(&self, temp_c: f64) -> f64 {
        if temp_c <= self.min_c {
            return 0.0;
        }
        if temp_c >= self.max_c {
            return 1.0;
        }
        let mid = (self.min_c + self.max_c) / 2.0;
        let half = (self.max_c - self.min_c) / 2.0;
        let x = (temp_c - mid) / half;
        let k = self.steepness;
        let lo = logistic(-k);
        let hi = logistic(k);
        let f = (logistic(k * x) - lo) / (hi - lo);
        if f.is_finite() { f.clamp(0.0, 1.0) } else { 0.0 }
    }

    /// Last reading accepted as valid.
    pub fn last_valid_c(&self) -> f64 {
        self.last_valid_c
    }

    fn sanitize(&self, temp_c: f64) -> f64 {
        if is_valid_reading(temp_c) {
            temp_c
        } else {
            self.last_valid_c
        }
    }
}

fn is_valid_reading(temp_c: f64) -> bool {
    temp_c.is_finite() && temp_c >= 0.0
}

impl CoolingController for SigmoidalController {
    fn power_w(&self, temp_c: f64) -> f64 {
        let power = self.fraction(self.sanitize(temp_c)) * self.max_power_w;
        if !power.is_finite() || power < self.min_power_w {
            return 0.0;
        }
        power.clamp(0.0, self.max_power_w)
    }

    fn observe(&mut self, temp_c: f64) {
        if is_valid_reading(temp_c) {
            self.last_valid_c = temp_c;
        }
    }

    fn reset(&mut self, initial_c: f64) {
        self.last_valid_c = if is_valid_reading(initial_c) {
            initial_c
        } else {
            (self.min_c + self.max_c) / 2.0
        };
    }

    fn max_power_w(&self) -> f64 {
        self.max_power_w
    }
}
