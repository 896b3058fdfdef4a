//! Time integration of the coupled room and controller over one trial.
//!
//! Two schemes are available: adaptive Dormand–Prince 5(4) and fixed-step
//! explicit Euler. Both stop exactly on every hour so the trajectory is
//! sampled on an hourly grid, and both accumulate electrical energy with the
//! trapezoidal rule over accepted steps.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::controller::CoolingController;
use super::room::{PhysicalConfig, SystemState, ThermalModel};
use crate::equipment::EquipmentConfig;
use crate::error::{ConfigError, TrialError};
use crate::weather::{SECONDS_PER_HOUR, WeatherProfile};

const JOULES_PER_KWH: f64 = 3.6e6;
/// Steps at or below this size are accepted regardless of the error estimate.
const MIN_STEP_S: f64 = 1e-3;
const TIME_EPS_S: f64 = 1e-9;

/// Time stepping scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationMethod {
    /// Adaptive Dormand–Prince 5(4).
    Rk45,
    /// Fixed-step explicit Euler.
    Euler,
}

/// Numerical settings for the integrator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegratorConfig {
    pub method: IntegrationMethod,
    /// Relative tolerance for adaptive stepping.
    pub rtol: f64,
    /// Absolute tolerance for adaptive stepping (K).
    pub atol: f64,
    /// Largest adaptive step (s).
    pub max_step_s: f64,
    /// First adaptive step of a trial (s).
    pub initial_step_s: f64,
    /// Euler step (s).
    pub euler_step_s: f64,
    /// Consecutive rejected steps tolerated before the trial fails.
    pub max_instability_retries: u32,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            method: IntegrationMethod::Rk45,
            rtol: 1e-4,
            atol: 1e-6,
            max_step_s: 600.0,
            initial_step_s: 60.0,
            euler_step_s: 10.0,
            max_instability_retries: 8,
        }
    }
}

impl IntegratorConfig {
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let positive = [
            ("integrator.rtol", self.rtol),
            ("integrator.atol", self.atol),
            ("integrator.max_step_s", self.max_step_s),
            ("integrator.initial_step_s", self.initial_step_s),
            ("integrator.euler_step_s", self.euler_step_s),
        ];
        for (field, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                errors.push(ConfigError::new(field, "must be finite and > 0"));
            }
        }
        errors
    }
}

/// Hourly samples of one trial.
///
/// Every channel has the same length: one entry per simulated hour plus the
/// initial sample at `t = 0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    pub time_h: Vec<f64>,
    pub wall_c: Vec<f64>,
    pub air_c: Vec<f64>,
    pub server_c: Vec<f64>,
    pub case_c: Vec<f64>,
    /// Heat removed by the cooling unit (W).
    pub cooling_power_w: Vec<f64>,
    pub exterior_c: Vec<f64>,
    pub cop: Vec<f64>,
    /// Electrical draw of the cooling unit (W).
    pub electrical_power_w: Vec<f64>,
    /// Electrical energy consumed since `t = 0` (kWh).
    pub energy_kwh: Vec<f64>,
}

impl Trajectory {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            time_h: Vec::with_capacity(n),
            wall_c: Vec::with_capacity(n),
            air_c: Vec::with_capacity(n),
            server_c: Vec::with_capacity(n),
            case_c: Vec::with_capacity(n),
            cooling_power_w: Vec::with_capacity(n),
            exterior_c: Vec::with_capacity(n),
            cop: Vec::with_capacity(n),
            electrical_power_w: Vec::with_capacity(n),
            energy_kwh: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.time_h.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_h.is_empty()
    }
}

/// Outcome of one successfully integrated trial.
#[derive(Debug, Clone)]
pub struct TrialResult {
    /// Electricity cost of cooling over the horizon (USD).
    pub cost_usd: f64,
    pub energy_kwh: f64,
    pub max_case_temp_c: f64,
    /// Time the case spent above the case limit (h).
    pub hours_above_case_limit: f64,
    pub case_limit_met: bool,
    /// Rejected steps that were recovered from.
    pub stability_warnings: u32,
    pub trajectory: Trajectory,
}

/// Drives a [`ThermalModel`] and a [`CoolingController`] through time.
#[derive(Debug, Clone)]
pub struct Integrator<'a> {
    settings: &'a IntegratorConfig,
    equipment: &'a EquipmentConfig,
    price_per_kwh: f64,
    case_limit_c: f64,
    deadline: Option<Instant>,
}

#[derive(Debug)]
struct Accumulator {
    energy_j: f64,
    above_limit_s: f64,
    max_case_c: f64,
    warnings: u32,
    consecutive_rejections: u32,
    case_limit_c: f64,
}

impl Accumulator {
    fn new(initial_case_c: f64, case_limit_c: f64) -> Self {
        Self {
            energy_j: 0.0,
            above_limit_s: 0.0,
            max_case_c: initial_case_c,
            warnings: 0,
            consecutive_rejections: 0,
            case_limit_c,
        }
    }

    /// Adds one interval using the trapezoidal rule on electrical power.
    fn add_interval(&mut self, elec_start_w: f64, elec_end_w: f64, dt: f64, case_end_c: f64) {
        self.energy_j += 0.5 * (elec_start_w + elec_end_w) * dt;
        if case_end_c > self.case_limit_c {
            self.above_limit_s += dt;
        }
        self.max_case_c = self.max_case_c.max(case_end_c);
    }

    fn reject(&mut self, t: f64, retries: u32) -> Result<(), TrialError> {
        self.warnings += 1;
        self.consecutive_rejections += 1;
        debug!(
            time_s = t,
            consecutive = self.consecutive_rejections,
            "non-finite state, step rejected"
        );
        if self.consecutive_rejections > retries {
            return Err(TrialError::NumericInstability {
                time_s: t,
                events: self.consecutive_rejections,
            });
        }
        Ok(())
    }
}

impl<'a> Integrator<'a> {
    /// Creates an integrator for one equipment and room configuration.
    ///
    /// # Arguments
    ///
    /// * `settings` - Scheme, tolerances and step sizes
    /// * `equipment` - COP curve used to convert removed heat into electrical power
    /// * `physical` - Supplies the electricity price and the case limit
    pub fn new(
        settings: &'a IntegratorConfig,
        equipment: &'a EquipmentConfig,
        physical: &PhysicalConfig,
    ) -> Self {
        Self {
            settings,
            equipment,
            price_per_kwh: physical.price_per_kwh,
            case_limit_c: physical.case_limit_c,
            deadline: None,
        }
    }

    /// Stops the trial with [`TrialError::Timeout`] once `deadline` passes.
    ///
    /// Checked at every hourly boundary.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    fn electrical_w(&self, cooling_w: f64, exterior_c: f64) -> f64 {
        cooling_w / self.equipment.cop(exterior_c)
    }

    /// Electrical draw at a given instant and state.
    fn draw_at<C: CoolingController>(
        &self,
        controller: &C,
        weather: &WeatherProfile,
        t: f64,
        state: &SystemState,
    ) -> f64 {
        self.electrical_w(controller.power_w(state.case_c), weather.exterior_at(t))
    }

    fn record<C: CoolingController>(
        &self,
        trajectory: &mut Trajectory,
        controller: &C,
        weather: &WeatherProfile,
        t: f64,
        state: &SystemState,
        energy_j: f64,
    ) {
        let exterior_c = weather.exterior_at(t);
        let cooling_w = controller.power_w(state.case_c);
        let cop = self.equipment.cop(exterior_c);
        trajectory.time_h.push(t / SECONDS_PER_HOUR);
        trajectory.wall_c.push(state.wall_c);
        trajectory.air_c.push(state.air_c);
        trajectory.server_c.push(state.server_c);
        trajectory.case_c.push(state.case_c);
        trajectory.cooling_power_w.push(cooling_w);
        trajectory.exterior_c.push(exterior_c);
        trajectory.cop.push(cop);
        trajectory.electrical_power_w.push(cooling_w / cop);
        trajectory.energy_kwh.push(energy_j / JOULES_PER_KWH);
    }

    /// Integrates one trial from `t = 0` to `horizon_hours`.
    ///
    /// The controller is reset to `initial` before the first step, so no
    /// state carries over from a previous trial.
    ///
    /// # Errors
    ///
    /// * [`TrialError::NumericInstability`] after more than
    ///   `max_instability_retries` consecutive non-finite candidate states
    /// * [`TrialError::Timeout`] if the deadline passes
    pub fn run<M: ThermalModel, C: CoolingController>(
        &self,
        model: &M,
        controller: &mut C,
        weather: &WeatherProfile,
        initial: SystemState,
        horizon_hours: usize,
    ) -> Result<TrialResult, TrialError> {
        controller.reset(initial.case_c);

        let retries = self.settings.max_instability_retries;
        let mut state = initial;
        let mut t = 0.0_f64;
        let mut acc = Accumulator::new(initial.case_c, self.case_limit_c);
        let mut trajectory = Trajectory::with_capacity(horizon_hours + 1);
        let mut h = self.settings.initial_step_s.min(self.settings.max_step_s);

        self.record(&mut trajectory, &*controller, weather, t, &state, acc.energy_j);

        for hour in 1..=horizon_hours {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    return Err(TrialError::Timeout { time_s: t });
                }
            }

            let t_end = hour as f64 * SECONDS_PER_HOUR;
            while t_end - t > TIME_EPS_S {
                let remaining = t_end - t;
                match self.settings.method {
                    IntegrationMethod::Euler => {
                        let dt = self.settings.euler_step_s.min(remaining);
                        let start_w = self.draw_at(&*controller, weather, t, &state);
                        let candidate = euler_step(model, &*controller, weather, t, &state, dt);
                        let t_next = advance(t, dt, t_end);
                        if candidate.is_finite() {
                            let end_w = self.draw_at(&*controller, weather, t_next, &candidate);
                            acc.add_interval(start_w, end_w, dt, candidate.case_c);
                            acc.consecutive_rejections = 0;
                            state = candidate;
                            controller.observe(state.case_c);
                        } else {
                            acc.reject(t, retries)?;
                            // Hold the state; the unit keeps drawing power.
                            let end_w = self.draw_at(&*controller, weather, t_next, &state);
                            if start_w.is_finite() && end_w.is_finite() {
                                acc.add_interval(start_w, end_w, dt, state.case_c);
                            }
                        }
                        t = t_next;
                    }
                    IntegrationMethod::Rk45 => {
                        let dt = h.min(self.settings.max_step_s).min(remaining);
                        let step = dormand_prince_step(
                            model,
                            &*controller,
                            weather,
                            t,
                            &state,
                            dt,
                            self.settings.rtol,
                            self.settings.atol,
                        );
                        match step {
                            Some((candidate, err)) if candidate.is_finite() && err.is_finite() => {
                                if err <= 1.0 || dt <= MIN_STEP_S {
                                    let t_next = advance(t, dt, t_end);
                                    let start_w = self.draw_at(&*controller, weather, t, &state);
                                    let end_w =
                                        self.draw_at(&*controller, weather, t_next, &candidate);
                                    acc.add_interval(start_w, end_w, dt, candidate.case_c);
                                    acc.consecutive_rejections = 0;
                                    state = candidate;
                                    controller.observe(state.case_c);
                                    t = t_next;
                                }
                                h = (dt * step_factor(err)).max(MIN_STEP_S);
                            }
                            _ => {
                                acc.reject(t, retries)?;
                                h = (dt / 2.0).max(MIN_STEP_S);
                            }
                        }
                    }
                }
            }
            t = t_end;
            self.record(&mut trajectory, &*controller, weather, t, &state, acc.energy_j);
        }

        let energy_kwh = acc.energy_j / JOULES_PER_KWH;
        Ok(TrialResult {
            cost_usd: energy_kwh * self.price_per_kwh,
            energy_kwh,
            max_case_temp_c: acc.max_case_c,
            hours_above_case_limit: acc.above_limit_s / SECONDS_PER_HOUR,
            case_limit_met: acc.max_case_c <= self.case_limit_c,
            stability_warnings: acc.warnings,
            trajectory,
        })
    }
}

fn advance(t: f64, dt: f64, t_end: f64) -> f64 {
    if t + dt >= t_end - TIME_EPS_S { t_end } else { t + dt }
}

fn rhs<M: ThermalModel, C: CoolingController>(
    model: &M,
    controller: &C,
    weather: &WeatherProfile,
    t: f64,
    y: &[f64; 4],
) -> [f64; 4] {
    let state = SystemState::from_array(*y);
    let cooling_w = controller.power_w(state.case_c);
    model.derivatives(&state, weather.exterior_at(t), cooling_w)
}

fn euler_step<M: ThermalModel, C: CoolingController>(
    model: &M,
    controller: &C,
    weather: &WeatherProfile,
    t: f64,
    state: &SystemState,
    dt: f64,
) -> SystemState {
    let y = state.to_array();
    let k = rhs(model, controller, weather, t, &y);
    SystemState::from_array(std::array::from_fn(|i| y[i] + dt * k[i]))
}

// Dormand–Prince 5(4) tableau.
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// Fifth-order weights (also the last stage row).
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// Fifth minus fourth order weights.
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

/// One Dormand–Prince step.
///
/// # Returns
///
/// The fifth-order candidate and the RMS error norm scaled by
/// `atol + rtol * |y|`. A norm `<= 1` means the step meets tolerance.
#[expect(clippy::too_many_arguments)]
fn dormand_prince_step<M: ThermalModel, C: CoolingController>(
    model: &M,
    controller: &C,
    weather: &WeatherProfile,
    t: f64,
    state: &SystemState,
    h: f64,
    rtol: f64,
    atol: f64,
) -> Option<(SystemState, f64)> {
    let y = state.to_array();
    let f = |tt: f64, yy: [f64; 4]| rhs(model, controller, weather, tt, &yy);
    let at = |coef: &[(f64, &[f64; 4])]| -> [f64; 4] {
        std::array::from_fn(|i| y[i] + h * coef.iter().map(|(a, k)| a * k[i]).sum::<f64>())
    };

    let k1 = f(t, y);
    let k2 = f(t + C2 * h, at(&[(A21, &k1)]));
    let k3 = f(t + C3 * h, at(&[(A31, &k1), (A32, &k2)]));
    let k4 = f(t + C4 * h, at(&[(A41, &k1), (A42, &k2), (A43, &k3)]));
    let k5 = f(
        t + C5 * h,
        at(&[(A51, &k1), (A52, &k2), (A53, &k3), (A54, &k4)]),
    );
    let k6 = f(
        t + h,
        at(&[(A61, &k1), (A62, &k2), (A63, &k3), (A64, &k4), (A65, &k5)]),
    );
    let y_new = at(&[(B1, &k1), (B3, &k3), (B4, &k4), (B5, &k5), (B6, &k6)]);
    let k7 = f(t + h, y_new);

    let candidate = SystemState::from_array(y_new);
    if !candidate.is_finite() {
        return None;
    }

    let mut sum_sq = 0.0;
    for i in 0..4 {
        let err = h
            * (E1 * k1[i] + E3 * k3[i] + E4 * k4[i] + E5 * k5[i] + E6 * k6[i] + E7 * k7[i]);
        let scale = atol + rtol * y[i].abs().max(y_new[i].abs());
        sum_sq += (err / scale).powi(2);
    }
    Some((candidate, (sum_sq / 4.0).sqrt()))
}

/// Step size multiplier from an error norm.
fn step_factor(err: f64) -> f64 {
    if err == 0.0 {
        return 5.0;
    }
    (0.9 * err.powf(-0.2)).clamp(0.2, 5.0)
}
