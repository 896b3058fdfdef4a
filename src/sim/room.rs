//! Four-node lumped thermal model of the server room.
//!
//! Nodes are the envelope wall, the interior air, the server core and the
//! server case. Heat flows between adjacent nodes through fixed
//! conductances:
//!
//! ```text
//! exterior -- wall -- air -- server -- case
//!                      ^        ^
//!                  cooling     load
//! ```

use serde::Deserialize;

use super::controller::ControlConfig;
use crate::error::ConfigError;

/// Temperatures of the four thermal nodes (°C).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemState {
    pub wall_c: f64,
    pub air_c: f64,
    pub server_c: f64,
    pub case_c: f64,
}

impl SystemState {
    pub fn uniform(temp_c: f64) -> Self {
        Self {
            wall_c: temp_c,
            air_c: temp_c,
            server_c: temp_c,
            case_c: temp_c,
        }
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.wall_c, self.air_c, self.server_c, self.case_c]
    }

    pub fn from_array([wall_c, air_c, server_c, case_c]: [f64; 4]) -> Self {
        Self {
            wall_c,
            air_c,
            server_c,
            case_c,
        }
    }

    /// True if every node temperature is a finite number.
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Continuous-time thermal dynamics driven by exterior temperature and
/// removed heat.
///
/// Implementations must be pure: the same inputs always give the same
/// derivative, so one model can be shared by every stage of a step.
pub trait ThermalModel {
    /// Time derivative of each node temperature (K/s).
    ///
    /// # Arguments
    ///
    /// * `state` - Current node temperatures
    /// * `exterior_c` - Outdoor temperature at this instant
    /// * `cooling_w` - Heat removed from the interior air (W, non-negative)
    fn derivatives(&self, state: &SystemState, exterior_c: f64, cooling_w: f64) -> [f64; 4];
}

/// Node temperatures at the start of every trial (°C).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InitialTemperatures {
    pub wall_c: f64,
    pub air_c: f64,
    pub server_c: f64,
    pub case_c: f64,
}

impl Default for InitialTemperatures {
    fn default() -> Self {
        Self {
            wall_c: 25.0,
            air_c: 25.0,
            server_c: 25.0,
            case_c: 25.0,
        }
    }
}

impl InitialTemperatures {
    pub fn uniform(temp_c: f64) -> Self {
        Self {
            wall_c: temp_c,
            air_c: temp_c,
            server_c: temp_c,
            case_c: temp_c,
        }
    }

    pub fn state(&self) -> SystemState {
        SystemState {
            wall_c: self.wall_c,
            air_c: self.air_c,
            server_c: self.server_c,
            case_c: self.case_c,
        }
    }
}

/// Physical and economic parameters of the room.
///
/// Shared read-only by every trial of a batch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicalConfig {
    /// Heat capacity of the envelope wall (J/K).
    pub wall_capacity_j_per_k: f64,
    /// Heat capacity of the interior air (J/K).
    pub air_capacity_j_per_k: f64,
    /// Heat capacity of the server core (J/K).
    pub server_capacity_j_per_k: f64,
    /// Heat capacity of the server case (J/K).
    pub case_capacity_j_per_k: f64,
    /// Exterior to wall conductance (W/K). Zero means an insulated wall.
    pub ext_wall_conductance_w_per_k: f64,
    pub air_wall_conductance_w_per_k: f64,
    pub air_server_conductance_w_per_k: f64,
    pub server_case_conductance_w_per_k: f64,
    /// Constant heat dissipated by the servers (W).
    pub server_load_w: f64,
    /// Electricity price (USD/kWh).
    pub price_per_kwh: f64,
    /// Case temperature above which the room is considered unsafe (°C).
    pub case_limit_c: f64,
    pub control: ControlConfig,
    pub initial: InitialTemperatures,
}

impl Default for PhysicalConfig {
    fn default() -> Self {
        Self {
            wall_capacity_j_per_k: 2.4e7,
            air_capacity_j_per_k: 86_832.0,
            server_capacity_j_per_k: 4.5e5,
            case_capacity_j_per_k: 9.0e4,
            ext_wall_conductance_w_per_k: 510.0,
            air_wall_conductance_w_per_k: 480.0,
            air_server_conductance_w_per_k: 2_500.0,
            server_case_conductance_w_per_k: 1_000.0,
            server_load_w: 25_000.0,
            price_per_kwh: 0.13,
            case_limit_c: 25.0,
            control: ControlConfig::default(),
            initial: InitialTemperatures::default(),
        }
    }
}

impl PhysicalConfig {
    /// Validates capacities, conductances, load, price and control band.
    ///
    /// # Returns
    ///
    /// Every violated constraint, with `room.`-prefixed field paths.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let capacities = [
            ("room.wall_capacity_j_per_k", self.wall_capacity_j_per_k),
            ("room.air_capacity_j_per_k", self.air_capacity_j_per_k),
            ("room.server_capacity_j_per_k", self.server_capacity_j_per_k),
            ("room.case_capacity_j_per_k", self.case_capacity_j_per_k),
        ];
        for (field, c) in capacities {
            if !(c.is_finite() && c > 0.0) {
                errors.push(ConfigError::new(field, "must be finite and > 0"));
            }
        }

        let conductances = [
            ("room.ext_wall_conductance_w_per_k", self.ext_wall_conductance_w_per_k),
            ("room.air_wall_conductance_w_per_k", self.air_wall_conductance_w_per_k),
            ("room.air_server_conductance_w_per_k", self.air_server_conductance_w_per_k),
            ("room.server_case_conductance_w_per_k", self.server_case_conductance_w_per_k),
        ];
        for (field, g) in conductances {
            if !(g.is_finite() && g >= 0.0) {
                errors.push(ConfigError::new(field, "must be finite and >= 0"));
            }
        }

        if !(self.server_load_w.is_finite() && self.server_load_w >= 0.0) {
            errors.push(ConfigError::new("room.server_load_w", "must be finite and >= 0"));
        }
        if !(self.price_per_kwh.is_finite() && self.price_per_kwh > 0.0) {
            errors.push(ConfigError::new("room.price_per_kwh", "must be finite and > 0"));
        }
        if !self.case_limit_c.is_finite() {
            errors.push(ConfigError::new("room.case_limit_c", "must be finite"));
        }

        errors.extend(self.control.validate("room.control"));

        let initial = [
            ("room.initial.wall_c", self.initial.wall_c),
            ("room.initial.air_c", self.initial.air_c),
            ("room.initial.server_c", self.initial.server_c),
            ("room.initial.case_c", self.initial.case_c),
        ];
        for (field, t) in initial {
            if !t.is_finite() {
                errors.push(ConfigError::new(field, "must be finite"));
            }
        }

        errors
    }
}

/// The canonical room model: one node per layer, linear conduction.
#[derive(Debug, Clone, Copy)]
pub struct RoomModel<'a> {
    config: &'a PhysicalConfig,
}

impl<'a> RoomModel<'a> {
    pub fn new(config: &'a PhysicalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &'a PhysicalConfig {
        self.config
    }
}

impl ThermalModel for RoomModel<'_> {
    fn derivatives(&self, s: &SystemState, exterior_c: f64, cooling_w: f64) -> [f64; 4] {
        let c = self.config;
        let q_ext_wall = (exterior_c - s.wall_c) * c.ext_wall_conductance_w_per_k;
        let q_air_wall = (s.air_c - s.wall_c) * c.air_wall_conductance_w_per_k;
        let q_air_server = (s.air_c - s.server_c) * c.air_server_conductance_w_per_k;
        let q_server_case = (s.server_c - s.case_c) * c.server_case_conductance_w_per_k;

        [
            (q_ext_wall + q_air_wall) / c.wall_capacity_j_per_k,
            (-q_air_wall - q_air_server - cooling_w) / c.air_capacity_j_per_k,
            (c.server_load_w + q_air_server - q_server_case) / c.server_capacity_j_per_k,
            q_server_case / c.case_capacity_j_per_k,
        ]
    }
}
