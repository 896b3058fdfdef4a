//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use server_room_sim::equipment::{EquipmentConfig, EquipmentTier};
use server_room_sim::montecarlo::BatchOptions;
use server_room_sim::sim::{InitialTemperatures, IntegratorConfig, PhysicalConfig};
use server_room_sim::weather::WeatherConfig;

/// Batch options for a one-day run with a fixed seed.
pub fn one_day_options(n_trials: usize, parallel: bool, seed: u64) -> BatchOptions {
    BatchOptions {
        n_trials,
        horizon_hours: 24,
        parallel,
        workers: Some(4),
        seed: Some(seed),
        trajectory_samples: 3,
        deadline: None,
    }
}

/// Default weather shortened to `days`.
pub fn short_weather(days: usize) -> WeatherConfig {
    WeatherConfig {
        days,
        ..WeatherConfig::default()
    }
}

/// Weather pinned to a constant temperature (zero spread, degenerate ranges).
pub fn constant_weather(days: usize, temp_c: f64) -> WeatherConfig {
    WeatherConfig {
        days,
        t_min_mean_c: temp_c,
        t_min_sigma_c: 0.0,
        t_min_range_c: [temp_c, temp_c],
        t_max_mean_c: temp_c,
        t_max_sigma_c: 0.0,
        t_max_range_c: [temp_c, temp_c],
        ..WeatherConfig::default()
    }
}

/// Insulated room starting hot, so cooling stays saturated.
pub fn insulated_hot_room() -> PhysicalConfig {
    PhysicalConfig {
        ext_wall_conductance_w_per_k: 0.0,
        air_wall_conductance_w_per_k: 0.0,
        server_load_w: 25_000.0,
        initial: InitialTemperatures::uniform(30.0),
        ..PhysicalConfig::default()
    }
}

/// 25 kW unit with a flat COP of 3.2.
pub fn flat_cop_unit() -> EquipmentConfig {
    EquipmentConfig {
        nominal_cop: 3.2,
        degradation_slope: 0.0,
        nominal_power_w: 25_000.0,
        ..EquipmentTier::Efficient.config()
    }
}

pub fn default_integrator() -> IntegratorConfig {
    IntegratorConfig::default()
}
