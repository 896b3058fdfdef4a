//! Stochastic outdoor weather for one simulated month.

/// Daily extreme sampling and hourly series expansion.
pub mod generator;
pub mod profile;

pub use generator::{WeatherConfig, WeatherGenerator, generate_hourly_series};
pub use profile::{DailyExtremes, HOURS_PER_DAY, SECONDS_PER_HOUR, WeatherProfile};
