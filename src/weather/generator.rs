//! Gaussian daily extremes and their expansion into an hourly series.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Deserialize;

use super::profile::{DailyExtremes, HOURS_PER_DAY, WeatherProfile};
use crate::error::ConfigError;

/// Redraws allowed when a sampled maximum falls below the day's minimum.
const MAX_REDRAWS: usize = 16;

/// Statistical description of the month's weather.
///
/// Ranges are `[low, high]` clamp bounds applied after sampling.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeatherConfig {
    /// Number of simulated days.
    pub days: usize,
    pub t_min_mean_c: f64,
    pub t_min_sigma_c: f64,
    pub t_min_range_c: [f64; 2],
    pub t_max_mean_c: f64,
    pub t_max_sigma_c: f64,
    pub t_max_range_c: [f64; 2],
    /// Mean clock hour of the daily minimum.
    pub hour_min_mean: f64,
    pub hour_min_sigma: f64,
    pub hour_min_range: [f64; 2],
    /// Mean clock hour of the daily maximum.
    pub hour_max_mean: f64,
    pub hour_max_sigma: f64,
    pub hour_max_range: [f64; 2],
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            days: 31,
            t_min_mean_c: 21.0,
            t_min_sigma_c: 1.33,
            t_min_range_c: [16.0, 25.0],
            t_max_mean_c: 37.0,
            t_max_sigma_c: 2.0,
            t_max_range_c: [30.0, 42.0],
            hour_min_mean: 6.0,
            hour_min_sigma: 0.167,
            hour_min_range: [5.5, 6.5],
            hour_max_mean: 16.0,
            hour_max_sigma: 0.33,
            hour_max_range: [15.0, 17.0],
        }
    }
}

impl WeatherConfig {
    /// Validates distribution parameters and clamp ranges.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.days == 0 {
            errors.push(ConfigError::new("weather.days", "must be > 0"));
        }

        let sigmas = [
            ("weather.t_min_sigma_c", self.t_min_sigma_c),
            ("weather.t_max_sigma_c", self.t_max_sigma_c),
            ("weather.hour_min_sigma", self.hour_min_sigma),
            ("weather.hour_max_sigma", self.hour_max_sigma),
        ];
        for (field, sigma) in sigmas {
            if !(sigma.is_finite() && sigma >= 0.0) {
                errors.push(ConfigError::new(field, "must be finite and >= 0"));
            }
        }

        let means = [
            ("weather.t_min_mean_c", self.t_min_mean_c),
            ("weather.t_max_mean_c", self.t_max_mean_c),
            ("weather.hour_min_mean", self.hour_min_mean),
            ("weather.hour_max_mean", self.hour_max_mean),
        ];
        for (field, mean) in means {
            if !mean.is_finite() {
                errors.push(ConfigError::new(field, "must be finite"));
            }
        }

        let ranges = [
            ("weather.t_min_range_c", self.t_min_range_c),
            ("weather.t_max_range_c", self.t_max_range_c),
            ("weather.hour_min_range", self.hour_min_range),
            ("weather.hour_max_range", self.hour_max_range),
        ];
        for (field, [lo, hi]) in ranges {
            if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                errors.push(ConfigError::new(field, "must be finite with low <= high"));
            }
        }

        for (field, [lo, hi]) in [
            ("weather.hour_min_range", self.hour_min_range),
            ("weather.hour_max_range", self.hour_max_range),
        ] {
            if lo < 0.0 || hi >= HOURS_PER_DAY as f64 {
                errors.push(ConfigError::new(field, "must lie within [0, 24)"));
            }
        }

        if self.hour_min_range[1] >= self.hour_max_range[0] {
            errors.push(ConfigError::new(
                "weather.hour_min_range",
                "must end before weather.hour_max_range starts",
            ));
        } else if errors.is_empty() && self.hour_slots_can_collide() {
            errors.push(ConfigError::new(
                "weather.hour_max_range",
                "rounds onto the same hourly slot as weather.hour_min_range",
            ));
        }
        if self.t_min_range_c[0] > self.t_max_range_c[1] {
            errors.push(ConfigError::new(
                "weather.t_min_range_c",
                "low bound must not exceed weather.t_max_range_c high bound",
            ));
        }

        errors
    }

    /// Whether some hour_min and hour_max draw share a slot of the hourly
    /// series. Slot 24 wraps onto slot 0.
    fn hour_slots_can_collide(&self) -> bool {
        let [min_lo, min_hi] = self.hour_min_range.map(f64::round);
        let [max_lo, max_hi] = self.hour_max_range.map(f64::round);
        min_hi >= max_lo || (min_lo == 0.0 && max_hi >= HOURS_PER_DAY as f64)
    }
}

/// Samples daily temperature extremes for one month.
///
/// Holds only distribution parameters; every random draw comes from the
/// caller's RNG, so each trial keeps its own independent stream.
#[derive(Debug, Clone)]
pub struct WeatherGenerator {
    days: usize,
    t_min: Normal<f64>,
    t_max: Normal<f64>,
    hour_min: Normal<f64>,
    hour_max: Normal<f64>,
    t_min_range: [f64; 2],
    t_max_range: [f64; 2],
    hour_min_range: [f64; 2],
    hour_max_range: [f64; 2],
}

impl WeatherGenerator {
    /// Creates a generator from a weather configuration.
    ///
    /// # Errors
    ///
    /// Returns the first offending field if the configuration is invalid.
    pub fn new(config: &WeatherConfig) -> Result<Self, ConfigError> {
        if let Some(err) = config.validate().into_iter().next() {
            return Err(err);
        }
        let normal = |field: &str, mean: f64, sigma: f64| {
            Normal::new(mean, sigma).map_err(|e| ConfigError::new(field, e.to_string()))
        };
        Ok(Self {
            days: config.days,
            t_min: normal("weather.t_min_sigma_c", config.t_min_mean_c, config.t_min_sigma_c)?,
            t_max: normal("weather.t_max_sigma_c", config.t_max_mean_c, config.t_max_sigma_c)?,
            hour_min: normal(
                "weather.hour_min_sigma",
                config.hour_min_mean,
                config.hour_min_sigma,
            )?,
            hour_max: normal(
                "weather.hour_max_sigma",
                config.hour_max_mean,
                config.hour_max_sigma,
            )?,
            t_min_range: config.t_min_range_c,
            t_max_range: config.t_max_range_c,
            hour_min_range: config.hour_min_range,
            hour_max_range: config.hour_max_range,
        })
    }

    pub fn days(&self) -> usize {
        self.days
    }

    /// Draws one month of daily extremes.
    ///
    /// Guarantees `t_max[d] >= t_min[d]` for every day even when the
    /// configured clamp ranges overlap.
    pub fn generate_daily_extremes<R: Rng + ?Sized>(&self, rng: &mut R) -> DailyExtremes {
        let mut out = DailyExtremes {
            t_min: Vec::with_capacity(self.days),
            t_max: Vec::with_capacity(self.days),
            hour_min: Vec::with_capacity(self.days),
            hour_max: Vec::with_capacity(self.days),
        };

        for _ in 0..self.days {
            let t_min = clamp(self.t_min.sample(rng), self.t_min_range);
            let mut t_max = clamp(self.t_max.sample(rng), self.t_max_range);
            let mut redraws = 0;
            while t_max < t_min && redraws < MAX_REDRAWS {
                t_max = clamp(self.t_max.sample(rng), self.t_max_range);
                redraws += 1;
            }
            out.t_min.push(t_min);
            out.t_max.push(t_max.max(t_min));
            out.hour_min
                .push(clamp(self.hour_min.sample(rng), self.hour_min_range));
            out.hour_max
                .push(clamp(self.hour_max.sample(rng), self.hour_max_range));
        }
        out
    }

    /// Draws daily extremes and expands them into a full profile.
    pub fn generate_profile<R: Rng + ?Sized>(&self, rng: &mut R) -> WeatherProfile {
        let daily = self.generate_daily_extremes(rng);
        let hourly = generate_hourly_series(&daily);
        WeatherProfile::new(daily, hourly)
    }
}

fn clamp(v: f64, [lo, hi]: [f64; 2]) -> f64 {
    v.clamp(lo, hi)
}

/// Index of the hourly slot nearest to a clock hour.
pub fn hour_index(hour: f64) -> usize {
    (hour.round() as i64).rem_euclid(HOURS_PER_DAY as i64) as usize
}

/// Expands daily extremes into one temperature per hour.
///
/// Each day is a cosine peaking at `hour_max`. The slots nearest to
/// `hour_min` and `hour_max` are then pinned to the exact extremes, and when
/// the two slots are more than two hours apart their direct neighbours are
/// pulled halfway towards the pinned value. Deterministic: no randomness.
pub fn generate_hourly_series(extremes: &DailyExtremes) -> Vec<f64> {
    let days = extremes.days();
    let mut hourly = Vec::with_capacity(days * HOURS_PER_DAY);

    for d in 0..days {
        let t_min = extremes.t_min[d];
        let t_max = extremes.t_max[d];
        let avg = (t_min + t_max) / 2.0;
        let amp = (t_max - t_min) / 2.0;
        let center = extremes.hour_max[d];

        let mut day = [0.0_f64; HOURS_PER_DAY];
        for (h, slot) in day.iter_mut().enumerate() {
            let phase = 2.0 * std::f64::consts::PI * (h as f64 - center) / HOURS_PER_DAY as f64;
            *slot = avg + amp * phase.cos();
        }

        let i_min = hour_index(extremes.hour_min[d]);
        let i_max = hour_index(extremes.hour_max[d]);
        day[i_min] = t_min;
        day[i_max] = t_max;

        if i_min.abs_diff(i_max) > 2 {
            for (idx, value) in [(i_min, t_min), (i_max, t_max)] {
                if idx > 0 {
                    day[idx - 1] = (day[idx - 1] + value) / 2.0;
                }
                if idx + 1 < HOURS_PER_DAY {
                    day[idx + 1] = (day[idx + 1] + value) / 2.0;
                }
            }
        }

        hourly.extend_from_slice(&day);
    }
    hourly
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn generator() -> WeatherGenerator {
        WeatherGenerator::new(&WeatherConfig::default()).expect("default config is valid")
    }

    #[test]
    fn default_month_has_31_days_and_744_hours() {
        let mut rng = StdRng::seed_from_u64(1);
        let profile = generator().generate_profile(&mut rng);
        assert_eq!(profile.daily().days(), 31);
        assert_eq!(profile.hours(), 744);
    }

    #[test]
    fn seed_determinism() {
        let g = generator();
        let a = g.generate_profile(&mut StdRng::seed_from_u64(42));
        let b = g.generate_profile(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_produce_different_months() {
        let g = generator();
        let a = g.generate_daily_extremes(&mut StdRng::seed_from_u64(1));
        let b = g.generate_daily_extremes(&mut StdRng::seed_from_u64(2));
        assert_ne!(a.t_max, b.t_max);
    }

    #[test]
    fn sample_means_track_configuration() {
        let g = generator();
        let mut rng = StdRng::seed_from_u64(7);
        let mut sum_min = 0.0;
        let mut sum_max = 0.0;
        let mut n = 0.0;
        for _ in 0..100 {
            let d = g.generate_daily_extremes(&mut rng);
            sum_min += d.t_min.iter().sum::<f64>();
            sum_max += d.t_max.iter().sum::<f64>();
            n += d.days() as f64;
        }
        assert!((sum_min / n - 21.0).abs() < 0.2, "mean t_min {}", sum_min / n);
        assert!((sum_max / n - 37.0).abs() < 0.3, "mean t_max {}", sum_max / n);
    }

    #[test]
    fn overlapping_ranges_still_keep_max_above_min() {
        let config = WeatherConfig {
            t_min_mean_c: 28.0,
            t_min_sigma_c: 4.0,
            t_min_range_c: [20.0, 35.0],
            t_max_mean_c: 29.0,
            t_max_sigma_c: 4.0,
            t_max_range_c: [22.0, 40.0],
            ..WeatherConfig::default()
        };
        let g = WeatherGenerator::new(&config).expect("valid config");
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let d = g.generate_daily_extremes(&mut rng);
            for day in 0..d.days() {
                assert!(d.t_max[day] >= d.t_min[day]);
            }
        }
    }

    #[test]
    fn zero_sigma_gives_means() {
        let config = WeatherConfig {
            t_min_sigma_c: 0.0,
            t_max_sigma_c: 0.0,
            hour_min_sigma: 0.0,
            hour_max_sigma: 0.0,
            ..WeatherConfig::default()
        };
        let g = WeatherGenerator::new(&config).expect("valid config");
        let d = g.generate_daily_extremes(&mut StdRng::seed_from_u64(0));
        assert!(d.t_min.iter().all(|&t| t == 21.0));
        assert!(d.t_max.iter().all(|&t| t == 37.0));
        assert!(d.hour_min.iter().all(|&h| h == 6.0));
        assert!(d.hour_max.iter().all(|&h| h == 16.0));
    }

    #[test]
    fn negative_sigma_is_rejected() {
        let config = WeatherConfig {
            t_max_sigma_c: -1.0,
            ..WeatherConfig::default()
        };
        let err = WeatherGenerator::new(&config).expect_err("must fail");
        assert_eq!(err.field, "weather.t_max_sigma_c");
    }

    #[test]
    fn hour_ranges_sharing_a_slot_are_rejected() {
        let wrapping = WeatherConfig {
            hour_min_range: [0.0, 0.4],
            hour_max_range: [23.6, 23.9],
            ..WeatherConfig::default()
        };
        let errors = wrapping.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "weather.hour_max_range");

        let adjacent = WeatherConfig {
            hour_min_range: [9.0, 10.4],
            hour_max_range: [10.45, 12.0],
            ..WeatherConfig::default()
        };
        assert!(WeatherGenerator::new(&adjacent).is_err());

        let apart = WeatherConfig {
            hour_min_range: [0.5, 3.0],
            hour_max_range: [20.0, 23.4],
            ..WeatherConfig::default()
        };
        assert!(apart.validate().is_empty());
    }

    #[test]
    fn hourly_series_peaks_and_dips_at_extreme_hours() {
        let extremes = DailyExtremes {
            t_min: vec![20.0],
            t_max: vec![36.0],
            hour_min: vec![6.0],
            hour_max: vec![16.0],
        };
        let hourly = generate_hourly_series(&extremes);
        assert_eq!(hourly.len(), 24);
        assert_eq!(hourly[6], 20.0);
        assert_eq!(hourly[16], 36.0);
        // Neighbours are averaged with the pinned extreme.
        let raw_15 = 28.0 + 8.0 * (2.0 * std::f64::consts::PI * -1.0 / 24.0).cos();
        assert!((hourly[15] - (raw_15 + 36.0) / 2.0).abs() < 1e-12);
        let max = hourly.iter().cloned().fold(f64::MIN, f64::max);
        assert_eq!(max, 36.0);
    }

    #[test]
    fn hour_index_rounds_and_wraps() {
        assert_eq!(hour_index(5.5), 6);
        assert_eq!(hour_index(6.49), 6);
        assert_eq!(hour_index(16.6), 17);
        assert_eq!(hour_index(23.7), 0);
    }

    proptest! {
        #[test]
        fn daily_invariants_hold_for_any_seed(seed in any::<u64>()) {
            let g = generator();
            let d = g.generate_daily_extremes(&mut StdRng::seed_from_u64(seed));
            for day in 0..d.days() {
                prop_assert!(d.t_max[day] >= d.t_min[day]);
                prop_assert!((5.5..=6.5).contains(&d.hour_min[day]));
                prop_assert!((15.0..=17.0).contains(&d.hour_max[day]));
            }
        }

        #[test]
        fn hourly_series_hits_extremes_exactly(seed in any::<u64>()) {
            let g = generator();
            let profile = g.generate_profile(&mut StdRng::seed_from_u64(seed));
            let d = profile.daily();
            for day in 0..d.days() {
                let base = day * HOURS_PER_DAY;
                prop_assert_eq!(profile.hourly()[base + hour_index(d.hour_min[day])], d.t_min[day]);
                prop_assert_eq!(profile.hourly()[base + hour_index(d.hour_max[day])], d.t_max[day]);
            }
        }
    }
}
