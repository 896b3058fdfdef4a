//! Weather profile types and exterior temperature lookup.

pub const HOURS_PER_DAY: usize = 24;
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Per-day temperature extremes and the clock hours at which they occur.
///
/// All four vectors have one entry per simulated day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyExtremes {
    /// Daily minimum temperature (°C).
    pub t_min: Vec<f64>,
    /// Daily maximum temperature (°C).
    pub t_max: Vec<f64>,
    /// Clock hour of the daily minimum.
    pub hour_min: Vec<f64>,
    /// Clock hour of the daily maximum.
    pub hour_max: Vec<f64>,
}

impl DailyExtremes {
    pub fn days(&self) -> usize {
        self.t_min.len()
    }
}

/// One trial's outdoor weather: daily extremes plus the derived hourly series.
///
/// Immutable once built. Sample `i` of `hourly` is the temperature at
/// `t = i` hours; values in between are linearly interpolated.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherProfile {
    daily: DailyExtremes,
    hourly: Vec<f64>,
}

impl WeatherProfile {
    pub(crate) fn new(daily: DailyExtremes, hourly: Vec<f64>) -> Self {
        Self { daily, hourly }
    }

    /// Builds a flat profile, useful for calibration runs and tests.
    pub fn constant(days: usize, temp_c: f64) -> Self {
        let hours = days * HOURS_PER_DAY;
        Self {
            daily: DailyExtremes {
                t_min: vec![temp_c; days],
                t_max: vec![temp_c; days],
                hour_min: vec![6.0; days],
                hour_max: vec![16.0; days],
            },
            hourly: vec![temp_c; hours],
        }
    }

    /// Builds a profile from an arbitrary hourly series.
    ///
    /// Daily extremes are derived from the series itself.
    pub fn from_hourly(hourly: Vec<f64>) -> Self {
        let mut daily = DailyExtremes {
            t_min: Vec::new(),
            t_max: Vec::new(),
            hour_min: Vec::new(),
            hour_max: Vec::new(),
        };
        for day in hourly.chunks(HOURS_PER_DAY) {
            let (mut i_min, mut i_max) = (0, 0);
            for (i, &v) in day.iter().enumerate() {
                if v < day[i_min] {
                    i_min = i;
                }
                if v > day[i_max] {
                    i_max = i;
                }
            }
            daily.t_min.push(day[i_min]);
            daily.t_max.push(day[i_max]);
            daily.hour_min.push(i_min as f64);
            daily.hour_max.push(i_max as f64);
        }
        Self { daily, hourly }
    }

    pub fn daily(&self) -> &DailyExtremes {
        &self.daily
    }

    /// Hourly exterior temperature series (°C).
    pub fn hourly(&self) -> &[f64] {
        &self.hourly
    }

    /// Number of hours covered by the series.
    pub fn hours(&self) -> usize {
        self.hourly.len()
    }

    /// Exterior temperature at simulation time `t_s` (seconds).
    ///
    /// Linear interpolation between hourly samples; the first and last
    /// samples are held outside the covered range.
    pub fn exterior_at(&self, t_s: f64) -> f64 {
        let Some(&last) = self.hourly.last() else {
            return f64::NAN;
        };
        let x = t_s / SECONDS_PER_HOUR;
        if x.is_nan() {
            return f64::NAN;
        }
        if x <= 0.0 {
            return self.hourly[0];
        }
        let i = x.floor() as usize;
        if i + 1 >= self.hourly.len() {
            return last;
        }
        let frac = x - i as f64;
        self.hourly[i] + (self.hourly[i + 1] - self.hourly[i]) * frac
    }
}
