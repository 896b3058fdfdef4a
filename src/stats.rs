//! Distributional summaries of a batch.
//!
//! All statistics are population statistics; percentiles interpolate
//! linearly between order statistics at rank `p / 100 * (n - 1)`.

use std::fmt;

use crate::weather::HOURS_PER_DAY;

/// Percentile of an ascending slice, or `None` if it is empty.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Summary of a per-trial cost array (USD).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std: f64,
    pub p90: f64,
    pub min: f64,
    pub max: f64,
}

impl CostStats {
    /// Computes the summary, or `None` for an empty array.
    pub fn from_costs(costs: &[f64]) -> Option<Self> {
        if costs.is_empty() {
            return None;
        }
        let sorted = sorted_copy(costs);
        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let var = sorted.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            count: sorted.len(),
            mean,
            median: percentile(&sorted, 50.0)?,
            std: var.sqrt(),
            p90: percentile(&sorted, 90.0)?,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        })
    }
}

impl fmt::Display for CostStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Monthly Cooling Cost ({} trials) ---", self.count)?;
        writeln!(f, "Mean:                  ${:.2}", self.mean)?;
        writeln!(f, "Median:                ${:.2}", self.median)?;
        writeln!(f, "Std deviation:         ${:.2}", self.std)?;
        writeln!(f, "P90:                   ${:.2}", self.p90)?;
        write!(f, "Range:                 ${:.2} .. ${:.2}", self.min, self.max)
    }
}

/// Case temperature distribution at one hour of day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourStats {
    pub hour: usize,
    pub mean_c: f64,
    pub p25_c: f64,
    pub p75_c: f64,
}

/// Hour-of-day temperature profile pooled over every trial and day.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureStats {
    /// One entry per hour of day, `0..24`.
    pub hourly: Vec<HourStats>,
    pub min_c: f64,
    pub max_c: f64,
    /// Hour of day with the lowest mean.
    pub coolest_hour: usize,
    /// Hour of day with the highest mean.
    pub warmest_hour: usize,
}

impl TemperatureStats {
    /// Pools hourly profiles by hour of day.
    ///
    /// Sample `i` of every profile is taken at `t = i` hours and lands in
    /// bucket `i % 24`. Sample 0 is the initial condition and is skipped, so
    /// a profile over `d` days contributes `d` samples to each bucket.
    /// Non-finite samples are skipped too.
    ///
    /// # Returns
    ///
    /// `None` if no finite sample exists.
    pub fn from_profiles<P: AsRef<[f64]>>(profiles: &[P]) -> Option<Self> {
        let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); HOURS_PER_DAY];
        for profile in profiles {
            for (i, &t) in profile.as_ref().iter().enumerate().skip(1) {
                if t.is_finite() {
                    buckets[i % HOURS_PER_DAY].push(t);
                }
            }
        }

        let mut hourly = Vec::with_capacity(HOURS_PER_DAY);
        let mut min_c = f64::INFINITY;
        let mut max_c = f64::NEG_INFINITY;
        for (hour, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            let sorted = sorted_copy(&bucket);
            min_c = min_c.min(sorted[0]);
            max_c = max_c.max(sorted[sorted.len() - 1]);
            hourly.push(HourStats {
                hour,
                mean_c: sorted.iter().sum::<f64>() / sorted.len() as f64,
                p25_c: percentile(&sorted, 25.0)?,
                p75_c: percentile(&sorted, 75.0)?,
            });
        }

        let coolest = hourly
            .iter()
            .min_by(|a, b| a.mean_c.total_cmp(&b.mean_c))?
            .hour;
        let warmest = hourly
            .iter()
            .max_by(|a, b| a.mean_c.total_cmp(&b.mean_c))?
            .hour;

        Some(Self {
            hourly,
            min_c,
            max_c,
            coolest_hour: coolest,
            warmest_hour: warmest,
        })
    }
}

impl fmt::Display for TemperatureStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Case Temperature by Hour ---")?;
        writeln!(f, "Hour   Mean     P25      P75")?;
        for h in &self.hourly {
            writeln!(
                f,
                "{:02}:00  {:6.2}  {:6.2}  {:6.2}",
                h.hour, h.mean_c, h.p25_c, h.p75_c
            )?;
        }
        writeln!(f, "Range:                 {:.2} .. {:.2} °C", self.min_c, self.max_c)?;
        write!(
            f,
            "Coolest / warmest:     {:02}:00 / {:02}:00",
            self.coolest_hour, self.warmest_hour
        )
    }
}

/// Relative saving of strategy `b` over strategy `a` (percent).
///
/// Positive values mean `b` is cheaper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyComparison {
    pub mean_improvement_pct: f64,
    pub p90_improvement_pct: f64,
}

impl StrategyComparison {
    pub fn compare(a: &CostStats, b: &CostStats) -> Self {
        Self {
            mean_improvement_pct: improvement_pct(a.mean, b.mean),
            p90_improvement_pct: improvement_pct(a.p90, b.p90),
        }
    }
}

fn improvement_pct(a: f64, b: f64) -> f64 {
    if a == 0.0 {
        return 0.0;
    }
    (1.0 - b / a) * 100.0
}

impl fmt::Display for StrategyComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Strategy Comparison ---")?;
        writeln!(f, "Mean cost saving:      {:.1}%", self.mean_improvement_pct)?;
        write!(f, "P90 cost saving:       {:.1}%", self.p90_improvement_pct)
    }
}

/// Thermal safety over the successful trials of a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetySummary {
    pub case_limit_c: f64,
    /// Highest case temperature seen in any trial.
    pub worst_case_temp_c: f64,
    pub mean_max_case_temp_c: f64,
    pub mean_hours_above_limit: f64,
    /// Share of trials whose case never exceeded the limit (percent).
    pub trials_within_limit_pct: f64,
}

impl SafetySummary {
    /// # Returns
    ///
    /// `None` if no trial is given or the two slices differ in length.
    pub fn from_trials(
        max_case_temps: &[f64],
        hours_above_limit: &[f64],
        case_limit_c: f64,
    ) -> Option<Self> {
        if max_case_temps.is_empty() || max_case_temps.len() != hours_above_limit.len() {
            return None;
        }
        let n = max_case_temps.len() as f64;
        let within = max_case_temps.iter().filter(|&&t| t <= case_limit_c).count();
        Some(Self {
            case_limit_c,
            worst_case_temp_c: max_case_temps.iter().cloned().fold(f64::MIN, f64::max),
            mean_max_case_temp_c: max_case_temps.iter().sum::<f64>() / n,
            mean_hours_above_limit: hours_above_limit.iter().sum::<f64>() / n,
            trials_within_limit_pct: 100.0 * within as f64 / n,
        })
    }
}

impl fmt::Display for SafetySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Thermal Safety (limit {:.1} °C) ---", self.case_limit_c)?;
        writeln!(f, "Worst case temp:       {:.2} °C", self.worst_case_temp_c)?;
        writeln!(f, "Mean peak case temp:   {:.2} °C", self.mean_max_case_temp_c)?;
        writeln!(f, "Mean hours above:      {:.2} h", self.mean_hours_above_limit)?;
        write!(f, "Trials within limit:   {:.1}%", self.trials_within_limit_pct)
    }
}

/// Two-sample Kolmogorov–Smirnov statistic: the largest gap between the
/// empirical CDFs of `a` and `b`.
///
/// Returns 0 if either sample is empty.
pub fn ks_statistic(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a = sorted_copy(a);
    let b = sorted_copy(b);
    let (na, nb) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0, 0);
    let mut d: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / na - j as f64 / nb).abs());
    }
    d
}

/// Critical value of the two-sample KS statistic at significance `alpha`
/// (asymptotic approximation).
pub fn ks_critical_value(n: usize, m: usize, alpha: f64) -> f64 {
    let (n, m) = (n as f64, m as f64);
    let c = (-(alpha / 2.0).ln() / 2.0).sqrt();
    c * ((n + m) / (n * m)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn cost_stats_of_known_array() {
        let s = CostStats::from_costs(&[4.0, 1.0, 3.0, 2.0, 5.0]).expect("non-empty");
        assert_eq!(s.count, 5);
        assert_eq!(s.mean, 3.0);
        assert_eq!(s.median, 3.0);
        assert!((s.std - 2.0_f64.sqrt()).abs() < 1e-12);
        assert!((s.p90 - 4.6).abs() < 1e-12);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 5.0);
    }

    #[test]
    fn empty_costs_have_no_stats() {
        assert!(CostStats::from_costs(&[]).is_none());
    }

    #[test]
    fn single_cost() {
        let s = CostStats::from_costs(&[7.5]).expect("non-empty");
        assert_eq!(s.median, 7.5);
        assert_eq!(s.p90, 7.5);
        assert_eq!(s.std, 0.0);
    }

    #[test]
    fn percentile_interpolates() {
        let v = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile(&v, 0.0), Some(10.0));
        assert_eq!(percentile(&v, 100.0), Some(40.0));
        assert!((percentile(&v, 50.0).unwrap() - 25.0).abs() < 1e-12);
        assert!((percentile(&v, 25.0).unwrap() - 17.5).abs() < 1e-12);
    }

    #[test]
    fn percentile_of_nothing() {
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn comparison_formula() {
        let a = CostStats::from_costs(&[100.0, 100.0]).expect("non-empty");
        let b = CostStats::from_costs(&[80.0, 80.0]).expect("non-empty");
        let c = StrategyComparison::compare(&a, &b);
        assert!((c.mean_improvement_pct - 20.0).abs() < 1e-12);
        assert!((c.p90_improvement_pct - 20.0).abs() < 1e-12);
        let worse = StrategyComparison::compare(&b, &a);
        assert!(worse.mean_improvement_pct < 0.0);
    }

    #[test]
    fn temperature_stats_pool_by_hour_of_day() {
        // Two days per profile after a 100 degree initial sample; hour h reads
        // h on day one and h + 2 on day two.
        let profile: Vec<f64> = std::iter::once(100.0)
            .chain((1..=48).map(|i| (i % 24) as f64 + if i <= 24 { 0.0 } else { 2.0 }))
            .collect();
        let stats = TemperatureStats::from_profiles(&[profile.clone(), profile]).expect("samples");
        assert_eq!(stats.hourly.len(), 24);
        assert_eq!(stats.hourly[0].mean_c, 1.0);
        assert_eq!(stats.hourly[5].mean_c, 6.0);
        assert_eq!(stats.hourly[5].p25_c, 5.0);
        assert_eq!(stats.hourly[5].p75_c, 7.0);
        assert_eq!(stats.min_c, 0.0);
        assert_eq!(stats.max_c, 25.0);
        assert_eq!(stats.coolest_hour, 0);
        assert_eq!(stats.warmest_hour, 23);
    }

    #[test]
    fn temperature_stats_without_samples() {
        let empty: Vec<Vec<f64>> = vec![vec![f64::NAN; 3]];
        assert!(TemperatureStats::from_profiles(&empty).is_none());
        let initial_only = vec![vec![25.0]];
        assert!(TemperatureStats::from_profiles(&initial_only).is_none());
    }

    #[test]
    fn safety_summary() {
        let s = SafetySummary::from_trials(&[24.0, 26.0, 25.0, 30.0], &[0.0, 2.0, 0.0, 6.0], 25.0)
            .expect("trials");
        assert_eq!(s.worst_case_temp_c, 30.0);
        assert_eq!(s.mean_hours_above_limit, 2.0);
        assert_eq!(s.trials_within_limit_pct, 50.0);
        assert!(SafetySummary::from_trials(&[], &[], 25.0).is_none());
    }

    #[test]
    fn ks_of_identical_and_disjoint_samples() {
        let a = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(ks_statistic(&a, &a), 0.0);
        assert_eq!(ks_statistic(&a, &[10.0, 11.0]), 1.0);
        assert_eq!(ks_statistic(&[1.0, 3.0], &[2.0, 4.0]), 0.5);
    }

    #[test]
    fn ks_critical_value_matches_table() {
        // c(0.05) = 1.358
        let d = ks_critical_value(50, 50, 0.05);
        assert!((d - 1.358 * (0.04_f64).sqrt()).abs() < 1e-3);
    }

    proptest! {
        #[test]
        fn order_statistics_are_ordered(costs in prop::collection::vec(0.0f64..1e4, 1..200)) {
            let s = CostStats::from_costs(&costs).expect("non-empty");
            prop_assert!(s.min <= s.median);
            prop_assert!(s.median <= s.p90);
            prop_assert!(s.p90 <= s.max);
            prop_assert!(s.min <= s.mean + 1e-9 && s.mean <= s.max + 1e-9);
            prop_assert!(s.std >= 0.0);
        }

        #[test]
        fn ks_statistic_is_a_distance(
            a in prop::collection::vec(-50.0f64..50.0, 1..60),
            b in prop::collection::vec(-50.0f64..50.0, 1..60),
        ) {
            let d = ks_statistic(&a, &b);
            prop_assert!((0.0..=1.0).contains(&d));
            prop_assert!((d - ks_statistic(&b, &a)).abs() < 1e-12);
        }
    }
}
