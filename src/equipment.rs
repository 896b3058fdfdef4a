//! Cooling equipment catalog and the shared COP evaluation.
//!
//! Each tier is a plain data record. The COP curve is the same
//! floor-clamped linear law for every tier:
//!
//! ```text
//! cop(t) = max(floor, nominal_cop - slope * (t - reference_temp))
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Equipment tiers available in the built-in catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentTier {
    /// Standard fixed-speed unit.
    Economical,
    /// Inverter-driven unit.
    Efficient,
    /// Variable refrigerant flow unit.
    Premium,
}

impl EquipmentTier {
    /// All catalog tiers, cheapest first.
    pub const ALL: [EquipmentTier; 3] = [Self::Economical, Self::Efficient, Self::Premium];

    /// Returns the catalog record for this tier.
    pub fn config(self) -> EquipmentConfig {
        let entry = CATALOG
            .iter()
            .find(|e| e.tier == self)
            .unwrap_or(&CATALOG[0]);
        entry.to_config()
    }

    /// Parses a lowercase tier name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "economical" => Some(Self::Economical),
            "efficient" => Some(Self::Efficient),
            "premium" => Some(Self::Premium),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Economical => "economical",
            Self::Efficient => "efficient",
            Self::Premium => "premium",
        }
    }
}

impl fmt::Display for EquipmentTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct CatalogEntry {
    tier: EquipmentTier,
    label: &'static str,
    nominal_cop: f64,
    degradation_slope: f64,
    cop_floor: f64,
    nominal_power_w: f64,
    purchase_price_usd: f64,
    service_life_years: f64,
    annual_maintenance_usd: f64,
}

/// COP rating temperature shared by every catalog tier (°C).
pub const REFERENCE_TEMP_C: f64 = 35.0;

static CATALOG: [CatalogEntry; 3] = [
    CatalogEntry {
        tier: EquipmentTier::Economical,
        label: "Economical (standard)",
        nominal_cop: 2.8,
        degradation_slope: 0.05,
        cop_floor: 1.0,
        nominal_power_w: 55_000.0,
        purchase_price_usd: 3_500.0,
        service_life_years: 8.0,
        annual_maintenance_usd: 280.0,
    },
    CatalogEntry {
        tier: EquipmentTier::Efficient,
        label: "Efficient (inverter)",
        nominal_cop: 3.2,
        degradation_slope: 0.06,
        cop_floor: 1.2,
        nominal_power_w: 55_000.0,
        purchase_price_usd: 5_800.0,
        service_life_years: 12.0,
        annual_maintenance_usd: 220.0,
    },
    CatalogEntry {
        tier: EquipmentTier::Premium,
        label: "Premium (VRF)",
        nominal_cop: 3.8,
        degradation_slope: 0.07,
        cop_floor: 1.5,
        nominal_power_w: 55_000.0,
        purchase_price_usd: 9_200.0,
        service_life_years: 15.0,
        annual_maintenance_usd: 180.0,
    },
];

/// Immutable description of one cooling unit.
///
/// Shared read-only by every trial of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentConfig {
    /// Display name.
    pub name: String,
    /// COP at the reference outdoor temperature.
    pub nominal_cop: f64,
    /// Outdoor temperature at which `nominal_cop` is rated (°C).
    pub reference_temp_c: f64,
    /// COP lost per °C above the reference temperature.
    pub degradation_slope: f64,
    /// Lower bound of the COP curve (must be > 0).
    pub cop_floor: f64,
    /// Maximum heat removal rate (W).
    pub nominal_power_w: f64,
    /// Smallest heat removal rate the unit can sustain (W). Below it the unit is off.
    pub min_power_w: f64,
    pub purchase_price_usd: f64,
    pub service_life_years: f64,
    pub annual_maintenance_usd: f64,
}

impl CatalogEntry {
    fn to_config(&self) -> EquipmentConfig {
        let e = self;
        EquipmentConfig {
            name: e.label.to_string(),
            nominal_cop: e.nominal_cop,
            reference_temp_c: REFERENCE_TEMP_C,
            degradation_slope: e.degradation_slope,
            cop_floor: e.cop_floor,
            nominal_power_w: e.nominal_power_w,
            min_power_w: 0.0,
            purchase_price_usd: e.purchase_price_usd,
            service_life_years: e.service_life_years,
            annual_maintenance_usd: e.annual_maintenance_usd,
        }
    }
}

impl EquipmentConfig {
    /// Coefficient of performance at the given outdoor temperature.
    ///
    /// Non-increasing in `outdoor_c` and never below `cop_floor`. A
    /// non-finite temperature evaluates to the floor.
    pub fn cop(&self, outdoor_c: f64) -> f64 {
        cop(
            self.nominal_cop,
            self.reference_temp_c,
            self.degradation_slope,
            self.cop_floor,
            outdoor_c,
        )
    }

    /// Amortized purchase price plus maintenance, per month (USD).
    pub fn monthly_ownership_usd(&self) -> f64 {
        let amortized = if self.service_life_years > 0.0 {
            self.purchase_price_usd / (self.service_life_years * 12.0)
        } else {
            0.0
        };
        amortized + self.annual_maintenance_usd / 12.0
    }

    /// Validates the record, prefixing field paths with `prefix`.
    pub fn validate(&self, prefix: &str) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut positive = |name: &str, v: f64| {
            if !(v.is_finite() && v > 0.0) {
                errors.push(ConfigError::new(format!("{prefix}.{name}"), "must be > 0"));
            }
        };
        positive("nominal_cop", self.nominal_cop);
        positive("cop_floor", self.cop_floor);
        positive("nominal_power_w", self.nominal_power_w);

        if !(self.degradation_slope.is_finite() && self.degradation_slope >= 0.0) {
            errors.push(ConfigError::new(
                format!("{prefix}.degradation_slope"),
                "must be >= 0",
            ));
        }
        if !self.reference_temp_c.is_finite() {
            errors.push(ConfigError::new(
                format!("{prefix}.reference_temp_c"),
                "must be finite",
            ));
        }
        if !(self.min_power_w.is_finite() && self.min_power_w >= 0.0) {
            errors.push(ConfigError::new(
                format!("{prefix}.min_power_w"),
                "must be >= 0",
            ));
        } else if self.min_power_w > self.nominal_power_w {
            errors.push(ConfigError::new(
                format!("{prefix}.min_power_w"),
                "must be <= nominal_power_w",
            ));
        }
        errors
    }
}

/// Floor-clamped linear COP law shared by all tiers.
pub fn cop(nominal: f64, reference_c: f64, slope: f64, floor: f64, outdoor_c: f64) -> f64 {
    let linear = nominal - slope * (outdoor_c - reference_c);
    if linear.is_nan() {
        return floor;
    }
    linear.max(floor)
}
