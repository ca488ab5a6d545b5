//! Unit constants and conversions.
//!
//! Internally the engine works in grams, permille BAC and ng/mL PEth. Display
//! layers convert at the edge with the helpers below.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Molecular weight of PEth 16:0/18:1
pub const PETH_MOLECULAR_WEIGHT_G_PER_MOL: f64 = 704.6;

/// kg blood water per L blood, applied to the Widmark volume
pub const BLOOD_WATER_FACTOR: f64 = 1.055;

/// Density of pure ethanol
pub const ETHANOL_DENSITY_G_PER_ML: f64 = 0.789;

/// Convert a PEth mass concentration (ng/mL) to molar concentration (µmol/L)
pub fn ng_per_ml_to_umol_per_l(ng_per_ml: f64) -> f64 {
    ng_per_ml / PETH_MOLECULAR_WEIGHT_G_PER_MOL
}

/// Inverse of [`ng_per_ml_to_umol_per_l`]
pub fn umol_per_l_to_ng_per_ml(umol_per_l: f64) -> f64 {
    umol_per_l * PETH_MOLECULAR_WEIGHT_G_PER_MOL
}

pub fn permille_to_percent(permille: f64) -> f64 {
    permille / 10.0
}

/// Permille to mg/L, taking 1 kg of blood-equivalent mass as 1 L
pub fn permille_to_mg_per_l(permille: f64) -> f64 {
    permille * 1000.0
}

/// Grams of pure ethanol in a beverage
///
/// `volume_ml × 0.789 g/mL × abv_percent / 100`
pub fn pure_ethanol_grams(volume_ml: f64, abv_percent: f64) -> Result<f64> {
    if !volume_ml.is_finite() || volume_ml < 0.0 {
        return Err(Error::InvalidBeverage(format!(
            "volume must be a non-negative number of mL, got {}",
            volume_ml
        )));
    }
    if !abv_percent.is_finite() || !(0.0..=100.0).contains(&abv_percent) {
        return Err(Error::InvalidBeverage(format!(
            "ABV must be between 0 and 100 percent, got {}",
            abv_percent
        )));
    }
    Ok(volume_ml * ETHANOL_DENSITY_G_PER_ML * abv_percent / 100.0)
}

/// Unit a BAC value is displayed in
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BacUnit {
    #[default]
    Permille,
    Percent,
    MgPerL,
}

impl BacUnit {
    pub fn convert(self, permille: f64) -> f64 {
        match self {
            BacUnit::Permille => permille,
            BacUnit::Percent => permille_to_percent(permille),
            BacUnit::MgPerL => permille_to_mg_per_l(permille),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BacUnit::Permille => "‰",
            BacUnit::Percent => "%",
            BacUnit::MgPerL => "mg/L",
        }
    }
}

impl std::str::FromStr for BacUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "permille" | "‰" => Ok(BacUnit::Permille),
            "percent" | "%" => Ok(BacUnit::Percent),
            "mg_per_l" | "mg/l" => Ok(BacUnit::MgPerL),
            other => Err(Error::Config(format!("unknown BAC unit '{}'", other))),
        }
    }
}
