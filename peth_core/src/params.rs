//! Derivation of per-run model constants.
//!
//! All values are computed once from the subject and configuration and carried
//! in the result so callers can display or recompute them.

use crate::units::BLOOD_WATER_FACTOR;
use crate::{DerivedParameters, SimulationConfig, SubjectParameters};

/// Elimination rate (‰/h) of a 40-year-old before age adjustment
pub const BASE_ELIMINATION_PERMILLE_PER_HOUR: f64 = 0.15;

const AGE_PIVOT_YEARS: f64 = 40.0;
const AGE_SLOPE_PER_YEAR: f64 = 0.003;
const AGE_FACTOR_MIN: f64 = 0.85;
const AGE_FACTOR_MAX: f64 = 1.25;

/// Age multiplier on the elimination rate
///
/// `clamp(1 + (age - 40) × 0.003, 0.85, 1.25)`
pub fn age_adjustment(age_years: u32) -> f64 {
    (1.0 + (f64::from(age_years) - AGE_PIVOT_YEARS) * AGE_SLOPE_PER_YEAR)
        .clamp(AGE_FACTOR_MIN, AGE_FACTOR_MAX)
}

/// Resolve the constants of one run
pub fn resolve_parameters(
    subject: &SubjectParameters,
    config: &SimulationConfig,
) -> DerivedParameters {
    let widmark_ratio = subject.sex.widmark_ratio();
    let age_adjustment = age_adjustment(subject.age_years);
    let elimination_permille_per_hour = BASE_ELIMINATION_PERMILLE_PER_HOUR * age_adjustment;

    let water = if config.apply_blood_water_factor {
        BLOOD_WATER_FACTOR
    } else {
        1.0
    };
    let distribution_volume_kg = widmark_ratio * subject.weight_kg * water;
    let elimination_grams_per_hour = elimination_permille_per_hour * distribution_volume_kg;

    let decay_rate_per_hour = std::f64::consts::LN_2 / (config.decay_half_life_days * 24.0);

    DerivedParameters {
        sex: subject.sex,
        weight_kg: subject.weight_kg,
        age_years: subject.age_years,
        widmark_ratio,
        age_adjustment,
        elimination_permille_per_hour,
        distribution_volume_kg,
        elimination_grams_per_hour,
        biomarker_formation_rate: config.biomarker_formation_rate,
        decay_half_life_days: config.decay_half_life_days,
        decay_rate_per_hour,
        absorption_rate_constant: config.absorption_rate_constant,
        absorption_rate_cap: config.absorption_rate_cap,
        step_minutes: config.effective_step_minutes(),
    }
}
