//! Core domain types for pethsim.
//!
//! This module defines the fundamental types used throughout the system:
//! - Drinking sessions and subject parameters (inputs)
//! - Timeline samples and simulation results (outputs)
//! - The derived parameter set carried alongside every result

use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Subject Types
// ============================================================================

/// Biological sex, used only to select the Widmark distribution ratio
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Widmark ratio `r`: fraction of body weight acting as distribution volume
    pub fn widmark_ratio(self) -> f64 {
        match self {
            Sex::Male => 0.68,
            Sex::Female => 0.55,
        }
    }
}

impl std::str::FromStr for Sex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Sex::Male),
            "female" | "f" => Ok(Sex::Female),
            other => Err(Error::InvalidSubject(format!("unknown sex '{}'", other))),
        }
    }
}

/// Scalar inputs describing the person being simulated
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SubjectParameters {
    pub sex: Sex,
    pub weight_kg: f64,
    pub age_years: u32,
}

impl SubjectParameters {
    pub fn new(sex: Sex, weight_kg: f64, age_years: u32) -> Self {
        Self {
            sex,
            weight_kg,
            age_years,
        }
    }

    /// Reject weights the distribution volume cannot be derived from
    pub fn validate(&self) -> Result<()> {
        if !self.weight_kg.is_finite() || self.weight_kg <= 0.0 {
            return Err(Error::InvalidSubject(format!(
                "weight must be a positive number of kg, got {}",
                self.weight_kg
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// A period during which `ethanol_grams` of pure ethanol were consumed at a
/// uniform rate.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrinkingSession {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(alias = "grams")]
    pub ethanol_grams: f64,
    /// Multiplier on absorption speed; below 1 models a full stomach
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absorption_factor: Option<f64>,
}

impl DrinkingSession {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, ethanol_grams: f64) -> Self {
        Self {
            start,
            end,
            ethanol_grams,
            absorption_factor: None,
        }
    }

    /// Builder-style override of the absorption factor
    pub fn with_absorption_factor(mut self, factor: f64) -> Self {
        self.absorption_factor = Some(factor);
        self
    }

    /// Check the session invariants: `end > start`, positive finite grams and
    /// a positive finite absorption factor when one is given.
    pub fn validate(&self) -> Result<()> {
        if self.end <= self.start {
            return Err(Error::InvalidSession(format!(
                "session starting {} must end after it starts (end {})",
                self.start, self.end
            )));
        }
        if !self.ethanol_grams.is_finite() || self.ethanol_grams <= 0.0 {
            return Err(Error::InvalidSession(format!(
                "session starting {} has non-positive ethanol grams {}",
                self.start, self.ethanol_grams
            )));
        }
        if let Some(factor) = self.absorption_factor {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(Error::InvalidSession(format!(
                    "session starting {} has invalid absorption factor {}",
                    self.start, factor
                )));
            }
        }
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Duration in fractional minutes
    pub fn duration_minutes(&self) -> f64 {
        self.duration().num_milliseconds() as f64 / 60_000.0
    }

    /// Absorption multiplier, 1.0 when unset
    pub fn absorption_factor(&self) -> f64 {
        self.absorption_factor.unwrap_or(1.0)
    }

    /// Whether any part of the session falls in the half-open window `[from, to)`
    pub fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.start < to && self.end > from
    }

    /// Grams consumed during `[from, to)` at the session's uniform rate
    ///
    /// Windows tiling the session sum to `ethanol_grams` regardless of how
    /// they align with `start` and `end`.
    pub fn grams_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
        let overlap = self.end.min(to) - self.start.max(from);
        if overlap <= Duration::zero() {
            return 0.0;
        }
        self.ethanol_grams * overlap.num_milliseconds() as f64
            / self.duration().num_milliseconds() as f64
    }

    /// Uniform consumption rate across the session window
    pub fn ingestion_rate_grams_per_minute(&self) -> f64 {
        self.ethanol_grams / self.duration_minutes()
    }
}

// ============================================================================
// Output Types
// ============================================================================

/// One recorded point of the simulated timeline
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TimelineSample {
    pub timestamp: DateTime<Utc>,
    pub bac_permille: f64,
    pub biomarker_ng_per_ml: f64,
    pub stomach_grams: f64,
    pub blood_grams: f64,
}

/// Constants derived once per run from the subject and configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DerivedParameters {
    pub sex: Sex,
    pub weight_kg: f64,
    pub age_years: u32,
    pub widmark_ratio: f64,
    pub age_adjustment: f64,
    pub elimination_permille_per_hour: f64,
    pub distribution_volume_kg: f64,
    pub elimination_grams_per_hour: f64,
    pub biomarker_formation_rate: f64,
    pub decay_half_life_days: f64,
    pub decay_rate_per_hour: f64,
    pub absorption_rate_constant: f64,
    pub absorption_rate_cap: f64,
    pub step_minutes: u32,
}

impl DerivedParameters {
    /// Step length in hours
    pub fn step_hours(&self) -> f64 {
        f64::from(self.step_minutes) / 60.0
    }
}

/// The full output of one engine invocation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SimulationResult {
    pub start_time: DateTime<Utc>,
    pub timeline: Vec<TimelineSample>,
    pub parameters: DerivedParameters,
}

impl SimulationResult {
    /// Sample with the highest BAC (earliest on ties)
    pub fn peak_bac(&self) -> Option<&TimelineSample> {
        self.timeline.iter().fold(None, |best, s| match best {
            Some(b) if b.bac_permille >= s.bac_permille => Some(b),
            _ => Some(s),
        })
    }

    pub fn last_sample(&self) -> Option<&TimelineSample> {
        self.timeline.last()
    }
}
