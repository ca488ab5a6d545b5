//! Configuration file support for pethsim.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/pethsim/config.toml`.
//!
//! Every numeric default here is a literature-typical heuristic chosen so the
//! model produces plausible curves. None of them is ground truth and all of
//! them can be overridden.

use crate::{BacUnit, Error, Result, Sex, SubjectParameters};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Smallest accepted simulation step
pub const MIN_STEP_MINUTES: u32 = 1;

/// Largest accepted simulation step
pub const MAX_STEP_MINUTES: u32 = 120;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub subject: SubjectConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

/// Numeric knobs of the simulation engine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    /// PEth elimination half-life
    #[serde(default = "default_decay_half_life_days")]
    pub decay_half_life_days: f64,

    /// Integrator step. Values outside 1..=120 are clamped (with a warning)
    #[serde(default = "default_step_minutes")]
    pub step_minutes: u32,

    /// ng/mL of PEth formed per hour at a BAC of 1‰
    #[serde(default = "default_biomarker_formation_rate")]
    pub biomarker_formation_rate: f64,

    /// First-order stomach to blood rate constant (per hour, empty stomach)
    #[serde(default = "default_absorption_rate_constant")]
    pub absorption_rate_constant: f64,

    /// Ceiling on absorbed grams per hour
    #[serde(default = "default_absorption_rate_cap")]
    pub absorption_rate_cap: f64,

    #[serde(default = "default_apply_blood_water_factor")]
    pub apply_blood_water_factor: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            decay_half_life_days: default_decay_half_life_days(),
            step_minutes: default_step_minutes(),
            biomarker_formation_rate: default_biomarker_formation_rate(),
            absorption_rate_constant: default_absorption_rate_constant(),
            absorption_rate_cap: default_absorption_rate_cap(),
            apply_blood_water_factor: default_apply_blood_water_factor(),
        }
    }
}

/// Default subject used by the CLI when flags are omitted
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct SubjectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<Sex>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_years: Option<u32>,
}

/// Output presentation configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    #[serde(default)]
    pub bac_unit: BacUnit,

    /// BAC (‰) above which time is counted as "over the limit"
    #[serde(default = "default_warning_permille")]
    pub warning_permille: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            bac_unit: BacUnit::default(),
            warning_permille: default_warning_permille(),
        }
    }
}

// Default value functions
fn default_decay_half_life_days() -> f64 {
    4.5
}

fn default_step_minutes() -> u32 {
    5
}

fn default_biomarker_formation_rate() -> f64 {
    11.3
}

fn default_absorption_rate_constant() -> f64 {
    2.0
}

fn default_absorption_rate_cap() -> f64 {
    80.0
}

fn default_apply_blood_water_factor() -> bool {
    true
}

fn default_warning_permille() -> f64 {
    0.5
}

impl SimulationConfig {
    /// Reject values the engine cannot integrate with
    ///
    /// `step_minutes` is not rejected here; see [`Self::effective_step_minutes`].
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("decay_half_life_days", self.decay_half_life_days),
            ("biomarker_formation_rate", self.biomarker_formation_rate),
            ("absorption_rate_constant", self.absorption_rate_constant),
            ("absorption_rate_cap", self.absorption_rate_cap),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Config(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Step length actually used by the engine
    ///
    /// Out-of-range steps are clamped into `MIN_STEP_MINUTES..=MAX_STEP_MINUTES`
    /// and the clamp is logged at warn level.
    pub fn effective_step_minutes(&self) -> u32 {
        let clamped = self.step_minutes.clamp(MIN_STEP_MINUTES, MAX_STEP_MINUTES);
        if clamped != self.step_minutes {
            tracing::warn!(
                "step_minutes {} outside {}..={}, using {}",
                self.step_minutes,
                MIN_STEP_MINUTES,
                MAX_STEP_MINUTES,
                clamped
            );
        }
        clamped
    }
}

impl SubjectConfig {
    /// Fill in the subject from explicit values, falling back to this config
    pub fn resolve(
        &self,
        sex: Option<Sex>,
        weight_kg: Option<f64>,
        age_years: Option<u32>,
    ) -> Result<SubjectParameters> {
        let sex = sex
            .or(self.sex)
            .ok_or_else(|| Error::InvalidSubject("sex is required".into()))?;
        let weight_kg = weight_kg
            .or(self.weight_kg)
            .ok_or_else(|| Error::InvalidSubject("weight is required".into()))?;
        let age_years = age_years
            .or(self.age_years)
            .ok_or_else(|| Error::InvalidSubject("age is required".into()))?;
        Ok(SubjectParameters::new(sex, weight_kg, age_years))
    }
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.simulation.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let base = match dirs::config_dir() {
            Some(dir) => dir,
            None => {
                let home = std::env::var("HOME").map_err(|_| {
                    Error::Config("cannot locate config directory: HOME is not set".into())
                })?;
                PathBuf::from(home).join(".config")
            }
        };
        Ok(base.join("pethsim").join("config.toml"))
    }

    /// Serialize to pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_toml()?)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
