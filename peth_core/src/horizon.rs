//! Adaptive stopping rule for the simulation loop.
//!
//! The run always covers a minimum horizon (the drinking period plus a buffer,
//! and at least four days). Past that point it continues until PEth has fallen
//! to the target concentration, or until the absolute safety cap.

use crate::units::umol_per_l_to_ng_per_ml;
use chrono::{DateTime, Duration, Utc};

/// Shortest simulated horizon regardless of input
pub const MIN_HORIZON_HOURS: f64 = 96.0;

/// Buffer simulated after the last session ends
pub const POST_SESSION_BUFFER_HOURS: f64 = 48.0;

/// PEth concentration at which a run may stop
pub const TARGET_BIOMARKER_UMOL_PER_L: f64 = 0.05;

/// Absolute bound on simulated time
pub const SAFETY_CAP_DAYS: i64 = 45;

/// Where the controller is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HorizonState {
    Running,
    PastMinimumHorizon,
    Stopped,
}

/// Decides after each step whether the run is finished
#[derive(Clone, Debug)]
pub struct HorizonController {
    step_minutes: u32,
    min_steps: u64,
    target_ng_per_ml: f64,
    cap_minutes: u64,
    state: HorizonState,
}

impl HorizonController {
    /// Build the controller for a run covering `first_start..=last_end`
    pub fn new(first_start: DateTime<Utc>, last_end: DateTime<Utc>, step_minutes: u32) -> Self {
        let span_hours = (last_end - first_start).num_milliseconds() as f64 / 3_600_000.0;
        let horizon_hours = MIN_HORIZON_HOURS.max(span_hours + POST_SESSION_BUFFER_HOURS);
        let min_steps = (horizon_hours * 60.0 / f64::from(step_minutes)).ceil() as u64;

        tracing::debug!(
            "Horizon: minimum {:.1} h ({} steps of {} min)",
            horizon_hours,
            min_steps,
            step_minutes
        );

        Self {
            step_minutes,
            min_steps,
            target_ng_per_ml: umol_per_l_to_ng_per_ml(TARGET_BIOMARKER_UMOL_PER_L),
            cap_minutes: Duration::days(SAFETY_CAP_DAYS).num_minutes() as u64,
            state: HorizonState::Running,
        }
    }

    pub fn min_steps(&self) -> u64 {
        self.min_steps
    }

    pub fn target_ng_per_ml(&self) -> f64 {
        self.target_ng_per_ml
    }

    pub fn state(&self) -> HorizonState {
        self.state
    }

    /// Record the outcome of step `step_index` (0-based) and return the new state
    pub fn observe(&mut self, step_index: u64, biomarker_ng_per_ml: f64) -> HorizonState {
        if self.state == HorizonState::Stopped {
            return self.state;
        }

        if step_index < self.min_steps {
            self.state = HorizonState::Running;
            return self.state;
        }

        if self.state == HorizonState::Running {
            tracing::debug!("Minimum horizon reached at step {}", step_index);
        }

        let elapsed_minutes = step_index * u64::from(self.step_minutes);
        let below_target = biomarker_ng_per_ml <= self.target_ng_per_ml;
        let beyond_cap = elapsed_minutes >= self.cap_minutes;

        self.state = if below_target || beyond_cap {
            if beyond_cap && !below_target {
                tracing::warn!(
                    "Safety cap of {} days reached with PEth still at {:.1} ng/mL",
                    SAFETY_CAP_DAYS,
                    biomarker_ng_per_ml
                );
            }
            HorizonState::Stopped
        } else {
            HorizonState::PastMinimumHorizon
        };
        self.state
    }
}
