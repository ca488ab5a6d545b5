//! Headline figures derived from a simulated timeline.

use crate::units::ng_per_ml_to_umol_per_l;
use crate::SimulationResult;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Key numbers shown next to the timeline
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TimelineSummary {
    pub peak_bac_permille: f64,
    pub peak_bac_at: DateTime<Utc>,
    pub warning_permille: f64,
    /// Time spent at or above `warning_permille`
    pub hours_above_warning: f64,
    pub peak_biomarker_ng_per_ml: f64,
    pub peak_biomarker_umol_per_l: f64,
    pub peak_biomarker_at: DateTime<Utc>,
    pub final_biomarker_umol_per_l: f64,
    /// First grid time with zero BAC after the last non-zero sample
    pub sober_at: Option<DateTime<Utc>>,
    pub simulated_hours: f64,
    pub samples: usize,
}

impl TimelineSummary {
    /// Summarize a result; `None` for an empty timeline
    pub fn from_result(result: &SimulationResult, warning_permille: f64) -> Option<Self> {
        let first = result.timeline.first()?;
        let last = result.timeline.last()?;
        let peak = result.peak_bac()?;

        let peak_biomarker = result.timeline.iter().fold(first, |best, s| {
            if s.biomarker_ng_per_ml > best.biomarker_ng_per_ml {
                s
            } else {
                best
            }
        });

        let step = Duration::minutes(i64::from(result.parameters.step_minutes));
        let steps_above = result
            .timeline
            .iter()
            .filter(|s| s.bac_permille >= warning_permille)
            .count();
        let hours_above_warning =
            steps_above as f64 * step.num_minutes() as f64 / 60.0;

        let sober_at = result
            .timeline
            .iter()
            .rev()
            .find(|s| s.bac_permille > 0.0)
            .map(|s| s.timestamp + step);

        Some(Self {
            peak_bac_permille: peak.bac_permille,
            peak_bac_at: peak.timestamp,
            warning_permille,
            hours_above_warning,
            peak_biomarker_ng_per_ml: peak_biomarker.biomarker_ng_per_ml,
            peak_biomarker_umol_per_l: ng_per_ml_to_umol_per_l(peak_biomarker.biomarker_ng_per_ml),
            peak_biomarker_at: peak_biomarker.timestamp,
            final_biomarker_umol_per_l: ng_per_ml_to_umol_per_l(last.biomarker_ng_per_ml),
            sober_at,
            simulated_hours: (last.timestamp - first.timestamp).num_minutes() as f64 / 60.0,
            samples: result.timeline.len(),
        })
    }
}
