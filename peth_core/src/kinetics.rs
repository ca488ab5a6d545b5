//! Two-compartment kinetics stepper.
//!
//! Each step runs, in order:
//! 1. Ingestion into the stomach of the active session's grams that fall in
//!    the step window `[now, now + step)`
//! 2. First-order absorption stomach → blood, capped at an absolute rate
//! 3. Zero-order elimination from blood
//! 4. BAC from blood mass and distribution volume
//! 5. PEth formation proportional to BAC, with exponential decay
//!
//! Every compartment is floored at zero after every operation.

use crate::{DerivedParameters, DrinkingSession};
use chrono::{DateTime, Duration, Utc};

/// Mutable per-run compartment values
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompartmentState {
    pub stomach_grams: f64,
    pub blood_grams: f64,
    pub biomarker_ng_per_ml: f64,
}

/// Values produced by one step
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepOutcome {
    pub ingested_grams: f64,
    pub absorbed_grams: f64,
    pub eliminated_grams: f64,
    pub bac_permille: f64,
}

impl CompartmentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance all compartments by one step of `params.step_minutes` starting
    /// at `now`
    ///
    /// `active` is the session overlapping the step window, if any. Only the
    /// part of the session inside the window is ingested.
    pub fn step(
        &mut self,
        now: DateTime<Utc>,
        active: Option<&DrinkingSession>,
        params: &DerivedParameters,
    ) -> StepOutcome {
        let step_minutes = f64::from(params.step_minutes);
        let step_hours = params.step_hours();
        let window_end = now + Duration::minutes(i64::from(params.step_minutes));

        let ingested_grams = active
            .map(|s| s.grams_between(now, window_end))
            .unwrap_or(0.0);
        self.stomach_grams += ingested_grams;

        let absorbed_grams = self.absorb(active, params, step_minutes, step_hours);
        let eliminated_grams = self.eliminate(params, step_minutes);

        let bac_permille = self.blood_grams / params.distribution_volume_kg;
        self.update_biomarker(bac_permille, params, step_hours);

        StepOutcome {
            ingested_grams,
            absorbed_grams,
            eliminated_grams,
            bac_permille,
        }
    }

    /// Move ethanol from stomach to blood, returning the grams transferred
    fn absorb(
        &mut self,
        active: Option<&DrinkingSession>,
        params: &DerivedParameters,
        step_minutes: f64,
        step_hours: f64,
    ) -> f64 {
        let factor = active.map(DrinkingSession::absorption_factor).unwrap_or(1.0);
        let k = params.absorption_rate_constant * factor;

        let first_order = self.stomach_grams * k * step_hours;
        let cap = params.absorption_rate_cap * factor / 60.0 * step_minutes;
        let absorbed = self.stomach_grams.min(first_order).min(cap).max(0.0);

        self.stomach_grams = (self.stomach_grams - absorbed).max(0.0);
        self.blood_grams += absorbed;
        absorbed
    }

    /// Zero-order clearance, never below empty
    fn eliminate(&mut self, params: &DerivedParameters, step_minutes: f64) -> f64 {
        let capacity = params.elimination_grams_per_hour / 60.0 * step_minutes;
        let eliminated = capacity.min(self.blood_grams).max(0.0);
        self.blood_grams = (self.blood_grams - capacity).max(0.0);
        eliminated
    }

    fn update_biomarker(&mut self, bac_permille: f64, params: &DerivedParameters, step_hours: f64) {
        let formation = params.biomarker_formation_rate * bac_permille * step_hours;
        let decay = self.biomarker_ng_per_ml
            * (1.0 - (-params.decay_rate_per_hour * step_hours).exp());
        self.biomarker_ng_per_ml = (self.biomarker_ng_per_ml + formation - decay).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{resolve_parameters, Sex, SimulationConfig, SubjectParameters};
    use chrono::TimeZone;

    fn params() -> DerivedParameters {
        params_with_step(5)
    }

    fn params_with_step(step_minutes: u32) -> DerivedParameters {
        let config = SimulationConfig {
            step_minutes,
            ..SimulationConfig::default()
        };
        resolve_parameters(&SubjectParameters::new(Sex::Male, 80.0, 40), &config)
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).unwrap()
    }

    fn session(grams: f64, minutes: i64) -> DrinkingSession {
        DrinkingSession::new(start(), start() + Duration::minutes(minutes), grams)
    }

    /// Step from `from` until the session is over, summing what was ingested
    fn total_ingested(s: &DrinkingSession, from: DateTime<Utc>, step_minutes: u32) -> f64 {
        let p = params_with_step(step_minutes);
        let step = Duration::minutes(i64::from(step_minutes));
        let mut state = CompartmentState::new();
        let mut now = from;
        let mut total = 0.0;
        while now < s.end {
            total += state.step(now, Some(s), &p).ingested_grams;
            now = now + step;
        }
        total
    }

    #[test]
    fn test_idle_step_stays_at_zero() {
        let mut state = CompartmentState::new();
        let outcome = state.step(start(), None, &params());

        assert_eq!(state, CompartmentState::default());
        assert_eq!(outcome.bac_permille, 0.0);
        assert_eq!(outcome.eliminated_grams, 0.0);
    }

    #[test]
    fn test_ingestion_is_uniform() {
        let mut state = CompartmentState::new();
        let s = session(60.0, 120);
        let outcome = state.step(start(), Some(&s), &params());

        // 0.5 g/min for 5 minutes
        assert!((outcome.ingested_grams - 2.5).abs() < 1e-12);
        let total = state.stomach_grams + state.blood_grams + outcome.eliminated_grams;
        assert!((total - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_ingestion_conserves_dose_at_any_step() {
        let s = session(60.0, 120);
        for step_minutes in [5, 60, 120] {
            let total = total_ingested(&s, start(), step_minutes);
            assert!((total - 60.0).abs() < 1e-9, "step {}: {} g", step_minutes, total);
        }
    }

    #[test]
    fn test_ingestion_conserves_dose_off_grid() {
        // 90 minute session starting between grid points
        let s = DrinkingSession::new(
            start() + Duration::minutes(3),
            start() + Duration::minutes(93),
            45.0,
        );
        for step_minutes in [5, 60, 120] {
            let total = total_ingested(&s, start(), step_minutes);
            assert!((total - 45.0).abs() < 1e-9, "step {}: {} g", step_minutes, total);
        }
    }

    #[test]
    fn test_window_past_session_ingests_nothing() {
        let s = session(60.0, 120);
        let mut state = CompartmentState::new();
        let outcome = state.step(s.end, Some(&s), &params());
        assert_eq!(outcome.ingested_grams, 0.0);
    }

    #[test]
    fn test_first_order_absorption() {
        let p = params();
        let mut state = CompartmentState {
            stomach_grams: 12.0,
            ..CompartmentState::default()
        };
        let outcome = state.step(start(), None, &p);

        // k = 2/h over 5 minutes moves 1/6 of the stomach
        assert!((outcome.absorbed_grams - 2.0).abs() < 1e-12);
        assert!((state.stomach_grams - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_absorption_cap_limits_large_dose() {
        let p = params();
        let mut state = CompartmentState {
            stomach_grams: 500.0,
            ..CompartmentState::default()
        };
        let outcome = state.step(start(), None, &p);

        // 80 g/h cap over 5 minutes
        assert!((outcome.absorbed_grams - 80.0 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_absorption_never_exceeds_stomach() {
        let config = SimulationConfig {
            step_minutes: 120,
            absorption_rate_constant: 6.0,
            absorption_rate_cap: 10_000.0,
            ..SimulationConfig::default()
        };
        let p = resolve_parameters(&SubjectParameters::new(Sex::Male, 80.0, 40), &config);
        let mut state = CompartmentState {
            stomach_grams: 5.0,
            ..CompartmentState::default()
        };
        let outcome = state.step(start(), None, &p);

        assert_eq!(outcome.absorbed_grams, 5.0);
        assert_eq!(state.stomach_grams, 0.0);
    }

    #[test]
    fn test_full_stomach_slows_absorption() {
        let p = params();
        let slow = session(60.0, 120).with_absorption_factor(0.5);
        let fast = session(60.0, 120);

        let mut a = CompartmentState::new();
        let mut b = CompartmentState::new();
        let slow_out = a.step(start(), Some(&slow), &p);
        let fast_out = b.step(start(), Some(&fast), &p);

        assert!(slow_out.absorbed_grams < fast_out.absorbed_grams);
    }

    #[test]
    fn test_elimination_floors_at_zero() {
        let p = params();
        let mut state = CompartmentState {
            blood_grams: 0.1,
            ..CompartmentState::default()
        };
        let outcome = state.step(start(), None, &p);

        assert_eq!(state.blood_grams, 0.0);
        assert!((outcome.eliminated_grams - 0.1).abs() < 1e-12);
        assert_eq!(outcome.bac_permille, 0.0);
    }

    #[test]
    fn test_biomarker_forms_and_decays() {
        let p = params();
        let mut state = CompartmentState {
            blood_grams: p.distribution_volume_kg * 2.0,
            ..CompartmentState::default()
        };
        state.step(start(), None, &p);
        assert!(state.biomarker_ng_per_ml > 0.0);

        let mut decaying = CompartmentState {
            biomarker_ng_per_ml: 100.0,
            ..CompartmentState::default()
        };
        decaying.step(start(), None, &p);
        let expected = 100.0 * (-p.decay_rate_per_hour * p.step_hours()).exp();
        assert!((decaying.biomarker_ng_per_ml - expected).abs() < 1e-9);
    }
}
