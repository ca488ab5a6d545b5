//! Simulation engine producing the BAC / PEth timeline.
//!
//! The engine is a pure function of its inputs: it normalizes the sessions,
//! starts every compartment at zero and repeats
//! {advance cursor, step kinetics, record sample} until the horizon
//! controller signals stop.
//!
//! Each sample at time `t` covers the step window `[t, t + step)`, and a
//! session's grams are spread over the windows it overlaps.

use crate::horizon::{HorizonController, HorizonState};
use crate::kinetics::CompartmentState;
use crate::schedule::SessionSchedule;
use crate::{
    resolve_parameters, DerivedParameters, DrinkingSession, Result, SimulationConfig,
    SimulationResult, SubjectParameters, TimelineSample,
};
use chrono::{DateTime, Duration, Utc};

/// Run one simulation
///
/// Returns `Ok(None)` when `sessions` is empty: there is no timeline to show,
/// which is not an error. Invalid subjects, sessions or configuration fail
/// the whole run.
pub fn simulate(
    subject: &SubjectParameters,
    sessions: &[DrinkingSession],
    config: &SimulationConfig,
) -> Result<Option<SimulationResult>> {
    if sessions.is_empty() {
        tracing::info!("No drinking sessions given, nothing to simulate");
        return Ok(None);
    }

    subject.validate()?;
    config.validate()?;
    for session in sessions {
        session.validate()?;
    }

    let params = resolve_parameters(subject, config);
    let schedule = SessionSchedule::new(sessions);
    let (start_time, last_end) = match (schedule.first_start(), schedule.last_end()) {
        (Some(start), Some(end)) => (start, end),
        _ => return Ok(None),
    };

    tracing::info!(
        "Simulating {} session(s) from {} for {:?} {} kg, age {}",
        schedule.len(),
        start_time,
        subject.sex,
        subject.weight_kg,
        subject.age_years
    );

    let Integration {
        timeline,
        delivered_grams,
    } = integrate(&schedule, &params, start_time, last_end);
    warn_undelivered(&schedule, &delivered_grams);

    tracing::info!(
        "Simulation finished after {} steps ({:.1} days)",
        timeline.len(),
        (timeline.len() as f64 * f64::from(params.step_minutes)) / (60.0 * 24.0)
    );

    Ok(Some(SimulationResult {
        start_time,
        timeline,
        parameters: params,
    }))
}

/// Timeline plus how much of each session actually entered the stomach
struct Integration {
    timeline: Vec<TimelineSample>,
    /// Indexed like `SessionSchedule::sessions`
    delivered_grams: Vec<f64>,
}

fn integrate(
    schedule: &SessionSchedule<'_>,
    params: &DerivedParameters,
    start_time: DateTime<Utc>,
    last_end: DateTime<Utc>,
) -> Integration {
    let step_minutes = i64::from(params.step_minutes);
    let mut horizon = HorizonController::new(start_time, last_end, params.step_minutes);
    let mut cursor = schedule.cursor();
    let mut state = CompartmentState::new();
    let mut timeline = Vec::with_capacity(horizon.min_steps() as usize + 1);
    let mut delivered_grams = vec![0.0; schedule.len()];

    let mut step_index: u64 = 0;
    loop {
        let now = start_time + Duration::minutes(step_index as i64 * step_minutes);
        let window_end = now + Duration::minutes(step_minutes);

        cursor.advance(now);
        let active = cursor.active(now, window_end);
        let outcome = state.step(now, active, params);
        if active.is_some() {
            delivered_grams[cursor.index()] += outcome.ingested_grams;
        }

        timeline.push(TimelineSample {
            timestamp: now,
            bac_permille: outcome.bac_permille,
            biomarker_ng_per_ml: state.biomarker_ng_per_ml,
            stomach_grams: state.stomach_grams,
            blood_grams: state.blood_grams,
        });

        if horizon.observe(step_index, state.biomarker_ng_per_ml) == HorizonState::Stopped {
            break;
        }
        step_index += 1;
    }

    Integration {
        timeline,
        delivered_grams,
    }
}

/// Report sessions the cursor reached too late to ingest in full
///
/// This happens when a session starts before an earlier one has ended, or
/// when two sessions share a step window.
fn warn_undelivered(schedule: &SessionSchedule<'_>, delivered_grams: &[f64]) {
    for (session, delivered) in schedule.sessions().iter().zip(delivered_grams) {
        let missing = session.ethanol_grams - delivered;
        if missing > session.ethanol_grams * 1e-9 {
            tracing::warn!(
                "Session starting {} overlaps an earlier session; {:.1} g of its {:.1} g \
                 were not ingested",
                session.start,
                missing,
                session.ethanol_grams
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::ng_per_ml_to_umol_per_l;
    use crate::{Error, Sex};
    use chrono::TimeZone;

    fn evening() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).unwrap()
    }

    fn male_80() -> SubjectParameters {
        SubjectParameters::new(Sex::Male, 80.0, 35)
    }

    /// 40 mL of 40% spirits
    fn dose_grams(doses: u32) -> f64 {
        f64::from(doses) * 40.0 * 0.4 * 0.789
    }

    fn single(grams: f64, hours: i64) -> Vec<DrinkingSession> {
        vec![DrinkingSession::new(
            evening(),
            evening() + Duration::hours(hours),
            grams,
        )]
    }

    fn run(subject: &SubjectParameters, sessions: &[DrinkingSession]) -> SimulationResult {
        simulate(subject, sessions, &SimulationConfig::default())
            .unwrap()
            .unwrap()
    }

    fn peak(result: &SimulationResult) -> f64 {
        result
            .timeline
            .iter()
            .map(|s| s.bac_permille)
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_empty_sessions_is_no_result() {
        crate::logging::init_test();
        let result = simulate(&male_80(), &[], &SimulationConfig::default()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_single_moderate_session() {
        let result = run(&male_80(), &single(60.0, 2));
        let peak = peak(&result);

        assert!((0.6..=0.8).contains(&peak), "peak BAC {}", peak);
        assert!(result.last_sample().unwrap().bac_permille < 0.005);

        let peak_peth = result
            .timeline
            .iter()
            .map(|s| ng_per_ml_to_umol_per_l(s.biomarker_ng_per_ml))
            .fold(0.0, f64::max);
        assert!((0.029..=0.049).contains(&peak_peth), "peak PEth {}", peak_peth);

        // Below target from the start, so the run ends right at the 96 h minimum
        assert_eq!(result.timeline.len(), 96 * 12 + 1);
    }

    #[test]
    fn test_timeline_is_ordered_and_starts_at_first_session() {
        let next_day = evening() + Duration::days(1);
        let sessions = vec![
            DrinkingSession::new(next_day, next_day + Duration::hours(3), 50.0),
            DrinkingSession::new(evening(), evening() + Duration::hours(2), 40.0),
        ];
        let result = run(&male_80(), &sessions);

        assert_eq!(result.start_time, evening());
        assert_eq!(result.timeline[0].timestamp, evening());
        assert!(result
            .timeline
            .windows(2)
            .all(|w| w[1].timestamp - w[0].timestamp == Duration::minutes(5)));
    }

    #[test]
    fn test_compartments_never_negative() {
        let sessions = vec![
            DrinkingSession::new(evening(), evening() + Duration::minutes(20), 120.0),
            DrinkingSession::new(
                evening() + Duration::hours(1),
                evening() + Duration::hours(4),
                30.0,
            )
            .with_absorption_factor(0.4),
        ];
        let result = run(&SubjectParameters::new(Sex::Female, 50.0, 70), &sessions);

        for sample in &result.timeline {
            assert!(sample.stomach_grams >= 0.0);
            assert!(sample.blood_grams >= 0.0);
            assert!(sample.bac_permille >= 0.0);
            assert!(sample.biomarker_ng_per_ml >= 0.0);
        }
    }

    fn nested_sessions() -> Vec<DrinkingSession> {
        let six = Utc.with_ymd_and_hms(2024, 1, 1, 18, 0, 0).unwrap();
        vec![
            DrinkingSession::new(six, six + Duration::hours(5), 90.0),
            DrinkingSession::new(six + Duration::hours(1), six + Duration::hours(2), 60.0),
        ]
    }

    fn delivered(sessions: &[DrinkingSession]) -> Vec<f64> {
        let params = resolve_parameters(&male_80(), &SimulationConfig::default());
        let schedule = SessionSchedule::new(sessions);
        let start = schedule.first_start().unwrap();
        let end = schedule.last_end().unwrap();
        integrate(&schedule, &params, start, end).delivered_grams
    }

    #[test]
    fn test_overlapping_sessions_nested_dose_is_not_ingested() {
        let sessions = nested_sessions();
        let grams = delivered(&sessions);
        assert!((grams[0] - 90.0).abs() < 1e-9);
        assert_eq!(grams[1], 0.0);

        // The enclosed session leaves the timeline unchanged
        let with_inner = run(&male_80(), &sessions);
        let outer_only = run(&male_80(), &sessions[..1]);
        assert_eq!(peak(&with_inner), peak(&outer_only));
    }

    #[test]
    fn test_overlapping_sessions_partial_dose_after_earlier_end() {
        let sessions = vec![
            DrinkingSession::new(evening(), evening() + Duration::hours(2), 60.0),
            DrinkingSession::new(
                evening() + Duration::hours(1),
                evening() + Duration::hours(3),
                60.0,
            ),
        ];
        // Only the half after 22:00 is reached
        let grams = delivered(&sessions);
        assert!((grams[0] - 60.0).abs() < 1e-9);
        assert!((grams[1] - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_sequential_sessions_deliver_full_dose() {
        let sessions = vec![
            DrinkingSession::new(evening(), evening() + Duration::hours(1), 20.0),
            DrinkingSession::new(
                evening() + Duration::hours(1),
                evening() + Duration::minutes(73),
                15.0,
            ),
            DrinkingSession::new(
                evening() + Duration::hours(5),
                evening() + Duration::hours(6),
                25.0,
            ),
        ];
        let grams = delivered(&sessions);
        for (got, want) in grams.iter().zip([20.0, 15.0, 25.0]) {
            assert!((got - want).abs() < 1e-9, "{} vs {}", got, want);
        }
    }

    #[test]
    fn test_identical_inputs_identical_output() {
        let sessions = single(dose_grams(6), 3);
        let a = run(&male_80(), &sessions);
        let b = run(&male_80(), &sessions);
        assert_eq!(a, b);
    }

    #[test]
    fn test_monotonic_in_dose_weight_and_sex() {
        for weight in [60.0, 90.0] {
            for sex in [Sex::Male, Sex::Female] {
                let subject = SubjectParameters::new(sex, weight, 35);
                let peaks: Vec<f64> = [1, 6, 10]
                    .iter()
                    .map(|&n| peak(&run(&subject, &single(dose_grams(n), 1))))
                    .collect();
                assert!(peaks.windows(2).all(|w| w[1] >= w[0]), "{:?}", peaks);
            }
        }

        let peak_for = |sex, weight, doses| {
            peak(&run(
                &SubjectParameters::new(sex, weight, 35),
                &single(dose_grams(doses), 1),
            ))
        };
        for n in [1, 6, 10] {
            for sex in [Sex::Male, Sex::Female] {
                assert!(peak_for(sex, 90.0, n) <= peak_for(sex, 60.0, n));
            }
            for weight in [60.0, 90.0] {
                assert!(peak_for(Sex::Female, weight, n) >= peak_for(Sex::Male, weight, n));
            }
        }
    }

    #[test]
    fn test_post_peak_drop_bounded_by_elimination_rate() {
        let sessions = vec![DrinkingSession::new(
            evening(),
            evening() + Duration::minutes(30),
            dose_grams(6),
        )];
        let result = run(&male_80(), &sessions);
        let rate = result.parameters.elimination_permille_per_hour;

        let peak_idx = result
            .timeline
            .iter()
            .enumerate()
            .fold(0, |best, (i, s)| {
                if s.bac_permille > result.timeline[best].bac_permille {
                    i
                } else {
                    best
                }
            });

        // 12 steps of 5 minutes = 1 hour
        for i in peak_idx..result.timeline.len() - 12 {
            let drop = result.timeline[i].bac_permille - result.timeline[i + 12].bac_permille;
            assert!(drop >= -1e-12, "BAC rose after peak at step {}", i);
            assert!(drop <= rate + 1e-6, "drop {} exceeds rate {}", drop, rate);
        }
    }

    #[test]
    fn test_multi_day_drinking_extends_horizon() {
        let day1 = Utc.with_ymd_and_hms(2024, 1, 1, 18, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2024, 1, 2, 18, 0, 0).unwrap();
        let sessions = vec![
            DrinkingSession::new(day1, day1 + Duration::hours(5), 90.0),
            DrinkingSession::new(day2, day2 + Duration::hours(3), 60.0),
        ];
        let result = run(&SubjectParameters::new(Sex::Female, 65.0, 40), &sessions);

        let last = result.last_sample().unwrap();
        let span = last.timestamp - result.timeline[0].timestamp;
        assert!(span >= Duration::days(10), "span {:?}", span);
        assert!(ng_per_ml_to_umol_per_l(last.biomarker_ng_per_ml) <= 0.05);
    }

    #[test]
    fn test_safety_cap_bounds_runaway() {
        // Very slow decay keeps PEth above target for the whole cap
        let config = SimulationConfig {
            decay_half_life_days: 1000.0,
            step_minutes: 60,
            ..SimulationConfig::default()
        };
        let result = simulate(&male_80(), &single(100.0, 3), &config)
            .unwrap()
            .unwrap();
        let last = result.last_sample().unwrap();
        assert_eq!(last.timestamp - result.start_time, Duration::days(45));
    }

    #[test]
    fn test_invalid_session_fails_fast() {
        let sessions = vec![DrinkingSession::new(evening(), evening(), 10.0)];
        let result = simulate(&male_80(), &sessions, &SimulationConfig::default());
        assert!(matches!(result, Err(Error::InvalidSession(_))));
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let config = SimulationConfig {
            biomarker_formation_rate: -1.0,
            ..SimulationConfig::default()
        };
        let result = simulate(&male_80(), &single(10.0, 1), &config);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_parameters_carried_in_result() {
        let result = run(&male_80(), &single(30.0, 1));
        let expected = resolve_parameters(&male_80(), &SimulationConfig::default());
        assert_eq!(result.parameters, expected);
    }
}
