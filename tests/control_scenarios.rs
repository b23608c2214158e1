//! Worked examples and invariants of the control core, through the public API.

mod common;

use bas_ctl::control::{Direction, RequestAggregator, ResponsePolicy, TrimResponseController};
use bas_ctl::error::ControlError;
use bas_ctl::optimal_start::{
    HistoricalSample, ModelForm, OptimalStartEstimator, ParameterEstimator, ParameterState,
    SmoothingPolicy, StartConditions, StartWindow,
};
use proptest::prelude::*;

#[test]
fn aggregator_ignores_rogue_dampers() {
    let agg = RequestAggregator::new(2, 0.85).unwrap();
    let summary = agg.aggregate(&[0.9, 0.88, 0.86, 0.5, 0.4]).unwrap();
    assert_eq!(summary.ignored, vec![0.9, 0.88]);
    assert_eq!(summary.evaluated, vec![0.86, 0.5, 0.4]);
    assert_eq!(summary.request_count, 1);
}

#[test]
fn trim_at_floor_stays_at_floor() {
    let mut c = common::pressure_controller(0.5);
    let adj = c.tick(0);
    assert_eq!(adj.new_value, 0.5);
    assert_eq!(adj.direction, Direction::Decreased);
}

#[test]
fn request_storm_is_limited_by_max_step() {
    let mut c = common::pressure_controller(0.5);
    let adj = c.tick(3);
    assert!((adj.raw_adjustment - 0.18).abs() < 1e-12);
    assert!((adj.adjustment - 0.15).abs() < 1e-12);
    assert!((adj.new_value - 0.65).abs() < 1e-12);
    assert_eq!(adj.direction, Direction::Increased);
}

#[test]
fn single_sample_coefficients() {
    let mut est = ParameterEstimator::new(
        70.0,
        SmoothingPolicy::BatchWeighted {
            smoothing: Some(1.0),
        },
        ModelForm::Literal,
        ParameterState::default(),
    )
    .unwrap();
    let report = est.update(&[common::cold_morning()]);
    assert!((report.state.alpha_a - 120.0 / 22.0).abs() < 1e-9);
    assert!((report.state.alpha_b - 120.0 / (22.0 * 58.0)).abs() < 1e-9);
    assert!((report.state.alpha_b - 0.0940).abs() < 1e-4);
}

#[test]
fn reduced_form_lead_time() {
    let est = OptimalStartEstimator::new(StartWindow::default(), ModelForm::Reduced);
    let lead = est
        .estimate(
            &StartConditions {
                zone_temp: 48.0,
                outdoor_temp: 12.0,
                occupied_setpoint: 70.0,
            },
            &ParameterState {
                alpha_a: 5.0,
                alpha_b: 0.3,
                alpha_d: 0.0,
            },
        )
        .unwrap();
    assert!((lead.minutes - 132.0).abs() < 1e-9);
}

#[test]
fn estimator_and_model_are_inverse_for_one_sample() {
    // Fitting a single morning exactly then predicting that morning returns its outcome.
    for form in [ModelForm::Literal, ModelForm::Reduced] {
        let mut est = ParameterEstimator::new(
            70.0,
            SmoothingPolicy::BatchWeighted {
                smoothing: Some(1.0),
            },
            form,
            ParameterState::default(),
        )
        .unwrap();
        let state = est.update(&[common::cold_morning()]).state;
        let lead = OptimalStartEstimator::new(StartWindow::default(), form)
            .estimate(
                &StartConditions {
                    zone_temp: 48.0,
                    outdoor_temp: 12.0,
                    occupied_setpoint: 70.0,
                },
                &state,
            )
            .unwrap();
        assert!((lead.minutes - 120.0).abs() < 1e-6, "{form:?}");
    }
}

#[test]
fn degenerate_history_is_skipped_and_counted() {
    let mut est = ParameterEstimator::new(
        70.0,
        SmoothingPolicy::default(),
        ModelForm::Literal,
        ParameterState::default(),
    )
    .unwrap();
    let report = est.update(&[
        HistoricalSample::new(70.0, 12.0, 90.0),
        common::cold_morning(),
        HistoricalSample::new(50.0, 70.0, 90.0),
    ]);
    assert_eq!(report.accepted, 1);
    assert_eq!(report.skipped_count(), 2);
    assert!(report.state.is_finite());
    assert!(matches!(
        report.skipped[1],
        ControlError::DegenerateModelInput { index: 2, .. }
    ));
}

#[test]
fn invalid_configuration_fails_at_construction() {
    let mut bad = common::pressure_state(1.0);
    bad.min = 2.0;
    assert!(matches!(
        TrimResponseController::new(bad, ResponsePolicy::Proportional),
        Err(ControlError::Configuration { .. })
    ));
    let mut bad = common::pressure_state(1.0);
    bad.max_step = -0.1;
    assert!(TrimResponseController::new(bad, ResponsePolicy::Fixed).is_err());
}

proptest! {
    #[test]
    fn prop_ignored_count_is_min_of_i_and_len(
        samples in prop::collection::vec(0.0f64..1.0, 0..50),
        ignore in 0usize..60,
    ) {
        let agg = RequestAggregator::new(ignore, 0.85).unwrap();
        let s = agg.aggregate(&samples).unwrap();
        let k = ignore.min(samples.len());
        prop_assert_eq!(s.ignored.len(), k);
        prop_assert_eq!(s.evaluated.len(), samples.len() - k);
    }

    #[test]
    fn prop_ticks_stay_bounded(
        counts in prop::collection::vec(0usize..10_000, 1..100),
        fixed in any::<bool>(),
    ) {
        let policy = if fixed { ResponsePolicy::Fixed } else { ResponsePolicy::Proportional };
        let mut c = TrimResponseController::new(common::sat_state(60.0), policy).unwrap();
        for n in counts {
            let adj = c.tick(n);
            prop_assert!((55.0..=65.0).contains(&adj.new_value));
            prop_assert!((adj.new_value - adj.previous_value).abs() <= 1.0 + 1e-12);
        }
    }

    #[test]
    fn prop_sustained_trim_approaches_floor(start in 0.5f64..=1.5, ticks in 1usize..200) {
        let mut c = common::pressure_controller(start);
        let mut last = start;
        for _ in 0..ticks {
            let adj = c.tick(0);
            prop_assert!(adj.new_value <= last);
            prop_assert!(adj.new_value >= 0.5);
            last = adj.new_value;
        }
    }
}
