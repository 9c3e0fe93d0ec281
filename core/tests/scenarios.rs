mod common;

use common::{gaussian_config, init_logging};
use ndarray::{array, Array2};
use sumthreshold_core::{Detector, ScheduleError, SumThresholdConfig, SumThresholdDetector, SumThresholdError};

fn spike_row() -> Array2<f64> {
    array![[1.0, 1.0, 1.0, 1.0, 9.0, 1.0, 1.0, 1.0]]
}

#[test]
fn single_sample_schedule_flags_the_spike() {
    init_logging();
    let mut det = SumThresholdDetector::new(spike_row(), None, &gaussian_config(5.0, 1)).unwrap();
    let report = det.execute(1.0).unwrap();

    assert_eq!(det.mask(), array![[false, false, false, false, true, false, false, false]]);
    assert_eq!(report.passes, 1);
    assert_eq!(report.flagged_before, 0);
    assert_eq!(report.flagged_after, 1);
}

#[test]
fn two_sample_window_smears_flags_over_its_span() {
    init_logging();
    let mut det = SumThresholdDetector::new(spike_row(), None, &gaussian_config(5.0, 1)).unwrap();
    det.apply_pass(2, 3.0);

    // Windows (3,4) and (4,5) both average 5.0 > 3.
    assert_eq!(det.mask(), array![[false, false, false, true, true, true, false, false]]);
}

#[test]
fn pre_flagged_sample_stays_flagged_and_nothing_else_changes() {
    init_logging();
    let mut premask = Array2::from_elem((1, 8), false);
    premask[[0, 4]] = true;

    let mut det = SumThresholdDetector::new(spike_row(), Some(premask.clone()), &gaussian_config(5.0, 1)).unwrap();
    let report = det.execute(1.0).unwrap();

    assert_eq!(det.mask(), premask);
    assert_eq!(report.newly_flagged(), 0);
    assert_eq!(report.flagged_before, 1);
}

#[test]
fn unit_max_length_gives_single_entry_schedule() {
    let det = SumThresholdDetector::new(spike_row(), None, &gaussian_config(5.0, 1)).unwrap();
    let entries = det.schedule().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].length, 1);
    assert_eq!(entries[0].threshold, 5.0);
}

#[test]
fn min_connected_fails_after_all_passes_completed() {
    init_logging();
    let config = SumThresholdConfig {
        min_connected: 2,
        ..gaussian_config(5.0, 1)
    };
    let mut det = SumThresholdDetector::new(spike_row(), None, &config).unwrap();
    let err = det.execute(1.0).unwrap_err();

    assert!(matches!(err, SumThresholdError::UnsupportedFeature(_)), "{err}");
    // The threshold passes ran before the failure and their flags remain.
    assert!(det.mask()[[0, 4]]);
}

#[test]
fn non_positive_sensitivity_fails_before_touching_the_mask() {
    let mut det = SumThresholdDetector::new(spike_row(), None, &gaussian_config(5.0, 4)).unwrap();
    for sensitivity in [0.0, -1.0, f64::NAN] {
        let err = det.execute(sensitivity).unwrap_err();
        assert!(matches!(err, SumThresholdError::Configuration(_)), "{err}");
    }
    assert_eq!(det.flagged_count(), 0);
}

#[test]
fn invalid_schedule_parameters_fail_construction() {
    let config = SumThresholdConfig {
        exp_factor: 0.9,
        ..Default::default()
    };
    let err = SumThresholdDetector::new(spike_row(), None, &config).unwrap_err();
    assert!(matches!(err, SumThresholdError::Configuration(_)), "{err}");
}

#[test]
fn sensitivity_scales_every_threshold() {
    let mut det = SumThresholdDetector::new(spike_row(), None, &gaussian_config(5.0, 1)).unwrap();
    det.execute(2.0).unwrap();
    // 9 does not exceed 2 × 5.
    assert_eq!(det.flagged_count(), 0);

    det.execute(1.5).unwrap();
    assert_eq!(det.flagged_count(), 1);
}

#[test]
fn noise_scaled_run_uses_the_estimated_sigma() {
    init_logging();
    let vis = array![[-2.0, -1.0, 0.0, 1.0, 2.0, 8.0, -2.0, -1.0, 0.0, 1.0, 2.0]];

    let mut scaled = SumThresholdDetector::new(vis.clone(), None, &gaussian_config(6.0, 1)).unwrap();
    let report = scaled.execute_scaled(1.0).unwrap();
    approx::assert_abs_diff_eq!(report.noise_scale, 1.4826, epsilon = 1e-12);
    // 8 < 6 × 1.4826
    assert_eq!(report.flagged_after, 0);

    let mut plain = SumThresholdDetector::new(vis, None, &gaussian_config(6.0, 1)).unwrap();
    let report = plain.execute(1.0).unwrap();
    assert_eq!(report.noise_scale, 1.0);
    assert_eq!(report.flagged_after, 1);
    assert!(plain.mask()[[0, 5]]);
}

#[test]
fn overflowing_scaled_sensitivity_reports_the_callers_value() {
    let vis = array![[-2.0, -1.0, 0.0, 1.0, 2.0]];
    let mut det = SumThresholdDetector::new(vis, None, &gaussian_config(6.0, 4)).unwrap();
    let err = det.execute_scaled(1e308).unwrap_err();

    match err {
        SumThresholdError::Configuration(ScheduleError::ScaledSensitivity {
            sensitivity,
            noise_scale,
        }) => {
            assert_eq!(sensitivity, 1e308);
            approx::assert_abs_diff_eq!(noise_scale, 1.4826, epsilon = 1e-12);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(det.flagged_count(), 0);
}

#[test]
fn into_mask_hands_back_the_result() {
    let mut det = SumThresholdDetector::new(spike_row(), None, &gaussian_config(5.0, 1)).unwrap();
    det.execute(1.0).unwrap();
    let mask = det.into_mask();
    assert_eq!(mask.dim(), (1, 8));
    assert_eq!(mask.iter().filter(|&&m| m).count(), 1);
}
