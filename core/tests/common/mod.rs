#![allow(dead_code)]

pub mod synthetic;

use sumthreshold_core::{Distribution, SumThresholdConfig};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Gaussian schedule starting at `first_threshold`, windows up to `max_len`.
pub fn gaussian_config(first_threshold: f64, max_len: usize) -> SumThresholdConfig {
    SumThresholdConfig {
        first_threshold,
        distribution: Distribution::Gaussian,
        max_threshold_length: max_len,
        parallel: false,
        ..Default::default()
    }
}
