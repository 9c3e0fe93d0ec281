//! Configuration and result types shared across the flagging pipeline.
//!
//! [`SumThresholdConfig`] carries every scalar knob of a detection run and
//! can be loaded from JSON; [`FlagReport`] summarises what a run did to the
//! mask.

use serde::{Deserialize, Serialize};

use crate::threshold::{Distribution, ScheduleConfig, ScheduleError};

// ---------------------------------------------------------------------------
// SumThresholdConfig
// ---------------------------------------------------------------------------

/// Parameters of a sum-threshold detection run.
///
/// The defaults are those commonly used for visibility amplitudes:
/// a 6σ single-sample threshold, growth factor 1.5, Rayleigh statistics
/// and windows of up to 1024 samples.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SumThresholdConfig {
    /// Single-sample threshold in units of the noise scale.
    pub first_threshold: f64,

    /// Growth rate (> 1) of the threshold reduction as windows lengthen.
    pub exp_factor: f64,

    /// Noise model used for the per-length threshold correction.
    pub distribution: Distribution,

    /// Longest window tested.  Lengths are powers of two up to this value.
    pub max_threshold_length: usize,

    /// Minimum run of contiguous flags to keep.  Values above 1 are not
    /// supported yet and make `execute` fail after the threshold passes.
    pub min_connected: usize,

    /// Number of rayon worker threads for line-parallel passes.  Set to 0
    /// to use the global rayon pool.
    pub n_workers: usize,

    /// Process rows/columns of a pass in parallel.
    pub parallel: bool,
}

impl Default for SumThresholdConfig {
    fn default() -> Self {
        Self {
            first_threshold: 6.0,
            exp_factor: 1.5,
            distribution: Distribution::Rayleigh,
            max_threshold_length: 1024,
            min_connected: 1,
            n_workers: 0,
            parallel: true,
        }
    }
}

impl SumThresholdConfig {
    /// Parse a (possibly partial) JSON document; missing fields keep their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self, ScheduleError> {
        serde_json::from_str(json).map_err(|e| ScheduleError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// The subset of parameters that determines the threshold schedule.
    pub fn schedule(&self) -> ScheduleConfig {
        ScheduleConfig {
            first_threshold: self.first_threshold,
            exp_factor: self.exp_factor,
            distribution: self.distribution,
            max_threshold_length: self.max_threshold_length,
        }
    }
}

// ---------------------------------------------------------------------------
// FlagReport
// ---------------------------------------------------------------------------

/// Summary of one `execute` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlagReport {
    /// Total number of samples in the array.
    pub n_samples: usize,

    /// Samples flagged before the run (pre-existing mask or earlier runs).
    pub flagged_before: usize,

    /// Samples flagged once the run finished.
    pub flagged_after: usize,

    /// Number of schedule entries applied.
    pub passes: usize,

    /// Noise scale the sensitivity was multiplied by (1.0 for plain runs).
    pub noise_scale: f64,

    /// Wall-clock time spent in the threshold passes, in milliseconds.
    pub processing_time_ms: u64,
}

impl FlagReport {
    pub fn newly_flagged(&self) -> usize {
        self.flagged_after - self.flagged_before
    }

    /// Fraction of all samples flagged after the run, 0.0 for an empty array.
    pub fn flagged_fraction(&self) -> f64 {
        if self.n_samples == 0 {
            0.0
        } else {
            self.flagged_after as f64 / self.n_samples as f64
        }
    }

    /// Serialise the report to a JSON string for interoperability.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
