//! Threshold schedules for combinatorial RFI detection.
//!
//! A combinatorial flagger does not test a single threshold.  It tests a
//! whole ladder of them: short windows must clear a strict, high bar while
//! long windows are compared against a progressively lower one.  Averaging
//! many samples suppresses the noise, so a weak but wide interferer that
//! hides below the single-sample threshold still stands out once enough
//! channels or time steps are summed together.
//!
//! # Threshold law
//!
//! Window lengths double from 1 up to `max_threshold_length`.  For each
//! length `L` the threshold is
//!
//! ```text
//! T(L) = T0 · R^(−log2 L) · c(L)
//! ```
//!
//! where `T0` is the single-sample threshold (in units of the noise scale),
//! `R > 1` is the growth factor and `c(L)` is a distribution-dependent
//! correction (see [`Distribution::correction`]).  Every factor is
//! non-increasing in `L`, so the schedule is too.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Invalid detection configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    #[error("exp_factor must be greater than 1 (got {0})")]
    ExpFactor(f64),

    #[error("first_threshold must be positive (got {0})")]
    FirstThreshold(f64),

    #[error("max_threshold_length must be at least 1 (got {0})")]
    MaxThresholdLength(usize),

    #[error("unknown noise distribution '{0}' (expected Gaussian or Rayleigh)")]
    UnknownDistribution(String),

    #[error("sensitivity must be positive and finite (got {0})")]
    Sensitivity(f64),

    #[error("sensitivity {sensitivity} times noise scale {noise_scale} is not finite")]
    ScaledSensitivity { sensitivity: f64, noise_scale: f64 },

    #[error("cannot parse configuration: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

/// `(4 − π) / π`: variance over squared mean of a Rayleigh variate.
const RAYLEIGH_CV2: f64 = (4.0 - PI) / PI;

/// σ ≈ 1.4826 × MAD for Gaussian noise.
const MAD_TO_SIGMA: f64 = 1.4826;

/// Statistical model of the noise the thresholds are expressed against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Distribution {
    /// Real-valued Gaussian noise (e.g. one quadrature of a visibility).
    Gaussian,
    /// Amplitude of complex Gaussian noise, i.e. `|V|` of a visibility.
    Rayleigh,
}

impl Distribution {
    /// Correction factor applied to the threshold of a window of `length`
    /// samples.
    ///
    /// Gaussian means stay Gaussian under averaging, so no correction is
    /// needed.  The mean of `L` Rayleigh samples converges towards the
    /// Rayleigh mean; its relative second moment is `1 + ρ/L`, and the
    /// correction normalises that against the single-sample value.
    ///
    /// `c(1) == 1` for every distribution and `c` never increases with `L`.
    pub fn correction(self, length: usize) -> f64 {
        match self {
            Distribution::Gaussian => 1.0,
            Distribution::Rayleigh => {
                let l = length.max(1) as f64;
                ((1.0 + RAYLEIGH_CV2 / l) / (1.0 + RAYLEIGH_CV2)).sqrt()
            }
        }
    }

    /// Estimate the characteristic noise scale from the unmasked samples.
    ///
    /// * Gaussian: `1.4826 × MAD`, robust against the outliers being hunted.
    /// * Rayleigh: maximum-likelihood σ, `sqrt(Σx² / 2n)`.
    ///
    /// Returns 1.0 when there is nothing to estimate from or the estimate
    /// collapses to zero, so the caller can always multiply by it.
    pub fn estimate_scale(self, values: ArrayView2<'_, f64>, mask: ArrayView2<'_, bool>) -> f64 {
        let mut unmasked: Vec<f64> = values
            .iter()
            .zip(mask.iter())
            .filter(|&(v, m)| !*m && v.is_finite())
            .map(|(&v, _)| v)
            .collect();

        if unmasked.is_empty() {
            return 1.0;
        }

        let scale = match self {
            Distribution::Gaussian => {
                let median = median_in_place(&mut unmasked);
                let mut abs_devs: Vec<f64> = unmasked.iter().map(|&v| (v - median).abs()).collect();
                MAD_TO_SIGMA * median_in_place(&mut abs_devs)
            }
            Distribution::Rayleigh => {
                let sum_sq: f64 = unmasked.iter().map(|v| v * v).sum();
                (sum_sq / (2.0 * unmasked.len() as f64)).sqrt()
            }
        };

        if scale < f64::EPSILON {
            1.0
        } else {
            scale
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Distribution::Gaussian => "Gaussian",
            Distribution::Rayleigh => "Rayleigh",
        }
    }
}

/// Upper median of a non-empty slice (reorders the slice).
fn median_in_place(values: &mut [f64]) -> f64 {
    let mid = values.len() / 2;
    let (_, median, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    *median
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Distribution {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gaussian" => Ok(Distribution::Gaussian),
            "rayleigh" => Ok(Distribution::Rayleigh),
            _ => Err(ScheduleError::UnknownDistribution(s.to_string())),
        }
    }
}

impl TryFrom<String> for Distribution {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Distribution> for String {
    fn from(d: Distribution) -> Self {
        d.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Parameters that fully determine a [`ThresholdSchedule`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduleConfig {
    /// Threshold for a single sample, in units of the noise scale.
    pub first_threshold: f64,
    /// Growth rate of the per-length threshold reduction; must exceed 1.
    pub exp_factor: f64,
    pub distribution: Distribution,
    /// Longest window tested.
    pub max_threshold_length: usize,
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        // is_finite() also rejects NaN.
        if !self.exp_factor.is_finite() || self.exp_factor <= 1.0 {
            return Err(ScheduleError::ExpFactor(self.exp_factor));
        }
        if !self.first_threshold.is_finite() || self.first_threshold <= 0.0 {
            return Err(ScheduleError::FirstThreshold(self.first_threshold));
        }
        if self.max_threshold_length < 1 {
            return Err(ScheduleError::MaxThresholdLength(self.max_threshold_length));
        }
        Ok(())
    }
}

/// One rung of the schedule.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub length: usize,
    pub threshold: f64,
}

/// Ordered `(length, threshold)` pairs driving a multi-scale scan.
///
/// Lengths are strictly increasing powers of two starting at 1, thresholds
/// are strictly positive and non-increasing.  The schedule is a pure
/// function of its [`ScheduleConfig`] and never changes after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdSchedule {
    config: ScheduleConfig,
    entries: Vec<ScheduleEntry>,
}

impl ThresholdSchedule {
    pub fn new(config: ScheduleConfig) -> Result<Self, ScheduleError> {
        config.validate()?;

        let mut entries = Vec::new();
        let mut length = 1usize;
        while length <= config.max_threshold_length {
            entries.push(ScheduleEntry {
                length,
                threshold: Self::threshold_for(&config, length),
            });
            length = match length.checked_mul(2) {
                Some(next) => next,
                None => break,
            };
        }

        Ok(Self { config, entries })
    }

    fn threshold_for(config: &ScheduleConfig, length: usize) -> f64 {
        let octaves = (length as f64).log2();
        config.first_threshold * config.exp_factor.powf(-octaves) * config.distribution.correction(length)
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed schedule; the L=1 rung is mandatory.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with every threshold multiplied by `sensitivity`.
    pub fn scaled(&self, sensitivity: f64) -> Result<Vec<ScheduleEntry>, ScheduleError> {
        if !sensitivity.is_finite() || sensitivity <= 0.0 {
            return Err(ScheduleError::Sensitivity(sensitivity));
        }
        Ok(self
            .entries
            .iter()
            .map(|e| ScheduleEntry {
                length: e.length,
                threshold: sensitivity * e.threshold,
            })
            .collect())
    }
}
