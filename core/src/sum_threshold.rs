//! Sum-threshold RFI flagging: the combinatorial detector.
//!
//! # Background
//!
//! Interference in radio-telescope data rarely looks like a single bad
//! sample.  Narrowband transmitters light up a channel for many time steps;
//! broadband bursts hit many channels at once.  Each affected sample may
//! sit only slightly above the noise, but their *average* along the
//! interferer does not.  The sum-threshold method therefore slides windows
//! of increasing length along both axes of the time–frequency array and
//! flags every window whose mean exceeds a length-dependent threshold.
//!
//! # Algorithm
//!
//! For each `(length, threshold)` entry of the [`ThresholdSchedule`]:
//!
//! 1. **Horizontal pass**: slide a window along every row.
//! 2. **Vertical pass**: slide a window along every column.
//!
//! A pass with `length == 1` is a plain per-sample test.  Longer passes
//! keep a running sum and count of unmasked samples, read the mask as it
//! stood when the pass began, and collect new flags in a pending mask that
//! replaces the live one only when every line is done.  Lines are
//! independent within a pass, so they are processed in parallel with
//! **rayon**.

use std::time::Instant;

use log::{debug, info, log_enabled, Level};
use ndarray::{s, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis, Zip};
use num_complex::Complex64;

use crate::detector::{run_schedule, Detector};
use crate::threshold::{ScheduleError, ThresholdSchedule};
use crate::types::{FlagReport, SumThresholdConfig};
use crate::window::RunningWindow;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors raised while building or running a [`SumThresholdDetector`].
#[derive(Debug, thiserror::Error)]
pub enum SumThresholdError {
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ScheduleError),

    #[error("mask shape {mask:?} does not match visibility shape {visibility:?}")]
    Shape {
        visibility: (usize, usize),
        mask: (usize, usize),
    },

    #[error("flat buffer of length {actual} cannot be reshaped to {rows}×{cols}")]
    FlatLength { rows: usize, cols: usize, actual: usize },

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("cannot build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

// ---------------------------------------------------------------------------
// Single-axis scan
// ---------------------------------------------------------------------------

/// Direction a window slides in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanAxis {
    /// Along each row, across columns.
    Horizontal,
    /// Along each column, across rows.
    Vertical,
}

impl ScanAxis {
    /// The array axis indexed by position within a line.
    fn lane_axis(self) -> Axis {
        match self {
            ScanAxis::Horizontal => Axis(1),
            ScanAxis::Vertical => Axis(0),
        }
    }
}

/// Apply one sum-threshold pass and return the updated mask.
///
/// `mask` is consumed: for `length > 1` it serves as the read-only snapshot
/// every line is scanned against, and the returned mask is the snapshot
/// plus every newly flagged window.  A `length` longer than the lines is a
/// no-op.
pub fn sum_threshold_axis(
    values: ArrayView2<'_, f64>,
    mut mask: Array2<bool>,
    length: usize,
    threshold: f64,
    axis: ScanAxis,
    parallel: bool,
) -> Array2<bool> {
    let lane_axis = axis.lane_axis();
    if length == 0 || length > values.len_of(lane_axis) {
        return mask;
    }

    if length == 1 {
        Zip::from(&mut mask).and(&values).for_each(|m, &v| {
            if !*m && v > threshold {
                *m = true;
            }
        });
        return mask;
    }

    let mut pending = mask.clone();
    let zip = Zip::from(pending.lanes_mut(lane_axis))
        .and(values.lanes(lane_axis))
        .and(mask.lanes(lane_axis));
    let scan = |out: ArrayViewMut1<'_, bool>, line: ArrayView1<'_, f64>, snapshot: ArrayView1<'_, bool>| {
        scan_line(line, snapshot, out, length, threshold)
    };
    if parallel {
        zip.par_for_each(scan);
    } else {
        zip.for_each(scan);
    }
    pending
}

/// Slide a `length`-sample window along one line, flagging every window
/// whose unmasked mean exceeds `threshold` into `pending`.
///
/// NaN and infinite samples are left out of the mean like masked ones; an
/// infinite sample is caught by the single-sample pass instead.
fn scan_line(
    values: ArrayView1<'_, f64>,
    snapshot: ArrayView1<'_, bool>,
    mut pending: ArrayViewMut1<'_, bool>,
    length: usize,
    threshold: f64,
) {
    let n = values.len();
    let mut window = RunningWindow::primed(values, snapshot, length);
    while window.right < n {
        window.push_right(values, snapshot);
        debug_assert_eq!(window.len(), length);
        if window.exceeds(threshold) {
            pending.slice_mut(s![window.left..window.right]).fill(true);
        }
        window.pop_left(values, snapshot);
    }
}

// ---------------------------------------------------------------------------
// SumThresholdDetector
// ---------------------------------------------------------------------------

/// Combinatorial sum-threshold flagger for a 2-D time–frequency array.
///
/// Construct it with the visibility amplitudes and an optional initial
/// mask, call [`execute`](Self::execute), then read the mask back with
/// [`mask`](Self::mask) or [`into_mask`](Self::into_mask).  Flags are only
/// ever added: a sample masked on entry stays masked.
#[derive(Debug)]
pub struct SumThresholdDetector {
    values: Array2<f64>,
    mask: Array2<bool>,
    schedule: ThresholdSchedule,
    min_connected: usize,
    parallel: bool,
    pool: Option<rayon::ThreadPool>,
}

impl SumThresholdDetector {
    /// Build a detector over `values` (shape `(height, width)`).
    ///
    /// The mask starts as a copy of `mask` or all-false.  Fails if the
    /// mask shape differs from the data or the schedule parameters are
    /// invalid.
    pub fn new(
        values: Array2<f64>,
        mask: Option<Array2<bool>>,
        config: &SumThresholdConfig,
    ) -> Result<Self, SumThresholdError> {
        let mask = match mask {
            Some(m) if m.dim() != values.dim() => {
                return Err(SumThresholdError::Shape {
                    visibility: values.dim(),
                    mask: m.dim(),
                })
            }
            Some(m) => m,
            None => Array2::from_elem(values.dim(), false),
        };

        let schedule = ThresholdSchedule::new(config.schedule())?;

        let pool = if config.parallel && config.n_workers > 0 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.n_workers)
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self {
            values,
            mask,
            schedule,
            min_connected: config.min_connected.max(1),
            parallel: config.parallel,
            pool,
        })
    }

    /// Build a detector from flat row-major buffers of shape
    /// `(n_rows, n_cols)`, as handed over by foreign callers.
    pub fn from_flat(
        data: Vec<f64>,
        n_rows: usize,
        n_cols: usize,
        mask: Option<Vec<bool>>,
        config: &SumThresholdConfig,
    ) -> Result<Self, SumThresholdError> {
        let reshape_err = |actual| SumThresholdError::FlatLength {
            rows: n_rows,
            cols: n_cols,
            actual,
        };
        let data_len = data.len();
        let values = Array2::from_shape_vec((n_rows, n_cols), data).map_err(|_| reshape_err(data_len))?;
        let mask = match mask {
            Some(m) => {
                let mask_len = m.len();
                Some(Array2::from_shape_vec((n_rows, n_cols), m).map_err(|_| reshape_err(mask_len))?)
            }
            None => None,
        };
        Self::new(values, mask, config)
    }

    /// Build a detector over the amplitudes `|V|` of complex visibilities.
    pub fn from_complex(
        vis: &Array2<Complex64>,
        mask: Option<Array2<bool>>,
        config: &SumThresholdConfig,
    ) -> Result<Self, SumThresholdError> {
        Self::new(vis.mapv(|v| v.norm()), mask, config)
    }

    /// Run every schedule entry with thresholds scaled by `sensitivity`.
    ///
    /// Fails up front if `sensitivity` is not positive.  When
    /// `min_connected > 1` the threshold passes still run (and their flags
    /// are kept) before [`SumThresholdError::UnsupportedFeature`] is
    /// returned.
    pub fn execute(&mut self, sensitivity: f64) -> Result<FlagReport, SumThresholdError> {
        self.run(sensitivity, 1.0)
    }

    /// Like [`execute`](Self::execute), with thresholds additionally
    /// multiplied by the noise scale estimated from the currently unmasked
    /// samples (see [`Distribution::estimate_scale`]).
    ///
    /// [`Distribution::estimate_scale`]: crate::threshold::Distribution::estimate_scale
    pub fn execute_scaled(&mut self, sensitivity: f64) -> Result<FlagReport, SumThresholdError> {
        let scale = self
            .schedule
            .config()
            .distribution
            .estimate_scale(self.values.view(), self.mask.view());
        self.run(sensitivity, scale)
    }

    fn run(&mut self, sensitivity: f64, noise_scale: f64) -> Result<FlagReport, SumThresholdError> {
        // Validate the caller's value before folding in the noise scale.
        self.schedule.scaled(sensitivity)?;
        let effective = sensitivity * noise_scale;
        if !effective.is_finite() {
            return Err(ScheduleError::ScaledSensitivity {
                sensitivity,
                noise_scale,
            }
            .into());
        }

        let start = Instant::now();
        let (height, width) = self.values.dim();
        let flagged_before = self.flagged_count();

        info!(
            "Starting sum-threshold flagging: {}×{} array, sensitivity={:.3}, noise_scale={:.4}, {} pre-flagged",
            height, width, sensitivity, noise_scale, flagged_before,
        );

        let schedule = self.schedule.clone();
        let passes = run_schedule(self, &schedule, effective)?;

        let report = FlagReport {
            n_samples: self.values.len(),
            flagged_before,
            flagged_after: self.flagged_count(),
            passes,
            noise_scale,
            processing_time_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Flagging complete in {} ms: {} newly flagged, {:.2}% of samples masked",
            report.processing_time_ms,
            report.newly_flagged(),
            100.0 * report.flagged_fraction(),
        );

        if self.min_connected > 1 {
            return Err(SumThresholdError::UnsupportedFeature(format!(
                "min_connected={} (connected-run filtering is not implemented)",
                self.min_connected
            )));
        }

        Ok(report)
    }

    /// One sum-threshold pass along `axis`, replacing the live mask.
    fn threshold_axis(&mut self, length: usize, threshold: f64, axis: ScanAxis) {
        let extent = self.values.len_of(axis.lane_axis());
        if length > extent {
            debug!(
                "Skipping {:?} pass: window length {} exceeds axis extent {}",
                axis, length, extent
            );
            return;
        }

        let before = log_enabled!(Level::Debug).then(|| self.flagged_count());
        let snapshot = std::mem::take(&mut self.mask);
        let values = self.values.view();
        let parallel = self.parallel;
        let scan = move || sum_threshold_axis(values, snapshot, length, threshold, axis, parallel);
        self.mask = match &self.pool {
            Some(pool) => pool.install(scan),
            None => scan(),
        };

        if let Some(before) = before {
            debug!(
                "{:?} pass: length={} threshold={:.4} newly_flagged={}",
                axis,
                length,
                threshold,
                self.flagged_count() - before,
            );
        }
    }

    pub fn flagged_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn mask(&self) -> ArrayView2<'_, bool> {
        self.mask.view()
    }

    pub fn into_mask(self) -> Array2<bool> {
        self.mask
    }

    pub fn schedule(&self) -> &ThresholdSchedule {
        &self.schedule
    }

    pub fn min_connected(&self) -> usize {
        self.min_connected
    }
}

impl Detector for SumThresholdDetector {
    fn apply_pass(&mut self, length: usize, threshold: f64) {
        self.threshold_axis(length, threshold, ScanAxis::Horizontal);
        self.threshold_axis(length, threshold, ScanAxis::Vertical);
    }
}
