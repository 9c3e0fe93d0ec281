//! # sumthreshold-core
//!
//! Radio-frequency-interference (RFI) flagging for radio-telescope
//! time–frequency data, with optional Python bindings via
//! [PyO3](https://pyo3.rs).
//!
//! ## Overview
//!
//! Given a 2-D array of visibility amplitudes and an optional initial mask,
//! the crate produces a boolean mask marking samples corrupted by RFI.  The
//! mask is grown by the combinatorial sum-threshold method: windows of
//! doubling length slide along both axes and every window whose mean
//! clears a length-dependent threshold is flagged.
//!
//! | Module            | Purpose                                                   |
//! |-------------------|-----------------------------------------------------------|
//! | [`threshold`]     | Noise models and the `(length, threshold)` schedule       |
//! | [`detector`]      | The `Detector` trait and the schedule driver              |
//! | [`sum_threshold`] | Sliding-window sum-threshold detector                     |
//! | [`types`]         | Run configuration and run report                          |
//!
//! ## Rust usage
//!
//! ```
//! use ndarray::array;
//! use sumthreshold_core::{SumThresholdConfig, SumThresholdDetector};
//!
//! let vis = array![[1.0, 1.0, 1.0, 1.0, 9.0, 1.0, 1.0, 1.0]];
//! let config = SumThresholdConfig {
//!     first_threshold: 5.0,
//!     max_threshold_length: 1,
//!     ..Default::default()
//! };
//! let mut detector = SumThresholdDetector::new(vis, None, &config)?;
//! let report = detector.execute(1.0)?;
//! assert_eq!(report.flagged_after, 1);
//! assert!(detector.mask()[[0, 4]]);
//! # Ok::<(), sumthreshold_core::SumThresholdError>(())
//! ```

pub mod detector;
pub mod sum_threshold;
pub mod threshold;
pub mod types;
mod window;

#[cfg(feature = "python")]
mod python;

// Re-export the most commonly used items at crate root for convenience.
pub use detector::{run_schedule, Detector};
pub use sum_threshold::{sum_threshold_axis, ScanAxis, SumThresholdDetector, SumThresholdError};
pub use threshold::{Distribution, ScheduleConfig, ScheduleEntry, ScheduleError, ThresholdSchedule};
pub use types::{FlagReport, SumThresholdConfig};
