//! Pluggable detection passes driven by a [`ThresholdSchedule`].
//!
//! The schedule knows *which* `(length, threshold)` pairs to test; a
//! [`Detector`] knows *how* to test one of them against its data.  Keeping
//! the two apart lets any multi-scale algorithm reuse the same schedule
//! generation and sensitivity handling.

use log::debug;

use crate::threshold::{ScheduleError, ThresholdSchedule};

/// One detection algorithm operating at a single scale.
pub trait Detector {
    /// Flag everything this algorithm considers RFI at window `length`,
    /// given the already sensitivity-scaled `threshold`.
    fn apply_pass(&mut self, length: usize, threshold: f64);
}

/// Run every schedule entry, in order, through `detector`.
///
/// Thresholds are multiplied by `sensitivity` first.  An invalid
/// sensitivity fails before any pass runs.  Returns the number of passes
/// applied.
pub fn run_schedule<D: Detector + ?Sized>(
    detector: &mut D,
    schedule: &ThresholdSchedule,
    sensitivity: f64,
) -> Result<usize, ScheduleError> {
    let entries = schedule.scaled(sensitivity)?;
    for entry in &entries {
        debug!("schedule pass: length={} threshold={:.4}", entry.length, entry.threshold);
        detector.apply_pass(entry.length, entry.threshold);
    }
    Ok(entries.len())
}
