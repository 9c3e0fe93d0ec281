//! Incremental running mean over a sliding window of one line.
//!
//! The window covers the half-open range `[left, right)` of a 1-D line.
//! Masked and non-finite samples are skipped: they add nothing to the sum
//! and are not counted.  Each slide step costs O(1), so a whole line is
//! scanned in O(n) regardless of the window length.
//!
//! The sum carries a Neumaier compensation term.  Without it, the rounding
//! error left behind by a huge sample outlives the sample itself and makes
//! later all-zero windows look positive.

use ndarray::ArrayView1;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct RunningWindow {
    sum: f64,
    compensation: f64,
    pub count: usize,
    pub left: usize,
    pub right: usize,
}

impl RunningWindow {
    /// Window over the first `length - 1` samples, ready for the first
    /// [`push_right`](Self::push_right) to complete it.
    pub fn primed(values: ArrayView1<'_, f64>, mask: ArrayView1<'_, bool>, length: usize) -> Self {
        let mut window = Self::default();
        for _ in 1..length {
            window.push_right(values, mask);
        }
        window
    }

    pub fn len(&self) -> usize {
        self.right - self.left
    }

    /// Whether the sample at `pos` takes part in the window statistics.
    fn contributes(values: ArrayView1<'_, f64>, mask: ArrayView1<'_, bool>, pos: usize) -> bool {
        !mask[pos] && values[pos].is_finite()
    }

    /// Neumaier step: add `x` and keep the low-order bits lost to rounding.
    fn accumulate(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.compensation += (self.sum - t) + x;
        } else {
            self.compensation += (x - t) + self.sum;
        }
        self.sum = t;
    }

    /// Extend the window by the sample at `right`.
    pub fn push_right(&mut self, values: ArrayView1<'_, f64>, mask: ArrayView1<'_, bool>) {
        if Self::contributes(values, mask, self.right) {
            self.accumulate(values[self.right]);
            self.count += 1;
        }
        self.right += 1;
    }

    /// Drop the sample at `left` from the window.
    pub fn pop_left(&mut self, values: ArrayView1<'_, f64>, mask: ArrayView1<'_, bool>) {
        if Self::contributes(values, mask, self.left) {
            self.accumulate(-values[self.left]);
            self.count -= 1;
            if self.count == 0 {
                self.sum = 0.0;
                self.compensation = 0.0;
            }
        }
        self.left += 1;
    }

    pub fn sum(&self) -> f64 {
        self.sum + self.compensation
    }

    /// Mean of the contributing samples, `None` if there are none.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum() / self.count as f64)
    }

    pub fn exceeds(&self, threshold: f64) -> bool {
        self.mean().is_some_and(|m| m > threshold)
    }
}
