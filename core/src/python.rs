//! Python bindings, compiled with the `python` feature.

use pyo3::exceptions::{PyNotImplementedError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::sum_threshold::{SumThresholdDetector, SumThresholdError};
use crate::threshold::Distribution;
use crate::types::SumThresholdConfig;

fn to_py_err(e: SumThresholdError) -> PyErr {
    match e {
        SumThresholdError::Configuration(_)
        | SumThresholdError::Shape { .. }
        | SumThresholdError::FlatLength { .. } => {
            PyValueError::new_err(e.to_string())
        }
        SumThresholdError::UnsupportedFeature(_) => PyNotImplementedError::new_err(e.to_string()),
        SumThresholdError::ThreadPool(_) => PyRuntimeError::new_err(e.to_string()),
    }
}

/// Sum-threshold flagger over a flattened (row-major) `(n_rows, n_cols)`
/// array of amplitudes.
#[pyclass(name = "SumThreshold")]
pub struct PySumThreshold {
    inner: SumThresholdDetector,
}

#[pymethods]
impl PySumThreshold {
    #[new]
    #[pyo3(signature = (
        data,
        n_rows,
        n_cols,
        mask=None,
        first_threshold=6.0,
        exp_factor=1.5,
        distribution="Rayleigh",
        max_threshold_length=1024,
        min_connected=1,
        n_workers=0,
        parallel=true
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        data: Vec<f64>,
        n_rows: usize,
        n_cols: usize,
        mask: Option<Vec<bool>>,
        first_threshold: f64,
        exp_factor: f64,
        distribution: &str,
        max_threshold_length: usize,
        min_connected: usize,
        n_workers: usize,
        parallel: bool,
    ) -> PyResult<Self> {
        let distribution = distribution
            .parse::<Distribution>()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;

        let config = SumThresholdConfig {
            first_threshold,
            exp_factor,
            distribution,
            max_threshold_length,
            min_connected,
            n_workers,
            parallel,
        };
        let inner = SumThresholdDetector::from_flat(data, n_rows, n_cols, mask, &config).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Run the detector and return the run report as JSON.
    #[pyo3(signature = (sensitivity=1.0))]
    fn execute(&mut self, py: Python<'_>, sensitivity: f64) -> PyResult<String> {
        let report = py
            .allow_threads(|| self.inner.execute(sensitivity))
            .map_err(to_py_err)?;
        report
            .to_json()
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Run the detector with thresholds also scaled by the noise scale
    /// estimated from the unmasked samples; returns the report as JSON.
    #[pyo3(signature = (sensitivity=1.0))]
    fn execute_scaled(&mut self, py: Python<'_>, sensitivity: f64) -> PyResult<String> {
        let report = py
            .allow_threads(|| self.inner.execute_scaled(sensitivity))
            .map_err(to_py_err)?;
        report
            .to_json()
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// The current mask, flattened row-major.
    fn mask(&self) -> Vec<bool> {
        self.inner.mask().iter().copied().collect()
    }

    fn flagged_count(&self) -> usize {
        self.inner.flagged_count()
    }

    fn __repr__(&self) -> String {
        let (h, w) = self.inner.values().dim();
        format!(
            "SumThreshold(shape=({}, {}), entries={}, flagged={})",
            h,
            w,
            self.inner.schedule().len(),
            self.inner.flagged_count()
        )
    }
}

#[pymodule]
fn sumthreshold_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySumThreshold>()?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add("__doc__", "Sum-threshold RFI flagging core.")?;
    Ok(())
}
