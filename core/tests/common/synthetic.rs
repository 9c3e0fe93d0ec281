use ndarray::{s, Array2};

/// Deterministic pseudo-noise in `[-amplitude, amplitude)` (64-bit LCG).
pub fn lcg_noise(height: usize, width: usize, amplitude: f64, seed: u64) -> Array2<f64> {
    let mut state = seed;
    Array2::from_shape_simple_fn((height, width), || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
        amplitude * (2.0 * unit - 1.0)
    })
}

/// Zero background with one narrowband channel (a column) and one
/// broadband burst (a row) of weak interference.
pub fn rfi_scene(height: usize, width: usize, channel: usize, burst_row: usize) -> Array2<f64> {
    let mut vis = Array2::zeros((height, width));
    vis.slice_mut(s![.., channel]).fill(3.0);
    vis.slice_mut(s![burst_row, ..]).fill(2.0);
    vis
}

/// Brute-force reference for one sum-threshold pass: every full window is
/// summed from scratch against the unchanged input mask.  Non-finite
/// samples are left out of window means.
pub fn naive_pass(
    values: &Array2<f64>,
    mask: &Array2<bool>,
    length: usize,
    threshold: f64,
    horizontal: bool,
) -> Array2<bool> {
    let mut out = mask.clone();
    let (height, width) = values.dim();
    let (lines, extent) = if horizontal { (height, width) } else { (width, height) };
    if length == 0 || length > extent {
        return out;
    }
    let at = |line: usize, pos: usize| if horizontal { [line, pos] } else { [pos, line] };

    for line in 0..lines {
        for start in 0..=(extent - length) {
            let (mut sum, mut count) = (0.0, 0usize);
            for pos in start..start + length {
                if !mask[at(line, pos)] && values[at(line, pos)].is_finite() {
                    sum += values[at(line, pos)];
                    count += 1;
                }
            }
            if length == 1 {
                if !mask[at(line, start)] && values[at(line, start)] > threshold {
                    out[at(line, start)] = true;
                }
            } else if count > 0 && sum / count as f64 > threshold {
                for pos in start..start + length {
                    out[at(line, pos)] = true;
                }
            }
        }
    }
    out
}
