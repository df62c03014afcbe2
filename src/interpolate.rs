//! Interpolation over tabulated (energy, value) samples.
//!
//! Photon cross sections span several decades in both axes, so the canonical
//! scale for table lookups is log-log with linear interpolation between
//! nodes. Out-of-range queries clamp to the boundary values; callers that
//! need fail-fast behavior go through [`check_in_range`] before
//! interpolating.

use crate::error::{Result, TransportError};

/// Largest index `i` with `x[i] <= x_new`, assuming `x` sorted ascending and
/// `x_new` within `(x[0], x[last])`.
fn interval_index(x: &[f64], x_new: f64) -> usize {
    let mut low = 0usize;
    let mut high = x.len() - 1;
    while high - low > 1 {
        let mid = (low + high) >> 1;
        if x[mid] <= x_new {
            low = mid;
        } else {
            high = mid;
        }
    }
    low
}

/// Linear interpolation on a linear scale, clamped at the grid endpoints.
pub fn interpolate_linear(x: &[f64], y: &[f64], x_new: f64) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    if x.len() == 1 || x_new <= x[0] {
        return y[0];
    }
    if x_new >= x[x.len() - 1] {
        return y[y.len() - 1];
    }

    let idx = interval_index(x, x_new);
    let (x1, x2) = (x[idx], x[idx + 1]);
    let (y1, y2) = (y[idx], y[idx + 1]);
    y1 + (x_new - x1) * (y2 - y1) / (x2 - x1)
}

/// Log-log linear interpolation, clamped at the grid endpoints.
///
/// Intervals touching a zero or negative y-value fall back to linear so a
/// tabulated zero stays zero instead of producing `-inf` in log space.
pub fn interpolate_log_log(x: &[f64], y: &[f64], x_new: f64) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    if x.len() == 1 || x_new <= x[0] {
        return y[0];
    }
    if x_new >= x[x.len() - 1] {
        return y[y.len() - 1];
    }

    let idx = interval_index(x, x_new);
    let (x1, x2) = (x[idx], x[idx + 1]);
    let (y1, y2) = (y[idx], y[idx + 1]);
    if x_new == x1 {
        return y1;
    }
    if y1 <= 0.0 || y2 <= 0.0 {
        return y1 + (x_new - x1) * (y2 - y1) / (x2 - x1);
    }
    let log_y = y1.ln() + (x_new.ln() - x1.ln()) * (y2.ln() - y1.ln()) / (x2.ln() - x1.ln());
    log_y.exp()
}

/// Bounds check used by the strict range policy.
pub fn check_in_range(x: &[f64], x_new: f64) -> Result<()> {
    let (min, max) = (x[0], x[x.len() - 1]);
    if x_new < min || x_new > max {
        return Err(TransportError::EnergyOutOfRange {
            energy: x_new,
            min,
            max,
        });
    }
    Ok(())
}

/// Applies a scalar operation element-wise over a slice, returning a
/// same-length vector. The single adapter behind every array-form
/// convenience entry point; it never alters the scalar semantics.
pub fn map_scalar<F>(inputs: &[f64], op: F) -> Vec<f64>
where
    F: Fn(f64) -> f64,
{
    inputs.iter().map(|&x| op(x)).collect()
}

/// Merges several ascending grids into one sorted, deduplicated grid.
pub fn merge_grids(grids: &[&[f64]]) -> Vec<f64> {
    let mut merged: Vec<f64> = grids.iter().flat_map(|g| g.iter().copied()).collect();
    merged.sort_by(f64::total_cmp);
    merged.dedup();
    merged
}
