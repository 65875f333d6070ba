// src/data_analysis/resample.rs

use crate::error::{PlotError, Result};

/// Resamples `data(time)` at every timestamp of `desired_time` by linear
/// interpolation. Outside the source range the first or last segment is
/// extended linearly, so no target timestamp is ever rejected.
///
/// `time` must be monotonic non-decreasing. With a single source sample the
/// value is held constant.
pub fn resample(time: &[f64], data: &[f64], desired_time: &[f64]) -> Result<Vec<f64>> {
    if time.len() != data.len() {
        return Err(PlotError::LengthMismatch(time.len(), data.len()));
    }
    if time.is_empty() {
        return Err(PlotError::EmptySeries("resample source".into()));
    }
    if time.len() == 1 {
        return Ok(vec![data[0]; desired_time.len()]);
    }

    let n = time.len();
    let mut output = Vec::with_capacity(desired_time.len());
    for &t in desired_time {
        // Index of the segment [i, i+1] used for t; clamped so that values
        // outside the range extrapolate along the boundary segments.
        let upper = time.partition_point(|&x| x <= t);
        let i = upper.saturating_sub(1).min(n - 2);
        output.push(interpolate_segment(time, data, i, t));
    }
    Ok(output)
}

fn interpolate_segment(time: &[f64], data: &[f64], i: usize, t: f64) -> f64 {
    let (t0, t1) = (time[i], time[i + 1]);
    let (v0, v1) = (data[i], data[i + 1]);
    let dt = t1 - t0;
    if dt.abs() < f64::EPSILON {
        // Duplicate timestamp: the later sample wins
        return v1;
    }
    v0 + (v1 - v0) * (t - t0) / dt
}
