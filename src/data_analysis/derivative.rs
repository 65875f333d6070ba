// src/data_analysis/derivative.rs

/// First difference `data[i+1] - data[i]`; one element shorter than the input.
/// Applied to timestamps it gives the spacing between logged samples.
pub fn first_difference(data: &[f64]) -> Vec<f64> {
    data.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Mean sampling rate (Hz) of a timestamp column in microseconds.
/// Returns `None` for fewer than two samples or a zero-length log.
pub fn mean_sample_rate_hz(timestamps_us: &[f64]) -> Option<f64> {
    if timestamps_us.len() < 2 {
        return None;
    }
    let span = timestamps_us[timestamps_us.len() - 1] - timestamps_us[0];
    if span <= 0.0 {
        return None;
    }
    let delta_t = span * 1e-6 / (timestamps_us.len() - 1) as f64;
    Some(1.0 / delta_t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_difference() {
        assert_eq!(first_difference(&[0.0, 4000.0, 9000.0]), vec![4000.0, 5000.0]);
        assert!(first_difference(&[1.0]).is_empty());
    }

    #[test]
    fn test_mean_sample_rate() {
        let t: Vec<f64> = (0..=250).map(|i| i as f64 * 4000.0).collect();
        let rate = mean_sample_rate_hz(&t).unwrap();
        assert!((rate - 250.0).abs() < 1e-6);
        assert_eq!(mean_sample_rate_hz(&[5.0]), None);
        assert_eq!(mean_sample_rate_hz(&[5.0, 5.0]), None);
    }
}
