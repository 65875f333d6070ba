// src/data_analysis/spectral_analysis.rs

use ndarray::Array1;

use crate::data_analysis::{calc_step_response, fft_utils};
use crate::error::{PlotError, Result};

/// Short-time power spectral density. `psd[t][f]` is the one-sided density
/// of segment `t` at frequency bin `f`.
#[derive(Debug, Clone, Default)]
pub struct Spectrogram {
    /// Segment centres in seconds from the first sample
    pub times_s: Vec<f64>,
    pub frequencies_hz: Vec<f64>,
    pub psd: Vec<Vec<f64>>,
}

impl Spectrogram {
    /// Adds another spectrogram of the same shape bin by bin.
    pub fn accumulate(&mut self, other: &Spectrogram) -> Result<()> {
        if self.psd.is_empty() {
            *self = other.clone();
            return Ok(());
        }
        if self.psd.len() != other.psd.len() {
            return Err(PlotError::LengthMismatch(self.psd.len(), other.psd.len()));
        }
        for (row, other_row) in self.psd.iter_mut().zip(other.psd.iter()) {
            for (v, o) in row.iter_mut().zip(other_row.iter()) {
                *v += o;
            }
        }
        Ok(())
    }

    /// Averages neighbouring time columns so that at most `max_bins` remain.
    pub fn reduce_time_bins(&self, max_bins: usize) -> Spectrogram {
        let n = self.psd.len();
        if max_bins == 0 || n <= max_bins {
            return self.clone();
        }
        let group = (n + max_bins - 1) / max_bins;
        let mut reduced = Spectrogram {
            frequencies_hz: self.frequencies_hz.clone(),
            ..Default::default()
        };
        for (chunk_t, chunk_psd) in self.times_s.chunks(group).zip(self.psd.chunks(group)) {
            let count = chunk_t.len() as f64;
            reduced.times_s.push(chunk_t.iter().sum::<f64>() / count);
            let mut avg = vec![0.0; self.frequencies_hz.len()];
            for row in chunk_psd {
                for (a, v) in avg.iter_mut().zip(row.iter()) {
                    *a += v / count;
                }
            }
            reduced.psd.push(avg);
        }
        reduced
    }
}

/// Generates a Hann window of specified length
fn hanning_window(length: usize) -> Array1<f32> {
    calc_step_response::tukeywin(length, 1.0)
}

/// Converts a power density to decibels, floored at `min_db`.
pub fn to_power_db(power: f64, min_db: f64) -> f64 {
    if power > 0.0 {
        (10.0 * power.log10()).max(min_db)
    } else {
        min_db
    }
}

/// Hann-windowed short-time Fourier transform with density scaling.
///
/// Each segment has its mean removed before windowing. NaN samples count as
/// zero.
pub fn spectrogram(signal: &[f64], sample_rate: f64, segment_length: usize, overlap: usize) -> Result<Spectrogram> {
    if signal.is_empty() {
        return Err(PlotError::EmptySeries("spectrogram input".into()));
    }
    if sample_rate <= 0.0 || !sample_rate.is_finite() {
        return Err(PlotError::Analysis(format!("invalid sample rate {sample_rate}")));
    }
    if overlap >= segment_length {
        return Err(PlotError::Analysis("overlap must be shorter than the segment".into()));
    }
    if signal.len() < segment_length {
        return Err(PlotError::Analysis(format!(
            "signal too short for spectrogram ({} < {} samples)",
            signal.len(),
            segment_length
        )));
    }

    let hop_size = segment_length - overlap;
    let window = hanning_window(segment_length);
    let window_power: f64 = window.iter().map(|&w| (w as f64) * (w as f64)).sum();
    let num_segments = (signal.len() - segment_length) / hop_size + 1;
    let num_freqs = segment_length / 2 + 1;
    let frequencies_hz = fft_utils::fft_rfftfreq(segment_length, sample_rate);

    let mut result = Spectrogram {
        frequencies_hz,
        ..Default::default()
    };
    for seg_idx in 0..num_segments {
        let start = seg_idx * hop_size;
        let segment = &signal[start..start + segment_length];
        let clean = |v: f64| if v.is_finite() { v } else { 0.0 };
        let mean = segment.iter().map(|&v| clean(v)).sum::<f64>() / segment_length as f64;

        let windowed: Array1<f32> = segment
            .iter()
            .zip(window.iter())
            .map(|(&v, &w)| ((clean(v) - mean) as f32) * w)
            .collect();
        let spectrum = fft_utils::fft_forward(&windowed);

        let mut psd = vec![0.0f64; num_freqs];
        for (i, value) in spectrum.iter().enumerate().take(num_freqs) {
            let mut p = value.norm_sqr() as f64 / (sample_rate * window_power);
            // One-sided: double everything but DC and Nyquist
            let is_nyquist = segment_length % 2 == 0 && i == num_freqs - 1;
            if i > 0 && !is_nyquist {
                p *= 2.0;
            }
            psd[i] = p;
        }
        result
            .times_s
            .push((start as f64 + segment_length as f64 / 2.0) / sample_rate);
        result.psd.push(psd);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn test_spectrogram_peak_bin() {
        let fs = 1000.0;
        let spec = spectrogram(&sine(125.0, fs, 2048), fs, 256, 128).unwrap();
        assert_eq!(spec.psd.len(), (2048 - 256) / 128 + 1);
        assert_eq!(spec.frequencies_hz.len(), 129);
        for row in &spec.psd {
            let peak = row
                .iter()
                .enumerate()
                .fold((0, 0.0), |best, (i, &v)| if v > best.1 { (i, v) } else { best });
            assert!((spec.frequencies_hz[peak.0] - 125.0).abs() < fs / 256.0);
        }
        assert!((spec.times_s[0] - 0.128).abs() < 1e-9);
    }

    #[test]
    fn test_spectrogram_errors() {
        assert!(spectrogram(&[], 100.0, 256, 128).is_err());
        assert!(spectrogram(&[0.0; 100], 100.0, 256, 128).is_err());
        assert!(spectrogram(&[0.0; 300], 100.0, 256, 256).is_err());
    }

    #[test]
    fn test_accumulate_and_reduce() {
        let fs = 500.0;
        let a = spectrogram(&sine(50.0, fs, 4096), fs, 256, 128).unwrap();
        let mut sum = Spectrogram::default();
        sum.accumulate(&a).unwrap();
        sum.accumulate(&a).unwrap();
        assert!((sum.psd[0][10] - 2.0 * a.psd[0][10]).abs() < 1e-12);

        let reduced = sum.reduce_time_bins(10);
        assert!(reduced.psd.len() <= 10);
        assert_eq!(reduced.times_s.len(), reduced.psd.len());
    }

    #[test]
    fn test_to_power_db() {
        assert_eq!(to_power_db(1.0, -80.0), 0.0);
        assert_eq!(to_power_db(0.0, -80.0), -80.0);
        assert_eq!(to_power_db(1e-20, -80.0), -80.0);
    }
}
