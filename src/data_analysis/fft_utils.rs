// src/data_analysis/fft_utils.rs

use ndarray::Array1;
use realfft::num_complex::Complex32;
use realfft::RealFftPlanner;
use tracing::warn;

fn complex_len(n: usize) -> usize {
    n / 2 + 1
}

/// Computes the Fast Fourier Transform (FFT) of a real-valued signal.
/// Returns the complex frequency spectrum (`n/2 + 1` bins). Handles empty input.
pub fn fft_forward(data: &Array1<f32>) -> Array1<Complex32> {
    if data.is_empty() {
        return Array1::zeros(0);
    }
    let n = data.len();
    let mut input = data.to_vec();
    let planner = RealFftPlanner::<f32>::new().plan_fft_forward(n);
    let mut output = planner.make_output_vec();
    if planner.process(&mut input, &mut output).is_err() {
        warn!("FFT forward processing failed.");
        return Array1::zeros(complex_len(n));
    }
    Array1::from(output)
}

/// Computes the Inverse Fast Fourier Transform (IFFT) of a complex spectrum.
/// Requires the original signal length N; the output is normalized by 1/N.
pub fn fft_inverse(data: &Array1<Complex32>, original_length_n: usize) -> Array1<f32> {
    if data.is_empty() || original_length_n == 0 {
        return Array1::zeros(original_length_n);
    }
    let expected = complex_len(original_length_n);
    if data.len() != expected {
        warn!(
            "FFT inverse length mismatch. Expected complex length {}, got {}. Returning zeros.",
            expected,
            data.len()
        );
        return Array1::zeros(original_length_n);
    }

    let mut input = data.to_vec();
    // The imaginary parts of DC (and Nyquist for even N) must be zero for a real output.
    input[0].im = 0.0;
    if original_length_n % 2 == 0 {
        input[expected - 1].im = 0.0;
    }
    let planner = RealFftPlanner::<f32>::new().plan_fft_inverse(original_length_n);
    let mut output = planner.make_output_vec();
    if planner.process(&mut input, &mut output).is_ok() {
        let scale = 1.0 / original_length_n as f32;
        let mut output_arr = Array1::from(output);
        output_arr.mapv_inplace(|x| x * scale);
        output_arr
    } else {
        warn!("FFT inverse processing failed. Returning zeros.");
        Array1::zeros(original_length_n)
    }
}

/// Frequencies (Hz) of the real FFT bins for `n` samples at `sample_rate_hz`.
pub fn fft_rfftfreq(n: usize, sample_rate_hz: f64) -> Vec<f64> {
    if n == 0 || sample_rate_hz <= 0.0 {
        return Vec::new();
    }
    (0..complex_len(n))
        .map(|i| i as f64 * sample_rate_hz / n as f64)
        .collect()
}

/// Single-sided amplitude spectrum `2/N * |X(f)|` with the DC bin dropped.
/// NaN samples are replaced by zero before the transform.
pub fn amplitude_spectrum(signal: &[f64], sample_rate_hz: f64) -> Vec<(f64, f64)> {
    if signal.len() < 2 || sample_rate_hz <= 0.0 {
        return Vec::new();
    }
    let n = signal.len();
    let input: Array1<f32> = signal
        .iter()
        .map(|&v| if v.is_finite() { v as f32 } else { 0.0 })
        .collect();
    let spectrum = fft_forward(&input);
    let freqs = fft_rfftfreq(n, sample_rate_hz);
    let scale = 2.0 / n as f64;
    freqs
        .iter()
        .zip(spectrum.iter())
        .skip(1)
        .map(|(&f, c)| (f, c.norm() as f64 * scale))
        .collect()
}
