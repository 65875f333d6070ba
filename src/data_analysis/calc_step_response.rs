// src/data_analysis/calc_step_response.rs

use ndarray::{s, Array1, Array2};
use num_complex::Complex32;
use std::collections::VecDeque;
use tracing::debug;

use crate::constants::{
    FRAME_LENGTH_S, MIN_SAMPLE_RATE_HZ, MOVEMENT_THRESHOLD, POST_AVERAGING_SMOOTHING_WINDOW,
    RESPONSE_LENGTH_S, SETPOINT_THRESHOLD, STEADY_STATE_END_S, STEADY_STATE_MAX_VAL,
    STEADY_STATE_MIN_VAL, STEADY_STATE_START_S, SUPERPOSITION_FACTOR, TUKEY_ALPHA,
    WIENER_REGULARIZATION,
};
use crate::data_analysis::fft_utils;
use crate::data_analysis::resample::resample;
use crate::error::{PlotError, Result};

/// Input for the step response estimation of one axis: the controller
/// setpoint (input) and the measured response (output), resampled onto a
/// shared time axis.
#[derive(Debug, Clone)]
pub struct Trace {
    pub name: String,
    pub time_s: Vec<f64>,
    pub output: Vec<f64>,
    pub input: Vec<f64>,
    pub throttle: Vec<f64>,
    /// First-order low-pass applied to the input before deconvolution.
    pub input_cutoff_hz: Option<f64>,
}

/// Averaged step responses of one trace, split by input magnitude.
#[derive(Debug, Clone)]
pub struct StepResponse {
    pub time_s: Vec<f64>,
    pub low_input: Option<Vec<f64>>,
    pub high_input: Option<Vec<f64>>,
    pub num_windows_low: usize,
    pub num_windows_high: usize,
    pub sample_rate_hz: f64,
    pub mean_throttle: f64,
}

impl Trace {
    pub fn new(name: &str, time_s: Vec<f64>, output: Vec<f64>, input: Vec<f64>, throttle: Vec<f64>) -> Result<Self> {
        let n = time_s.len();
        for len in [output.len(), input.len(), throttle.len()] {
            if len != n {
                return Err(PlotError::LengthMismatch(n, len));
            }
        }
        Ok(Self {
            name: name.to_string(),
            time_s,
            output,
            input,
            throttle,
            input_cutoff_hz: None,
        })
    }

    pub fn with_input_cutoff(mut self, cutoff_hz: f64) -> Self {
        self.input_cutoff_hz = Some(cutoff_hz);
        self
    }

    /// Runs the windowed deconvolution and returns the averaged responses.
    pub fn step_response(&self) -> Result<StepResponse> {
        calculate_step_response(self)
    }
}

/// Makes a Tukey window for enveloping.
pub fn tukeywin(num: usize, alpha: f64) -> Array1<f32> {
    if num < 2 {
        return Array1::ones(num);
    }
    if alpha <= 0.0 {
        return Array1::ones(num);
    } else if alpha >= 1.0 {
        let mut window = Array1::<f32>::zeros(num);
        for i in 0..num {
            window[i] = 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (num as f64 - 1.0)).cos()) as f32;
        }
        return window;
    }
    let mut window = Array1::<f32>::ones(num);
    let n_alpha = (alpha / 2.0 * (num as f64 - 1.0)).floor() as usize;
    for i in 0..n_alpha {
        window[i] = 0.5 * (1.0 - (std::f64::consts::PI * i as f64 / n_alpha as f64).cos()) as f32;
        window[num - 1 - i] = window[i];
    }
    window
}

/// Generates overlapping windows of input and output.
fn winstacker_contiguous(
    input_data: &Array1<f32>,
    output_data: &Array1<f32>,
    frame_length_samples: usize,
    superposition_factor: usize,
) -> (Array2<f32>, Array2<f32>) {
    let total_len = input_data.len();
    let empty = || (Array2::zeros((0, 0)), Array2::zeros((0, 0)));
    if total_len == 0 || frame_length_samples == 0 || superposition_factor == 0 {
        return empty();
    }
    let shift = frame_length_samples / superposition_factor;
    if shift == 0 || total_len < frame_length_samples {
        return empty();
    }
    let num_windows = (total_len - frame_length_samples) / shift + 1;
    let mut stacked_input = Array2::<f32>::zeros((num_windows, frame_length_samples));
    let mut stacked_output = Array2::<f32>::zeros((num_windows, frame_length_samples));
    for i in 0..num_windows {
        let start = i * shift;
        let end = start + frame_length_samples;
        stacked_input.row_mut(i).assign(&input_data.slice(s![start..end]));
        stacked_output.row_mut(i).assign(&output_data.slice(s![start..end]));
    }
    (stacked_input, stacked_output)
}

/// Wiener deconvolution of one window: impulse response h with
/// `output = input * h`, zero-padded to a power of two.
fn wiener_deconvolution_window(input_window: &Array1<f32>, output_window: &Array1<f32>) -> Array1<f32> {
    let n = input_window.len();
    if n == 0 {
        return Array1::zeros(0);
    }
    let padded_n = n.next_power_of_two();
    let mut input_padded = Array1::<f32>::zeros(padded_n);
    input_padded.slice_mut(s![0..n]).assign(input_window);
    let mut output_padded = Array1::<f32>::zeros(padded_n);
    output_padded.slice_mut(s![0..n]).assign(output_window);

    let h_spec = fft_utils::fft_forward(&input_padded);
    let g_spec = fft_utils::fft_forward(&output_padded);
    if h_spec.is_empty() || h_spec.len() != g_spec.len() {
        return Array1::zeros(n);
    }

    let mut deconvolved_spec = Array1::<Complex32>::zeros(h_spec.len());
    for i in 0..h_spec.len() {
        let h = h_spec[i];
        let g = g_spec[i];
        let h_conj = h.conj();
        let denominator = (h * h_conj).re + WIENER_REGULARIZATION;
        if denominator.abs() > 1e-9 {
            deconvolved_spec[i] = (g * h_conj) / denominator;
        }
    }
    let impulse = fft_utils::fft_inverse(&deconvolved_spec, padded_n);
    impulse.slice(s![0..n]).to_owned()
}

fn cumulative_sum(data: &Array1<f32>) -> Array1<f32> {
    let mut current_sum = 0.0;
    data.mapv(|v| {
        if v.is_finite() {
            current_sum += v;
        }
        current_sum
    })
}

/// Moving average over the trailing `window_size` samples.
pub fn moving_average_smooth_f64(data: &[f64], window_size: usize) -> Vec<f64> {
    if window_size <= 1 || data.is_empty() {
        return data.to_vec();
    }
    let mut smoothed = Vec::with_capacity(data.len());
    let mut current_sum = 0.0;
    let mut history: VecDeque<f64> = VecDeque::with_capacity(window_size);
    for &val in data {
        history.push_back(val);
        current_sum += val;
        if history.len() > window_size {
            if let Some(old) = history.pop_front() {
                current_sum -= old;
            }
        }
        smoothed.push(current_sum / history.len() as f64);
    }
    smoothed
}

/// First-order (PT1) low-pass at `cutoff_hz`, seeded with the first sample.
pub fn pt1_lowpass(data: &[f64], sample_rate_hz: f64, cutoff_hz: f64) -> Vec<f64> {
    if data.is_empty() || cutoff_hz <= 0.0 || sample_rate_hz <= 0.0 {
        return data.to_vec();
    }
    let dt = 1.0 / sample_rate_hz;
    let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff_hz);
    let k = dt / (rc + dt);
    let mut state = data[0];
    data.iter()
        .map(|&v| {
            if v.is_finite() {
                state += k * (v - state);
            }
            state
        })
        .collect()
}

/// Mean of the stacked responses selected by `mask`, each window weighted
/// by its maximum absolute input.
fn average_responses(stacked_responses: &Array2<f32>, weights: &[f32], mask: &[bool]) -> Option<Vec<f64>> {
    let (num_windows, response_len) = stacked_responses.dim();
    if num_windows == 0 || mask.len() != num_windows || weights.len() != num_windows {
        return None;
    }
    let mut averaged = vec![0.0f64; response_len];
    let mut weight_sum = 0.0f64;
    for (i, row) in stacked_responses.outer_iter().enumerate() {
        if !mask[i] {
            continue;
        }
        let w = weights[i] as f64;
        for (acc, &v) in averaged.iter_mut().zip(row.iter()) {
            *acc += w * v as f64;
        }
        weight_sum += w;
    }
    if weight_sum <= 0.0 {
        return None;
    }
    averaged.iter_mut().for_each(|v| *v /= weight_sum);
    Some(moving_average_smooth_f64(&averaged, POST_AVERAGING_SMOOTHING_WINDOW))
}

fn equalize(trace: &Trace) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>, f64)> {
    let n = trace.time_s.len();
    if n < 2 {
        return Err(PlotError::Analysis("not enough samples".into()));
    }
    let t0 = trace.time_s[0];
    let t1 = trace.time_s[n - 1];
    if t1 <= t0 {
        return Err(PlotError::Analysis("zero-length trace".into()));
    }
    let sample_rate = (n - 1) as f64 / (t1 - t0);
    let uniform: Vec<f64> = (0..n).map(|i| t0 + i as f64 / sample_rate).collect();
    let input = resample(&trace.time_s, &trace.input, &uniform)?;
    let output = resample(&trace.time_s, &trace.output, &uniform)?;
    Ok((uniform, input, output, sample_rate))
}

/// Estimates step responses with windowed Wiener deconvolution.
///
/// The trace is resampled onto a uniform grid, cut into overlapping 1 s
/// windows, each window deconvolved and integrated into a step response.
/// Windows with too little input or a steady state outside
/// `[STEADY_STATE_MIN_VAL, STEADY_STATE_MAX_VAL]` are dropped; the rest are
/// averaged separately for low and high input magnitude, weighted by their
/// maximum input. The input is low-passed first if the trace has a cutoff.
pub fn calculate_step_response(trace: &Trace) -> Result<StepResponse> {
    let (_uniform_time, input, output, sample_rate) = equalize(trace)?;
    if sample_rate < MIN_SAMPLE_RATE_HZ {
        return Err(PlotError::Analysis(format!(
            "{}: logged data rate too low ({:.0} Hz, need {:.0} Hz)",
            trace.name, sample_rate, MIN_SAMPLE_RATE_HZ
        )));
    }

    let frame_length_samples = (FRAME_LENGTH_S * sample_rate).ceil() as usize;
    let response_length_samples = (RESPONSE_LENGTH_S * sample_rate).ceil() as usize;
    let ss_start = ((STEADY_STATE_START_S * sample_rate).floor() as usize).min(response_length_samples - 1);
    let ss_end = ((STEADY_STATE_END_S * sample_rate).ceil() as usize)
        .min(response_length_samples)
        .max(ss_start + 1);

    let input = match trace.input_cutoff_hz {
        Some(cutoff) => pt1_lowpass(&input, sample_rate, cutoff),
        None => input,
    };
    let input_arr: Array1<f32> = input.iter().map(|&v| if v.is_finite() { v as f32 } else { 0.0 }).collect();
    let output_arr: Array1<f32> = output.iter().map(|&v| if v.is_finite() { v as f32 } else { 0.0 }).collect();
    let (stacked_input, stacked_output) =
        winstacker_contiguous(&input_arr, &output_arr, frame_length_samples, SUPERPOSITION_FACTOR);
    let num_windows = stacked_input.nrows();
    if num_windows == 0 {
        return Err(PlotError::Analysis(format!(
            "{}: trace shorter than one analysis window",
            trace.name
        )));
    }

    let window_func = tukeywin(frame_length_samples, TUKEY_ALPHA);
    let mut responses: Vec<Array1<f32>> = Vec::new();
    let mut max_inputs: Vec<f32> = Vec::new();

    for i in 0..num_windows {
        let input_window = stacked_input.row(i).to_owned();
        let output_window = stacked_output.row(i).to_owned();

        let max_input = input_window.iter().fold(0.0f32, |m, &v| m.max(v.abs()));
        if max_input < MOVEMENT_THRESHOLD as f32 {
            continue;
        }

        let impulse = wiener_deconvolution_window(&(&input_window * &window_func), &(&output_window * &window_func));
        let step = cumulative_sum(&impulse);
        if step.len() < response_length_samples {
            continue;
        }
        let step = step.slice(s![0..response_length_samples]).to_owned();

        let steady_state = step.slice(s![ss_start..ss_end]);
        let min_ss = steady_state.iter().fold(f32::INFINITY, |a, &b| a.min(b));
        let max_ss = steady_state.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        if min_ss.is_finite() && max_ss.is_finite() && min_ss > STEADY_STATE_MIN_VAL && max_ss < STEADY_STATE_MAX_VAL {
            responses.push(step);
            max_inputs.push(max_input);
        }
    }

    debug!(
        "{}: {} of {} windows passed quality control",
        trace.name,
        responses.len(),
        num_windows
    );
    if responses.is_empty() {
        return Err(PlotError::Analysis(format!(
            "{}: not enough motion for the analysis",
            trace.name
        )));
    }

    let stacked = Array2::from_shape_fn((responses.len(), response_length_samples), |(r, c)| responses[r][c]);
    let low_mask: Vec<bool> = max_inputs.iter().map(|&m| (m as f64) < SETPOINT_THRESHOLD).collect();
    let high_mask: Vec<bool> = low_mask.iter().map(|&low| !low).collect();

    let time_s: Vec<f64> = (0..response_length_samples).map(|i| i as f64 / sample_rate).collect();
    let finite_throttle: Vec<f64> = trace.throttle.iter().copied().filter(|v| v.is_finite()).collect();
    let mean_throttle = if finite_throttle.is_empty() {
        0.0
    } else {
        finite_throttle.iter().sum::<f64>() / finite_throttle.len() as f64
    };

    Ok(StepResponse {
        time_s,
        low_input: average_responses(&stacked, &max_inputs, &low_mask),
        high_input: average_responses(&stacked, &max_inputs, &high_mask),
        num_windows_low: low_mask.iter().filter(|&&m| m).count(),
        num_windows_high: high_mask.iter().filter(|&&m| m).count(),
        sample_rate_hz: sample_rate,
        mean_throttle,
    })
}

/// Maximum of the response (overshoot indicator).
pub fn find_peak_value(response: &[f64]) -> Option<f64> {
    response
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
}

/// Time until the response first reaches 50% of its final value.
pub fn calculate_delay_time(time_s: &[f64], response: &[f64]) -> Option<f64> {
    let target = 0.5;
    time_s
        .iter()
        .zip(response.iter())
        .find(|(_, &v)| v >= target)
        .map(|(&t, _)| t)
}
