// src/plot_builders/data_plot_fft.rs

use crate::config::{PlotConfig, PlotHeight};
use crate::constants::{COLOR_FREQUENCY_MARK, COLOR_GRAY};
use crate::data_analysis::derivative::mean_sample_rate_hz;
use crate::data_analysis::fft_utils::amplitude_spectrum;
use crate::data_input::flight_log::FlightLog;
use crate::error::PlotError;
use crate::plot_builders::data_plot::{PlotOptions, PlotState};
use crate::plot_framework::{calculate_range, ChartDescriptor, ChartKind, LineData, VerticalMarker};

/// Amplitude spectrum of fields over the whole log.
pub struct DataPlotFft<'a> {
    pub(crate) state: PlotState<'a>,
    sample_rate_hz: Option<f64>,
}

impl<'a> DataPlotFft<'a> {
    pub fn new(log: &'a FlightLog, config: &'a PlotConfig, topic: &str, title: &str) -> Self {
        let options = PlotOptions::new(title)
            .x_label("[Hz]")
            .y_label("Amplitude")
            .height(PlotHeight::Small);
        Self {
            state: PlotState::new(log, config, topic, 0, ChartKind::Spectrum, &options),
            sample_rate_hz: None,
        }
    }

    pub fn had_error(&self) -> bool {
        self.state.had_error
    }

    pub fn errors(&self) -> &[String] {
        &self.state.errors
    }

    /// Adds the `2/N |X(f)|` spectrum of each field, DC excluded. The sample
    /// rate is the inverse of the mean timestamp spacing.
    pub fn add_graph(&mut self, fields: &[&str], colors: &[&str], legends: &[&str]) {
        let Some(dataset) = self.state.dataset else {
            return;
        };
        let timestamps = match dataset.timestamps() {
            Ok(t) => t,
            Err(e) => {
                self.state.record_error(&e);
                return;
            }
        };
        let Some(sample_rate) = mean_sample_rate_hz(timestamps) else {
            self.state
                .record_error(&PlotError::EmptySeries(format!("{}: not enough samples", dataset.name)));
            return;
        };
        let mut lines = Vec::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            let values = match dataset.field(field) {
                Ok(v) => v,
                Err(e) => {
                    self.state.record_error(&e);
                    return;
                }
            };
            let spectrum = amplitude_spectrum(values, sample_rate);
            let step = self.state.decimation_step(spectrum.len());
            lines.push(LineData {
                label: legends.get(i).copied().unwrap_or_default().to_string(),
                color: colors.get(i).copied().unwrap_or(COLOR_GRAY).to_string(),
                points: spectrum.into_iter().step_by(step).collect(),
                step: false,
                nan_markers: Vec::new(),
            });
        }
        self.state.chart.lines.extend(lines);
        self.sample_rate_hz = Some(sample_rate);
        self.state.previous_success = true;
    }

    /// Labelled vertical marker, e.g. a filter cutoff. `label_offset_px`
    /// shifts the label down so neighbouring marks stay readable.
    pub fn mark_frequency(&mut self, frequency_hz: f64, label: &str, label_offset_px: i32) {
        self.state.chart.markers.push(VerticalMarker {
            x: frequency_hz,
            color: COLOR_FREQUENCY_MARK.to_string(),
            dashed: true,
            label: vec![label.to_string()],
            label_offset_px,
        });
    }

    pub fn finalize(mut self) -> Option<ChartDescriptor> {
        if self.state.is_empty() {
            return None;
        }
        let nyquist = self.sample_rate_hz.map_or(1.0, |fs| fs / 2.0);
        let (_, (y_min, y_max)) = self.state.chart.data_bounds()?;
        let chart = &mut self.state.chart;
        chart.x_range = (0.0, nyquist);
        chart.y_range = (0.0, calculate_range(y_min.min(0.0), y_max).1);
        Some(self.state.chart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_input::flight_log::Dataset;

    #[test]
    fn test_spectrum_peak_and_marker() {
        let fs = 250.0;
        let n = 1000;
        let mut d = Dataset::new("actuator_controls_0", 0);
        d.data.insert("timestamp".into(), (0..n).map(|i| i as f64 * 1e6 / fs).collect());
        d.data.insert(
            "control[0]".into(),
            (0..n)
                .map(|i| (2.0 * std::f64::consts::PI * 25.0 * i as f64 / fs).sin())
                .collect(),
        );
        let log = FlightLog::new("test", vec![d]);
        let config = PlotConfig::default();
        let mut plot = DataPlotFft::new(&log, &config, "actuator_controls_0", "Actuator Controls FFT");
        plot.add_graph(&["control[0]"], &["#ff0000"], &["Roll"]);
        plot.mark_frequency(30.0, "MC_DTERM_CUTOFF", 0);
        let chart = plot.finalize().unwrap();
        let (peak_f, peak_a) = chart.lines[0]
            .points
            .iter()
            .copied()
            .fold((0.0, 0.0), |best, p| if p.1 > best.1 { p } else { best });
        assert!((peak_f - 25.0).abs() < 0.5);
        assert!((peak_a - 1.0).abs() < 0.05);
        assert!((chart.x_range.1 - 125.0).abs() < 1e-6);
        assert_eq!(chart.markers[0].label, vec!["MC_DTERM_CUTOFF"]);
    }

    #[test]
    fn test_missing_field_skips_chart() {
        let mut d = Dataset::new("actuator_controls_0", 0);
        d.data.insert("timestamp".into(), vec![0.0, 1.0, 2.0]);
        let log = FlightLog::new("test", vec![d]);
        let config = PlotConfig::default();
        let mut plot = DataPlotFft::new(&log, &config, "actuator_controls_0", "FFT");
        plot.add_graph(&["control[0]"], &["#ff0000"], &["Roll"]);
        assert!(plot.had_error());
        assert!(plot.finalize().is_none());
    }
}
