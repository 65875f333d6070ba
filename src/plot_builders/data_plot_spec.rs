// src/plot_builders/data_plot_spec.rs

use tracing::debug;

use crate::config::PlotConfig;
use crate::constants::{SPECTROGRAM_MAX_TIME_BINS, SPECTROGRAM_MIN_DB, SPECTROGRAM_OVERLAP, SPECTROGRAM_SEGMENT_LENGTH};
use crate::data_analysis::derivative::mean_sample_rate_hz;
use crate::data_analysis::spectral_analysis::{spectrogram, to_power_db, Spectrogram};
use crate::data_input::flight_log::FlightLog;
use crate::error::{PlotError, Result};
use crate::plot_builders::data_plot::{PlotOptions, PlotState};
use crate::plot_framework::{finite_bounds, ChartDescriptor, ChartKind, HeatmapData};

/// Spectrogram of the summed power spectral density of several fields, on
/// the shared time axis with frequency on y.
pub struct DataPlotSpec<'a> {
    pub(crate) state: PlotState<'a>,
    x_range: Option<(f64, f64)>,
    nyquist_hz: f64,
}

impl<'a> DataPlotSpec<'a> {
    pub fn new(log: &'a FlightLog, config: &'a PlotConfig, topic: &str, options: PlotOptions<'a>) -> Self {
        let x_range = options.x_range;
        Self {
            state: PlotState::new(log, config, topic, options.topic_instance, ChartKind::Spectrogram, &options),
            x_range,
            nyquist_hz: 0.0,
        }
    }

    pub fn had_error(&self) -> bool {
        self.state.had_error
    }

    pub fn errors(&self) -> &[String] {
        &self.state.errors
    }

    /// Sums the PSD of all fields and stores it as a dB heatmap. The legends
    /// are appended to the title.
    pub fn add_graph(&mut self, fields: &[&str], legends: &[&str]) {
        let Some(dataset) = self.state.dataset else {
            return;
        };
        let result = (|| -> Result<(Spectrogram, f64, f64)> {
            let timestamps = dataset.timestamps()?;
            let sample_rate = mean_sample_rate_hz(timestamps)
                .ok_or_else(|| PlotError::EmptySeries(format!("{}: not enough samples", dataset.name)))?;
            let mut sum = Spectrogram::default();
            for field in fields {
                let values = dataset.field(field)?;
                let spec = spectrogram(values, sample_rate, SPECTROGRAM_SEGMENT_LENGTH, SPECTROGRAM_OVERLAP)?;
                sum.accumulate(&spec)?;
            }
            Ok((sum, sample_rate, timestamps[0]))
        })();

        let (sum, sample_rate, t0) = match result {
            Ok(r) => r,
            Err(e) => {
                self.state.record_error(&e);
                return;
            }
        };
        let reduced = sum.reduce_time_bins(SPECTROGRAM_MAX_TIME_BINS);
        let values_db: Vec<Vec<f64>> = reduced
            .psd
            .iter()
            .map(|row| row.iter().map(|&p| to_power_db(p, SPECTROGRAM_MIN_DB)).collect())
            .collect();
        let max_db = finite_bounds(&values_db.iter().flatten().copied().collect::<Vec<f64>>())
            .map_or(0.0, |(_, max)| max);
        debug!(
            "{}: spectrogram {} x {} bins, max {:.1} dB",
            dataset.name,
            values_db.len(),
            reduced.frequencies_hz.len(),
            max_db
        );

        self.state.chart.heatmap = Some(HeatmapData {
            x_bins: reduced.times_s.iter().map(|t| t0 + t * 1e6).collect(),
            y_bins: reduced.frequencies_hz.clone(),
            values_db,
            min_db: SPECTROGRAM_MIN_DB,
            max_db,
        });
        if !legends.is_empty() {
            self.state.chart.title = format!("{} [{}]", self.state.chart.title, legends.join(", "));
        }
        self.nyquist_hz = sample_rate / 2.0;
        self.state.previous_success = true;
    }

    pub fn finalize(mut self) -> Option<ChartDescriptor> {
        if self.state.is_empty() {
            return None;
        }
        let heatmap = self.state.chart.heatmap.as_ref()?;
        let x_range = self.x_range.or_else(|| finite_bounds(&heatmap.x_bins))?;
        let chart = &mut self.state.chart;
        chart.x_range = x_range;
        chart.y_range = (0.0, self.nyquist_hz);
        Some(self.state.chart)
    }
}
