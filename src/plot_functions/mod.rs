// src/plot_functions/mod.rs

pub mod plot_attitude;
pub mod plot_inputs;
pub mod plot_pid_analysis;
pub mod plot_position;
pub mod plot_sensors;
pub mod plot_system;

use tracing::{debug, warn};

use crate::config::{PlotConfig, PlotHeight};
use crate::constants::X_RANGE_PADDING_FRACTION;
use crate::data_analysis::flight_modes::{get_flight_mode_changes, get_vtol_states, ModeChanges};
use crate::data_input::flight_log::{FlightLog, ParameterChange};
use crate::plot_builders::data_plot::{DataPlot, PlotOptions};
use crate::plot_builders::overlays::plot_flight_modes_background;
use crate::plot_builders::ChartBuilder;
use crate::plot_framework::ChartDescriptor;

/// State shared by the chart functions of one page: the log, the overlays
/// every time-series chart gets, and the charts built so far.
pub struct PlotContext<'a> {
    pub log: &'a FlightLog,
    pub config: &'a PlotConfig,
    pub flight_modes: ModeChanges,
    pub vtol_states: Option<ModeChanges>,
    /// `vehicle_status.is_vtol`, set even when the VTOL states are unknown.
    vtol_flag: bool,
    /// Shared x range: the log duration padded by 5% on both sides.
    pub x_range: (f64, f64),
    pub changed_params: Option<&'a [ParameterChange]>,
    pub charts: Vec<ChartDescriptor>,
    /// `title: reason` for every chart that was skipped.
    pub skipped: Vec<String>,
}

impl<'a> PlotContext<'a> {
    pub fn new(log: &'a FlightLog, config: &'a PlotConfig) -> Self {
        let offset = (log.last_timestamp - log.start_timestamp) * X_RANGE_PADDING_FRACTION;
        // A replayed log can carry many parameter changes, don't mark them
        let changed_params = if log.is_replay() || log.changed_parameters.is_empty() {
            None
        } else {
            Some(log.changed_parameters.as_slice())
        };
        Self {
            log,
            config,
            flight_modes: get_flight_mode_changes(log),
            vtol_states: get_vtol_states(log),
            vtol_flag: log
                .get_dataset("vehicle_status", 0)
                .and_then(|d| d.field_max("is_vtol"))
                .map_or(false, |v| v == 1.0),
            x_range: (log.start_timestamp - offset, log.last_timestamp + offset),
            changed_params,
            charts: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn is_vtol(&self) -> bool {
        self.vtol_flag
    }

    /// Options for a small time-series chart on the shared x axis.
    pub fn options(&self, title: &str) -> PlotOptions<'a> {
        PlotOptions::new(title)
            .height(PlotHeight::Small)
            .x_range(Some(self.x_range))
            .changed_params(self.changed_params)
    }

    pub fn data_plot(&self, topic: &str, options: PlotOptions<'a>) -> DataPlot<'a> {
        DataPlot::new(self.log, self.config, topic, options)
    }

    pub fn flight_modes_background(&self, plot: &mut DataPlot) {
        plot_flight_modes_background(plot, &self.flight_modes, self.vtol_states.as_deref());
    }

    /// Finalizes a builder and keeps the chart, or records why it was
    /// skipped.
    pub fn push<B: ChartBuilder>(&mut self, builder: B) {
        let title = builder.chart_title().to_string();
        let reason = builder.error_messages().first().cloned();
        match builder.into_chart() {
            Some(chart) => {
                if let Some(reason) = reason {
                    debug!("'{}' partially plotted: {}", title, reason);
                }
                self.charts.push(chart);
            }
            None => {
                let reason = reason.unwrap_or_else(|| "no data".to_string());
                warn!("Skipping '{}': {}", title, reason);
                self.skipped.push(format!("{}: {}", title, reason));
            }
        }
    }

    pub fn initial_parameter(&self, name: &str) -> Option<f64> {
        self.log.initial_parameters.get(name).copied()
    }

    /// Older logs carry barometer and magnetometer data in `sensor_combined`.
    fn has_split_sensor_topics(&self) -> bool {
        self.log.has_topic("vehicle_air_data") || self.log.has_topic("vehicle_magnetometer")
    }

    pub fn baro_topic(&self) -> &'static str {
        if self.has_split_sensor_topics() {
            "vehicle_air_data"
        } else {
            "sensor_combined"
        }
    }

    pub fn magnetometer_topic(&self) -> &'static str {
        if self.has_split_sensor_topics() {
            "vehicle_magnetometer"
        } else {
            "sensor_combined"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_input::flight_log::Dataset;
    use crate::plot_builders::data_plot::{GraphOptions, Series};

    fn log() -> FlightLog {
        let mut d = Dataset::new("cpuload", 0);
        d.data.insert("timestamp".into(), vec![1e6, 11e6]);
        d.data.insert("load".into(), vec![0.2, 0.3]);
        FlightLog::new("test", vec![d])
    }

    #[test]
    fn test_shared_x_range_is_padded() {
        let log = log();
        let config = PlotConfig::default();
        let ctx = PlotContext::new(&log, &config);
        assert_eq!(ctx.x_range, (0.5e6, 11.5e6));
        assert!(ctx.changed_params.is_none());
        assert!(!ctx.is_vtol());
    }

    #[test]
    fn test_push_records_skipped_charts() {
        let log = log();
        let config = PlotConfig::default();
        let mut ctx = PlotContext::new(&log, &config);
        let mut plot = ctx.data_plot("cpuload", ctx.options("CPU & RAM"));
        plot.add_graph(vec![Series::field("load")], &["#ff0000"], &["CPU Load"], GraphOptions::PLAIN);
        ctx.push(plot);
        let mut plot = ctx.data_plot("battery_status", ctx.options("Power"));
        plot.add_graph(vec![Series::field("voltage_v")], &["#ff0000"], &["Voltage"], GraphOptions::PLAIN);
        ctx.push(plot);
        assert_eq!(ctx.charts.len(), 1);
        assert_eq!(ctx.skipped.len(), 1);
        assert!(ctx.skipped[0].starts_with("Power: "));
    }

    #[test]
    fn test_vtol_flag_without_transition_field() {
        let mut status = Dataset::new("vehicle_status", 0);
        status.data.insert("timestamp".into(), vec![1e6, 2e6]);
        status.data.insert("is_vtol".into(), vec![1.0, 1.0]);
        let log = FlightLog::new("test", vec![status]);
        let config = PlotConfig::default();
        let ctx = PlotContext::new(&log, &config);
        assert!(ctx.is_vtol());
        assert!(ctx.vtol_states.is_none());
    }
}
