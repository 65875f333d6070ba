// src/plot_builders/data_plot_2d.rs

use crate::config::PlotConfig;
use crate::constants::COLOR_GRAY;
use crate::data_input::flight_log::FlightLog;
use crate::error::PlotError;
use crate::plot_builders::data_plot::{PlotOptions, PlotState};
use crate::plot_framework::{calculate_range, ChartDescriptor, ChartKind, CircleData, LineData};

// Pixels taken by the axis labels and caption around the plotting area
const X_AXIS_AREA_PX: f64 = 76.0;
const Y_AXIS_AREA_PX: f64 = 80.0;

/// X/Y chart of two fields against each other, drawn with equal scale on
/// both axes.
pub struct DataPlot2D<'a> {
    pub(crate) state: PlotState<'a>,
}

impl<'a> DataPlot2D<'a> {
    pub fn new(log: &'a FlightLog, config: &'a PlotConfig, topic: &str, options: PlotOptions<'a>) -> Self {
        Self {
            state: PlotState::new(log, config, topic, options.topic_instance, ChartKind::Xy, &options),
        }
    }

    pub fn had_error(&self) -> bool {
        self.state.had_error
    }

    pub fn errors(&self) -> &[String] {
        &self.state.errors
    }

    pub fn change_dataset(&mut self, topic: &str, instance: u32) {
        self.state.select_dataset(topic, instance);
    }

    /// Plots `y_field` over `x_field`. With `check_if_all_zero` a dataset in
    /// which both fields are zero everywhere counts as an error.
    pub fn add_graph(&mut self, x_field: &str, y_field: &str, color: &str, legend: &str, check_if_all_zero: bool) {
        let Some(dataset) = self.state.dataset else {
            return;
        };
        let (x, y) = match (dataset.field(x_field), dataset.field(y_field)) {
            (Ok(x), Ok(y)) => (x, y),
            (Err(e), _) | (_, Err(e)) => {
                self.state.record_error(&e);
                return;
            }
        };
        if check_if_all_zero && x.iter().all(|&v| v == 0.0) && y.iter().all(|&v| v == 0.0) {
            self.state
                .record_error(&PlotError::EmptySeries(format!("{}: {} and {} are all zero", dataset.name, x_field, y_field)));
            return;
        }
        self.add_xy(x, y, color, legend);
    }

    /// Adds a line from explicit coordinates.
    pub fn add_xy(&mut self, x: &[f64], y: &[f64], color: &str, legend: &str) {
        let step = self.state.decimation_step(x.len());
        self.state.chart.lines.push(LineData {
            label: legend.to_string(),
            color: if color.is_empty() { COLOR_GRAY } else { color }.to_string(),
            points: x.iter().copied().zip(y.iter().copied()).step_by(step).collect(),
            step: false,
            nan_markers: Vec::new(),
        });
        self.state.previous_success = true;
    }

    pub fn add_xy_circles(&mut self, x: &[f64], y: &[f64], color: &str, legend: &str) {
        self.state.chart.circles.push(CircleData {
            label: legend.to_string(),
            color: color.to_string(),
            points: x.iter().copied().zip(y.iter().copied()).collect(),
        });
    }

    /// Returns the chart with equal-aspect ranges, or `None` if nothing was
    /// plotted.
    pub fn finalize(mut self) -> Option<ChartDescriptor> {
        if self.state.is_empty() {
            return None;
        }
        let ((x_min, x_max), (y_min, y_max)) = self.state.chart.data_bounds()?;
        let chart = &mut self.state.chart;
        let plot_w = (chart.width_px as f64 - X_AXIS_AREA_PX).max(1.0);
        let plot_h = (chart.height_px as f64 - Y_AXIS_AREA_PX).max(1.0);
        let (x_range, y_range) = equal_aspect_ranges(
            calculate_range(x_min, x_max),
            calculate_range(y_min, y_max),
            plot_w / plot_h,
        );
        chart.x_range = x_range;
        chart.y_range = y_range;
        Some(self.state.chart)
    }
}

/// Widens the narrower range around its centre so that one data unit spans
/// the same number of pixels on both axes. `pixel_aspect` is width/height
/// of the plotting area.
pub fn equal_aspect_ranges(x: (f64, f64), y: (f64, f64), pixel_aspect: f64) -> ((f64, f64), (f64, f64)) {
    let x_span = x.1 - x.0;
    let y_span = y.1 - y.0;
    if x_span <= 0.0 || y_span <= 0.0 || pixel_aspect <= 0.0 {
        return (x, y);
    }
    if x_span / y_span < pixel_aspect {
        let new_span = y_span * pixel_aspect;
        let c = (x.0 + x.1) / 2.0;
        ((c - new_span / 2.0, c + new_span / 2.0), y)
    } else {
        let new_span = x_span / pixel_aspect;
        let c = (y.0 + y.1) / 2.0;
        (x, (c - new_span / 2.0, c + new_span / 2.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_input::flight_log::Dataset;

    fn local_position(x: Vec<f64>, y: Vec<f64>) -> FlightLog {
        let mut d = Dataset::new("vehicle_local_position", 0);
        d.data.insert("timestamp".into(), (0..x.len()).map(|i| i as f64).collect());
        d.data.insert("x".into(), x);
        d.data.insert("y".into(), y);
        FlightLog::new("test", vec![d])
    }

    #[test]
    fn test_equal_aspect_ranges() {
        let (x, y) = equal_aspect_ranges((0.0, 10.0), (0.0, 10.0), 2.0);
        assert_eq!(x, (-5.0, 15.0));
        assert_eq!(y, (0.0, 10.0));
        let (x, y) = equal_aspect_ranges((0.0, 40.0), (0.0, 10.0), 2.0);
        assert_eq!(x, (0.0, 40.0));
        assert_eq!(y, (-5.0, 15.0));
    }

    #[test]
    fn test_all_zero_is_error() {
        let log = local_position(vec![0.0; 4], vec![0.0; 4]);
        let config = PlotConfig::default();
        let mut plot = DataPlot2D::new(&log, &config, "vehicle_local_position", PlotOptions::new(""));
        plot.add_graph("y", "x", "#ff0000", "Estimated", true);
        assert!(plot.had_error());
        assert!(plot.finalize().is_none());
    }

    #[test]
    fn test_ranges_have_equal_scale() {
        let log = local_position(vec![0.0, 10.0, 20.0], vec![0.0, 1.0, 2.0]);
        let config = PlotConfig::default();
        let mut plot = DataPlot2D::new(&log, &config, "vehicle_local_position", PlotOptions::new(""));
        plot.add_graph("y", "x", "#ff0000", "Estimated", true);
        let chart = plot.finalize().unwrap();
        let x_span = chart.x_range.1 - chart.x_range.0;
        let y_span = chart.y_range.1 - chart.y_range.0;
        let aspect = (chart.width_px as f64 - 76.0) / (chart.height_px as f64 - 80.0);
        assert!((x_span / y_span - aspect).abs() < 1e-9);
    }
}
