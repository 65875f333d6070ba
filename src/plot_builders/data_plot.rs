// src/plot_builders/data_plot.rs

use tracing::debug;

use crate::config::{PlotConfig, PlotHeight};
use crate::constants::COLOR_GRAY;
use crate::data_input::flight_log::{Dataset, FlightLog, ParameterChange};
use crate::error::{PlotError, Result};
use crate::plot_builders::overlays::plot_parameter_changes;
use crate::plot_framework::{
    calculate_range, ChartDescriptor, ChartKind, CircleData, HorizontalSpan, LineData, PatchData,
};

pub type DeriveFn<'a> = Box<dyn Fn(&Dataset) -> Result<Vec<f64>> + 'a>;

/// A plotted column: a field as logged, or a series computed from the
/// current dataset.
pub enum Series<'a> {
    Field(String),
    Derived { name: String, derive: DeriveFn<'a> },
}

impl<'a> Series<'a> {
    pub fn field(name: &str) -> Self {
        Series::Field(name.to_string())
    }

    pub fn derived(name: &str, derive: impl Fn(&Dataset) -> Result<Vec<f64>> + 'a) -> Self {
        Series::Derived {
            name: name.to_string(),
            derive: Box::new(derive),
        }
    }

    /// Field multiplied by a constant.
    pub fn scaled(field: &str, factor: f64) -> Self {
        let field_name = field.to_string();
        Self::derived(field, move |d| Ok(d.field(&field_name)?.iter().map(|v| v * factor).collect()))
    }

    /// Field converted from radians to degrees.
    pub fn rad2deg(field: &str) -> Self {
        let field_name = field.to_string();
        Self::derived(field, move |d| Ok(d.field(&field_name)?.iter().map(|v| v.to_degrees()).collect()))
    }

    pub fn name(&self) -> &str {
        match self {
            Series::Field(name) => name,
            Series::Derived { name, .. } => name,
        }
    }

    pub fn values(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        match self {
            Series::Field(name) => Ok(dataset.field(name)?.to_vec()),
            Series::Derived { derive, .. } => derive(dataset),
        }
    }
}

/// Per-call switches of `add_graph`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphOptions {
    pub mark_nan: bool,
    pub use_step_lines: bool,
}

impl GraphOptions {
    pub const PLAIN: GraphOptions = GraphOptions {
        mark_nan: false,
        use_step_lines: false,
    };
    pub const MARK_NAN: GraphOptions = GraphOptions {
        mark_nan: true,
        use_step_lines: false,
    };
    pub const STEP: GraphOptions = GraphOptions {
        mark_nan: false,
        use_step_lines: true,
    };
    pub const MARK_NAN_STEP: GraphOptions = GraphOptions {
        mark_nan: true,
        use_step_lines: true,
    };
}

/// Chart-level options shared by all builders.
#[derive(Debug, Clone)]
pub struct PlotOptions<'a> {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub height: PlotHeight,
    pub x_range: Option<(f64, f64)>,
    pub y_range: Option<(f64, f64)>,
    pub y_start: Option<f64>,
    pub topic_instance: u32,
    pub changed_params: Option<&'a [ParameterChange]>,
}

impl<'a> PlotOptions<'a> {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            x_label: String::new(),
            y_label: String::new(),
            height: PlotHeight::Normal,
            x_range: None,
            y_range: None,
            y_start: None,
            topic_instance: 0,
            changed_params: None,
        }
    }

    pub fn x_label(mut self, label: &str) -> Self {
        self.x_label = label.to_string();
        self
    }

    pub fn y_label(mut self, label: &str) -> Self {
        self.y_label = label.to_string();
        self
    }

    pub fn height(mut self, height: PlotHeight) -> Self {
        self.height = height;
        self
    }

    pub fn x_range(mut self, range: Option<(f64, f64)>) -> Self {
        self.x_range = range;
        self
    }

    pub fn y_range(mut self, min: f64, max: f64) -> Self {
        self.y_range = Some((min, max));
        self
    }

    pub fn y_start(mut self, start: f64) -> Self {
        self.y_start = Some(start);
        self
    }

    pub fn topic_instance(mut self, instance: u32) -> Self {
        self.topic_instance = instance;
        self
    }

    pub fn changed_params(mut self, params: Option<&'a [ParameterChange]>) -> Self {
        self.changed_params = params;
        self
    }
}

/// Dataset selection and error bookkeeping shared by the chart builders.
pub(crate) struct PlotState<'a> {
    pub log: &'a FlightLog,
    pub config: &'a PlotConfig,
    pub dataset: Option<&'a Dataset>,
    pub topic: String,
    pub chart: ChartDescriptor,
    pub had_error: bool,
    pub previous_success: bool,
    pub errors: Vec<String>,
}

impl<'a> PlotState<'a> {
    pub fn new(log: &'a FlightLog, config: &'a PlotConfig, topic: &str, instance: u32, kind: ChartKind, options: &PlotOptions) -> Self {
        let mut chart = ChartDescriptor::new(
            &options.title,
            kind,
            options.height,
            config.plot_width,
            config.height_px(options.height),
        );
        chart.x_label = options.x_label.clone();
        chart.y_label = options.y_label.clone();
        let mut state = Self {
            log,
            config,
            dataset: None,
            topic: topic.to_string(),
            chart,
            had_error: false,
            previous_success: false,
            errors: Vec::new(),
        };
        state.select_dataset(topic, instance);
        state
    }

    pub fn select_dataset(&mut self, topic: &str, instance: u32) {
        self.topic = topic.to_string();
        match self.log.get_dataset(topic, instance) {
            Ok(dataset) => self.dataset = Some(dataset),
            Err(e) => {
                self.dataset = None;
                self.record_error(&e);
            }
        }
    }

    pub fn record_error(&mut self, error: &PlotError) {
        debug!("'{}' ({}): {}", self.chart.title, self.topic, error);
        self.had_error = true;
        self.errors.push(error.to_string());
    }

    /// Stride that keeps a series of `len` samples under the point budget.
    pub fn decimation_step(&self, len: usize) -> usize {
        decimation_step(len, self.config.max_num_data_points())
    }

    /// Nothing was plotted successfully.
    pub fn is_empty(&self) -> bool {
        !self.previous_success
    }
}

/// Integer stride `len / max_points` once a series exceeds `max_points`.
pub fn decimation_step(len: usize, max_points: usize) -> usize {
    if max_points > 0 && len > max_points {
        (len / max_points).max(1)
    } else {
        1
    }
}

/// Time-series chart on the shared log time axis.
pub struct DataPlot<'a> {
    pub(crate) state: PlotState<'a>,
    x_range: Option<(f64, f64)>,
    y_range: Option<(f64, f64)>,
    y_start: Option<f64>,
    changed_params: Option<&'a [ParameterChange]>,
}

impl<'a> DataPlot<'a> {
    pub fn new(log: &'a FlightLog, config: &'a PlotConfig, topic: &str, options: PlotOptions<'a>) -> Self {
        let state = PlotState::new(log, config, topic, options.topic_instance, ChartKind::TimeSeries, &options);
        Self {
            state,
            x_range: options.x_range,
            y_range: options.y_range,
            y_start: options.y_start,
            changed_params: options.changed_params,
        }
    }

    pub fn title(&self) -> &str {
        &self.state.chart.title
    }

    pub fn dataset(&self) -> Option<&'a Dataset> {
        self.state.dataset
    }

    pub fn had_error(&self) -> bool {
        self.state.had_error
    }

    pub fn errors(&self) -> &[String] {
        &self.state.errors
    }

    pub fn config(&self) -> &'a PlotConfig {
        self.state.config
    }

    /// True once at least one series was added.
    pub fn has_series(&self) -> bool {
        self.state.previous_success
    }

    pub fn change_dataset(&mut self, topic: &str, instance: u32) {
        self.state.select_dataset(topic, instance);
    }

    fn collect(&mut self, series: &[Series]) -> Option<(Vec<f64>, Vec<Vec<f64>>)> {
        let dataset = self.state.dataset?;
        let result = (|| -> Result<(Vec<f64>, Vec<Vec<f64>>)> {
            let timestamps = dataset.timestamps()?.to_vec();
            let mut columns = Vec::with_capacity(series.len());
            for s in series {
                let values = s.values(dataset)?;
                if values.len() != timestamps.len() {
                    return Err(PlotError::LengthMismatch(timestamps.len(), values.len()));
                }
                columns.push(values);
            }
            Ok((timestamps, columns))
        })();
        match result {
            Ok(collected) => Some(collected),
            Err(e) => {
                self.state.record_error(&e);
                None
            }
        }
    }

    /// Adds one line per series. A failing series discards the whole call.
    pub fn add_graph(&mut self, series: Vec<Series>, colors: &[&str], legends: &[&str], options: GraphOptions) {
        let Some((timestamps, columns)) = self.collect(&series) else {
            return;
        };
        let step = self.state.decimation_step(timestamps.len());
        for (i, values) in columns.iter().enumerate() {
            let points: Vec<(f64, f64)> = timestamps
                .iter()
                .zip(values.iter())
                .step_by(step)
                .map(|(&t, &v)| (t, v))
                .collect();
            let nan_markers = if options.mark_nan {
                points.iter().filter(|p| p.1.is_nan()).map(|p| p.0).collect()
            } else {
                Vec::new()
            };
            self.state.chart.lines.push(LineData {
                label: legends.get(i).copied().unwrap_or_default().to_string(),
                color: colors.get(i).copied().unwrap_or(COLOR_GRAY).to_string(),
                points,
                step: options.use_step_lines,
                nan_markers,
            });
        }
        self.state.previous_success = true;
    }

    /// Adds scatter points per series.
    pub fn add_circle(&mut self, series: Vec<Series>, colors: &[&str], legends: &[&str]) {
        let Some((timestamps, columns)) = self.collect(&series) else {
            return;
        };
        let step = self.state.decimation_step(timestamps.len());
        for (i, values) in columns.iter().enumerate() {
            self.state.chart.circles.push(CircleData {
                label: legends.get(i).copied().unwrap_or_default().to_string(),
                color: colors.get(i).copied().unwrap_or(COLOR_GRAY).to_string(),
                points: timestamps
                    .iter()
                    .zip(values.iter())
                    .step_by(step)
                    .map(|(&t, &v)| (t, v))
                    .collect(),
            });
        }
        self.state.previous_success = true;
    }

    /// Horizontal line at the mean of a field of the current dataset.
    pub fn add_span(&mut self, field: &str, color: &str) {
        let Some(dataset) = self.state.dataset else {
            return;
        };
        match dataset.field(field) {
            Ok(values) => {
                let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
                if finite.is_empty() {
                    return;
                }
                let mean = finite.iter().sum::<f64>() / finite.len() as f64;
                self.state.chart.spans.push(HorizontalSpan {
                    y: mean,
                    color: color.to_string(),
                });
            }
            Err(e) => self.state.record_error(&e),
        }
    }

    /// Filled polygon through the given points.
    pub fn add_patch(&mut self, times: &[f64], values: &[f64], color: &str, alpha: f64, legend: &str) {
        self.state.chart.patches.push(PatchData {
            label: legend.to_string(),
            color: color.to_string(),
            alpha,
            points: times.iter().copied().zip(values.iter().copied()).collect(),
        });
    }

    pub(crate) fn chart_mut(&mut self) -> &mut ChartDescriptor {
        &mut self.state.chart
    }

    /// Fixes the axis ranges and returns the chart, or `None` if nothing was
    /// plotted.
    pub fn finalize(mut self) -> Option<ChartDescriptor> {
        if self.state.is_empty() {
            return None;
        }
        let bounds = self.state.chart.data_bounds();
        let x_range = self
            .x_range
            .or_else(|| bounds.map(|(x, _)| calculate_range(x.0, x.1)))
            .unwrap_or((self.state.log.start_timestamp, self.state.log.last_timestamp.max(self.state.log.start_timestamp + 1.0)));
        let mut y_range = self
            .y_range
            .or_else(|| bounds.map(|(_, y)| calculate_range(y.0, y.1)))
            .unwrap_or((0.0, 1.0));
        if let Some(start) = self.y_start {
            y_range.0 = start;
            if y_range.1 <= start {
                y_range.1 = start + 1.0;
            }
        }
        let chart = &mut self.state.chart;
        chart.x_range = x_range;
        chart.y_range = y_range;
        if self.state.config.show_param_changes {
            if let Some(params) = self.changed_params {
                plot_parameter_changes(chart, params);
            }
        }
        Some(self.state.chart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_with(topic: &str, fields: &[(&str, Vec<f64>)]) -> FlightLog {
        let mut d = Dataset::new(topic, 0);
        for (name, values) in fields {
            d.data.insert(name.to_string(), values.clone());
        }
        FlightLog::new("test", vec![d])
    }

    #[test]
    fn test_decimation_step() {
        assert_eq!(decimation_step(100, 3360), 1);
        assert_eq!(decimation_step(3361, 3360), 1);
        assert_eq!(decimation_step(10_000, 3360), 2);
        assert_eq!(decimation_step(50, 0), 1);
    }

    #[test]
    fn test_missing_topic_finalizes_to_none() {
        let log = log_with("cpuload", &[("timestamp", vec![0.0, 1.0]), ("load", vec![0.1, 0.2])]);
        let config = PlotConfig::default();
        let mut plot = DataPlot::new(&log, &config, "vehicle_attitude", PlotOptions::new("Roll Angle"));
        plot.add_graph(vec![Series::rad2deg("roll")], &["#ff0000"], &["Roll"], GraphOptions::PLAIN);
        assert!(plot.had_error());
        assert!(plot.finalize().is_none());
    }

    #[test]
    fn test_partial_success_keeps_chart() {
        let log = log_with("cpuload", &[("timestamp", vec![0.0, 1.0e6]), ("load", vec![0.1, 0.2])]);
        let config = PlotConfig::default();
        let mut plot = DataPlot::new(&log, &config, "cpuload", PlotOptions::new("CPU").y_range(0.0, 1.0));
        plot.add_graph(vec![Series::field("load")], &["#ff0000"], &["CPU Load"], GraphOptions::PLAIN);
        plot.change_dataset("missing_topic", 0);
        plot.add_graph(vec![Series::field("x")], &["#00ff00"], &["X"], GraphOptions::PLAIN);
        plot.add_span("load", "#0000ff");
        let chart = plot.finalize().expect("chart");
        assert_eq!(chart.lines.len(), 1);
        assert_eq!(chart.y_range, (0.0, 1.0));
        assert!(chart.spans.is_empty());
    }

    #[test]
    fn test_derived_series_and_nan_markers() {
        let log = log_with(
            "vehicle_attitude",
            &[
                ("timestamp", vec![0.0, 1.0, 2.0]),
                ("roll", vec![0.0, f64::NAN, std::f64::consts::PI]),
            ],
        );
        let config = PlotConfig::default();
        let mut plot = DataPlot::new(&log, &config, "vehicle_attitude", PlotOptions::new("Roll").y_start(0.0));
        plot.add_graph(vec![Series::rad2deg("roll")], &["#ff0000"], &["Roll"], GraphOptions::MARK_NAN_STEP);
        let chart = plot.finalize().unwrap();
        let line = &chart.lines[0];
        assert!(line.step);
        assert_eq!(line.nan_markers, vec![1.0]);
        assert!((line.points[2].1 - 180.0).abs() < 1e-9);
        assert_eq!(chart.y_range.0, 0.0);
    }

    #[test]
    fn test_long_series_is_decimated() {
        let n = 10_000;
        let log = log_with(
            "sensor_combined",
            &[
                ("timestamp", (0..n).map(|i| i as f64).collect()),
                ("x", vec![1.0; n]),
            ],
        );
        let config = PlotConfig::default();
        let mut plot = DataPlot::new(&log, &config, "sensor_combined", PlotOptions::new("Accel"));
        plot.add_graph(vec![Series::field("x")], &["#ff0000"], &["X"], GraphOptions::PLAIN);
        let chart = plot.finalize().unwrap();
        assert_eq!(chart.lines[0].points.len(), n / 2);
    }

    #[test]
    fn test_span_at_mean() {
        let log = log_with("cpuload", &[("timestamp", vec![0.0, 1.0]), ("load", vec![0.2, 0.4])]);
        let config = PlotConfig::default();
        let mut plot = DataPlot::new(&log, &config, "cpuload", PlotOptions::new("CPU"));
        plot.add_graph(vec![Series::field("load")], &["#ff0000"], &["Load"], GraphOptions::PLAIN);
        plot.add_span("load", "#ff0000");
        let chart = plot.finalize().unwrap();
        assert!((chart.spans[0].y - 0.3).abs() < 1e-12);
    }
}
