// src/plot_functions/plot_pid_analysis.rs

use tracing::{info, warn};

use crate::axis_names::{AXIS_FIELDS, AXIS_NAMES};
use crate::config::{PlotConfig, PlotHeight};
use crate::constants::{
    COLOR_GRAY, COLOR_STEP_RESPONSE_HIGH_SP, COLOR_STEP_RESPONSE_LOW_SP, COLOR_THRUST_PATCH, RESPONSE_LENGTH_S,
    SETPOINT_THRESHOLD, THRUST_PATCH_ALPHA,
};
use crate::data_analysis::calc_step_response::{calculate_delay_time, find_peak_value, StepResponse, Trace};
use crate::data_analysis::resample::resample;
use crate::data_input::flight_log::{Dataset, FlightLog};
use crate::error::Result;
use crate::plot_builders::data_plot::decimation_step;
use crate::plot_builders::overlays::plot_flight_modes_background;
use crate::plot_framework::{calculate_range, ChartDescriptor, ChartKind, HorizontalSpan, LineData};
use crate::plot_functions::plot_attitude::add_rate_graphs;
use crate::plot_functions::PlotContext;

pub const MISSING_TOPICS_HTML: &str = "<p><b>Error</b>: missing topics or data for PID analysis \
(required topics: rate_ctrl_status, vehicle_rates_setpoint, vehicle_attitude, \
vehicle_attitude_setpoint and actuator_controls_0).</p>";

pub const ANALYSIS_FAILED_HTML: &str = "<p><b>Error</b>: PID analysis failed. Possible error causes \
are: logged data rate is too low, there is not enough motion for the analysis or simply a bug in \
the code.</p>";

// Upper end of the thrust patch drawn behind the rate charts
const THRUST_MAX: f64 = 200.0;

/// Topics the step response estimation needs, all on instance 0.
struct PidInputs<'a> {
    rate_ctrl_status: &'a Dataset,
    vehicle_attitude: &'a Dataset,
    vehicle_rates_setpoint: &'a Dataset,
    vehicle_attitude_setpoint: &'a Dataset,
    actuator_controls_0: &'a Dataset,
}

impl<'a> PidInputs<'a> {
    fn load(log: &'a FlightLog) -> Result<Self> {
        let inputs = Self {
            rate_ctrl_status: log.get_dataset("rate_ctrl_status", 0)?,
            vehicle_attitude: log.get_dataset("vehicle_attitude", 0)?,
            vehicle_rates_setpoint: log.get_dataset("vehicle_rates_setpoint", 0)?,
            vehicle_attitude_setpoint: log.get_dataset("vehicle_attitude_setpoint", 0)?,
            actuator_controls_0: log.get_dataset("actuator_controls_0", 0)?,
        };
        // Fail early if the throttle can not be resampled
        inputs.throttle_at(inputs.rate_ctrl_status.timestamps()?)?;
        Ok(inputs)
    }

    /// Throttle in percent at the given timestamps.
    fn throttle_at(&self, timestamps: &[f64]) -> Result<Vec<f64>> {
        let time = self.actuator_controls_0.timestamps()?;
        let thrust: Vec<f64> = self
            .actuator_controls_0
            .field("control[3]")?
            .iter()
            .map(|v| v * 100.0)
            .collect();
        resample(time, &thrust, timestamps)
    }

    /// Measured body rate against the rate setpoint, in deg/s.
    fn rate_trace(&self, axis_index: usize) -> Result<Trace> {
        let axis = AXIS_FIELDS[axis_index];
        let gyro_time = self.rate_ctrl_status.timestamps()?;
        let gyro_rate: Vec<f64> = self
            .rate_ctrl_status
            .field(&format!("{axis}speed"))?
            .iter()
            .map(|v| v.to_degrees())
            .collect();
        let setpoint_deg: Vec<f64> = self.vehicle_rates_setpoint.field(axis)?.iter().map(|v| v.to_degrees()).collect();
        let setpoint = resample(self.vehicle_rates_setpoint.timestamps()?, &setpoint_deg, gyro_time)?;
        Trace::new(axis, seconds(gyro_time), gyro_rate, setpoint, self.throttle_at(gyro_time)?)
    }

    /// Estimated attitude against the attitude setpoint, in deg.
    fn angle_trace(&self, axis_index: usize) -> Result<Trace> {
        let axis = AXIS_FIELDS[axis_index];
        let attitude_time = self.vehicle_attitude.timestamps()?;
        let attitude: Vec<f64> = self.vehicle_attitude.field(axis)?.iter().map(|v| v.to_degrees()).collect();
        let setpoint_deg: Vec<f64> = self
            .vehicle_attitude_setpoint
            .field(&format!("{axis}_d"))?
            .iter()
            .map(|v| v.to_degrees())
            .collect();
        let setpoint = resample(self.vehicle_attitude_setpoint.timestamps()?, &setpoint_deg, attitude_time)?;
        Trace::new(axis, seconds(attitude_time), attitude, setpoint, self.throttle_at(attitude_time)?)
    }
}

fn seconds(timestamps_us: &[f64]) -> Vec<f64> {
    timestamps_us.iter().map(|t| t / 1e6).collect()
}

/// Thrust as a polygon that closes at zero, decimated like a line series.
pub fn thrust_patch(timestamps: &[f64], control: &[f64], max_points: usize) -> (Vec<f64>, Vec<f64>) {
    let step = decimation_step(timestamps.len(), max_points);
    let mut times: Vec<f64> = timestamps.iter().step_by(step).copied().collect();
    let mut thrust: Vec<f64> = control.iter().step_by(step).map(|v| v * THRUST_MAX).collect();
    if let (Some(&first), Some(&last)) = (times.first(), times.last()) {
        times.insert(0, first);
        times.push(last);
        thrust.insert(0, 0.0);
        thrust.push(0.0);
    }
    (times, thrust)
}

/// Step response chart of one trace, `label` is `Rate` or `Angle`.
pub fn step_response_chart(config: &PlotConfig, axis_name: &str, label: &str, response: &StepResponse) -> ChartDescriptor {
    let mut chart = ChartDescriptor::new(
        &format!("{axis_name} {label} Step Response"),
        ChartKind::StepResponse,
        PlotHeight::Small,
        config.plot_width,
        config.height_px(PlotHeight::Small),
    );
    chart.x_label = "Time [s]".to_string();
    chart.y_label = "Strength".to_string();

    let mut peak_max: f64 = 1.0;
    let variants = [
        (&response.low_input, response.num_windows_low, "<", COLOR_STEP_RESPONSE_LOW_SP),
        (&response.high_input, response.num_windows_high, ">=", COLOR_STEP_RESPONSE_HIGH_SP),
    ];
    for (values, windows, comparison, color) in variants {
        let Some(values) = values else {
            continue;
        };
        let mut legend = format!("{comparison} {SETPOINT_THRESHOLD:.0} deg/s ({windows} windows)");
        if let Some(peak) = find_peak_value(values) {
            legend.push_str(&format!(", peak {peak:.2}"));
            peak_max = peak_max.max(peak);
        }
        if let Some(delay) = calculate_delay_time(&response.time_s, values) {
            legend.push_str(&format!(", rise {:.0} ms", delay * 1000.0));
        }
        chart.lines.push(LineData {
            label: legend,
            color: color.to_string(),
            points: response.time_s.iter().copied().zip(values.iter().copied()).collect(),
            step: false,
            nan_markers: Vec::new(),
        });
    }
    chart.spans.push(HorizontalSpan {
        y: 1.0,
        color: COLOR_GRAY.to_string(),
    });
    chart.x_range = (0.0, RESPONSE_LENGTH_S);
    chart.y_range = (0.0, calculate_range(0.0, peak_max).1);
    chart
}

fn rate_chart(ctx: &mut PlotContext, axis_index: usize) {
    let name = AXIS_NAMES[axis_index];
    let mut plot = ctx.data_plot(
        "actuator_controls_0",
        ctx.options(&format!("{name} Angular Rate")).y_label("[deg/s]").changed_params(None),
    );
    // Without actuator controls there is nothing to put the rates on
    let Some(controls) = plot.dataset() else {
        ctx.push(plot);
        return;
    };
    if let (Ok(time), Ok(control)) = (controls.timestamps(), controls.field("control[3]")) {
        let (times, thrust) = thrust_patch(time, control, ctx.config.max_num_data_points());
        plot.add_patch(
            &times,
            &thrust,
            COLOR_THRUST_PATCH,
            THRUST_PATCH_ALPHA,
            &format!("Thrust [0, {THRUST_MAX:.0}]"),
        );
    }
    add_rate_graphs(&mut plot, ctx.log, axis_index);
    plot_flight_modes_background(&mut plot, &ctx.flight_modes, None);
    ctx.push(plot);
}

/// Builds the rate and step response charts of the PID analysis page.
/// Returns the error panel to show on top of the page, if any.
pub fn plot_pid_analysis(ctx: &mut PlotContext) -> Option<&'static str> {
    let inputs = match PidInputs::load(ctx.log) {
        Ok(inputs) => Some(inputs),
        Err(e) => {
            warn!("PID analysis disabled: {}", e);
            None
        }
    };
    let mut error_panel = if inputs.is_none() { Some(MISSING_TOPICS_HTML) } else { None };

    for axis_index in 0..AXIS_FIELDS.len() {
        rate_chart(ctx, axis_index);
        if error_panel.is_some() {
            continue;
        }
        let Some(inputs) = inputs.as_ref() else {
            continue;
        };
        match inputs.rate_trace(axis_index).and_then(|trace| trace.step_response()) {
            Ok(response) => {
                info!("{} rate step response from {} windows", AXIS_NAMES[axis_index], response.num_windows_low + response.num_windows_high);
                ctx.charts.push(step_response_chart(ctx.config, AXIS_NAMES[axis_index], "Rate", &response));
            }
            Err(e) => {
                warn!("{} rate step response failed: {}", AXIS_NAMES[axis_index], e);
                error_panel = Some(ANALYSIS_FAILED_HTML);
            }
        }
    }

    // Yaw is mostly controlled directly by rate
    for axis_index in 0..2 {
        if error_panel.is_some() {
            break;
        }
        let Some(inputs) = inputs.as_ref() else {
            break;
        };
        match inputs.angle_trace(axis_index).and_then(|trace| trace.step_response()) {
            Ok(response) => {
                ctx.charts.push(step_response_chart(ctx.config, AXIS_NAMES[axis_index], "Angle", &response));
            }
            Err(e) => {
                warn!("{} angle step response failed: {}", AXIS_NAMES[axis_index], e);
                error_panel = Some(ANALYSIS_FAILED_HTML);
            }
        }
    }
    error_panel
}
