// src/plot_functions/plot_inputs.rs

use crate::constants::{COLORS3, COLORS8};
use crate::data_input::flight_log::FlightLog;
use crate::plot_builders::data_plot::{GraphOptions, Series};
use crate::plot_builders::data_plot_fft::DataPlotFft;
use crate::plot_functions::PlotContext;

const MAX_RC_CHANNELS: usize = 8;
const MAX_ACTUATOR_OUTPUTS: usize = 8;

/// Functions mapped to an RC channel through the `RC_MAP_*` parameters,
/// e.g. `["Throttle"]` for `RC_MAP_THROTTLE = channel + 1`.
pub fn configured_rc_input_names(log: &FlightLog, channel: usize) -> Vec<String> {
    log.initial_parameters
        .iter()
        .filter(|(name, value)| name.starts_with("RC_MAP_") && **value == (channel + 1) as f64)
        .map(|(name, _)| capitalize(&name["RC_MAP_".len()..]))
        .collect()
}

fn capitalize(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Manual control setpoints, or the raw RC channels for logs without
/// `manual_control_setpoint`.
pub fn plot_manual_control(ctx: &mut PlotContext) {
    if ctx.log.has_topic("manual_control_setpoint") {
        let mut plot = ctx.data_plot(
            "manual_control_setpoint",
            ctx.options("Manual Control Inputs (Radio or Joystick)").y_range(-1.1, 1.1),
        );
        let kill_switch = Series::derived("kill_switch", |d| {
            Ok(d.field("kill_switch")?.iter().map(|&v| if v == 1.0 { 1.0 } else { 0.0 }).collect())
        });
        plot.add_graph(
            vec![
                Series::field("y"),
                Series::field("x"),
                Series::field("r"),
                Series::field("z"),
                Series::scaled("mode_slot", 1.0 / 6.0),
                Series::field("aux1"),
                Series::field("aux2"),
                kill_switch,
            ],
            &COLORS8,
            &["Y / Roll", "X / Pitch", "Yaw", "Throttle [0, 1]", "Flight Mode", "Aux1", "Aux2", "Kill Switch"],
            GraphOptions::PLAIN,
        );
        ctx.flight_modes_background(&mut plot);
        ctx.push(plot);
        return;
    }

    let mut plot = ctx.data_plot("rc_channels", ctx.options("Raw Radio Control Inputs").y_range(-1.1, 1.1));
    let num_channels = plot
        .dataset()
        .and_then(|d| d.field_max("channel_count").ok())
        .map_or(MAX_RC_CHANNELS, |max| (max.max(0.0) as usize).min(MAX_RC_CHANNELS));
    let legends: Vec<String> = (0..num_channels)
        .map(|i| {
            let names = configured_rc_input_names(ctx.log, i);
            if names.is_empty() {
                format!("Channel {i}")
            } else {
                format!("Channel {i} ({})", names.join(", "))
            }
        })
        .collect();
    let legends: Vec<&str> = legends.iter().map(String::as_str).collect();
    let fields: Vec<Series> = (0..num_channels)
        .map(|i| Series::field(&format!("channels[{i}]")))
        .collect();
    plot.add_graph(fields, &COLORS8[..num_channels], &legends, GraphOptions::MARK_NAN);
    ctx.flight_modes_background(&mut plot);
    ctx.push(plot);
}

fn plot_actuator_controls(ctx: &mut PlotContext, topic: &str, title: &str) {
    let mut plot = ctx.data_plot(topic, ctx.options(title).y_start(0.0));
    plot.add_graph(
        ["control[0]", "control[1]", "control[2]", "control[3]"]
            .iter()
            .map(|f| Series::field(f))
            .collect(),
        &COLORS8[0..4],
        &["Roll", "Pitch", "Yaw", "Thrust"],
        GraphOptions::MARK_NAN,
    );
    ctx.flight_modes_background(&mut plot);
    ctx.push(plot);
}

/// Spectrum of the attitude controls, with the D-term and gyro filter
/// cutoffs marked.
fn plot_actuator_controls_fft(ctx: &mut PlotContext) {
    let mut plot = DataPlotFft::new(ctx.log, ctx.config, "actuator_controls_0", "Actuator Controls FFT");
    plot.add_graph(&["control[0]", "control[1]", "control[2]"], &COLORS3, &["Roll", "Pitch", "Yaw"]);
    if !plot.had_error() {
        if let Some(cutoff) = ctx.initial_parameter("MC_DTERM_CUTOFF") {
            plot.mark_frequency(cutoff, "MC_DTERM_CUTOFF", 0);
        }
        if let Some(cutoff) = ctx.initial_parameter("IMU_GYRO_CUTOFF") {
            plot.mark_frequency(cutoff, "IMU_GYRO_CUTOFF", 20);
        }
    }
    ctx.push(plot);
}

/// Main (instance 0) or AUX (instance 1) actuator outputs. The AUX chart is
/// only drawn if at least one output changes.
fn plot_actuator_outputs(ctx: &mut PlotContext, instance: u32, title: &str, skip_if_constant: bool) {
    let mut plot = ctx.data_plot("actuator_outputs", ctx.options(title).y_start(0.0).topic_instance(instance));
    let num_outputs = plot
        .dataset()
        .and_then(|d| d.field_max("noutputs").ok())
        .map_or(MAX_ACTUATOR_OUTPUTS, |max| (max.max(0.0) as usize).min(MAX_ACTUATOR_OUTPUTS));
    if skip_if_constant {
        let Some(dataset) = plot.dataset() else {
            return;
        };
        let all_constant = (0..num_outputs).all(|i| match dataset.field(&format!("output[{i}]")) {
            Ok(values) => values.iter().all(|v| *v == values[0]),
            Err(_) => true,
        });
        if all_constant {
            return;
        }
    }
    let legends: Vec<String> = (0..num_outputs).map(|i| format!("Output {i}")).collect();
    let legends: Vec<&str> = legends.iter().map(String::as_str).collect();
    let fields: Vec<Series> = (0..num_outputs)
        .map(|i| Series::field(&format!("output[{i}]")))
        .collect();
    plot.add_graph(fields, &COLORS8[..num_outputs], &legends, GraphOptions::MARK_NAN);
    ctx.flight_modes_background(&mut plot);
    ctx.push(plot);
}

/// Actuator controls, their spectrum, and the actuator outputs.
pub fn plot_actuators(ctx: &mut PlotContext) {
    plot_actuator_controls(ctx, "actuator_controls_0", "Actuator Controls 0");
    plot_actuator_controls_fft(ctx);
    // Only present on VTOL and fixed-wing setups
    plot_actuator_controls(ctx, "actuator_controls_1", "Actuator Controls 1 (VTOL in Fixed-Wing mode)");
    plot_actuator_outputs(ctx, 0, "Actuator Outputs (Main)", false);
    plot_actuator_outputs(ctx, 1, "Actuator Outputs (AUX)", true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlotConfig;
    use crate::data_input::flight_log::Dataset;

    #[test]
    fn test_configured_rc_input_names() {
        let mut log = FlightLog::new("test", Vec::new());
        log.initial_parameters.insert("RC_MAP_THROTTLE".into(), 3.0);
        log.initial_parameters.insert("RC_MAP_KILL_SW".into(), 3.0);
        log.initial_parameters.insert("RC_MAP_ROLL".into(), 1.0);
        assert_eq!(configured_rc_input_names(&log, 2), vec!["Kill_sw", "Throttle"]);
        assert_eq!(configured_rc_input_names(&log, 0), vec!["Roll"]);
        assert!(configured_rc_input_names(&log, 5).is_empty());
    }

    #[test]
    fn test_rc_channels_limited_by_channel_count() {
        let mut d = Dataset::new("rc_channels", 0);
        d.data.insert("timestamp".into(), vec![0.0, 1e6]);
        d.data.insert("channel_count".into(), vec![4.0, 4.0]);
        for i in 0..8 {
            d.data.insert(format!("channels[{i}]"), vec![0.0, 0.5]);
        }
        let log = FlightLog::new("test", vec![d]);
        let config = PlotConfig::default();
        let mut ctx = PlotContext::new(&log, &config);
        plot_manual_control(&mut ctx);
        assert_eq!(ctx.charts.len(), 1);
        assert_eq!(ctx.charts[0].lines.len(), 4);
        assert_eq!(ctx.charts[0].y_range, (-1.1, 1.1));
    }

    #[test]
    fn test_constant_aux_outputs_are_skipped() {
        let mut main = Dataset::new("actuator_outputs", 0);
        let mut aux = Dataset::new("actuator_outputs", 1);
        for d in [&mut main, &mut aux] {
            d.data.insert("timestamp".into(), vec![0.0, 1e6, 2e6]);
            d.data.insert("noutputs".into(), vec![2.0, 2.0, 2.0]);
            d.data.insert("output[0]".into(), vec![900.0, 900.0, 900.0]);
            d.data.insert("output[1]".into(), vec![900.0, 900.0, 900.0]);
        }
        main.data.insert("output[1]".into(), vec![1000.0, 1500.0, 1200.0]);
        let log = FlightLog::new("test", vec![main, aux]);
        let config = PlotConfig::default();
        let mut ctx = PlotContext::new(&log, &config);
        plot_actuator_outputs(&mut ctx, 0, "Actuator Outputs (Main)", false);
        plot_actuator_outputs(&mut ctx, 1, "Actuator Outputs (AUX)", true);
        assert_eq!(ctx.charts.len(), 1);
        assert_eq!(ctx.charts[0].lines.len(), 2);
        assert_eq!(ctx.charts[0].y_range.0, 0.0);
    }
}
