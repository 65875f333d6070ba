// src/plot_functions/plot_attitude.rs

use crate::axis_names::{axis_letter, AXIS_FIELDS, AXIS_NAMES};
use crate::constants::{COLORS3, COLOR_GRAY};
use crate::data_input::flight_log::FlightLog;
use crate::plot_builders::data_plot::{DataPlot, GraphOptions, Series};
use crate::plot_functions::PlotContext;

/// Legend of the rate integral series. `MC_<X>R_INT_LIM` only exists on
/// multicopters and VTOLs, without it the scale factor is shown instead.
pub fn rate_integral_legend(log: &FlightLog, axis_index: usize) -> String {
    let param = format!("MC_{}R_INT_LIM", axis_letter(axis_index));
    let limit = match log.initial_parameters.get(&param) {
        Some(value) => {
            let scaled = value * 100.0;
            format!("[-{scaled:.0}, {scaled:.0}]")
        }
        None => "(*100)".to_string(),
    };
    format!("{} Rate Integral {}", AXIS_NAMES[axis_index], limit)
}

/// Estimated, setpoint and integral angular rate of one axis.
pub fn add_rate_graphs(plot: &mut DataPlot, log: &FlightLog, axis_index: usize) {
    let axis = AXIS_FIELDS[axis_index];
    let name = AXIS_NAMES[axis_index];
    plot.change_dataset("vehicle_attitude", 0);
    plot.add_graph(
        vec![Series::rad2deg(&format!("{axis}speed"))],
        &COLORS3[0..1],
        &[format!("{name} Rate Estimated").as_str()],
        GraphOptions::MARK_NAN,
    );
    plot.change_dataset("vehicle_rates_setpoint", 0);
    plot.add_graph(
        vec![Series::rad2deg(axis)],
        &COLORS3[1..2],
        &[format!("{name} Rate Setpoint").as_str()],
        GraphOptions::MARK_NAN_STEP,
    );
    plot.change_dataset("rate_ctrl_status", 0);
    plot.add_graph(
        vec![Series::scaled(&format!("{axis}speed_integ"), 100.0)],
        &COLORS3[2..3],
        &[rate_integral_legend(log, axis_index).as_str()],
        GraphOptions::PLAIN,
    );
}

/// Angle and angular rate charts for roll, pitch and yaw.
pub fn plot_attitude(ctx: &mut PlotContext) {
    for (axis_index, (&axis, &name)) in AXIS_FIELDS.iter().zip(AXIS_NAMES.iter()).enumerate() {
        let mut plot = ctx.data_plot("vehicle_attitude", ctx.options(&format!("{name} Angle")).y_label("[deg]"));
        plot.add_graph(
            vec![Series::rad2deg(axis)],
            &COLORS3[0..1],
            &[format!("{name} Estimated").as_str()],
            GraphOptions::MARK_NAN,
        );
        plot.change_dataset("vehicle_attitude_setpoint", 0);
        plot.add_graph(
            vec![Series::rad2deg(&format!("{axis}_d"))],
            &COLORS3[1..2],
            &[format!("{name} Setpoint").as_str()],
            GraphOptions::STEP,
        );
        if axis == "yaw" {
            plot.add_graph(
                vec![Series::rad2deg("yaw_sp_move_rate")],
                &COLORS3[2..3],
                &["Yaw FF Setpoint [deg/s]"],
                GraphOptions::STEP,
            );
        }
        plot.change_dataset("vehicle_attitude_groundtruth", 0);
        plot.add_graph(
            vec![Series::rad2deg(axis)],
            &[COLOR_GRAY],
            &[format!("{name} Groundtruth").as_str()],
            GraphOptions::PLAIN,
        );
        ctx.flight_modes_background(&mut plot);
        ctx.push(plot);

        let mut plot = ctx.data_plot("vehicle_attitude", ctx.options(&format!("{name} Angular Rate")).y_label("[deg/s]"));
        add_rate_graphs(&mut plot, ctx.log, axis_index);
        plot.change_dataset("vehicle_attitude_groundtruth", 0);
        plot.add_graph(
            vec![Series::rad2deg(&format!("{axis}speed"))],
            &[COLOR_GRAY],
            &[format!("{name} Rate Groundtruth").as_str()],
            GraphOptions::PLAIN,
        );
        ctx.flight_modes_background(&mut plot);
        ctx.push(plot);
    }
}
