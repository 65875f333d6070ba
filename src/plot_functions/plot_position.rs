// src/plot_functions/plot_position.rs

use crate::config::PlotHeight;
use crate::constants::{COLORS2, COLORS3, COLORS8, COLOR_GRAY};
use crate::plot_builders::data_plot::{GraphOptions, PlotOptions, Series};
use crate::plot_builders::data_plot_2d::DataPlot2D;
use crate::plot_builders::overlays::plot_map;
use crate::plot_functions::PlotContext;

/// Estimated, setpoint and groundtruth local position from above, with the
/// projected GPS track and mission setpoints. Returns true if the chart was
/// added.
pub fn plot_local_position_2d(ctx: &mut PlotContext) -> bool {
    let options = PlotOptions::new("Local Position")
        .x_label("[m]")
        .y_label("[m]")
        .height(PlotHeight::Large);
    let mut plot = DataPlot2D::new(ctx.log, ctx.config, "vehicle_local_position", options);
    plot.add_graph("y", "x", COLORS2[0], "Estimated", true);
    // Nothing else is drawn without a local position estimate
    if plot.had_error() {
        ctx.push(plot);
        return false;
    }
    plot.change_dataset("vehicle_local_position_setpoint", 0);
    plot.add_graph("y", "x", COLORS2[1], "Setpoint", false);
    plot.change_dataset("vehicle_local_position_groundtruth", 0);
    plot.add_graph("y", "x", COLOR_GRAY, "Groundtruth", false);
    plot_map(ctx.log, ctx.config, &mut plot, true);
    let before = ctx.charts.len();
    ctx.push(plot);
    ctx.charts.len() > before
}

pub fn plot_altitude(ctx: &mut PlotContext) {
    let mut plot = ctx.data_plot(
        "vehicle_gps_position",
        ctx.options("Altitude Estimate").y_label("[m]").height(PlotHeight::Normal),
    );
    plot.add_graph(vec![Series::scaled("alt", 0.001)], &COLORS8[0..1], &["GPS Altitude"], GraphOptions::PLAIN);
    plot.change_dataset(ctx.baro_topic(), 0);
    plot.add_graph(vec![Series::field("baro_alt_meter")], &COLORS8[1..2], &["Barometer Altitude"], GraphOptions::PLAIN);
    plot.change_dataset("vehicle_global_position", 0);
    plot.add_graph(vec![Series::field("alt")], &COLORS8[2..3], &["Fused Altitude Estimation"], GraphOptions::PLAIN);
    plot.change_dataset("position_setpoint_triplet", 0);
    plot.add_circle(
        vec![Series::field("current.alt")],
        &[ctx.config.mission_setpoint_color.as_str()],
        &["Altitude Setpoint"],
    );
    plot.change_dataset("actuator_controls_0", 0);
    plot.add_graph(vec![Series::scaled("control[3]", 100.0)], &COLORS8[6..7], &["Thrust [0, 100]"], GraphOptions::PLAIN);
    ctx.flight_modes_background(&mut plot);
    ctx.push(plot);
}

/// Local position X, Y and Z, each against its setpoint.
pub fn plot_local_position(ctx: &mut PlotContext) {
    for axis in ["x", "y", "z"] {
        let upper = axis.to_uppercase();
        let mut plot = ctx.data_plot(
            "vehicle_local_position",
            ctx.options(&format!("Local Position {upper}")).y_label("[m]"),
        );
        let estimated = format!("{upper} Estimated");
        let setpoint = format!("{upper} Setpoint");
        plot.add_graph(vec![Series::field(axis)], &COLORS2[0..1], &[estimated.as_str()], GraphOptions::MARK_NAN);
        plot.change_dataset("vehicle_local_position_setpoint", 0);
        plot.add_graph(vec![Series::field(axis)], &COLORS2[1..2], &[setpoint.as_str()], GraphOptions::STEP);
        ctx.flight_modes_background(&mut plot);
        ctx.push(plot);
    }
}

pub fn plot_velocity(ctx: &mut PlotContext) {
    let mut plot = ctx.data_plot("vehicle_local_position", ctx.options("Velocity").y_label("[m/s]"));
    plot.add_graph(
        vec![Series::field("vx"), Series::field("vy"), Series::field("vz")],
        &COLORS8[0..3],
        &["X", "Y", "Z"],
        GraphOptions::PLAIN,
    );
    plot.change_dataset("vehicle_local_position_setpoint", 0);
    plot.add_graph(
        vec![Series::field("vx"), Series::field("vy"), Series::field("vz")],
        &[COLORS8[5], COLORS8[4], COLORS8[6]],
        &["X Setpoint", "Y Setpoint", "Z Setpoint"],
        GraphOptions::STEP,
    );
    ctx.flight_modes_background(&mut plot);
    ctx.push(plot);
}

/// Visual odometry position, velocity, attitude and attitude rate against
/// groundtruth. Only drawn when the log has the odometry topic.
pub fn plot_visual_odometry(ctx: &mut PlotContext) {
    if !ctx.log.has_topic("vehicle_visual_odometry") {
        return;
    }

    let charts: [(&str, &str, [&str; 3], &str, [&str; 3], bool); 4] = [
        ("Visual Odometry Position", "[m]", ["x", "y", "z"], "vehicle_local_position_groundtruth", ["X", "Y", "Z"], false),
        ("Visual Odometry Velocity", "[m/s]", ["vx", "vy", "vz"], "vehicle_local_position_groundtruth", ["VX", "VY", "VZ"], false),
        ("Visual Odometry Attitude", "[deg]", ["roll", "pitch", "yaw"], "vehicle_attitude_groundtruth", ["Roll", "Pitch", "Yaw"], true),
        (
            "Visual Odometry Attitude Rate",
            "[deg/s]",
            ["rollspeed", "pitchspeed", "yawspeed"],
            "vehicle_attitude_groundtruth",
            ["Roll Rate", "Pitch Rate", "Yaw Rate"],
            true,
        ),
    ];

    for (title, unit, fields, groundtruth_topic, names, in_degrees) in charts {
        let series = || {
            fields
                .iter()
                .map(|f| if in_degrees { Series::rad2deg(f) } else { Series::field(f) })
                .collect::<Vec<Series>>()
        };
        let mut plot = ctx.data_plot("vehicle_visual_odometry", ctx.options(title).y_label(unit));
        plot.add_graph(series(), &COLORS3, &names, GraphOptions::MARK_NAN);
        ctx.flight_modes_background(&mut plot);

        let groundtruth_legends: Vec<String> = if in_degrees {
            names.iter().map(|n| format!("{n} Groundtruth")).collect()
        } else {
            names.iter().map(|n| format!("Groundtruth {n}")).collect()
        };
        let legends: Vec<&str> = groundtruth_legends.iter().map(String::as_str).collect();
        plot.change_dataset(groundtruth_topic, 0);
        plot.add_graph(series(), &COLORS8[2..5], &legends, GraphOptions::PLAIN);
        ctx.push(plot);
    }
}

/// Ground speed against indicated airspeed. Only drawn for VTOLs or when
/// an airspeed sensor was logged.
pub fn plot_airspeed(ctx: &mut PlotContext) {
    if !ctx.is_vtol() && !ctx.log.has_topic("airspeed") {
        return;
    }
    let mut plot = ctx.data_plot("vehicle_global_position", ctx.options("Airspeed").y_label("[m/s]"));
    let ground_speed = Series::derived("groundspeed_estimated", |d| {
        let vel_n = d.field("vel_n")?;
        let vel_e = d.field("vel_e")?;
        Ok(vel_n.iter().zip(vel_e.iter()).map(|(n, e)| n.hypot(*e)).collect())
    });
    plot.add_graph(vec![ground_speed], &COLORS3[0..1], &["Ground Speed Estimated"], GraphOptions::PLAIN);
    plot.change_dataset("airspeed", 0);
    plot.add_graph(vec![Series::field("indicated_airspeed_m_s")], &COLORS3[1..2], &["Airspeed Indicated"], GraphOptions::PLAIN);
    plot.change_dataset("vehicle_gps_position", 0);
    plot.add_graph(vec![Series::field("vel_m_s")], &COLORS3[2..3], &["Ground Speed (from GPS)"], GraphOptions::PLAIN);
    ctx.flight_modes_background(&mut plot);
    ctx.push(plot);
}
