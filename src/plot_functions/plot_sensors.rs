// src/plot_functions/plot_sensors.rs

use crate::config::PlotHeight;
use crate::constants::{COLORS2, COLORS3, COLORS8};
use crate::data_input::flight_log::Dataset;
use crate::error::Result;
use crate::plot_builders::data_plot::{GraphOptions, PlotOptions, Series};
use crate::plot_builders::data_plot_spec::DataPlotSpec;
use crate::plot_functions::PlotContext;

/// Euclidean norm of `prefix[0..3]`.
fn vector_norm(d: &Dataset, prefix: &str) -> Result<Vec<f64>> {
    let x = d.field(&format!("{prefix}[0]"))?;
    let y = d.field(&format!("{prefix}[1]"))?;
    let z = d.field(&format!("{prefix}[2]"))?;
    Ok(x.iter()
        .zip(y.iter())
        .zip(z.iter())
        .map(|((x, y), z)| (x * x + y * y + z * z).sqrt())
        .collect())
}

fn xyz_fields(prefix: &str) -> Vec<Series<'static>> {
    (0..3).map(|i| Series::field(&format!("{prefix}[{i}]"))).collect()
}

/// Raw IMU, magnetometer, distance sensor and GPS quality charts.
pub fn plot_sensors(ctx: &mut PlotContext) {
    let mut plot = ctx.data_plot("sensor_combined", ctx.options("Raw Acceleration").y_label("[m/s^2]"));
    plot.add_graph(xyz_fields("accelerometer_m_s2"), &COLORS3, &["X", "Y", "Z"], GraphOptions::PLAIN);
    ctx.push(plot);

    let mut plot = ctx.data_plot(
        "sensor_combined",
        ctx.options("Raw Angular Speed (Gyroscope)").y_label("[deg/s]"),
    );
    plot.add_graph(
        (0..3).map(|i| Series::rad2deg(&format!("gyro_rad[{i}]"))).collect(),
        &COLORS3,
        &["X", "Y", "Z"],
        GraphOptions::PLAIN,
    );
    ctx.push(plot);

    let mut plot = ctx.data_plot(
        ctx.magnetometer_topic(),
        ctx.options("Raw Magnetic Field Strength").y_label("[gauss]"),
    );
    plot.add_graph(xyz_fields("magnetometer_ga"), &COLORS3, &["X", "Y", "Z"], GraphOptions::PLAIN);
    ctx.push(plot);

    let mut plot = ctx.data_plot("distance_sensor", ctx.options("Distance Sensor").y_label("[m]").y_start(0.0));
    plot.add_graph(
        vec![Series::field("current_distance"), Series::field("covariance")],
        &COLORS3[0..2],
        &["Distance", "Covariance"],
        GraphOptions::PLAIN,
    );
    ctx.push(plot);

    // Accuracy values get huge without a fix
    let mut plot = ctx.data_plot("vehicle_gps_position", ctx.options("GPS Uncertainty").y_range(0.0, 40.0));
    plot.add_graph(
        vec![
            Series::field("eph"),
            Series::field("epv"),
            Series::field("satellites_used"),
            Series::field("fix_type"),
        ],
        &[COLORS8[0], COLORS8[2], COLORS8[4], COLORS8[6]],
        &[
            "Horizontal position accuracy [m]",
            "Vertical position accuracy [m]",
            "Num Satellites used",
            "GPS Fix",
        ],
        GraphOptions::PLAIN,
    );
    ctx.push(plot);

    let mut plot = ctx.data_plot("vehicle_gps_position", ctx.options("GPS Noise & Jamming").y_start(0.0));
    plot.add_graph(
        vec![Series::field("noise_per_ms"), Series::field("jamming_indicator")],
        &COLORS3[0..2],
        &["Noise per ms", "Jamming Indicator"],
        GraphOptions::PLAIN,
    );
    ctx.push(plot);

    let mut plot = ctx.data_plot(ctx.magnetometer_topic(), ctx.options("Thrust and Magnetic Field").y_start(0.0));
    plot.add_graph(
        vec![Series::derived("len_mag", |d| vector_norm(d, "magnetometer_ga"))],
        &COLORS2[0..1],
        &["Norm of Magnetic Field"],
        GraphOptions::PLAIN,
    );
    plot.change_dataset("actuator_controls_0", 0);
    plot.add_graph(vec![Series::field("control[3]")], &COLORS2[1..2], &["Thrust"], GraphOptions::PLAIN);
    ctx.push(plot);

    plot_acceleration_spectrogram(ctx);
}

fn plot_acceleration_spectrogram(ctx: &mut PlotContext) {
    let options = PlotOptions::new("Acceleration Power Spectral Density")
        .y_label("[Hz]")
        .height(PlotHeight::Small)
        .x_range(Some(ctx.x_range));
    let mut plot = DataPlotSpec::new(ctx.log, ctx.config, "sensor_combined", options);
    plot.add_graph(
        &["accelerometer_m_s2[0]", "accelerometer_m_s2[1]", "accelerometer_m_s2[2]"],
        &["X", "Y", "Z"],
    );
    ctx.push(plot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlotConfig;
    use crate::data_input::flight_log::FlightLog;

    #[test]
    fn test_vector_norm() {
        let mut d = Dataset::new("vehicle_magnetometer", 0);
        d.data.insert("magnetometer_ga[0]".into(), vec![3.0, 0.0]);
        d.data.insert("magnetometer_ga[1]".into(), vec![4.0, 0.0]);
        d.data.insert("magnetometer_ga[2]".into(), vec![0.0, 2.0]);
        assert_eq!(vector_norm(&d, "magnetometer_ga").unwrap(), vec![5.0, 2.0]);
    }

    #[test]
    fn test_old_logs_use_sensor_combined() {
        let mut d = Dataset::new("sensor_combined", 0);
        d.data.insert("timestamp".into(), vec![0.0, 1e6]);
        for i in 0..3 {
            d.data.insert(format!("magnetometer_ga[{i}]"), vec![0.1, 0.2]);
        }
        let log = FlightLog::new("test", vec![d]);
        let config = PlotConfig::default();
        let mut ctx = PlotContext::new(&log, &config);
        assert_eq!(ctx.magnetometer_topic(), "sensor_combined");
        plot_sensors(&mut ctx);
        let titles: Vec<&str> = ctx.charts.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Raw Magnetic Field Strength", "Thrust and Magnetic Field"]);
    }
}
