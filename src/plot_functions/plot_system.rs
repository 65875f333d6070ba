// src/plot_functions/plot_system.rs

use tracing::debug;

use crate::constants::{COLORS3, COLORS8};
use crate::data_analysis::derivative::first_difference;
use crate::error::Result;
use crate::plot_builders::data_plot::{GraphOptions, Series};
use crate::plot_builders::overlays::plot_dropouts;
use crate::plot_functions::PlotContext;

// Rails that are not measured are logged as zero
const MIN_RAIL_VOLTAGE: f64 = 0.0001;
const MAX_WATCHDOG_SERIES: usize = 8;

pub fn plot_power(ctx: &mut PlotContext) {
    let mut plot = ctx.data_plot("battery_status", ctx.options("Power").y_start(0.0));
    plot.add_graph(
        vec![
            Series::field("voltage_v"),
            Series::field("voltage_filtered_v"),
            Series::field("current_a"),
            Series::scaled("discharged_mah", 0.01),
            Series::scaled("remaining", 10.0),
        ],
        &[COLORS8[0], COLORS8[2], COLORS8[4], COLORS8[6], COLORS8[1]],
        &[
            "Battery Voltage [V]",
            "Battery Voltage filtered [V]",
            "Battery Current [A]",
            "Discharged Amount [mAh / 100]",
            "Battery remaining [0=empty, 10=full]",
        ],
        GraphOptions::PLAIN,
    );
    plot.change_dataset("system_power", 0);
    if let Some(dataset) = plot.dataset() {
        for (field, color, legend) in [("voltage5v_v", COLORS8[7], "5 V"), ("voltage3v3_v", COLORS8[5], "3.3 V")] {
            if dataset.field_max(field).map_or(false, |max| max > MIN_RAIL_VOLTAGE) {
                plot.add_graph(vec![Series::field(field)], &[color], &[legend], GraphOptions::PLAIN);
            }
        }
    }
    ctx.push(plot);
}

/// Estimator health and innovation check flags as `(label, values)`,
/// decoded from the `estimator_status` flag words.
pub fn estimator_flags(ctx: &PlotContext) -> Result<Vec<(&'static str, Vec<f64>)>> {
    let status = ctx.log.get_dataset("estimator_status", 0)?;
    let health = status.field("health_flags")?.to_vec();
    let timeout = status.field("timeout_flags")?.to_vec();
    let innovation = status.field("innovation_check_flags")?;
    let bits = |shift: u32, mask: u64| -> Vec<f64> {
        innovation
            .iter()
            .map(|&v| if v.is_finite() { (((v as u64) >> shift) & mask) as f64 } else { f64::NAN })
            .collect()
    };
    Ok(vec![
        ("Health Flags (vel, pos, hgt)", health),
        ("Timeout Flags (vel, pos, hgt)", timeout),
        ("Velocity Check Bit", bits(0, 0x1)),
        ("Horizontal Position Check Bit", bits(1, 1)),
        ("Vertical Position Check Bit", bits(2, 1)),
        ("Mag X, Y, Z Check Bits", bits(3, 0x7)),
        ("Yaw Check Bit", bits(6, 1)),
        ("Airspeed Check Bit", bits(7, 1)),
        ("Synthetic Sideslip Check Bit", bits(8, 1)),
        ("Height to Ground Check Bit", bits(9, 1)),
        ("Optical Flow X, Y Check Bits", bits(10, 0x3)),
    ])
}

/// Flags with any non-zero sample, at most eight. With none raised the
/// health flags are shown so that the chart still tells that the topic was
/// logged.
pub fn plot_estimator_watchdog(ctx: &mut PlotContext) {
    let flags = match estimator_flags(ctx) {
        Ok(flags) => flags,
        Err(e) => {
            debug!("Estimator watchdog: {}", e);
            ctx.skipped.push(format!("Estimator Watchdog: {e}"));
            return;
        }
    };
    let mut raised: Vec<(&str, Vec<f64>)> = flags
        .iter()
        .filter(|(_, values)| values.iter().any(|v| *v > 0.1))
        .take(MAX_WATCHDOG_SERIES)
        .cloned()
        .collect();
    if raised.is_empty() {
        raised.extend(flags.into_iter().take(1));
    }

    let mut plot = ctx.data_plot("estimator_status", ctx.options("Estimator Watchdog").y_start(0.0));
    let labels: Vec<&str> = raised.iter().map(|(label, _)| *label).collect();
    let series: Vec<Series> = raised
        .into_iter()
        .enumerate()
        .map(|(i, (_, values))| Series::derived(&format!("flags_{i}"), move |_| Ok(values.clone())))
        .collect();
    plot.add_graph(series, &COLORS8[..labels.len()], &labels, GraphOptions::PLAIN);
    ctx.push(plot);
}

pub fn plot_rc_quality(ctx: &mut PlotContext) {
    let mut plot = ctx.data_plot("input_rc", ctx.options("RC Quality").y_range(0.0, 1.0));
    plot.add_graph(
        vec![Series::scaled("rssi", 0.01), Series::field("rc_lost")],
        &COLORS3[0..2],
        &["RSSI [0, 1]", "RC Lost (Indicator)"],
        GraphOptions::PLAIN,
    );
    plot.change_dataset("vehicle_status", 0);
    plot.add_graph(vec![Series::field("rc_signal_lost")], &COLORS3[2..3], &["RC Lost (Detected)"], GraphOptions::PLAIN);
    ctx.push(plot);
}

pub fn plot_cpu(ctx: &mut PlotContext) {
    let mut plot = ctx.data_plot("cpuload", ctx.options("CPU & RAM").y_range(0.0, 1.0));
    plot.add_graph(
        vec![Series::field("ram_usage"), Series::field("load")],
        &[COLORS3[1], COLORS3[2]],
        &["RAM Usage", "CPU Load"],
        GraphOptions::PLAIN,
    );
    plot.add_span("load", COLORS3[2]);
    plot.add_span("ram_usage", COLORS3[1]);
    ctx.flight_modes_background(&mut plot);
    ctx.push(plot);
}

/// Time between logged sensor samples and the estimator time slip, with
/// the logging dropouts. Skipped entirely without `sensor_combined`.
pub fn plot_sampling_regularity(ctx: &mut PlotContext) {
    let Ok(sensor_combined) = ctx.log.get_dataset("sensor_combined", 0) else {
        return;
    };
    let Ok(timestamps) = sensor_combined.timestamps() else {
        return;
    };
    let mut sampling_diff = first_difference(timestamps);
    let Some(min_sampling_diff) = sampling_diff.iter().copied().filter(|v| v.is_finite()).reduce(f64::min) else {
        return;
    };
    sampling_diff.push(0.0);

    let mut plot = ctx.data_plot(
        "sensor_combined",
        ctx.options("Sampling Regularity of Sensor Data")
            .y_label("[us]")
            .y_range(0.0, 25e3),
    );
    plot_dropouts(&mut plot, &ctx.log.dropouts, min_sampling_diff);
    plot.add_graph(
        vec![Series::derived("timediff", move |_| Ok(sampling_diff.clone()))],
        &COLORS3[2..3],
        &["delta t (between 2 logged samples)"],
        GraphOptions::PLAIN,
    );
    plot.change_dataset("estimator_status", 0);
    plot.add_graph(
        vec![Series::scaled("time_slip", 1e6)],
        &COLORS3[1..2],
        &["Estimator time slip (cumulative)"],
        GraphOptions::PLAIN,
    );
    ctx.push(plot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlotConfig;
    use crate::data_input::flight_log::{Dataset, Dropout, FlightLog};

    fn estimator_log(innovation: Vec<f64>) -> FlightLog {
        let n = innovation.len();
        let mut d = Dataset::new("estimator_status", 0);
        d.data.insert("timestamp".into(), (0..n).map(|i| i as f64 * 1e5).collect());
        d.data.insert("health_flags".into(), vec![0.0; n]);
        d.data.insert("timeout_flags".into(), vec![0.0; n]);
        d.data.insert("innovation_check_flags".into(), innovation);
        FlightLog::new("test", vec![d])
    }

    #[test]
    fn test_watchdog_shows_raised_bits_only() {
        // yaw (bit 6) and mag z (bit 5)
        let log = estimator_log(vec![0.0, 64.0 + 32.0, 0.0]);
        let config = PlotConfig::default();
        let mut ctx = PlotContext::new(&log, &config);
        plot_estimator_watchdog(&mut ctx);
        let chart = &ctx.charts[0];
        let labels: Vec<&str> = chart.lines.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["Mag X, Y, Z Check Bits", "Yaw Check Bit"]);
        assert_eq!(chart.lines[0].points[1].1, 4.0);
        assert_eq!(chart.lines[1].points[1].1, 1.0);
    }

    #[test]
    fn test_watchdog_falls_back_to_health_flags() {
        let log = estimator_log(vec![0.0, 0.0]);
        let config = PlotConfig::default();
        let mut ctx = PlotContext::new(&log, &config);
        plot_estimator_watchdog(&mut ctx);
        assert_eq!(ctx.charts[0].lines.len(), 1);
        assert_eq!(ctx.charts[0].lines[0].label, "Health Flags (vel, pos, hgt)");
    }

    #[test]
    fn test_power_rails_only_when_measured() {
        let t = vec![0.0, 1e6];
        let mut battery = Dataset::new("battery_status", 0);
        battery.data.insert("timestamp".into(), t.clone());
        for field in ["voltage_v", "voltage_filtered_v", "current_a", "discharged_mah", "remaining"] {
            battery.data.insert(field.into(), vec![1.0, 1.0]);
        }
        let mut power = Dataset::new("system_power", 0);
        power.data.insert("timestamp".into(), t);
        power.data.insert("voltage5V_v".into(), vec![5.1, 5.0]);
        power.data.insert("voltage3v3_v".into(), vec![0.0, 0.0]);
        let log = FlightLog::new("test", vec![battery, power]);
        let config = PlotConfig::default();
        let mut ctx = PlotContext::new(&log, &config);
        plot_power(&mut ctx);
        let labels: Vec<&str> = ctx.charts[0].lines.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels.len(), 6);
        assert_eq!(labels[5], "5 V");
    }

    #[test]
    fn test_sampling_regularity_with_dropouts() {
        let mut d = Dataset::new("sensor_combined", 0);
        d.data.insert("timestamp".into(), vec![0.0, 4000.0, 8000.0, 20000.0]);
        let mut log = FlightLog::new("test", vec![d]);
        log.dropouts.push(Dropout {
            timestamp: 8000.0,
            duration_ms: 10.0,
        });
        let config = PlotConfig::default();
        let mut ctx = PlotContext::new(&log, &config);
        plot_sampling_regularity(&mut ctx);
        let chart = &ctx.charts[0];
        let diffs: Vec<f64> = chart.lines[0].points.iter().map(|p| p.1).collect();
        assert_eq!(diffs, vec![4000.0, 4000.0, 12000.0, 0.0]);
        assert_eq!(chart.boxes.len(), 1);
        assert_eq!(chart.boxes[0].y0, 4000.0);
        assert_eq!(chart.boxes[0].y1, 14000.0);
    }
}
