// src/plot_builders/overlays.rs

use tracing::debug;

use crate::config::PlotConfig;
use crate::constants::{COLOR_DROPOUT, COLOR_PARAM_CHANGE, DROPOUT_ALPHA, VTOL_BAND_ALPHA, VTOL_STRIP_FRACTION};
use crate::data_analysis::flight_modes::{flight_mode_style, mode_intervals, vtol_mode_style};
use crate::data_analysis::map_projection::{project_degrees, project_with_anchor};
use crate::data_input::flight_log::{Dropout, FlightLog, ParameterChange};
use crate::error::Result;
use crate::plot_builders::data_plot::DataPlot;
use crate::plot_builders::data_plot_2d::DataPlot2D;
use crate::plot_framework::{Band, ChartDescriptor, ShadedBox, VerticalMarker};

/// Shades the chart background per flight mode. With VTOL states the top
/// strip of the chart shows the VTOL state and the mode bands stop below it.
pub fn plot_flight_modes_background(plot: &mut DataPlot, flight_mode_changes: &[(f64, i64)], vtol_states: Option<&[(f64, i64)]>) {
    if !plot.has_series() {
        return;
    }
    let alpha = plot.config().flight_mode_alpha;
    let mode_top = if vtol_states.is_some() {
        1.0 - VTOL_STRIP_FRACTION
    } else {
        1.0
    };
    let chart = plot.chart_mut();
    for (start, end, mode) in mode_intervals(flight_mode_changes) {
        if let Some((_, color)) = flight_mode_style(mode) {
            chart.bands.push(Band {
                start,
                end,
                color: color.to_string(),
                alpha,
                y_fraction: (0.0, mode_top),
            });
        }
    }
    if let Some(states) = vtol_states {
        for (start, end, state) in mode_intervals(states) {
            if let Some((_, color)) = vtol_mode_style(state) {
                chart.bands.push(Band {
                    start,
                    end,
                    color: color.to_string(),
                    alpha: VTOL_BAND_ALPHA,
                    y_fraction: (mode_top, 1.0),
                });
            }
        }
    }
}

/// Dashed vertical markers where parameters changed, labelled
/// `NAME: value`, one marker per distinct timestamp.
pub fn plot_parameter_changes(chart: &mut ChartDescriptor, changed_params: &[ParameterChange]) {
    let mut grouped: Vec<(f64, Vec<String>)> = Vec::new();
    for change in changed_params {
        let text = format!("{}: {}", change.name, change.value);
        match grouped.last_mut() {
            Some((t, labels)) if *t == change.timestamp => labels.push(text),
            _ => grouped.push((change.timestamp, vec![text])),
        }
    }
    for (timestamp, label) in grouped {
        chart.markers.push(VerticalMarker {
            x: timestamp,
            color: COLOR_PARAM_CHANGE.to_string(),
            dashed: true,
            label,
            label_offset_px: 0,
        });
    }
}

/// Boxes over logging dropouts, `min_value` high at the bottom and as tall
/// as the dropout is long (in microseconds).
pub fn plot_dropouts(plot: &mut DataPlot, dropouts: &[Dropout], min_value: f64) {
    let chart = plot.chart_mut();
    for dropout in dropouts {
        let duration_us = dropout.duration_ms * 1000.0;
        chart.boxes.push(ShadedBox {
            x0: dropout.timestamp,
            x1: dropout.timestamp + duration_us,
            y0: min_value,
            y1: min_value + duration_us,
            color: COLOR_DROPOUT.to_string(),
            alpha: DROPOUT_ALPHA,
        });
    }
}

/// Adds the projected GPS track and, with `setpoints`, the mission position
/// setpoints to a local-position plot (east on x, north on y). The
/// projection is anchored at the local position reference when it is
/// logged, otherwise at the first GPS fix.
pub fn plot_map(log: &FlightLog, config: &PlotConfig, plot: &mut DataPlot2D, setpoints: bool) {
    let anchor = local_position_reference(log);
    match gps_track(log, anchor) {
        Ok(Some((north, east))) => {
            plot.add_xy(&east, &north, crate::constants::COLOR_GRAY, "GPS (projected)");
        }
        Ok(None) => debug!("GPS track has no valid fix"),
        Err(e) => debug!("No GPS track: {}", e),
    }

    if !setpoints {
        return;
    }
    let setpoints = log.get_dataset("position_setpoint_triplet", 0).and_then(|d| {
        let lat = d.field("current.lat")?;
        let lon = d.field("current.lon")?;
        Ok(project_track(lat, lon, anchor))
    });
    match setpoints {
        Ok(Some((north, east))) => {
            plot.add_xy_circles(&east, &north, &config.mission_setpoint_color, "Position Setpoints");
        }
        Ok(None) => {}
        Err(e) => debug!("No position setpoints: {}", e),
    }
}

fn local_position_reference(log: &FlightLog) -> Option<(f64, f64)> {
    let d = log.get_dataset("vehicle_local_position", 0).ok()?;
    let lat = d.field("ref_lat").ok()?;
    let lon = d.field("ref_lon").ok()?;
    lat.iter()
        .zip(lon.iter())
        .find(|(a, b)| a.is_finite() && b.is_finite() && (**a != 0.0 || **b != 0.0))
        .map(|(a, b)| (a.to_radians(), b.to_radians()))
}

fn gps_track(log: &FlightLog, anchor: Option<(f64, f64)>) -> Result<Option<(Vec<f64>, Vec<f64>)>> {
    let gps = log.get_dataset("vehicle_gps_position", 0)?;
    let mut lat: Vec<f64> = gps.field("lat")?.iter().map(|v| v * 1e-7).collect();
    let mut lon: Vec<f64> = gps.field("lon")?.iter().map(|v| v * 1e-7).collect();
    if let Ok(fix_type) = gps.field("fix_type") {
        // No position without a 3D fix
        for ((la, lo), &fix) in lat.iter_mut().zip(lon.iter_mut()).zip(fix_type.iter()) {
            if fix <= 2.0 {
                *la = f64::NAN;
                *lo = f64::NAN;
            }
        }
    }
    Ok(project_track(&lat, &lon, anchor))
}

fn project_track(lat_deg: &[f64], lon_deg: &[f64], anchor: Option<(f64, f64)>) -> Option<(Vec<f64>, Vec<f64>)> {
    match anchor {
        Some((anchor_lat, anchor_lon)) => Some(project_with_anchor(lat_deg, lon_deg, anchor_lat, anchor_lon)),
        None => project_degrees(lat_deg, lon_deg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlotHeight;
    use crate::plot_framework::ChartKind;

    #[test]
    fn test_parameter_changes_grouped_by_timestamp() {
        let mut chart = ChartDescriptor::new("t", ChartKind::TimeSeries, PlotHeight::Small, 100, 100);
        let params = vec![
            ParameterChange {
                timestamp: 10.0,
                name: "MC_ROLL_P".into(),
                value: 6.5,
            },
            ParameterChange {
                timestamp: 10.0,
                name: "MC_PITCH_P".into(),
                value: 6.0,
            },
            ParameterChange {
                timestamp: 20.0,
                name: "SYS_AUTOSTART".into(),
                value: 4001.0,
            },
        ];
        plot_parameter_changes(&mut chart, &params);
        assert_eq!(chart.markers.len(), 2);
        assert_eq!(chart.markers[0].label, vec!["MC_ROLL_P: 6.5", "MC_PITCH_P: 6"]);
        assert_eq!(chart.markers[1].label, vec!["SYS_AUTOSTART: 4001"]);
        assert!(chart.markers.iter().all(|m| m.dashed));
    }
}
