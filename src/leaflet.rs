// src/leaflet.rs

use crate::constants::{COLOR_GRAY, MAP_MAX_POINTS};
use crate::data_analysis::flight_modes::{flight_mode_style, MODE_SENTINEL};
use crate::data_input::flight_log::FlightLog;
use crate::error::Result;

/// GPS track segments as `(lat, lon)` in degrees, one per flight mode span.
pub type Polyline = Vec<Vec<(f64, f64)>>;

/// `(mode name, colour)` of each segment.
pub type SegmentModes = Vec<(String, String)>;

/// Timestamps and `(lat, lon)` in degrees of the GPS receiver, or of the
/// fused global position for logs without raw GPS.
fn track(log: &FlightLog) -> Result<(Vec<f64>, Vec<(f64, f64)>)> {
    let (dataset, scale) = match log.get_dataset("vehicle_gps_position", 0) {
        Ok(d) => (d, 1e-7),
        Err(_) => (log.get_dataset("vehicle_global_position", 0)?, 1.0),
    };
    let timestamps = dataset.timestamps()?;
    let lat = dataset.field("lat")?;
    let lon = dataset.field("lon")?;

    let step = lat.len() / MAP_MAX_POINTS + 1;
    let mut times = Vec::with_capacity(lat.len() / step + 1);
    let mut points = Vec::with_capacity(lat.len() / step + 1);
    for i in (0..lat.len().min(lon.len()).min(timestamps.len())).step_by(step) {
        let (la, lo) = (lat[i] * scale, lon[i] * scale);
        // (0, 0) is what receivers report before the first fix
        if la.is_finite() && lo.is_finite() && (la != 0.0 || lo != 0.0) {
            times.push(timestamps[i]);
            points.push((la, lo));
        }
    }
    Ok((times, points))
}

fn segment_style(mode: i64) -> (String, String) {
    match flight_mode_style(mode) {
        Some((name, color)) => (name.to_string(), color.to_string()),
        None => ("Unknown".to_string(), COLOR_GRAY.to_string()),
    }
}

/// Splits the GPS track at flight mode changes. Consecutive segments share
/// their boundary point so the drawn line stays connected.
pub fn ulog_to_polyline(log: &FlightLog, flight_mode_changes: &[(f64, i64)]) -> Result<(Polyline, SegmentModes)> {
    let (times, points) = track(log)?;
    let mut segments: Polyline = Vec::new();
    let mut modes: SegmentModes = Vec::new();
    let mut current_mode: Option<i64> = None;
    let mut next_change = 0;

    for (t, point) in times.into_iter().zip(points) {
        let mut mode = current_mode;
        while next_change < flight_mode_changes.len() && flight_mode_changes[next_change].0 <= t {
            let (_, m) = flight_mode_changes[next_change];
            if m != MODE_SENTINEL {
                mode = Some(m);
            }
            next_change += 1;
        }
        let mode = mode.unwrap_or(MODE_SENTINEL);

        if current_mode != Some(mode) || segments.is_empty() {
            let mut segment = Vec::new();
            if let Some(&last) = segments.last().and_then(|s: &Vec<(f64, f64)>| s.last()) {
                segment.push(last);
            }
            segments.push(segment);
            modes.push(segment_style(mode));
            current_mode = Some(mode);
        }
        if let Some(segment) = segments.last_mut() {
            segment.push(point);
        }
    }
    Ok((segments, modes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_input::flight_log::Dataset;

    fn gps_log(n: usize) -> FlightLog {
        let mut d = Dataset::new("vehicle_gps_position", 0);
        d.data.insert("timestamp".into(), (0..n).map(|i| i as f64 * 1e5).collect());
        d.data.insert("lat".into(), (0..n).map(|i| 473_977_000.0 + i as f64).collect());
        d.data.insert("lon".into(), vec![85_456_000.0; n]);
        FlightLog::new("test", vec![d])
    }

    #[test]
    fn test_split_at_mode_changes() {
        let log = gps_log(10);
        // Manual (0) then Position (2)
        let changes = vec![(0.0, 0), (5e5, 2), (log.last_timestamp, MODE_SENTINEL)];
        let (segments, modes) = ulog_to_polyline(&log, &changes).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].len(), 5);
        // shares the boundary point with the previous segment
        assert_eq!(segments[1].len(), 6);
        assert_eq!(segments[1][0], segments[0][4]);
        assert!((segments[0][0].0 - 47.3977).abs() < 1e-9);
        assert_eq!(modes[0].0, flight_mode_style(0).unwrap().0);
        assert_eq!(modes[1].0, flight_mode_style(2).unwrap().0);
    }

    #[test]
    fn test_downsampled() {
        let log = gps_log(5000);
        let (segments, _) = ulog_to_polyline(&log, &[]).unwrap();
        let total: usize = segments.iter().map(Vec::len).sum();
        assert!(total <= MAP_MAX_POINTS);
    }

    #[test]
    fn test_without_gps() {
        let log = FlightLog::new("test", Vec::new());
        assert!(ulog_to_polyline(&log, &[]).is_err());
    }
}
