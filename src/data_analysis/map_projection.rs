// src/data_analysis/map_projection.rs

use crate::constants::EARTH_RADIUS_M;

/// Azimuthal equidistant projection of `(lat, lon)` (radians) around an
/// anchor point. Returns `(x, y)` in metres with x pointing north and y east.
pub fn map_projection(lat: f64, lon: f64, anchor_lat: f64, anchor_lon: f64) -> (f64, f64) {
    let (sin_anchor_lat, cos_anchor_lat) = anchor_lat.sin_cos();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let d_lon = lon - anchor_lon;
    let cos_d_lon = d_lon.cos();

    let arg = (sin_anchor_lat * sin_lat + cos_anchor_lat * cos_lat * cos_d_lon).clamp(-1.0, 1.0);
    let c = arg.acos();
    let k = if c.abs() > 0.0 { c / c.sin() } else { 1.0 };

    let x = k * (cos_anchor_lat * sin_lat - sin_anchor_lat * cos_lat * cos_d_lon) * EARTH_RADIUS_M;
    let y = k * cos_lat * d_lon.sin() * EARTH_RADIUS_M;
    (x, y)
}

/// Projects whole latitude/longitude columns given in degrees. The anchor
/// is the first finite sample; NaN inputs produce NaN outputs.
pub fn project_degrees(lat_deg: &[f64], lon_deg: &[f64]) -> Option<(Vec<f64>, Vec<f64>)> {
    let (anchor_lat, anchor_lon) = lat_deg
        .iter()
        .zip(lon_deg.iter())
        .find(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (a.to_radians(), b.to_radians()))?;
    Some(project_with_anchor(lat_deg, lon_deg, anchor_lat, anchor_lon))
}

/// Same as [`project_degrees`] but with an explicit anchor in radians.
pub fn project_with_anchor(lat_deg: &[f64], lon_deg: &[f64], anchor_lat: f64, anchor_lon: f64) -> (Vec<f64>, Vec<f64>) {
    lat_deg
        .iter()
        .zip(lon_deg.iter())
        .map(|(&lat, &lon)| {
            if lat.is_finite() && lon.is_finite() {
                map_projection(lat.to_radians(), lon.to_radians(), anchor_lat, anchor_lon)
            } else {
                (f64::NAN, f64::NAN)
            }
        })
        .unzip()
}
