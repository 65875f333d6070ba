// src/plot_framework.rs

use plotters::backend::BitMapBackend;
use plotters::chart::{ChartBuilder, ChartContext, SeriesLabelPosition};
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::drawing::{DrawingArea, IntoDrawingArea};
use plotters::element::{Circle, EmptyElement, PathElement, Polygon, Rectangle, Text};
use plotters::series::LineSeries;
use plotters::style::colors::{BLACK, RED, WHITE};
use plotters::style::{Color, IntoFont, RGBColor};
use plotters::coord::cartesian::Cartesian2d;

use ndarray::Array1;
use ndarray_stats::QuantileExt;
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::PlotHeight;
use crate::constants::{
    CIRCLE_RADIUS, COLOR_NAN_MARKER, FONT_FAMILY, FONT_SIZE_AXIS_LABEL, FONT_SIZE_CHART_TITLE,
    FONT_SIZE_LEGEND, FONT_SIZE_MARKER_LABEL, FONT_SIZE_MESSAGE, LINE_WIDTH_LEGEND,
    LINE_WIDTH_MARKER, LINE_WIDTH_PLOT,
};
use crate::error::{PlotError, Result};

type Chart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChartKind {
    TimeSeries,
    Xy,
    Spectrum,
    Spectrogram,
    StepResponse,
}

/// One polyline. NaN y values split the line into segments.
#[derive(Debug, Clone, Serialize)]
pub struct LineData {
    pub label: String,
    pub color: String,
    pub points: Vec<(f64, f64)>,
    pub step: bool,
    /// x positions of NaN samples, drawn as markers at the bottom
    pub nan_markers: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CircleData {
    pub label: String,
    pub color: String,
    pub points: Vec<(f64, f64)>,
}

/// Filled polygon, e.g. the thrust area behind rate plots.
#[derive(Debug, Clone, Serialize)]
pub struct PatchData {
    pub label: String,
    pub color: String,
    pub alpha: f64,
    pub points: Vec<(f64, f64)>,
}

/// Background band over `[start, end]` on x. The vertical extent is given as
/// fractions of the chart height, measured from the bottom.
#[derive(Debug, Clone, Serialize)]
pub struct Band {
    pub start: f64,
    pub end: f64,
    pub color: String,
    pub alpha: f64,
    pub y_fraction: (f64, f64),
}

#[derive(Debug, Clone, Serialize)]
pub struct VerticalMarker {
    pub x: f64,
    pub color: String,
    pub dashed: bool,
    /// Lines of text next to the marker top
    pub label: Vec<String>,
    pub label_offset_px: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HorizontalSpan {
    pub y: f64,
    pub color: String,
}

/// Rectangle in data coordinates (logging dropouts).
#[derive(Debug, Clone, Serialize)]
pub struct ShadedBox {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
    pub color: String,
    pub alpha: f64,
}

/// Spectrogram cells: `values_db[x][y]` centred on `x_bins[x]`, `y_bins[y]`.
#[derive(Debug, Clone, Serialize)]
pub struct HeatmapData {
    pub x_bins: Vec<f64>,
    pub y_bins: Vec<f64>,
    pub values_db: Vec<Vec<f64>>,
    pub min_db: f64,
    pub max_db: f64,
}

/// Everything needed to draw one chart, independent of the drawing backend.
#[derive(Debug, Clone, Serialize)]
pub struct ChartDescriptor {
    pub title: String,
    pub kind: ChartKind,
    pub x_label: String,
    pub y_label: String,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub height: PlotHeight,
    pub width_px: u32,
    pub height_px: u32,
    pub lines: Vec<LineData>,
    pub circles: Vec<CircleData>,
    pub patches: Vec<PatchData>,
    pub bands: Vec<Band>,
    pub markers: Vec<VerticalMarker>,
    pub spans: Vec<HorizontalSpan>,
    pub boxes: Vec<ShadedBox>,
    pub heatmap: Option<HeatmapData>,
}

impl ChartDescriptor {
    pub fn new(title: &str, kind: ChartKind, height: PlotHeight, width_px: u32, height_px: u32) -> Self {
        Self {
            title: title.to_string(),
            kind,
            x_label: String::new(),
            y_label: String::new(),
            x_range: (0.0, 1.0),
            y_range: (0.0, 1.0),
            height,
            width_px,
            height_px,
            lines: Vec::new(),
            circles: Vec::new(),
            patches: Vec::new(),
            bands: Vec::new(),
            markers: Vec::new(),
            spans: Vec::new(),
            boxes: Vec::new(),
            heatmap: None,
        }
    }

    /// True if any series holds at least one finite point.
    pub fn has_data(&self) -> bool {
        let finite = |p: &(f64, f64)| p.0.is_finite() && p.1.is_finite();
        self.lines.iter().any(|l| l.points.iter().any(finite))
            || self.circles.iter().any(|c| c.points.iter().any(finite))
            || self.patches.iter().any(|p| p.points.iter().any(finite))
            || self.heatmap.as_ref().map_or(false, |h| !h.values_db.is_empty())
    }

    /// Bounds of all finite data points as `((x_min, x_max), (y_min, y_max))`.
    pub fn data_bounds(&self) -> Option<((f64, f64), (f64, f64))> {
        let points = self
            .lines
            .iter()
            .flat_map(|l| l.points.iter())
            .chain(self.circles.iter().flat_map(|c| c.points.iter()))
            .chain(self.patches.iter().flat_map(|p| p.points.iter()));
        let (xs, ys): (Vec<f64>, Vec<f64>) = points
            .filter(|p| p.0.is_finite() && p.1.is_finite())
            .copied()
            .unzip();
        let x = finite_bounds(&xs)?;
        let y = finite_bounds(&ys)?;
        Some((x, y))
    }
}

/// Min/max of the finite values.
pub fn finite_bounds(values: &[f64]) -> Option<(f64, f64)> {
    let finite: Array1<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    let min = *finite.min_skipnan();
    let max = *finite.max_skipnan();
    Some((min, max))
}

/// Calculate plot range with padding.
/// Adds 5% padding, or a fixed padding for very small ranges.
pub fn calculate_range(min_val: f64, max_val: f64) -> (f64, f64) {
    let (min, max) = if min_val <= max_val {
        (min_val, max_val)
    } else {
        (max_val, min_val)
    };
    let range = (max - min).abs();
    let padding = if range < 1e-6 { 0.5 } else { range * 0.05 };
    (min - padding, max + padding)
}

/// Parses `#rrggbb` (the leading `#` is optional).
pub fn parse_hex_color(hex: &str) -> Option<RGBColor> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

fn color_or_black(hex: &str) -> RGBColor {
    parse_hex_color(hex).unwrap_or_else(|| {
        warn!("Invalid colour '{}', using black", hex);
        BLACK
    })
}

fn map_db_to_color(db_value: f64, min_db: f64, max_db: f64) -> RGBColor {
    if !db_value.is_finite() || !min_db.is_finite() || !max_db.is_finite() {
        return RGBColor(0, 0, 0);
    }
    let span = (max_db - min_db).abs().max(1e-9);
    let t = ((db_value.clamp(min_db, max_db) - min_db) / span).clamp(0.0, 1.0);
    let color = colorous::VIRIDIS.eval_continuous(t);
    RGBColor(color.r, color.g, color.b)
}

/// Expands a series into a staircase: every sample is held until the next
/// timestamp.
pub fn step_points(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut out = Vec::with_capacity(points.len() * 2);
    for (i, &(x, y)) in points.iter().enumerate() {
        out.push((x, y));
        if let Some(&(next_x, _)) = points.get(i + 1) {
            out.push((next_x, y));
        }
    }
    out
}

/// Splits a polyline at non-finite points.
pub fn split_at_nan(points: &[(f64, f64)]) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for &(x, y) in points {
        if x.is_finite() && y.is_finite() {
            current.push((x, y));
        } else if !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Y-axis tick labels: k/M notation for large values, one decimal for small
/// fractional values and normalised responses, integers for dB.
pub fn format_y_axis_value(y: f64, y_label: &str) -> String {
    if y_label.contains("dB") || y_label.contains("[Hz]") {
        return format!("{:.0}", y);
    }
    if y.abs() >= 1_000_000.0 {
        format!("{:.1}M", y / 1_000_000.0)
    } else if y.abs() >= 1000.0 {
        format!("{:.0}k", y / 1000.0)
    } else if y.abs() < 10.0 && (y.fract() != 0.0 || y_label.contains("Response")) {
        format!("{:.1}", y)
    } else {
        format!("{:.0}", y)
    }
}

/// Time-axis tick labels for microsecond timestamps, as `m:ss`.
pub fn format_time_axis(x_us: f64) -> String {
    if !x_us.is_finite() {
        return String::new();
    }
    let total_s = (x_us / 1e6).round() as i64;
    let sign = if total_s < 0 { "-" } else { "" };
    let total_s = total_s.abs();
    format!("{}{}:{:02}", sign, total_s / 60, total_s % 60)
}

fn dashed_segments(x: f64, y0: f64, y1: f64, num_segments: usize) -> Vec<[(f64, f64); 2]> {
    let segment_length = (y1 - y0) / (num_segments as f64 * 2.0);
    (0..num_segments)
        .map(|i| {
            let start = y0 + (i as f64 * 2.0) * segment_length;
            [(x, start), (x, start + segment_length)]
        })
        .collect()
}

/// Draw a "Data Unavailable" message on a plot area.
pub fn draw_unavailable_message(
    area: &DrawingArea<BitMapBackend, Shift>,
    title: &str,
    reason: &str,
) -> std::result::Result<(), Box<dyn Error>> {
    const CHAR_WIDTH_RATIO: f32 = 0.6;
    const LINE_HEIGHT_SPACING: i32 = 4;

    let (x_range, y_range) = area.get_pixel_range();
    let (width, height) = (x_range.end - x_range.start, y_range.end - y_range.start);
    let message = format!("{title} Data Unavailable:\n{reason}");

    let estimated_char_width = (FONT_SIZE_MESSAGE as f32 * CHAR_WIDTH_RATIO) as i32;
    let estimated_line_height = FONT_SIZE_MESSAGE + LINE_HEIGHT_SPACING;
    let lines: Vec<&str> = message.split('\n').collect();
    let max_line_length = lines.iter().map(|line| line.len()).max().unwrap_or(0);
    let estimated_text_width = max_line_length.saturating_mul(estimated_char_width as usize) as i32;

    let text_style = (FONT_FAMILY, FONT_SIZE_MESSAGE).into_font().color(&RED);
    let top = height / 2 - (lines.len() as i32 * estimated_line_height) / 2;
    for (i, line) in lines.iter().enumerate() {
        area.draw(&Text::new(
            line.to_string(),
            (width / 2 - estimated_text_width / 2, top + i as i32 * estimated_line_height),
            text_style.clone(),
        ))?;
    }
    Ok(())
}

fn draw_backgrounds(chart: &mut Chart, desc: &ChartDescriptor) -> std::result::Result<(), Box<dyn Error>> {
    let (y0, y1) = desc.y_range;
    for band in &desc.bands {
        let color = color_or_black(&band.color).mix(band.alpha);
        let bottom = y0 + band.y_fraction.0 * (y1 - y0);
        let top = y0 + band.y_fraction.1 * (y1 - y0);
        chart.draw_series(std::iter::once(Rectangle::new(
            [(band.start, bottom), (band.end, top)],
            color.filled(),
        )))?;
    }

    if let Some(heatmap) = &desc.heatmap {
        let x_bin_width = if heatmap.x_bins.len() > 1 {
            heatmap.x_bins[1] - heatmap.x_bins[0]
        } else {
            1.0
        };
        let y_bin_width = if heatmap.y_bins.len() > 1 {
            heatmap.y_bins[1] - heatmap.y_bins[0]
        } else {
            1.0
        };
        let safe_max_db = heatmap.max_db.max(heatmap.min_db + 1.0);
        for (x_idx, &x_val) in heatmap.x_bins.iter().enumerate() {
            let Some(column) = heatmap.values_db.get(x_idx) else {
                continue;
            };
            chart.draw_series(heatmap.y_bins.iter().zip(column.iter()).map(|(&y_val, &db)| {
                Rectangle::new(
                    [
                        (x_val - x_bin_width * 0.5, y_val - y_bin_width * 0.5),
                        (x_val + x_bin_width * 0.5, y_val + y_bin_width * 0.5),
                    ],
                    map_db_to_color(db, heatmap.min_db, safe_max_db).filled(),
                )
            }))?;
        }
    }

    for shaded in &desc.boxes {
        let color = color_or_black(&shaded.color);
        chart.draw_series(std::iter::once(Rectangle::new(
            [(shaded.x0, shaded.y0), (shaded.x1, shaded.y1)],
            color.mix(shaded.alpha).filled(),
        )))?;
    }
    Ok(())
}

/// Returns the number of legend entries added.
fn draw_data_series(chart: &mut Chart, desc: &ChartDescriptor) -> std::result::Result<usize, Box<dyn Error>> {
    let mut legend_series_count = 0;

    for patch in desc.patches.iter().filter(|p| p.points.len() > 2) {
        let color = color_or_black(&patch.color);
        let alpha = patch.alpha;
        let series = chart.draw_series(std::iter::once(Polygon::new(
            patch.points.clone(),
            color.mix(alpha).filled(),
        )))?;
        if !patch.label.is_empty() {
            series.label(&patch.label).legend(move |(x, y)| {
                Rectangle::new([(x, y - 4), (x + 20, y + 4)], color.mix(alpha).filled())
            });
            legend_series_count += 1;
        }
    }

    for span in &desc.spans {
        let color = color_or_black(&span.color);
        chart.draw_series(LineSeries::new(
            vec![(desc.x_range.0, span.y), (desc.x_range.1, span.y)],
            color.mix(0.6).stroke_width(LINE_WIDTH_MARKER),
        ))?;
    }

    for line in &desc.lines {
        let color = color_or_black(&line.color);
        let points = if line.step {
            step_points(&line.points)
        } else {
            line.points.clone()
        };
        let segments = split_at_nan(&points);
        for (i, segment) in segments.into_iter().enumerate() {
            let series = chart.draw_series(LineSeries::new(segment, color.stroke_width(LINE_WIDTH_PLOT)))?;
            if i == 0 && !line.label.is_empty() {
                series.label(&line.label).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(LINE_WIDTH_LEGEND))
                });
                legend_series_count += 1;
            }
        }
        if !line.nan_markers.is_empty() {
            let nan_color = color_or_black(COLOR_NAN_MARKER);
            let y = desc.y_range.0;
            chart.draw_series(
                line.nan_markers
                    .iter()
                    .map(|&x| Circle::new((x, y), CIRCLE_RADIUS, nan_color.filled())),
            )?;
        }
    }

    for circles in &desc.circles {
        let color = color_or_black(&circles.color);
        let series = chart.draw_series(
            circles
                .points
                .iter()
                .filter(|p| p.0.is_finite() && p.1.is_finite())
                .map(|&p| Circle::new(p, CIRCLE_RADIUS, color.filled())),
        )?;
        if !circles.label.is_empty() {
            series
                .label(&circles.label)
                .legend(move |(x, y)| Circle::new((x + 10, y), CIRCLE_RADIUS, color.filled()));
            legend_series_count += 1;
        }
    }
    Ok(legend_series_count)
}

fn draw_markers(chart: &mut Chart, desc: &ChartDescriptor) -> std::result::Result<(), Box<dyn Error>> {
    let (x0, x1) = desc.x_range;
    let (y0, y1) = desc.y_range;
    let label_font = (FONT_FAMILY, FONT_SIZE_MARKER_LABEL).into_font();
    for marker in &desc.markers {
        if !marker.x.is_finite() || marker.x < x0 || marker.x > x1 {
            continue;
        }
        let color = color_or_black(&marker.color);
        if marker.dashed {
            for segment in dashed_segments(marker.x, y0, y1, 40) {
                chart.draw_series(LineSeries::new(segment, color.stroke_width(LINE_WIDTH_MARKER)))?;
            }
        } else {
            chart.draw_series(LineSeries::new(
                vec![(marker.x, y0), (marker.x, y1)],
                color.stroke_width(LINE_WIDTH_MARKER),
            ))?;
        }
        for (i, text) in marker.label.iter().enumerate() {
            let dy = marker.label_offset_px + 2 + i as i32 * (FONT_SIZE_MARKER_LABEL + 2);
            chart.draw_series(std::iter::once(
                EmptyElement::at((marker.x, y1))
                    + Text::new(text.clone(), (3, dy), label_font.clone().color(&color)),
            ))?;
        }
    }
    Ok(())
}

fn draw_chart(area: &DrawingArea<BitMapBackend, Shift>, desc: &ChartDescriptor) -> std::result::Result<(), Box<dyn Error>> {
    let (x0, x1) = desc.x_range;
    let (y0, y1) = desc.y_range;
    let mut chart = ChartBuilder::on(area)
        .caption(&desc.title, (FONT_FAMILY, FONT_SIZE_CHART_TITLE))
        .margin(8)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    let time_axis = matches!(desc.kind, ChartKind::TimeSeries | ChartKind::Spectrogram);
    let y_label = desc.y_label.clone();
    chart
        .configure_mesh()
        .x_desc(&desc.x_label)
        .y_desc(&desc.y_label)
        .x_labels(12)
        .y_labels(8)
        .x_label_formatter(&|x| {
            if time_axis {
                format_time_axis(*x)
            } else {
                format_y_axis_value(*x, "")
            }
        })
        .y_label_formatter(&|y| format_y_axis_value(*y, &y_label))
        .light_line_style(WHITE.mix(0.7))
        .label_style((FONT_FAMILY, FONT_SIZE_AXIS_LABEL))
        .draw()?;

    draw_backgrounds(&mut chart, desc)?;
    let legend_series_count = draw_data_series(&mut chart, desc)?;
    draw_markers(&mut chart, desc)?;

    if legend_series_count > 0 {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font((FONT_FAMILY, FONT_SIZE_LEGEND))
            .draw()?;
    }
    Ok(())
}

/// Renders a chart to a PNG file. Charts without finite data or with an
/// empty range get a "Data Unavailable" message instead of axes.
pub fn render_chart(desc: &ChartDescriptor, output_path: &Path) -> Result<()> {
    let render = || -> std::result::Result<(), Box<dyn Error>> {
        let root_area = BitMapBackend::new(output_path, (desc.width_px, desc.height_px)).into_drawing_area();
        root_area.fill(&WHITE)?;
        let valid_ranges = desc.x_range.1 > desc.x_range.0 && desc.y_range.1 > desc.y_range.0;
        if desc.has_data() && valid_ranges {
            draw_chart(&root_area, desc)?;
        } else {
            let reason = if !desc.has_data() {
                "No data points"
            } else {
                "Invalid ranges"
            };
            draw_unavailable_message(&root_area, &desc.title, reason)?;
        }
        root_area.present()?;
        Ok(())
    };
    render().map_err(|e| PlotError::Render(format!("{}: {}", output_path.display(), e)))?;
    debug!("Chart '{}' saved as '{}'", desc.title, output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#e0212d"), Some(RGBColor(0xe0, 0x21, 0x2d)));
        assert_eq!(parse_hex_color("208900"), Some(RGBColor(0x20, 0x89, 0x00)));
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
    }

    #[test]
    fn test_step_points() {
        let steps = step_points(&[(0.0, 1.0), (1.0, 2.0), (3.0, 5.0)]);
        assert_eq!(
            steps,
            vec![(0.0, 1.0), (1.0, 1.0), (1.0, 2.0), (3.0, 2.0), (3.0, 5.0)]
        );
    }

    #[test]
    fn test_split_at_nan() {
        let segments = split_at_nan(&[(0.0, 1.0), (1.0, f64::NAN), (2.0, 2.0), (3.0, 3.0)]);
        assert_eq!(segments, vec![vec![(0.0, 1.0)], vec![(2.0, 2.0), (3.0, 3.0)]]);
    }

    #[test]
    fn test_finite_bounds() {
        assert_eq!(finite_bounds(&[3.0, f64::NAN, -1.0, 2.0]), Some((-1.0, 3.0)));
        assert_eq!(finite_bounds(&[f64::NAN]), None);
    }

    #[test]
    fn test_calculate_range_pads() {
        assert_eq!(calculate_range(0.0, 100.0), (-5.0, 105.0));
        assert_eq!(calculate_range(2.0, 2.0), (1.5, 2.5));
    }

    #[test]
    fn test_format_time_axis() {
        assert_eq!(format_time_axis(0.0), "0:00");
        assert_eq!(format_time_axis(65_000_000.0), "1:05");
        assert_eq!(format_time_axis(-5_000_000.0), "-0:05");
    }

    #[test]
    fn test_has_data_and_bounds() {
        let mut desc = ChartDescriptor::new("t", ChartKind::TimeSeries, PlotHeight::Small, 100, 100);
        assert!(!desc.has_data());
        desc.lines.push(LineData {
            label: "a".into(),
            color: "#000000".into(),
            points: vec![(0.0, f64::NAN), (1.0, 4.0), (2.0, -2.0)],
            step: false,
            nan_markers: vec![0.0],
        });
        assert!(desc.has_data());
        assert_eq!(desc.data_bounds(), Some(((1.0, 2.0), (-2.0, 4.0))));
    }
}
