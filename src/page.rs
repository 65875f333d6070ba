// src/page.rs

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::plot_framework::{render_chart, ChartDescriptor};
use crate::plotted_tables::escape_html;

/// One block of the page, in display order.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum PageItem {
    Chart(ChartDescriptor),
    Html(String),
}

/// Navigation entry of a chart.
#[derive(Debug, Clone, Serialize)]
pub struct NavEntry {
    pub model_id: String,
    pub fragment: String,
    pub title: String,
}

/// Values the page template fills in around the charts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateVariables {
    pub title_html: String,
    pub info_table_html: String,
    pub error_labels_html: String,
    pub hardfault_html: Option<String>,
    pub corrupt_log_html: Option<String>,
    pub additional_info: Option<String>,
    pub has_position_data: bool,
    /// GPS track per flight-mode segment as `(lat, lon)` in degrees.
    pub pos_datas: Vec<Vec<(f64, f64)>>,
    /// `(mode name, colour)` per segment of `pos_datas`.
    pub pos_flight_modes: Vec<(String, String)>,
    pub plots: Vec<NavEntry>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Page {
    pub title: String,
    pub items: Vec<PageItem>,
    pub template: TemplateVariables,
}

/// Anchor of a chart in the page navigation: `Nav-` and the title with
/// spaces as `-`, `&` as `_` and parentheses dropped.
pub fn nav_fragment(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| *c != '(' && *c != ')')
        .map(|c| match c {
            ' ' => '-',
            '&' => '_',
            other => other,
        })
        .collect();
    format!("Nav-{cleaned}")
}

/// File name friendly form of a chart title.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_end_matches('_').to_string();
    if slug.is_empty() {
        "chart".to_string()
    } else {
        slug
    }
}

impl Page {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn push_chart(&mut self, chart: ChartDescriptor) {
        self.items.push(PageItem::Chart(chart));
    }

    pub fn push_html(&mut self, html: String) {
        self.items.push(PageItem::Html(html));
    }

    pub fn insert_html(&mut self, index: usize, html: String) {
        let index = index.min(self.items.len());
        self.items.insert(index, PageItem::Html(html));
    }

    pub fn charts(&self) -> impl Iterator<Item = &ChartDescriptor> {
        self.items.iter().filter_map(|item| match item {
            PageItem::Chart(chart) => Some(chart),
            PageItem::Html(_) => None,
        })
    }

    /// Navigation entries for every titled chart, numbered in page order.
    pub fn build_navigation(&mut self) {
        self.template.plots = self
            .charts()
            .enumerate()
            .filter(|(_, chart)| !chart.title.is_empty())
            .map(|(i, chart)| NavEntry {
                model_id: format!("chart-{}", i + 1),
                fragment: nav_fragment(&chart.title),
                title: chart.title.clone(),
            })
            .collect();
    }

    fn chart_file_name(prefix: &str, index: usize, chart: &ChartDescriptor) -> String {
        format!("{}_{}_{}.png", prefix, index + 1, slugify(&chart.title))
    }

    /// Writes `<prefix>_<n>_<slug>.png` per chart (if `render_png`),
    /// `<prefix>_manifest.json` and `<prefix>.html` into `out_dir`. Returns
    /// the written files.
    pub fn write(&self, out_dir: &Path, prefix: &str, render_png: bool) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(out_dir)?;
        let mut written = Vec::new();
        let mut images: Vec<Option<String>> = Vec::new();

        for (i, chart) in self.charts().enumerate() {
            if !render_png {
                images.push(None);
                continue;
            }
            let file_name = Self::chart_file_name(prefix, i, chart);
            let path = out_dir.join(&file_name);
            match render_chart(chart, &path) {
                Ok(()) => {
                    written.push(path);
                    images.push(Some(file_name));
                }
                Err(e) => {
                    warn!("Failed to render '{}': {}", chart.title, e);
                    images.push(None);
                }
            }
        }

        let manifest_path = out_dir.join(format!("{prefix}_manifest.json"));
        fs::write(&manifest_path, serde_json::to_string_pretty(self)?)?;
        written.push(manifest_path);

        let html_path = out_dir.join(format!("{prefix}.html"));
        fs::write(&html_path, self.to_html(&images))?;
        written.push(html_path);

        info!("Wrote {} files to {}", written.len(), out_dir.display());
        Ok(written)
    }

    /// Minimal report stacking the template fragments, chart images and
    /// HTML items in page order.
    fn to_html(&self, images: &[Option<String>]) -> String {
        let t = &self.template;
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<meta name=\"generator\" content=\"ulog_csv_render {}\">\n", crate::crate_version()));
        html.push_str(&format!("<title>{}</title>\n</head>\n<body>\n", escape_html(&self.title)));
        html.push_str(&t.title_html);
        for fragment in [&t.corrupt_log_html, &t.hardfault_html].into_iter().flatten() {
            html.push_str(fragment);
        }
        html.push_str(&t.info_table_html);
        html.push_str(&t.error_labels_html);

        if !t.plots.is_empty() {
            html.push_str("<ul class=\"nav\">\n");
            for entry in &t.plots {
                html.push_str(&format!(
                    "<li><a href=\"#{}\">{}</a></li>\n",
                    entry.fragment,
                    escape_html(&entry.title)
                ));
            }
            html.push_str("</ul>\n");
        }

        let mut chart_index = 0;
        for item in &self.items {
            match item {
                PageItem::Chart(chart) => {
                    let title = escape_html(&chart.title);
                    html.push_str(&format!("<div id=\"{}\">\n", nav_fragment(&chart.title)));
                    match images.get(chart_index).and_then(|i| i.as_ref()) {
                        Some(file) => html.push_str(&format!("<img src=\"{file}\" alt=\"{title}\">\n")),
                        None => html.push_str(&format!("<h4>{title}</h4>\n")),
                    }
                    html.push_str("</div>\n");
                    chart_index += 1;
                }
                PageItem::Html(fragment) => {
                    html.push_str(fragment);
                    html.push('\n');
                }
            }
        }
        if let Some(additional) = &t.additional_info {
            html.push_str(additional);
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlotHeight;
    use crate::plot_framework::ChartKind;

    fn chart(title: &str) -> ChartDescriptor {
        ChartDescriptor::new(title, ChartKind::TimeSeries, PlotHeight::Small, 840, 350)
    }

    #[test]
    fn test_nav_fragment() {
        assert_eq!(nav_fragment("CPU & RAM"), "Nav-CPU-_-RAM");
        assert_eq!(
            nav_fragment("Manual Control Inputs (Radio or Joystick)"),
            "Nav-Manual-Control-Inputs-Radio-or-Joystick"
        );
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Raw Angular Speed (Gyroscope)"), "raw_angular_speed_gyroscope");
        assert_eq!(slugify("GPS Noise & Jamming"), "gps_noise_jamming");
        assert_eq!(slugify(""), "chart");
    }

    #[test]
    fn test_insert_html_and_navigation() {
        let mut page = Page::new("Flight Review");
        page.push_chart(chart("Roll Angle"));
        page.push_chart(chart(""));
        page.push_html("<p>table</p>".to_string());
        page.insert_html(0, "<p>error</p>".to_string());
        page.build_navigation();
        assert!(matches!(&page.items[0], PageItem::Html(h) if h == "<p>error</p>"));
        assert_eq!(page.template.plots.len(), 1);
        assert_eq!(page.template.plots[0].model_id, "chart-1");
        assert_eq!(page.template.plots[0].fragment, "Nav-Roll-Angle");
    }

    #[test]
    fn test_manifest_tags_items() {
        let mut page = Page::new("Flight Review");
        page.push_html("<p>x</p>".to_string());
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["items"][0]["type"], "html");
        assert_eq!(json["items"][0]["content"], "<p>x</p>");
    }
}
