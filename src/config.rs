// src/config.rs

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::constants::{
    FLIGHT_MODE_BAND_ALPHA, MAX_POINTS_PER_PIXEL, MISSION_SETPOINT_COLOR, PLOT_HEIGHT_LARGE,
    PLOT_HEIGHT_NORMAL, PLOT_HEIGHT_SMALL, PLOT_WIDTH,
};
use crate::error::Result;

/// Height class of a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotHeight {
    Small,
    Normal,
    Large,
}

/// Page-wide plot settings. Every field has a default, so a TOML file only
/// needs to name what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub plot_width: u32,
    pub plot_height_small: u32,
    pub plot_height_normal: u32,
    pub plot_height_large: u32,
    /// Series are decimated above `max_points_per_pixel * plot_width` points.
    pub max_points_per_pixel: f64,
    pub mission_setpoint_color: String,
    pub flight_mode_alpha: f64,
    pub show_param_changes: bool,
    pub render_png: bool,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            plot_width: PLOT_WIDTH,
            plot_height_small: PLOT_HEIGHT_SMALL,
            plot_height_normal: PLOT_HEIGHT_NORMAL,
            plot_height_large: PLOT_HEIGHT_LARGE,
            max_points_per_pixel: MAX_POINTS_PER_PIXEL,
            mission_setpoint_color: MISSION_SETPOINT_COLOR.to_string(),
            flight_mode_alpha: FLIGHT_MODE_BAND_ALPHA,
            show_param_changes: true,
            render_png: true,
        }
    }
}

impl PlotConfig {
    /// Loads a config from a TOML file, falling back to defaults for absent keys.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PlotConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.plot_width == 0 {
            return Err(crate::error::PlotError::Config(
                "plot_width must be positive".into(),
            ));
        }
        if self.max_points_per_pixel.is_nan() || self.max_points_per_pixel <= 0.0 {
            return Err(crate::error::PlotError::Config(
                "max_points_per_pixel must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn height_px(&self, height: PlotHeight) -> u32 {
        match height {
            PlotHeight::Small => self.plot_height_small,
            PlotHeight::Normal => self.plot_height_normal,
            PlotHeight::Large => self.plot_height_large,
        }
    }

    /// Maximum number of points a single series keeps after decimation.
    pub fn max_num_data_points(&self) -> usize {
        (self.max_points_per_pixel * self.plot_width as f64) as usize
    }
}
