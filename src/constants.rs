// src/constants.rs

// Plot dimensions (pixels). Heights per height class live in the config,
// these are the defaults it starts from.
pub const PLOT_WIDTH: u32 = 840;
pub const PLOT_HEIGHT_SMALL: u32 = 350;
pub const PLOT_HEIGHT_NORMAL: u32 = 450;
pub const PLOT_HEIGHT_LARGE: u32 = 820;

// A series is decimated once it holds more than this many points per pixel of width.
pub const MAX_POINTS_PER_PIXEL: f64 = 4.0;

// Shared x range padding as a fraction of the log duration.
pub const X_RANGE_PADDING_FRACTION: f64 = 0.05;

// Font sizes
pub const FONT_FAMILY: &str = "sans-serif";
pub const FONT_SIZE_CHART_TITLE: i32 = 18;
pub const FONT_SIZE_AXIS_LABEL: i32 = 12;
pub const FONT_SIZE_LEGEND: i32 = 11;
pub const FONT_SIZE_MESSAGE: i32 = 16;
pub const FONT_SIZE_MARKER_LABEL: i32 = 10;

// Stroke widths for lines
pub const LINE_WIDTH_PLOT: u32 = 2;
pub const LINE_WIDTH_LEGEND: u32 = 2;
pub const LINE_WIDTH_MARKER: u32 = 1;
pub const CIRCLE_RADIUS: u32 = 3;

// --- Colour palettes (hex strings, also used verbatim in the JSON manifest) ---
pub const COLORS2: [&str; 2] = ["#e0212d", "#208900"];
pub const COLORS3: [&str; 3] = ["#e0212d", "#208900", "#3f8dff"];
pub const COLORS8: [&str; 8] = [
    "#e0212d", "#208900", "#3f8dff", "#ffb000", "#9b32b5", "#0bb4c8", "#e36c09", "#7f7f7f",
];
pub const COLOR_GRAY: &str = "#949494";
pub const COLOR_THRUST_PATCH: &str = "#555555";
pub const COLOR_PARAM_CHANGE: &str = "#6a6a6a";
pub const COLOR_DROPOUT: &str = "#000000";
pub const COLOR_FREQUENCY_MARK: &str = "#444444";
pub const MISSION_SETPOINT_COLOR: &str = "#a12335";

pub const FLIGHT_MODE_BAND_ALPHA: f64 = 0.09;
pub const VTOL_BAND_ALPHA: f64 = 0.3;
pub const THRUST_PATCH_ALPHA: f64 = 0.4;
pub const DROPOUT_ALPHA: f64 = 0.4;
pub const COLOR_NAN_MARKER: &str = "#ff0000";
// Fraction of the chart height taken by the VTOL state strip.
pub const VTOL_STRIP_FRACTION: f64 = 0.06;

/// Flight modes keyed by `vehicle_status.nav_state`: (name, colour).
pub const FLIGHT_MODES: &[(i64, &str, &str)] = &[
    (0, "Manual", "#cc0000"),
    (1, "Altitude", "#eecc00"),
    (2, "Position", "#00cc33"),
    (3, "Mission", "#6666ff"),
    (4, "Loiter", "#6666ff"),
    (5, "Return to Land", "#6666ff"),
    (6, "RC Recovery", "#6666ff"),
    (7, "Return to groundstation", "#6666ff"),
    (8, "Land (engine fail)", "#6666ff"),
    (9, "Land (GPS fail)", "#6666ff"),
    (10, "Acro", "#66cc00"),
    (12, "Descend", "#6666ff"),
    (13, "Terminate", "#6666ff"),
    (14, "Offboard", "#00ccff"),
    (15, "Stabilized", "#0033cc"),
    (16, "Rattitude", "#ee9900"),
    (17, "Takeoff", "#6666ff"),
    (18, "Land", "#6666ff"),
    (19, "Follow Target", "#6666ff"),
    (20, "Precision Land", "#6666ff"),
    (21, "Orbit", "#6666ff"),
];

/// VTOL states: 1 = transition, 2 = fixed-wing, 3 = multicopter.
pub const VTOL_MODES: &[(i64, &str, &str)] = &[
    (1, "Transition", "#cc0000"),
    (2, "Fixed-Wing", "#eecc00"),
    (3, "Multicopter", "#0033cc"),
];

// --- Step response (windowed Wiener deconvolution) ---
pub const FRAME_LENGTH_S: f64 = 1.0; // Length of each window in seconds
pub const RESPONSE_LENGTH_S: f64 = 0.5; // Length of the step response kept from each window
pub const SUPERPOSITION_FACTOR: usize = 16; // Number of overlapping windows within a frame length
pub const TUKEY_ALPHA: f64 = 1.0; // 1.0 is a Hann window
pub const WIENER_REGULARIZATION: f32 = 0.0001;
pub const SETPOINT_THRESHOLD: f64 = 500.0; // Low/high input split (deg/s)
pub const MOVEMENT_THRESHOLD: f64 = 20.0; // Windows with less input are ignored
pub const MIN_SAMPLE_RATE_HZ: f64 = 100.0;

// Individual window quality control on the steady-state segment
pub const STEADY_STATE_START_S: f64 = 0.2;
pub const STEADY_STATE_END_S: f64 = 0.5;
pub const STEADY_STATE_MIN_VAL: f32 = 0.5;
pub const STEADY_STATE_MAX_VAL: f32 = 3.0;
pub const POST_AVERAGING_SMOOTHING_WINDOW: usize = 5;

pub const COLOR_STEP_RESPONSE_LOW_SP: &str = "#3f8dff";
pub const COLOR_STEP_RESPONSE_HIGH_SP: &str = "#e36c09";

// --- Spectra ---
pub const SPECTROGRAM_SEGMENT_LENGTH: usize = 256;
pub const SPECTROGRAM_OVERLAP: usize = 128;
pub const SPECTROGRAM_MIN_DB: f64 = -80.0;
// Columns of the spectrogram kept for rendering; more are averaged down.
pub const SPECTROGRAM_MAX_TIME_BINS: usize = 400;

// --- Map polyline ---
pub const MAP_MAX_POINTS: usize = 2000;
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
