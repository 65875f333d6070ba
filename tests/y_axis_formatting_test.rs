// tests/y_axis_formatting_test.rs

use ulog_csv_render::plot_framework::{format_time_axis, format_y_axis_value};

#[test]
fn test_step_response_y_axis_formatting() {
    // Normalized step responses keep one decimal, even for whole numbers
    let label = "Response Strength";

    assert_eq!(format_y_axis_value(0.0, label), "0.0");
    assert_eq!(format_y_axis_value(0.2, label), "0.2");
    assert_eq!(format_y_axis_value(0.8, label), "0.8");
    assert_eq!(format_y_axis_value(1.0, label), "1.0");
    assert_eq!(format_y_axis_value(1.2, label), "1.2");
}

#[test]
fn test_time_series_y_axis_formatting() {
    let label = "[deg/s]";

    assert_eq!(format_y_axis_value(0.0, label), "0");
    assert_eq!(format_y_axis_value(10.0, label), "10");
    assert_eq!(format_y_axis_value(-100.0, label), "-100");
    assert_eq!(format_y_axis_value(0.5, label), "0.5");
    assert_eq!(format_y_axis_value(5.7, label), "5.7");

    assert_eq!(format_y_axis_value(1000.0, label), "1k");
    assert_eq!(format_y_axis_value(12500.0, label), "12k");
    assert_eq!(format_y_axis_value(25e3, "[us]"), "25k");

    assert_eq!(format_y_axis_value(1_000_000.0, label), "1.0M");
    assert_eq!(format_y_axis_value(2_500_000.0, label), "2.5M");
}

#[test]
fn test_db_and_frequency_y_axis_formatting() {
    let db_label = "Power [dB]";
    assert_eq!(format_y_axis_value(-60.0, db_label), "-60");
    assert_eq!(format_y_axis_value(-30.5, db_label), "-30");
    assert_eq!(format_y_axis_value(10.7, db_label), "11");

    // Spectrogram frequency axis stays in plain Hz
    assert_eq!(format_y_axis_value(1000.0, "[Hz]"), "1000");
}

#[test]
fn test_time_axis_formatting() {
    assert_eq!(format_time_axis(0.0), "0:00");
    assert_eq!(format_time_axis(65e6), "1:05");
    assert_eq!(format_time_axis(-3e6), "-0:03");
    assert_eq!(format_time_axis(f64::NAN), "");
}
