// tests/render_pipeline_test.rs

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use ulog_csv_render::config::PlotConfig;
use ulog_csv_render::data_input::log_parser::load_csv_directory;
use ulog_csv_render::page_builder::{generate_plots, get_pid_analysis_plots};

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn rows(n: usize, row: impl Fn(usize) -> String) -> String {
    (0..n).map(|i| row(i) + "\n").collect()
}

/// A short hover-and-move log with a handful of topics.
fn write_log(dir: &Path) {
    let n = 50;
    let t = |i: usize| 1_000_000 + i * 100_000;

    write(
        dir,
        "flight_cpuload_0.csv",
        &("timestamp,load,ram_usage\n".to_string() + &rows(n, |i| format!("{},0.{},0.4", t(i), 2 + i % 5))),
    );
    write(
        dir,
        "flight_vehicle_status_0.csv",
        &("timestamp,nav_state,is_vtol,vehicle_type\n".to_string()
            + &rows(n, |i| format!("{},{},0,1", t(i), if i < 20 { 0 } else { 2 }))),
    );
    write(
        dir,
        "flight_vehicle_local_position_0.csv",
        &("timestamp,x,y,z,vx,vy,vz\n".to_string()
            + &rows(n, |i| format!("{},{},{},-2.0,1.0,0.5,0.0", t(i), i as f64 * 0.1, i as f64 * 0.05))),
    );
    write(
        dir,
        "flight_vehicle_gps_position_0.csv",
        &("timestamp,lat,lon,alt,fix_type,eph,epv,satellites_used,noise_per_ms,jamming_indicator\n".to_string()
            + &rows(n, |i| format!("{},{},85456000,488000,3,0.8,1.2,14,80,20", t(i), 473977000 + i))),
    );
    write(dir, "flight_params.csv", "name,value\nSYS_AUTOSTART,4001\nMC_ROLLRATE_P,0.15\n");
    write(dir, "flight_messages.csv", "timestamp,level,message\n2000000,6,[commander] Armed by RC\n");
    write(dir, "flight_info.csv", "key,value\nsys_name,PX4\nver_hw,PX4_FMU_V5\n");
    write(dir, "flight_perf_top_preflight.txt", "PID COMMAND\n0 Idle Task\n");
}

#[test]
fn test_main_page_from_csv_directory() {
    let input = TempDir::new().unwrap();
    write_log(input.path());

    let log = load_csv_directory(input.path(), None).unwrap();
    assert_eq!(log.name, "flight");
    assert_eq!(log.datasets.len(), 4);
    assert_eq!(log.initial_parameters.get("SYS_AUTOSTART"), Some(&4001.0));

    let page = generate_plots(&log, &PlotConfig::default());
    let titles: Vec<&str> = page.charts().map(|c| c.title.as_str()).collect();
    assert_eq!(titles.first(), Some(&"Local Position"));
    assert!(titles.contains(&"Local Position X"));
    assert!(titles.contains(&"CPU & RAM"));
    assert!(titles.contains(&"GPS Uncertainty"));
    assert!(!titles.contains(&"Power"));

    assert!(page.template.has_position_data);
    // Manual, then Position
    assert_eq!(page.template.pos_datas.len(), 2);
    assert_eq!(page.template.pos_flight_modes[1].0, "Position");
    assert!(page.template.info_table_html.contains("PX4_FMU_V5"));
    assert!(page.template.additional_info.as_deref().unwrap_or("").contains("0 Idle Task"));
    assert_eq!(page.template.plots.len(), titles.len());

    let output = TempDir::new().unwrap();
    let written = page.write(output.path(), &log.name, false).unwrap();
    assert_eq!(written.len(), 2);

    let manifest = fs::read_to_string(output.path().join("flight_manifest.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&manifest).unwrap();
    assert_eq!(json["title"], "Flight Review");
    assert_eq!(json["items"][0]["type"], "chart");
    assert_eq!(json["items"][0]["content"]["title"], "Local Position");

    let html = fs::read_to_string(output.path().join("flight.html")).unwrap();
    assert!(html.contains("<div id=\"Nav-CPU-_-RAM\">"));
    assert!(html.contains("[commander] Armed by RC"));
}

#[test]
fn test_pid_page_with_missing_topics() {
    let input = TempDir::new().unwrap();
    write_log(input.path());
    let log = load_csv_directory(input.path(), Some("flight")).unwrap();

    let page = get_pid_analysis_plots(&log, &PlotConfig::default());
    assert_eq!(page.charts().count(), 0);
    let output = TempDir::new().unwrap();
    page.write(output.path(), "flight_pid_analysis", false).unwrap();
    let html = fs::read_to_string(output.path().join("flight_pid_analysis.html")).unwrap();
    assert!(html.contains("missing topics"));
}

#[test]
fn test_config_overrides_from_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plots.toml");
    fs::write(&path, "plot_width = 1200\nrender_png = false\n").unwrap();
    let config = PlotConfig::from_toml_file(&path).unwrap();
    assert_eq!(config.plot_width, 1200);
    assert!(!config.render_png);
    assert_eq!(config.plot_height_small, PlotConfig::default().plot_height_small);

    assert!(PlotConfig::from_toml_str("plot_width = 0").is_err());
}
