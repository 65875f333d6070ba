// src/plotted_tables.rs

use crate::data_analysis::flight_modes::count_vtol_transitions;
use crate::data_input::flight_log::{Dataset, FlightLog};

/// Log message levels as logged (`'0'` is the most severe).
const LOG_LEVELS: [&str; 8] = ["EMERGENCY", "ALERT", "CRITICAL", "ERROR", "WARNING", "NOTICE", "INFO", "DEBUG"];

// Current samples below this are treated as not measured
const MIN_BATTERY_CURRENT_A: f64 = 0.1;

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `m:ss` for a duration in seconds.
pub fn format_minutes_seconds(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// `h:mm:ss` for a duration in seconds.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

pub fn get_heading_html(log: &FlightLog, title: &str, links: &[(&str, &str)]) -> String {
    let mut html = format!("<h3>{}</h3>\n", escape_html(title));
    let mut subtitle = Vec::new();
    if let Some(sys_name) = log.msg_info.get("sys_name") {
        subtitle.push(escape_html(sys_name));
    }
    if !log.name.is_empty() {
        subtitle.push(escape_html(&log.name));
    }
    if !subtitle.is_empty() {
        html.push_str(&format!("<p>{}</p>\n", subtitle.join(" - ")));
    }
    if !links.is_empty() {
        let anchors: Vec<String> = links
            .iter()
            .map(|(label, href)| format!("<a href=\"{}\">{}</a>", escape_html(href), escape_html(label)))
            .collect();
        html.push_str(&format!("<p>{}</p>\n", anchors.join(" | ")));
    }
    html
}

fn first_value(d: &Dataset, field: &str) -> Option<f64> {
    d.field(field).ok()?.iter().copied().find(|v| v.is_finite())
}

fn vehicle_type(log: &FlightLog) -> Option<&'static str> {
    let status = log.get_dataset("vehicle_status", 0).ok()?;
    if status.field_max("is_vtol").ok() == Some(1.0) {
        return Some("VTOL");
    }
    if let Some(t) = first_value(status, "vehicle_type") {
        return match t as i64 {
            1 => Some("Multicopter"),
            2 => Some("Fixed Wing"),
            3 => Some("Rover"),
            4 => Some("Airship"),
            _ => None,
        };
    }
    match first_value(status, "is_rotary_wing")? as i64 {
        1 => Some("Multicopter"),
        _ => Some("Fixed Wing"),
    }
}

/// Horizontal distance travelled, summed over local position samples.
pub fn distance_travelled_m(log: &FlightLog) -> Option<f64> {
    let d = log.get_dataset("vehicle_local_position", 0).ok()?;
    let x = d.field("x").ok()?;
    let y = d.field("y").ok()?;
    let distance = x
        .windows(2)
        .zip(y.windows(2))
        .map(|(x, y)| (x[1] - x[0]).hypot(y[1] - y[0]))
        .filter(|d| d.is_finite())
        .sum();
    Some(distance)
}

fn finite_min_max(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn finite_mean_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (sum, count, max) = values
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize, f64::NEG_INFINITY), |(s, n, m), v| (s + v, n + 1, m.max(v)));
    (count > 0).then(|| (sum / count as f64, max))
}

/// Average and maximum speed in m/s from the local velocity.
pub fn speed_stats(log: &FlightLog) -> Option<(f64, f64)> {
    let d = log.get_dataset("vehicle_local_position", 0).ok()?;
    let vx = d.field("vx").ok()?;
    let vy = d.field("vy").ok()?;
    let vz = d.field("vz").ok()?;
    finite_mean_max(
        vx.iter()
            .zip(vy.iter())
            .zip(vz.iter())
            .map(|((x, y), z)| (x * x + y * y + z * z).sqrt()),
    )
}

/// Maximum tilt from the attitude quaternion, in degrees.
pub fn max_tilt_deg(log: &FlightLog) -> Option<f64> {
    let d = log.get_dataset("vehicle_attitude", 0).ok()?;
    let q1 = d.field("q[1]").ok()?;
    let q2 = d.field("q[2]").ok()?;
    q1.iter()
        .zip(q2.iter())
        .map(|(a, b)| (1.0 - 2.0 * (a * a + b * b)).clamp(-1.0, 1.0).acos().to_degrees())
        .filter(|v| v.is_finite())
        .reduce(f64::max)
}

/// Maximum norm of the body rates, in deg/s.
pub fn max_rotation_speed_deg(log: &FlightLog) -> Option<f64> {
    let d = log.get_dataset("vehicle_attitude", 0).ok()?;
    let p = d.field("rollspeed").ok()?;
    let q = d.field("pitchspeed").ok()?;
    let r = d.field("yawspeed").ok()?;
    p.iter()
        .zip(q.iter())
        .zip(r.iter())
        .map(|((p, q), r)| (p * p + q * q + r * r).sqrt().to_degrees())
        .filter(|v| v.is_finite())
        .reduce(f64::max)
}

/// Key-value table with the flight summary shown on top of the page.
pub fn get_info_table_html(log: &FlightLog, vtol_states: Option<&[(f64, i64)]>) -> String {
    let mut rows: Vec<(&str, String)> = Vec::new();

    if let Some(vehicle) = vehicle_type(log) {
        rows.push(("Vehicle type", vehicle.to_string()));
    }
    if let Some(autostart) = log.initial_parameters.get("SYS_AUTOSTART") {
        rows.push(("Airframe", format!("{autostart}")));
    }
    if let Some(hw) = log.msg_info.get("ver_hw") {
        rows.push(("Hardware", hw.clone()));
    }
    if let Some(sw) = log.msg_info.get("ver_sw") {
        let release = log.msg_info.get("ver_sw_release").map(|r| format!(" ({r})")).unwrap_or_default();
        rows.push(("Software Version", format!("{sw}{release}")));
    }
    if let Some(os) = log.msg_info.get("sys_os_name") {
        let version = log.msg_info.get("sys_os_ver").map(|v| format!(" {v}")).unwrap_or_default();
        rows.push(("OS Version", format!("{os}{version}")));
    }
    rows.push(("Logging Start", format_minutes_seconds(log.start_timestamp / 1e6)));
    rows.push(("Logging Duration", format_duration(log.duration_s())));
    if !log.dropouts.is_empty() {
        let total_s: f64 = log.dropouts.iter().map(|d| d.duration_ms).sum::<f64>() / 1000.0;
        rows.push(("Dropouts", format!("{} ({:.1} s)", log.dropouts.len(), total_s)));
    }
    if let Some(distance) = distance_travelled_m(log) {
        let text = if distance > 1000.0 {
            format!("{:.2} km", distance / 1000.0)
        } else {
            format!("{distance:.1} m")
        };
        rows.push(("Distance", text));
    }
    let altitude_range = log
        .get_dataset("vehicle_global_position", 0)
        .ok()
        .and_then(|d| d.field("alt").ok())
        .and_then(finite_min_max);
    if let Some((lo, hi)) = altitude_range {
        rows.push(("Max Altitude Difference", format!("{:.0} m", hi - lo)));
    }
    if let Some((avg, max)) = speed_stats(log) {
        rows.push(("Average Speed", format!("{:.1} km/h", avg * 3.6)));
        rows.push(("Max Speed", format!("{:.1} km/h", max * 3.6)));
    }
    if let Some(tilt) = max_tilt_deg(log) {
        rows.push(("Max Tilt Angle", format!("{tilt:.1} deg")));
    }
    if let Some(rate) = max_rotation_speed_deg(log) {
        rows.push(("Max Rotation Speed", format!("{rate:.1} deg/s")));
    }
    let current = log
        .get_dataset("battery_status", 0)
        .ok()
        .and_then(|d| d.field("current_a").ok())
        .and_then(|c| finite_mean_max(c.iter().copied().filter(|v| *v > MIN_BATTERY_CURRENT_A)));
    if let Some((avg, max)) = current {
        rows.push(("Average Current", format!("{avg:.1} A")));
        rows.push(("Max Current", format!("{max:.1} A")));
    }
    if let Some(states) = vtol_states {
        let (to_fw, to_mc) = count_vtol_transitions(states);
        rows.push(("VTOL Transitions", format!("{to_fw} to Fixed-Wing, {to_mc} to Multicopter")));
    }

    let mut html = String::from("<table class=\"info-table\">\n");
    for (key, value) in rows {
        html.push_str(&format!("<tr><td>{}</td><td>{}</td></tr>\n", key, escape_html(&value)));
    }
    html.push_str("</table>\n");
    html
}

/// Charts that could not be drawn and why.
pub fn get_error_labels_html(skipped: &[String]) -> String {
    if skipped.is_empty() {
        return String::new();
    }
    let items: String = skipped
        .iter()
        .map(|s| format!("<li>{}</li>\n", escape_html(s)))
        .collect();
    format!("<details class=\"error-labels\"><summary>Skipped charts ({})</summary>\n<ul>\n{}</ul>\n</details>\n", skipped.len(), items)
}

pub fn get_hardfault_html(log: &FlightLog) -> Option<String> {
    let hardfault = log.msg_info_multiple.get("hardfault_plain")?;
    if hardfault.is_empty() {
        return None;
    }
    Some(format!(
        "<div class=\"alert alert-danger\">\n<h4>Software Crash</h4>\n\
         <p>This log contains hardfault data from a software crash.</p>\n\
         <pre>{}</pre>\n</div>\n",
        escape_html(&hardfault.join("\n"))
    ))
}

pub fn get_corrupt_log_html(log: &FlightLog) -> Option<String> {
    let corrupt = log.msg_info.get("file_corrupt")?;
    if corrupt.trim() == "0" || corrupt.trim().eq_ignore_ascii_case("false") {
        return None;
    }
    Some(
        "<div class=\"alert alert-warning\">\n<h4>Detected Corrupt Log</h4>\n\
         <p>The log contains corrupt data. Some of the plots might be wrong or missing.</p>\n</div>\n"
            .to_string(),
    )
}

/// Table of all parameters at the start of the log.
pub fn get_changed_parameters(log: &FlightLog) -> String {
    let mut html = String::from("<h5>Parameters</h5>\n<table class=\"params\">\n<tr><th>Name</th><th>Value</th></tr>\n");
    for (name, value) in &log.initial_parameters {
        html.push_str(&format!("<tr><td>{}</td><td>{}</td></tr>\n", escape_html(name), value));
    }
    html.push_str("</table>\n");
    html
}

fn level_name(level: &str) -> &str {
    level
        .parse::<usize>()
        .ok()
        .and_then(|i| LOG_LEVELS.get(i).copied())
        .unwrap_or(level)
}

/// Logged messages with their time since the start of the log.
pub fn get_logged_messages(log: &FlightLog) -> String {
    let mut html = String::from("<h5>Logged Messages</h5>\n");
    if log.logged_messages.is_empty() {
        html.push_str("<p>No logged messages</p>\n");
        return html;
    }
    html.push_str("<table class=\"messages\">\n<tr><th>Time</th><th>Level</th><th>Message</th></tr>\n");
    for message in &log.logged_messages {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            format_minutes_seconds((message.timestamp - log.start_timestamp) / 1e6),
            escape_html(level_name(&message.level)),
            escape_html(&message.message)
        ));
    }
    html.push_str("</table>\n");
    html
}

/// Boot console output, process lists and performance counters before and
/// after the flight, hidden in a collapsed block.
pub fn get_additional_info_html(log: &FlightLog) -> Option<String> {
    let pre = |text: &[String]| format!("<pre>{}</pre>", escape_html(&text.join("\n")));
    let mut sections = String::new();

    if let Some(console) = log.msg_info_multiple.get("boot_console_output") {
        sections.push_str(&format!("<h5>Console Output</h5>\n<p>{}</p>\n", pre(console.as_slice())));
    }
    for (heading, key) in [("Processes", "perf_top"), ("Performance Counters", "perf_counter")] {
        let mut body = String::new();
        for (state, label) in [("pre", "Pre"), ("post", "Post")] {
            if let Some(text) = log.msg_info_multiple.get(&format!("{key}_{state}flight")) {
                body.push_str(&format!("<p>{label} Flight:<br/>{}</p>\n", pre(text.as_slice())));
            }
        }
        if !body.is_empty() {
            sections.push_str(&format!("<h5>{heading}</h5>\n{body}"));
        }
    }

    if sections.is_empty() {
        return None;
    }
    Some(format!(
        "<details id=\"show-additional-data\">\n<summary>Show additional Data</summary>\n{sections}</details>\n"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_input::flight_log::{Dropout, LoggedMessage};

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a & 'b'>"), "&lt;a &amp; &#x27;b&#x27;&gt;");
    }

    #[test]
    fn test_time_formats() {
        assert_eq!(format_minutes_seconds(75.9), "1:15");
        assert_eq!(format_duration(3725.0), "1:02:05");
    }

    #[test]
    fn test_info_table() {
        let mut pos = Dataset::new("vehicle_local_position", 0);
        pos.data.insert("timestamp".into(), vec![2e6, 3e6, 4e6]);
        pos.data.insert("x".into(), vec![0.0, 3.0, 3.0]);
        pos.data.insert("y".into(), vec![0.0, 4.0, 4.0]);
        pos.data.insert("vx".into(), vec![0.0, 5.0, 0.0]);
        pos.data.insert("vy".into(), vec![0.0, 0.0, 0.0]);
        pos.data.insert("vz".into(), vec![0.0, 0.0, 0.0]);
        let mut log = FlightLog::new("log", vec![pos]);
        log.msg_info.insert("ver_hw".into(), "PX4_FMU_V5".into());
        log.initial_parameters.insert("SYS_AUTOSTART".into(), 4001.0);
        log.dropouts.push(Dropout {
            timestamp: 2.5e6,
            duration_ms: 300.0,
        });
        let html = get_info_table_html(&log, Some(&[(2e6, 3), (3e6, 1), (3.5e6, 2), (4e6, -1)]));
        assert!(html.contains("<tr><td>Airframe</td><td>4001</td></tr>"));
        assert!(html.contains("<tr><td>Hardware</td><td>PX4_FMU_V5</td></tr>"));
        assert!(html.contains("<tr><td>Logging Duration</td><td>0:00:02</td></tr>"));
        assert!(html.contains("<tr><td>Dropouts</td><td>1 (0.3 s)</td></tr>"));
        assert!(html.contains("<tr><td>Distance</td><td>5.0 m</td></tr>"));
        assert!(html.contains("<tr><td>Max Speed</td><td>18.0 km/h</td></tr>"));
        assert!(html.contains("1 to Fixed-Wing, 0 to Multicopter"));
    }

    #[test]
    fn test_logged_messages() {
        let mut d = Dataset::new("cpuload", 0);
        d.data.insert("timestamp".into(), vec![1e6, 100e6]);
        let mut log = FlightLog::new("log", vec![d]);
        log.logged_messages.push(LoggedMessage {
            timestamp: 66e6,
            level: "4".into(),
            message: "Baro <stale>".into(),
        });
        let html = get_logged_messages(&log);
        assert!(html.contains("<td>1:05</td><td>WARNING</td><td>Baro &lt;stale&gt;</td>"));
    }

    #[test]
    fn test_additional_info() {
        let mut log = FlightLog::new("log", Vec::new());
        assert!(get_additional_info_html(&log).is_none());
        log.msg_info_multiple
            .insert("perf_top_postflight".into(), vec!["PID COMMAND".into(), "0 Idle <task>".into()]);
        let html = get_additional_info_html(&log).unwrap();
        assert!(html.contains("<h5>Processes</h5>"));
        assert!(html.contains("Post Flight:<br/><pre>PID COMMAND\n0 Idle &lt;task&gt;</pre>"));
        assert!(!html.contains("Console Output"));
    }

    #[test]
    fn test_corrupt_and_hardfault() {
        let mut log = FlightLog::new("log", Vec::new());
        assert!(get_corrupt_log_html(&log).is_none());
        log.msg_info.insert("file_corrupt".into(), "1".into());
        assert!(get_corrupt_log_html(&log).is_some());
        log.msg_info_multiple.insert("hardfault_plain".into(), vec!["r0 <0x1>".into()]);
        assert!(get_hardfault_html(&log).unwrap().contains("r0 &lt;0x1&gt;"));
    }
}
