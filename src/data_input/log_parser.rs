// src/data_input/log_parser.rs

use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::data_input::flight_log::{Dataset, Dropout, FlightLog, LoggedMessage, ParameterChange};
use crate::error::{PlotError, Result};

/// Auxiliary CSV files that describe the log instead of a topic.
const AUX_SUFFIXES: [&str; 5] = ["params", "changed_params", "messages", "info", "dropouts"];

/// Multi-line info blocks read from `<stem>_<key>.txt`.
pub const INFO_MULTIPLE_KEYS: [&str; 6] = [
    "boot_console_output",
    "perf_top_preflight",
    "perf_top_postflight",
    "perf_counter_preflight",
    "perf_counter_postflight",
    "hardfault_plain",
];

/// Loads the CSV export of a log from `dir`.
///
/// Topic files are named `<stem>_<topic>_<multi_id>.csv`. When `stem` is
/// `None` it is inferred from the common prefix of the CSV file names.
pub fn load_csv_directory(dir: &Path, stem: Option<&str>) -> Result<FlightLog> {
    let csv_files = list_files_with_extension(dir, "csv")?;
    if csv_files.is_empty() {
        return Err(PlotError::EmptySeries(format!(
            "no CSV files in {}",
            dir.display()
        )));
    }

    let stem = match stem {
        Some(s) => s.to_string(),
        None => infer_stem(&csv_files).ok_or_else(|| {
            PlotError::Config(format!(
                "could not infer log name from the files in {}",
                dir.display()
            ))
        })?,
    };
    info!("Loading log '{}' from {}", stem, dir.display());

    let mut datasets = Vec::new();
    for path in &csv_files {
        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => continue,
        };
        let Some((topic, multi_id)) = split_topic_file_name(file_name, &stem) else {
            continue;
        };
        if multi_id.is_none() && AUX_SUFFIXES.contains(&topic.as_str()) {
            continue;
        }
        let Some(multi_id) = multi_id else {
            debug!("Ignoring '{}': no instance suffix", file_name);
            continue;
        };
        match read_topic_csv(path, &topic, multi_id) {
            Ok(dataset) => {
                debug!(
                    "  {} (instance {}): {} rows, {} fields",
                    topic,
                    multi_id,
                    dataset.len(),
                    dataset.data.len()
                );
                datasets.push(dataset);
            }
            Err(e) => warn!("Skipping '{}': {}", file_name, e),
        }
    }
    datasets.sort_by(|a, b| a.name.cmp(&b.name).then(a.multi_id.cmp(&b.multi_id)));

    let mut log = FlightLog::new(&stem, datasets);

    let aux = |suffix: &str| dir.join(format!("{stem}_{suffix}.csv"));
    if let Some(rows) = read_optional_rows(&aux("params"))? {
        for row in rows {
            if let (Some(name), Some(value)) = (row.first(), row.get(1).and_then(|v| parse_cell(v))) {
                log.initial_parameters.insert(name.clone(), value);
            }
        }
    }
    if let Some(rows) = read_optional_rows(&aux("changed_params"))? {
        for row in rows {
            if let (Some(t), Some(name), Some(value)) = (
                row.first().and_then(|v| parse_cell(v)),
                row.get(1),
                row.get(2).and_then(|v| parse_cell(v)),
            ) {
                log.changed_parameters.push(ParameterChange {
                    timestamp: t,
                    name: name.clone(),
                    value,
                });
            }
        }
    }
    if let Some(rows) = read_optional_rows(&aux("messages"))? {
        for row in rows {
            if let (Some(t), Some(level), Some(message)) =
                (row.first().and_then(|v| parse_cell(v)), row.get(1), row.get(2))
            {
                log.logged_messages.push(LoggedMessage {
                    timestamp: t,
                    level: level.clone(),
                    message: message.clone(),
                });
            }
        }
    }
    if let Some(rows) = read_optional_rows(&aux("info"))? {
        for row in rows {
            if let (Some(key), Some(value)) = (row.first(), row.get(1)) {
                log.msg_info.insert(key.clone(), value.clone());
            }
        }
    }
    if let Some(rows) = read_optional_rows(&aux("dropouts"))? {
        for row in rows {
            if let (Some(t), Some(d)) = (
                row.first().and_then(|v| parse_cell(v)),
                row.get(1).and_then(|v| parse_cell(v)),
            ) {
                log.dropouts.push(Dropout {
                    timestamp: t,
                    duration_ms: d,
                });
            }
        }
    }
    for key in INFO_MULTIPLE_KEYS {
        let path = dir.join(format!("{stem}_{key}.txt"));
        if path.exists() {
            let text = fs::read_to_string(&path)?;
            log.msg_info_multiple
                .insert(key.to_string(), text.lines().map(str::to_string).collect());
        }
    }

    info!(
        "Loaded {} datasets, {} parameters, {} messages, duration {:.1} s",
        log.datasets.len(),
        log.initial_parameters.len(),
        log.logged_messages.len(),
        log.duration_s()
    );
    Ok(log)
}

/// Reads one topic CSV. The header row names the fields; cells that do not
/// parse as numbers become NaN so that columns stay aligned.
pub fn read_topic_csv(path: &Path, topic: &str, multi_id: u32) -> Result<Dataset> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if !headers.iter().any(|h| h == "timestamp") {
        return Err(PlotError::MissingField {
            topic: topic.to_string(),
            field: "timestamp".to_string(),
        });
    }

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];
    for (row_index, result) in reader.records().enumerate() {
        match result {
            Ok(record) => {
                for (col, column) in columns.iter_mut().enumerate() {
                    let value = record.get(col).and_then(parse_cell).unwrap_or(f64::NAN);
                    column.push(value);
                }
            }
            Err(e) => {
                warn!("{}: skipping row {} due to CSV read error: {}", topic, row_index + 1, e);
            }
        }
    }

    let mut dataset = Dataset::new(topic, multi_id);
    for (name, column) in headers.into_iter().zip(columns) {
        dataset.data.insert(name, column);
    }
    Ok(dataset)
}

fn parse_cell(value: &str) -> Option<f64> {
    let v = value.trim();
    match v {
        "true" | "True" => Some(1.0),
        "false" | "False" => Some(0.0),
        _ => v.parse::<f64>().ok(),
    }
}

/// Records of an auxiliary CSV after its header row, `None` if the file
/// does not exist.
fn read_optional_rows(path: &Path) -> Result<Option<Vec<Vec<String>>>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(Some(rows))
}

fn list_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Splits `<stem>_<topic>_<multi_id>.csv` into `(topic, Some(multi_id))`.
/// Auxiliary files without an instance suffix return `(suffix, None)`.
pub fn split_topic_file_name(file_name: &str, stem: &str) -> Option<(String, Option<u32>)> {
    let rest = file_name.strip_prefix(stem)?.strip_prefix('_')?;
    let rest = rest.strip_suffix(".csv")?;
    if rest.is_empty() {
        return None;
    }
    match rest.rsplit_once('_') {
        Some((topic, id)) if !topic.is_empty() && !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) => {
            Some((topic.to_string(), id.parse().ok()))
        }
        _ => Some((rest.to_string(), None)),
    }
}

/// Leading words shared by many topic names. A common prefix ending in one
/// of them is most likely cut inside the topic name.
const TOPIC_NAME_WORDS: [&str; 10] = [
    "vehicle", "sensor", "actuator", "estimator", "battery", "input", "position", "rate", "rc", "system",
];

/// Infers the log stem from the common prefix of the file names. Prefixes
/// that have an auxiliary file (`<stem>_params.csv`, ...) win, otherwise the
/// longest prefix not ending in a common topic word is taken.
fn infer_stem(files: &[PathBuf]) -> Option<String> {
    let names: Vec<&str> = files
        .iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
        .collect();
    // A single file can not tell the stem apart from an underscore in the
    // topic name
    if names.len() < 2 {
        return None;
    }
    let first = names[0];
    let mut prefix_len = first.len();
    for name in &names[1..] {
        prefix_len = first
            .bytes()
            .zip(name.bytes())
            .take(prefix_len)
            .take_while(|(a, b)| a == b)
            .count();
    }
    // The byte-wise prefix may end inside a multi-byte character
    while !first.is_char_boundary(prefix_len) {
        prefix_len -= 1;
    }
    let prefix = &first[..prefix_len];
    let candidates: Vec<&str> = prefix
        .match_indices('_')
        .map(|(i, _)| &prefix[..i])
        .filter(|c| !c.is_empty())
        .collect();

    let has_aux_file = |stem: &str| {
        AUX_SUFFIXES
            .iter()
            .any(|suffix| names.contains(&format!("{stem}_{suffix}.csv").as_str()))
    };
    if let Some(stem) = candidates.iter().copied().rev().find(|c| has_aux_file(*c)) {
        return Some(stem.to_string());
    }
    candidates
        .iter()
        .copied()
        .rev()
        .find(|c| {
            let last_word = c.rsplit('_').next().unwrap_or("");
            !TOPIC_NAME_WORDS.contains(&last_word)
        })
        .map(|c| c.to_string())
}

/// Collected per-topic summary, used for debugging output.
pub fn topic_summary(log: &FlightLog) -> BTreeMap<String, usize> {
    log.datasets
        .iter()
        .map(|d| (format!("{}_{}", d.name, d.multi_id), d.len()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_topic_file_name() {
        assert_eq!(
            split_topic_file_name("log_vehicle_attitude_0.csv", "log"),
            Some(("vehicle_attitude".to_string(), Some(0)))
        );
        assert_eq!(
            split_topic_file_name("log_actuator_outputs_1.csv", "log"),
            Some(("actuator_outputs".to_string(), Some(1)))
        );
        assert_eq!(
            split_topic_file_name("log_params.csv", "log"),
            Some(("params".to_string(), None))
        );
        assert_eq!(split_topic_file_name("other_params.csv", "log"), None);
    }

    #[test]
    fn test_infer_stem() {
        let files = vec![
            PathBuf::from("/x/flight_01_cpuload_0.csv"),
            PathBuf::from("/x/flight_01_vehicle_status_0.csv"),
        ];
        assert_eq!(infer_stem(&files), Some("flight_01".to_string()));
    }

    #[test]
    fn test_infer_stem_with_shared_topic_word() {
        let files = vec![
            PathBuf::from("/x/flight_vehicle_attitude_0.csv"),
            PathBuf::from("/x/flight_vehicle_status_0.csv"),
        ];
        assert_eq!(infer_stem(&files), Some("flight".to_string()));

        let files = vec![
            PathBuf::from("/x/log_12_rate_ctrl_status_0.csv"),
            PathBuf::from("/x/log_12_rate_params.csv"),
        ];
        assert_eq!(infer_stem(&files), Some("log_12_rate".to_string()));
    }

    #[test]
    fn test_infer_stem_with_non_ascii_names() {
        // 'é' and 'è' share their first UTF-8 byte
        let files = vec![PathBuf::from("/x/é_a_0.csv"), PathBuf::from("/x/è_b_0.csv")];
        assert_eq!(infer_stem(&files), None);

        let files = vec![
            PathBuf::from("/x/vol_é_cpuload_0.csv"),
            PathBuf::from("/x/vol_é_vehicle_status_0.csv"),
        ];
        assert_eq!(infer_stem(&files), Some("vol_é".to_string()));
    }

    #[test]
    fn test_auxiliary_files_skip_header_row() {
        let dir = tempfile::TempDir::new().unwrap();
        let write = |name: &str, content: &str| fs::write(dir.path().join(name), content).unwrap();
        write("log_cpuload_0.csv", "timestamp,load\n1000000,0.2\n2000000,0.3\n");
        write("log_info.csv", "key,value\nsys_name,PX4\n");
        write("log_params.csv", "name,value\nSYS_AUTOSTART,4001\n");
        write("log_messages.csv", "timestamp,level,message\n1500000,6,Takeoff detected\n");

        let log = load_csv_directory(dir.path(), None).unwrap();
        assert_eq!(log.name, "log");
        assert_eq!(log.msg_info.len(), 1);
        assert_eq!(log.msg_info.get("sys_name").map(String::as_str), Some("PX4"));
        assert!(!log.msg_info.contains_key("key"));
        assert_eq!(log.initial_parameters.len(), 1);
        assert_eq!(log.logged_messages.len(), 1);
        assert_eq!(log.logged_messages[0].message, "Takeoff detected");
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell(" 1.5 "), Some(1.5));
        assert_eq!(parse_cell("true"), Some(1.0));
        assert_eq!(parse_cell("nan").map(|v| v.is_nan()), Some(true));
        assert_eq!(parse_cell("abc"), None);
    }
}
