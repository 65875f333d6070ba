// src/data_input/flight_log.rs

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{PlotError, Result};

/// One topic instance of the log: named numeric columns sharing the
/// `timestamp` column (microseconds).
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub name: String,
    pub multi_id: u32,
    pub data: BTreeMap<String, Vec<f64>>,
}

impl Dataset {
    pub fn new(name: &str, multi_id: u32) -> Self {
        Self {
            name: name.to_string(),
            multi_id,
            data: BTreeMap::new(),
        }
    }

    pub fn field(&self, field: &str) -> Result<&[f64]> {
        self.data
            .get(field)
            .map(|v| v.as_slice())
            .ok_or_else(|| PlotError::MissingField {
                topic: self.name.clone(),
                field: field.to_string(),
            })
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.data.contains_key(field)
    }

    pub fn timestamps(&self) -> Result<&[f64]> {
        self.field("timestamp")
    }

    pub fn len(&self) -> usize {
        self.data.get("timestamp").map_or(0, |t| t.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum of a field, NaN samples ignored.
    pub fn field_max(&self, field: &str) -> Result<f64> {
        let values = self.field(field)?;
        values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
            .ok_or_else(|| PlotError::EmptySeries(format!("{}.{}", self.name, field)))
    }

    /// Returns the first sample and every sample whose value differs from the
    /// one before it, as `(timestamp, value)`.
    pub fn list_value_changes(&self, field: &str) -> Result<Vec<(f64, f64)>> {
        let timestamps = self.timestamps()?;
        let values = self.field(field)?;
        let mut changes = Vec::new();
        let mut previous: Option<f64> = None;
        for (&t, &v) in timestamps.iter().zip(values.iter()) {
            let changed = match previous {
                None => true,
                // NaN != NaN would report every NaN sample as a change
                Some(p) => !(p == v || (p.is_nan() && v.is_nan())),
            };
            if changed {
                changes.push((t, v));
            }
            previous = Some(v);
        }
        Ok(changes)
    }

    pub fn rename_field(&mut self, from: &str, to: &str) {
        if let Some(values) = self.data.remove(from) {
            self.data.insert(to.to_string(), values);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggedMessage {
    pub timestamp: f64,
    pub level: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Dropout {
    pub timestamp: f64,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParameterChange {
    pub timestamp: f64,
    pub name: String,
    pub value: f64,
}

/// A decoded flight log: all topic instances plus the log-level metadata.
#[derive(Debug, Clone, Default)]
pub struct FlightLog {
    pub name: String,
    pub datasets: Vec<Dataset>,
    pub start_timestamp: f64,
    pub last_timestamp: f64,
    pub initial_parameters: BTreeMap<String, f64>,
    pub changed_parameters: Vec<ParameterChange>,
    pub logged_messages: Vec<LoggedMessage>,
    pub msg_info: BTreeMap<String, String>,
    pub msg_info_multiple: BTreeMap<String, Vec<String>>,
    pub dropouts: Vec<Dropout>,
}

impl FlightLog {
    pub fn new(name: &str, datasets: Vec<Dataset>) -> Self {
        let mut log = Self {
            name: name.to_string(),
            datasets,
            ..Default::default()
        };
        log.apply_compatibility_fixes();
        log.update_time_bounds();
        log
    }

    pub fn get_dataset(&self, name: &str, multi_id: u32) -> Result<&Dataset> {
        self.datasets
            .iter()
            .find(|d| d.name == name && d.multi_id == multi_id)
            .ok_or_else(|| PlotError::MissingTopic(format!("{name} (instance {multi_id})")))
    }

    pub fn has_topic(&self, name: &str) -> bool {
        self.datasets.iter().any(|d| d.name == name)
    }

    pub fn duration_s(&self) -> f64 {
        (self.last_timestamp - self.start_timestamp) / 1e6
    }

    pub fn is_replay(&self) -> bool {
        self.msg_info.contains_key("replay")
    }

    /// Recomputes start/last timestamps over all datasets.
    pub fn update_time_bounds(&mut self) {
        let mut start = f64::INFINITY;
        let mut last = f64::NEG_INFINITY;
        for dataset in &self.datasets {
            if let Ok(ts) = dataset.timestamps() {
                if let (Some(&first), Some(&end)) = (ts.first(), ts.last()) {
                    start = start.min(first);
                    last = last.max(end);
                }
            }
        }
        if start.is_finite() && last.is_finite() {
            self.start_timestamp = start;
            self.last_timestamp = last;
        } else {
            self.start_timestamp = 0.0;
            self.last_timestamp = 0.0;
        }
    }

    // Older firmware logged the power rails with upper-case unit letters.
    fn apply_compatibility_fixes(&mut self) {
        for dataset in self.datasets.iter_mut().filter(|d| d.name == "system_power") {
            dataset.rename_field("voltage5V_v", "voltage5v_v");
            dataset.rename_field("voltage3V3_v", "voltage3v3_v");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset_with(name: &str, fields: &[(&str, Vec<f64>)]) -> Dataset {
        let mut d = Dataset::new(name, 0);
        for (field, values) in fields {
            d.data.insert(field.to_string(), values.clone());
        }
        d
    }

    #[test]
    fn test_list_value_changes() {
        let d = dataset_with(
            "vehicle_status",
            &[
                ("timestamp", vec![0.0, 1.0, 2.0, 3.0, 4.0]),
                ("nav_state", vec![2.0, 2.0, 3.0, 3.0, 2.0]),
            ],
        );
        let changes = d.list_value_changes("nav_state").unwrap();
        assert_eq!(changes, vec![(0.0, 2.0), (2.0, 3.0), (4.0, 2.0)]);
    }

    #[test]
    fn test_missing_field_is_error() {
        let d = dataset_with("cpuload", &[("timestamp", vec![0.0])]);
        assert!(matches!(
            d.field("load"),
            Err(PlotError::MissingField { .. })
        ));
    }

    #[test]
    fn test_time_bounds_and_compat_rename() {
        let a = dataset_with("a", &[("timestamp", vec![10.0, 20.0])]);
        let b = dataset_with(
            "system_power",
            &[("timestamp", vec![5.0, 30.0]), ("voltage5V_v", vec![5.0, 5.1])],
        );
        let log = FlightLog::new("test", vec![a, b]);
        assert_eq!(log.start_timestamp, 5.0);
        assert_eq!(log.last_timestamp, 30.0);
        let power = log.get_dataset("system_power", 0).unwrap();
        assert!(power.has_field("voltage5v_v"));
        assert!(!power.has_field("voltage5V_v"));
    }

    #[test]
    fn test_missing_topic() {
        let log = FlightLog::new("test", vec![]);
        assert!(matches!(
            log.get_dataset("vehicle_attitude", 0),
            Err(PlotError::MissingTopic(_))
        ));
        assert_eq!(log.duration_s(), 0.0);
    }
}
