// src/data_analysis/flight_modes.rs

use tracing::debug;

use crate::constants::{FLIGHT_MODES, VTOL_MODES};
use crate::data_input::flight_log::FlightLog;
use crate::error::{PlotError, Result};

/// Mode value of the closing sentinel entry.
pub const MODE_SENTINEL: i64 = -1;

pub const VTOL_STATE_TRANSITION: i64 = 1;
pub const VTOL_STATE_FIXED_WING: i64 = 2;
pub const VTOL_STATE_MULTICOPTER: i64 = 3;

/// `(timestamp_us, mode)` pairs; each mode holds until the next entry.
pub type ModeChanges = Vec<(f64, i64)>;

/// Navigation state changes from `vehicle_status`, closed with
/// `(last_timestamp, -1)`. An empty list when the topic is missing.
pub fn get_flight_mode_changes(log: &FlightLog) -> ModeChanges {
    let mut changes: ModeChanges = match log
        .get_dataset("vehicle_status", 0)
        .and_then(|d| d.list_value_changes("nav_state"))
    {
        Ok(list) => list
            .into_iter()
            .filter(|(_, v)| v.is_finite())
            .map(|(t, v)| (t, v as i64))
            .collect(),
        Err(e) => {
            debug!("No flight mode changes: {}", e);
            Vec::new()
        }
    };
    changes.push((log.last_timestamp, MODE_SENTINEL));
    changes
}

/// VTOL state changes (1 = transition, 2 = fixed-wing, 3 = multicopter),
/// closed with a sentinel. `None` for non-VTOL vehicles or missing fields.
pub fn get_vtol_states(log: &FlightLog) -> Option<ModeChanges> {
    match compute_vtol_states(log) {
        Ok(states) => states,
        Err(e) => {
            debug!("No VTOL states: {}", e);
            None
        }
    }
}

fn compute_vtol_states(log: &FlightLog) -> Result<Option<ModeChanges>> {
    let status = log.get_dataset("vehicle_status", 0)?;
    if status.field_max("is_vtol")? != 1.0 {
        return Ok(None);
    }
    let transitions = status.list_value_changes("in_transition_mode")?;

    // Older logs only have the is_rotary_wing flag
    let (type_field, fixed_wing_value, multicopter_value) = if status.has_field("vehicle_type") {
        ("vehicle_type", 2.0, 1.0)
    } else {
        ("is_rotary_wing", 0.0, 1.0)
    };
    let vehicle_type = status.field(type_field)?;
    let timestamps = status.timestamps()?;

    let mut states = ModeChanges::with_capacity(transitions.len() + 1);
    for (t, value) in transitions {
        if value == 0.0 {
            // State after the transition: sample right after the change
            let idx = timestamps.partition_point(|&ts| ts < t) + 1;
            let sample = *vehicle_type
                .get(idx)
                .ok_or_else(|| PlotError::EmptySeries(format!("vehicle_status.{type_field} at {idx}")))?;
            let state = if sample == fixed_wing_value {
                VTOL_STATE_FIXED_WING
            } else if sample == multicopter_value {
                VTOL_STATE_MULTICOPTER
            } else {
                return Err(PlotError::Analysis(format!(
                    "unexpected {type_field} value {sample}"
                )));
            };
            states.push((t, state));
        } else {
            states.push((t, VTOL_STATE_TRANSITION));
        }
    }
    states.push((log.last_timestamp, MODE_SENTINEL));
    Ok(Some(states))
}

/// Name and colour of a navigation state.
pub fn flight_mode_style(mode: i64) -> Option<(&'static str, &'static str)> {
    FLIGHT_MODES
        .iter()
        .find(|(id, _, _)| *id == mode)
        .map(|&(_, name, color)| (name, color))
}

pub fn vtol_mode_style(state: i64) -> Option<(&'static str, &'static str)> {
    VTOL_MODES
        .iter()
        .find(|(id, _, _)| *id == state)
        .map(|&(_, name, color)| (name, color))
}

/// Consecutive `(start, end, mode)` intervals, sentinel excluded.
pub fn mode_intervals(changes: &[(f64, i64)]) -> Vec<(f64, f64, i64)> {
    changes
        .windows(2)
        .map(|w| (w[0].0, w[1].0, w[0].1))
        .filter(|&(_, _, mode)| mode != MODE_SENTINEL)
        .collect()
}

/// Number of completed transitions into fixed-wing or multicopter state.
pub fn count_vtol_transitions(states: &[(f64, i64)]) -> (usize, usize) {
    let mut to_fw = 0;
    let mut to_mc = 0;
    for w in states.windows(2) {
        if w[0].1 == VTOL_STATE_TRANSITION {
            match w[1].1 {
                VTOL_STATE_FIXED_WING => to_fw += 1,
                VTOL_STATE_MULTICOPTER => to_mc += 1,
                _ => {}
            }
        }
    }
    (to_fw, to_mc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_input::flight_log::Dataset;

    fn status(fields: &[(&str, Vec<f64>)]) -> FlightLog {
        let mut d = Dataset::new("vehicle_status", 0);
        for (name, values) in fields {
            d.data.insert(name.to_string(), values.clone());
        }
        FlightLog::new("test", vec![d])
    }

    #[test]
    fn test_flight_mode_changes_with_sentinel() {
        let log = status(&[
            ("timestamp", vec![0.0, 10.0, 20.0, 30.0]),
            ("nav_state", vec![0.0, 0.0, 2.0, 3.0]),
        ]);
        let changes = get_flight_mode_changes(&log);
        assert_eq!(changes, vec![(0.0, 0), (20.0, 2), (30.0, 3), (30.0, -1)]);
        assert_eq!(mode_intervals(&changes), vec![(0.0, 20.0, 0), (20.0, 30.0, 2), (30.0, 30.0, 3)]);
    }

    #[test]
    fn test_flight_mode_changes_missing_topic() {
        let log = FlightLog::new("empty", vec![]);
        assert_eq!(get_flight_mode_changes(&log), vec![(0.0, -1)]);
    }

    #[test]
    fn test_vtol_states_vehicle_type() {
        let log = status(&[
            ("timestamp", vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]),
            ("is_vtol", vec![1.0; 6]),
            ("in_transition_mode", vec![0.0, 1.0, 1.0, 0.0, 0.0, 0.0]),
            ("vehicle_type", vec![1.0, 1.0, 1.0, 1.0, 2.0, 2.0]),
        ]);
        let states = get_vtol_states(&log).unwrap();
        assert_eq!(states, vec![(0.0, 3), (1.0, 1), (3.0, 2), (5.0, -1)]);
        assert_eq!(count_vtol_transitions(&states), (1, 0));
    }

    #[test]
    fn test_vtol_states_rotary_wing_fallback() {
        let log = status(&[
            ("timestamp", vec![0.0, 1.0, 2.0]),
            ("is_vtol", vec![1.0; 3]),
            ("in_transition_mode", vec![0.0, 0.0, 0.0]),
            ("is_rotary_wing", vec![1.0, 1.0, 1.0]),
        ]);
        assert_eq!(get_vtol_states(&log).unwrap(), vec![(0.0, 3), (2.0, -1)]);
    }

    #[test]
    fn test_not_vtol_or_missing_fields() {
        let log = status(&[("timestamp", vec![0.0]), ("is_vtol", vec![0.0])]);
        assert!(get_vtol_states(&log).is_none());
        let log = status(&[("timestamp", vec![0.0]), ("is_vtol", vec![1.0])]);
        assert!(get_vtol_states(&log).is_none());
    }

    #[test]
    fn test_styles() {
        assert_eq!(flight_mode_style(2), Some(("Position", "#00cc33")));
        assert_eq!(vtol_mode_style(1).map(|s| s.0), Some("Transition"));
        assert!(flight_mode_style(99).is_none());
    }
}
