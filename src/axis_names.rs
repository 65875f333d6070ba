/// Centralized axis naming utilities
///
/// ULog field names use lowercase axis names (`roll`, `rollspeed`, `roll_d`),
/// chart titles use the capitalized form.
/// Get the standard axis name for a given index
///
/// # Arguments
/// * `index` - Axis index (0=Roll, 1=Pitch, 2=Yaw)
///
/// # Panics
/// Panics if index is greater than 2
pub fn axis_name(index: usize) -> &'static str {
    match index {
        0 => "Roll",
        1 => "Pitch",
        2 => "Yaw",
        _ => panic!(
            "Invalid axis index: {}. Expected 0 (Roll), 1 (Pitch), or 2 (Yaw)",
            index
        ),
    }
}

/// Lowercase field prefixes as they appear in ULog topics.
pub const AXIS_FIELDS: [&str; 3] = ["roll", "pitch", "yaw"];

/// Get all axis names as a static array
pub const AXIS_NAMES: [&str; 3] = ["Roll", "Pitch", "Yaw"];

/// First letter of the axis, as used in parameter names (`MC_RR_INT_LIM`).
pub fn axis_letter(index: usize) -> char {
    axis_name(index).chars().next().unwrap_or('R')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_name() {
        assert_eq!(axis_name(0), "Roll");
        assert_eq!(axis_name(1), "Pitch");
        assert_eq!(axis_name(2), "Yaw");
    }

    #[test]
    #[should_panic(expected = "Invalid axis index")]
    fn test_axis_name_panic() {
        axis_name(3);
    }

    #[test]
    fn test_axis_letters() {
        assert_eq!(axis_letter(0), 'R');
        assert_eq!(axis_letter(1), 'P');
        assert_eq!(axis_letter(2), 'Y');
    }

    #[test]
    fn test_fields_match_names() {
        for (field, name) in AXIS_FIELDS.iter().zip(AXIS_NAMES.iter()) {
            assert_eq!(field.to_string(), name.to_lowercase());
        }
    }
}
