// src/error.rs

use thiserror::Error;

/// Errors raised while loading a log or building a chart.
///
/// Chart builders treat `MissingTopic` and `MissingField` as soft failures:
/// the chart is skipped or replaced by a message panel.
#[derive(Debug, Error)]
pub enum PlotError {
    #[error("missing topic '{0}'")]
    MissingTopic(String),

    #[error("missing field '{field}' in topic '{topic}'")]
    MissingField { topic: String, field: String },

    #[error("empty series: {0}")]
    EmptySeries(String),

    #[error("length mismatch: {0} vs {1}")]
    LengthMismatch(usize, usize),

    #[error("analysis failed: {0}")]
    Analysis(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("render error: {0}")]
    Render(String),
}

impl PlotError {
    /// True for the errors a chart builder degrades on instead of propagating.
    pub fn is_missing_data(&self) -> bool {
        matches!(
            self,
            PlotError::MissingTopic(_) | PlotError::MissingField { .. } | PlotError::EmptySeries(_)
        )
    }
}

impl From<toml::de::Error> for PlotError {
    fn from(err: toml::de::Error) -> Self {
        PlotError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_data_classification() {
        assert!(PlotError::MissingTopic("cpuload".into()).is_missing_data());
        assert!(PlotError::MissingField {
            topic: "cpuload".into(),
            field: "load".into()
        }
        .is_missing_data());
        assert!(!PlotError::Analysis("no motion".into()).is_missing_data());
    }

    #[test]
    fn test_display() {
        let err = PlotError::MissingField {
            topic: "vehicle_attitude".into(),
            field: "roll".into(),
        };
        assert_eq!(
            err.to_string(),
            "missing field 'roll' in topic 'vehicle_attitude'"
        );
    }
}
