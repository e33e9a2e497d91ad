//! Error types for the guided-tour engine.
//!
//! Only load-time errors ever reach a caller. Everything raised while a tour
//! is running is logged and swallowed by the engine.

use std::path::PathBuf;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Tour error: {0}")]
    Tour(#[from] TourError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised while reading the tour definition source.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Tour definition source not found: {}", path.display())]
    ResourceNotFound { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed tour definition source: {0}")]
    Parse(String),

    /// Rejects one guide; the rest of the source still loads.
    #[error("Guide {guide} rejected: {reason}")]
    InvalidGuide { guide: String, reason: String },
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

/// Non-fatal errors raised while handling tour signals.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TourError {
    #[error("Guide {name} not found")]
    GuideNotFound { name: String },

    #[error("Guide {active} is already running, cannot start {requested}")]
    AlreadyRunning { active: String, requested: String },

    #[error("No tour is running")]
    NotRunning,

    #[error("Step {step} is not the step being presented (current: {current})")]
    StepMismatch { step: String, current: String },

    #[error("Unsupported step type {step_type} for step {step}")]
    UnsupportedStepType { step: String, step_type: String },

    #[error("Survey has no property named {property}")]
    UnknownSurveyProperty { property: String },

    #[error("UI element {name} not found, anchoring to root")]
    AnchorUnresolved { name: String },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_errors_become_parse_errors() {
        let err = serde_json::from_str::<serde_json::Value>("[{").unwrap_err();
        let load: LoadError = err.into();
        assert!(matches!(load, LoadError::Parse(_)));
    }

    #[test]
    fn top_level_wraps_sources() {
        let err: Error = TourError::GuideNotFound {
            name: "Intro".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Tour error: Guide Intro not found");

        let err: Error = LoadError::ResourceNotFound {
            path: PathBuf::from("missing.json"),
        }
        .into();
        assert!(err.to_string().contains("missing.json"));
    }
}
