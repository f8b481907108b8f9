//! Error types for the tracking and fusion pipeline.

use thiserror::Error;

/// Errors surfaced by the tracker and its collaborators.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// The alignment system became degenerate and no pose could be solved.
    #[error("tracking lost: {0}")]
    TrackingLost(String),

    /// A pose estimate contained non-finite components and was rejected.
    #[error("pose estimate invalid: {0}")]
    EstimatorInvalid(String),

    /// Invalid configuration or input that violates the configured geometry.
    #[error("configuration error: {0}")]
    Config(String),

    /// Underlying I/O failure while persisting extracted data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for TrackerError {
    fn from(err: toml::de::Error) -> Self {
        TrackerError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for TrackerError {
    fn from(err: toml::ser::Error) -> Self {
        TrackerError::Config(err.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrackerError::TrackingLost("singular normal equations".to_string());
        assert!(err.to_string().contains("tracking lost"));

        let err = TrackerError::Config("bad volume resolution".to_string());
        assert!(err.to_string().contains("configuration error"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: TrackerError = io_err.into();
        assert!(matches!(err, TrackerError::Io(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let bad = toml::from_str::<toml::Value>("not [ valid").unwrap_err();
        let err: TrackerError = bad.into();
        assert!(matches!(err, TrackerError::Config(_)));
    }
}
