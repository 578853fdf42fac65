//! Error types and utilities for covchart

use thiserror::Error;

/// Result type alias for covchart operations
pub type Result<T> = std::result::Result<T, CovChartError>;

/// Boxed error source carried by several variants
type Source = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for covchart operations
#[derive(Error, Debug)]
pub enum CovChartError {
    /// Configuration loading and parsing errors
    #[error("Configuration error: {message}")]
    Config {
        /// What failed
        message: String,
        /// Underlying parse or read error
        #[source]
        source: Option<Source>,
    },

    /// Validation errors for configuration values
    #[error("Validation error: {message}")]
    Validation {
        /// Rule that was broken
        message: String,
        /// Dotted path of the offending setting
        field: Option<String>,
    },

    /// A remote source was unreachable or returned malformed data
    #[error("Retrieval error: {message}")]
    Retrieval {
        /// What could not be fetched
        message: String,
        /// HTTP status, when the server answered
        status_code: Option<u16>,
        /// Underlying transport or decoding error
        #[source]
        source: Option<Source>,
    },

    /// A table did not have the shape a transformation expected
    #[error("Shape error: {message}")]
    Shape {
        /// What was wrong with the table
        message: String,
        /// Missing or unexpected column
        column: Option<String>,
    },

    /// Chart drawing or image encoding errors
    #[error("Render error: {message}")]
    Render {
        /// What failed to draw or encode
        message: String,
        /// Underlying drawing or encoder error
        #[source]
        source: Option<Source>,
    },

    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CovChartError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new configuration error with source
    pub fn config_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a new validation error with field name
    pub fn validation_field(msg: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new retrieval error
    pub fn retrieval(msg: impl Into<String>) -> Self {
        Self::Retrieval {
            message: msg.into(),
            status_code: None,
            source: None,
        }
    }

    /// Create a new retrieval error with the HTTP status that caused it
    pub fn retrieval_with_status(msg: impl Into<String>, status: u16) -> Self {
        Self::Retrieval {
            message: msg.into(),
            status_code: Some(status),
            source: None,
        }
    }

    /// Create a new retrieval error with source
    pub fn retrieval_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Retrieval {
            message: msg.into(),
            status_code: None,
            source: Some(Box::new(source)),
        }
    }

    /// Create a new shape error
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape {
            message: msg.into(),
            column: None,
        }
    }

    /// Create a shape error for a column the table does not have
    pub fn missing_column(column: impl Into<String>) -> Self {
        let column = column.into();
        Self::Shape {
            message: format!("expected column '{column}' is absent"),
            column: Some(column),
        }
    }

    /// Create a new render error
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new render error with source
    pub fn render_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Render {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true for errors raised while fetching remote data
    pub fn is_retrieval(&self) -> bool {
        matches!(self, Self::Retrieval { .. })
    }

    /// Returns true for errors raised while reshaping tables
    pub fn is_shape(&self) -> bool {
        matches!(self, Self::Shape { .. })
    }

    /// Returns true for filesystem errors
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

// Error conversion implementations for external types

/// Convert from reqwest::Error to CovChartError
impl From<reqwest::Error> for CovChartError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::retrieval_with_source("Request timeout", err)
        } else if err.is_connect() {
            Self::retrieval_with_source("Connection failed", err)
        } else if err.is_status() {
            let status_code = err.status().map(|s| s.as_u16());
            Self::Retrieval {
                message: format!("HTTP error: {}", status_code.unwrap_or(0)),
                status_code,
                source: Some(Box::new(err)),
            }
        } else if err.is_decode() {
            Self::retrieval_with_source("Malformed response body", err)
        } else {
            Self::retrieval_with_source("Network request failed", err)
        }
    }
}

/// Convert from csv::Error to CovChartError
impl From<csv::Error> for CovChartError {
    fn from(err: csv::Error) -> Self {
        Self::retrieval_with_source("Malformed CSV data", err)
    }
}

/// Convert from url::ParseError to CovChartError
impl From<url::ParseError> for CovChartError {
    fn from(err: url::ParseError) -> Self {
        Self::config_with_source("Invalid URL", err)
    }
}

/// Convert from serde_yaml::Error to CovChartError
impl From<serde_yaml::Error> for CovChartError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::config_with_source("YAML parsing error", err)
    }
}

/// Convert from toml::de::Error to CovChartError
impl From<toml::de::Error> for CovChartError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_source("TOML parsing error", err)
    }
}

/// Convert from image::ImageError to CovChartError
impl From<image::ImageError> for CovChartError {
    fn from(err: image::ImageError) -> Self {
        Self::render_with_source("Image encoding failed", err)
    }
}

#[cfg(feature = "plotters")]
/// Convert from plotters drawing errors to CovChartError
impl<T> From<plotters::drawing::DrawingAreaErrorKind<T>> for CovChartError
where
    T: std::error::Error + Send + Sync + 'static,
{
    fn from(err: plotters::drawing::DrawingAreaErrorKind<T>) -> Self {
        Self::render_with_source("Chart rendering failed", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{error::Error, io};

    #[test]
    fn test_error_creation() {
        let config_error = CovChartError::config("config issue");
        assert!(config_error.to_string().contains("Configuration error"));
        assert!(config_error.to_string().contains("config issue"));

        let retrieval_error = CovChartError::retrieval_with_status("Server error", 500);
        assert!(retrieval_error.is_retrieval());
        assert!(retrieval_error.to_string().contains("Server error"));

        let validation_error = CovChartError::validation_field("Invalid input", "output.dir");
        assert!(validation_error.to_string().contains("Validation error"));
        assert!(validation_error.to_string().contains("Invalid input"));
    }

    #[test]
    fn test_missing_column_names_the_column() {
        let error = CovChartError::missing_column("newDeaths28DaysByDeathDate");
        assert!(error.is_shape());
        assert_eq!(
            error.to_string(),
            "Shape error: expected column 'newDeaths28DaysByDeathDate' is absent"
        );
        match error {
            CovChartError::Shape { column, .. } => {
                assert_eq!(column.as_deref(), Some("newDeaths28DaysByDeathDate"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_error_with_source() {
        let config_source_error = CovChartError::config_with_source(
            "Config loading failed",
            io::Error::new(io::ErrorKind::PermissionDenied, "Access denied"),
        );

        assert!(config_source_error.to_string().contains("Config loading failed"));
        assert!(config_source_error.source().is_some());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "read-only");
        let error: CovChartError = io_error.into();

        assert!(error.is_io());
        assert!(error.to_string().contains("I/O error"));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_serde_error_conversion() {
        let serde_error = serde_json::from_str::<serde_json::Value>(r#"{"invalid": json}"#).unwrap_err();
        let error: CovChartError = serde_error.into();

        assert!(error.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_yaml_error_is_config_error() {
        let yaml_error = serde_yaml::from_str::<Vec<u32>>("[1, two").unwrap_err();
        let error: CovChartError = yaml_error.into();

        assert!(matches!(error, CovChartError::Config { .. }));
    }

    #[test]
    fn test_error_display_formatting() {
        let config_error = CovChartError::config("missing field");
        assert_eq!(format!("{}", config_error), "Configuration error: missing field");

        let render_error = CovChartError::render("no backend");
        assert_eq!(format!("{}", render_error), "Render error: no backend");
    }
}
