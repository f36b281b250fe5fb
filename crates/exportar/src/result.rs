//! Result and error types for exportar.

use thiserror::Error;

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// Errors that can occur while exporting a deck
#[derive(Debug, Error)]
pub enum ExportError {
    /// Invalid export options (bad range, bad dimensions, bad fps, ...)
    #[error("Invalid export options: {message}")]
    InvalidOptions {
        /// Error message
        message: String,
    },

    /// Required external tooling is missing or unusable
    #[error("Environment error: {message}")]
    Environment {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// In-page script evaluation error
    #[error("Page evaluation failed: {message}")]
    Evaluation {
        /// Error message
        message: String,
    },

    /// Screenshot capture error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// PDF production or post-processing error
    #[error("PDF export failed: {message}")]
    Pdf {
        /// Error message
        message: String,
    },

    /// Format renderer error (PNG, PPTX, Markdown)
    #[error("Render failed: {message}")]
    Render {
        /// Error message
        message: String,
    },

    /// The in-page step bridge is missing or unusable
    #[error("No step bridge found on the page (neither window.__slidev_export__ nor window.__slidev__.nav is present)")]
    NoStepBridge,

    /// The page failed to advance to the next step in time
    #[error("Failed to advance from step {no}.{clicks}")]
    StepAdvance {
        /// Slide number of the stuck step
        no: u32,
        /// Click index of the stuck step
        clicks: u32,
    },

    /// Video encoder process error
    #[error("Encoder failed: {message}")]
    Encoder {
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Export job not found (or expired)
    #[error("Export job not found")]
    JobNotFound,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExportError {
    /// Build an [`ExportError::InvalidOptions`]
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            message: message.into(),
        }
    }

    /// Build an [`ExportError::Environment`]
    #[must_use]
    pub fn environment(message: impl Into<String>) -> Self {
        Self::Environment {
            message: message.into(),
        }
    }

    /// Whether the error should be reported as a 400 at request time
    #[must_use]
    pub const fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidOptions { .. } | Self::Environment { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_options_display() {
        let err = ExportError::invalid("fps out of range");
        assert_eq!(err.to_string(), "Invalid export options: fps out of range");
        assert!(err.is_request_error());
    }

    #[test]
    fn test_step_advance_message_names_the_step_key() {
        let err = ExportError::StepAdvance { no: 3, clicks: 2 };
        assert_eq!(err.to_string(), "Failed to advance from step 3.2");
        assert!(!err.is_request_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ExportError = io.into();
        assert!(matches!(err, ExportError::Io(_)));
    }

    #[test]
    fn test_environment_is_request_error() {
        assert!(ExportError::environment("ffmpeg missing").is_request_error());
    }
}
