//! Error types for the postgrab application.

use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // Request errors
    #[error("Invalid post URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    // Browser pool errors
    #[error("Failed to start browser: {0}")]
    Acquisition(String),

    #[error("Browser pool is shut down")]
    PoolClosed,

    #[error("Browser pool invariant violated: {0}")]
    PoolInvariant(String),

    // Pipeline errors
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("No media found on the page")]
    ExtractionEmpty,

    #[error("Download failed: {0}")]
    Fetch(String),

    #[error("Download failed ({original}); substitute content also failed ({fallback})")]
    Fallback { original: String, fallback: String },

    // File system errors
    #[error("Invalid filename (path traversal attempt): {0}")]
    InvalidFilename(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // URL parsing errors
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the pipeline can recover from this error by serving substitute content.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Error::Fallback { .. }
                | Error::Config(_)
                | Error::ConfigValidation { .. }
                | Error::InvalidUrl(_)
                | Error::UnsupportedPlatform(_)
        )
    }
}

/// Process exit codes.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const CONFIG_ERROR: i32 = 3;
    pub const DOWNLOAD_ERROR: i32 = 4;
    pub const UNEXPECTED_ERROR: i32 = 5;
    pub const SOME_REQUESTS_FAILED: i32 = 6;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_message_carries_both_reasons() {
        let err = Error::Fallback {
            original: "No media found on the page".into(),
            fallback: "HTTP 503".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("No media found"));
        assert!(msg.contains("HTTP 503"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_pipeline_errors_are_recoverable() {
        assert!(Error::Navigation("timeout".into()).is_recoverable());
        assert!(Error::ExtractionEmpty.is_recoverable());
        assert!(Error::Acquisition("spawn".into()).is_recoverable());
        assert!(Error::Fetch("reset".into()).is_recoverable());
    }
}
