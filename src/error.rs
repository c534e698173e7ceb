// src/error.rs

//! Unified error handling for the monitor application.

use std::fmt;

use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Regular expression compilation failed
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Listing date text did not match the expected `day month time` shape.
    ///
    /// Never defaulted away: an unparseable date means the site layout
    /// changed and needs attention.
    #[error("Unrecognized date format: '{raw}'")]
    DateFormat { raw: String },

    /// One listing row failed structural extraction
    #[error("Row parse error in {context}: {message}")]
    ParseRow { context: String, message: String },

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a date format error.
    pub fn date_format(raw: impl Into<String>) -> Self {
        Self::DateFormat { raw: raw.into() }
    }

    /// Create a row parse error with context.
    pub fn parse_row(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::ParseRow {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
