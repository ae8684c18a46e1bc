//! Error types for dnb-meta
//!
//! Only whole-query failures are errors. Per-field extraction problems
//! (missing subfields, malformed values) are absorbed locally and show up
//! as absent `Option`s on the resulting book record.

use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SRU diagnostic: {0}")]
    SruDiagnostic(String),

    #[error("Invalid SRU response: {0}")]
    InvalidResponse(String),

    #[error("XML decoding error: {0}")]
    Xml(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Insufficient search input: {0}")]
    InsufficientInput(String),

    #[error("No usable records found")]
    NoResult,
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
