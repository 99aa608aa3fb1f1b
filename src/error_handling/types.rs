//! Error type definitions.
//!
//! Pre-check classification outcomes are *not* errors; they steer the
//! orchestrator and live in [`crate::precheck`]. The types here cover
//! genuine failures: boot problems, storage problems, and scan-side
//! failures that the orchestrator recovers into fallback responses.

use reqwest::Error as ReqwestError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] log::SetLoggerError),

    /// Error initializing an HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// Invalid environment configuration.
    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),
}

/// Error types for cache storage operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),
}

/// Failures raised by a browser scan.
///
/// Every variant maps to a recovery path in the orchestrator: with a
/// pre-check tag in hand the scan collapses to an origin-only fallback,
/// without one it surfaces as an internal error.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The browser could not be launched or its connection was lost.
    #[error("Browser error: {0}")]
    Browser(String),

    /// Navigation failed outright (DNS, TLS, connection reset, ...).
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Navigation and settle exceeded the wall clock.
    #[error("Navigation timed out after {0:?}")]
    NavTimeout(std::time::Duration),

    /// The in-context limiter fulfilled its 508 sentinel, or the redirect
    /// log overflowed the configured cap.
    #[error("Too many redirects ({0})")]
    TooManyRedirects(usize),
}

impl ScanError {
    /// Whether any layer of this failure carries a 403 signal.
    ///
    /// The orchestrator maps such failures to FORBIDDEN rather than a
    /// generic blocked fallback.
    pub fn is_forbidden(&self) -> bool {
        match self {
            ScanError::Navigation(msg) | ScanError::Browser(msg) => msg.contains("403"),
            _ => false,
        }
    }
}
