//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, limits, etc.)
//! - The environment-driven [`Config`] type and log settings

pub mod constants;
mod types;

pub use constants::*;
pub use types::{Config, ConfigError, LogFormat, LogLevel};
