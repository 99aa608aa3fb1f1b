//! Application initialization and resource setup.
//!
//! This module provides functions to initialize all shared resources:
//! - The logger
//! - The manual-redirect pre-check HTTP client
//! - The scan-concurrency semaphore

mod client;
mod logger;

use std::sync::Arc;

use tokio::sync::Semaphore;

// Re-export public API
pub use client::init_precheck_client;
pub use logger::init_logger_with;

/// Initializes the semaphore bounding concurrent browser scans.
///
/// # Arguments
///
/// * `count` - Maximum number of concurrent scans allowed
pub fn init_semaphore(count: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(count))
}
