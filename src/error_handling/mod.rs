//! Error handling for the reconnaissance service.

mod types;

pub use types::{DatabaseError, InitializationError, ScanError};
