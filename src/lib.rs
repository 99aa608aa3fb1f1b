//! domain_recon library: domain reconnaissance core.
//!
//! Given a hostname, the service loads the site's homepage in a shared
//! headless browser, observes every network request the page emits, and
//! reports the distinct hostnames contacted, the final URL after
//! redirects, and the document-level redirect chain. Results are cached
//! per hostname with a TTL.
//!
//! The pipeline for one lookup:
//!
//! 1. [`domain::normalize_hostname`] canonicalises the input (C1)
//! 2. [`storage`] answers from the cache when a live row exists (C2)
//! 3. [`precheck`] classifies the target browserlessly (C3)
//! 4. [`browser`] supplies the shared headless process and the
//!    in-context redirect limiter (C4, C5)
//! 5. [`scan`] drives the page load and observes the network (C6)
//! 6. [`orchestrate`] glues it all together and persists (C7)
//!
//! The HTTP surface lives in [`server`]; everything is wired up by the
//! binary in `main.rs`.

#![warn(missing_docs)]

pub mod browser;
pub mod config;
pub mod domain;
pub mod error_handling;
pub mod initialization;
pub mod models;
pub mod orchestrate;
pub mod precheck;
pub mod scan;
pub mod server;
pub mod storage;

// Re-export the types a consumer needs to embed the service.
pub use config::{Config, LogFormat, LogLevel};
pub use models::{RedirectStep, ScanResult};
pub use orchestrate::{lookup_domain, DomainReport, ReportStatus, ServiceContext};
