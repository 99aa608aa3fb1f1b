//! Configuration types.
//!
//! Service tuning is environment-driven (the deployment surface is a
//! container); the CLI only controls logging. [`Config::from_env`] reads
//! every variable once at boot and fails fast on unparsable values.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::config::constants::*;

/// Logging level for the application.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Error raised when an environment variable holds an unparsable value.
#[derive(Debug, thiserror::Error)]
#[error("invalid value for {var}: {value:?}")]
pub struct ConfigError {
    /// Offending variable name.
    pub var: &'static str,
    /// The raw value that failed to parse.
    pub value: String,
}

/// Runtime configuration of the reconnaissance service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen port (`PORT`)
    pub port: u16,

    /// Cache row TTL in seconds (`CACHE_TTL_SECONDS`)
    pub cache_ttl_seconds: i64,

    /// Document redirect cap enforced in the browser (`MAX_REDIRECT_STEPS`)
    pub max_redirect_steps: usize,

    /// Pre-check hop cap (`PRECHECK_MAX_REDIRECTS`)
    pub precheck_max_redirects: usize,

    /// Navigation + settle wall clock (`NAV_TIMEOUT_MS`)
    pub nav_timeout: Duration,

    /// Network-idle dwell (`QUIET_WINDOW_MS`)
    pub quiet_window: Duration,

    /// Per-request hard deadline (`HARD_TIMEOUT_MS`)
    pub hard_timeout: Duration,

    /// Parallel browser scans (`CONCURRENCY`)
    pub concurrency: usize,

    /// Seen-host cap per scan (`MAX_DOMAINS`)
    pub max_domains: usize,

    /// Redirect-chain cap per scan (`MAX_REDIRECT_LOG`)
    pub max_redirect_log: usize,

    /// Cache store location (`SQLITE_PATH`)
    pub sqlite_path: PathBuf,

    /// Explicit browser executable (`CHROMIUM_PATH`)
    pub chromium_path: Option<PathBuf>,

    /// HTTP User-Agent for the pre-check client and the browser context
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            max_redirect_steps: DEFAULT_MAX_REDIRECT_STEPS,
            precheck_max_redirects: DEFAULT_PRECHECK_MAX_REDIRECTS,
            nav_timeout: DEFAULT_NAV_TIMEOUT,
            quiet_window: DEFAULT_QUIET_WINDOW,
            hard_timeout: DEFAULT_HARD_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
            max_domains: DEFAULT_MAX_DOMAINS,
            max_redirect_log: DEFAULT_MAX_REDIRECT_LOG,
            sqlite_path: PathBuf::from(DEFAULT_SQLITE_PATH),
            chromium_path: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    /// Builds a configuration from the process environment.
    ///
    /// Unset variables fall back to the defaults in
    /// [`crate::config::constants`]; set-but-unparsable values are a boot
    /// failure, never silently defaulted.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Config::default();

        cfg.port = parse_var("PORT", cfg.port)?;
        cfg.cache_ttl_seconds = parse_var("CACHE_TTL_SECONDS", cfg.cache_ttl_seconds)?;
        cfg.max_redirect_steps = parse_var("MAX_REDIRECT_STEPS", cfg.max_redirect_steps)?;
        cfg.precheck_max_redirects =
            parse_var("PRECHECK_MAX_REDIRECTS", cfg.precheck_max_redirects)?;
        cfg.nav_timeout = parse_millis("NAV_TIMEOUT_MS", cfg.nav_timeout)?;
        cfg.quiet_window = parse_millis("QUIET_WINDOW_MS", cfg.quiet_window)?;
        cfg.hard_timeout = parse_millis("HARD_TIMEOUT_MS", cfg.hard_timeout)?;
        cfg.concurrency = parse_var("CONCURRENCY", cfg.concurrency)?;
        cfg.max_domains = parse_var("MAX_DOMAINS", cfg.max_domains)?;
        cfg.max_redirect_log = parse_var("MAX_REDIRECT_LOG", cfg.max_redirect_log)?;

        if let Ok(path) = std::env::var("SQLITE_PATH") {
            cfg.sqlite_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("CHROMIUM_PATH") {
            if !path.trim().is_empty() {
                cfg.chromium_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(ua) = std::env::var("USER_AGENT") {
            if !ua.trim().is_empty() {
                cfg.user_agent = ua;
            }
        }

        Ok(cfg)
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError { var, value: raw }),
        Err(_) => Ok(default),
    }
}

fn parse_millis(var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    Ok(Duration::from_millis(parse_var(
        var,
        default.as_millis() as u64,
    )?))
}
