//! Site-Mirror: an offline website mirroring engine
//!
//! This crate downloads a start page together with the same-host pages and
//! assets reachable within a bounded link depth, rewrites links so the copy
//! browses offline, and writes everything under a deterministic file layout.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for Site-Mirror operations
///
/// Only configuration problems and the global timeout are surfaced to the
/// caller of a run. Per-job failures are logged and never abort the run.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mirror timed out after {}s", timeout.as_secs_f64())]
    Timeout { timeout: Duration },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid job state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::JobState,
        to: state::JobState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Cannot create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failure of a single GET
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status}")]
    Status { status: u16 },

    #[error("Request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Request cancelled")]
    Cancelled,
}

impl FetchError {
    /// Returns true when the server answered with a non-2xx status
    pub fn is_status(&self) -> bool {
        matches!(self, Self::Status { .. })
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(e)
        }
    }
}

/// HTML rewriting failure
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("HTML rewrite failed: {0}")]
    Rewriting(#[from] lol_html::errors::RewritingError),
}

/// Result type alias for Site-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, MirrorConfig};
pub use crawler::Mirror;
pub use output::MirrorReport;
pub use state::{JobKind, JobState, MirrorJob};
pub use crate::url::{local_path, HostScope};
