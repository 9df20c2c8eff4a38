//! Configuration module for Site-Mirror
//!
//! This module handles loading and validating TOML configuration files and
//! turning them into the runtime [`MirrorConfig`] the engine consumes.
//!
//! # Example
//!
//! ```no_run
//! use site_mirror::config::{load_config, resolve};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! let mirror = resolve(&config).unwrap();
//! println!("Mirroring {} to depth {}", mirror.start_url, mirror.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, MirrorConfig, OutputConfig, UserAgentConfig, DEFAULT_CONCURRENCY,
    DEFAULT_MAX_DEPTH, DEFAULT_OUTPUT_DIR, DEFAULT_QUEUE_CAPACITY, DEFAULT_TIMEOUT_SECS,
};

// Re-export parser and validation functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{normalize, parse_start_url, resolve, validate, validate_start_url};
