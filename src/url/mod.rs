//! URL handling module for Site-Mirror
//!
//! This module provides the same-host scope check, the mapping from URLs to
//! local file paths, and the relative references used when rewriting links.

mod domain;
mod local_path;

// Re-export main functions
pub use domain::{extract_domain, root_dir_name, HostScope};
pub use local_path::{local_path, relative_reference};
