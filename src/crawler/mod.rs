//! Crawler module for fetching, rewriting and coordinating a mirror run
//!
//! This module contains the core mirroring logic, including:
//! - HTTP fetching with cancellation
//! - HTML link extraction and rewriting
//! - The bounded job queue and pending-work tracking
//! - Overall run coordination

mod coordinator;
mod fetcher;
mod queue;
mod rewriter;

pub use coordinator::Mirror;
pub use fetcher::{build_http_client, is_html, FetchedBody, Fetcher};
pub use queue::{CompletionGuard, JobQueue};
pub use rewriter::{is_asset_rel, resolve_reference, rewrite_html, ReferenceKind, RewrittenPage};

use crate::config::MirrorConfig;
use crate::output::MirrorReport;
use crate::MirrorError;

/// Runs a complete mirror operation
///
/// This is the main entry point for mirroring a site. It will:
/// 1. Validate and normalise the configuration
/// 2. Create the output root
/// 3. Fetch pages and assets with the worker pool
/// 4. Rewrite links and persist files
///
/// # Returns
///
/// * `Ok(MirrorReport)` - Mirror completed before the deadline
/// * `Err(MirrorError)` - Invalid configuration or global timeout
pub async fn mirror(config: MirrorConfig) -> Result<MirrorReport, MirrorError> {
    Mirror::new(config)?.run().await
}
