//! State module for tracking mirror progress
//!
//! This module provides the job model and the shared deduplication state used
//! by workers during a run.
//!
//! # Components
//!
//! - `MirrorJob`: a single page or asset fetch, with its lifecycle state
//! - `JobState`: Enqueued → InFlight → Done | Failed
//! - `CrawlState`: the visited-page and visited-asset sets shared by workers

mod crawl_state;
mod job;

// Re-export main types
pub use crawl_state::{AssetAdmission, CrawlState};
pub use job::{JobKind, JobState, MirrorJob};
