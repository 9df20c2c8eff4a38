//! Job definitions for the mirror work queue
//!
//! A job is created when a reference is discovered, consumed exactly once by a
//! worker, and never outlives the run.

use crate::MirrorError;
use std::fmt;
use url::Url;

/// What a job fetches and how its body is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// HTML page: rewritten, persisted, and scanned for further references
    Page,

    /// Stylesheet, script, image, icon or preload target: persisted verbatim
    Asset,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page => write!(f, "page"),
            Self::Asset => write!(f, "asset"),
        }
    }
}

/// Lifecycle of a single job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Job has been pushed onto the queue
    Enqueued,

    /// A worker has taken the job
    InFlight,

    /// Job finished; its output (if any) is on disk
    Done,

    /// Job was discarded after a fetch, persist or cancellation failure
    Failed,
}

impl JobState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (Self::Enqueued, Self::InFlight)
                | (Self::InFlight, Self::Done)
                | (Self::InFlight, Self::Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Enqueued => "enqueued",
            Self::InFlight => "in_flight",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// A unit of work: fetch one URL as a page or an asset
#[derive(Debug, Clone)]
pub struct MirrorJob {
    /// Absolute URL to fetch (fragment already removed)
    pub url: Url,

    /// Link depth from the start page. Only pages are depth-limited
    pub depth: u32,

    /// Page or asset
    pub kind: JobKind,

    state: JobState,
}

impl MirrorJob {
    /// Creates a page job at the given depth
    pub fn page(url: Url, depth: u32) -> Self {
        Self {
            url,
            depth,
            kind: JobKind::Page,
            state: JobState::Enqueued,
        }
    }

    /// Creates an asset job discovered on a page at `depth`
    pub fn asset(url: Url, depth: u32) -> Self {
        Self {
            url,
            depth,
            kind: JobKind::Asset,
            state: JobState::Enqueued,
        }
    }

    /// Returns the current lifecycle state
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Moves the job to `next`, rejecting illegal transitions
    pub fn transition(&mut self, next: JobState) -> Result<(), MirrorError> {
        if !self.state.can_transition_to(next) {
            return Err(MirrorError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}
