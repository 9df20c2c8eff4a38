//! Output module for writing mirrored files and reporting on a run
//!
//! This module handles:
//! - Persisting fetched and rewritten bodies under the mirror root
//! - Tallying per-worker results and merging them into a run report
//! - Printing the report for the command-line tool

pub mod stats;
mod writer;

pub use stats::{print_report, MirrorReport, RunTally};
pub use writer::write_file;
