//! Run statistics
//!
//! Each worker keeps its own [`RunTally`]; the engine merges them after the
//! worker pool has shut down, so no counters are shared while jobs run.

use crate::state::JobKind;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Counters accumulated by one worker (or merged across all of them)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTally {
    /// Pages written to disk
    pub pages_saved: u64,

    /// Assets written to disk
    pub assets_saved: u64,

    /// Page jobs skipped because another job already took the URL
    pub duplicates_skipped: u64,

    /// Jobs discarded after a fetch, persist or cancellation failure
    pub failures: u64,

    /// Total bytes written
    pub bytes_written: u64,
}

impl RunTally {
    /// Records a file written for a job of `kind`
    pub fn record_saved(&mut self, kind: JobKind, bytes: usize) {
        match kind {
            JobKind::Page => self.pages_saved += 1,
            JobKind::Asset => self.assets_saved += 1,
        }
        self.bytes_written += bytes as u64;
    }

    pub fn record_duplicate(&mut self) {
        self.duplicates_skipped += 1;
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    /// Adds another tally into this one
    pub fn merge(&mut self, other: &RunTally) {
        self.pages_saved += other.pages_saved;
        self.assets_saved += other.assets_saved;
        self.duplicates_skipped += other.duplicates_skipped;
        self.failures += other.failures;
        self.bytes_written += other.bytes_written;
    }
}

/// Summary of a completed mirror run
#[derive(Debug, Clone)]
pub struct MirrorReport {
    /// Page the run started from
    pub start_url: Url,

    /// Directory the mirror was written to (`<output>/<host>`)
    pub root_dir: PathBuf,

    /// Merged worker counters
    pub tally: RunTally,

    /// Distinct page URLs taken by workers
    pub distinct_pages: usize,

    /// Distinct asset URLs enqueued
    pub distinct_assets: usize,

    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,

    /// Time from start to drain
    pub elapsed: Duration,
}

impl MirrorReport {
    /// Files written in total
    pub fn files_saved(&self) -> u64 {
        self.tally.pages_saved + self.tally.assets_saved
    }
}

/// Prints a report to stdout in a formatted manner
pub fn print_report(report: &MirrorReport) {
    println!("=== Mirror Summary ===\n");

    println!("Source: {}", report.start_url);
    println!("Saved to: {}", report.root_dir.display());
    println!(
        "Started: {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("Elapsed: {:.2}s", report.elapsed.as_secs_f64());
    println!();

    println!("Files:");
    println!("  Pages saved: {}", report.tally.pages_saved);
    println!("  Assets saved: {}", report.tally.assets_saved);
    println!("  Bytes written: {}", report.tally.bytes_written);
    println!();

    println!("Discovery:");
    println!("  Distinct pages: {}", report.distinct_pages);
    println!("  Distinct assets: {}", report.distinct_assets);
    println!("  Duplicate page jobs skipped: {}", report.tally.duplicates_skipped);
    println!();

    let attempted = report.files_saved() + report.tally.failures;
    let success_rate = if attempted > 0 {
        (report.files_saved() as f64 / attempted as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} jobs saved, {} failed)",
        success_rate,
        report.files_saved(),
        attempted,
        report.tally.failures
    );
}
