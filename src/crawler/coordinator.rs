//! Mirror coordinator - main run orchestration logic
//!
//! This module contains the engine that coordinates a mirror run:
//! - Seeding the job queue with the start page
//! - Running a fixed pool of workers over the shared queue
//! - The page pipeline (fetch, rewrite, persist, discover)
//! - The asset pipeline (fetch, persist)
//! - Termination on drain or on the global deadline

use crate::config::{normalize, validate_start_url, MirrorConfig};
use crate::crawler::fetcher::{build_http_client, is_html, Fetcher};
use crate::crawler::queue::JobQueue;
use crate::crawler::rewriter::{rewrite_html, RewrittenPage};
use crate::output::{write_file, MirrorReport, RunTally};
use crate::state::{AssetAdmission, CrawlState, JobKind, JobState, MirrorJob};
use crate::url::{local_path, relative_reference, root_dir_name, HostScope};
use crate::{ConfigError, FetchError, MirrorError, RewriteError};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// How a single job ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobOutcome {
    /// A file of `bytes` bytes was written
    Saved { bytes: usize },

    /// The page had already been taken by another job
    Duplicate,

    /// Fetch, persist or cancellation failure; already logged
    Failed,
}

/// Website mirroring engine
///
/// Created once per configuration. Each call to [`Mirror::run`] starts with
/// fresh dedup state.
pub struct Mirror {
    config: Arc<MirrorConfig>,
    scope: HostScope,
    root_dir: PathBuf,
    fetcher: Fetcher,
}

impl Mirror {
    /// Creates a new engine
    ///
    /// The start URL must be http(s) with a host; numeric settings are
    /// normalised (see [`crate::config::normalize`]). The mirror root
    /// `<output_dir>/<host>` is created here, so an unusable output directory
    /// is reported before any work starts.
    ///
    /// # Returns
    ///
    /// * `Ok(Mirror)` - Ready to run
    /// * `Err(MirrorError::Config)` - Invalid start URL or output directory
    /// * `Err(MirrorError::Http)` - HTTP client could not be built
    pub fn new(config: MirrorConfig) -> Result<Self, MirrorError> {
        validate_start_url(&config.start_url)?;

        let mut config = normalize(config);
        config.start_url.set_fragment(None);

        let scope = HostScope::new(&config.start_url)
            .ok_or_else(|| ConfigError::InvalidUrl(format!("'{}': missing host", config.start_url)))?;
        let dir_name = root_dir_name(&config.start_url)
            .ok_or_else(|| ConfigError::InvalidUrl(format!("'{}': missing host", config.start_url)))?;

        let root_dir = config.output_dir.join(dir_name);
        std::fs::create_dir_all(&root_dir).map_err(|source| ConfigError::OutputDir {
            path: root_dir.clone(),
            source,
        })?;

        let client = build_http_client(&config.user_agent, config.timeout)?;

        Ok(Self {
            config: Arc::new(config),
            scope,
            root_dir,
            fetcher: Fetcher::new(client),
        })
    }

    /// Returns the directory the mirror is written to
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Returns the normalised configuration
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Runs the mirror to completion or until the global timeout
    ///
    /// Per-job failures are logged and never end the run. If the timeout
    /// fires first, outstanding work is cancelled and
    /// `MirrorError::Timeout` is returned; files written before that point
    /// are left in place.
    pub async fn run(&self) -> Result<MirrorReport, MirrorError> {
        let started_at = Utc::now();
        let started = Instant::now();
        let cancel = CancellationToken::new();
        let session = Arc::new(self.session(cancel.clone()));

        tracing::info!(
            "Mirroring {} into {} (max depth {}, {} workers, timeout {:?})",
            self.config.start_url,
            self.root_dir.display(),
            self.config.max_depth,
            self.config.concurrency,
            self.config.timeout
        );

        session
            .queue
            .enqueue(MirrorJob::page(self.config.start_url.clone(), 0))
            .await;

        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.concurrency {
            workers.spawn(run_worker(Arc::clone(&session), worker_id));
        }

        let timed_out = tokio::select! {
            _ = session.queue.wait_drained() => false,
            _ = tokio::time::sleep(self.config.timeout) => {
                tracing::warn!(
                    "Global timeout of {:?} reached with {} jobs outstanding, cancelling",
                    self.config.timeout,
                    session.queue.pending()
                );
                cancel.cancel();
                true
            }
        };

        let mut tally = RunTally::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(worker_tally) => tally.merge(&worker_tally),
                Err(e) => tracing::error!("Worker task failed: {}", e),
            }
        }

        let report = MirrorReport {
            start_url: self.config.start_url.clone(),
            root_dir: self.root_dir.clone(),
            tally,
            distinct_pages: session.state.page_count(),
            distinct_assets: session.state.asset_count(),
            started_at,
            elapsed: started.elapsed(),
        };

        if timed_out {
            tracing::warn!(
                "Partial mirror left in {}: {} pages, {} assets saved before timeout",
                report.root_dir.display(),
                report.tally.pages_saved,
                report.tally.assets_saved
            );
            return Err(MirrorError::Timeout {
                timeout: self.config.timeout,
            });
        }

        tracing::info!(
            "Mirror completed: {} pages, {} assets, {} failures in {:?}",
            report.tally.pages_saved,
            report.tally.assets_saved,
            report.tally.failures,
            report.elapsed
        );

        Ok(report)
    }
}

impl Mirror {
    /// Fresh per-run state tied to `cancel`
    fn session(&self, cancel: CancellationToken) -> Session {
        Session {
            config: Arc::clone(&self.config),
            scope: self.scope.clone(),
            root_dir: self.root_dir.clone(),
            fetcher: self.fetcher.clone(),
            state: CrawlState::new(self.config.max_assets),
            queue: JobQueue::new(self.config.queue_capacity, cancel.clone()),
            cancel,
        }
    }
}

/// Everything workers share during one run
struct Session {
    config: Arc<MirrorConfig>,
    scope: HostScope,
    root_dir: PathBuf,
    fetcher: Fetcher,
    state: CrawlState,
    queue: JobQueue,
    cancel: CancellationToken,
}

/// Worker loop: pull jobs until the queue drains or the run is cancelled
async fn run_worker(session: Arc<Session>, worker_id: usize) -> RunTally {
    let mut tally = RunTally::default();

    while let Some(mut job) = session.queue.next().await {
        let _done = session.queue.completion();

        if let Err(e) = job.transition(JobState::InFlight) {
            tracing::error!("Worker {}: {}", worker_id, e);
            continue;
        }

        let outcome = match job.kind {
            JobKind::Page => session.process_page(&job).await,
            JobKind::Asset => session.process_asset(&job).await,
        };

        let next = match outcome {
            JobOutcome::Failed => JobState::Failed,
            _ => JobState::Done,
        };
        if let Err(e) = job.transition(next) {
            tracing::error!("Worker {}: {}", worker_id, e);
        }

        match outcome {
            JobOutcome::Saved { bytes } => tally.record_saved(job.kind, bytes),
            JobOutcome::Duplicate => tally.record_duplicate(),
            JobOutcome::Failed => tally.record_failure(),
        }

        tracing::trace!(
            "Worker {} finished {} {} ({})",
            worker_id,
            job.kind,
            job.url,
            job.state()
        );
    }

    tracing::debug!("Worker {} exiting", worker_id);
    tally
}

impl Session {
    /// Page pipeline
    ///
    /// 1. Take the URL (skip if another job already has)
    /// 2. Fetch it
    /// 3. Non-HTML bodies are persisted as-is
    /// 4. HTML is rewritten (original bytes kept if rewriting fails)
    /// 5. Persist, then enqueue same-host links and assets
    async fn process_page(&self, job: &MirrorJob) -> JobOutcome {
        if self.cancel.is_cancelled() {
            return JobOutcome::Failed;
        }

        if !self.state.mark_page(&job.url) {
            tracing::debug!("Skipping already visited page {}", job.url);
            return JobOutcome::Duplicate;
        }

        tracing::info!("Fetching page {} (depth {})", job.url, job.depth);

        let fetched = match self.fetcher.fetch(&self.cancel, &job.url).await {
            Ok(fetched) => fetched,
            Err(e) => {
                log_fetch_failure(job, &e);
                return JobOutcome::Failed;
            }
        };

        let page_path = local_path(&self.root_dir, &job.url);

        if !is_html(&fetched.content_type) {
            tracing::debug!(
                "Page {} is {}, saving without rewriting",
                job.url,
                fetched.content_type
            );
            return self.persist(job, &page_path, &fetched.body).await;
        }

        let page_dir = page_path.parent().unwrap_or(&self.root_dir);
        let rewritten = rewrite_html(&job.url, &fetched.body, |target| {
            self.map_reference(page_dir, target)
        });

        self.store_page(job, &page_path, fetched.body, rewritten).await
    }

    /// Persists a fetched HTML page and enqueues what it references
    ///
    /// When rewriting failed the `original` bytes are written instead and no
    /// references are followed.
    async fn store_page(
        &self,
        job: &MirrorJob,
        page_path: &Path,
        original: Vec<u8>,
        rewritten: Result<RewrittenPage, RewriteError>,
    ) -> JobOutcome {
        let (html, page_links, asset_links) = match rewritten {
            Ok(page) => (page.html, page.page_links, page.asset_links),
            Err(e) => {
                tracing::warn!("Failed to rewrite {}, saving original: {}", job.url, e);
                (original, Vec::new(), Vec::new())
            }
        };

        let outcome = self.persist(job, page_path, &html).await;
        if outcome == JobOutcome::Failed {
            return outcome;
        }

        self.enqueue_discovered(job, page_links, asset_links).await;
        outcome
    }

    /// Asset pipeline: fetch and persist verbatim
    async fn process_asset(&self, job: &MirrorJob) -> JobOutcome {
        if self.cancel.is_cancelled() {
            return JobOutcome::Failed;
        }

        tracing::debug!("Fetching asset {}", job.url);

        match self.fetcher.fetch(&self.cancel, &job.url).await {
            Ok(fetched) => {
                let path = local_path(&self.root_dir, &job.url);
                self.persist(job, &path, &fetched.body).await
            }
            Err(e) => {
                log_fetch_failure(job, &e);
                JobOutcome::Failed
            }
        }
    }

    /// Maps a reference found on a page to its rewritten attribute value
    ///
    /// Cross-host references stay absolute. Same-host references become a
    /// path relative to the directory of the page being rewritten.
    fn map_reference(&self, page_dir: &Path, target: &Url) -> Option<String> {
        if !self.scope.contains(target) {
            return Some(target.to_string());
        }

        let target_path = local_path(&self.root_dir, target);
        Some(relative_reference(page_dir, &target_path).unwrap_or_else(|| target.to_string()))
    }

    /// Enqueues same-host references discovered on a page
    ///
    /// Page links are followed only while the page is shallower than the
    /// depth limit. Assets are always followed, subject to the asset cap.
    async fn enqueue_discovered(&self, job: &MirrorJob, page_links: Vec<Url>, asset_links: Vec<Url>) {
        let mut fresh = Vec::new();

        if job.depth < self.config.max_depth {
            for link in page_links {
                if self.scope.contains(&link) && !self.state.has_page(&link) {
                    fresh.push(MirrorJob::page(link, job.depth + 1));
                }
            }
        }

        for asset in asset_links {
            if !self.scope.contains(&asset) {
                continue;
            }
            match self.state.mark_asset(&asset) {
                AssetAdmission::Admitted => fresh.push(MirrorJob::asset(asset, job.depth)),
                AssetAdmission::Duplicate => {}
                AssetAdmission::CapReached => {
                    tracing::debug!("Asset cap reached, not fetching {}", asset);
                }
            }
        }

        let available = self.queue.available();
        if fresh.len() > available {
            tracing::warn!(
                "{} references from {} exceed the {} free queue slots; \
                 workers may block until the queue drains or the run times out",
                fresh.len(),
                job.url,
                available
            );
        }

        for next in fresh {
            if !self.queue.enqueue(next).await {
                return;
            }
        }
    }

    async fn persist(&self, job: &MirrorJob, path: &Path, contents: &[u8]) -> JobOutcome {
        match write_file(path, contents).await {
            Ok(()) => {
                tracing::debug!("Saved {} {} -> {}", job.kind, job.url, path.display());
                JobOutcome::Saved {
                    bytes: contents.len(),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to write {} for {}: {}", path.display(), job.url, e);
                JobOutcome::Failed
            }
        }
    }
}

fn log_fetch_failure(job: &MirrorJob, error: &FetchError) {
    match error {
        FetchError::Status { status } => {
            tracing::warn!("{} {} returned HTTP {}", job.kind, job.url, status);
        }
        FetchError::Cancelled => {
            tracing::debug!("{} {} cancelled", job.kind, job.url);
        }
        other => {
            tracing::warn!("Failed to fetch {} {}: {}", job.kind, job.url, other);
        }
    }
}
