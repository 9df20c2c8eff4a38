//! Job queue shared by the worker pool
//!
//! This module handles:
//! - A bounded multi-consumer queue of [`MirrorJob`]s
//! - The pending-work counter that detects when a run has drained
//! - Closing the queue for every worker once no work is outstanding
//! - Abandoning blocked operations when the run is cancelled

use crate::state::MirrorJob;
use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;

/// Bounded job queue with a pending-work counter
///
/// The counter includes both queued jobs and jobs a worker is processing, so
/// it only reaches zero once nothing can enqueue further work. At that point
/// [`JobQueue::wait_drained`] closes the queue and every waiting
/// [`JobQueue::next`] returns `None`.
pub struct JobQueue {
    sender: mpsc::Sender<MirrorJob>,
    receiver: Mutex<mpsc::Receiver<MirrorJob>>,
    pending: watch::Sender<usize>,
    cancel: CancellationToken,
    drained: CancellationToken,
}

/// Marks one unit of pending work complete when dropped
pub struct CompletionGuard<'a> {
    queue: &'a JobQueue,
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.queue.complete();
    }
}

impl JobQueue {
    /// Creates a queue holding at most `capacity` jobs, tied to `cancel`
    pub fn new(capacity: usize, cancel: CancellationToken) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (pending, _) = watch::channel(0);

        Self {
            sender,
            receiver: Mutex::new(receiver),
            pending,
            cancel,
            drained: CancellationToken::new(),
        }
    }

    /// Registers a job as pending work and pushes it onto the queue
    ///
    /// Waits for capacity when the queue is full. If the run is cancelled
    /// first, the job is dropped, its pending registration is undone, and
    /// `false` is returned.
    pub async fn enqueue(&self, job: MirrorJob) -> bool {
        self.pending.send_modify(|n| *n += 1);
        let url = job.url.clone();

        let sent = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            result = self.sender.send(job) => result.is_ok(),
        };

        if !sent {
            tracing::warn!("Enqueue cancelled for {}", url);
            self.complete();
        }
        sent
    }

    /// Waits for the next job
    ///
    /// Returns `None` once the run has drained or been cancelled.
    pub async fn next(&self) -> Option<MirrorJob> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            _ = self.drained.cancelled() => None,
            job = async { self.receiver.lock().await.recv().await } => job,
        }
    }

    /// Returns a guard that completes one unit of pending work on drop
    ///
    /// Workers take one per dequeued job so completion is recorded on every
    /// exit path.
    pub fn completion(&self) -> CompletionGuard<'_> {
        CompletionGuard { queue: self }
    }

    /// Completes one unit of pending work
    pub fn complete(&self) {
        self.pending.send_modify(|n| *n = n.saturating_sub(1));
    }

    /// Number of jobs queued or in progress
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Number of jobs that can be pushed right now without waiting
    pub fn available(&self) -> usize {
        self.sender.capacity()
    }

    /// Returns true once the queue has been closed after draining
    pub fn is_drained(&self) -> bool {
        self.drained.is_cancelled()
    }

    /// Waits until no work is pending, then closes the queue
    pub async fn wait_drained(&self) {
        let mut pending = self.pending.subscribe();
        // The sender lives in `self`, so this cannot observe a closed channel
        let _ = pending.wait_for(|n| *n == 0).await;
        tracing::debug!("Job queue drained");
        self.drained.cancel();
    }
}
