//! Worker pool draining the bounded job queue.
//!
//! Workers share one receiver behind a mutex; the bounded channel is
//! the backpressure seam between the scheduler and extraction. All
//! workers stop when the cancellation token fires.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::SearchProfile;
use crate::pipeline::JobRunner;

/// Sending half of the job queue, handed to the scheduler.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<SearchProfile>,
}

impl JobQueue {
    /// Creates a bounded queue, returning the sender wrapper and the
    /// receiver for [`spawn_workers`].
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<SearchProfile>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Enqueues a job without blocking. A full queue drops the job and
    /// logs; the profile stays due and the next tick retries it.
    pub fn enqueue(&self, profile: SearchProfile) {
        match self.tx.try_send(profile) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(profile)) => {
                tracing::warn!(profile_id = %profile.id, "job queue full, deferring to next tick");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::error!("job queue closed, worker pool is gone");
            }
        }
    }
}

/// Spawns `count` workers draining `rx` through the runner until
/// `cancel` fires.
#[must_use]
pub fn spawn_workers(
    count: usize,
    rx: mpsc::Receiver<SearchProfile>,
    runner: Arc<JobRunner>,
    cancel: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let rx = Arc::new(Mutex::new(rx));
    (0..count)
        .map(|worker_id| {
            let rx = Arc::clone(&rx);
            let runner = Arc::clone(&runner);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tracing::debug!(worker_id, "extraction worker started");
                loop {
                    let job = tokio::select! {
                        () = cancel.cancelled() => break,
                        job = async { rx.lock().await.recv().await } => job,
                    };
                    let Some(profile) = job else { break };
                    tracing::debug!(worker_id, profile_id = %profile.id, "job picked up");
                    runner.run(&profile).await;
                }
                tracing::debug!(worker_id, "extraction worker stopped");
            })
        })
        .collect()
}
