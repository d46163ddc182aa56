//! Bounded worker pool.
//!
//! Spawns `min(jobs, max_pool_size)` workers that pull from a shared queue
//! until it is empty. Each result is sent as soon as its job finishes, so the
//! output is in completion order. The channel closes once every worker is done.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::job::Job;
use super::result::FetchResult;
use crate::retry::FetchError;

type JobQueue<J> = Arc<Mutex<VecDeque<J>>>;

/// Number of workers for a batch of `jobs` jobs.
pub fn pool_size(jobs: usize, max_pool_size: usize) -> usize {
    jobs.min(max_pool_size)
}

/// One batch of jobs and the number of workers that will run them.
pub struct Pool<J: Job> {
    size: usize,
    jobs: VecDeque<J>,
}

impl<J: Job> Pool<J> {
    pub fn new(jobs: impl IntoIterator<Item = J>, max_pool_size: usize) -> Self {
        let jobs: VecDeque<J> = jobs.into_iter().collect();
        Self {
            size: pool_size(jobs.len(), max_pool_size),
            jobs,
        }
    }

    /// Workers that `start` will spawn.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Starts the workers and returns the result stream; exactly one result per job.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self, cancel: CancellationToken) -> mpsc::Receiver<FetchResult> {
        let queue: JobQueue<J> = Arc::new(Mutex::new(self.jobs));
        let (tx, rx) = mpsc::channel(self.size.max(1));

        let mut workers = JoinSet::new();
        for number in 1..=self.size {
            workers.spawn(worker(
                number,
                cancel.clone(),
                Arc::clone(&queue),
                tx.clone(),
            ));
        }
        // Workers hold the only senders left: the stream ends when the last one exits.
        drop(tx);

        tokio::spawn(async move {
            while let Some(res) = workers.join_next().await {
                if let Err(e) = res {
                    tracing::error!("worker task failed: {}", e);
                }
            }
            tracing::debug!("worker pool drained");
        });

        rx
    }
}

async fn worker<J: Job>(
    number: usize,
    cancel: CancellationToken,
    queue: JobQueue<J>,
    out: mpsc::Sender<FetchResult>,
) {
    tracing::info!("started worker: {}", number);
    loop {
        let Some(job) = queue.lock().await.pop_front() else {
            break;
        };
        let url = job.url().to_string();

        let result = if cancel.is_cancelled() {
            FetchResult::cancelled(url)
        } else {
            let mut handle = tokio::spawn(job.run(cancel.clone()));
            tokio::select! {
                biased;
                joined = &mut handle => match joined {
                    Ok(result) => result,
                    Err(e) => FetchResult::failed(url, FetchError::Task(e.to_string())),
                },
                _ = cancel.cancelled() => {
                    // The job keeps running detached until it notices the token; its result is discarded.
                    drop(handle);
                    FetchResult::cancelled(url)
                }
            }
        };

        if out.send(result).await.is_err() {
            tracing::debug!("result receiver dropped, worker {} stopping", number);
            break;
        }
    }
    tracing::debug!("worker {} finished", number);
}
