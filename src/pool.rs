use crate::error::{DownloadError, Error, Result};
use crate::fetch::Fetcher;
use crate::registry::Registry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Outcome of one claimed URL.
#[derive(Debug)]
pub enum Outcome {
    Saved(PathBuf),
    Failed(DownloadError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Saved(_))
    }
}

/// Emitted exactly once per claimed URL.
#[derive(Debug)]
pub struct CompletionEvent {
    pub worker: usize,
    pub url: String,
    pub outcome: Outcome,
}

/// What a worker did before it ran out of URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker: usize,
    pub processed: usize,
}

pub struct WorkerPool {
    workers: usize,
    item_timeout: Duration,
}

impl WorkerPool {
    pub fn new(workers: usize, item_timeout: Duration) -> Result<Self> {
        if workers == 0 {
            return Err(Error::InvalidWorkerCount(workers));
        }
        Ok(Self {
            workers,
            item_timeout,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Starts the workers. The returned receiver yields one event per URL
    /// and closes once every worker has exited.
    pub fn spawn(
        &self,
        registry: Arc<Registry>,
        fetcher: Arc<dyn Fetcher>,
        destination: PathBuf,
    ) -> (mpsc::Receiver<CompletionEvent>, PoolHandle) {
        let (events_tx, events_rx) = mpsc::channel(self.workers * 2);
        let mut tasks = JoinSet::new();

        for worker in 0..self.workers {
            let registry = registry.clone();
            let fetcher = fetcher.clone();
            let destination = destination.clone();
            let events = events_tx.clone();
            let item_timeout = self.item_timeout;

            tasks.spawn(async move {
                let mut processed = 0;
                while let Some(url) = registry.next_unclaimed() {
                    let start_time = Instant::now();
                    let outcome =
                        match tokio::time::timeout(item_timeout, fetcher.fetch(&url, &destination))
                            .await
                        {
                            Ok(Ok(path)) => Outcome::Saved(path),
                            Ok(Err(e)) => Outcome::Failed(e),
                            Err(_) => Outcome::Failed(DownloadError::Timeout { url: url.clone() }),
                        };

                    match &outcome {
                        Outcome::Saved(path) => log::debug!(
                            "Worker {} saved {} in {}ms",
                            worker,
                            path.display(),
                            start_time.elapsed().as_millis()
                        ),
                        Outcome::Failed(e) => log::error!("Worker {} failed: {}", worker, e),
                    }

                    processed += 1;
                    if events
                        .send(CompletionEvent {
                            worker,
                            url,
                            outcome,
                        })
                        .await
                        .is_err()
                    {
                        log::warn!("Worker {} stopping: progress receiver is gone", worker);
                        break;
                    }
                }
                log::debug!("Worker {} finished after {} item(s)", worker, processed);
                WorkerReport { worker, processed }
            });
        }

        // Workers hold the only senders left, so the channel closes with them.
        drop(events_tx);

        (events_rx, PoolHandle { tasks })
    }
}

pub struct PoolHandle {
    tasks: JoinSet<WorkerReport>,
}

impl PoolHandle {
    /// Waits for every worker to exit. Panicked workers are logged and left
    /// out of the returned reports.
    pub async fn join(mut self) -> Vec<WorkerReport> {
        let mut reports = Vec::new();
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => log::error!("Worker task failed: {}", e),
            }
        }
        reports.sort_by_key(|r| r.worker);
        reports
    }
}
