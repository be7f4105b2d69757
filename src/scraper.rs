use crate::config::ScrapeConfig;
use crate::discovery::{Discovery, HttpPageSource, PageSource};
use crate::error::{Error, Result};
use crate::extract::{ImageExtractor, SelectorExtractor};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::pool::WorkerPool;
use crate::progress::{ProgressAggregator, ProgressRenderer, RunSummary};
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use url::Url;

/// Runs one scrape: discovery, then the worker pool, then the summary.
pub struct Scraper {
    discovery: Discovery,
    fetcher: Arc<dyn Fetcher>,
    pool: WorkerPool,
}

impl Scraper {
    /// Builds the HTTP-backed collaborators described by `config`.
    pub fn from_config(config: &ScrapeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        let extractor = SelectorExtractor::new(
            config.extraction.selector(),
            config.extraction.attribute.clone(),
        );

        Self::with_parts(
            config,
            Arc::new(HttpPageSource::new(client.clone())),
            Arc::new(extractor),
            Arc::new(HttpFetcher::new(client)),
        )
    }

    pub fn with_parts(
        config: &ScrapeConfig,
        source: Arc<dyn PageSource>,
        extractor: Arc<dyn ImageExtractor>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self> {
        let origin = config
            .origin
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| Error::Config(format!("origin: {}", e)))?;

        Ok(Self {
            discovery: Discovery::new(source, extractor, origin),
            fetcher,
            pool: WorkerPool::new(
                config.workers,
                Duration::from_secs(config.request_timeout_secs),
            )?,
        })
    }

    /// A discovery failure aborts before any download. Per-item failures
    /// only show up in the summary.
    pub async fn run<R: ProgressRenderer>(
        &self,
        thread_url: &str,
        destination: &Path,
        renderer: R,
    ) -> Result<RunSummary> {
        let registry = Arc::new(self.discovery.discover(thread_url).await?);
        let total = registry.size() as u64;

        log::info!(
            "Downloading {} image(s) to {} with {} worker(s)",
            total,
            destination.display(),
            self.pool.workers()
        );

        let (events, handle) = self.pool.spawn(
            registry.clone(),
            self.fetcher.clone(),
            destination.to_path_buf(),
        );
        let summary = ProgressAggregator::new(total, renderer)
            .consume(ReceiverStream::new(events))
            .await;

        let reports = handle.join().await;
        if reports.len() < self.pool.workers() {
            log::error!(
                "{} of {} worker(s) did not exit cleanly",
                self.pool.workers() - reports.len(),
                self.pool.workers()
            );
        }
        log::debug!("Claimed {} of {} URL(s)", registry.claimed_count(), total);

        log::info!(
            "Run started at {} finished in {:.1}s: {} saved, {} failed",
            summary.started_at,
            summary.elapsed_seconds,
            summary.succeeded,
            summary.failed
        );
        Ok(summary)
    }
}
