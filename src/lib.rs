pub mod config;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod pool;
pub mod progress;
pub mod registry;
pub mod scraper;
pub mod terminal;

pub use config::{ConfigLoader, ScrapeConfig};
pub use discovery::{Discovery, PageSource};
pub use error::{DownloadError, Error, FetchError, Result};
pub use extract::{ImageExtractor, ImageSelector, SelectorExtractor};
pub use fetch::Fetcher;
pub use pool::{CompletionEvent, Outcome, WorkerPool};
pub use progress::{ProgressAggregator, ProgressRenderer, RunStats, RunSummary};
pub use registry::Registry;
pub use scraper::Scraper;
