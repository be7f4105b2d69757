use crate::extract::ImageSelector;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Tuning for a scrape. The thread URL and destination come from the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScrapeConfig {
    /// Base for relative image references. Defaults to the thread's origin.
    #[serde(default)]
    #[validate(url)]
    pub origin: Option<String>,

    #[serde(default = "default_workers")]
    #[validate(range(min = 1))]
    pub workers: usize,

    /// Bound on the page fetch and on each image download.
    #[serde(default = "default_request_timeout")]
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,

    #[serde(default = "default_bar_width")]
    #[validate(range(min = 1, max = 200))]
    pub bar_width: usize,

    #[serde(default = "default_user_agent")]
    #[validate(length(min = 1))]
    pub user_agent: String,

    #[serde(default)]
    #[validate]
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExtractionConfig {
    /// Elements to read. Defaults to `img` elements carrying `attribute`.
    #[serde(default)]
    pub selector: Option<ImageSelector>,

    /// Attribute holding the image reference.
    #[serde(default = "default_attribute")]
    #[validate(length(min = 1))]
    pub attribute: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            origin: None,
            workers: default_workers(),
            request_timeout_secs: default_request_timeout(),
            bar_width: default_bar_width(),
            user_agent: default_user_agent(),
            extraction: ExtractionConfig::default(),
        }
    }
}

impl ExtractionConfig {
    pub fn selector(&self) -> ImageSelector {
        self.selector
            .clone()
            .unwrap_or_else(|| ImageSelector::lazy_img(&self.attribute))
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            selector: None,
            attribute: default_attribute(),
        }
    }
}

fn default_workers() -> usize {
    1
}

fn default_request_timeout() -> u64 {
    30
}

fn default_bar_width() -> usize {
    25
}

fn default_user_agent() -> String {
    format!("thread-grabber/{}", env!("CARGO_PKG_VERSION"))
}

fn default_attribute() -> String {
    "data-src".to_string()
}
