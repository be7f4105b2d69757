use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Discovery failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Invalid worker count {0}: at least one worker is required")]
    InvalidWorkerCount(usize),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Failure to retrieve the thread page. Fatal to a run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid thread url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("could not read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Failure to download a single image. Reported per item, never fatal.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("no file name can be derived from {url}")]
    NoFileName { url: String },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("{url} timed out")]
    Timeout { url: String },

    #[error("could not create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("body of {url} was interrupted: {source}")]
    Stream {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl DownloadError {
    /// Maps a reqwest error raised while sending, keeping timeouts distinct.
    pub(crate) fn request(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            DownloadError::Timeout {
                url: url.to_string(),
            }
        } else {
            DownloadError::Request {
                url: url.to_string(),
                source,
            }
        }
    }

    pub(crate) fn stream(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            DownloadError::Timeout {
                url: url.to_string(),
            }
        } else {
            DownloadError::Stream {
                url: url.to_string(),
                source,
            }
        }
    }
}
