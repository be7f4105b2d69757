use crate::error::DownloadError;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Retrieves one resource and stores it under `destination`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<PathBuf, DownloadError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<PathBuf, DownloadError> {
        let file_name = file_name_for(url).ok_or_else(|| DownloadError::NoFileName {
            url: url.to_string(),
        })?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::request(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status,
            });
        }

        fs::create_dir_all(destination)
            .await
            .map_err(|source| DownloadError::CreateDir {
                path: destination.to_path_buf(),
                source,
            })?;

        let path = destination.join(file_name);
        let write_err = |source| DownloadError::Write {
            path: path.clone(),
            source,
        };
        let mut file = fs::File::create(&path).await.map_err(write_err)?;

        let mut written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| DownloadError::stream(url, e))?;
            file.write_all(&chunk).await.map_err(write_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(write_err)?;

        log::debug!("Saved {} ({} bytes) to {}", url, written, path.display());
        Ok(path)
    }
}

/// The final path segment of `url`, which names the file on disk.
pub fn file_name_for(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let name = parsed.path_segments()?.next_back()?;
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}
