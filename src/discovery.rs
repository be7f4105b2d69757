use crate::error::FetchError;
use crate::extract::ImageExtractor;
use crate::fetch::file_name_for;
use crate::registry::Registry;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// Retrieves the raw bytes of a thread page.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        log::info!("Visiting: {}", url);

        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;
        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = res.bytes().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;
        log::debug!("HTML length: {} bytes", body.len());
        Ok(body.to_vec())
    }
}

/// Fetches a thread page and fills a fresh [`Registry`] with its images.
pub struct Discovery {
    source: Arc<dyn PageSource>,
    extractor: Arc<dyn ImageExtractor>,
    origin: Option<Url>,
}

impl Discovery {
    /// `origin` resolves relative image references; when `None`, the origin
    /// of the thread URL is used.
    pub fn new(
        source: Arc<dyn PageSource>,
        extractor: Arc<dyn ImageExtractor>,
        origin: Option<Url>,
    ) -> Self {
        Self {
            source,
            extractor,
            origin,
        }
    }

    pub async fn discover(&self, thread_url: &str) -> Result<Registry, FetchError> {
        let parsed = Url::parse(thread_url).map_err(|source| FetchError::InvalidUrl {
            url: thread_url.to_string(),
            source,
        })?;
        let origin = match &self.origin {
            Some(origin) => origin.clone(),
            None => origin_of(&parsed),
        };

        let body = self.source.fetch_page(thread_url).await?;
        let page = String::from_utf8_lossy(&body);

        let mut registry = Registry::new();
        let mut duplicates = 0usize;
        for url in self.extractor.extract(&page, &origin) {
            if !registry.append(url) {
                duplicates += 1;
            }
        }

        log::info!(
            "Discovered {} image(s) on {} ({} duplicate reference(s) collapsed)",
            registry.size(),
            thread_url,
            duplicates
        );
        warn_on_name_collisions(&registry);
        Ok(registry)
    }
}

/// Scheme, host and port of `url`, with an empty path.
fn origin_of(url: &Url) -> Url {
    let mut origin = url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    origin
}

/// File names claimed by more than one URL, sorted by name. Such URLs
/// overwrite each other on disk.
pub(crate) fn name_collisions(registry: &Registry) -> Vec<(String, Vec<String>)> {
    let mut by_name: HashMap<String, Vec<String>> = HashMap::new();
    for url in registry.urls() {
        if let Some(name) = file_name_for(&url) {
            by_name.entry(name).or_default().push(url);
        }
    }
    let mut collisions: Vec<_> = by_name
        .into_iter()
        .filter(|(_, urls)| urls.len() > 1)
        .collect();
    collisions.sort();
    collisions
}

fn warn_on_name_collisions(registry: &Registry) {
    for (name, urls) in name_collisions(registry) {
        log::warn!(
            "{} URLs share the file name '{}' and will overwrite each other: {:?}",
            urls.len(),
            name,
            urls
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::SelectorExtractor;

    struct StaticPage(&'static str);

    #[async_trait]
    impl PageSource for StaticPage {
        async fn fetch_page(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            Ok(self.0.as_bytes().to_vec())
        }
    }

    fn discovery(page: &'static str, origin: Option<&str>) -> Discovery {
        Discovery::new(
            Arc::new(StaticPage(page)),
            Arc::new(SelectorExtractor::default()),
            origin.map(|o| Url::parse(o).unwrap()),
        )
    }

    #[tokio::test]
    async fn resolves_against_configured_origin() {
        let page = r#"<img data-src="/a.jpg"><img data-src="/b.jpg">"#;
        let registry = discovery(page, Some("https://example.test"))
            .discover("https://board.test/b/res/1.html")
            .await
            .unwrap();

        assert_eq!(
            registry.urls(),
            vec!["https://example.test/a.jpg", "https://example.test/b.jpg"]
        );
    }

    #[tokio::test]
    async fn defaults_to_thread_origin_and_collapses_duplicates() {
        let page = r#"<img data-src="/src/a.jpg"><img data-src="/src/a.jpg">"#;
        let registry = discovery(page, None)
            .discover("http://board.test:8080/b/res/1.html?x=1")
            .await
            .unwrap();

        assert_eq!(registry.urls(), vec!["http://board.test:8080/src/a.jpg"]);
    }

    #[tokio::test]
    async fn rejects_invalid_thread_url() {
        let err = discovery("", None).discover("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn same_file_name_in_different_paths_is_a_collision() {
        let page = r#"<img data-src="/x/a.jpg"><img data-src="/y/a.jpg"><img data-src="/x/b.jpg">"#;
        let registry = discovery(page, Some("https://example.test"))
            .discover("https://example.test/b/res/1.html")
            .await
            .unwrap();

        assert_eq!(registry.size(), 3);
        assert_eq!(
            file_name_for("https://example.test/x/a.jpg"),
            file_name_for("https://example.test/y/a.jpg")
        );
        assert_eq!(
            name_collisions(&registry),
            vec![(
                "a.jpg".to_string(),
                vec![
                    "https://example.test/x/a.jpg".to_string(),
                    "https://example.test/y/a.jpg".to_string(),
                ]
            )]
        );
    }

    #[test]
    fn distinct_file_names_do_not_collide() {
        let mut registry = Registry::new();
        registry.append("https://example.test/a.jpg");
        registry.append("https://example.test/b.jpg");
        registry.append("https://example.test/dir/");
        assert!(name_collisions(&registry).is_empty());
    }

    #[test]
    fn origin_drops_path_and_query() {
        let url = Url::parse("https://example.test:8443/b/res/1.html?page=2#top").unwrap();
        assert_eq!(origin_of(&url).as_str(), "https://example.test:8443/");
    }
}
