use select::document::Document;
use select::node::Node;
use select::predicate::Predicate;
use serde::{Deserialize, Serialize};
use url::Url;

/// Turns a thread page into the absolute URLs of the images it references.
///
/// Implementations return one URL per matched image element, in document
/// order. Duplicates are allowed; the registry collapses them.
pub trait ImageExtractor: Send + Sync {
    fn extract(&self, page: &str, origin: &Url) -> Vec<String>;
}

/// A serializable description of which elements carry images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "spec")]
pub enum ImageSelector {
    /// Matches an HTML tag name (e.g. "img")
    Tag(String),

    /// Matches a CSS class
    Class(String),

    /// Matches an attribute existence or specific value
    Attribute { key: String, value: Option<String> },

    /// Matches if ALL sub-selectors match
    And(Vec<ImageSelector>),

    /// Matches if ANY sub-selector matches
    Or(Vec<ImageSelector>),

    /// .ancestor .descendant
    Descendant {
        ancestor: Box<ImageSelector>,
        descendant: Box<ImageSelector>,
    },
}

impl ImageSelector {
    /// `img[data-src]`, the lazy-loaded thumbnails of an imageboard thread.
    pub fn lazy_img(attribute: &str) -> Self {
        ImageSelector::And(vec![
            ImageSelector::Tag("img".to_string()),
            ImageSelector::Attribute {
                key: attribute.to_string(),
                value: None,
            },
        ])
    }

    /// Renders the selector as CSS, for logs.
    pub fn to_css_string(&self) -> String {
        match self {
            ImageSelector::Tag(tag) => tag.clone(),
            ImageSelector::Class(cls) => format!(".{}", cls),
            ImageSelector::Attribute { key, value } => match value {
                Some(v) => format!("[{}='{}']", key, v),
                None => format!("[{}]", key),
            },
            ImageSelector::And(parts) => parts.iter().map(Self::to_css_string).collect(),
            ImageSelector::Or(parts) => parts
                .iter()
                .map(Self::to_css_string)
                .collect::<Vec<_>>()
                .join(", "),
            ImageSelector::Descendant {
                ancestor,
                descendant,
            } => format!("{} {}", ancestor.to_css_string(), descendant.to_css_string()),
        }
    }
}

impl Predicate for ImageSelector {
    fn matches(&self, node: &Node) -> bool {
        match self {
            ImageSelector::Tag(tag) => node.name() == Some(tag.as_str()),
            ImageSelector::Class(cls) => node
                .attr("class")
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == cls)),
            ImageSelector::Attribute { key, value } => match value {
                Some(v) => node.attr(key.as_str()) == Some(v.as_str()),
                None => node.attr(key.as_str()).is_some(),
            },
            ImageSelector::And(parts) => parts.iter().all(|s| s.matches(node)),
            ImageSelector::Or(parts) => parts.iter().any(|s| s.matches(node)),
            ImageSelector::Descendant {
                ancestor,
                descendant,
            } => {
                if !descendant.matches(node) {
                    return false;
                }
                let mut current = node.parent();
                while let Some(parent) = current {
                    if ancestor.matches(&parent) {
                        return true;
                    }
                    current = parent.parent();
                }
                false
            }
        }
    }
}

impl<'a> Predicate for &'a ImageSelector {
    fn matches(&self, node: &Node) -> bool {
        (*self).matches(node)
    }
}

/// Extracts the value of `attribute` from every element matching `selector`.
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    selector: ImageSelector,
    attribute: String,
}

impl SelectorExtractor {
    pub fn new(selector: ImageSelector, attribute: impl Into<String>) -> Self {
        Self {
            selector,
            attribute: attribute.into(),
        }
    }
}

impl Default for SelectorExtractor {
    fn default() -> Self {
        Self::new(ImageSelector::lazy_img("data-src"), "data-src")
    }
}

impl ImageExtractor for SelectorExtractor {
    fn extract(&self, page: &str, origin: &Url) -> Vec<String> {
        let document = Document::from(page);
        let mut urls = Vec::new();

        for node in document.find(&self.selector) {
            let Some(raw) = node.attr(self.attribute.as_str()).map(str::trim) else {
                continue;
            };
            if raw.is_empty() {
                continue;
            }
            match resolve(origin, raw) {
                Some(url) => urls.push(url),
                None => log::warn!("Skipping unresolvable image reference {:?}", raw),
            }
        }

        log::debug!(
            "Selector '{}' matched {} image(s)",
            self.selector.to_css_string(),
            urls.len()
        );
        urls
    }
}

/// Resolves `reference` against `origin`; absolute references pass through.
pub fn resolve(origin: &Url, reference: &str) -> Option<String> {
    origin.join(reference).ok().map(String::from)
}
