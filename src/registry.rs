use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A single discovered resource and whether a worker has taken it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRecord {
    pub url: String,
    pub claimed: bool,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, UrlRecord>,
    order: Vec<String>,
    cursor: usize,
}

/// Discovered image URLs and their claim state.
///
/// Insertion takes `&mut self`, so the key set is frozen as soon as the
/// registry is shared behind an `Arc`. Claims go through a single mutex:
/// either `try_claim` for a known URL or `next_unclaimed`, which hands out
/// each URL to exactly one caller.
#[derive(Debug, Default)]
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `url` unless it is already known. Returns whether it was new.
    pub fn append(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if inner.records.contains_key(&url) {
            return false;
        }
        inner.order.push(url.clone());
        inner.records.insert(
            url.clone(),
            UrlRecord {
                url,
                claimed: false,
            },
        );
        true
    }

    /// Marks `url` claimed if it exists and nobody claimed it yet.
    pub fn try_claim(&self, url: &str) -> bool {
        let mut inner = self.lock();
        match inner.records.get_mut(url) {
            Some(record) if !record.claimed => {
                record.claimed = true;
                true
            }
            _ => false,
        }
    }

    /// Claims and returns the next pending URL, or `None` once all are taken.
    pub fn next_unclaimed(&self) -> Option<String> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        while let Some(url) = inner.order.get(inner.cursor) {
            inner.cursor += 1;
            if let Some(record) = inner.records.get_mut(url) {
                if !record.claimed {
                    record.claimed = true;
                    return Some(url.clone());
                }
            }
        }
        None
    }

    pub fn size(&self) -> usize {
        self.lock().records.len()
    }

    pub fn claimed_count(&self) -> usize {
        self.lock().records.values().filter(|r| r.claimed).count()
    }

    /// Snapshot of every known URL, in discovery order.
    pub fn urls(&self) -> Vec<String> {
        self.lock().order.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // No critical section can leave the maps half-updated, so a poisoned
        // lock still holds consistent data.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn registry_with(n: usize) -> Registry {
        let mut registry = Registry::new();
        for i in 0..n {
            registry.append(format!("https://example.test/{i}.jpg"));
        }
        registry
    }

    #[test]
    fn append_is_idempotent() {
        let mut registry = Registry::new();
        assert!(registry.append("https://example.test/a.jpg"));
        assert!(!registry.append("https://example.test/a.jpg"));
        assert_eq!(registry.size(), 1);
        assert_eq!(registry.next_unclaimed().as_deref(), Some("https://example.test/a.jpg"));
        assert_eq!(registry.next_unclaimed(), None);
    }

    #[test]
    fn try_claim_succeeds_once() {
        let registry = registry_with(1);
        let url = "https://example.test/0.jpg";
        assert!(registry.try_claim(url));
        assert!(!registry.try_claim(url));
        assert!(!registry.try_claim("https://example.test/unknown.jpg"));
        assert_eq!(registry.claimed_count(), 1);
    }

    #[test]
    fn dispenser_skips_urls_claimed_directly() {
        let registry = registry_with(3);
        assert!(registry.try_claim("https://example.test/1.jpg"));

        let mut handed_out = Vec::new();
        while let Some(url) = registry.next_unclaimed() {
            handed_out.push(url);
        }
        assert_eq!(
            handed_out,
            vec!["https://example.test/0.jpg", "https://example.test/2.jpg"]
        );
        assert_eq!(registry.claimed_count(), 3);
    }

    #[test]
    fn concurrent_try_claim_has_one_winner_per_url() {
        let registry = Arc::new(registry_with(50));
        let urls = registry.urls();
        let wins = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let urls = urls.clone();
                let wins = wins.clone();
                thread::spawn(move || {
                    for url in &urls {
                        if registry.try_claim(url) {
                            wins.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(wins.load(Ordering::SeqCst), 50);
        assert_eq!(registry.claimed_count(), 50);
    }

    #[test]
    fn concurrent_dispenser_hands_out_every_url_once() {
        let registry = Arc::new(registry_with(200));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || {
                    let mut taken = Vec::new();
                    while let Some(url) = registry.next_unclaimed() {
                        taken.push(url);
                    }
                    taken
                })
            })
            .collect();

        let mut all: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(all.len(), 200);
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 200);
    }

    #[test]
    fn urls_keep_discovery_order() {
        let mut registry = Registry::new();
        registry.append("https://example.test/b.jpg");
        registry.append("https://example.test/a.jpg");
        assert_eq!(
            registry.urls(),
            vec!["https://example.test/b.jpg", "https://example.test/a.jpg"]
        );
    }
}
