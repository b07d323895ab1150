//! Full-page output cache: rendered responses keyed by request path.

use dashmap::DashMap;

#[derive(Default)]
pub struct OutputCache {
    pages: DashMap<String, Vec<u8>>,
}

impl OutputCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, path: impl Into<String>, body: Vec<u8>) {
        self.pages.insert(path.into(), body);
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.pages.get(path).map(|page| page.value().clone())
    }

    /// Drops every cached page. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let count = self.pages.len();
        self.pages.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
