//! Per-content preparation and a caller-owned cache of prepared documents.
//!
//! Parsing, projection and reconciliation only depend on the markdown
//! source, so they run once per content. Highlight and active-tag changes
//! reuse the prepared document.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::time::Instant;

use crate::config::EngineConfig;
use crate::parse::parse;
use crate::projection::{PlainTextProjection, project};
use crate::reconcile::OffsetMap;
use crate::tree::DocumentNode;

/// Hash markdown content for cache keys and change detection.
pub fn hash_source(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Everything derived from one markdown string.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    source: String,
    hash: u64,
    tree: Vec<DocumentNode>,
    projection: PlainTextProjection,
    offset_map: OffsetMap,
}

impl PreparedDocument {
    pub fn prepare(content: &str, config: &EngineConfig) -> Self {
        let started = Instant::now();
        let tree = parse(content);
        let projection = project(&tree);
        let offset_map = OffsetMap::build_anchored(
            content,
            projection.plain_text(),
            projection.anchors(),
            config.diff_timeout,
        );
        tracing::debug!(
            target: "marginalia::parse",
            source_len = content.len(),
            roots = tree.len(),
            leaves = projection.spans().len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "prepared document"
        );
        Self {
            source: content.to_string(),
            hash: hash_source(content),
            tree,
            projection,
            offset_map,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn tree(&self) -> &[DocumentNode] {
        &self.tree
    }

    pub fn projection(&self) -> &PlainTextProjection {
        &self.projection
    }

    pub fn offset_map(&self) -> &OffsetMap {
        &self.offset_map
    }
}

/// Bounded cache of prepared documents keyed by content hash.
///
/// Owned by the caller; cloning shares the underlying storage.
#[derive(Clone)]
pub struct DocumentCache {
    inner: mini_moka::sync::Cache<u64, Arc<PreparedDocument>>,
    config: EngineConfig,
}

impl DocumentCache {
    pub fn new(config: EngineConfig) -> Self {
        let inner = mini_moka::sync::Cache::builder()
            .max_capacity(config.cache_capacity)
            .build();
        Self { inner, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Return the prepared form of `content`, preparing it on a miss.
    pub fn get_or_prepare(&self, content: &str) -> Arc<PreparedDocument> {
        let key = hash_source(content);
        // Hash collisions are checked against the stored source.
        if let Some(hit) = self.inner.get(&key).filter(|doc| doc.source() == content) {
            tracing::trace!(target: "marginalia::parse", key, "document cache hit");
            return hit;
        }
        let prepared = Arc::new(PreparedDocument::prepare(content, &self.config));
        self.inner.insert(key, prepared.clone());
        prepared
    }

    /// Drop the entry for `content`, if cached.
    pub fn invalidate(&self, content: &str) {
        self.inner.invalidate(&hash_source(content));
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    pub fn contains(&self, content: &str) -> bool {
        self.inner
            .get(&hash_source(content))
            .is_some_and(|doc| doc.source() == content)
    }
}

impl std::fmt::Debug for DocumentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCache")
            .field("capacity", &self.config.cache_capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_heading() {
        let doc = PreparedDocument::prepare("# Title\n\nBody text here.", &EngineConfig::default());
        assert_eq!(doc.projection().plain_text(), "Title\n\nBody text here.");
        assert_eq!(doc.offset_map().get(2), Some(0));
        assert_eq!(doc.hash(), hash_source("# Title\n\nBody text here."));
    }

    #[test]
    fn test_cache_reuses_prepared_document() {
        let cache = DocumentCache::new(EngineConfig::default());
        let first = cache.get_or_prepare("hello *world*");
        let second = cache.get_or_prepare("hello *world*");
        assert!(Arc::ptr_eq(&first, &second));

        let other = cache.get_or_prepare("something else");
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = DocumentCache::new(EngineConfig::default());
        let first = cache.get_or_prepare("a");
        cache.invalidate("a");
        assert!(!cache.contains("a"));
        let again = cache.get_or_prepare("a");
        assert!(!Arc::ptr_eq(&first, &again));

        cache.get_or_prepare("b");
        cache.clear();
        assert!(!cache.contains("a"));
        assert!(!cache.contains("b"));
    }
}
