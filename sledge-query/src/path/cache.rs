//! Memoization of parsed paths.
//!
//! Parsing a path is cheap but paths are evaluated once per element, so every
//! compiled [`PathExpression`] is kept keyed by its literal source string.
//!
//! ```rust
//! use sledge_query::path::PathCache;
//!
//! let cache = PathCache::new();
//! let first = cache.get_or_parse("user->name").unwrap();
//! let second = cache.get_or_parse("user->name").unwrap();
//!
//! assert!(std::sync::Arc::ptr_eq(&first, &second));
//! assert_eq!(cache.stats().hits, 1);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::trace;

use super::{PathExpression, parser};
use crate::error::QueryResult;

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathCacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to parse.
    pub misses: u64,
}

/// A thread-safe cache of parsed paths.
#[derive(Debug, Default)]
pub struct PathCache {
    paths: RwLock<HashMap<String, Arc<PathExpression>>>,
    stats: RwLock<PathCacheStats>,
}

impl PathCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the parsed form of `path`, parsing and storing it on first use.
    ///
    /// Parse errors are not cached.
    pub fn get_or_parse(&self, path: &str) -> QueryResult<Arc<PathExpression>> {
        if let Some(expression) = self.paths.read().get(path) {
            self.stats.write().hits += 1;
            return Ok(Arc::clone(expression));
        }

        // No lock is held while parsing: `[*]` remainders are parsed recursively.
        let steps = parser::parse(path)?;
        let expression = Arc::new(PathExpression {
            source: path.to_string(),
            steps,
        });
        trace!(path = %path, steps = expression.steps.len(), "Compiled path");

        self.stats.write().misses += 1;
        let mut paths = self.paths.write();
        let entry = paths
            .entry(path.to_string())
            .or_insert_with(|| Arc::clone(&expression));
        Ok(Arc::clone(entry))
    }

    /// Check if a path has been parsed already.
    pub fn contains(&self, path: &str) -> bool {
        self.paths.read().contains_key(path)
    }

    /// Number of cached paths.
    pub fn len(&self) -> usize {
        self.paths.read().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics.
    pub fn stats(&self) -> PathCacheStats {
        *self.stats.read()
    }

    /// Drop every cached path and reset the statistics.
    pub fn clear(&self) {
        self.paths.write().clear();
        *self.stats.write() = PathCacheStats::default();
    }

    /// The process-wide cache used by [`PathExpression::parse`].
    pub fn global() -> &'static PathCache {
        static GLOBAL_PATH_CACHE: OnceLock<PathCache> = OnceLock::new();
        GLOBAL_PATH_CACHE.get_or_init(PathCache::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuses_parsed_path() {
        let cache = PathCache::new();
        let a = cache.get_or_parse("a.b").unwrap();
        let b = cache.get_or_parse("a.b").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats(), PathCacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = PathCache::new();
        assert!(cache.get_or_parse("a[").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let cache = PathCache::new();
        cache.get_or_parse("x").unwrap();
        assert!(cache.contains("x"));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), PathCacheStats::default());
    }
}
