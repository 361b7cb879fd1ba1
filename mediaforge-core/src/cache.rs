//! Injectable result cache for probe queries.
//!
//! The cache is keyed by a composite of media path and query kind and is
//! passed by reference into the components that need it, defaulting to a
//! no-op implementation. There is deliberately no process-wide static cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// The kind of query whose raw result may be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Raw prober output for one media file.
    MediaInfo,
    /// Engine `-version` banner.
    EngineVersion,
    /// Prober `-version` banner.
    ProberVersion,
}

/// Cache of raw query results keyed by (media path, query kind).
pub trait QueryCache {
    /// Returns the cached raw result, if any.
    fn get(&self, path: &Path, kind: QueryKind) -> Option<String>;

    /// Stores a raw result.
    fn put(&self, path: &Path, kind: QueryKind, raw: String);
}

/// A shared cache handle works anywhere an owned cache does.
impl<T: QueryCache + ?Sized> QueryCache for std::sync::Arc<T> {
    fn get(&self, path: &Path, kind: QueryKind) -> Option<String> {
        (**self).get(path, kind)
    }

    fn put(&self, path: &Path, kind: QueryKind, raw: String) {
        (**self).put(path, kind, raw)
    }
}

/// Cache implementation that stores nothing. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl QueryCache for NoopCache {
    fn get(&self, _path: &Path, _kind: QueryKind) -> Option<String> {
        None
    }

    fn put(&self, _path: &Path, _kind: QueryKind, _raw: String) {}
}

/// Simple in-memory cache suitable for one process lifetime.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<(PathBuf, QueryKind), String>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueryCache for MemoryCache {
    fn get(&self, path: &Path, kind: QueryKind) -> Option<String> {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .get(&(path.to_path_buf(), kind))
            .cloned()
    }

    fn put(&self, path: &Path, kind: QueryKind, raw: String) {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .insert((path.to_path_buf(), kind), raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_cache_never_hits() {
        let cache = NoopCache;
        cache.put(Path::new("/a"), QueryKind::MediaInfo, "raw".to_string());
        assert!(cache.get(Path::new("/a"), QueryKind::MediaInfo).is_none());
    }

    #[test]
    fn memory_cache_round_trip() {
        let cache = MemoryCache::new();
        cache.put(Path::new("/a"), QueryKind::MediaInfo, "raw".to_string());
        assert_eq!(
            cache.get(Path::new("/a"), QueryKind::MediaInfo).as_deref(),
            Some("raw")
        );
        // Different kind for the same path is a distinct key.
        assert!(cache.get(Path::new("/a"), QueryKind::EngineVersion).is_none());
    }
}
