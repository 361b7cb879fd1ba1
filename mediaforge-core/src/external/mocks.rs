// mediaforge-core/src/external/mocks.rs

// --- Mocking Infrastructure (for testing) ---

use crate::cache::{QueryCache, QueryKind};
use crate::error::CoreResult;
use crate::external::prober::{MediaInfo, MetadataParser};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Parser that returns a canned [`MediaInfo`] and records the raw text it
/// was asked to parse.
#[derive(Debug, Default)]
pub struct MockMetadataParser {
    info: MediaInfo,
    seen: Mutex<Vec<String>>,
}

impl MockMetadataParser {
    pub fn returning(info: MediaInfo) -> Self {
        Self {
            info,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen_raw(&self) -> Vec<String> {
        self.seen.lock().expect("mock mutex poisoned").clone()
    }
}

impl MetadataParser for MockMetadataParser {
    fn parse_media_info(&self, raw: &str) -> CoreResult<MediaInfo> {
        self.seen
            .lock()
            .expect("mock mutex poisoned")
            .push(raw.to_string());
        Ok(self.info.clone())
    }
}

/// Cache that counts lookups and stores, for asserting cache interaction.
#[derive(Debug, Default)]
pub struct CountingCache {
    entries: Mutex<Vec<(PathBuf, QueryKind, String)>>,
    gets: Mutex<usize>,
    puts: Mutex<usize>,
}

impl CountingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_count(&self) -> usize {
        *self.gets.lock().expect("mock mutex poisoned")
    }

    pub fn put_count(&self) -> usize {
        *self.puts.lock().expect("mock mutex poisoned")
    }
}

impl QueryCache for CountingCache {
    fn get(&self, path: &Path, kind: QueryKind) -> Option<String> {
        *self.gets.lock().expect("mock mutex poisoned") += 1;
        self.entries
            .lock()
            .expect("mock mutex poisoned")
            .iter()
            .find(|(p, k, _)| p == path && *k == kind)
            .map(|(_, _, raw)| raw.clone())
    }

    fn put(&self, path: &Path, kind: QueryKind, raw: String) {
        *self.puts.lock().expect("mock mutex poisoned") += 1;
        self.entries
            .lock()
            .expect("mock mutex poisoned")
            .push((path.to_path_buf(), kind, raw));
    }
}
