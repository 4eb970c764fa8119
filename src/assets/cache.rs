//! Disk-Backed Resource Cache
//!
//! Raw byte buffers keyed by path, reference-counted at whole-file
//! granularity with the same supplicant gate the GPU resources use: the
//! first [`request`](FileCache::request) reads the file, the last
//! [`release`](FileCache::release) evicts it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::resources::loadable::LoadState;

#[derive(Debug, Default)]
struct CacheEntry {
    bytes: Option<Arc<Vec<u8>>>,
    state: LoadState,
}

/// Supplicant-counted file cache.
#[derive(Debug, Default)]
pub struct FileCache {
    entries: FxHashMap<PathBuf, CacheEntry>,
}

impl FileCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in `path` and returns its bytes. The file is read
    /// once per residency span, however many callers request it.
    pub fn request(&mut self, path: &Path) -> Result<Arc<Vec<u8>>> {
        let entry = self.entries.entry(path.to_path_buf()).or_default();
        entry.state.add_user();
        if entry.state.needs_load() {
            match std::fs::read(path) {
                Ok(bytes) => {
                    log::debug!("FileCache: read {} ({} bytes)", path.display(), bytes.len());
                    entry.bytes = Some(Arc::new(bytes));
                    entry.state.mark_loaded();
                }
                Err(e) => {
                    entry.state.remove_user();
                    if entry.state.users() == 0 {
                        let _ = self.entries.remove(path);
                    }
                    return Err(e.into());
                }
            }
        }
        // Resident by now; the entry always holds bytes while loaded.
        Ok(entry
            .bytes
            .clone()
            .unwrap_or_else(|| Arc::new(Vec::new())))
    }

    /// Releases one supplicant of `path`. The last release drops the bytes
    /// and evicts the entry. Unknown paths are ignored.
    pub fn release(&mut self, path: &Path) {
        let Some(entry) = self.entries.get_mut(path) else {
            return;
        };
        entry.state.remove_user();
        if entry.state.needs_unload() {
            log::debug!("FileCache: evicted {}", path.display());
            let _ = self.entries.remove(path);
        }
    }

    #[must_use]
    pub fn is_resident(&self, path: &Path) -> bool {
        self.entries
            .get(path)
            .is_some_and(|e| e.state.is_resident())
    }

    /// Supplicant count for `path`.
    #[must_use]
    pub fn users(&self, path: &Path) -> u16 {
        self.entries.get(path).map_or(0, |e| e.state.users())
    }

    /// Number of resident files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
