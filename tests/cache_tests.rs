//! File Cache Tests
//!
//! The disk-level application of the supplicant gate: one read per residency
//! span, eviction on the last release, clean reload afterwards.

use std::fs;
use std::path::PathBuf;

use ember::assets::FileCache;

/// A unique scratch file that cleans itself up.
struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn new(contents: &[u8]) -> Self {
        let path = std::env::temp_dir().join(format!("ember-cache-{}", uuid::Uuid::new_v4()));
        fs::write(&path, contents).expect("failed to create scratch file");
        Self { path }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[test]
fn request_reads_once_per_residency_span() {
    let scratch = ScratchFile::new(b"original");
    let mut cache = FileCache::new();

    let first = cache.request(&scratch.path).unwrap();
    assert_eq!(first.as_slice(), b"original");
    assert_eq!(cache.users(&scratch.path), 1);

    // Overwrite the file on disk. A second request while resident must hand
    // out the cached bytes, proving no second read happened.
    fs::write(&scratch.path, b"changed!").unwrap();
    let second = cache.request(&scratch.path).unwrap();
    assert_eq!(second.as_slice(), b"original");
    assert_eq!(cache.users(&scratch.path), 2);
}

#[test]
fn last_release_evicts_and_next_request_rereads() {
    let scratch = ScratchFile::new(b"v1");
    let mut cache = FileCache::new();

    let _ = cache.request(&scratch.path).unwrap();
    let _ = cache.request(&scratch.path).unwrap();

    cache.release(&scratch.path);
    assert!(cache.is_resident(&scratch.path), "one supplicant left");

    cache.release(&scratch.path);
    assert!(!cache.is_resident(&scratch.path));
    assert!(cache.is_empty());

    fs::write(&scratch.path, b"v2").unwrap();
    let reloaded = cache.request(&scratch.path).unwrap();
    assert_eq!(reloaded.as_slice(), b"v2");
}

#[test]
fn release_of_unknown_path_is_ignored() {
    let mut cache = FileCache::new();
    cache.release(std::path::Path::new("/nonexistent/ember-test"));
    assert!(cache.is_empty());
}

#[test]
fn missing_file_surfaces_io_error_and_leaves_no_entry() {
    let mut cache = FileCache::new();
    let path = std::env::temp_dir().join(format!("ember-missing-{}", uuid::Uuid::new_v4()));

    let err = cache.request(&path);
    assert!(err.is_err());
    assert!(cache.is_empty(), "failed request must not leak an entry");
    assert_eq!(cache.users(&path), 0);
}

#[test]
fn earlier_bytes_stay_alive_after_eviction() {
    let scratch = ScratchFile::new(b"keep me");
    let mut cache = FileCache::new();

    let bytes = cache.request(&scratch.path).unwrap();
    cache.release(&scratch.path);

    // The Arc keeps the payload alive past eviction.
    assert_eq!(bytes.as_slice(), b"keep me");
}
