//! Handle Table Tests
//!
//! Tests for:
//! - Handle uniqueness across consecutive pushes
//! - Swap-with-last removal: surviving handles keep resolving, removed
//!   handles stop resolving, elements relocate without changing value
//! - Unknown-handle behavior under both miss policies
//! - Degenerate removals (only element, last element)

use ember::errors::EmberError;
use ember::resources::{Handle, HandleVec};
use ember::settings::MissPolicy;

// ============================================================================
// Handle uniqueness
// ============================================================================

#[test]
fn consecutive_pushes_yield_distinct_nonzero_handles() {
    let mut table: HandleVec<u32> = HandleVec::new("test");
    let mut seen = Vec::new();
    for i in 0..100 {
        let handle = table.push(i);
        assert!(handle.is_some(), "push {i} returned the invalid handle");
        assert!(!seen.contains(&handle), "handle reused at push {i}");
        seen.push(handle);
    }
    assert_eq!(table.len(), 100);
}

#[test]
fn handles_are_not_reused_after_removal() {
    let mut table: HandleVec<u32> = HandleVec::new("test");
    let first = table.push(1);
    let _ = table.swap_remove(first).unwrap();
    let second = table.push(2);
    assert_ne!(first, second, "removal must not recycle handle values");
}

// ============================================================================
// Swap-with-last removal
// ============================================================================

#[test]
fn remove_middle_keeps_other_handles_resolving() {
    let mut table: HandleVec<u32> = HandleVec::new("test");
    let h1 = table.push(10);
    let h2 = table.push(20);
    let h3 = table.push(30);

    let removed = table.swap_remove(h2).unwrap().unwrap();
    assert_eq!(removed.value, 20);
    assert_eq!(removed.index, 1);
    assert_eq!(removed.moved, Some(h3), "last element moves into the hole");

    assert_eq!(table.len(), 2);
    assert_eq!(table.get(h1), Some(&10));
    assert_eq!(table.get(h3), Some(&30));
    assert_eq!(table.get(h2), None, "removed handle must stop resolving");
}

#[test]
fn remove_first_relocates_but_preserves_values() {
    let mut table: HandleVec<u32> = HandleVec::new("test");
    let h1 = table.push(10);
    let h2 = table.push(20);
    let h3 = table.push(30);

    let _ = table.swap_remove(h1).unwrap();

    // h3's element was relocated to slot 0; both survivors keep their value.
    assert_eq!(table.index_of(h3), Some(0));
    assert_eq!(table.get(h2), Some(&20));
    assert_eq!(table.get(h3), Some(&30));
    assert_eq!(table.get(h1), None);
}

#[test]
fn remove_last_element_moves_nothing() {
    let mut table: HandleVec<u32> = HandleVec::new("test");
    let _h1 = table.push(10);
    let h2 = table.push(20);

    let removed = table.swap_remove(h2).unwrap().unwrap();
    assert_eq!(removed.moved, None);
    assert_eq!(table.len(), 1);
}

#[test]
fn remove_only_element_degenerates_cleanly() {
    let mut table: HandleVec<u32> = HandleVec::new("test");
    let h = table.push(42);

    let removed = table.swap_remove(h).unwrap().unwrap();
    assert_eq!(removed.value, 42);
    assert_eq!(removed.moved, None);
    assert!(table.is_empty());
}

#[test]
fn handle_column_stays_aligned_with_items() {
    let mut table: HandleVec<u32> = HandleVec::new("test");
    let handles: Vec<Handle> = (0..10).map(|i| table.push(i * 100)).collect();

    let _ = table.swap_remove(handles[3]).unwrap();
    let _ = table.swap_remove(handles[7]).unwrap();
    let _ = table.swap_remove(handles[0]).unwrap();

    assert_eq!(table.handles().len(), table.items().len());
    for (handle, value) in table.iter() {
        let i = handles.iter().position(|&h| h == handle).unwrap();
        assert_eq!(*value, (i as u32) * 100, "handle {i} resolved to wrong value");
    }
}

// ============================================================================
// Miss policies
// ============================================================================

#[test]
fn unknown_handle_is_ignored_by_default() {
    let mut table: HandleVec<u32> = HandleVec::new("test");
    let h = table.push(7);
    let _ = table.swap_remove(h).unwrap();

    // Redundant removal: silently ignored, no error, no mutation.
    let second = table.swap_remove(h).unwrap();
    assert!(second.is_none());
}

#[test]
fn unknown_handle_errors_under_strict_policy() {
    let mut table: HandleVec<u32> = HandleVec::with_policy("strict_table", MissPolicy::Strict);
    let h = table.push(7);
    let _ = table.swap_remove(h).unwrap();

    let err = table.swap_remove(h).unwrap_err();
    match err {
        EmberError::UnknownHandle { handle, context } => {
            assert_eq!(handle, h.raw());
            assert_eq!(context, "strict_table");
        }
        other => panic!("expected UnknownHandle, got {other}"),
    }
}
