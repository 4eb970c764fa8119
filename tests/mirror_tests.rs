//! Mirrored Buffer Tests
//!
//! The GPU half of the handle-indexed collections, run against the headless
//! backend so buffer contents can be read back byte for byte:
//! - Full-capacity upload on first load, zero-filled past the contents
//! - Capacity growth forces a full reload under the same logical id
//! - Sub-range writes on set, slot re-sync on swap-removal
//! - Non-resident mutation is CPU-only and picked up by the next load
//! - The standing invariant: CPU mirror == GPU prefix for all live slots

use ember::gpu::{BufferKind, HeadlessBackend};
use ember::resources::MirrorVec;
use ember::settings::MissPolicy;

/// Asserts the live prefix of the GPU buffer matches the CPU mirror exactly.
fn assert_consistent(gpu: &HeadlessBackend, mirror: &MirrorVec<u32>) {
    let cpu: &[u8] = bytemuck::cast_slice(mirror.items());
    let gpu_bytes = gpu
        .buffer_bytes(mirror.buffer_id())
        .expect("mirror buffer should be alive");
    assert!(
        gpu_bytes.len() >= cpu.len(),
        "GPU allocation smaller than mirror contents"
    );
    assert_eq!(&gpu_bytes[..cpu.len()], cpu, "CPU mirror and GPU diverged");
}

// ============================================================================
// Residency
// ============================================================================

#[test]
fn load_uploads_contents_and_zero_tail() {
    let mut gpu = HeadlessBackend::new();
    let mut lights: MirrorVec<u32> = MirrorVec::new(BufferKind::Storage, "test");

    let _ = lights.push_value(&mut gpu, 11);
    let _ = lights.push_value(&mut gpu, 22);
    lights.load(&mut gpu);

    assert!(lights.is_resident());
    assert_consistent(&gpu, &lights);

    // Whatever capacity the Vec reserved, the tail past the contents is zero.
    let bytes = gpu.buffer_bytes(lights.buffer_id()).unwrap();
    let live = lights.len() * 4;
    assert!(bytes[live..].iter().all(|&b| b == 0), "capacity tail not zeroed");
}

#[test]
fn unload_destroys_buffer_and_load_restores_it() {
    let mut gpu = HeadlessBackend::new();
    let mut mirror: MirrorVec<u32> = MirrorVec::new(BufferKind::Storage, "test");
    let h = mirror.push_value(&mut gpu, 5);

    mirror.load(&mut gpu);
    let first_id = mirror.buffer_id();
    assert!(gpu.buffer_alive(first_id));

    mirror.unload(&mut gpu);
    assert!(!mirror.is_resident());
    assert!(!gpu.buffer_alive(first_id));

    // Mutations while absent are CPU-only...
    mirror.set(&mut gpu, h, 99).unwrap();

    // ...and the next load uploads them wholesale.
    mirror.load(&mut gpu);
    assert_consistent(&gpu, &mirror);
    assert_eq!(mirror.get(h), Some(&99));
}

#[test]
fn load_twice_allocates_once() {
    let mut gpu = HeadlessBackend::new();
    let mut mirror: MirrorVec<u32> = MirrorVec::new(BufferKind::Storage, "test");
    let _ = mirror.push_value(&mut gpu, 1);

    mirror.load(&mut gpu);
    mirror.load(&mut gpu);
    assert_eq!(gpu.buffer_count(), 1, "second load must not allocate");

    mirror.unload(&mut gpu);
    assert!(mirror.is_resident(), "one user remains, still resident");
    mirror.unload(&mut gpu);
    assert!(!mirror.is_resident());

    // Extra unloads are saturating no-ops; a fresh load works again.
    mirror.unload(&mut gpu);
    mirror.load(&mut gpu);
    assert!(mirror.is_resident());
}

// ============================================================================
// Mutation while resident
// ============================================================================

#[test]
fn set_mirrors_exact_element() {
    let mut gpu = HeadlessBackend::new();
    let mut mirror: MirrorVec<u32> = MirrorVec::new(BufferKind::Storage, "test");
    let a = mirror.push_value(&mut gpu, 10);
    let b = mirror.push_value(&mut gpu, 20);
    mirror.load(&mut gpu);

    mirror.set(&mut gpu, b, 200).unwrap();
    assert_eq!(mirror.get(a), Some(&10));
    assert_eq!(mirror.get(b), Some(&200));
    assert_consistent(&gpu, &mirror);
}

#[test]
fn push_while_resident_grows_capacity_with_full_reload() {
    let mut gpu = HeadlessBackend::new();
    let mut mirror: MirrorVec<u32> = MirrorVec::new(BufferKind::Storage, "test");
    mirror.load(&mut gpu);
    let id = mirror.buffer_id();

    let mut handles = Vec::new();
    for i in 0..64 {
        let h = mirror.push(&mut gpu);
        assert!(h.is_some());
        mirror.set(&mut gpu, h, i).unwrap();
        handles.push(h);
        // Every intermediate state stays consistent, across however many
        // capacity jumps the Vec makes.
        assert_consistent(&gpu, &mirror);
    }

    assert_eq!(mirror.buffer_id(), id, "logical id survives reallocation");
    let allocated = gpu.buffer_size(id).unwrap();
    assert!(allocated >= 64 * 4, "allocation must cover all elements");
}

#[test]
fn remove_resyncs_the_relocated_slot() {
    let mut gpu = HeadlessBackend::new();
    let mut mirror: MirrorVec<u32> = MirrorVec::new(BufferKind::Storage, "test");
    let h1 = mirror.push_value(&mut gpu, 10);
    let h2 = mirror.push_value(&mut gpu, 20);
    let h3 = mirror.push_value(&mut gpu, 30);
    mirror.load(&mut gpu);

    // Spec scenario: remove the middle of {10, 20, 30}.
    mirror.remove(&mut gpu, h2).unwrap();
    assert_eq!(mirror.len(), 2);
    assert_eq!(mirror.get(h1), Some(&10));
    assert_eq!(mirror.get(h3), Some(&30));
    assert_eq!(mirror.get(h2), None);
    assert_consistent(&gpu, &mirror);

    // Logical shrink only: no reallocation happened.
    assert_eq!(gpu.buffer_count(), 1);
}

#[test]
fn push_into_vacated_slot_stays_consistent() {
    let mut gpu = HeadlessBackend::new();
    let mut mirror: MirrorVec<u32> = MirrorVec::new(BufferKind::Storage, "test");
    let _a = mirror.push_value(&mut gpu, 1);
    let b = mirror.push_value(&mut gpu, 2);
    mirror.load(&mut gpu);

    // Vacate the last slot, then reuse it without a capacity change. The
    // fresh slot must read back zeroed, not as stale bytes of the old 2.
    mirror.remove(&mut gpu, b).unwrap();
    let c = mirror.push(&mut gpu);
    assert_eq!(mirror.get(c), Some(&0));
    assert_consistent(&gpu, &mirror);
}

#[test]
fn random_walk_of_mutations_stays_consistent() {
    let mut gpu = HeadlessBackend::new();
    let mut mirror: MirrorVec<u32> = MirrorVec::new(BufferKind::Storage, "test");
    mirror.load(&mut gpu);

    let mut handles = Vec::new();
    // Deterministic interleave of push/set/remove.
    for step in 0u32..200 {
        match step % 5 {
            0 | 1 | 2 => {
                let h = mirror.push_value(&mut gpu, step);
                handles.push(h);
            }
            3 => {
                if let Some(&h) = handles.get(step as usize % handles.len().max(1)) {
                    let _ = mirror.set(&mut gpu, h, step * 7);
                }
            }
            _ => {
                if !handles.is_empty() {
                    let h = handles.remove(step as usize % handles.len());
                    mirror.remove(&mut gpu, h).unwrap();
                }
            }
        }
        assert_consistent(&gpu, &mirror);
    }
}

// ============================================================================
// Sub-element writes and direct mutation
// ============================================================================

#[test]
fn set_bytes_rejects_out_of_range_writes() {
    let mut gpu = HeadlessBackend::new();
    let mut mirror: MirrorVec<u32> = MirrorVec::new(BufferKind::Storage, "test");
    let h = mirror.push_value(&mut gpu, 0xAABB_CCDD);
    mirror.load(&mut gpu);

    let err = mirror.set_bytes(&mut gpu, h, 2, &[0, 0, 0]).unwrap_err();
    assert!(matches!(
        err,
        ember::errors::EmberError::RangeOutOfBounds { offset: 2, len: 3, stride: 4 }
    ));
    // Nothing was touched, CPU or GPU.
    assert_eq!(mirror.get(h), Some(&0xAABB_CCDD));
    assert_consistent(&gpu, &mirror);
}

#[test]
fn sync_pushes_directly_mutated_bytes() {
    let mut gpu = HeadlessBackend::new();
    let mut mirror: MirrorVec<u32> = MirrorVec::new(BufferKind::Storage, "test");
    let h = mirror.push_value(&mut gpu, 1);
    mirror.load(&mut gpu);

    // Bypass set(): mutate in place, then re-push the bytes.
    *mirror.get_mut(h).unwrap() = 77;
    mirror.sync(&mut gpu, h, 0, 4).unwrap();
    assert_consistent(&gpu, &mirror);
}

#[test]
fn mutators_miss_silently_or_strictly() {
    let mut gpu = HeadlessBackend::new();
    let mut lenient: MirrorVec<u32> = MirrorVec::new(BufferKind::Storage, "lenient");
    let h = lenient.push_value(&mut gpu, 1);
    lenient.remove(&mut gpu, h).unwrap();
    // No-ops across the board.
    lenient.set(&mut gpu, h, 2).unwrap();
    lenient.sync(&mut gpu, h, 0, 4).unwrap();
    lenient.remove(&mut gpu, h).unwrap();

    let mut strict: MirrorVec<u32> =
        MirrorVec::with_policy(BufferKind::Storage, "strict", MissPolicy::Strict);
    let h = strict.push_value(&mut gpu, 1);
    strict.remove(&mut gpu, h).unwrap();
    assert!(strict.set(&mut gpu, h, 2).is_err());
    assert!(strict.sync(&mut gpu, h, 0, 4).is_err());
    assert!(strict.remove(&mut gpu, h).is_err());
}
