//! Mirrored GPU Buffers
//!
//! [`MirroredBuffer`] keeps one GPU buffer object byte-consistent with a
//! CPU-side dense array while resident. The allocation is sized to the CPU
//! array's *capacity* rather than its length, so ordinary pushes cost
//! nothing on the GPU; only a capacity-crossing growth forces a full reload.
//! The tail past the contents is zero-filled, which keeps freshly pushed
//! (zeroed) slots consistent before their first write.

use crate::gpu::{BufferKind, GpuBackend, GpuId, NULL_ID};

use super::loadable::LoadState;

// WebGPU sub-range copies are 4-byte aligned; ranges are widened from the
// CPU mirror to satisfy that. Element strides of GPU-visible types are
// multiples of 4 already.
const COPY_ALIGN: usize = 4;

/// One GPU buffer object mirroring a CPU-side byte span.
#[derive(Debug)]
pub struct MirroredBuffer {
    id: GpuId,
    kind: BufferKind,
    allocated: u64,
    state: LoadState,
    label: String,
}

impl MirroredBuffer {
    #[must_use]
    pub fn new(kind: BufferKind, label: impl Into<String>) -> Self {
        Self {
            id: NULL_ID,
            kind,
            allocated: 0,
            state: LoadState::new(),
            label: label.into(),
        }
    }

    /// Registers a user; on the 0→1 edge allocates the GPU buffer at
    /// `capacity` bytes and uploads `contents` (zero tail past the end).
    pub fn load(&mut self, gpu: &mut dyn GpuBackend, contents: &[u8], capacity: u64) {
        self.state.add_user();
        if !self.state.needs_load() {
            return;
        }
        let capacity = capacity.max(contents.len() as u64);
        self.id = gpu.create_buffer(self.kind, capacity, &self.label);
        self.allocated = capacity;
        self.write_aligned(gpu, 0, contents.len(), contents);
        self.state.mark_loaded();
        log::debug!("{}: resident ({capacity} bytes)", self.label);
    }

    /// Releases a user; on the 1→0 edge destroys the GPU buffer and clears
    /// the id.
    pub fn unload(&mut self, gpu: &mut dyn GpuBackend) {
        self.state.remove_user();
        if !self.state.needs_unload() {
            return;
        }
        gpu.destroy_buffer(self.id);
        self.id = NULL_ID;
        self.allocated = 0;
        self.state.mark_unloaded();
        log::debug!("{}: unloaded", self.label);
    }

    /// Reconciles the GPU allocation with the mirror's current capacity.
    /// A mismatch (the mirror grew) forces a full reload of the entire
    /// capacity. No-op while not resident.
    pub fn sync_capacity(&mut self, gpu: &mut dyn GpuBackend, contents: &[u8], capacity: u64) {
        if !self.state.is_resident() {
            return;
        }
        let capacity = capacity.max(contents.len() as u64);
        if capacity == self.allocated {
            return;
        }
        log::info!(
            "{}: capacity {} -> {capacity} bytes, full reload",
            self.label,
            self.allocated
        );
        let mut full = vec![0u8; capacity as usize];
        full[..contents.len()].copy_from_slice(contents);
        gpu.reallocate_buffer(self.id, &full);
        self.allocated = capacity;
    }

    /// Pushes `len` bytes starting at `start` from the mirror to the same
    /// offsets in the GPU buffer. No-op while not resident; mutations made
    /// while absent are picked up wholesale by the next [`load`](Self::load).
    pub fn sync_range(
        &mut self,
        gpu: &mut dyn GpuBackend,
        mirror: &[u8],
        start: usize,
        len: usize,
    ) {
        if !self.state.is_resident() || len == 0 {
            return;
        }
        self.write_aligned(gpu, start, len, mirror);
    }

    // Widens [offset, offset+len) to copy alignment using the surrounding
    // mirror bytes.
    fn write_aligned(&mut self, gpu: &mut dyn GpuBackend, offset: usize, len: usize, mirror: &[u8]) {
        let start = (offset - (offset % COPY_ALIGN)).min(mirror.len());
        let end = (offset + len).next_multiple_of(COPY_ALIGN).min(mirror.len());
        if start >= end {
            return;
        }
        gpu.write_buffer(self.id, start as u64, &mirror[start..end]);
    }

    /// The GPU object id, or [`NULL_ID`] while not resident.
    #[must_use]
    pub fn id(&self) -> GpuId {
        self.id
    }

    #[must_use]
    pub fn is_resident(&self) -> bool {
        self.state.is_resident()
    }

    /// Allocated GPU size in bytes.
    #[must_use]
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated
    }

    #[must_use]
    pub fn users(&self) -> u16 {
        self.state.users()
    }

    #[must_use]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }
}
