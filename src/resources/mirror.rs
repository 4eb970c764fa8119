//! GPU-Mirrored Handle Collections
//!
//! [`MirrorVec`] composes a [`HandleVec`] with a [`MirroredBuffer`]: a dense
//! POD collection addressed through stable handles whose bytes are kept
//! consistent with one GPU buffer object while resident. This single generic
//! component backs the point-light and directional-light collections and any
//! other per-element GPU array.

use bytemuck::Pod;

use crate::errors::{EmberError, Result};
use crate::gpu::{BufferKind, GpuBackend, GpuId};
use crate::settings::MissPolicy;

use super::buffer::MirroredBuffer;
use super::handle::Handle;
use super::table::HandleVec;

/// Handle-indexed dense array of `T`, mirrored into a GPU buffer.
#[derive(Debug)]
pub struct MirrorVec<T: Pod> {
    table: HandleVec<T>,
    buffer: MirroredBuffer,
}

impl<T: Pod> MirrorVec<T> {
    #[must_use]
    pub fn new(kind: BufferKind, label: &'static str) -> Self {
        Self {
            table: HandleVec::new(label),
            buffer: MirroredBuffer::new(kind, label),
        }
    }

    #[must_use]
    pub fn with_policy(kind: BufferKind, label: &'static str, policy: MissPolicy) -> Self {
        let mut v = Self::new(kind, label);
        v.table.set_policy(policy);
        v
    }

    pub fn set_policy(&mut self, policy: MissPolicy) {
        self.table.set_policy(policy);
    }

    /// Byte size of one element.
    #[must_use]
    pub fn stride() -> usize {
        std::mem::size_of::<T>()
    }

    fn capacity_bytes(&self) -> u64 {
        (self.table.capacity() * Self::stride()) as u64
    }

    // ========================================================================
    // Residency
    // ========================================================================

    /// Registers a user of the GPU mirror; first user triggers the upload.
    pub fn load(&mut self, gpu: &mut dyn GpuBackend) {
        let capacity = self.capacity_bytes();
        self.buffer
            .load(gpu, bytemuck::cast_slice(self.table.items()), capacity);
    }

    /// Releases a user; last user frees the GPU buffer.
    pub fn unload(&mut self, gpu: &mut dyn GpuBackend) {
        self.buffer.unload(gpu);
    }

    #[must_use]
    pub fn is_resident(&self) -> bool {
        self.buffer.is_resident()
    }

    /// GPU buffer id for binding, [`NULL_ID`](crate::gpu::NULL_ID) while
    /// absent.
    #[must_use]
    pub fn buffer_id(&self) -> GpuId {
        self.buffer.id()
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Appends one zeroed slot and returns its handle ([`Handle::NONE`] with
    /// no mutation on allocator exhaustion).
    ///
    /// While resident, a capacity-crossing growth reloads the whole buffer;
    /// otherwise only the fresh slot is written, so the mirror and the GPU
    /// stay byte-identical even when the slot reuses space vacated by an
    /// earlier removal.
    pub fn push(&mut self, gpu: &mut dyn GpuBackend) -> Handle {
        let handle = self.table.push(T::zeroed());
        if handle.is_none() {
            return Handle::NONE;
        }
        if self.buffer.is_resident() {
            let capacity = self.capacity_bytes();
            if capacity == self.buffer.allocated_bytes() {
                let start = (self.table.len() - 1) * Self::stride();
                self.buffer.sync_range(
                    gpu,
                    bytemuck::cast_slice(self.table.items()),
                    start,
                    Self::stride(),
                );
            } else {
                self.buffer
                    .sync_capacity(gpu, bytemuck::cast_slice(self.table.items()), capacity);
            }
        }
        handle
    }

    /// [`push`](Self::push) followed by a whole-element write.
    pub fn push_value(&mut self, gpu: &mut dyn GpuBackend, value: T) -> Handle {
        let handle = self.push(gpu);
        if handle.is_some() {
            // The handle was just issued; the write cannot miss.
            let _ = self.set(gpu, handle, value);
        }
        handle
    }

    /// Swap-with-last removal. The slot that received the relocated element
    /// is re-synchronized; the GPU buffer's logical length shrinks without a
    /// capacity change.
    pub fn remove(&mut self, gpu: &mut dyn GpuBackend, handle: Handle) -> Result<()> {
        let Some(removed) = self.table.swap_remove(handle)? else {
            return Ok(());
        };
        if removed.moved.is_some() {
            self.buffer.sync_range(
                gpu,
                bytemuck::cast_slice(self.table.items()),
                removed.index * Self::stride(),
                Self::stride(),
            );
        }
        Ok(())
    }

    /// Overwrites the whole element behind `handle`.
    pub fn set(&mut self, gpu: &mut dyn GpuBackend, handle: Handle, value: T) -> Result<()> {
        self.set_bytes(gpu, handle, 0, bytemuck::bytes_of(&value))
    }

    /// Copies `bytes` into the element behind `handle` starting at `offset`,
    /// mirroring exactly that sub-range to the GPU while resident.
    ///
    /// The write must fit inside one element; spilling past the stride is
    /// rejected before anything is touched.
    pub fn set_bytes(
        &mut self,
        gpu: &mut dyn GpuBackend,
        handle: Handle,
        offset: usize,
        bytes: &[u8],
    ) -> Result<()> {
        if offset + bytes.len() > Self::stride() {
            return Err(EmberError::RangeOutOfBounds {
                offset,
                len: bytes.len(),
                stride: Self::stride(),
            });
        }
        let Some(index) = self.table.index_of(handle) else {
            return self.miss(handle);
        };
        if let Some(element) = self.table.get_mut(handle) {
            bytemuck::bytes_of_mut(element)[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        self.buffer.sync_range(
            gpu,
            bytemuck::cast_slice(self.table.items()),
            index * Self::stride() + offset,
            bytes.len(),
        );
        Ok(())
    }

    /// Re-pushes bytes the caller already mutated through
    /// [`get_mut`](Self::get_mut), without touching the CPU data.
    pub fn sync(
        &mut self,
        gpu: &mut dyn GpuBackend,
        handle: Handle,
        offset: usize,
        len: usize,
    ) -> Result<()> {
        if offset + len > Self::stride() {
            return Err(EmberError::RangeOutOfBounds {
                offset,
                len,
                stride: Self::stride(),
            });
        }
        let Some(index) = self.table.index_of(handle) else {
            return self.miss(handle);
        };
        self.buffer.sync_range(
            gpu,
            bytemuck::cast_slice(self.table.items()),
            index * Self::stride() + offset,
            len,
        );
        Ok(())
    }

    fn miss(&self, handle: Handle) -> Result<()> {
        match self.table.policy() {
            MissPolicy::Ignore => Ok(()),
            MissPolicy::Strict => Err(EmberError::UnknownHandle {
                handle: handle.raw(),
                context: self.table.label(),
            }),
        }
    }

    // ========================================================================
    // Access
    // ========================================================================

    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.table.get(handle)
    }

    /// Direct mutable access. GPU consistency is the caller's job: follow up
    /// with [`sync`](Self::sync) for the bytes that changed.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.table.get_mut(handle)
    }

    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        self.table.contains(handle)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        self.table.items()
    }

    #[must_use]
    pub fn handles(&self) -> &[Handle] {
        self.table.handles()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.table.iter()
    }
}
