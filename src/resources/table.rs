//! Handle-Indexed Collections
//!
//! [`HandleVec`] wraps a dense `Vec<T>` with a parallel column of issued
//! [`Handle`]s and a hash lookup from handle to current position. Removal is
//! swap-with-last, so positions shuffle and raw indices go stale immediately;
//! handles keep resolving to their element wherever it lands.

use rustc_hash::FxHashMap;

use crate::errors::{EmberError, Result};
use crate::settings::MissPolicy;

use super::handle::{Handle, HandleAllocator};

/// Outcome of a swap-with-last removal.
#[derive(Debug)]
pub struct SwapRemoved<T> {
    /// The removed element.
    pub value: T,
    /// The slot the removed element occupied. If another element was moved
    /// into it, that slot now holds different bytes and (when mirrored)
    /// needs re-synchronizing.
    pub index: usize,
    /// Handle of the element that was relocated into `index`, if any. The
    /// degenerate cases (removing the last or only element) move nothing.
    pub moved: Option<Handle>,
}

/// Dense collection addressed exclusively through stable handles.
#[derive(Debug)]
pub struct HandleVec<T> {
    items: Vec<T>,
    handles: Vec<Handle>,
    index_of: FxHashMap<Handle, usize>,
    allocator: HandleAllocator,
    policy: MissPolicy,
    label: &'static str,
}

impl<T> HandleVec<T> {
    #[must_use]
    pub fn new(label: &'static str) -> Self {
        Self {
            items: Vec::new(),
            handles: Vec::new(),
            index_of: FxHashMap::default(),
            allocator: HandleAllocator::new(),
            policy: MissPolicy::Ignore,
            label,
        }
    }

    #[must_use]
    pub fn with_policy(label: &'static str, policy: MissPolicy) -> Self {
        let mut table = Self::new(label);
        table.policy = policy;
        table
    }

    pub fn set_policy(&mut self, policy: MissPolicy) {
        self.policy = policy;
    }

    /// Appends `value` and returns its handle, or [`Handle::NONE`] (with no
    /// mutation) if the allocator is exhausted.
    pub fn push(&mut self, value: T) -> Handle {
        let handle = self.allocator.allocate();
        if handle.is_none() {
            return Handle::NONE;
        }
        let index = self.items.len();
        self.items.push(value);
        self.handles.push(handle);
        let _ = self.index_of.insert(handle, index);
        handle
    }

    /// Removes the element behind `handle` by swapping the last element into
    /// its slot.
    ///
    /// Unknown handles resolve per the collection's [`MissPolicy`]:
    /// `Ok(None)` under `Ignore`, an error under `Strict`.
    pub fn swap_remove(&mut self, handle: Handle) -> Result<Option<SwapRemoved<T>>> {
        let Some(index) = self.index_of.remove(&handle) else {
            return self.miss(handle).map(|()| None);
        };
        let value = self.items.swap_remove(index);
        let _ = self.handles.swap_remove(index);
        let moved = if index < self.items.len() {
            let moved_handle = self.handles[index];
            let _ = self.index_of.insert(moved_handle, index);
            Some(moved_handle)
        } else {
            None
        };
        Ok(Some(SwapRemoved {
            value,
            index,
            moved,
        }))
    }

    fn miss(&self, handle: Handle) -> Result<()> {
        match self.policy {
            MissPolicy::Ignore => Ok(()),
            MissPolicy::Strict => Err(EmberError::UnknownHandle {
                handle: handle.raw(),
                context: self.label,
            }),
        }
    }

    /// Resolves a handle to its current slot, if the element is still live.
    #[must_use]
    pub fn index_of(&self, handle: Handle) -> Option<usize> {
        self.index_of.get(&handle).copied()
    }

    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        self.index_of.contains_key(&handle)
    }

    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.index_of(handle).map(|i| &self.items[i])
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let index = self.index_of(handle)?;
        Some(&mut self.items[index])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Reserved capacity of the backing storage, in elements.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// The dense element column. Positions are only meaningful until the
    /// next removal.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// The handle column, index-aligned with [`items`](Self::items).
    #[must_use]
    pub fn handles(&self) -> &[Handle] {
        &self.handles
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.handles.iter().copied().zip(self.items.iter())
    }

    pub(crate) fn policy(&self) -> MissPolicy {
        self.policy
    }

    pub(crate) fn label(&self) -> &'static str {
        self.label
    }
}
