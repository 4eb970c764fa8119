//! Resources
//!
//! The reference-counted, lazily-resident GPU resource model. The leaf
//! primitives ([`LoadState`], [`Handle`], [`HandleVec`], [`MirroredBuffer`],
//! [`MirrorVec`]) are composed by the concrete resource kinds (geometry,
//! texture, material) and again by the scene layer.
//!
//! CPU-side sharing uses [`Shared`] (`Arc` + `RwLock`); GPU-side residency
//! stays on the explicit [`LoadState`] counter, because GPU object lifetime
//! is invisible to smart pointers.

pub mod buffer;
pub mod geometry;
pub mod handle;
pub mod loadable;
pub mod material;
pub mod mirror;
pub mod table;
pub mod texture;

pub use buffer::MirroredBuffer;
pub use geometry::{Geometry, Vertex};
pub use handle::{Handle, HandleAllocator};
pub use loadable::LoadState;
pub use material::Material;
pub use mirror::MirrorVec;
pub use table::{HandleVec, SwapRemoved};
pub use texture::{PixelBlock, Texture};

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Implemented by resources that carry a stable identity.
pub trait Identified {
    fn uuid(&self) -> Uuid;
}

/// Shared reference to a resource.
///
/// Many owners (models, scenes) hold the same resource; equality and hashing
/// go by the resource's identity, not its contents, so refs stay cheap to
/// compare.
#[derive(Debug)]
pub struct Shared<T> {
    uuid: Uuid,
    inner: Arc<RwLock<T>>,
}

impl<T: Identified> Shared<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            uuid: value.uuid(),
            inner: Arc::new(RwLock::new(value)),
        }
    }
}

impl<T> Shared<T> {
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.write()
    }

    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self {
            uuid: self.uuid,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for Shared<T> {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl<T> Eq for Shared<T> {}

impl<T> std::hash::Hash for Shared<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.uuid.hash(state);
    }
}

/// Shared geometry reference.
pub type GeometryRef = Shared<Geometry>;
/// Shared texture reference.
pub type TextureRef = Shared<Texture>;
/// Shared material reference.
pub type MaterialRef = Shared<Material>;
