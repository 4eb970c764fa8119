//! Textures
//!
//! A [`PixelBlock`] is decoded image data (tightly packed RGBA8); decoding
//! itself lives outside the engine. [`Texture`] wraps a block with the
//! residency gate and the GPU texture object id.

use uuid::Uuid;

use crate::gpu::{GpuBackend, GpuId, NULL_ID, PixelFormat};

use super::Identified;
use super::loadable::LoadState;

/// Decoded, tightly packed RGBA8 pixels.
#[derive(Debug, Clone)]
pub struct PixelBlock {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
}

impl PixelBlock {
    /// A 1x1 opaque white block, the usual placeholder binding.
    #[must_use]
    pub fn white() -> Self {
        Self {
            width: 1,
            height: 1,
            format: PixelFormat::Rgba8Unorm,
            pixels: vec![255, 255, 255, 255],
        }
    }
}

/// A 2D texture with lazily-resident GPU storage.
#[derive(Debug)]
pub struct Texture {
    id: Uuid,
    pub name: String,
    source: PixelBlock,
    gpu_id: GpuId,
    state: LoadState,
}

impl Texture {
    #[must_use]
    pub fn new(name: impl Into<String>, source: PixelBlock) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            source,
            gpu_id: NULL_ID,
            state: LoadState::new(),
        }
    }

    /// Registers a user; the first one creates and fills the GPU texture.
    pub fn load(&mut self, gpu: &mut dyn GpuBackend) {
        self.state.add_user();
        if !self.state.needs_load() {
            return;
        }
        self.gpu_id = gpu.create_texture(
            self.source.width,
            self.source.height,
            self.source.format,
            &self.source.pixels,
            &self.name,
        );
        self.state.mark_loaded();
        log::debug!(
            "Texture '{}': resident ({}x{})",
            self.name,
            self.source.width,
            self.source.height
        );
    }

    /// Releases a user; the last one destroys the GPU texture.
    pub fn unload(&mut self, gpu: &mut dyn GpuBackend) {
        self.state.remove_user();
        if !self.state.needs_unload() {
            return;
        }
        gpu.destroy_texture(self.gpu_id);
        self.gpu_id = NULL_ID;
        self.state.mark_unloaded();
    }

    #[must_use]
    pub fn source(&self) -> &PixelBlock {
        &self.source
    }

    #[must_use]
    pub fn gpu_id(&self) -> GpuId {
        self.gpu_id
    }

    #[must_use]
    pub fn is_resident(&self) -> bool {
        self.state.is_resident()
    }

    #[must_use]
    pub fn users(&self) -> u16 {
        self.state.users()
    }
}

impl Identified for Texture {
    fn uuid(&self) -> Uuid {
        self.id
    }
}
