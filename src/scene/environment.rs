//! Environment
//!
//! The ambient term plus an optional skybox texture. The environment itself
//! owns no GPU objects; it cascades residency to the skybox.

use glam::Vec3;

use crate::gpu::GpuBackend;
use crate::resources::TextureRef;
use crate::resources::loadable::LoadState;

#[derive(Debug)]
pub struct Environment {
    /// Ambient light color.
    pub ambient_color: Vec3,
    /// Scales the ambient contribution.
    pub intensity: f32,

    skybox: Option<TextureRef>,
    state: LoadState,
}

impl Environment {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ambient_color: Vec3::splat(0.03),
            intensity: 1.0,
            skybox: None,
            state: LoadState::new(),
        }
    }

    pub fn load(&mut self, gpu: &mut dyn GpuBackend) {
        self.state.add_user();
        if !self.state.needs_load() {
            return;
        }
        if let Some(skybox) = &self.skybox {
            skybox.write().load(gpu);
        }
        self.state.mark_loaded();
    }

    pub fn unload(&mut self, gpu: &mut dyn GpuBackend) {
        self.state.remove_user();
        if !self.state.needs_unload() {
            return;
        }
        if let Some(skybox) = &self.skybox {
            skybox.write().unload(gpu);
        }
        self.state.mark_unloaded();
    }

    /// Re-points the skybox, hot-swapping residency if currently loaded.
    pub fn set_skybox(&mut self, gpu: &mut dyn GpuBackend, skybox: Option<TextureRef>) {
        if self.state.is_resident() {
            if let Some(new) = &skybox {
                new.write().load(gpu);
            }
            if let Some(old) = &self.skybox {
                old.write().unload(gpu);
            }
        }
        self.skybox = skybox;
    }

    #[must_use]
    pub fn skybox(&self) -> Option<&TextureRef> {
        self.skybox.as_ref()
    }

    #[must_use]
    pub fn is_resident(&self) -> bool {
        self.state.is_resident()
    }

    /// Ambient color scaled by intensity, as the shaders consume it.
    #[must_use]
    pub fn ambient_term(&self) -> Vec3 {
        self.ambient_color * self.intensity
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
