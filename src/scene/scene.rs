//! Scene
//!
//! The top of the residency cascade: a handle-indexed model collection, the
//! two GPU-mirrored light collections, the scene uniform block, the camera
//! and the environment. Loading a scene makes everything reachable from it
//! resident; mutations through handles write straight through to the GPU
//! while it is.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use uuid::Uuid;

use crate::errors::Result;
use crate::gpu::{BufferKind, GpuBackend, GpuId};
use crate::resources::buffer::MirroredBuffer;
use crate::resources::loadable::LoadState;
use crate::resources::{Handle, HandleVec, Identified, MirrorVec, TextureRef};
use crate::settings::MissPolicy;

use super::camera::Camera;
use super::environment::Environment;
use super::light::{DirectionalLight, PointLight};
use super::ModelRef;

/// GPU-side per-scene block, refreshed every frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SceneUniforms {
    pub view_proj: Mat4,
    pub eye: Vec4,
    pub ambient: Vec4,
    /// x = live point lights, y = live directional lights. The storage
    /// buffers are capacity-sized, so shaders must not rely on
    /// `arrayLength`.
    pub light_counts: [u32; 4],
}

/// A renderable world: models, lights, camera, environment.
#[derive(Debug)]
pub struct Scene {
    id: Uuid,
    pub name: String,
    pub camera: Camera,

    environment: Environment,
    models: HandleVec<ModelRef>,
    point_lights: MirrorVec<PointLight>,
    directional_lights: MirrorVec<DirectionalLight>,

    uniforms: MirroredBuffer,
    state: LoadState,
}

impl Scene {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_policy(name, MissPolicy::Ignore)
    }

    #[must_use]
    pub fn with_policy(name: impl Into<String>, policy: MissPolicy) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            uniforms: MirroredBuffer::new(BufferKind::Uniform, format!("{name}.uniforms")),
            name,
            camera: Camera::default(),
            environment: Environment::new(),
            models: HandleVec::with_policy("scene.models", policy),
            point_lights: MirrorVec::with_policy(
                BufferKind::Storage,
                "scene.point_lights",
                policy,
            ),
            directional_lights: MirrorVec::with_policy(
                BufferKind::Storage,
                "scene.directional_lights",
                policy,
            ),
            state: LoadState::new(),
        }
    }

    fn uniform_data(&self) -> SceneUniforms {
        SceneUniforms {
            view_proj: self.camera.view_projection(),
            eye: self.camera.eye.extend(1.0),
            ambient: self.environment.ambient_term().extend(1.0),
            light_counts: [
                self.point_lights.len() as u32,
                self.directional_lights.len() as u32,
                0,
                0,
            ],
        }
    }

    // ========================================================================
    // Residency
    // ========================================================================

    /// Registers a user; the first one loads every model, both light
    /// collections, the scene uniform block, and the environment.
    pub fn load(&mut self, gpu: &mut dyn GpuBackend) {
        self.state.add_user();
        if !self.state.needs_load() {
            return;
        }
        for (_, model) in self.models.iter() {
            model.write().load(gpu);
        }
        self.point_lights.load(gpu);
        self.directional_lights.load(gpu);
        let data = self.uniform_data();
        let bytes = bytemuck::bytes_of(&data);
        self.uniforms.load(gpu, bytes, bytes.len() as u64);
        self.environment.load(gpu);
        self.state.mark_loaded();
        log::info!(
            "Scene '{}': resident ({} models, {} lights)",
            self.name,
            self.models.len(),
            self.point_lights.len() + self.directional_lights.len()
        );
    }

    /// Releases a user; the last one reverses the whole cascade.
    pub fn unload(&mut self, gpu: &mut dyn GpuBackend) {
        self.state.remove_user();
        if !self.state.needs_unload() {
            return;
        }
        for (_, model) in self.models.iter() {
            model.write().unload(gpu);
        }
        self.point_lights.unload(gpu);
        self.directional_lights.unload(gpu);
        self.uniforms.unload(gpu);
        self.environment.unload(gpu);
        self.state.mark_unloaded();
        log::info!("Scene '{}': unloaded", self.name);
    }

    #[must_use]
    pub fn is_resident(&self) -> bool {
        self.state.is_resident()
    }

    /// Recomputes the scene uniform block (camera, ambient, light counts)
    /// and mirrors it while resident. Called once per rendered frame.
    pub fn refresh_uniforms(&mut self, gpu: &mut dyn GpuBackend) {
        let data = self.uniform_data();
        let bytes = bytemuck::bytes_of(&data);
        self.uniforms.sync_range(gpu, bytes, 0, bytes.len());
    }

    // ========================================================================
    // Models
    // ========================================================================

    /// Adds a model instance. On a resident scene the model is loaded
    /// immediately. Returns [`Handle::NONE`] on allocator exhaustion.
    pub fn add_model(&mut self, gpu: &mut dyn GpuBackend, model: ModelRef) -> Handle {
        let handle = self.models.push(model.clone());
        if handle.is_none() {
            return Handle::NONE;
        }
        if self.state.is_resident() {
            model.write().load(gpu);
        }
        handle
    }

    /// Removes a model instance, unloading it if the scene is resident.
    pub fn remove_model(&mut self, gpu: &mut dyn GpuBackend, handle: Handle) -> Result<()> {
        let Some(removed) = self.models.swap_remove(handle)? else {
            return Ok(());
        };
        if self.state.is_resident() {
            removed.value.write().unload(gpu);
        }
        Ok(())
    }

    #[must_use]
    pub fn model(&self, handle: Handle) -> Option<ModelRef> {
        self.models.get(handle).cloned()
    }

    #[must_use]
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn models(&self) -> impl Iterator<Item = (Handle, &ModelRef)> {
        self.models.iter()
    }

    // ========================================================================
    // Lights
    // ========================================================================

    pub fn add_point_light(&mut self, gpu: &mut dyn GpuBackend, light: PointLight) -> Handle {
        self.point_lights.push_value(gpu, light)
    }

    pub fn set_point_light(
        &mut self,
        gpu: &mut dyn GpuBackend,
        handle: Handle,
        light: PointLight,
    ) -> Result<()> {
        self.point_lights.set(gpu, handle, light)
    }

    pub fn remove_point_light(&mut self, gpu: &mut dyn GpuBackend, handle: Handle) -> Result<()> {
        self.point_lights.remove(gpu, handle)
    }

    #[must_use]
    pub fn point_light(&self, handle: Handle) -> Option<&PointLight> {
        self.point_lights.get(handle)
    }

    pub fn add_directional_light(
        &mut self,
        gpu: &mut dyn GpuBackend,
        light: DirectionalLight,
    ) -> Handle {
        self.directional_lights.push_value(gpu, light)
    }

    pub fn set_directional_light(
        &mut self,
        gpu: &mut dyn GpuBackend,
        handle: Handle,
        light: DirectionalLight,
    ) -> Result<()> {
        self.directional_lights.set(gpu, handle, light)
    }

    pub fn remove_directional_light(
        &mut self,
        gpu: &mut dyn GpuBackend,
        handle: Handle,
    ) -> Result<()> {
        self.directional_lights.remove(gpu, handle)
    }

    #[must_use]
    pub fn directional_light(&self, handle: Handle) -> Option<&DirectionalLight> {
        self.directional_lights.get(handle)
    }

    #[must_use]
    pub fn point_lights(&self) -> &MirrorVec<PointLight> {
        &self.point_lights
    }

    #[must_use]
    pub fn directional_lights(&self) -> &MirrorVec<DirectionalLight> {
        &self.directional_lights
    }

    // ========================================================================
    // Environment
    // ========================================================================

    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Ambient parameters are plain CPU data; GPU-affecting environment
    /// changes go through [`set_skybox`](Self::set_skybox).
    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }

    pub fn set_skybox(&mut self, gpu: &mut dyn GpuBackend, skybox: Option<TextureRef>) {
        self.environment.set_skybox(gpu, skybox);
    }

    // ========================================================================
    // Binding ids for the render loop
    // ========================================================================

    #[must_use]
    pub fn uniform_buffer_id(&self) -> GpuId {
        self.uniforms.id()
    }

    #[must_use]
    pub fn point_light_buffer_id(&self) -> GpuId {
        self.point_lights.buffer_id()
    }

    #[must_use]
    pub fn directional_light_buffer_id(&self) -> GpuId {
        self.directional_lights.buffer_id()
    }
}

impl Identified for Scene {
    fn uuid(&self) -> Uuid {
        self.id
    }
}
