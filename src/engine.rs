//! Engine
//!
//! The [`Engine`] is an explicitly constructed context object: it owns the
//! GPU backend and is passed by reference to everything that needs one.
//! There is no process-wide singleton; construct with [`Engine::init`] (real
//! GPU) or [`Engine::new`] (any backend), tear down with
//! [`Engine::shutdown`].

use crate::errors::Result;
use crate::gpu::{DrawCall, GpuBackend, GpuContext, WgpuBackend};
use crate::scene::SceneRef;
use crate::settings::EngineSettings;

/// Engine context, generic over the GPU backend. Production code uses the
/// default [`WgpuBackend`]; tests run against
/// [`HeadlessBackend`](crate::gpu::HeadlessBackend).
pub struct Engine<B: GpuBackend = WgpuBackend> {
    gpu: B,
    settings: EngineSettings,
}

impl Engine<WgpuBackend> {
    /// Acquires a GPU device and builds the engine around it. The only
    /// failure path that halts startup.
    pub fn init(settings: EngineSettings) -> Result<Self> {
        let context = GpuContext::new_blocking(settings.power_preference)?;
        let gpu = WgpuBackend::new(context, settings.target_width, settings.target_height);
        log::info!("Engine initialized");
        Ok(Self::new(gpu, settings))
    }
}

impl<B: GpuBackend> Engine<B> {
    /// Builds the engine around an already-constructed backend.
    #[must_use]
    pub fn new(gpu: B, settings: EngineSettings) -> Self {
        Self { gpu, settings }
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.gpu
    }

    /// Direct backend access, for resource calls made outside the engine's
    /// own entry points.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.gpu
    }

    /// Registers the engine as a user of `scene`, making it resident on the
    /// first call.
    pub fn load_scene(&mut self, scene: &SceneRef) {
        scene.write().load(&mut self.gpu);
    }

    /// Releases the engine's use of `scene`; the last release frees all of
    /// its GPU objects.
    pub fn unload_scene(&mut self, scene: &SceneRef) {
        scene.write().unload(&mut self.gpu);
    }

    /// Renders one frame of `scene` into the offscreen target.
    ///
    /// A scene that is not resident renders as nothing. Models missing
    /// geometry or material, and models whose shader failed to compile,
    /// are skipped rather than failing the frame.
    pub fn render(&mut self, scene: &SceneRef) {
        let mut scene = scene.write();
        if !scene.is_resident() {
            log::debug!("Scene '{}' not resident, skipping frame", scene.name);
            return;
        }
        scene.refresh_uniforms(&mut self.gpu);

        self.gpu.begin_frame(self.settings.clear_color);

        let scene_ubo = scene.uniform_buffer_id();
        let light_buffers = [
            scene.point_light_buffer_id(),
            scene.directional_light_buffer_id(),
        ];

        for (_, model_ref) in scene.models() {
            let model = model_ref.read();
            let (Some(geometry_ref), Some(material_ref)) = (model.geometry(), model.material())
            else {
                continue;
            };
            let geometry = geometry_ref.read();
            let material = material_ref.read();
            if !material.is_renderable() {
                log::trace!("Model '{}': null program, draw skipped", model.name);
                continue;
            }
            let uniforms = [scene_ubo, model.uniform_buffer_id(), material.uniform_buffer_id()];
            let textures: Vec<_> = material
                .textures()
                .iter()
                .map(|t| t.read().gpu_id())
                .collect();
            self.gpu.draw(&DrawCall {
                program: material.program(),
                vertex_buffer: geometry.vertex_buffer_id(),
                index_buffer: geometry.index_buffer_id(),
                index_count: geometry.index_count(),
                uniform_buffers: &uniforms,
                storage_buffers: &light_buffers,
                textures: &textures,
            });
        }

        self.gpu.end_frame();
    }

    /// Consumes the engine. Scenes still resident keep their reference
    /// counts; dropping the backend releases the underlying device objects.
    pub fn shutdown(self) {
        log::info!("Engine shut down");
    }
}
