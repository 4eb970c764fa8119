//! Models
//!
//! A model pairs shared geometry with a shared material under a transform.
//! It owns nothing but its uniform block; the dependencies are independently
//! reference-counted so any number of models can share them, and residency
//! cascades through [`load`](Model::load)/[`unload`](Model::unload).

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};
use uuid::Uuid;

use crate::gpu::{BufferKind, GpuBackend, GpuId};
use crate::resources::buffer::MirroredBuffer;
use crate::resources::loadable::LoadState;
use crate::resources::{GeometryRef, Identified, MaterialRef};

/// TRS transform.
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// GPU-side per-model block.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ModelUniforms {
    pub model: Mat4,
}

/// One drawable instance: transform + geometry + material.
#[derive(Debug)]
pub struct Model {
    id: Uuid,
    pub name: String,

    transform: Transform,
    geometry: Option<GeometryRef>,
    material: Option<MaterialRef>,

    uniforms: MirroredBuffer,
    state: LoadState,
}

impl Model {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            uniforms: MirroredBuffer::new(BufferKind::Uniform, format!("{name}.uniforms")),
            name,
            transform: Transform::IDENTITY,
            geometry: None,
            material: None,
            state: LoadState::new(),
        }
    }

    #[must_use]
    pub fn with_parts(
        name: impl Into<String>,
        geometry: GeometryRef,
        material: MaterialRef,
    ) -> Self {
        let mut model = Self::new(name);
        model.geometry = Some(geometry);
        model.material = Some(material);
        model
    }

    fn uniform_data(&self) -> ModelUniforms {
        ModelUniforms {
            model: self.transform.matrix(),
        }
    }

    // ========================================================================
    // Residency
    // ========================================================================

    /// Registers a user; the first one uploads the uniform block and
    /// cascades to the geometry and material.
    pub fn load(&mut self, gpu: &mut dyn GpuBackend) {
        self.state.add_user();
        if !self.state.needs_load() {
            return;
        }
        if let Some(geometry) = &self.geometry {
            geometry.write().load(gpu);
        }
        if let Some(material) = &self.material {
            material.write().load(gpu);
        }
        let data = self.uniform_data();
        let bytes = bytemuck::bytes_of(&data);
        self.uniforms.load(gpu, bytes, bytes.len() as u64);
        self.state.mark_loaded();
        log::debug!("Model '{}': resident", self.name);
    }

    /// Releases a user; the last one frees the uniform block and cascades
    /// the unload.
    pub fn unload(&mut self, gpu: &mut dyn GpuBackend) {
        self.state.remove_user();
        if !self.state.needs_unload() {
            return;
        }
        if let Some(geometry) = &self.geometry {
            geometry.write().unload(gpu);
        }
        if let Some(material) = &self.material {
            material.write().unload(gpu);
        }
        self.uniforms.unload(gpu);
        self.state.mark_unloaded();
    }

    // ========================================================================
    // Dependencies
    // ========================================================================

    /// Re-points the geometry. While resident, the replacement is loaded and
    /// the old geometry unloaded immediately, keeping both reference counts
    /// consistent with their other owners.
    pub fn set_geometry(&mut self, gpu: &mut dyn GpuBackend, geometry: Option<GeometryRef>) {
        if self.state.is_resident() {
            if let Some(new) = &geometry {
                new.write().load(gpu);
            }
            if let Some(old) = &self.geometry {
                old.write().unload(gpu);
            }
        }
        self.geometry = geometry;
    }

    /// Re-points the material; same residency rules as
    /// [`set_geometry`](Self::set_geometry).
    pub fn set_material(&mut self, gpu: &mut dyn GpuBackend, material: Option<MaterialRef>) {
        if self.state.is_resident() {
            if let Some(new) = &material {
                new.write().load(gpu);
            }
            if let Some(old) = &self.material {
                old.write().unload(gpu);
            }
        }
        self.material = material;
    }

    #[must_use]
    pub fn geometry(&self) -> Option<&GeometryRef> {
        self.geometry.as_ref()
    }

    #[must_use]
    pub fn material(&self) -> Option<&MaterialRef> {
        self.material.as_ref()
    }

    // ========================================================================
    // Transform
    // ========================================================================

    /// Replaces the transform; the uniform block is re-synchronized while
    /// resident.
    pub fn set_transform(&mut self, gpu: &mut dyn GpuBackend, transform: Transform) {
        self.transform = transform;
        let data = self.uniform_data();
        let bytes = bytemuck::bytes_of(&data);
        self.uniforms.sync_range(gpu, bytes, 0, bytes.len());
    }

    #[must_use]
    pub fn transform(&self) -> Transform {
        self.transform
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[must_use]
    pub fn is_resident(&self) -> bool {
        self.state.is_resident()
    }

    #[must_use]
    pub fn users(&self) -> u16 {
        self.state.users()
    }

    #[must_use]
    pub fn uniform_buffer_id(&self) -> GpuId {
        self.uniforms.id()
    }
}

impl Identified for Model {
    fn uuid(&self) -> Uuid {
        self.id
    }
}
