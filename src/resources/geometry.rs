//! Geometry
//!
//! CPU-side vertex/index data plus the two mirrored GPU buffers backing it.
//! Parsing (OBJ and friends) happens outside the engine; geometry arrives
//! here already expanded into [`Vertex`] and index arrays.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use uuid::Uuid;

use crate::gpu::{BufferKind, GpuBackend, GpuId};

use super::Identified;
use super::buffer::MirroredBuffer;
use super::loadable::LoadState;

/// Interleaved vertex: position, normal, uv. 32 bytes, matching the vertex
/// layout every pipeline uses.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    #[must_use]
    pub fn new(position: Vec3, normal: Vec3, uv: [f32; 2]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv,
        }
    }
}

/// Axis-aligned bounding box over a vertex set.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// A renderable vertex/index collection with lazily-resident GPU buffers.
#[derive(Debug)]
pub struct Geometry {
    id: Uuid,
    pub name: String,

    vertices: Vec<Vertex>,
    indices: Vec<u32>,

    vertex_buffer: MirroredBuffer,
    index_buffer: MirroredBuffer,
    state: LoadState,
}

impl Geometry {
    #[must_use]
    pub fn new(name: impl Into<String>, vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            vertex_buffer: MirroredBuffer::new(BufferKind::Vertex, format!("{name}.vertices")),
            index_buffer: MirroredBuffer::new(BufferKind::Index, format!("{name}.indices")),
            state: LoadState::new(),
            name,
            vertices,
            indices,
        }
    }

    /// Registers a user; the first one uploads both buffers.
    pub fn load(&mut self, gpu: &mut dyn GpuBackend) {
        self.state.add_user();
        if !self.state.needs_load() {
            return;
        }
        let vertex_capacity = (self.vertices.capacity() * std::mem::size_of::<Vertex>()) as u64;
        self.vertex_buffer
            .load(gpu, bytemuck::cast_slice(&self.vertices), vertex_capacity);
        let index_capacity = (self.indices.capacity() * std::mem::size_of::<u32>()) as u64;
        self.index_buffer
            .load(gpu, bytemuck::cast_slice(&self.indices), index_capacity);
        self.state.mark_loaded();
        log::debug!(
            "Geometry '{}': resident ({} vertices, {} indices)",
            self.name,
            self.vertices.len(),
            self.indices.len()
        );
    }

    /// Releases a user; the last one frees both buffers.
    pub fn unload(&mut self, gpu: &mut dyn GpuBackend) {
        self.state.remove_user();
        if !self.state.needs_unload() {
            return;
        }
        self.vertex_buffer.unload(gpu);
        self.index_buffer.unload(gpu);
        self.state.mark_unloaded();
    }

    /// Overwrites one vertex; mirrored to the GPU while resident.
    pub fn set_vertex(&mut self, gpu: &mut dyn GpuBackend, index: usize, vertex: Vertex) {
        let Some(slot) = self.vertices.get_mut(index) else {
            return;
        };
        *slot = vertex;
        let stride = std::mem::size_of::<Vertex>();
        self.vertex_buffer.sync_range(
            gpu,
            bytemuck::cast_slice(&self.vertices),
            index * stride,
            stride,
        );
    }

    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    #[must_use]
    pub fn is_resident(&self) -> bool {
        self.state.is_resident()
    }

    #[must_use]
    pub fn users(&self) -> u16 {
        self.state.users()
    }

    #[must_use]
    pub fn vertex_buffer_id(&self) -> GpuId {
        self.vertex_buffer.id()
    }

    #[must_use]
    pub fn index_buffer_id(&self) -> GpuId {
        self.index_buffer.id()
    }

    /// Bounds over the current vertex positions.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bounds = BoundingBox {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        };
        if self.vertices.is_empty() {
            return BoundingBox::default();
        }
        for vertex in &self.vertices {
            let p = Vec3::from_array(vertex.position);
            bounds.min = bounds.min.min(p);
            bounds.max = bounds.max.max(p);
        }
        bounds
    }
}

impl Identified for Geometry {
    fn uuid(&self) -> Uuid {
        self.id
    }
}
