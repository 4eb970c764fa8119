//! Materials
//!
//! A material owns its WGSL source, a small uniform block (base color +
//! flags) mirrored to the GPU, and references to the textures it samples.
//! Loading compiles the program; a failed compile is reported to the log
//! sink and leaves a null program behind; draws against it are skipped,
//! never fatal.

use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use uuid::Uuid;

use crate::gpu::{BufferKind, GpuBackend, GpuId, NULL_ID};

use super::buffer::MirroredBuffer;
use super::loadable::LoadState;
use super::{Identified, TextureRef};

/// Built-in forward shader: ambient + point + directional Lambert terms.
pub const LIT_SHADER: &str = r"
struct SceneUniforms {
    view_proj: mat4x4<f32>,
    eye: vec4<f32>,
    ambient: vec4<f32>,
    light_counts: vec4<u32>,
}

struct ModelUniforms {
    model: mat4x4<f32>,
}

struct MaterialUniforms {
    base_color: vec4<f32>,
    params: vec4<f32>,
}

struct PointLight {
    position_range: vec4<f32>,
    color_intensity: vec4<f32>,
}

struct DirectionalLight {
    direction: vec4<f32>,
    color_intensity: vec4<f32>,
}

@group(0) @binding(0) var<uniform> scene: SceneUniforms;
@group(0) @binding(1) var<uniform> object: ModelUniforms;
@group(0) @binding(2) var<uniform> material: MaterialUniforms;

@group(1) @binding(0) var<storage, read> point_lights: array<PointLight>;
@group(1) @binding(1) var<storage, read> directional_lights: array<DirectionalLight>;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
) -> VertexOutput {
    var out: VertexOutput;
    let world = object.model * vec4<f32>(position, 1.0);
    out.clip_position = scene.view_proj * world;
    out.world_position = world.xyz;
    out.world_normal = normalize((object.model * vec4<f32>(normal, 0.0)).xyz);
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(in.world_normal);
    var radiance = scene.ambient.rgb;

    for (var i = 0u; i < scene.light_counts.x; i = i + 1u) {
        let light = point_lights[i];
        let to_light = light.position_range.xyz - in.world_position;
        let dist = length(to_light);
        if (dist < light.position_range.w) {
            let falloff = 1.0 / (1.0 + dist * dist);
            let lambert = max(dot(n, to_light / dist), 0.0);
            radiance += light.color_intensity.rgb * light.color_intensity.a * lambert * falloff;
        }
    }

    for (var i = 0u; i < scene.light_counts.y; i = i + 1u) {
        let light = directional_lights[i];
        let lambert = max(dot(n, -normalize(light.direction.xyz)), 0.0);
        radiance += light.color_intensity.rgb * light.color_intensity.a * lambert;
    }

    return vec4<f32>(material.base_color.rgb * radiance, material.base_color.a);
}
";

/// Built-in flat shader: base color only, lights ignored.
pub const UNLIT_SHADER: &str = r"
struct SceneUniforms {
    view_proj: mat4x4<f32>,
    eye: vec4<f32>,
    ambient: vec4<f32>,
    light_counts: vec4<u32>,
}

struct ModelUniforms {
    model: mat4x4<f32>,
}

struct MaterialUniforms {
    base_color: vec4<f32>,
    params: vec4<f32>,
}

@group(0) @binding(0) var<uniform> scene: SceneUniforms;
@group(0) @binding(1) var<uniform> object: ModelUniforms;
@group(0) @binding(2) var<uniform> material: MaterialUniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
}

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = scene.view_proj * object.model * vec4<f32>(position, 1.0);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return material.base_color;
}
";

/// GPU-side material block. `params.x` is the unlit flag.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialUniforms {
    pub base_color: [f32; 4],
    pub params: [f32; 4],
}

/// Shader + parameters + sampled textures.
#[derive(Debug)]
pub struct Material {
    id: Uuid,
    pub name: String,

    shader_source: String,
    base_color: Vec4,
    unlit: bool,

    textures: Vec<TextureRef>,

    uniforms: MirroredBuffer,
    program: GpuId,
    state: LoadState,
}

impl Material {
    #[must_use]
    pub fn new(name: impl Into<String>, shader_source: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            uniforms: MirroredBuffer::new(BufferKind::Uniform, format!("{name}.uniforms")),
            name,
            shader_source: shader_source.into(),
            base_color: Vec4::ONE,
            unlit: false,
            textures: Vec::new(),
            program: NULL_ID,
            state: LoadState::new(),
        }
    }

    /// Lambert-shaded material with the built-in forward shader.
    #[must_use]
    pub fn lit(name: impl Into<String>, base_color: Vec4) -> Self {
        let mut material = Self::new(name, LIT_SHADER);
        material.base_color = base_color;
        material
    }

    /// Flat-colored material with the built-in unlit shader.
    #[must_use]
    pub fn unlit(name: impl Into<String>, base_color: Vec4) -> Self {
        let mut material = Self::new(name, UNLIT_SHADER);
        material.base_color = base_color;
        material.unlit = true;
        material
    }

    fn uniform_data(&self) -> MaterialUniforms {
        MaterialUniforms {
            base_color: self.base_color.to_array(),
            params: [if self.unlit { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
        }
    }

    // ========================================================================
    // Residency
    // ========================================================================

    /// Registers a user; the first one compiles the program, uploads the
    /// uniform block, and loads every referenced texture.
    pub fn load(&mut self, gpu: &mut dyn GpuBackend) {
        self.state.add_user();
        if !self.state.needs_load() {
            return;
        }
        self.program = gpu.create_program(&self.shader_source, &self.name);
        if self.program == NULL_ID {
            log::warn!("Material '{}': program unavailable, draws will be skipped", self.name);
        }
        let data = self.uniform_data();
        let bytes = bytemuck::bytes_of(&data);
        self.uniforms.load(gpu, bytes, bytes.len() as u64);
        for texture in &self.textures {
            texture.write().load(gpu);
        }
        self.state.mark_loaded();
    }

    /// Releases a user; the last one destroys the program, the uniform
    /// block, and unloads every referenced texture.
    pub fn unload(&mut self, gpu: &mut dyn GpuBackend) {
        self.state.remove_user();
        if !self.state.needs_unload() {
            return;
        }
        if self.program != NULL_ID {
            gpu.destroy_program(self.program);
            self.program = NULL_ID;
        }
        self.uniforms.unload(gpu);
        for texture in &self.textures {
            texture.write().unload(gpu);
        }
        self.state.mark_unloaded();
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    /// Sets the base color; mirrored to the GPU while resident.
    pub fn set_base_color(&mut self, gpu: &mut dyn GpuBackend, color: Vec4) {
        self.base_color = color;
        let data = self.uniform_data();
        let bytes = bytemuck::bytes_of(&data);
        self.uniforms.sync_range(gpu, bytes, 0, bytes.len());
    }

    #[must_use]
    pub fn base_color(&self) -> Vec4 {
        self.base_color
    }

    /// Appends a texture reference, loading it immediately if this material
    /// is resident.
    pub fn add_texture(&mut self, gpu: &mut dyn GpuBackend, texture: TextureRef) {
        if self.state.is_resident() {
            texture.write().load(gpu);
        }
        self.textures.push(texture);
    }

    /// Re-points the texture in `slot`, keeping reference counts consistent:
    /// while resident, the new texture is loaded and the old one unloaded.
    pub fn set_texture(&mut self, gpu: &mut dyn GpuBackend, slot: usize, texture: TextureRef) {
        let Some(old) = self.textures.get(slot).cloned() else {
            return;
        };
        if self.state.is_resident() {
            texture.write().load(gpu);
            old.write().unload(gpu);
        }
        self.textures[slot] = texture;
    }

    #[must_use]
    pub fn textures(&self) -> &[TextureRef] {
        &self.textures
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// False when the shader failed to compile; such materials render as
    /// absent.
    #[must_use]
    pub fn is_renderable(&self) -> bool {
        self.program != NULL_ID
    }

    #[must_use]
    pub fn program(&self) -> GpuId {
        self.program
    }

    #[must_use]
    pub fn uniform_buffer_id(&self) -> GpuId {
        self.uniforms.id()
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

impl Identified for Material {
    fn uuid(&self) -> Uuid {
        self.id
    }
}
