//! Resource Lifecycle Tests
//!
//! Load/unload cascades across geometry, texture, material and model:
//! - Edge-triggered side effects run exactly once per residency span
//! - Shared dependencies stay resident while any owner needs them
//! - Hot-swapping a dependency on a resident owner keeps counts consistent
//! - Compile failures degrade to null programs instead of failing

use glam::{Vec3, Vec4};

use ember::gpu::{HeadlessBackend, NULL_ID};
use ember::resources::{
    Geometry, GeometryRef, Material, MaterialRef, PixelBlock, Texture, TextureRef, Vertex,
};
use ember::scene::Model;

fn triangle() -> Geometry {
    let vertices = vec![
        Vertex::new(Vec3::new(-1.0, -1.0, 0.0), Vec3::Z, [0.0, 0.0]),
        Vertex::new(Vec3::new(1.0, -1.0, 0.0), Vec3::Z, [1.0, 0.0]),
        Vertex::new(Vec3::new(0.0, 1.0, 0.0), Vec3::Z, [0.5, 1.0]),
    ];
    Geometry::new("triangle", vertices, vec![0, 1, 2])
}

// ============================================================================
// Edge triggering
// ============================================================================

#[test]
fn geometry_load_allocates_exactly_once() {
    let mut gpu = HeadlessBackend::new();
    let mut geometry = triangle();

    geometry.load(&mut gpu);
    assert!(geometry.is_resident());
    assert_eq!(gpu.buffer_count(), 2, "vertex + index buffer");

    // Second user: counter only, no new allocations.
    geometry.load(&mut gpu);
    assert_eq!(gpu.buffer_count(), 2);
    assert_eq!(geometry.users(), 2);

    geometry.unload(&mut gpu);
    assert!(geometry.is_resident(), "one user left");
    geometry.unload(&mut gpu);
    assert!(!geometry.is_resident());
    assert_eq!(gpu.buffer_count(), 0);
}

#[test]
fn unbalanced_unloads_never_go_negative() {
    let mut gpu = HeadlessBackend::new();
    let mut geometry = triangle();

    geometry.unload(&mut gpu);
    geometry.unload(&mut gpu);
    assert_eq!(geometry.users(), 0);

    // The matching add still triggers a clean load afterwards.
    geometry.load(&mut gpu);
    assert!(geometry.is_resident());
    geometry.unload(&mut gpu);
    assert!(!geometry.is_resident());
}

#[test]
fn texture_residency_follows_the_same_gate() {
    let mut gpu = HeadlessBackend::new();
    let mut texture = Texture::new("white", PixelBlock::white());

    texture.load(&mut gpu);
    let id = texture.gpu_id();
    assert_ne!(id, NULL_ID);
    assert!(gpu.texture_alive(id));
    assert_eq!(gpu.texture_info(id), Some((1, 1, ember::gpu::PixelFormat::Rgba8Unorm)));

    texture.load(&mut gpu);
    texture.unload(&mut gpu);
    assert!(gpu.texture_alive(id), "still one user");
    texture.unload(&mut gpu);
    assert!(!gpu.texture_alive(id));
    assert_eq!(texture.gpu_id(), NULL_ID);
}

// ============================================================================
// Cascades
// ============================================================================

#[test]
fn model_load_cascades_to_geometry_and_material() {
    let mut gpu = HeadlessBackend::new();
    let geometry = GeometryRef::new(triangle());
    let material = MaterialRef::new(Material::lit("mat", Vec4::ONE));
    let mut model = Model::with_parts("model", geometry.clone(), material.clone());

    model.load(&mut gpu);
    assert!(model.is_resident());
    assert!(geometry.read().is_resident());
    assert!(material.read().is_resident());
    assert!(material.read().is_renderable());

    model.unload(&mut gpu);
    assert!(!geometry.read().is_resident());
    assert!(!material.read().is_resident());
    assert_eq!(gpu.buffer_count(), 0, "cascade must free every buffer");
}

#[test]
fn shared_geometry_survives_until_last_owner_unloads() {
    let mut gpu = HeadlessBackend::new();
    let geometry = GeometryRef::new(triangle());
    let material = MaterialRef::new(Material::unlit("mat", Vec4::ONE));

    let mut a = Model::with_parts("a", geometry.clone(), material.clone());
    let mut b = Model::with_parts("b", geometry.clone(), material.clone());

    a.load(&mut gpu);
    b.load(&mut gpu);
    assert_eq!(geometry.read().users(), 2);

    a.unload(&mut gpu);
    assert!(geometry.read().is_resident(), "b still owns it");
    assert_eq!(geometry.read().users(), 1);

    b.unload(&mut gpu);
    assert!(!geometry.read().is_resident());
}

#[test]
fn material_cascades_to_its_textures() {
    let mut gpu = HeadlessBackend::new();
    let texture = TextureRef::new(Texture::new("albedo", PixelBlock::white()));
    let mut material = Material::lit("mat", Vec4::ONE);
    material.add_texture(&mut gpu, texture.clone());

    material.load(&mut gpu);
    assert!(texture.read().is_resident());

    material.unload(&mut gpu);
    assert!(!texture.read().is_resident());
}

// ============================================================================
// Hot-swapping dependencies on a resident owner
// ============================================================================

#[test]
fn set_material_on_resident_model_swaps_residency() {
    let mut gpu = HeadlessBackend::new();
    let geometry = GeometryRef::new(triangle());
    let old = MaterialRef::new(Material::lit("old", Vec4::ONE));
    let new = MaterialRef::new(Material::unlit("new", Vec4::ONE));

    let mut model = Model::with_parts("model", geometry, old.clone());
    model.load(&mut gpu);
    assert!(old.read().is_resident());
    assert!(!new.read().is_resident());
    let old_program = old.read().program();
    assert!(gpu.program_alive(old_program));

    model.set_material(&mut gpu, Some(new.clone()));
    assert!(!old.read().is_resident(), "old dependency released");
    assert!(new.read().is_resident(), "new dependency acquired");
    assert!(!gpu.program_alive(old_program), "old program destroyed");

    model.unload(&mut gpu);
    assert!(!new.read().is_resident());
}

#[test]
fn swapping_shared_dependency_respects_other_owners() {
    let mut gpu = HeadlessBackend::new();
    let shared = GeometryRef::new(triangle());
    let replacement = GeometryRef::new(triangle());
    let material = MaterialRef::new(Material::unlit("mat", Vec4::ONE));

    let mut keeper = Model::with_parts("keeper", shared.clone(), material.clone());
    let mut swapper = Model::with_parts("swapper", shared.clone(), material.clone());
    keeper.load(&mut gpu);
    swapper.load(&mut gpu);

    swapper.set_geometry(&mut gpu, Some(replacement.clone()));
    assert!(
        shared.read().is_resident(),
        "keeper still holds the shared geometry"
    );
    assert_eq!(shared.read().users(), 1);
    assert!(replacement.read().is_resident());

    keeper.unload(&mut gpu);
    swapper.unload(&mut gpu);
    assert!(!shared.read().is_resident());
    assert!(!replacement.read().is_resident());
}

#[test]
fn set_texture_slot_swaps_residency_while_loaded() {
    let mut gpu = HeadlessBackend::new();
    let old = TextureRef::new(Texture::new("old", PixelBlock::white()));
    let new = TextureRef::new(Texture::new("new", PixelBlock::white()));

    let mut material = Material::lit("mat", Vec4::ONE);
    material.add_texture(&mut gpu, old.clone());
    material.load(&mut gpu);

    material.set_texture(&mut gpu, 0, new.clone());
    assert!(!old.read().is_resident());
    assert!(new.read().is_resident());

    material.unload(&mut gpu);
    assert!(!new.read().is_resident());
}

// ============================================================================
// Failure semantics
// ============================================================================

#[test]
fn failed_shader_compile_yields_null_program() {
    let mut gpu = HeadlessBackend::new();
    let mut material = Material::new("broken", "");

    material.load(&mut gpu);
    assert!(material.is_resident(), "residency is independent of compile success");
    assert!(!material.is_renderable());
    assert_eq!(material.program(), NULL_ID);

    // Unload does not trip over the null program.
    material.unload(&mut gpu);
    assert!(!material.is_resident());
}

#[test]
fn geometry_vertex_edit_mirrors_while_resident() {
    let mut gpu = HeadlessBackend::new();
    let mut geometry = triangle();
    geometry.load(&mut gpu);

    let moved = Vertex::new(Vec3::new(0.0, 2.0, 0.0), Vec3::Z, [0.5, 1.0]);
    geometry.set_vertex(&mut gpu, 2, moved);

    let gpu_bytes = gpu.buffer_bytes(geometry.vertex_buffer_id()).unwrap();
    let cpu: &[u8] = bytemuck::cast_slice(geometry.vertices());
    assert_eq!(&gpu_bytes[..cpu.len()], cpu);

    let bounds = geometry.bounding_box();
    assert_eq!(bounds.max.y, 2.0);
}
