//! GPU Binding Layer
//!
//! The engine core never talks to a graphics API directly. It goes through
//! [`GpuBackend`], addressing every GPU object by an opaque [`GpuId`] it must
//! store and eventually release. [`WgpuBackend`] is the real implementation;
//! [`HeadlessBackend`] keeps byte-accurate buffer contents in memory and is
//! what the test suite reads back against.

mod context;
mod headless;
mod wgpu_backend;

pub use context::GpuContext;
pub use headless::HeadlessBackend;
pub use wgpu_backend::WgpuBackend;

/// Opaque GPU object identifier. Zero means "no object".
pub type GpuId = u64;

/// The reserved null id.
pub const NULL_ID: GpuId = 0;

/// What a buffer object is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
    Storage,
}

/// Pixel layout of texture uploads. Image decoding happens outside the
/// engine; by the time pixels arrive here they are tightly packed RGBA8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
}

/// One draw, fully resolved to GPU ids.
///
/// The engine guarantees `program` is non-null before submitting; backends
/// may still drop a call whose buffers have been destroyed.
#[derive(Debug, Clone)]
pub struct DrawCall<'a> {
    pub program: GpuId,
    pub vertex_buffer: GpuId,
    pub index_buffer: GpuId,
    pub index_count: u32,
    /// Uniform buffers bound in order: group 0, bindings 0..n.
    pub uniform_buffers: &'a [GpuId],
    /// Storage buffers bound in order: group 1, bindings 0..n.
    pub storage_buffers: &'a [GpuId],
    /// Textures bound in order: group 2, (texture, sampler) pairs.
    pub textures: &'a [GpuId],
}

/// Graphics-API boundary.
///
/// Buffer creation zero-fills the allocation, so capacity-sized buffers hold
/// well-defined bytes past the mirrored collection's length. Reallocation
/// keeps the logical id stable while replacing the backing storage, the same
/// way the buffer registries in wgpu-based engines swap the physical object
/// on resize without invalidating callers.
pub trait GpuBackend {
    /// Allocates a zero-filled buffer object of `size` bytes.
    fn create_buffer(&mut self, kind: BufferKind, size: u64, label: &str) -> GpuId;

    /// Replaces the buffer's storage with exactly `data` (a full reload,
    /// resizing the allocation). The id stays valid.
    fn reallocate_buffer(&mut self, buffer: GpuId, data: &[u8]);

    /// Writes `data` into the buffer at `offset`, leaving the rest untouched.
    fn write_buffer(&mut self, buffer: GpuId, offset: u64, data: &[u8]);

    /// Destroys the buffer object. Unknown ids are ignored.
    fn destroy_buffer(&mut self, buffer: GpuId);

    /// Creates and fills a 2D texture from tightly packed pixels.
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: &[u8],
        label: &str,
    ) -> GpuId;

    /// Destroys the texture object. Unknown ids are ignored.
    fn destroy_texture(&mut self, texture: GpuId);

    /// Compiles a WGSL module with `vs_main`/`fs_main` entry points.
    ///
    /// On failure the diagnostic goes to the log sink and [`NULL_ID`] comes
    /// back; the caller keeps running with an unusable program.
    fn create_program(&mut self, source: &str, label: &str) -> GpuId;

    /// Destroys the program. Unknown ids are ignored.
    fn destroy_program(&mut self, program: GpuId);

    /// Opens a frame on the offscreen target.
    fn begin_frame(&mut self, clear_color: [f32; 4]);

    /// Records one draw into the current frame.
    fn draw(&mut self, call: &DrawCall<'_>);

    /// Flushes the recorded frame.
    fn end_frame(&mut self);
}
