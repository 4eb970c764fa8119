//! Headless Backend
//!
//! An in-memory [`GpuBackend`] that stores buffer contents byte for byte.
//! Buffer read-back makes the mirror/GPU consistency contract directly
//! testable without a device, and the draw log lets tests observe which
//! draws actually reached the "GPU".

use rustc_hash::FxHashMap;

use super::{BufferKind, DrawCall, GpuBackend, GpuId, NULL_ID, PixelFormat};

#[derive(Debug)]
struct HeadlessBuffer {
    kind: BufferKind,
    bytes: Vec<u8>,
    label: String,
}

#[derive(Debug)]
struct HeadlessTexture {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Vec<u8>,
}

/// A recorded draw: `(program, index_count)`.
pub type DrawRecord = (GpuId, u32);

/// In-memory simulation of the GPU binding layer.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_id: GpuId,
    buffers: FxHashMap<GpuId, HeadlessBuffer>,
    textures: FxHashMap<GpuId, HeadlessTexture>,
    programs: FxHashMap<GpuId, String>,
    draws: Vec<DrawRecord>,
    frames: u64,
}

impl HeadlessBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> GpuId {
        self.next_id += 1;
        self.next_id
    }

    // ========================================================================
    // Inspection (read-back for tests and tooling)
    // ========================================================================

    /// Full contents of a live buffer.
    #[must_use]
    pub fn buffer_bytes(&self, buffer: GpuId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.bytes.as_slice())
    }

    /// Allocated size of a live buffer in bytes.
    #[must_use]
    pub fn buffer_size(&self, buffer: GpuId) -> Option<u64> {
        self.buffers.get(&buffer).map(|b| b.bytes.len() as u64)
    }

    #[must_use]
    pub fn buffer_alive(&self, buffer: GpuId) -> bool {
        self.buffers.contains_key(&buffer)
    }

    #[must_use]
    pub fn texture_alive(&self, texture: GpuId) -> bool {
        self.textures.contains_key(&texture)
    }

    /// `(width, height, format)` of a live texture.
    #[must_use]
    pub fn texture_info(&self, texture: GpuId) -> Option<(u32, u32, PixelFormat)> {
        self.textures
            .get(&texture)
            .map(|t| (t.width, t.height, t.format))
    }

    /// Pixel contents of a live texture.
    #[must_use]
    pub fn texture_pixels(&self, texture: GpuId) -> Option<&[u8]> {
        self.textures.get(&texture).map(|t| t.pixels.as_slice())
    }

    #[must_use]
    pub fn program_alive(&self, program: GpuId) -> bool {
        self.programs.contains_key(&program)
    }

    /// Number of live buffer objects.
    #[must_use]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Draws recorded since construction.
    #[must_use]
    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Completed frames.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }
}

impl GpuBackend for HeadlessBackend {
    fn create_buffer(&mut self, kind: BufferKind, size: u64, label: &str) -> GpuId {
        let id = self.next_id();
        self.buffers.insert(
            id,
            HeadlessBuffer {
                kind,
                bytes: vec![0; size as usize],
                label: label.to_string(),
            },
        );
        id
    }

    fn reallocate_buffer(&mut self, buffer: GpuId, data: &[u8]) {
        if let Some(buf) = self.buffers.get_mut(&buffer) {
            buf.bytes = data.to_vec();
        } else {
            log::warn!("reallocate_buffer: unknown buffer {buffer}");
        }
    }

    fn write_buffer(&mut self, buffer: GpuId, offset: u64, data: &[u8]) {
        let Some(buf) = self.buffers.get_mut(&buffer) else {
            log::warn!("write_buffer: unknown buffer {buffer}");
            return;
        };
        let start = offset as usize;
        let end = start + data.len();
        if end > buf.bytes.len() {
            log::warn!(
                "write_buffer: range {start}..{end} past end of '{}' ({} bytes)",
                buf.label,
                buf.bytes.len()
            );
            return;
        }
        buf.bytes[start..end].copy_from_slice(data);
    }

    fn destroy_buffer(&mut self, buffer: GpuId) {
        let _ = self.buffers.remove(&buffer);
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: &[u8],
        _label: &str,
    ) -> GpuId {
        let id = self.next_id();
        self.textures.insert(
            id,
            HeadlessTexture {
                width,
                height,
                format,
                pixels: pixels.to_vec(),
            },
        );
        id
    }

    fn destroy_texture(&mut self, texture: GpuId) {
        let _ = self.textures.remove(&texture);
    }

    fn create_program(&mut self, source: &str, label: &str) -> GpuId {
        // An empty module stands in for a compile failure.
        if source.trim().is_empty() {
            log::error!("Shader compilation failed for '{label}': empty module");
            return NULL_ID;
        }
        let id = self.next_id();
        self.programs.insert(id, source.to_string());
        id
    }

    fn destroy_program(&mut self, program: GpuId) {
        let _ = self.programs.remove(&program);
    }

    fn begin_frame(&mut self, _clear_color: [f32; 4]) {}

    fn draw(&mut self, call: &DrawCall<'_>) {
        debug_assert!(
            self.buffers
                .get(&call.vertex_buffer)
                .is_none_or(|b| b.kind == BufferKind::Vertex),
            "vertex_buffer bound with non-vertex kind"
        );
        self.draws.push((call.program, call.index_count));
    }

    fn end_frame(&mut self) {
        self.frames += 1;
    }
}
