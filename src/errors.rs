//! Error Types
//!
//! The main error type [`EmberError`] covers the failure modes the engine can
//! surface. Most runtime faults are deliberately NOT errors: a handle counter
//! that runs out returns [`Handle::NONE`](crate::resources::Handle::NONE), a
//! failed shader compile leaves a null program behind and the affected draws
//! are skipped, and an unknown handle is a silent no-op under the default
//! [`MissPolicy`](crate::settings::MissPolicy). `Result` shows up only for
//! setup failures, strict-mode handle misses, range violations, and file
//! I/O.

use thiserror::Error;

/// The main error type for the Ember engine.
#[derive(Error, Debug)]
pub enum EmberError {
    // ========================================================================
    // GPU & Setup Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequest(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    // ========================================================================
    // Handle Errors
    // ========================================================================
    /// A mutator was given a handle its collection never issued, or one whose
    /// element was already removed. Only raised under `MissPolicy::Strict`.
    #[error("Unknown handle {handle} in {context}")]
    UnknownHandle {
        /// Raw handle value
        handle: u32,
        /// Which collection rejected it
        context: &'static str,
    },

    /// A byte-range write would spill past the end of one element.
    #[error("Range out of bounds: offset {offset} + len {len} exceeds element stride {stride}")]
    RangeOutOfBounds {
        /// Byte offset within the element
        offset: usize,
        /// Length of the write
        len: usize,
        /// Size of one element
        stride: usize,
    },

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error (disk-backed resource cache).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, EmberError>`.
pub type Result<T> = std::result::Result<T, EmberError>;
