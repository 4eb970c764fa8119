//! Assets
//!
//! Byte-level asset acquisition. Decoding (images, geometry text) happens in
//! the host application; the engine only caches and reference-counts the raw
//! bytes.

pub mod cache;

pub use cache::FileCache;
