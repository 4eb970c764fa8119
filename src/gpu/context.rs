//! GPU Context
//!
//! [`GpuContext`] acquires the core wgpu handles: instance, adapter, device
//! and queue. The engine only renders into an offscreen target; surface and
//! window management belong to the host application.

use crate::errors::{EmberError, Result};
use crate::settings::PowerPreference;

/// Core GPU handles, created once at engine init.
pub struct GpuContext {
    /// The wgpu device for resource creation.
    pub device: wgpu::Device,
    /// The command submission queue.
    pub queue: wgpu::Queue,
}

impl GpuContext {
    pub async fn new(power: PowerPreference) -> Result<Self> {
        let instance = wgpu::Instance::default();

        let power_preference = match power {
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
        };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| EmberError::AdapterRequest(e.to_string()))?;

        log::info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        Ok(Self { device, queue })
    }

    /// Blocking wrapper around [`GpuContext::new`] for hosts without an
    /// async runtime.
    pub fn new_blocking(power: PowerPreference) -> Result<Self> {
        pollster::block_on(Self::new(power))
    }
}
