//! Engine Configuration
//!
//! [`EngineSettings`] is plain serializable data so host applications can ship
//! it in a config file and hand it to [`Engine::init`](crate::Engine::init).

use serde::{Deserialize, Serialize};

/// What a handle-indexed collection does when asked to mutate through a
/// handle it never issued (or whose element was already removed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MissPolicy {
    /// Silently ignore the request. This is the lenient historical behavior:
    /// redundant removals are harmless, at the cost of masking genuine
    /// use-after-remove bugs.
    #[default]
    Ignore,
    /// Surface [`EmberError::UnknownHandle`](crate::errors::EmberError::UnknownHandle).
    Strict,
}

/// GPU adapter preference, kept engine-local so headless builds and tests
/// never touch wgpu types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PowerPreference {
    #[default]
    HighPerformance,
    LowPower,
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Clear color for the offscreen target (linear RGBA).
    pub clear_color: [f32; 4],
    /// Offscreen render target size in pixels.
    pub target_width: u32,
    /// Offscreen render target size in pixels.
    pub target_height: u32,
    /// Adapter selection preference.
    pub power_preference: PowerPreference,
    /// Unknown-handle behavior for collections the engine creates.
    pub miss_policy: MissPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            target_width: 1280,
            target_height: 720,
            power_preference: PowerPreference::default(),
            miss_policy: MissPolicy::default(),
        }
    }
}
