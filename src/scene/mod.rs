//! Scene Layer
//!
//! Models, lights, camera, environment, and the [`Scene`] that composes
//! them into one residency cascade.

pub mod camera;
pub mod environment;
pub mod light;
pub mod model;
pub mod scene;

pub use camera::{Camera, Projection};
pub use environment::Environment;
pub use light::{DirectionalLight, PointLight};
pub use model::{Model, ModelUniforms, Transform};
pub use scene::{Scene, SceneUniforms};

use crate::resources::Shared;

/// Shared model reference.
pub type ModelRef = Shared<Model>;
/// Shared scene reference.
pub type SceneRef = Shared<Scene>;
