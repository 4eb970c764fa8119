#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod assets;
pub mod engine;
pub mod errors;
pub mod gpu;
pub mod resources;
pub mod scene;
pub mod settings;

pub use assets::FileCache;
pub use engine::Engine;
pub use errors::EmberError;
pub use gpu::{DrawCall, GpuBackend, HeadlessBackend, WgpuBackend};
pub use resources::{
    Geometry, GeometryRef, Handle, HandleVec, LoadState, Material, MaterialRef, MirrorVec,
    MirroredBuffer, PixelBlock, Texture, TextureRef, Vertex,
};
pub use scene::{
    Camera, DirectionalLight, Environment, Model, ModelRef, PointLight, Scene, SceneRef, Transform,
};
pub use settings::{EngineSettings, MissPolicy};
