//! Minimal end-to-end run: one lit triangle, a point light, a few frames
//! into the offscreen target.
//!
//! ```sh
//! cargo run --example triangle
//! ```

use glam::{Quat, Vec3, Vec4};

use ember::resources::{Geometry, GeometryRef, Material, MaterialRef, Vertex};
use ember::scene::{Model, PointLight, Scene, Transform};
use ember::settings::EngineSettings;
use ember::{Engine, ModelRef, SceneRef};

fn main() -> ember::errors::Result<()> {
    env_logger::init();

    let mut engine = Engine::init(EngineSettings::default())?;

    let geometry = GeometryRef::new(Geometry::new(
        "triangle",
        vec![
            Vertex::new(Vec3::new(-1.0, -1.0, 0.0), Vec3::Z, [0.0, 0.0]),
            Vertex::new(Vec3::new(1.0, -1.0, 0.0), Vec3::Z, [1.0, 0.0]),
            Vertex::new(Vec3::new(0.0, 1.0, 0.0), Vec3::Z, [0.5, 1.0]),
        ],
        vec![0, 1, 2],
    ));
    let material = MaterialRef::new(Material::lit("copper", Vec4::new(0.9, 0.5, 0.3, 1.0)));
    let model = ModelRef::new(Model::with_parts("triangle", geometry, material));

    let scene = SceneRef::new(Scene::new("demo"));
    {
        let mut scene = scene.write();
        let gpu = engine.backend_mut();
        let _ = scene.add_model(gpu, model.clone());
        let _ = scene.add_point_light(
            gpu,
            PointLight::new(Vec3::new(0.0, 2.0, 2.0), 20.0, Vec3::ONE, 5.0),
        );
        scene.environment_mut().ambient_color = Vec3::splat(0.1);
    }

    engine.load_scene(&scene);
    for frame in 0..60 {
        let angle = frame as f32 * 0.05;
        model.write().set_transform(
            engine.backend_mut(),
            Transform {
                rotation: Quat::from_rotation_y(angle),
                ..Transform::IDENTITY
            },
        );
        engine.render(&scene);
    }
    engine.unload_scene(&scene);
    engine.shutdown();
    Ok(())
}
