//! Headless demo: a camera and two spinning cubes driven for a few seconds

use std::f32::consts::TAU;

use diken::prelude::*;

/// Simulated frame length in seconds
const FRAME: f64 = 1.0 / 60.0;
/// Frames to simulate
const FRAMES: u32 = 240;

fn build_scene(engine: &Engine<HeadlessBackend>) -> Result<(Scene, ComponentId, NodeId)> {
    let mut scene = engine.create_scene("Demo");

    let camera_node = scene.create_node("MainCamera")?;
    let graph = scene.graph_mut();
    graph
        .node_mut(camera_node)
        .ok_or(EngineError::NodeNotFound(camera_node))?
        .transform_mut()
        .translate(0.0, 1.0, 6.0)?;
    let mut camera = Camera::new();
    camera.set_perspective(60.0, 16.0 / 9.0, 0.1, 100.0)?;
    let camera = graph.add_component(camera_node, Box::new(camera))?;

    let cube = scene.create_node("Cube")?;
    let graph = scene.graph_mut();
    graph.set_tag(cube, Some("Spinner"))?;
    let mut mesh = MeshRenderer::cube();
    mesh.set_color(0.9, 0.4, 0.1)?;
    graph.add_component(cube, Box::new(mesh))?;
    graph.add_component(
        cube,
        Box::new(
            Script::named("Spin")
                .with_property("speed", TAU / 4.0)
                .with_update(|props, ctx, dt| {
                    let speed = props
                        .get("speed")
                        .and_then(ScriptValue::as_number)
                        .unwrap_or(0.0) as f32;
                    ctx.transform_mut()?.rotate(0.0, speed * dt, 0.0)
                }),
        ),
    )?;

    let moon = graph.create_node("Moon");
    graph.add_child(cube, moon)?;
    graph
        .node_mut(moon)
        .ok_or(EngineError::NodeNotFound(moon))?
        .transform_mut()
        .translate(2.0, 0.0, 0.0)?;
    graph.set_tag(moon, Some("Spinner"))?;
    let mut moon_mesh = MeshRenderer::cube();
    moon_mesh.set_color(0.6, 0.6, 0.7)?;
    graph.add_component(moon, Box::new(moon_mesh))?;

    scene.set_main_camera(camera)?;
    Ok((scene, camera, moon))
}

fn run() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let source = std::fs::read_to_string(&path)
                .map_err(|e| EngineError::Config(format!("{path}: {e}")))?;
            EngineConfig::from_ron_str(&source)?
        }
        None => EngineConfig::default()
            .with_title("Diken Demo")
            .with_viewport(1280, 720),
    };

    let mut engine = Engine::new(config, HeadlessBackend::new())?;
    let (scene, _camera, moon) = build_scene(&engine)?;
    engine.load_scene(scene);

    let mut now = 0.0;
    engine.start(now);
    for _ in 0..FRAMES {
        now += FRAME;
        engine.frame(now)?;
    }

    if let Some(scene) = engine.scene_mut() {
        let spinners = scene.find_game_objects_with_tag("Spinner");
        log::info!("{} tagged nodes", spinners.len());

        let moon_position = scene.graph().world_position(moon)?;
        log::info!("Moon world position after {FRAMES} frames: {moon_position}");

        let model = scene.graph().world_matrix(moon)?;
        let mvp = scene.main_camera_mvp(&model)?;
        log::info!("Moon MVP:\n{mvp}");
    }

    let draws = engine.renderer().backend().borrow().draws().len();
    log::info!("Issued {draws} draw calls in {:.2}s", engine.time().elapsed_seconds());

    engine.shutdown();
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Engine error: {e}");
        std::process::exit(1);
    }
}
