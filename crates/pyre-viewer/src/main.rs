//! Interactive deferred-shading demo: a box grid lit by orbiting point
//! lights and a viewer-bound spot light, with a shadow-mapped key light.

use anyhow::Result;
use glam::Vec3;

use pyre_engine::camera::{Camera, CameraController};
use pyre_engine::core::{App, AppControl, FrameCtx};
use pyre_engine::device::GpuInit;
use pyre_engine::input::Key;
use pyre_engine::logging::{LoggingConfig, init_logging};
use pyre_engine::render::Renderer;
use pyre_engine::scene::{LightRig, SceneDescription};
use pyre_engine::window::{Runtime, RuntimeConfig};

const POINT_LIGHT_COUNT: usize = 32;
const LIGHT_COLOR_SEED: u64 = 0x9e37_79b9;

struct Viewer {
    renderer: Renderer,
    camera: Camera,
    controller: CameraController,
    lights: LightRig,
    scene: SceneDescription,
}

impl App for Viewer {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl> {
        if ctx.input_frame.keys_pressed.contains(&Key::Escape) {
            self.renderer.destroy();
            return Ok(AppControl::Exit);
        }

        // Re-seed the look baseline when the pointer left or focus dropped,
        // so the next sample does not whip the camera around.
        if ctx.input_frame.pointer_lost() {
            self.controller.reset_look();
        }
        if let Some((x, y)) = ctx.input.pointer_pos {
            self.controller.look(&mut self.camera, x, y);
        }
        self.controller.advance(&mut self.camera, ctx.input, ctx.time.dt);

        self.lights.advance(ctx.time.elapsed);
        self.lights
            .follow_camera(self.camera.position, self.camera.front());

        let renderer = &mut self.renderer;
        let camera = &self.camera;
        let lights = &self.lights;
        let scene = &self.scene;
        ctx.render(|rctx, target| renderer.render_frame(rctx, target, camera, lights, scene))
    }
}

fn run() -> Result<()> {
    let viewer = Viewer {
        renderer: Renderer::default(),
        camera: Camera::new(Vec3::new(0.0, 2.0, 8.0), -90.0, -10.0),
        controller: CameraController::default(),
        lights: LightRig::procedural(POINT_LIGHT_COUNT, LIGHT_COLOR_SEED),
        scene: SceneDescription::demo_grid(),
    };

    let config = RuntimeConfig {
        title: "pyre viewer".to_string(),
        ..Default::default()
    };

    Runtime::run(config, GpuInit::default(), viewer)
}

fn main() {
    init_logging(LoggingConfig::default());

    if let Err(err) = run() {
        log::error!("fatal: {err:#}");
        std::process::exit(1);
    }
}
