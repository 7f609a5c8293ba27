use std::path::PathBuf;

use clap::Parser;
use progressive_tracer_lib::{
    accumulation::Resolution,
    application::{AppState, Application, Layer, Screen},
    camera::{Camera, CameraController},
    config::{Cli, Config},
    cpu::CpuRenderer,
    error::Error,
    frame::FrameOrchestrator,
    light::DirectionalLight,
    renderer::PresentPass,
    skybox::Skybox,
};
use tracing_subscriber::EnvFilter;
use wgpu::{CommandEncoderDescriptor, TextureViewDescriptor};
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent},
};

const CAMERA_STEP: f32 = 4.0;
const LIGHT_STEP_DEGREES: f32 = 5.0;

struct ProgressiveTracer {
    config: Config,
    camera: Camera,
    camera_controller: CameraController,
    light: DirectionalLight,
    orchestrator: FrameOrchestrator<CpuRenderer>,
    present: PresentPass,
    pending_snapshot: bool,
}

impl ProgressiveTracer {
    fn render_resolution(&self, screen: &Screen) -> Resolution {
        let size = screen.size();
        Resolution::new(size.width, size.height).scaled(self.config.render_scale)
    }

    fn save_snapshot(&self) {
        let Some(converged) = self.orchestrator.accumulation().converged() else {
            return;
        };
        let path = PathBuf::from(format!(
            "converged-{}-{}.png",
            self.config.scene.seed,
            self.orchestrator.accumulation().sample_count()
        ));
        match converged.save_png(&path) {
            Ok(()) => tracing::info!(path = %path.display(), "saved converged image"),
            Err(err) => tracing::error!("saving {} failed: {err}", path.display()),
        }
    }

    fn next_scene(&mut self) {
        self.config.scene.seed = self.config.scene.seed.wrapping_add(1);
        if let Err(err) = self.orchestrator.activate_scene(self.config.scene) {
            tracing::error!("scene activation failed: {err}");
        }
    }
}

impl Layer for ProgressiveTracer {
    type Config = Config;
    type LayerErr = Error;

    fn start(screen: &mut Screen, _app: &AppState, config: Config) -> Result<Self, Error> {
        let mut orchestrator =
            FrameOrchestrator::new(CpuRenderer::default(), config.frame_seed, config.light.watched);
        if let Some(path) = &config.skybox {
            orchestrator = orchestrator.with_skybox(Skybox::open(path)?);
        }
        orchestrator.activate_scene(config.scene)?;

        let mut camera = Camera::default();
        let size = screen.size();
        camera.set_aspect(size.width, size.height);

        Ok(Self {
            light: config.light.light(),
            config,
            camera,
            camera_controller: CameraController::new(CAMERA_STEP),
            orchestrator,
            present: PresentPass::new(&screen.device, screen.config.format),
            pending_snapshot: false,
        })
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>, _state: &AppState, _screen: &mut Screen) {
        self.camera.set_aspect(new_size.width, new_size.height);
    }

    fn process_event(&mut self, event: &Event<()>, _screen: &mut Screen) {
        let Event::WindowEvent { event, .. } = event else {
            return;
        };
        if self
            .camera_controller
            .process_events(&mut self.camera, event, 1.0)
        {
            return;
        }

        if let WindowEvent::KeyboardInput {
            input:
                KeyboardInput {
                    state: ElementState::Pressed,
                    virtual_keycode: Some(keycode),
                    ..
                },
            ..
        } = event
        {
            match keycode {
                VirtualKeyCode::Left => self.light.rotate(0.0, LIGHT_STEP_DEGREES),
                VirtualKeyCode::Right => self.light.rotate(0.0, -LIGHT_STEP_DEGREES),
                VirtualKeyCode::Up => self.light.rotate(LIGHT_STEP_DEGREES, 0.0),
                VirtualKeyCode::Down => self.light.rotate(-LIGHT_STEP_DEGREES, 0.0),
                VirtualKeyCode::F5 => self.pending_snapshot = true,
                VirtualKeyCode::R => self.next_scene(),
                _ => {}
            }
        }
    }

    fn update(&mut self, _app: &AppState, _screen: &mut Screen) {}

    fn render(&mut self, app: &AppState, screen: &mut Screen) -> Result<(), wgpu::SurfaceError> {
        let resolution = self.render_resolution(screen);
        let image = match self.orchestrator.frame(&self.camera, &self.light, resolution) {
            Ok(converged) => converged.to_rgba8(),
            Err(err) => {
                tracing::error!("frame failed: {err}");
                return Ok(());
            }
        };
        if app.frame % 120 == 0 {
            tracing::debug!(
                samples = self.orchestrator.accumulation().sample_count(),
                frame_ms = app.elapsed_time * 1000.0,
                %resolution,
                "accumulating"
            );
        }
        if std::mem::take(&mut self.pending_snapshot) {
            self.save_snapshot();
        }

        self.present.upload(&screen.device, &screen.queue, &image);

        let output = screen.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&TextureViewDescriptor::default());
        let mut encoder = screen
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Present Encoder"),
            });
        self.present.draw(&mut encoder, &view);

        screen.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn shutdown(&mut self, _app: &AppState, _screen: &mut Screen) -> Result<(), Self::LayerErr> {
        self.orchestrator.teardown();
        tracing::info!("exiting");
        Ok(())
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::try_from(Cli::parse()) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("{err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = pollster::block_on(Application::<ProgressiveTracer>::init(config)) {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}
