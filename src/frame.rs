use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    accumulation::{AccumulationController, HdrImage, Resolution},
    camera::Camera,
    error::{Error, Result},
    light::DirectionalLight,
    scene::{SceneBuffer, SceneGenerator, SceneSettings},
    skybox::Skybox,
};

#[derive(Debug, Clone, Copy)]
pub struct RenderParams<'a> {
    pub camera_to_world: glam::Mat4,
    pub inverse_projection: glam::Mat4,
    pub skybox: Option<&'a Skybox>,
    pub pixel_offset: glam::Vec2,
    /// `(dir_x, dir_y, dir_z, intensity)`.
    pub directional_light: glam::Vec4,
    pub scene: &'a SceneBuffer,
    pub seed: f32,
    pub sample_index: u32,
}

/// Produces one noisy single-sample image per dispatch.
pub trait SampleRenderer {
    fn dispatch(&mut self, params: &RenderParams<'_>, target: &mut HdrImage) -> Result<()>;
}

pub struct FrameOrchestrator<R: SampleRenderer> {
    renderer: R,
    accumulation: AccumulationController,
    scene: Option<SceneBuffer>,
    skybox: Option<Skybox>,
    watch_light: bool,
    rng: StdRng,
    ended: bool,
}

impl<R: SampleRenderer> FrameOrchestrator<R> {
    pub fn new(renderer: R, frame_seed: u64, watch_light: bool) -> Self {
        Self {
            renderer,
            accumulation: AccumulationController::new(),
            scene: None,
            skybox: None,
            watch_light,
            rng: StdRng::seed_from_u64(frame_seed),
            ended: false,
        }
    }

    pub fn with_skybox(mut self, skybox: Skybox) -> Self {
        self.skybox = Some(skybox);
        self
    }

    pub fn accumulation(&self) -> &AccumulationController {
        &self.accumulation
    }

    pub fn scene(&self) -> Option<&SceneBuffer> {
        self.scene.as_ref()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn activate_scene(&mut self, settings: SceneSettings) -> Result<&SceneBuffer> {
        if self.ended {
            return Err(Error::SessionEnded);
        }
        let scene = SceneGenerator::new(settings)?.generate();
        tracing::info!(
            seed = settings.seed,
            spheres = scene.len(),
            bytes = scene.as_bytes().len(),
            "activated scene"
        );
        self.accumulation.reset();
        Ok(self.scene.insert(scene))
    }

    /// Returns the converged image.
    pub fn frame(
        &mut self,
        camera: &Camera,
        light: &DirectionalLight,
        resolution: Resolution,
    ) -> Result<&HdrImage> {
        if self.ended {
            return Err(Error::SessionEnded);
        }
        let scene = self.scene.as_ref().ok_or(Error::SceneNotActive)?;

        let mut watched = vec![camera.transform()];
        if self.watch_light {
            watched.push(light.transform);
        }
        self.accumulation.begin_frame(&watched, resolution)?;

        let params = RenderParams {
            camera_to_world: camera.camera_to_world(),
            inverse_projection: camera.inverse_projection(),
            skybox: self.skybox.as_ref(),
            pixel_offset: glam::Vec2::new(self.rng.gen(), self.rng.gen()),
            directional_light: light.packed(),
            scene,
            seed: self.rng.gen(),
            sample_index: self.accumulation.sample_count(),
        };
        let target = self.accumulation.raw_target_mut()?;
        self.renderer.dispatch(&params, target)?;

        self.accumulation.accumulate()
    }

    pub fn teardown(&mut self) {
        if self.ended {
            return;
        }
        self.accumulation.release();
        self.scene = None;
        self.ended = true;
        tracing::info!("render session ended");
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}
