use std::path::PathBuf;

use clap::Parser;

use crate::{
    error::{Error, Result},
    light::DirectionalLight,
    scene::{MaterialDistribution, SceneSettings},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightConfig {
    pub pitch_degrees: f32,
    pub yaw_degrees: f32,
    pub intensity: f32,
    /// Whether moving the light restarts accumulation.
    pub watched: bool,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            pitch_degrees: -50.0,
            yaw_degrees: 30.0,
            intensity: 1.0,
            watched: true,
        }
    }
}

impl LightConfig {
    pub fn light(&self) -> DirectionalLight {
        DirectionalLight::from_angles(self.pitch_degrees, self.yaw_degrees, self.intensity)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub scene: SceneSettings,
    pub light: LightConfig,
    pub skybox: Option<PathBuf>,
    /// Fraction of the window resolution the renderer samples at.
    pub render_scale: f32,
    /// Seed of the per-frame jitter stream.
    pub frame_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scene: SceneSettings::default(),
            light: LightConfig::default(),
            skybox: None,
            render_scale: 0.5,
            frame_seed: 0,
        }
    }
}

/// Progressive sphere-scene ray tracer.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Scene generation seed
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Number of sphere candidates to place
    #[arg(long, default_value_t = 100)]
    pub spheres: u32,

    /// Smallest sphere radius
    #[arg(long, default_value_t = 3.0)]
    pub min_radius: f32,

    /// Largest sphere radius
    #[arg(long, default_value_t = 8.0)]
    pub max_radius: f32,

    /// Radius of the ground disk spheres are placed in
    #[arg(long, default_value_t = 100.0)]
    pub placement_radius: f32,

    /// Fraction of spheres that are metal
    #[arg(long, default_value_t = 0.4)]
    pub metal_fraction: f32,

    /// Fraction of spheres that emit light
    #[arg(long, default_value_t = 0.2)]
    pub emissive_fraction: f32,

    /// Equirectangular sky image (png or hdr)
    #[arg(long)]
    pub skybox: Option<PathBuf>,

    /// Directional light intensity
    #[arg(long, default_value_t = 1.0)]
    pub light_intensity: f32,

    /// Do not restart accumulation when the light moves
    #[arg(long)]
    pub unwatched_light: bool,

    /// Fraction of the window resolution to render at
    #[arg(long, default_value_t = 0.5)]
    pub render_scale: f32,

    /// Seed of the per-frame jitter stream
    #[arg(long, default_value_t = 0)]
    pub frame_seed: u64,
}

impl Config {
    /// Check the render scale and scene settings.
    pub fn validate(&self) -> Result<()> {
        if !(self.render_scale > 0.0 && self.render_scale <= 1.0) {
            return Err(Error::InvalidRenderScale(self.render_scale));
        }
        self.scene.validate()
    }
}

impl TryFrom<Cli> for Config {
    type Error = Error;

    fn try_from(cli: Cli) -> Result<Self> {
        let config = Self {
            scene: SceneSettings {
                seed: cli.seed,
                count: cli.spheres,
                radius_range: (cli.min_radius, cli.max_radius),
                placement_radius: cli.placement_radius,
                materials: MaterialDistribution {
                    metal_fraction: cli.metal_fraction,
                    emissive_fraction: cli.emissive_fraction,
                    ..Default::default()
                },
            },
            light: LightConfig {
                intensity: cli.light_intensity,
                watched: !cli.unwatched_light,
                ..Default::default()
            },
            skybox: cli.skybox,
            render_scale: cli.render_scale,
            frame_seed: cli.frame_seed,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_match_config_defaults() {
        let cli = Cli::parse_from(["progressive_tracer"]);
        assert_eq!(Config::try_from(cli).unwrap(), Config::default());
    }

    #[test]
    fn cli_overrides() {
        let cli = Cli::parse_from([
            "progressive_tracer",
            "--seed",
            "42",
            "--spheres",
            "10",
            "--min-radius",
            "1",
            "--unwatched-light",
            "--render-scale",
            "0.25",
        ]);
        let config = Config::try_from(cli).unwrap();
        assert_eq!(config.scene.seed, 42);
        assert_eq!(config.scene.count, 10);
        assert_eq!(config.scene.radius_range, (1.0, 8.0));
        assert!(!config.light.watched);
        assert_eq!(config.render_scale, 0.25);
    }

    #[test]
    fn out_of_range_render_scale_is_rejected() {
        for scale in ["4", "0", "-0.5", "NaN"] {
            let cli = Cli::parse_from([
                "progressive_tracer".to_string(),
                format!("--render-scale={scale}"),
            ]);
            assert!(
                matches!(Config::try_from(cli), Err(Error::InvalidRenderScale(_))),
                "scale {scale} accepted"
            );
        }
    }

    #[test]
    fn invalid_scene_is_rejected_at_parse_time() {
        let cli = Cli::parse_from(["progressive_tracer", "--min-radius", "9"]);
        assert!(matches!(
            Config::try_from(cli),
            Err(Error::InvalidRadiusRange { .. })
        ));
    }
}
