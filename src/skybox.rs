use std::path::Path;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Skybox {
    image: image::Rgb32FImage,
}

impl Skybox {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)?.into_rgb32f();
        tracing::info!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "loaded skybox"
        );
        Ok(Self { image })
    }

    pub fn from_image(image: image::Rgb32FImage) -> Self {
        Self { image }
    }

    pub fn sample(&self, direction: glam::Vec3) -> glam::Vec3 {
        let (width, height) = self.image.dimensions();
        if width == 0 || height == 0 {
            return glam::Vec3::ZERO;
        }

        let d = direction.normalize_or_zero();
        let u = 0.5 + d.x.atan2(-d.z) / (2.0 * std::f32::consts::PI);
        let v = d.y.clamp(-1.0, 1.0).acos() / std::f32::consts::PI;

        let x = ((u * width as f32) as u32).min(width - 1);
        let y = ((v * height as f32) as u32).min(height - 1);
        let [r, g, b] = self.image.get_pixel(x, y).0;
        glam::Vec3::new(r, g, b)
    }
}
