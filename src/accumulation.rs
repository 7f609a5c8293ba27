//! Progressive accumulation of single-sample frames into a converged image.

use std::fmt;

use crate::{
    error::{Error, Result},
    transform::{Transform, WatchedTransforms},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Scale both dimensions. Dimensions may round down to zero.
    pub fn scaled(&self, factor: f32) -> Self {
        let scale = |v: u32| (v as f32 * factor).round() as u32;
        Self::new(scale(self.width), scale(self.height))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Linear RGBA float image, row-major from the top-left pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct HdrImage {
    resolution: Resolution,
    pixels: Vec<glam::Vec4>,
}

impl HdrImage {
    pub fn new(resolution: Resolution) -> Self {
        Self::filled(resolution, glam::Vec4::ZERO)
    }

    pub fn filled(resolution: Resolution, value: glam::Vec4) -> Self {
        Self {
            resolution,
            pixels: vec![value; resolution.pixel_count()],
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn pixels(&self) -> &[glam::Vec4] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [glam::Vec4] {
        &mut self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<glam::Vec4> {
        if x >= self.resolution.width || y >= self.resolution.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.resolution.width as usize + x as usize)
            .copied()
    }

    /// Clamp to `[0, 1]` and quantize to 8-bit RGBA.
    pub fn to_rgba8(&self) -> image::RgbaImage {
        let width = self.resolution.width as usize;
        image::RgbaImage::from_fn(self.resolution.width, self.resolution.height, |x, y| {
            let pixel = self.pixels[y as usize * width + x as usize];
            let clamped = pixel.clamp(glam::Vec4::ZERO, glam::Vec4::ONE) * 255.0;
            image::Rgba([
                clamped.x.round() as u8,
                clamped.y.round() as u8,
                clamped.z.round() as u8,
                clamped.w.round() as u8,
            ])
        })
    }

    /// Write the image as an 8-bit PNG.
    pub fn save_png(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        self.to_rgba8()
            .save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

#[derive(Debug)]
struct Targets {
    raw: HdrImage,
    converged: HdrImage,
}

/// Running-mean accumulator over single-sample frames.
///
/// Owns the raw sample target written by the renderer each frame and the
/// converged average presented to the screen. Both always share one
/// resolution.
#[derive(Debug, Default)]
pub struct AccumulationController {
    sample_count: u32,
    targets: Option<Targets>,
    watched: WatchedTransforms,
}

impl AccumulationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Resolution of the allocated targets, if any.
    pub fn resolution(&self) -> Option<Resolution> {
        self.targets.as_ref().map(|t| t.converged.resolution())
    }

    pub fn converged(&self) -> Option<&HdrImage> {
        self.targets.as_ref().map(|t| &t.converged)
    }

    /// Whether accumulated samples must be discarded this frame.
    ///
    /// Always consumes the pending transform changes, so one movement resets
    /// exactly one frame.
    pub fn should_reset(
        &mut self,
        watched: &[Transform],
        previous: Option<Resolution>,
        current: Resolution,
    ) -> bool {
        let moved = self.watched.consume_changes(watched);
        moved || previous != Some(current)
    }

    /// Allocate both targets at `resolution` unless they already match.
    ///
    /// Reallocation drops the previous targets and resets the sample count.
    pub fn ensure_buffers(&mut self, resolution: Resolution) -> Result<()> {
        if !resolution.is_valid() {
            return Err(Error::InvalidResolution(resolution));
        }
        if self.resolution() == Some(resolution) {
            return Ok(());
        }

        if let Some(previous) = self.targets.take() {
            tracing::info!(
                from = %previous.converged.resolution(),
                to = %resolution,
                "reallocating accumulation targets"
            );
        } else {
            tracing::info!(%resolution, "allocating accumulation targets");
        }

        self.targets = Some(Targets {
            raw: HdrImage::new(resolution),
            converged: HdrImage::new(resolution),
        });
        self.sample_count = 0;
        Ok(())
    }

    /// Prepare targets for a frame at `resolution` and reset the sample
    /// count if the view moved or the resolution changed.
    pub fn begin_frame(&mut self, watched: &[Transform], resolution: Resolution) -> Result<()> {
        let previous = self.resolution();
        self.ensure_buffers(resolution)?;
        if self.should_reset(watched, previous, resolution) && self.sample_count > 0 {
            tracing::debug!(samples = self.sample_count, "accumulation reset");
            self.sample_count = 0;
        }
        Ok(())
    }

    /// Discard accumulated samples without reallocating.
    pub fn reset(&mut self) {
        self.sample_count = 0;
        self.watched.invalidate();
    }

    /// Target the renderer writes this frame's raw sample into.
    pub fn raw_target_mut(&mut self) -> Result<&mut HdrImage> {
        self.targets
            .as_mut()
            .map(|t| &mut t.raw)
            .ok_or(Error::TargetsNotAllocated)
    }

    /// Fold `raw` into the converged image and advance the sample count.
    pub fn blend(&mut self, raw: &HdrImage) -> Result<&HdrImage> {
        let targets = self.targets.as_mut().ok_or(Error::TargetsNotAllocated)?;
        blend_into(&mut targets.converged, raw, self.sample_count)?;
        self.sample_count = self.sample_count.saturating_add(1);
        Ok(&targets.converged)
    }

    /// Blend the raw target written by the renderer this frame.
    pub fn accumulate(&mut self) -> Result<&HdrImage> {
        let targets = self.targets.as_mut().ok_or(Error::TargetsNotAllocated)?;
        blend_into(&mut targets.converged, &targets.raw, self.sample_count)?;
        self.sample_count = self.sample_count.saturating_add(1);
        Ok(&targets.converged)
    }

    /// Drop both targets. Blending afterwards fails until reallocated.
    pub fn release(&mut self) {
        if self.targets.take().is_some() {
            tracing::info!("released accumulation targets");
        }
        self.reset();
    }
}

/// Incremental mean: `converged += (raw - converged) / (n + 1)`.
/// The first sample replaces whatever the converged image held.
fn blend_into(converged: &mut HdrImage, raw: &HdrImage, sample_count: u32) -> Result<()> {
    if converged.resolution() != raw.resolution() {
        return Err(Error::ResolutionMismatch {
            expected: converged.resolution(),
            actual: raw.resolution(),
        });
    }

    if sample_count == 0 {
        converged.pixels.copy_from_slice(&raw.pixels);
        return Ok(());
    }

    let count = sample_count as f32 + 1.0;
    for (acc, sample) in converged.pixels.iter_mut().zip(&raw.pixels) {
        *acc += (*sample - *acc) / count;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RES: Resolution = Resolution::new(4, 3);

    fn at(x: f32) -> Transform {
        Transform {
            translation: glam::Vec3::new(x, 0.0, 0.0),
            ..Default::default()
        }
    }

    fn started() -> AccumulationController {
        let mut controller = AccumulationController::new();
        controller.begin_frame(&[at(0.0)], RES).unwrap();
        controller
    }

    #[test]
    fn constant_samples_converge_exactly() {
        let mut controller = started();
        let value = glam::Vec4::new(0.3, 0.7, 0.1, 1.0);
        let raw = HdrImage::filled(RES, value);

        for _ in 0..1000 {
            let converged = controller.blend(&raw).unwrap();
            assert!(converged.pixels().iter().all(|p| *p == value));
        }
        assert_eq!(controller.sample_count(), 1000);
    }

    #[test]
    fn blend_is_running_mean() {
        let mut controller = started();
        let samples = [1.0, 2.0, 6.0, 3.0];
        for s in samples {
            controller
                .blend(&HdrImage::filled(RES, glam::Vec4::splat(s)))
                .unwrap();
        }
        let mean = samples.iter().sum::<f32>() / samples.len() as f32;
        let converged = controller.converged().unwrap();
        assert!((converged.pixel(1, 2).unwrap().x - mean).abs() < 1e-6);
    }

    #[test]
    fn alternating_samples_approach_mean() {
        let mut controller = started();
        let low = HdrImage::filled(RES, glam::Vec4::ZERO);
        let high = HdrImage::filled(RES, glam::Vec4::ONE);
        for i in 0..4000 {
            controller.blend(if i % 2 == 0 { &low } else { &high }).unwrap();
        }
        let value = controller.converged().unwrap().pixel(0, 0).unwrap().x;
        assert!((value - 0.5).abs() < 1e-3);
    }

    #[test]
    fn camera_move_resets_once() {
        let mut controller = started();
        let raw = HdrImage::filled(RES, glam::Vec4::ONE);
        for _ in 0..5 {
            controller.begin_frame(&[at(0.0)], RES).unwrap();
            controller.blend(&raw).unwrap();
        }
        assert_eq!(controller.sample_count(), 5);

        controller.begin_frame(&[at(1.0)], RES).unwrap();
        assert_eq!(controller.sample_count(), 0);
        controller.blend(&raw).unwrap();

        controller.begin_frame(&[at(1.0)], RES).unwrap();
        assert_eq!(controller.sample_count(), 1);
    }

    #[test]
    fn should_reset_consumes_changes() {
        let mut controller = AccumulationController::new();
        assert!(controller.should_reset(&[at(0.0)], Some(RES), RES));
        assert!(!controller.should_reset(&[at(0.0)], Some(RES), RES));
        assert!(controller.should_reset(&[at(2.0)], Some(RES), RES));
        assert!(!controller.should_reset(&[at(2.0)], Some(RES), RES));
        assert!(controller.should_reset(&[at(2.0)], Some(RES), Resolution::new(8, 8)));
        assert!(controller.should_reset(&[at(2.0)], None, RES));
    }

    #[test]
    fn resolution_change_reallocates() {
        let mut controller = started();
        controller
            .blend(&HdrImage::filled(RES, glam::Vec4::ONE))
            .unwrap();
        assert_eq!(controller.sample_count(), 1);

        let bigger = Resolution::new(16, 9);
        controller.ensure_buffers(bigger).unwrap();
        assert_eq!(controller.sample_count(), 0);
        assert_eq!(controller.resolution(), Some(bigger));
        assert_eq!(controller.raw_target_mut().unwrap().resolution(), bigger);
        assert!(controller
            .converged()
            .unwrap()
            .pixels()
            .iter()
            .all(|p| *p == glam::Vec4::ZERO));
    }

    #[test]
    fn same_resolution_keeps_samples() {
        let mut controller = started();
        controller
            .blend(&HdrImage::filled(RES, glam::Vec4::ONE))
            .unwrap();
        controller.ensure_buffers(RES).unwrap();
        assert_eq!(controller.sample_count(), 1);
    }

    #[test]
    fn zero_resolution_fails_fast() {
        let mut controller = AccumulationController::new();
        assert!(matches!(
            controller.ensure_buffers(Resolution::new(0, 10)),
            Err(Error::InvalidResolution(_))
        ));
        assert!(controller
            .begin_frame(&[], Resolution::new(10, 0))
            .is_err());
        assert_eq!(controller.resolution(), None);
    }

    #[test]
    fn blend_without_targets_fails() {
        let mut controller = AccumulationController::new();
        let raw = HdrImage::filled(RES, glam::Vec4::ONE);
        assert!(matches!(
            controller.blend(&raw),
            Err(Error::TargetsNotAllocated)
        ));

        let mut controller = started();
        controller.release();
        assert!(matches!(
            controller.blend(&raw),
            Err(Error::TargetsNotAllocated)
        ));
        assert!(controller.raw_target_mut().is_err());
    }

    #[test]
    fn mismatched_sample_is_rejected() {
        let mut controller = started();
        let raw = HdrImage::filled(Resolution::new(2, 2), glam::Vec4::ONE);
        assert!(matches!(
            controller.blend(&raw),
            Err(Error::ResolutionMismatch { .. })
        ));
        assert_eq!(controller.sample_count(), 0);
    }

    #[test]
    fn accumulate_blends_raw_target() {
        let mut controller = started();
        let value = glam::Vec4::splat(0.25);
        controller
            .raw_target_mut()
            .unwrap()
            .pixels_mut()
            .fill(value);
        let converged = controller.accumulate().unwrap();
        assert_eq!(converged.pixel(3, 2), Some(value));
        assert_eq!(controller.sample_count(), 1);
    }

    #[test]
    fn reset_discards_previous_average_exactly() {
        let mut controller = started();
        let bright = HdrImage::filled(RES, glam::Vec4::splat(8.0));
        for _ in 0..10 {
            controller.begin_frame(&[at(0.0)], RES).unwrap();
            controller.blend(&bright).unwrap();
        }

        let value = glam::Vec4::splat(0.1);
        let dim = HdrImage::filled(RES, value);
        controller.begin_frame(&[at(3.0)], RES).unwrap();
        assert_eq!(controller.sample_count(), 0);
        for _ in 0..1000 {
            controller.begin_frame(&[at(3.0)], RES).unwrap();
            let converged = controller.blend(&dim).unwrap();
            assert!(converged.pixels().iter().all(|p| *p == value));
        }

        controller.reset();
        let converged = controller.blend(&bright).unwrap();
        assert!(converged.pixels().iter().all(|p| *p == glam::Vec4::splat(8.0)));
    }

    #[test]
    fn pixel_lookup_is_bounds_checked() {
        let image = HdrImage::filled(RES, glam::Vec4::ONE);
        assert_eq!(image.pixel(3, 2), Some(glam::Vec4::ONE));
        assert_eq!(image.pixel(4, 0), None);
        assert_eq!(image.pixel(0, 3), None);
    }

    #[test]
    fn scaling_to_zero_is_rejected_by_allocation() {
        let tiny = Resolution::new(4, 3).scaled(0.1);
        assert_eq!(tiny, Resolution::new(0, 0));
        let mut controller = AccumulationController::new();
        assert!(matches!(
            controller.ensure_buffers(tiny),
            Err(Error::InvalidResolution(_))
        ));
    }

    #[test]
    fn rgba8_conversion_clamps() {
        let mut image = HdrImage::new(Resolution::new(2, 1));
        image.pixels_mut()[0] = glam::Vec4::new(2.0, -1.0, 0.5, 1.0);
        let rgba = image.to_rgba8();
        assert_eq!(rgba.get_pixel(0, 0).0, [255, 0, 128, 255]);
        assert_eq!(rgba.get_pixel(1, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn png_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("converged.png");
        HdrImage::filled(RES, glam::Vec4::ONE).save_png(&path).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (RES.width, RES.height));
        assert_eq!(loaded.get_pixel(0, 0).0, [255; 4]);
    }
}
