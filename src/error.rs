//! Error types for the progressive tracer.

use thiserror::Error;

use crate::accumulation::Resolution;

/// Main error type for tracer operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Render resolution with a zero dimension
    #[error("Invalid resolution {0}: both dimensions must be non-zero")]
    InvalidResolution(Resolution),

    /// Radius range that is empty or not strictly positive
    #[error("Invalid sphere radius range [{min}, {max}]")]
    InvalidRadiusRange { min: f32, max: f32 },

    /// More sphere candidates than a single pass supports
    #[error("Sphere count {count} exceeds the limit of {max}")]
    TooManySpheres { count: u32, max: u32 },

    /// Render scale outside (0, 1]
    #[error("Invalid render scale {0}: must lie in (0, 1]")]
    InvalidRenderScale(f32),

    /// Negative or non-finite placement radius
    #[error("Invalid placement radius: {0}")]
    InvalidPlacementRadius(f32),

    /// Material fractions outside [0, 1] or summing above 1
    #[error("Invalid material distribution: {0}")]
    InvalidMaterialDistribution(String),

    /// Blend or dispatch before the image targets exist
    #[error("Accumulation targets are not allocated")]
    TargetsNotAllocated,

    /// Raw sample does not match the accumulation resolution
    #[error("Resolution mismatch: expected {expected}, got {actual}")]
    ResolutionMismatch {
        expected: Resolution,
        actual: Resolution,
    },

    /// Frame requested after teardown
    #[error("Render session has ended")]
    SessionEnded,

    /// Frame requested before a scene was activated
    #[error("No scene is active")]
    SceneNotActive,

    /// Image decoding or encoding failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Window creation failed
    #[error("Window creation failed: {0}")]
    Window(#[from] winit::error::OsError),

    /// Surface creation failed
    #[error("Surface creation failed: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    /// No adapter compatible with the surface
    #[error("No compatible graphics adapter found")]
    NoAdapter,

    /// Device request failed
    #[error("Device request failed: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    /// Surface does not support the adapter
    #[error("Surface is not supported by the adapter")]
    UnsupportedSurface,
}

/// Result type alias for tracer operations.
pub type Result<T> = std::result::Result<T, Error>;
