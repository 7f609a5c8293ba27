pub mod accumulation;
pub mod application;
pub mod camera;
pub mod config;
pub mod cpu;
pub mod error;
pub mod frame;
pub mod light;
pub mod renderer;
pub mod scene;
pub mod skybox;
pub mod texture;
pub mod transform;
pub mod util;

pub use error::{Error, Result};
