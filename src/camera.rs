use winit::event::{ElementState, KeyboardInput, VirtualKeyCode, WindowEvent};

use crate::{transform::Transform, util::math::degree_to_radian};

#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: glam::Vec3,
    pub target: glam::Vec3,
    pub up: glam::Vec3,
    pub aspect: f32,
    pub fov_y: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: glam::Vec3::new(0.0, 35.0, 110.0),
            target: glam::Vec3::ZERO,
            up: glam::Vec3::Y,
            aspect: 16.0 / 9.0,
            fov_y: degree_to_radian(60.0),
            z_near: 0.3,
            z_far: 1000.0,
        }
    }
}

impl Camera {
    pub fn view_matrix(&self) -> glam::Mat4 {
        glam::Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> glam::Mat4 {
        glam::Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far)
    }

    /// Camera extrinsics: maps camera space to world space.
    pub fn camera_to_world(&self) -> glam::Mat4 {
        self.view_matrix().inverse()
    }

    /// Camera intrinsics, inverted: maps clip space back to camera space.
    pub fn inverse_projection(&self) -> glam::Mat4 {
        self.projection_matrix().inverse()
    }

    /// World transform of the camera, used for change detection.
    pub fn transform(&self) -> Transform {
        let (scale, rotation, translation) =
            self.camera_to_world().to_scale_rotation_translation();
        Transform {
            translation,
            rotation,
            scale,
        }
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn forward(&self) -> glam::Vec3 {
        (self.target - self.eye).normalize_or_zero()
    }
}

pub struct CameraController {
    pub speed: f32,
}

impl CameraController {
    pub fn new(speed: f32) -> Self {
        Self { speed }
    }

    /// Translate the camera (eye and target together) for movement keys.
    ///
    /// Returns whether the event moved the camera.
    pub fn process_events(&self, camera: &mut Camera, event: &WindowEvent, delta: f32) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state,
                        virtual_keycode: Some(keycode),
                        ..
                    },
                ..
            } if *state == ElementState::Pressed => {
                let forward = camera.forward();
                let right = forward.cross(camera.up).normalize_or_zero();
                let offset = match keycode {
                    VirtualKeyCode::W => forward,
                    VirtualKeyCode::S => -forward,
                    VirtualKeyCode::D => right,
                    VirtualKeyCode::A => -right,
                    VirtualKeyCode::E => camera.up,
                    VirtualKeyCode::Q => -camera.up,
                    _ => return false,
                };
                let offset = offset * self.speed * delta;
                camera.eye += offset;
                camera.target += offset;
                tracing::debug!(?keycode, eye = ?camera.eye, "camera moved");
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_to_world_places_origin_at_eye() {
        let camera = Camera::default();
        let origin = camera.camera_to_world().transform_point3(glam::Vec3::ZERO);
        assert!(origin.abs_diff_eq(camera.eye, 1e-3));
    }

    #[test]
    fn inverse_projection_center_looks_down_negative_z() {
        let camera = Camera::default();
        let dir = camera.inverse_projection() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let dir = dir.truncate().normalize();
        assert!(dir.abs_diff_eq(glam::Vec3::NEG_Z, 1e-4));
    }

    #[test]
    fn transform_tracks_eye() {
        let mut camera = Camera::default();
        let before = camera.transform();
        assert_eq!(before, camera.transform());

        camera.eye.x += 1.0;
        assert_ne!(before, camera.transform());
    }

    #[test]
    fn zero_sized_aspect_is_ignored() {
        let mut camera = Camera::default();
        let aspect = camera.aspect;
        camera.set_aspect(0, 100);
        assert_eq!(camera.aspect, aspect);
        camera.set_aspect(200, 100);
        assert_eq!(camera.aspect, 2.0);
    }
}
