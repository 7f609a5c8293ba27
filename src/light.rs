use crate::{transform::Transform, util::math::degree_to_radian};

/// Scene-wide directional light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub transform: Transform,
    pub intensity: f32,
}

impl DirectionalLight {
    /// Light rotated by `pitch` around X then `yaw` around Y, both in degrees.
    pub fn from_angles(pitch_degrees: f32, yaw_degrees: f32, intensity: f32) -> Self {
        let rotation = glam::Quat::from_euler(
            glam::EulerRot::YXZ,
            degree_to_radian(yaw_degrees),
            degree_to_radian(pitch_degrees),
            0.0,
        );
        Self {
            transform: Transform {
                rotation,
                ..Default::default()
            },
            intensity,
        }
    }

    /// Direction the light travels in.
    pub fn direction(&self) -> glam::Vec3 {
        self.transform.forward()
    }

    /// Packed `(dir_x, dir_y, dir_z, intensity)` as consumed by the renderer.
    pub fn packed(&self) -> glam::Vec4 {
        self.direction().extend(self.intensity)
    }

    pub fn rotate(&mut self, pitch_degrees: f32, yaw_degrees: f32) {
        let yaw = glam::Quat::from_rotation_y(degree_to_radian(yaw_degrees));
        let pitch = glam::Quat::from_rotation_x(degree_to_radian(pitch_degrees));
        self.transform.rotation = (yaw * self.transform.rotation * pitch).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_carries_intensity() {
        let light = DirectionalLight::from_angles(-90.0, 0.0, 1.5);
        let packed = light.packed();
        assert_eq!(packed.w, 1.5);
        assert!(packed.truncate().abs_diff_eq(glam::Vec3::NEG_Y, 1e-5));
    }

    #[test]
    fn rotate_changes_transform() {
        let mut light = DirectionalLight::from_angles(-45.0, 30.0, 1.0);
        let before = light.transform;
        light.rotate(0.0, 5.0);
        assert_ne!(before, light.transform);
        assert!((light.direction().length() - 1.0).abs() < 1e-5);
    }
}
