pub mod math {
    pub fn degree_to_radian(degree: f32) -> f32 {
        degree * std::f32::consts::PI / 180.0
    }

    /// Value may exceed 1.
    pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> glam::Vec3 {
        if saturation <= 0.0 {
            return glam::Vec3::splat(value);
        }

        let h = (hue.fract() + 1.0).fract() * 6.0;
        let sector = h.floor();
        let f = h - sector;
        let p = value * (1.0 - saturation);
        let q = value * (1.0 - saturation * f);
        let t = value * (1.0 - saturation * (1.0 - f));

        match sector as u32 {
            0 => glam::Vec3::new(value, t, p),
            1 => glam::Vec3::new(q, value, p),
            2 => glam::Vec3::new(p, value, t),
            3 => glam::Vec3::new(p, q, value),
            4 => glam::Vec3::new(t, p, value),
            _ => glam::Vec3::new(value, p, q),
        }
    }

    pub fn unit_disk_point(u: f32, v: f32) -> glam::Vec2 {
        let r = u.sqrt();
        let theta = 2.0 * std::f32::consts::PI * v;
        glam::Vec2::new(r * theta.cos(), r * theta.sin())
    }

}
