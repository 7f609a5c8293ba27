//! Reference single-sample renderer running on the host.
//!
//! Traces one jittered primary ray per pixel against the sphere records and
//! the ground plane, with a shadowed directional light, emission and a few
//! smoothness-perturbed reflective bounces. Output is noisy by construction;
//! accumulation turns it into a converged image.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    accumulation::HdrImage,
    error::Result,
    frame::{RenderParams, SampleRenderer},
    scene::Sphere,
};

const MAX_BOUNCES: u32 = 4;
const HIT_EPSILON: f32 = 1e-3;

struct Ray {
    origin: glam::Vec3,
    direction: glam::Vec3,
}

struct Hit {
    distance: f32,
    position: glam::Vec3,
    normal: glam::Vec3,
    albedo: glam::Vec3,
    specular: glam::Vec3,
    smoothness: f32,
    emission: glam::Vec3,
}

#[derive(Debug, Clone, Copy)]
pub struct CpuRenderer {
    pub ground_albedo: glam::Vec3,
    pub ground_specular: glam::Vec3,
}

impl Default for CpuRenderer {
    fn default() -> Self {
        Self {
            ground_albedo: glam::Vec3::splat(0.8),
            ground_specular: glam::Vec3::splat(0.04),
        }
    }
}

impl SampleRenderer for CpuRenderer {
    fn dispatch(&mut self, params: &RenderParams<'_>, target: &mut HdrImage) -> Result<()> {
        let resolution = target.resolution();
        let width = resolution.width as f32;
        let height = resolution.height as f32;
        let mut rng = StdRng::seed_from_u64(
            ((params.seed.to_bits() as u64) << 32) | params.sample_index as u64,
        );

        for (index, pixel) in target.pixels_mut().iter_mut().enumerate() {
            let x = (index % resolution.width as usize) as f32;
            let y = (index / resolution.width as usize) as f32;
            let uv = glam::Vec2::new(
                (x + params.pixel_offset.x) / width * 2.0 - 1.0,
                1.0 - (y + params.pixel_offset.y) / height * 2.0,
            );
            let ray = camera_ray(params, uv);
            *pixel = self.trace(params, ray, &mut rng).extend(1.0);
        }
        Ok(())
    }
}

fn camera_ray(params: &RenderParams<'_>, uv: glam::Vec2) -> Ray {
    let origin = params.camera_to_world.transform_point3(glam::Vec3::ZERO);
    let direction = (params.inverse_projection * glam::Vec4::new(uv.x, uv.y, 0.0, 1.0)).truncate();
    let direction = params
        .camera_to_world
        .transform_vector3(direction)
        .normalize_or_zero();
    Ray { origin, direction }
}

impl CpuRenderer {
    fn trace<R: Rng>(&self, params: &RenderParams<'_>, mut ray: Ray, rng: &mut R) -> glam::Vec3 {
        let light = params.directional_light;
        let to_light = -light.truncate().normalize_or_zero();
        let mut energy = glam::Vec3::ONE;
        let mut result = glam::Vec3::ZERO;

        for _ in 0..MAX_BOUNCES {
            let Some(hit) = self.intersect(params.scene.spheres(), &ray) else {
                result += energy * sky(params, ray.direction);
                break;
            };

            result += energy * hit.emission;

            let shadow = Ray {
                origin: hit.position + hit.normal * HIT_EPSILON,
                direction: to_light,
            };
            if self.intersect(params.scene.spheres(), &shadow).is_none() {
                let lambert = hit.normal.dot(to_light).max(0.0);
                result += energy * hit.albedo * lambert * light.w;
            }

            energy *= hit.specular;
            if energy.max_element() < 1e-3 {
                break;
            }

            let reflected = ray.direction - 2.0 * ray.direction.dot(hit.normal) * hit.normal;
            let roughness = 1.0 - hit.smoothness;
            let direction = (reflected + roughness * random_in_unit_sphere(rng)).normalize_or_zero();
            ray = Ray {
                origin: hit.position + hit.normal * HIT_EPSILON,
                direction: if direction.dot(hit.normal) > 0.0 {
                    direction
                } else {
                    reflected
                },
            };
        }

        result
    }

    fn intersect(&self, spheres: &[Sphere], ray: &Ray) -> Option<Hit> {
        let mut best: Option<Hit> = None;

        // Ground plane at y = 0
        if ray.direction.y < 0.0 {
            let distance = -ray.origin.y / ray.direction.y;
            if distance > 0.0 {
                best = Some(Hit {
                    distance,
                    position: ray.origin + ray.direction * distance,
                    normal: glam::Vec3::Y,
                    albedo: self.ground_albedo,
                    specular: self.ground_specular,
                    smoothness: 0.0,
                    emission: glam::Vec3::ZERO,
                });
            }
        }

        for sphere in spheres {
            // |o + t*d - c|^2 = r^2 with |d| = 1
            let oc = ray.origin - sphere.position;
            let b = oc.dot(ray.direction);
            let c = oc.dot(oc) - sphere.radius * sphere.radius;
            let discriminant = b * b - c;
            if discriminant < 0.0 {
                continue;
            }

            let root = discriminant.sqrt();
            let distance = if -b - root > 0.0 { -b - root } else { -b + root };
            if distance <= 0.0 || best.as_ref().is_some_and(|h| h.distance <= distance) {
                continue;
            }

            let position = ray.origin + ray.direction * distance;
            best = Some(Hit {
                distance,
                position,
                normal: (position - sphere.position).normalize_or_zero(),
                albedo: sphere.albedo,
                specular: sphere.specular,
                smoothness: sphere.smoothness,
                emission: sphere.emission,
            });
        }

        best
    }
}

fn sky(params: &RenderParams<'_>, direction: glam::Vec3) -> glam::Vec3 {
    match params.skybox {
        Some(skybox) => skybox.sample(direction),
        None => {
            let t = 0.5 * (direction.y + 1.0);
            glam::Vec3::ONE.lerp(glam::Vec3::new(0.5, 0.7, 1.0), t)
        }
    }
}

fn random_in_unit_sphere<R: Rng>(rng: &mut R) -> glam::Vec3 {
    loop {
        let p = glam::Vec3::new(rng.gen(), rng.gen(), rng.gen()) * 2.0 - glam::Vec3::ONE;
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}
