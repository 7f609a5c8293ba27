//! Procedural sphere scenes.
//!
//! Spheres are placed by rejection sampling: every candidate is drawn once,
//! tested against all previously accepted spheres, and either appended or
//! skipped. Overlap testing is linear in the number of accepted spheres, so a
//! full generation is quadratic in `count`. That is fine for a few hundred
//! spheres and is the scaling limit of this generator.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    error::{Error, Result},
    util::math::{hsv_to_rgb, unit_disk_point},
};

/// Size in bytes of one packed sphere record.
pub const SPHERE_RECORD_SIZE: usize = 56;

/// Upper bound on candidates per generation; overlap tests are quadratic.
pub const MAX_SPHERE_COUNT: u32 = 1 << 16;

const MAX_PREALLOCATED: u32 = 1024;

/// One sphere record, laid out exactly as the renderer reads it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Sphere {
    pub position: glam::Vec3,
    pub radius: f32,

    pub albedo: glam::Vec3,
    pub specular: glam::Vec3,
    pub smoothness: f32,
    pub emission: glam::Vec3,
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            position: glam::Vec3::ZERO,
            radius: 0.5,
            albedo: glam::Vec3::ONE,
            specular: glam::Vec3::ZERO,
            smoothness: 0.0,
            emission: glam::Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    /// Colored specular, no albedo.
    Metal,
    /// Colored albedo, fixed low specular.
    Dielectric,
    /// Light source, no albedo or specular.
    Emissive,
}

impl Sphere {
    /// Material branch implied by the record's field pattern.
    pub fn material(&self) -> MaterialKind {
        if self.emission != glam::Vec3::ZERO {
            MaterialKind::Emissive
        } else if self.albedo == glam::Vec3::ZERO {
            MaterialKind::Metal
        } else {
            MaterialKind::Dielectric
        }
    }

    pub fn overlaps(&self, other: &Sphere) -> bool {
        let min_distance = self.radius + other.radius;
        self.position.distance_squared(other.position) < min_distance * min_distance
    }
}

/// Probabilities and constants of the material branches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialDistribution {
    /// Fraction of spheres that are metal.
    pub metal_fraction: f32,
    /// Fraction of spheres that emit light.
    pub emissive_fraction: f32,
    /// HSV value range of emission colors.
    pub emission_value: (f32, f32),
    /// Specular reflectance of non-metal, non-emissive spheres.
    pub dielectric_specular: f32,
}

impl Default for MaterialDistribution {
    fn default() -> Self {
        Self {
            metal_fraction: 0.4,
            emissive_fraction: 0.2,
            emission_value: (3.0, 8.0),
            dielectric_specular: 0.04,
        }
    }
}

impl MaterialDistribution {
    fn validate(&self) -> Result<()> {
        let in_unit = |f: f32| (0.0..=1.0).contains(&f);
        if !in_unit(self.metal_fraction) || !in_unit(self.emissive_fraction) {
            return Err(Error::InvalidMaterialDistribution(format!(
                "fractions must lie in [0, 1], got metal {} and emissive {}",
                self.metal_fraction, self.emissive_fraction
            )));
        }
        if self.metal_fraction + self.emissive_fraction > 1.0 {
            return Err(Error::InvalidMaterialDistribution(format!(
                "metal {} and emissive {} fractions exceed 1",
                self.metal_fraction, self.emissive_fraction
            )));
        }
        let (low, high) = self.emission_value;
        if !(low > 0.0 && low <= high && high.is_finite()) {
            return Err(Error::InvalidMaterialDistribution(format!(
                "emission value range [{low}, {high}] is empty or not positive"
            )));
        }
        if !(0.0..=1.0).contains(&self.dielectric_specular) {
            return Err(Error::InvalidMaterialDistribution(format!(
                "dielectric specular {} outside [0, 1]",
                self.dielectric_specular
            )));
        }
        Ok(())
    }

    /// Fill in the material fields of an accepted sphere.
    fn apply<R: Rng>(&self, sphere: &mut Sphere, rng: &mut R) {
        let color = hsv_to_rgb(rng.gen(), rng.gen(), rng.gen());
        let chance: f32 = rng.gen();

        if chance < 1.0 - self.emissive_fraction {
            let metal = chance < self.metal_fraction;
            sphere.albedo = if metal { glam::Vec3::ZERO } else { color };
            sphere.specular = if metal {
                color
            } else {
                glam::Vec3::splat(self.dielectric_specular)
            };
            sphere.smoothness = rng.gen();
        } else {
            let (low, high) = self.emission_value;
            let value = low + rng.gen::<f32>() * (high - low);
            sphere.albedo = glam::Vec3::ZERO;
            sphere.specular = glam::Vec3::ZERO;
            sphere.emission = hsv_to_rgb(rng.gen(), rng.gen(), value);
        }
    }
}

/// Parameters of one scene generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneSettings {
    pub seed: u64,
    /// Number of candidates drawn; the accepted count is at most this.
    pub count: u32,
    /// Inclusive `(min, max)` sphere radius.
    pub radius_range: (f32, f32),
    /// Radius of the ground disk sphere centers are drawn from.
    pub placement_radius: f32,
    pub materials: MaterialDistribution,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            count: 100,
            radius_range: (3.0, 8.0),
            placement_radius: 100.0,
            materials: MaterialDistribution::default(),
        }
    }
}

impl SceneSettings {
    pub fn validate(&self) -> Result<()> {
        if self.count > MAX_SPHERE_COUNT {
            return Err(Error::TooManySpheres {
                count: self.count,
                max: MAX_SPHERE_COUNT,
            });
        }
        let (min, max) = self.radius_range;
        if !(min > 0.0 && min <= max && max.is_finite()) {
            return Err(Error::InvalidRadiusRange { min, max });
        }
        if !(self.placement_radius >= 0.0 && self.placement_radius.is_finite()) {
            return Err(Error::InvalidPlacementRadius(self.placement_radius));
        }
        self.materials.validate()
    }
}

/// Deterministic sphere scene generator.
#[derive(Debug, Clone)]
pub struct SceneGenerator {
    settings: SceneSettings,
}

impl SceneGenerator {
    /// Validate `settings` up front so generation itself cannot fail.
    pub fn new(settings: SceneSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// Run one pass of `count` candidates. Identical settings always produce
    /// an identical buffer.
    pub fn generate(&self) -> SceneBuffer {
        let settings = &self.settings;
        let mut rng = StdRng::seed_from_u64(settings.seed);
        let (min_radius, max_radius) = settings.radius_range;
        let mut spheres: Vec<Sphere> =
            Vec::with_capacity(settings.count.min(MAX_PREALLOCATED) as usize);
        let mut rejected = 0;

        for _ in 0..settings.count {
            let radius = min_radius + rng.gen::<f32>() * (max_radius - min_radius);
            let disk = unit_disk_point(rng.gen(), rng.gen()) * settings.placement_radius;
            let mut sphere = Sphere {
                position: glam::Vec3::new(disk.x, radius, disk.y),
                radius,
                albedo: glam::Vec3::ZERO,
                ..Default::default()
            };

            if spheres.iter().any(|other| sphere.overlaps(other)) {
                rejected += 1;
                continue;
            }

            settings.materials.apply(&mut sphere, &mut rng);
            spheres.push(sphere);
        }

        tracing::debug!(
            seed = settings.seed,
            accepted = spheres.len(),
            rejected,
            "generated sphere scene"
        );
        if spheres.is_empty() {
            tracing::warn!(seed = settings.seed, "generated scene has no spheres");
        }

        SceneBuffer { spheres, rejected }
    }
}

/// Accepted spheres of one activation, in generation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneBuffer {
    spheres: Vec<Sphere>,
    rejected: u32,
}

impl SceneBuffer {
    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }

    /// Number of candidates skipped because they overlapped.
    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    /// Packed records, `SPHERE_RECORD_SIZE` bytes each.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.spheres)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(settings: SceneSettings) -> SceneBuffer {
        SceneGenerator::new(settings).unwrap().generate()
    }

    fn seeded(seed: u64) -> SceneSettings {
        SceneSettings {
            seed,
            ..Default::default()
        }
    }

    #[test]
    fn record_layout_is_56_bytes() {
        assert_eq!(std::mem::size_of::<Sphere>(), SPHERE_RECORD_SIZE);

        let scene = generate(seeded(3));
        assert_eq!(scene.as_bytes().len(), scene.len() * SPHERE_RECORD_SIZE);
    }

    #[test]
    fn same_seed_is_bit_identical() {
        let a = generate(seeded(42));
        let b = generate(seeded(42));
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_eq!(a.rejected(), b.rejected());
    }

    #[test]
    fn different_seeds_differ() {
        assert_ne!(generate(seeded(1)), generate(seeded(2)));
    }

    #[test]
    fn accepted_spheres_never_overlap() {
        for seed in 0..8 {
            let scene = generate(seeded(seed));
            let spheres = scene.spheres();
            for (i, a) in spheres.iter().enumerate() {
                for b in &spheres[i + 1..] {
                    let min = a.radius + b.radius;
                    assert!(a.position.distance_squared(b.position) >= min * min);
                }
            }
        }
    }

    #[test]
    fn spheres_rest_on_ground_inside_disk() {
        let settings = seeded(7);
        for sphere in generate(settings).spheres() {
            assert!(sphere.radius >= 3.0 && sphere.radius <= 8.0);
            assert_eq!(sphere.position.y, sphere.radius);
            let flat = glam::Vec2::new(sphere.position.x, sphere.position.z);
            assert!(flat.length() <= settings.placement_radius + 1e-3);
        }
    }

    #[test]
    fn accepted_plus_rejected_is_count() {
        let scene = generate(seeded(11));
        assert_eq!(scene.len() as u32 + scene.rejected(), 100);
        assert!(scene.rejected() > 0);
    }

    #[test]
    fn material_branches_are_exclusive() {
        let mut seen = [false; 3];
        for seed in 0..4 {
            for sphere in generate(seeded(seed)).spheres() {
                match sphere.material() {
                    MaterialKind::Emissive => {
                        seen[0] = true;
                        assert_eq!(sphere.albedo, glam::Vec3::ZERO);
                        assert_eq!(sphere.specular, glam::Vec3::ZERO);
                    }
                    MaterialKind::Metal => {
                        seen[1] = true;
                        assert_eq!(sphere.emission, glam::Vec3::ZERO);
                        assert_ne!(sphere.specular, glam::Vec3::ZERO);
                    }
                    MaterialKind::Dielectric => {
                        seen[2] = true;
                        assert_eq!(sphere.emission, glam::Vec3::ZERO);
                        assert_eq!(sphere.specular, glam::Vec3::splat(0.04));
                    }
                }
            }
        }
        assert_eq!(seen, [true; 3]);
    }

    #[test]
    fn emission_uses_bright_values() {
        let materials = MaterialDistribution {
            metal_fraction: 0.0,
            emissive_fraction: 1.0,
            ..Default::default()
        };
        let scene = generate(SceneSettings {
            materials,
            ..seeded(5)
        });
        assert!(!scene.is_empty());
        for sphere in scene.spheres() {
            assert_eq!(sphere.material(), MaterialKind::Emissive);
            assert!(sphere.emission.max_element() >= 3.0 - 1e-4);
        }
    }

    #[test]
    fn zero_count_is_an_empty_scene() {
        let scene = generate(SceneSettings {
            count: 0,
            ..Default::default()
        });
        assert!(scene.is_empty());
        assert!(scene.as_bytes().is_empty());
    }

    #[test]
    fn degenerate_placement_keeps_only_first_sphere() {
        let scene = generate(SceneSettings {
            count: 50,
            placement_radius: 0.0,
            ..Default::default()
        });
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.rejected(), 49);
    }

    #[test]
    fn invalid_settings_fail_fast() {
        let bad_range = SceneSettings {
            radius_range: (8.0, 3.0),
            ..Default::default()
        };
        assert!(matches!(
            SceneGenerator::new(bad_range),
            Err(Error::InvalidRadiusRange { .. })
        ));

        let zero_radius = SceneSettings {
            radius_range: (0.0, 3.0),
            ..Default::default()
        };
        assert!(SceneGenerator::new(zero_radius).is_err());

        let negative_placement = SceneSettings {
            placement_radius: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            SceneGenerator::new(negative_placement),
            Err(Error::InvalidPlacementRadius(_))
        ));

        let huge_count = SceneSettings {
            count: u32::MAX,
            ..Default::default()
        };
        assert!(matches!(
            SceneGenerator::new(huge_count),
            Err(Error::TooManySpheres { .. })
        ));
        assert!(SceneGenerator::new(SceneSettings {
            count: MAX_SPHERE_COUNT,
            ..Default::default()
        })
        .is_ok());

        let too_many = SceneSettings {
            materials: MaterialDistribution {
                metal_fraction: 0.7,
                emissive_fraction: 0.5,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            SceneGenerator::new(too_many),
            Err(Error::InvalidMaterialDistribution(_))
        ));
    }
}
