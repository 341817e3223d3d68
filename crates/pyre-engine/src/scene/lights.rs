use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Attenuation model: `1 / (constant + linear*d + quadratic*d^2)`.
///
/// The constants are shared across the whole point-light set.
pub const ATTENUATION_CONSTANT: f32 = 1.0;
pub const ATTENUATION_LINEAR: f32 = 0.7;
pub const ATTENUATION_QUADRATIC: f32 = 1.8;

/// Intensity below this fraction of the brightest channel counts as
/// invisible when deriving the attenuation radius.
const VISIBILITY_THRESHOLD: f32 = 5.0 / 256.0;

// Orbit parameters: each light circles the scene origin at its own radius
// and phase, derived from the light index. Cheap, repeatable animation that
// exercises the multi-light path without physics.
const ORBIT_SPEED: f32 = 0.5;
const ORBIT_BASE_RADIUS: f32 = 3.0;
const ORBIT_RADIUS_STEP: f32 = 0.35;
const ORBIT_HEIGHT: f32 = 1.5;

/// A point light in the set.
///
/// Created once at scene init at the origin with a randomized color;
/// the position is overwritten every frame by [`orbit_position`].
#[derive(Debug, Clone, Copy)]
pub struct PointLight {
    pub position: Vec3,
    /// Each channel in [0, 1].
    pub color: Vec3,
    /// Distance at which the light's contribution falls below the
    /// visibility threshold. Informational: usable for bounding-volume
    /// light culling, which the pipeline does not do yet.
    pub radius: f32,
}

/// The single spot light; follows the viewer like a flashlight.
#[derive(Debug, Clone, Copy)]
pub struct SpotLight {
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    /// Cosine of the inner cone angle.
    pub cutoff: f32,
    /// Cosine of the outer cone angle.
    pub outer_cutoff: f32,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            color: Vec3::ONE,
            cutoff: 12.5_f32.to_radians().cos(),
            outer_cutoff: 17.5_f32.to_radians().cos(),
        }
    }
}

/// Closed-form orbit for light `index` at `elapsed` seconds.
///
/// Radii grow linearly with the index and phases are offset by it, so the
/// orbits are deterministic and never coincide.
pub fn orbit_position(index: usize, elapsed: f32) -> Vec3 {
    let radius = ORBIT_BASE_RADIUS + ORBIT_RADIUS_STEP * index as f32;
    let phase = elapsed * ORBIT_SPEED + index as f32;
    Vec3::new(radius * phase.sin(), ORBIT_HEIGHT, radius * phase.cos())
}

/// Solves the attenuation quadratic for the distance at which intensity
/// falls below the visibility threshold.
///
/// Clamped so the result is finite and non-negative for every color in
/// [0,1]^3, including black.
pub fn derive_radius(color: Vec3, linear: f32, quadratic: f32) -> f32 {
    let max_channel = color.max_element().clamp(0.0, 1.0);
    let discriminant = (linear * linear
        - 4.0 * quadratic * (ATTENUATION_CONSTANT - max_channel / VISIBILITY_THRESHOLD))
        .max(0.0);
    ((-linear + discriminant.sqrt()) / (2.0 * quadratic)).max(0.0)
}

/// The scene's light set: N orbiting point lights plus one spot light.
#[derive(Debug, Clone)]
pub struct LightRig {
    lights: Vec<PointLight>,
    pub spot: SpotLight,
}

impl LightRig {
    /// Creates `count` point lights at the origin with seeded random colors
    /// in [0.5, 1.0) per channel. Same seed, same rig.
    pub fn procedural(count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let lights = (0..count)
            .map(|_| {
                let color = Vec3::new(
                    rng.random_range(0.5..1.0),
                    rng.random_range(0.5..1.0),
                    rng.random_range(0.5..1.0),
                );
                PointLight {
                    position: Vec3::ZERO,
                    color,
                    radius: derive_radius(color, ATTENUATION_LINEAR, ATTENUATION_QUADRATIC),
                }
            })
            .collect();

        Self {
            lights,
            spot: SpotLight::default(),
        }
    }

    /// Advances every point light along its orbit. Pure function of
    /// `elapsed` and the light index; never accumulates.
    pub fn advance(&mut self, elapsed: f32) {
        for (i, light) in self.lights.iter_mut().enumerate() {
            light.position = orbit_position(i, elapsed);
        }
    }

    /// Binds the spot light to the viewer for this frame.
    pub fn follow_camera(&mut self, position: Vec3, direction: Vec3) {
        self.spot.position = position;
        self.spot.direction = direction;
    }

    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ── radius derivation ─────────────────────────────────────────────────

    #[test]
    fn radius_is_monotone_in_max_channel() {
        let mut prev = 0.0f32;
        for step in 0..=20 {
            let channel = step as f32 / 20.0;
            let r = derive_radius(
                Vec3::splat(channel),
                ATTENUATION_LINEAR,
                ATTENUATION_QUADRATIC,
            );
            assert!(r >= prev, "radius regressed at channel {channel}");
            prev = r;
        }
    }

    #[test]
    fn radius_is_finite_and_non_negative_over_color_cube() {
        for r in 0..=4 {
            for g in 0..=4 {
                for b in 0..=4 {
                    let color = Vec3::new(r as f32, g as f32, b as f32) / 4.0;
                    let radius =
                        derive_radius(color, ATTENUATION_LINEAR, ATTENUATION_QUADRATIC);
                    assert!(radius.is_finite());
                    assert!(radius >= 0.0);
                }
            }
        }
    }

    #[test]
    fn black_light_has_zero_radius() {
        assert_eq!(
            derive_radius(Vec3::ZERO, ATTENUATION_LINEAR, ATTENUATION_QUADRATIC),
            0.0
        );
    }

    // ── orbits ────────────────────────────────────────────────────────────

    #[test]
    fn stepped_advance_matches_closed_form() {
        // Advance 0 -> 2s in 0.01s steps with no input; every light must land
        // exactly on the closed-form orbit coordinate for t = 2.0.
        let mut rig = LightRig::procedural(3, 7);
        let mut t = 0.0f32;
        while t < 2.0 {
            t += 0.01;
            rig.advance(t.min(2.0));
        }
        rig.advance(2.0);

        for (i, light) in rig.lights().iter().enumerate() {
            let expected = orbit_position(i, 2.0);
            assert_relative_eq!(light.position.x, expected.x, epsilon = 1e-6);
            assert_relative_eq!(light.position.y, expected.y, epsilon = 1e-6);
            assert_relative_eq!(light.position.z, expected.z, epsilon = 1e-6);
        }
    }

    #[test]
    fn orbits_have_distinct_radii() {
        let a = orbit_position(0, 1.0);
        let b = orbit_position(1, 1.0);
        let ra = (a.x * a.x + a.z * a.z).sqrt();
        let rb = (b.x * b.x + b.z * b.z).sqrt();
        assert!(rb > ra);
    }

    // ── rig ───────────────────────────────────────────────────────────────

    #[test]
    fn procedural_is_deterministic_per_seed() {
        let a = LightRig::procedural(8, 42);
        let b = LightRig::procedural(8, 42);
        for (la, lb) in a.lights().iter().zip(b.lights()) {
            assert_eq!(la.color, lb.color);
        }
    }

    #[test]
    fn colors_are_in_visible_range() {
        let rig = LightRig::procedural(16, 1);
        for light in rig.lights() {
            for channel in [light.color.x, light.color.y, light.color.z] {
                assert!((0.5..1.0).contains(&channel));
            }
            assert!(light.radius > 0.0);
        }
    }

    #[test]
    fn spot_follows_camera() {
        let mut rig = LightRig::procedural(1, 0);
        let pos = Vec3::new(1.0, 2.0, 3.0);
        let dir = Vec3::new(0.0, 0.0, -1.0);
        rig.follow_camera(pos, dir);
        assert_eq!(rig.spot.position, pos);
        assert_eq!(rig.spot.direction, dir);
    }
}
