use glam::{Mat4, Quat, Vec3};

use crate::render::MeshKind;

/// One object in the scene: a mesh primitive with a transform and material
/// attributes for the G-buffer.
#[derive(Debug, Clone, Copy)]
pub struct Placement {
    pub mesh: MeshKind,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Diffuse color written to the albedo attachment.
    pub albedo: Vec3,
    /// Specular intensity written to the albedo attachment's alpha channel.
    pub specular: f32,
}

impl Placement {
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Scene content consumed by the shadow and geometry passes.
///
/// Immutable after construction. The pass sequencer takes this by reference
/// and is not tied to any particular scene.
#[derive(Debug, Clone)]
pub struct SceneDescription {
    pub placements: Vec<Placement>,
    /// Representative light position the shadow pass renders from.
    pub key_light_position: Vec3,
    /// Half-extent of the orthographic shadow volume; covers the scene.
    pub shadow_extent: f32,
}

impl SceneDescription {
    /// The demo scene: a ground quad under a grid of boxes.
    pub fn demo_grid() -> Self {
        let mut placements = Vec::new();

        placements.push(Placement {
            mesh: MeshKind::Quad,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::new(30.0, 1.0, 30.0),
            albedo: Vec3::splat(0.65),
            specular: 0.1,
        });

        const GRID: i32 = 2; // boxes at -2..=2 on both axes
        const SPACING: f32 = 2.5;
        for gx in -GRID..=GRID {
            for gz in -GRID..=GRID {
                // Deterministic per-cell tint so adjacent boxes read apart.
                let fx = (gx + GRID) as f32 / (2 * GRID) as f32;
                let fz = (gz + GRID) as f32 / (2 * GRID) as f32;
                placements.push(Placement {
                    mesh: MeshKind::Cube,
                    translation: Vec3::new(gx as f32 * SPACING, 0.5, gz as f32 * SPACING),
                    rotation: Quat::IDENTITY,
                    scale: Vec3::ONE,
                    albedo: Vec3::new(0.5 + 0.5 * fx, 0.45, 0.5 + 0.5 * fz),
                    specular: 0.5,
                });
            }
        }

        Self {
            placements,
            key_light_position: Vec3::new(-8.0, 12.0, -6.0),
            shadow_extent: 12.0,
        }
    }

    /// Light-space transform for the shadow pass: an orthographic volume
    /// covering the scene extent, looking from the key light toward the
    /// origin.
    pub fn shadow_view_projection(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.key_light_position, Vec3::ZERO, Vec3::Y);
        let e = self.shadow_extent;
        let far = self.key_light_position.length() + e * 2.0;
        let proj = Mat4::orthographic_rh(-e, e, -e, e, 1.0, far);
        proj * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn demo_grid_has_ground_and_boxes() {
        let scene = SceneDescription::demo_grid();
        let quads = scene
            .placements
            .iter()
            .filter(|p| p.mesh == MeshKind::Quad)
            .count();
        let cubes = scene
            .placements
            .iter()
            .filter(|p| p.mesh == MeshKind::Cube)
            .count();
        assert_eq!(quads, 1);
        assert_eq!(cubes, 25);
    }

    #[test]
    fn model_matrix_applies_translation() {
        let p = Placement {
            mesh: MeshKind::Cube,
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            albedo: Vec3::ONE,
            specular: 0.0,
        };
        let origin = p.model_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_eq!(origin, Vec4::new(1.0, 2.0, 3.0, 1.0));
    }

    #[test]
    fn shadow_volume_contains_scene_origin() {
        let scene = SceneDescription::demo_grid();
        let clip = scene.shadow_view_projection() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() <= 1.0);
        assert!(ndc.y.abs() <= 1.0);
        assert!((0.0..=1.0).contains(&ndc.z));
    }
}
