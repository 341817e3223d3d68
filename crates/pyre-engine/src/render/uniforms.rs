use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::scene::{
    ATTENUATION_CONSTANT, ATTENUATION_LINEAR, ATTENUATION_QUADRATIC, LightRig, Placement,
};

/// Fixed capacity of the light array in the lighting uniform. The CPU-side
/// rig may hold fewer; `count` says how many are live.
pub const MAX_POINT_LIGHTS: usize = 32;

/// Per-view matrices for the geometry and forward passes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub light_space: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new(view: Mat4, proj: Mat4, light_space: Mat4) -> Self {
        Self {
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            light_space: light_space.to_cols_array_2d(),
        }
    }
}

/// Light-space transform for the shadow pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ShadowUniform {
    pub light_space: [[f32; 4]; 4],
}

impl ShadowUniform {
    pub fn new(light_space: Mat4) -> Self {
        Self {
            light_space: light_space.to_cols_array_2d(),
        }
    }
}

/// One point light, packed for the uniform array: xyz position + radius,
/// then rgb color.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuPointLight {
    pub position_radius: [f32; 4],
    pub color: [f32; 4],
}

/// Everything the lighting fragment shader needs, in one uniform block.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightsUniform {
    pub view_position: [f32; 4],
    pub spot_position: [f32; 4],
    /// xyz spot direction, w cosine of the inner cone angle.
    pub spot_direction_cutoff: [f32; 4],
    /// rgb spot color, w cosine of the outer cone angle.
    pub spot_color_outer: [f32; 4],
    /// x constant, y linear, z quadratic.
    pub attenuation: [f32; 4],
    /// x holds the live light count; padded to 16 bytes.
    pub count: [u32; 4],
    pub lights: [GpuPointLight; MAX_POINT_LIGHTS],
}

impl LightsUniform {
    /// Packs the rig for upload. Lights beyond [`MAX_POINT_LIGHTS`] are
    /// dropped; slots past `count` stay zeroed.
    pub fn from_rig(rig: &LightRig, view_position: Vec3) -> Self {
        let mut lights = [GpuPointLight::zeroed(); MAX_POINT_LIGHTS];
        let live = rig.lights().len().min(MAX_POINT_LIGHTS);
        for (slot, light) in lights.iter_mut().zip(&rig.lights()[..live]) {
            *slot = GpuPointLight {
                position_radius: [
                    light.position.x,
                    light.position.y,
                    light.position.z,
                    light.radius,
                ],
                color: [light.color.x, light.color.y, light.color.z, 0.0],
            };
        }

        let spot = rig.spot;
        Self {
            view_position: [view_position.x, view_position.y, view_position.z, 0.0],
            spot_position: [spot.position.x, spot.position.y, spot.position.z, 0.0],
            spot_direction_cutoff: [
                spot.direction.x,
                spot.direction.y,
                spot.direction.z,
                spot.cutoff,
            ],
            spot_color_outer: [spot.color.x, spot.color.y, spot.color.z, spot.outer_cutoff],
            attenuation: [
                ATTENUATION_CONSTANT,
                ATTENUATION_LINEAR,
                ATTENUATION_QUADRATIC,
                0.0,
            ],
            count: [live as u32, 0, 0, 0],
            lights,
        }
    }
}

/// Per-draw data fed through an instance vertex buffer: model matrix columns
/// at locations 3-6, material color (+ specular in alpha) at 7.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MeshInstance {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl MeshInstance {
    const ATTRS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        3 => Float32x4, 4 => Float32x4, 5 => Float32x4, 6 => Float32x4, 7 => Float32x4
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }

    pub fn from_placement(placement: &Placement) -> Self {
        Self {
            model: placement.model_matrix().to_cols_array_2d(),
            color: [
                placement.albedo.x,
                placement.albedo.y,
                placement.albedo.z,
                placement.specular,
            ],
        }
    }

    /// A small emissive marker cube drawn at a light's position in the
    /// forward pass.
    pub fn marker(position: Vec3, color: Vec3) -> Self {
        let model = Mat4::from_scale_rotation_translation(
            Vec3::splat(0.125),
            glam::Quat::IDENTITY,
            position,
        );
        Self {
            model: model.to_cols_array_2d(),
            color: [color.x, color.y, color.z, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_sizes_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<CameraUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<LightsUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<GpuPointLight>(), 32);
    }

    #[test]
    fn from_rig_reports_live_count() {
        let rig = LightRig::procedural(5, 3);
        let u = LightsUniform::from_rig(&rig, Vec3::ZERO);
        assert_eq!(u.count[0], 5);
        // slot past the live range stays zeroed
        assert_eq!(u.lights[5].color, [0.0; 4]);
    }

    #[test]
    fn from_rig_truncates_to_capacity() {
        let rig = LightRig::procedural(MAX_POINT_LIGHTS + 8, 3);
        let u = LightsUniform::from_rig(&rig, Vec3::ZERO);
        assert_eq!(u.count[0], MAX_POINT_LIGHTS as u32);
    }

    #[test]
    fn from_rig_packs_radius_with_position() {
        let mut rig = LightRig::procedural(1, 9);
        rig.advance(1.0);
        let u = LightsUniform::from_rig(&rig, Vec3::ZERO);
        let light = rig.lights()[0];
        assert_eq!(u.lights[0].position_radius[1], light.position.y);
        assert_eq!(u.lights[0].position_radius[3], light.radius);
    }
}
