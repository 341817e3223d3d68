use anyhow::Result;
use winit::dpi::PhysicalSize;

/// World-space position; shadow visibility term in alpha.
pub const POSITION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// World-space normal.
pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Albedo rgb; specular intensity in alpha.
pub const ALBEDO_SPEC_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Dimensions for the G-buffer attachments, decided before any texture is
/// created so the whole set can be validated and allocated together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GBufferPlan {
    pub width: u32,
    pub height: u32,
}

impl GBufferPlan {
    /// Plans attachments matching the drawable size. Zero dimensions (a
    /// minimized window) are clamped to 1 so texture creation stays valid.
    pub fn new(size: PhysicalSize<u32>) -> Self {
        Self {
            width: size.width.max(1),
            height: size.height.max(1),
        }
    }

    /// All attachments share one size, so one check covers the set. Failing
    /// here means no attachment is created at all.
    pub fn validate(&self, max_dimension: u32) -> Result<()> {
        anyhow::ensure!(
            self.width <= max_dimension && self.height <= max_dimension,
            "G-buffer size {}x{} exceeds device limit {}",
            self.width,
            self.height,
            max_dimension,
        );
        Ok(())
    }

    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

/// The G-buffer: three color attachments plus depth, and the forward-pass
/// depth target the resolve step copies into.
///
/// Created and destroyed as a unit. A size mismatch against the drawable is
/// handled by [`GeometryBuffer::resize`] at the top of the frame, never
/// mid-pass.
pub struct GeometryBuffer {
    plan: GBufferPlan,

    position: wgpu::Texture,
    normal: wgpu::Texture,
    albedo_spec: wgpu::Texture,
    depth: wgpu::Texture,
    forward_depth: wgpu::Texture,

    pub position_view: wgpu::TextureView,
    pub normal_view: wgpu::TextureView,
    pub albedo_spec_view: wgpu::TextureView,
    pub depth_view: wgpu::TextureView,
    pub forward_depth_view: wgpu::TextureView,
}

impl GeometryBuffer {
    /// Creates every attachment or none: the plan is validated against the
    /// device limit before the first allocation.
    pub fn create(device: &wgpu::Device, plan: GBufferPlan) -> Result<Self> {
        plan.validate(device.limits().max_texture_dimension_2d)?;

        let color = |label, format| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: plan.extent(),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
        };

        let position = color("gbuffer position", POSITION_FORMAT);
        let normal = color("gbuffer normal", NORMAL_FORMAT);
        let albedo_spec = color("gbuffer albedo+spec", ALBEDO_SPEC_FORMAT);

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("gbuffer depth"),
            size: plan.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let forward_depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("forward depth"),
            size: plan.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = |t: &wgpu::Texture| t.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            plan,
            position_view: view(&position),
            normal_view: view(&normal),
            albedo_spec_view: view(&albedo_spec),
            depth_view: view(&depth),
            forward_depth_view: view(&forward_depth),
            position,
            normal,
            albedo_spec,
            depth,
            forward_depth,
        })
    }

    pub fn plan(&self) -> GBufferPlan {
        self.plan
    }

    pub fn depth_texture(&self) -> &wgpu::Texture {
        &self.depth
    }

    pub fn forward_depth_texture(&self) -> &wgpu::Texture {
        &self.forward_depth
    }

    /// Recreates the attachment set for a new drawable size. No-op when the
    /// plan already matches.
    pub fn resize(&mut self, device: &wgpu::Device, plan: GBufferPlan) -> Result<()> {
        if plan == self.plan {
            return Ok(());
        }
        let next = Self::create(device, plan)?;
        let prev = std::mem::replace(self, next);
        prev.destroy();
        Ok(())
    }

    /// Explicitly frees the GPU allocations instead of waiting for GC.
    pub fn destroy(self) {
        self.position.destroy();
        self.normal.destroy();
        self.albedo_spec.destroy();
        self.depth.destroy();
        self.forward_depth.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_matches_drawable_size() {
        let plan = GBufferPlan::new(PhysicalSize::new(1200, 800));
        assert_eq!(plan.width, 1200);
        assert_eq!(plan.height, 800);
    }

    #[test]
    fn plan_clamps_zero_dimensions() {
        let plan = GBufferPlan::new(PhysicalSize::new(0, 0));
        assert_eq!(plan.width, 1);
        assert_eq!(plan.height, 1);
    }

    #[test]
    fn plan_rejects_oversized_dimensions() {
        let plan = GBufferPlan::new(PhysicalSize::new(10_000, 600));
        assert!(plan.validate(8192).is_err());
        assert!(plan.validate(16_384).is_ok());
    }

    #[test]
    fn extent_is_single_layer() {
        let extent = GBufferPlan::new(PhysicalSize::new(640, 480)).extent();
        assert_eq!(extent.width, 640);
        assert_eq!(extent.height, 480);
        assert_eq!(extent.depth_or_array_layers, 1);
    }
}
