use anyhow::Result;
use std::ops::Range;
use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::scene::{LightRig, SceneDescription};

use super::ctx::{RenderCtx, RenderTarget};
use super::gbuffer::{GBufferPlan, GeometryBuffer};
use super::mesh::{MeshCache, MeshKind};
use super::pipelines::Pipelines;
use super::shadow::ShadowMap;
use super::uniforms::{CameraUniform, LightsUniform, MeshInstance, ShadowUniform};

/// The passes of one frame, in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Depth-only render from the key light into the shadow map.
    Shadow,
    /// Scene geometry into the G-buffer attachments.
    Geometry,
    /// Fullscreen shading of the G-buffer into the surface.
    Lighting,
    /// Copy of the G-buffer depth into the forward pass's depth target.
    DepthResolve,
    /// Unlit overlays (light markers) on top of the shaded surface.
    Forward,
}

/// The fixed pass order. Every frame that renders at all runs the whole
/// sequence; there is no partial frame.
pub fn frame_passes() -> [PassKind; 5] {
    [
        PassKind::Shadow,
        PassKind::Geometry,
        PassKind::Lighting,
        PassKind::DepthResolve,
        PassKind::Forward,
    ]
}

/// Contiguous run of instances sharing one mesh in the scene instance
/// buffer.
struct InstanceBatch {
    mesh: MeshKind,
    instances: Range<u32>,
}

/// Records the full deferred frame.
///
/// GPU resources are created lazily on first use and kept across frames;
/// only the G-buffer set reacts to resizes, at the top of the frame.
#[derive(Default)]
pub struct Renderer {
    pipelines: Option<Pipelines>,
    meshes: MeshCache,

    gbuffer: Option<GeometryBuffer>,
    shadow_map: Option<ShadowMap>,
    gbuffer_sampler: Option<wgpu::Sampler>,

    camera_ubo: Option<wgpu::Buffer>,
    shadow_ubo: Option<wgpu::Buffer>,
    lights_ubo: Option<wgpu::Buffer>,

    shadow_bind: Option<wgpu::BindGroup>,
    geometry_bind: Option<wgpu::BindGroup>,
    lights_bind: Option<wgpu::BindGroup>,
    gbuffer_bind: Option<wgpu::BindGroup>,
    forward_bind: Option<wgpu::BindGroup>,

    // Scene placements, grouped by mesh and uploaded once.
    scene_instances: Option<wgpu::Buffer>,
    scene_batches: Vec<InstanceBatch>,

    // Light markers, rewritten every frame.
    marker_instances: Option<wgpu::Buffer>,
    marker_capacity: u32,
    marker_count: u32,
}

impl Renderer {
    /// Records the whole pass sequence for one frame into the target's
    /// encoder. Errors are resource-creation failures and are fatal.
    pub fn render_frame(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        camera: &Camera,
        lights: &LightRig,
        scene: &SceneDescription,
    ) -> Result<()> {
        self.ensure_pipelines(ctx);
        self.ensure_render_targets(ctx)?;
        self.ensure_static_buffers(ctx, scene);
        self.ensure_bindings(ctx);

        self.write_uniforms(ctx, camera, lights, scene);
        self.write_markers(ctx, lights);

        for pass in frame_passes() {
            match pass {
                PassKind::Shadow => self.record_shadow_pass(target),
                PassKind::Geometry => self.record_geometry_pass(target),
                PassKind::Lighting => self.record_lighting_pass(target),
                PassKind::DepthResolve => self.record_depth_resolve(target),
                PassKind::Forward => self.record_forward_pass(target),
            }
        }

        Ok(())
    }

    /// Frees the GPU-resident targets explicitly, in reverse acquisition
    /// order, instead of leaning on driver cleanup at process exit. The
    /// renderer recreates them lazily if another frame is rendered.
    pub fn destroy(&mut self) {
        self.gbuffer_bind = None;
        self.geometry_bind = None;
        if let Some(gbuffer) = self.gbuffer.take() {
            gbuffer.destroy();
        }
        if let Some(shadow_map) = self.shadow_map.take() {
            shadow_map.destroy();
        }
    }

    fn ensure_pipelines(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipelines.is_none() {
            self.pipelines = Some(Pipelines::create(ctx.device, ctx.surface_format));
        }
    }

    /// Creates or resizes the G-buffer to match the drawable. The resize is
    /// deferred to here so attachments never change mid-frame.
    fn ensure_render_targets(&mut self, ctx: &RenderCtx<'_>) -> Result<()> {
        let plan = GBufferPlan::new(ctx.size);

        if let Some(gbuffer) = self.gbuffer.as_mut() {
            if gbuffer.plan() != plan {
                log::debug!("resizing G-buffer to {}x{}", plan.width, plan.height);
                gbuffer.resize(ctx.device, plan)?;
                // Views changed; the lighting bind group must be rebuilt.
                self.gbuffer_bind = None;
            }
        } else {
            log::debug!("creating G-buffer at {}x{}", plan.width, plan.height);
            self.gbuffer = Some(GeometryBuffer::create(ctx.device, plan)?);
        }

        if self.shadow_map.is_none() {
            self.shadow_map = Some(ShadowMap::create(ctx.device));
        }

        Ok(())
    }

    fn ensure_static_buffers(&mut self, ctx: &RenderCtx<'_>, scene: &SceneDescription) {
        self.meshes.ensure(ctx.device, MeshKind::Cube);
        self.meshes.ensure(ctx.device, MeshKind::Quad);
        self.meshes.ensure(ctx.device, MeshKind::FullscreenQuad);

        if self.scene_instances.is_none() {
            let mut data: Vec<MeshInstance> = Vec::with_capacity(scene.placements.len());
            let mut batches = Vec::new();

            for mesh in [MeshKind::Cube, MeshKind::Quad] {
                let start = data.len() as u32;
                data.extend(
                    scene
                        .placements
                        .iter()
                        .filter(|p| p.mesh == mesh)
                        .map(MeshInstance::from_placement),
                );
                let end = data.len() as u32;
                if end > start {
                    batches.push(InstanceBatch {
                        mesh,
                        instances: start..end,
                    });
                }
            }

            self.scene_instances = Some(ctx.device.create_buffer_init(
                &wgpu::util::BufferInitDescriptor {
                    label: Some("scene instances"),
                    contents: bytemuck::cast_slice(&data),
                    usage: wgpu::BufferUsages::VERTEX,
                },
            ));
            self.scene_batches = batches;
        }

        let uniform = |label, size: u64| {
            ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };

        if self.camera_ubo.is_none() {
            self.camera_ubo = Some(uniform(
                "camera ubo",
                std::mem::size_of::<CameraUniform>() as u64,
            ));
        }
        if self.shadow_ubo.is_none() {
            self.shadow_ubo = Some(uniform(
                "shadow ubo",
                std::mem::size_of::<ShadowUniform>() as u64,
            ));
        }
        if self.lights_ubo.is_none() {
            self.lights_ubo = Some(uniform(
                "lights ubo",
                std::mem::size_of::<LightsUniform>() as u64,
            ));
        }
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>) {
        if self.gbuffer_sampler.is_none() {
            self.gbuffer_sampler = Some(ctx.device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("gbuffer sampler"),
                mag_filter: wgpu::FilterMode::Nearest,
                min_filter: wgpu::FilterMode::Nearest,
                ..Default::default()
            }));
        }

        let (Some(pipelines), Some(gbuffer), Some(shadow_map)) =
            (&self.pipelines, &self.gbuffer, &self.shadow_map)
        else {
            return;
        };
        let (Some(camera_ubo), Some(shadow_ubo), Some(lights_ubo)) =
            (&self.camera_ubo, &self.shadow_ubo, &self.lights_ubo)
        else {
            return;
        };

        if self.shadow_bind.is_none() {
            self.shadow_bind = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("shadow bind"),
                layout: &pipelines.shadow_bgl,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: shadow_ubo.as_entire_binding(),
                }],
            }));
        }

        if self.geometry_bind.is_none() {
            self.geometry_bind = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("geometry bind"),
                layout: &pipelines.geometry_bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: camera_ubo.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&shadow_map.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&shadow_map.sampler),
                    },
                ],
            }));
        }

        if self.lights_bind.is_none() {
            self.lights_bind = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("lights bind"),
                layout: &pipelines.lights_bgl,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: lights_ubo.as_entire_binding(),
                }],
            }));
        }

        if self.gbuffer_bind.is_none()
            && let Some(sampler) = &self.gbuffer_sampler
        {
            self.gbuffer_bind = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("gbuffer bind"),
                layout: &pipelines.gbuffer_bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&gbuffer.position_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&gbuffer.normal_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&gbuffer.albedo_spec_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            }));
        }

        if self.forward_bind.is_none() {
            self.forward_bind = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("forward bind"),
                layout: &pipelines.forward_bgl,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_ubo.as_entire_binding(),
                }],
            }));
        }
    }

    fn write_uniforms(
        &self,
        ctx: &RenderCtx<'_>,
        camera: &Camera,
        lights: &LightRig,
        scene: &SceneDescription,
    ) {
        let light_space = scene.shadow_view_projection();

        if let Some(ubo) = &self.shadow_ubo {
            ctx.queue
                .write_buffer(ubo, 0, bytemuck::bytes_of(&ShadowUniform::new(light_space)));
        }

        if let Some(ubo) = &self.camera_ubo {
            let u = CameraUniform::new(
                camera.view_matrix(),
                camera.projection(ctx.aspect_ratio()),
                light_space,
            );
            ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&u));
        }

        if let Some(ubo) = &self.lights_ubo {
            let u = LightsUniform::from_rig(lights, camera.position);
            ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&u));
        }
    }

    /// Rewrites the marker instance buffer with one small cube per point
    /// light, growing it in power-of-two steps when the rig grows.
    fn write_markers(&mut self, ctx: &RenderCtx<'_>, lights: &LightRig) {
        let data: Vec<MeshInstance> = lights
            .lights()
            .iter()
            .map(|l| MeshInstance::marker(l.position, l.color))
            .collect();
        self.marker_count = data.len() as u32;

        if self.marker_count == 0 {
            return;
        }

        if self.marker_instances.is_none() || self.marker_capacity < self.marker_count {
            let capacity = self.marker_count.next_power_of_two();
            self.marker_instances = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("marker instances"),
                size: capacity as u64 * std::mem::size_of::<MeshInstance>() as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.marker_capacity = capacity;
        }

        if let Some(buffer) = &self.marker_instances {
            ctx.queue.write_buffer(buffer, 0, bytemuck::cast_slice(&data));
        }
    }

    /// Issues one indexed instanced draw per scene batch. Shared by the
    /// shadow and geometry passes, which consume the same instance buffer.
    fn draw_scene_batches(&self, rpass: &mut wgpu::RenderPass<'_>) {
        let Some(instances) = &self.scene_instances else {
            return;
        };
        rpass.set_vertex_buffer(1, instances.slice(..));

        for batch in &self.scene_batches {
            let Some(mesh) = self.meshes.get(batch.mesh) else {
                continue;
            };
            rpass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            rpass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            rpass.draw_indexed(0..mesh.index_count, 0, batch.instances.clone());
        }
    }

    fn record_shadow_pass(&self, target: &mut RenderTarget<'_>) {
        let (Some(pipelines), Some(shadow_map), Some(bind)) =
            (&self.pipelines, &self.shadow_map, &self.shadow_bind)
        else {
            return;
        };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("shadow pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &shadow_map.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&pipelines.shadow);
        rpass.set_bind_group(0, bind, &[]);
        self.draw_scene_batches(&mut rpass);
    }

    fn record_geometry_pass(&self, target: &mut RenderTarget<'_>) {
        let (Some(pipelines), Some(gbuffer), Some(bind)) =
            (&self.pipelines, &self.gbuffer, &self.geometry_bind)
        else {
            return;
        };

        let clear = |view| {
            Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })
        };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("geometry pass"),
            color_attachments: &[
                clear(&gbuffer.position_view),
                clear(&gbuffer.normal_view),
                clear(&gbuffer.albedo_spec_view),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &gbuffer.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&pipelines.geometry);
        rpass.set_bind_group(0, bind, &[]);
        self.draw_scene_batches(&mut rpass);
    }

    fn record_lighting_pass(&self, target: &mut RenderTarget<'_>) {
        let (Some(pipelines), Some(lights_bind), Some(gbuffer_bind)) =
            (&self.pipelines, &self.lights_bind, &self.gbuffer_bind)
        else {
            return;
        };
        let Some(quad) = self.meshes.get(MeshKind::FullscreenQuad) else {
            return;
        };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lighting pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&pipelines.lighting);
        rpass.set_bind_group(0, lights_bind, &[]);
        rpass.set_bind_group(1, gbuffer_bind, &[]);
        rpass.set_vertex_buffer(0, quad.vertex_buffer.slice(..));
        rpass.set_index_buffer(quad.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..quad.index_count, 0, 0..1);
    }

    /// Carries the geometry pass's depth over to the forward pass so the
    /// overlay depth-tests against deferred geometry.
    fn record_depth_resolve(&self, target: &mut RenderTarget<'_>) {
        let Some(gbuffer) = &self.gbuffer else {
            return;
        };

        target.encoder.copy_texture_to_texture(
            gbuffer.depth_texture().as_image_copy(),
            gbuffer.forward_depth_texture().as_image_copy(),
            gbuffer.plan().extent(),
        );
    }

    fn record_forward_pass(&self, target: &mut RenderTarget<'_>) {
        let (Some(pipelines), Some(gbuffer), Some(bind)) =
            (&self.pipelines, &self.gbuffer, &self.forward_bind)
        else {
            return;
        };
        let Some(cube) = self.meshes.get(MeshKind::Cube) else {
            return;
        };
        let Some(markers) = &self.marker_instances else {
            return;
        };
        if self.marker_count == 0 {
            return;
        }

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("forward pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &gbuffer.forward_depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&pipelines.forward);
        rpass.set_bind_group(0, bind, &[]);
        rpass.set_vertex_buffer(0, cube.vertex_buffer.slice(..));
        rpass.set_vertex_buffer(1, markers.slice(..));
        rpass.set_index_buffer(cube.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..cube.index_count, 0, 0..self.marker_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_run_in_fixed_order() {
        assert_eq!(
            frame_passes(),
            [
                PassKind::Shadow,
                PassKind::Geometry,
                PassKind::Lighting,
                PassKind::DepthResolve,
                PassKind::Forward,
            ]
        );
    }

    #[test]
    fn depth_resolve_sits_between_lighting_and_forward() {
        let passes = frame_passes();
        let at = |kind| passes.iter().position(|&p| p == kind).unwrap();
        assert!(at(PassKind::Lighting) < at(PassKind::DepthResolve));
        assert!(at(PassKind::DepthResolve) < at(PassKind::Forward));
    }

    #[test]
    fn every_pass_appears_exactly_once() {
        let passes = frame_passes();
        for kind in [
            PassKind::Shadow,
            PassKind::Geometry,
            PassKind::Lighting,
            PassKind::DepthResolve,
            PassKind::Forward,
        ] {
            assert_eq!(passes.iter().filter(|&&p| p == kind).count(), 1);
        }
    }
}
