//! The deferred-shading pipeline.
//!
//! A frame is five passes in a fixed order: shadow map, geometry into the
//! G-buffer, fullscreen lighting, depth resolve, forward overlay. The
//! [`Renderer`] records all five into one encoder; [`frame_passes`] exposes
//! the order as data.

mod ctx;
mod gbuffer;
mod mesh;
mod pipelines;
mod sequencer;
mod shadow;
mod uniforms;

pub use ctx::{RenderCtx, RenderTarget};
pub use gbuffer::{GBufferPlan, GeometryBuffer};
pub use mesh::{CpuMesh, GpuMesh, MeshCache, MeshKind, Vertex};
pub use sequencer::{PassKind, Renderer, frame_passes};
pub use shadow::{SHADOW_RESOLUTION, ShadowMap};
pub use uniforms::{MAX_POINT_LIGHTS, LightsUniform, MeshInstance};
