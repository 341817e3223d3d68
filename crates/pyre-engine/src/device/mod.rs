//! GPU device + surface management: adapter/device acquisition, swapchain
//! configuration, and per-frame texture/encoder handout.

mod gpu;
mod surface;

pub use gpu::{Gpu, GpuFrame, GpuInit};
pub use surface::SurfaceErrorAction;
pub(crate) use surface::renderable;
