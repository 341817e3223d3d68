//! Scene content: placements consumed by the shadow/geometry passes and the
//! light set consumed by the lighting/forward passes.
//!
//! Everything here is CPU-side and deterministic; the pass sequencer stays
//! decoupled from any one demo scene.

mod description;
mod lights;

pub use description::{Placement, SceneDescription};
pub use lights::{
    ATTENUATION_CONSTANT, ATTENUATION_LINEAR, ATTENUATION_QUADRATIC, LightRig, PointLight,
    SpotLight, derive_radius, orbit_position,
};
