//! Pyre engine crate.
//!
//! A deferred-shading renderer split into a platform runtime (window, GPU
//! device, input, timing) and the render pipeline that consumes it.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod camera;
pub mod scene;
pub mod render;
