//! wgpu rendition of the drawing surface.
//!
//! - `context` owns the instance/adapter/device/swapchain wiring, picks the
//!   MSAA sample count, and keeps the backing size within device limits.
//! - `pipeline` compiles both GLSL stages inside validation error scopes and
//!   links them into a triangle-strip pipeline with one uniform binding.
//! - `state` glues the two together behind [`WgpuBackend`] and turns
//!   swapchain errors into either a skipped frame or a `SurfaceLost`.

mod context;
mod pipeline;
mod state;

pub use state::WgpuBackend;
