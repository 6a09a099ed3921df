use winit::dpi::PhysicalSize;

use crate::compile::ProgramSource;
use crate::error::{MountError, SurfaceLost};
use crate::types::SurfaceId;
use crate::uniforms::UniformState;

/// What happened to one draw request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// One draw call was submitted and presented.
    Presented,
    /// Nothing was drawn (zero-area surface or a transient swapchain hiccup).
    Skipped,
}

/// Produces drawing surfaces with their compiled program.
pub trait GraphicsBackend {
    /// Creates a surface of `size` device pixels and compiles `program` for it.
    ///
    /// On error nothing is left allocated. A zero-area `size` is valid and
    /// produces a suspended surface that skips draws until resized.
    fn create_surface(
        &mut self,
        size: PhysicalSize<u32>,
        program: &ProgramSource,
    ) -> Result<Box<dyn DrawingSurface>, MountError>;

    /// Creates a surface that clears to `color` on every draw and ignores the uniforms.
    fn create_solid_surface(
        &mut self,
        size: PhysicalSize<u32>,
        color: [f32; 3],
    ) -> Result<Box<dyn DrawingSurface>, MountError>;
}

/// A pixel buffer with one immutable program bound to it.
///
/// Dropping the surface releases the program, its buffers, and the swapchain.
pub trait DrawingSurface {
    fn id(&self) -> SurfaceId;
    /// Current backing size in device pixels.
    fn size(&self) -> PhysicalSize<u32>;
    /// Reallocates the backing store. Never fails; zero-area sizes suspend drawing.
    fn resize(&mut self, size: PhysicalSize<u32>);
    /// Issues one draw with the given uniforms.
    fn draw(&mut self, uniforms: &UniformState) -> Result<FrameOutcome, SurfaceLost>;
}
