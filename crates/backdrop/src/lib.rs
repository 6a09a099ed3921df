//! Animated shader backdrop: a full-viewport procedural field drawn behind
//! everything else, with a frame loop that can be torn down at any moment.
//!
//! The overall flow is:
//!
//! ```text
//!   host app / backdropd
//!          │ CanvasConfig
//!          ▼
//!   mount() ──▶ GraphicsBackend::create_surface ──▶ DrawingSurface
//!      │                                                │
//!      │ CanvasHandle                                    │ draw(UniformState)
//!      ▼                                                ▼
//!   Host::request_frame ──▶ frame callback ──▶ time += step ──▶ present
//!          ▲                       │
//!          └───────────────────────┘   (until unmount / drop / surface loss)
//! ```
//!
//! [`Host`] and [`Container`] abstract the environment: [`LocalHost`] is a
//! cooperative scheduler driven by an outer event loop, [`run_window`] wires
//! it to winit, and the [`headless`] module provides a GPU-free backend for
//! tests. [`Background`] falls back to a solid [`FALLBACK_COLOR`] when the
//! canvas cannot be mounted or its surface is lost. The same field is
//! available on the CPU via [`render_still`].

mod background;
mod compile;
mod controller;
mod error;
mod field;
mod gpu;
pub mod headless;
mod host;
mod runtime;
mod still;
mod surface;
mod types;
mod uniforms;
mod window;

pub use background::{Background, BackgroundKind};
pub use compile::ProgramSource;
pub use controller::{mount, CanvasHandle, CanvasStats, CanvasStatus};
pub use error::{MountError, ShaderStage, SurfaceLost};
pub use field::{FieldError, FieldParams, MAX_HARMONICS};
pub use gpu::WgpuBackend;
pub use host::{
    backing_size, Container, FrameCallback, FrameToken, Host, ListenerId, LocalHost,
    ResizeListener,
};
pub use runtime::{
    time_source_for_config, BoxedTimeSource, SteppedTimeSource, SystemTimeSource, TimeSample,
    TimeSource,
};
pub use still::{export_png, render_still};
pub use surface::{DrawingSurface, FrameOutcome, GraphicsBackend};
pub use types::{Antialiasing, CanvasConfig, ClockMode, SurfaceId, FALLBACK_COLOR};
pub use uniforms::UniformState;
pub use window::{run_window, WindowOptions};

/// Re-exported so callers can size stills and containers without depending on winit.
pub use winit::dpi::{LogicalSize, PhysicalSize};
