//! What a container shows: the animated canvas, or [`FALLBACK_COLOR`] once
//! the canvas cannot be mounted or its surface was lost.

use std::rc::Rc;

use tracing::{debug, warn};

use crate::controller::{mount, CanvasHandle, CanvasStats, CanvasStatus};
use crate::error::SurfaceLost;
use crate::host::{Container, Host};
use crate::surface::{DrawingSurface, FrameOutcome, GraphicsBackend};
use crate::types::{CanvasConfig, FALLBACK_COLOR};
use crate::uniforms::UniformState;

/// Which layer a [`Background`] currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundKind {
    Animated,
    /// A solid fill of [`FALLBACK_COLOR`].
    Static,
    /// Not even a solid fill could be created; the container shows nothing.
    Empty,
}

enum Layer {
    Animated(CanvasHandle),
    Static {
        surface: Box<dyn DrawingSurface>,
        stale: bool,
    },
    Empty,
}

/// Owner of whatever is drawn behind a container's content.
///
/// Dropping it tears down the canvas or releases the solid surface.
pub struct Background {
    container: Rc<dyn Container>,
    layer: Layer,
}

impl Background {
    /// Mounts the animated canvas, degrading to a static fill when that fails.
    pub fn mount<B>(
        container: Rc<dyn Container>,
        host: Rc<dyn Host>,
        backend: &mut B,
        config: &CanvasConfig,
    ) -> Self
    where
        B: GraphicsBackend + ?Sized,
    {
        match mount(container.clone(), host, backend, config) {
            Ok(canvas) => Self::animated(container, canvas),
            Err(err) => {
                warn!(error = %err, "shader canvas unavailable; falling back to a static background");
                Self::fallback(container, backend)
            }
        }
    }

    /// Wraps a canvas that was already mounted into `container`.
    pub fn animated(container: Rc<dyn Container>, canvas: CanvasHandle) -> Self {
        Self {
            container,
            layer: Layer::Animated(canvas),
        }
    }

    /// Shows [`FALLBACK_COLOR`] in `container`, or nothing if no surface can be created.
    pub fn fallback<B>(container: Rc<dyn Container>, backend: &mut B) -> Self
    where
        B: GraphicsBackend + ?Sized,
    {
        let layer = match backend.create_solid_surface(container.backing_size(), FALLBACK_COLOR) {
            Ok(surface) => {
                container.attach_surface(surface.id());
                debug!(surface = %surface.id(), "showing static background");
                Layer::Static {
                    surface,
                    stale: true,
                }
            }
            Err(err) => {
                warn!(error = %err, "static background unavailable; leaving the container empty");
                Layer::Empty
            }
        };
        Self { container, layer }
    }

    pub fn kind(&self) -> BackgroundKind {
        match self.layer {
            Layer::Animated(_) => BackgroundKind::Animated,
            Layer::Static { .. } => BackgroundKind::Static,
            Layer::Empty => BackgroundKind::Empty,
        }
    }

    pub fn canvas(&self) -> Option<&CanvasHandle> {
        match &self.layer {
            Layer::Animated(canvas) => Some(canvas),
            _ => None,
        }
    }

    /// The loss that stopped the animated canvas, if any.
    pub fn surface_lost(&self) -> Option<SurfaceLost> {
        match self.canvas()?.status() {
            CanvasStatus::Lost(lost) => Some(lost),
            CanvasStatus::Running => None,
        }
    }

    /// Replaces a lost canvas by the static fill and returns the loss.
    ///
    /// The dead surface is released before the replacement is created.
    pub fn degrade_if_lost<B>(&mut self, backend: &mut B) -> Option<SurfaceLost>
    where
        B: GraphicsBackend + ?Sized,
    {
        let lost = self.surface_lost()?;
        if let Layer::Animated(canvas) = std::mem::replace(&mut self.layer, Layer::Empty) {
            canvas.unmount();
        }
        self.layer = Self::fallback(self.container.clone(), backend).take_layer();
        Some(lost)
    }

    /// Marks the static fill for repainting, e.g. after the container resized.
    pub fn invalidate(&mut self) {
        if let Layer::Static { stale, .. } = &mut self.layer {
            *stale = true;
        }
    }

    /// True while the static fill has not been presented at its current size.
    pub fn needs_paint(&self) -> bool {
        matches!(self.layer, Layer::Static { stale: true, .. })
    }

    /// Presents the static fill if it is stale. The animated canvas paints
    /// itself from its frame loop, so this does nothing for it.
    pub fn paint(&mut self) {
        let Layer::Static { surface, stale } = &mut self.layer else {
            return;
        };
        if !*stale {
            return;
        }
        let target = self.container.backing_size();
        if target != surface.size() {
            surface.resize(target);
        }
        let uniforms = UniformState::new(0.0, surface.size());
        match surface.draw(&uniforms) {
            Ok(FrameOutcome::Presented) => *stale = false,
            // Zero area has nothing to show until the next resize.
            Ok(FrameOutcome::Skipped) => *stale = !uniforms.is_degenerate(),
            Err(lost) => {
                warn!(reason = %lost.reason, "static background lost; leaving the container empty");
                self.release_static();
            }
        }
    }

    /// Tears down whichever layer is shown.
    pub fn close(mut self) -> Option<CanvasStats> {
        match std::mem::replace(&mut self.layer, Layer::Empty) {
            Layer::Animated(canvas) => Some(canvas.unmount()),
            layer => {
                self.layer = layer;
                self.release_static();
                None
            }
        }
    }

    fn release_static(&mut self) {
        if let Layer::Static { surface, .. } = std::mem::replace(&mut self.layer, Layer::Empty) {
            self.container.detach_surface(surface.id());
        }
    }

    fn take_layer(mut self) -> Layer {
        std::mem::replace(&mut self.layer, Layer::Empty)
    }
}

impl Drop for Background {
    fn drop(&mut self) {
        self.release_static();
    }
}
