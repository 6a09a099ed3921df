//! GPU-free backend and container.
//!
//! Records every draw instead of rasterising it, which makes the canvas
//! lifecycle observable from tests and usable on machines without a display.
//! Failures (no adapter, compile errors, surface loss) can be injected.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use winit::dpi::{LogicalSize, PhysicalSize};

use crate::compile::ProgramSource;
use crate::error::{MountError, ShaderStage, SurfaceLost};
use crate::host::Container;
use crate::surface::{DrawingSurface, FrameOutcome, GraphicsBackend};
use crate::types::SurfaceId;
use crate::uniforms::UniformState;

/// One draw call as seen by the headless backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRecord {
    pub surface: SurfaceId,
    pub uniforms: UniformState,
}

/// One clear of a solid surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillRecord {
    pub surface: SurfaceId,
    pub size: PhysicalSize<u32>,
    pub color: [f32; 3],
}

/// Everything the headless backend observed.
#[derive(Debug, Default)]
pub struct HeadlessLog {
    pub draws: Vec<DrawRecord>,
    pub fills: Vec<FillRecord>,
    /// Draw requests skipped because the surface had zero area.
    pub skipped: usize,
    pub live: BTreeSet<SurfaceId>,
    pub released: Vec<SurfaceId>,
    /// Backing sizes requested through `resize`, in order.
    pub resizes: Vec<(SurfaceId, PhysicalSize<u32>)>,
    lost: BTreeSet<SurfaceId>,
}

impl HeadlessLog {
    pub fn draws_for(&self, surface: SurfaceId) -> Vec<UniformState> {
        self.draws
            .iter()
            .filter(|record| record.surface == surface)
            .map(|record| record.uniforms)
            .collect()
    }
}

/// [`GraphicsBackend`] that records instead of drawing.
#[derive(Default)]
pub struct HeadlessBackend {
    log: Rc<RefCell<HeadlessLog>>,
    next_id: u64,
    unavailable: Option<String>,
    compile_failure: Option<String>,
    max_dimension: Option<u32>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared view of the recorded activity.
    pub fn log(&self) -> Rc<RefCell<HeadlessLog>> {
        self.log.clone()
    }

    /// Makes the next surface creations fail with `SurfaceUnavailable`.
    pub fn set_unavailable(&mut self, reason: Option<&str>) {
        self.unavailable = reason.map(str::to_string);
    }

    /// Makes fragment compilation fail with the given diagnostic.
    pub fn set_compile_failure(&mut self, diagnostic: Option<&str>) {
        self.compile_failure = diagnostic.map(str::to_string);
    }

    /// Clamps surface sizes like a device texture limit would.
    pub fn set_max_dimension(&mut self, max: Option<u32>) {
        self.max_dimension = max;
    }

    /// Marks a surface as lost; its next draw reports [`SurfaceLost`].
    pub fn lose_surface(&self, surface: SurfaceId) {
        self.log.borrow_mut().lost.insert(surface);
    }

    fn allocate(&mut self, size: PhysicalSize<u32>, fill: Option<[f32; 3]>) -> HeadlessSurface {
        let id = SurfaceId(self.next_id);
        self.next_id += 1;
        self.log.borrow_mut().live.insert(id);
        let mut surface = HeadlessSurface {
            id,
            size: PhysicalSize::new(0, 0),
            max_dimension: self.max_dimension,
            fill,
            log: self.log.clone(),
        };
        surface.size = surface.clamp(size);
        surface
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn create_surface(
        &mut self,
        size: PhysicalSize<u32>,
        program: &ProgramSource,
    ) -> Result<Box<dyn DrawingSurface>, MountError> {
        if let Some(reason) = &self.unavailable {
            return Err(MountError::unavailable(reason.clone()));
        }
        if !program.vertex.contains("void main") {
            return Err(MountError::compile(ShaderStage::Vertex, "missing entry point"));
        }
        if let Some(diagnostic) = &self.compile_failure {
            return Err(MountError::compile(ShaderStage::Fragment, diagnostic.clone()));
        }
        if !program.fragment.contains("void main") {
            return Err(MountError::compile(ShaderStage::Fragment, "missing entry point"));
        }

        Ok(Box::new(self.allocate(size, None)))
    }

    fn create_solid_surface(
        &mut self,
        size: PhysicalSize<u32>,
        color: [f32; 3],
    ) -> Result<Box<dyn DrawingSurface>, MountError> {
        if let Some(reason) = &self.unavailable {
            return Err(MountError::unavailable(reason.clone()));
        }
        Ok(Box::new(self.allocate(size, Some(color))))
    }
}

struct HeadlessSurface {
    id: SurfaceId,
    size: PhysicalSize<u32>,
    max_dimension: Option<u32>,
    fill: Option<[f32; 3]>,
    log: Rc<RefCell<HeadlessLog>>,
}

impl HeadlessSurface {
    fn clamp(&self, size: PhysicalSize<u32>) -> PhysicalSize<u32> {
        match self.max_dimension {
            Some(max) => PhysicalSize::new(size.width.min(max), size.height.min(max)),
            None => size,
        }
    }
}

impl DrawingSurface for HeadlessSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.size = self.clamp(size);
        self.log.borrow_mut().resizes.push((self.id, self.size));
    }

    fn draw(&mut self, uniforms: &UniformState) -> Result<FrameOutcome, SurfaceLost> {
        let mut log = self.log.borrow_mut();
        if log.lost.contains(&self.id) {
            return Err(SurfaceLost::new("headless surface marked lost"));
        }
        if self.size.width == 0 || self.size.height == 0 {
            log.skipped += 1;
            return Ok(FrameOutcome::Skipped);
        }
        match self.fill {
            Some(color) => log.fills.push(FillRecord {
                surface: self.id,
                size: self.size,
                color,
            }),
            None => log.draws.push(DrawRecord {
                surface: self.id,
                uniforms: *uniforms,
            }),
        }
        Ok(FrameOutcome::Presented)
    }
}

impl Drop for HeadlessSurface {
    fn drop(&mut self) {
        let mut log = self.log.borrow_mut();
        log.live.remove(&self.id);
        log.released.push(self.id);
    }
}

/// In-memory [`Container`] with a settable size and device pixel ratio.
pub struct HeadlessContainer {
    size: Cell<LogicalSize<f64>>,
    scale_factor: Cell<f64>,
    children: RefCell<Vec<SurfaceId>>,
}

impl HeadlessContainer {
    pub fn new(width: f64, height: f64, scale_factor: f64) -> Self {
        Self {
            size: Cell::new(LogicalSize::new(width, height)),
            scale_factor: Cell::new(scale_factor),
            children: RefCell::new(Vec::new()),
        }
    }

    pub fn set_size(&self, width: f64, height: f64) {
        self.size.set(LogicalSize::new(width, height));
    }

    pub fn set_scale_factor(&self, scale_factor: f64) {
        self.scale_factor.set(scale_factor);
    }

    pub fn children(&self) -> Vec<SurfaceId> {
        self.children.borrow().clone()
    }
}

impl Container for HeadlessContainer {
    fn client_size(&self) -> LogicalSize<f64> {
        self.size.get()
    }

    fn scale_factor(&self) -> f64 {
        self.scale_factor.get()
    }

    fn attach_surface(&self, surface: SurfaceId) {
        self.children.borrow_mut().push(surface);
    }

    fn detach_surface(&self, surface: SurfaceId) -> bool {
        let mut children = self.children.borrow_mut();
        let before = children.len();
        children.retain(|child| *child != surface);
        children.len() != before
    }
}
