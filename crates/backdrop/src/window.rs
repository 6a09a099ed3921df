use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Fullscreen, Window, WindowBuilder};

use crate::background::Background;
use crate::controller::mount;
use crate::error::SurfaceLost;
use crate::gpu::WgpuBackend;
use crate::host::{Container, LocalHost};
use crate::types::{Antialiasing, CanvasConfig, SurfaceId};

/// Settings for [`run_window`].
#[derive(Debug, Clone)]
pub struct WindowOptions {
    pub title: String,
    /// Initial inner size in logical pixels.
    pub size: LogicalSize<f64>,
    pub fullscreen: bool,
    pub canvas: CanvasConfig,
    pub antialiasing: Antialiasing,
    /// Return mount failures and surface loss as errors instead of degrading
    /// to a static background.
    pub strict: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "backdrop".to_string(),
            size: LogicalSize::new(1280.0, 720.0),
            fullscreen: false,
            canvas: CanvasConfig::default(),
            antialiasing: Antialiasing::default(),
            strict: false,
        }
    }
}

/// A winit window acting as the canvas container.
struct WindowContainer {
    window: Arc<Window>,
    attached: Cell<Option<SurfaceId>>,
}

impl Container for WindowContainer {
    fn client_size(&self) -> LogicalSize<f64> {
        self.window.inner_size().to_logical(self.window.scale_factor())
    }

    fn scale_factor(&self) -> f64 {
        self.window.scale_factor()
    }

    fn attach_surface(&self, surface: SurfaceId) {
        self.attached.set(Some(surface));
    }

    fn detach_surface(&self, surface: SurfaceId) -> bool {
        if self.attached.get() == Some(surface) {
            self.attached.set(None);
            true
        } else {
            false
        }
    }

    // The window already reports its exact physical size.
    fn backing_size(&self) -> PhysicalSize<u32> {
        self.window.inner_size()
    }
}

/// Opens a window and runs one shader canvas as its background until the
/// window is closed.
pub fn run_window(options: WindowOptions) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let mut builder = WindowBuilder::new()
        .with_title(options.title.clone())
        .with_inner_size(options.size);
    if options.fullscreen {
        builder = builder.with_fullscreen(Some(Fullscreen::Borderless(None)));
    }
    let window = builder
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let host = Rc::new(LocalHost::new());
    let container: Rc<dyn Container> = Rc::new(WindowContainer {
        window: window.clone(),
        attached: Cell::new(None),
    });
    let mut backend = WgpuBackend::new(window.clone(), options.antialiasing);

    let strict = options.strict;
    let background = if strict {
        let canvas = mount(container.clone(), host.clone(), &mut backend, &options.canvas)?;
        Background::animated(container, canvas)
    } else {
        Background::mount(container, host.clone(), &mut backend, &options.canvas)
    };
    let mut background = Some(background);
    window.request_redraw();

    let lost: Rc<RefCell<Option<SurfaceLost>>> = Rc::new(RefCell::new(None));
    let exit_lost = lost.clone();
    let run_result = event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                close_background(&mut background);
                elwt.exit();
            }
            WindowEvent::Resized(size) => {
                debug!(width = size.width, height = size.height, "window resized");
                host.dispatch_resize();
                if let Some(background) = background.as_mut() {
                    background.invalidate();
                }
                window.request_redraw();
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                debug!(scale_factor, "window scale factor changed");
                host.dispatch_resize();
                if let Some(background) = background.as_mut() {
                    background.invalidate();
                }
                window.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                host.run_frame();
                if let Some(background) = background.as_mut() {
                    background.paint();
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            let Some(current) = background.as_mut() else {
                return;
            };
            if strict {
                if let Some(reason) = current.surface_lost() {
                    *lost.borrow_mut() = Some(reason);
                    close_background(&mut background);
                    elwt.exit();
                    return;
                }
            } else if current.degrade_if_lost(&mut backend).is_some() {
                warn!("shader canvas lost; showing the static background");
            }
            if host.pending_frames() > 0 || current.needs_paint() {
                window.request_redraw();
            }
            elwt.set_control_flow(ControlFlow::Wait);
        }
        _ => {}
    });
    run_result.map_err(|err| anyhow!("window event loop error: {err}"))?;

    let lost = exit_lost.borrow_mut().take();
    match lost {
        Some(reason) => Err(reason.into()),
        None => Ok(()),
    }
}

fn close_background(background: &mut Option<Background>) {
    let Some(background) = background.take() else {
        return;
    };
    match background.close() {
        Some(stats) => info!(
            frames = stats.frames_presented,
            time = stats.final_time,
            "window closed"
        ),
        None => info!("window closed"),
    }
}
