//! Mount/unmount lifecycle of one shader canvas.
//!
//! ```text
//!   mount ──▶ create surface + compile ──▶ attach to container
//!     │                                         │
//!     ├─▶ add resize listener ──▶ sync_size() ──┤ (resolution = backing size)
//!     └─▶ request_frame ──▶ run_frame ──▶ time += step ──▶ draw ──▶ request_frame …
//!
//!   unmount ──▶ cancel pending token ──▶ remove listener ──▶ detach ──▶ drop surface
//! ```
//!
//! All state lives behind one `Rc<RefCell<CanvasState>>` owned by the
//! [`CanvasHandle`]. Callbacks handed to the host only hold weak references,
//! so once the handle lets go nothing can reach the surface again.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, error, info, warn};

use crate::compile::ProgramSource;
use crate::error::{MountError, SurfaceLost};
use crate::host::{Container, FrameToken, Host, ListenerId, ResizeListener};
use crate::runtime::{time_source_for_config, BoxedTimeSource};
use crate::surface::{DrawingSurface, FrameOutcome, GraphicsBackend};
use crate::types::{CanvasConfig, SurfaceId};
use crate::uniforms::UniformState;

/// Frames between two `canvas stats` debug lines.
const STATS_INTERVAL: u64 = 600;

type LostCallback = Box<dyn FnOnce(&SurfaceLost)>;

/// Whether the frame loop is still alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasStatus {
    Running,
    /// The surface died; the loop stopped and no further frames are scheduled.
    Lost(SurfaceLost),
}

/// Summary returned by [`CanvasHandle::unmount`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasStats {
    pub frames_presented: u64,
    pub final_time: f32,
}

struct CanvasState {
    surface: Box<dyn DrawingSurface>,
    container: Rc<dyn Container>,
    uniforms: UniformState,
    clock: BoxedTimeSource,
    pending_frame: Option<FrameToken>,
    resize_listener: Option<ListenerId>,
    status: CanvasStatus,
    stopped: bool,
    frames_presented: u64,
    on_lost: Vec<LostCallback>,
}

impl CanvasState {
    fn is_live(&self) -> bool {
        !self.stopped && matches!(self.status, CanvasStatus::Running)
    }

    /// Brings the surface and `resolution` in line with the container.
    fn sync_size(&mut self) {
        if !self.is_live() {
            return;
        }
        let target = self.container.backing_size();
        if target != self.surface.size() {
            self.surface.resize(target);
        }
        self.uniforms.set_resolution(self.surface.size());
        if self.uniforms.is_degenerate() {
            debug!(
                surface = %self.surface.id(),
                width = target.width,
                height = target.height,
                "container has zero area; drawing suspended"
            );
        } else {
            debug!(
                surface = %self.surface.id(),
                width = self.uniforms.resolution[0],
                height = self.uniforms.resolution[1],
                "canvas resized"
            );
        }
    }

    /// Advances time and draws once. Returns the loss if the surface died.
    fn advance(&mut self) -> Option<(SurfaceLost, Vec<LostCallback>)> {
        let sample = self.clock.sample();
        self.uniforms.time = sample.seconds;
        match self.surface.draw(&self.uniforms) {
            Ok(FrameOutcome::Presented) => {
                self.frames_presented += 1;
                if self.frames_presented % STATS_INTERVAL == 0 {
                    debug!(
                        surface = %self.surface.id(),
                        frame = sample.frame_index,
                        presented = self.frames_presented,
                        time = self.uniforms.time,
                        "canvas stats"
                    );
                }
                None
            }
            Ok(FrameOutcome::Skipped) => None,
            Err(lost) => {
                self.status = CanvasStatus::Lost(lost.clone());
                Some((lost, std::mem::take(&mut self.on_lost)))
            }
        }
    }
}

/// Exclusive owner of a mounted canvas.
///
/// Call [`CanvasHandle::unmount`] to tear it down; dropping the handle does
/// the same on every other exit path.
pub struct CanvasHandle {
    state: Option<Rc<RefCell<CanvasState>>>,
    host: Rc<dyn Host>,
    surface_id: SurfaceId,
}

/// Mounts a shader canvas into `container` and starts its frame loop.
///
/// The surface is sized to the container's backing size, the program is
/// compiled once, and the first frame is requested from `host`. Nothing is
/// attached to the container unless every step succeeds.
pub fn mount<B>(
    container: Rc<dyn Container>,
    host: Rc<dyn Host>,
    backend: &mut B,
    config: &CanvasConfig,
) -> Result<CanvasHandle, MountError>
where
    B: GraphicsBackend + ?Sized,
{
    validate_config(config)?;

    let size = container.backing_size();
    let program = ProgramSource::from_field(&config.field);
    let surface = backend.create_surface(size, &program)?;
    let surface_id = surface.id();
    container.attach_surface(surface_id);

    let uniforms = UniformState::new(config.initial_time, surface.size());
    debug!(
        surface = %surface_id,
        width = size.width,
        height = size.height,
        scale_factor = container.scale_factor(),
        clock = ?config.clock,
        "mounted shader canvas"
    );

    let state = Rc::new(RefCell::new(CanvasState {
        surface,
        container,
        uniforms,
        clock: time_source_for_config(config),
        pending_frame: None,
        resize_listener: None,
        status: CanvasStatus::Running,
        stopped: false,
        frames_presented: 0,
        on_lost: Vec::new(),
    }));

    let listener = host.add_resize_listener(resize_listener(Rc::downgrade(&state)));
    state.borrow_mut().resize_listener = Some(listener);
    schedule_frame(&state, &host);

    Ok(CanvasHandle {
        state: Some(state),
        host,
        surface_id,
    })
}

fn validate_config(config: &CanvasConfig) -> Result<(), MountError> {
    if !config.initial_time.is_finite() {
        return Err(MountError::InvalidConfig(format!(
            "initial time must be finite (got {})",
            config.initial_time
        )));
    }
    if !(config.step.is_finite() && config.step > 0.0) {
        return Err(MountError::InvalidConfig(format!(
            "time step must be a positive number (got {})",
            config.step
        )));
    }
    config
        .field
        .validate()
        .map_err(|err| MountError::InvalidConfig(err.to_string()))
}

fn resize_listener(state: Weak<RefCell<CanvasState>>) -> ResizeListener {
    Box::new(move || {
        let Some(state) = state.upgrade() else {
            return;
        };
        let Ok(mut guard) = state.try_borrow_mut() else {
            warn!("resize delivered while the canvas was busy; ignoring");
            return;
        };
        guard.sync_size();
    })
}

fn schedule_frame(state: &Rc<RefCell<CanvasState>>, host: &Rc<dyn Host>) {
    let weak_state = Rc::downgrade(state);
    let weak_host = Rc::downgrade(host);
    let token = host.request_frame(Box::new(move || {
        let (Some(state), Some(host)) = (weak_state.upgrade(), weak_host.upgrade()) else {
            return;
        };
        run_frame(&state, &host);
    }));
    state.borrow_mut().pending_frame = Some(token);
}

fn run_frame(state: &Rc<RefCell<CanvasState>>, host: &Rc<dyn Host>) {
    let lost = {
        let mut guard = state.borrow_mut();
        guard.pending_frame = None;
        if !guard.is_live() {
            return;
        }
        guard.advance()
    };

    match lost {
        None => schedule_frame(state, host),
        Some((lost, callbacks)) => {
            error!(reason = %lost.reason, "drawing surface lost; stopping frame loop");
            for callback in callbacks {
                callback(&lost);
            }
        }
    }
}

impl CanvasHandle {
    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    pub fn status(&self) -> CanvasStatus {
        self.with_state(|state| state.status.clone())
            .unwrap_or(CanvasStatus::Running)
    }

    /// Snapshot of the uniforms the next draw will start from.
    pub fn uniforms(&self) -> Option<UniformState> {
        self.with_state(|state| state.uniforms)
    }

    pub fn frames_presented(&self) -> u64 {
        self.with_state(|state| state.frames_presented)
            .unwrap_or_default()
    }

    /// Registers a callback fired once when the surface is lost.
    ///
    /// Every registered callback fires, in registration order. Fires
    /// immediately if the loss already happened.
    pub fn on_surface_lost(&self, callback: impl FnOnce(&SurfaceLost) + 'static) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        let mut guard = state.borrow_mut();
        if let CanvasStatus::Lost(lost) = &guard.status {
            let lost = lost.clone();
            drop(guard);
            callback(&lost);
            return;
        }
        guard.on_lost.push(Box::new(callback));
    }

    /// Stops the frame loop and releases every resource the canvas holds.
    ///
    /// When this returns no frame callback or resize listener of this canvas
    /// remains registered with the host, even if one was already pending.
    pub fn unmount(mut self) -> CanvasStats {
        self.teardown().unwrap_or_default()
    }

    fn with_state<R>(&self, read: impl FnOnce(&CanvasState) -> R) -> Option<R> {
        self.state.as_ref().map(|state| read(&*state.borrow()))
    }

    fn teardown(&mut self) -> Option<CanvasStats> {
        let state = self.state.take()?;
        let (pending, listener, container, stats) = {
            let mut guard = state.borrow_mut();
            guard.stopped = true;
            (
                guard.pending_frame.take(),
                guard.resize_listener.take(),
                guard.container.clone(),
                CanvasStats {
                    frames_presented: guard.frames_presented,
                    final_time: guard.uniforms.time,
                },
            )
        };

        if let Some(token) = pending {
            self.host.cancel_frame(token);
        }
        if let Some(id) = listener {
            self.host.remove_resize_listener(id);
        }
        container.detach_surface(self.surface_id);
        drop(state);

        info!(
            surface = %self.surface_id,
            frames = stats.frames_presented,
            time = stats.final_time,
            "unmounted shader canvas"
        );
        Some(stats)
    }
}

impl Drop for CanvasHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}
