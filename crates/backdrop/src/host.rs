//! Seams between a canvas and the environment it is mounted into.
//!
//! A [`Host`] is the single-threaded scheduler that owns the per-refresh frame
//! callbacks and the viewport resize listeners. A [`Container`] is the region
//! the drawing surface lives in. Both are consulted only from the host's own
//! thread, so every method takes `&self` and callbacks may re-enter the host
//! (a frame callback requesting the next frame is the normal case).

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use winit::dpi::{LogicalSize, PhysicalSize};

use crate::types::SurfaceId;

/// Cancellation token for one scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameToken(u64);

/// Registration id of one resize listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

pub type FrameCallback = Box<dyn FnOnce()>;
pub type ResizeListener = Box<dyn FnMut()>;

/// Frame scheduler and viewport event source.
pub trait Host {
    /// Schedules `callback` for the next display refresh.
    fn request_frame(&self, callback: FrameCallback) -> FrameToken;
    /// Drops a scheduled callback. Returns false when it already ran or was cancelled.
    fn cancel_frame(&self, token: FrameToken) -> bool;
    fn add_resize_listener(&self, listener: ResizeListener) -> ListenerId;
    fn remove_resize_listener(&self, id: ListenerId) -> bool;
}

/// Region a drawing surface is mounted into.
pub trait Container {
    /// Size in logical (CSS-like) pixels.
    fn client_size(&self) -> LogicalSize<f64>;
    /// Device pixel ratio between logical and backing pixels.
    fn scale_factor(&self) -> f64;
    fn attach_surface(&self, surface: SurfaceId);
    fn detach_surface(&self, surface: SurfaceId) -> bool;

    /// Backing size in device pixels.
    ///
    /// Defaults to `floor(logical × scale)`; containers that know their exact
    /// physical size should override this.
    fn backing_size(&self) -> PhysicalSize<u32> {
        backing_size(self.client_size(), self.scale_factor())
    }
}

/// Converts a logical size into device pixels, mapping degenerate input to zero.
pub fn backing_size(logical: LogicalSize<f64>, scale_factor: f64) -> PhysicalSize<u32> {
    let scale = if scale_factor.is_finite() && scale_factor > 0.0 {
        scale_factor
    } else {
        1.0
    };
    PhysicalSize::new(
        device_pixels(logical.width, scale),
        device_pixels(logical.height, scale),
    )
}

fn device_pixels(logical: f64, scale: f64) -> u32 {
    let scaled = logical * scale;
    if scaled.is_finite() && scaled > 0.0 {
        scaled.floor().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// Cooperative, single-threaded [`Host`] driven by an outer event loop.
///
/// The loop calls [`LocalHost::run_frame`] once per display refresh and
/// [`LocalHost::dispatch_resize`] whenever the viewport changes size.
#[derive(Default)]
pub struct LocalHost {
    next_id: Cell<u64>,
    frames: RefCell<BTreeMap<FrameToken, FrameCallback>>,
    listeners: RefCell<BTreeMap<ListenerId, Rc<RefCell<ResizeListener>>>>,
}

impl LocalHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Runs the callbacks that were pending when this refresh began.
    ///
    /// Callbacks requested while the tick runs wait for the next one; a
    /// callback cancelled by an earlier one in the same tick is skipped.
    pub fn run_frame(&self) -> usize {
        let due: Vec<FrameToken> = self.frames.borrow().keys().copied().collect();
        let mut ran = 0;
        for token in due {
            let callback = self.frames.borrow_mut().remove(&token);
            if let Some(callback) = callback {
                callback();
                ran += 1;
            }
        }
        ran
    }

    /// Notifies every resize listener that is still registered at its turn.
    pub fn dispatch_resize(&self) -> usize {
        let ids: Vec<ListenerId> = self.listeners.borrow().keys().copied().collect();
        let mut notified = 0;
        for id in ids {
            let listener = self.listeners.borrow().get(&id).cloned();
            let Some(listener) = listener else {
                continue;
            };
            match listener.try_borrow_mut() {
                Ok(mut callback) => {
                    (*callback)();
                    notified += 1;
                }
                Err(_) => {
                    tracing::warn!(?id, "resize listener re-entered during dispatch; skipping");
                }
            };
        }
        notified
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl Host for LocalHost {
    fn request_frame(&self, callback: FrameCallback) -> FrameToken {
        let token = FrameToken(self.allocate_id());
        self.frames.borrow_mut().insert(token, callback);
        token
    }

    fn cancel_frame(&self, token: FrameToken) -> bool {
        self.frames.borrow_mut().remove(&token).is_some()
    }

    fn add_resize_listener(&self, listener: ResizeListener) -> ListenerId {
        let id = ListenerId(self.allocate_id());
        self.listeners
            .borrow_mut()
            .insert(id, Rc::new(RefCell::new(listener)));
        id
    }

    fn remove_resize_listener(&self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().remove(&id).is_some()
    }
}
