use crate::field::FieldParams;

/// Colour [`crate::Background`] shows when the animated canvas cannot be
/// mounted or its surface is lost (`#181818`).
pub const FALLBACK_COLOR: [f32; 3] = [0.094, 0.094, 0.094];

/// Identifies one drawing surface for the lifetime of its backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceId(pub u64);

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

impl Default for Antialiasing {
    fn default() -> Self {
        Self::Auto
    }
}

/// How the `time` uniform advances between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockMode {
    /// Add a fixed step on every frame callback, regardless of refresh rate.
    #[default]
    Stepped,
    /// Derive time from the monotonic clock, advancing one step per 1/60 s.
    WallClock,
}

/// Immutable configuration passed to [`crate::mount`].
///
/// The defaults reproduce the brand look: time starts at `1.0` and advances
/// by `0.05` per frame callback.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasConfig {
    /// Value of the `time` uniform before the first frame.
    pub initial_time: f32,
    /// Amount added to `time` on every frame.
    pub step: f32,
    /// Stepped (callback-count driven) or wall-clock time.
    pub clock: ClockMode,
    /// Constants baked into the fragment stage.
    pub field: FieldParams,
}

impl CanvasConfig {
    pub const DEFAULT_INITIAL_TIME: f32 = 1.0;
    pub const DEFAULT_STEP: f32 = 0.05;
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            initial_time: Self::DEFAULT_INITIAL_TIME,
            step: Self::DEFAULT_STEP,
            clock: ClockMode::default(),
            field: FieldParams::default(),
        }
    }
}
