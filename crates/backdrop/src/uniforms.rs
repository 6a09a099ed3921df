use bytemuck::{Pod, Zeroable};
use winit::dpi::PhysicalSize;

/// The two frame-global inputs of the fragment stage.
///
/// `resolution` always mirrors the backing size of the drawing surface in
/// device pixels; `time` only ever moves forward while a canvas is mounted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformState {
    pub time: f32,
    pub resolution: [f32; 2],
}

impl UniformState {
    pub fn new(time: f32, size: PhysicalSize<u32>) -> Self {
        let mut state = Self {
            time,
            resolution: [0.0, 0.0],
        };
        state.set_resolution(size);
        state
    }

    pub fn set_resolution(&mut self, size: PhysicalSize<u32>) {
        self.resolution = [size.width as f32, size.height as f32];
    }

    /// True when either dimension is zero and nothing should be drawn.
    pub fn is_degenerate(&self) -> bool {
        self.resolution[0] <= 0.0 || self.resolution[1] <= 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.time.is_finite() && self.resolution.iter().all(|value| value.is_finite())
    }
}

/// std140 image of [`UniformState`] uploaded to the GPU.
///
/// Layout must match the `CanvasUniforms` block in `compile.rs`:
/// `vec2 resolution` at offset 0, `float time` at offset 8, padded to 16.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct UniformBlock {
    pub resolution: [f32; 2],
    pub time: f32,
    pub padding: f32,
}

unsafe impl Zeroable for UniformBlock {}
unsafe impl Pod for UniformBlock {}

impl From<&UniformState> for UniformBlock {
    fn from(state: &UniformState) -> Self {
        Self {
            resolution: state.resolution,
            time: state.time,
            padding: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_matches_std140_layout() {
        assert_eq!(std::mem::size_of::<UniformBlock>(), 16);
        let block = UniformBlock::from(&UniformState::new(1.5, PhysicalSize::new(800, 600)));
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&block));
        assert_eq!(floats, &[800.0, 600.0, 1.5, 0.0]);
    }

    #[test]
    fn zero_area_resolution_stays_finite() {
        let state = UniformState::new(1.0, PhysicalSize::new(0, 0));
        assert!(state.is_finite());
        assert!(state.is_degenerate());
    }
}
