//! CPU rendition of a single frame, for previews and machines without a GPU.

use std::path::Path;

use anyhow::{bail, Context, Result};
use image::{Rgba, RgbaImage};
use winit::dpi::PhysicalSize;

use crate::field::FieldParams;

/// Rasterises the field at `time` into an RGBA image.
///
/// Pixels are sampled at their centres with a bottom-left origin, so row 0
/// of the image matches the top row of the on-screen canvas.
pub fn render_still(size: PhysicalSize<u32>, time: f32, params: &FieldParams) -> Result<RgbaImage> {
    if size.width == 0 || size.height == 0 {
        bail!(
            "cannot render a {}x{} still; both dimensions must be non-zero",
            size.width,
            size.height
        );
    }
    if !time.is_finite() {
        bail!("still time must be finite (got {time})");
    }
    params.validate().context("invalid field parameters")?;

    let resolution = [size.width as f32, size.height as f32];
    let image = RgbaImage::from_fn(size.width, size.height, |x, y| {
        let frag_coord = [x as f32 + 0.5, (size.height - 1 - y) as f32 + 0.5];
        let [r, g, b, a] = params.shade(frag_coord, time, resolution);
        Rgba([to_byte(r), to_byte(g), to_byte(b), to_byte(a)])
    });
    Ok(image)
}

/// Renders a still and writes it as PNG.
pub fn export_png(
    path: &Path,
    size: PhysicalSize<u32>,
    time: f32,
    params: &FieldParams,
) -> Result<()> {
    let image = render_still(size, time, params)?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write still to {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        width = size.width,
        height = size.height,
        time,
        "exported still"
    );
    Ok(())
}

fn to_byte(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
