//! The procedural colour field painted by the fragment stage.
//!
//! Every pixel is mapped into a centred, aspect-corrected space and, per
//! colour channel, accumulates a handful of reciprocal-distance terms:
//!
//! ```text
//!   c[j] += line_width * i² / | fract(t - j·channel_offset + i·harmonic_offset) * ring_scale
//!                               - |uv| + mod(uv.x + uv.y, band_period) |
//! ```
//!
//! The result is thin concentric bands drifting outwards, each channel a
//! little behind the previous one, remapped into a blue-dominant palette.
//! [`FieldParams::shade`] is the CPU twin of the GLSL emitted by
//! `compile.rs`; the two must stay structurally identical.

/// Upper bound on harmonics; each one is a loop iteration per pixel per channel.
pub const MAX_HARMONICS: u32 = 32;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error("field parameter `{name}` must be finite (got {value})")]
    NonFinite { name: &'static str, value: f32 },
    #[error("harmonics must be between 1 and {MAX_HARMONICS} (got {0})")]
    Harmonics(u32),
    #[error("band_period must be non-zero")]
    ZeroBandPeriod,
}

/// Constants baked into the fragment stage. A visual choice, not a correctness one.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldParams {
    /// Multiplier turning the `time` uniform into the slow field time `t`.
    pub time_scale: f32,
    /// Numerator weight of every band term.
    pub line_width: f32,
    /// Number of band terms accumulated per channel.
    pub harmonics: u32,
    /// Phase lag between consecutive colour channels.
    pub channel_offset: f32,
    /// Phase spacing between consecutive harmonics.
    pub harmonic_offset: f32,
    /// Radius covered by one `fract` cycle.
    pub ring_scale: f32,
    /// Period of the diagonal interference term.
    pub band_period: f32,
    pub channel_scale: [f32; 3],
    pub channel_bias: [f32; 3],
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            time_scale: 0.05,
            line_width: 0.002,
            harmonics: 5,
            channel_offset: 0.01,
            harmonic_offset: 0.01,
            ring_scale: 5.0,
            band_period: 0.2,
            channel_scale: [0.3, 0.6, 1.2],
            channel_bias: [0.02, 0.05, 0.12],
        }
    }
}

impl FieldParams {
    pub fn validate(&self) -> Result<(), FieldError> {
        let scalars = [
            ("time_scale", self.time_scale),
            ("line_width", self.line_width),
            ("channel_offset", self.channel_offset),
            ("harmonic_offset", self.harmonic_offset),
            ("ring_scale", self.ring_scale),
            ("band_period", self.band_period),
            ("channel_scale", self.channel_scale[0]),
            ("channel_scale", self.channel_scale[1]),
            ("channel_scale", self.channel_scale[2]),
            ("channel_bias", self.channel_bias[0]),
            ("channel_bias", self.channel_bias[1]),
            ("channel_bias", self.channel_bias[2]),
        ];
        if let Some((name, value)) = scalars.iter().find(|(_, value)| !value.is_finite()) {
            return Err(FieldError::NonFinite {
                name,
                value: *value,
            });
        }
        if self.harmonics == 0 || self.harmonics > MAX_HARMONICS {
            return Err(FieldError::Harmonics(self.harmonics));
        }
        if self.band_period == 0.0 {
            return Err(FieldError::ZeroBandPeriod);
        }
        Ok(())
    }

    /// Evaluates the field for one pixel.
    ///
    /// `frag_coord` uses a bottom-left origin, like `gl_FragCoord` in WebGL.
    /// A zero-area resolution yields the bias colour.
    pub fn shade(&self, frag_coord: [f32; 2], time: f32, resolution: [f32; 2]) -> [f32; 4] {
        let [width, height] = resolution;
        let shortest = width.min(height);
        if shortest <= 0.0 {
            let [r, g, b] = self.channel_bias;
            return [r, g, b, 1.0];
        }

        let uv = [
            (frag_coord[0] * 2.0 - width) / shortest,
            (frag_coord[1] * 2.0 - height) / shortest,
        ];
        let t = time * self.time_scale;
        let radius = (uv[0] * uv[0] + uv[1] * uv[1]).sqrt();
        let band = glsl_mod(uv[0] + uv[1], self.band_period);

        let mut color = [0.0_f32; 3];
        for (channel, value) in color.iter_mut().enumerate() {
            *value = self.channel_intensity(t, channel as f32, radius, band);
        }

        [
            color[0] * self.channel_scale[0] + self.channel_bias[0],
            color[1] * self.channel_scale[1] + self.channel_bias[1],
            color[2] * self.channel_scale[2] + self.channel_bias[2],
            1.0,
        ]
    }

    fn channel_intensity(&self, t: f32, channel: f32, radius: f32, band: f32) -> f32 {
        (0..self.harmonics)
            .map(|i| {
                let i = i as f32;
                let phase = glsl_fract(t - self.channel_offset * channel + i * self.harmonic_offset);
                self.line_width * i * i / (phase * self.ring_scale - radius + band).abs()
            })
            .sum()
    }
}

fn glsl_fract(x: f32) -> f32 {
    x - x.floor()
}

fn glsl_mod(x: f32, y: f32) -> f32 {
    x - y * (x / y).floor()
}
