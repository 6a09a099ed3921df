use std::borrow::Cow;

use wgpu::naga::ShaderStage as NagaStage;

use crate::error::{MountError, ShaderStage};
use crate::field::FieldParams;

/// Vertex and fragment GLSL for one canvas program.
///
/// The program is immutable once built: the only geometry it ever sees is
/// the full-screen quad generated in [`VERTEX_SHADER_GLSL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSource {
    pub vertex: String,
    pub fragment: String,
}

impl ProgramSource {
    /// Builds the program for the given field constants.
    pub fn from_field(params: &FieldParams) -> Self {
        Self {
            vertex: VERTEX_SHADER_GLSL.to_string(),
            fragment: fragment_source(params),
        }
    }

    /// Number of vertices drawn per frame (triangle strip).
    pub const QUAD_VERTICES: u32 = 4;
}

/// Compiles one stage inside a validation error scope so the backend's
/// diagnostic text can be handed back to the caller.
pub(crate) fn compile_stage(
    device: &wgpu::Device,
    stage: ShaderStage,
    source: &str,
) -> Result<wgpu::ShaderModule, MountError> {
    let (label, naga_stage) = match stage {
        ShaderStage::Vertex => ("canvas quad vertex", NagaStage::Vertex),
        ShaderStage::Fragment => ("canvas field fragment", NagaStage::Fragment),
    };

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_string()),
            stage: naga_stage,
            defines: &[],
        },
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(MountError::compile(stage, err.to_string())),
        None => Ok(module),
    }
}

/// Emits the fragment stage with the field constants baked in.
///
/// `gl_FragCoord` is flipped to a bottom-left origin so the bands line up
/// with the WebGL rendition of the same field.
fn fragment_source(params: &FieldParams) -> String {
    format!(
        r"#version 450
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform CanvasUniforms {{
    vec2 resolution;
    float time;
}} canvas;

const float TIME_SCALE = {time_scale};
const float LINE_WIDTH = {line_width};
const int HARMONICS = {harmonics};
const float CHANNEL_OFFSET = {channel_offset};
const float HARMONIC_OFFSET = {harmonic_offset};
const float RING_SCALE = {ring_scale};
const float BAND_PERIOD = {band_period};
const vec3 CHANNEL_SCALE = vec3({scale_r}, {scale_g}, {scale_b});
const vec3 CHANNEL_BIAS = vec3({bias_r}, {bias_g}, {bias_b});

float channel_intensity(float t, float channel, float radius, float band) {{
    float value = 0.0;
    for (int i = 0; i < HARMONICS; i++) {{
        float phase = fract(t - CHANNEL_OFFSET * channel + float(i) * HARMONIC_OFFSET);
        value += LINE_WIDTH * float(i * i) / abs(phase * RING_SCALE - radius + band);
    }}
    return value;
}}

void main() {{
    vec2 frag = vec2(gl_FragCoord.x, canvas.resolution.y - gl_FragCoord.y);
    vec2 uv = (frag * 2.0 - canvas.resolution) / min(canvas.resolution.x, canvas.resolution.y);
    float t = canvas.time * TIME_SCALE;
    float radius = length(uv);
    float band = mod(uv.x + uv.y, BAND_PERIOD);

    vec3 color = vec3(
        channel_intensity(t, 0.0, radius, band),
        channel_intensity(t, 1.0, radius, band),
        channel_intensity(t, 2.0, radius, band)
    );
    outColor = vec4(color * CHANNEL_SCALE + CHANNEL_BIAS, 1.0);
}}
",
        time_scale = glsl_float(params.time_scale),
        line_width = glsl_float(params.line_width),
        harmonics = params.harmonics,
        channel_offset = glsl_float(params.channel_offset),
        harmonic_offset = glsl_float(params.harmonic_offset),
        ring_scale = glsl_float(params.ring_scale),
        band_period = glsl_float(params.band_period),
        scale_r = glsl_float(params.channel_scale[0]),
        scale_g = glsl_float(params.channel_scale[1]),
        scale_b = glsl_float(params.channel_scale[2]),
        bias_r = glsl_float(params.channel_bias[0]),
        bias_g = glsl_float(params.channel_bias[1]),
        bias_b = glsl_float(params.channel_bias[2]),
    )
}

/// Formats a float so GLSL always parses it as a float literal.
fn glsl_float(value: f32) -> String {
    let text = format!("{value:?}");
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{text}.0")
    }
}

/// Full-screen quad emitted as a four-vertex triangle strip.
const VERTEX_SHADER_GLSL: &str = r"#version 450

const vec2 positions[4] = vec2[4](
    vec2(-1.0, -1.0),
    vec2(1.0, -1.0),
    vec2(-1.0, 1.0),
    vec2(1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    gl_Position = vec4(positions[vertex_index], 0.0, 1.0);
}
";
