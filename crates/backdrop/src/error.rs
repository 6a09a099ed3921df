use std::fmt;

/// Pipeline stage a compile diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Reasons a canvas could not be mounted.
///
/// All variants are raised before anything is attached to the container, so
/// a failed mount never leaves resources behind.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MountError {
    /// No graphics backend, adapter, device, or presentable surface.
    #[error("graphics surface unavailable: {0}")]
    SurfaceUnavailable(String),
    /// The backend rejected one of the program stages.
    #[error("{stage} shader failed to compile: {diagnostic}")]
    ShaderCompile {
        stage: ShaderStage,
        diagnostic: String,
    },
    /// Canvas configuration rejected before any allocation.
    #[error("invalid canvas configuration: {0}")]
    InvalidConfig(String),
}

impl MountError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        MountError::SurfaceUnavailable(reason.into())
    }

    pub fn compile(stage: ShaderStage, diagnostic: impl Into<String>) -> Self {
        MountError::ShaderCompile {
            stage,
            diagnostic: diagnostic.into(),
        }
    }
}

/// The drawing surface died after mount (driver reset, device loss).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("drawing surface lost: {reason}")]
pub struct SurfaceLost {
    pub reason: String,
}

impl SurfaceLost {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_names_stage_and_diagnostic() {
        let err = MountError::compile(ShaderStage::Fragment, "unexpected token `}`");
        assert_eq!(
            err.to_string(),
            "fragment shader failed to compile: unexpected token `}`"
        );
    }
}
