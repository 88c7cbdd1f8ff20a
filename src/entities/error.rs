//! Error type shared by the effect modules.
//!
//! Geometry and pixel operations never fail: degenerate input has a defined
//! fallback. Errors are reserved for setup-time problems (bad blend mode name,
//! unknown effect, missing template image) and host collaborator failures.

/// Effect setup and host errors
#[derive(Debug, Clone, PartialEq)]
pub enum FxError {
    /// Blend mode name not in the supported set
    UnsupportedBlendMode(String),
    /// Effect name not in the registry
    UnknownEffect(String),
    /// Image decode/encode or buffer layout problem
    Image(String),
    /// Invalid effect configuration value
    Config(String),
    /// Shader backend failed or rejected the uniform set
    Shader(String),
}

impl std::fmt::Display for FxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FxError::UnsupportedBlendMode(name) => write!(f, "Unsupported blend mode: {}", name),
            FxError::UnknownEffect(name) => write!(f, "Unknown effect: {}", name),
            FxError::Image(e) => write!(f, "Image error: {}", e),
            FxError::Config(e) => write!(f, "Config error: {}", e),
            FxError::Shader(e) => write!(f, "Shader error: {}", e),
        }
    }
}

impl std::error::Error for FxError {}

impl From<image::ImageError> for FxError {
    fn from(e: image::ImageError) -> Self {
        FxError::Image(e.to_string())
    }
}
