//! maskfx - mask-driven video effect modules
//!
//! Re-exports all modules for use by the binary target.

// Reference host (synthetic scene, CPU shaders, frame loop)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod entities;
pub mod runner;

// Re-export commonly used types from core
pub use core::runner::{render_sequence, RenderStats};
pub use core::scene::SyntheticScene;
pub use core::shaders::CpuShaderBackend;

// Re-export entities
pub use entities::{AttrValue, Attrs, BlendMode, EffectKind, EffectType, FrameContext, FxError, RasterBuffer};
