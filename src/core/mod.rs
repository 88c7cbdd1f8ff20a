//! Reference host - synthetic scene, CPU shaders, frame loop
//!
//! Stand-ins for the segmentation, inpainting and GPU collaborators so
//! effects can run from the command line and in tests.

pub mod runner;
pub mod scene;
pub mod shaders;

// Re-exports for convenience
pub use runner::{render_sequence, RenderStats};
pub use scene::{link_sprite, SceneObject, SyntheticScene};
pub use shaders::CpuShaderBackend;
