//! Entities module - effect data types, pixel algorithms and effects
//!
//! ```text
//! frame / attrs / keys          raster buffers, meta, key names
//! compositor / color / blur     blending, HSL/HSV, Gaussian blur
//! mask / transform / link       hull glow masks, sprite warps, link chains
//! accumulator                   decaying trail buffers
//! shader / traits               host contracts
//! effects                       MoTrail, Edgy, Go Go Gadget, ...
//! ```

pub mod accumulator;
pub mod attrs;
pub mod blur;
pub mod color;
pub mod compositor;
pub mod effects;
pub mod error;
pub mod frame;
pub mod keys;
pub mod link;
pub mod mask;
pub mod shader;
pub mod traits;
pub mod transform;

pub use accumulator::{AccumulatorState, DecayPolicy, TrailBank};
pub use attrs::{AttrValue, Attrs, MetaStore, MetaView};
pub use compositor::{blend, composite, BlendMode};
pub use effects::{Effect, EffectKind, EffectType};
pub use error::FxError;
pub use frame::{BBox, PixelFormat, RasterBuffer};
pub use link::{render_link, render_link_with, LinkOptions};
pub use mask::{combine_and_smooth, MaskSample};
pub use shader::{ShaderProgram, Uniform, UniformSet};
pub use traits::{
    FrameContext, Host, InpaintingProvider, ObjectId, SegmentationProvider, ShaderBackend,
    TransformHierarchy,
};
