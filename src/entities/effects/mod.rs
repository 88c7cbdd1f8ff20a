//! Effect modules driven by per-object masks.
//!
//! Each effect is a struct with its own persistent state, rendered once per
//! frame by the host. Dispatch goes through [`EffectKind`] (enum_dispatch)
//! so the runner holds one concrete value regardless of effect type.
//!
//! # Architecture
//!
//! ```text
//! host
//!   └── EffectKind::MoTrail(MoTrail { accumulator, ... })
//!
//! per frame:
//!   ctx = FrameContext { frame_index, source_frame, render_target, .. }
//!   effect.render_frame(&mut ctx, &host)
//!       host.objects() / host.mask() / host.anchor() / host.render(shader)
//!       accumulators, hulls, links  ->  blend onto ctx.render_target
//! ```
//!
//! # Effect Types
//!
//! | Type | Meta | Description |
//! |------|------|-------------|
//! | **MoTrail** | `trail_length`, `enable_trail`, `trail_color`, `trail_blend` | Fading motion trail of every object |
//! | **Edgy** | `glow_color`, `glow_strength`, `blur_radius`, `trail_length` | Convex-hull glow that lingers |
//! | **GoGoGadget** | `enable_links`, `link_size`, `link_sag` | Chain of sprites from parent to object |
//! | **Inflate** | `inflate_size` | Bulge distortion inside the object |
//! | **Pixelate** | `pixel_size`, `pixel_color` | Blocky object, optional flat noisy color |
//! | **MaskingTape** | `background_color`, `foreground_color` | Flat color fills for background / objects |
//! | **Eraser** | - | Replace the frame with the inpainted background |
//!
//! # Usage
//!
//! ```ignore
//! let settings = Attrs::new().with(A_TRAIL_LENGTH, AttrValue::Int(80));
//! let mut fx = effects::create(EffectType::MoTrail, &settings, None)?;
//! for frame in 0..n {
//!     let mut ctx = FrameContext::new(frame, host.source(frame));
//!     fx.render_frame(&mut ctx, &host)?;
//! }
//! ```

pub mod edgy;
pub mod eraser;
pub mod gadget;
pub mod inflate;
pub mod masking_tape;
pub mod motrail;
pub mod pixelate;

use std::str::FromStr;

use enum_dispatch::enum_dispatch;
use glam::IVec2;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::attrs::{Attrs, MetaStore, MetaView};
use crate::entities::compositor::{blend, BlendMode};
use crate::entities::error::FxError;
use crate::entities::frame::RasterBuffer;
use crate::entities::mask::{cutout, MaskSample};
use crate::entities::traits::{FrameContext, Host, ObjectId};

pub use edgy::Edgy;
pub use eraser::Eraser;
pub use gadget::GoGoGadget;
pub use inflate::Inflate;
pub use masking_tape::MaskingTape;
pub use motrail::MoTrail;
pub use pixelate::Pixelate;

// ============================================================================
// Effect trait
// ============================================================================

/// Common interface of all effects.
#[enum_dispatch]
pub trait Effect {
    /// Unique identifier for this effect instance
    fn uuid(&self) -> Uuid;

    /// Display name ("MoTrail", "Go Go Gadget", ...)
    fn name(&self) -> &'static str;

    /// Render one frame into `ctx.render_target`.
    ///
    /// Frames must arrive in increasing order; frame 0 resets any
    /// accumulated state.
    fn render_frame(&mut self, ctx: &mut FrameContext, host: &dyn Host) -> Result<(), FxError>;

    /// Drop per-object state of a removed object
    fn remove_object(&mut self, _id: ObjectId) {}
}

/// Enum containing all effect types.
#[enum_dispatch(Effect)]
#[derive(Debug, Clone)]
pub enum EffectKind {
    MoTrail(MoTrail),
    Edgy(Edgy),
    GoGoGadget(GoGoGadget),
    Inflate(Inflate),
    Pixelate(Pixelate),
    MaskingTape(MaskingTape),
    Eraser(Eraser),
}

// ============================================================================
// Effect Type Enum
// ============================================================================

/// Supported effect types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EffectType {
    MoTrail,
    Edgy,
    GoGoGadget,
    Inflate,
    Pixelate,
    MaskingTape,
    Eraser,
}

impl EffectType {
    /// Get human-readable name for UI display
    pub fn display_name(&self) -> &'static str {
        match self {
            EffectType::MoTrail => "MoTrail",
            EffectType::Edgy => "Edgy",
            EffectType::GoGoGadget => "Go Go Gadget",
            EffectType::Inflate => "Inflate",
            EffectType::Pixelate => "Pixelate",
            EffectType::MaskingTape => "Masking Tape",
            EffectType::Eraser => "Eraser",
        }
    }

    /// All available effect types
    pub fn all() -> &'static [EffectType] {
        &[
            EffectType::MoTrail,
            EffectType::Edgy,
            EffectType::GoGoGadget,
            EffectType::Inflate,
            EffectType::Pixelate,
            EffectType::MaskingTape,
            EffectType::Eraser,
        ]
    }

    /// Whether setup needs a link sprite
    pub fn needs_sprite(&self) -> bool {
        matches!(self, EffectType::GoGoGadget)
    }
}

impl std::fmt::Display for EffectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for EffectType {
    type Err = FxError;

    /// Case-insensitive; spaces, dashes and underscores are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "motrail" | "trail" => Ok(EffectType::MoTrail),
            "edgy" | "glow" => Ok(EffectType::Edgy),
            "gogogadget" | "gadget" | "links" => Ok(EffectType::GoGoGadget),
            "inflate" => Ok(EffectType::Inflate),
            "pixelate" => Ok(EffectType::Pixelate),
            "maskingtape" => Ok(EffectType::MaskingTape),
            "eraser" => Ok(EffectType::Eraser),
            _ => Err(FxError::UnknownEffect(s.to_string())),
        }
    }
}

impl TryFrom<String> for EffectType {
    type Error = FxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EffectType> for String {
    fn from(t: EffectType) -> Self {
        t.display_name().to_string()
    }
}

// ============================================================================
// Construction
// ============================================================================

/// Build an effect instance.
///
/// `settings` are the effect-wide values the instance falls back to when the
/// host meta has no entry; they are validated here (blend mode names).
/// `link_sprite` is required by GoGoGadget and ignored by the rest.
pub fn create(
    effect_type: EffectType,
    settings: &Attrs,
    link_sprite: Option<RasterBuffer>,
) -> Result<EffectKind, FxError> {
    debug!("Creating effect {} with {} settings", effect_type, settings.len());
    let fx = match effect_type {
        EffectType::MoTrail => MoTrail::new(settings)?.into(),
        EffectType::Edgy => Edgy::new(settings).into(),
        EffectType::GoGoGadget => {
            let sprite = link_sprite
                .ok_or_else(|| FxError::Image("Go Go Gadget needs a link sprite".to_string()))?;
            GoGoGadget::new(settings, sprite)?.into()
        }
        EffectType::Inflate => Inflate::new(settings).into(),
        EffectType::Pixelate => Pixelate::new(settings).into(),
        EffectType::MaskingTape => MaskingTape::new(settings).into(),
        EffectType::Eraser => Eraser::new().into(),
    };
    Ok(fx)
}

/// [`create`] by effect name
pub fn create_by_name(
    name: &str,
    settings: &Attrs,
    link_sprite: Option<RasterBuffer>,
) -> Result<EffectKind, FxError> {
    create(name.parse()?, settings, link_sprite)
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Meta for one object: object meta, then host effect meta, then settings.
pub(crate) fn object_view<'a>(host: &'a dyn Host, id: ObjectId, settings: &'a Attrs) -> MetaView<'a> {
    MetaView::new()
        .layer_opt(host.object_meta(id))
        .layer(host.effect_meta())
        .layer(settings)
}

/// Effect-wide meta: host effect meta, then settings.
pub(crate) fn effect_view<'a>(host: &'a dyn Host, settings: &'a Attrs) -> MetaView<'a> {
    MetaView::new().layer(host.effect_meta()).layer(settings)
}

/// Blend mode stored under `key`, or `fallback` when absent.
pub(crate) fn blend_mode_or(meta: &dyn MetaStore, key: &str, fallback: BlendMode) -> Result<BlendMode, FxError> {
    match meta.get_value(key) {
        Some(v) => match v.as_str() {
            Some(name) => name.parse(),
            None => Err(FxError::UnsupportedBlendMode(format!("{:?}", v))),
        },
        None => Ok(fallback),
    }
}

/// Validate an optional blend mode setting at construction
pub(crate) fn setting_blend_mode(settings: &Attrs, key: &str) -> Result<BlendMode, FxError> {
    blend_mode_or(settings, key, BlendMode::Normal)
}

/// Mask for `id`, or None (object skipped this frame)
pub(crate) fn object_mask(host: &dyn Host, frame_index: u64, id: ObjectId) -> Option<MaskSample> {
    let sample = host.mask(frame_index, id);
    if sample.is_none() {
        trace!("frame {}: no mask for object {}, skipping", frame_index, id);
    }
    sample
}

/// Composite an object cutout (source pixels under its mask) onto the target
pub(crate) fn render_object(ctx: &mut FrameContext, mask: &RasterBuffer, fill: Option<[u8; 3]>) {
    let cut = cutout(&ctx.source_frame, mask, fill);
    blend(&mut ctx.render_target, &cut, IVec2::ZERO, BlendMode::Normal);
}

/// Render every tracked object plainly on top of the target
pub(crate) fn render_objects(ctx: &mut FrameContext, host: &dyn Host) {
    for id in host.objects(ctx.frame_index) {
        if let Some(sample) = object_mask(host, ctx.frame_index, id) {
            render_object(ctx, &sample.mask, None);
        }
    }
}
