//! MoTrail - fading motion trails behind every tracked object.
//!
//! One effect-wide accumulator. Each frame its alpha decays by
//! `0.6 + trail_length / 250`, every object with `enable_trail` stamps its
//! cutout into it (source pixels or a flat `trail_color`) using its
//! `trail_blend` mode, the accumulator goes onto the render target, and the
//! objects are drawn again on top so the trail sits behind them.

use glam::IVec2;
use log::trace;
use uuid::Uuid;

use crate::entities::accumulator::{AccumulatorState, DecayPolicy};
use crate::entities::attrs::{Attrs, MetaStore};
use crate::entities::compositor::{blend, BlendMode};
use crate::entities::error::FxError;
use crate::entities::keys::{A_ENABLE_TRAIL, A_TRAIL_BLEND, A_TRAIL_COLOR, A_TRAIL_LENGTH, DEFAULT_TRAIL_LENGTH};
use crate::entities::mask::cutout;
use crate::entities::traits::{FrameContext, Host};

use super::{blend_mode_or, effect_view, object_mask, object_view, setting_blend_mode, Effect};

#[derive(Debug, Clone)]
pub struct MoTrail {
    uuid: Uuid,
    settings: Attrs,
    /// Effect-wide default for objects without their own `trail_blend`
    trail_blend: BlendMode,
    accumulator: Option<AccumulatorState>,
}

impl MoTrail {
    pub fn new(settings: &Attrs) -> Result<Self, FxError> {
        Ok(Self {
            uuid: Uuid::new_v4(),
            settings: settings.clone(),
            trail_blend: setting_blend_mode(settings, A_TRAIL_BLEND)?,
            accumulator: None,
        })
    }

    pub fn accumulator(&self) -> Option<&AccumulatorState> {
        self.accumulator.as_ref()
    }
}

impl Effect for MoTrail {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn name(&self) -> &'static str {
        "MoTrail"
    }

    fn render_frame(&mut self, ctx: &mut FrameContext, host: &dyn Host) -> Result<(), FxError> {
        let frame = ctx.frame_index;
        let (w, h) = ctx.resolution();
        let length = effect_view(host, &self.settings).float_or(A_TRAIL_LENGTH, DEFAULT_TRAIL_LENGTH);
        let decay = DecayPolicy::TRAIL.decay(length);

        let acc = self
            .accumulator
            .get_or_insert_with(|| AccumulatorState::new(w, h));
        acc.ensure_resolution(w, h);
        acc.fade(frame, decay);

        let mut fronts = Vec::new();
        for id in host.objects(frame) {
            let Some(sample) = object_mask(host, frame, id) else {
                continue;
            };
            let meta = object_view(host, id, &self.settings);
            if meta.bool_or(A_ENABLE_TRAIL, true) {
                let mode = blend_mode_or(&meta, A_TRAIL_BLEND, self.trail_blend)?;
                let contribution = cutout(&ctx.source_frame, &sample.mask, meta.color(A_TRAIL_COLOR));
                trace!("MoTrail frame {}: object {} into trail ({})", frame, id, mode);
                acc.blend_in(&contribution, mode);
            }
            fronts.push(cutout(&ctx.source_frame, &sample.mask, None));
        }

        acc.composite_onto(&mut ctx.render_target, BlendMode::Normal);
        for front in &fronts {
            blend(&mut ctx.render_target, front, IVec2::ZERO, BlendMode::Normal);
        }
        Ok(())
    }
}
