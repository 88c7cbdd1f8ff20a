//! Edgy - lingering glow around each object's motion envelope.
//!
//! Per object and frame:
//!
//! 1. Convex hull over this frame's and the previous frame's mask, blurred
//!    with `sigma = blur_radius / 4 + 1`
//! 2. Hull added into the object's accumulator (alpha decays by
//!    `trail_length / 100`)
//! 3. Accumulator shaded by the glow program (`glow_color`, `glow_strength`)
//!    and composited onto the target
//!
//! Objects are drawn plainly on top afterwards.

use glam::IVec2;
use log::trace;
use uuid::Uuid;

use crate::entities::accumulator::{DecayPolicy, TrailBank};
use crate::entities::attrs::{Attrs, MetaStore};
use crate::entities::compositor::{blend, BlendMode};
use crate::entities::error::FxError;
use crate::entities::keys::{
    A_BLUR_RADIUS, A_GLOW_COLOR, A_GLOW_STRENGTH, A_TRAIL_LENGTH, DEFAULT_BLUR_RADIUS, DEFAULT_GLOW_COLOR,
    DEFAULT_GLOW_STRENGTH, DEFAULT_TRAIL_LENGTH,
};
use crate::entities::mask::{combine_and_smooth, mask_to_rgba, MaskStats};
use crate::entities::shader::{glow_uniforms, ShaderProgram};
use crate::entities::traits::{FrameContext, Host, ObjectId};

use super::{effect_view, object_mask, object_view, render_objects, Effect};

#[derive(Debug, Clone)]
pub struct Edgy {
    uuid: Uuid,
    settings: Attrs,
    trails: TrailBank<ObjectId>,
}

impl Edgy {
    pub fn new(settings: &Attrs) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            settings: settings.clone(),
            trails: TrailBank::new(),
        }
    }

    pub fn trails(&self) -> &TrailBank<ObjectId> {
        &self.trails
    }
}

impl Effect for Edgy {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn name(&self) -> &'static str {
        "Edgy"
    }

    fn render_frame(&mut self, ctx: &mut FrameContext, host: &dyn Host) -> Result<(), FxError> {
        let frame = ctx.frame_index;
        let resolution = ctx.resolution();
        let length = effect_view(host, &self.settings).float_or(A_TRAIL_LENGTH, DEFAULT_TRAIL_LENGTH);
        let decay = DecayPolicy::GLOW.decay(length);

        let objects = host.objects(frame);
        self.trails.retain(|id| objects.contains(id));

        for &id in &objects {
            let Some(current) = object_mask(host, frame, id) else {
                continue;
            };
            let meta = object_view(host, id, &self.settings);
            let strength = meta.float_or(A_GLOW_STRENGTH, DEFAULT_GLOW_STRENGTH);
            let color = meta.color_or(A_GLOW_COLOR, DEFAULT_GLOW_COLOR);
            let radius = meta.int_or(A_BLUR_RADIUS, DEFAULT_BLUR_RADIUS as i32).max(0) as u32;

            let previous = if frame > 0 { host.mask(frame - 1, id) } else { None };
            let hull = match &previous {
                Some(prev) => combine_and_smooth(&[&current, prev], radius),
                None => combine_and_smooth(&[&current], radius),
            };
            trace!(
                "Edgy frame {}: object {} hull (prev {}), radius {}, {:?}",
                frame,
                id,
                previous.is_some(),
                radius,
                MaskStats::of(&hull)
            );

            let contribution = mask_to_rgba(&hull, [255, 255, 255]);
            let state = self.trails.get_or_create(id, resolution);
            let glow_mask = state.step(frame, &contribution, decay, BlendMode::Additive);

            let glow = host.render(ShaderProgram::Glow, &glow_uniforms(glow_mask, strength, color))?;
            blend(&mut ctx.render_target, &glow, IVec2::ZERO, BlendMode::Normal);
        }

        render_objects(ctx, host);
        Ok(())
    }

    fn remove_object(&mut self, id: ObjectId) {
        self.trails.remove(&id);
    }
}
