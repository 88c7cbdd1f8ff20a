//! Inflate - bulge each object outward from its bbox center.
//!
//! The inflate program warps the whole frame (color from the source, alpha
//! from the object mask). The region around the bbox, grown by
//! `inflate_size` on every side, is cut from the result, shrunk back to the
//! bbox size and composited at the bbox.
//!
//! `inflate_size` is 0-100 in meta, 0-1 in the uniform. Objects at 0 are
//! drawn plainly.

use glam::IVec2;
use log::trace;
use uuid::Uuid;

use crate::entities::attrs::{Attrs, MetaStore};
use crate::entities::compositor::{blend, BlendMode};
use crate::entities::error::FxError;
use crate::entities::frame::BBox;
use crate::entities::keys::{A_INFLATE_SIZE, DEFAULT_INFLATE_SIZE};
use crate::entities::shader::{inflate_uniforms, ShaderProgram};
use crate::entities::traits::{FrameContext, Host};

use super::{object_mask, object_view, render_object, Effect};

#[derive(Debug, Clone)]
pub struct Inflate {
    uuid: Uuid,
    settings: Attrs,
}

impl Inflate {
    pub fn new(settings: &Attrs) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            settings: settings.clone(),
        }
    }
}

/// Region of the warped frame that maps back onto `bbox`.
pub fn inflated_region(bbox: BBox, inflate: f32, width: usize, height: usize) -> BBox {
    let center = bbox.center();
    let half = bbox.size() * 0.5;
    let grow = half * inflate;
    let lo = (center - half - grow).round();
    let hi = (center + half + grow).round();
    BBox::new(lo.x as i32, lo.y as i32, hi.x as i32, hi.y as i32).clamp(width, height)
}

impl Effect for Inflate {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn name(&self) -> &'static str {
        "Inflate"
    }

    fn render_frame(&mut self, ctx: &mut FrameContext, host: &dyn Host) -> Result<(), FxError> {
        let frame = ctx.frame_index;
        let (w, h) = ctx.resolution();

        for id in host.objects(frame) {
            let Some(sample) = object_mask(host, frame, id) else {
                continue;
            };
            let inflate = object_view(host, id, &self.settings).float_or(A_INFLATE_SIZE, DEFAULT_INFLATE_SIZE) / 100.0;
            if inflate <= 0.0 || sample.bbox.is_empty() {
                render_object(ctx, &sample.mask, None);
                continue;
            }

            let bbox = sample.bbox;
            let uniforms = inflate_uniforms(&ctx.source_frame, &sample.mask, bbox.center(), bbox.size(), inflate);
            let warped = host.render(ShaderProgram::Inflate, &uniforms)?;

            let region = inflated_region(bbox, inflate, w, h);
            if region.is_empty() {
                continue;
            }
            let patch = warped
                .crop(region)
                .resize(bbox.width() as usize, bbox.height() as usize);
            trace!(
                "Inflate frame {}: object {} by {:.2}, region {:?} -> bbox {:?}",
                frame,
                id,
                inflate,
                region,
                bbox
            );
            blend(&mut ctx.render_target, &patch, IVec2::new(bbox.x0, bbox.y0), BlendMode::Normal);
        }
        Ok(())
    }
}
