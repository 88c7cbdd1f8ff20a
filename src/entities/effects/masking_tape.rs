//! Masking Tape - flat color fills.
//!
//! An effect-wide `background_color` floods the render target; objects with
//! a `foreground_color` are drawn as solid silhouettes, the rest with their
//! source pixels.

use uuid::Uuid;

use crate::entities::attrs::{Attrs, MetaStore};
use crate::entities::error::FxError;
use crate::entities::keys::{A_BACKGROUND_COLOR, A_FOREGROUND_COLOR};
use crate::entities::traits::{FrameContext, Host};

use super::{effect_view, object_mask, object_view, render_object, Effect};

#[derive(Debug, Clone)]
pub struct MaskingTape {
    uuid: Uuid,
    settings: Attrs,
}

impl MaskingTape {
    pub fn new(settings: &Attrs) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            settings: settings.clone(),
        }
    }
}

impl Effect for MaskingTape {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn name(&self) -> &'static str {
        "Masking Tape"
    }

    fn render_frame(&mut self, ctx: &mut FrameContext, host: &dyn Host) -> Result<(), FxError> {
        if let Some([r, g, b]) = effect_view(host, &self.settings).color(A_BACKGROUND_COLOR) {
            ctx.render_target.fill(&[r, g, b, 255]);
        }

        let frame = ctx.frame_index;
        for id in host.objects(frame) {
            let Some(sample) = object_mask(host, frame, id) else {
                continue;
            };
            let fill = object_view(host, id, &self.settings).color(A_FOREGROUND_COLOR);
            render_object(ctx, &sample.mask, fill);
        }
        Ok(())
    }
}
