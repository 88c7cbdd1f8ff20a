//! Go Go Gadget - mechanical arm from each object's parent anchor to the object.
//!
//! For every object with `enable_links`, a chain of link sprites is drawn
//! along a sagging Bezier from the parent anchor to the object anchor, then
//! the objects are drawn on top so the arm disappears behind them.

use log::trace;
use uuid::Uuid;

use crate::entities::attrs::{Attrs, MetaStore};
use crate::entities::error::FxError;
use crate::entities::frame::{PixelFormat, RasterBuffer};
use crate::entities::keys::{A_ENABLE_LINKS, A_LINK_SAG, A_LINK_SIZE, DEFAULT_LINK_SIZE};
use crate::entities::link::{render_link_with, LinkOptions};
use crate::entities::traits::{FrameContext, Host};

use super::{object_view, render_objects, Effect};

#[derive(Debug, Clone)]
pub struct GoGoGadget {
    uuid: Uuid,
    settings: Attrs,
    sprite: RasterBuffer,
}

impl GoGoGadget {
    pub fn new(settings: &Attrs, sprite: RasterBuffer) -> Result<Self, FxError> {
        if sprite.is_empty() {
            return Err(FxError::Image("link sprite is empty".to_string()));
        }
        Ok(Self {
            uuid: Uuid::new_v4(),
            settings: settings.clone(),
            sprite: sprite.convert(PixelFormat::Rgba8),
        })
    }

    pub fn sprite(&self) -> &RasterBuffer {
        &self.sprite
    }
}

impl Effect for GoGoGadget {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn name(&self) -> &'static str {
        "Go Go Gadget"
    }

    fn render_frame(&mut self, ctx: &mut FrameContext, host: &dyn Host) -> Result<(), FxError> {
        let frame = ctx.frame_index;
        for id in host.objects(frame) {
            let meta = object_view(host, id, &self.settings);
            if !meta.bool_or(A_ENABLE_LINKS, true) {
                continue;
            }
            let (Some(start), Some(end)) = (host.parent_anchor(frame, id), host.anchor(frame, id)) else {
                trace!("frame {}: object {} has no anchor pair", frame, id);
                continue;
            };
            let opts = LinkOptions {
                thickness_scale: meta.float_or(A_LINK_SIZE, DEFAULT_LINK_SIZE),
                sag: meta.float_or(A_LINK_SAG, 1.0),
            };
            render_link_with(&mut ctx.render_target, start, end, &self.sprite, &opts);
        }

        render_objects(ctx, host);
        Ok(())
    }
}
