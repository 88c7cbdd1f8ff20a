//! Eraser - replace the frame with the host's inpainted background.

use log::debug;
use uuid::Uuid;

use crate::entities::error::FxError;
use crate::entities::frame::PixelFormat;
use crate::entities::traits::{FrameContext, Host};

use super::Effect;

#[derive(Debug, Clone)]
pub struct Eraser {
    uuid: Uuid,
}

impl Eraser {
    pub fn new() -> Self {
        Self { uuid: Uuid::new_v4() }
    }
}

impl Default for Eraser {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Eraser {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn name(&self) -> &'static str {
        "Eraser"
    }

    fn render_frame(&mut self, ctx: &mut FrameContext, host: &dyn Host) -> Result<(), FxError> {
        let frame = ctx.frame_index;
        match ctx.inpainted(host).map(|bg| bg.convert(PixelFormat::Rgba8)) {
            Some(background) => ctx.render_target = background,
            None => debug!("Eraser frame {}: no inpainting available, frame left as is", frame),
        }
        Ok(())
    }
}
