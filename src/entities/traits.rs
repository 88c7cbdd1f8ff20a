//! Abstract traits for dependency inversion.
//!
//! These traits define what effects need from the host application:
//! segmentation, inpainting, the transform hierarchy, shader execution and
//! meta storage. Effects only ever see `&dyn Host`.
//!
//! Reference implementations live in `core/` module.

use glam::Vec2;

use super::attrs::MetaStore;
use super::error::FxError;
use super::frame::{PixelFormat, RasterBuffer};
use super::mask::MaskSample;
use super::shader::{ShaderProgram, UniformSet};

/// Tracked object identity, stable across frames
pub type ObjectId = u32;

/// Per-frame record handed to an effect.
///
/// Created by the host for one frame and discarded after.
#[derive(Debug, Clone)]
pub struct FrameContext {
    /// 0 at sequence start, strictly increasing afterwards
    pub frame_index: u64,
    /// Original decoded frame
    pub source_frame: RasterBuffer,
    /// Accumulating output, starts as an RGBA copy of the source
    pub render_target: RasterBuffer,
    /// Frame with tracked foreground removed, fetched on demand
    pub inpainted_background: Option<RasterBuffer>,
}

impl FrameContext {
    pub fn new(frame_index: u64, source_frame: RasterBuffer) -> Self {
        let render_target = source_frame.convert(PixelFormat::Rgba8);
        Self {
            frame_index,
            source_frame,
            render_target,
            inpainted_background: None,
        }
    }

    pub fn resolution(&self) -> (usize, usize) {
        self.source_frame.resolution()
    }

    /// Inpainted background, asking the host once if not supplied yet
    pub fn inpainted<H: InpaintingProvider + ?Sized>(&mut self, host: &H) -> Option<&RasterBuffer> {
        if self.inpainted_background.is_none() {
            self.inpainted_background = host.inpainted(self.frame_index);
        }
        self.inpainted_background.as_ref()
    }
}

/// Per-object segmentation masks.
pub trait SegmentationProvider {
    /// Mask for `id` at `frame_index`, or None if the object is not visible
    fn mask(&self, frame_index: u64, id: ObjectId) -> Option<MaskSample>;
}

/// Background with tracked objects removed.
pub trait InpaintingProvider {
    fn inpainted(&self, frame_index: u64) -> Option<RasterBuffer>;
}

/// Anchor points in global pixel space.
pub trait TransformHierarchy {
    fn anchor(&self, frame_index: u64, id: ObjectId) -> Option<Vec2>;

    /// Anchor of the object's parent, the start point of a link
    fn parent_anchor(&self, frame_index: u64, id: ObjectId) -> Option<Vec2>;
}

/// Executes one of the known fragment programs.
pub trait ShaderBackend {
    fn render(&self, program: ShaderProgram, uniforms: &UniformSet) -> Result<RasterBuffer, FxError>;
}

/// Everything an effect can ask of the host.
pub trait Host: SegmentationProvider + InpaintingProvider + TransformHierarchy + ShaderBackend {
    /// Video resolution (width, height)
    fn resolution(&self) -> (usize, usize);

    /// Objects tracked at `frame_index`, in render order
    fn objects(&self, frame_index: u64) -> Vec<ObjectId>;

    /// Effect-wide meta
    fn effect_meta(&self) -> &dyn MetaStore;

    /// Per-object meta; None for unknown objects
    fn object_meta(&self, id: ObjectId) -> Option<&dyn MetaStore>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoInpaint;

    impl InpaintingProvider for NoInpaint {
        fn inpainted(&self, _frame_index: u64) -> Option<RasterBuffer> {
            None
        }
    }

    struct FlatInpaint;

    impl InpaintingProvider for FlatInpaint {
        fn inpainted(&self, _frame_index: u64) -> Option<RasterBuffer> {
            Some(RasterBuffer::filled(2, 2, PixelFormat::Rgb8, &[7, 7, 7]))
        }
    }

    #[test]
    fn test_context_target_is_rgba_copy() {
        let src = RasterBuffer::filled(3, 2, PixelFormat::Rgb8, &[1, 2, 3]);
        let ctx = FrameContext::new(4, src);
        assert_eq!(ctx.render_target.format(), PixelFormat::Rgba8);
        assert_eq!(ctx.render_target.pixel(2, 1), &[1, 2, 3, 255]);
        assert_eq!(ctx.resolution(), (3, 2));
    }

    #[test]
    fn test_inpainted_fetched_on_demand() {
        let mut ctx = FrameContext::new(0, RasterBuffer::new(2, 2, PixelFormat::Rgb8));
        assert!(ctx.inpainted(&NoInpaint).is_none());
        assert_eq!(ctx.inpainted(&FlatInpaint).map(|b| b.pixel(0, 0)[0]), Some(7));
        // cached after first fetch
        assert!(ctx.inpainted(&NoInpaint).is_some());
    }
}
