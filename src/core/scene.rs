//! Synthetic host - moving rectangles over a gradient.
//!
//! Implements every host collaborator trait in memory so effects can run
//! without a segmentation model or GPU:
//!
//! | Trait | Source |
//! |-------|--------|
//! | SegmentationProvider | object rectangle at `start + velocity * frame` |
//! | InpaintingProvider | the gradient with no objects painted |
//! | TransformHierarchy | bbox center; parent anchor at the left edge |
//! | ShaderBackend | [`CpuShaderBackend`] |
//!
//! Objects are painted with a two-tone stripe pattern so warps and
//! resamples are visible against the gradient.

use glam::{IVec2, Vec2};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entities::attrs::{AttrValue, Attrs, MetaStore};
use crate::entities::error::FxError;
use crate::entities::frame::{BBox, PixelFormat, RasterBuffer};
use crate::entities::mask::MaskSample;
use crate::entities::shader::{ShaderProgram, UniformSet};
use crate::entities::traits::{
    Host, InpaintingProvider, ObjectId, SegmentationProvider, ShaderBackend, TransformHierarchy,
};

use super::shaders::CpuShaderBackend;

const STRIPE_A: [u8; 3] = [236, 196, 44];
const STRIPE_B: [u8; 3] = [40, 52, 180];
const STRIPE_WIDTH: i32 = 2;

/// One rectangle moving at constant velocity (pixels per frame).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub start: [i32; 2],
    pub size: [i32; 2],
    #[serde(default)]
    pub velocity: [i32; 2],
}

impl SceneObject {
    pub fn rect_at(&self, frame_index: u64) -> BBox {
        let f = frame_index as i32;
        let x0 = self.start[0] + self.velocity[0] * f;
        let y0 = self.start[1] + self.velocity[1] * f;
        BBox::new(x0, y0, x0 + self.size[0], y0 + self.size[1])
    }
}

/// In-memory host for tests and the demo binary.
#[derive(Debug, Clone)]
pub struct SyntheticScene {
    width: usize,
    height: usize,
    objects: IndexMap<ObjectId, SceneObject>,
    object_meta: IndexMap<ObjectId, Attrs>,
    effect_meta: Attrs,
    inpainting: bool,
    shaders: CpuShaderBackend,
}

impl SyntheticScene {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            objects: IndexMap::new(),
            object_meta: IndexMap::new(),
            effect_meta: Attrs::new(),
            inpainting: true,
            shaders: CpuShaderBackend::new(),
        }
    }

    /// One square object (id 1) of `size` starting at `start`
    pub fn single_mover(width: usize, height: usize, size: i32, start: IVec2, velocity: IVec2) -> Self {
        let mut scene = Self::new(width, height);
        scene.add_object(SceneObject {
            start: start.to_array(),
            size: [size, size],
            velocity: velocity.to_array(),
        });
        scene
    }

    /// Three objects crossing the frame in different directions
    pub fn demo(width: usize, height: usize) -> Self {
        let (w, h) = (width as i32, height as i32);
        let s = (w.min(h) / 8).max(4);
        let mut scene = Self::new(width, height);
        scene.add_object(SceneObject {
            start: [s, h / 4],
            size: [s, s],
            velocity: [(w / 60).max(1), 0],
        });
        scene.add_object(SceneObject {
            start: [w / 2, h - 2 * s],
            size: [s * 3 / 2, s],
            velocity: [0, -(h / 90).max(1)],
        });
        scene.add_object(SceneObject {
            start: [w - 2 * s, s],
            size: [s, s * 2],
            velocity: [-(w / 80).max(1), (h / 120).max(1)],
        });
        scene
    }

    /// Register an object; ids count up from 1
    pub fn add_object(&mut self, object: SceneObject) -> ObjectId {
        let id = self.objects.keys().max().map_or(1, |last| last + 1);
        self.objects.insert(id, object);
        id
    }

    pub fn set_object_meta(&mut self, id: ObjectId, key: &str, value: AttrValue) {
        self.object_meta.entry(id).or_default().set(key, value);
    }

    /// Merge a whole meta block into an object's meta
    pub fn merge_object_meta(&mut self, id: ObjectId, meta: &Attrs) {
        self.object_meta.entry(id).or_default().merge(meta);
    }

    pub fn set_effect_meta(&mut self, key: &str, value: AttrValue) {
        self.effect_meta.set(key, value);
    }

    pub fn set_inpainting(&mut self, enabled: bool) {
        self.inpainting = enabled;
    }

    fn object_rect(&self, frame_index: u64, id: ObjectId) -> Option<BBox> {
        self.objects
            .get(&id)
            .map(|o| o.rect_at(frame_index))
            .filter(|r| !r.clamp(self.width, self.height).is_empty())
    }

    /// Gradient with no objects painted
    pub fn background(&self, _frame_index: u64) -> RasterBuffer {
        let (w, h) = (self.width, self.height);
        let mut frame = RasterBuffer::new(w, h, PixelFormat::Rgb8);
        for y in 0..h {
            for x in 0..w {
                let r = (x * 255 / w.max(1)) as u8;
                let g = (y * 255 / h.max(1)) as u8;
                frame.pixel_mut(x, y).copy_from_slice(&[r, g, 96]);
            }
        }
        frame
    }

    /// Gradient with every visible object painted in stripes
    pub fn source_frame(&self, frame_index: u64) -> RasterBuffer {
        let mut frame = self.background(frame_index);
        for id in self.objects(frame_index) {
            let Some(rect) = self.object_rect(frame_index, id) else {
                continue;
            };
            let visible = rect.clamp(self.width, self.height);
            for y in visible.y0..visible.y1 {
                for x in visible.x0..visible.x1 {
                    let band = ((x - rect.x0) / STRIPE_WIDTH) % 2;
                    let color = if band == 0 { STRIPE_A } else { STRIPE_B };
                    frame.pixel_mut(x as usize, y as usize).copy_from_slice(&color);
                }
            }
        }
        frame
    }

    /// Object anchor: bbox center
    pub fn anchor_at(&self, frame_index: u64, id: ObjectId) -> Vec2 {
        self.anchor(frame_index, id).unwrap_or(Vec2::ZERO)
    }

    /// Parent anchor: left frame edge at the object's starting center row
    pub fn parent_anchor_at(&self, frame_index: u64, id: ObjectId) -> Vec2 {
        self.parent_anchor(frame_index, id).unwrap_or(Vec2::ZERO)
    }
}

impl SegmentationProvider for SyntheticScene {
    fn mask(&self, frame_index: u64, id: ObjectId) -> Option<MaskSample> {
        self.object_rect(frame_index, id)
            .map(|rect| MaskSample::from_rect(self.width, self.height, rect))
    }
}

impl InpaintingProvider for SyntheticScene {
    fn inpainted(&self, frame_index: u64) -> Option<RasterBuffer> {
        self.inpainting.then(|| self.background(frame_index))
    }
}

impl TransformHierarchy for SyntheticScene {
    fn anchor(&self, frame_index: u64, id: ObjectId) -> Option<Vec2> {
        self.object_rect(frame_index, id).map(|rect| rect.center())
    }

    fn parent_anchor(&self, frame_index: u64, id: ObjectId) -> Option<Vec2> {
        self.object_rect(frame_index, id)?;
        let first = self.objects.get(&id)?.rect_at(0);
        Some(Vec2::new(0.0, first.center().y))
    }
}

impl ShaderBackend for SyntheticScene {
    fn render(&self, program: ShaderProgram, uniforms: &UniformSet) -> Result<RasterBuffer, FxError> {
        self.shaders.render(program, uniforms)
    }
}

impl Host for SyntheticScene {
    fn resolution(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn objects(&self, frame_index: u64) -> Vec<ObjectId> {
        self.objects
            .keys()
            .copied()
            .filter(|&id| self.object_rect(frame_index, id).is_some())
            .collect()
    }

    fn effect_meta(&self) -> &dyn MetaStore {
        &self.effect_meta
    }

    fn object_meta(&self, id: ObjectId) -> Option<&dyn MetaStore> {
        self.object_meta.get(&id).map(|m| m as &dyn MetaStore)
    }
}

/// Procedural chain link: an opaque ring with a transparent hole, `size` px square
pub fn link_sprite(size: usize) -> RasterBuffer {
    let mut sprite = RasterBuffer::new(size, size, PixelFormat::Rgba8);
    let c = (size as f32 - 1.0) * 0.5;
    let outer = size as f32 * 0.5;
    let inner = outer * 0.45;
    for y in 0..size {
        for x in 0..size {
            let d = Vec2::new(x as f32 - c, y as f32 - c).length();
            if d <= outer && d >= inner {
                let shade = (200.0 - 80.0 * (d - inner) / (outer - inner).max(1.0)) as u8;
                sprite.pixel_mut(x, y).copy_from_slice(&[shade, shade, shade.saturating_add(20), 255]);
            }
        }
    }
    sprite
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mover_positions() {
        let scene = SyntheticScene::single_mover(64, 32, 8, IVec2::new(2, 12), IVec2::new(4, 0));
        assert_eq!(scene.objects(0), vec![1]);
        let mask = scene.mask(5, 1).unwrap();
        assert_eq!(mask.bbox, BBox::new(22, 12, 30, 20));
        assert_eq!(scene.anchor_at(5, 1), Vec2::new(26.0, 16.0));
        assert_eq!(scene.parent_anchor_at(5, 1), Vec2::new(0.0, 16.0));
    }

    #[test]
    fn test_object_leaves_frame() {
        let scene = SyntheticScene::single_mover(20, 10, 4, IVec2::new(0, 3), IVec2::new(10, 0));
        assert_eq!(scene.objects(1), vec![1]);
        assert!(scene.objects(2).is_empty());
        assert!(scene.mask(2, 1).is_none());
        assert!(scene.anchor(2, 1).is_none());
    }

    #[test]
    fn test_background_has_no_objects() {
        let scene = SyntheticScene::single_mover(20, 20, 6, IVec2::new(7, 7), IVec2::ZERO);
        let src = scene.source_frame(0);
        let bg = scene.background(0);
        assert_ne!(src.pixel(9, 9), bg.pixel(9, 9));
        assert_eq!(src.pixel(1, 1), bg.pixel(1, 1));
        assert_eq!(scene.inpainted(0), Some(bg));
    }

    #[test]
    fn test_meta_lookup() {
        let mut scene = SyntheticScene::demo(120, 80);
        assert_eq!(scene.objects(0).len(), 3);
        scene.set_object_meta(2, "pixel_size", AttrValue::Int(6));
        assert_eq!(scene.object_meta(2).map(|m| m.int_or("pixel_size", 1)), Some(6));
        assert!(scene.object_meta(1).is_none());
        scene.set_effect_meta("trail_length", AttrValue::Float(20.0));
        assert_eq!(scene.effect_meta().float_or("trail_length", 0.0), 20.0);
    }

    #[test]
    fn test_link_sprite_has_hole() {
        let sprite = link_sprite(16);
        assert_eq!(sprite.alpha(8, 8), 0);
        assert_eq!(sprite.alpha(8, 1), 255);
    }
}
