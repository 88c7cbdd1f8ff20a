//! Pixelate - blocky objects with optional flat noisy color.
//!
//! # Algorithm
//!
//! For each object with `pixel_size > 1` and a non-empty bbox:
//!
//! 1. Grow the bbox by 5 px, clamped to the frame
//! 2. Dilate the mask crop (3x3), then nearest down/up sample it
//! 3. Nearest downsample the source crop by `pixel_size`
//! 4. With `pixel_color`: replace every small pixel by that color with
//!    value (HSV V) jittered by a deterministic +/-20
//! 5. Nearest upsample and composite the cutout at the grown bbox
//!
//! Objects with `pixel_size <= 1` are drawn plainly; zero-size bboxes are
//! skipped.

use glam::IVec2;
use log::trace;
use uuid::Uuid;

use crate::entities::attrs::{Attrs, MetaStore};
use crate::entities::color::{hsv_to_rgb, rgb_to_hsv};
use crate::entities::compositor::{blend, BlendMode};
use crate::entities::error::FxError;
use crate::entities::frame::{PixelFormat, RasterBuffer};
use crate::entities::keys::{A_PIXEL_COLOR, A_PIXEL_SIZE, DEFAULT_PIXEL_SIZE, PIXELATE_MARGIN, PIXEL_NOISE};
use crate::entities::mask::{cutout, dilate};
use crate::entities::traits::{FrameContext, Host, ObjectId};

use super::{object_mask, object_view, render_object, Effect};

#[derive(Debug, Clone)]
pub struct Pixelate {
    uuid: Uuid,
    settings: Attrs,
}

impl Pixelate {
    pub fn new(settings: &Attrs) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            settings: settings.clone(),
        }
    }
}

/// Downsampled size for a `len` pixel span (rounded, at least 1)
pub fn block_count(len: usize, pixel_size: usize) -> usize {
    ((len as f32 / pixel_size.max(1) as f32).round() as usize).max(1)
}

/// SplitMix64 finalizer; stable across runs and platforms
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Noise in `[-PIXEL_NOISE, PIXEL_NOISE)` for one block
pub fn value_noise(frame: u64, id: ObjectId, x: usize, y: usize) -> i32 {
    let seed = mix(frame ^ mix((id as u64) << 32 ^ (x as u64) << 16 ^ y as u64));
    (seed % (2 * PIXEL_NOISE as u64)) as i32 - PIXEL_NOISE
}

/// Fill `small` with `color`, each pixel's value jittered
fn fill_noisy(small: &mut RasterBuffer, color: [u8; 3], frame: u64, id: ObjectId) {
    let (h, s, v) = rgb_to_hsv(color[0] as f32 / 255.0, color[1] as f32 / 255.0, color[2] as f32 / 255.0);
    let base = (v * 255.0).round() as i32;
    for y in 0..small.height() {
        for x in 0..small.width() {
            let jittered = (base + value_noise(frame, id, x, y)).clamp(0, 255) as f32 / 255.0;
            let (r, g, b) = hsv_to_rgb(h, s, jittered);
            let px = small.pixel_mut(x, y);
            px[0] = (r * 255.0).round() as u8;
            px[1] = (g * 255.0).round() as u8;
            px[2] = (b * 255.0).round() as u8;
            px[3] = 255;
        }
    }
}

impl Effect for Pixelate {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn name(&self) -> &'static str {
        "Pixelate"
    }

    fn render_frame(&mut self, ctx: &mut FrameContext, host: &dyn Host) -> Result<(), FxError> {
        let frame = ctx.frame_index;
        let (w, h) = ctx.resolution();

        for id in host.objects(frame) {
            let Some(sample) = object_mask(host, frame, id) else {
                continue;
            };
            let meta = object_view(host, id, &self.settings);
            let pixel_size = meta.int_or(A_PIXEL_SIZE, DEFAULT_PIXEL_SIZE as i32).max(1) as usize;
            if pixel_size <= 1 {
                render_object(ctx, &sample.mask, None);
                continue;
            }
            if sample.bbox.is_empty() {
                continue;
            }

            let region = sample.bbox.expand(PIXELATE_MARGIN).clamp(w, h);
            let (rw, rh) = (region.width() as usize, region.height() as usize);
            let (sw, sh) = (block_count(rw, pixel_size), block_count(rh, pixel_size));
            trace!(
                "Pixelate frame {}: object {} region {:?} -> {}x{} blocks",
                frame,
                id,
                region,
                sw,
                sh
            );

            let mask = dilate(&sample.mask.crop(region), 1)
                .resize_nearest(sw, sh)
                .resize_nearest(rw, rh);

            let mut small = ctx
                .source_frame
                .crop(region)
                .convert(PixelFormat::Rgba8)
                .resize_nearest(sw, sh);
            if let Some(color) = meta.color(A_PIXEL_COLOR) {
                fill_noisy(&mut small, color, frame, id);
            }
            let blocks = small.resize_nearest(rw, rh);

            let patch = cutout(&blocks, &mask, None);
            blend(&mut ctx.render_target, &patch, IVec2::new(region.x0, region.y0), BlendMode::Normal);
        }
        Ok(())
    }
}
