//! Mask geometry - unions object masks into a smooth convex envelope.
//!
//! ```text
//! masks ──OR──> union ──contour──> points ──hull──> polygon ──fill──> hull mask ──blur──> glow mask
//!                  └───────────── no foreground: union passes through ──────────────┘
//! ```
//!
//! The hull joins separated blobs (an object at frame N-1 and N) into one
//! connected shape, so a per-frame glow reads as motion rather than two
//! disconnected halos. Trailing glow comes from feeding a fresh hull each
//! frame into an accumulator, never from unioning the whole history.

use glam::IVec2;
use log::trace;
use serde::{Deserialize, Serialize};

use super::blur::gaussian_blur;
use super::frame::{BBox, PixelFormat, RasterBuffer};

/// One tracked object's mask for one frame.
///
/// `mask` is single-channel; any nonzero value counts as foreground when
/// unioning. Host-produced samples are never mutated here.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskSample {
    pub mask: RasterBuffer,
    pub bbox: BBox,
}

impl MaskSample {
    /// Wrap a mask, computing its bounding box (any channel count is reduced to gray)
    pub fn new(mask: RasterBuffer) -> Self {
        let mask = mask.convert(PixelFormat::Gray8);
        let bbox = mask_bbox(&mask);
        Self { mask, bbox }
    }

    /// Solid rectangular mask of `width x height`, clamped
    pub fn from_rect(width: usize, height: usize, rect: BBox) -> Self {
        let mut mask = RasterBuffer::new(width, height, PixelFormat::Gray8);
        let r = rect.clamp(width, height);
        for y in r.y0..r.y1 {
            for x in r.x0..r.x1 {
                mask.pixel_mut(x as usize, y as usize)[0] = 255;
            }
        }
        Self { mask, bbox: r }
    }

    pub fn is_empty(&self) -> bool {
        self.bbox.is_empty()
    }
}

/// Tight bounding box of nonzero pixels (empty box when none)
pub fn mask_bbox(mask: &RasterBuffer) -> BBox {
    let (w, h) = mask.resolution();
    let ch = mask.channels();
    let mut b = BBox::new(w as i32, h as i32, 0, 0);
    let mut any = false;
    for y in 0..h {
        for x in 0..w {
            if mask.data()[(y * w + x) * ch] != 0 {
                any = true;
                b.x0 = b.x0.min(x as i32);
                b.y0 = b.y0.min(y as i32);
                b.x1 = b.x1.max(x as i32 + 1);
                b.y1 = b.y1.max(y as i32 + 1);
            }
        }
    }
    if any { b } else { BBox::default() }
}

/// Pixel-wise binary OR of all masks, at the first mask's resolution.
///
/// Later masks of a different size contribute their overlap only.
pub fn union_masks(masks: &[&MaskSample]) -> RasterBuffer {
    let Some(first) = masks.first() else {
        return RasterBuffer::new(0, 0, PixelFormat::Gray8);
    };
    let (w, h) = first.mask.resolution();
    let mut out = RasterBuffer::new(w, h, PixelFormat::Gray8);

    for sample in masks {
        let m = &sample.mask;
        let ow = w.min(m.width());
        let oh = h.min(m.height());
        let ch = m.channels();
        for y in 0..oh {
            for x in 0..ow {
                if m.data()[(y * m.width() + x) * ch] != 0 {
                    out.pixel_mut(x, y)[0] = 255;
                }
            }
        }
    }
    out
}

/// Points on the outer contour of the foreground: the leftmost and rightmost
/// foreground pixel of every row.
///
/// Every convex hull vertex of the foreground is among these, so the hull
/// over them equals the hull over the full external contour.
pub fn contour_points(mask: &RasterBuffer) -> Vec<IVec2> {
    let (w, h) = mask.resolution();
    let ch = mask.channels();
    let mut points = Vec::new();
    for y in 0..h {
        let row = &mask.data()[y * w * ch..(y + 1) * w * ch];
        let mut first = None;
        let mut last = None;
        for x in 0..w {
            if row[x * ch] != 0 {
                if first.is_none() {
                    first = Some(x);
                }
                last = Some(x);
            }
        }
        if let (Some(l), Some(r)) = (first, last) {
            points.push(IVec2::new(l as i32, y as i32));
            if r != l {
                points.push(IVec2::new(r as i32, y as i32));
            }
        }
    }
    points
}

#[inline]
fn cross(o: IVec2, a: IVec2, b: IVec2) -> i64 {
    (a.x - o.x) as i64 * (b.y - o.y) as i64 - (a.y - o.y) as i64 * (b.x - o.x) as i64
}

/// Convex hull (Andrew's monotone chain).
///
/// Collinear points are dropped. Returns 0, 1, 2 (degenerate segment) or
/// 3+ vertices in consistent winding order.
pub fn convex_hull(points: &[IVec2]) -> Vec<IVec2> {
    let mut pts: Vec<IVec2> = points.to_vec();
    pts.sort_by(|a, b| (a.x, a.y).cmp(&(b.x, b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut lower: Vec<IVec2> = Vec::with_capacity(pts.len());
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<IVec2> = Vec::with_capacity(pts.len());
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Rasterize a convex polygon (as returned by [`convex_hull`]) filled with 255.
///
/// Pixels whose coordinates lie inside or on the boundary are set. One- and
/// two-vertex polygons are drawn as a point / line segment.
pub fn fill_convex_polygon(mask: &mut RasterBuffer, hull: &[IVec2]) {
    let (w, h) = mask.resolution();
    let set = |p: IVec2, mask: &mut RasterBuffer| {
        if p.x >= 0 && p.y >= 0 && (p.x as usize) < w && (p.y as usize) < h {
            mask.pixel_mut(p.x as usize, p.y as usize)[0] = 255;
        }
    };

    match hull.len() {
        0 => {}
        1 => set(hull[0], mask),
        2 => {
            let (a, b) = (hull[0], hull[1]);
            let d = b - a;
            let steps = d.x.abs().max(d.y.abs());
            for i in 0..=steps {
                let t = i as f32 / steps.max(1) as f32;
                let p = IVec2::new(
                    (a.x as f32 + d.x as f32 * t).round() as i32,
                    (a.y as f32 + d.y as f32 * t).round() as i32,
                );
                set(p, mask);
            }
        }
        n => {
            let area = hull.iter().fold(
                BBox::new(i32::MAX, i32::MAX, i32::MIN, i32::MIN),
                |b, p| BBox::new(b.x0.min(p.x), b.y0.min(p.y), b.x1.max(p.x + 1), b.y1.max(p.y + 1)),
            );
            let area = area.clamp(w, h);
            for y in area.y0..area.y1 {
                for x in area.x0..area.x1 {
                    let p = IVec2::new(x, y);
                    let inside = (0..n).all(|i| cross(hull[i], hull[(i + 1) % n], p) >= 0);
                    if inside {
                        set(p, mask);
                    }
                }
            }
        }
    }
}

/// Blur sigma for a glow radius. Radius 0 still blurs (sigma 1).
pub fn blur_sigma(blur_radius: u32) -> f32 {
    (blur_radius / 4 + 1) as f32
}

/// Union masks, take the convex hull of the union, fill it and blur it.
///
/// Returns a single-channel graduated mask at the first mask's resolution.
/// All-zero input gives all-zero output; an empty list gives a 0x0 buffer.
pub fn combine_and_smooth(masks: &[&MaskSample], blur_radius: u32) -> RasterBuffer {
    let union = union_masks(masks);
    if union.is_empty() {
        return union;
    }

    let points = contour_points(&union);
    let filled = if points.is_empty() {
        // nothing to hull: pass the union through
        union
    } else {
        let hull = convex_hull(&points);
        trace!(
            "combine_and_smooth: {} masks, {} contour points, {} hull vertices",
            masks.len(),
            points.len(),
            hull.len()
        );
        let mut hull_mask = RasterBuffer::new(union.width(), union.height(), PixelFormat::Gray8);
        fill_convex_polygon(&mut hull_mask, &hull);
        hull_mask
    };

    gaussian_blur(&filled, blur_sigma(blur_radius))
}

/// Tint a graduated mask: RGBA with `color` everywhere and alpha = mask value.
pub fn mask_to_rgba(mask: &RasterBuffer, color: [u8; 3]) -> RasterBuffer {
    let gray = mask.convert(PixelFormat::Gray8);
    let mut out = RasterBuffer::new(gray.width(), gray.height(), PixelFormat::Rgba8);
    for (dst, &m) in out.data_mut().chunks_exact_mut(4).zip(gray.data()) {
        dst.copy_from_slice(&[color[0], color[1], color[2], m]);
    }
    out
}

/// Object cutout: RGBA with `source` pixels (or a flat `fill`) and alpha = mask.
///
/// Output has the mask's size; source pixels outside its bounds are transparent.
pub fn cutout(source: &RasterBuffer, mask: &RasterBuffer, fill: Option<[u8; 3]>) -> RasterBuffer {
    if let Some(color) = fill {
        return mask_to_rgba(mask, color);
    }
    let gray = mask.convert(PixelFormat::Gray8);
    let src = source.convert(PixelFormat::Rgba8);
    let (w, h) = gray.resolution();
    let mut out = RasterBuffer::new(w, h, PixelFormat::Rgba8);
    for y in 0..h.min(src.height()) {
        for x in 0..w.min(src.width()) {
            let m = gray.pixel(x, y)[0];
            if m == 0 {
                continue;
            }
            let s = src.pixel(x, y);
            let a = (s[3] as u16 * m as u16 / 255) as u8;
            out.pixel_mut(x, y).copy_from_slice(&[s[0], s[1], s[2], a]);
        }
    }
    out
}

/// Square-kernel dilation (max filter) of a single-channel mask.
pub fn dilate(mask: &RasterBuffer, radius: usize) -> RasterBuffer {
    if radius == 0 || mask.is_empty() {
        return mask.clone();
    }
    let gray = mask.convert(PixelFormat::Gray8);
    let (w, h) = gray.resolution();
    let r = radius as i32;

    // separable max: rows then columns
    let mut rows = RasterBuffer::new(w, h, PixelFormat::Gray8);
    for y in 0..h {
        for x in 0..w {
            let lo = (x as i32 - r).max(0) as usize;
            let hi = (x as i32 + r).min(w as i32 - 1) as usize;
            let v = (lo..=hi).map(|sx| gray.pixel(sx, y)[0]).max().unwrap_or(0);
            rows.pixel_mut(x, y)[0] = v;
        }
    }
    let mut out = RasterBuffer::new(w, h, PixelFormat::Gray8);
    for y in 0..h {
        let lo = (y as i32 - r).max(0) as usize;
        let hi = (y as i32 + r).min(h as i32 - 1) as usize;
        for x in 0..w {
            let v = (lo..=hi).map(|sy| rows.pixel(x, sy)[0]).max().unwrap_or(0);
            out.pixel_mut(x, y)[0] = v;
        }
    }
    out
}

/// Serializable mask summary used in logs and debug dumps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskStats {
    pub bbox: BBox,
    pub coverage: f32,
}

impl MaskStats {
    pub fn of(mask: &RasterBuffer) -> Self {
        let gray = mask.convert(PixelFormat::Gray8);
        let total = (gray.width() * gray.height()).max(1) as f32;
        let on = gray.data().iter().filter(|&&v| v != 0).count() as f32;
        Self {
            bbox: mask_bbox(&gray),
            coverage: on / total,
        }
    }
}
