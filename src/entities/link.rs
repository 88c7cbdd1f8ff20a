//! Procedural chain links between two anchor points.
//!
//! A cubic Bezier is fitted through the anchors with two sagging interior
//! control points, sampled densely, and a link sprite is stamped at every
//! sample, rotated to follow the curve.
//!
//! # Algorithm
//!
//! ```text
//!   a ──────────────────────────── b        anchors
//!        p1 (20%, -offset)
//!                        p2 (80%, +offset)  offset = min(2, |ab|/50) * thickness * sag
//!
//!   N = floor(len(a,p1,p2,b) * 2.5 / thickness), at least 2
//!   for each sample pair (s_i, s_i+1):
//!       sprite rotated by 90° - atan2(s_i+1 - s_i)
//!       composited Normal, centered at s_i
//! ```
//!
//! The sprite is pre-scaled by `thickness / 100`. Nothing persists across
//! frames.

use glam::{IVec2, Vec2};
use log::trace;
use serde::{Deserialize, Serialize};

use super::compositor::{composite, BlendMode};
use super::frame::RasterBuffer;
use super::transform::{rotate_about_center, scale_sprite};

/// Samples per pixel of control polygon length at thickness 1
const DENSITY: f32 = 2.5;
/// Perpendicular offset saturates at this many thickness units
const MAX_SAG_UNITS: f32 = 2.0;
/// Anchor distance per sag unit
const SAG_DISTANCE: f32 = 50.0;

/// Link rendering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkOptions {
    /// Link size; sprite scale is `thickness_scale / 100`
    pub thickness_scale: f32,
    /// Multiplier on the perpendicular control-point offset (0 = straight)
    pub sag: f32,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            thickness_scale: 50.0,
            sag: 1.0,
        }
    }
}

/// Four-point control polygon for the link curve.
pub fn control_points(a: Vec2, b: Vec2, thickness: f32, sag: f32) -> [Vec2; 4] {
    let ab = b - a;
    let dist = ab.length();
    let normal = if dist > f32::EPSILON {
        Vec2::new(-ab.y, ab.x) / dist
    } else {
        Vec2::ZERO
    };
    let offset = normal * (MAX_SAG_UNITS.min(dist / SAG_DISTANCE) * thickness * sag);

    [a, a + ab * 0.2 - offset, a + ab * 0.8 + offset, b]
}

/// Total length of a polyline.
pub fn polygon_length(points: &[Vec2]) -> f32 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Number of curve samples for a control polygon of `length` pixels.
pub fn sample_count(length: f32, thickness: f32) -> usize {
    if thickness <= 0.0 || !length.is_finite() {
        return 2;
    }
    ((length * DENSITY / thickness).floor() as usize).max(2)
}

fn binomial(n: usize, k: usize) -> f32 {
    let mut r = 1.0f32;
    for i in 0..k {
        r = r * (n - i) as f32 / (i + 1) as f32;
    }
    r
}

/// Evaluate a Bezier curve of any degree at `t` (Bernstein form).
pub fn bezier_point(ctrl: &[Vec2], t: f32) -> Vec2 {
    let Some(n) = ctrl.len().checked_sub(1) else {
        return Vec2::ZERO;
    };
    ctrl.iter().enumerate().fold(Vec2::ZERO, |acc, (i, p)| {
        let w = binomial(n, i) * (1.0 - t).powi((n - i) as i32) * t.powi(i as i32);
        acc + *p * w
    })
}

/// `count` evenly spaced (in t) curve points, rounded to the pixel grid.
pub fn bezier_points(ctrl: &[Vec2], count: usize) -> Vec<Vec2> {
    match count {
        0 => Vec::new(),
        1 => vec![bezier_point(ctrl, 0.0).round()],
        _ => (0..count)
            .map(|i| bezier_point(ctrl, i as f32 / (count - 1) as f32).round())
            .collect(),
    }
}

/// Stamp a chain of `sprite` copies from `a` to `b` with default sag.
pub fn render_link(canvas: &mut RasterBuffer, a: Vec2, b: Vec2, sprite: &RasterBuffer, thickness_scale: f32) {
    let opts = LinkOptions {
        thickness_scale,
        ..LinkOptions::default()
    };
    render_link_with(canvas, a, b, sprite, &opts);
}

/// Stamp a chain of `sprite` copies from `a` to `b`.
///
/// Coincident anchors, a non-positive thickness or an empty sprite leave
/// the canvas untouched.
pub fn render_link_with(canvas: &mut RasterBuffer, a: Vec2, b: Vec2, sprite: &RasterBuffer, opts: &LinkOptions) {
    if a == b || opts.thickness_scale <= 0.0 || sprite.is_empty() {
        return;
    }

    let ctrl = control_points(a, b, opts.thickness_scale, opts.sag);
    let count = sample_count(polygon_length(&ctrl), opts.thickness_scale);
    let points = bezier_points(&ctrl, count);
    let link = scale_sprite(sprite, opts.thickness_scale / 100.0);
    trace!(
        "Link {:?} -> {:?}: {} samples, sprite {:?}",
        a,
        b,
        count,
        link.resolution()
    );

    let mut cached: Option<(f32, RasterBuffer)> = None;
    for pair in points.windows(2) {
        let d = pair[1] - pair[0];
        let tangent = d.y.atan2(d.x).to_degrees();
        let angle = 90.0 - tangent;

        let rotated = match cached.take() {
            Some((cached_angle, img)) if cached_angle == angle => img,
            _ => rotate_about_center(&link, angle),
        };
        composite(canvas, &rotated, IVec2::new(pair[0].x as i32, pair[0].y as i32), BlendMode::Normal, true);
        cached = Some((angle, rotated));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::frame::PixelFormat;

    fn canvas() -> RasterBuffer {
        RasterBuffer::filled(130, 40, PixelFormat::Rgba8, &[0, 0, 0, 255])
    }

    #[test]
    fn test_coincident_anchors_leave_canvas_untouched() {
        let mut c = canvas();
        let before = c.clone();
        let sprite = RasterBuffer::filled(9, 9, PixelFormat::Rgba8, &[255, 255, 255, 255]);
        render_link(&mut c, Vec2::new(40.0, 20.0), Vec2::new(40.0, 20.0), &sprite, 50.0);
        assert_eq!(c, before);
    }

    #[test]
    fn test_control_points_straight_without_sag() {
        let ctrl = control_points(Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0), 30.0, 0.0);
        assert_eq!(ctrl[1], Vec2::new(20.0, 0.0));
        assert_eq!(ctrl[2], Vec2::new(80.0, 0.0));
    }

    #[test]
    fn test_control_points_offset_alternates() {
        let ctrl = control_points(Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0), 10.0, 1.0);
        // min(2, 100/50) * 10 = 20 px either side
        assert!((ctrl[1].y + 20.0).abs() < 1e-4);
        assert!((ctrl[2].y - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_bezier_endpoints() {
        let ctrl = control_points(Vec2::new(3.0, 7.0), Vec2::new(90.0, 41.0), 20.0, 1.0);
        let pts = bezier_points(&ctrl, 17);
        assert_eq!(pts.len(), 17);
        assert_eq!(pts[0], Vec2::new(3.0, 7.0));
        assert_eq!(pts[16], Vec2::new(90.0, 41.0));
    }

    #[test]
    fn test_sample_count_scales_with_length_and_thickness() {
        assert_eq!(sample_count(100.0, 100.0), 2);
        assert_eq!(sample_count(100.0, 20.0), 12);
        assert_eq!(sample_count(200.0, 20.0), 25);
        assert_eq!(sample_count(1.0, 50.0), 2);
        assert_eq!(sample_count(100.0, 0.0), 2);
    }

    #[test]
    fn test_horizontal_link_is_vertically_symmetric() {
        // Left-right symmetric sprite: after the 90° turn it is top-bottom symmetric
        let mut sprite = RasterBuffer::new(5, 5, PixelFormat::Rgba8);
        for y in 0..5 {
            for x in 0..5 {
                let v = [40u8, 120, 250, 120, 40][x] - (y as u8) * 5;
                sprite.pixel_mut(x, y).copy_from_slice(&[v, 255 - v, v / 2, 255]);
            }
        }

        let mut c = canvas();
        let opts = LinkOptions {
            thickness_scale: 100.0,
            sag: 0.0,
        };
        render_link_with(&mut c, Vec2::new(10.0, 20.0), Vec2::new(110.0, 20.0), &sprite, &opts);

        assert_ne!(c, canvas());
        for k in 1..20 {
            for x in 0..130 {
                assert_eq!(c.pixel(x, 20 - k), c.pixel(x, 20 + k), "x {} k {}", x, k);
            }
        }
    }

    #[test]
    fn test_dense_link_symmetric_with_uniform_sprite() {
        let sprite = RasterBuffer::filled(10, 10, PixelFormat::Rgba8, &[200, 180, 20, 255]);
        let mut c = canvas();
        let opts = LinkOptions {
            thickness_scale: 50.0,
            sag: 0.0,
        };
        render_link_with(&mut c, Vec2::new(10.0, 20.0), Vec2::new(110.0, 20.0), &sprite, &opts);

        // 5x5 stamps centered on row 20 cover rows 18..=22
        assert_eq!(c.pixel(60, 20)[3], 255);
        assert_ne!(c.pixel(60, 20), &[0, 0, 0, 255]);
        for k in 1..20 {
            for x in 0..130 {
                assert_eq!(c.pixel(x, 20 - k), c.pixel(x, 20 + k));
            }
        }
    }
}
