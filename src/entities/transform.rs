//! 2D sprite transforms for chain links.
//!
//! Inverse mapping with glam::Affine2 in image space (Y-down):
//! for every output pixel, find the source position and sample it.
//!
//! Rotation sign: positive angle turns the sprite counter-clockwise on
//! screen. Rotation is about the exact pixel-grid center
//! `((w - 1) / 2, (h - 1) / 2)` and keeps the sprite's own size, so
//! corners that leave the frame are cut off.

use glam::{Affine2, Vec2};

use super::frame::{PixelFormat, RasterBuffer};

/// Check if a rotation/scale pair is a no-op.
#[inline]
pub fn is_identity(angle_deg: f32, scale: f32) -> bool {
    angle_deg.rem_euclid(360.0) == 0.0 && scale == 1.0
}

/// Build inverse rotation (dst pixel -> src pixel) about `center`.
///
/// Forward rotation is CCW-on-screen by `angle_deg`; in Y-down pixel space
/// the inverse is a plain glam rotation by the same angle.
pub fn build_inverse_rotation(angle_deg: f32, center: Vec2) -> Affine2 {
    Affine2::from_translation(center)
        * Affine2::from_angle(angle_deg.to_radians())
        * Affine2::from_translation(-center)
}

/// Sample RGBA8 buffer with bilinear interpolation.
///
/// Pixel centers sit at integer coordinates. Positions within half a pixel
/// outside the grid clamp to the edge; anything further is transparent.
/// Returns `[R, G, B, A]` in 0-255 range.
#[inline]
pub fn sample_bilinear(buffer: &RasterBuffer, x: f32, y: f32) -> [f32; 4] {
    let (width, height) = buffer.resolution();
    if width == 0 || height == 0 {
        return [0.0; 4];
    }
    if x < -0.5 || y < -0.5 || x > width as f32 - 0.5 || y > height as f32 - 0.5 {
        return [0.0; 4];
    }

    let xf = x.floor();
    let yf = y.floor();
    let fx = x - xf;
    let fy = y - yf;

    let max_x = width as i32 - 1;
    let max_y = height as i32 - 1;
    let x0 = (xf as i32).clamp(0, max_x) as usize;
    let y0 = (yf as i32).clamp(0, max_y) as usize;
    let x1 = (xf as i32 + 1).clamp(0, max_x) as usize;
    let y1 = (yf as i32 + 1).clamp(0, max_y) as usize;

    let c00 = buffer.pixel(x0, y0);
    let c10 = buffer.pixel(x1, y0);
    let c01 = buffer.pixel(x0, y1);
    let c11 = buffer.pixel(x1, y1);

    let mut result = [0.0f32; 4];
    for c in 0..4 {
        let top = c00[c] as f32 * (1.0 - fx) + c10[c] as f32 * fx;
        let bottom = c01[c] as f32 * (1.0 - fx) + c11[c] as f32 * fx;
        result[c] = top * (1.0 - fy) + bottom * fy;
    }
    result
}

/// Rotate a sprite about its center, keeping its size.
///
/// Output is RGBA8; uncovered corners are transparent.
pub fn rotate_about_center(sprite: &RasterBuffer, angle_deg: f32) -> RasterBuffer {
    let src = sprite.convert(PixelFormat::Rgba8);
    if src.is_empty() || is_identity(angle_deg, 1.0) {
        return src;
    }

    let (width, height) = src.resolution();
    let center = Vec2::new((width as f32 - 1.0) * 0.5, (height as f32 - 1.0) * 0.5);
    let inv = build_inverse_rotation(angle_deg, center);

    let mut out = RasterBuffer::new(width, height, PixelFormat::Rgba8);
    for y in 0..height {
        for x in 0..width {
            let p = inv.transform_point2(Vec2::new(x as f32, y as f32));
            let s = sample_bilinear(&src, p.x, p.y);
            let px = out.pixel_mut(x, y);
            for c in 0..4 {
                px[c] = s[c].round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    out
}

/// Scale a sprite uniformly. Dimensions truncate, with a floor of 1 pixel.
pub fn scale_sprite(sprite: &RasterBuffer, factor: f32) -> RasterBuffer {
    let src = sprite.convert(PixelFormat::Rgba8);
    if src.is_empty() || factor == 1.0 {
        return src;
    }
    let factor = factor.max(0.0);
    let w = ((src.width() as f32 * factor) as usize).max(1);
    let h = ((src.height() as f32 * factor) as usize).max(1);
    src.resize(w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_check() {
        assert!(is_identity(0.0, 1.0));
        assert!(is_identity(360.0, 1.0));
        assert!(!is_identity(90.0, 1.0));
        assert!(!is_identity(0.0, 0.5));
    }

    #[test]
    fn test_sample_exact_and_outside() {
        let mut buf = RasterBuffer::new(2, 1, PixelFormat::Rgba8);
        buf.pixel_mut(0, 0).copy_from_slice(&[0, 0, 0, 255]);
        buf.pixel_mut(1, 0).copy_from_slice(&[200, 0, 0, 255]);

        assert_eq!(sample_bilinear(&buf, 1.0, 0.0)[0], 200.0);
        assert_eq!(sample_bilinear(&buf, 0.5, 0.0)[0], 100.0);
        assert_eq!(sample_bilinear(&buf, -0.4, 0.0)[3], 255.0);
        assert_eq!(sample_bilinear(&buf, 2.0, 0.0), [0.0; 4]);
    }

    #[test]
    fn test_rotate_90_moves_right_edge_to_top() {
        // Red column on the right of a 3x3 sprite
        let mut sprite = RasterBuffer::new(3, 3, PixelFormat::Rgba8);
        for y in 0..3 {
            sprite.pixel_mut(2, y).copy_from_slice(&[255, 0, 0, 255]);
        }
        let out = rotate_about_center(&sprite, 90.0);
        // CCW on screen: right edge ends up on top
        for x in 0..3 {
            assert_eq!(out.pixel(x, 0), &[255, 0, 0, 255]);
            assert_eq!(out.pixel(x, 2)[3], 0);
        }
    }

    #[test]
    fn test_rotate_180_mirrors_both_axes() {
        let mut sprite = RasterBuffer::new(4, 2, PixelFormat::Rgba8);
        sprite.pixel_mut(0, 0).copy_from_slice(&[10, 20, 30, 255]);
        let out = rotate_about_center(&sprite, 180.0);
        assert_eq!(out.pixel(3, 1), &[10, 20, 30, 255]);
        assert_eq!(out.pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_scale_sprite_dimensions() {
        let sprite = RasterBuffer::filled(40, 20, PixelFormat::Rgb8, &[1, 2, 3]);
        let half = scale_sprite(&sprite, 0.5);
        assert_eq!(half.resolution(), (20, 10));
        assert_eq!(half.format(), PixelFormat::Rgba8);
        let tiny = scale_sprite(&sprite, 0.001);
        assert_eq!(tiny.resolution(), (1, 1));
    }
}
