//! 8-bit raster buffers shared by every effect stage.
//!
//! Layout is row-major, interleaved, `width * height * channels` bytes.
//!
//! # Pixel Formats
//!
//! - `PixelFormat::Gray8`: masks, 1 byte/pixel
//! - `PixelFormat::Rgb8`: opaque color (source frames, inpainted plates), 3 bytes/pixel
//! - `PixelFormat::Rgba8`: color + alpha (render targets, trails, sprites), 4 bytes/pixel
//!
//! Channel order is whatever the host pipeline uses; nothing here assumes
//! RGB vs BGR except the PNG helpers, which write the bytes as RGB(A).

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::FxError;

/// Pixel format type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Gray8, // single-channel mask
    Rgb8,  // color, implicitly opaque
    Rgba8, // color + alpha
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        self == PixelFormat::Rgba8
    }
}

/// Axis-aligned pixel rectangle, `[x0, x1) x [y0, y1)`.
///
/// Coordinates may be negative or past the buffer edge until clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl BBox {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> i32 {
        (self.x1 - self.x0).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y1 - self.y0).max(0)
    }

    /// Zero-area boxes are skipped by every effect
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn center(&self) -> glam::Vec2 {
        glam::Vec2::new(
            (self.x0 + self.x1) as f32 * 0.5,
            (self.y0 + self.y1) as f32 * 0.5,
        )
    }

    pub fn size(&self) -> glam::Vec2 {
        glam::Vec2::new(self.width() as f32, self.height() as f32)
    }

    /// Grow by `margin` on every side (negative shrinks)
    pub fn expand(&self, margin: i32) -> Self {
        Self::new(
            self.x0 - margin,
            self.y0 - margin,
            self.x1 + margin,
            self.y1 + margin,
        )
    }

    /// Clamp into `[0, width) x [0, height)`. Never produces negative size.
    pub fn clamp(&self, width: usize, height: usize) -> Self {
        let w = width as i32;
        let h = height as i32;
        let x0 = self.x0.clamp(0, w);
        let y0 = self.y0.clamp(0, h);
        let x1 = self.x1.clamp(x0, w);
        let y1 = self.y1.clamp(y0, h);
        Self::new(x0, y0, x1, y1)
    }
}

/// 2D 8-bit pixel grid with 1, 3 or 4 channels
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBuffer {
    data: Vec<u8>,
    format: PixelFormat,
    width: usize,
    height: usize,
}

impl RasterBuffer {
    /// Create zero-filled buffer (transparent black for RGBA)
    pub fn new(width: usize, height: usize, format: PixelFormat) -> Self {
        Self {
            data: vec![0u8; width * height * format.channels()],
            format,
            width,
            height,
        }
    }

    /// Create buffer with every pixel set to `color`.
    ///
    /// `color` is repeated per pixel; extra components are ignored and
    /// missing ones are zero.
    pub fn filled(width: usize, height: usize, format: PixelFormat, color: &[u8]) -> Self {
        let ch = format.channels();
        let mut px = [0u8; 4];
        for (dst, src) in px.iter_mut().zip(color.iter()).take(ch) {
            *dst = *src;
        }
        let mut data = vec![0u8; width * height * ch];
        for chunk in data.chunks_exact_mut(ch) {
            chunk.copy_from_slice(&px[..ch]);
        }
        Self {
            data,
            format,
            width,
            height,
        }
    }

    /// Wrap existing pixel data. Fails if the length doesn't match the layout.
    pub fn from_raw(
        data: Vec<u8>,
        format: PixelFormat,
        width: usize,
        height: usize,
    ) -> Result<Self, FxError> {
        let expected = width * height * format.channels();
        if data.len() != expected {
            return Err(FxError::Image(format!(
                "buffer length {} doesn't match {}x{} {:?} ({} bytes)",
                data.len(),
                width,
                height,
                format,
                expected
            )));
        }
        Ok(Self {
            data,
            format,
            width,
            height,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// (width, height)
    pub fn resolution(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn channels(&self) -> usize {
        self.format.channels()
    }

    pub fn has_alpha(&self) -> bool {
        self.format.has_alpha()
    }

    /// True for 0-width or 0-height buffers
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Byte offset of pixel (x, y)
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        (y * self.width + x) * self.channels()
    }

    /// Pixel channels at (x, y). Panics when out of bounds.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let i = self.index(x, y);
        &self.data[i..i + self.channels()]
    }

    #[inline]
    pub fn pixel_mut(&mut self, x: usize, y: usize) -> &mut [u8] {
        let i = self.index(x, y);
        let ch = self.channels();
        &mut self.data[i..i + ch]
    }

    /// Alpha at (x, y); 255 for formats without alpha
    #[inline]
    pub fn alpha(&self, x: usize, y: usize) -> u8 {
        if self.has_alpha() {
            self.data[self.index(x, y) + 3]
        } else {
            255
        }
    }

    /// Zero every byte
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Overwrite every pixel with `color` (same rules as [`RasterBuffer::filled`])
    pub fn fill(&mut self, color: &[u8]) {
        *self = Self::filled(self.width, self.height, self.format, color);
    }

    /// Copy of the region inside `rect`, clamped to the buffer bounds.
    pub fn crop(&self, rect: BBox) -> RasterBuffer {
        let r = rect.clamp(self.width, self.height);
        let (w, h) = (r.width() as usize, r.height() as usize);
        let ch = self.channels();
        let mut out = RasterBuffer::new(w, h, self.format);
        for y in 0..h {
            let src = self.index(r.x0 as usize, r.y0 as usize + y);
            let dst = y * w * ch;
            out.data[dst..dst + w * ch].copy_from_slice(&self.data[src..src + w * ch]);
        }
        out
    }

    /// Convert between pixel formats.
    ///
    /// - Gray -> color replicates the value, alpha 255
    /// - Color -> Gray uses Rec.601 luma
    /// - Rgb -> Rgba adds alpha 255; Rgba -> Rgb drops alpha
    pub fn convert(&self, format: PixelFormat) -> RasterBuffer {
        if format == self.format {
            return self.clone();
        }
        let src_ch = self.channels();
        let dst_ch = format.channels();
        let mut data = Vec::with_capacity(self.width * self.height * dst_ch);
        for px in self.data.chunks_exact(src_ch) {
            let (r, g, b, a) = match self.format {
                PixelFormat::Gray8 => (px[0], px[0], px[0], 255),
                PixelFormat::Rgb8 => (px[0], px[1], px[2], 255),
                PixelFormat::Rgba8 => (px[0], px[1], px[2], px[3]),
            };
            match format {
                PixelFormat::Gray8 => {
                    let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
                    data.push(luma.round().clamp(0.0, 255.0) as u8);
                }
                PixelFormat::Rgb8 => data.extend_from_slice(&[r, g, b]),
                PixelFormat::Rgba8 => data.extend_from_slice(&[r, g, b, a]),
            }
        }
        RasterBuffer {
            data,
            format,
            width: self.width,
            height: self.height,
        }
    }

    /// Resample to a new size (area-averaging filter via `image`).
    pub fn resize(&self, width: usize, height: usize) -> RasterBuffer {
        if (width, height) == self.resolution() {
            return self.clone();
        }
        if width == 0 || height == 0 || self.is_empty() {
            return RasterBuffer::new(width, height, self.format);
        }
        let filter = image::imageops::FilterType::Triangle;
        let (w, h) = (width as u32, height as u32);
        let data = match self.to_dynamic() {
            Some(img) => img.resize_exact(w, h, filter),
            None => return RasterBuffer::new(width, height, self.format),
        };
        let bytes = match self.format {
            PixelFormat::Gray8 => data.into_luma8().into_raw(),
            PixelFormat::Rgb8 => data.into_rgb8().into_raw(),
            PixelFormat::Rgba8 => data.into_rgba8().into_raw(),
        };
        RasterBuffer {
            data: bytes,
            format: self.format,
            width,
            height,
        }
    }

    /// Nearest-neighbour resample, used for hard-edged pixelation
    pub fn resize_nearest(&self, width: usize, height: usize) -> RasterBuffer {
        let mut out = RasterBuffer::new(width, height, self.format);
        if self.is_empty() || width == 0 || height == 0 {
            return out;
        }
        let ch = self.channels();
        for y in 0..height {
            let sy = (y * self.height / height).min(self.height - 1);
            for x in 0..width {
                let sx = (x * self.width / width).min(self.width - 1);
                let s = self.index(sx, sy);
                let d = out.index(x, y);
                out.data[d..d + ch].copy_from_slice(&self.data[s..s + ch]);
            }
        }
        out
    }

    fn to_dynamic(&self) -> Option<image::DynamicImage> {
        let (w, h) = (self.width as u32, self.height as u32);
        let data = self.data.clone();
        match self.format {
            PixelFormat::Gray8 => image::GrayImage::from_raw(w, h, data).map(image::DynamicImage::ImageLuma8),
            PixelFormat::Rgb8 => image::RgbImage::from_raw(w, h, data).map(image::DynamicImage::ImageRgb8),
            PixelFormat::Rgba8 => image::RgbaImage::from_raw(w, h, data).map(image::DynamicImage::ImageRgba8),
        }
    }

    /// Decode an image file into an RGBA buffer (link sprites, templates)
    pub fn load(path: &Path) -> Result<RasterBuffer, FxError> {
        let img = image::open(path)
            .map_err(|e| FxError::Image(format!("{}: {}", path.display(), e)))?
            .into_rgba8();
        let (w, h) = img.dimensions();
        RasterBuffer::from_raw(img.into_raw(), PixelFormat::Rgba8, w as usize, h as usize)
    }

    /// Encode as PNG
    pub fn save_png(&self, path: &Path) -> Result<(), FxError> {
        let img = self
            .to_dynamic()
            .ok_or_else(|| FxError::Image(format!("can't encode {}x{}", self.width, self.height)))?;
        img.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_clamp_never_negative() {
        let b = BBox::new(-20, -5, -10, 3).clamp(100, 100);
        assert_eq!(b.width(), 0);
        assert!(b.is_empty());

        let b = BBox::new(90, 90, 130, 140).clamp(100, 100);
        assert_eq!(b, BBox::new(90, 90, 100, 100));
    }

    #[test]
    fn test_from_raw_rejects_bad_length() {
        assert!(RasterBuffer::from_raw(vec![0; 10], PixelFormat::Rgba8, 2, 2).is_err());
        assert!(RasterBuffer::from_raw(vec![0; 16], PixelFormat::Rgba8, 2, 2).is_ok());
    }

    #[test]
    fn test_crop_clamps_to_bounds() {
        let buf = RasterBuffer::filled(10, 10, PixelFormat::Rgb8, &[1, 2, 3]);
        let c = buf.crop(BBox::new(-5, 8, 4, 20));
        assert_eq!(c.resolution(), (4, 2));
        assert_eq!(c.pixel(0, 0), &[1, 2, 3]);
    }

    #[test]
    fn test_convert_gray_to_rgba_is_opaque() {
        let g = RasterBuffer::filled(2, 1, PixelFormat::Gray8, &[77]);
        let c = g.convert(PixelFormat::Rgba8);
        assert_eq!(c.pixel(1, 0), &[77, 77, 77, 255]);
        assert_eq!(c.convert(PixelFormat::Gray8).pixel(0, 0), &[77]);
    }

    #[test]
    fn test_nearest_resize_keeps_blocks() {
        let mut src = RasterBuffer::new(2, 1, PixelFormat::Gray8);
        src.pixel_mut(1, 0)[0] = 200;
        let up = src.resize_nearest(4, 2);
        assert_eq!(up.pixel(0, 1), &[0]);
        assert_eq!(up.pixel(1, 0), &[0]);
        assert_eq!(up.pixel(2, 0), &[200]);
        assert_eq!(up.pixel(3, 1), &[200]);
    }
}
