//! Blend engine - composites one raster buffer onto another.
//!
//! Every effect funnels its pixels through [`blend`]: trails into their
//! accumulators, accumulators onto the render target, link sprites along
//! their curve.
//!
//! Per pixel, with source alpha `a` (1.0 when the source has no alpha):
//!
//! ```text
//! color = dst * (1 - a) + f(dst, src) * a
//! alpha = a + dst_alpha * (1 - a)          // only for RGBA destinations
//! ```
//!
//! `f` is picked once per call from the mode's kernel table: a per-channel
//! function for the separable modes, an HSL component swap for
//! Hue/Saturation/Color/Luminosity.

use std::str::FromStr;

use glam::IVec2;
use log::trace;
use serde::{Deserialize, Serialize};

use super::color::{hsl_to_rgb, rgb_to_hsl};
use super::error::FxError;
use super::frame::{BBox, PixelFormat, RasterBuffer};

/// Supported blend modes for compositing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
    Subtractive,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    /// Get human-readable name for UI display
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Additive => "Additive",
            Self::Subtractive => "Subtractive",
            Self::Multiply => "Multiply",
            Self::Screen => "Screen",
            Self::Overlay => "Overlay",
            Self::Darken => "Darken",
            Self::Lighten => "Lighten",
            Self::ColorDodge => "Color Dodge",
            Self::ColorBurn => "Color Burn",
            Self::HardLight => "Hard Light",
            Self::SoftLight => "Soft Light",
            Self::Difference => "Difference",
            Self::Exclusion => "Exclusion",
            Self::Hue => "Hue",
            Self::Saturation => "Saturation",
            Self::Color => "Color",
            Self::Luminosity => "Luminosity",
        }
    }

    /// All blend modes in display order.
    pub fn all() -> &'static [BlendMode] {
        &[
            Self::Normal,
            Self::Additive,
            Self::Subtractive,
            Self::Multiply,
            Self::Screen,
            Self::Overlay,
            Self::Darken,
            Self::Lighten,
            Self::ColorDodge,
            Self::ColorBurn,
            Self::HardLight,
            Self::SoftLight,
            Self::Difference,
            Self::Exclusion,
            Self::Hue,
            Self::Saturation,
            Self::Color,
            Self::Luminosity,
        ]
    }

    fn kernel(self) -> Kernel {
        match self {
            Self::Normal => Kernel::Channel(|_, s| s),
            Self::Additive => Kernel::Channel(|d, s| (d + s).min(1.0)),
            Self::Subtractive => Kernel::Channel(|d, s| (d - s).max(0.0)),
            Self::Multiply => Kernel::Channel(|d, s| d * s),
            Self::Screen => Kernel::Channel(screen),
            Self::Overlay => Kernel::Channel(|d, s| hard_light(s, d)),
            Self::Darken => Kernel::Channel(f32::min),
            Self::Lighten => Kernel::Channel(f32::max),
            Self::ColorDodge => Kernel::Channel(color_dodge),
            Self::ColorBurn => Kernel::Channel(color_burn),
            Self::HardLight => Kernel::Channel(hard_light),
            Self::SoftLight => Kernel::Channel(soft_light),
            Self::Difference => Kernel::Channel(|d, s| (d - s).abs()),
            Self::Exclusion => Kernel::Channel(|d, s| d + s - 2.0 * d * s),
            Self::Hue => Kernel::Pixel(|d, s| {
                let (_, ds, dl) = rgb_to_hsl(d[0], d[1], d[2]);
                let (sh, _, _) = rgb_to_hsl(s[0], s[1], s[2]);
                hsl_to_rgb(sh, ds, dl).into()
            }),
            Self::Saturation => Kernel::Pixel(|d, s| {
                let (dh, _, dl) = rgb_to_hsl(d[0], d[1], d[2]);
                let (_, ss, _) = rgb_to_hsl(s[0], s[1], s[2]);
                hsl_to_rgb(dh, ss, dl).into()
            }),
            Self::Color => Kernel::Pixel(|d, s| {
                let (_, _, dl) = rgb_to_hsl(d[0], d[1], d[2]);
                let (sh, ss, _) = rgb_to_hsl(s[0], s[1], s[2]);
                hsl_to_rgb(sh, ss, dl).into()
            }),
            Self::Luminosity => Kernel::Pixel(|d, s| {
                let (dh, ds, _) = rgb_to_hsl(d[0], d[1], d[2]);
                let (_, _, sl) = rgb_to_hsl(s[0], s[1], s[2]);
                hsl_to_rgb(dh, ds, sl).into()
            }),
        }
    }
}

impl std::fmt::Display for BlendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for BlendMode {
    type Err = FxError;

    /// Case-insensitive; spaces, dashes and underscores are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let mode = match key.as_str() {
            "normal" => Self::Normal,
            "additive" | "add" => Self::Additive,
            "subtractive" | "subtract" => Self::Subtractive,
            "multiply" => Self::Multiply,
            "screen" => Self::Screen,
            "overlay" => Self::Overlay,
            "darken" => Self::Darken,
            "lighten" => Self::Lighten,
            "colordodge" => Self::ColorDodge,
            "colorburn" => Self::ColorBurn,
            "hardlight" => Self::HardLight,
            "softlight" => Self::SoftLight,
            "difference" => Self::Difference,
            "exclusion" => Self::Exclusion,
            "hue" => Self::Hue,
            "saturation" => Self::Saturation,
            "color" => Self::Color,
            "luminosity" => Self::Luminosity,
            _ => return Err(FxError::UnsupportedBlendMode(s.to_string())),
        };
        Ok(mode)
    }
}

impl TryFrom<String> for BlendMode {
    type Error = FxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BlendMode> for String {
    fn from(mode: BlendMode) -> Self {
        mode.display_name().to_string()
    }
}

/// Blend function resolved once per call
#[derive(Clone, Copy)]
enum Kernel {
    Channel(fn(f32, f32) -> f32),
    Pixel(fn([f32; 3], [f32; 3]) -> [f32; 3]),
}

impl Kernel {
    #[inline]
    fn apply(self, d: [f32; 3], s: [f32; 3]) -> [f32; 3] {
        match self {
            Kernel::Channel(f) => [f(d[0], s[0]), f(d[1], s[1]), f(d[2], s[2])],
            Kernel::Pixel(f) => f(d, s),
        }
    }
}

#[inline]
fn screen(d: f32, s: f32) -> f32 {
    d + s - d * s
}

#[inline]
fn hard_light(d: f32, s: f32) -> f32 {
    if s <= 0.5 {
        2.0 * d * s
    } else {
        screen(d, 2.0 * s - 1.0)
    }
}

#[inline]
fn color_dodge(d: f32, s: f32) -> f32 {
    if d <= 0.0 {
        0.0
    } else if s >= 1.0 {
        1.0
    } else {
        (d / (1.0 - s)).min(1.0)
    }
}

#[inline]
fn color_burn(d: f32, s: f32) -> f32 {
    if d >= 1.0 {
        1.0
    } else if s <= 0.0 {
        0.0
    } else {
        1.0 - ((1.0 - d) / s).min(1.0)
    }
}

#[inline]
fn soft_light(d: f32, s: f32) -> f32 {
    if s <= 0.5 {
        d - (1.0 - 2.0 * s) * d * (1.0 - d)
    } else {
        let g = if d <= 0.25 {
            ((16.0 * d - 12.0) * d + 4.0) * d
        } else {
            d.sqrt()
        };
        d + (2.0 * s - 1.0) * (g - d)
    }
}

#[inline]
fn to_unit(v: u8) -> f32 {
    v as f32 / 255.0
}

#[inline]
fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Read a pixel as (rgb, alpha), expanding gray and defaulting alpha to 1.
#[inline]
fn read_rgb(px: &[u8], format: PixelFormat) -> ([f32; 3], f32) {
    match format {
        PixelFormat::Gray8 => {
            let v = to_unit(px[0]);
            ([v, v, v], 1.0)
        }
        PixelFormat::Rgb8 => ([to_unit(px[0]), to_unit(px[1]), to_unit(px[2])], 1.0),
        PixelFormat::Rgba8 => (
            [to_unit(px[0]), to_unit(px[1]), to_unit(px[2])],
            to_unit(px[3]),
        ),
    }
}

/// Composite `src` onto `dst` with its top-left corner at `position`.
///
/// Only the overlap is touched. Offsets outside the destination (negative
/// included) crop the source; a zero-sized or fully transparent source is a
/// no-op.
pub fn blend(dst: &mut RasterBuffer, src: &RasterBuffer, position: IVec2, mode: BlendMode) {
    if dst.is_empty() || src.is_empty() {
        return;
    }

    let (sw, sh) = src.resolution();
    let area = BBox::new(
        position.x,
        position.y,
        position.x.saturating_add(sw as i32),
        position.y.saturating_add(sh as i32),
    )
    .clamp(dst.width(), dst.height());
    if area.is_empty() {
        trace!("blend: source at {:?} fully outside {:?}", position, dst.resolution());
        return;
    }

    let kernel = mode.kernel();
    let dst_format = dst.format();
    let src_format = src.format();
    let dst_ch = dst_format.channels();

    for y in area.y0..area.y1 {
        let sy = (y - position.y) as usize;
        for x in area.x0..area.x1 {
            let sx = (x - position.x) as usize;
            let (s, a) = read_rgb(src.pixel(sx, sy), src_format);
            if a <= 0.0 {
                continue;
            }

            let px = dst.pixel_mut(x as usize, y as usize);
            let (d, da) = read_rgb(px, dst_format);
            let f = kernel.apply(d, s);
            let inv = 1.0 - a;
            let out = [
                d[0] * inv + f[0] * a,
                d[1] * inv + f[1] * a,
                d[2] * inv + f[2] * a,
            ];

            match dst_ch {
                1 => {
                    // gray destination keeps the luma of the blended color
                    px[0] = to_u8(0.299 * out[0] + 0.587 * out[1] + 0.114 * out[2]);
                }
                _ => {
                    px[0] = to_u8(out[0]);
                    px[1] = to_u8(out[1]);
                    px[2] = to_u8(out[2]);
                    if dst_ch == 4 {
                        px[3] = to_u8(a + da * inv);
                    }
                }
            }
        }
    }
}

/// [`blend`] with optional centering: when `centered`, `position` is where
/// the middle of `src` lands.
pub fn composite(
    dst: &mut RasterBuffer,
    src: &RasterBuffer,
    position: IVec2,
    mode: BlendMode,
    centered: bool,
) {
    let origin = if centered {
        position - IVec2::new(src.width() as i32 / 2, src.height() as i32 / 2)
    } else {
        position
    };
    blend(dst, src, origin, mode);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: usize, h: usize) -> RasterBuffer {
        let mut buf = RasterBuffer::new(w, h, PixelFormat::Rgba8);
        for y in 0..h {
            for x in 0..w {
                let px = buf.pixel_mut(x, y);
                px[0] = (x * 255 / w.max(1)) as u8;
                px[1] = (y * 255 / h.max(1)) as u8;
                px[2] = ((x + y) * 7 % 256) as u8;
                px[3] = 255;
            }
        }
        buf
    }

    #[test]
    fn test_normal_onto_identical_copy_is_unchanged() {
        let mut d = gradient(16, 9);
        let s = d.clone();
        blend(&mut d, &s, IVec2::ZERO, BlendMode::Normal);
        assert_eq!(d, s);
    }

    #[test]
    fn test_additive_then_subtractive_roundtrips() {
        let mut base = RasterBuffer::new(8, 8, PixelFormat::Rgb8);
        for (i, v) in base.data_mut().iter_mut().enumerate() {
            *v = (i * 3 % 120) as u8;
        }
        let s = RasterBuffer::filled(8, 8, PixelFormat::Rgba8, &[60, 100, 20, 255]);
        let mut d = base.clone();
        blend(&mut d, &s, IVec2::ZERO, BlendMode::Additive);
        blend(&mut d, &s, IVec2::ZERO, BlendMode::Subtractive);
        for (a, b) in d.data().iter().zip(base.data()) {
            assert!((*a as i32 - *b as i32).abs() <= 1, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_offsets_outside_are_noops() {
        let mut d = gradient(10, 10);
        let before = d.clone();
        let s = RasterBuffer::filled(4, 4, PixelFormat::Rgba8, &[255, 0, 0, 255]);
        blend(&mut d, &s, IVec2::new(-10, 3), BlendMode::Normal);
        blend(&mut d, &s, IVec2::new(10, 0), BlendMode::Normal);
        blend(&mut d, &RasterBuffer::new(0, 0, PixelFormat::Rgba8), IVec2::ZERO, BlendMode::Screen);
        assert_eq!(d, before);
    }

    #[test]
    fn test_negative_offset_crops_source() {
        let mut d = RasterBuffer::new(4, 4, PixelFormat::Rgb8);
        let s = RasterBuffer::filled(3, 3, PixelFormat::Rgba8, &[200, 0, 0, 255]);
        blend(&mut d, &s, IVec2::new(-2, -2), BlendMode::Normal);
        assert_eq!(d.pixel(0, 0), &[200, 0, 0]);
        assert_eq!(d.pixel(1, 0), &[0, 0, 0]);
        assert_eq!(d.pixel(0, 1), &[0, 0, 0]);
    }

    #[test]
    fn test_transparent_source_is_noop() {
        let mut d = gradient(6, 6);
        let before = d.clone();
        let s = RasterBuffer::filled(6, 6, PixelFormat::Rgba8, &[255, 255, 255, 0]);
        for mode in BlendMode::all() {
            blend(&mut d, &s, IVec2::ZERO, *mode);
        }
        assert_eq!(d, before);
    }

    #[test]
    fn test_half_alpha_normal_mixes() {
        let mut d = RasterBuffer::filled(1, 1, PixelFormat::Rgba8, &[0, 0, 0, 255]);
        let s = RasterBuffer::filled(1, 1, PixelFormat::Rgba8, &[255, 255, 255, 128]);
        blend(&mut d, &s, IVec2::ZERO, BlendMode::Normal);
        let v = d.pixel(0, 0)[0];
        assert!((127..=129).contains(&v), "got {}", v);
        assert_eq!(d.pixel(0, 0)[3], 255);
    }

    #[test]
    fn test_alpha_accumulates_over_transparent() {
        let mut d = RasterBuffer::new(1, 1, PixelFormat::Rgba8);
        let s = RasterBuffer::filled(1, 1, PixelFormat::Rgba8, &[10, 20, 30, 100]);
        blend(&mut d, &s, IVec2::ZERO, BlendMode::Normal);
        assert_eq!(d.pixel(0, 0)[3], 100);
    }

    #[test]
    fn test_separable_modes_match_reference_values() {
        let d = 0.25f32;
        let s = 0.5f32;
        assert!((BlendMode::Multiply.kernel().apply([d; 3], [s; 3])[0] - 0.125).abs() < 1e-6);
        assert!((BlendMode::Screen.kernel().apply([d; 3], [s; 3])[0] - 0.625).abs() < 1e-6);
        assert!((BlendMode::Difference.kernel().apply([d; 3], [s; 3])[0] - 0.25).abs() < 1e-6);
        assert!((BlendMode::Exclusion.kernel().apply([d; 3], [s; 3])[0] - 0.5).abs() < 1e-6);
        assert!((BlendMode::Darken.kernel().apply([d; 3], [s; 3])[0] - 0.25).abs() < 1e-6);
        assert!((BlendMode::Lighten.kernel().apply([d; 3], [s; 3])[0] - 0.5).abs() < 1e-6);
        // overlay keys on the backdrop, hard light on the source
        assert!((BlendMode::Overlay.kernel().apply([d; 3], [s; 3])[0] - 0.25).abs() < 1e-6);
        assert!((BlendMode::HardLight.kernel().apply([d; 3], [s; 3])[0] - 0.25).abs() < 1e-6);
        assert!((BlendMode::ColorDodge.kernel().apply([d; 3], [s; 3])[0] - 0.5).abs() < 1e-6);
        assert!((BlendMode::ColorBurn.kernel().apply([d; 3], [s; 3])[0] - 0.0).abs() < 1e-6);
        assert!((BlendMode::SoftLight.kernel().apply([d; 3], [s; 3])[0] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_luminosity_keeps_backdrop_hue() {
        let mut d = RasterBuffer::filled(1, 1, PixelFormat::Rgb8, &[200, 40, 40]);
        let s = RasterBuffer::filled(1, 1, PixelFormat::Rgb8, &[30, 30, 30]);
        blend(&mut d, &s, IVec2::ZERO, BlendMode::Luminosity);
        let px = d.pixel(0, 0);
        assert!(px[0] > px[1] && px[0] > px[2]);
        assert!(px[0] < 100, "lightness should drop, got {:?}", px);
    }

    #[test]
    fn test_hue_takes_source_hue() {
        let mut d = RasterBuffer::filled(1, 1, PixelFormat::Rgb8, &[200, 40, 40]);
        let s = RasterBuffer::filled(1, 1, PixelFormat::Rgb8, &[0, 0, 255]);
        blend(&mut d, &s, IVec2::ZERO, BlendMode::Hue);
        let px = d.pixel(0, 0);
        assert!(px[2] > px[0] && px[2] > px[1], "expected blue-dominant, got {:?}", px);
    }

    #[test]
    fn test_gray_destination_accepts_color_source() {
        let mut d = RasterBuffer::new(2, 2, PixelFormat::Gray8);
        let s = RasterBuffer::filled(2, 2, PixelFormat::Rgb8, &[255, 255, 255]);
        blend(&mut d, &s, IVec2::ZERO, BlendMode::Additive);
        assert_eq!(d.pixel(1, 1), &[255]);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Color Dodge".parse::<BlendMode>().unwrap(), BlendMode::ColorDodge);
        assert_eq!("soft_light".parse::<BlendMode>().unwrap(), BlendMode::SoftLight);
        assert_eq!("add".parse::<BlendMode>().unwrap(), BlendMode::Additive);
        assert_eq!("LUMINOSITY".parse::<BlendMode>().unwrap(), BlendMode::Luminosity);
        for mode in BlendMode::all() {
            assert_eq!(mode.display_name().parse::<BlendMode>().unwrap(), *mode);
        }
        assert!(matches!(
            "sparkle".parse::<BlendMode>(),
            Err(FxError::UnsupportedBlendMode(_))
        ));
    }

    #[test]
    fn test_serde_uses_display_names() {
        let json = serde_json::to_string(&BlendMode::HardLight).unwrap();
        assert_eq!(json, "\"Hard Light\"");
        let mode: BlendMode = serde_json::from_str("\"difference\"").unwrap();
        assert_eq!(mode, BlendMode::Difference);
        assert!(serde_json::from_str::<BlendMode>("\"glow\"").is_err());
    }

    #[test]
    fn test_centered_composite_offsets_by_half_size() {
        let mut d = RasterBuffer::new(10, 10, PixelFormat::Rgb8);
        let s = RasterBuffer::filled(3, 3, PixelFormat::Rgb8, &[9, 9, 9]);
        composite(&mut d, &s, IVec2::new(5, 5), BlendMode::Normal, true);
        assert_eq!(d.pixel(4, 4), &[9, 9, 9]);
        assert_eq!(d.pixel(6, 6), &[9, 9, 9]);
        assert_eq!(d.pixel(3, 3), &[0, 0, 0]);
        assert_eq!(d.pixel(7, 7), &[0, 0, 0]);
    }
}
