//! CPU evaluation of the effect fragment programs.
//!
//! Each program is run per output pixel with `uv = (x + 0.5, y + 0.5) / res`,
//! the same addressing a full-screen quad gets on the GPU. Textures are
//! sampled bilinearly; anything outside the texture is transparent black.
//!
//! ```text
//! Glow:      v = mask.a (or mask.r)
//!            rgb = clamp(color / (1.1 - v) * v * strength * 0.1)
//!            a = v
//! Inflate:   d = uv - center, r = |size / res| / 2
//!            uv' = center + d * (1 - s + s * smoothstep(0, 1, |d| / r))
//!            rgb = tex(uv').rgb, a = mask(uv').r
//! Grayscale: rgb = luma(tex(uv)), a = tex(uv).a
//! ```
//!
//! `glow_color` is passed in 0-255 and divided by 255 here before the glow
//! formula runs. Feeding the raw 0-255 color straight in clamps nearly every
//! masked pixel to full white; the normalized color gives a softer, tinted
//! glow that still saturates near the mask core at high strength.

use glam::{Vec2, Vec3};
use log::trace;

use crate::entities::error::FxError;
use crate::entities::frame::{PixelFormat, RasterBuffer};
use crate::entities::shader::{
    ShaderProgram, UniformSet, U_BLURRED_MASK, U_GLOW_COLOR, U_GLOW_STRENGTH, U_INFLATE_SIZE,
    U_MASK, U_MASK_CENTER, U_MASK_SIZE, U_TEX,
};
use crate::entities::traits::ShaderBackend;
use crate::entities::transform::sample_bilinear;

/// Software backend for the three known programs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuShaderBackend;

impl CpuShaderBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ShaderBackend for CpuShaderBackend {
    fn render(&self, program: ShaderProgram, uniforms: &UniformSet) -> Result<RasterBuffer, FxError> {
        uniforms.validate(program)?;
        trace!("CpuShaderBackend: running {} with {} uniforms", program.name(), uniforms.len());
        match program {
            ShaderProgram::Glow => glow(uniforms),
            ShaderProgram::Inflate => inflate(uniforms),
            ShaderProgram::Grayscale => grayscale(uniforms),
        }
    }
}

#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[inline]
fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Sample an RGBA texture at normalized `uv`, result in 0-1
fn texture(tex: &RasterBuffer, uv: Vec2) -> [f32; 4] {
    let (w, h) = tex.resolution();
    let s = sample_bilinear(tex, uv.x * w as f32 - 0.5, uv.y * h as f32 - 0.5);
    [s[0] / 255.0, s[1] / 255.0, s[2] / 255.0, s[3] / 255.0]
}

fn glow(uniforms: &UniformSet) -> Result<RasterBuffer, FxError> {
    let mask = uniforms.texture(U_BLURRED_MASK)?;
    let strength = uniforms.float(U_GLOW_STRENGTH)?;
    // color arrives as 0-255
    let color = uniforms.vec3(U_GLOW_COLOR)? / 255.0;

    let (w, h) = mask.resolution();
    let mut out = RasterBuffer::new(w, h, PixelFormat::Rgba8);
    for y in 0..h {
        for x in 0..w {
            let v = if mask.has_alpha() {
                mask.alpha(x, y)
            } else {
                mask.pixel(x, y)[0]
            } as f32
                / 255.0;
            let rgb: Vec3 = color / (1.1 - v) * v * strength * 0.1;
            out.pixel_mut(x, y)
                .copy_from_slice(&[to_u8(rgb.x), to_u8(rgb.y), to_u8(rgb.z), to_u8(v)]);
        }
    }
    Ok(out)
}

fn inflate(uniforms: &UniformSet) -> Result<RasterBuffer, FxError> {
    let tex = uniforms.texture(U_TEX)?.convert(PixelFormat::Rgba8);
    let mask = uniforms.texture(U_MASK)?.convert(PixelFormat::Rgba8);
    let center_px = uniforms.vec2(U_MASK_CENTER)?;
    let size_px = uniforms.vec2(U_MASK_SIZE)?;
    let strength = uniforms.float(U_INFLATE_SIZE)?;

    let (w, h) = tex.resolution();
    let mut out = RasterBuffer::new(w, h, PixelFormat::Rgba8);
    if tex.is_empty() {
        return Ok(out);
    }
    let res = Vec2::new(w as f32, h as f32);
    let center = center_px / res;
    let radius = (size_px / res).length() * 0.5;

    for y in 0..h {
        for x in 0..w {
            let uv = (Vec2::new(x as f32, y as f32) + 0.5) / res;
            let offset = uv - center;
            let dist = offset.length();
            let warped = if dist <= f32::EPSILON || radius <= f32::EPSILON {
                uv
            } else {
                let scale = 1.0 - strength + strength * smoothstep(0.0, 1.0, dist / radius);
                center + offset * scale
            };
            let c = texture(&tex, warped);
            let m = texture(&mask, warped);
            out.pixel_mut(x, y)
                .copy_from_slice(&[to_u8(c[0]), to_u8(c[1]), to_u8(c[2]), to_u8(m[0])]);
        }
    }
    Ok(out)
}

fn grayscale(uniforms: &UniformSet) -> Result<RasterBuffer, FxError> {
    let tex = uniforms.texture(U_TEX)?.convert(PixelFormat::Rgba8);
    let mut out = tex.clone();
    for px in out.data_mut().chunks_exact_mut(4) {
        let luma = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
        let l = luma.round().clamp(0.0, 255.0) as u8;
        px[0] = l;
        px[1] = l;
        px[2] = l;
    }
    Ok(out)
}
