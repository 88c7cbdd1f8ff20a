//! Shader uniform contracts.
//!
//! Effects never run shaders themselves. They fill a [`UniformSet`] for one
//! of the known [`ShaderProgram`]s and hand it to the host's
//! `ShaderBackend`, which returns a full-resolution RGBA buffer.
//!
//! | Program | Uniforms |
//! |---------|----------|
//! | Glow | `u_blurredMask` (tex), `u_glow_strength` (float), `u_glow_color` (vec3, 0-255) |
//! | Inflate | `texSampler`, `maskSampler` (tex), `maskCenter`, `maskSize` (vec2, px), `inflate_size` (float, 0-1) |
//! | Grayscale | `texSampler` (tex) |

use glam::{Vec2, Vec3};
use indexmap::IndexMap;

use super::error::FxError;
use super::frame::RasterBuffer;

pub const U_BLURRED_MASK: &str = "u_blurredMask";
pub const U_GLOW_STRENGTH: &str = "u_glow_strength";
pub const U_GLOW_COLOR: &str = "u_glow_color";
pub const U_TEX: &str = "texSampler";
pub const U_MASK: &str = "maskSampler";
pub const U_MASK_CENTER: &str = "maskCenter";
pub const U_MASK_SIZE: &str = "maskSize";
pub const U_INFLATE_SIZE: &str = "inflate_size";

/// Known fragment programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderProgram {
    Glow,
    Inflate,
    Grayscale,
}

impl ShaderProgram {
    pub fn name(&self) -> &'static str {
        match self {
            ShaderProgram::Glow => "glow",
            ShaderProgram::Inflate => "inflate",
            ShaderProgram::Grayscale => "grayscale",
        }
    }

    /// Uniform names the program reads
    pub fn required_uniforms(&self) -> &'static [&'static str] {
        match self {
            ShaderProgram::Glow => &[U_BLURRED_MASK, U_GLOW_STRENGTH, U_GLOW_COLOR],
            ShaderProgram::Inflate => &[U_TEX, U_MASK, U_MASK_CENTER, U_MASK_SIZE, U_INFLATE_SIZE],
            ShaderProgram::Grayscale => &[U_TEX],
        }
    }
}

/// Single uniform value. Textures are borrowed for the duration of the call.
#[derive(Debug, Clone, Copy)]
pub enum Uniform<'a> {
    Texture(&'a RasterBuffer),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
}

/// Named uniforms for one shader invocation.
#[derive(Debug, Clone, Default)]
pub struct UniformSet<'a> {
    values: IndexMap<&'static str, Uniform<'a>>,
}

impl<'a> UniformSet<'a> {
    pub fn new() -> Self {
        Self {
            values: IndexMap::new(),
        }
    }

    pub fn with(mut self, name: &'static str, value: Uniform<'a>) -> Self {
        self.values.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Uniform<'a>> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn texture(&self, name: &str) -> Result<&'a RasterBuffer, FxError> {
        match self.values.get(name) {
            Some(Uniform::Texture(t)) => Ok(t),
            _ => Err(FxError::Shader(format!("missing texture uniform '{}'", name))),
        }
    }

    pub fn float(&self, name: &str) -> Result<f32, FxError> {
        match self.values.get(name) {
            Some(Uniform::Float(v)) => Ok(*v),
            _ => Err(FxError::Shader(format!("missing float uniform '{}'", name))),
        }
    }

    pub fn vec2(&self, name: &str) -> Result<Vec2, FxError> {
        match self.values.get(name) {
            Some(Uniform::Vec2(v)) => Ok(*v),
            _ => Err(FxError::Shader(format!("missing vec2 uniform '{}'", name))),
        }
    }

    pub fn vec3(&self, name: &str) -> Result<Vec3, FxError> {
        match self.values.get(name) {
            Some(Uniform::Vec3(v)) => Ok(*v),
            _ => Err(FxError::Shader(format!("missing vec3 uniform '{}'", name))),
        }
    }

    /// Check every uniform `program` reads is present
    pub fn validate(&self, program: ShaderProgram) -> Result<(), FxError> {
        for name in program.required_uniforms() {
            if !self.values.contains_key(name) {
                return Err(FxError::Shader(format!(
                    "{}: missing uniform '{}'",
                    program.name(),
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Uniforms for the glow program. The mask value is its alpha channel when
/// it has one, else channel 0.
pub fn glow_uniforms(blurred_mask: &RasterBuffer, strength: f32, color: [u8; 3]) -> UniformSet<'_> {
    UniformSet::new()
        .with(U_BLURRED_MASK, Uniform::Texture(blurred_mask))
        .with(U_GLOW_STRENGTH, Uniform::Float(strength))
        .with(
            U_GLOW_COLOR,
            Uniform::Vec3(Vec3::new(color[0] as f32, color[1] as f32, color[2] as f32)),
        )
}

/// Uniforms for the inflate program. `inflate_size` is 0-1.
pub fn inflate_uniforms<'a>(
    frame: &'a RasterBuffer,
    mask: &'a RasterBuffer,
    center: Vec2,
    size: Vec2,
    inflate_size: f32,
) -> UniformSet<'a> {
    UniformSet::new()
        .with(U_TEX, Uniform::Texture(frame))
        .with(U_MASK, Uniform::Texture(mask))
        .with(U_MASK_CENTER, Uniform::Vec2(center))
        .with(U_MASK_SIZE, Uniform::Vec2(size))
        .with(U_INFLATE_SIZE, Uniform::Float(inflate_size))
}

pub fn grayscale_uniforms(frame: &RasterBuffer) -> UniformSet<'_> {
    UniformSet::new().with(U_TEX, Uniform::Texture(frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::frame::PixelFormat;

    #[test]
    fn test_builders_satisfy_contracts() {
        let tex = RasterBuffer::new(4, 4, PixelFormat::Rgba8);
        let mask = RasterBuffer::new(4, 4, PixelFormat::Gray8);

        assert!(glow_uniforms(&mask, 10.0, [100, 255, 50]).validate(ShaderProgram::Glow).is_ok());
        let inflate = inflate_uniforms(&tex, &mask, Vec2::new(2.0, 2.0), Vec2::new(2.0, 2.0), 0.5);
        assert!(inflate.validate(ShaderProgram::Inflate).is_ok());
        assert_eq!(inflate.len(), 5);
        assert!(grayscale_uniforms(&tex).validate(ShaderProgram::Grayscale).is_ok());
    }

    #[test]
    fn test_missing_uniform_is_shader_error() {
        let tex = RasterBuffer::new(1, 1, PixelFormat::Rgba8);
        let set = grayscale_uniforms(&tex);
        assert!(matches!(set.validate(ShaderProgram::Glow), Err(FxError::Shader(_))));
        assert!(set.float(U_GLOW_STRENGTH).is_err());
        assert_eq!(set.texture(U_TEX).map(|t| t.resolution()), Ok((1, 1)));
    }

    #[test]
    fn test_glow_color_kept_in_byte_range() {
        let mask = RasterBuffer::new(1, 1, PixelFormat::Gray8);
        let set = glow_uniforms(&mask, 1.0, [100, 255, 50]);
        assert_eq!(set.vec3(U_GLOW_COLOR), Ok(Vec3::new(100.0, 255.0, 50.0)));
    }
}
