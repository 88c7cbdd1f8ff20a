//! Meta key constants for effect settings and per-object meta.
//!
//! Avoid string typos, enable IDE autocomplete.
//! Usage: `meta.float_or(A_TRAIL_LENGTH, DEFAULT_TRAIL_LENGTH)`

// === Effect-wide ===
/// Blend mode name used to feed trails ("Normal", "Screen", ...)
pub const A_TRAIL_BLEND: &str = "trail_blend";
/// Link template image path (GoGoGadget)
pub const A_LINK_SPRITE: &str = "link_sprite";
/// Effect-wide background fill (MaskingTape), RGB
pub const A_BACKGROUND_COLOR: &str = "background_color";

// === Trails ===
/// Trail length 1-99, larger fades slower
pub const A_TRAIL_LENGTH: &str = "trail_length";
/// Per-object trail toggle
pub const A_ENABLE_TRAIL: &str = "enable_trail";
/// Solid trail color instead of source pixels, RGB
pub const A_TRAIL_COLOR: &str = "trail_color";

// === Glow (Edgy) ===
pub const A_GLOW_COLOR: &str = "glow_color";
pub const A_GLOW_STRENGTH: &str = "glow_strength";
/// Hull blur radius in pixels
pub const A_BLUR_RADIUS: &str = "blur_radius";

// === Links (GoGoGadget) ===
pub const A_ENABLE_LINKS: &str = "enable_links";
/// Link thickness scale; sprite is resized to `link_size / 100`
pub const A_LINK_SIZE: &str = "link_size";
/// Perpendicular sag multiplier, 0 = straight chain
pub const A_LINK_SAG: &str = "link_sag";

// === Per-object look ===
pub const A_INFLATE_SIZE: &str = "inflate_size";
pub const A_PIXEL_SIZE: &str = "pixel_size";
/// Flat pixelation color with value noise, RGB
pub const A_PIXEL_COLOR: &str = "pixel_color";
/// Solid cutout color (MaskingTape), RGB
pub const A_FOREGROUND_COLOR: &str = "foreground_color";

// === Defaults ===
pub const DEFAULT_TRAIL_LENGTH: f32 = 50.0;
pub const DEFAULT_GLOW_COLOR: [u8; 3] = [100, 255, 50];
pub const DEFAULT_GLOW_STRENGTH: f32 = 10.0;
pub const DEFAULT_BLUR_RADIUS: u32 = 20;
pub const DEFAULT_LINK_SIZE: f32 = 50.0;
pub const DEFAULT_INFLATE_SIZE: f32 = 0.0;
pub const DEFAULT_PIXEL_SIZE: u32 = 1;
/// Bbox margin around pixelated objects
pub const PIXELATE_MARGIN: i32 = 5;
/// +/- range of value noise on flat pixel color
pub const PIXEL_NOISE: i32 = 20;
