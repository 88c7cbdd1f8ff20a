//! Render configuration (JSON).
//!
//! Priority for the config file: `--config` → `MASKFX_CONFIG` env var →
//! built-in defaults. Command-line flags then override individual fields.
//!
//! ```json
//! {
//!   "width": 320, "height": 180, "frames": 48,
//!   "effect": "Edgy",
//!   "settings": { "glow_color": "#40ff80", "blur_radius": 12 },
//!   "objects": [ { "start": [10, 60], "size": [24, 24], "velocity": [5, 0] } ],
//!   "object_meta": { "1": { "glow_strength": 25 } },
//!   "out_dir": "out"
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::core::scene::{link_sprite, SceneObject, SyntheticScene};
use crate::entities::attrs::Attrs;
use crate::entities::compositor::BlendMode;
use crate::entities::effects::{blend_mode_or, EffectType};
use crate::entities::frame::RasterBuffer;
use crate::entities::keys::{A_LINK_SPRITE, A_TRAIL_BLEND};
use crate::entities::traits::ObjectId;

/// Env var naming a config file when `--config` is absent
pub const CONFIG_ENV: &str = "MASKFX_CONFIG";

/// Side of the procedural link sprite used when no template image is given
const DEFAULT_SPRITE_SIZE: usize = 32;

/// Everything one render run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    pub frames: u64,
    pub effect: String,
    /// Effect-wide settings
    pub settings: Attrs,
    /// Scene objects; empty uses the built-in demo scene
    pub objects: Vec<SceneObject>,
    /// Per-object meta by object id (ids count from 1 in `objects` order)
    pub object_meta: BTreeMap<ObjectId, Attrs>,
    pub out_dir: Option<PathBuf>,
    /// Link template image for Go Go Gadget
    pub link_sprite: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 180,
            frames: 24,
            effect: EffectType::MoTrail.to_string(),
            settings: Attrs::new(),
            objects: Vec::new(),
            object_meta: BTreeMap::new(),
            out_dir: None,
            link_sprite: None,
        }
    }
}

impl RenderConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: RenderConfig = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Config from the CLI path, else `MASKFX_CONFIG`, else defaults
    pub fn resolve(cli_path: Option<PathBuf>) -> Result<Self> {
        let path = cli_path.or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));
        match path {
            Some(p) => Self::load(&p),
            None => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Apply command-line overrides
    pub fn apply_args(&mut self, args: &Args) -> Result<()> {
        if let Some(effect) = &args.effect {
            self.effect = effect.clone();
        }
        if let Some(frames) = args.frames {
            self.frames = frames;
        }
        if let Some((w, h)) = args.size {
            self.width = w;
            self.height = h;
        }
        if let Some(out) = &args.out_dir {
            self.out_dir = Some(out.clone());
        }
        if let Some(sprite) = &args.sprite {
            self.link_sprite = Some(sprite.clone());
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!("Resolution must be non-zero, got {}x{}", self.width, self.height);
        }
        self.effect_type()?;
        blend_mode_or(&self.settings, A_TRAIL_BLEND, BlendMode::Normal)
            .context("Bad effect setting")?;
        for (id, meta) in &self.object_meta {
            blend_mode_or(meta, A_TRAIL_BLEND, BlendMode::Normal)
                .with_context(|| format!("Bad meta for object {}", id))?;
        }
        Ok(())
    }

    pub fn effect_type(&self) -> Result<EffectType> {
        self.effect
            .parse()
            .with_context(|| format!("Bad effect name '{}'", self.effect))
    }

    /// Scene with the configured objects and meta
    pub fn build_scene(&self) -> SyntheticScene {
        let mut scene = if self.objects.is_empty() {
            SyntheticScene::demo(self.width, self.height)
        } else {
            let mut scene = SyntheticScene::new(self.width, self.height);
            for object in &self.objects {
                scene.add_object(*object);
            }
            scene
        };
        for (id, meta) in &self.object_meta {
            scene.merge_object_meta(*id, meta);
        }
        scene
    }

    /// Link sprite: `link_sprite` path, the `link_sprite` setting, or the
    /// procedural ring. None for effects that don't draw links.
    pub fn load_sprite(&self) -> Result<Option<RasterBuffer>> {
        if !self.effect_type()?.needs_sprite() {
            return Ok(None);
        }
        let path = self
            .link_sprite
            .clone()
            .or_else(|| self.settings.get_str(A_LINK_SPRITE).map(PathBuf::from));
        let sprite = match path {
            Some(p) => RasterBuffer::load(&p)
                .with_context(|| format!("Failed to load link sprite: {}", p.display()))?,
            None => {
                debug!("No link sprite given, using procedural {}px ring", DEFAULT_SPRITE_SIZE);
                link_sprite(DEFAULT_SPRITE_SIZE)
            }
        };
        Ok(Some(sprite))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::attrs::{AttrValue, MetaStore};
    use crate::entities::traits::Host;

    #[test]
    fn test_parse_partial_json() {
        let json = r##"{
            "effect": "Masking Tape",
            "frames": 5,
            "settings": { "background_color": "#102030", "link_size": 40 },
            "objects": [ { "start": [1, 2], "size": [3, 4] } ],
            "object_meta": { "1": { "foreground_color": [255, 0, 0] } }
        }"##;
        let config: RenderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.width, 320);
        assert_eq!(config.frames, 5);
        assert_eq!(config.effect_type().unwrap(), EffectType::MaskingTape);
        assert_eq!(config.settings.get_float("link_size"), Some(40.0));
        assert_eq!(config.objects[0].velocity, [0, 0]);

        let scene = config.build_scene();
        assert_eq!(scene.objects(0), vec![1]);
        let meta = scene.object_meta(1).unwrap();
        assert_eq!(meta.color("foreground_color"), Some([255, 0, 0]));
    }

    #[test]
    fn test_unknown_effect_rejected() {
        let config = RenderConfig {
            effect: "Sparkle".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_object_blend_rejected_before_render() {
        let json = r#"{ "object_meta": { "1": { "trail_blend": "Glitter" } } }"#;
        let config: RenderConfig = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(format!("{:#}", err).contains("Glitter"), "{:#}", err);

        let json = r#"{ "settings": { "trail_blend": "Glitter" } }"#;
        let config: RenderConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());

        let json = r#"{ "object_meta": { "1": { "trail_blend": "Screen" } } }"#;
        let config: RenderConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_size_rejected() {
        let config = RenderConfig {
            width: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sprite_only_for_links() {
        let mut config = RenderConfig::default();
        assert!(config.load_sprite().unwrap().is_none());
        config.effect = "GoGoGadget".into();
        let sprite = config.load_sprite().unwrap().unwrap();
        assert_eq!(sprite.resolution(), (DEFAULT_SPRITE_SIZE, DEFAULT_SPRITE_SIZE));

        config.settings.set(A_LINK_SPRITE, AttrValue::Str("/nonexistent/link.png".into()));
        assert!(config.load_sprite().is_err());
    }

    #[test]
    fn test_json_roundtrip_keeps_meta() {
        let mut config = RenderConfig::default();
        config
            .object_meta
            .insert(2, Attrs::new().with("pixel_size", AttrValue::Int(8)));
        let json = serde_json::to_string(&config).unwrap();
        let back: RenderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
