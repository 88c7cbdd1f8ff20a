//! Generic attribute storage for effect settings and object meta.
//!
//! Used by effect setup (settings), the host (effect-wide and per-object
//! meta) and the JSON render config.
//!
//! JSON form is a flat object; values are written untagged:
//!
//! ```text
//! { "trail_length": 60, "trail_blend": "Screen", "trail_color": [255, 40, 0] }
//! ```
//!
//! Getters are lenient about numbers (`Int` reads as float and vice versa)
//! since JSON does not distinguish `50` from `50.0` the way users expect.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Generic attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Str(String),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

impl AttrValue {
    pub fn as_float(&self) -> Option<f32> {
        match self {
            AttrValue::Float(v) => Some(*v),
            AttrValue::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            AttrValue::Int(v) => Some(*v),
            AttrValue::Float(v) => Some(v.round() as i32),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(v) => Some(*v),
            AttrValue::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// 8-bit RGB color from `Vec3`/`Vec4` (0-255 components, alpha dropped)
    /// or a `#rrggbb` string.
    pub fn as_color(&self) -> Option<[u8; 3]> {
        let to_u8 = |v: f32| v.round().clamp(0.0, 255.0) as u8;
        match self {
            AttrValue::Vec3(c) => Some([to_u8(c[0]), to_u8(c[1]), to_u8(c[2])]),
            AttrValue::Vec4(c) => Some([to_u8(c[0]), to_u8(c[1]), to_u8(c[2])]),
            AttrValue::Str(s) => parse_hex_color(s),
            _ => None,
        }
    }

    pub fn color(rgb: [u8; 3]) -> Self {
        AttrValue::Vec3([rgb[0] as f32, rgb[1] as f32, rgb[2] as f32])
    }
}

fn parse_hex_color(s: &str) -> Option<[u8; 3]> {
    let hex = s.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// String-keyed meta access, implemented by whatever stores effect-wide or
/// per-object settings.
///
/// Typed `*_or` helpers return the default when the key is missing or holds
/// an incompatible type.
pub trait MetaStore {
    fn get_value(&self, key: &str) -> Option<AttrValue>;

    fn set_value(&mut self, key: &str, value: AttrValue);

    fn float_or(&self, key: &str, default: f32) -> f32 {
        self.get_value(key).and_then(|v| v.as_float()).unwrap_or(default)
    }

    fn int_or(&self, key: &str, default: i32) -> i32 {
        self.get_value(key).and_then(|v| v.as_int()).unwrap_or(default)
    }

    fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get_value(key).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    fn str_or(&self, key: &str, default: &str) -> String {
        match self.get_value(key) {
            Some(AttrValue::Str(s)) => s,
            _ => default.to_string(),
        }
    }

    /// Color if set and parseable; `None` means "feature off" for optional colors
    fn color(&self, key: &str) -> Option<[u8; 3]> {
        self.get_value(key).and_then(|v| v.as_color())
    }

    fn color_or(&self, key: &str, default: [u8; 3]) -> [u8; 3] {
        self.color(key).unwrap_or(default)
    }
}

/// Attribute container: string key -> typed value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attrs {
    map: HashMap<String, AttrValue>,
}

impl Attrs {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: AttrValue) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: AttrValue) {
        self.map.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.map.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.map.get(key).and_then(|v| v.as_str())
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.map.get(key).and_then(|v| v.as_int())
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        self.map.get(key).and_then(|v| v.as_float())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.map.get(key).and_then(|v| v.as_bool())
    }

    /// Set only if the key is absent (seeding defaults)
    pub fn set_default(&mut self, key: &str, value: AttrValue) {
        self.map.entry(key.to_string()).or_insert(value);
    }

    /// Remove attribute by key
    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.map.remove(key)
    }

    /// Iterate over all attributes (key, value)
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.map.iter()
    }

    /// Check if attribute exists
    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Get number of attributes
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Overlay `other` on top of self (other wins)
    pub fn merge(&mut self, other: &Attrs) {
        for (k, v) in other.iter() {
            self.map.insert(k.clone(), v.clone());
        }
    }
}

impl MetaStore for Attrs {
    fn get_value(&self, key: &str) -> Option<AttrValue> {
        self.map.get(key).cloned()
    }

    fn set_value(&mut self, key: &str, value: AttrValue) {
        self.set(key, value);
    }
}

/// Layered read view over several stores: first layer holding a key wins.
///
/// Typical stack is object meta, then effect-wide meta, then the settings
/// the effect was built with. Writes land in a local overlay and never reach
/// the underlying stores.
#[derive(Default)]
pub struct MetaView<'a> {
    layers: Vec<&'a dyn MetaStore>,
    overlay: Attrs,
}

impl<'a> MetaView<'a> {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            overlay: Attrs::new(),
        }
    }

    /// Add a lower-priority layer
    pub fn layer(mut self, store: &'a dyn MetaStore) -> Self {
        self.layers.push(store);
        self
    }

    pub fn layer_opt(self, store: Option<&'a dyn MetaStore>) -> Self {
        match store {
            Some(s) => self.layer(s),
            None => self,
        }
    }
}

impl MetaStore for MetaView<'_> {
    fn get_value(&self, key: &str) -> Option<AttrValue> {
        self.overlay
            .get(key)
            .cloned()
            .or_else(|| self.layers.iter().find_map(|l| l.get_value(key)))
    }

    fn set_value(&mut self, key: &str, value: AttrValue) {
        self.overlay.set(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_is_flat_and_untagged() {
        let json = r##"{"trail_length": 60, "strength": 2.5, "on": true,
                        "blend": "Screen", "tint": [255, 40, 0], "hex": "#64ff32"}"##;
        let attrs: Attrs = serde_json::from_str(json).unwrap();
        assert_eq!(attrs.get("trail_length"), Some(&AttrValue::Int(60)));
        assert_eq!(attrs.get_float("trail_length"), Some(60.0));
        assert_eq!(attrs.get_float("strength"), Some(2.5));
        assert_eq!(attrs.get_bool("on"), Some(true));
        assert_eq!(attrs.get_str("blend"), Some("Screen"));
        assert_eq!(attrs.color("tint"), Some([255, 40, 0]));
        assert_eq!(attrs.color("hex"), Some([100, 255, 50]));
    }

    #[test]
    fn test_meta_store_defaults() {
        let mut attrs = Attrs::new().with("size", AttrValue::Str("big".into()));
        assert_eq!(attrs.float_or("size", 3.0), 3.0);
        assert_eq!(attrs.float_or("missing", 7.0), 7.0);
        assert!(attrs.bool_or("missing", true));
        assert_eq!(attrs.str_or("size", "small"), "big");
        assert_eq!(attrs.color("missing"), None);

        attrs.set_value("size", AttrValue::Float(4.4));
        assert_eq!(attrs.int_or("size", 0), 4);
    }

    #[test]
    fn test_set_default_keeps_existing() {
        let mut attrs = Attrs::new().with("a", AttrValue::Int(1));
        attrs.set_default("a", AttrValue::Int(2));
        attrs.set_default("b", AttrValue::Int(3));
        assert_eq!(attrs.get_i32("a"), Some(1));
        assert_eq!(attrs.get_i32("b"), Some(3));
    }

    #[test]
    fn test_meta_view_layer_priority() {
        let object = Attrs::new().with("glow_strength", AttrValue::Int(30));
        let effect = Attrs::new()
            .with("glow_strength", AttrValue::Int(5))
            .with("trail_length", AttrValue::Int(80));

        let mut view = MetaView::new().layer_opt(Some(&object as &dyn MetaStore)).layer(&effect);
        assert_eq!(view.float_or("glow_strength", 0.0), 30.0);
        assert_eq!(view.float_or("trail_length", 0.0), 80.0);
        assert_eq!(view.float_or("blur_radius", 20.0), 20.0);

        view.set_value("trail_length", AttrValue::Int(1));
        assert_eq!(view.int_or("trail_length", 0), 1);
        assert_eq!(effect.get_i32("trail_length"), Some(80));

        let none = MetaView::new().layer_opt(None).layer(&effect);
        assert_eq!(none.int_or("glow_strength", 0), 5);
    }

    #[test]
    fn test_bad_hex_color() {
        assert_eq!(AttrValue::Str("#12".into()).as_color(), None);
        assert_eq!(AttrValue::Str("00ff00".into()).as_color(), None);
        assert_eq!(AttrValue::Str("#zzzzzz".into()).as_color(), None);
        assert_eq!(AttrValue::color([1, 2, 3]).as_color(), Some([1, 2, 3]));
    }
}
