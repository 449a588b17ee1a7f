//! Composite style and the "last used" settings record.
//!
//! Stored under `userSettings` as
//! `{padding, borderRadius, shadow, background, aspectRatio}`. Each field
//! falls back to its default on its own, so one bad value does not reset
//! the rest.

use crate::config::Config;
use crate::geometry::AspectConstraint;
use crate::render::Background;
use serde::{Deserialize, Deserializer, Serialize};

/// Gradient swatches offered by the popup.
pub const GRADIENT_PRESETS: [&str; 4] = [
    "linear-gradient(to right, #ff7e5f, #feb47b)",
    "linear-gradient(to right, #6a11cb, #2575fc)",
    "linear-gradient(to right, #fc00ff, #00dbde)",
    "linear-gradient(to right, #00c9ff, #92fe9d)",
];

/// Slider ranges in the popup. Stored values are clamped to these.
pub const MAX_PADDING: u32 = 150;
pub const MAX_BORDER_RADIUS: u32 = 100;
pub const MAX_SHADOW: u32 = 100;

/// Solid colour swatches offered by the popup.
pub const SOLID_PRESETS: [&str; 4] = ["#FFFFFF", "#000000", "#FF5733", "#33FF57"];

/// Every swatch the popup offers: gradients, solid colours, then the
/// configured wallpapers.
pub fn background_presets(config: &Config) -> Vec<Background> {
    GRADIENT_PRESETS
        .iter()
        .chain(SOLID_PRESETS.iter())
        .map(|s| s.to_string())
        .chain(config.wallpapers.iter().cloned())
        .filter_map(|preset| match Background::parse(&preset) {
            Ok(bg) => Some(bg),
            Err(e) => {
                log::warn!("[SETTINGS] Skipping preset {:?}: {}", preset, e);
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleParams {
    #[serde(default = "default_padding", deserialize_with = "lenient_padding")]
    pub padding: u32,
    #[serde(default = "default_border_radius", deserialize_with = "lenient_border_radius")]
    pub border_radius: u32,
    #[serde(default = "default_shadow", deserialize_with = "lenient_shadow")]
    pub shadow: u32,
    #[serde(default, deserialize_with = "lenient_background")]
    pub background: Background,
}

impl Default for StyleParams {
    fn default() -> Self {
        Self {
            padding: default_padding(),
            border_radius: default_border_radius(),
            shadow: default_shadow(),
            background: Background::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(flatten)]
    pub style: StyleParams,
    #[serde(default)]
    pub aspect_ratio: AspectConstraint,
}

impl UserSettings {
    /// Read a stored record; anything unreadable yields the defaults.
    pub fn from_value(value: Option<serde_json::Value>) -> Self {
        match value {
            None => Self::default(),
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                log::warn!("[SETTINGS] Discarding unreadable settings: {}", e);
                Self::default()
            }),
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn default_padding() -> u32 {
    40
}

fn default_border_radius() -> u32 {
    20
}

fn default_shadow() -> u32 {
    25
}

/// Any JSON number, rounded and clamped to `0..=max`; everything else → `default`.
fn lenient_u32(value: serde_json::Value, default: u32, max: u32) -> u32 {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .map(|v| v.round().clamp(0.0, max as f64) as u32)
        .unwrap_or(default)
}

fn lenient_padding<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(lenient_u32(value, default_padding(), MAX_PADDING))
}

fn lenient_border_radius<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(lenient_u32(value, default_border_radius(), MAX_BORDER_RADIUS))
}

fn lenient_shadow<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(lenient_u32(value, default_shadow(), MAX_SHADOW))
}

fn lenient_background<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Background, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .and_then(|s| Background::parse(s).ok())
        .unwrap_or_default())
}
