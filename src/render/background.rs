//! Background fills and the CSS-style strings they are stored as.
//!
//! Settings keep the background as the same string the popup swatches use:
//! `#rrggbb`, `linear-gradient(to right, A, B)` or a wallpaper URL.

use image::Rgba;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Fill while a wallpaper is still loading (or failed to load).
pub const PLACEHOLDER_COLOR: Rgba<u8> = Rgba([0xee, 0xee, 0xee, 0xff]);

static GRADIENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let color = r"(#[0-9a-fA-F]{3,8}|rgba?\([^)]*\)|[a-zA-Z]+)";
    Regex::new(&format!(
        r"^linear-gradient\(\s*to right\s*,\s*{color}\s*,\s*{color}\s*\)$"
    ))
    .unwrap()
});

static RGB_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*([0-9]*\.?[0-9]+)\s*)?\)$")
        .unwrap()
});

#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    Solid(Rgba<u8>),
    /// Left-to-right linear gradient across the whole canvas.
    Gradient { from: Rgba<u8>, to: Rgba<u8> },
    /// Reference handed to the wallpaper provider, stretched to the canvas.
    Wallpaper(String),
}

impl Default for Background {
    fn default() -> Self {
        Self::Gradient {
            from: Rgba([0xff, 0x7e, 0x5f, 0xff]),
            to: Rgba([0xfe, 0xb4, 0x7b, 0xff]),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("Unrecognised background {0:?}")]
pub struct BackgroundParseError(pub String);

impl Background {
    pub fn parse(text: &str) -> Result<Self, BackgroundParseError> {
        let text = text.trim();

        if text.starts_with("http://") || text.starts_with("https://") {
            return Ok(Self::Wallpaper(text.to_string()));
        }

        if text.starts_with("linear-gradient") {
            let caps = GRADIENT_PATTERN
                .captures(text)
                .ok_or_else(|| BackgroundParseError(text.to_string()))?;
            let from = parse_color(&caps[1]).ok_or_else(|| BackgroundParseError(text.to_string()))?;
            let to = parse_color(&caps[2]).ok_or_else(|| BackgroundParseError(text.to_string()))?;
            return Ok(Self::Gradient { from, to });
        }

        parse_color(text)
            .map(Self::Solid)
            .ok_or_else(|| BackgroundParseError(text.to_string()))
    }

    pub fn is_wallpaper(&self) -> bool {
        matches!(self, Self::Wallpaper(_))
    }
}

impl FromStr for Background {
    type Err = BackgroundParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solid(color) => f.write_str(&format_color(*color)),
            Self::Gradient { from, to } => write!(
                f,
                "linear-gradient(to right, {}, {})",
                format_color(*from),
                format_color(*to)
            ),
            Self::Wallpaper(reference) => f.write_str(reference),
        }
    }
}

impl Serialize for Background {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Background {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Parse `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(…)`, `rgba(…)` and a
/// few keywords.
pub fn parse_color(text: &str) -> Option<Rgba<u8>> {
    let text = text.trim();

    if let Some(hex) = text.strip_prefix('#') {
        return parse_hex(hex);
    }

    if let Some(caps) = RGB_PATTERN.captures(text) {
        let channel = |i: usize| caps[i].parse::<u16>().ok().filter(|v| *v <= 255).map(|v| v as u8);
        let alpha = match caps.get(4) {
            Some(a) => {
                let a: f32 = a.as_str().parse().ok()?;
                (a.clamp(0.0, 1.0) * 255.0).round() as u8
            }
            None => 255,
        };
        return Some(Rgba([channel(1)?, channel(2)?, channel(3)?, alpha]));
    }

    match text.to_ascii_lowercase().as_str() {
        "white" => Some(Rgba([255, 255, 255, 255])),
        "black" => Some(Rgba([0, 0, 0, 255])),
        "transparent" => Some(Rgba([0, 0, 0, 0])),
        _ => None,
    }
}

fn parse_hex(hex: &str) -> Option<Rgba<u8>> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, 255])),
        4 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?])),
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

pub fn format_color(color: Rgba<u8>) -> String {
    let [r, g, b, a] = color.0;
    if a == 255 {
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    } else {
        format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
    }
}
