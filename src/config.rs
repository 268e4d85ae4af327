//! Artifact configuration.
//!
//! [`ArtifactConfig`] is the complete, typed configuration a renderer sees.
//! Callers supply a partial [`ConfigOverrides`]; [`merge`] lays it over a
//! set of defaults. Option names follow the camelCase keys used in JSON
//! option bags (`foregroundColor`, `errorCorrectionLevel`, ...), and any
//! key the registry does not recognize is carried through untouched in
//! `extra` for the renderer to interpret.

use crate::error::ParseColorError;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_WIDTH: u32 = 256;
pub const DEFAULT_HEIGHT: u32 = 256;
pub const DEFAULT_FOREGROUND: Color = Color::BLACK;
pub const DEFAULT_BACKGROUND: Color = Color::WHITE;

/// The error correction level used to encode a QR code.
///
/// Serialized as the single-letter level name (`"L"`, `"M"`, `"Q"`, `"H"`).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCorrection {
    /// Tolerates ~7% erroneous codewords.
    #[serde(rename = "L")]
    Low,
    /// Tolerates ~15% erroneous codewords.
    #[default]
    #[serde(rename = "M")]
    Medium,
    /// Tolerates ~25% erroneous codewords.
    #[serde(rename = "Q")]
    Quartile,
    /// Tolerates ~30% erroneous codewords.
    #[serde(rename = "H")]
    High,
}

impl ErrorCorrection {
    /// Returns the single-letter level name.
    pub fn as_str(self) -> &'static str {
        use ErrorCorrection::*;
        match self {
            Low => "L",
            Medium => "M",
            Quartile => "Q",
            High => "H",
        }
    }
}

impl fmt::Display for ErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An opaque RGB color, written as `#rrggbb`.
///
/// Parses `#rgb` and `#rrggbb` (case-insensitive); always displays as
/// lowercase `#rrggbb`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color([u8; 3]);

impl Color {
    pub const BLACK: Color = Color([0x00, 0x00, 0x00]);
    pub const WHITE: Color = Color([0xff, 0xff, 0xff]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color([r, g, b])
    }

    /// Returns the fully opaque `[r, g, b, a]` channels.
    pub const fn to_rgba(self) -> [u8; 4] {
        [self.0[0], self.0[1], self.0[2], 0xff]
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError {
            value: s.to_string(),
        };
        let hex = s.strip_prefix('#').ok_or_else(err)?;
        if !hex.is_ascii() {
            return Err(err());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| err());
        match hex.len() {
            3 => {
                let mut out = [0u8; 3];
                for (i, slot) in out.iter_mut().enumerate() {
                    let v = channel(&hex[i..i + 1])?;
                    *slot = v * 0x11;
                }
                Ok(Color(out))
            }
            6 => Ok(Color([
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            ])),
            _ => Err(err()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
    }
}

/// The configuration snapshot an artifact was rendered with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArtifactConfig {
    pub width: u32,
    pub height: u32,
    pub foreground_color: Color,
    pub background_color: Color,
    pub error_correction_level: ErrorCorrection,
    /// Renderer-specific options the registry does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        ArtifactConfig {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            foreground_color: DEFAULT_FOREGROUND,
            background_color: DEFAULT_BACKGROUND,
            error_correction_level: ErrorCorrection::default(),
            extra: Map::new(),
        }
    }
}

impl ArtifactConfig {
    /// Looks up a pass-through option by key.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// A partial configuration supplied by the caller.
///
/// Unset options fall back to the registry defaults when merged.
///
/// # Example
///
/// ```rust
/// use qirust_registry::config::{ConfigOverrides, ErrorCorrection};
///
/// let overrides = ConfigOverrides::new()
///     .width(128)
///     .error_correction_level(ErrorCorrection::High)
///     .extra("quietZone", 2);
/// assert_eq!(overrides.width, Some(128));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_correction_level: Option<ErrorCorrection>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an option bag such as
    /// `{"width": 128, "foregroundColor": "#336699", "margin": 2}`.
    ///
    /// Recognized keys are type-checked; every other key is kept in `extra`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn foreground_color(mut self, color: Color) -> Self {
        self.foreground_color = Some(color);
        self
    }

    pub fn background_color(mut self, color: Color) -> Self {
        self.background_color = Some(color);
        self
    }

    pub fn error_correction_level(mut self, level: ErrorCorrection) -> Self {
        self.error_correction_level = Some(level);
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Lays `overrides` over `defaults`, option by option.
///
/// Pass-through keys from `overrides` replace same-named keys in
/// `defaults.extra`; the rest of `defaults.extra` is kept.
pub fn merge(defaults: &ArtifactConfig, overrides: &ConfigOverrides) -> ArtifactConfig {
    let mut extra = defaults.extra.clone();
    for (key, value) in &overrides.extra {
        extra.insert(key.clone(), value.clone());
    }

    ArtifactConfig {
        width: overrides.width.unwrap_or(defaults.width),
        height: overrides.height.unwrap_or(defaults.height),
        foreground_color: overrides.foreground_color.unwrap_or(defaults.foreground_color),
        background_color: overrides.background_color.unwrap_or(defaults.background_color),
        error_correction_level: overrides
            .error_correction_level
            .unwrap_or(defaults.error_correction_level),
        extra,
    }
}
