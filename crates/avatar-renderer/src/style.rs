//! Avatar style configuration.
//!
//! [`StyleSettings`] is the sparse, serde-facing form: every field is
//! optional so a configuration layer (or a request) can set only what it
//! wants. [`StyleSettings::merge`] fills gaps from a parent and
//! [`StyleSettings::resolve`] applies defaults and validation, producing the
//! immutable [`StyleConfig`] the renderer consumes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::StyleError;
use crate::layout::FontFace;

/// Default output edge length in pixels.
pub const DEFAULT_AVATAR_SIZE: u32 = 100;

/// Largest accepted output edge length in pixels.
pub const MAX_AVATAR_SIZE: u32 = 2048;

/// Default font family name.
pub const DEFAULT_FONT_FAMILY: &str = "sans";

pub const DEFAULT_BACKGROUND: Rgb = Rgb::from_unit(0.26, 0.52, 0.96);

pub const DEFAULT_CONTOUR_COLOR: Rgb = Rgb::from_unit(0.2, 0.2, 0.2);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    #[default]
    Circle,
    Square,
}

/// How the background fill color is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    /// Always the same color.
    Fixed(Rgb),
    /// Three independent uniform draws per render; text color is then chosen
    /// for contrast.
    Random,
}

/// Fully resolved, validated style for one render.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleConfig {
    pub size: u32,
    pub shape: Shape,
    pub show_contour: bool,
    pub background: Background,
    pub contour_color: Rgb,
    pub font_color: Rgb,
    pub font_family: String,
    pub font_italic: bool,
    pub font_bold: bool,
    pub font_size: f64,
}

impl StyleConfig {
    /// Font face selected by this style.
    pub fn font_face(&self) -> FontFace {
        FontFace::new(self.font_family.clone(), self.font_italic, self.font_bold)
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_AVATAR_SIZE,
            shape: Shape::Circle,
            show_contour: true,
            background: Background::Fixed(DEFAULT_BACKGROUND),
            contour_color: DEFAULT_CONTOUR_COLOR,
            font_color: Rgb::WHITE,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_italic: false,
            font_bold: false,
            font_size: (DEFAULT_AVATAR_SIZE / 2) as f64,
        }
    }
}

/// Sparse style settings, as found in configuration files and overrides.
///
/// Field names follow the configuration directives (`bg_color`,
/// `random_bg_color`, `square`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub square: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_contour: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_bg_color: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contour_color: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_face: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_bold: Option<bool>,
}

impl StyleSettings {
    /// Load settings from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Load settings from a YAML string.
    pub fn from_yaml(yaml_str: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml_str)
    }

    /// Load settings from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Self::from_json(&content)?),
            _ => Ok(Self::from_yaml(&content)?),
        }
    }

    /// Fill every unset field from `parent`. Fields set here win.
    pub fn merge(&self, parent: &StyleSettings) -> StyleSettings {
        StyleSettings {
            size: self.size.or(parent.size),
            square: self.square.or(parent.square),
            show_contour: self.show_contour.or(parent.show_contour),
            bg_color: self.bg_color.or(parent.bg_color),
            random_bg_color: self.random_bg_color.or(parent.random_bg_color),
            contour_color: self.contour_color.or(parent.contour_color),
            font_color: self.font_color.or(parent.font_color),
            font_face: self.font_face.clone().or_else(|| parent.font_face.clone()),
            font_size: self.font_size.or(parent.font_size),
            font_italic: self.font_italic.or(parent.font_italic),
            font_bold: self.font_bold.or(parent.font_bold),
        }
    }

    /// Apply defaults and validate.
    ///
    /// When `font_size` is unset it becomes half the avatar size (integer
    /// division, at least 1), so a size override also scales the default
    /// font. Only an explicit `font_size` can be rejected.
    pub fn resolve(&self) -> Result<StyleConfig, StyleError> {
        let size = self.size.unwrap_or(DEFAULT_AVATAR_SIZE);
        if size == 0 || size > MAX_AVATAR_SIZE {
            return Err(StyleError::InvalidSize(size));
        }

        let font_size = match self.font_size {
            Some(font_size) if !font_size.is_finite() || font_size <= 0.0 => {
                return Err(StyleError::InvalidFontSize(font_size));
            }
            Some(font_size) => font_size,
            None => (size / 2).max(1) as f64,
        };

        let background = if self.random_bg_color.unwrap_or(false) {
            Background::Random
        } else {
            Background::Fixed(self.bg_color.unwrap_or(DEFAULT_BACKGROUND))
        };

        let font_family = match self.font_face.as_deref().map(str::trim) {
            Some(family) if !family.is_empty() => family.to_string(),
            _ => DEFAULT_FONT_FAMILY.to_string(),
        };

        Ok(StyleConfig {
            size,
            shape: if self.square.unwrap_or(false) {
                Shape::Square
            } else {
                Shape::Circle
            },
            show_contour: self.show_contour.unwrap_or(true),
            background,
            contour_color: self.contour_color.unwrap_or(DEFAULT_CONTOUR_COLOR),
            font_color: self.font_color.unwrap_or(Rgb::WHITE),
            font_family,
            font_italic: self.font_italic.unwrap_or(false),
            font_bold: self.font_bold.unwrap_or(false),
            font_size,
        })
    }
}
