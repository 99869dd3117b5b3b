//! Text overlay definitions.

use serde::{Deserialize, Serialize};

use crate::timeline::TextId;

/// A styled text overlay. Shown during the window of the text-track
/// clip that references it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOverlay {
    pub id: TextId,
    pub content: String,

    /// Position in output pixels.
    #[serde(default = "default_position")]
    pub x: f64,
    #[serde(default = "default_position")]
    pub y: f64,

    #[serde(default = "default_font_size")]
    pub font_size: u32,

    /// `#RRGGBB`, `0xRRGGBB`, or a named color.
    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub style: TextStyle,

    #[serde(default)]
    pub align: TextAlign,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<TextAnimation>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAnimation {
    FadeIn,
    SlideUp,
    Typewriter,
}

fn default_position() -> f64 {
    100.0
}

fn default_font_size() -> u32 {
    48
}

fn default_color() -> String {
    "#FFFFFF".to_string()
}

impl TextOverlay {
    /// New overlay with editor defaults; the id is assigned when added
    /// to a timeline.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: TextId(0),
            content: content.into(),
            x: default_position(),
            y: default_position(),
            font_size: default_font_size(),
            color: default_color(),
            style: TextStyle::default(),
            align: TextAlign::default(),
            animation: None,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_font_size(mut self, font_size: u32) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }
}
