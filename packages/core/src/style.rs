//! Paint, effect and text styling shared by every node kind

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Straight (non-premultiplied) RGBA, channels in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    pub fn gray(level: f32) -> Self {
        Self::rgb(level, level, level)
    }

    /// Naive CMYK conversion, as used by PDF device colour operators
    pub fn cmyk(c: f32, m: f32, y: f32, k: f32) -> Self {
        Self::rgb((1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k))
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub fn to_hex(&self) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        if self.a >= 1.0 {
            format!("#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))
        } else {
            format!(
                "#{:02x}{:02x}{:02x}{:02x}",
                byte(self.r),
                byte(self.g),
                byte(self.b),
                byte(self.a)
            )
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageFit {
    #[default]
    Fill,
    Fit,
    Crop,
    Tile,
}

/// Fill or stroke paint. Gradient coordinates are in the node's local space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Paint {
    Solid {
        color: Color,
    },
    #[serde(rename_all = "camelCase")]
    LinearGradient {
        start: Point,
        end: Point,
        stops: Vec<GradientStop>,
    },
    #[serde(rename_all = "camelCase")]
    RadialGradient {
        center: Point,
        radius: f64,
        stops: Vec<GradientStop>,
    },
    Image {
        src: String,
        #[serde(default)]
        fit: ImageFit,
    },
}

impl Paint {
    pub fn solid(color: Color) -> Self {
        Paint::Solid { color }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlendMode {
    #[default]
    Normal,
    PassThrough,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Effect {
    DropShadow {
        offset: Vec2,
        blur: f64,
        spread: f64,
        color: Color,
    },
    InnerShadow {
        offset: Vec2,
        blur: f64,
        spread: f64,
        color: Color,
    },
    LayerBlur {
        radius: f64,
    },
    BackdropBlur {
        radius: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Style {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fills: Vec<Paint>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub strokes: Vec<Paint>,
    pub stroke_width: f64,
    pub opacity: f64,
    pub blend_mode: BlendMode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fills: Vec::new(),
            strokes: Vec::new(),
            stroke_width: 1.0,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            effects: Vec::new(),
        }
    }
}

impl Style {
    pub fn filled(color: Color) -> Self {
        Self {
            fills: vec![Paint::solid(color)],
            ..Self::default()
        }
    }

    pub fn with_stroke(mut self, paint: Paint, width: f64) -> Self {
        self.strokes.push(paint);
        self.stroke_width = width;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontRef {
    pub family: String,
    pub size: f64,
    #[serde(default = "FontRef::default_weight")]
    pub weight: u16,
    #[serde(default)]
    pub italic: bool,
}

impl FontRef {
    pub fn new(family: impl Into<String>, size: f64) -> Self {
        Self {
            family: family.into(),
            size,
            weight: Self::default_weight(),
            italic: false,
        }
    }

    fn default_weight() -> u16 {
        400
    }
}

/// A span of text sharing one font and fill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    pub text: String,
    pub font: FontRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Paint>,
    #[serde(default)]
    pub letter_spacing: f64,
}

impl TextRun {
    pub fn new(text: impl Into<String>, font: FontRef) -> Self {
        Self {
            text: text.into(),
            font,
            fill: None,
            letter_spacing: 0.0,
        }
    }
}
