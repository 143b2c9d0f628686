//! Subset of the Figma REST file schema that the importer reads.
//!
//! Every field is optional and node `type` is kept as a string, so files with
//! node kinds or properties this crate does not know still deserialize; the
//! converter reports what it skips.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// `GET /v1/files/:key` or `GET /v1/files/:key/nodes`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FigmaFile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub document: Option<FigmaNode>,
    /// Keyed by node id; sorted so output order is stable
    #[serde(default)]
    pub nodes: Option<BTreeMap<String, FigmaNodeEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FigmaNodeEntry {
    pub document: FigmaNode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct FigmaVector {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct FigmaRect {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FigmaColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "opaque")]
    pub a: f32,
}

fn opaque() -> f32 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FigmaColorStop {
    pub position: f32,
    pub color: FigmaColor,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FigmaPaint {
    #[serde(rename = "type")]
    pub kind: String,
    pub visible: Option<bool>,
    pub opacity: Option<f32>,
    pub color: Option<FigmaColor>,
    #[serde(default)]
    pub gradient_handle_positions: Vec<FigmaVector>,
    #[serde(default)]
    pub gradient_stops: Vec<FigmaColorStop>,
    pub image_ref: Option<String>,
    pub scale_mode: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FigmaEffect {
    #[serde(rename = "type")]
    pub kind: String,
    pub visible: Option<bool>,
    #[serde(default)]
    pub radius: f64,
    pub color: Option<FigmaColor>,
    pub offset: Option<FigmaVector>,
    pub spread: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FigmaTypeStyle {
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub font_weight: Option<f64>,
    pub italic: Option<bool>,
    pub letter_spacing: Option<f64>,
    pub fills: Option<Vec<FigmaPaint>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FigmaPath {
    pub path: String,
    pub winding_rule: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FigmaNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub visible: Option<bool>,
    pub locked: Option<bool>,
    pub opacity: Option<f64>,
    pub blend_mode: Option<String>,

    /// `[[a, c, tx], [b, d, ty]]`
    pub relative_transform: Option<[[f64; 3]; 2]>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    /// Degrees, counter-clockwise
    pub rotation: Option<f64>,
    pub scale: Option<f64>,

    pub size: Option<FigmaVector>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub absolute_bounding_box: Option<FigmaRect>,

    #[serde(default)]
    pub fills: Vec<FigmaPaint>,
    #[serde(default)]
    pub strokes: Vec<FigmaPaint>,
    pub stroke_weight: Option<f64>,
    #[serde(default)]
    pub effects: Vec<FigmaEffect>,
    pub corner_radius: Option<f64>,
    pub clips_content: Option<bool>,

    pub characters: Option<String>,
    pub style: Option<FigmaTypeStyle>,
    #[serde(default)]
    pub character_style_overrides: Vec<u32>,
    #[serde(default)]
    pub style_override_table: HashMap<String, FigmaTypeStyle>,
    pub text_auto_resize: Option<String>,

    #[serde(default)]
    pub fill_geometry: Vec<FigmaPath>,
    #[serde(default)]
    pub stroke_geometry: Vec<FigmaPath>,

    pub component_id: Option<String>,
    pub boolean_operation: Option<String>,

    #[serde(default)]
    pub children: Vec<FigmaNode>,
}

impl FigmaNode {
    pub fn is_visible(&self) -> bool {
        self.visible.unwrap_or(true)
    }
}
