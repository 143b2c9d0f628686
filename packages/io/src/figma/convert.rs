//! Figma node tree → detached [`NodeTree`]s

use super::schema::{FigmaColor, FigmaEffect, FigmaFile, FigmaNode, FigmaPaint, FigmaTypeStyle};
use crate::{Diagnostics, ImportError, ImportResult};
use kurbo::{Affine, BezPath, Point, Size, Vec2};
use serde_json::Value;
use vellum_core::{
    BlendMode, Color, Effect, FontRef, GradientStop, ImageFit, NodeKind, NodeTree, Paint, Style,
    TextRun, VectorGeometry,
};

const DEFAULT_PAGE_NAME: &str = "Imported";
const DEFAULT_FONT_FAMILY: &str = "Inter";
const DEFAULT_FONT_SIZE: f64 = 12.0;
/// Group transforms with a smaller determinant cannot be inverted
const SINGULAR_EPSILON: f64 = 1e-12;

/// Pages in source order, each a list of root trees
pub(crate) type Pages = Vec<(String, Vec<NodeTree>)>;

/// Decide what shape of JSON we were given and turn it into pages
pub(crate) fn parse_pages(value: Value, diagnostics: &mut Diagnostics) -> ImportResult<Pages> {
    let object = value
        .as_object()
        .ok_or_else(|| ImportError::Malformed("expected a JSON object".into()))?;

    if object.contains_key("document") || object.contains_key("nodes") {
        let file: FigmaFile = serde_json::from_value(value)?;
        return Ok(Converter::new(diagnostics).file(&file));
    }
    if object.contains_key("type") {
        let node: FigmaNode = serde_json::from_value(value)?;
        let mut converter = Converter::new(diagnostics);
        let mut pages = Pages::new();
        converter.top_level(&node, DEFAULT_PAGE_NAME, &mut pages);
        return Ok(pages);
    }

    Err(ImportError::Malformed(
        "expected `document`, `nodes` or a node with `type`".into(),
    ))
}

struct Converter<'d> {
    diagnostics: &'d mut Diagnostics,
}

impl<'d> Converter<'d> {
    fn new(diagnostics: &'d mut Diagnostics) -> Self {
        Self { diagnostics }
    }

    fn file(&mut self, file: &FigmaFile) -> Pages {
        let fallback = file.name.as_deref().unwrap_or(DEFAULT_PAGE_NAME);
        let mut pages = Pages::new();

        if let Some(document) = &file.document {
            self.top_level(document, fallback, &mut pages);
        }
        if let Some(nodes) = &file.nodes {
            for entry in nodes.values() {
                self.top_level(&entry.document, fallback, &mut pages);
            }
        }
        pages
    }

    /// DOCUMENT fans out to its canvases, CANVAS becomes a page and anything
    /// else is placed on a page of its own
    fn top_level(&mut self, node: &FigmaNode, fallback: &str, pages: &mut Pages) {
        match node.kind.as_str() {
            "DOCUMENT" => {
                for child in &node.children {
                    self.top_level(child, fallback, pages);
                }
            }
            "CANVAS" => {
                let name = if node.name.is_empty() { fallback } else { &node.name };
                let roots = self.children(&node.children, Affine::IDENTITY);
                pages.push((name.to_string(), roots));
            }
            _ => {
                let roots = self.node(node, Affine::IDENTITY).into_iter().collect();
                pages.push((fallback.to_string(), roots));
            }
        }
    }

    fn children(&mut self, children: &[FigmaNode], space: Affine) -> Vec<NodeTree> {
        children.iter().filter_map(|child| self.node(child, space)).collect()
    }

    /// `space` maps the source's coordinate system for this node into its
    /// new parent. Frames reset it; groups do not establish one in Figma.
    fn node(&mut self, node: &FigmaNode, space: Affine) -> Option<NodeTree> {
        let id = node.id.as_str();
        let raw = source_transform(node);
        let size = node_size(node);

        let (kind, children) = match node.kind.as_str() {
            "FRAME" | "COMPONENT" | "COMPONENT_SET" | "SECTION" => {
                let kind = NodeKind::Container {
                    size,
                    clip: node.clips_content.unwrap_or(false),
                };
                (kind, self.children(&node.children, Affine::IDENTITY))
            }
            "GROUP" | "BOOLEAN_OPERATION" => {
                if node.kind == "BOOLEAN_OPERATION" {
                    let op = node.boolean_operation.as_deref().unwrap_or("UNION");
                    self.diagnostics.push(
                        Some(id),
                        format!("boolean operation `{}` imported as a group of its operands", op),
                    );
                }
                let kind = NodeKind::Container { size, clip: false };
                let space = if raw.determinant().abs() > SINGULAR_EPSILON {
                    raw.inverse()
                } else {
                    self.diagnostics.push(
                        Some(id),
                        "group transform is singular, children keep frame coordinates",
                    );
                    Affine::IDENTITY
                };
                (kind, self.children(&node.children, space))
            }
            "RECTANGLE" => (
                NodeKind::Rectangle {
                    size,
                    corner_radius: node.corner_radius.unwrap_or(0.0),
                },
                Vec::new(),
            ),
            "ELLIPSE" => (NodeKind::Ellipse { size }, Vec::new()),
            "LINE" => (NodeKind::Line { length: size.width }, Vec::new()),
            "TEXT" => (self.text(node, size), Vec::new()),
            "VECTOR" | "STAR" | "REGULAR_POLYGON" => (self.vector(node), Vec::new()),
            "INSTANCE" => {
                let template = node.component_id.clone().unwrap_or_default();
                if template.is_empty() {
                    self.diagnostics.push(Some(id), "instance without `componentId`");
                }
                let kind = NodeKind::Instance {
                    template,
                    props: Value::Null,
                };
                (kind, self.children(&node.children, Affine::IDENTITY))
            }
            other => {
                self.diagnostics
                    .push(Some(id), format!("unsupported node type `{}`", other));
                return None;
            }
        };

        let mut tree = NodeTree::new(kind)
            .named(node.name.clone())
            .with_transform(space * raw)
            .with_style(self.style(node))
            .with_origin(node.id.clone());
        tree.active = node.is_visible();
        tree.children = children;
        Some(tree)
    }

    fn style(&mut self, node: &FigmaNode) -> Style {
        let id = node.id.as_str();
        let size = node_size(node);
        let mut style = Style::default();

        // Text fills live on the runs
        if node.kind != "TEXT" {
            style.fills = self.paints(id, &node.fills, size, "fill");
        }
        style.strokes = self.paints(id, &node.strokes, size, "stroke");
        if let Some(weight) = node.stroke_weight {
            style.stroke_width = weight;
        }
        if let Some(opacity) = node.opacity {
            style.opacity = opacity;
        }
        if let Some(mode) = &node.blend_mode {
            style.blend_mode = self.blend_mode(id, mode);
        }
        style.effects = node
            .effects
            .iter()
            .filter_map(|effect| self.effect(id, effect))
            .collect();
        style
    }

    fn paints(&mut self, id: &str, paints: &[FigmaPaint], size: Size, role: &str) -> Vec<Paint> {
        paints
            .iter()
            .filter_map(|paint| self.paint(id, paint, size, role))
            .collect()
    }

    fn paint(&mut self, id: &str, paint: &FigmaPaint, size: Size, role: &str) -> Option<Paint> {
        if paint.visible == Some(false) {
            self.diagnostics
                .push(Some(id), format!("hidden {} `{}` omitted", role, paint.kind));
            return None;
        }
        let opacity = paint.opacity.unwrap_or(1.0);

        let handle = |i: usize| {
            paint
                .gradient_handle_positions
                .get(i)
                .map(|v| Point::new(v.x * size.width, v.y * size.height))
        };
        let stops = || -> Vec<GradientStop> {
            paint
                .gradient_stops
                .iter()
                .map(|stop| GradientStop {
                    offset: stop.position,
                    color: color(&stop.color, opacity),
                })
                .collect()
        };

        match paint.kind.as_str() {
            "SOLID" => match &paint.color {
                Some(c) => Some(Paint::Solid {
                    color: color(c, opacity),
                }),
                None => {
                    self.diagnostics.push(Some(id), "solid paint without color");
                    None
                }
            },
            "GRADIENT_LINEAR" => match (handle(0), handle(1)) {
                (Some(start), Some(end)) => Some(Paint::LinearGradient {
                    start,
                    end,
                    stops: stops(),
                }),
                _ => {
                    self.diagnostics
                        .push(Some(id), "linear gradient without handle positions");
                    None
                }
            },
            "GRADIENT_RADIAL" => match (handle(0), handle(1)) {
                (Some(center), Some(edge)) => Some(Paint::RadialGradient {
                    center,
                    radius: center.distance(edge),
                    stops: stops(),
                }),
                _ => {
                    self.diagnostics
                        .push(Some(id), "radial gradient without handle positions");
                    None
                }
            },
            "IMAGE" => {
                let fit = match paint.scale_mode.as_deref() {
                    Some("FIT") => ImageFit::Fit,
                    Some("CROP") => ImageFit::Crop,
                    Some("TILE") => ImageFit::Tile,
                    _ => ImageFit::Fill,
                };
                Some(Paint::Image {
                    src: paint.image_ref.clone().unwrap_or_default(),
                    fit,
                })
            }
            other => {
                self.diagnostics
                    .push(Some(id), format!("unsupported paint `{}`", other));
                None
            }
        }
    }

    fn effect(&mut self, id: &str, effect: &FigmaEffect) -> Option<Effect> {
        if effect.visible == Some(false) {
            self.diagnostics
                .push(Some(id), format!("hidden effect `{}` omitted", effect.kind));
            return None;
        }
        let shadow_color = effect.color.as_ref().map_or(Color::rgba(0.0, 0.0, 0.0, 0.25), |c| color(c, 1.0));
        let offset = effect.offset.map_or(Vec2::ZERO, |o| Vec2::new(o.x, o.y));
        let spread = effect.spread.unwrap_or(0.0);

        match effect.kind.as_str() {
            "DROP_SHADOW" => Some(Effect::DropShadow {
                offset,
                blur: effect.radius,
                spread,
                color: shadow_color,
            }),
            "INNER_SHADOW" => Some(Effect::InnerShadow {
                offset,
                blur: effect.radius,
                spread,
                color: shadow_color,
            }),
            "LAYER_BLUR" => Some(Effect::LayerBlur {
                radius: effect.radius,
            }),
            "BACKGROUND_BLUR" => Some(Effect::BackdropBlur {
                radius: effect.radius,
            }),
            other => {
                self.diagnostics
                    .push(Some(id), format!("unsupported effect `{}`", other));
                None
            }
        }
    }

    fn blend_mode(&mut self, id: &str, mode: &str) -> BlendMode {
        match mode {
            "NORMAL" => BlendMode::Normal,
            "PASS_THROUGH" => BlendMode::PassThrough,
            "MULTIPLY" => BlendMode::Multiply,
            "SCREEN" => BlendMode::Screen,
            "OVERLAY" => BlendMode::Overlay,
            "DARKEN" => BlendMode::Darken,
            "LIGHTEN" => BlendMode::Lighten,
            "COLOR_DODGE" => BlendMode::ColorDodge,
            "COLOR_BURN" => BlendMode::ColorBurn,
            "HARD_LIGHT" => BlendMode::HardLight,
            "SOFT_LIGHT" => BlendMode::SoftLight,
            "DIFFERENCE" => BlendMode::Difference,
            "EXCLUSION" => BlendMode::Exclusion,
            "HUE" => BlendMode::Hue,
            "SATURATION" => BlendMode::Saturation,
            "COLOR" => BlendMode::Color,
            "LUMINOSITY" => BlendMode::Luminosity,
            other => {
                self.diagnostics.push(
                    Some(id),
                    format!("unsupported blend mode `{}`, using normal", other),
                );
                BlendMode::Normal
            }
        }
    }

    fn text(&mut self, node: &FigmaNode, size: Size) -> NodeKind {
        let id = node.id.as_str();
        let characters = node.characters.as_deref().unwrap_or_default();
        let base = node.style.clone().unwrap_or_default();
        let base_fill = self.paints(id, &node.fills, size, "fill").into_iter().next();

        // Consecutive characters sharing an override id form one run; 0 and
        // anything past the overrides array use the base style
        let mut runs: Vec<TextRun> = Vec::new();
        let mut current: Option<(u32, String)> = None;
        for (i, ch) in characters.chars().enumerate() {
            let key = node.character_style_overrides.get(i).copied().unwrap_or(0);
            match &mut current {
                Some((k, text)) if *k == key => text.push(ch),
                _ => {
                    if let Some((k, text)) = current.take() {
                        runs.push(self.run(node, &base, base_fill.as_ref(), k, text));
                    }
                    current = Some((key, ch.to_string()));
                }
            }
        }
        if let Some((k, text)) = current {
            runs.push(self.run(node, &base, base_fill.as_ref(), k, text));
        }

        let width = match node.text_auto_resize.as_deref() {
            Some("WIDTH_AND_HEIGHT") => None,
            _ if size.width > 0.0 => Some(size.width),
            _ => None,
        };
        NodeKind::Text { runs, width }
    }

    fn run(
        &mut self,
        node: &FigmaNode,
        base: &FigmaTypeStyle,
        base_fill: Option<&Paint>,
        key: u32,
        text: String,
    ) -> TextRun {
        let id = node.id.as_str();
        let over = (key != 0)
            .then(|| node.style_override_table.get(&key.to_string()))
            .flatten();
        if key != 0 && over.is_none() {
            self.diagnostics.push(
                Some(id),
                format!("missing style override `{}`, using base style", key),
            );
        }

        let pick = |f: fn(&FigmaTypeStyle) -> Option<f64>| over.and_then(f).or_else(|| f(base));
        let family = over
            .and_then(|s| s.font_family.clone())
            .or_else(|| base.font_family.clone())
            .unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string());

        let mut font = FontRef::new(family, pick(|s| s.font_size).unwrap_or(DEFAULT_FONT_SIZE));
        if let Some(weight) = pick(|s| s.font_weight) {
            font.weight = weight.round().clamp(1.0, 1000.0) as u16;
        }
        font.italic = over.and_then(|s| s.italic).or(base.italic).unwrap_or(false);

        let fill = match over.and_then(|s| s.fills.as_ref()) {
            Some(fills) => self.paints(id, fills, Size::ZERO, "fill").into_iter().next(),
            None => base_fill.cloned(),
        };

        let mut run = TextRun::new(text, font);
        run.fill = fill;
        run.letter_spacing = pick(|s| s.letter_spacing).unwrap_or(0.0);
        run
    }

    fn vector(&mut self, node: &FigmaNode) -> NodeKind {
        let id = node.id.as_str();
        let geometry = if node.fill_geometry.is_empty() {
            &node.stroke_geometry
        } else {
            &node.fill_geometry
        };
        if geometry.is_empty() {
            self.diagnostics
                .push(Some(id), format!("`{}` has no geometry", node.kind));
        }

        let mut path = BezPath::new();
        for entry in geometry {
            match BezPath::from_svg(&entry.path) {
                Ok(parsed) => path.extend(parsed),
                Err(err) => self
                    .diagnostics
                    .push(Some(id), format!("unreadable path data: {}", err)),
            }
        }
        NodeKind::Vector {
            geometry: VectorGeometry::Path { path },
        }
    }
}

/// Transform relative to the nearest frame ancestor, as Figma stores it
fn source_transform(node: &FigmaNode) -> Affine {
    if let Some([[a, c, tx], [b, d, ty]]) = node.relative_transform {
        return Affine::new([a, b, c, d, tx, ty]);
    }
    let translate = Affine::translate((node.x.unwrap_or(0.0), node.y.unwrap_or(0.0)));
    let rotate = Affine::rotate(-node.rotation.unwrap_or(0.0).to_radians());
    translate * rotate * Affine::scale(node.scale.unwrap_or(1.0))
}

fn node_size(node: &FigmaNode) -> Size {
    if let Some(size) = node.size {
        return Size::new(size.x, size.y);
    }
    match (node.width, node.height) {
        (Some(w), Some(h)) => Size::new(w, h),
        _ => node
            .absolute_bounding_box
            .map_or(Size::ZERO, |b| Size::new(b.width, b.height)),
    }
}

fn color(c: &FigmaColor, opacity: f32) -> Color {
    Color::rgba(c.r, c.g, c.b, c.a * opacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn convert(value: Value) -> (Pages, Vec<crate::Diagnostic>) {
        let mut diagnostics = Diagnostics::new();
        let pages = parse_pages(value, &mut diagnostics).unwrap();
        (pages, diagnostics.into_vec())
    }

    fn single(value: Value) -> (NodeTree, Vec<crate::Diagnostic>) {
        let (mut pages, diagnostics) = convert(value);
        let (_, mut roots) = pages.remove(0);
        (roots.remove(0), diagnostics)
    }

    #[test]
    fn test_relative_transform_maps_to_affine() {
        let (tree, _) = single(json!({
            "type": "RECTANGLE", "id": "1:1",
            "relativeTransform": [[0.0, -1.0, 5.0], [1.0, 0.0, 7.0]],
            "size": { "x": 10.0, "y": 4.0 }
        }));
        assert_eq!(tree.transform, Affine::new([0.0, 1.0, -1.0, 0.0, 5.0, 7.0]));
        assert_eq!(tree.kind, NodeKind::rectangle(10.0, 4.0));
        assert_eq!(tree.origin.as_deref(), Some("1:1"));
    }

    #[test]
    fn test_group_children_relative_to_group() {
        let (frame, diagnostics) = single(json!({
            "type": "FRAME", "id": "1:0", "size": { "x": 100.0, "y": 100.0 },
            "children": [{
                "type": "GROUP", "id": "1:1",
                "relativeTransform": [[1.0, 0.0, 10.0], [0.0, 1.0, 20.0]],
                "children": [{
                    "type": "ELLIPSE", "id": "1:2",
                    "relativeTransform": [[1.0, 0.0, 15.0], [0.0, 1.0, 25.0]],
                    "size": { "x": 5.0, "y": 5.0 }
                }]
            }]
        }));
        assert!(diagnostics.is_empty());

        let group = &frame.children[0];
        assert_eq!(group.transform, Affine::translate((10.0, 20.0)));
        assert_eq!(group.children[0].transform, Affine::translate((5.0, 5.0)));
    }

    #[test]
    fn test_boolean_operation_is_reported() {
        let (tree, diagnostics) = single(json!({
            "type": "BOOLEAN_OPERATION", "id": "4:4", "booleanOperation": "SUBTRACT",
            "children": []
        }));
        assert!(matches!(tree.kind, NodeKind::Container { .. }));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].reason.contains("SUBTRACT"));
    }

    #[test]
    fn test_text_runs_follow_overrides() {
        let (tree, diagnostics) = single(json!({
            "type": "TEXT", "id": "2:1",
            "characters": "Hello you",
            "style": { "fontFamily": "Roboto", "fontSize": 16.0, "fontWeight": 400.0 },
            "characterStyleOverrides": [0, 0, 0, 0, 0, 0, 1, 1, 1],
            "styleOverrideTable": { "1": { "fontWeight": 700.0 } },
            "fills": [{ "type": "SOLID", "color": { "r": 1.0, "g": 0.0, "b": 0.0, "a": 1.0 } }]
        }));
        assert!(diagnostics.is_empty());

        let NodeKind::Text { runs, .. } = &tree.kind else {
            panic!("expected text, got {:?}", tree.kind);
        };
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "Hello ");
        assert_eq!(runs[1].text, "you");
        assert_eq!(runs[1].font.weight, 700);
        assert_eq!(runs[1].font.family, "Roboto");
        assert_eq!(runs[1].fill, Some(Paint::solid(Color::rgb(1.0, 0.0, 0.0))));
        assert!(tree.style.fills.is_empty());
    }

    #[test]
    fn test_vector_geometry_parsed() {
        let (tree, _) = single(json!({
            "type": "STAR", "id": "3:1",
            "fillGeometry": [{ "path": "M0 0L10 0L5 8Z", "windingRule": "NONZERO" }]
        }));
        let NodeKind::Vector { geometry } = &tree.kind else {
            panic!("expected vector");
        };
        assert_eq!(geometry.to_bez_path().map(|p| p.elements().len()), Some(4));
    }

    #[test]
    fn test_gradient_handles_scaled_by_size() {
        let (tree, _) = single(json!({
            "type": "RECTANGLE", "id": "5:1", "size": { "x": 200.0, "y": 100.0 },
            "fills": [{
                "type": "GRADIENT_LINEAR",
                "gradientHandlePositions": [{ "x": 0.0, "y": 0.5 }, { "x": 1.0, "y": 0.5 }, { "x": 0.0, "y": 1.0 }],
                "gradientStops": [
                    { "position": 0.0, "color": { "r": 0.0, "g": 0.0, "b": 0.0, "a": 1.0 } },
                    { "position": 1.0, "color": { "r": 1.0, "g": 1.0, "b": 1.0, "a": 1.0 } }
                ]
            }]
        }));
        let Paint::LinearGradient { start, end, stops } = &tree.style.fills[0] else {
            panic!("expected linear gradient");
        };
        assert_eq!(*start, Point::new(0.0, 50.0));
        assert_eq!(*end, Point::new(200.0, 50.0));
        assert_eq!(stops.len(), 2);
    }

    #[test]
    fn test_unsupported_pieces_are_diagnosed() {
        let (frame, diagnostics) = single(json!({
            "type": "FRAME", "id": "0:1", "blendMode": "LINEAR_BURN",
            "fills": [{ "type": "GRADIENT_ANGULAR" }],
            "children": [{ "type": "STICKY", "id": "0:2" }]
        }));
        assert!(frame.children.is_empty());
        assert_eq!(frame.style.blend_mode, BlendMode::Normal);

        let reasons: Vec<_> = diagnostics.iter().map(|d| d.reason.as_str()).collect();
        assert_eq!(reasons.len(), 3);
        assert!(reasons.iter().any(|r| r.contains("GRADIENT_ANGULAR")));
        assert!(reasons.iter().any(|r| r.contains("LINEAR_BURN")));
        assert!(reasons.iter().any(|r| r.contains("STICKY")));
    }

    #[test]
    fn test_canvases_become_pages() {
        let (pages, _) = convert(json!({
            "name": "File",
            "document": {
                "type": "DOCUMENT", "id": "0:0",
                "children": [
                    { "type": "CANVAS", "id": "0:1", "name": "Cover", "children": [] },
                    { "type": "CANVAS", "id": "0:2", "name": "Flows", "children": [] }
                ]
            }
        }));
        let names: Vec<_> = pages.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["Cover", "Flows"]);
    }

    #[test]
    fn test_unrecognized_shape_is_fatal() {
        let mut diagnostics = Diagnostics::new();
        let err = parse_pages(json!({ "hello": 1 }), &mut diagnostics).unwrap_err();
        assert!(matches!(err, ImportError::Malformed(_)));
    }
}
