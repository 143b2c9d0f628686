//! Executes content stream operations against a graphics state and emits a
//! node per painted path, positioned text line and placed XObject.
//!
//! PDF user space has y pointing up. Every emitted transform is prefixed with
//! a flip that maps the media box into page space (origin top-left, y down).

use super::operation::{Operand, Operation};
use crate::Diagnostics;
use kurbo::{Affine, BezPath, Point, Rect, Size};
use vellum_core::{Color, FontRef, NodeKind, NodeTree, Paint, Style, TextRun};

const DEFAULT_FONT_FAMILY: &str = "Helvetica";
const DEFAULT_FONT_SIZE: f64 = 12.0;
/// TJ adjustments at or below this (thousandths of an em) read as a space
const WORD_GAP: f64 = -200.0;

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Affine,
    fill: Color,
    stroke: Color,
    line_width: f64,
    font: Option<FontRef>,
    char_spacing: f64,
    leading: f64,
    render_mode: u8,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Affine::IDENTITY,
            fill: Color::BLACK,
            stroke: Color::BLACK,
            line_width: 1.0,
            font: None,
            char_spacing: 0.0,
            leading: 0.0,
            render_mode: 0,
        }
    }
}

/// Runs shown since the text position last moved
#[derive(Debug)]
struct TextLine {
    transform: Affine,
    runs: Vec<TextRun>,
    origin: String,
    visible: bool,
}

#[derive(Debug)]
struct TextObject {
    matrix: Affine,
    line_matrix: Affine,
    line: Option<TextLine>,
}

impl TextObject {
    fn new() -> Self {
        Self {
            matrix: Affine::IDENTITY,
            line_matrix: Affine::IDENTITY,
            line: None,
        }
    }
}

pub(crate) struct Interpreter<'d> {
    diagnostics: &'d mut Diagnostics,
    flip: Affine,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
    path: BezPath,
    current: Option<Point>,
    /// Set while the path is exactly one `re`
    rect_only: Option<Rect>,
    clip: bool,
    text: Option<TextObject>,
    nodes: Vec<NodeTree>,
}

impl<'d> Interpreter<'d> {
    /// `media_box` is `[llx, lly, urx, ury]` in user space
    pub(crate) fn new(media_box: [f64; 4], diagnostics: &'d mut Diagnostics) -> Self {
        let [llx, _, _, ury] = media_box;
        Self {
            diagnostics,
            flip: Affine::new([1.0, 0.0, 0.0, -1.0, -llx, ury]),
            state: GraphicsState::default(),
            saved: Vec::new(),
            path: BezPath::new(),
            current: None,
            rect_only: None,
            clip: false,
            text: None,
            nodes: Vec::new(),
        }
    }

    pub(crate) fn run(mut self, operations: &[Operation]) -> Vec<NodeTree> {
        for (index, operation) in operations.iter().enumerate() {
            self.step(&format!("#{}", index), operation);
        }
        if self.text.is_some() {
            self.diagnostics.push(None, "text object not closed with `ET`");
            self.end_line();
        }
        if !self.path.elements().is_empty() {
            self.diagnostics.push(None, "path constructed but never painted");
        }
        self.nodes
    }

    fn step(&mut self, at: &str, op: &Operation) {
        let operator = op.operator.as_str();
        if let Some(expected) = arity(operator) {
            if op.operands.len() != expected {
                self.diagnostics.push(
                    Some(at),
                    format!(
                        "`{}` expects {} operands, got {}",
                        operator,
                        expected,
                        op.operands.len()
                    ),
                );
                return;
            }
        }

        match operator {
            // Graphics state
            "q" => self.saved.push(self.state.clone()),
            "Q" => {
                self.end_line();
                match self.saved.pop() {
                    Some(state) => self.state = state,
                    None => self.diagnostics.push(Some(at), "unbalanced `Q`"),
                }
            }
            "cm" => {
                if let Some(m) = self.numbers(at, op) {
                    self.end_line();
                    self.state.ctm = self.state.ctm * matrix(&m);
                }
            }
            "w" => {
                if let Some(n) = self.numbers(at, op) {
                    self.state.line_width = n[0];
                }
            }

            // Colour
            "g" | "rg" | "k" => {
                if let Some(color) = self.device_color(at, op) {
                    self.state.fill = color;
                }
            }
            "G" | "RG" | "K" => {
                if let Some(color) = self.device_color(at, op) {
                    self.state.stroke = color;
                }
            }
            "sc" | "scn" => {
                if let Some(color) = self.device_color(at, op) {
                    self.state.fill = color;
                }
            }
            "SC" | "SCN" => {
                if let Some(color) = self.device_color(at, op) {
                    self.state.stroke = color;
                }
            }
            // Selecting a colour space resets the colour to its initial value
            "cs" => self.state.fill = Color::BLACK,
            "CS" => self.state.stroke = Color::BLACK,

            // Path construction
            "m" => {
                if let Some(n) = self.numbers(at, op) {
                    let p = Point::new(n[0], n[1]);
                    self.path.move_to(p);
                    self.current = Some(p);
                    self.rect_only = None;
                }
            }
            "l" => {
                if let Some(n) = self.numbers(at, op) {
                    let p = Point::new(n[0], n[1]);
                    self.segment_to(at, operator, p, |path| path.line_to(p));
                }
            }
            "c" => {
                if let Some(n) = self.numbers(at, op) {
                    let (p1, p2, p3) = (Point::new(n[0], n[1]), Point::new(n[2], n[3]), Point::new(n[4], n[5]));
                    self.segment_to(at, operator, p3, |path| path.curve_to(p1, p2, p3));
                }
            }
            "v" => {
                if let Some(n) = self.numbers(at, op) {
                    let (p2, p3) = (Point::new(n[0], n[1]), Point::new(n[2], n[3]));
                    let p1 = self.current.unwrap_or(p2);
                    self.segment_to(at, operator, p3, |path| path.curve_to(p1, p2, p3));
                }
            }
            "y" => {
                if let Some(n) = self.numbers(at, op) {
                    let (p1, p3) = (Point::new(n[0], n[1]), Point::new(n[2], n[3]));
                    self.segment_to(at, operator, p3, |path| path.curve_to(p1, p3, p3));
                }
            }
            "h" => {
                if self.current.is_some() {
                    self.path.close_path();
                }
            }
            "re" => {
                if let Some(n) = self.numbers(at, op) {
                    let rect = Rect::new(n[0], n[1], n[0] + n[2], n[1] + n[3]);
                    self.rect_only = self.path.is_empty().then(|| rect.abs());
                    self.path.move_to((rect.x0, rect.y0));
                    self.path.line_to((rect.x1, rect.y0));
                    self.path.line_to((rect.x1, rect.y1));
                    self.path.line_to((rect.x0, rect.y1));
                    self.path.close_path();
                    self.current = Some(Point::new(rect.x0, rect.y0));
                }
            }

            // Path painting
            "f" | "F" => self.paint(at, true, false, false, false),
            "f*" => self.paint(at, true, false, false, true),
            "S" => self.paint(at, false, true, false, false),
            "s" => self.paint(at, false, true, true, false),
            "B" => self.paint(at, true, true, false, false),
            "B*" => self.paint(at, true, true, false, true),
            "b" => self.paint(at, true, true, true, false),
            "b*" => self.paint(at, true, true, true, true),
            "n" => self.paint(at, false, false, false, false),
            "W" | "W*" => self.clip = true,

            // Text objects
            "BT" => {
                if self.text.is_some() {
                    self.diagnostics.push(Some(at), "`BT` inside a text object");
                    self.end_line();
                }
                self.text = Some(TextObject::new());
            }
            "ET" => {
                if self.text.is_none() {
                    self.diagnostics.push(Some(at), "`ET` without `BT`");
                }
                self.end_line();
                self.text = None;
            }

            // Text state
            "Tf" => match (op.operands[0].as_name(), op.operands[1].as_number()) {
                (Some(name), Some(size)) => self.state.font = Some(font_from_name(name, size)),
                _ => self.diagnostics.push(Some(at), "`Tf` expects a font name and size"),
            },
            "Tc" => {
                if let Some(n) = self.numbers(at, op) {
                    self.state.char_spacing = n[0];
                }
            }
            "Tw" => {
                if let Some(n) = self.numbers(at, op) {
                    if n[0] != 0.0 {
                        self.diagnostics.push(Some(at), "word spacing not supported");
                    }
                }
            }
            "Tz" => {
                if let Some(n) = self.numbers(at, op) {
                    if n[0] != 100.0 {
                        self.diagnostics
                            .push(Some(at), format!("horizontal text scaling {}% ignored", n[0]));
                    }
                }
            }
            "TL" => {
                if let Some(n) = self.numbers(at, op) {
                    self.state.leading = n[0];
                }
            }
            "Ts" => {
                if let Some(n) = self.numbers(at, op) {
                    if n[0] != 0.0 {
                        self.diagnostics.push(Some(at), "text rise ignored");
                    }
                }
            }
            "Tr" => {
                if let Some(n) = self.numbers(at, op) {
                    let mode = n[0].clamp(0.0, 7.0) as u8;
                    self.state.render_mode = mode;
                    if !matches!(mode, 0 | 3) {
                        self.diagnostics
                            .push(Some(at), format!("text render mode {} approximated as fill", mode));
                    }
                }
            }

            // Text positioning
            "Td" | "TD" => {
                if let Some(n) = self.numbers(at, op) {
                    if operator == "TD" {
                        self.state.leading = -n[1];
                    }
                    self.next_line(at, operator, n[0], n[1]);
                }
            }
            "T*" => {
                let leading = self.state.leading;
                self.next_line(at, operator, 0.0, -leading);
            }
            "Tm" => {
                if let Some(m) = self.numbers(at, op) {
                    self.end_line();
                    match self.text.as_mut() {
                        Some(text) => {
                            text.line_matrix = matrix(&m);
                            text.matrix = text.line_matrix;
                        }
                        None => self.outside_text(at, operator),
                    }
                }
            }

            // Text showing
            "Tj" => match op.operands[0].as_str() {
                Some(text) => self.show(at, operator, text),
                None => self.diagnostics.push(Some(at), "`Tj` expects a string"),
            },
            "'" => match op.operands[0].as_str() {
                Some(text) => {
                    let leading = self.state.leading;
                    self.next_line(at, operator, 0.0, -leading);
                    self.show(at, operator, text);
                }
                None => self.diagnostics.push(Some(at), "`'` expects a string"),
            },
            "\"" => match (
                op.operands[0].as_number(),
                op.operands[1].as_number(),
                op.operands[2].as_str(),
            ) {
                (Some(aw), Some(ac), Some(text)) => {
                    if aw != 0.0 {
                        self.diagnostics.push(Some(at), "word spacing not supported");
                    }
                    self.state.char_spacing = ac;
                    let leading = self.state.leading;
                    self.next_line(at, operator, 0.0, -leading);
                    self.show(at, operator, text);
                }
                _ => self
                    .diagnostics
                    .push(Some(at), "`\"` expects two numbers and a string"),
            },
            "TJ" => match &op.operands[0] {
                Operand::Array(items) => {
                    let text = join_tj(items);
                    self.show(at, operator, &text);
                }
                _ => self.diagnostics.push(Some(at), "`TJ` expects an array"),
            },

            // XObjects
            "Do" => match op.operands[0].as_name() {
                Some(name) => {
                    let transform = self.flip
                        * self.state.ctm
                        * Affine::translate((0.0, 1.0))
                        * Affine::scale_non_uniform(1.0, -1.0);
                    let kind = NodeKind::Image {
                        src: name.to_string(),
                        size: Size::new(1.0, 1.0),
                    };
                    self.nodes.push(
                        NodeTree::new(kind)
                            .named(name)
                            .with_transform(transform)
                            .with_origin(at),
                    );
                }
                None => self.diagnostics.push(Some(at), "`Do` expects an XObject name"),
            },

            // Marked content and compatibility sections carry no geometry
            "BMC" | "BDC" | "EMC" | "MP" | "DP" | "BX" | "EX" | "EI" => {}

            other => match unsupported(other) {
                Some(what) => self
                    .diagnostics
                    .push(Some(at), format!("`{}` ({}) not supported", other, what)),
                None => self
                    .diagnostics
                    .push(Some(at), format!("unknown operator `{}`", other)),
            },
        }
    }

    fn numbers(&mut self, at: &str, op: &Operation) -> Option<Vec<f64>> {
        let numbers = op.numbers();
        if numbers.is_none() {
            self.diagnostics
                .push(Some(at), format!("`{}` expects numeric operands", op.operator));
        }
        numbers
    }

    /// Gray, RGB or CMYK by operand count; a trailing name selects a pattern
    fn device_color(&mut self, at: &str, op: &Operation) -> Option<Color> {
        if let Some(Operand::Name(pattern)) = op.operands.last() {
            self.diagnostics
                .push(Some(at), format!("pattern colour `/{}` not supported", pattern));
            return None;
        }
        let n = self.numbers(at, op)?;
        let c = |i: usize| n[i] as f32;
        match n.len() {
            1 => Some(Color::gray(c(0))),
            3 => Some(Color::rgb(c(0), c(1), c(2))),
            4 => Some(Color::cmyk(c(0), c(1), c(2), c(3))),
            count => {
                self.diagnostics.push(
                    Some(at),
                    format!("`{}` with {} components not supported", op.operator, count),
                );
                None
            }
        }
    }

    fn segment_to(&mut self, at: &str, operator: &str, end: Point, draw: impl FnOnce(&mut BezPath)) {
        if self.current.is_none() {
            self.diagnostics
                .push(Some(at), format!("`{}` without a current point", operator));
            self.path.move_to(end);
        } else {
            draw(&mut self.path);
        }
        self.current = Some(end);
        self.rect_only = None;
    }

    fn paint(&mut self, at: &str, fill: bool, stroke: bool, close: bool, even_odd: bool) {
        if close && self.current.is_some() {
            self.path.close_path();
        }
        let path = std::mem::take(&mut self.path);
        let rect = self.rect_only.take();
        self.current = None;

        if std::mem::take(&mut self.clip) {
            self.diagnostics.push(Some(at), "clipping path ignored");
        }
        if path.is_empty() || !(fill || stroke) {
            return;
        }
        if even_odd && fill {
            self.diagnostics
                .push(Some(at), "even-odd fill rule approximated as nonzero");
        }

        let mut style = Style::default();
        if fill {
            style.fills.push(Paint::solid(self.state.fill));
        }
        if stroke {
            style.strokes.push(Paint::solid(self.state.stroke));
            style.stroke_width = self.state.line_width;
        }

        let base = self.flip * self.state.ctm;
        let tree = match rect {
            Some(rect) => NodeTree::new(NodeKind::rectangle(rect.width(), rect.height()))
                .named("Rectangle")
                .with_transform(
                    base * Affine::translate((rect.x0, rect.y1)) * Affine::scale_non_uniform(1.0, -1.0),
                ),
            None => NodeTree::new(NodeKind::path(path))
                .named("Path")
                .with_transform(base),
        };
        self.nodes.push(tree.with_style(style).with_origin(at));
    }

    fn outside_text(&mut self, at: &str, operator: &str) {
        self.diagnostics
            .push(Some(at), format!("`{}` outside a text object", operator));
    }

    fn next_line(&mut self, at: &str, operator: &str, tx: f64, ty: f64) {
        self.end_line();
        match self.text.as_mut() {
            Some(text) => {
                text.line_matrix = text.line_matrix * Affine::translate((tx, ty));
                text.matrix = text.line_matrix;
            }
            None => self.outside_text(at, operator),
        }
    }

    fn show(&mut self, at: &str, operator: &str, text: &str) {
        if self.text.is_none() {
            self.outside_text(at, operator);
            return;
        }
        let font = match self.state.font.clone() {
            Some(font) => font,
            None => {
                self.diagnostics.push(
                    Some(at),
                    format!(
                        "text shown before `Tf`, using {} {}",
                        DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE
                    ),
                );
                let font = FontRef::new(DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE);
                self.state.font = Some(font.clone());
                font
            }
        };
        let color = match self.state.render_mode {
            1 | 5 => self.state.stroke,
            _ => self.state.fill,
        };
        let visible = self.state.render_mode != 3;
        let char_spacing = self.state.char_spacing;
        let base = self.flip * self.state.ctm;

        let Some(object) = self.text.as_mut() else {
            return;
        };
        let text_matrix = object.matrix;
        let line = object.line.get_or_insert_with(|| TextLine {
            transform: base
                * text_matrix
                * Affine::scale_non_uniform(1.0, -1.0)
                * Affine::translate((0.0, -font.size)),
            runs: Vec::new(),
            origin: at.to_string(),
            visible,
        });

        let fill = Some(Paint::solid(color));
        match line.runs.last_mut() {
            Some(run) if run.font == font && run.fill == fill && run.letter_spacing == char_spacing => {
                run.text.push_str(text);
            }
            _ => {
                let mut run = TextRun::new(text, font);
                run.fill = fill;
                run.letter_spacing = char_spacing;
                line.runs.push(run);
            }
        }
    }

    fn end_line(&mut self) {
        let Some(line) = self.text.as_mut().and_then(|text| text.line.take()) else {
            return;
        };
        let name: String = line.runs.iter().map(|r| r.text.as_str()).collect::<String>();
        let mut tree = NodeTree::new(NodeKind::Text {
            runs: line.runs,
            width: None,
        })
        .named(name.trim().chars().take(32).collect::<String>())
        .with_transform(line.transform)
        .with_origin(line.origin);
        tree.active = line.visible;
        self.nodes.push(tree);
    }
}

/// Fixed operand counts; `None` for variadic or unknown operators
fn arity(operator: &str) -> Option<usize> {
    match operator {
        "q" | "Q" | "h" | "f" | "F" | "f*" | "S" | "s" | "B" | "B*" | "b" | "b*" | "n" | "W"
        | "W*" | "BT" | "ET" | "T*" => Some(0),
        "w" | "g" | "G" | "cs" | "CS" | "TL" | "Tc" | "Tw" | "Tz" | "Tr" | "Ts" | "Tj" | "'"
        | "TJ" | "Do" => Some(1),
        "m" | "l" | "Td" | "TD" | "Tf" => Some(2),
        "rg" | "RG" | "\"" => Some(3),
        "v" | "y" | "re" | "k" | "K" => Some(4),
        "c" | "cm" | "Tm" => Some(6),
        _ => None,
    }
}

/// Known operators this importer cannot represent
fn unsupported(operator: &str) -> Option<&'static str> {
    Some(match operator {
        "d" => "dash pattern",
        "J" => "line cap",
        "j" => "line join",
        "M" => "miter limit",
        "ri" => "rendering intent",
        "i" => "flatness",
        "gs" => "extended graphics state",
        "sh" => "shading",
        "BI" => "inline image",
        "d0" | "d1" => "Type 3 glyph metrics",
        _ => return None,
    })
}

/// `[a b c d e f]` in PDF order
fn matrix(m: &[f64]) -> Affine {
    Affine::new([m[0], m[1], m[2], m[3], m[4], m[5]])
}

fn join_tj(items: &[Operand]) -> String {
    let mut text = String::new();
    for item in items {
        match item {
            Operand::Str(s) => text.push_str(s),
            Operand::Number(adjust) if *adjust <= WORD_GAP => {
                if !text.is_empty() && !text.ends_with(' ') {
                    text.push(' ');
                }
            }
            _ => {}
        }
    }
    text
}

/// Best guess at family, weight and style from a font resource or base font
/// name such as `ABCDEF+Helvetica-BoldOblique`
fn font_from_name(name: &str, size: f64) -> FontRef {
    let base = match name.split_once('+') {
        Some((prefix, rest)) if prefix.len() == 6 && prefix.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => name,
    };
    let family = base.split(['-', ',']).next().unwrap_or(base);
    let style = base.to_ascii_lowercase();

    let mut font = FontRef::new(family, size);
    font.weight = if style.contains("black") || style.contains("heavy") {
        900
    } else if style.contains("extrabold") || style.contains("ultrabold") {
        800
    } else if style.contains("semibold") || style.contains("demi") {
        600
    } else if style.contains("bold") {
        700
    } else if style.contains("medium") {
        500
    } else if style.contains("light") {
        300
    } else if style.contains("thin") {
        100
    } else {
        400
    };
    font.italic = style.contains("italic") || style.contains("oblique");
    font
}
