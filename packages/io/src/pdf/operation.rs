//! Content stream operations: an operator with the operands that precede it

use super::lexer::{tokenize, Token};
use crate::{ImportError, ImportResult};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(f64),
    Name(String),
    Str(String),
    Bool(bool),
    Null,
    Array(Vec<Operand>),
    Dict(Vec<(String, Operand)>),
}

impl Operand {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Operand::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Operand::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Operand::Str(s) => Some(s),
            _ => None,
        }
    }

    /// JSON form: numbers, `"/Name"` for names, other strings, arrays, objects
    fn from_json(value: &Value) -> ImportResult<Operand> {
        Ok(match value {
            Value::Null => Operand::Null,
            Value::Bool(b) => Operand::Bool(*b),
            Value::Number(n) => Operand::Number(
                n.as_f64()
                    .ok_or_else(|| ImportError::Malformed(format!("operand {} out of range", n)))?,
            ),
            Value::String(s) => match s.strip_prefix('/') {
                Some(name) => Operand::Name(name.to_string()),
                None => Operand::Str(s.clone()),
            },
            Value::Array(items) => Operand::Array(
                items.iter().map(Operand::from_json).collect::<ImportResult<_>>()?,
            ),
            Value::Object(map) => Operand::Dict(
                map.iter()
                    .map(|(k, v)| -> ImportResult<(String, Operand)> {
                        Ok((k.trim_start_matches('/').to_string(), Operand::from_json(v)?))
                    })
                    .collect::<ImportResult<_>>()?,
            ),
        })
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Number(n) => write!(f, "{}", n),
            Operand::Name(n) => write!(f, "/{}", n),
            Operand::Str(s) => write!(f, "({})", s),
            Operand::Bool(b) => write!(f, "{}", b),
            Operand::Null => write!(f, "null"),
            Operand::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Operand::Dict(entries) => {
                write!(f, "<<")?;
                for (key, value) in entries {
                    write!(f, " /{} {}", key, value)?;
                }
                write!(f, " >>")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub operator: String,
    pub operands: Vec<Operand>,
}

impl Operation {
    pub fn new(operator: impl Into<String>, operands: Vec<Operand>) -> Self {
        Self {
            operator: operator.into(),
            operands,
        }
    }

    /// All operands as numbers, or `None` if any is not one
    pub fn numbers(&self) -> Option<Vec<f64>> {
        self.operands.iter().map(Operand::as_number).collect()
    }
}

/// A parsed content stream with the page box it draws into
#[derive(Debug, Clone, PartialEq)]
pub struct ContentStream {
    /// `[llx, lly, urx, ury]` when the input carried one
    pub media_box: Option<[f64; 4]>,
    pub operations: Vec<Operation>,
}

#[derive(Deserialize)]
struct JsonOperation {
    op: String,
    #[serde(default)]
    args: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonStream {
    media_box: Option<[f64; 4]>,
    operations: Vec<JsonOperation>,
}

/// Raw content stream syntax, or its JSON token-list form
pub fn parse(bytes: &[u8]) -> ImportResult<ContentStream> {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim_start();

    if trimmed.starts_with("%PDF-") {
        return Err(ImportError::Malformed(
            "expected a content stream, found a whole PDF file".into(),
        ));
    }
    if trimmed.starts_with('{') {
        let stream: JsonStream = serde_json::from_str(trimmed)?;
        return from_json(stream.media_box, stream.operations);
    }
    // `[` opens both a JSON list and a content-stream array such as a dash pattern
    if trimmed.starts_with('[') {
        if let Ok(operations) = serde_json::from_str::<Vec<JsonOperation>>(trimmed) {
            return from_json(None, operations);
        }
    }

    Ok(ContentStream {
        media_box: None,
        operations: parse_tokens(&text)?,
    })
}

fn from_json(media_box: Option<[f64; 4]>, ops: Vec<JsonOperation>) -> ImportResult<ContentStream> {
    let operations = ops
        .into_iter()
        .map(|op| -> ImportResult<Operation> {
            let operands = op.args.iter().map(Operand::from_json).collect::<ImportResult<_>>()?;
            Ok(Operation::new(op.op, operands))
        })
        .collect::<ImportResult<_>>()?;
    Ok(ContentStream {
        media_box,
        operations,
    })
}

enum Frame {
    Array(Vec<Operand>),
    Dict(Vec<Operand>),
}

fn parse_tokens(source: &str) -> ImportResult<Vec<Operation>> {
    let mut operations = Vec::new();
    let mut operands: Vec<Operand> = Vec::new();
    let mut frames: Vec<Frame> = Vec::new();

    for (token, span) in tokenize(source)? {
        let operand = match token {
            Token::Number(n) => Operand::Number(n),
            Token::Name(n) => Operand::Name(n.to_string()),
            Token::LiteralString(s) | Token::HexString(s) => Operand::Str(s),
            Token::Bool(b) => Operand::Bool(b),
            Token::Null => Operand::Null,
            Token::ArrayStart => {
                frames.push(Frame::Array(Vec::new()));
                continue;
            }
            Token::DictStart => {
                frames.push(Frame::Dict(Vec::new()));
                continue;
            }
            Token::ArrayEnd => match frames.pop() {
                Some(Frame::Array(items)) => Operand::Array(items),
                _ => return Err(unbalanced(span, "]")),
            },
            Token::DictEnd => match frames.pop() {
                Some(Frame::Dict(items)) => Operand::Dict(pair_up(items)),
                _ => return Err(unbalanced(span, ">>")),
            },
            // Inline image parameters belong to the image, not the next operator
            Token::InlineData => {
                operations.push(Operation::new("EI", std::mem::take(&mut operands)));
                continue;
            }
            Token::Operator(op) => {
                if !frames.is_empty() {
                    return Err(unbalanced(span, op));
                }
                operations.push(Operation::new(op, std::mem::take(&mut operands)));
                continue;
            }
        };

        match frames.last_mut() {
            Some(Frame::Array(items)) | Some(Frame::Dict(items)) => items.push(operand),
            None => operands.push(operand),
        }
    }

    if !frames.is_empty() {
        return Err(ImportError::Malformed("unclosed array or dictionary".into()));
    }
    if !operands.is_empty() {
        tracing::debug!(count = operands.len(), "ignoring trailing operands");
    }
    Ok(operations)
}

fn pair_up(items: Vec<Operand>) -> Vec<(String, Operand)> {
    let mut entries = Vec::new();
    let mut iter = items.into_iter();
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        if let Operand::Name(key) = key {
            entries.push((key, value));
        }
    }
    entries
}

fn unbalanced(span: std::ops::Range<usize>, found: &str) -> ImportError {
    ImportError::Lexer {
        span,
        message: format!("unbalanced `{}`", found),
    }
}
