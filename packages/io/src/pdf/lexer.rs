use crate::{ImportError, ImportResult};
use logos::{Lexer, Logos};
use std::fmt;

/// Tokens of a PDF content stream
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\f\x00]+")]
#[logos(skip r"%[^\r\n]*")]
pub enum Token<'src> {
    #[token("true", |_| true)]
    #[token("false", |_| false)]
    Bool(bool),

    #[token("null")]
    Null,

    #[regex(r"[+-]?([0-9]+\.?[0-9]*|\.[0-9]+)", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r"/[^ \t\n\r\f\x00/\[\]()<>{}%]*", |lex| &lex.slice()[1..])]
    Name(&'src str),

    #[token("(", literal_string)]
    LiteralString(String),

    #[regex(r"<[0-9A-Fa-f \t\n\r\f]*>", hex_string)]
    HexString(String),

    #[token("[")]
    ArrayStart,

    #[token("]")]
    ArrayEnd,

    #[token("<<")]
    DictStart,

    #[token(">>")]
    DictEnd,

    /// `ID` and the raw bytes of an inline image up to `EI`
    #[regex(r"ID[ \t\n\r\f]", inline_data)]
    InlineData,

    #[regex(r#"[A-Za-z'"][A-Za-z0-9*'"]*"#, |lex| lex.slice())]
    Operator(&'src str),
}

/// Reads a balanced `( ... )` string starting after the opening paren
fn literal_string<'src>(lex: &mut Lexer<'src, Token<'src>>) -> Option<String> {
    let mut out = String::new();
    let mut depth = 1usize;
    let mut chars = lex.remainder().char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        match ch {
            '(' => {
                depth += 1;
                out.push(ch);
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    lex.bump(i + 1);
                    return Some(out);
                }
                out.push(ch);
            }
            '\\' => {
                let (_, escaped) = chars.next()?;
                match escaped {
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'b' => out.push('\u{8}'),
                    'f' => out.push('\u{c}'),
                    '\r' => {
                        if chars.peek().map(|(_, c)| *c) == Some('\n') {
                            chars.next();
                        }
                    }
                    '\n' => {}
                    '0'..='7' => {
                        let mut code = escaped.to_digit(8)?;
                        for _ in 0..2 {
                            match chars.peek().and_then(|(_, c)| c.to_digit(8)) {
                                Some(digit) => {
                                    code = code * 8 + digit;
                                    chars.next();
                                }
                                None => break,
                            }
                        }
                        out.push(char::from_u32(code & 0xff)?);
                    }
                    other => out.push(other),
                }
            }
            _ => out.push(ch),
        }
    }
    // Unterminated
    None
}

/// Decodes `<48656C6C6F>`; a trailing odd digit is padded with 0
fn hex_string<'src>(lex: &mut Lexer<'src, Token<'src>>) -> Option<String> {
    let slice = lex.slice();
    let digits: Vec<u32> = slice[1..slice.len() - 1]
        .chars()
        .filter_map(|c| c.to_digit(16))
        .collect();
    let text = digits
        .chunks(2)
        .filter_map(|pair| {
            let byte = pair[0] * 16 + pair.get(1).copied().unwrap_or(0);
            char::from_u32(byte)
        })
        .collect();
    Some(text)
}

/// Skips inline image bytes through the closing `EI`
fn inline_data<'src>(lex: &mut Lexer<'src, Token<'src>>) -> bool {
    let rest = lex.remainder();
    let bytes = rest.as_bytes();
    let mut from = 0;
    while let Some(pos) = rest[from..].find("EI") {
        let at = from + pos;
        let before = at == 0 || bytes[at - 1].is_ascii_whitespace();
        let after = bytes.get(at + 2).map_or(true, |b| b.is_ascii_whitespace());
        if before && after {
            lex.bump(at + 2);
            return true;
        }
        from = at + 2;
    }
    false
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Bool(b) => write!(f, "{}", b),
            Token::Null => write!(f, "null"),
            Token::Number(n) => write!(f, "{}", n),
            Token::Name(n) => write!(f, "/{}", n),
            Token::LiteralString(s) => write!(f, "({})", s),
            Token::HexString(s) => write!(f, "<{}>", s),
            Token::ArrayStart => write!(f, "["),
            Token::ArrayEnd => write!(f, "]"),
            Token::DictStart => write!(f, "<<"),
            Token::DictEnd => write!(f, ">>"),
            Token::InlineData => write!(f, "ID ... EI"),
            Token::Operator(op) => write!(f, "{}", op),
        }
    }
}

/// Tokenize a content stream. The first unreadable byte is an error.
pub fn tokenize(source: &str) -> ImportResult<Vec<(Token<'_>, std::ops::Range<usize>)>> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                let snippet: String = source[span.start..].chars().take(16).collect();
                return Err(ImportError::Lexer {
                    span,
                    message: format!("unexpected input near `{}`", snippet),
                });
            }
        }
    }

    Ok(tokens)
}
