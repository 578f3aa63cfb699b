//! Recursive descent parser producing field lists
//!
//! The parser does not merge anything: it keeps every field in source
//! order so that later layers can be applied on top of earlier ones.

use crate::error::{HoconError, HoconResult};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::path::ConfigPath;

/// Unevaluated value expression
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Str(String),
    /// Whitespace between two concatenated values
    Space(String),
    Array(Vec<Expr>),
    Object(Vec<Field>),
    Subst {
        path: ConfigPath,
        optional: bool,
    },
    Concat(Vec<Expr>),
}

/// How a field combines with an earlier value at the same path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldOp {
    Assign,
    Append,
}

/// One `key: value` entry
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Field {
    pub(crate) path: ConfigPath,
    pub(crate) op: FieldOp,
    pub(crate) value: Expr,
}

/// Parsed configuration text
///
/// Holds the root object's fields in source order. Build a resolved
/// configuration out of one or more documents with
/// [`ConfigBuilder`](crate::ConfigBuilder).
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub(crate) source_name: String,
    pub(crate) fields: Vec<Field>,
}

impl Document {
    /// Parse configuration text
    ///
    /// `source_name` is only used in error messages.
    ///
    /// # Errors
    /// Returns [`HoconError::Syntax`] if the text is malformed
    pub fn parse(source_name: &str, text: &str) -> HoconResult<Self> {
        let tokens = tokenize(source_name, text)?;
        let mut parser = Parser {
            source_name,
            tokens,
            pos: 0,
        };
        let fields = parser.parse_root()?;
        Ok(Self {
            source_name: source_name.to_string(),
            fields,
        })
    }

    /// Name given when the document was parsed
    #[inline]
    #[must_use]
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Number of top-level fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the document declares no fields
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

struct Parser<'a> {
    source_name: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek_token(&self) -> &Token {
        // tokenize always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &TokenKind {
        &self.peek_token().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek_token().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> HoconError {
        HoconError::syntax(self.source_name, token.line, token.column, message)
    }

    fn error_here(&self, message: impl Into<String>) -> HoconError {
        self.error_at(self.peek_token(), message)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), TokenKind::Whitespace(_)) {
            self.advance();
        }
    }

    fn skip_blank(&mut self) {
        while matches!(self.peek(), TokenKind::Whitespace(_) | TokenKind::Newline) {
            self.advance();
        }
    }

    fn parse_root(&mut self) -> HoconResult<Vec<Field>> {
        self.skip_blank();
        let fields = if matches!(self.peek(), TokenKind::LBrace) {
            self.advance();
            self.parse_fields(true)?
        } else {
            self.parse_fields(false)?
        };
        self.skip_blank();
        if !matches!(self.peek(), TokenKind::Eof) {
            return Err(self.error_here("unexpected content after root object"));
        }
        Ok(fields)
    }

    fn parse_fields(&mut self, braced: bool) -> HoconResult<Vec<Field>> {
        let mut fields = Vec::new();
        loop {
            self.skip_blank();
            match self.peek() {
                TokenKind::RBrace if braced => {
                    self.advance();
                    return Ok(fields);
                }
                TokenKind::Eof if braced => return Err(self.error_here("expected '}'")),
                TokenKind::Eof => return Ok(fields),
                _ => {}
            }

            fields.push(self.parse_field()?);

            self.skip_whitespace();
            match self.peek() {
                TokenKind::Comma | TokenKind::Newline => {
                    self.advance();
                }
                TokenKind::RBrace if braced => {}
                TokenKind::Eof => {}
                _ => return Err(self.error_here("expected ',' or newline after field")),
            }
        }
    }

    fn parse_field(&mut self) -> HoconResult<Field> {
        let path = self.parse_key()?;
        self.skip_whitespace();
        let op = match self.peek() {
            TokenKind::Colon | TokenKind::Equals => {
                self.advance();
                FieldOp::Assign
            }
            TokenKind::PlusEquals => {
                self.advance();
                FieldOp::Append
            }
            TokenKind::LBrace => FieldOp::Assign,
            _ => return Err(self.error_here("expected ':', '=', '+=' or '{' after key")),
        };
        self.skip_whitespace();
        let value = self.parse_value()?;
        Ok(Field { path, op, value })
    }

    fn parse_key(&mut self) -> HoconResult<ConfigPath> {
        let start = self.peek_token().clone();
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut has_content = false;
        let mut consumed = 0usize;

        loop {
            match self.peek().clone() {
                TokenKind::Quoted(text) => {
                    current.push_str(&text);
                    has_content = true;
                }
                TokenKind::Unquoted(text) => {
                    for (i, part) in text.split('.').enumerate() {
                        if i > 0 {
                            if !has_content {
                                return Err(self.error_at(&start, "key has an empty segment"));
                            }
                            segments.push(std::mem::take(&mut current));
                            has_content = false;
                        }
                        if !part.is_empty() {
                            current.push_str(part);
                            has_content = true;
                        }
                    }
                }
                _ => break,
            }
            self.advance();
            consumed += 1;
        }

        if consumed == 0 {
            return Err(self.error_at(&start, "expected key"));
        }
        if !has_content {
            return Err(self.error_at(&start, "key has an empty segment"));
        }
        segments.push(current);
        Ok(ConfigPath::new(segments))
    }

    fn parse_value(&mut self) -> HoconResult<Expr> {
        let start = self.peek_token().clone();
        let mut pieces = Vec::new();

        loop {
            match self.peek().clone() {
                TokenKind::Whitespace(ws) => {
                    self.advance();
                    pieces.push(Expr::Space(ws));
                }
                TokenKind::Quoted(text) => {
                    self.advance();
                    pieces.push(Expr::Str(text));
                }
                TokenKind::Unquoted(text) => {
                    self.advance();
                    pieces.push(literal(&text));
                }
                TokenKind::Substitution { path, optional } => {
                    let token = self.advance();
                    let path = ConfigPath::parse(&path)
                        .map_err(|e| self.error_at(&token, e.to_string()))?;
                    pieces.push(Expr::Subst { path, optional });
                }
                TokenKind::LBracket => {
                    self.advance();
                    pieces.push(self.parse_array()?);
                }
                TokenKind::LBrace => {
                    self.advance();
                    pieces.push(Expr::Object(self.parse_fields(true)?));
                }
                _ => break,
            }
        }

        while matches!(pieces.last(), Some(Expr::Space(_))) {
            pieces.pop();
        }
        if matches!(pieces.first(), Some(Expr::Space(_))) {
            pieces.remove(0);
        }

        match pieces.len() {
            0 => Err(self.error_at(&start, "expected value")),
            1 => Ok(pieces.remove(0)),
            _ => Ok(Expr::Concat(pieces)),
        }
    }

    fn parse_array(&mut self) -> HoconResult<Expr> {
        let mut items = Vec::new();
        loop {
            self.skip_blank();
            match self.peek() {
                TokenKind::RBracket => {
                    self.advance();
                    return Ok(Expr::Array(items));
                }
                TokenKind::Eof => return Err(self.error_here("expected ']'")),
                _ => {}
            }

            items.push(self.parse_value()?);

            self.skip_whitespace();
            match self.peek() {
                TokenKind::Comma | TokenKind::Newline => {
                    self.advance();
                }
                TokenKind::RBracket => {}
                _ => return Err(self.error_here("expected ',' or ']' in array")),
            }
        }
    }
}

/// Interpret an unquoted token
fn literal(text: &str) -> Expr {
    match text {
        "true" => Expr::Bool(true),
        "false" => Expr::Bool(false),
        "null" => Expr::Null,
        _ => {
            let looks_numeric = text
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit() || c == '-');
            match text.parse::<serde_json::Number>() {
                Ok(number) if looks_numeric => Expr::Number(number),
                _ => Expr::Str(text.to_string()),
            }
        }
    }
}
