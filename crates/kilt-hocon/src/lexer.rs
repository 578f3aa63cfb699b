//! Tokenizer for the configuration language

use crate::error::{HoconError, HoconResult};

/// Token kinds produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Equals,
    PlusEquals,
    Comma,
    Newline,
    Whitespace(String),
    Quoted(String),
    Unquoted(String),
    Substitution { path: String, optional: bool },
    Eof,
}

/// Token with its source position (1-based)
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) line: usize,
    pub(crate) column: usize,
}

/// Characters that may not appear in an unquoted string
const FORBIDDEN: &[char] = &[
    '$', '"', '{', '}', '[', ']', ':', '=', ',', '+', '#', '`', '^', '?', '!', '@', '*', '&',
    '\\',
];

struct Lexer<'a> {
    source_name: &'a str,
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

/// Split configuration text into tokens, ending with [`TokenKind::Eof`]
pub(crate) fn tokenize(source_name: &str, text: &str) -> HoconResult<Vec<Token>> {
    let mut lexer = Lexer {
        source_name,
        chars: text.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
    };

    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

impl Lexer<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> HoconError {
        HoconError::syntax(self.source_name, line, column, message)
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn next_token(&mut self) -> HoconResult<Token> {
        loop {
            match self.peek() {
                Some('#') => self.skip_comment(),
                Some('/') if self.peek_at(1) == Some('/') => self.skip_comment(),
                _ => break,
            }
        }

        let (line, column) = (self.line, self.column);
        let token = |kind| Token { kind, line, column };

        let Some(c) = self.peek() else {
            return Ok(token(TokenKind::Eof));
        };

        let kind = match c {
            '\n' => {
                self.bump();
                TokenKind::Newline
            }
            c if c.is_whitespace() => {
                let mut ws = String::new();
                while let Some(w) = self.peek() {
                    if w == '\n' || !w.is_whitespace() {
                        break;
                    }
                    ws.push(w);
                    self.bump();
                }
                TokenKind::Whitespace(ws)
            }
            '{' | '}' | '[' | ']' | ':' | '=' | ',' => {
                self.bump();
                match c {
                    '{' => TokenKind::LBrace,
                    '}' => TokenKind::RBrace,
                    '[' => TokenKind::LBracket,
                    ']' => TokenKind::RBracket,
                    ':' => TokenKind::Colon,
                    '=' => TokenKind::Equals,
                    _ => TokenKind::Comma,
                }
            }
            '+' if self.peek_at(1) == Some('=') => {
                self.bump();
                self.bump();
                TokenKind::PlusEquals
            }
            '"' => self.quoted(line, column)?,
            '$' if self.peek_at(1) == Some('{') => self.substitution(line, column)?,
            c if FORBIDDEN.contains(&c) => {
                return Err(self.error(line, column, format!("unexpected character '{c}'")));
            }
            _ => {
                let mut text = String::new();
                while let Some(u) = self.peek() {
                    if u.is_whitespace() || FORBIDDEN.contains(&u) {
                        break;
                    }
                    if u == '/' && self.peek_at(1) == Some('/') {
                        break;
                    }
                    text.push(u);
                    self.bump();
                }
                TokenKind::Unquoted(text)
            }
        };

        Ok(token(kind))
    }

    fn quoted(&mut self, line: usize, column: usize) -> HoconResult<TokenKind> {
        if self.peek_at(1) == Some('"') && self.peek_at(2) == Some('"') {
            return self.triple_quoted(line, column);
        }

        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(self.error(line, column, "unterminated quoted string"));
                }
                Some('"') => return Ok(TokenKind::Quoted(text)),
                Some('\\') => {
                    let escaped = self.escape(line, column)?;
                    text.push(escaped);
                }
                Some(c) => text.push(c),
            }
        }
    }

    fn triple_quoted(&mut self, line: usize, column: usize) -> HoconResult<TokenKind> {
        for _ in 0..3 {
            self.bump();
        }
        let mut text = String::new();
        loop {
            if self.peek() == Some('"') && self.peek_at(1) == Some('"') && self.peek_at(2) == Some('"')
            {
                // Quotes beyond the closing three belong to the string
                while self.peek_at(3) == Some('"') {
                    text.push('"');
                    self.bump();
                }
                for _ in 0..3 {
                    self.bump();
                }
                return Ok(TokenKind::Quoted(text));
            }
            match self.bump() {
                Some(c) => text.push(c),
                None => return Err(self.error(line, column, "unterminated triple-quoted string")),
            }
        }
    }

    fn escape(&mut self, line: usize, column: usize) -> HoconResult<char> {
        let c = match self.bump() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('b') => '\u{8}',
            Some('f') => '\u{c}',
            Some('/') => '/',
            Some('\\') => '\\',
            Some('"') => '"',
            Some('u') => {
                let high = self.hex4(line, column)?;
                if (0xD800..0xDC00).contains(&high)
                    && self.peek() == Some('\\')
                    && self.peek_at(1) == Some('u')
                {
                    self.bump();
                    self.bump();
                    let low = self.hex4(line, column)?;
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err(self.error(line, column, "invalid surrogate pair"));
                    }
                    let combined = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                    char::from_u32(combined)
                        .ok_or_else(|| self.error(line, column, "invalid surrogate pair"))?
                } else {
                    char::from_u32(high)
                        .ok_or_else(|| self.error(line, column, "invalid unicode escape"))?
                }
            }
            Some(other) => {
                return Err(self.error(line, column, format!("invalid escape '\\{other}'")));
            }
            None => return Err(self.error(line, column, "unterminated quoted string")),
        };
        Ok(c)
    }

    fn hex4(&mut self, line: usize, column: usize) -> HoconResult<u32> {
        let mut value = 0u32;
        for _ in 0..4 {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error(line, column, "invalid unicode escape"))?;
            value = value * 16 + digit;
        }
        Ok(value)
    }

    fn substitution(&mut self, line: usize, column: usize) -> HoconResult<TokenKind> {
        self.bump();
        self.bump();
        let optional = if self.peek() == Some('?') {
            self.bump();
            true
        } else {
            false
        };

        let mut path = String::new();
        let mut in_quotes = false;
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(self.error(line, column, "unterminated substitution"));
                }
                Some('}') if !in_quotes => break,
                Some('"') => {
                    in_quotes = !in_quotes;
                    path.push('"');
                }
                Some(c) => path.push(c),
            }
        }

        if path.trim().is_empty() {
            return Err(self.error(line, column, "empty substitution"));
        }

        Ok(TokenKind::Substitution {
            path: path.trim().to_string(),
            optional,
        })
    }
}
