//! Lexer for the Veld language.
//!
//! Produces a flat token stream with byte spans over UTF-8 source text.
//! Whitespace is skipped; comments are kept in the stream so downstream
//! consumers (semantic tokens, hover) can classify them. The lexer carries
//! no state between tokens, which makes any token boundary a valid restart
//! point for incremental re-lexing (see [`incremental`]).

mod incremental;
mod token;

pub use incremental::{relex, EditSpan};
pub use token::{Token, TokenKind};

use phf::phf_set;

/// Reserved words of the language.
pub static KEYWORDS: phf::Set<&'static str> = phf_set! {
    "func", "let", "const", "return", "if", "else", "while", "for", "in",
    "break", "continue", "struct", "enum", "trait", "impl", "import",
    "match", "true", "false",
};

/// Keywords that introduce a nominal type declaration.
pub static TYPE_KEYWORDS: phf::Set<&'static str> = phf_set! {
    "struct", "enum", "trait",
};

/// A hand-written scanner over a single buffer.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over the given source text.
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Create a lexer that resumes scanning at `offset`.
    ///
    /// `offset` must be a token boundary from a previous pass; scanning
    /// mid-token (for example inside a string literal) yields garbage.
    pub fn at_offset(input: &'a str, offset: usize) -> Self {
        Self { input, pos: offset.min(input.len()) }
    }

    /// Lex the entire input to a token vector.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tokens
    }

    fn bytes(&self) -> &[u8] {
        self.input.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes().get(self.pos + ahead).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if b == b' ' || b == b'\t' || b == b'\r' || b == b'\n' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Produce the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace();
        let start = self.pos;
        let b = self.peek()?;

        let kind = match b {
            b'/' if self.peek_at(1) == Some(b'/') => {
                while let Some(c) = self.peek() {
                    if c == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
                TokenKind::Comment
            }
            b'/' if self.peek_at(1) == Some(b'*') => {
                self.pos += 2;
                let mut closed = false;
                while self.pos < self.input.len() {
                    if self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/') {
                        self.pos += 2;
                        closed = true;
                        break;
                    }
                    self.pos += 1;
                }
                if closed {
                    TokenKind::Comment
                } else {
                    TokenKind::Error
                }
            }
            b'"' => self.scan_string(),
            b'\'' => self.scan_char(),
            b'0'..=b'9' => self.scan_number(),
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => {
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphanumeric() || c == b'_' {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                if KEYWORDS.contains(&self.input[start..self.pos]) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Identifier
                }
            }
            b'(' => self.single(TokenKind::LeftParen),
            b')' => self.single(TokenKind::RightParen),
            b'[' => self.single(TokenKind::LeftBracket),
            b']' => self.single(TokenKind::RightBracket),
            b'{' => self.single(TokenKind::LeftBrace),
            b'}' => self.single(TokenKind::RightBrace),
            b';' => self.single(TokenKind::Semicolon),
            b',' => self.single(TokenKind::Comma),
            b'.' => self.single(TokenKind::Dot),
            b':' => {
                if self.peek_at(1) == Some(b':') {
                    self.pos += 2;
                    TokenKind::ColonColon
                } else {
                    self.single(TokenKind::Colon)
                }
            }
            b'-' if self.peek_at(1) == Some(b'>') => {
                self.pos += 2;
                TokenKind::Arrow
            }
            b'=' | b'!' | b'<' | b'>' => {
                self.pos += 1;
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                }
                TokenKind::Operator
            }
            b'&' if self.peek_at(1) == Some(b'&') => {
                self.pos += 2;
                TokenKind::Operator
            }
            b'|' if self.peek_at(1) == Some(b'|') => {
                self.pos += 2;
                TokenKind::Operator
            }
            b'+' | b'-' | b'*' | b'/' | b'%' => self.single(TokenKind::Operator),
            _ => {
                // Skip one whole UTF-8 code point so spans stay on char
                // boundaries.
                let ch_len = self.input[self.pos..].chars().next().map_or(1, |c| c.len_utf8());
                self.pos += ch_len;
                TokenKind::Error
            }
        };

        Some(Token::new(kind, &self.input[start..self.pos], start, self.pos))
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.pos += 1;
        kind
    }

    fn scan_string(&mut self) -> TokenKind {
        self.pos += 1;
        while let Some(c) = self.peek() {
            match c {
                b'\\' => self.pos = (self.pos + 2).min(self.input.len()),
                b'"' => {
                    self.pos += 1;
                    return TokenKind::Str;
                }
                b'\n' => break,
                _ => self.pos += 1,
            }
        }
        // Unterminated string: the token runs to end of line.
        TokenKind::Error
    }

    fn scan_char(&mut self) -> TokenKind {
        self.pos += 1;
        let mut content = 0usize;
        while let Some(c) = self.peek() {
            match c {
                b'\\' => {
                    self.pos = (self.pos + 2).min(self.input.len());
                    content += 1;
                }
                b'\'' => {
                    self.pos += 1;
                    return if content == 0 { TokenKind::Error } else { TokenKind::Char };
                }
                b'\n' => break,
                _ => {
                    let ch_len = self.input[self.pos..].chars().next().map_or(1, |c| c.len_utf8());
                    self.pos += ch_len;
                    content += 1;
                }
            }
        }
        TokenKind::Error
    }

    fn scan_number(&mut self) -> TokenKind {
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x') | Some(b'X')) {
            self.pos += 2;
            while let Some(c) = self.peek() {
                if c.is_ascii_hexdigit() || c == b'_' {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            return TokenKind::Int;
        }

        let mut kind = TokenKind::Int;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        // A fractional part requires a digit after the dot, so `1.abs()`
        // stays an integer followed by `.`.
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() || c == b'_' {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            kind = TokenKind::Float;
        }
        kind
    }
}

/// Lex a full buffer. Convenience wrapper used by everything that does not
/// track incremental state.
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).tokenize()
}

/// Find the token covering `offset`, preferring a token that starts exactly
/// there when the offset sits on a boundary.
pub fn token_at_offset(tokens: &[Token], offset: usize) -> Option<&Token> {
    let idx = tokens.partition_point(|t| t.end <= offset);
    let tok = tokens.get(idx)?;
    if tok.contains(offset) {
        return Some(tok);
    }
    None
}

/// Find the identifier token covering `offset`, accepting a token that ends
/// exactly at the offset (cursor sitting just past the last character).
pub fn identifier_at_offset(tokens: &[Token], offset: usize) -> Option<&Token> {
    if let Some(tok) = token_at_offset(tokens, offset) {
        if tok.kind == TokenKind::Identifier {
            return Some(tok);
        }
    }
    let idx = tokens.partition_point(|t| t.end < offset);
    let tok = tokens.get(idx)?;
    if tok.kind == TokenKind::Identifier && tok.end == offset {
        return Some(tok);
    }
    None
}
