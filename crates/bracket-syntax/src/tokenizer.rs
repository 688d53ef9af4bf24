//! Lexical analysis.
//!
//! The tokenizer is pulled by the parser: nothing is scanned until someone
//! asks for it, and tokens that were peeked at stay in the lookahead buffer
//! until they are consumed. A lexical error is sticky: once scanning fails,
//! every later scan reports the same error.

use std::collections::VecDeque;
use std::iter::Peekable;
use std::str::CharIndices;
use std::sync::Arc;

use tracing::trace;

use crate::error::LexError;
use crate::token::{Location, Span, Token, TokenKind};

pub struct Tokenizer<'src> {
    chars: Peekable<CharIndices<'src>>,
    offset: usize,
    row: usize,
    column: usize,
    file: Option<Arc<str>>,
    pending: VecDeque<Token>,
    failed: Option<LexError>,
    reported: bool,
}

impl<'src> Tokenizer<'src> {
    pub fn new(source: &'src str) -> Self {
        Tokenizer {
            chars: source.char_indices().peekable(),
            offset: 0,
            row: 1,
            column: 1,
            file: None,
            pending: VecDeque::new(),
            failed: None,
            reported: false,
        }
    }

    /// Attach a file name to every location produced from now on.
    pub fn with_file(mut self, file: impl Into<Arc<str>>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Returns the `n`-th pending token (1-based) without consuming it.
    ///
    /// `Ok(None)` means the source ends before the `n`-th token.
    pub fn peek(&mut self, n: usize) -> Result<Option<&Token>, LexError> {
        assert!(n > 0, "peek is 1-based");
        while self.pending.len() < n {
            match self.scan()? {
                Some(token) => self.pending.push_back(token),
                None => return Ok(None),
            }
        }
        Ok(self.pending.get(n - 1))
    }

    /// Drops the front of the lookahead buffer.
    ///
    /// Only valid after a successful `peek`; calling it on an empty buffer is a bug.
    pub fn consume(&mut self) -> Token {
        match self.pending.pop_front() {
            Some(token) => token,
            None => panic!("consume called with an empty lookahead buffer"),
        }
    }

    /// Removes and returns the next token, scanning only if the buffer is empty.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        match self.pending.pop_front() {
            Some(token) => Ok(Some(token)),
            None => self.scan(),
        }
    }

    /// Location of the scanner. Past the last buffered token this is where input ends.
    pub fn location(&self) -> Location {
        Location {
            row: self.row,
            column: self.column,
            offset: self.offset,
            file: self.file.clone(),
        }
    }

    fn bump(&mut self) -> Option<char> {
        let (offset, ch) = self.chars.next()?;
        self.offset = offset + ch.len_utf8();
        if ch == '\n' {
            self.row += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn consume_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if !predicate(ch) {
                break;
            }
            text.push(ch);
            self.bump();
        }
        text
    }

    fn single(&mut self, kind: TokenKind, location: Location) -> Token {
        let text = self.bump().map(String::from).unwrap_or_default();
        Token {
            kind,
            text,
            location,
        }
    }

    fn scan(&mut self) -> Result<Option<Token>, LexError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        let scanned = self.scan_token();
        if let Err(err) = &scanned {
            self.failed = Some(err.clone());
        }
        scanned
    }

    fn scan_token(&mut self) -> Result<Option<Token>, LexError> {
        loop {
            let Some(&(_, ch)) = self.chars.peek() else {
                return Ok(None);
            };
            let location = self.location();

            let token = match ch {
                c if is_layout(c) => {
                    self.bump();
                    continue;
                }
                '/' => {
                    self.bump();
                    if self.chars.peek().map(|&(_, c)| c) != Some('/') {
                        let span = Span::new(location.offset, location.offset + 1);
                        return Err(LexError::StraySlash { location, span });
                    }
                    // the comment swallows its terminating newline too
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                    continue;
                }
                '[' => self.single(TokenKind::OpenBracket, location),
                ']' => self.single(TokenKind::CloseBracket, location),
                ',' => self.single(TokenKind::Comma, location),
                '=' => self.single(TokenKind::Equals, location),
                c if c.is_alphabetic() => Token {
                    kind: TokenKind::Name,
                    text: self.consume_while(char::is_alphanumeric),
                    location,
                },
                c if c.is_ascii_digit() => Token {
                    kind: TokenKind::Number,
                    text: self.consume_while(|c| c.is_ascii_digit()),
                    location,
                },
                c => {
                    self.bump();
                    let span = Span::new(location.offset, location.offset + c.len_utf8());
                    return Err(LexError::UnexpectedCharacter {
                        ch: c,
                        location,
                        span,
                    });
                }
            };

            trace!(kind = ?token.kind, text = %token.text, at = %token.location, "token");
            return Ok(Some(token));
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token, LexError>;

    /// Yields a lexical error once, then stops.
    fn next(&mut self) -> Option<Self::Item> {
        if self.reported {
            return None;
        }
        let item = self.next_token().transpose();
        self.reported = matches!(item, Some(Err(_)));
        item
    }
}

fn is_layout(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t' | '\n' | '\u{0B}' | '\u{0C}' | '\r' | '\u{85}' | '\u{A0}'
    )
}

/// Scan the whole source eagerly.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Tokenizer::new(source).collect()
}
