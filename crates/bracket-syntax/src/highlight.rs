//! Semantic highlighting for editors.
//!
//! A name followed by `[` is a call, any other name is a variable.

use tower_lsp::lsp_types::{SemanticToken, SemanticTokenType, SemanticTokensLegend};

use crate::printer::{PARAMS_FORM, SpecialForm};
use crate::token::{Token, TokenKind};
use crate::tokenizer::Tokenizer;

pub const TOKEN_TYPES: [SemanticTokenType; 4] = [
    SemanticTokenType::KEYWORD,
    SemanticTokenType::FUNCTION,
    SemanticTokenType::VARIABLE,
    SemanticTokenType::NUMBER,
];

pub fn legend() -> SemanticTokensLegend {
    SemanticTokensLegend {
        token_types: TOKEN_TYPES.to_vec(),
        token_modifiers: vec![],
    }
}

fn token_type_index(typ: &SemanticTokenType) -> u32 {
    TOKEN_TYPES
        .iter()
        .position(|known| known == typ)
        .unwrap_or_default() as u32
}

fn classify(token: &Token, next: Option<&Token>) -> Option<SemanticTokenType> {
    match token.kind {
        TokenKind::Number => Some(SemanticTokenType::NUMBER),
        TokenKind::Name if next.is_some_and(|next| next.is(TokenKind::OpenBracket)) => {
            if token.text == PARAMS_FORM || SpecialForm::from_name(&token.text).is_some() {
                Some(SemanticTokenType::KEYWORD)
            } else {
                Some(SemanticTokenType::FUNCTION)
            }
        }
        TokenKind::Name => Some(SemanticTokenType::VARIABLE),
        _ => None,
    }
}

/// Zero-based line and UTF-16 column of a byte offset, as LSP counts them.
pub fn utf16_position(source: &str, offset: usize) -> (u32, u32) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count();
    let line_start = before.rfind('\n').map_or(0, |at| at + 1);
    let character = source[line_start..offset].encode_utf16().count();
    (line as u32, character as u32)
}

/// Walks a source forward, keeping the LSP position of its byte offset.
struct Cursor<'src> {
    source: &'src str,
    offset: usize,
    line: u32,
    character: u32,
}

impl<'src> Cursor<'src> {
    fn new(source: &'src str) -> Self {
        Cursor {
            source,
            offset: 0,
            line: 0,
            character: 0,
        }
    }

    /// Offsets must not go backwards.
    fn advance_to(&mut self, offset: usize) -> (u32, u32) {
        let offset = offset.clamp(self.offset, self.source.len());
        for ch in self.source[self.offset..offset].chars() {
            if ch == '\n' {
                self.line += 1;
                self.character = 0;
            } else {
                self.character += ch.len_utf16() as u32;
            }
        }
        self.offset = offset;
        (self.line, self.character)
    }
}

/// Delta-encoded semantic tokens for `source`. Highlighting stops at the
/// first lexical error; everything before it is still reported.
pub fn semantic_tokens(source: &str) -> Vec<SemanticToken> {
    let tokens: Vec<Token> = Tokenizer::new(source).map_while(Result::ok).collect();
    let mut semantic_tokens = vec![];
    let mut cursor = Cursor::new(source);
    let mut prev_line = 0;
    let mut prev_start = 0;

    for (index, token) in tokens.iter().enumerate() {
        let Some(kind) = classify(token, tokens.get(index + 1)) else {
            continue;
        };

        let (line, start) = cursor.advance_to(token.location.offset);
        let delta_line = line - prev_line;
        let delta_start = if delta_line == 0 {
            start - prev_start
        } else {
            start
        };

        semantic_tokens.push(SemanticToken {
            delta_line,
            delta_start,
            length: token.text.encode_utf16().count() as u32,
            token_type: token_type_index(&kind),
            token_modifiers_bitset: 0,
        });

        prev_line = line;
        prev_start = start;
    }

    semantic_tokens
}
