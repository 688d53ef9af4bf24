//! Errors raised while compiling. Every one of them aborts the compilation.

// miette's derive expands to assignments rustc reports as unused
#![allow(unused_assignments)]

use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

use crate::token::{Location, Span, TokenKind};

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum LexError {
    #[error("unexpected character {ch:?} at {location}")]
    #[diagnostic(code(bracket::lex::unexpected_character))]
    UnexpectedCharacter {
        ch: char,
        location: Location,
        #[label("not part of the language")]
        span: Span,
    },

    #[error("unexpected `/` at {location}")]
    #[diagnostic(
        code(bracket::lex::stray_slash),
        help("line comments start with `//`")
    )]
    StraySlash {
        location: Location,
        #[label("expected a second `/`")]
        span: Span,
    },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedCharacter { span, .. } | LexError::StraySlash { span, .. } => *span,
        }
    }
}

/// What the parser was looking for when it gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Token(TokenKind),
    Expression,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Token(kind) => kind.fmt(f),
            Expected::Expression => f.write_str("an expression"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum CompileError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(#[from] LexError),

    #[error("unexpected end of input at {location}, expected {expected}")]
    #[diagnostic(code(bracket::parse::unexpected_end_of_input))]
    UnexpectedEndOfInput {
        expected: Expected,
        location: Location,
        #[label("input ends here")]
        span: Span,
    },

    #[error("unexpected {found} at {location}, expected {expected}")]
    #[diagnostic(code(bracket::parse::unexpected_token))]
    UnexpectedToken {
        expected: Expected,
        found: TokenKind,
        text: String,
        location: Location,
        #[label("found `{text}`")]
        span: Span,
    },

    #[error("nesting deeper than {limit} levels at {location}")]
    #[diagnostic(
        code(bracket::parse::nesting_too_deep),
        help("split the expression with `Def`")
    )]
    NestingTooDeep {
        limit: usize,
        location: Location,
        #[label("too deep")]
        span: Span,
    },

    #[error("malformed `{form}`: {reason}")]
    #[diagnostic(code(bracket::codegen::malformed_special_form))]
    MalformedSpecialForm {
        form: String,
        reason: String,
        #[label("in this `{form}`")]
        span: Span,
    },
}

impl CompileError {
    pub fn malformed(form: impl Into<String>, reason: impl Into<String>, span: Span) -> Self {
        CompileError::MalformedSpecialForm {
            form: form.into(),
            reason: reason.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            CompileError::Lex(err) => err.span(),
            CompileError::UnexpectedEndOfInput { span, .. }
            | CompileError::UnexpectedToken { span, .. }
            | CompileError::NestingTooDeep { span, .. }
            | CompileError::MalformedSpecialForm { span, .. } => *span,
        }
    }

    pub fn is_end_of_input(&self) -> bool {
        matches!(self, CompileError::UnexpectedEndOfInput { .. })
    }
}
