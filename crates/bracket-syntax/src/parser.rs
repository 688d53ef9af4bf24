//! Recursive-descent parser.
//!
//! ```text
//! Program    := Call*
//! Call       := Name '[' Args? ']'
//! Args       := Expression (',' Expression)*
//! Expression := Call | Assignment | VariableReference | LiteralNumber
//! Assignment := Name '=' Expression
//! ```
//!
//! A `Name` is disambiguated by peeking at the token after it. Running out of
//! input is only a clean stop between top-level calls.
//!
//! Expressions nest at most [`MAX_NESTING_DEPTH`] levels deep, which keeps
//! both the parser and the printer within a small stack.

use tracing::{debug, warn};

use crate::ast::{Assignment, Block, Call, Expression, LiteralNumber, VariableReference};
use crate::error::{CompileError, CompileResult, Expected};
use crate::token::{Span, Token, TokenKind};
use crate::tokenizer::Tokenizer;

pub const MAX_NESTING_DEPTH: usize = 128;

/// How the parser treats a missing `[` or `]` around an argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BracketPolicy {
    /// Whatever token stands where the bracket belongs is consumed and
    /// dropped, so `F x]` parses as `F[]`.
    #[default]
    Lenient,
    /// Reject the program.
    Strict,
}

pub struct Parser<'src> {
    tokens: Tokenizer<'src>,
    brackets: BracketPolicy,
    depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(tokens: Tokenizer<'src>) -> Self {
        Parser {
            tokens,
            brackets: BracketPolicy::default(),
            depth: 0,
        }
    }

    pub fn with_brackets(mut self, brackets: BracketPolicy) -> Self {
        self.brackets = brackets;
        self
    }

    pub fn parse(mut self) -> CompileResult<Block> {
        let mut calls = Vec::new();
        while self.tokens.peek(1)?.is_some() {
            calls.push(self.parse_call()?);
        }
        debug!(calls = calls.len(), "parsed program");
        Ok(Block { calls })
    }

    fn parse_call(&mut self) -> CompileResult<Call> {
        let name = self.expect(TokenKind::Name)?;
        let open = self.expect_bracket(TokenKind::OpenBracket)?;
        let args = self.parse_args()?;
        let close = self.expect_bracket(TokenKind::CloseBracket)?;

        let end = close.or(open).unwrap_or_else(|| name.span());
        Ok(Call {
            span: name.span().join(end),
            name: name.text,
            args,
        })
    }

    fn parse_args(&mut self) -> CompileResult<Vec<Expression>> {
        let mut args = Vec::new();
        if self.peek_required(1, Expected::Expression)?.is(TokenKind::CloseBracket) {
            return Ok(args);
        }

        args.push(self.parse_expression()?);
        while self
            .peek_required(1, Expected::Token(TokenKind::CloseBracket))?
            .is(TokenKind::Comma)
        {
            self.tokens.consume();
            args.push(self.parse_expression()?);
        }
        Ok(args)
    }

    fn parse_expression(&mut self) -> CompileResult<Expression> {
        let token = self.peek_required(1, Expected::Expression)?;
        self.enter_nesting(&token)?;
        let expression = self.parse_nested(token);
        self.depth -= 1;
        expression
    }

    fn parse_nested(&mut self, token: Token) -> CompileResult<Expression> {
        match token.kind {
            TokenKind::Number => {
                let token = self.tokens.consume();
                Ok(Expression::LiteralNumber(LiteralNumber { text: token.text }))
            }
            TokenKind::Name => match self.tokens.peek(2)?.map(|token| token.kind) {
                Some(TokenKind::OpenBracket) => self.parse_call().map(Expression::Call),
                Some(TokenKind::Equals) => self.parse_assignment().map(Expression::Assignment),
                _ => {
                    let token = self.tokens.consume();
                    Ok(Expression::VariableReference(VariableReference { name: token.text }))
                }
            },
            _ => Err(unexpected(Expected::Expression, &token)),
        }
    }

    fn parse_assignment(&mut self) -> CompileResult<Assignment> {
        let lhs = self.expect(TokenKind::Name)?;
        self.expect(TokenKind::Equals)?;
        let rhs = self.parse_expression()?;
        Ok(Assignment {
            lhs: VariableReference { name: lhs.text },
            rhs: Box::new(rhs),
        })
    }

    fn enter_nesting(&mut self, at: &Token) -> CompileResult<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(CompileError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
                location: at.location.clone(),
                span: at.span(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn peek_required(&mut self, n: usize, expected: Expected) -> CompileResult<Token> {
        match self.tokens.peek(n)?.cloned() {
            Some(token) => Ok(token),
            None => Err(self.end_of_input(expected)),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> CompileResult<Token> {
        match self.tokens.next_token()? {
            Some(token) if token.is(kind) => Ok(token),
            Some(token) => Err(unexpected(Expected::Token(kind), &token)),
            None => Err(self.end_of_input(Expected::Token(kind))),
        }
    }

    /// Consumes the token in bracket position. Anything but the bracket is
    /// an error under [`BracketPolicy::Strict`] and dropped otherwise;
    /// running out of input always is an error.
    fn expect_bracket(&mut self, kind: TokenKind) -> CompileResult<Option<Span>> {
        let token = self.peek_required(1, Expected::Token(kind))?;
        if token.is(kind) {
            return Ok(Some(self.tokens.consume().span()));
        }
        match self.brackets {
            BracketPolicy::Strict => Err(unexpected(Expected::Token(kind), &token)),
            BracketPolicy::Lenient => {
                warn!(at = %token.location, found = %token.kind, "missing {kind}, dropping `{}`", token.text);
                self.tokens.consume();
                Ok(None)
            }
        }
    }

    fn end_of_input(&self, expected: Expected) -> CompileError {
        let location = self.tokens.location();
        CompileError::UnexpectedEndOfInput {
            expected,
            span: Span::empty(location.offset),
            location,
        }
    }
}

fn unexpected(expected: Expected, token: &Token) -> CompileError {
    CompileError::UnexpectedToken {
        expected,
        found: token.kind,
        text: token.text.clone(),
        location: token.location.clone(),
        span: token.span(),
    }
}

/// Parse a whole program with the default (lenient) bracket policy.
pub fn parse(source: &str) -> CompileResult<Block> {
    Parser::new(Tokenizer::new(source)).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LexError;

    fn call(name: &str, args: Vec<Expression>) -> Expression {
        Expression::call(name, args)
    }

    fn var(name: &str) -> Expression {
        Expression::reference(name)
    }

    fn num(text: &str) -> Expression {
        Expression::number(text)
    }

    fn parse_strict(source: &str) -> CompileResult<Block> {
        Parser::new(Tokenizer::new(source))
            .with_brackets(BracketPolicy::Strict)
            .parse()
    }

    fn single(source: &str) -> Call {
        let mut block = parse(source).unwrap();
        assert_eq!(block.calls.len(), 1, "expected exactly one call in {source:?}");
        block.calls.remove(0)
    }

    #[test]
    fn empty_program() {
        assert_eq!(parse("").unwrap(), Block::default());
        assert_eq!(parse("  // nothing here\n").unwrap(), Block::default());
    }

    #[test]
    fn nested_calls_and_literals() {
        let parsed = single("F[1, x, G[]]");
        assert_eq!(
            parsed,
            Call::new("F", vec![num("1"), var("x"), call("G", vec![])])
        );
    }

    #[test]
    fn top_level_calls_keep_source_order() {
        let block = parse("A[] B[1]\nC[x]").unwrap();
        let names: Vec<_> = block.calls.iter().map(|call| call.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn name_then_equals_is_always_an_assignment() {
        let parsed = single("Let[x = 1, y = G[z = 2], Print[x]]");
        assert_eq!(
            parsed.args,
            vec![
                Expression::assign("x", num("1")),
                Expression::assign("y", call("G", vec![Expression::assign("z", num("2"))])),
                call("Print", vec![var("x")]),
            ]
        );
    }

    #[test]
    fn assignment_chains_to_the_right() {
        let parsed = single("F[a = b = 3]");
        assert_eq!(
            parsed.args,
            vec![Expression::assign("a", Expression::assign("b", num("3")))]
        );
    }

    #[test]
    fn call_span_covers_name_to_close_bracket() {
        let parsed = single("  Foo[1, 2]");
        assert_eq!(parsed.span, Span::new(2, 11));
    }

    #[test]
    fn comments_do_not_change_the_tree() {
        let plain = parse("Def[f, Args[x], Print[x]]").unwrap();
        let commented = parse("// define\nDef[f, // name\n Args[x], // params\n Print[x]] // body").unwrap();
        assert_eq!(plain, commented);
    }

    #[test]
    fn unterminated_call_is_end_of_input() {
        for source in ["Foo[", "Foo[x", "Foo[x,", "Foo[x = ", "Foo"] {
            let err = parse(source).unwrap_err();
            assert!(err.is_end_of_input(), "{source:?} gave {err:?}");
        }
    }

    #[test]
    fn end_of_input_error_points_at_the_end() {
        let err = parse("Foo[\n  x,").unwrap_err();
        match err {
            CompileError::UnexpectedEndOfInput {
                expected,
                location,
                span,
            } => {
                assert_eq!(expected, Expected::Expression);
                assert_eq!((location.row, location.column), (2, 5));
                assert_eq!(span, Span::empty(9));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn top_level_must_be_a_call_name() {
        let err = parse("42[]").unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnexpectedToken {
                expected: Expected::Token(TokenKind::Name),
                found: TokenKind::Number,
                ..
            }
        ));
    }

    #[test]
    fn bad_expression_start() {
        let err = parse("F[, x]").unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnexpectedToken {
                expected: Expected::Expression,
                found: TokenKind::Comma,
                ..
            }
        ));
    }

    #[test]
    fn lexical_errors_propagate() {
        let err = parse("F[x; y]").unwrap_err();
        assert!(matches!(
            err,
            CompileError::Lex(LexError::UnexpectedCharacter { ch: ';', .. })
        ));
    }

    // By default the token standing in for a missing bracket is swallowed;
    // strict mode reports it instead.

    #[test]
    fn lenient_swallows_the_token_in_open_bracket_position() {
        assert_eq!(single("F x]"), Call::new("F", vec![]));
        assert_eq!(single("F x 1]"), Call::new("F", vec![num("1")]));
    }

    #[test]
    fn lenient_swallows_the_token_in_close_bracket_position() {
        assert_eq!(single("F[x, y G"), Call::new("F", vec![var("x"), var("y")]));

        let err = parse("F[x, y G[z]").unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnexpectedToken {
                expected: Expected::Token(TokenKind::Name),
                found: TokenKind::OpenBracket,
                ..
            }
        ));
    }

    #[test]
    fn lenient_does_not_rescue_a_missing_open_bracket_before_arguments() {
        let err = parse("F x, 1]").unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnexpectedToken {
                expected: Expected::Expression,
                found: TokenKind::Comma,
                ..
            }
        ));
    }

    #[test]
    fn strict_rejects_missing_brackets() {
        let err = parse_strict("F[x, y G[z]").unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnexpectedToken {
                expected: Expected::Token(TokenKind::CloseBracket),
                found: TokenKind::Name,
                ..
            }
        ));

        let err = parse_strict("F x]").unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnexpectedToken {
                expected: Expected::Token(TokenKind::OpenBracket),
                ..
            }
        ));
    }

    fn nested(depth: usize) -> String {
        format!("{}x{}", "F[".repeat(depth), "]".repeat(depth))
    }

    #[test]
    fn nesting_up_to_the_limit_parses() {
        // the outermost call is not an argument, so it does not count
        let block = parse(&nested(MAX_NESTING_DEPTH)).unwrap();
        assert_eq!(block.calls.len(), 1);
    }

    #[test]
    fn nesting_past_the_limit_is_an_error() {
        let err = parse(&nested(MAX_NESTING_DEPTH + 2)).unwrap_err();
        match err {
            CompileError::NestingTooDeep { limit, span, .. } => {
                assert_eq!(limit, MAX_NESTING_DEPTH);
                let offset = 2 * (MAX_NESTING_DEPTH + 1);
                assert_eq!(span, Span::new(offset, offset + 1));
            }
            other => panic!("unexpected error {other:?}"),
        }

        let err = parse(&nested(5_000)).unwrap_err();
        assert!(matches!(err, CompileError::NestingTooDeep { .. }));
    }

    #[test]
    fn assignment_chains_count_towards_nesting() {
        let source = format!("F[{}1]", "a = ".repeat(5_000));
        assert!(matches!(
            parse(&source).unwrap_err(),
            CompileError::NestingTooDeep { .. }
        ));
    }

    #[test]
    fn strict_accepts_well_formed_programs() {
        assert_eq!(
            parse_strict("F[G[1], x = 2]").unwrap(),
            parse("F[G[1], x = 2]").unwrap()
        );
    }
}
