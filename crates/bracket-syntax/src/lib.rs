//! Compiler from bracketed call expressions (`Name[arg, ...]`) to Python.
//!
//! `compile` runs the whole pipeline: the parser pulls tokens from the
//! tokenizer on demand, and the printer turns the finished tree into Python.
//!
//! ```
//! let python = bracket_syntax::compile("Def[Twice, Args[x], List[x, x]]").unwrap();
//! assert_eq!(python, "Twice = lambda x: [x, x]");
//! ```

pub mod ast;
pub mod error;
pub mod highlight;
pub mod parser;
pub mod printer;
pub mod token;
pub mod tokenizer;


use std::sync::Arc;

pub use ast::{Assignment, Block, Call, Expression, LiteralNumber, VariableReference};
pub use error::{CompileError, CompileResult, Expected, LexError};
pub use highlight::{legend, semantic_tokens};
pub use parser::{BracketPolicy, MAX_NESTING_DEPTH, Parser};
pub use printer::{Builtins, Rendered, SpecialForm, render};
pub use token::{Location, Span, Token, TokenKind};
pub use tokenizer::{Tokenizer, tokenize};

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub brackets: BracketPolicy,
    /// Shown in locations of diagnostics.
    pub file: Option<Arc<str>>,
}

impl CompileOptions {
    pub fn strict() -> Self {
        CompileOptions {
            brackets: BracketPolicy::Strict,
            ..CompileOptions::default()
        }
    }

    pub fn with_file(mut self, file: impl Into<Arc<str>>) -> Self {
        self.file = Some(file.into());
        self
    }

    fn tokenizer<'src>(&self, source: &'src str) -> Tokenizer<'src> {
        match &self.file {
            Some(file) => Tokenizer::new(source).with_file(file.clone()),
            None => Tokenizer::new(source),
        }
    }
}

pub fn parse_with(source: &str, options: &CompileOptions) -> CompileResult<Block> {
    Parser::new(options.tokenizer(source))
        .with_brackets(options.brackets)
        .parse()
}

pub fn compile_with(source: &str, options: &CompileOptions) -> CompileResult<String> {
    let block = parse_with(source, options)?;
    Ok(render(&block)?.into_source())
}

pub fn compile(source: &str) -> CompileResult<String> {
    compile_with(source, &CompileOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_small_program() {
        let source = "\
// memoized square
Def[cache = HashMap[]]
Def[Square, Args[x, HashMap[memo]], Cond[Has[x, memo], Get[x, memo], Assoc[x, Mul[x, x], memo]]]
Print[Call[Square, 4]]
";
        let expected = format!(
            "{}\n{}\ncache = dict()\nSquare = lambda x, memo = dict(): (memo.get(x)) if (memo.get(x, None) != None) else builtin__assoc(x, Mul(x,x), memo)\nbuiltin__print(((Square)(4)))",
            printer::PRINT_BUILTIN,
            printer::ASSOC_BUILTIN,
        );
        assert_eq!(compile(source).unwrap(), expected);
    }

    #[test]
    fn empty_source_compiles_to_nothing() {
        assert_eq!(compile("").unwrap(), "");
    }

    #[test]
    fn options_carry_file_names_into_errors() {
        let options = CompileOptions::default().with_file("demo.bk");
        let err = compile_with("Foo[", &options).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unexpected end of input at demo.bk:1:5, expected an expression"
        );
    }

    #[test]
    fn strict_options_reject_missing_brackets() {
        assert_eq!(compile("F x]").unwrap(), "F()");
        assert_eq!(compile("F[x, y G").unwrap(), "F(x,y)");
        assert!(matches!(
            compile_with("F x]", &CompileOptions::strict()),
            Err(CompileError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn lenient_brackets_reject_what_the_swallowed_token_breaks() {
        for source in ["F[x G[]", "F[x, y G[z]", "F x, 1]"] {
            assert!(
                matches!(compile(source), Err(CompileError::UnexpectedToken { .. })),
                "{source:?}"
            );
        }
    }

    #[test]
    fn deeply_nested_programs_fail_cleanly() {
        let source = format!("{}x{}", "F[".repeat(5_000), "]".repeat(5_000));
        assert!(matches!(
            compile(&source),
            Err(CompileError::NestingTooDeep { .. })
        ));

        let depth = parser::MAX_NESTING_DEPTH;
        let source = format!("{}x{}", "Print[".repeat(depth), "]".repeat(depth));
        let python = compile(&source).unwrap();
        assert!(python.ends_with(&format!("x{}", ")".repeat(depth))));
    }

    #[test]
    fn unterminated_input_never_succeeds() {
        assert!(compile("Foo[").unwrap_err().is_end_of_input());
    }
}
