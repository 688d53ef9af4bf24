//! `bracket` compiles a source file to Python.

use std::fs;
use std::path::{Path, PathBuf};

use bracket_syntax::{BracketPolicy, CompileError, CompileOptions, Tokenizer};
use clap::{ArgAction, Parser, ValueEnum};
use miette::{IntoDiagnostic, NamedSource, Result, WrapErr};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Compile bracketed call expressions to Python
#[derive(Debug, Parser)]
#[command(name = "bracket", version, about, long_about = None)]
struct Cli {
    /// Source file to compile
    source: PathBuf,

    /// Where to write the output (default: the source path with a `.py` extension)
    #[arg(short, long, conflicts_with = "stdout")]
    output: Option<PathBuf>,

    /// Print the output instead of writing a file
    #[arg(long)]
    stdout: bool,

    /// What to produce
    #[arg(long, value_enum, default_value_t = Emit::Python)]
    emit: Emit,

    /// Reject call expressions with a missing `[` or `]`
    #[arg(long)]
    strict_brackets: bool,

    /// Increase logging verbosity (-v: debug, -vv+: trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    Python,
    /// The parsed tree as JSON
    Ast,
    /// The token stream as JSON
    Tokens,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(directive_for_verbosity(cli.verbose))),
        )
        .with_writer(std::io::stderr)
        .init();

    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let source = fs::read_to_string(&cli.source)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", cli.source.display()))?;
    let name = cli.source.display().to_string();
    debug!(file = %name, bytes = source.len(), "read source");

    let options = CompileOptions {
        brackets: if cli.strict_brackets {
            BracketPolicy::Strict
        } else {
            BracketPolicy::Lenient
        },
        file: Some(name.as_str().into()),
    };

    let output = emit(cli.emit, &source, &options)?;

    if cli.stdout || (cli.emit != Emit::Python && cli.output.is_none()) {
        println!("{output}");
        return Ok(());
    }

    let destination = cli
        .output
        .clone()
        .unwrap_or_else(|| output_path(&cli.source));
    fs::write(&destination, output)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to write {}", destination.display()))?;
    info!(from = %name, to = %destination.display(), "compiled");
    Ok(())
}

fn emit(what: Emit, source: &str, options: &CompileOptions) -> Result<String> {
    let with_source = |err: CompileError| {
        let name = options.file.as_deref().unwrap_or("<input>");
        miette::Report::new(err).with_source_code(NamedSource::new(name, source.to_owned()))
    };
    match what {
        Emit::Python => bracket_syntax::compile_with(source, options).map_err(with_source),
        Emit::Ast => {
            let block = bracket_syntax::parse_with(source, options).map_err(with_source)?;
            to_json(&block)
        }
        Emit::Tokens => {
            let mut tokenizer = Tokenizer::new(source);
            if let Some(file) = &options.file {
                tokenizer = tokenizer.with_file(file.clone());
            }
            let tokens = tokenizer
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| with_source(err.into()))?;
            to_json(&tokens)
        }
    }
}

fn to_json(value: &impl serde::Serialize) -> Result<String> {
    serde_json::to_string_pretty(value)
        .into_diagnostic()
        .wrap_err("failed to serialize output")
}

/// `dir/prog.bk` becomes `dir/prog.py`; a path without an extension gains one.
fn output_path(source: &Path) -> PathBuf {
    source.with_extension("py")
}

fn directive_for_verbosity(v: u8) -> &'static str {
    match v {
        0 => "bracket=info,bracket_syntax=warn",
        1 => "bracket=debug,bracket_syntax=debug",
        _ => "bracket=trace,bracket_syntax=trace",
    }
}
