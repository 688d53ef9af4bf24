//! Language server for bracket sources.

mod server;

use clap::{ArgAction, Parser};
use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bracket-analyzer", about = "Bracket language server")]
struct Cli {
    /// Increase logging verbosity (-v: debug, -vv+: trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // stdout carries the protocol, so logs go to stderr without colors
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(directive_for_verbosity(cli.verbose))),
        )
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let (stdin, stdout) = (tokio::io::stdin(), tokio::io::stdout());

    let (service, socket) = LspService::new(server::Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}

fn directive_for_verbosity(v: u8) -> &'static str {
    match v {
        0 => "bracket_analyzer=info,bracket_syntax=warn,tower_lsp=warn",
        1 => "bracket_analyzer=debug,bracket_syntax=debug,tower_lsp=info",
        _ => "bracket_analyzer=trace,bracket_syntax=trace,tower_lsp=debug",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_defaults() {
        assert_eq!(
            directive_for_verbosity(0),
            "bracket_analyzer=info,bracket_syntax=warn,tower_lsp=warn"
        );
        assert_eq!(
            directive_for_verbosity(3),
            "bracket_analyzer=trace,bracket_syntax=trace,tower_lsp=debug"
        );
    }
}
