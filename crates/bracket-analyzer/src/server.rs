use anyhow::Context;
use bracket_syntax::highlight::utf16_position;
use bracket_syntax::printer::PARAMS_FORM;
use bracket_syntax::{CompileError, SpecialForm};
use dashmap::DashMap;
use miette::Diagnostic as _;
use serde_json::Value;
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, warn};

/// Returns the compiled Python for the document URI given as the only argument.
pub(crate) const COMPILE_COMMAND: &str = "bracket.compile";

#[derive(Debug)]
pub(crate) struct Backend {
    client: Client,
    documents: DashMap<Url, String>,
}

impl Backend {
    pub(crate) fn new(client: Client) -> Self {
        Backend {
            client,
            documents: DashMap::new(),
        }
    }

    async fn update(&self, uri: Url, text: String, version: Option<i32>) {
        let diagnostics = diagnostics_for(&text);
        self.documents.insert(uri.clone(), text);
        debug!(%uri, count = diagnostics.len(), "publishing diagnostics");
        self.client
            .publish_diagnostics(uri, diagnostics, version)
            .await;
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, _: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: "bracket-analyzer".to_owned(),
                version: Some(env!("CARGO_PKG_VERSION").to_owned()),
            }),
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    ..Default::default()
                }),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![COMPILE_COMMAND.to_owned()],
                    work_done_progress_options: Default::default(),
                }),
                semantic_tokens_provider: Some(
                    SemanticTokensServerCapabilities::SemanticTokensOptions(
                        SemanticTokensOptions {
                            work_done_progress_options: Default::default(),
                            legend: bracket_syntax::legend(),
                            range: None,
                            full: Some(SemanticTokensFullOptions::Bool(true)),
                        },
                    ),
                ),
                ..ServerCapabilities::default()
            },
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "bracket-analyzer initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        self.update(document.uri, document.text, Some(document.version))
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(change) = params.content_changes.into_iter().last() {
            self.update(uri, change.text, Some(params.text_document.version))
                .await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        if let Some(text) = params.text {
            self.update(params.text_document.uri, text, None).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.remove(&uri);
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn completion(&self, _: CompletionParams) -> Result<Option<CompletionResponse>> {
        Ok(Some(CompletionResponse::Array(completion_items())))
    }

    async fn semantic_tokens_full(
        &self,
        params: SemanticTokensParams,
    ) -> Result<Option<SemanticTokensResult>> {
        let uri = params.text_document.uri;
        let Some(text) = self.documents.get(&uri).map(|doc| doc.value().clone()) else {
            return Ok(None);
        };

        Ok(Some(SemanticTokensResult::Tokens(SemanticTokens {
            result_id: None,
            data: bracket_syntax::semantic_tokens(&text),
        })))
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        if params.command != COMPILE_COMMAND {
            return Err(Error::method_not_found());
        }

        match compile_document(&self.documents, &params.arguments) {
            Ok(python) => Ok(Some(Value::String(python))),
            Err(err) => {
                warn!("{err:#}");
                self.client
                    .log_message(MessageType::ERROR, format!("{err:#}"))
                    .await;
                Err(Error::invalid_params(format!("{err:#}")))
            }
        }
    }
}

fn compile_document(documents: &DashMap<Url, String>, arguments: &[Value]) -> anyhow::Result<String> {
    let uri = arguments
        .first()
        .and_then(Value::as_str)
        .context("expected the document URI as the first argument")?;
    let uri = Url::parse(uri).with_context(|| format!("invalid document URI `{uri}`"))?;
    let text = documents
        .get(&uri)
        .map(|doc| doc.value().clone())
        .with_context(|| format!("{uri} is not open"))?;
    let python = bracket_syntax::compile(&text).with_context(|| format!("failed to compile {uri}"))?;
    Ok(python)
}

fn diagnostics_for(text: &str) -> Vec<Diagnostic> {
    match bracket_syntax::compile(text) {
        Ok(_) => vec![],
        Err(err) => vec![to_lsp_diagnostic(text, &err)],
    }
}

fn to_lsp_diagnostic(text: &str, err: &CompileError) -> Diagnostic {
    let span = err.span();
    let (start_line, start_character) = utf16_position(text, span.start);
    let (end_line, end_character) = utf16_position(text, span.end);
    Diagnostic {
        range: Range::new(
            Position::new(start_line, start_character),
            Position::new(end_line, end_character),
        ),
        severity: Some(DiagnosticSeverity::ERROR),
        code: err.code().map(|code| NumberOrString::String(code.to_string())),
        source: Some("bracket".to_owned()),
        message: err.to_string(),
        ..Default::default()
    }
}

fn completion_items() -> Vec<CompletionItem> {
    let keyword = |label: &str, detail: &str| CompletionItem {
        label: label.to_owned(),
        kind: Some(CompletionItemKind::KEYWORD),
        detail: Some(detail.to_owned()),
        ..Default::default()
    };

    SpecialForm::ALL
        .into_iter()
        .map(|form| keyword(form.name(), form.shape()))
        .chain(std::iter::once(keyword(PARAMS_FORM, "Args[param...]")))
        .collect()
}
