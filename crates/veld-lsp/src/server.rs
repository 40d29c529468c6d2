//! Request router and server lifecycle.
//!
//! One reader loop processes messages in arrival order. State mutations
//! happen on this thread only; the single background worker (the initial
//! workspace scan) writes through the shared index lock and polls an exit
//! flag so `exit` can interrupt it.

use crate::analysis::Analysis;
use crate::bridge::DebugBridge;
use crate::convert::{offset_in, position_params, range_param, text_document_uri};
use crate::diagnostics;
use crate::features::{
    code_actions, completion, document_symbol, folding, formatting, hover, inlay_hints,
    navigation, references, rename, semantic_tokens, signature_help, workspace_symbol,
};
use crate::state::ServerState;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use veld_lsp_protocol::{
    error_codes, methods, server_capabilities, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
};
use veld_lsp_transport::{read_message, write_error, write_message, write_notification, ReadOutcome};
use veld_position_tracking::Span;
use veld_workspace_index::ContentChange;

type HandlerResult = Result<Option<Value>, JsonRpcError>;

/// The Veld language server.
pub struct LspServer {
    state: ServerState,
    bridge: DebugBridge,
    initialized: bool,
    shutdown_requested: bool,
    exited: bool,
    exit_flag: Arc<AtomicBool>,
    cancelled: HashSet<String>,
    outgoing: Vec<(String, Value)>,
    scan_thread: Option<std::thread::JoinHandle<()>>,
}

impl LspServer {
    /// Create a server with bridge configuration from the environment.
    pub fn new() -> Self {
        Self::with_bridge(DebugBridge::from_env())
    }

    /// Create a server with an explicit bridge, used by tests.
    pub fn with_bridge(bridge: DebugBridge) -> Self {
        Self {
            state: ServerState::new(),
            bridge,
            initialized: false,
            shutdown_requested: false,
            exited: false,
            exit_flag: Arc::new(AtomicBool::new(false)),
            cancelled: HashSet::new(),
            outgoing: Vec::new(),
            scan_thread: None,
        }
    }

    /// Whether `exit` has been received.
    pub fn exited(&self) -> bool {
        self.exited
    }

    /// Read-only view of the server state, used by tests.
    pub fn state(&self) -> &ServerState {
        &self.state
    }

    /// Run over stdio until `exit` or end of stream.
    pub fn run(&mut self) -> anyhow::Result<()> {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let mut reader = std::io::BufReader::new(stdin.lock());
        let mut writer = stdout.lock();
        self.run_with(&mut reader, &mut writer)
    }

    /// Run over arbitrary streams. Tests drive the server through this.
    pub fn run_with<R: BufRead, W: Write>(
        &mut self,
        reader: &mut R,
        writer: &mut W,
    ) -> anyhow::Result<()> {
        loop {
            match read_message(reader)? {
                ReadOutcome::Eof => break,
                ReadOutcome::Protocol(error) => {
                    warn!(code = error.code, "framing violation: {}", error.message);
                    write_error(writer, error)?;
                }
                ReadOutcome::Message(request) => {
                    if let Some(response) = self.handle_request(request) {
                        write_message(writer, &response)?;
                    }
                    for (method, params) in self.outgoing.drain(..) {
                        write_notification(writer, &method, params)?;
                    }
                    if self.exited {
                        break;
                    }
                }
            }
        }
        self.exit_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.scan_thread.take() {
            let _ = handle.join();
        }
        Ok(())
    }

    fn cancel_key(id: &Value) -> String {
        id.to_string()
    }

    /// Handle a JSON-RPC request or notification.
    pub fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone();
        debug!(method = %request.method, "dispatch");

        if request.method == methods::CANCEL_REQUEST {
            if let Some(params) = request.params.as_ref() {
                if let Some(target) = params.get("id") {
                    self.cancelled.insert(Self::cancel_key(target));
                }
            }
            return None;
        }
        if request.method == methods::SET_TRACE {
            return None;
        }

        // A request already cancelled before processing returns -32800 and
        // mutates nothing.
        if let Some(ref request_id) = id {
            if self.cancelled.remove(&Self::cancel_key(request_id)) {
                return Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::new(error_codes::REQUEST_CANCELLED, "request cancelled"),
                ));
            }
        }

        let is_notification = id.is_none();
        let result = self.dispatch(&request);

        match result {
            Ok(Some(result)) => Some(JsonRpcResponse::success(id, result)),
            Ok(None) => None,
            Err(error) if is_notification => {
                // Notifications never get responses; log and move on.
                warn!(method = %request.method, "notification failed: {}", error.message);
                None
            }
            Err(error) => Some(JsonRpcResponse::error(id, error)),
        }
    }

    fn dispatch(&mut self, request: &JsonRpcRequest) -> HandlerResult {
        let params = request.params.as_ref();
        match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(params),
            methods::EXIT => {
                self.exited = true;
                self.exit_flag.store(true, Ordering::Relaxed);
                Ok(None)
            }
            _ if !self.initialized => {
                if request.method == methods::SHUTDOWN {
                    self.shutdown_requested = true;
                    return Ok(Some(Value::Null));
                }
                Err(JsonRpcError::new(
                    error_codes::SERVER_NOT_INITIALIZED,
                    "server not initialized",
                ))
            }
            _ if self.shutdown_requested => Err(JsonRpcError::new(
                error_codes::INVALID_REQUEST,
                "server is shutting down",
            )),
            methods::INITIALIZED => {
                self.spawn_workspace_scan();
                Ok(None)
            }
            methods::SHUTDOWN => {
                self.shutdown_requested = true;
                Ok(Some(Value::Null))
            }
            methods::DID_OPEN => self.handle_did_open(params),
            methods::DID_CHANGE => self.handle_did_change(params),
            methods::DID_CLOSE => self.handle_did_close(params),
            methods::DID_SAVE => self.handle_did_save(params),
            methods::HOVER => self.with_document(params, |doc, analysis, _, offset| {
                Ok(hover::hover(doc, analysis, offset).unwrap_or(Value::Null))
            }),
            methods::DEFINITION => self.with_document(params, |doc, analysis, ctx, offset| {
                Ok(json!(navigation::definition(ctx.uri, doc, analysis, offset)))
            }),
            methods::TYPE_DEFINITION => {
                self.with_document(params, |doc, analysis, ctx, offset| {
                    Ok(json!(navigation::type_definition(ctx.uri, doc, analysis, offset)))
                })
            }
            methods::REFERENCES => {
                let include_declaration = params
                    .map(|p| p["context"]["includeDeclaration"].as_bool().unwrap_or(true))
                    .unwrap_or(true);
                self.with_document(params, move |doc, analysis, ctx, offset| {
                    Ok(json!(references::references(
                        ctx.uri,
                        doc,
                        analysis,
                        ctx.state,
                        offset,
                        include_declaration,
                    )))
                })
            }
            methods::DOCUMENT_HIGHLIGHT => {
                self.with_document(params, |doc, analysis, _, offset| {
                    Ok(json!(references::document_highlight(doc, analysis, offset)))
                })
            }
            methods::DOCUMENT_SYMBOL => {
                let uri = text_document_uri(params)?;
                let (doc, analysis) = self.document_views(&uri)?;
                Ok(Some(json!(document_symbol::document_symbols(doc, analysis))))
            }
            methods::FOLDING_RANGE => {
                let uri = text_document_uri(params)?;
                let (doc, analysis) = self.document_views(&uri)?;
                Ok(Some(json!(folding::folding_ranges(doc, analysis))))
            }
            methods::PREPARE_RENAME => self.with_document(params, |doc, analysis, _, offset| {
                Ok(rename::prepare_rename(doc, analysis, offset).unwrap_or(Value::Null))
            }),
            methods::RENAME => {
                let new_name = params
                    .and_then(|p| p["newName"].as_str())
                    .ok_or_else(|| JsonRpcError::invalid_params("missing newName"))?
                    .to_string();
                self.with_document(params, move |doc, analysis, ctx, offset| {
                    rename::rename(ctx.uri, doc, analysis, ctx.state, offset, &new_name)
                })
            }
            methods::WORKSPACE_SYMBOL => {
                let query = params.and_then(|p| p["query"].as_str()).unwrap_or("");
                Ok(Some(json!(workspace_symbol::workspace_symbols(&self.state, query))))
            }
            methods::COMPLETION => self.with_document(params, |doc, analysis, ctx, offset| {
                Ok(completion::completion(ctx.uri, doc, analysis, ctx.state, offset))
            }),
            methods::COMPLETION_RESOLVE => {
                let item = params.cloned().unwrap_or(Value::Null);
                Ok(Some(completion::resolve(&self.state, item)))
            }
            methods::SIGNATURE_HELP => self.with_document(params, |doc, analysis, _, offset| {
                Ok(signature_help::signature_help(doc, analysis, offset).unwrap_or(Value::Null))
            }),
            methods::INLAY_HINT => {
                let uri = text_document_uri(params)?;
                let range = params
                    .map(|p| range_param(&p["range"]))
                    .transpose()?
                    .ok_or_else(|| JsonRpcError::invalid_params("missing range"))?;
                let (doc, analysis) = self.document_views(&uri)?;
                let ((start_line, _), (end_line, _)) = range;
                Ok(Some(json!(inlay_hints::inlay_hints(doc, analysis, start_line, end_line))))
            }
            methods::SEMANTIC_TOKENS_FULL => {
                let uri = text_document_uri(params)?;
                let (doc, analysis) = self.document_views(&uri)?;
                Ok(Some(semantic_tokens::semantic_tokens_full(doc, analysis)))
            }
            methods::SEMANTIC_TOKENS_RANGE => {
                let uri = text_document_uri(params)?;
                let range = params
                    .map(|p| range_param(&p["range"]))
                    .transpose()?
                    .ok_or_else(|| JsonRpcError::invalid_params("missing range"))?;
                let (doc, analysis) = self.document_views(&uri)?;
                let ((start_line, _), (end_line, _)) = range;
                Ok(Some(semantic_tokens::semantic_tokens_range(
                    doc, analysis, start_line, end_line,
                )))
            }
            methods::FORMATTING => {
                let uri = text_document_uri(params)?;
                let options = formatting::options_from_params(
                    params.map(|p| &p["options"]).unwrap_or(&Value::Null),
                );
                let (doc, _) = self.document_views(&uri)?;
                Ok(Some(json!(formatting::document_formatting(doc, &options))))
            }
            methods::RANGE_FORMATTING => {
                let uri = text_document_uri(params)?;
                let options = formatting::options_from_params(
                    params.map(|p| &p["options"]).unwrap_or(&Value::Null),
                );
                let range = params
                    .map(|p| range_param(&p["range"]))
                    .transpose()?
                    .ok_or_else(|| JsonRpcError::invalid_params("missing range"))?;
                let (doc, _) = self.document_views(&uri)?;
                let ((start_line, _), (end_line, _)) = range;
                Ok(Some(json!(formatting::range_formatting(doc, &options, start_line, end_line))))
            }
            methods::ON_TYPE_FORMATTING => {
                let (uri, line, _) = position_params(params)?;
                let ch = params
                    .and_then(|p| p["ch"].as_str())
                    .ok_or_else(|| JsonRpcError::invalid_params("missing ch"))?
                    .to_string();
                let options = formatting::options_from_params(
                    params.map(|p| &p["options"]).unwrap_or(&Value::Null),
                );
                let (doc, analysis) = self.document_views(&uri)?;
                Ok(Some(json!(formatting::on_type_formatting(doc, analysis, line, &ch, &options))))
            }
            methods::CODE_ACTION => {
                let uri = text_document_uri(params)?;
                let range = params
                    .map(|p| range_param(&p["range"]))
                    .transpose()?
                    .ok_or_else(|| JsonRpcError::invalid_params("missing range"))?;
                let (doc, analysis) = self.document_views(&uri)?;
                let ((sl, sc), (el, ec)) = range;
                let start = offset_in(doc, sl, sc).unwrap_or(0);
                let end = offset_in(doc, el, ec).unwrap_or(start);
                Ok(Some(json!(code_actions::code_actions(
                    &uri,
                    doc,
                    analysis,
                    Span::new(start, end),
                ))))
            }
            methods::EXECUTE_COMMAND => {
                let command = params
                    .and_then(|p| p["command"].as_str())
                    .ok_or_else(|| JsonRpcError::invalid_params("missing command"))?;
                let arguments: Vec<Value> = params
                    .and_then(|p| p["arguments"].as_array().cloned())
                    .unwrap_or_default();
                self.bridge.execute(command, &arguments).map(Some)
            }
            _ => Err(JsonRpcError::new(
                error_codes::METHOD_NOT_FOUND,
                format!("method `{}` not found", request.method),
            )),
        }
    }

    // -- lifecycle ----------------------------------------------------------

    fn handle_initialize(&mut self, params: Option<&Value>) -> HandlerResult {
        if self.initialized {
            return Err(JsonRpcError::new(
                error_codes::INVALID_REQUEST,
                "initialize may only be sent once",
            ));
        }
        self.initialized = true;

        let root = params.and_then(|p| {
            p["rootUri"]
                .as_str()
                .and_then(veld_workspace_index::uri_to_path)
                .or_else(|| p["rootPath"].as_str().map(std::path::PathBuf::from))
        });
        if let Some(root) = root {
            self.state.workspace.write().set_root(&root);
        }

        Ok(Some(json!({
            "capabilities": server_capabilities(),
            "serverInfo": {
                "name": "veld-lsp",
                "version": env!("CARGO_PKG_VERSION"),
            },
        })))
    }

    fn spawn_workspace_scan(&mut self) {
        let workspace = Arc::clone(&self.state.workspace);
        let exit_flag = Arc::clone(&self.exit_flag);
        if workspace.read().root().is_none() {
            return;
        }
        self.scan_thread = Some(std::thread::spawn(move || {
            // File reads and parsing happen outside the lock; the write
            // lock is held only for the per-file row swap, so dispatch is
            // never blocked behind the scan.
            let candidates = workspace.read().scan_candidates();
            for (uri, path) in candidates {
                if exit_flag.load(Ordering::Relaxed) {
                    return;
                }
                if let Some(rows) = veld_workspace_index::WorkspaceIndex::index_file(&path) {
                    let mut index = workspace.write();
                    // Rows may have arrived from didOpen while scanning;
                    // the open copy wins.
                    if !index.has_document(&uri) {
                        index.update_document(&uri, rows);
                    }
                }
            }
            debug!("workspace scan finished");
        }));
    }

    // -- text synchronization -----------------------------------------------

    fn handle_did_open(&mut self, params: Option<&Value>) -> HandlerResult {
        let doc = params
            .map(|p| &p["textDocument"])
            .ok_or_else(|| JsonRpcError::invalid_params("missing textDocument"))?;
        let uri = doc["uri"]
            .as_str()
            .ok_or_else(|| JsonRpcError::invalid_params("missing textDocument.uri"))?
            .to_string();
        let text = doc["text"]
            .as_str()
            .ok_or_else(|| JsonRpcError::invalid_params("missing textDocument.text"))?
            .to_string();
        let version = doc["version"].as_i64().unwrap_or(1) as i32;

        self.state.open_document(&uri, version, text);
        self.queue_diagnostics(&uri);
        Ok(None)
    }

    fn handle_did_change(&mut self, params: Option<&Value>) -> HandlerResult {
        let params = params.ok_or_else(|| JsonRpcError::invalid_params("missing params"))?;
        let uri = params["textDocument"]["uri"]
            .as_str()
            .ok_or_else(|| JsonRpcError::invalid_params("missing textDocument.uri"))?
            .to_string();
        let version = params["textDocument"]["version"].as_i64().unwrap_or(0) as i32;
        let raw_changes = params["contentChanges"]
            .as_array()
            .ok_or_else(|| JsonRpcError::invalid_params("missing contentChanges"))?;

        let mut changes = Vec::with_capacity(raw_changes.len());
        for change in raw_changes {
            let text = change["text"].as_str().unwrap_or_default().to_string();
            let range = if change["range"].is_object() {
                Some(range_param(&change["range"])?)
            } else {
                None
            };
            changes.push(ContentChange { range, text });
        }

        if !self.state.change_document(&uri, version, &changes) {
            warn!(%uri, "didChange for a document that is not open");
            return Ok(None);
        }
        self.queue_diagnostics(&uri);
        Ok(None)
    }

    fn handle_did_close(&mut self, params: Option<&Value>) -> HandlerResult {
        let uri = text_document_uri(params)?;
        self.state.close_document(&uri);
        self.queue_diagnostics(&uri);
        Ok(None)
    }

    fn handle_did_save(&mut self, params: Option<&Value>) -> HandlerResult {
        let uri = text_document_uri(params)?;
        self.queue_diagnostics(&uri);
        Ok(None)
    }

    fn queue_diagnostics(&mut self, uri: &str) {
        if let Some(params) = diagnostics::publish_params(&mut self.state, uri) {
            self.outgoing.push((methods::PUBLISH_DIAGNOSTICS.to_string(), params));
        }
    }

    // -- helpers ------------------------------------------------------------

    fn document_views(
        &self,
        uri: &str,
    ) -> Result<(&veld_workspace_index::Document, &Analysis), JsonRpcError> {
        match (self.state.document(uri), self.state.analysis(uri)) {
            (Some(doc), Some(analysis)) => Ok((doc, analysis)),
            _ => Err(JsonRpcError::invalid_params(format!("document not open: {uri}"))),
        }
    }

    fn with_document<F>(&self, params: Option<&Value>, f: F) -> HandlerResult
    where
        F: FnOnce(
            &veld_workspace_index::Document,
            &Analysis,
            DocContext<'_>,
            usize,
        ) -> Result<Value, JsonRpcError>,
    {
        let (uri, line, character) = position_params(params)?;
        let (doc, analysis) = self.document_views(&uri)?;
        // An unresolvable position is a no-op, not an error.
        let Some(offset) = offset_in(doc, line, character) else {
            return Ok(Some(Value::Null));
        };
        f(doc, analysis, DocContext { uri: &uri, state: &self.state }, offset).map(Some)
    }
}

/// Context handed to position-based handlers.
struct DocContext<'a> {
    uri: &'a str,
    state: &'a ServerState,
}

impl Default for LspServer {
    fn default() -> Self {
        Self::new()
    }
}
