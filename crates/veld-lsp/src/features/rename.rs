//! Rename provider: prepare, scope-safe in-file rename, and cross-file
//! declaration renames through the workspace index.

use crate::analysis::Analysis;
use crate::convert::{span_to_range, text_edit};
use crate::state::ServerState;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde_json::{json, Map, Value};
use veld_lexer::{identifier_at_offset, TokenKind, KEYWORDS};
use veld_lsp_protocol::JsonRpcError;
use veld_position_tracking::{LineIndex, Span};
use veld_workspace_index::Document;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    let pattern = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("literal pattern compiles");
    pattern
});

/// `prepareRename`: the identifier range and its current text.
pub fn prepare_rename(doc: &Document, analysis: &Analysis, offset: usize) -> Option<Value> {
    let token = identifier_at_offset(&analysis.tokens, offset)?;
    Some(json!({
        "range": span_to_range(&doc.text, &doc.line_index, Span::new(token.start, token.end)),
        "placeholder": token.text.as_ref(),
    }))
}

/// `rename`: replace the identifier within its scope, then rename matching
/// declarations across the workspace, skipping files that already declare
/// the new name.
pub fn rename(
    uri: &str,
    doc: &Document,
    analysis: &Analysis,
    state: &ServerState,
    offset: usize,
    new_name: &str,
) -> Result<Value, JsonRpcError> {
    if !IDENTIFIER.is_match(new_name) || KEYWORDS.contains(new_name) {
        return Err(JsonRpcError::invalid_params(format!(
            "`{new_name}` is not a valid identifier"
        )));
    }
    let Some(token) = identifier_at_offset(&analysis.tokens, offset) else {
        return Err(JsonRpcError::invalid_params("no identifier at position"));
    };
    let old_name = token.text.clone();
    if old_name.as_ref() == new_name {
        return Ok(json!({ "changes": {} }));
    }

    let scope = analysis
        .symbols
        .best_match(&old_name, offset)
        .map(|s| s.scope_span)
        .unwrap_or(Span::new(0, doc.text.len()));

    // Scope-level conflict: the new name already exists inside the origin
    // scope, so the rename would capture or collide.
    let conflict = analysis.tokens.iter().any(|t| {
        t.kind == TokenKind::Identifier
            && t.text.as_ref() == new_name
            && scope.contains_span(Span::new(t.start, t.end))
    });
    if conflict {
        return Err(JsonRpcError::invalid_params(format!(
            "cannot rename `{old_name}` to `{new_name}`: `{new_name}` already exists in this scope"
        )));
    }

    let mut changes: Map<String, Value> = Map::new();

    let origin_edits: Vec<Value> = analysis
        .tokens
        .iter()
        .filter(|t| {
            t.kind == TokenKind::Identifier
                && t.text == old_name
                && scope.contains_span(Span::new(t.start, t.end))
        })
        .map(|t| text_edit(&doc.text, &doc.line_index, Span::new(t.start, t.end), new_name))
        .collect();
    changes.insert(uri.to_string(), json!(origin_edits));

    // Cross-file declaration renames. Conflict checks happen under one
    // read guard; file reads happen after it is dropped.
    let mut by_uri: FxHashMap<String, Vec<Span>> = FxHashMap::default();
    {
        let workspace = state.workspace.read();
        for decl in workspace.declarations_of(&old_name) {
            if decl.uri != uri {
                by_uri.entry(decl.uri).or_default().push(decl.span);
            }
        }
        // Declaration-level conflict: a file already declaring the new
        // name receives no edits at all.
        by_uri.retain(|other_uri, _| !workspace.uri_declares(other_uri, new_name));
    }
    for (other_uri, spans) in by_uri {
        let Some(text) = state.text_for_uri(&other_uri) else { continue };
        let line_index = LineIndex::new(&text);
        let edits: Vec<Value> =
            spans.iter().map(|span| text_edit(&text, &line_index, *span, new_name)).collect();
        changes.insert(other_uri, json!(edits));
    }

    Ok(json!({ "changes": changes }))
}
