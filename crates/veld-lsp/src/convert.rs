//! Conversions between wire JSON, byte offsets, and LSP positions.
//!
//! Every UTF-16 calculation delegates to the position codec; nothing in the
//! feature providers does its own character arithmetic.

use serde_json::{json, Value};
use veld_lsp_protocol::JsonRpcError;
use veld_position_tracking::{LineIndex, Span};
use veld_workspace_index::Document;

/// Extract `textDocument.uri` from request params.
pub fn text_document_uri(params: Option<&Value>) -> Result<String, JsonRpcError> {
    params
        .and_then(|p| p["textDocument"]["uri"].as_str())
        .map(str::to_string)
        .ok_or_else(|| JsonRpcError::invalid_params("missing textDocument.uri"))
}

/// Extract `(uri, line, character)` from positional request params.
pub fn position_params(params: Option<&Value>) -> Result<(String, u32, u32), JsonRpcError> {
    let uri = text_document_uri(params)?;
    let position = params
        .map(|p| &p["position"])
        .ok_or_else(|| JsonRpcError::invalid_params("missing position"))?;
    let line = position["line"]
        .as_u64()
        .ok_or_else(|| JsonRpcError::invalid_params("missing position.line"))?;
    let character = position["character"]
        .as_u64()
        .ok_or_else(|| JsonRpcError::invalid_params("missing position.character"))?;
    Ok((uri, line as u32, character as u32))
}

/// Extract a `range` object as `((line, char), (line, char))`.
pub fn range_param(range: &Value) -> Result<((u32, u32), (u32, u32)), JsonRpcError> {
    let get = |v: &Value, key: &str| -> Result<(u32, u32), JsonRpcError> {
        let p = &v[key];
        match (p["line"].as_u64(), p["character"].as_u64()) {
            (Some(line), Some(character)) => Ok((line as u32, character as u32)),
            _ => Err(JsonRpcError::invalid_params(format!("missing range.{key}"))),
        }
    };
    Ok((get(range, "start")?, get(range, "end")?))
}

/// Resolve a request position to a byte offset in `doc`.
pub fn offset_in(doc: &Document, line: u32, character: u32) -> Option<usize> {
    doc.line_index.position_to_offset(&doc.text, line, character)
}

/// Render a byte span as an LSP range value.
pub fn span_to_range(text: &str, line_index: &LineIndex, span: Span) -> Value {
    let ((sl, sc), (el, ec)) =
        line_index.span_to_range(text, span).unwrap_or(((0, 0), (0, 0)));
    json!({
        "start": { "line": sl, "character": sc },
        "end": { "line": el, "character": ec },
    })
}

/// Render a `Location` value.
pub fn location(uri: &str, text: &str, line_index: &LineIndex, span: Span) -> Value {
    json!({ "uri": uri, "range": span_to_range(text, line_index, span) })
}

/// Render a `TextEdit` value.
pub fn text_edit(text: &str, line_index: &LineIndex, span: Span, new_text: &str) -> Value {
    json!({ "range": span_to_range(text, line_index, span), "newText": new_text })
}
