//! Shared harness for driving the server over in-memory streams.
#![allow(dead_code)]

use serde_json::{json, Value};
use std::io::Cursor;
use veld_lsp::LspServer;

/// Frame a JSON value with Content-Length headers.
pub fn frame(value: &Value) -> String {
    let body = value.to_string();
    format!("Content-Length: {}\r\n\r\n{}", body.len(), body)
}

/// Build a request message.
pub fn req(id: i64, method: &str, params: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params })
}

/// Build a notification message.
pub fn notif(method: &str, params: Value) -> Value {
    json!({ "jsonrpc": "2.0", "method": method, "params": params })
}

/// The standard session prelude.
pub fn initialize_messages() -> Vec<Value> {
    vec![req(1, "initialize", json!({})), notif("initialized", json!({}))]
}

/// `didOpen` for a single document.
pub fn did_open(uri: &str, text: &str) -> Value {
    notif(
        "textDocument/didOpen",
        json!({ "textDocument": { "uri": uri, "version": 1, "text": text } }),
    )
}

/// Run a fresh server over the framed messages; parse every output frame.
pub fn run_session(messages: &[Value]) -> Vec<Value> {
    let input: String = messages.iter().map(frame).collect();
    run_raw(&input)
}

/// Run a fresh server over raw bytes (for malformed-frame tests).
pub fn run_raw(input: &str) -> Vec<Value> {
    let mut server = LspServer::new();
    let mut reader = Cursor::new(input.as_bytes().to_vec());
    let mut output = Vec::new();
    server.run_with(&mut reader, &mut output).expect("server run");
    parse_frames(&output)
}

/// Split framed output back into JSON values.
pub fn parse_frames(mut output: &[u8]) -> Vec<Value> {
    let mut frames = Vec::new();
    while !output.is_empty() {
        let text = std::str::from_utf8(output).expect("utf8 output");
        let header_end = text.find("\r\n\r\n").expect("header terminator") + 4;
        let length: usize = text[..header_end]
            .lines()
            .find_map(|line| line.strip_prefix("Content-Length: "))
            .expect("content-length header")
            .trim()
            .parse()
            .expect("numeric length");
        let body = &output[header_end..header_end + length];
        frames.push(serde_json::from_slice(body).expect("json body"));
        output = &output[header_end + length..];
    }
    frames
}

/// The response frame with the given id.
pub fn response_for(frames: &[Value], id: i64) -> &Value {
    frames
        .iter()
        .find(|f| f["id"] == json!(id))
        .unwrap_or_else(|| panic!("no response with id {id} in {frames:?}"))
}

/// All notification frames with the given method.
pub fn notifications<'a>(frames: &'a [Value], method: &str) -> Vec<&'a Value> {
    frames.iter().filter(|f| f["method"] == method).collect()
}
