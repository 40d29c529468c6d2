//! Diagnostics publication order and idempotence over the wire.

mod common;

use common::*;
use serde_json::json;

const URI: &str = "file:///d.veld";

#[test]
fn open_with_parse_error_publishes_error_diagnostic() {
    let mut messages = initialize_messages();
    messages.push(did_open(URI, "func f( {\n}\n"));
    let frames = run_session(&messages);
    let published = notifications(&frames, "textDocument/publishDiagnostics");
    assert_eq!(published.len(), 1);
    let params = &published[0]["params"];
    assert_eq!(params["uri"], URI);
    assert_eq!(params["version"], 1);
    assert!(!params["diagnostics"].as_array().unwrap().is_empty());
    assert!(params["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .any(|d| d["severity"] == 1 && d["source"] == "veld-parser"));
}

#[test]
fn equal_sets_are_published_once() {
    let mut messages = initialize_messages();
    messages.push(did_open(URI, "func f( {\n}\n"));
    // A didSave does not change the text, so the set is identical.
    messages.push(notif(
        "textDocument/didSave",
        json!({ "textDocument": { "uri": URI } }),
    ));
    let frames = run_session(&messages);
    assert_eq!(notifications(&frames, "textDocument/publishDiagnostics").len(), 1);
}

#[test]
fn fixing_the_document_clears_diagnostics() {
    let mut messages = initialize_messages();
    messages.push(did_open(URI, "func f( {\n}\n"));
    messages.push(notif(
        "textDocument/didChange",
        json!({
            "textDocument": { "uri": URI, "version": 2 },
            "contentChanges": [{ "text": "func f() {\n}\n" }],
        }),
    ));
    let frames = run_session(&messages);
    let published = notifications(&frames, "textDocument/publishDiagnostics");
    assert_eq!(published.len(), 2);
    assert!(published[0]["params"]["diagnostics"].as_array().map(|a| !a.is_empty()).unwrap());
    assert!(published[1]["params"]["diagnostics"].as_array().map(|a| a.is_empty()).unwrap());
    assert_eq!(published[1]["params"]["version"], 2);
}

#[test]
fn close_clears_published_diagnostics() {
    let mut messages = initialize_messages();
    messages.push(did_open(URI, "func f( {\n}\n"));
    messages.push(notif(
        "textDocument/didClose",
        json!({ "textDocument": { "uri": URI } }),
    ));
    let frames = run_session(&messages);
    let published = notifications(&frames, "textDocument/publishDiagnostics");
    assert_eq!(published.len(), 2);
    assert!(published[1]["params"]["diagnostics"].as_array().map(|a| a.is_empty()).unwrap());
}

#[test]
fn incremental_change_applies_ranged_edit() {
    let mut messages = initialize_messages();
    messages.push(did_open(URI, "func f() { let x = 1 }\n"));
    // Replace `1` with `)`, introducing a parse error via a ranged edit.
    messages.push(notif(
        "textDocument/didChange",
        json!({
            "textDocument": { "uri": URI, "version": 2 },
            "contentChanges": [{
                "range": {
                    "start": { "line": 0, "character": 19 },
                    "end": { "line": 0, "character": 20 },
                },
                "text": ")",
            }],
        }),
    ));
    messages.push(req(
        3,
        "textDocument/hover",
        json!({
            "textDocument": { "uri": URI },
            "position": { "line": 0, "character": 15 },
        }),
    ));
    let frames = run_session(&messages);
    let published = notifications(&frames, "textDocument/publishDiagnostics");
    // Clean on open, then errors after the edit.
    assert_eq!(published.len(), 2);
    assert!(!published[1]["params"]["diagnostics"].as_array().unwrap().is_empty());
    // Subsequent requests observe the post-change state.
    assert!(response_for(&frames, 3)["result"].is_object());
}

#[test]
fn skipped_edit_surfaces_warning_and_batch_continues() {
    let mut messages = initialize_messages();
    messages.push(did_open(URI, "func f() {}\n"));
    messages.push(notif(
        "textDocument/didChange",
        json!({
            "textDocument": { "uri": URI, "version": 2 },
            "contentChanges": [
                {
                    "range": {
                        "start": { "line": 40, "character": 0 },
                        "end": { "line": 40, "character": 1 },
                    },
                    "text": "zzz",
                },
                {
                    "range": {
                        "start": { "line": 0, "character": 0 },
                        "end": { "line": 0, "character": 0 },
                    },
                    "text": "// note\n",
                },
            ],
        }),
    ));
    let frames = run_session(&messages);
    let published = notifications(&frames, "textDocument/publishDiagnostics");
    let last = published.last().expect("publish after change");
    let diags = last["params"]["diagnostics"].as_array().unwrap();
    assert!(
        diags.iter().any(|d| d["source"] == "veld-lsp"
            && d["message"].as_str().unwrap().contains("skipped")),
        "{diags:?}"
    );
}
