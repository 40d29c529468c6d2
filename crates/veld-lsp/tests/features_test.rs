//! End-to-end feature scenarios over the wire.

mod common;

use common::*;
use serde_json::json;

const URI: &str = "file:///demo.veld";
const DEMO: &str = "func main() { let x = 1 + 2 }\n";

fn session_with_demo(extra: Vec<serde_json::Value>) -> Vec<serde_json::Value> {
    let mut messages = initialize_messages();
    messages.push(did_open(URI, DEMO));
    messages.extend(extra);
    run_session(&messages)
}

#[test]
fn completion_at_file_start_offers_func_keyword() {
    let frames = session_with_demo(vec![req(
        2,
        "textDocument/completion",
        json!({
            "textDocument": { "uri": URI },
            "position": { "line": 0, "character": 0 },
        }),
    )]);
    let items = response_for(&frames, 2)["result"]["items"].as_array().expect("items").clone();
    assert!(
        items.iter().any(|i| i["label"] == "func" && i["kind"] == 14),
        "expected a `func` keyword item"
    );
    assert_eq!(response_for(&frames, 2)["result"]["isIncomplete"], false);
}

#[test]
fn extract_variable_action_for_expression_selection() {
    // `1 + 2` sits at characters 22..27 of the demo line.
    let frames = session_with_demo(vec![req(
        2,
        "textDocument/codeAction",
        json!({
            "textDocument": { "uri": URI },
            "range": {
                "start": { "line": 0, "character": 22 },
                "end": { "line": 0, "character": 27 },
            },
            "context": { "diagnostics": [] },
        }),
    )]);
    let actions = response_for(&frames, 2)["result"].as_array().expect("actions").clone();
    let extract = actions
        .iter()
        .find(|a| a["kind"] == "refactor.extract")
        .expect("extract action");
    assert_eq!(extract["title"], "Refactor: extract to variable");
    let edits = extract["edit"]["changes"][URI].as_array().expect("edits");
    assert_eq!(edits.len(), 2);
    assert_eq!(edits[0]["newText"], "let extracted = 1 + 2\n");
    assert_eq!(edits[0]["range"]["start"]["character"], 0);
    assert_eq!(edits[1]["newText"], "extracted");
    assert_eq!(edits[1]["range"]["start"]["character"], 22);
    assert_eq!(edits[1]["range"]["end"]["character"], 27);
}

#[test]
fn extract_variable_snaps_sloppy_selection_to_expression() {
    // A selection that clips the declaration still extracts the
    // overlapping initializer expression.
    let frames = session_with_demo(vec![req(
        2,
        "textDocument/codeAction",
        json!({
            "textDocument": { "uri": URI },
            "range": {
                "start": { "line": 0, "character": 18 },
                "end": { "line": 0, "character": 23 },
            },
            "context": { "diagnostics": [] },
        }),
    )]);
    let actions = response_for(&frames, 2)["result"].as_array().expect("actions").clone();
    let extract = actions
        .iter()
        .find(|a| a["kind"] == "refactor.extract")
        .expect("extract action");
    let edits = extract["edit"]["changes"][URI].as_array().expect("edits");
    assert_eq!(edits[0]["newText"], "let extracted = 1 + 2\n");
    assert_eq!(edits[1]["newText"], "extracted");
}

#[test]
fn semantic_tokens_range_emits_valid_quintuples() {
    let frames = session_with_demo(vec![req(
        2,
        "textDocument/semanticTokens/range",
        json!({
            "textDocument": { "uri": URI },
            "range": {
                "start": { "line": 0, "character": 0 },
                "end": { "line": 0, "character": 20 },
            },
        }),
    )]);
    let data = response_for(&frames, 2)["result"]["data"].as_array().expect("data").clone();
    assert!(!data.is_empty());
    assert_eq!(data.len() % 5, 0);

    // Deltas are monotonic: line deltas >= 0 by type; a zero line delta
    // must carry a positive char delta after the first token.
    let quintuples: Vec<&[serde_json::Value]> =
        data.chunks(5).collect::<Vec<_>>();
    for (i, q) in quintuples.iter().enumerate() {
        assert!(q.iter().all(|v| v.as_u64().is_some()), "quintuple {i} not u32s: {q:?}");
        let length = q[2].as_u64().unwrap();
        assert!(length > 0, "zero-length token at {i}");
    }
}

#[test]
fn hover_shows_variable_detail() {
    let frames = session_with_demo(vec![req(
        2,
        "textDocument/hover",
        json!({
            "textDocument": { "uri": URI },
            "position": { "line": 0, "character": 18 },
        }),
    )]);
    // Character 18 is the literal `1`.
    let value = response_for(&frames, 2)["result"]["contents"]["value"]
        .as_str()
        .expect("markdown")
        .to_string();
    assert!(value.contains("```veld"), "{value}");
}

#[test]
fn definition_of_variable_points_at_declaration() {
    let source = "func main() {\n    let total = 1\n    total = total + 1\n}\n";
    let mut messages = initialize_messages();
    messages.push(did_open(URI, source));
    messages.push(req(
        2,
        "textDocument/definition",
        json!({
            "textDocument": { "uri": URI },
            "position": { "line": 2, "character": 6 },
        }),
    ));
    let frames = run_session(&messages);
    let locations = response_for(&frames, 2)["result"].as_array().expect("locations").clone();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0]["range"]["start"]["line"], 1);
    assert_eq!(locations[0]["range"]["start"]["character"], 8);
}

#[test]
fn folding_ranges_for_multiline_function() {
    let source = "func main() {\n    let x = 1\n}\n";
    let mut messages = initialize_messages();
    messages.push(did_open(URI, source));
    messages.push(req(
        2,
        "textDocument/foldingRange",
        json!({ "textDocument": { "uri": URI } }),
    ));
    let frames = run_session(&messages);
    let ranges = response_for(&frames, 2)["result"].as_array().expect("ranges").clone();
    assert_eq!(ranges.len(), 1);
    assert_eq!(ranges[0]["startLine"], 0);
    assert_eq!(ranges[0]["endLine"], 2);
    assert_eq!(ranges[0]["kind"], "region");
}

#[test]
fn formatting_fixes_indentation() {
    let source = "func main() {\nlet x = 1\n}\n";
    let mut messages = initialize_messages();
    messages.push(did_open(URI, source));
    messages.push(req(
        2,
        "textDocument/formatting",
        json!({
            "textDocument": { "uri": URI },
            "options": { "tabSize": 4, "insertSpaces": true },
        }),
    ));
    let frames = run_session(&messages);
    let edits = response_for(&frames, 2)["result"].as_array().expect("edits").clone();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0]["newText"], "    let x = 1\n");
}

#[test]
fn signature_help_inside_call() {
    let source = "func add(a: Int, b: Int) -> Int { return a + b }\nfunc main() { add(1, 2) }\n";
    let mut messages = initialize_messages();
    messages.push(did_open(URI, source));
    let character = source.lines().nth(1).unwrap().find("1,").unwrap() + 2;
    messages.push(req(
        2,
        "textDocument/signatureHelp",
        json!({
            "textDocument": { "uri": URI },
            "position": { "line": 1, "character": character },
        }),
    ));
    let frames = run_session(&messages);
    let help = &response_for(&frames, 2)["result"];
    assert_eq!(help["signatures"][0]["label"], "func add(a: Int, b: Int) -> Int");
    assert_eq!(help["activeParameter"], 1);
}

#[test]
fn inlay_hints_for_call_and_let() {
    let source = "func add(a: Int, b: Int) -> Int { return a + b }\nfunc main() { let s = add(1, 2) }\n";
    let mut messages = initialize_messages();
    messages.push(did_open(URI, source));
    messages.push(req(
        2,
        "textDocument/inlayHint",
        json!({
            "textDocument": { "uri": URI },
            "range": {
                "start": { "line": 1, "character": 0 },
                "end": { "line": 1, "character": 40 },
            },
        }),
    ));
    let frames = run_session(&messages);
    let hints = response_for(&frames, 2)["result"].as_array().expect("hints").clone();
    let labels: Vec<&str> = hints.iter().filter_map(|h| h["label"].as_str()).collect();
    assert!(labels.contains(&"a:"), "{labels:?}");
    assert!(labels.contains(&"b:"), "{labels:?}");
    assert!(labels.contains(&"-> Int"), "{labels:?}");
}

#[test]
fn document_symbols_outline() {
    let source = "func main() {}\nlet limit = 10\n";
    let mut messages = initialize_messages();
    messages.push(did_open(URI, source));
    messages.push(req(
        2,
        "textDocument/documentSymbol",
        json!({ "textDocument": { "uri": URI } }),
    ));
    let frames = run_session(&messages);
    let symbols = response_for(&frames, 2)["result"].as_array().expect("symbols").clone();
    assert_eq!(symbols.len(), 2);
    assert_eq!(symbols[0]["name"], "main");
    assert_eq!(symbols[0]["kind"], 12);
    assert_eq!(symbols[1]["name"], "limit");
    assert_eq!(symbols[1]["kind"], 13);
}
