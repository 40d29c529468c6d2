//! Wire-level framing robustness, driven through the full server loop.

mod common;

use common::*;
use serde_json::json;

#[test]
fn oversized_content_length_recovers() {
    let mut input = String::from("Content-Length: 99999999\r\n\r\n");
    input.push_str(&frame(&req(1, "initialize", json!({}))));
    let frames = run_raw(&input);

    let errors: Vec<_> = frames
        .iter()
        .filter(|f| f["error"]["code"] == -32600 && f["id"].is_null())
        .collect();
    assert_eq!(errors.len(), 1, "exactly one framing error: {frames:?}");
    assert_eq!(response_for(&frames, 1)["result"]["capabilities"]["positionEncoding"], "utf-16");
}

#[test]
fn lowercase_content_length_header_works() {
    let body = req(1, "initialize", json!({})).to_string();
    let input = format!("content-length: {}\r\n\r\n{}", body.len(), body);
    let frames = run_raw(&input);
    assert_eq!(response_for(&frames, 1)["result"]["capabilities"]["positionEncoding"], "utf-16");
}

#[test]
fn header_line_flood_recovers() {
    let mut input = String::new();
    for i in 0..150 {
        input.push_str(&format!("X-Pad-{i}: x\r\n"));
    }
    input.push_str("\r\n");
    input.push_str(&frame(&req(1, "initialize", json!({}))));
    let frames = run_raw(&input);

    assert_eq!(
        frames.iter().filter(|f| f["error"]["code"] == -32600).count(),
        1,
        "{frames:?}"
    );
    assert!(response_for(&frames, 1)["result"].is_object());
}

#[test]
fn malformed_json_body_is_parse_error() {
    let garbage = "{definitely not json";
    let mut input = format!("Content-Length: {}\r\n\r\n{}", garbage.len(), garbage);
    input.push_str(&frame(&req(1, "initialize", json!({}))));
    let frames = run_raw(&input);

    assert!(frames.iter().any(|f| f["error"]["code"] == -32700), "{frames:?}");
    assert!(response_for(&frames, 1)["result"].is_object());
}

#[test]
fn missing_content_length_is_invalid_request() {
    let mut input = String::from("Content-Type: application/json\r\n\r\n");
    input.push_str(&frame(&req(1, "initialize", json!({}))));
    let frames = run_raw(&input);
    assert!(frames.iter().any(|f| f["error"]["code"] == -32600));
    assert!(response_for(&frames, 1)["result"].is_object());
}
