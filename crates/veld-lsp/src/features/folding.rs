//! Folding range provider.
//!
//! Brace-delimited multi-line regions from a linear scan over the token
//! stream, using a stack of opening-brace line numbers. Braces inside
//! strings and comments never reach the stream as brace tokens, so they
//! cannot confuse the stack.

use crate::analysis::Analysis;
use serde_json::{json, Value};
use veld_lexer::TokenKind;
use veld_workspace_index::Document;

/// Folding ranges for every `{ ... }` pair spanning more than one line.
pub fn folding_ranges(doc: &Document, analysis: &Analysis) -> Vec<Value> {
    let mut stack: Vec<u32> = Vec::new();
    let mut out = Vec::new();

    for token in &analysis.tokens {
        match token.kind {
            TokenKind::LeftBrace => {
                let (line, _) = doc
                    .line_index
                    .offset_to_position(&doc.text, token.start)
                    .unwrap_or((0, 0));
                stack.push(line);
            }
            TokenKind::RightBrace => {
                let Some(start_line) = stack.pop() else { continue };
                let (end_line, _) = doc
                    .line_index
                    .offset_to_position(&doc.text, token.start)
                    .unwrap_or((0, 0));
                if end_line > start_line {
                    out.push(json!({
                        "startLine": start_line,
                        "endLine": end_line,
                        "kind": "region",
                    }));
                }
            }
            _ => {}
        }
    }

    out.sort_by_key(|r| (r["startLine"].as_u64(), r["endLine"].as_u64()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ranges(text: &str) -> Vec<Value> {
        let doc = Document::new("file:///f.veld".into(), 1, text.into());
        let analysis = Analysis::full(text);
        folding_ranges(&doc, &analysis)
    }

    #[test]
    fn test_multiline_blocks_fold() {
        let src = "func f() {\n    if x {\n        y()\n    }\n}\n";
        let out = ranges(src);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["startLine"], 0);
        assert_eq!(out[0]["endLine"], 4);
        assert_eq!(out[1]["startLine"], 1);
        assert_eq!(out[1]["endLine"], 3);
        assert!(out.iter().all(|r| r["kind"] == "region"));
    }

    #[test]
    fn test_single_line_braces_do_not_fold() {
        assert!(ranges("func f() { let x = 1 }\n").is_empty());
    }

    #[test]
    fn test_count_matches_multiline_open_braces() {
        let src = "func a() {\n}\nfunc b() { x() }\nfunc c() {\n    y()\n}\n";
        assert_eq!(ranges(src).len(), 2);
    }

    #[test]
    fn test_braces_in_strings_ignored() {
        let src = "func f() {\n    let s = \"{\"\n}\n";
        assert_eq!(ranges(src).len(), 1);
    }

    #[test]
    fn test_unbalanced_braces_do_not_panic() {
        assert!(ranges("}}}\n").is_empty());
        let src = "func f() {\n    {\n";
        let _ = ranges(src);
    }
}
