//! Signature help provider.
//!
//! Scans backward from the cursor for the nearest unmatched `(` on the
//! current line, backtracks over the callee identifier, and counts
//! top-level commas to find the active parameter.

use crate::analysis::Analysis;
use serde_json::{json, Value};
use veld_parser::ast;
use veld_symbol_table::SymbolKind;
use veld_workspace_index::Document;

/// Signature help at `offset`, or `None` outside a call's argument list.
pub fn signature_help(doc: &Document, analysis: &Analysis, offset: usize) -> Option<Value> {
    let (line, _) = doc.line_index.offset_to_position(&doc.text, offset)?;
    let line_span = doc.line_index.line_span(&doc.text, line as usize)?;
    let line_text = &doc.text[line_span.start..offset.clamp(line_span.start, line_span.end)];

    let open_paren = find_unmatched_open(line_text)?;
    let callee = callee_before(&line_text[..open_paren])?;
    let active_parameter = count_top_level_commas(&line_text[open_paren + 1..]);

    let symbol_label = analysis
        .symbols
        .entries(callee)
        .iter()
        .find(|s| s.kind == SymbolKind::Function)
        .map(|s| s.detail.clone());

    let mut signature = match &symbol_label {
        Some(label) => json!({ "label": label }),
        None => json!({ "label": format!("{callee}(…)") }),
    };

    if let Some(func) = ast::find_func(&analysis.program, callee) {
        let parameters: Vec<Value> = func
            .params
            .iter()
            .map(|p| {
                let label = match &p.ty {
                    Some(ty) => format!("{}: {}", p.name, ast::render_type(ty)),
                    None => p.name.clone(),
                };
                json!({ "label": label })
            })
            .collect();
        signature["parameters"] = json!(parameters);

        let mut doc_lines = Vec::new();
        if let Some(ret) = &func.ret {
            doc_lines.push(format!("Returns `{}`.", ast::render_type(ret)));
        }
        if !func.params.is_empty() {
            let names: Vec<&str> = func.params.iter().map(|p| p.name.as_str()).collect();
            doc_lines.push(format!("Parameters: {}.", names.join(", ")));
        }
        if !doc_lines.is_empty() {
            signature["documentation"] = json!(doc_lines.join(" "));
        }
    }

    Some(json!({
        "signatures": [signature],
        "activeSignature": 0,
        "activeParameter": active_parameter,
    }))
}

/// Byte index (within the line) of the nearest `(` with no matching `)`
/// between it and the end of the slice.
fn find_unmatched_open(line: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, b) in line.bytes().enumerate().rev() {
        match b {
            b')' => depth += 1,
            b'(' => {
                if depth == 0 {
                    return Some(i);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    None
}

/// The identifier run immediately before the opening paren.
fn callee_before(prefix: &str) -> Option<&str> {
    let trimmed = prefix.trim_end();
    let bytes = trimmed.as_bytes();
    let mut start = trimmed.len();
    while start > 0 {
        let b = bytes[start - 1];
        if b.is_ascii_alphanumeric() || b == b'_' {
            start -= 1;
        } else {
            break;
        }
    }
    let name = &trimmed[start..];
    if name.is_empty() || name.as_bytes()[0].is_ascii_digit() {
        return None;
    }
    Some(name)
}

/// Count commas at parenthesis depth zero.
fn count_top_level_commas(args: &str) -> u32 {
    let mut depth = 0i32;
    let mut commas = 0u32;
    for b in args.bytes() {
        match b {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth -= 1,
            b',' if depth == 0 => commas += 1,
            _ => {}
        }
    }
    commas
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn setup(text: &str) -> (Document, Analysis) {
        (Document::new("file:///g.veld".into(), 1, text.into()), Analysis::full(text))
    }

    #[test]
    fn test_signature_from_symbol_index() {
        let src = "func add(a: Int, b: Int) -> Int { return a + b }\nfunc main() { add( }\n";
        let (doc, analysis) = setup(src);
        let offset = src.rfind("add(").unwrap() + 4;
        let help = signature_help(&doc, &analysis, offset).expect("help");
        assert_eq!(help["signatures"][0]["label"], "func add(a: Int, b: Int) -> Int");
        assert_eq!(help["activeParameter"], 0);
        assert_eq!(help["signatures"][0]["parameters"][1]["label"], "b: Int");
    }

    #[test]
    fn test_active_parameter_counts_top_level_commas() {
        let src = "func add(a: Int, b: Int) -> Int { return a + b }\nfunc main() { add(f(1, 2), \n}";
        let (doc, analysis) = setup(src);
        let offset = src.rfind(", \n").unwrap() + 2;
        let help = signature_help(&doc, &analysis, offset).expect("help");
        // The comma inside f(1, 2) is nested; only one top-level comma.
        assert_eq!(help["activeParameter"], 1);
    }

    #[test]
    fn test_unknown_callee_gets_placeholder_label() {
        let src = "func main() { mystery(1, }\n";
        let (doc, analysis) = setup(src);
        let offset = src.rfind(", }").unwrap() + 1;
        let help = signature_help(&doc, &analysis, offset).expect("help");
        assert_eq!(help["signatures"][0]["label"], "mystery(…)");
        assert_eq!(help["activeParameter"], 1);
    }

    #[test]
    fn test_outside_call_returns_none() {
        let src = "func main() { let x = 1 }\n";
        let (doc, analysis) = setup(src);
        assert!(signature_help(&doc, &analysis, src.find('1').unwrap()).is_none());
    }

    #[test]
    fn test_documentation_mentions_return_type() {
        let src = "func area(w: Int, h: Int) -> Int { return w * h }\nfunc main() { area( }\n";
        let (doc, analysis) = setup(src);
        let offset = src.rfind("area(").unwrap() + 5;
        let help = signature_help(&doc, &analysis, offset).expect("help");
        let docs = help["signatures"][0]["documentation"].as_str().unwrap();
        assert!(docs.contains("Returns `Int`"), "{docs}");
    }
}
