//! References and document-highlight providers.

use crate::analysis::Analysis;
use crate::convert::location;
use crate::state::ServerState;
use serde_json::{json, Value};
use veld_lexer::{identifier_at_offset, TokenKind};
use veld_position_tracking::{LineIndex, Span};
use veld_workspace_index::Document;

/// All references to the identifier at `offset` within its scope, plus
/// declaration sites of the same name across the workspace.
pub fn references(
    uri: &str,
    doc: &Document,
    analysis: &Analysis,
    state: &ServerState,
    offset: usize,
    include_declaration: bool,
) -> Vec<Value> {
    let Some(token) = identifier_at_offset(&analysis.tokens, offset) else {
        return Vec::new();
    };
    let name = token.text.clone();

    let scope = analysis
        .symbols
        .best_match(&name, offset)
        .map(|s| s.scope_span)
        .unwrap_or(Span::new(0, doc.text.len()));
    let decl_spans: Vec<Span> =
        analysis.symbols.entries(&name).iter().map(|s| s.decl_span).collect();

    let mut out = Vec::new();
    for tok in &analysis.tokens {
        if tok.kind != TokenKind::Identifier || tok.text != name {
            continue;
        }
        let span = Span::new(tok.start, tok.end);
        if !scope.contains_span(span) {
            continue;
        }
        if !include_declaration && decl_spans.contains(&span) {
            continue;
        }
        out.push(location(uri, &doc.text, &doc.line_index, span));
    }

    // Cross-file declaration sites from the workspace index. The guard is
    // dropped before any file read so a queued writer cannot wedge us.
    let declarations = { state.workspace.read().declarations_of(&name) };
    for decl in declarations {
        if decl.uri == uri {
            continue;
        }
        let Some(text) = state.text_for_uri(&decl.uri) else { continue };
        let line_index = LineIndex::new(&text);
        out.push(location(&decl.uri, &text, &line_index, decl.span));
    }

    out
}

/// All same-name identifier occurrences in the document.
pub fn document_highlight(doc: &Document, analysis: &Analysis, offset: usize) -> Vec<Value> {
    let Some(token) = identifier_at_offset(&analysis.tokens, offset) else {
        return Vec::new();
    };
    let name = token.text.clone();
    analysis
        .tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Identifier && t.text == name)
        .map(|t| {
            json!({
                "range": crate::convert::span_to_range(
                    &doc.text,
                    &doc.line_index,
                    Span::new(t.start, t.end),
                ),
                "kind": 1,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn setup(text: &str) -> (Document, Analysis, ServerState) {
        (
            Document::new("file:///r.veld".into(), 1, text.into()),
            Analysis::full(text),
            ServerState::new(),
        )
    }

    #[test]
    fn test_references_scoped_to_function() {
        let src = "func f() { let n = 1\n n = n + 1 }\nfunc g() { let n = 9 }\n";
        let (doc, analysis, state) = setup(src);
        let offset = src.find("n = 1").unwrap();
        let refs =
            references("file:///r.veld", &doc, &analysis, &state, offset, true);
        // n appears three times in f; the n in g is a sibling scope.
        assert_eq!(refs.len(), 3);
    }

    #[test]
    fn test_references_can_exclude_declaration() {
        let src = "func f() { let n = 1\n return n }\n";
        let (doc, analysis, state) = setup(src);
        let offset = src.find('n').unwrap();
        let with_decl = references("file:///r.veld", &doc, &analysis, &state, offset, true);
        let without = references("file:///r.veld", &doc, &analysis, &state, offset, false);
        assert_eq!(with_decl.len(), 2);
        assert_eq!(without.len(), 1);
    }

    #[test]
    fn test_cross_file_declarations_included() {
        let src = "func main() { helper() }\n";
        let (doc, analysis, mut state) = setup(src);
        state.open_document("file:///lib.veld", 1, "func helper() {}\n".to_string());
        let offset = src.find("helper").unwrap();
        let refs = references("file:///r.veld", &doc, &analysis, &state, offset, true);
        assert!(refs.iter().any(|r| r["uri"] == "file:///lib.veld"));
    }

    #[test]
    fn test_document_highlight_matches_all_occurrences() {
        let src = "func f(v: Int) { return v + v }\n";
        let (doc, analysis, _) = setup(src);
        let highlights = document_highlight(&doc, &analysis, src.find('v').unwrap());
        assert_eq!(highlights.len(), 3);
        assert!(highlights.iter().all(|h| h["kind"] == 1));
    }
}
