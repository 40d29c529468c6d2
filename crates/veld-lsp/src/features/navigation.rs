//! Definition and type-definition providers.

use crate::analysis::Analysis;
use crate::convert::location;
use serde_json::Value;
use veld_lexer::identifier_at_offset;
use veld_parser::ast::{self, NodeRef};
use veld_workspace_index::Document;

/// All declaration sites of the identifier at `offset`, preferring entries
/// whose scope contains the query position.
pub fn definition(uri: &str, doc: &Document, analysis: &Analysis, offset: usize) -> Vec<Value> {
    let Some(token) = identifier_at_offset(&analysis.tokens, offset) else {
        return Vec::new();
    };
    let entries = analysis.symbols.entries(&token.text);
    let scoped: Vec<_> = entries.iter().filter(|s| s.scope_span.contains(offset)).collect();
    let picks: Vec<_> = if scoped.is_empty() { entries.iter().collect() } else { scoped };
    picks
        .into_iter()
        .map(|symbol| location(uri, &doc.text, &doc.line_index, symbol.decl_span))
        .collect()
}

/// Span of the type node at (or governing) `offset`.
pub fn type_definition(uri: &str, doc: &Document, analysis: &Analysis, offset: usize) -> Vec<Value> {
    if let Some(NodeRef::Type(ty)) = ast::node_at_offset(&analysis.program, offset) {
        return vec![location(uri, &doc.text, &doc.line_index, ty.span)];
    }

    // The node is not itself a type: fall back to the declared type of the
    // closest enclosing declaration.
    let mut best: Option<(usize, &veld_parser::ast::TypeExpr)> = None;
    ast::visit(&analysis.program, &mut |node| {
        let (span, ty) = match node {
            NodeRef::Let(l) => (l.span, l.ty.as_ref()),
            NodeRef::Param(p) => (p.span, p.ty.as_ref()),
            _ => return,
        };
        if let Some(ty) = ty {
            if span.contains(offset) {
                match best {
                    Some((len, _)) if len <= span.len() => {}
                    _ => best = Some((span.len(), ty)),
                }
            }
        }
    });
    best.map(|(_, ty)| vec![location(uri, &doc.text, &doc.line_index, ty.span)])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn setup(text: &str) -> (Document, Analysis) {
        (Document::new("file:///n.veld".into(), 1, text.into()), Analysis::full(text))
    }

    #[test]
    fn test_definition_of_local_use() {
        let src = "func f() { let total = 1\n return total }\n";
        let (doc, analysis) = setup(src);
        let use_offset = src.rfind("total").unwrap();
        let locations = definition("file:///n.veld", &doc, &analysis, use_offset);
        assert_eq!(locations.len(), 1);
        let decl_offset = src.find("total").unwrap();
        let (line, character) =
            doc.line_index.offset_to_position(&doc.text, decl_offset).unwrap();
        assert_eq!(locations[0]["range"]["start"]["line"], line);
        assert_eq!(locations[0]["range"]["start"]["character"], character);
    }

    #[test]
    fn test_definition_prefers_enclosing_scope() {
        let src = "func f() { let x = 1 }\nfunc g() { let x = 2\n return x }\n";
        let (doc, analysis) = setup(src);
        let use_offset = src.rfind("x }").unwrap();
        let locations = definition("file:///n.veld", &doc, &analysis, use_offset);
        assert_eq!(locations.len(), 1);
        let g_line = 1;
        assert!(locations[0]["range"]["start"]["line"].as_u64().unwrap() >= g_line);
    }

    #[test]
    fn test_definition_on_non_identifier_is_empty() {
        let src = "func f() { let x = 1 }\n";
        let (doc, analysis) = setup(src);
        assert!(definition("file:///n.veld", &doc, &analysis, src.find('{').unwrap()).is_empty());
    }

    #[test]
    fn test_type_definition_on_type_node() {
        let src = "func f(a: Int) -> Bool { return true }\n";
        let (doc, analysis) = setup(src);
        let offset = src.find("Bool").unwrap();
        let locations = type_definition("file:///n.veld", &doc, &analysis, offset);
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0]["range"]["start"]["character"], src.find("Bool").unwrap() as u64);
    }

    #[test]
    fn test_type_definition_falls_back_to_declared_type() {
        let src = "func f() { let x: Int = 1 }\n";
        let (doc, analysis) = setup(src);
        let offset = src.find('x').unwrap();
        let locations = type_definition("file:///n.veld", &doc, &analysis, offset);
        assert_eq!(locations.len(), 1);
        let int_at = src.find("Int").unwrap() as u64;
        assert_eq!(locations[0]["range"]["start"]["character"], int_at);
    }
}
