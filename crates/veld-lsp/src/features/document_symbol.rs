//! Document outline provider.

use crate::analysis::Analysis;
use crate::convert::span_to_range;
use serde_json::{json, Value};
use veld_parser::ast::{self, Item};
use veld_symbol_table::SymbolKind;
use veld_workspace_index::Document;

/// Top-level declarations as `DocumentSymbol` values: `range` covers the
/// whole node, `selectionRange` the name.
pub fn document_symbols(doc: &Document, analysis: &Analysis) -> Vec<Value> {
    let mut out = Vec::new();
    for item in &analysis.program.items {
        let (name, name_span, kind, detail) = match item {
            Item::Func(f) => (
                f.name.clone(),
                f.name_span,
                SymbolKind::Function,
                Some(ast::render_signature(&f.name, &f.params, f.ret.as_ref())),
            ),
            Item::Let(l) => (
                l.name.clone(),
                l.name_span,
                if l.is_const { SymbolKind::Constant } else { SymbolKind::Variable },
                l.ty.as_ref().map(ast::render_type),
            ),
            Item::Struct(s) => (s.name.clone(), s.name_span, SymbolKind::Struct, None),
            Item::Enum(e) => (e.name.clone(), e.name_span, SymbolKind::Enum, None),
            Item::Trait(t) => (t.name.clone(), t.name_span, SymbolKind::Trait, None),
            Item::Import(_) => continue,
        };
        if name.is_empty() {
            continue;
        }
        let mut symbol = json!({
            "name": name,
            "kind": kind.to_lsp(),
            "range": span_to_range(&doc.text, &doc.line_index, item.span()),
            "selectionRange": span_to_range(&doc.text, &doc.line_index, name_span),
        });
        if let Some(detail) = detail {
            symbol["detail"] = json!(detail);
        }
        out.push(symbol);
    }
    out
}
