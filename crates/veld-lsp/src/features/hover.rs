//! Hover provider.

use crate::analysis::Analysis;
use crate::convert::span_to_range;
use serde_json::{json, Value};
use veld_lexer::{token_at_offset, TokenKind};
use veld_parser::ast::{self, ExprKind, NodeRef};
use veld_position_tracking::Span;
use veld_workspace_index::Document;

/// Hover contents for the token at `offset`, or `None` off-token.
pub fn hover(doc: &Document, analysis: &Analysis, offset: usize) -> Option<Value> {
    let token = token_at_offset(&analysis.tokens, offset)
        .or_else(|| veld_lexer::identifier_at_offset(&analysis.tokens, offset))?;

    let mut sections: Vec<String> = Vec::new();

    let symbol = if token.kind == TokenKind::Identifier {
        analysis.symbols.best_match(&token.text, offset)
    } else {
        None
    };
    match symbol {
        Some(symbol) => sections.push(format!("```veld\n{}\n```", symbol.detail)),
        None => {
            sections.push(format!("```veld\n{}\n```", token.text));
            sections.push(format!("*{}*", token.kind.name()));
        }
    }

    if let Some(node) = ast::node_at_offset(&analysis.program, offset) {
        sections.push(node.describe());
        if let Some(summary) = node.type_summary() {
            sections.push(format!("Type: `{summary}`"));
        }
    }
    if let Some(hint) = type_hint(analysis, offset, token.kind, &token.text) {
        sections.push(hint);
    }

    sections.dedup();
    Some(json!({
        "contents": { "kind": "markdown", "value": sections.join("\n\n") },
        "range": span_to_range(&doc.text, &doc.line_index, Span::new(token.start, token.end)),
    }))
}

/// Best-effort type line for identifiers, calls, and literals.
fn type_hint(analysis: &Analysis, offset: usize, kind: TokenKind, text: &str) -> Option<String> {
    if kind == TokenKind::Identifier {
        let symbol = analysis.symbols.best_match(text, offset)?;
        if symbol.detail.starts_with("func ") {
            let (_, ty) = symbol.detail.rsplit_once("-> ")?;
            return Some(format!("Returns: `{}`", ty.trim()));
        }
        if let Some((_, ty)) = symbol.detail.split_once(": ") {
            return Some(format!("Type: `{}`", ty.trim()));
        }
        return None;
    }

    let node = ast::node_at_offset(&analysis.program, offset)?;
    if let NodeRef::Expr(expr) = node {
        if let Some(ty) = expr.literal_type_name() {
            return Some(format!("Type: `{ty}`"));
        }
        if let ExprKind::Call { .. } = expr.kind {
            let callee = expr.callee_name()?;
            let func = ast::find_func(&analysis.program, callee)?;
            let ret = func.ret.as_ref()?;
            return Some(format!("Returns: `{}`", ast::render_type(ret)));
        }
    }
    None
}
