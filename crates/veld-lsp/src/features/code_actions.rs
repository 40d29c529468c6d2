//! Code actions provider.
//!
//! Three families: a whole-document "Remove trailing spaces" quick fix,
//! one insertion quick fix per parser-suggested repair, and an
//! extract-to-variable refactor for single-line expression selections.

use crate::analysis::Analysis;
use crate::convert::{span_to_range, text_edit};
use serde_json::{json, Value};
use veld_lexer::TokenKind;
use veld_position_tracking::Span;
use veld_workspace_index::Document;

/// All code actions for the requested selection.
pub fn code_actions(
    uri: &str,
    doc: &Document,
    analysis: &Analysis,
    selection: Span,
) -> Vec<Value> {
    let mut actions = Vec::new();

    if let Some(action) = remove_trailing_spaces(uri, doc) {
        actions.push(action);
    }

    for error in &analysis.parse_errors {
        let Some(fix) = &error.suggestion else { continue };
        let insert_at = Span::empty(fix.offset.min(doc.text.len()));
        actions.push(json!({
            "title": format!("Insert `{}`", fix.replacement.trim()),
            "kind": "quickfix",
            "edit": {
                "changes": {
                    uri: [text_edit(&doc.text, &doc.line_index, insert_at, &fix.replacement)],
                }
            },
        }));
    }

    if let Some(action) = extract_variable(uri, doc, analysis, selection) {
        actions.push(action);
    }

    actions
}

fn remove_trailing_spaces(uri: &str, doc: &Document) -> Option<Value> {
    let mut edits = Vec::new();
    let mut offset = 0;
    for line in doc.text.split_inclusive('\n') {
        let body = line.trim_end_matches(['\n', '\r']);
        let trimmed = body.trim_end();
        if trimmed.len() < body.len() {
            let span = Span::new(offset + trimmed.len(), offset + body.len());
            edits.push(text_edit(&doc.text, &doc.line_index, span, ""));
        }
        offset += line.len();
    }
    if edits.is_empty() {
        return None;
    }
    Some(json!({
        "title": "Remove trailing spaces",
        "kind": "quickfix",
        "edit": { "changes": { uri: edits } },
    }))
}

/// Offer `let extracted = <selection>` when the selection is a plausible
/// single-line expression. A selection that is not itself an expression
/// snaps to the widest single-line expression node it overlaps.
fn extract_variable(
    uri: &str,
    doc: &Document,
    analysis: &Analysis,
    selection: Span,
) -> Option<Value> {
    if selection.is_empty() || selection.end > doc.text.len() {
        return None;
    }
    let raw = doc.text.get(selection.start..selection.end)?;
    if raw.trim().is_empty() || raw.contains('\n') {
        return None;
    }
    let selection = if is_expression_like(raw) {
        selection
    } else {
        snap_to_expression(doc, analysis, selection)?
    };
    let text = doc.text.get(selection.start..selection.end)?;

    let (line, _) = doc.line_index.offset_to_position(&doc.text, selection.start)?;
    let line_start = doc.line_index.position_to_offset(&doc.text, line, 0)?;

    let declaration = format!("let extracted = {text}\n");
    Some(json!({
        "title": "Refactor: extract to variable",
        "kind": "refactor.extract",
        "edit": {
            "changes": {
                uri: [
                    text_edit(&doc.text, &doc.line_index, Span::empty(line_start), &declaration),
                    json!({
                        "range": span_to_range(&doc.text, &doc.line_index, selection),
                        "newText": "extracted",
                    }),
                ]
            }
        },
    }))
}

/// The widest expression node overlapping the selection whose span stays
/// on one line and reads as an expression.
fn snap_to_expression(doc: &Document, analysis: &Analysis, selection: Span) -> Option<Span> {
    let mut best: Option<Span> = None;
    veld_parser::ast::visit(&analysis.program, &mut |node| {
        let veld_parser::ast::NodeRef::Expr(expr) = node else { return };
        if !expr.span.overlaps(selection) {
            return;
        }
        let Some(text) = doc.text.get(expr.span.start..expr.span.end) else { return };
        if text.contains('\n') || !is_expression_like(text) {
            return;
        }
        match best {
            Some(span) if span.len() >= expr.span.len() => {}
            _ => best = Some(expr.span),
        }
    });
    best
}

/// A shallow shape check: balanced parens, no braces, no statement
/// punctuation, no bare assignment, at least one token.
fn is_expression_like(text: &str) -> bool {
    let tokens = veld_lexer::tokenize(text);
    if tokens.is_empty() {
        return false;
    }
    let mut paren_depth = 0i32;
    for token in &tokens {
        match token.kind {
            TokenKind::LeftBrace | TokenKind::RightBrace | TokenKind::Semicolon => return false,
            TokenKind::Keyword => {
                if token.text.as_ref() != "true" && token.text.as_ref() != "false" {
                    return false;
                }
            }
            TokenKind::Operator if token.text.as_ref() == "=" => return false,
            TokenKind::LeftParen => paren_depth += 1,
            TokenKind::RightParen => {
                paren_depth -= 1;
                if paren_depth < 0 {
                    return false;
                }
            }
            TokenKind::Error => return false,
            _ => {}
        }
    }
    paren_depth == 0
}
