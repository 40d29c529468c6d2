//! Semantic tokens provider (full and range).
//!
//! Emits the LSP delta-encoded quintuple stream in UTF-16 units, using the
//! legend fixed in the protocol crate. Multi-line tokens are truncated to
//! their head line.

use crate::analysis::Analysis;
use serde_json::{json, Value};
use veld_lexer::{Token, TokenKind, TYPE_KEYWORDS};
use veld_symbol_table::{SymbolKind, SymbolTable};
use veld_position_tracking::Span;
use veld_workspace_index::Document;

// Indices into veld_lsp_protocol::TOKEN_TYPES.
const TYPE_KEYWORD: u32 = 0;
const TYPE_FUNCTION: u32 = 1;
const TYPE_VARIABLE: u32 = 2;
const TYPE_TYPE: u32 = 3;
const TYPE_STRING: u32 = 4;
const TYPE_NUMBER: u32 = 5;
const TYPE_COMMENT: u32 = 6;
const TYPE_OPERATOR: u32 = 7;

// Bit in the modifier set.
const MOD_DECLARATION: u32 = 1;

/// Full-document semantic tokens.
pub fn semantic_tokens_full(doc: &Document, analysis: &Analysis) -> Value {
    json!({ "data": encode(doc, analysis, None) })
}

/// Semantic tokens restricted to `[start_line, end_line]`, delta-anchored
/// at `start_line`.
pub fn semantic_tokens_range(
    doc: &Document,
    analysis: &Analysis,
    start_line: u32,
    end_line: u32,
) -> Value {
    json!({ "data": encode(doc, analysis, Some((start_line, end_line))) })
}

fn classify(token: &Token, symbols: &SymbolTable) -> Option<(u32, u32)> {
    match token.kind {
        TokenKind::Keyword => {
            if TYPE_KEYWORDS.contains(token.text.as_ref()) {
                Some((TYPE_TYPE, 0))
            } else if token.text.as_ref() == "true" || token.text.as_ref() == "false" {
                Some((TYPE_NUMBER, 0))
            } else {
                Some((TYPE_KEYWORD, 0))
            }
        }
        TokenKind::Identifier => {
            let entries = symbols.entries(&token.text);
            if entries.is_empty() {
                return None;
            }
            let token_type = if entries.iter().any(|s| s.kind == SymbolKind::Function) {
                TYPE_FUNCTION
            } else {
                TYPE_VARIABLE
            };
            let span = Span::new(token.start, token.end);
            let modifiers =
                if entries.iter().any(|s| s.decl_span == span) { MOD_DECLARATION } else { 0 };
            Some((token_type, modifiers))
        }
        TokenKind::Str | TokenKind::Char => Some((TYPE_STRING, 0)),
        TokenKind::Int | TokenKind::Float => Some((TYPE_NUMBER, 0)),
        TokenKind::Comment => Some((TYPE_COMMENT, 0)),
        TokenKind::Operator => Some((TYPE_OPERATOR, 0)),
        _ => None,
    }
}

fn encode(doc: &Document, analysis: &Analysis, window: Option<(u32, u32)>) -> Vec<u32> {
    let mut data = Vec::new();
    let mut prev_line = window.map(|(start, _)| start).unwrap_or(0);
    let mut prev_char = 0u32;

    for token in &analysis.tokens {
        let Some((token_type, modifiers)) = classify(token, &analysis.symbols) else {
            continue;
        };
        let Some((line, character)) = doc.line_index.offset_to_position(&doc.text, token.start)
        else {
            continue;
        };
        if let Some((start, end)) = window {
            if line < start || line > end {
                continue;
            }
        }

        // Truncate multi-line tokens to their head line.
        let line_end = doc
            .line_index
            .line_span(&doc.text, line as usize)
            .map(|s| s.end)
            .unwrap_or(doc.text.len());
        let visible_end = token.end.min(line_end.max(token.start));
        let length: u32 = doc.text[token.start..visible_end]
            .chars()
            .map(|c| c.len_utf16() as u32)
            .sum();
        if length == 0 {
            continue;
        }

        let delta_line = line - prev_line;
        let delta_char = if delta_line == 0 { character - prev_char } else { character };
        data.extend_from_slice(&[delta_line, delta_char, length, token_type, modifiers]);
        prev_line = line;
        prev_char = character;
    }

    data
}
