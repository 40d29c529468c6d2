//! Formatting providers: whole document, range, and on-type.

use crate::analysis::Analysis;
use crate::convert::text_edit;
use serde_json::Value;
use veld_fmt::{diff, format, normalize_line_spacing, FormatOptions};
use veld_lexer::TokenKind;
use veld_position_tracking::Span;
use veld_workspace_index::Document;

/// Characters that trigger on-type formatting.
pub const ON_TYPE_TRIGGERS: [&str; 5] = ["}", "\n", ")", ";", "{"];

/// Build [`FormatOptions`] from LSP `FormattingOptions` params.
pub fn options_from_params(options: &Value) -> FormatOptions {
    FormatOptions {
        tab_size: options["tabSize"].as_u64().unwrap_or(4) as u32,
        insert_spaces: options["insertSpaces"].as_bool().unwrap_or(true),
        trim_trailing_whitespace: options["trimTrailingWhitespace"].as_bool().unwrap_or(true),
        insert_final_newline: options["insertFinalNewline"].as_bool().unwrap_or(true),
    }
}

/// Format the whole document as minimal line-granular edits.
pub fn document_formatting(doc: &Document, options: &FormatOptions) -> Vec<Value> {
    let formatted = format(&doc.text, options);
    if formatted == doc.text {
        return Vec::new();
    }
    hunk_edits(doc, &formatted)
}

/// Format the document, keeping only edits that touch `[start_line, end_line]`.
pub fn range_formatting(
    doc: &Document,
    options: &FormatOptions,
    start_line: u32,
    end_line: u32,
) -> Vec<Value> {
    let formatted = format(&doc.text, options);
    if formatted == doc.text {
        return Vec::new();
    }
    let hunks = diff(&doc.text, &formatted);
    let formatted_lines: Vec<&str> = formatted.split_inclusive('\n').collect();
    hunks
        .iter()
        .filter(|hunk| {
            let first = hunk.a_start;
            let last = hunk.a_start + hunk.a_len.max(1) - 1;
            first <= end_line as usize && last >= start_line as usize
        })
        .map(|hunk| hunk_to_edit(doc, &formatted_lines, hunk))
        .collect()
}

/// Re-indent and re-space the line the trigger character landed on.
pub fn on_type_formatting(
    doc: &Document,
    analysis: &Analysis,
    line: u32,
    ch: &str,
    options: &FormatOptions,
) -> Vec<Value> {
    if !ON_TYPE_TRIGGERS.contains(&ch) {
        return Vec::new();
    }
    let Some(line_span) = doc.line_index.line_span(&doc.text, line as usize) else {
        return Vec::new();
    };
    let line_text = &doc.text[line_span.start..line_span.end];
    let body = line_text.trim();
    if body.is_empty() {
        return Vec::new();
    }

    // Indent = unmatched `{` before the line start, from the token stream
    // so braces in strings and comments do not count.
    let mut depth = 0usize;
    for token in &analysis.tokens {
        if token.start >= line_span.start {
            break;
        }
        match token.kind {
            TokenKind::LeftBrace => depth += 1,
            TokenKind::RightBrace => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    if body.starts_with('}') {
        depth = depth.saturating_sub(1);
    }

    let indent = if options.insert_spaces {
        " ".repeat(depth * options.tab_size as usize)
    } else {
        "\t".repeat(depth)
    };
    let replacement = indent + normalize_line_spacing(body).as_str();
    if replacement == line_text {
        return Vec::new();
    }
    vec![text_edit(&doc.text, &doc.line_index, line_span, &replacement)]
}

fn hunk_edits(doc: &Document, formatted: &str) -> Vec<Value> {
    let formatted_lines: Vec<&str> = formatted.split_inclusive('\n').collect();
    diff(&doc.text, formatted)
        .iter()
        .map(|hunk| hunk_to_edit(doc, &formatted_lines, hunk))
        .collect()
}

fn hunk_to_edit(doc: &Document, formatted_lines: &[&str], hunk: &veld_fmt::Hunk) -> Value {
    let start = line_start_offset(doc, hunk.a_start);
    let end = line_start_offset(doc, hunk.a_start + hunk.a_len);
    let new_text: String =
        formatted_lines[hunk.b_start..hunk.b_start + hunk.b_len].concat();
    text_edit(&doc.text, &doc.line_index, Span::new(start, end), &new_text)
}

fn line_start_offset(doc: &Document, line: usize) -> usize {
    doc.line_index
        .position_to_offset(&doc.text, line as u32, 0)
        .unwrap_or(doc.text.len())
}
