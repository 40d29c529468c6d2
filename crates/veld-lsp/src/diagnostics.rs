//! Diagnostics engine.
//!
//! Builds the diagnostic set for a document from parse errors and validator
//! reports, deduplicates identical entries, and suppresses re-publication
//! when the serialized set has not changed since the last publish.

use crate::analysis::Analysis;
use crate::convert::span_to_range;
use crate::state::ServerState;
use serde_json::{json, Value};
use veld_parser::ReportSeverity;
use veld_position_tracking::Span;
use veld_workspace_index::Document;

const SEVERITY_ERROR: u8 = 1;
const SEVERITY_WARNING: u8 = 2;

/// Build the deduplicated diagnostic array for one document version.
pub fn build(doc: &Document, analysis: &Analysis, skipped_edits: usize) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();

    for error in &analysis.parse_errors {
        let offset = error.offset.min(doc.text.len());
        out.push(json!({
            "range": span_to_range(&doc.text, &doc.line_index, Span::empty(offset)),
            "severity": SEVERITY_ERROR,
            "source": "veld-parser",
            "message": error.message,
        }));
    }

    for report in &analysis.reports {
        let severity = match report.severity {
            ReportSeverity::Error => SEVERITY_ERROR,
            ReportSeverity::Warning => SEVERITY_WARNING,
        };
        out.push(json!({
            "range": span_to_range(&doc.text, &doc.line_index, report.span),
            "severity": severity,
            "source": "veld-validate",
            "message": report.message,
        }));
    }

    if skipped_edits > 0 {
        out.push(json!({
            "range": span_to_range(&doc.text, &doc.line_index, Span::empty(0)),
            "severity": SEVERITY_WARNING,
            "source": "veld-lsp",
            "message": format!("{skipped_edits} change(s) had unresolvable ranges and were skipped"),
        }));
    }

    out.dedup_by(|a, b| a == b);
    out
}

/// Compute the `publishDiagnostics` params for `uri`, or `None` when the
/// set equals the last published one.
pub fn publish_params(state: &mut ServerState, uri: &str) -> Option<Value> {
    let (params, serialized) = match (state.document(uri), state.analysis(uri)) {
        (Some(doc), Some(analysis)) => {
            let skipped = state.skipped_edits.get(uri).copied().unwrap_or(0);
            let diagnostics = build(doc, analysis, skipped);
            let params = json!({
                "uri": uri,
                "version": doc.version,
                "diagnostics": diagnostics,
            });
            let serialized = params["diagnostics"].to_string();
            (params, serialized)
        }
        // Closed document: clear any published diagnostics.
        _ => (json!({ "uri": uri, "diagnostics": [] }), "[]".to_string()),
    };

    if state.last_published.get(uri).map(String::as_str) == Some(serialized.as_str()) {
        return None;
    }
    state.last_published.insert(uri.to_string(), serialized);
    Some(params)
}
