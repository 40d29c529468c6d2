//! Workspace symbol search.

use crate::state::ServerState;
use rustc_hash::FxHashMap;
use serde_json::{json, Value};
use veld_position_tracking::LineIndex;

/// Result cap, matching the completion cap.
const MAX_RESULTS: usize = 200;

/// Case-insensitive prefix search over every indexed declaration.
pub fn workspace_symbols(state: &ServerState, query: &str) -> Vec<Value> {
    // Snapshot the hits, then drop the guard before reading file texts.
    let hits = { state.workspace.read().query_prefix(query, MAX_RESULTS) };

    // Ranges need each file's text; fetch it once per URI.
    let mut texts: FxHashMap<String, Option<(String, LineIndex)>> = FxHashMap::default();
    let mut out = Vec::new();
    for (uri, decl) in hits {
        let entry = texts.entry(uri.clone()).or_insert_with(|| {
            state.text_for_uri(&uri).map(|text| {
                let index = LineIndex::new(&text);
                (text, index)
            })
        });
        let Some((text, line_index)) = entry else { continue };
        out.push(json!({
            "name": decl.name,
            "kind": decl.kind.to_lsp(),
            "location": crate::convert::location(&uri, text, line_index, decl.name_span),
        }));
    }
    out
}
