//! Server state: document store, per-document analyses, workspace index.
//!
//! All mutation happens on the dispatch thread; the workspace index sits
//! behind a lock because the initial scan runs on a background thread.

use crate::analysis::Analysis;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;
use veld_symbol_table::top_level_declarations;
use veld_workspace_index::{
    uri_to_path, AppliedChanges, ContentChange, Document, DocumentStore, WorkspaceIndex,
};

/// Shared, coordinator-owned server state.
pub struct ServerState {
    pub store: DocumentStore,
    pub analyses: FxHashMap<String, Analysis>,
    pub workspace: Arc<RwLock<WorkspaceIndex>>,
    /// Serialized diagnostics last published per URI, for idempotence
    pub last_published: FxHashMap<String, String>,
    /// Edits skipped in the most recent change batch per URI
    pub skipped_edits: FxHashMap<String, usize>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            store: DocumentStore::new(),
            analyses: FxHashMap::default(),
            workspace: Arc::new(RwLock::new(WorkspaceIndex::new())),
            last_published: FxHashMap::default(),
            skipped_edits: FxHashMap::default(),
        }
    }

    /// Open a document and build its analysis.
    pub fn open_document(&mut self, uri: &str, version: i32, text: String) {
        self.store.open(uri.to_string(), version, text);
        self.reanalyze(uri, None);
    }

    /// Apply a change batch, then rebuild the derived views.
    ///
    /// Returns `false` when the document is not open.
    pub fn change_document(&mut self, uri: &str, version: i32, changes: &[ContentChange]) -> bool {
        let Some(applied) = self.store.apply_changes(uri, version, changes) else {
            return false;
        };
        self.skipped_edits.insert(uri.to_string(), applied.skipped);
        self.reanalyze(uri, Some(&applied));
        true
    }

    /// Close a document, dropping every derived view.
    ///
    /// The workspace rows survive when the file still exists on disk (the
    /// declarations do not vanish because an editor tab closed); otherwise
    /// they are removed.
    pub fn close_document(&mut self, uri: &str) {
        self.store.close(uri);
        self.analyses.remove(uri);
        self.skipped_edits.remove(uri);
        let on_disk = uri_to_path(uri).map(|p| p.exists()).unwrap_or(false);
        if !on_disk {
            self.workspace.write().remove_document(uri);
        }
    }

    fn reanalyze(&mut self, uri: &str, applied: Option<&AppliedChanges>) {
        let Some(doc) = self.store.get(uri) else { return };
        let analysis = match (applied, self.analyses.get(uri)) {
            (Some(applied), Some(previous)) => {
                Analysis::update(previous, &doc.text, &applied.edits)
            }
            _ => Analysis::full(&doc.text),
        };
        self.workspace
            .write()
            .update_document(uri, top_level_declarations(&analysis.program));
        self.analyses.insert(uri.to_string(), analysis);
    }

    /// The open document for `uri`.
    pub fn document(&self, uri: &str) -> Option<&Document> {
        self.store.get(uri)
    }

    /// The analysis for `uri`.
    pub fn analysis(&self, uri: &str) -> Option<&Analysis> {
        self.analyses.get(uri)
    }

    /// Text for any workspace URI: the open copy when available, otherwise
    /// the on-disk copy, confined to the workspace root.
    pub fn text_for_uri(&self, uri: &str) -> Option<String> {
        if let Some(doc) = self.store.get(uri) {
            return Some(doc.text.clone());
        }
        let path = uri_to_path(uri)?;
        self.read_confined(&path)
    }

    fn read_confined(&self, path: &Path) -> Option<String> {
        self.workspace.read().read_file_within_root(path)
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}
