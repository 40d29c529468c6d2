//! Document store and workspace index for the Veld language server.
//!
//! The [`DocumentStore`] owns the text and version of every open document
//! and applies LSP incremental edits. The [`WorkspaceIndex`] aggregates
//! top-level declaration sites across open documents and on-disk `.veld`
//! files under the initialization root.

mod document_store;
mod workspace_index;

pub use document_store::{
    AppliedChanges, AppliedEdit, ContentChange, Document, DocumentStore, NewlineStyle,
};
pub use workspace_index::{uri_to_path, SymbolLocation, WorkspaceIndex, MAX_INDEXED_FILE_BYTES};
