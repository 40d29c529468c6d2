//! Workspace-wide symbol index.
//!
//! Aggregates top-level declaration rows per URI, across open documents and
//! on-disk `.veld` files under the initialization root. A document's rows
//! are replaced atomically whenever its AST is rebuilt. Every filesystem
//! access goes through a canonical-prefix check so a symlink inside the
//! workspace cannot pull in files from outside it.

use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use veld_position_tracking::Span;
use veld_symbol_table::{top_level_declarations, Declaration, SymbolKind};
use walkdir::WalkDir;

/// Files larger than this are not indexed.
pub const MAX_INDEXED_FILE_BYTES: u64 = 1024 * 1024;

/// A declaration site somewhere in the workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolLocation {
    pub uri: String,
    pub span: Span,
    pub kind: SymbolKind,
}

/// Convert a `file://` URI to a filesystem path.
pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    url::Url::parse(uri).ok()?.to_file_path().ok()
}

/// Global name → declaration-sites index.
#[derive(Debug, Default)]
pub struct WorkspaceIndex {
    root: Option<PathBuf>,
    by_uri: FxHashMap<String, Vec<Declaration>>,
}

impl WorkspaceIndex {
    /// Create an empty index with no root configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the workspace root. The path is canonicalized so later prefix
    /// checks compare like with like; a missing directory clears the root.
    pub fn set_root(&mut self, path: &Path) {
        self.root = std::fs::canonicalize(path).ok();
    }

    /// The canonicalized workspace root, when configured.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Canonicalize `path` and require it to sit strictly under the root.
    pub fn confine_to_root(&self, path: &Path) -> Option<PathBuf> {
        let root = self.root.as_deref()?;
        let canonical = std::fs::canonicalize(path).ok()?;
        if canonical.starts_with(root) { Some(canonical) } else { None }
    }

    /// Read a file's text, refusing paths outside the workspace root.
    pub fn read_file_within_root(&self, path: &Path) -> Option<String> {
        let confined = self.confine_to_root(path)?;
        std::fs::read_to_string(confined).ok()
    }

    /// Replace the rows for `uri` atomically.
    pub fn update_document(&mut self, uri: &str, rows: Vec<Declaration>) {
        self.by_uri.insert(uri.to_string(), rows);
    }

    /// Drop all rows for `uri`.
    pub fn remove_document(&mut self, uri: &str) {
        self.by_uri.remove(uri);
    }

    /// Declaration sites of `name` across the workspace.
    pub fn declarations_of(&self, name: &str) -> Vec<SymbolLocation> {
        let mut out = Vec::new();
        for (uri, rows) in &self.by_uri {
            for row in rows {
                if row.name == name {
                    out.push(SymbolLocation {
                        uri: uri.clone(),
                        span: row.name_span,
                        kind: row.kind,
                    });
                }
            }
        }
        out.sort_by(|a, b| (&a.uri, a.span.start).cmp(&(&b.uri, b.span.start)));
        out
    }

    /// Whether any row in `uri` declares `name`.
    pub fn uri_declares(&self, uri: &str, name: &str) -> bool {
        self.by_uri.get(uri).is_some_and(|rows| rows.iter().any(|r| r.name == name))
    }

    /// Whether `uri` currently contributes rows.
    pub fn has_document(&self, uri: &str) -> bool {
        self.by_uri.contains_key(uri)
    }

    /// Case-insensitive prefix query across all rows, capped at `limit`.
    pub fn query_prefix(&self, query: &str, limit: usize) -> Vec<(String, Declaration)> {
        let query = query.to_lowercase();
        let mut out = Vec::new();
        let mut uris: Vec<&String> = self.by_uri.keys().collect();
        uris.sort();
        'outer: for uri in uris {
            for row in &self.by_uri[uri] {
                if row.name.to_lowercase().starts_with(&query) {
                    out.push((uri.clone(), row.clone()));
                    if out.len() >= limit {
                        break 'outer;
                    }
                }
            }
        }
        out
    }

    /// URIs currently contributing rows.
    pub fn indexed_uris(&self) -> impl Iterator<Item = &str> {
        self.by_uri.keys().map(|s| s.as_str())
    }

    /// Indexable `.veld` files under the root: `(uri, canonical path)`
    /// pairs, excluding oversized files, paths escaping the root through
    /// symlinks, and URIs that already have rows (an open copy is fresher
    /// than the disk copy).
    pub fn scan_candidates(&self) -> Vec<(String, PathBuf)> {
        let Some(root) = self.root.clone() else { return Vec::new() };
        let mut out = Vec::new();
        for entry in WalkDir::new(&root).follow_links(false).into_iter().flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("veld") {
                continue;
            }
            if entry.metadata().map(|m| m.len()).unwrap_or(u64::MAX) > MAX_INDEXED_FILE_BYTES {
                continue;
            }
            let Some(canonical) = self.confine_to_root(path) else { continue };
            let Ok(url) = url::Url::from_file_path(&canonical) else { continue };
            let uri = url.to_string();
            if self.by_uri.contains_key(&uri) {
                continue;
            }
            out.push((uri, canonical));
        }
        out.sort();
        out
    }

    /// Parse one on-disk file into declaration rows.
    pub fn index_file(path: &Path) -> Option<Vec<Declaration>> {
        let text = std::fs::read_to_string(path).ok()?;
        let parsed = veld_parser::parse(&text);
        Some(top_level_declarations(&parsed.program))
    }

    /// Walk the workspace root and index every `.veld` file under it.
    ///
    /// `keep_going` is polled between files so a shutdown can interrupt a
    /// long scan. Callers that share the index across threads should use
    /// [`Self::scan_candidates`] and [`Self::index_file`] directly and take
    /// the lock per file instead.
    pub fn scan_root(&mut self, keep_going: &dyn Fn() -> bool) {
        for (uri, path) in self.scan_candidates() {
            if !keep_going() {
                return;
            }
            if let Some(rows) = Self::index_file(&path) {
                self.update_document(&uri, rows);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn decl(name: &str, start: usize) -> Declaration {
        Declaration {
            name: name.to_string(),
            name_span: Span::new(start, start + name.len()),
            kind: SymbolKind::Function,
            detail: format!("func {name}()"),
        }
    }

    #[test]
    fn test_update_replaces_rows_atomically() {
        let mut index = WorkspaceIndex::new();
        index.update_document("file:///a.veld", vec![decl("alpha", 5)]);
        index.update_document("file:///a.veld", vec![decl("beta", 5)]);
        assert!(index.declarations_of("alpha").is_empty());
        assert_eq!(index.declarations_of("beta").len(), 1);
    }

    #[test]
    fn test_prefix_query_case_insensitive_and_capped() {
        let mut index = WorkspaceIndex::new();
        index.update_document(
            "file:///a.veld",
            vec![decl("parseExpr", 0), decl("parseStmt", 20), decl("other", 40)],
        );
        let hits = index.query_prefix("PARSE", 10);
        assert_eq!(hits.len(), 2);
        let hits = index.query_prefix("parse", 1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_scan_indexes_veld_files_under_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("lib.veld"), "func foo() {}\n").expect("write");
        fs::write(dir.path().join("notes.txt"), "func bar() {}\n").expect("write");

        let mut index = WorkspaceIndex::new();
        index.set_root(dir.path());
        index.scan_root(&|| true);

        assert_eq!(index.declarations_of("foo").len(), 1);
        assert!(index.declarations_of("bar").is_empty(), "non-.veld files are not indexed");
    }

    #[test]
    fn test_interrupted_scan_stops() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("lib.veld"), "func foo() {}\n").expect("write");
        let mut index = WorkspaceIndex::new();
        index.set_root(dir.path());
        index.scan_root(&|| false);
        assert!(index.declarations_of("foo").is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_is_refused() {
        let outside = tempfile::tempdir().expect("tempdir");
        let secret = outside.path().join("secret.veld");
        fs::write(&secret, "func secret() {}\n").expect("write");

        let root = tempfile::tempdir().expect("tempdir");
        std::os::unix::fs::symlink(&secret, root.path().join("link.veld")).expect("symlink");

        let mut index = WorkspaceIndex::new();
        index.set_root(root.path());
        index.scan_root(&|| true);
        assert!(index.declarations_of("secret").is_empty());

        // Direct reads through the same check are refused too.
        assert!(index.read_file_within_root(&secret).is_none());
        assert!(index.read_file_within_root(&root.path().join("link.veld")).is_none());
    }

    #[test]
    fn test_read_within_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("main.veld");
        fs::write(&file, "func main() {}\n").expect("write");
        let mut index = WorkspaceIndex::new();
        index.set_root(dir.path());
        assert_eq!(index.read_file_within_root(&file).as_deref(), Some("func main() {}\n"));
    }
}
