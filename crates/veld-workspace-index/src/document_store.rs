//! Document store for managing in-memory text content
//!
//! Maintains the current state of all open documents, tracking versions and
//! content without relying on filesystem state. Ranged edits are converted
//! to byte offsets through the UTF-16 position codec; an edit whose range
//! does not resolve is skipped so the remaining edits in the batch still
//! apply.

use rustc_hash::FxHashMap;
use veld_position_tracking::LineIndex;

/// One edit from a `didChange` batch, already deserialized.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentChange {
    /// `((line, character), (line, character))` in UTF-16 positions, or
    /// `None` for a full-document replacement.
    pub range: Option<((u32, u32), (u32, u32))>,
    /// Replacement text
    pub text: String,
}

/// Byte-offset description of one applied edit, for incremental consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedEdit {
    pub start: usize,
    pub old_end: usize,
    pub new_end: usize,
}

/// Outcome of applying a `didChange` batch.
#[derive(Debug, Clone, Default)]
pub struct AppliedChanges {
    /// Edits actually applied, in application order
    pub edits: Vec<AppliedEdit>,
    /// Count of edits skipped because their range did not resolve
    pub skipped: usize,
}

/// Newline convention last observed in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewlineStyle {
    Unix,
    Dos,
}

impl NewlineStyle {
    fn detect(text: &str) -> Self {
        if text.contains("\r\n") { NewlineStyle::Dos } else { NewlineStyle::Unix }
    }

    /// The terminator string for this style.
    pub fn as_str(&self) -> &'static str {
        match self {
            NewlineStyle::Unix => "\n",
            NewlineStyle::Dos => "\r\n",
        }
    }
}

/// A document in the store
#[derive(Debug, Clone)]
pub struct Document {
    /// The document URI
    pub uri: String,
    /// LSP version number
    pub version: i32,
    /// The full text content
    pub text: String,
    /// Line index for position calculations
    pub line_index: LineIndex,
    /// Last-known newline convention
    pub newline: NewlineStyle,
}

impl Document {
    /// Create a new document
    pub fn new(uri: String, version: i32, text: String) -> Self {
        let line_index = LineIndex::new(&text);
        let newline = NewlineStyle::detect(&text);
        Self { uri, version, text, line_index, newline }
    }

    /// Apply a batch of edits in received order.
    ///
    /// The version becomes `version` when non-zero, otherwise the previous
    /// value plus one.
    pub fn apply_changes(&mut self, version: i32, changes: &[ContentChange]) -> AppliedChanges {
        let mut applied = AppliedChanges::default();
        for change in changes {
            match change.range {
                None => {
                    let old_len = self.text.len();
                    self.text = change.text.clone();
                    applied.edits.push(AppliedEdit {
                        start: 0,
                        old_end: old_len,
                        new_end: self.text.len(),
                    });
                }
                Some(((sl, sc), (el, ec))) => {
                    let start = self.line_index.position_to_offset(&self.text, sl, sc);
                    let end = self.line_index.position_to_offset(&self.text, el, ec);
                    let (Some(start), Some(end)) = (start, end) else {
                        applied.skipped += 1;
                        continue;
                    };
                    if start > end || end > self.text.len() {
                        applied.skipped += 1;
                        continue;
                    }
                    self.text.replace_range(start..end, &change.text);
                    applied.edits.push(AppliedEdit {
                        start,
                        old_end: end,
                        new_end: start + change.text.len(),
                    });
                }
            }
            self.line_index = LineIndex::new(&self.text);
        }
        self.version = if version != 0 { version } else { self.version + 1 };
        self.newline = NewlineStyle::detect(&self.text);
        applied
    }
}

/// In-memory store of open documents, owned by the server coordinator.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: FxHashMap<String, Document>,
}

impl DocumentStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or re-open) a document
    pub fn open(&mut self, uri: String, version: i32, text: String) {
        let doc = Document::new(uri.clone(), version, text);
        self.documents.insert(uri, doc);
    }

    /// Apply a change batch to an open document.
    ///
    /// Returns `None` when the URI is not open.
    pub fn apply_changes(
        &mut self,
        uri: &str,
        version: i32,
        changes: &[ContentChange],
    ) -> Option<AppliedChanges> {
        self.documents.get_mut(uri).map(|doc| doc.apply_changes(version, changes))
    }

    /// Close a document
    pub fn close(&mut self, uri: &str) -> bool {
        self.documents.remove(uri).is_some()
    }

    /// Get a document by URI
    pub fn get(&self, uri: &str) -> Option<&Document> {
        self.documents.get(uri)
    }

    /// Get the text content of a document
    pub fn get_text(&self, uri: &str) -> Option<&str> {
        self.get(uri).map(|doc| doc.text.as_str())
    }

    /// Check if a document is open
    pub fn is_open(&self, uri: &str) -> bool {
        self.documents.contains_key(uri)
    }

    /// Iterate over all open documents
    pub fn all_documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Count of open documents
    pub fn count(&self) -> usize {
        self.documents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn full(text: &str) -> ContentChange {
        ContentChange { range: None, text: text.to_string() }
    }

    fn ranged(start: (u32, u32), end: (u32, u32), text: &str) -> ContentChange {
        ContentChange { range: Some((start, end)), text: text.to_string() }
    }

    #[test]
    fn test_document_lifecycle() {
        let mut store = DocumentStore::new();
        let uri = "file:///test.veld".to_string();

        store.open(uri.clone(), 1, "let a = 1\n".to_string());
        assert!(store.is_open(&uri));
        assert_eq!(store.count(), 1);

        let applied = store.apply_changes(&uri, 2, &[full("let b = 2\n")]).expect("open");
        assert_eq!(applied.edits.len(), 1);
        assert_eq!(store.get_text(&uri), Some("let b = 2\n"));
        assert_eq!(store.get(&uri).map(|d| d.version), Some(2));

        assert!(store.close(&uri));
        assert!(!store.is_open(&uri));
    }

    #[test]
    fn test_ranged_edit() {
        let mut doc = Document::new("file:///t.veld".into(), 1, "let x = 1\n".into());
        doc.apply_changes(2, &[ranged((0, 8), (0, 9), "42")]);
        assert_eq!(doc.text, "let x = 42\n");
        assert_eq!(doc.version, 2);
    }

    #[test]
    fn test_edits_apply_in_document_order() {
        let mut doc = Document::new("file:///t.veld".into(), 1, "abc\n".into());
        // Insert at 0, then the following edit addresses the *updated* text.
        doc.apply_changes(2, &[ranged((0, 0), (0, 0), "x"), ranged((0, 1), (0, 2), "B")]);
        assert_eq!(doc.text, "xBbc\n");
    }

    #[test]
    fn test_invalid_edit_is_skipped_batch_continues() {
        let mut doc = Document::new("file:///t.veld".into(), 1, "abc\n".into());
        let applied = doc.apply_changes(
            3,
            &[
                ranged((7, 0), (7, 1), "nope"), // line out of range
                ranged((0, 0), (0, 1), "A"),
            ],
        );
        assert_eq!(applied.skipped, 1);
        assert_eq!(applied.edits.len(), 1);
        assert_eq!(doc.text, "Abc\n");
        assert_eq!(doc.version, 3);
    }

    #[test]
    fn test_zero_version_increments() {
        let mut doc = Document::new("file:///t.veld".into(), 5, "a".into());
        doc.apply_changes(0, &[full("b")]);
        assert_eq!(doc.version, 6);
    }

    #[test]
    fn test_character_overflow_clamps_to_line_end() {
        let mut doc = Document::new("file:///t.veld".into(), 1, "ab\ncd\n".into());
        doc.apply_changes(2, &[ranged((0, 50), (0, 60), "!")]);
        assert_eq!(doc.text, "ab!\ncd\n");
    }

    #[test]
    fn test_newline_style_tracking() {
        let doc = Document::new("file:///t.veld".into(), 1, "a\r\nb\r\n".into());
        assert_eq!(doc.newline, NewlineStyle::Dos);
        let doc = Document::new("file:///t.veld".into(), 1, "a\nb\n".into());
        assert_eq!(doc.newline, NewlineStyle::Unix);
    }

    proptest! {
        /// A sequence of ranged edits must land on the same text as a single
        /// full-document edit carrying the final text.
        #[test]
        fn prop_ranged_edits_equal_full_replacement(
            base in "[a-z \\n]{0,40}",
            inserts in proptest::collection::vec(("[a-z]{0,5}", 0usize..40), 0..6),
        ) {
            let mut doc = Document::new("file:///p.veld".into(), 1, base.clone());
            for (text, seed) in &inserts {
                let offset = seed % (doc.text.len() + 1);
                // Derive a valid (line, character) from the current text.
                let offset = doc
                    .text
                    .char_indices()
                    .map(|(i, _)| i)
                    .chain([doc.text.len()])
                    .min_by_key(|i| i.abs_diff(offset))
                    .unwrap_or(0);
                let (line, character) = doc
                    .line_index
                    .offset_to_position(&doc.text, offset)
                    .expect("valid offset");
                doc.apply_changes(0, &[ranged((line, character), (line, character), text)]);
            }
            let final_text = doc.text.clone();
            let mut replay = Document::new("file:///p.veld".into(), 1, base);
            replay.apply_changes(0, &[full(&final_text)]);
            prop_assert_eq!(replay.text, final_text);
        }
    }
}
