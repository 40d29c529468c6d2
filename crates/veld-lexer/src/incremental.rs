//! Incremental re-lexing.
//!
//! Because the lexer is stateless between tokens, any token boundary from a
//! previous pass is a valid restart point. An edit therefore only needs to
//! re-scan from the last unaffected token until the stream re-synchronizes
//! with the old one past the edited region. Correctness wins over reuse:
//! when the streams never line up again, the scan simply runs to the end of
//! the buffer, which is exactly the full-pass result.

use crate::{Lexer, Token};

/// A single text edit described in byte offsets of the old and new buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditSpan {
    /// Start byte offset (same in old and new text).
    pub start: usize,
    /// End of the replaced range in the old text.
    pub old_end: usize,
    /// End of the replacement in the new text.
    pub new_end: usize,
}

impl EditSpan {
    /// Signed length difference introduced by the edit.
    fn delta(&self) -> isize {
        self.new_end as isize - self.old_end as isize
    }
}

/// Re-lex `new_text` after `edit`, reusing `old_tokens` outside the edited
/// region. The result is token-for-token identical to a full pass.
pub fn relex(old_tokens: &[Token], new_text: &str, edit: EditSpan) -> Vec<Token> {
    if old_tokens.is_empty() {
        return Lexer::new(new_text).tokenize();
    }

    // Keep tokens that end strictly before the edit, then back off one more:
    // the edit may merge with the preceding token (for example typing `=`
    // right after `=`).
    let mut keep = old_tokens.partition_point(|t| t.end < edit.start);
    keep = keep.saturating_sub(1);

    // Restart at the first non-kept token, or at the edit itself when it
    // precedes every token (whitespace is a safe restart point too).
    let restart = old_tokens[keep].start.min(edit.start);
    let delta = edit.delta();

    let mut tokens: Vec<Token> = old_tokens[..keep].to_vec();
    let mut lexer = Lexer::at_offset(new_text, restart);

    // Old tokens at or past the edit end, candidates for suffix reuse.
    let old_suffix_start = old_tokens.partition_point(|t| t.start < edit.old_end);

    while let Some(token) = lexer.next_token() {
        if token.start >= edit.new_end {
            // Try to re-synchronize: the produced token must be identical to
            // an old token shifted by the edit delta.
            let old_start = token.start as isize - delta;
            if old_start >= 0 {
                let old_start = old_start as usize;
                let idx = old_suffix_start
                    + old_tokens[old_suffix_start..].partition_point(|t| t.start < old_start);
                if let Some(old) = old_tokens.get(idx) {
                    if old.start == old_start && old.kind == token.kind && old.text == token.text {
                        tokens.push(token);
                        tokens.extend(old_tokens[idx + 1..].iter().map(|t| {
                            let mut shifted = t.clone();
                            shifted.start = (shifted.start as isize + delta) as usize;
                            shifted.end = (shifted.end as isize + delta) as usize;
                            shifted
                        }));
                        return tokens;
                    }
                }
            }
        }
        tokens.push(token);
    }

    tokens
}
