//! Line-granular diff between two texts.
//!
//! Produces replace-style hunks in line coordinates, computed from an LCS
//! over lines. Inputs past a size guard fall back to a single hunk covering
//! everything between the common prefix and suffix, which is still a
//! correct (if coarser) edit script.

/// A contiguous replacement: lines `a_start..a_start+a_len` of the old text
/// become lines `b_start..b_start+b_len` of the new text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hunk {
    pub a_start: usize,
    pub a_len: usize,
    pub b_start: usize,
    pub b_len: usize,
}

/// Lines beyond this count skip the quadratic LCS.
const LCS_LINE_LIMIT: usize = 2000;

/// Compute line-granular hunks turning `a` into `b`. Equal inputs produce
/// no hunks.
pub fn diff(a: &str, b: &str) -> Vec<Hunk> {
    if a == b {
        return Vec::new();
    }
    let a_lines: Vec<&str> = a.split_inclusive('\n').collect();
    let b_lines: Vec<&str> = b.split_inclusive('\n').collect();

    // Trim common prefix and suffix.
    let mut prefix = 0;
    while prefix < a_lines.len() && prefix < b_lines.len() && a_lines[prefix] == b_lines[prefix] {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < a_lines.len() - prefix
        && suffix < b_lines.len() - prefix
        && a_lines[a_lines.len() - 1 - suffix] == b_lines[b_lines.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let a_mid = &a_lines[prefix..a_lines.len() - suffix];
    let b_mid = &b_lines[prefix..b_lines.len() - suffix];

    if a_mid.is_empty() && b_mid.is_empty() {
        return Vec::new();
    }
    if a_mid.len() > LCS_LINE_LIMIT || b_mid.len() > LCS_LINE_LIMIT {
        return vec![Hunk {
            a_start: prefix,
            a_len: a_mid.len(),
            b_start: prefix,
            b_len: b_mid.len(),
        }];
    }

    let mut hunks = lcs_hunks(a_mid, b_mid);
    for hunk in &mut hunks {
        hunk.a_start += prefix;
        hunk.b_start += prefix;
    }
    hunks
}

/// Classic DP LCS over the trimmed middle, folded into replace hunks.
fn lcs_hunks(a: &[&str], b: &[&str]) -> Vec<Hunk> {
    let n = a.len();
    let m = b.len();
    // lcs[i][j] = length of LCS of a[i..] and b[j..]
    let mut lcs = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut hunks = Vec::new();
    let mut i = 0;
    let mut j = 0;
    let mut open: Option<Hunk> = None;

    while i < n || j < m {
        if i < n && j < m && a[i] == b[j] {
            if let Some(hunk) = open.take() {
                hunks.push(hunk);
            }
            i += 1;
            j += 1;
            continue;
        }
        let take_a = j >= m || (i < n && lcs[i + 1][j] >= lcs[i][j + 1]);
        let hunk = open.get_or_insert(Hunk { a_start: i, a_len: 0, b_start: j, b_len: 0 });
        if take_a {
            hunk.a_len += 1;
            i += 1;
        } else {
            hunk.b_len += 1;
            j += 1;
        }
    }
    if let Some(hunk) = open.take() {
        hunks.push(hunk);
    }
    hunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Apply hunks to `a` and check the result equals `b`.
    fn verify(a: &str, b: &str) {
        let hunks = diff(a, b);
        let a_lines: Vec<&str> = a.split_inclusive('\n').collect();
        let b_lines: Vec<&str> = b.split_inclusive('\n').collect();
        let mut out = String::new();
        let mut cursor = 0;
        for hunk in &hunks {
            for line in &a_lines[cursor..hunk.a_start] {
                out.push_str(line);
            }
            for line in &b_lines[hunk.b_start..hunk.b_start + hunk.b_len] {
                out.push_str(line);
            }
            cursor = hunk.a_start + hunk.a_len;
        }
        for line in &a_lines[cursor..] {
            out.push_str(line);
        }
        assert_eq!(out, b, "hunks {hunks:?} applied to {a:?}");
    }

    #[test]
    fn test_equal_texts_no_hunks() {
        assert!(diff("a\nb\n", "a\nb\n").is_empty());
    }

    #[test]
    fn test_single_line_change() {
        let hunks = diff("a\nb\nc\n", "a\nB\nc\n");
        assert_eq!(hunks, vec![Hunk { a_start: 1, a_len: 1, b_start: 1, b_len: 1 }]);
        verify("a\nb\nc\n", "a\nB\nc\n");
    }

    #[test]
    fn test_insertion() {
        let hunks = diff("a\nc\n", "a\nb\nc\n");
        assert_eq!(hunks, vec![Hunk { a_start: 1, a_len: 0, b_start: 1, b_len: 1 }]);
        verify("a\nc\n", "a\nb\nc\n");
    }

    #[test]
    fn test_deletion() {
        let hunks = diff("a\nb\nc\n", "a\nc\n");
        assert_eq!(hunks, vec![Hunk { a_start: 1, a_len: 1, b_start: 1, b_len: 0 }]);
        verify("a\nb\nc\n", "a\nc\n");
    }

    #[test]
    fn test_multiple_hunks() {
        verify("a\nb\nc\nd\ne\n", "a\nB\nc\nd\nE\n");
        assert_eq!(diff("a\nb\nc\nd\ne\n", "a\nB\nc\nd\nE\n").len(), 2);
    }

    #[test]
    fn test_missing_trailing_newline() {
        verify("a\nb", "a\nb\n");
        verify("", "a\n");
        verify("a\n", "");
    }

    #[test]
    fn test_everything_replaced() {
        verify("x\ny\n", "p\nq\nr\n");
    }
}
