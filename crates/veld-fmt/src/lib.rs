//! Source formatter for Veld code.
//!
//! The formatter is line-oriented and conservative: it re-indents lines
//! from brace depth, trims trailing whitespace, normalizes the space before
//! an opening brace, and enforces a final newline. String and comment
//! interiors are never touched. [`diff`] turns two texts into line-granular
//! hunks so callers can produce minimal edits.

mod diff;

pub use diff::{diff, Hunk};

/// Formatting knobs, mirroring the LSP `FormattingOptions` fields that
/// matter here.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Size of one indent step in spaces
    pub tab_size: u32,
    /// Indent with spaces rather than tabs
    pub insert_spaces: bool,
    /// Remove trailing whitespace on each line
    pub trim_trailing_whitespace: bool,
    /// Guarantee the text ends with exactly one newline
    pub insert_final_newline: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            tab_size: 4,
            insert_spaces: true,
            trim_trailing_whitespace: true,
            insert_final_newline: true,
        }
    }
}

/// Format a whole buffer. Idempotent: formatting formatted text is a no-op.
/// Line endings are normalized to `\n`.
pub fn format(text: &str, options: &FormatOptions) -> String {
    let mut lines_out: Vec<String> = Vec::new();
    let mut depth: usize = 0;
    // Tracks whether a /* block comment is open across lines.
    let mut in_block_comment = false;

    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let body = line.trim();

        if body.is_empty() {
            lines_out.push(String::new());
            continue;
        }

        let was_in_comment = in_block_comment;
        let (opens, closes, leading_closes) = scan_braces(body, &mut in_block_comment);

        let rendered = if was_in_comment {
            // Keep comment interiors exactly as written, minus the trailing
            // whitespace pass.
            line.to_string()
        } else {
            // A line that starts with closers dedents itself.
            let effective_depth = depth.saturating_sub(leading_closes);
            indent_for(effective_depth, options) + normalize_line_spacing(body).as_str()
        };
        if options.trim_trailing_whitespace {
            lines_out.push(rendered.trim_end().to_string());
        } else {
            lines_out.push(rendered);
        }

        depth = depth.saturating_add(opens).saturating_sub(closes);
    }

    let mut result = lines_out.join("\n");
    if options.insert_final_newline {
        while result.ends_with('\n') {
            result.pop();
        }
        if !result.is_empty() {
            result.push('\n');
        }
    }
    result
}

fn indent_for(depth: usize, options: &FormatOptions) -> String {
    if options.insert_spaces {
        " ".repeat(depth * options.tab_size as usize)
    } else {
        "\t".repeat(depth)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum ScanState {
    Code,
    Str,
    Char,
}

/// Count braces on a line, skipping string/char literals and comments.
/// Returns `(opens, closes, closes_before_any_open)`.
fn scan_braces(line: &str, in_block_comment: &mut bool) -> (usize, usize, usize) {
    let mut opens = 0;
    let mut closes = 0;
    let mut leading_closes = 0;
    let mut seen_open = false;
    let mut state = ScanState::Code;
    let mut escape = false;

    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if *in_block_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                *in_block_comment = false;
            }
            continue;
        }
        match state {
            ScanState::Str | ScanState::Char => {
                if escape {
                    escape = false;
                } else if c == '\\' {
                    escape = true;
                } else if (state == ScanState::Str && c == '"')
                    || (state == ScanState::Char && c == '\'')
                {
                    state = ScanState::Code;
                }
            }
            ScanState::Code => match c {
                '"' => state = ScanState::Str,
                '\'' => state = ScanState::Char,
                '/' if chars.peek() == Some(&'/') => break,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    *in_block_comment = true;
                }
                '{' => {
                    opens += 1;
                    seen_open = true;
                }
                '}' => {
                    closes += 1;
                    if !seen_open {
                        leading_closes += 1;
                    }
                }
                _ => {}
            },
        }
    }

    (opens, closes, leading_closes)
}

/// Normalize spacing inside a trimmed line: exactly one space before `{`
/// and none before `;`, outside strings and comments.
pub fn normalize_line_spacing(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut state = ScanState::Code;
    let mut escape = false;
    let mut in_comment = false;

    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if in_comment {
            out.push(c);
            continue;
        }
        match state {
            ScanState::Str | ScanState::Char => {
                out.push(c);
                if escape {
                    escape = false;
                } else if c == '\\' {
                    escape = true;
                } else if (state == ScanState::Str && c == '"')
                    || (state == ScanState::Char && c == '\'')
                {
                    state = ScanState::Code;
                }
            }
            ScanState::Code => match c {
                '"' => {
                    state = ScanState::Str;
                    out.push('"');
                }
                '\'' => {
                    state = ScanState::Char;
                    out.push('\'');
                }
                '/' if matches!(chars.peek(), Some('/') | Some('*')) => {
                    in_comment = true;
                    out.push('/');
                }
                '{' => {
                    let trimmed_len = out.trim_end().len();
                    let at_line_start = trimmed_len == 0;
                    out.truncate(trimmed_len);
                    if !at_line_start {
                        out.push(' ');
                    }
                    out.push('{');
                }
                ';' => {
                    let trimmed_len = out.trim_end().len();
                    out.truncate(trimmed_len);
                    out.push(';');
                }
                _ => out.push(c),
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fmt(text: &str) -> String {
        format(text, &FormatOptions::default())
    }

    #[test]
    fn test_reindents_by_brace_depth() {
        let src = "func main() {\nlet x = 1\nif x > 0 {\nx = 2\n}\n}\n";
        let expected = "func main() {\n    let x = 1\n    if x > 0 {\n        x = 2\n    }\n}\n";
        assert_eq!(fmt(src), expected);
    }

    #[test]
    fn test_idempotent() {
        let src = "func main() {\n    let x = 1\n}\n";
        let once = fmt(src);
        assert_eq!(fmt(&once), once);
    }

    #[test]
    fn test_trailing_whitespace_trimmed() {
        assert_eq!(fmt("let x = 1   \n"), "let x = 1\n");
    }

    #[test]
    fn test_space_before_brace_normalized() {
        assert_eq!(fmt("func f(){\n}\n"), "func f() {\n}\n");
        assert_eq!(fmt("func f()    {\n}\n"), "func f() {\n}\n");
    }

    #[test]
    fn test_space_before_semicolon_removed() {
        assert_eq!(fmt("let x = 1 ;\n"), "let x = 1;\n");
    }

    #[test]
    fn test_braces_in_strings_ignored() {
        let src = "func f() {\n    let s = \"{ not a brace }\"\n}\n";
        assert_eq!(fmt(src), src);
    }

    #[test]
    fn test_final_newline_inserted() {
        assert_eq!(fmt("let x = 1"), "let x = 1\n");
    }

    #[test]
    fn test_unicode_in_strings_preserved() {
        let src = "func f() {\n    let s = \"héllo 𝕍\"\n}\n";
        assert_eq!(fmt(src), src);
    }

    #[test]
    fn test_block_comment_interior_untouched() {
        let src = "/*\n   keep   this\n*/\nfunc f() {\n}\n";
        let out = fmt(src);
        assert!(out.contains("   keep   this"));
    }

    #[test]
    fn test_tab_indentation() {
        let options = FormatOptions { insert_spaces: false, ..FormatOptions::default() };
        let out = format("func f() {\nlet x = 1\n}\n", &options);
        assert_eq!(out, "func f() {\n\tlet x = 1\n}\n");
    }
}
