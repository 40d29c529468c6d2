//! Per-document analysis: token stream, AST, validator reports, symbols.
//!
//! Rebuilt on every text change. The token stream re-uses prior work when
//! the change batch was a single localized edit; parsing, validation, and
//! symbol extraction always run on the full buffer, since the AST is the
//! sole source of truth for symbols.

use veld_lexer::{relex, EditSpan, Token};
use veld_parser::ast::Program;
use veld_parser::{parse, validate, ParseError, ValidationReport};
use veld_symbol_table::SymbolTable;
use veld_workspace_index::AppliedEdit;

/// Everything derived from one document version.
#[derive(Debug)]
pub struct Analysis {
    pub tokens: Vec<Token>,
    pub program: Program,
    pub parse_errors: Vec<ParseError>,
    pub reports: Vec<ValidationReport>,
    pub symbols: SymbolTable,
}

impl Analysis {
    /// Analyze from scratch.
    pub fn full(text: &str) -> Self {
        let tokens = veld_lexer::tokenize(text);
        Self::finish(tokens, text)
    }

    /// Analyze after a change batch, reusing the previous token stream when
    /// the batch was one localized edit.
    pub fn update(previous: &Analysis, text: &str, edits: &[AppliedEdit]) -> Self {
        let tokens = match edits {
            [only] => relex(
                &previous.tokens,
                text,
                EditSpan { start: only.start, old_end: only.old_end, new_end: only.new_end },
            ),
            _ => veld_lexer::tokenize(text),
        };
        Self::finish(tokens, text)
    }

    fn finish(tokens: Vec<Token>, text: &str) -> Self {
        let parsed = parse(text);
        let reports = validate(&parsed.program);
        let symbols = SymbolTable::extract(&parsed.program);
        Self { tokens, program: parsed.program, parse_errors: parsed.errors, reports, symbols }
    }
}
