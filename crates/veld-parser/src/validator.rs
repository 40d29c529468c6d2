//! Light structural validation over a parsed program.
//!
//! These checks are deliberately shallow: no type inference, no data flow.
//! They catch the structural mistakes a parser alone cannot express, and
//! the language server publishes them as diagnostics next to parse errors.

use crate::ast::{Block, FuncDecl, Item, LetDecl, Program, Stmt};
use std::collections::HashMap;
use veld_position_tracking::Span;

/// Severity of a validation report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSeverity {
    Warning,
    Error,
}

/// A single validator finding.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub span: Span,
    pub severity: ReportSeverity,
    pub message: String,
}

/// Validate a program, returning all findings in source order.
pub fn validate(program: &Program) -> Vec<ValidationReport> {
    let mut reports = Vec::new();

    let mut seen_funcs: HashMap<&str, Span> = HashMap::new();
    for item in &program.items {
        match item {
            Item::Func(func) => {
                if seen_funcs.insert(func.name.as_str(), func.name_span).is_some() {
                    reports.push(ValidationReport {
                        span: func.name_span,
                        severity: ReportSeverity::Warning,
                        message: format!("function `{}` is declared more than once", func.name),
                    });
                }
                check_func(func, &mut reports);
            }
            Item::Let(l) => check_let(l, &mut reports),
            _ => {}
        }
    }

    reports.sort_by_key(|r| (r.span.start, r.span.end));
    reports
}

fn check_func(func: &FuncDecl, reports: &mut Vec<ValidationReport>) {
    let mut seen_params: HashMap<&str, Span> = HashMap::new();
    for param in &func.params {
        if seen_params.insert(param.name.as_str(), param.name_span).is_some() {
            reports.push(ValidationReport {
                span: param.name_span,
                severity: ReportSeverity::Error,
                message: format!(
                    "parameter `{}` is declared more than once in `{}`",
                    param.name, func.name
                ),
            });
        }
    }
    check_block(&func.body, reports);
}

fn check_let(l: &LetDecl, reports: &mut Vec<ValidationReport>) {
    if l.ty.is_none() && l.init.is_none() {
        reports.push(ValidationReport {
            span: l.span,
            severity: ReportSeverity::Warning,
            message: format!("`{}` has neither a type annotation nor an initializer", l.name),
        });
    }
}

fn check_block(block: &Block, reports: &mut Vec<ValidationReport>) {
    let mut returned: Option<Span> = None;
    for stmt in &block.stmts {
        if let Some(ret_span) = returned {
            reports.push(ValidationReport {
                span: stmt.span(),
                severity: ReportSeverity::Warning,
                message: format!("unreachable statement after return at {ret_span}"),
            });
        }
        match stmt {
            Stmt::Return(r) => returned = Some(r.span),
            Stmt::Let(l) => check_let(l, reports),
            Stmt::If(i) => {
                check_block(&i.then_block, reports);
                if let Some(else_branch) = &i.else_branch {
                    check_stmt(else_branch, reports);
                }
            }
            Stmt::While(w) => check_block(&w.body, reports),
            Stmt::For(f) => check_block(&f.body, reports),
            Stmt::Block(b) => check_block(b, reports),
            _ => {}
        }
    }
}

fn check_stmt(stmt: &Stmt, reports: &mut Vec<ValidationReport>) {
    match stmt {
        Stmt::Block(b) => check_block(b, reports),
        Stmt::If(i) => {
            check_block(&i.then_block, reports);
            if let Some(else_branch) = &i.else_branch {
                check_stmt(else_branch, reports);
            }
        }
        Stmt::Let(l) => check_let(l, reports),
        Stmt::While(w) => check_block(&w.body, reports),
        Stmt::For(f) => check_block(&f.body, reports),
        _ => {}
    }
}
