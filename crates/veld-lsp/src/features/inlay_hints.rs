//! Inlay hints provider.
//!
//! Three hint families over the requested line range: parameter names at
//! call-site argument starts, return types at call ends, and variable types
//! after declared names. Kinds follow LSP: Type = 1, Parameter = 2.

use crate::analysis::Analysis;
use serde_json::{json, Value};
use veld_parser::ast::{self, ExprKind, NodeRef};
use veld_workspace_index::Document;

const KIND_TYPE: u32 = 1;
const KIND_PARAMETER: u32 = 2;

/// Inlay hints whose anchor line falls within `[start_line, end_line]`.
pub fn inlay_hints(
    doc: &Document,
    analysis: &Analysis,
    start_line: u32,
    end_line: u32,
) -> Vec<Value> {
    let mut hints = Vec::new();

    ast::visit(&analysis.program, &mut |node| match node {
        NodeRef::Expr(expr) => {
            let ExprKind::Call { args, .. } = &expr.kind else { return };
            let Some(callee) = expr.callee_name() else { return };
            let Some(func) = ast::find_func(&analysis.program, callee) else { return };

            for (param, arg) in func.params.iter().zip(args.iter()) {
                hints.push((
                    arg.span.start,
                    json!({
                        "label": format!("{}:", param.name),
                        "kind": KIND_PARAMETER,
                        "paddingRight": true,
                    }),
                ));
            }
            if let Some(ret) = &func.ret {
                hints.push((
                    expr.span.end,
                    json!({
                        "label": format!("-> {}", ast::render_type(ret)),
                        "kind": KIND_TYPE,
                        "paddingLeft": true,
                    }),
                ));
            }
        }
        NodeRef::Let(decl) => {
            let ty = match (&decl.ty, &decl.init) {
                (Some(ty), _) => Some(ast::render_type(ty)),
                (None, Some(init)) => init.literal_type_name().map(str::to_string),
                (None, None) => None,
            };
            if let Some(ty) = ty {
                hints.push((
                    decl.name_span.end,
                    json!({
                        "label": format!(": {ty}"),
                        "kind": KIND_TYPE,
                    }),
                ));
            }
        }
        _ => {}
    });

    let mut out = Vec::new();
    for (offset, mut hint) in hints {
        let Some((line, character)) = doc.line_index.offset_to_position(&doc.text, offset)
        else {
            continue;
        };
        if line < start_line || line > end_line {
            continue;
        }
        hint["position"] = json!({ "line": line, "character": character });
        out.push(hint);
    }
    out.sort_by_key(|h| {
        (h["position"]["line"].as_u64().unwrap_or(0), h["position"]["character"].as_u64().unwrap_or(0))
    });
    out
}
