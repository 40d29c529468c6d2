//! Completion provider and `completionItem/resolve`.

use crate::analysis::Analysis;
use crate::state::ServerState;
use phf::phf_map;
use rustc_hash::FxHashMap;
use serde_json::{json, Value};
use std::collections::HashSet;
use veld_lexer::TokenKind;
use veld_parser::ast;
use veld_symbol_table::SymbolKind;
use veld_workspace_index::Document;

/// Hard cap on returned items.
const MAX_ITEMS: usize = 200;

/// LSP `CompletionItemKind::Keyword`.
const KIND_KEYWORD: u32 = 14;
/// LSP `CompletionItemKind::Text`, for identifiers with no symbol entry.
const KIND_TEXT: u32 = 1;

struct KeywordInfo {
    detail: &'static str,
    documentation: &'static str,
    snippet: Option<&'static str>,
}

static KEYWORD_TABLE: phf::Map<&'static str, KeywordInfo> = phf_map! {
    "func" => KeywordInfo {
        detail: "func name(params) -> Ret { }",
        documentation: "Declare a function.",
        snippet: Some("func ${1:name}($2) {\n    $0\n}"),
    },
    "let" => KeywordInfo {
        detail: "let name = value",
        documentation: "Declare a variable.",
        snippet: Some("let ${1:name} = $0"),
    },
    "const" => KeywordInfo {
        detail: "const name = value",
        documentation: "Declare a constant.",
        snippet: Some("const ${1:name} = $0"),
    },
    "return" => KeywordInfo {
        detail: "return value",
        documentation: "Return from the enclosing function.",
        snippet: None,
    },
    "if" => KeywordInfo {
        detail: "if cond { }",
        documentation: "Conditional branch.",
        snippet: Some("if ${1:cond} {\n    $0\n}"),
    },
    "else" => KeywordInfo {
        detail: "else { }",
        documentation: "Alternative branch of an if.",
        snippet: None,
    },
    "while" => KeywordInfo {
        detail: "while cond { }",
        documentation: "Loop while a condition holds.",
        snippet: Some("while ${1:cond} {\n    $0\n}"),
    },
    "for" => KeywordInfo {
        detail: "for item in iterable { }",
        documentation: "Iterate over a sequence.",
        snippet: Some("for ${1:item} in ${2:iterable} {\n    $0\n}"),
    },
    "in" => KeywordInfo {
        detail: "for item in iterable",
        documentation: "Separates the loop variable from the iterable.",
        snippet: None,
    },
    "break" => KeywordInfo {
        detail: "break",
        documentation: "Exit the innermost loop.",
        snippet: None,
    },
    "continue" => KeywordInfo {
        detail: "continue",
        documentation: "Skip to the next loop iteration.",
        snippet: None,
    },
    "struct" => KeywordInfo {
        detail: "struct Name { field: Type }",
        documentation: "Declare a record type.",
        snippet: Some("struct ${1:Name} {\n    $0\n}"),
    },
    "enum" => KeywordInfo {
        detail: "enum Name { Variant }",
        documentation: "Declare a sum type.",
        snippet: Some("enum ${1:Name} {\n    $0\n}"),
    },
    "trait" => KeywordInfo {
        detail: "trait Name { }",
        documentation: "Declare an interface of function signatures.",
        snippet: Some("trait ${1:Name} {\n    $0\n}"),
    },
    "impl" => KeywordInfo {
        detail: "impl Trait for Type { }",
        documentation: "Implement a trait.",
        snippet: None,
    },
    "import" => KeywordInfo {
        detail: "import path::to::module",
        documentation: "Bring a module into scope.",
        snippet: None,
    },
    "match" => KeywordInfo {
        detail: "match value { }",
        documentation: "Pattern-match on a value.",
        snippet: None,
    },
    "true" => KeywordInfo {
        detail: "Bool",
        documentation: "Boolean true literal.",
        snippet: None,
    },
    "false" => KeywordInfo {
        detail: "Bool",
        documentation: "Boolean false literal.",
        snippet: None,
    },
};

/// The identifier prefix immediately before `offset`.
fn prefix_at(text: &str, offset: usize) -> &str {
    let bytes = text.as_bytes();
    let mut start = offset.min(text.len());
    while start > 0 {
        let b = bytes[start - 1];
        if b.is_ascii_alphanumeric() || b == b'_' {
            start -= 1;
        } else {
            break;
        }
    }
    &text[start..offset.min(text.len())]
}

/// Completion items at `offset`: keywords, document identifiers ranked by
/// frequency, and workspace symbols, deduplicated by label.
pub fn completion(
    uri: &str,
    doc: &Document,
    analysis: &Analysis,
    state: &ServerState,
    offset: usize,
) -> Value {
    let prefix = prefix_at(&doc.text, offset);
    let mut items: Vec<Value> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    // (a) language keywords
    let mut keywords: Vec<&str> = KEYWORD_TABLE.keys().copied().collect();
    keywords.sort_unstable();
    for keyword in keywords {
        if !keyword.starts_with(prefix) {
            continue;
        }
        let Some(info) = KEYWORD_TABLE.get(keyword) else { continue };
        let mut item = json!({
            "label": keyword,
            "kind": KIND_KEYWORD,
            "detail": info.detail,
            "documentation": info.documentation,
            "data": { "kind": "keyword" },
        });
        if let Some(snippet) = info.snippet {
            item["insertText"] = json!(snippet);
            item["insertTextFormat"] = json!(2);
        }
        seen.insert(keyword.to_string());
        items.push(item);
    }

    // (b) identifiers observed in the document, by frequency then name
    let mut freq: FxHashMap<&str, usize> = FxHashMap::default();
    for token in &analysis.tokens {
        if token.kind == TokenKind::Identifier && token.text.starts_with(prefix) {
            *freq.entry(token.text.as_ref()).or_default() += 1;
        }
    }
    let mut ranked: Vec<(&str, usize)> = freq.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    for (name, _) in ranked {
        if seen.contains(name) {
            continue;
        }
        let item = match analysis.symbols.entries(name).first() {
            Some(symbol) => {
                let mut item = json!({
                    "label": name,
                    "kind": symbol.kind.to_lsp_completion(),
                    "detail": symbol.detail,
                    "data": { "kind": "symbol", "uri": uri },
                });
                if symbol.kind == SymbolKind::Function {
                    item["insertText"] = json!(format!("{name}($0)"));
                    item["insertTextFormat"] = json!(2);
                }
                item
            }
            None => json!({
                "label": name,
                "kind": KIND_TEXT,
                "data": { "kind": "symbol", "uri": uri },
            }),
        };
        seen.insert(name.to_string());
        items.push(item);
    }

    // (c) workspace symbols
    if !prefix.is_empty() {
        let workspace = state.workspace.read();
        for (decl_uri, decl) in workspace.query_prefix(prefix, MAX_ITEMS) {
            if seen.contains(&decl.name) {
                continue;
            }
            let mut item = json!({
                "label": decl.name,
                "kind": decl.kind.to_lsp_completion(),
                "detail": decl.detail,
                "data": { "kind": "symbol", "uri": decl_uri },
            });
            if decl.kind == SymbolKind::Function {
                item["insertText"] = json!(format!("{}($0)", decl.name));
                item["insertTextFormat"] = json!(2);
            }
            seen.insert(decl.name.clone());
            items.push(item);
        }
    }

    items.truncate(MAX_ITEMS);
    json!({ "isIncomplete": false, "items": items })
}

/// Enrich a completion item with detail and documentation.
pub fn resolve(state: &ServerState, mut item: Value) -> Value {
    let label = item["label"].as_str().unwrap_or_default().to_string();
    match item["data"]["kind"].as_str() {
        Some("keyword") => {
            if let Some(info) = KEYWORD_TABLE.get(label.as_str()) {
                item["detail"] = json!(info.detail);
                item["documentation"] =
                    json!({ "kind": "markdown", "value": info.documentation });
            }
        }
        Some("symbol") => {
            let Some(uri) = item["data"]["uri"].as_str().map(str::to_string) else {
                return item;
            };
            let fresh;
            let analysis = match state.analysis(&uri) {
                Some(analysis) => analysis,
                None => match state.text_for_uri(&uri) {
                    Some(text) => {
                        fresh = Analysis::full(&text);
                        &fresh
                    }
                    None => return item,
                },
            };
            if let Some(symbol) = analysis.symbols.entries(&label).first() {
                item["detail"] = json!(symbol.detail);
                if let Some(doc_text) = symbol_documentation(analysis, &label) {
                    item["documentation"] = json!({ "kind": "markdown", "value": doc_text });
                }
            }
        }
        _ => {}
    }
    item
}

/// Short documentation for a symbol: parameters and return type for
/// functions, declared type for variables.
fn symbol_documentation(analysis: &Analysis, name: &str) -> Option<String> {
    if let Some(func) = ast::find_func(&analysis.program, name) {
        let mut lines = Vec::new();
        if !func.params.is_empty() {
            let params: Vec<String> = func
                .params
                .iter()
                .map(|p| match &p.ty {
                    Some(ty) => format!("`{}: {}`", p.name, ast::render_type(ty)),
                    None => format!("`{}`", p.name),
                })
                .collect();
            lines.push(format!("Parameters: {}", params.join(", ")));
        }
        if let Some(ret) = &func.ret {
            lines.push(format!("Returns: `{}`", ast::render_type(ret)));
        }
        if lines.is_empty() {
            return None;
        }
        return Some(lines.join("\n\n"));
    }
    let symbol = analysis.symbols.entries(name).first()?;
    symbol
        .detail
        .split_once(": ")
        .map(|(_, ty)| format!("Declared type: `{ty}`"))
}
