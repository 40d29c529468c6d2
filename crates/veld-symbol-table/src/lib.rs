//! Symbol table for Veld documents.
//!
//! Built by walking the AST; indexed by simple name. Name collisions keep
//! every entry, and position-sensitive lookups resolve ties with the most
//! deeply enclosing scope span.

use rustc_hash::FxHashMap;
use veld_parser::ast::{
    self, Block, FuncDecl, Item, LetDecl, Program, Stmt,
};
use veld_position_tracking::Span;

/// Classification of a symbol, mapped onto the LSP numeric enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Variable,
    Constant,
    Parameter,
    Struct,
    Enum,
    EnumMember,
    Trait,
    Field,
}

impl SymbolKind {
    /// LSP `SymbolKind` numeric value.
    pub fn to_lsp(self) -> u32 {
        match self {
            SymbolKind::Function => 12,
            SymbolKind::Variable | SymbolKind::Parameter => 13,
            SymbolKind::Constant => 14,
            SymbolKind::Struct => 23,
            SymbolKind::Enum => 10,
            SymbolKind::EnumMember => 22,
            SymbolKind::Trait => 11,
            SymbolKind::Field => 8,
        }
    }

    /// LSP `CompletionItemKind` numeric value.
    pub fn to_lsp_completion(self) -> u32 {
        match self {
            SymbolKind::Function => 3,
            SymbolKind::Variable | SymbolKind::Parameter => 6,
            SymbolKind::Constant => 21,
            SymbolKind::Struct => 22,
            SymbolKind::Enum => 13,
            SymbolKind::EnumMember => 20,
            SymbolKind::Trait => 8,
            SymbolKind::Field => 5,
        }
    }
}

/// A symbol definition with the metadata IDE features need.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolInfo {
    /// Simple name
    pub name: String,
    /// Classification
    pub kind: SymbolKind,
    /// Span of the identifier at its defining occurrence
    pub decl_span: Span,
    /// Rendered signature or `name: Type` detail string
    pub detail: String,
    /// Span of the syntactic region the symbol is visible in
    pub scope_span: Span,
}

/// A top-level declaration row, the unit aggregated by the workspace index.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub name_span: Span,
    pub kind: SymbolKind,
    pub detail: String,
}

/// Per-document symbol index keyed by simple name.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: FxHashMap<String, Vec<SymbolInfo>>,
}

impl SymbolTable {
    /// Build the table by walking a parsed program.
    pub fn extract(program: &Program) -> Self {
        let mut table = SymbolTable::default();
        let file_scope = program.span;
        for item in &program.items {
            match item {
                Item::Func(func) => table.add_func(func),
                Item::Let(l) => table.add_let(l, file_scope),
                Item::Struct(s) => {
                    table.add(SymbolInfo {
                        name: s.name.clone(),
                        kind: SymbolKind::Struct,
                        decl_span: s.name_span,
                        detail: format!("struct {}", s.name),
                        scope_span: file_scope,
                    });
                    for field in &s.fields {
                        table.add(SymbolInfo {
                            name: field.name.clone(),
                            kind: SymbolKind::Field,
                            decl_span: field.name_span,
                            detail: format!("{}: {}", field.name, ast::render_type(&field.ty)),
                            scope_span: s.span,
                        });
                    }
                }
                Item::Enum(e) => {
                    table.add(SymbolInfo {
                        name: e.name.clone(),
                        kind: SymbolKind::Enum,
                        decl_span: e.name_span,
                        detail: format!("enum {}", e.name),
                        scope_span: file_scope,
                    });
                    for variant in &e.variants {
                        table.add(SymbolInfo {
                            name: variant.name.clone(),
                            kind: SymbolKind::EnumMember,
                            decl_span: variant.name_span,
                            detail: format!("{}::{}", e.name, variant.name),
                            scope_span: file_scope,
                        });
                    }
                }
                Item::Trait(t) => {
                    table.add(SymbolInfo {
                        name: t.name.clone(),
                        kind: SymbolKind::Trait,
                        decl_span: t.name_span,
                        detail: format!("trait {}", t.name),
                        scope_span: file_scope,
                    });
                    for sig in &t.methods {
                        table.add(SymbolInfo {
                            name: sig.name.clone(),
                            kind: SymbolKind::Function,
                            decl_span: sig.name_span,
                            detail: ast::render_signature(&sig.name, &sig.params, sig.ret.as_ref()),
                            scope_span: t.span,
                        });
                    }
                }
                Item::Import(_) => {}
            }
        }
        table
    }

    fn add(&mut self, info: SymbolInfo) {
        self.symbols.entry(info.name.clone()).or_default().push(info);
    }

    fn add_func(&mut self, func: &FuncDecl) {
        self.add(SymbolInfo {
            name: func.name.clone(),
            kind: SymbolKind::Function,
            decl_span: func.name_span,
            detail: ast::render_signature(&func.name, &func.params, func.ret.as_ref()),
            scope_span: func.span,
        });
        for param in &func.params {
            let detail = match &param.ty {
                Some(ty) => format!("{}: {}", param.name, ast::render_type(ty)),
                None => param.name.clone(),
            };
            self.add(SymbolInfo {
                name: param.name.clone(),
                kind: SymbolKind::Parameter,
                decl_span: param.name_span,
                detail,
                scope_span: func.span,
            });
        }
        self.add_block(&func.body);
    }

    /// Variables are visible through the block that declares them.
    fn add_let(&mut self, l: &LetDecl, scope: Span) {
        let detail = match &l.ty {
            Some(ty) => format!("{}: {}", l.name, ast::render_type(ty)),
            None => l.name.clone(),
        };
        self.add(SymbolInfo {
            name: l.name.clone(),
            kind: if l.is_const { SymbolKind::Constant } else { SymbolKind::Variable },
            decl_span: l.name_span,
            detail,
            scope_span: scope,
        });
    }

    fn add_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.add_stmt(stmt, block.span);
        }
    }

    fn add_stmt(&mut self, stmt: &Stmt, enclosing: Span) {
        match stmt {
            Stmt::Let(l) => self.add_let(l, enclosing),
            Stmt::If(i) => {
                self.add_block(&i.then_block);
                if let Some(else_branch) = &i.else_branch {
                    self.add_stmt(else_branch, enclosing);
                }
            }
            Stmt::While(w) => self.add_block(&w.body),
            Stmt::For(f) => {
                self.add(SymbolInfo {
                    name: f.var.clone(),
                    kind: SymbolKind::Variable,
                    decl_span: f.var_span,
                    detail: f.var.clone(),
                    scope_span: f.span,
                });
                self.add_block(&f.body);
            }
            Stmt::Block(b) => self.add_block(b),
            _ => {}
        }
    }

    /// All entries for `name`, in declaration order. Empty when unknown.
    pub fn entries(&self, name: &str) -> &[SymbolInfo] {
        self.symbols.get(name).map_or(&[], |v| v.as_slice())
    }

    /// Whether any entry declares `name`.
    pub fn declares(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Resolve `name` as seen from `offset`: the entry with the most deeply
    /// enclosing scope containing the offset wins; among equals, the latest
    /// declaration at or before the offset, then declaration order.
    pub fn best_match(&self, name: &str, offset: usize) -> Option<&SymbolInfo> {
        let entries = self.entries(name);
        entries
            .iter()
            .filter(|s| s.scope_span.contains(offset) || s.scope_span.end == offset)
            .min_by_key(|s| {
                let before = s.decl_span.start <= offset;
                // Narrower scope first; among equal scopes prefer the most
                // recent declaration before the query offset.
                (s.scope_span.len(), if before { usize::MAX - s.decl_span.start } else { usize::MAX })
            })
            .or_else(|| entries.first())
    }

    /// Iterate over every symbol in the table.
    pub fn all_symbols(&self) -> impl Iterator<Item = &SymbolInfo> {
        self.symbols.values().flatten()
    }

    /// Names with at least one entry, unsorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(|s| s.as_str())
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Top-level declaration sites of a program, the rows a workspace index
/// aggregates. Local variables and parameters are deliberately excluded:
/// cross-file features operate on file-scope names only.
pub fn top_level_declarations(program: &Program) -> Vec<Declaration> {
    let mut rows = Vec::new();
    for item in &program.items {
        match item {
            Item::Func(f) => rows.push(Declaration {
                name: f.name.clone(),
                name_span: f.name_span,
                kind: SymbolKind::Function,
                detail: ast::render_signature(&f.name, &f.params, f.ret.as_ref()),
            }),
            Item::Let(l) => rows.push(Declaration {
                name: l.name.clone(),
                name_span: l.name_span,
                kind: if l.is_const { SymbolKind::Constant } else { SymbolKind::Variable },
                detail: match &l.ty {
                    Some(ty) => format!("{}: {}", l.name, ast::render_type(ty)),
                    None => l.name.clone(),
                },
            }),
            Item::Struct(s) => rows.push(Declaration {
                name: s.name.clone(),
                name_span: s.name_span,
                kind: SymbolKind::Struct,
                detail: format!("struct {}", s.name),
            }),
            Item::Enum(e) => rows.push(Declaration {
                name: e.name.clone(),
                name_span: e.name_span,
                kind: SymbolKind::Enum,
                detail: format!("enum {}", e.name),
            }),
            Item::Trait(t) => rows.push(Declaration {
                name: t.name.clone(),
                name_span: t.name_span,
                kind: SymbolKind::Trait,
                detail: format!("trait {}", t.name),
            }),
            Item::Import(_) => {}
        }
    }
    rows
}
