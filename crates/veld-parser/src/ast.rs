//! AST node definitions for Veld.
//!
//! Every node carries a byte [`Span`] over the source buffer. Feature
//! providers mostly consume the trimmed shape interface ([`NodeRef`],
//! [`node_at_offset`], [`visit`]) rather than matching on the full tree.

use veld_position_tracking::Span;

/// Root of a parsed file: a sequence of top-level declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub items: Vec<Item>,
    pub span: Span,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Func(FuncDecl),
    Let(LetDecl),
    Struct(StructDecl),
    Enum(EnumDecl),
    Trait(TraitDecl),
    Import(ImportDecl),
}

impl Item {
    pub fn span(&self) -> Span {
        match self {
            Item::Func(f) => f.span,
            Item::Let(l) => l.span,
            Item::Struct(s) => s.span,
            Item::Enum(e) => e.span,
            Item::Trait(t) => t.span,
            Item::Import(i) => i.span,
        }
    }
}

/// `func name(p: Type, ...) -> Ret { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub name_span: Span,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    pub body: Block,
    pub span: Span,
}

/// A function parameter `name: Type`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub name_span: Span,
    pub ty: Option<TypeExpr>,
    pub span: Span,
}

/// `let name[: Type] [= init]` or `const name[: Type] = init`, at the top
/// level or inside a block.
#[derive(Debug, Clone, PartialEq)]
pub struct LetDecl {
    pub name: String,
    pub name_span: Span,
    pub ty: Option<TypeExpr>,
    pub init: Option<Expr>,
    pub is_const: bool,
    pub span: Span,
}

/// `struct Name { field: Type, ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: String,
    pub name_span: Span,
    pub fields: Vec<FieldDecl>,
    pub span: Span,
}

/// A struct field `name: Type`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub name_span: Span,
    pub ty: TypeExpr,
    pub span: Span,
}

/// `enum Name { Variant, ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: String,
    pub name_span: Span,
    pub variants: Vec<VariantDecl>,
    pub span: Span,
}

/// A single enum variant.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantDecl {
    pub name: String,
    pub name_span: Span,
    pub span: Span,
}

/// `trait Name { func sig(...) -> Ret ... }` (signatures only).
#[derive(Debug, Clone, PartialEq)]
pub struct TraitDecl {
    pub name: String,
    pub name_span: Span,
    pub methods: Vec<FuncSig>,
    pub span: Span,
}

/// A bodiless function signature inside a trait.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncSig {
    pub name: String,
    pub name_span: Span,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    pub span: Span,
}

/// `import path::to::module`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub path: String,
    pub span: Span,
}

/// A brace-delimited statement sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// A statement inside a block.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let(LetDecl),
    Return(ReturnStmt),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Expr(Expr),
    Block(Block),
    Break(Span),
    Continue(Span),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Let(l) => l.span,
            Stmt::Return(r) => r.span,
            Stmt::If(i) => i.span,
            Stmt::While(w) => w.span,
            Stmt::For(f) => f.span,
            Stmt::Expr(e) => e.span,
            Stmt::Block(b) => b.span,
            Stmt::Break(s) | Stmt::Continue(s) => *s,
        }
    }
}

/// `return [expr]`
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

/// `if cond { ... } [else ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_block: Block,
    pub else_branch: Option<Box<Stmt>>,
    pub span: Span,
}

/// `while cond { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Block,
    pub span: Span,
}

/// `for var in iter { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub var: String,
    pub var_span: Span,
    pub iter: Expr,
    pub body: Block,
    pub span: Span,
}

/// An expression with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntLit,
    FloatLit,
    StrLit,
    CharLit,
    BoolLit(bool),
    Ident(String),
    Path(Vec<(String, Span)>),
    Call { callee: Box<Expr>, args: Vec<Expr> },
    Field { base: Box<Expr>, name: String, name_span: Span },
    Index { base: Box<Expr>, index: Box<Expr> },
    Unary { op: String, operand: Box<Expr> },
    Binary { op: String, lhs: Box<Expr>, rhs: Box<Expr> },
    Assign { target: Box<Expr>, value: Box<Expr> },
    Paren(Box<Expr>),
    /// Placeholder emitted during error recovery.
    Error,
}

impl Expr {
    /// Name of the called function for a direct call expression.
    pub fn callee_name(&self) -> Option<&str> {
        if let ExprKind::Call { callee, .. } = &self.kind {
            match &callee.kind {
                ExprKind::Ident(name) => return Some(name),
                ExprKind::Path(segments) => return segments.last().map(|(n, _)| n.as_str()),
                _ => {}
            }
        }
        None
    }

    /// Obvious type of a literal expression, when there is one.
    pub fn literal_type_name(&self) -> Option<&'static str> {
        match self.kind {
            ExprKind::IntLit => Some("Int"),
            ExprKind::FloatLit => Some("Float"),
            ExprKind::StrLit => Some("String"),
            ExprKind::CharLit => Some("Char"),
            ExprKind::BoolLit(_) => Some("Bool"),
            _ => None,
        }
    }
}

/// A type annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub kind: TypeKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Named(String),
    Array(Box<TypeExpr>),
}

/// Render a type annotation back to source form.
pub fn render_type(ty: &TypeExpr) -> String {
    match &ty.kind {
        TypeKind::Named(name) => name.clone(),
        TypeKind::Array(inner) => format!("[{}]", render_type(inner)),
    }
}

/// Render a function signature: `func name(a: Int, b) -> Ret`.
pub fn render_signature(name: &str, params: &[Param], ret: Option<&TypeExpr>) -> String {
    let params: Vec<String> = params
        .iter()
        .map(|p| match &p.ty {
            Some(ty) => format!("{}: {}", p.name, render_type(ty)),
            None => p.name.clone(),
        })
        .collect();
    let mut sig = format!("func {}({})", name, params.join(", "));
    if let Some(ret) = ret {
        sig.push_str(" -> ");
        sig.push_str(&render_type(ret));
    }
    sig
}

// ---------------------------------------------------------------------------
// Shape interface
// ---------------------------------------------------------------------------

/// A borrowed view of any AST node: span plus enough identity for feature
/// providers, without exposing tree internals.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Program(&'a Program),
    Item(&'a Item),
    Func(&'a FuncDecl),
    Sig(&'a FuncSig),
    Param(&'a Param),
    Let(&'a LetDecl),
    Field(&'a FieldDecl),
    Variant(&'a VariantDecl),
    Type(&'a TypeExpr),
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    Block(&'a Block),
}

impl NodeRef<'_> {
    pub fn span(&self) -> Span {
        match self {
            NodeRef::Program(p) => p.span,
            NodeRef::Item(i) => i.span(),
            NodeRef::Func(f) => f.span,
            NodeRef::Sig(s) => s.span,
            NodeRef::Param(p) => p.span,
            NodeRef::Let(l) => l.span,
            NodeRef::Field(f) => f.span,
            NodeRef::Variant(v) => v.span,
            NodeRef::Type(t) => t.span,
            NodeRef::Stmt(s) => s.span(),
            NodeRef::Expr(e) => e.span,
            NodeRef::Block(b) => b.span,
        }
    }

    /// Short human-readable description, used by hover.
    pub fn describe(&self) -> String {
        match self {
            NodeRef::Program(_) => "source file".to_string(),
            NodeRef::Item(Item::Import(i)) => format!("import of `{}`", i.path),
            NodeRef::Item(item) => format!("{} declaration", item_kind_name(item)),
            NodeRef::Func(f) => format!("function declaration `{}`", f.name),
            NodeRef::Sig(s) => format!("trait method signature `{}`", s.name),
            NodeRef::Param(p) => format!("parameter `{}`", p.name),
            NodeRef::Let(l) => {
                if l.is_const {
                    format!("constant declaration `{}`", l.name)
                } else {
                    format!("variable declaration `{}`", l.name)
                }
            }
            NodeRef::Field(f) => format!("field `{}`", f.name),
            NodeRef::Variant(v) => format!("enum variant `{}`", v.name),
            NodeRef::Type(t) => format!("type `{}`", render_type(t)),
            NodeRef::Stmt(s) => stmt_kind_name(s).to_string(),
            NodeRef::Expr(e) => expr_kind_name(e).to_string(),
            NodeRef::Block(_) => "block".to_string(),
        }
    }

    /// Type summary for type nodes, `None` otherwise.
    pub fn type_summary(&self) -> Option<String> {
        match self {
            NodeRef::Type(t) => Some(render_type(t)),
            _ => None,
        }
    }
}

fn item_kind_name(item: &Item) -> &'static str {
    match item {
        Item::Func(_) => "function",
        Item::Let(_) => "variable",
        Item::Struct(_) => "struct",
        Item::Enum(_) => "enum",
        Item::Trait(_) => "trait",
        Item::Import(_) => "import",
    }
}

fn stmt_kind_name(stmt: &Stmt) -> &'static str {
    match stmt {
        Stmt::Let(_) => "variable declaration",
        Stmt::Return(_) => "return statement",
        Stmt::If(_) => "if statement",
        Stmt::While(_) => "while loop",
        Stmt::For(_) => "for loop",
        Stmt::Expr(_) => "expression statement",
        Stmt::Block(_) => "block",
        Stmt::Break(_) => "break statement",
        Stmt::Continue(_) => "continue statement",
    }
}

fn expr_kind_name(expr: &Expr) -> &'static str {
    match expr.kind {
        ExprKind::IntLit => "integer literal",
        ExprKind::FloatLit => "float literal",
        ExprKind::StrLit => "string literal",
        ExprKind::CharLit => "char literal",
        ExprKind::BoolLit(_) => "boolean literal",
        ExprKind::Ident(_) => "identifier",
        ExprKind::Path(_) => "path expression",
        ExprKind::Call { .. } => "call expression",
        ExprKind::Field { .. } => "field access",
        ExprKind::Index { .. } => "index expression",
        ExprKind::Unary { .. } => "unary expression",
        ExprKind::Binary { .. } => "binary expression",
        ExprKind::Assign { .. } => "assignment",
        ExprKind::Paren(_) => "parenthesized expression",
        ExprKind::Error => "unparsed expression",
    }
}

/// Pre-order walk over every node in the program.
pub fn visit<'a>(program: &'a Program, f: &mut impl FnMut(NodeRef<'a>)) {
    f(NodeRef::Program(program));
    for item in &program.items {
        visit_item(item, f);
    }
}

fn visit_item<'a>(item: &'a Item, f: &mut impl FnMut(NodeRef<'a>)) {
    f(NodeRef::Item(item));
    match item {
        Item::Func(func) => visit_func(func, f),
        Item::Let(l) => visit_let(l, f),
        Item::Struct(s) => {
            for field in &s.fields {
                f(NodeRef::Field(field));
                visit_type(&field.ty, f);
            }
        }
        Item::Enum(e) => {
            for variant in &e.variants {
                f(NodeRef::Variant(variant));
            }
        }
        Item::Trait(t) => {
            for sig in &t.methods {
                f(NodeRef::Sig(sig));
                for p in &sig.params {
                    f(NodeRef::Param(p));
                    if let Some(ty) = &p.ty {
                        visit_type(ty, f);
                    }
                }
                if let Some(ret) = &sig.ret {
                    visit_type(ret, f);
                }
            }
        }
        Item::Import(_) => {}
    }
}

fn visit_func<'a>(func: &'a FuncDecl, f: &mut impl FnMut(NodeRef<'a>)) {
    f(NodeRef::Func(func));
    for p in &func.params {
        f(NodeRef::Param(p));
        if let Some(ty) = &p.ty {
            visit_type(ty, f);
        }
    }
    if let Some(ret) = &func.ret {
        visit_type(ret, f);
    }
    visit_block(&func.body, f);
}

fn visit_let<'a>(l: &'a LetDecl, f: &mut impl FnMut(NodeRef<'a>)) {
    f(NodeRef::Let(l));
    if let Some(ty) = &l.ty {
        visit_type(ty, f);
    }
    if let Some(init) = &l.init {
        visit_expr(init, f);
    }
}

fn visit_type<'a>(ty: &'a TypeExpr, f: &mut impl FnMut(NodeRef<'a>)) {
    f(NodeRef::Type(ty));
    if let TypeKind::Array(inner) = &ty.kind {
        visit_type(inner, f);
    }
}

fn visit_block<'a>(block: &'a Block, f: &mut impl FnMut(NodeRef<'a>)) {
    f(NodeRef::Block(block));
    for stmt in &block.stmts {
        visit_stmt(stmt, f);
    }
}

fn visit_stmt<'a>(stmt: &'a Stmt, f: &mut impl FnMut(NodeRef<'a>)) {
    f(NodeRef::Stmt(stmt));
    match stmt {
        Stmt::Let(l) => visit_let(l, f),
        Stmt::Return(r) => {
            if let Some(v) = &r.value {
                visit_expr(v, f);
            }
        }
        Stmt::If(i) => {
            visit_expr(&i.cond, f);
            visit_block(&i.then_block, f);
            if let Some(else_branch) = &i.else_branch {
                visit_stmt(else_branch, f);
            }
        }
        Stmt::While(w) => {
            visit_expr(&w.cond, f);
            visit_block(&w.body, f);
        }
        Stmt::For(fo) => {
            visit_expr(&fo.iter, f);
            visit_block(&fo.body, f);
        }
        Stmt::Expr(e) => visit_expr(e, f),
        Stmt::Block(b) => visit_block(b, f),
        Stmt::Break(_) | Stmt::Continue(_) => {}
    }
}

fn visit_expr<'a>(expr: &'a Expr, f: &mut impl FnMut(NodeRef<'a>)) {
    f(NodeRef::Expr(expr));
    match &expr.kind {
        ExprKind::Call { callee, args } => {
            visit_expr(callee, f);
            for a in args {
                visit_expr(a, f);
            }
        }
        ExprKind::Field { base, .. } => visit_expr(base, f),
        ExprKind::Index { base, index } => {
            visit_expr(base, f);
            visit_expr(index, f);
        }
        ExprKind::Unary { operand, .. } => visit_expr(operand, f),
        ExprKind::Binary { lhs, rhs, .. } => {
            visit_expr(lhs, f);
            visit_expr(rhs, f);
        }
        ExprKind::Assign { target, value } => {
            visit_expr(target, f);
            visit_expr(value, f);
        }
        ExprKind::Paren(inner) => visit_expr(inner, f),
        _ => {}
    }
}

/// Find the most specific node whose span contains `offset`.
///
/// Ties between nodes with identical spans resolve to the later (deeper)
/// visit, so the innermost node wins.
pub fn node_at_offset(program: &Program, offset: usize) -> Option<NodeRef<'_>> {
    let mut best: Option<NodeRef<'_>> = None;
    visit(program, &mut |node| {
        let span = node.span();
        if !span.contains(offset) && !(span.is_empty() && span.start == offset) {
            return;
        }
        match best {
            Some(b) if b.span().len() < span.len() => {}
            _ => best = Some(node),
        }
    });
    best
}

/// Find the function declaration named `name`, if any.
pub fn find_func<'a>(program: &'a Program, name: &str) -> Option<&'a FuncDecl> {
    program.items.iter().find_map(|item| match item {
        Item::Func(f) if f.name == name => Some(f),
        _ => None,
    })
}

/// Find the innermost function whose span contains `offset`.
pub fn enclosing_func(program: &Program, offset: usize) -> Option<&FuncDecl> {
    program.items.iter().find_map(|item| match item {
        Item::Func(f) if f.span.contains(offset) => Some(f),
        _ => None,
    })
}
