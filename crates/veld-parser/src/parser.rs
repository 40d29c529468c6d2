//! Recursive-descent parser with error recovery.

use crate::ast::*;
use veld_lexer::{tokenize, Token, TokenKind};
use veld_position_tracking::Span;

/// Upper bound on recorded errors; parsing continues silently past it.
const MAX_ERRORS: usize = 100;

/// A recoverable parse error at a byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Byte offset the error was detected at
    pub offset: usize,
    /// Human-readable message
    pub message: String,
    /// Insertion that would repair the source, when one is known
    pub suggestion: Option<FixSuggestion>,
}

/// A single-insertion repair for a parse error.
#[derive(Debug, Clone, PartialEq)]
pub struct FixSuggestion {
    /// Byte offset to insert at
    pub offset: usize,
    /// Text to insert
    pub replacement: String,
}

/// Output of [`parse`]: the tree is always produced, errors ride alongside.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub program: Program,
    pub errors: Vec<ParseError>,
}

/// Parse a source buffer into a [`Program`], recovering from errors.
pub fn parse(source: &str) -> ParseResult {
    let tokens: Vec<Token> =
        tokenize(source).into_iter().filter(|t| t.kind != TokenKind::Comment).collect();
    Parser { tokens, pos: 0, prev_end: 0, errors: Vec::new(), source_len: source.len() }.program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    prev_end: usize,
    errors: Vec<ParseError>,
    source_len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn at_keyword(&self, kw: &str) -> bool {
        self.peek().is_some_and(|t| t.kind == TokenKind::Keyword && t.text.as_ref() == kw)
    }

    fn at_operator(&self, op: &str) -> bool {
        self.peek().is_some_and(|t| t.kind == TokenKind::Operator && t.text.as_ref() == op)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if let Some(t) = &token {
            self.prev_end = t.end;
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.at_keyword(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn current_offset(&self) -> usize {
        self.peek().map_or(self.source_len, |t| t.start)
    }

    fn error(&mut self, offset: usize, message: impl Into<String>) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(ParseError { offset, message: message.into(), suggestion: None });
        }
    }

    /// Record an error whose repair is inserting `insert` right after the
    /// last consumed token.
    fn error_with_insert(&mut self, message: impl Into<String>, insert: &str) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(ParseError {
                offset: self.current_offset(),
                message: message.into(),
                suggestion: Some(FixSuggestion {
                    offset: self.prev_end,
                    replacement: insert.to_string(),
                }),
            });
        }
    }

    /// Consume `kind` or record an error suggesting the insertion of
    /// `literal`.
    fn expect_closing(&mut self, kind: TokenKind, literal: &str) {
        if !self.eat(kind) {
            self.error_with_insert(format!("expected `{literal}`"), literal);
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Option<(String, Span)> {
        if self.at(TokenKind::Identifier) {
            let tok = self.bump()?;
            return Some((tok.text.to_string(), Span::new(tok.start, tok.end)));
        }
        let offset = self.current_offset();
        self.error(offset, format!("expected {what} name"));
        None
    }

    // -- items --------------------------------------------------------------

    fn program(mut self) -> ParseResult {
        let mut items = Vec::new();
        while self.peek().is_some() {
            let before = self.pos;
            if let Some(item) = self.item() {
                items.push(item);
            }
            if self.pos == before {
                // Recovery: no rule consumed the token.
                let tok_start = self.current_offset();
                self.error(tok_start, "expected a declaration");
                self.bump();
            }
        }
        let span = Span::new(0, self.source_len);
        ParseResult { program: Program { items, span }, errors: self.errors }
    }

    fn item(&mut self) -> Option<Item> {
        if self.at_keyword("func") {
            return self.func_decl().map(Item::Func);
        }
        if self.at_keyword("let") || self.at_keyword("const") {
            return self.let_decl().map(Item::Let);
        }
        if self.at_keyword("struct") {
            return self.struct_decl().map(Item::Struct);
        }
        if self.at_keyword("enum") {
            return self.enum_decl().map(Item::Enum);
        }
        if self.at_keyword("trait") {
            return self.trait_decl().map(Item::Trait);
        }
        if self.at_keyword("import") {
            return self.import_decl().map(Item::Import);
        }
        None
    }

    fn func_decl(&mut self) -> Option<FuncDecl> {
        let start = self.current_offset();
        self.bump(); // func
        let (name, name_span) = self.expect_identifier("function")?;
        let params = self.param_list();
        let ret = if self.eat(TokenKind::Arrow) { self.type_expr() } else { None };
        let body = if self.at(TokenKind::LeftBrace) {
            self.block()
        } else {
            self.error_with_insert("expected function body", " {}");
            Block { stmts: Vec::new(), span: Span::empty(self.prev_end) }
        };
        Some(FuncDecl { name, name_span, params, ret, body, span: Span::new(start, self.prev_end) })
    }

    fn param_list(&mut self) -> Vec<Param> {
        let mut params = Vec::new();
        if !self.eat(TokenKind::LeftParen) {
            self.error_with_insert("expected `(`", "(");
            return params;
        }
        while let Some(tok) = self.peek() {
            match tok.kind {
                TokenKind::RightParen => break,
                TokenKind::Identifier => {
                    let tok = match self.bump() {
                        Some(t) => t,
                        None => break,
                    };
                    let name_span = Span::new(tok.start, tok.end);
                    let ty = if self.eat(TokenKind::Colon) { self.type_expr() } else { None };
                    params.push(Param {
                        name: tok.text.to_string(),
                        name_span,
                        ty,
                        span: Span::new(name_span.start, self.prev_end),
                    });
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                _ => {
                    // Leave the token for the caller; eating it here would
                    // swallow the function body on a missing `)`.
                    break;
                }
            }
        }
        self.expect_closing(TokenKind::RightParen, ")");
        params
    }

    fn let_decl(&mut self) -> Option<LetDecl> {
        let start = self.current_offset();
        let is_const = self.at_keyword("const");
        self.bump(); // let | const
        let (name, name_span) = self.expect_identifier(if is_const {
            "constant"
        } else {
            "variable"
        })?;
        let ty = if self.eat(TokenKind::Colon) { self.type_expr() } else { None };
        let init = if self.at_operator("=") {
            self.bump();
            Some(self.expr())
        } else {
            None
        };
        if is_const && init.is_none() {
            self.error(self.prev_end, format!("constant `{name}` requires an initializer"));
        }
        self.eat(TokenKind::Semicolon);
        Some(LetDecl { name, name_span, ty, init, is_const, span: Span::new(start, self.prev_end) })
    }

    fn struct_decl(&mut self) -> Option<StructDecl> {
        let start = self.current_offset();
        self.bump(); // struct
        let (name, name_span) = self.expect_identifier("struct")?;
        let mut fields = Vec::new();
        if self.eat(TokenKind::LeftBrace) {
            while self.at(TokenKind::Identifier) {
                let tok = match self.bump() {
                    Some(t) => t,
                    None => break,
                };
                let field_name_span = Span::new(tok.start, tok.end);
                let ty = if self.eat(TokenKind::Colon) {
                    self.type_expr()
                } else {
                    self.error_with_insert("expected `:` after field name", ":");
                    None
                };
                let ty = ty.unwrap_or(TypeExpr {
                    kind: TypeKind::Named(String::new()),
                    span: Span::empty(self.prev_end),
                });
                fields.push(FieldDecl {
                    name: tok.text.to_string(),
                    name_span: field_name_span,
                    ty,
                    span: Span::new(field_name_span.start, self.prev_end),
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect_closing(TokenKind::RightBrace, "}");
        } else {
            self.error_with_insert("expected struct body", " {}");
        }
        Some(StructDecl { name, name_span, fields, span: Span::new(start, self.prev_end) })
    }

    fn enum_decl(&mut self) -> Option<EnumDecl> {
        let start = self.current_offset();
        self.bump(); // enum
        let (name, name_span) = self.expect_identifier("enum")?;
        let mut variants = Vec::new();
        if self.eat(TokenKind::LeftBrace) {
            while self.at(TokenKind::Identifier) {
                if let Some(tok) = self.bump() {
                    let span = Span::new(tok.start, tok.end);
                    variants.push(VariantDecl { name: tok.text.to_string(), name_span: span, span });
                }
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect_closing(TokenKind::RightBrace, "}");
        } else {
            self.error_with_insert("expected enum body", " {}");
        }
        Some(EnumDecl { name, name_span, variants, span: Span::new(start, self.prev_end) })
    }

    fn trait_decl(&mut self) -> Option<TraitDecl> {
        let start = self.current_offset();
        self.bump(); // trait
        let (name, name_span) = self.expect_identifier("trait")?;
        let mut methods = Vec::new();
        if self.eat(TokenKind::LeftBrace) {
            while self.at_keyword("func") {
                let sig_start = self.current_offset();
                self.bump();
                let Some((sig_name, sig_name_span)) = self.expect_identifier("method") else {
                    break;
                };
                let params = self.param_list();
                let ret = if self.eat(TokenKind::Arrow) { self.type_expr() } else { None };
                self.eat(TokenKind::Semicolon);
                methods.push(FuncSig {
                    name: sig_name,
                    name_span: sig_name_span,
                    params,
                    ret,
                    span: Span::new(sig_start, self.prev_end),
                });
            }
            self.expect_closing(TokenKind::RightBrace, "}");
        } else {
            self.error_with_insert("expected trait body", " {}");
        }
        Some(TraitDecl { name, name_span, methods, span: Span::new(start, self.prev_end) })
    }

    fn import_decl(&mut self) -> Option<ImportDecl> {
        let start = self.current_offset();
        self.bump(); // import
        let mut path = String::new();
        loop {
            if self.at(TokenKind::Identifier) {
                if let Some(tok) = self.bump() {
                    path.push_str(&tok.text);
                }
            } else {
                let offset = self.current_offset();
                self.error(offset, "expected import path");
                break;
            }
            if self.eat(TokenKind::ColonColon) {
                path.push_str("::");
            } else {
                break;
            }
        }
        self.eat(TokenKind::Semicolon);
        Some(ImportDecl { path, span: Span::new(start, self.prev_end) })
    }

    // -- types --------------------------------------------------------------

    fn type_expr(&mut self) -> Option<TypeExpr> {
        if self.at(TokenKind::Identifier) {
            let tok = self.bump()?;
            return Some(TypeExpr {
                kind: TypeKind::Named(tok.text.to_string()),
                span: Span::new(tok.start, tok.end),
            });
        }
        if self.at(TokenKind::LeftBracket) {
            let start = self.current_offset();
            self.bump();
            let inner = self.type_expr()?;
            self.expect_closing(TokenKind::RightBracket, "]");
            return Some(TypeExpr {
                kind: TypeKind::Array(Box::new(inner)),
                span: Span::new(start, self.prev_end),
            });
        }
        let offset = self.current_offset();
        self.error(offset, "expected a type");
        None
    }

    // -- statements ---------------------------------------------------------

    fn block(&mut self) -> Block {
        let start = self.current_offset();
        self.bump(); // {
        let mut stmts = Vec::new();
        loop {
            match self.peek_kind() {
                None => {
                    self.error_with_insert("expected `}`", "}");
                    break;
                }
                Some(TokenKind::RightBrace) => {
                    self.bump();
                    break;
                }
                _ => {
                    let before = self.pos;
                    if let Some(stmt) = self.stmt() {
                        stmts.push(stmt);
                    }
                    if self.pos == before {
                        let offset = self.current_offset();
                        self.error(offset, "expected a statement");
                        self.bump();
                    }
                }
            }
        }
        Block { stmts, span: Span::new(start, self.prev_end) }
    }

    fn stmt(&mut self) -> Option<Stmt> {
        if self.at_keyword("let") || self.at_keyword("const") {
            return self.let_decl().map(Stmt::Let);
        }
        if self.at_keyword("return") {
            let start = self.current_offset();
            self.bump();
            let value = if self.can_start_expr() { Some(self.expr()) } else { None };
            self.eat(TokenKind::Semicolon);
            return Some(Stmt::Return(ReturnStmt { value, span: Span::new(start, self.prev_end) }));
        }
        if self.at_keyword("if") {
            return self.if_stmt().map(Stmt::If);
        }
        if self.at_keyword("while") {
            let start = self.current_offset();
            self.bump();
            let cond = self.expr();
            let body = self.block_or_empty();
            return Some(Stmt::While(WhileStmt { cond, body, span: Span::new(start, self.prev_end) }));
        }
        if self.at_keyword("for") {
            return self.for_stmt().map(Stmt::For);
        }
        if self.at_keyword("break") {
            let tok = self.bump()?;
            self.eat(TokenKind::Semicolon);
            return Some(Stmt::Break(Span::new(tok.start, tok.end)));
        }
        if self.at_keyword("continue") {
            let tok = self.bump()?;
            self.eat(TokenKind::Semicolon);
            return Some(Stmt::Continue(Span::new(tok.start, tok.end)));
        }
        if self.at(TokenKind::LeftBrace) {
            return Some(Stmt::Block(self.block()));
        }
        if self.can_start_expr() {
            let expr = self.expr();
            self.eat(TokenKind::Semicolon);
            return Some(Stmt::Expr(expr));
        }
        None
    }

    fn if_stmt(&mut self) -> Option<IfStmt> {
        let start = self.current_offset();
        self.bump(); // if
        let cond = self.expr();
        let then_block = self.block_or_empty();
        let else_branch = if self.eat_keyword("else") {
            if self.at_keyword("if") {
                self.if_stmt().map(|i| Box::new(Stmt::If(i)))
            } else {
                Some(Box::new(Stmt::Block(self.block_or_empty())))
            }
        } else {
            None
        };
        Some(IfStmt { cond, then_block, else_branch, span: Span::new(start, self.prev_end) })
    }

    fn for_stmt(&mut self) -> Option<ForStmt> {
        let start = self.current_offset();
        self.bump(); // for
        let (var, var_span) = self.expect_identifier("loop variable")?;
        if !self.eat_keyword("in") {
            self.error_with_insert("expected `in`", " in");
        }
        let iter = self.expr();
        let body = self.block_or_empty();
        Some(ForStmt { var, var_span, iter, body, span: Span::new(start, self.prev_end) })
    }

    fn block_or_empty(&mut self) -> Block {
        if self.at(TokenKind::LeftBrace) {
            self.block()
        } else {
            self.error_with_insert("expected `{`", " {}");
            Block { stmts: Vec::new(), span: Span::empty(self.prev_end) }
        }
    }

    // -- expressions --------------------------------------------------------

    fn can_start_expr(&self) -> bool {
        match self.peek() {
            None => false,
            Some(tok) => match tok.kind {
                TokenKind::Identifier
                | TokenKind::Int
                | TokenKind::Float
                | TokenKind::Str
                | TokenKind::Char
                | TokenKind::LeftParen => true,
                TokenKind::Keyword => matches!(tok.text.as_ref(), "true" | "false"),
                TokenKind::Operator => matches!(tok.text.as_ref(), "-" | "!"),
                _ => false,
            },
        }
    }

    fn expr(&mut self) -> Expr {
        let lhs = self.binary_expr(1);
        if self.at_operator("=") {
            let start = lhs.span.start;
            self.bump();
            let value = self.expr();
            return Expr {
                span: Span::new(start, value.span.end),
                kind: ExprKind::Assign { target: Box::new(lhs), value: Box::new(value) },
            };
        }
        lhs
    }

    fn binary_level(op: &str) -> Option<u8> {
        match op {
            "||" => Some(1),
            "&&" => Some(2),
            "==" | "!=" => Some(3),
            "<" | ">" | "<=" | ">=" => Some(4),
            "+" | "-" => Some(5),
            "*" | "/" | "%" => Some(6),
            _ => None,
        }
    }

    fn binary_expr(&mut self, min_level: u8) -> Expr {
        let mut lhs = self.unary_expr();
        loop {
            let Some(op_tok) = self.peek() else { break };
            if op_tok.kind != TokenKind::Operator {
                break;
            }
            let op = op_tok.text.to_string();
            let Some(level) = Self::binary_level(&op) else { break };
            if level < min_level {
                break;
            }
            self.bump();
            let rhs = self.binary_expr(level + 1);
            lhs = Expr {
                span: Span::new(lhs.span.start, rhs.span.end),
                kind: ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) },
            };
        }
        lhs
    }

    fn unary_expr(&mut self) -> Expr {
        if self.at_operator("-") || self.at_operator("!") {
            if let Some(tok) = self.bump() {
                let operand = self.unary_expr();
                return Expr {
                    span: Span::new(tok.start, operand.span.end),
                    kind: ExprKind::Unary { op: tok.text.to_string(), operand: Box::new(operand) },
                };
            }
        }
        self.postfix_expr()
    }

    fn postfix_expr(&mut self) -> Expr {
        let mut expr = self.primary_expr();
        loop {
            match self.peek_kind() {
                Some(TokenKind::LeftParen) => {
                    self.bump();
                    let mut args = Vec::new();
                    while self.can_start_expr() {
                        args.push(self.expr());
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect_closing(TokenKind::RightParen, ")");
                    expr = Expr {
                        span: Span::new(expr.span.start, self.prev_end),
                        kind: ExprKind::Call { callee: Box::new(expr), args },
                    };
                }
                Some(TokenKind::Dot) => {
                    self.bump();
                    if self.at(TokenKind::Identifier) {
                        if let Some(tok) = self.bump() {
                            expr = Expr {
                                span: Span::new(expr.span.start, tok.end),
                                kind: ExprKind::Field {
                                    base: Box::new(expr),
                                    name: tok.text.to_string(),
                                    name_span: Span::new(tok.start, tok.end),
                                },
                            };
                        }
                    } else {
                        let offset = self.current_offset();
                        self.error(offset, "expected field name after `.`");
                        break;
                    }
                }
                Some(TokenKind::LeftBracket) => {
                    self.bump();
                    let index = self.expr();
                    self.expect_closing(TokenKind::RightBracket, "]");
                    expr = Expr {
                        span: Span::new(expr.span.start, self.prev_end),
                        kind: ExprKind::Index { base: Box::new(expr), index: Box::new(index) },
                    };
                }
                _ => break,
            }
        }
        expr
    }

    fn primary_expr(&mut self) -> Expr {
        let Some(tok) = self.peek().cloned() else {
            let offset = self.source_len;
            self.error(offset, "expected an expression");
            return Expr { kind: ExprKind::Error, span: Span::empty(offset) };
        };
        let span = Span::new(tok.start, tok.end);
        match tok.kind {
            TokenKind::Int => {
                self.bump();
                Expr { kind: ExprKind::IntLit, span }
            }
            TokenKind::Float => {
                self.bump();
                Expr { kind: ExprKind::FloatLit, span }
            }
            TokenKind::Str => {
                self.bump();
                Expr { kind: ExprKind::StrLit, span }
            }
            TokenKind::Char => {
                self.bump();
                Expr { kind: ExprKind::CharLit, span }
            }
            TokenKind::Keyword if tok.text.as_ref() == "true" || tok.text.as_ref() == "false" => {
                self.bump();
                Expr { kind: ExprKind::BoolLit(tok.text.as_ref() == "true"), span }
            }
            TokenKind::Identifier => {
                self.bump();
                if self.at(TokenKind::ColonColon) {
                    let mut segments = vec![(tok.text.to_string(), span)];
                    while self.eat(TokenKind::ColonColon) {
                        if self.at(TokenKind::Identifier) {
                            if let Some(seg) = self.bump() {
                                segments
                                    .push((seg.text.to_string(), Span::new(seg.start, seg.end)));
                            }
                        } else {
                            let offset = self.current_offset();
                            self.error(offset, "expected path segment after `::`");
                            break;
                        }
                    }
                    return Expr {
                        span: Span::new(span.start, self.prev_end),
                        kind: ExprKind::Path(segments),
                    };
                }
                Expr { kind: ExprKind::Ident(tok.text.to_string()), span }
            }
            TokenKind::LeftParen => {
                self.bump();
                let inner = self.expr();
                self.expect_closing(TokenKind::RightParen, ")");
                Expr {
                    span: Span::new(span.start, self.prev_end),
                    kind: ExprKind::Paren(Box::new(inner)),
                }
            }
            _ => {
                // Do not consume: the caller decides how to recover.
                self.error(span.start, "expected an expression");
                Expr { kind: ExprKind::Error, span: Span::empty(span.start) }
            }
        }
    }
}
