//! Recursive-descent parser producing [`crate::ast`] trees.
//!
//! Expressions use precedence climbing. Automatic semicolon insertion follows
//! the newline flag carried by every token, and the restricted productions
//! (`return`, `break`, `continue`, `throw`, postfix `++`/`--`) check it
//! explicitly. Constructs outside the supported subset are reported as
//! [`UnsupportedSyntaxError`] with the position where they start.

use crate::ast::*;
use crate::lexer::{Lexer, Token, TokenKind};
use jscloak_utils::errors::{ParseError, SyntaxError, UnsupportedSyntaxError};
use std::collections::HashSet;
use tracing::debug;

type Result<T> = std::result::Result<T, SyntaxError>;

/// Deepest syntactic nesting accepted. Statements, assignment expressions,
/// prefix operators and every link of an operator or member chain count
/// one level each, which bounds the depth of every tree the rest of the
/// engine walks recursively.
pub const MAX_NESTING_DEPTH: usize = 1000;

const RESERVED_WORDS: &[&str] = &[
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "import",
    "in",
    "instanceof",
    "new",
    "null",
    "return",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
];

/// Whether `name` can never be used as an identifier reference.
pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

/// Parses a complete script.
pub fn parse_program(src: &str) -> Result<Program> {
    let mut parser = Parser::new(src, NodeIdGen::default());
    let body = parser.parse_script()?;
    debug!(
        statements = body.len(),
        identifiers = parser.ids.allocated(),
        "parsed program"
    );
    Ok(Program {
        body,
        ids: parser.ids,
        names: parser.names,
        synthetic: Default::default(),
    })
}

/// Parses `src` as a list of statements whose identifiers get ids from
/// `program`'s allocator, so the result can be spliced into `program`.
pub fn parse_into(program: &mut Program, src: &str) -> Result<Vec<Stmt>> {
    let mut parser = Parser::new(src, std::mem::take(&mut program.ids));
    let result = parser.parse_script();
    program.ids = parser.ids;
    program.names.extend(parser.names);
    result
}

#[derive(Debug)]
struct Parser {
    lexer: Lexer,
    tok: Token,
    peeked: Option<Token>,
    ids: NodeIdGen,
    names: HashSet<String>,
    /// Inside a `for` head, where `in` ends the expression.
    no_in: bool,
    /// The last primary expression was a complete arrow function.
    arrow_end: bool,
    depth: usize,
}

impl Parser {
    fn new(src: &str, ids: NodeIdGen) -> Self {
        Self {
            lexer: Lexer::new(src),
            tok: Token {
                kind: TokenKind::Eof,
                start: 0,
                line: 1,
                column: 1,
                newline_before: false,
            },
            peeked: None,
            ids,
            names: HashSet::new(),
            no_in: false,
            arrow_end: false,
            depth: 0,
        }
    }

    // ---- token plumbing -------------------------------------------------

    fn bump(&mut self) -> Result<Token> {
        let next = match self.peeked.take() {
            Some(tok) => tok,
            None => self.lexer.next_token()?,
        };
        Ok(std::mem::replace(&mut self.tok, next))
    }

    fn peek(&mut self) -> Result<&Token> {
        let tok = match self.peeked.take() {
            Some(tok) => tok,
            None => self.lexer.next_token()?,
        };
        Ok(self.peeked.insert(tok))
    }

    fn at_eof(&self) -> bool {
        self.tok.kind == TokenKind::Eof
    }

    fn error_at(tok: &Token, message: impl Into<String>) -> SyntaxError {
        ParseError::new(message, tok.line, tok.column).into()
    }

    fn unsupported_at(tok: &Token, construct: &str) -> SyntaxError {
        UnsupportedSyntaxError::new(construct, tok.line, tok.column).into()
    }

    fn unexpected(&self) -> SyntaxError {
        Self::error_at(&self.tok, format!("unexpected {}", self.tok.describe()))
    }

    fn expect(&mut self, p: &str) -> Result<Token> {
        if self.tok.is_punct(p) {
            self.bump()
        } else {
            Err(Self::error_at(
                &self.tok,
                format!("expected '{p}' but found {}", self.tok.describe()),
            ))
        }
    }

    fn expect_name(&mut self, n: &str) -> Result<Token> {
        if self.tok.is_name(n) {
            self.bump()
        } else {
            Err(Self::error_at(
                &self.tok,
                format!("expected '{n}' but found {}", self.tok.describe()),
            ))
        }
    }

    fn eat(&mut self, p: &str) -> Result<bool> {
        if self.tok.is_punct(p) {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn consume_semicolon(&mut self) -> Result<()> {
        if self.tok.is_punct(";") {
            self.bump()?;
            return Ok(());
        }
        if self.tok.is_punct("}") || self.at_eof() || self.tok.newline_before {
            return Ok(());
        }
        Err(Self::error_at(
            &self.tok,
            format!("expected ';' but found {}", self.tok.describe()),
        ))
    }

    fn make_ident(&mut self, name: String) -> Ident {
        self.names.insert(name.clone());
        Ident {
            id: self.ids.next_id(),
            name,
        }
    }

    fn descend(&mut self) -> Result<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(Self::unsupported_at(&self.tok, "nesting too deep"));
        }
        self.depth += 1;
        Ok(())
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.descend()?;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Runs `f`, then releases every level it took with [`Self::descend`].
    fn chain<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let depth = self.depth;
        let result = f(self);
        self.depth = depth;
        result
    }

    fn with_in_allowed<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = std::mem::replace(&mut self.no_in, false);
        let result = f(self);
        self.no_in = saved;
        result
    }

    fn parse_binding_ident(&mut self) -> Result<Ident> {
        match &self.tok.kind {
            TokenKind::Name(name) if !is_reserved_word(name) => {
                let name = name.clone();
                self.bump()?;
                Ok(self.make_ident(name))
            }
            TokenKind::Punct("[" | "{") => Err(Self::unsupported_at(
                &self.tok,
                "destructuring pattern",
            )),
            _ => Err(Self::error_at(
                &self.tok,
                format!("expected identifier but found {}", self.tok.describe()),
            )),
        }
    }

    // ---- statements -----------------------------------------------------

    fn parse_script(&mut self) -> Result<Vec<Stmt>> {
        self.bump()?;
        let mut body = self.parse_directives()?;
        while !self.at_eof() {
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_directives(&mut self) -> Result<Vec<Stmt>> {
        let mut directives = Vec::new();
        loop {
            let TokenKind::Str { raw, .. } = &self.tok.kind else {
                break;
            };
            let raw = raw.clone();
            let next = self.peek()?;
            let complete = next.is_punct(";")
                || next.is_punct("}")
                || next.kind == TokenKind::Eof
                || (next.newline_before
                    && !matches!(
                        next.kind,
                        TokenKind::Punct(_) | TokenKind::Template { .. }
                    ));
            if !complete {
                break;
            }
            self.bump()?;
            self.consume_semicolon()?;
            directives.push(Stmt::Directive(raw));
        }
        Ok(directives)
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        self.expect("{")?;
        let mut body = Vec::new();
        while !self.tok.is_punct("}") {
            if self.at_eof() {
                return Err(self.unexpected());
            }
            body.push(self.parse_statement()?);
        }
        self.bump()?;
        Ok(body)
    }

    fn parse_function_body(&mut self) -> Result<Vec<Stmt>> {
        self.with_in_allowed(|p| {
            p.expect("{")?;
            let mut body = p.parse_directives()?;
            while !p.tok.is_punct("}") {
                if p.at_eof() {
                    return Err(p.unexpected());
                }
                body.push(p.parse_statement()?);
            }
            p.bump()?;
            Ok(body)
        })
    }

    fn let_starts_declaration(&mut self) -> Result<bool> {
        let next = self.peek()?;
        Ok(match &next.kind {
            TokenKind::Name(n) => !is_reserved_word(n) || n == "yield",
            TokenKind::Punct("[" | "{") => true,
            _ => false,
        })
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        self.nested(Self::parse_statement_kind)
    }

    fn parse_statement_kind(&mut self) -> Result<Stmt> {
        let tok = self.tok.clone();
        match &tok.kind {
            TokenKind::Punct("{") => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::Punct(";") => {
                self.bump()?;
                Ok(Stmt::Empty)
            }
            TokenKind::Name(name) => match name.as_str() {
                "var" => self.parse_var_statement(VarKind::Var),
                "const" => self.parse_var_statement(VarKind::Const),
                "let" if self.let_starts_declaration()? => self.parse_var_statement(VarKind::Let),
                "function" => Ok(Stmt::Function(self.parse_function(true)?)),
                "async" => {
                    let next = self.peek()?;
                    if next.is_name("function") && !next.newline_before {
                        return Err(Self::unsupported_at(&tok, "async function"));
                    }
                    self.parse_expression_statement()
                }
                "class" => Err(Self::unsupported_at(&tok, "class declaration")),
                "import" => Err(Self::unsupported_at(&tok, "import")),
                "export" => Err(Self::unsupported_at(&tok, "export declaration")),
                "with" => Err(Self::unsupported_at(&tok, "with statement")),
                "if" => self.parse_if(),
                "for" => self.parse_for(),
                "while" => {
                    self.bump()?;
                    self.expect("(")?;
                    let test = self.parse_expression()?;
                    self.expect(")")?;
                    let body = Box::new(self.parse_statement()?);
                    Ok(Stmt::While { test, body })
                }
                "do" => {
                    self.bump()?;
                    let body = Box::new(self.parse_statement()?);
                    self.expect_name("while")?;
                    self.expect("(")?;
                    let test = self.parse_expression()?;
                    self.expect(")")?;
                    self.eat(";")?;
                    Ok(Stmt::DoWhile { body, test })
                }
                "continue" | "break" => {
                    self.bump()?;
                    let label = match &self.tok.kind {
                        TokenKind::Name(l) if !self.tok.newline_before && !is_reserved_word(l) => {
                            let l = l.clone();
                            self.bump()?;
                            Some(l)
                        }
                        _ => None,
                    };
                    self.consume_semicolon()?;
                    Ok(if name == "break" {
                        Stmt::Break(label)
                    } else {
                        Stmt::Continue(label)
                    })
                }
                "return" => {
                    self.bump()?;
                    let arg = if self.tok.is_punct(";")
                        || self.tok.is_punct("}")
                        || self.at_eof()
                        || self.tok.newline_before
                    {
                        None
                    } else {
                        Some(self.parse_expression()?)
                    };
                    self.consume_semicolon()?;
                    Ok(Stmt::Return(arg))
                }
                "throw" => {
                    self.bump()?;
                    if self.tok.newline_before {
                        return Err(Self::error_at(&self.tok, "illegal newline after throw"));
                    }
                    let arg = self.parse_expression()?;
                    self.consume_semicolon()?;
                    Ok(Stmt::Throw(arg))
                }
                "try" => self.parse_try(),
                "switch" => self.parse_switch(),
                "debugger" => {
                    self.bump()?;
                    self.consume_semicolon()?;
                    Ok(Stmt::Debugger)
                }
                _ if !is_reserved_word(name) && self.peek()?.is_punct(":") => {
                    let label = name.clone();
                    self.names.insert(label.clone());
                    self.bump()?;
                    self.bump()?;
                    let body = Box::new(self.parse_statement()?);
                    Ok(Stmt::Labeled { label, body })
                }
                _ => self.parse_expression_statement(),
            },
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt> {
        let expr = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Stmt::Expr(expr))
    }

    fn parse_var_statement(&mut self, kind: VarKind) -> Result<Stmt> {
        self.bump()?;
        let decl = self.parse_var_decl(kind, false)?;
        self.consume_semicolon()?;
        Ok(Stmt::Var(decl))
    }

    fn parse_var_decl(&mut self, kind: VarKind, in_for_head: bool) -> Result<VarDecl> {
        let mut decls = Vec::new();
        loop {
            let name_tok = self.tok.clone();
            let name = self.parse_binding_ident()?;
            let init = if self.eat("=")? {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            if init.is_none() && kind == VarKind::Const && !in_for_head {
                return Err(Self::error_at(
                    &name_tok,
                    "missing initializer in const declaration",
                ));
            }
            decls.push(VarDeclarator { name, init });
            if !self.eat(",")? {
                break;
            }
        }
        Ok(VarDecl { kind, decls })
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        self.bump()?;
        self.expect("(")?;
        let test = self.parse_expression()?;
        self.expect(")")?;
        let cons = Box::new(self.parse_statement()?);
        let alt = if self.tok.is_name("else") {
            self.bump()?;
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If { test, cons, alt })
    }

    fn parse_for(&mut self) -> Result<Stmt> {
        self.bump()?;
        if self.tok.is_name("await") {
            return Err(Self::unsupported_at(&self.tok, "for await"));
        }
        self.expect("(")?;
        let mut init = None;
        if !self.tok.is_punct(";") {
            let kind = match self.tok.name().map(str::to_owned).as_deref() {
                Some("var") => Some(VarKind::Var),
                Some("const") => Some(VarKind::Const),
                Some("let") if self.let_starts_declaration()? => Some(VarKind::Let),
                _ => None,
            };
            if let Some(kind) = kind {
                self.bump()?;
                let saved = std::mem::replace(&mut self.no_in, true);
                let decl = self.parse_var_decl(kind, true);
                self.no_in = saved;
                let mut decl = decl?;
                let is_in = self.tok.is_name("in");
                let is_of = self.tok.is_name("of");
                if is_in || is_of {
                    if decl.decls.len() != 1 || decl.decls[0].init.is_some() {
                        return Err(Self::error_at(
                            &self.tok,
                            "for-in/of head may declare exactly one binding without initializer",
                        ));
                    }
                    self.bump()?;
                    let name = decl.decls.remove(0).name;
                    return self.finish_for_in_of(ForHead::Var(kind, name), is_of);
                }
                init = Some(ForInit::Var(decl));
            } else {
                let start = self.tok.clone();
                let saved = std::mem::replace(&mut self.no_in, true);
                let expr = self.parse_expression();
                self.no_in = saved;
                let expr = expr?;
                let is_in = self.tok.is_name("in");
                let is_of = self.tok.is_name("of");
                if is_in || is_of {
                    match expr {
                        Expr::Ident(_) | Expr::Member { .. } => {}
                        Expr::Array(_) | Expr::Object(_) => {
                            return Err(Self::unsupported_at(&start, "destructuring pattern"))
                        }
                        _ => return Err(Self::error_at(&start, "invalid for-in/of left side")),
                    }
                    self.bump()?;
                    return self.finish_for_in_of(ForHead::Expr(expr), is_of);
                }
                init = Some(ForInit::Expr(expr));
            }
        }
        self.expect(";")?;
        let test = if self.tok.is_punct(";") {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(";")?;
        let update = if self.tok.is_punct(")") {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(")")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn finish_for_in_of(&mut self, left: ForHead, is_of: bool) -> Result<Stmt> {
        let right = if is_of {
            self.parse_assignment()?
        } else {
            self.parse_expression()?
        };
        self.expect(")")?;
        let body = Box::new(self.parse_statement()?);
        Ok(if is_of {
            Stmt::ForOf { left, right, body }
        } else {
            Stmt::ForIn { left, right, body }
        })
    }

    fn parse_try(&mut self) -> Result<Stmt> {
        let try_tok = self.bump()?;
        let block = self.parse_block()?;
        let handler = if self.tok.is_name("catch") {
            self.bump()?;
            let param = if self.eat("(")? {
                let param = self.parse_binding_ident()?;
                self.expect(")")?;
                Some(param)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finalizer = if self.tok.is_name("finally") {
            self.bump()?;
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(Self::error_at(&try_tok, "missing catch or finally after try"));
        }
        Ok(Stmt::Try {
            block,
            handler,
            finalizer,
        })
    }

    fn parse_switch(&mut self) -> Result<Stmt> {
        self.bump()?;
        self.expect("(")?;
        let discriminant = self.parse_expression()?;
        self.expect(")")?;
        self.expect("{")?;
        let mut cases = Vec::new();
        while !self.tok.is_punct("}") {
            let test = if self.tok.is_name("case") {
                self.bump()?;
                Some(self.parse_expression()?)
            } else if self.tok.is_name("default") {
                self.bump()?;
                None
            } else {
                return Err(self.unexpected());
            };
            self.expect(":")?;
            let mut body = Vec::new();
            while !(self.tok.is_name("case")
                || self.tok.is_name("default")
                || self.tok.is_punct("}"))
            {
                if self.at_eof() {
                    return Err(self.unexpected());
                }
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { test, body });
        }
        self.bump()?;
        Ok(Stmt::Switch {
            discriminant,
            cases,
        })
    }

    fn parse_function(&mut self, declaration: bool) -> Result<Function> {
        let fn_tok = self.bump()?;
        if self.tok.is_punct("*") {
            return Err(Self::unsupported_at(&fn_tok, "generator function"));
        }
        let name = match &self.tok.kind {
            TokenKind::Name(n) if !is_reserved_word(n) => Some(self.parse_binding_ident()?),
            _ if declaration => {
                return Err(Self::error_at(&self.tok, "function declaration requires a name"))
            }
            _ => None,
        };
        let params = self.parse_params()?;
        let body = self.parse_function_body()?;
        Ok(Function { name, params, body })
    }

    fn parse_params(&mut self) -> Result<Vec<Param>> {
        self.expect("(")?;
        let mut params = Vec::new();
        while !self.tok.is_punct(")") {
            if self.eat("...")? {
                let name = self.parse_binding_ident()?;
                params.push(Param {
                    name,
                    default: None,
                    rest: true,
                });
                break;
            }
            let name = self.parse_binding_ident()?;
            let default = if self.eat("=")? {
                Some(self.with_in_allowed(Self::parse_assignment)?)
            } else {
                None
            };
            params.push(Param {
                name,
                default,
                rest: false,
            });
            if !self.eat(",")? {
                break;
            }
        }
        self.expect(")")?;
        Ok(params)
    }

    // ---- expressions ----------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expr> {
        let first = self.parse_assignment()?;
        if !self.tok.is_punct(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(",")? {
            items.push(self.parse_assignment()?);
        }
        Ok(Expr::Seq(items))
    }

    fn parse_assignment(&mut self) -> Result<Expr> {
        self.nested(Self::parse_assignment_expr)
    }

    fn parse_assignment_expr(&mut self) -> Result<Expr> {
        if let TokenKind::Name(name) = &self.tok.kind {
            if !is_reserved_word(name) {
                let next = self.peek()?;
                if next.is_punct("=>") && !next.newline_before {
                    let name = self.parse_binding_ident()?;
                    self.bump()?;
                    let params = vec![Param {
                        name,
                        default: None,
                        rest: false,
                    }];
                    let body = self.parse_arrow_body()?;
                    return Ok(Expr::Arrow(Box::new(Arrow { params, body })));
                }
            }
        }
        let start = self.tok.clone();
        let lhs = self.parse_conditional()?;
        let TokenKind::Punct(p) = self.tok.kind else {
            return Ok(lhs);
        };
        let Some(op) = AssignOp::from_token(p) else {
            return Ok(lhs);
        };
        match &lhs {
            Expr::Ident(_) | Expr::Member { .. } => {}
            Expr::Array(_) | Expr::Object(_) if op == AssignOp::Assign => {
                return Err(Self::unsupported_at(&start, "destructuring assignment"))
            }
            _ => return Err(Self::error_at(&start, "invalid assignment target")),
        }
        self.bump()?;
        let value = self.parse_assignment()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(lhs),
            value: Box::new(value),
        })
    }

    fn parse_arrow_body(&mut self) -> Result<ArrowBody> {
        if self.tok.is_punct("{") {
            Ok(ArrowBody::Block(self.parse_function_body()?))
        } else {
            Ok(ArrowBody::Expr(Box::new(self.parse_assignment()?)))
        }
    }

    fn parse_conditional(&mut self) -> Result<Expr> {
        let test = self.parse_binary(0)?;
        if !self.tok.is_punct("?") {
            return Ok(test);
        }
        self.bump()?;
        let cons = self.with_in_allowed(Self::parse_assignment)?;
        self.expect(":")?;
        let alt = self.parse_assignment()?;
        Ok(Expr::Cond {
            test: Box::new(test),
            cons: Box::new(cons),
            alt: Box::new(alt),
        })
    }

    fn binary_op(&self) -> Option<BinaryOp> {
        match &self.tok.kind {
            TokenKind::Punct(p) => BinaryOp::from_token(p),
            TokenKind::Name(n) if n == "instanceof" => Some(BinaryOp::InstanceOf),
            TokenKind::Name(n) if n == "in" && !self.no_in => Some(BinaryOp::In),
            _ => None,
        }
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr> {
        self.chain(|p| {
            let mut left = p.parse_unary()?;
            while let Some(op) = p.binary_op() {
                let prec = op.precedence();
                if prec < min_prec {
                    break;
                }
                p.descend()?;
                p.bump()?;
                let right = if op == BinaryOp::Exp {
                    p.parse_binary(prec)?
                } else {
                    p.parse_binary(prec + 1)?
                };
                left = Expr::binary(op, left, right);
            }
            Ok(left)
        })
    }

    fn check_update_target(tok: &Token, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Ident(_) | Expr::Member { .. } => Ok(()),
            _ => Err(Self::error_at(tok, "invalid update target")),
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match &self.tok.kind {
            TokenKind::Punct("!") => Some(UnaryOp::Not),
            TokenKind::Punct("~") => Some(UnaryOp::BitNot),
            TokenKind::Punct("+") => Some(UnaryOp::Plus),
            TokenKind::Punct("-") => Some(UnaryOp::Minus),
            TokenKind::Name(n) if n == "typeof" => Some(UnaryOp::Typeof),
            TokenKind::Name(n) if n == "void" => Some(UnaryOp::Void),
            TokenKind::Name(n) if n == "delete" => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.bump()?;
            let arg = self.nested(Self::parse_unary)?;
            return Ok(Expr::Unary {
                op,
                arg: Box::new(arg),
            });
        }
        if self.tok.is_punct("++") || self.tok.is_punct("--") {
            let tok = self.bump()?;
            let op = if tok.is_punct("++") {
                UpdateOp::Incr
            } else {
                UpdateOp::Decr
            };
            let arg_tok = self.tok.clone();
            let arg = self.nested(Self::parse_unary)?;
            Self::check_update_target(&arg_tok, &arg)?;
            return Ok(Expr::Update {
                op,
                prefix: true,
                arg: Box::new(arg),
            });
        }
        let start = self.tok.clone();
        let expr = self.parse_lhs()?;
        if (self.tok.is_punct("++") || self.tok.is_punct("--")) && !self.tok.newline_before {
            Self::check_update_target(&start, &expr)?;
            let tok = self.bump()?;
            let op = if tok.is_punct("++") {
                UpdateOp::Incr
            } else {
                UpdateOp::Decr
            };
            return Ok(Expr::Update {
                op,
                prefix: false,
                arg: Box::new(expr),
            });
        }
        Ok(expr)
    }

    fn parse_lhs(&mut self) -> Result<Expr> {
        if self.tok.is_name("new") {
            let expr = self.parse_new()?;
            return self.parse_call_tail(expr, true);
        }
        self.arrow_end = false;
        let expr = self.parse_primary()?;
        if std::mem::take(&mut self.arrow_end) {
            return Ok(expr);
        }
        self.parse_call_tail(expr, true)
    }

    fn parse_new(&mut self) -> Result<Expr> {
        let new_tok = self.bump()?;
        if self.tok.is_punct(".") {
            return Err(Self::unsupported_at(&new_tok, "new.target"));
        }
        let callee = if self.tok.is_name("new") {
            self.nested(Self::parse_new)?
        } else {
            self.parse_primary()?
        };
        let callee = self.parse_call_tail(callee, false)?;
        let args = if self.tok.is_punct("(") {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expr::New {
            callee: Box::new(callee),
            args,
        })
    }

    fn parse_call_tail(&mut self, expr: Expr, allow_call: bool) -> Result<Expr> {
        self.chain(|p| p.parse_call_links(expr, allow_call))
    }

    fn parse_call_links(&mut self, mut expr: Expr, allow_call: bool) -> Result<Expr> {
        loop {
            if matches!(self.tok.kind, TokenKind::Punct("." | "[" | "(") | TokenKind::Template { head: true, .. }) {
                self.descend()?;
            }
            match &self.tok.kind {
                TokenKind::Punct(".") => {
                    self.bump()?;
                    let prop = match &self.tok.kind {
                        TokenKind::Name(n) => n.clone(),
                        TokenKind::Punct("#") => {
                            return Err(Self::unsupported_at(&self.tok, "private name"))
                        }
                        _ => return Err(self.unexpected()),
                    };
                    self.bump()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        prop: MemberProp::Name(prop),
                    };
                }
                TokenKind::Punct("?.") => {
                    return Err(Self::unsupported_at(&self.tok, "optional chaining"))
                }
                TokenKind::Punct("[") => {
                    self.bump()?;
                    let prop = self.with_in_allowed(Self::parse_expression)?;
                    self.expect("]")?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        prop: MemberProp::Computed(Box::new(prop)),
                    };
                }
                TokenKind::Punct("(") if allow_call => {
                    let args = self.parse_arguments()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                TokenKind::Template { head: true, .. } => {
                    let quasi = self.parse_template()?;
                    expr = Expr::TaggedTemplate {
                        tag: Box::new(expr),
                        quasi,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>> {
        self.with_in_allowed(|p| {
            p.expect("(")?;
            let mut args = Vec::new();
            while !p.tok.is_punct(")") {
                if p.eat("...")? {
                    args.push(Expr::Spread(Box::new(p.parse_assignment()?)));
                } else {
                    args.push(p.parse_assignment()?);
                }
                if !p.eat(",")? {
                    break;
                }
            }
            p.expect(")")?;
            Ok(args)
        })
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let tok = self.tok.clone();
        match &tok.kind {
            TokenKind::Name(name) => match name.as_str() {
                "this" => {
                    self.bump()?;
                    Ok(Expr::This)
                }
                "null" => {
                    self.bump()?;
                    Ok(Expr::Lit(Lit::Null))
                }
                "true" | "false" => {
                    self.bump()?;
                    Ok(Expr::Lit(Lit::Bool(name == "true")))
                }
                "function" => Ok(Expr::Function(Box::new(self.parse_function(false)?))),
                "class" => Err(Self::unsupported_at(&tok, "class expression")),
                "super" => Err(Self::unsupported_at(&tok, "super")),
                "import" => Err(Self::unsupported_at(&tok, "import")),
                "new" => self.parse_new(),
                "async" => {
                    let next = self.peek()?;
                    if matches!(next.kind, TokenKind::Name(_)) && !next.newline_before {
                        return Err(Self::unsupported_at(&tok, "async function"));
                    }
                    let call = next.is_punct("(") && !next.newline_before;
                    self.bump()?;
                    let callee = Expr::Ident(self.make_ident(name.clone()));
                    if !call {
                        return Ok(callee);
                    }
                    let args = self.parse_arguments()?;
                    if self.tok.is_punct("=>") && !self.tok.newline_before {
                        return Err(Self::unsupported_at(&tok, "async function"));
                    }
                    Ok(Expr::Call {
                        callee: Box::new(callee),
                        args,
                    })
                }
                _ if is_reserved_word(name) => Err(self.unexpected()),
                _ => {
                    self.bump()?;
                    Ok(Expr::Ident(self.make_ident(name.clone())))
                }
            },
            TokenKind::Num(raw) => {
                self.bump()?;
                Ok(Expr::Lit(Lit::Num(raw.clone())))
            }
            TokenKind::Str { value, .. } => {
                self.bump()?;
                Ok(Expr::Lit(Lit::Str(value.clone())))
            }
            TokenKind::Template { .. } => Ok(Expr::Template(self.parse_template()?)),
            TokenKind::Punct("/" | "/=") => {
                self.peeked = None;
                self.tok = self.lexer.rescan_regex(&tok)?;
                match self.bump()?.kind {
                    TokenKind::Regex { pattern, flags } => Ok(Expr::Lit(Lit::Regex { pattern, flags })),
                    _ => Err(Self::error_at(&tok, "invalid regular expression")),
                }
            }
            TokenKind::Punct("[") => self.parse_array(),
            TokenKind::Punct("{") => self.parse_object(),
            TokenKind::Punct("(") => self.parse_paren_or_arrow(),
            TokenKind::Punct("#") => Err(Self::unsupported_at(&tok, "private name")),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_template(&mut self) -> Result<Template> {
        let first = self.bump()?;
        let TokenKind::Template { raw, mut tail, .. } = first.kind else {
            return Err(Self::error_at(&first, "expected template literal"));
        };
        let mut quasis = vec![raw];
        let mut exprs = Vec::new();
        while !tail {
            exprs.push(self.with_in_allowed(Self::parse_expression)?);
            if !self.tok.is_punct("}") {
                return Err(Self::error_at(
                    &self.tok,
                    format!("expected '}}' but found {}", self.tok.describe()),
                ));
            }
            self.peeked = None;
            self.tok = self.lexer.rescan_template(&self.tok)?;
            let chunk = self.bump()?;
            let TokenKind::Template { raw, tail: end, .. } = chunk.kind else {
                return Err(Self::error_at(&chunk, "expected template continuation"));
            };
            quasis.push(raw);
            tail = end;
        }
        Ok(Template { quasis, exprs })
    }

    fn parse_array(&mut self) -> Result<Expr> {
        self.with_in_allowed(|p| {
            p.expect("[")?;
            let mut elements = Vec::new();
            while !p.tok.is_punct("]") {
                if p.eat(",")? {
                    elements.push(None);
                    continue;
                }
                let element = if p.eat("...")? {
                    Expr::Spread(Box::new(p.parse_assignment()?))
                } else {
                    p.parse_assignment()?
                };
                elements.push(Some(element));
                if !p.tok.is_punct("]") {
                    p.expect(",")?;
                }
            }
            p.bump()?;
            Ok(Expr::Array(elements))
        })
    }

    fn parse_prop_key(&mut self) -> Result<PropKey> {
        let tok = self.bump()?;
        match tok.kind {
            TokenKind::Name(n) => Ok(PropKey::Ident(n)),
            TokenKind::Str { value, .. } => Ok(PropKey::Str(value)),
            TokenKind::Num(raw) => Ok(PropKey::Num(raw)),
            TokenKind::Punct("[") => {
                let key = self.parse_assignment()?;
                self.expect("]")?;
                Ok(PropKey::Computed(Box::new(key)))
            }
            TokenKind::Punct("#") => Err(Self::unsupported_at(&tok, "private name")),
            _ => Err(Self::error_at(
                &tok,
                format!("unexpected {} in object literal", tok.describe()),
            )),
        }
    }

    fn parse_method(&mut self, key: PropKey, kind: MethodKind) -> Result<Prop> {
        let params = self.parse_params()?;
        let body = self.parse_function_body()?;
        Ok(Prop::Method {
            key,
            kind,
            func: Function {
                name: None,
                params,
                body,
            },
        })
    }

    fn parse_object(&mut self) -> Result<Expr> {
        self.with_in_allowed(|p| {
            p.expect("{")?;
            let mut props = Vec::new();
            while !p.tok.is_punct("}") {
                props.push(p.parse_prop()?);
                if !p.tok.is_punct("}") {
                    p.expect(",")?;
                }
            }
            p.bump()?;
            Ok(Expr::Object(props))
        })
    }

    fn parse_prop(&mut self) -> Result<Prop> {
        if self.eat("...")? {
            return Ok(Prop::Spread(self.parse_assignment()?));
        }
        let start = self.tok.clone();
        if start.is_punct("*") {
            return Err(Self::unsupported_at(&start, "generator method"));
        }
        if let Some(word @ ("get" | "set" | "async")) = start.name() {
            let next = self.peek()?;
            let is_modifier = !(next.is_punct(":")
                || next.is_punct("(")
                || next.is_punct(",")
                || next.is_punct("}")
                || next.is_punct("="));
            if is_modifier {
                if word == "async" {
                    return Err(Self::unsupported_at(&start, "async method"));
                }
                let kind = if word == "get" {
                    MethodKind::Get
                } else {
                    MethodKind::Set
                };
                self.bump()?;
                let key = self.parse_prop_key()?;
                return self.parse_method(key, kind);
            }
        }
        let key = self.parse_prop_key()?;
        if self.eat(":")? {
            let value = self.parse_assignment()?;
            return Ok(Prop::KeyValue {
                key,
                value,
                shorthand: false,
            });
        }
        if self.tok.is_punct("(") {
            return self.parse_method(key, MethodKind::Method);
        }
        match key {
            PropKey::Ident(name) if !is_reserved_word(&name) => {
                if self.tok.is_punct("=") {
                    return Err(Self::unsupported_at(&start, "destructuring pattern"));
                }
                let value = Expr::Ident(self.make_ident(name.clone()));
                Ok(Prop::KeyValue {
                    key: PropKey::Ident(name),
                    value,
                    shorthand: true,
                })
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_paren_or_arrow(&mut self) -> Result<Expr> {
        let open = self.tok.clone();
        let (mut items, rest) = self.with_in_allowed(|p| {
            p.expect("(")?;
            let mut items = Vec::new();
            let mut rest = None;
            while !p.tok.is_punct(")") {
                if p.eat("...")? {
                    rest = Some(p.parse_binding_ident()?);
                    break;
                }
                items.push(p.parse_assignment()?);
                if !p.eat(",")? {
                    break;
                }
            }
            p.expect(")")?;
            Ok((items, rest))
        })?;

        if self.tok.is_punct("=>") && !self.tok.newline_before {
            self.bump()?;
            let mut params = items
                .into_iter()
                .map(|item| Self::expr_to_param(item, &open))
                .collect::<Result<Vec<_>>>()?;
            if let Some(name) = rest {
                params.push(Param {
                    name,
                    default: None,
                    rest: true,
                });
            }
            let body = self.parse_arrow_body()?;
            self.arrow_end = true;
            return Ok(Expr::Arrow(Box::new(Arrow { params, body })));
        }

        self.arrow_end = false;
        if rest.is_some() {
            return Err(Self::error_at(&open, "rest element outside of arrow parameters"));
        }
        match items.len() {
            0 => Err(Self::error_at(&open, "empty parenthesized expression")),
            1 => Ok(items.remove(0)),
            _ => Ok(Expr::Seq(items)),
        }
    }

    fn expr_to_param(expr: Expr, at: &Token) -> Result<Param> {
        match expr {
            Expr::Ident(name) => Ok(Param {
                name,
                default: None,
                rest: false,
            }),
            Expr::Assign {
                op: AssignOp::Assign,
                target,
                value,
            } => match *target {
                Expr::Ident(name) => Ok(Param {
                    name,
                    default: Some(*value),
                    rest: false,
                }),
                _ => Err(Self::unsupported_at(at, "destructuring parameter")),
            },
            Expr::Array(_) | Expr::Object(_) => Err(Self::unsupported_at(at, "destructuring parameter")),
            _ => Err(Self::error_at(at, "invalid arrow function parameter")),
        }
    }
}
