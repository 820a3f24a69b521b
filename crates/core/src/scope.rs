//! Lexical scope analysis.
//!
//! [`ScopeTree::analyze`] builds the scope tree of a [`Program`] in two steps:
//! every declaration is first registered in the scope it belongs to (hoisting
//! `var` and function declarations to the nearest function or global scope),
//! then every identifier occurrence is resolved from the scope it appears in.
//! Occurrences that reach the global scope without a binding are recorded as
//! unresolved host globals.

use crate::ast::*;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};

pub type ScopeId = usize;
pub type BindingId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    /// Holds the name of a named function expression.
    FunctionName,
    Block,
    Catch,
    /// `let`/`const` declared in a `for` head.
    For,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Global,
    Local,
    Parameter,
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
    Function,
    Param,
    CatchParam,
    FunctionName,
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    pub decl: DeclKind,
    pub scope: ScopeId,
    /// Final name assigned by the renamer.
    pub renamed: Option<String>,
    /// Every occurrence (declarations included) that resolves here.
    pub references: Vec<NodeId>,
}

impl Binding {
    /// The name this binding will have in the output.
    pub fn final_name(&self) -> &str {
        self.renamed.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub bindings: IndexMap<String, BindingId>,
    /// A direct `eval` call occurs in this scope or a descendant.
    pub has_eval: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    pub scopes: Vec<Scope>,
    pub bindings: Vec<Binding>,
    resolved: HashMap<NodeId, BindingId>,
    /// Host globals referenced but never declared, with their occurrences.
    pub unresolved: BTreeMap<String, Vec<NodeId>>,
}

impl ScopeTree {
    pub fn analyze(program: &Program) -> Self {
        let mut builder = Builder {
            tree: Self::default(),
            current: 0,
            pending: Vec::new(),
        };
        builder.tree.scopes.push(Scope {
            kind: ScopeKind::Global,
            parent: None,
            children: Vec::new(),
            bindings: IndexMap::new(),
            has_eval: false,
        });
        builder.stmts(&program.body);
        builder.resolve_pending();
        builder.tree
    }

    pub const fn root(&self) -> ScopeId {
        0
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id]
    }

    /// Binding an identifier occurrence resolves to, if any.
    pub fn binding_of(&self, id: NodeId) -> Option<&Binding> {
        self.resolved.get(&id).map(|b| &self.bindings[*b])
    }

    pub fn is_unresolved(&self, ident: &Ident) -> bool {
        !self.resolved.contains_key(&ident.id)
            && self
                .unresolved
                .get(&ident.name)
                .is_some_and(|ids| ids.contains(&ident.id))
    }

    /// Looks `name` up from `scope` outward.
    pub fn lookup(&self, mut scope: ScopeId, name: &str) -> Option<BindingId> {
        loop {
            if let Some(b) = self.scopes[scope].bindings.get(name) {
                return Some(*b);
            }
            scope = self.scopes[scope].parent?;
        }
    }

    /// `scope` followed by all of its ancestors.
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), move |s| self.scopes[*s].parent)
    }

    /// Scope ids in pre-order (parents before children).
    pub fn preorder(&self) -> Vec<ScopeId> {
        let mut order = Vec::with_capacity(self.scopes.len());
        let mut stack = vec![self.root()];
        while let Some(s) = stack.pop() {
            order.push(s);
            stack.extend(self.scopes[s].children.iter().rev());
        }
        order
    }
}

struct Builder {
    tree: ScopeTree,
    current: ScopeId,
    pending: Vec<(NodeId, String, ScopeId)>,
}

impl Builder {
    fn push_scope(&mut self, kind: ScopeKind) -> ScopeId {
        let id = self.tree.scopes.len();
        self.tree.scopes.push(Scope {
            kind,
            parent: Some(self.current),
            children: Vec::new(),
            bindings: IndexMap::new(),
            has_eval: false,
        });
        self.tree.scopes[self.current].children.push(id);
        self.current = id;
        id
    }

    fn pop_scope(&mut self) {
        if let Some(parent) = self.tree.scopes[self.current].parent {
            self.current = parent;
        }
    }

    fn hoist_target(&self) -> ScopeId {
        let mut scope = self.current;
        loop {
            let s = &self.tree.scopes[scope];
            match (s.kind, s.parent) {
                (ScopeKind::Function | ScopeKind::Global, _) | (_, None) => return scope,
                (_, Some(parent)) => scope = parent,
            }
        }
    }

    fn declare(&mut self, ident: &Ident, decl: DeclKind) {
        let scope = match decl {
            DeclKind::Var | DeclKind::Function => self.hoist_target(),
            _ => self.current,
        };
        if !self.tree.scopes[scope].bindings.contains_key(&ident.name) {
            let kind = match decl {
                _ if self.tree.scopes[scope].kind == ScopeKind::Global => BindingKind::Global,
                DeclKind::Param | DeclKind::CatchParam => BindingKind::Parameter,
                DeclKind::Function | DeclKind::FunctionName => BindingKind::Function,
                _ => BindingKind::Local,
            };
            let id = self.tree.bindings.len();
            self.tree.bindings.push(Binding {
                name: ident.name.clone(),
                kind,
                decl,
                scope,
                renamed: None,
                references: Vec::new(),
            });
            self.tree.scopes[scope].bindings.insert(ident.name.clone(), id);
        }
        self.reference(ident);
    }

    fn reference(&mut self, ident: &Ident) {
        self.pending
            .push((ident.id, ident.name.clone(), self.current));
    }

    fn mark_eval(&mut self) {
        let mut scope = Some(self.current);
        while let Some(s) = scope {
            self.tree.scopes[s].has_eval = true;
            scope = self.tree.scopes[s].parent;
        }
    }

    fn resolve_pending(&mut self) {
        for (id, name, scope) in std::mem::take(&mut self.pending) {
            match self.tree.lookup(scope, &name) {
                Some(b) => {
                    self.tree.bindings[b].references.push(id);
                    self.tree.resolved.insert(id, b);
                }
                None => self.tree.unresolved.entry(name).or_default().push(id),
            }
        }
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn block(&mut self, body: &[Stmt]) {
        self.push_scope(ScopeKind::Block);
        self.stmts(body);
        self.pop_scope();
    }

    fn var_decl(&mut self, decl: &VarDecl) {
        let kind = match decl.kind {
            VarKind::Var => DeclKind::Var,
            VarKind::Let => DeclKind::Let,
            VarKind::Const => DeclKind::Const,
        };
        for d in &decl.decls {
            self.declare(&d.name, kind);
            if let Some(init) = &d.init {
                self.expr(init);
            }
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Directive(_)
            | Stmt::Empty
            | Stmt::Continue(_)
            | Stmt::Break(_)
            | Stmt::Debugger => {}
            Stmt::Expr(e) | Stmt::Throw(e) => self.expr(e),
            Stmt::Var(decl) => self.var_decl(decl),
            Stmt::Function(f) => {
                if let Some(name) = &f.name {
                    self.declare(name, DeclKind::Function);
                }
                self.function(f, false);
            }
            Stmt::Block(body) => self.block(body),
            Stmt::If { test, cons, alt } => {
                self.expr(test);
                self.stmt(cons);
                if let Some(alt) = alt {
                    self.stmt(alt);
                }
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                self.push_scope(ScopeKind::For);
                match init {
                    Some(ForInit::Var(decl)) => self.var_decl(decl),
                    Some(ForInit::Expr(e)) => self.expr(e),
                    None => {}
                }
                if let Some(test) = test {
                    self.expr(test);
                }
                if let Some(update) = update {
                    self.expr(update);
                }
                self.stmt(body);
                self.pop_scope();
            }
            Stmt::ForIn { left, right, body } | Stmt::ForOf { left, right, body } => {
                self.push_scope(ScopeKind::For);
                match left {
                    ForHead::Var(kind, ident) => {
                        let decl = match kind {
                            VarKind::Var => DeclKind::Var,
                            VarKind::Let => DeclKind::Let,
                            VarKind::Const => DeclKind::Const,
                        };
                        self.declare(ident, decl);
                    }
                    ForHead::Expr(e) => self.expr(e),
                }
                self.expr(right);
                self.stmt(body);
                self.pop_scope();
            }
            Stmt::While { test, body } | Stmt::DoWhile { body, test } => {
                self.expr(test);
                self.stmt(body);
            }
            Stmt::Return(arg) => {
                if let Some(arg) = arg {
                    self.expr(arg);
                }
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                self.block(block);
                if let Some(handler) = handler {
                    self.push_scope(ScopeKind::Catch);
                    if let Some(param) = &handler.param {
                        self.declare(param, DeclKind::CatchParam);
                    }
                    self.block(&handler.body);
                    self.pop_scope();
                }
                if let Some(finalizer) = finalizer {
                    self.block(finalizer);
                }
            }
            Stmt::Switch {
                discriminant,
                cases,
            } => {
                self.expr(discriminant);
                self.push_scope(ScopeKind::Block);
                for case in cases {
                    if let Some(test) = &case.test {
                        self.expr(test);
                    }
                    self.stmts(&case.body);
                }
                self.pop_scope();
            }
            Stmt::Labeled { body, .. } => self.stmt(body),
        }
    }

    /// Function scope for `f`. Expression names get their own scope between
    /// the enclosing one and the function body.
    fn function(&mut self, f: &Function, is_expression: bool) {
        let name_scope = match (&f.name, is_expression) {
            (Some(name), true) => {
                self.push_scope(ScopeKind::FunctionName);
                self.declare(name, DeclKind::FunctionName);
                true
            }
            _ => false,
        };
        self.push_scope(ScopeKind::Function);
        self.params(&f.params);
        self.stmts(&f.body);
        self.pop_scope();
        if name_scope {
            self.pop_scope();
        }
    }

    fn params(&mut self, params: &[Param]) {
        for p in params {
            self.declare(&p.name, DeclKind::Param);
        }
        for p in params {
            if let Some(default) = &p.default {
                self.expr(default);
            }
        }
    }

    fn arrow(&mut self, arrow: &Arrow) {
        self.push_scope(ScopeKind::Function);
        self.params(&arrow.params);
        match &arrow.body {
            ArrowBody::Expr(e) => self.expr(e),
            ArrowBody::Block(body) => self.stmts(body),
        }
        self.pop_scope();
    }

    fn prop_key(&mut self, key: &PropKey) {
        if let PropKey::Computed(e) = key {
            self.expr(e);
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(ident) => self.reference(ident),
            Expr::This | Expr::Lit(_) => {}
            Expr::Template(t) => {
                for e in &t.exprs {
                    self.expr(e);
                }
            }
            Expr::TaggedTemplate { tag, quasi } => {
                self.expr(tag);
                for e in &quasi.exprs {
                    self.expr(e);
                }
            }
            Expr::Array(elements) => {
                for e in elements.iter().flatten() {
                    self.expr(e);
                }
            }
            Expr::Object(props) => {
                for prop in props {
                    match prop {
                        Prop::KeyValue { key, value, .. } => {
                            self.prop_key(key);
                            self.expr(value);
                        }
                        Prop::Method { key, func, .. } => {
                            self.prop_key(key);
                            self.function(func, true);
                        }
                        Prop::Spread(e) => self.expr(e),
                    }
                }
            }
            Expr::Function(f) => self.function(f, true),
            Expr::Arrow(a) => self.arrow(a),
            Expr::Unary { arg, .. } | Expr::Update { arg, .. } | Expr::Spread(arg) => {
                self.expr(arg)
            }
            Expr::Binary { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            Expr::Assign { target, value, .. } => {
                self.expr(target);
                self.expr(value);
            }
            Expr::Cond { test, cons, alt } => {
                self.expr(test);
                self.expr(cons);
                self.expr(alt);
            }
            Expr::Call { callee, args } => {
                if matches!(callee.as_ref(), Expr::Ident(i) if i.name == "eval") {
                    self.mark_eval();
                }
                self.expr(callee);
                for a in args {
                    self.expr(a);
                }
            }
            Expr::New { callee, args } => {
                self.expr(callee);
                for a in args {
                    self.expr(a);
                }
            }
            Expr::Member { object, prop } => {
                self.expr(object);
                if let MemberProp::Computed(p) = prop {
                    self.expr(p);
                }
            }
            Expr::Seq(items) => {
                for e in items {
                    self.expr(e);
                }
            }
        }
    }
}
