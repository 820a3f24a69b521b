//! Tree walkers.
//!
//! Implementors override the hooks they care about and call the matching
//! `walk_*` function to continue into children. Statement lists go through
//! `visit_stmts`, which lets passes insert or replace statements in place.

use crate::ast::*;

pub trait Visit {
    fn visit_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_function(&mut self, func: &Function) {
        walk_function(self, func);
    }

    fn visit_arrow(&mut self, arrow: &Arrow) {
        walk_arrow(self, arrow);
    }

    fn visit_ident(&mut self, _ident: &Ident) {}
}

pub fn walk_program<V: Visit + ?Sized>(v: &mut V, program: &Program) {
    v.visit_stmts(&program.body);
}

fn walk_var_decl<V: Visit + ?Sized>(v: &mut V, decl: &VarDecl) {
    for d in &decl.decls {
        v.visit_ident(&d.name);
        if let Some(init) = &d.init {
            v.visit_expr(init);
        }
    }
}

fn walk_for_head<V: Visit + ?Sized>(v: &mut V, head: &ForHead) {
    match head {
        ForHead::Var(_, ident) => v.visit_ident(ident),
        ForHead::Expr(e) => v.visit_expr(e),
    }
}

pub fn walk_stmt<V: Visit + ?Sized>(v: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::Directive(_)
        | Stmt::Empty
        | Stmt::Continue(_)
        | Stmt::Break(_)
        | Stmt::Debugger => {}
        Stmt::Expr(e) | Stmt::Throw(e) => v.visit_expr(e),
        Stmt::Var(decl) => walk_var_decl(v, decl),
        Stmt::Function(f) => v.visit_function(f),
        Stmt::Block(body) => v.visit_stmts(body),
        Stmt::If { test, cons, alt } => {
            v.visit_expr(test);
            v.visit_stmt(cons);
            if let Some(alt) = alt {
                v.visit_stmt(alt);
            }
        }
        Stmt::For {
            init,
            test,
            update,
            body,
        } => {
            match init {
                Some(ForInit::Var(decl)) => walk_var_decl(v, decl),
                Some(ForInit::Expr(e)) => v.visit_expr(e),
                None => {}
            }
            if let Some(test) = test {
                v.visit_expr(test);
            }
            if let Some(update) = update {
                v.visit_expr(update);
            }
            v.visit_stmt(body);
        }
        Stmt::ForIn { left, right, body } | Stmt::ForOf { left, right, body } => {
            walk_for_head(v, left);
            v.visit_expr(right);
            v.visit_stmt(body);
        }
        Stmt::While { test, body } | Stmt::DoWhile { body, test } => {
            v.visit_expr(test);
            v.visit_stmt(body);
        }
        Stmt::Return(arg) => {
            if let Some(arg) = arg {
                v.visit_expr(arg);
            }
        }
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            v.visit_stmts(block);
            if let Some(handler) = handler {
                if let Some(param) = &handler.param {
                    v.visit_ident(param);
                }
                v.visit_stmts(&handler.body);
            }
            if let Some(finalizer) = finalizer {
                v.visit_stmts(finalizer);
            }
        }
        Stmt::Switch {
            discriminant,
            cases,
        } => {
            v.visit_expr(discriminant);
            for case in cases {
                if let Some(test) = &case.test {
                    v.visit_expr(test);
                }
                v.visit_stmts(&case.body);
            }
        }
        Stmt::Labeled { body, .. } => v.visit_stmt(body),
    }
}

pub fn walk_function<V: Visit + ?Sized>(v: &mut V, func: &Function) {
    if let Some(name) = &func.name {
        v.visit_ident(name);
    }
    walk_params(v, &func.params);
    v.visit_stmts(&func.body);
}

fn walk_params<V: Visit + ?Sized>(v: &mut V, params: &[Param]) {
    for p in params {
        v.visit_ident(&p.name);
        if let Some(default) = &p.default {
            v.visit_expr(default);
        }
    }
}

pub fn walk_arrow<V: Visit + ?Sized>(v: &mut V, arrow: &Arrow) {
    walk_params(v, &arrow.params);
    match &arrow.body {
        ArrowBody::Expr(e) => v.visit_expr(e),
        ArrowBody::Block(body) => v.visit_stmts(body),
    }
}

fn walk_prop_key<V: Visit + ?Sized>(v: &mut V, key: &PropKey) {
    if let PropKey::Computed(e) = key {
        v.visit_expr(e);
    }
}

pub fn walk_expr<V: Visit + ?Sized>(v: &mut V, expr: &Expr) {
    match expr {
        Expr::Ident(ident) => v.visit_ident(ident),
        Expr::This | Expr::Lit(_) => {}
        Expr::Template(t) => {
            for e in &t.exprs {
                v.visit_expr(e);
            }
        }
        Expr::TaggedTemplate { tag, quasi } => {
            v.visit_expr(tag);
            for e in &quasi.exprs {
                v.visit_expr(e);
            }
        }
        Expr::Array(elements) => {
            for e in elements.iter().flatten() {
                v.visit_expr(e);
            }
        }
        Expr::Object(props) => {
            for prop in props {
                match prop {
                    Prop::KeyValue { key, value, .. } => {
                        walk_prop_key(v, key);
                        v.visit_expr(value);
                    }
                    Prop::Method { key, func, .. } => {
                        walk_prop_key(v, key);
                        v.visit_function(func);
                    }
                    Prop::Spread(e) => v.visit_expr(e),
                }
            }
        }
        Expr::Function(f) => v.visit_function(f),
        Expr::Arrow(a) => v.visit_arrow(a),
        Expr::Unary { arg, .. } | Expr::Update { arg, .. } | Expr::Spread(arg) => v.visit_expr(arg),
        Expr::Binary { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        Expr::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        Expr::Cond { test, cons, alt } => {
            v.visit_expr(test);
            v.visit_expr(cons);
            v.visit_expr(alt);
        }
        Expr::Call { callee, args } | Expr::New { callee, args } => {
            v.visit_expr(callee);
            for a in args {
                v.visit_expr(a);
            }
        }
        Expr::Member { object, prop } => {
            v.visit_expr(object);
            if let MemberProp::Computed(p) = prop {
                v.visit_expr(p);
            }
        }
        Expr::Seq(items) => {
            for e in items {
                v.visit_expr(e);
            }
        }
    }
}

pub trait VisitMut {
    fn visit_stmts(&mut self, stmts: &mut Vec<Stmt>) {
        for stmt in stmts.iter_mut() {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
    }

    fn visit_function(&mut self, func: &mut Function) {
        walk_function_mut(self, func);
    }

    fn visit_arrow(&mut self, arrow: &mut Arrow) {
        walk_arrow_mut(self, arrow);
    }

    fn visit_ident(&mut self, _ident: &mut Ident) {}
}

pub fn walk_program_mut<V: VisitMut + ?Sized>(v: &mut V, program: &mut Program) {
    v.visit_stmts(&mut program.body);
}

fn walk_var_decl_mut<V: VisitMut + ?Sized>(v: &mut V, decl: &mut VarDecl) {
    for d in &mut decl.decls {
        v.visit_ident(&mut d.name);
        if let Some(init) = &mut d.init {
            v.visit_expr(init);
        }
    }
}

fn walk_for_head_mut<V: VisitMut + ?Sized>(v: &mut V, head: &mut ForHead) {
    match head {
        ForHead::Var(_, ident) => v.visit_ident(ident),
        ForHead::Expr(e) => v.visit_expr(e),
    }
}

pub fn walk_stmt_mut<V: VisitMut + ?Sized>(v: &mut V, stmt: &mut Stmt) {
    match stmt {
        Stmt::Directive(_)
        | Stmt::Empty
        | Stmt::Continue(_)
        | Stmt::Break(_)
        | Stmt::Debugger => {}
        Stmt::Expr(e) | Stmt::Throw(e) => v.visit_expr(e),
        Stmt::Var(decl) => walk_var_decl_mut(v, decl),
        Stmt::Function(f) => v.visit_function(f),
        Stmt::Block(body) => v.visit_stmts(body),
        Stmt::If { test, cons, alt } => {
            v.visit_expr(test);
            v.visit_stmt(cons);
            if let Some(alt) = alt {
                v.visit_stmt(alt);
            }
        }
        Stmt::For {
            init,
            test,
            update,
            body,
        } => {
            match init {
                Some(ForInit::Var(decl)) => walk_var_decl_mut(v, decl),
                Some(ForInit::Expr(e)) => v.visit_expr(e),
                None => {}
            }
            if let Some(test) = test {
                v.visit_expr(test);
            }
            if let Some(update) = update {
                v.visit_expr(update);
            }
            v.visit_stmt(body);
        }
        Stmt::ForIn { left, right, body } | Stmt::ForOf { left, right, body } => {
            walk_for_head_mut(v, left);
            v.visit_expr(right);
            v.visit_stmt(body);
        }
        Stmt::While { test, body } | Stmt::DoWhile { body, test } => {
            v.visit_expr(test);
            v.visit_stmt(body);
        }
        Stmt::Return(arg) => {
            if let Some(arg) = arg {
                v.visit_expr(arg);
            }
        }
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            v.visit_stmts(block);
            if let Some(handler) = handler {
                if let Some(param) = &mut handler.param {
                    v.visit_ident(param);
                }
                v.visit_stmts(&mut handler.body);
            }
            if let Some(finalizer) = finalizer {
                v.visit_stmts(finalizer);
            }
        }
        Stmt::Switch {
            discriminant,
            cases,
        } => {
            v.visit_expr(discriminant);
            for case in cases {
                if let Some(test) = &mut case.test {
                    v.visit_expr(test);
                }
                v.visit_stmts(&mut case.body);
            }
        }
        Stmt::Labeled { body, .. } => v.visit_stmt(body),
    }
}

pub fn walk_function_mut<V: VisitMut + ?Sized>(v: &mut V, func: &mut Function) {
    if let Some(name) = &mut func.name {
        v.visit_ident(name);
    }
    walk_params_mut(v, &mut func.params);
    v.visit_stmts(&mut func.body);
}

fn walk_params_mut<V: VisitMut + ?Sized>(v: &mut V, params: &mut [Param]) {
    for p in params {
        v.visit_ident(&mut p.name);
        if let Some(default) = &mut p.default {
            v.visit_expr(default);
        }
    }
}

pub fn walk_arrow_mut<V: VisitMut + ?Sized>(v: &mut V, arrow: &mut Arrow) {
    walk_params_mut(v, &mut arrow.params);
    match &mut arrow.body {
        ArrowBody::Expr(e) => v.visit_expr(e),
        ArrowBody::Block(body) => v.visit_stmts(body),
    }
}

fn walk_prop_key_mut<V: VisitMut + ?Sized>(v: &mut V, key: &mut PropKey) {
    if let PropKey::Computed(e) = key {
        v.visit_expr(e);
    }
}

pub fn walk_expr_mut<V: VisitMut + ?Sized>(v: &mut V, expr: &mut Expr) {
    match expr {
        Expr::Ident(ident) => v.visit_ident(ident),
        Expr::This | Expr::Lit(_) => {}
        Expr::Template(t) => {
            for e in &mut t.exprs {
                v.visit_expr(e);
            }
        }
        Expr::TaggedTemplate { tag, quasi } => {
            v.visit_expr(tag);
            for e in &mut quasi.exprs {
                v.visit_expr(e);
            }
        }
        Expr::Array(elements) => {
            for e in elements.iter_mut().flatten() {
                v.visit_expr(e);
            }
        }
        Expr::Object(props) => {
            for prop in props {
                match prop {
                    Prop::KeyValue { key, value, .. } => {
                        walk_prop_key_mut(v, key);
                        v.visit_expr(value);
                    }
                    Prop::Method { key, func, .. } => {
                        walk_prop_key_mut(v, key);
                        v.visit_function(func);
                    }
                    Prop::Spread(e) => v.visit_expr(e),
                }
            }
        }
        Expr::Function(f) => v.visit_function(f),
        Expr::Arrow(a) => v.visit_arrow(a),
        Expr::Unary { arg, .. } | Expr::Update { arg, .. } | Expr::Spread(arg) => v.visit_expr(arg),
        Expr::Binary { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        Expr::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        Expr::Cond { test, cons, alt } => {
            v.visit_expr(test);
            v.visit_expr(cons);
            v.visit_expr(alt);
        }
        Expr::Call { callee, args } | Expr::New { callee, args } => {
            v.visit_expr(callee);
            for a in args {
                v.visit_expr(a);
            }
        }
        Expr::Member { object, prop } => {
            v.visit_expr(object);
            if let MemberProp::Computed(p) = prop {
                v.visit_expr(p);
            }
        }
        Expr::Seq(items) => {
            for e in items {
                v.visit_expr(e);
            }
        }
    }
}
