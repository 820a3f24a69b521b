//! Control-flow flattening.
//!
//! A statement list `s0; s1; ...; sn` becomes
//!
//! ```text
//! var state = L0;
//! while (true) {
//!     switch (state) {
//!         case L0: s0; state = L1; continue;
//!         ...
//!         case Ln: sn; break;
//!     }
//!     break;
//! }
//! ```
//!
//! with random distinct labels and the cases in shuffled order. Function
//! declarations are moved in front of the dispatcher. Unlabeled `break` and
//! `continue` statements that would now hit the dispatcher instead of the
//! loop they were written for are pointed at a label on that loop; a plain
//! block containing such jumps is left alone.

use crate::{PassConfig, Result, Transform};
use jscloak_core::ast::{
    prologue_len, Arrow, ArrowBody, Expr, Function, Lit, Program, Stmt, SwitchCase, VarDecl,
    VarDeclarator, VarKind,
};
use jscloak_core::visit::{walk_arrow_mut, walk_function_mut, walk_stmt_mut, VisitMut};
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, Rng};
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug)]
pub struct ControlFlowFlattening {
    config: PassConfig,
}

impl ControlFlowFlattening {
    pub fn new(config: PassConfig) -> Self {
        Self { config }
    }
}

impl Transform for ControlFlowFlattening {
    fn name(&self) -> &'static str {
        "ControlFlowFlattening"
    }

    fn apply(&self, program: &mut Program, rng: &mut StdRng) -> Result<bool> {
        let mut body = std::mem::take(&mut program.body);
        let mut flattener = Flattener {
            program: &mut *program,
            rng,
            config: &self.config,
            flattened: 0,
        };
        flattener.visit_stmts(&mut body);
        let flattened = flattener.flattened;
        program.body = body;

        debug!("flattened {} blocks", flattened);
        Ok(flattened > 0)
    }
}

struct Flattener<'a> {
    program: &'a mut Program,
    rng: &'a mut StdRng,
    config: &'a PassConfig,
    flattened: usize,
}

impl Flattener<'_> {
    fn eligible(&mut self, stmts: &[Stmt]) -> bool {
        let start = prologue_len(stmts);
        let rest = &stmts[start..];
        let statements = rest
            .iter()
            .filter(|s| !matches!(s, Stmt::Function(_)))
            .count();
        statements >= self.config.min_block_statements.max(2)
            && !rest.iter().any(Stmt::is_lexical_decl)
            && self.rng.random_bool(self.config.control_flow_threshold.clamp(0.0, 1.0))
    }

    /// Flattens a function body or a block. Jumps escaping the list are
    /// retargeted to `label` if given; without a label the list is left
    /// unchanged when such jumps exist.
    fn flatten(&mut self, stmts: &mut Vec<Stmt>, label: Option<&str>) -> bool {
        if !self.eligible(stmts) {
            return false;
        }
        match label {
            Some(label) => {
                retarget_escaping(stmts, Some(label));
            }
            None if retarget_escaping(stmts, None) => return false,
            None => {}
        }

        let mut rest = stmts.split_off(prologue_len(stmts));
        let (functions, fragments): (Vec<Stmt>, Vec<Stmt>) = rest
            .drain(..)
            .partition(|s| matches!(s, Stmt::Function(_)));

        let labels = self.distinct_labels(fragments.len());
        let state = self.program.fresh_name("state");

        let mut cases: Vec<SwitchCase> = Vec::with_capacity(fragments.len());
        let last = fragments.len() - 1;
        for (i, fragment) in fragments.into_iter().enumerate() {
            let mut body = vec![fragment];
            if i < last {
                body.push(Stmt::Expr(Expr::assign(
                    Expr::Ident(self.program.ident(state.as_str())),
                    Expr::num(labels[i + 1]),
                )));
                body.push(Stmt::Continue(None));
            } else {
                body.push(Stmt::Break(None));
            }
            cases.push(SwitchCase {
                test: Some(Expr::num(labels[i])),
                body,
            });
        }
        cases.shuffle(&mut *self.rng);

        let dispatcher = Stmt::While {
            test: Expr::Lit(Lit::Bool(true)),
            body: Box::new(Stmt::Block(vec![
                Stmt::Switch {
                    discriminant: Expr::Ident(self.program.ident(state.as_str())),
                    cases,
                },
                Stmt::Break(None),
            ])),
        };

        stmts.extend(functions);
        stmts.push(Stmt::Var(VarDecl {
            kind: VarKind::Var,
            decls: vec![VarDeclarator {
                name: self.program.ident(state.as_str()),
                init: Some(Expr::num(labels[0])),
            }],
        }));
        stmts.push(dispatcher);
        self.flattened += 1;
        true
    }

    fn distinct_labels(&mut self, n: usize) -> Vec<u32> {
        let mut seen = HashSet::with_capacity(n);
        let mut labels = Vec::with_capacity(n);
        while labels.len() < n {
            let label = self.rng.random_range(1..100_000u32);
            if seen.insert(label) {
                labels.push(label);
            }
        }
        labels
    }

    /// A label name that occurs nowhere in the program.
    fn fresh_label(&mut self) -> String {
        loop {
            let label = format!("_0x{:x}", self.rng.random_range(0x1000..0x1000000u32));
            if self.program.names.insert(label.clone()) {
                return label;
            }
        }
    }

    /// Visits the parts of a loop, then flattens its body with jumps bound
    /// to `label` (or a fresh label). Returns the fresh label if one was
    /// needed and must be attached to the loop.
    fn flatten_loop(&mut self, stmt: &mut Stmt, label: Option<String>) -> Option<String> {
        let body_slot = stmt.loop_body_mut()?;
        let mut body = std::mem::replace(body_slot, Stmt::Empty);
        walk_stmt_mut(self, stmt);
        match &mut body {
            Stmt::Block(stmts) => self.visit_stmts(stmts),
            other => self.visit_stmt(other),
        }

        let mut fresh = None;
        if let Stmt::Block(stmts) = &mut body {
            let needs_label = has_escaping_jump(stmts);
            let label = match (label, needs_label) {
                (Some(label), _) => Some(label),
                (None, true) => {
                    let l = self.fresh_label();
                    fresh = Some(l.clone());
                    Some(l)
                }
                (None, false) => None,
            };
            let flattened = self.flatten(stmts, label.as_deref());
            if !flattened {
                fresh = None;
            }
        }

        if let Some(slot) = stmt.loop_body_mut() {
            *slot = body;
        }
        fresh
    }
}

impl VisitMut for Flattener<'_> {
    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Labeled { label, body } if body.is_loop() => {
                let label = label.clone();
                self.flatten_loop(body, Some(label));
            }
            s if s.is_loop() => {
                if let Some(label) = self.flatten_loop(s, None) {
                    let inner = std::mem::replace(s, Stmt::Empty);
                    *s = Stmt::Labeled {
                        label,
                        body: Box::new(inner),
                    };
                }
            }
            Stmt::Block(stmts) => {
                self.visit_stmts(stmts);
                self.flatten(stmts, None);
            }
            _ => walk_stmt_mut(self, stmt),
        }
    }

    fn visit_function(&mut self, func: &mut Function) {
        walk_function_mut(self, func);
        self.flatten(&mut func.body, None);
    }

    fn visit_arrow(&mut self, arrow: &mut Arrow) {
        walk_arrow_mut(self, arrow);
        if let ArrowBody::Block(body) = &mut arrow.body {
            self.flatten(body, None);
        }
    }
}

fn has_escaping_jump(stmts: &[Stmt]) -> bool {
    let mut copy = stmts.to_vec();
    retarget_escaping(&mut copy, None)
}

/// Finds unlabeled `break`/`continue` statements in `stmts` whose target lies
/// outside the list, pointing them at `label` when one is given. Returns
/// whether any were found. Nested functions are not entered.
fn retarget_escaping(stmts: &mut [Stmt], label: Option<&str>) -> bool {
    let mut found = false;
    for stmt in stmts {
        found |= retarget_stmt(stmt, label, 0, 0);
    }
    found
}

fn retarget_stmt(stmt: &mut Stmt, label: Option<&str>, loops: usize, switches: usize) -> bool {
    let retarget = |target: &mut Option<String>| {
        if let Some(label) = label {
            *target = Some(label.to_string());
        }
        true
    };
    match stmt {
        Stmt::Break(target @ None) if loops == 0 && switches == 0 => retarget(target),
        Stmt::Continue(target @ None) if loops == 0 => retarget(target),
        Stmt::Block(body) => body
            .iter_mut()
            .fold(false, |found, s| retarget_stmt(s, label, loops, switches) | found),
        Stmt::If { cons, alt, .. } => {
            let mut found = retarget_stmt(cons, label, loops, switches);
            if let Some(alt) = alt {
                found |= retarget_stmt(alt, label, loops, switches);
            }
            found
        }
        Stmt::Labeled { body, .. } => retarget_stmt(body, label, loops, switches),
        Stmt::For { body, .. }
        | Stmt::ForIn { body, .. }
        | Stmt::ForOf { body, .. }
        | Stmt::While { body, .. }
        | Stmt::DoWhile { body, .. } => retarget_stmt(body, label, loops + 1, switches),
        Stmt::Switch { cases, .. } => cases
            .iter_mut()
            .flat_map(|c| c.body.iter_mut())
            .fold(false, |found, s| retarget_stmt(s, label, loops, switches + 1) | found),
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            let mut found = false;
            for s in block.iter_mut() {
                found |= retarget_stmt(s, label, loops, switches);
            }
            if let Some(handler) = handler {
                for s in handler.body.iter_mut() {
                    found |= retarget_stmt(s, label, loops, switches);
                }
            }
            if let Some(finalizer) = finalizer {
                for s in finalizer.iter_mut() {
                    found |= retarget_stmt(s, label, loops, switches);
                }
            }
            found
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jscloak_core::{parse_program, print_program, PrintOptions};
    use rand::SeedableRng;

    fn config() -> PassConfig {
        PassConfig {
            control_flow_threshold: 1.0,
            ..PassConfig::default()
        }
    }

    fn flatten(src: &str) -> (bool, Program) {
        let mut program = parse_program(src).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let changed = ControlFlowFlattening::new(config())
            .apply(&mut program, &mut rng)
            .unwrap();
        (changed, program)
    }

    fn dispatcher_cases(stmts: &[Stmt]) -> &[SwitchCase] {
        let Some(Stmt::While { body, .. }) = stmts.last() else {
            panic!("dispatcher loop expected");
        };
        let Stmt::Block(inner) = &**body else {
            panic!("dispatcher block expected");
        };
        let Stmt::Switch { cases, .. } = &inner[0] else {
            panic!("switch expected");
        };
        cases
    }

    /// Follows the state transitions from the initial label and returns the
    /// fragments in execution order.
    fn execution_order(stmts: &[Stmt]) -> Vec<String> {
        let Stmt::Var(decl) = &stmts[stmts.len() - 2] else {
            panic!("state declaration expected");
        };
        let mut label = decl.decls[0].init.clone().unwrap();
        let cases = dispatcher_cases(stmts);
        let mut order = Vec::new();
        loop {
            let case = cases
                .iter()
                .find(|c| c.test.as_ref() == Some(&label))
                .unwrap();
            let opts = PrintOptions::default();
            order.push(print_program(
                &Program {
                    body: vec![case.body[0].clone()],
                    ..Program::default()
                },
                &opts,
            ));
            match &case.body[1] {
                Stmt::Expr(Expr::Assign { value, .. }) => label = (**value).clone(),
                Stmt::Break(None) => break,
                other => panic!("unexpected transition {other:?}"),
            }
        }
        order
    }

    #[test]
    fn flattens_function_body_in_order() {
        let (changed, program) = flatten("function f() { a(); b(); c(); d(); }");
        assert!(changed);
        let Stmt::Function(f) = &program.body[0] else {
            panic!("function expected");
        };
        assert_eq!(execution_order(&f.body), vec!["a();", "b();", "c();", "d();"]);
    }

    #[test]
    fn labels_are_distinct() {
        let (_, program) = flatten("function f() { a(); b(); c(); d(); e(); g(); }");
        let Stmt::Function(f) = &program.body[0] else {
            panic!("function expected");
        };
        let labels: HashSet<String> = dispatcher_cases(&f.body)
            .iter()
            .map(|c| format!("{:?}", c.test))
            .collect();
        assert_eq!(labels.len(), 6);
    }

    #[test]
    fn keeps_directives_and_lifts_functions() {
        let (_, program) = flatten(
            "function f() { 'use strict'; a(); function inner() {} b(); return inner; }",
        );
        let Stmt::Function(f) = &program.body[0] else {
            panic!("function expected");
        };
        assert!(matches!(&f.body[0], Stmt::Directive(_)));
        assert!(matches!(&f.body[1], Stmt::Function(inner) if inner.name.as_ref().unwrap().name == "inner"));
        assert_eq!(execution_order(&f.body), vec!["a();", "b();", "return inner;"]);
    }

    #[test]
    fn skips_small_and_lexical_blocks() {
        let (changed, _) = flatten("function f() { a(); b(); }");
        assert!(!changed);
        let (changed, _) = flatten("function f() { let x = 1; a(x); b(); }");
        assert!(!changed);
        let (changed, _) = flatten("a(); b(); c(); d();");
        assert!(!changed, "program top level stays intact");
    }

    #[test]
    fn loop_body_jumps_are_retargeted() {
        let (changed, program) = flatten(
            "function f(xs) { for (var i = 0; i < xs.length; i++) { if (xs[i]) continue; a(); if (b()) break; } }",
        );
        assert!(changed);
        let out = print_program(&program, &PrintOptions::default());
        let reparsed = parse_program(&out).unwrap();
        let Stmt::Function(f) = &reparsed.body[0] else {
            panic!("function expected");
        };
        let Stmt::Labeled { label, body } = &f.body[0] else {
            panic!("labeled loop expected in {out}");
        };
        assert!(body.is_loop());
        assert!(out.contains(&format!("continue {label};")), "{out}");
        assert!(out.contains(&format!("break {label};")), "{out}");
    }

    #[test]
    fn existing_label_is_reused() {
        let (_, program) =
            flatten("function f() { outer: while (x) { a(); if (y) break; b(); } }");
        let out = print_program(&program, &PrintOptions::default());
        assert!(out.contains("break outer;"), "{out}");
        assert_eq!(out.matches(':').count() - out.matches("case").count(), 1, "{out}");
    }

    #[test]
    fn block_with_escaping_jump_is_left_alone() {
        let (changed, program) = flatten("function f() { while (x) { if (y) { a(); b(); break; } } }");
        assert!(!changed);
        assert_eq!(
            print_program(&program, &PrintOptions::default()),
            "function f(){while(x){if(y){a();b();break;}}}"
        );
    }

    #[test]
    fn nested_jumps_stay_bound() {
        let mut stmts = parse_program("for (;;) { break; } switch (x) { case 1: break; } do { continue; } while (y);")
            .unwrap()
            .body;
        assert!(!retarget_escaping(&mut stmts, Some("L")));
        assert!(matches!(&stmts[0], Stmt::For { body, .. } if matches!(&**body, Stmt::Block(b) if b[0] == Stmt::Break(None))));
    }

    #[test]
    fn output_reparses() {
        let (_, program) = flatten(
            "function f(n) { var r = 0; for (var i = 0; i < n; i++) { if (i % 2) { continue; } r += i; r *= 2; } switch (r) { case 1: r++; break; default: r--; } return r; }",
        );
        let out = print_program(&program, &PrintOptions::default());
        assert!(parse_program(&out).is_ok(), "{out}");
    }
}
