use crate::template::{hex, instantiate, render};
use crate::{PassConfig, Result, Transform};
use jscloak_core::ast::{prologue_len, Arrow, ArrowBody, BinaryOp, Expr, Function, Program, Stmt};
use jscloak_core::visit::{walk_arrow_mut, walk_function_mut, walk_stmt_mut, VisitMut};
use rand::{rngs::StdRng, Rng};
use tracing::debug;

/// Inert snippets. Every `{{vN}}` is replaced by a fresh name, so the
/// snippets only ever touch their own bindings.
const TEMPLATES: &[(&str, usize)] = &[
    ("var {{v0}}={{n0}};var {{v1}}={{v0}}*{{n1}}+{{n2}};{{v0}}={{v1}}%{{n0}};", 2),
    ("var {{v0}}='{{word}}'.split('').reverse().join('');var {{v1}}={{v0}}.length;", 2),
    (
        "var {{v0}}=[{{n0}},{{n1}},{{n2}}];for(var {{v1}}=0;{{v1}}<{{v0}}.length;{{v1}}++){ {{v0}}[{{v1}}]^={{n2}}; }",
        2,
    ),
    ("var {{v0}}=function({{v1}}){return {{v1}}+{{n1}};};{{v0}}({{n0}});", 2),
];

const WORDS: &[&str] = &[
    "buffer", "handler", "payload", "session", "render", "update", "token", "stream", "cache",
    "resolve",
];

/// Surrounds real statements with never-taken branches of inert code.
///
/// Two shapes are produced: `if (false-predicate) { junk }` inserted before a
/// statement, and `if (true-predicate) { stmt } else { junk }` wrapping one.
/// Only code inside functions is touched, so the injected `var`s never become
/// globals.
#[derive(Debug)]
pub struct DeadCodeInjection {
    config: PassConfig,
}

impl DeadCodeInjection {
    pub fn new(config: PassConfig) -> Self {
        Self { config }
    }
}

impl Transform for DeadCodeInjection {
    fn name(&self) -> &'static str {
        "DeadCodeInjection"
    }

    fn apply(&self, program: &mut Program, rng: &mut StdRng) -> Result<bool> {
        let mut body = std::mem::take(&mut program.body);
        let mut injector = Injector {
            program: &mut *program,
            rng,
            threshold: self.config.dead_code_threshold.clamp(0.0, 1.0),
            depth: 0,
            injected: 0,
            error: None,
        };
        injector.visit_stmts(&mut body);
        let Injector {
            injected, error, ..
        } = injector;
        program.body = body;

        if let Some(err) = error {
            return Err(err);
        }
        debug!("injected {} dead code blocks", injected);
        Ok(injected > 0)
    }
}

struct Injector<'a> {
    program: &'a mut Program,
    rng: &'a mut StdRng,
    threshold: f64,
    /// Function nesting depth.
    depth: usize,
    injected: usize,
    error: Option<jscloak_utils::errors::TransformError>,
}

impl Injector<'_> {
    fn junk(&mut self) -> Result<Vec<Stmt>> {
        let (template, names) = TEMPLATES[self.rng.random_range(0..TEMPLATES.len())];
        let mut vars: Vec<(String, String)> = Vec::with_capacity(names + 4);
        for i in 0..names {
            vars.push((format!("v{i}"), self.program.fresh_name("dead")));
        }
        for i in 0..3 {
            vars.push((format!("n{i}"), hex(self.rng.random_range(1..0x10000u32))));
        }
        let word = WORDS[self.rng.random_range(0..WORDS.len())];
        vars.push(("word".to_string(), word.to_string()));
        let vars: Vec<(&str, &str)> = vars.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        instantiate(self.program, "dead code", &render(template, &vars), &[])
    }

    /// `'abcde' === 'abcde'`, or `'abcde' !== 'fghij'` when `truthy`,
    /// and their negations otherwise.
    fn predicate(&mut self, truthy: bool) -> Expr {
        let left = self.word();
        let mut right = self.word();
        while right == left {
            right = self.word();
        }
        let same = self.rng.random_bool(0.5);
        let op = match (truthy, same) {
            (true, true) | (false, false) => BinaryOp::StrictEq,
            (true, false) | (false, true) => BinaryOp::StrictNotEq,
        };
        let right = if same { left.clone() } else { right };
        Expr::binary(op, Expr::str(left), Expr::str(right))
    }

    fn word(&mut self) -> String {
        (0..5)
            .map(|_| (b'a' + self.rng.random_range(0..26u8)) as char)
            .collect()
    }

    fn inject(&mut self, stmts: &mut Vec<Stmt>) -> Result<()> {
        let start = prologue_len(stmts);
        let rest = stmts.split_off(start);
        for stmt in rest {
            if !self.rng.random_bool(self.threshold) {
                stmts.push(stmt);
                continue;
            }
            let junk = self.junk()?;
            if wrappable(&stmt) && self.rng.random_bool(0.5) {
                stmts.push(Stmt::If {
                    test: self.predicate(true),
                    cons: Box::new(Stmt::Block(vec![stmt])),
                    alt: Some(Box::new(Stmt::Block(junk))),
                });
            } else {
                stmts.push(Stmt::If {
                    test: self.predicate(false),
                    cons: Box::new(Stmt::Block(junk)),
                    alt: None,
                });
                stmts.push(stmt);
            }
            self.injected += 1;
        }
        Ok(())
    }

    fn process(&mut self, stmts: &mut Vec<Stmt>) {
        if self.depth == 0 || self.error.is_some() {
            return;
        }
        if let Err(err) = self.inject(stmts) {
            self.error = Some(err);
        }
    }
}

/// Statements whose meaning does not change inside a block.
fn wrappable(stmt: &Stmt) -> bool {
    !matches!(stmt, Stmt::Function(_) | Stmt::Directive(_)) && !stmt.is_lexical_decl()
}

impl VisitMut for Injector<'_> {
    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
        if let Stmt::Block(stmts) = stmt {
            self.process(stmts);
        }
    }

    fn visit_function(&mut self, func: &mut Function) {
        self.depth += 1;
        walk_function_mut(self, func);
        self.process(&mut func.body);
        self.depth -= 1;
    }

    fn visit_arrow(&mut self, arrow: &mut Arrow) {
        self.depth += 1;
        walk_arrow_mut(self, arrow);
        if let ArrowBody::Block(body) = &mut arrow.body {
            self.process(body);
        }
        self.depth -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jscloak_core::scope::ScopeTree;
    use jscloak_core::{parse_program, print_program, PrintOptions};
    use rand::SeedableRng;

    fn inject(src: &str, threshold: f64, seed: u64) -> (bool, Program) {
        let mut program = parse_program(src).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let pass = DeadCodeInjection::new(PassConfig {
            dead_code_threshold: threshold,
            ..PassConfig::default()
        });
        let changed = pass.apply(&mut program, &mut rng).unwrap();
        (changed, program)
    }

    #[test]
    fn every_template_parses() {
        let mut program = Program::default();
        for (template, _) in TEMPLATES {
            let src = render(
                template,
                &[
                    ("v0", "a"),
                    ("v1", "b"),
                    ("n0", "0x1"),
                    ("n1", "0x2"),
                    ("n2", "0x3"),
                    ("word", "token"),
                ],
            );
            assert!(jscloak_core::parse_into(&mut program, &src).is_ok(), "{src}");
        }
    }

    #[test]
    fn top_level_is_untouched() {
        let (changed, program) = inject("a(); if (x) { b(); c(); }", 1.0, 1);
        assert!(!changed);
        assert_eq!(
            print_program(&program, &PrintOptions::default()),
            "a();if(x){b();c();}"
        );
    }

    #[test]
    fn injects_into_functions() {
        let (changed, program) = inject("function f(x) { var y = x + 1; return y; }", 1.0, 7);
        assert!(changed);
        let Stmt::Function(f) = &program.body[0] else {
            panic!("function expected");
        };
        assert!(f.body.len() >= 2);
        assert!(f.body.iter().all(|s| matches!(s, Stmt::If { .. })
            || matches!(s, Stmt::Var(_) | Stmt::Return(_))));
        let out = print_program(&program, &PrintOptions::default());
        assert!(parse_program(&out).is_ok(), "{out}");
    }

    #[test]
    fn junk_only_declares_fresh_names() {
        let (_, program) = inject(
            "function f(a, b) { var c = a * b; g(c); h(a); return c; }",
            1.0,
            11,
        );
        let tree = ScopeTree::analyze(&program);
        // Host globals are exactly the ones the input referenced.
        let unresolved: Vec<&str> = tree.unresolved.keys().map(String::as_str).collect();
        assert_eq!(unresolved, vec!["g", "h"]);
        for binding in &tree.bindings {
            let original = ["f", "a", "b", "c"].contains(&binding.name.as_str());
            assert!(original || program.synthetic.contains(&binding.name), "{}", binding.name);
        }
    }

    #[test]
    fn predicates_have_fixed_outcome() {
        let mut program = Program::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut injector = Injector {
            program: &mut program,
            rng: &mut rng,
            threshold: 1.0,
            depth: 1,
            injected: 0,
            error: None,
        };
        for _ in 0..32 {
            for truthy in [true, false] {
                let Expr::Binary { op, left, right } = injector.predicate(truthy) else {
                    panic!("binary predicate expected");
                };
                let equal = left == right;
                let value = match op {
                    BinaryOp::StrictEq => equal,
                    BinaryOp::StrictNotEq => !equal,
                    other => panic!("unexpected operator {other:?}"),
                };
                assert_eq!(value, truthy);
            }
        }
    }

    #[test]
    fn lexical_declarations_are_not_wrapped() {
        for seed in 0..16 {
            let (_, program) = inject("function f() { let x = 1; const y = 2; return x + y; }", 1.0, seed);
            let out = print_program(&program, &PrintOptions::default());
            assert!(!out.contains("{let"), "{out}");
            assert!(!out.contains("{const"), "{out}");
        }
    }
}
