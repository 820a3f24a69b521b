use super::Guard;
use crate::template::instantiate;
use crate::Result;
use jscloak_core::ast::{Expr, MemberProp, Program, Stmt, UnaryOp};
use jscloak_core::scope::ScopeTree;
use jscloak_core::visit::{walk_expr_mut, walk_program_mut, VisitMut};
use rand::rngs::StdRng;
use tracing::debug;

const METHODS: &[&str] = &[
    "log",
    "warn",
    "info",
    "error",
    "exception",
    "table",
    "trace",
    "debug",
];

/// Replaces the console methods of the global object with no-ops, covering
/// uses that cannot be rewritten statically such as `var log = console.log`.
const SILENCE: &str = "(function(){\
var g=typeof globalThis!=='undefined'?globalThis:typeof window!=='undefined'?window:typeof global!=='undefined'?global:{};\
var c=g.console=g.console||{};var m={{methods}};\
for(var i=0;i<m.length;i++){c[m[i]]=function(){};}})();";

/// Silences console output.
#[derive(Debug)]
pub struct DisableConsoleOutput;

impl Guard for DisableConsoleOutput {
    fn name(&self) -> &'static str {
        "DisableConsoleOutput"
    }

    /// Rewrites `console.m(args)` into `void (args)` wherever `console` is the
    /// host global.
    fn rewrite(&self, program: &mut Program) -> Result<bool> {
        let tree = ScopeTree::analyze(program);
        let mut rewriter = Rewriter {
            tree: &tree,
            rewritten: 0,
        };
        walk_program_mut(&mut rewriter, program);
        debug!("rewrote {} console calls", rewriter.rewritten);
        Ok(rewriter.rewritten > 0)
    }

    fn preamble(&self, program: &mut Program, _rng: &mut StdRng) -> Result<Vec<Stmt>> {
        let methods = format!(
            "[{}]",
            METHODS
                .iter()
                .map(|m| format!("'{m}'"))
                .collect::<Vec<_>>()
                .join(",")
        );
        instantiate(
            program,
            "console",
            SILENCE,
            &[("methods", methods.as_str())],
        )
    }
}

struct Rewriter<'a> {
    tree: &'a ScopeTree,
    rewritten: usize,
}

impl Rewriter<'_> {
    fn is_console_method(&self, callee: &Expr) -> bool {
        let Expr::Member { object, prop } = callee else {
            return false;
        };
        let Expr::Ident(ident) = object.as_ref() else {
            return false;
        };
        let named = match prop {
            MemberProp::Name(_) => true,
            MemberProp::Computed(key) => key.as_str_lit().is_some(),
        };
        named && ident.name == "console" && self.tree.is_unresolved(ident)
    }
}

impl VisitMut for Rewriter<'_> {
    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
        let Expr::Call { callee, args } = expr else {
            return;
        };
        if !self.is_console_method(callee) {
            return;
        }
        let args = std::mem::take(args);
        *expr = Expr::Unary {
            op: UnaryOp::Void,
            arg: Box::new(discard(args)),
        };
        self.rewritten += 1;
    }
}

/// An expression evaluating `args` left to right.
fn discard(mut args: Vec<Expr>) -> Expr {
    if args.iter().any(|a| matches!(a, Expr::Spread(_))) {
        return Expr::Array(args.into_iter().map(Some).collect());
    }
    match args.len() {
        0 => Expr::num(0),
        1 => args.remove(0),
        _ => Expr::Seq(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jscloak_core::{parse_program, print_program, PrintOptions};
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;

    fn rewrite(src: &str) -> (bool, String) {
        let mut program = parse_program(src).unwrap();
        let changed = DisableConsoleOutput.rewrite(&mut program).unwrap();
        (changed, print_program(&program, &PrintOptions::default()))
    }

    #[test]
    fn calls_become_void_expressions() {
        assert_eq!(
            rewrite("console.log(); console.warn(a); console['error'](a, b()); x = console.info(...rest);"),
            (
                true,
                "void 0;void a;void(a,b());x=void[...rest];".to_string()
            )
        );
    }

    #[test]
    fn nested_calls_are_rewritten() {
        assert_eq!(
            rewrite("console.log(console.log(1));").1,
            "void void 1;"
        );
    }

    #[test]
    fn local_console_is_left_alone() {
        let src = "function f(console) { console.log(1); }";
        let (changed, out) = rewrite(src);
        assert!(!changed);
        assert_eq!(out, "function f(console){console.log(1);}");
    }

    #[test]
    fn dynamic_keys_and_aliases_are_left_alone() {
        let (changed, out) = rewrite("console[m](1); var log = console.log;");
        assert!(!changed);
        assert_eq!(out, "console[m](1);var log=console.log;");
    }

    #[test]
    fn preamble_silences_every_method() {
        let mut program = Program::default();
        let mut rng = StdRng::seed_from_u64(0);
        program.body = DisableConsoleOutput.preamble(&mut program, &mut rng).unwrap();
        let out = print_program(&program, &PrintOptions::default());
        for method in METHODS {
            assert!(out.contains(&format!("'{method}'")), "{out}");
        }
        assert!(out.contains("globalThis"), "{out}");
    }
}
