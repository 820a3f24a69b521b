/// Module for computing structural metrics of a JavaScript program.
///
/// The metrics quantify how hard a program is to follow: statement and function counts,
/// nesting depth, number of identifier occurrences, string literals left in plain sight,
/// and switch dispatchers. They are collected before and after each pass so the pipeline
/// can log what every pass changed, and they are returned to callers in the result metadata.
///
/// # Usage
/// ```rust,ignore
/// let program = jscloak_core::parse_program("function f(a) { return a + 1; }").unwrap();
/// let metrics = metrics::collect_metrics(&program);
/// println!("{}", serde_json::to_string_pretty(&metrics).unwrap());
/// ```
use jscloak_core::ast::{Expr, Function, Lit, Program, Stmt};
use jscloak_core::visit::{walk_expr, walk_function, walk_stmt, Visit};
use serde::{Deserialize, Serialize};

/// Represents a set of structural metrics for a program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Number of statements, nested ones included.
    pub statements: usize,
    /// Number of function declarations, expressions, methods and arrows.
    pub functions: usize,
    /// Deepest statement nesting level.
    pub max_depth: usize,
    /// Number of identifier occurrences.
    pub identifiers: usize,
    /// String literals in expression position.
    pub string_literals: usize,
    /// `switch` statements (dispatchers introduced by flattening count here).
    pub switches: usize,
    /// Composite potency score (heuristic based on the counts above).
    pub potency: f64,
}

/// Collects metrics from a parsed program.
///
/// Walks the whole tree once. Never fails: every tree the parser produces is measurable.
pub fn collect_metrics(program: &Program) -> Metrics {
    let mut collector = Collector::default();
    collector.visit_stmts(&program.body);
    let mut metrics = collector.metrics;
    metrics.potency = score(&metrics);
    metrics
}

/// Computes a composite potency score.
///
/// Control-flow structure (dispatchers, nesting) weighs most, plain string literals count
/// against the score since they are the first thing an analyst greps for.
fn score(m: &Metrics) -> f64 {
    let statements = (m.statements.max(1) as f64).log2();
    5.0 * statements
        + 2.0 * m.max_depth as f64
        + 10.0 * m.switches as f64
        + 0.1 * m.identifiers as f64
        + m.functions as f64
        - 0.5 * m.string_literals as f64
}

/// Compares two sets of metrics.
///
/// A positive result means the program became harder to read.
pub fn compare(before: &Metrics, after: &Metrics) -> f64 {
    after.potency - before.potency
}

#[derive(Default)]
struct Collector {
    metrics: Metrics,
    depth: usize,
}

impl Visit for Collector {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        self.metrics.statements += 1;
        if matches!(stmt, Stmt::Switch { .. }) {
            self.metrics.switches += 1;
        }
        self.depth += 1;
        self.metrics.max_depth = self.metrics.max_depth.max(self.depth);
        walk_stmt(self, stmt);
        self.depth -= 1;
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Lit(Lit::Str(_)) => self.metrics.string_literals += 1,
            Expr::Arrow(_) => self.metrics.functions += 1,
            _ => {}
        }
        walk_expr(self, expr);
    }

    fn visit_function(&mut self, func: &Function) {
        self.metrics.functions += 1;
        walk_function(self, func);
    }

    fn visit_ident(&mut self, _ident: &jscloak_core::ast::Ident) {
        self.metrics.identifiers += 1;
    }
}
