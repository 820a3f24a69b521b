use crate::fixtures::CORPUS;
use jscloak_core::parse_program;
use jscloak_core::scope::{BindingKind, ScopeKind, ScopeTree};

fn unresolved(src: &str) -> Vec<String> {
    let program = parse_program(src).unwrap();
    ScopeTree::analyze(&program).unresolved.into_keys().collect()
}

#[test]
fn host_globals_of_corpus() {
    let expected: &[(&str, &[&str])] = &[
        ("closures", &["console"]),
        ("loops", &["console"]),
        ("switch_and_exceptions", &["Error", "console"]),
        ("modern_syntax", &["Math", "console"]),
        ("strings", &["console"]),
        ("hoisting", &["console"]),
    ];
    for ((name, src), (expected_name, globals)) in CORPUS.iter().zip(expected) {
        assert_eq!(name, expected_name);
        assert_eq!(unresolved(src), *globals, "{name}");
    }
}

#[test]
fn hoisted_declarations_resolve_before_definition() {
    let program = parse_program(CORPUS[5].1).unwrap();
    let tree = ScopeTree::analyze(&program);
    let factor = tree
        .bindings
        .iter()
        .find(|b| b.name == "factor")
        .unwrap();
    assert_eq!(factor.kind, BindingKind::Local);
    // Declaration plus the read inside `helper`.
    assert!(factor.references.len() >= 2);
}

#[test]
fn eval_poisons_enclosing_scopes() {
    let program =
        parse_program("function outer() { var a = 1; function inner() { eval('a'); } } function clean() {}")
            .unwrap();
    let tree = ScopeTree::analyze(&program);
    assert!(tree.scopes[tree.root()].has_eval);
    let functions: Vec<bool> = tree
        .scopes
        .iter()
        .filter(|s| s.kind == ScopeKind::Function)
        .map(|s| s.has_eval)
        .collect();
    assert_eq!(functions, vec![true, true, false]);
}
