//! Scope-aware identifier renaming.
//!
//! Runs after every structural pass so the bindings those passes introduce are
//! renamed as well. Renaming is decided per binding on a fresh
//! [`ScopeTree`] and written back through the node ids of every reference.

use crate::options::IdentifierNamesGenerator;
use crate::{Result, Transform};
use jscloak_core::ast::{Ident, Program};
use jscloak_core::parser::is_reserved_word;
use jscloak_core::scope::{BindingKind, ScopeId, ScopeTree};
use jscloak_core::visit::{walk_program_mut, VisitMut};
use rand::{rngs::StdRng, Rng};
use std::collections::HashSet;
use tracing::debug;

/// Names that are legal identifiers but must never be introduced.
const AVOIDED_NAMES: &[&str] = &[
    "arguments",
    "await",
    "eval",
    "implements",
    "Infinity",
    "interface",
    "let",
    "NaN",
    "package",
    "private",
    "protected",
    "public",
    "static",
    "undefined",
    "yield",
];

#[derive(Debug)]
pub struct RenameIdentifiers {
    generator: IdentifierNamesGenerator,
    rename_globals: bool,
}

impl RenameIdentifiers {
    pub fn new(generator: IdentifierNamesGenerator, rename_globals: bool) -> Self {
        Self {
            generator,
            rename_globals,
        }
    }

    /// Decides the new name of every renamable binding, storing it in
    /// [`jscloak_core::scope::Binding::renamed`].
    fn assign(&self, program: &Program, tree: &mut ScopeTree, rng: &mut StdRng) -> usize {
        let mut taken_everywhere: HashSet<String> = program.names.clone();
        taken_everywhere.extend(tree.unresolved.keys().cloned());
        let mut renamed = 0;

        for scope in tree.preorder() {
            let candidates: Vec<usize> = tree.scopes[scope]
                .bindings
                .values()
                .copied()
                .filter(|b| self.should_rename(program, tree, scope, *b))
                .collect();
            if candidates.is_empty() {
                continue;
            }

            let mut mangled = match self.generator {
                IdentifierNamesGenerator::Mangled => {
                    Some(MangledNames::new(self.visible_names(tree, scope, &candidates)))
                }
                IdentifierNamesGenerator::Hexadecimal => None,
            };

            for binding in candidates {
                let name = match &mut mangled {
                    Some(names) => names.next_name(),
                    None => hex_name(rng, &taken_everywhere),
                };
                taken_everywhere.insert(name.clone());
                tree.bindings[binding].renamed = Some(name);
                renamed += 1;
            }
        }
        renamed
    }

    fn should_rename(&self, program: &Program, tree: &ScopeTree, scope: ScopeId, binding: usize) -> bool {
        if tree.scopes[scope].has_eval {
            return false;
        }
        let binding = tree.binding(binding);
        binding.kind != BindingKind::Global
            || self.rename_globals
            || program.synthetic.contains(&binding.name)
    }

    /// Names a mangled binding of `scope` must not take: final names of every
    /// enclosing binding, bindings of this scope that keep their name, and
    /// host globals.
    fn visible_names(&self, tree: &ScopeTree, scope: ScopeId, renamed: &[usize]) -> HashSet<String> {
        let mut names: HashSet<String> = tree.unresolved.keys().cloned().collect();
        for ancestor in tree.ancestors(scope).skip(1) {
            for b in tree.scopes[ancestor].bindings.values() {
                names.insert(tree.binding(*b).final_name().to_string());
            }
        }
        for b in tree.scopes[scope].bindings.values() {
            if !renamed.contains(b) {
                names.insert(tree.binding(*b).name.clone());
            }
        }
        names
    }
}

impl Transform for RenameIdentifiers {
    fn name(&self) -> &'static str {
        "RenameIdentifiers"
    }

    fn apply(&self, program: &mut Program, rng: &mut StdRng) -> Result<bool> {
        let mut tree = ScopeTree::analyze(program);
        let renamed = self.assign(program, &mut tree, rng);
        debug!(
            bindings = tree.bindings.len(),
            renamed,
            host_globals = tree.unresolved.len(),
            "renaming identifiers"
        );
        if renamed == 0 {
            return Ok(false);
        }

        let mut writer = Writer { tree: &tree, names: Vec::new() };
        walk_program_mut(&mut writer, program);
        let Writer { names, .. } = writer;
        program.names.extend(names);
        Ok(true)
    }
}

/// `_0x` followed by 4 to 6 hex digits, distinct from every name in `taken`.
fn hex_name(rng: &mut StdRng, taken: &HashSet<String>) -> String {
    loop {
        let name = format!("_0x{:x}", rng.random_range(0x1000..0x1000000u32));
        if !taken.contains(&name) {
            return name;
        }
    }
}

/// `a`, `b`, ..., `z`, `aa`, `ab`, ... skipping names that are unusable or taken.
#[derive(Debug)]
struct MangledNames {
    counter: usize,
    taken: HashSet<String>,
}

impl MangledNames {
    fn new(taken: HashSet<String>) -> Self {
        Self { counter: 0, taken }
    }

    fn next_name(&mut self) -> String {
        loop {
            let name = mangled(self.counter);
            self.counter += 1;
            if is_reserved_word(&name) || AVOIDED_NAMES.contains(&name.as_str()) {
                continue;
            }
            if self.taken.insert(name.clone()) {
                return name;
            }
        }
    }
}

/// Bijective base-26 spelling of `n`: 0 is `a`, 25 is `z`, 26 is `aa`.
fn mangled(mut n: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'a' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

struct Writer<'a> {
    tree: &'a ScopeTree,
    names: Vec<String>,
}

impl VisitMut for Writer<'_> {
    fn visit_ident(&mut self, ident: &mut Ident) {
        if let Some(new) = self
            .tree
            .binding_of(ident.id)
            .and_then(|b| b.renamed.as_ref())
        {
            ident.name.clone_from(new);
            self.names.push(new.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jscloak_core::{parse_program, print_program, PrintOptions};
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;

    fn rename(src: &str, generator: IdentifierNamesGenerator, globals: bool) -> String {
        let mut program = parse_program(src).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        RenameIdentifiers::new(generator, globals)
            .apply(&mut program, &mut rng)
            .unwrap();
        print_program(&program, &PrintOptions::default())
    }

    #[test]
    fn mangled_sequence() {
        assert_eq!(mangled(0), "a");
        assert_eq!(mangled(25), "z");
        assert_eq!(mangled(26), "aa");
        assert_eq!(mangled(27), "ab");
        assert_eq!(mangled(26 + 26 * 26), "aaa");
    }

    #[test]
    fn mangles_locals_and_keeps_globals() {
        assert_eq!(
            rename(
                "function greet(name) { var msg = 'Hello, ' + name; console.log(msg); }",
                IdentifierNamesGenerator::Mangled,
                false
            ),
            "function greet(a){var b='Hello, '+a;console.log(b);}"
        );
    }

    #[test]
    fn renames_globals_when_asked() {
        assert_eq!(
            rename(
                "var count = 1; function inc(step) { count += step; } inc(2);",
                IdentifierNamesGenerator::Mangled,
                true
            ),
            "var a=1;function b(c){a+=c;}b(2);"
        );
    }

    #[test]
    fn inner_scopes_avoid_visible_names() {
        // `a` and `b` are taken by the outer function, so the inner one
        // starts at `c` while its reference to `x` keeps pointing outward.
        assert_eq!(
            rename(
                "function f(x, y) { return function (z) { return x + z; }; }",
                IdentifierNamesGenerator::Mangled,
                false
            ),
            "function f(a,b){return function(c){return a+c;};}"
        );
    }

    #[test]
    fn never_captures_host_globals() {
        assert_eq!(
            rename(
                "function f(p) { return a + p; }",
                IdentifierNamesGenerator::Mangled,
                false
            ),
            "function f(b){return a+b;}"
        );
    }

    #[test]
    fn eval_scopes_keep_names() {
        assert_eq!(
            rename(
                "function f(p) { var q = 1; eval('p + q'); } function g(r) { return r; }",
                IdentifierNamesGenerator::Mangled,
                false
            ),
            "function f(p){var q=1;eval('p + q');}function g(a){return a;}"
        );
    }

    #[test]
    fn labels_and_properties_untouched() {
        assert_eq!(
            rename(
                "function f(o) { var key = o.key; outer: for (;;) { break outer; } return {key}; }",
                IdentifierNamesGenerator::Mangled,
                false
            ),
            "function f(a){var b=a.key;outer:for(;;){break outer;}return{key:b};}"
        );
    }

    #[test]
    fn synthetic_globals_always_renamed() {
        let mut program = parse_program("var keep = 1;").unwrap();
        let name = program.fresh_name("arr");
        let stmts = jscloak_core::parse_into(&mut program, &format!("var {name} = keep;")).unwrap();
        program.body.extend(stmts);
        let mut rng = StdRng::seed_from_u64(1);
        RenameIdentifiers::new(IdentifierNamesGenerator::Mangled, false)
            .apply(&mut program, &mut rng)
            .unwrap();
        assert_eq!(
            print_program(&program, &PrintOptions::default()),
            "var keep=1;var a=keep;"
        );
    }

    #[test]
    fn hexadecimal_names_are_unique() {
        let out = rename(
            "function f(a, b) { var c = a + b; return function (d) { var e = d; return c + e; }; }",
            IdentifierNamesGenerator::Hexadecimal,
            false,
        );
        let program = parse_program(&out).unwrap();
        let tree = ScopeTree::analyze(&program);
        let names: Vec<&str> = tree
            .bindings
            .iter()
            .filter(|b| b.kind != BindingKind::Global)
            .map(|b| b.name.as_str())
            .collect();
        assert_eq!(names.len(), 5);
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(unique.len(), names.len());
        for name in names {
            assert!(name.starts_with("_0x"), "{name}");
            assert!((7..=9).contains(&name.len()), "{name}");
        }
    }
}
