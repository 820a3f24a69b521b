//! Runtime snippets injected by the passes.
//!
//! Snippets are JavaScript source with `{{key}}` placeholders. They are
//! parsed into the target program so their identifiers get ids from the
//! program's allocator and take part in scope analysis and renaming.

use crate::Result;
use jscloak_core::ast::{Program, Stmt};
use jscloak_core::parse_into;
use jscloak_utils::errors::TransformError;

/// Substitutes every `{{key}}` in `template`.
pub(crate) fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
    }
    out
}

/// Renders `template` and parses it into statements owned by `program`.
pub(crate) fn instantiate(
    program: &mut Program,
    name: &'static str,
    template: &str,
    vars: &[(&str, &str)],
) -> Result<Vec<Stmt>> {
    let src = render(template, vars);
    parse_into(program, &src).map_err(|source| TransformError::Template { name, source })
}

/// Formats an integer the way generated code spells numbers.
pub(crate) fn hex(n: impl std::fmt::LowerHex) -> String {
    format!("0x{n:x}")
}
