//! Runtime self-protection.
//!
//! Each protection is a [`Guard`]: it may rewrite the program and contributes
//! a preamble that runs at program start. [`GuardInjection`] runs a list of
//! guards as one transform, so protections can be swapped or left out without
//! touching the rest of the pipeline.

mod console;
mod debug_protection;
mod self_defending;

pub use console::DisableConsoleOutput;
pub use debug_protection::DebugProtection;
pub use self_defending::SelfDefending;

use crate::{Result, Transform};
use jscloak_core::ast::{Program, Stmt};
use rand::rngs::StdRng;
use tracing::debug;

/// A runtime protection.
pub trait Guard: Send + Sync {
    fn name(&self) -> &'static str;

    /// Rewrites the program, returning whether anything changed.
    fn rewrite(&self, _program: &mut Program) -> Result<bool> {
        Ok(false)
    }

    /// Statements to run before the program body.
    fn preamble(&self, program: &mut Program, rng: &mut StdRng) -> Result<Vec<Stmt>>;
}

/// Applies a list of guards.
pub struct GuardInjection {
    guards: Vec<Box<dyn Guard>>,
}

impl GuardInjection {
    pub fn new(guards: Vec<Box<dyn Guard>>) -> Self {
        Self { guards }
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

impl std::fmt::Debug for GuardInjection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardInjection")
            .field(
                "guards",
                &self.guards.iter().map(|g| g.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Transform for GuardInjection {
    fn name(&self) -> &'static str {
        "GuardInjection"
    }

    fn apply(&self, program: &mut Program, rng: &mut StdRng) -> Result<bool> {
        let mut preamble = Vec::new();
        let mut changed = false;
        for guard in &self.guards {
            let rewritten = guard.rewrite(program)?;
            let stmts = guard.preamble(program, rng)?;
            debug!(
                guard = guard.name(),
                rewritten,
                preamble = stmts.len(),
                "applied guard"
            );
            changed |= rewritten || !stmts.is_empty();
            preamble.extend(stmts);
        }
        let at = program.prologue_len();
        program.body.splice(at..at, preamble);
        Ok(changed)
    }
}
