use crate::{Result, Transform};
use jscloak_analysis::metrics::{collect_metrics, compare};
use jscloak_core::ast::Program;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info};

/// Trait for running a sequence of transforms over a program.
pub trait Pass {
    /// Runs `passes` in order and returns the names of those that changed the program.
    fn run(
        &self,
        program: &mut Program,
        passes: &[Box<dyn Transform>],
        seed: u64,
    ) -> Result<Vec<String>>;
}

/// Default implementation of the Pass trait.
///
/// All passes draw from one generator seeded with `seed`, so a run is fully
/// determined by the input, the pass list and the seed.
#[derive(Debug)]
pub struct DefaultPass;

impl Pass for DefaultPass {
    fn run(
        &self,
        program: &mut Program,
        passes: &[Box<dyn Transform>],
        seed: u64,
    ) -> Result<Vec<String>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut applied = Vec::new();

        for pass in passes {
            let before = collect_metrics(program);
            debug!(pass = pass.name(), statements = before.statements, "running pass");

            if !pass.apply(program, &mut rng)? {
                debug!(pass = pass.name(), "no change");
                continue;
            }

            let after = collect_metrics(program);
            info!("{:>16} Δ{:+.2}", pass.name(), compare(&before, &after));
            applied.push(pass.name().to_string());
        }
        Ok(applied)
    }
}

/// Convenience function to run the default pass.
pub fn run(program: &mut Program, passes: &[Box<dyn Transform>], seed: u64) -> Result<Vec<String>> {
    DefaultPass.run(program, passes, seed)
}
