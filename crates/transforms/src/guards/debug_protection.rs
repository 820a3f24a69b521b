use super::Guard;
use crate::template::instantiate;
use crate::Result;
use jscloak_core::ast::{Program, Stmt};
use rand::rngs::StdRng;

/// Times a `debugger` statement. With developer tools closed the statement
/// is a no-op; when it pauses execution for more than 100 ms the program
/// spins forever.
const CHECK: &str = "(function(){\
var check=function(){var start=Date.now();\
try{(function(){}).constructor('debugger')();}catch(e){}\
if(Date.now()-start>100){while(true){}}};\
check();{{schedule}}})();";

const SCHEDULE: &str = "if(typeof setInterval==='function'){setInterval(check,{{interval}});}";

/// Anti-debugging guard.
#[derive(Debug)]
pub struct DebugProtection {
    /// Milliseconds between checks after the first one; 0 checks once.
    interval: u32,
}

impl DebugProtection {
    pub fn new(interval: u32) -> Self {
        Self { interval }
    }
}

impl Guard for DebugProtection {
    fn name(&self) -> &'static str {
        "DebugProtection"
    }

    fn preamble(&self, program: &mut Program, _rng: &mut StdRng) -> Result<Vec<Stmt>> {
        let interval = self.interval.to_string();
        let schedule = if self.interval > 0 {
            crate::template::render(SCHEDULE, &[("interval", interval.as_str())])
        } else {
            String::new()
        };
        instantiate(
            program,
            "debug protection",
            CHECK,
            &[("schedule", schedule.as_str())],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jscloak_core::{print_program, PrintOptions};
    use rand::SeedableRng;

    fn preamble(interval: u32) -> String {
        let mut program = Program::default();
        let mut rng = StdRng::seed_from_u64(0);
        program.body = DebugProtection::new(interval)
            .preamble(&mut program, &mut rng)
            .unwrap();
        print_program(&program, &PrintOptions::default())
    }

    #[test]
    fn runs_once_without_interval() {
        let out = preamble(0);
        assert!(out.contains("constructor('debugger')"), "{out}");
        assert!(out.contains("Date.now()-start>100"), "{out}");
        assert!(!out.contains("setInterval"), "{out}");
    }

    #[test]
    fn schedules_with_interval() {
        let out = preamble(4000);
        assert!(out.contains("setInterval(check,4000)"), "{out}");
    }
}
