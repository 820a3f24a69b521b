use super::Guard;
use crate::template::instantiate;
use crate::Result;
use jscloak_core::ast::{Program, Stmt};
use rand::rngs::StdRng;

/// `guard(ctx, fn)` returns a function that calls `fn` once. The check
/// searches the printed form of that function with a pattern that matches
/// a single line immediately but backtracks catastrophically once the code
/// has been reformatted over several lines.
const CHECK: &str = "(function(){\
var guard=(function(){var first=true;return function(ctx,fn){\
var wrapped=first?function(){if(fn){var res=fn.apply(ctx,arguments);fn=null;return res;}}:function(){};\
first=false;return wrapped;};})();\
var check=guard(this,function(){\
return check.toString().search('(((.+)+)+)+$').toString().constructor(check).search('(((.+)+)+)+$');});\
check();})();";

/// Anti-tamper guard. Only meaningful with compact output.
#[derive(Debug)]
pub struct SelfDefending;

impl Guard for SelfDefending {
    fn name(&self) -> &'static str {
        "SelfDefending"
    }

    fn preamble(&self, program: &mut Program, _rng: &mut StdRng) -> Result<Vec<Stmt>> {
        instantiate(program, "self defending", CHECK, &[])
    }
}
