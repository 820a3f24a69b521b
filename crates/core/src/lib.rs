//! Front end of the jscloak obfuscator: syntax tree, lexer, parser, scope
//! analysis and printer for the supported JavaScript subset.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod scope;
pub mod visit;

pub use parser::{parse_into, parse_program};
pub use printer::{print_program, PrintOptions};
