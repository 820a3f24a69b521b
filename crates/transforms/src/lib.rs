pub mod control_flow;
pub mod dead_code;
pub mod encoding;
pub mod guards;
pub mod obfuscator;
pub mod options;
pub mod pass;
pub mod plugin;
pub mod rename;
pub mod split_strings;
pub mod string_array;
mod template;

use jscloak_core::ast::Program;
use jscloak_utils::errors::TransformError;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

pub use obfuscator::{obfuscate_source, transform, ObfuscationConfig, ObfuscationResult};
pub use options::{IdentifierNamesGenerator, StringArrayEncoding, TransformMode, TransformOptions};

pub type Result<T> = std::result::Result<T, TransformError>;

/// Trait for source-level obfuscation transforms.
pub trait Transform: Send + Sync {
    /// Returns the transform's name for logging and identification.
    fn name(&self) -> &'static str;
    /// Applies the transform to the program, returning whether changes were made.
    fn apply(&self, program: &mut Program, rng: &mut StdRng) -> Result<bool>;
}

/// Tuning knobs of the individual passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassConfig {
    /// Probability that an eligible block is flattened
    pub control_flow_threshold: f64,
    /// Minimum number of statements for a block to be flattened
    pub min_block_statements: usize,
    /// Probability that a statement gets a dead-code companion
    pub dead_code_threshold: f64,
    /// Maximum length of a string literal chunk after splitting
    pub split_strings_chunk_length: usize,
    /// Re-run interval of the debugger check in milliseconds, 0 to run once
    pub debug_protection_interval: u32,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            control_flow_threshold: 0.75,
            min_block_statements: 3,
            dead_code_threshold: 0.4,
            split_strings_chunk_length: 10,
            debug_protection_interval: 0,
        }
    }
}
