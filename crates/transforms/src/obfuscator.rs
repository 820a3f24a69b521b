use crate::control_flow::ControlFlowFlattening;
use crate::dead_code::DeadCodeInjection;
use crate::guards::{DebugProtection, DisableConsoleOutput, Guard, GuardInjection, SelfDefending};
use crate::options::{TransformMode, TransformOptions};
use crate::rename::RenameIdentifiers;
use crate::split_strings::SplitStrings;
use crate::string_array::StringArray;
use crate::{pass, PassConfig, Result, Transform};
use jscloak_analysis::metrics::{collect_metrics, compare, Metrics};
use jscloak_core::{parse_program, print_program, PrintOptions};
use jscloak_utils::errors::TransformError;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Configuration for the obfuscation pipeline
#[derive(Debug, Clone, Default)]
pub struct ObfuscationConfig {
    /// User-facing options, before mode overrides are applied
    pub options: TransformOptions,
    /// Obfuscate or reformat
    pub mode: TransformMode,
    /// Tuning of the individual passes
    pub pass_config: PassConfig,
}

/// Result of the obfuscation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObfuscationResult {
    /// The printed output program
    pub code: String,
    /// Input size in bytes
    pub original_size: usize,
    /// Output size in bytes
    pub obfuscated_size: usize,
    /// Size increase as percentage
    pub size_increase_percentage: f64,
    /// Metadata about the obfuscation process
    pub metadata: ObfuscationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObfuscationMetadata {
    pub mode: TransformMode,
    /// Names of transforms that changed the program, in pipeline order
    pub transforms_applied: Vec<String>,
    /// Seed used for the obfuscation
    pub seed_used: u64,
    pub metrics_before: Metrics,
    pub metrics_after: Metrics,
    /// Potency gained over the whole pipeline
    pub potency_delta: f64,
}

/// Transforms `source` and returns the printed program.
///
/// This is the whole engine contract: parse, run the passes enabled by
/// `options` for `mode`, print. Nothing outside the call is touched, so
/// independent invocations may run in parallel.
pub fn transform(source: &str, options: &TransformOptions, mode: TransformMode) -> Result<String> {
    let config = ObfuscationConfig {
        options: options.clone(),
        mode,
        pass_config: PassConfig::default(),
    };
    Ok(obfuscate_source(source, &config)?.code)
}

/// Stack reserved for the engine thread. Parsing, the passes, printing and
/// dropping the tree all recurse over it, and the parser bounds its depth at
/// [`jscloak_core::parser::MAX_NESTING_DEPTH`], so this is enough for any
/// program the parser accepts.
pub const ENGINE_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Main obfuscation pipeline
///
/// Runs on a dedicated thread with [`ENGINE_STACK_SIZE`] of stack, so deeply
/// nested input never depends on the caller's stack.
pub fn obfuscate_source(source: &str, config: &ObfuscationConfig) -> Result<ObfuscationResult> {
    std::thread::scope(|scope| {
        let engine = std::thread::Builder::new()
            .name("jscloak-engine".to_string())
            .stack_size(ENGINE_STACK_SIZE)
            .spawn_scoped(scope, || run_pipeline(source, config))
            .map_err(|e| TransformError::Worker(format!("could not start engine thread: {e}")))?;
        engine
            .join()
            .map_err(|_| TransformError::Worker("engine thread panicked".to_string()))?
    })
}

fn run_pipeline(source: &str, config: &ObfuscationConfig) -> Result<ObfuscationResult> {
    let opts = config.options.resolve(config.mode);
    tracing::debug!("Starting {} pipeline:", config.mode);
    tracing::debug!("  Input size: {} bytes", source.len());
    tracing::debug!("  Seed: 0x{:x}", opts.seed);

    let mut program = parse_program(source)?;
    let metrics_before = collect_metrics(&program);
    tracing::debug!(
        "  Statements: {}, functions: {}",
        metrics_before.statements,
        metrics_before.functions
    );

    let passes = build_passes(&opts, &config.pass_config);
    tracing::debug!(
        "  Passes: {:?}",
        passes.iter().map(|p| p.name()).collect::<Vec<_>>()
    );
    let transforms_applied = pass::run(&mut program, &passes, opts.seed)?;
    let metrics_after = collect_metrics(&program);

    let code = print_program(
        &program,
        &PrintOptions {
            compact: opts.compact,
            unicode_escape: opts.unicode_escape_sequence,
        },
    );
    // Anything the printer emits must be readable by the parser again.
    parse_program(&code).map_err(|e| TransformError::InvalidOutput(e.to_string()))?;

    let original_size = source.len();
    let obfuscated_size = code.len();
    let size_increase_percentage = if original_size > 0 {
        ((obfuscated_size as f64 - original_size as f64) / original_size as f64) * 100.0
    } else {
        0.0
    };
    tracing::debug!(
        "  Output size: {} bytes ({:+.1}%)",
        obfuscated_size,
        size_increase_percentage
    );

    Ok(ObfuscationResult {
        code,
        original_size,
        obfuscated_size,
        size_increase_percentage,
        metadata: ObfuscationMetadata {
            mode: config.mode,
            transforms_applied,
            seed_used: opts.seed,
            potency_delta: compare(&metrics_before, &metrics_after),
            metrics_before,
            metrics_after,
        },
    })
}

/// Builds the pass list for already resolved options.
///
/// Guards come first so their preambles are obfuscated with the rest of the
/// program. Dead code goes in before flattening so it is scattered into the
/// switch cases, splitting precedes the string array so every chunk becomes
/// an entry, and renaming is always last so it covers every binding the
/// earlier passes introduce.
pub fn build_passes(opts: &TransformOptions, config: &PassConfig) -> Vec<Box<dyn Transform>> {
    let mut passes: Vec<Box<dyn Transform>> = Vec::new();

    let mut guards: Vec<Box<dyn Guard>> = Vec::new();
    if opts.debug_protection {
        guards.push(Box::new(DebugProtection::new(config.debug_protection_interval)));
    }
    if opts.self_defending {
        guards.push(Box::new(SelfDefending));
    }
    if opts.disable_console_output {
        guards.push(Box::new(DisableConsoleOutput));
    }
    if !guards.is_empty() {
        passes.push(Box::new(GuardInjection::new(guards)));
    }

    if opts.dead_code_injection {
        passes.push(Box::new(DeadCodeInjection::new(config.clone())));
    }
    if opts.control_flow_flattening {
        passes.push(Box::new(ControlFlowFlattening::new(config.clone())));
    }
    if opts.split_strings {
        passes.push(Box::new(SplitStrings::new(config.split_strings_chunk_length)));
    }
    if opts.string_array {
        passes.push(Box::new(StringArray::new(
            opts.string_array_threshold,
            opts.string_array_encoding.clone(),
            opts.rotate_string_array,
        )));
    }
    passes.push(Box::new(RenameIdentifiers::new(
        opts.identifier_names_generator,
        opts.rename_globals,
    )));
    passes
}

/// Prints a short human-readable summary of a run
pub fn print_obfuscation_analysis(result: &ObfuscationResult) {
    let metadata = &result.metadata;
    println!("Transform Analysis:");
    println!("Mode: {}", metadata.mode);
    println!("Original size: {} bytes", result.original_size);
    println!(
        "Applied {} transforms: {:?}",
        metadata.transforms_applied.len(),
        metadata.transforms_applied
    );
    println!(
        "Statements: {} → {}, max depth: {} → {}",
        metadata.metrics_before.statements,
        metadata.metrics_after.statements,
        metadata.metrics_before.max_depth,
        metadata.metrics_after.max_depth
    );
    println!("Potency: {:+.2}", metadata.potency_delta);
    println!(
        "Size change: {} → {} bytes ({:+.1}%)",
        result.original_size, result.obfuscated_size, result.size_increase_percentage
    );
    println!();
}

/// Machine-readable report of a run
pub fn create_report(result: &ObfuscationResult) -> serde_json::Value {
    json!({
        "mode": result.metadata.mode,
        "original_bytes": result.original_size,
        "obfuscated_bytes": result.obfuscated_size,
        "size_delta_bytes": (result.obfuscated_size as i64 - result.original_size as i64),
        "percent_size": result.size_increase_percentage,
        "transforms_applied": result.metadata.transforms_applied,
        "seed_used": result.metadata.seed_used,
        "metrics_before": result.metadata.metrics_before,
        "metrics_after": result.metadata.metrics_after,
        "potency_delta": result.metadata.potency_delta,
    })
}

/// Convenience function to create common transform configurations
pub mod presets {
    use super::*;
    use crate::options::StringArrayEncoding;

    /// The default options
    pub fn default_obfuscation(seed: Option<u64>) -> ObfuscationConfig {
        ObfuscationConfig {
            options: TransformOptions {
                seed: seed.unwrap_or_default(),
                ..TransformOptions::default()
            },
            ..ObfuscationConfig::default()
        }
    }

    /// Renaming only
    pub fn light_obfuscation(seed: Option<u64>) -> ObfuscationConfig {
        ObfuscationConfig {
            options: TransformOptions {
                seed: seed.unwrap_or_default(),
                string_array: false,
                split_strings: false,
                ..TransformOptions::default()
            },
            ..ObfuscationConfig::default()
        }
    }

    /// Every behavior-preserving pass enabled
    pub fn heavy_obfuscation(seed: Option<u64>) -> ObfuscationConfig {
        custom_obfuscation(seed, 1.0)
    }

    /// Custom obfuscation with specific intensity in `[0, 1]`
    pub fn custom_obfuscation(seed: Option<u64>, intensity: f32) -> ObfuscationConfig {
        let intensity = f64::from(intensity.clamp(0.0, 1.0));
        let string_array_encoding = if intensity > 0.7 {
            vec![StringArrayEncoding::Base64, StringArrayEncoding::Rc4]
        } else if intensity > 0.4 {
            vec![StringArrayEncoding::None, StringArrayEncoding::Base64]
        } else {
            vec![StringArrayEncoding::None]
        };
        ObfuscationConfig {
            options: TransformOptions {
                seed: seed.unwrap_or_default(),
                control_flow_flattening: intensity > 0.3,
                dead_code_injection: intensity > 0.5,
                string_array: intensity > 0.0,
                split_strings: intensity > 0.0,
                string_array_threshold: intensity,
                string_array_encoding,
                ..TransformOptions::default()
            },
            mode: TransformMode::Obfuscate,
            pass_config: PassConfig {
                control_flow_threshold: intensity,
                dead_code_threshold: intensity * 0.5,
                ..PassConfig::default()
            },
        }
    }
}
