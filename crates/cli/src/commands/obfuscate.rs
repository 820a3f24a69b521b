/// Module for the `obfuscate` subcommand, which runs the obfuscation pipeline
/// over a JavaScript file.
///
/// Options are layered: the preset, then the `--config` JSON file, then the
/// individual flags. A size and metrics report can be written with `--emit`.
use super::{read_input, read_options, write_output};
use async_trait::async_trait;
use clap::{Args, ValueEnum};
use jscloak_transform::obfuscator::{create_report, presets, print_obfuscation_analysis};
use jscloak_transform::options::{IdentifierNamesGenerator, StringArrayEncoding};
use jscloak_transform::plugin::{JavaScriptPlugin, TransformPlugin};
use jscloak_transform::{ObfuscationConfig, TransformMode};
use std::error::Error;
use std::fs;

/// Starting point for the options.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum Preset {
    #[default]
    Default,
    Light,
    Heavy,
}

/// Arguments for the `obfuscate` subcommand.
#[derive(Args)]
pub struct ObfuscateArgs {
    /// Input JavaScript file, or `-` for stdin.
    pub input: String,
    /// Output file; `.js` is appended when it has no extension. Defaults to stdout.
    #[arg(short, long)]
    pub output: Option<String>,
    /// JSON file with transform options (camelCase keys).
    #[arg(long)]
    pub config: Option<String>,
    /// Options preset applied before the config file and flags.
    #[arg(long, value_enum, default_value_t = Preset::Default)]
    pub preset: Preset,
    /// Random seed for transform application.
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long)]
    pub compact: Option<bool>,
    #[arg(long)]
    pub control_flow_flattening: Option<bool>,
    #[arg(long)]
    pub dead_code_injection: Option<bool>,
    #[arg(long)]
    pub debug_protection: Option<bool>,
    #[arg(long)]
    pub disable_console_output: Option<bool>,
    /// `hexadecimal` or `mangled`.
    #[arg(long)]
    pub identifier_names_generator: Option<IdentifierNamesGenerator>,
    #[arg(long)]
    pub rename_globals: Option<bool>,
    #[arg(long)]
    pub rotate_string_array: Option<bool>,
    #[arg(long)]
    pub self_defending: Option<bool>,
    #[arg(long)]
    pub split_strings: Option<bool>,
    #[arg(long)]
    pub string_array: Option<bool>,
    /// Comma-separated list of `none`, `base64`, `rc4`.
    #[arg(long, value_delimiter = ',')]
    pub string_array_encoding: Option<Vec<StringArrayEncoding>>,
    /// Share of string literals moved to the string array, in [0, 1].
    #[arg(long)]
    pub string_array_threshold: Option<f64>,
    #[arg(long)]
    pub unicode_escape_sequence: Option<bool>,
    /// Path to emit a size/metrics report as JSON.
    #[arg(long)]
    pub emit: Option<String>,
}

impl ObfuscateArgs {
    /// Resolves the preset, config file and flags into one configuration.
    pub fn config(&self) -> Result<ObfuscationConfig, Box<dyn Error>> {
        let mut config = match self.preset {
            Preset::Default => presets::default_obfuscation(None),
            Preset::Light => presets::light_obfuscation(None),
            Preset::Heavy => presets::heavy_obfuscation(None),
        };
        if let Some(path) = &self.config {
            config.options = read_options(path, &config.options)?;
        }

        let opts = &mut config.options;
        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field.clone() {
                    opts.$field = value;
                })*
            };
        }
        apply!(
            seed,
            compact,
            control_flow_flattening,
            dead_code_injection,
            debug_protection,
            disable_console_output,
            identifier_names_generator,
            rename_globals,
            rotate_string_array,
            self_defending,
            split_strings,
            string_array,
            string_array_encoding,
            string_array_threshold,
            unicode_escape_sequence,
        );
        config.mode = TransformMode::Obfuscate;
        Ok(config)
    }
}

/// Executes the `obfuscate` subcommand.
#[async_trait]
impl super::Command for ObfuscateArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        let config = self.config()?;
        let source = read_input(&self.input)?;

        let result = JavaScriptPlugin
            .transform(config, source)
            .await
            .map_err(|e| format!("Obfuscation failed: {e}"))?;

        if let Some(path) = &self.emit {
            let report = create_report(&result);
            fs::write(path, serde_json::to_string_pretty(&report)?)?;
            tracing::info!("wrote report to {}", path);
        }

        if let Some(path) = write_output(self.output.as_deref(), &result.code)? {
            print_obfuscation_analysis(&result);
            println!("Wrote {}", path.display());
        }
        Ok(())
    }
}
