//! Option surface of the engine.
//!
//! [`TransformOptions`] mirrors the option object accepted by the host front
//! ends. It deserializes from camelCase JSON, every field has a default, so a
//! partial document is valid. Values outside their domain are clamped in
//! [`TransformOptions::resolve`] with a warning instead of failing.

use jscloak_utils::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Default share of eligible string literals routed through the string array.
pub const DEFAULT_STRING_ARRAY_THRESHOLD: f64 = 0.75;

/// Whether the pipeline obfuscates or reformats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformMode {
    #[default]
    Obfuscate,
    /// Runs the pipeline with every structural pass disabled and readable
    /// output. This is a pretty-printer: it cannot undo renaming, flattening
    /// or string encoding already present in the input.
    Deobfuscate,
}

impl FromStr for TransformMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "obfuscate" => Ok(Self::Obfuscate),
            "deobfuscate" => Ok(Self::Deobfuscate),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for TransformMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Obfuscate => "obfuscate",
            Self::Deobfuscate => "deobfuscate",
        })
    }
}

/// Naming scheme used by the identifier renamer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierNamesGenerator {
    /// `_0x` followed by hex digits, unique across the program.
    #[default]
    Hexadecimal,
    /// `a`, `b`, ..., `aa`, ... reused per scope.
    Mangled,
}

impl FromStr for IdentifierNamesGenerator {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hexadecimal" => Ok(Self::Hexadecimal),
            "mangled" => Ok(Self::Mangled),
            other => Err(ConfigError::UnknownNamesGenerator(other.to_string())),
        }
    }
}

/// Encoding of a string array entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringArrayEncoding {
    None,
    Base64,
    Rc4,
}

impl FromStr for StringArrayEncoding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "base64" => Ok(Self::Base64),
            "rc4" => Ok(Self::Rc4),
            other => Err(ConfigError::UnknownEncoding(other.to_string())),
        }
    }
}

/// User-facing options. Field names serialize in camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    pub compact: bool,
    pub control_flow_flattening: bool,
    pub dead_code_injection: bool,
    pub debug_protection: bool,
    pub disable_console_output: bool,
    pub identifier_names_generator: IdentifierNamesGenerator,
    pub rename_globals: bool,
    pub rotate_string_array: bool,
    pub self_defending: bool,
    pub split_strings: bool,
    pub string_array: bool,
    pub string_array_encoding: Vec<StringArrayEncoding>,
    pub string_array_threshold: f64,
    pub unicode_escape_sequence: bool,
    /// Seed of every random choice made by the passes.
    pub seed: u64,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            compact: true,
            control_flow_flattening: false,
            dead_code_injection: false,
            debug_protection: false,
            disable_console_output: false,
            identifier_names_generator: IdentifierNamesGenerator::Hexadecimal,
            rename_globals: false,
            rotate_string_array: true,
            self_defending: false,
            split_strings: true,
            string_array: true,
            string_array_encoding: vec![StringArrayEncoding::None],
            string_array_threshold: DEFAULT_STRING_ARRAY_THRESHOLD,
            unicode_escape_sequence: false,
            seed: 0,
        }
    }
}

impl TransformOptions {
    /// Loads options from a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Applies the fields present in a JSON document on top of `self`;
    /// fields the document omits keep their current values.
    pub fn overlay_json(&self, json: &str) -> Result<Self, ConfigError> {
        let serde_json::Value::Object(overrides) = serde_json::from_str(json)? else {
            return Self::from_json(json);
        };
        let mut merged = serde_json::to_value(self)?;
        if let Some(fields) = merged.as_object_mut() {
            fields.extend(overrides);
        }
        Ok(serde_json::from_value(merged)?)
    }

    /// Returns the options the pipeline actually runs with for `mode`.
    ///
    /// Deobfuscate starts from the defaults, keeping only the caller's seed,
    /// and forces the reformatting overrides. Out-of-range values are
    /// clamped, and `selfDefending` forces compact output because the guard
    /// checks its own printed form.
    pub fn resolve(&self, mode: TransformMode) -> Self {
        let mut opts = match mode {
            TransformMode::Obfuscate => self.clone(),
            TransformMode::Deobfuscate => Self { seed: self.seed, ..Self::default() },
        };

        if mode == TransformMode::Deobfuscate {
            opts.compact = false;
            opts.control_flow_flattening = false;
            opts.dead_code_injection = false;
            opts.debug_protection = false;
            opts.rotate_string_array = false;
            opts.self_defending = false;
            opts.split_strings = false;
            opts.string_array = false;
            opts.string_array_encoding = vec![StringArrayEncoding::None];
            opts.unicode_escape_sequence = false;
        }

        if opts.string_array_threshold.is_nan() {
            warn!("stringArrayThreshold is NaN, using {DEFAULT_STRING_ARRAY_THRESHOLD}");
            opts.string_array_threshold = DEFAULT_STRING_ARRAY_THRESHOLD;
        } else if !(0.0..=1.0).contains(&opts.string_array_threshold) {
            let clamped = opts.string_array_threshold.clamp(0.0, 1.0);
            warn!(
                "stringArrayThreshold {} out of range, clamped to {}",
                opts.string_array_threshold, clamped
            );
            opts.string_array_threshold = clamped;
        }

        if opts.string_array_encoding.is_empty() {
            opts.string_array_encoding = vec![StringArrayEncoding::None];
        }

        if opts.self_defending && !opts.compact {
            warn!("selfDefending requires compact output, enabling compact");
            opts.compact = true;
        }

        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_front_end() {
        let json = serde_json::to_value(TransformOptions::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "compact": true,
                "controlFlowFlattening": false,
                "deadCodeInjection": false,
                "debugProtection": false,
                "disableConsoleOutput": false,
                "identifierNamesGenerator": "hexadecimal",
                "renameGlobals": false,
                "rotateStringArray": true,
                "selfDefending": false,
                "splitStrings": true,
                "stringArray": true,
                "stringArrayEncoding": ["none"],
                "stringArrayThreshold": 0.75,
                "unicodeEscapeSequence": false,
                "seed": 0
            })
        );
    }

    #[test]
    fn partial_json_uses_defaults() {
        let opts = TransformOptions::from_json(
            r#"{"stringArrayEncoding": ["base64", "rc4"], "identifierNamesGenerator": "mangled"}"#,
        )
        .unwrap();
        assert_eq!(
            opts.string_array_encoding,
            vec![StringArrayEncoding::Base64, StringArrayEncoding::Rc4]
        );
        assert_eq!(
            opts.identifier_names_generator,
            IdentifierNamesGenerator::Mangled
        );
        assert!(opts.compact);
        assert!(opts.string_array);
    }

    #[test]
    fn overlay_keeps_unmentioned_fields() {
        let base = TransformOptions {
            control_flow_flattening: true,
            dead_code_injection: true,
            string_array_threshold: 1.0,
            ..TransformOptions::default()
        };
        let opts = base.overlay_json(r#"{"seed": 4, "compact": false}"#).unwrap();
        assert!(opts.control_flow_flattening);
        assert!(opts.dead_code_injection);
        assert_eq!(opts.string_array_threshold, 1.0);
        assert_eq!(opts.seed, 4);
        assert!(!opts.compact);

        let err = base.overlay_json(r#"{"identifierNamesGenerator": "short"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn malformed_json_is_config_error() {
        let err = TransformOptions::from_json(r#"{"stringArrayEncoding": ["rot13"]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn deobfuscate_overrides() {
        let opts = TransformOptions {
            control_flow_flattening: true,
            dead_code_injection: true,
            self_defending: true,
            string_array_encoding: vec![StringArrayEncoding::Rc4],
            disable_console_output: true,
            rename_globals: true,
            identifier_names_generator: IdentifierNamesGenerator::Mangled,
            string_array_threshold: 0.1,
            seed: 99,
            ..TransformOptions::default()
        };
        let resolved = opts.resolve(TransformMode::Deobfuscate);
        assert!(!resolved.compact);
        assert!(!resolved.control_flow_flattening);
        assert!(!resolved.dead_code_injection);
        assert!(!resolved.self_defending);
        assert!(!resolved.string_array);
        assert!(!resolved.split_strings);
        assert!(!resolved.rotate_string_array);
        assert_eq!(resolved.string_array_encoding, vec![StringArrayEncoding::None]);
        // Everything else comes from the defaults; only the seed is kept.
        assert!(!resolved.disable_console_output);
        assert!(!resolved.rename_globals);
        assert_eq!(
            resolved.identifier_names_generator,
            IdentifierNamesGenerator::Hexadecimal
        );
        assert_eq!(resolved.string_array_threshold, DEFAULT_STRING_ARRAY_THRESHOLD);
        assert_eq!(resolved.seed, 99);
    }

    #[test]
    fn threshold_is_clamped() {
        let high = TransformOptions {
            string_array_threshold: 3.5,
            ..TransformOptions::default()
        };
        assert_eq!(high.resolve(TransformMode::Obfuscate).string_array_threshold, 1.0);

        let low = TransformOptions {
            string_array_threshold: -0.2,
            ..TransformOptions::default()
        };
        assert_eq!(low.resolve(TransformMode::Obfuscate).string_array_threshold, 0.0);

        let nan = TransformOptions {
            string_array_threshold: f64::NAN,
            ..TransformOptions::default()
        };
        assert_eq!(
            nan.resolve(TransformMode::Obfuscate).string_array_threshold,
            DEFAULT_STRING_ARRAY_THRESHOLD
        );
    }

    #[test]
    fn self_defending_forces_compact() {
        let opts = TransformOptions {
            compact: false,
            self_defending: true,
            ..TransformOptions::default()
        };
        assert!(opts.resolve(TransformMode::Obfuscate).compact);
    }

    #[test]
    fn empty_encoding_list_means_none() {
        let opts = TransformOptions {
            string_array_encoding: Vec::new(),
            ..TransformOptions::default()
        };
        assert_eq!(
            opts.resolve(TransformMode::Obfuscate).string_array_encoding,
            vec![StringArrayEncoding::None]
        );
    }

    #[test]
    fn enum_names_parse() {
        assert_eq!("deobfuscate".parse::<TransformMode>().unwrap(), TransformMode::Deobfuscate);
        assert_eq!("rc4".parse::<StringArrayEncoding>().unwrap(), StringArrayEncoding::Rc4);
        assert!("fast".parse::<IdentifierNamesGenerator>().is_err());
    }
}
