use crate::fixtures::CORPUS;
use jscloak_analysis::metrics::collect_metrics;
use jscloak_core::parse_program;
use jscloak_core::scope::{BindingKind, ScopeTree};
use jscloak_transform::obfuscator::{obfuscate_source, presets};
use jscloak_transform::{
    transform, IdentifierNamesGenerator, StringArrayEncoding, TransformMode, TransformOptions,
};
use jscloak_utils::errors::TransformError;
use std::collections::BTreeSet;

/// Host globals the emitted runtime code may reference.
const RUNTIME_GLOBALS: &[&str] = &[
    "Date",
    "String",
    "decodeURIComponent",
    "global",
    "globalThis",
    "setInterval",
    "window",
];

fn single_toggles() -> Vec<(&'static str, TransformOptions)> {
    let base = TransformOptions::default;
    vec![
        ("defaults", base()),
        (
            "nothing",
            TransformOptions {
                string_array: false,
                split_strings: false,
                ..base()
            },
        ),
        (
            "controlFlowFlattening",
            TransformOptions {
                control_flow_flattening: true,
                ..base()
            },
        ),
        (
            "deadCodeInjection",
            TransformOptions {
                dead_code_injection: true,
                ..base()
            },
        ),
        (
            "debugProtection",
            TransformOptions {
                debug_protection: true,
                ..base()
            },
        ),
        (
            "disableConsoleOutput",
            TransformOptions {
                disable_console_output: true,
                ..base()
            },
        ),
        (
            "mangled",
            TransformOptions {
                identifier_names_generator: IdentifierNamesGenerator::Mangled,
                ..base()
            },
        ),
        (
            "renameGlobals",
            TransformOptions {
                rename_globals: true,
                ..base()
            },
        ),
        (
            "selfDefending",
            TransformOptions {
                self_defending: true,
                ..base()
            },
        ),
        (
            "stringArrayEncoding",
            TransformOptions {
                string_array_encoding: vec![StringArrayEncoding::Base64, StringArrayEncoding::Rc4],
                string_array_threshold: 1.0,
                ..base()
            },
        ),
        (
            "unicodeEscapeSequence",
            TransformOptions {
                unicode_escape_sequence: true,
                ..base()
            },
        ),
        (
            "readable",
            TransformOptions {
                compact: false,
                ..base()
            },
        ),
    ]
}

fn everything(seed: u64) -> TransformOptions {
    TransformOptions {
        seed,
        control_flow_flattening: true,
        dead_code_injection: true,
        debug_protection: true,
        disable_console_output: true,
        rename_globals: true,
        self_defending: true,
        string_array_encoding: vec![
            StringArrayEncoding::None,
            StringArrayEncoding::Base64,
            StringArrayEncoding::Rc4,
        ],
        string_array_threshold: 1.0,
        unicode_escape_sequence: true,
        ..TransformOptions::default()
    }
}

fn host_globals(src: &str) -> BTreeSet<String> {
    let program = parse_program(src).unwrap_or_else(|e| panic!("{e}\n{src}"));
    ScopeTree::analyze(&program).unresolved.into_keys().collect()
}

fn global_bindings(src: &str) -> BTreeSet<String> {
    let program = parse_program(src).unwrap();
    ScopeTree::analyze(&program)
        .bindings
        .into_iter()
        .filter(|b| b.kind == BindingKind::Global)
        .map(|b| b.name)
        .collect()
}

#[test]
fn every_option_produces_valid_output() {
    for (fixture, src) in CORPUS {
        for (option, options) in single_toggles() {
            let out = transform(src, &options, TransformMode::Obfuscate)
                .unwrap_or_else(|e| panic!("{fixture} / {option}: {e}"));
            assert!(parse_program(&out).is_ok(), "{fixture} / {option}\n{out}");
            assert_eq!(
                out.contains('\n'),
                !options.compact,
                "{fixture} / {option}\n{out}"
            );
        }
    }
}

#[test]
fn all_passes_together_produce_valid_output() {
    for (fixture, src) in CORPUS {
        for seed in 0..4 {
            let out = transform(src, &everything(seed), TransformMode::Obfuscate)
                .unwrap_or_else(|e| panic!("{fixture} / seed {seed}: {e}"));
            assert!(parse_program(&out).is_ok(), "{fixture} / seed {seed}\n{out}");
        }
    }
}

#[test]
fn obfuscation_never_captures_host_globals() {
    for (fixture, src) in CORPUS {
        let before = host_globals(src);
        for seed in 0..4 {
            let out = transform(src, &everything(seed), TransformMode::Obfuscate).unwrap();
            for name in host_globals(&out) {
                assert!(
                    before.contains(&name) || RUNTIME_GLOBALS.contains(&name.as_str()),
                    "{fixture}: unexpected host global {name}\n{out}"
                );
            }
        }
    }
}

#[test]
fn globals_survive_without_rename_globals() {
    for (fixture, src) in CORPUS {
        let out = transform(
            src,
            &presets::heavy_obfuscation(Some(8)).options,
            TransformMode::Obfuscate,
        )
        .unwrap();
        let after = global_bindings(&out);
        for name in global_bindings(src) {
            assert!(after.contains(&name), "{fixture}: lost global {name}\n{out}");
        }
        let referenced = host_globals(&out);
        for name in host_globals(src) {
            assert!(referenced.contains(&name), "{fixture}: lost host global {name}");
        }
    }
}

#[test]
fn deobfuscate_reads_obfuscated_output() {
    for (fixture, src) in CORPUS {
        let obfuscated = transform(src, &everything(1), TransformMode::Obfuscate).unwrap();
        let readable = transform(
            &obfuscated,
            &TransformOptions::default(),
            TransformMode::Deobfuscate,
        )
        .unwrap_or_else(|e| panic!("{fixture}: {e}"));
        assert!(readable.lines().count() > 1, "{fixture}");
        assert!(parse_program(&readable).is_ok(), "{fixture}");
    }
}

#[test]
fn deobfuscate_ignores_obfuscating_options() {
    let src = CORPUS[0].1;
    let plain = transform(src, &TransformOptions::default(), TransformMode::Deobfuscate).unwrap();
    let loud = transform(
        src,
        &TransformOptions {
            control_flow_flattening: true,
            dead_code_injection: true,
            string_array_threshold: 1.0,
            ..TransformOptions::default()
        },
        TransformMode::Deobfuscate,
    )
    .unwrap();
    assert_eq!(plain, loud);
    assert!(!plain.contains("switch"), "{plain}");
}

#[test]
fn deobfuscate_starts_from_default_options() {
    let src = "var total=1; function add(x){console.log(x); return x+total} add(2);";
    let loud = TransformOptions {
        disable_console_output: true,
        rename_globals: true,
        identifier_names_generator: IdentifierNamesGenerator::Mangled,
        seed: 5,
        ..TransformOptions::default()
    };
    let out = transform(src, &loud, TransformMode::Deobfuscate).unwrap();
    let plain = transform(
        src,
        &TransformOptions {
            seed: 5,
            ..TransformOptions::default()
        },
        TransformMode::Deobfuscate,
    )
    .unwrap();
    assert_eq!(out, plain);
    assert!(out.contains("console.log("), "{out}");
    assert_eq!(global_bindings(&out), global_bindings(src));
    assert_eq!(host_globals(&out), host_globals(src));
}

#[test]
fn deep_nesting_is_an_error_not_a_crash() {
    let parens = format!("var x = {}1{};", "(".repeat(5000), ")".repeat(5000));
    let ifs = format!("{}b();", "if (a) ".repeat(5000));
    let arrays = format!("var y = {}{};", "[".repeat(5000), "]".repeat(5000));
    for src in [parens, ifs, arrays] {
        for mode in [TransformMode::Obfuscate, TransformMode::Deobfuscate] {
            let err = transform(&src, &TransformOptions::default(), mode).unwrap_err();
            assert!(
                matches!(err, TransformError::Unsupported(ref e) if e.construct == "nesting too deep"),
                "{err:?}"
            );
        }
    }
}

#[test]
fn moderate_nesting_still_transforms() {
    // The engine re-parses its own output, so success means valid output.
    let parens = format!("var x = {}1{};", "(".repeat(100), ")".repeat(100));
    transform(&parens, &everything(3), TransformMode::Obfuscate).unwrap();
    let ifs = format!("function f(a) {{ {}b(); }} f(1);", "if (a) ".repeat(200));
    let out = transform(&ifs, &everything(3), TransformMode::Obfuscate).unwrap();
    assert!(out.matches("if").count() >= 200);
    let readable = transform(&ifs, &TransformOptions::default(), TransformMode::Deobfuscate).unwrap();
    assert_eq!(readable.matches("if (").count(), 200, "{readable}");
}

#[test]
fn output_depends_only_on_input_options_and_seed() {
    for (fixture, src) in CORPUS {
        let options = everything(21);
        let first = transform(src, &options, TransformMode::Obfuscate).unwrap();
        let second = transform(src, &options, TransformMode::Obfuscate).unwrap();
        assert_eq!(first, second, "{fixture}");
    }
    let src = CORPUS[1].1;
    let a = transform(src, &everything(1), TransformMode::Obfuscate).unwrap();
    let b = transform(src, &everything(2), TransformMode::Obfuscate).unwrap();
    assert_ne!(a, b);
}

#[test]
fn heavy_preset_raises_potency() {
    for (fixture, src) in CORPUS {
        let light = obfuscate_source(src, &presets::light_obfuscation(Some(2))).unwrap();
        let heavy = obfuscate_source(src, &presets::heavy_obfuscation(Some(2))).unwrap();
        assert!(
            heavy.metadata.potency_delta >= light.metadata.potency_delta,
            "{fixture}: {} < {}",
            heavy.metadata.potency_delta,
            light.metadata.potency_delta
        );
        assert!(heavy.obfuscated_size > light.obfuscated_size, "{fixture}");
    }
}

#[test]
fn console_output_is_disabled() {
    for (fixture, src) in CORPUS {
        let out = transform(
            src,
            &TransformOptions {
                disable_console_output: true,
                string_array: false,
                ..TransformOptions::default()
            },
            TransformMode::Obfuscate,
        )
        .unwrap();
        assert!(!out.contains("console.log("), "{fixture}\n{out}");
        assert!(!host_globals(&out).contains("console"), "{fixture}\n{out}");
    }
}

#[test]
fn flattening_shows_up_in_metrics() {
    let src = CORPUS[5].1;
    let options = TransformOptions {
        control_flow_flattening: true,
        ..TransformOptions::default()
    };
    let out = transform(src, &options, TransformMode::Obfuscate).unwrap();
    let before = collect_metrics(&parse_program(src).unwrap());
    let after = collect_metrics(&parse_program(&out).unwrap());
    assert_eq!(before.switches, 0);
    assert!(after.switches >= 1, "{out}");
}

#[test]
fn errors_carry_positions() {
    let err = transform("var a = 1;\nvar = 2;", &TransformOptions::default(), TransformMode::Obfuscate)
        .unwrap_err();
    let TransformError::Parse(err) = err else {
        panic!("parse error expected, got {err:?}");
    };
    assert_eq!(err.line, 2);

    let err = transform("let x = 1;\nx?.y;", &TransformOptions::default(), TransformMode::Deobfuscate)
        .unwrap_err();
    let TransformError::Unsupported(err) = err else {
        panic!("unsupported syntax expected, got {err:?}");
    };
    assert_eq!((err.construct.as_str(), err.line), ("optional chaining", 2));
}
