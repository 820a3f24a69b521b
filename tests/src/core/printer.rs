use crate::fixtures::CORPUS;
use jscloak_core::{parse_program, print_program, PrintOptions};
use pretty_assertions::assert_eq;

const COMPACT: PrintOptions = PrintOptions {
    compact: true,
    unicode_escape: false,
};

const READABLE: PrintOptions = PrintOptions {
    compact: false,
    unicode_escape: false,
};

const ESCAPED: PrintOptions = PrintOptions {
    compact: true,
    unicode_escape: true,
};

fn reprint(src: &str, opts: &PrintOptions) -> String {
    let program = parse_program(src).unwrap_or_else(|e| panic!("{e}\n{src}"));
    print_program(&program, opts)
}

#[test]
fn printing_is_idempotent() {
    for (name, src) in CORPUS {
        for opts in [&COMPACT, &READABLE, &ESCAPED] {
            let once = reprint(src, opts);
            let twice = reprint(&once, opts);
            assert_eq!(once, twice, "{name} with {opts:?}");
        }
    }
}

#[test]
fn compact_and_readable_agree() {
    for (name, src) in CORPUS {
        let readable = reprint(src, &READABLE);
        assert!(readable.contains('\n'), "{name}");
        assert_eq!(reprint(&readable, &COMPACT), reprint(src, &COMPACT), "{name}");
    }
}

#[test]
fn unicode_escapes_keep_values() {
    let src = "var s = 'wörld é';";
    let escaped = reprint(src, &ESCAPED);
    assert!(escaped.is_ascii(), "{escaped}");
    assert_eq!(parse_program(&escaped).unwrap().body, parse_program(src).unwrap().body);
}

#[test]
fn readable_output_uses_four_space_indentation() {
    let out = reprint("function f(a){while(a){a--}}", &READABLE);
    assert_eq!(out, "function f(a) {\n    while (a) {\n        a--;\n    }\n}");
}
