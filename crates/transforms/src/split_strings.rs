use crate::{Result, Transform};
use jscloak_core::ast::{BinaryOp, Expr, Lit, Program};
use jscloak_core::visit::{walk_expr_mut, walk_program_mut, VisitMut};
use rand::rngs::StdRng;
use tracing::debug;

/// Longest `+` chain a single literal is split into. Longer literals get
/// proportionally longer chunks, keeping the chain well inside the parser's
/// nesting limit.
const MAX_CHUNKS: usize = 64;

/// Splits long string literals into `+` chains of short chunks.
///
/// Runs before string array extraction so each chunk becomes its own entry.
#[derive(Debug)]
pub struct SplitStrings {
    chunk_length: usize,
}

impl SplitStrings {
    pub fn new(chunk_length: usize) -> Self {
        Self {
            chunk_length: chunk_length.max(1),
        }
    }
}

impl Transform for SplitStrings {
    fn name(&self) -> &'static str {
        "SplitStrings"
    }

    fn apply(&self, program: &mut Program, _rng: &mut StdRng) -> Result<bool> {
        let mut splitter = Splitter {
            chunk_length: self.chunk_length,
            split: 0,
        };
        walk_program_mut(&mut splitter, program);
        debug!("split {} string literals", splitter.split);
        Ok(splitter.split > 0)
    }
}

struct Splitter {
    chunk_length: usize,
    split: usize,
}

impl VisitMut for Splitter {
    fn visit_expr(&mut self, expr: &mut Expr) {
        if let Expr::Lit(Lit::Str(value)) = expr {
            if value.chars().count() > self.chunk_length {
                *expr = split_literal(value, self.chunk_length);
                self.split += 1;
            }
            return;
        }
        walk_expr_mut(self, expr);
    }
}

/// Builds `'c0' + 'c1' + ...`, associating to the left so evaluation order
/// and the resulting value match the original literal.
fn split_literal(value: &str, chunk_length: usize) -> Expr {
    let chars: Vec<char> = value.chars().collect();
    let chunk_length = chunk_length.max(chars.len().div_ceil(MAX_CHUNKS));
    let mut chunks = chars
        .chunks(chunk_length)
        .map(|chunk| Expr::str(chunk.iter().collect::<String>()));

    let first = chunks.next().unwrap_or_else(|| Expr::str(""));
    chunks.fold(first, |acc, chunk| Expr::binary(BinaryOp::Add, acc, chunk))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jscloak_core::{parse_program, print_program, PrintOptions};
    use rand::SeedableRng;

    fn split(src: &str, chunk: usize) -> String {
        let mut program = parse_program(src).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        SplitStrings::new(chunk).apply(&mut program, &mut rng).unwrap();
        print_program(&program, &PrintOptions::default())
    }

    #[test]
    fn splits_long_literals() {
        assert_eq!(
            split("var s = 'abcdefghijklmnopqrstuvw';", 10),
            "var s='abcdefghij'+'klmnopqrst'+'uvw';"
        );
    }

    #[test]
    fn keeps_short_literals_and_keys() {
        assert_eq!(
            split("'use strict'; var o = {'a long property key': 'short'};", 10),
            "'use strict';var o={'a long property key':'short'};"
        );
    }

    #[test]
    fn member_object_keeps_value() {
        assert_eq!(split("'abcdef'.length;", 4), "('abcd'+'ef').length;");
    }

    #[test]
    fn long_literals_get_longer_chunks() {
        let value = "x".repeat(10_000);
        let out = split(&format!("var s = '{value}';"), 10);
        assert_eq!(out.matches('+').count(), MAX_CHUNKS - 1);
        assert_eq!(out.matches('x').count(), 10_000);
    }

    #[test]
    fn splits_on_characters_not_bytes() {
        assert_eq!(split("x('ééé');", 2), "x('éé'+'é');");
    }
}
