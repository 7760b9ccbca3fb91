//! Encoder tests: address resolution, dedup, determinism.

use indoc::indoc;

use vireo_bytecode::{Opcode, dump, verify};
use vireo_core::FileId;

use crate::compile::{CompilerConfig, InlineConfig, compile};
use crate::emit::{EmitError, encode};
use crate::parser::parse;
use crate::transform::{self, GrammarConfig};

fn module(source: &str) -> vireo_bytecode::Module {
    let grammar = transform::apply(
        parse(source, FileId(0)).grammar,
        &GrammarConfig::default(),
    );
    let program = compile(&grammar, CompilerConfig::default()).expect("compiles");
    encode(&program).expect("encodes")
}

#[test]
fn encoded_modules_verify_structurally() {
    let m = module(indoc! {"
        G <- Pair (';' Pair)*
        Pair <- Key ':' Value
        Key <- [a-z]+
        Value <- [0-9]+
    "});
    verify::verify(&m).expect("well-formed module");
}

#[test]
fn prologue_calls_the_entry_rule() {
    let m = module("G <- 'a'");
    assert_eq!(Opcode::from_u8(m.code[0]), Opcode::Call);
    let target = m.read_u16(1);
    // The call target is G's recorded entry address.
    let g = m.str_id("G").expect("G interned");
    assert_eq!(m.labels.get(&target).copied(), Some(g));
    assert_eq!(Opcode::from_u8(m.code[3]), Opcode::Halt);
}

#[test]
fn identical_charsets_share_one_set_id() {
    // The digit class appears four times (two set + two span uses)
    // but earns exactly one table entry.
    let m = module("G <- [0-9]+ '.' [0-9]+");
    assert_eq!(m.sets.len(), 1);
    assert!(m.sets[0].has('0') && m.sets[0].has('9'));
}

#[test]
fn expected_items_are_precomputed_per_set() {
    let m = module("G <- [0-9]+");
    assert_eq!(m.sets.len(), m.sexp.len());
    for (set, expected) in m.sets.iter().zip(&m.sexp) {
        assert!(!set.is_empty());
        assert!(!expected.is_empty());
    }
}

#[test]
fn recovery_addresses_resolve() {
    let m = module(indoc! {"
        G <- 'a'^oops
        oops <- .
    "});
    let oops = m.str_id("oops").expect("label interned");
    let addr = *m.rxps.get(&oops).expect("recovery registered");
    // The registered address is the entry of the `oops` procedure.
    assert_eq!(m.labels.get(&addr).copied(), Some(oops));
    verify::verify(&m).expect("well-formed module");
}

#[test]
fn wide_codepoints_use_32_bit_opcodes() {
    let narrow = module("G <- 'é'");
    assert!(narrow.code.contains(&(Opcode::Char as u8)));
    assert!(!narrow.code.contains(&(Opcode::Char32 as u8)));

    let wide = module("G <- '𐍈'");
    assert!(wide.code.contains(&(Opcode::Char32 as u8)));
}

#[test]
fn encoding_is_deterministic() {
    let source = indoc! {"
        G <- A / B
        A <- 'a'^oops
        B <- [0-9]+
        oops <- .
    "};
    let a = module(source);
    let b = module(source);
    assert_eq!(a.code, b.code);
    assert_eq!(a.checksum(), b.checksum());
    assert_eq!(dump::dump(&a), dump::dump(&b));
}

#[test]
fn oversized_programs_are_rejected() {
    // A literal long enough to blow the 16-bit address space.
    let big = format!("G <- '{}'", "a".repeat(30_000));
    let grammar = transform::apply(
        parse(&big, FileId(0)).grammar,
        &GrammarConfig {
            add_builtins: false,
            captures: false,
            handle_spaces: false,
            ..GrammarConfig::default()
        },
    );
    let program = compile(
        &grammar,
        CompilerConfig {
            inline: InlineConfig {
                enabled: false,
                max_size: 0,
            },
            ..CompilerConfig::default()
        },
    )
    .expect("compiles");
    assert!(matches!(
        encode(&program),
        Err(EmitError::ProgramTooLarge(_))
    ));
}
