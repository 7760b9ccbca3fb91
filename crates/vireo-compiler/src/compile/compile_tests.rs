//! Compiler tests: lowering shapes via the program listing.

use indoc::indoc;

use vireo_core::FileId;

use crate::ast::Grammar;
use crate::compile::{CompileError, CompilerConfig, InlineConfig, compile};
use crate::parser::parse;
use crate::transform::{self, GrammarConfig};

fn parsed(source: &str) -> Grammar {
    let outcome = parse(source, FileId(0));
    assert!(!outcome.diagnostics.has_errors());
    outcome.grammar
}

fn no_inline() -> CompilerConfig {
    CompilerConfig {
        inline: InlineConfig {
            enabled: false,
            max_size: 0,
        },
        ..CompilerConfig::default()
    }
}

fn listing(source: &str, config: CompilerConfig) -> String {
    let program = compile(&parsed(source), config).expect("compiles");
    program.to_string().trim_end().to_string()
}

#[test]
fn literal_lowers_to_chars() {
    insta::assert_snapshot!(listing("G <- 'ab'", no_inline()), @r#"
      call L0
      halt
    L0:
    G:
      char 'a'
      char 'b'
      return
    "#);
}

#[test]
fn choice_lowers_to_choice_commit() {
    insta::assert_snapshot!(listing("G <- 'a' / 'b'", no_inline()), @r#"
      call L0
      halt
    L0:
    G:
      choice L2
      char 'a'
      commit L1
    L2:
      char 'b'
    L1:
      return
    "#);
}

#[test]
fn zero_or_more_uses_partial_commit_at_o1() {
    insta::assert_snapshot!(listing("G <- .*", no_inline()), @r#"
      call L0
      halt
    L0:
    G:
      choice L1
    L2:
      any
      partial_commit L2
    L1:
      return
    "#);
}

#[test]
fn zero_or_more_is_naive_at_o0() {
    let config = CompilerConfig {
        optimize: 0,
        ..no_inline()
    };
    insta::assert_snapshot!(listing("G <- .*", config), @r#"
      call L0
      halt
    L0:
    G:
    L1:
      choice L2
      any
      commit L1
    L2:
      return
    "#);
}

#[test]
fn not_uses_fail_twice_at_o1() {
    insta::assert_snapshot!(listing("G <- !'a'", no_inline()), @r#"
      call L0
      halt
    L0:
    G:
      choice_pred L1
      char 'a'
      fail_twice
    L1:
      return
    "#);
}

#[test]
fn and_uses_back_commit_at_o1() {
    insta::assert_snapshot!(listing("G <- &'a'", no_inline()), @r#"
      call L0
      halt
    L0:
    G:
      choice_pred L1
      char 'a'
      back_commit L2
    L1:
      fail
    L2:
      return
    "#);
}

#[test]
fn labeled_lowers_to_guarded_throw() {
    insta::assert_snapshot!(listing("G <- 'a'^oops", no_inline()), @r#"
      call L0
      halt
    L0:
    G:
      choice L1
      char 'a'
      commit L2
    L1:
      throw "oops"
    L2:
      return
    "#);
}

#[test]
fn charset_repetitions_fuse_into_span() {
    let source = "G <- [0-9]+";
    let grammar = transform::apply(
        parsed(source),
        &GrammarConfig {
            add_builtins: false,
            captures: false,
            handle_spaces: false,
            ..GrammarConfig::default()
        },
    );
    let program = compile(&grammar, no_inline()).expect("compiles");
    insta::assert_snapshot!(program.to_string().trim_end(), @r#"
      call L0
      halt
    L0:
    G:
      set [0-9]
      span [0-9]
      return
    "#);
}

#[test]
fn small_rules_inline_and_skip_standalone_emission() {
    let source = indoc! {"
        G <- Small 'x'
        Small <- 'ab'
    "};
    let inlined = compile(&parsed(source), CompilerConfig::default()).expect("compiles");
    let text = inlined.to_string();
    // Small's body appears in place; no Small procedure, no call.
    assert!(!text.contains("Small:"), "{text}");
    assert!(!text.contains("call L1"), "{text}");

    let called = compile(&parsed(source), no_inline()).expect("compiles");
    let text = called.to_string();
    assert!(text.contains("Small:"), "{text}");
}

#[test]
fn recursive_rules_never_inline() {
    let source = indoc! {"
        G <- Rec
        Rec <- 'a' Rec / 'a'
    "};
    let program = compile(&parsed(source), CompilerConfig::default()).expect("compiles");
    assert!(program.to_string().contains("Rec:"));
}

#[test]
fn recovery_rules_register_and_never_inline() {
    let source = indoc! {"
        G <- 'a'^oops
        oops <- 'z'
    "};
    let program = compile(&parsed(source), CompilerConfig::default()).expect("compiles");
    assert_eq!(program.recovery.len(), 1);
    let (label, entry) = program.recovery.first().expect("one recovery");
    assert_eq!(program.str(*label), "oops");
    assert_eq!(entry.precedence, 1);
    // The rule body must exist as a standalone target.
    assert!(program.to_string().contains("oops:"));
}

#[test]
fn captures_lower_to_offset_forms_when_fixed_size() {
    let source = indoc! {"
        G <- A 'bc'
        A <- 'x'
    "};
    let grammar = transform::apply(
        parsed(source),
        &GrammarConfig {
            add_builtins: false,
            handle_spaces: false,
            ..GrammarConfig::default()
        },
    );
    let program = compile(&grammar, CompilerConfig::default()).expect("compiles");
    insta::assert_snapshot!(program.to_string().trim_end(), @r#"
      call L0
      halt
    L0:
    G:
      cap_begin "G"
      cap_begin ""
      char 'x'
      cap_non_term "A" 1
      char 'b'
      char 'c'
      cap_term 2
      cap_end
      cap_return
    "#);
}

#[test]
fn fixed_size_definitions_skip_capture_frames() {
    // The definition's own capture uses the offset form when the body
    // has a known byte length, so no frame is pushed and the procedure
    // ends in a plain return.
    let grammar = transform::apply(
        parsed("Digit <- [0-9]"),
        &GrammarConfig {
            add_builtins: false,
            handle_spaces: false,
            ..GrammarConfig::default()
        },
    );
    let program = compile(&grammar, CompilerConfig::default()).expect("compiles");
    insta::assert_snapshot!(program.to_string().trim_end(), @r#"
      call L0
      halt
    L0:
    Digit:
      set [0-9]
      cap_non_term "Digit" 1
      return
    "#);
}

#[test]
fn left_recursion_is_rejected() {
    let err = compile(&parsed("A <- A 'x' / 'x'"), CompilerConfig::default()).unwrap_err();
    match err {
        CompileError::LeftRecursion(names) => assert_eq!(names, vec!["A".to_string()]),
        other => panic!("expected left recursion, got {other:?}"),
    }
}

#[test]
fn undefined_rules_are_rejected() {
    let err = compile(&parsed("G <- Missing"), CompilerConfig::default()).unwrap_err();
    assert!(matches!(err, CompileError::UndefinedRule(name) if name == "Missing"));
}

#[test]
fn empty_grammars_are_rejected() {
    let err = compile(&Grammar::new(), CompilerConfig::default()).unwrap_err();
    assert!(matches!(err, CompileError::EmptyGrammar));
}

#[test]
fn compilation_is_deterministic() {
    let source = indoc! {"
        G <- A / B
        A <- 'a'^oops
        B <- [0-9]+
        oops <- .
    "};
    let grammar = transform::apply(parsed(source), &GrammarConfig::default());
    let first = compile(&grammar, CompilerConfig::default()).expect("compiles");
    let second = compile(&grammar, CompilerConfig::default()).expect("compiles");
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(first.code, second.code);
}
