//! Golden tests for the transform pipeline, via the IR printer.

use indoc::indoc;

use vireo_core::FileId;

use crate::parser::parse;
use crate::transform::{self, GrammarConfig, builtins, captures, charsets, whitespace};

fn parsed(source: &str) -> crate::ast::Grammar {
    let outcome = parse(source, FileId(0));
    assert!(
        !outcome.diagnostics.has_errors(),
        "test grammar failed to parse: {source}"
    );
    outcome.grammar
}

fn def_text(grammar: &crate::ast::Grammar, name: &str) -> String {
    let def = grammar.get(name).unwrap_or_else(|| panic!("no rule {name}"));
    format!("{} <- {}", def.name, def.body)
}

#[test]
fn whitespace_goes_between_sequence_items() {
    let grammar = whitespace::inject_whitespaces(parsed(indoc! {"
        Pair <- Key ':' Value
        Key <- [a-z]+
        Value <- [0-9]+
    "}));
    assert_eq!(
        def_text(&grammar, "Pair"),
        "Pair <- Key Spacing ':' Spacing Value"
    );
    // Syntactic rules are left alone.
    assert_eq!(def_text(&grammar, "Key"), "Key <- [a-z]+");
}

#[test]
fn whitespace_respects_lex_subtrees() {
    let grammar = whitespace::inject_whitespaces(parsed(indoc! {r#"
        String <- '"' #(Char* '"')
        Char <- !'"' .
    "#}));
    assert_eq!(def_text(&grammar, "String"), r#"String <- '"' #(Char* '"')"#);
}

#[test]
fn whitespace_prefixes_repetition_bodies() {
    let grammar = whitespace::inject_whitespaces(parsed(indoc! {"
        List <- Item (',' Item)*
        Item <- [a-z]+
    "}));
    assert_eq!(
        def_text(&grammar, "List"),
        "List <- Item Spacing (Spacing (',' Spacing Item))*"
    );
}

#[test]
fn whitespace_skips_spacing_closure() {
    let grammar = whitespace::inject_whitespaces(parsed(indoc! {"
        Main <- Spacing Word
        Spacing <- Blank Blank
        Blank <- ' '
        Word <- [a-z]+
    "}));
    // Spacing's own dependency closure is untouched even though the
    // bodies are non-syntactic.
    assert_eq!(def_text(&grammar, "Spacing"), "Spacing <- Blank Blank");
    // And no Spacing call is injected after one that is already there.
    assert_eq!(def_text(&grammar, "Main"), "Main <- Spacing Word");
}

#[test]
fn whitespace_is_idempotent() {
    let once = whitespace::inject_whitespaces(parsed(indoc! {"
        List <- Item (',' Item)*
        Item <- [a-z]+
    "}));
    let twice = whitespace::inject_whitespaces(once.clone());
    assert_eq!(once.defs, twice.defs);
}

#[test]
fn captures_wrap_definitions_by_name() {
    let grammar = captures::add_captures(charsets::add_charsets(parsed(indoc! {"
        G <- .*
        Decimal <- [0-9]+
    "})));
    assert_eq!(def_text(&grammar, "G"), "G <- cap[G](.*)");
    assert_eq!(def_text(&grammar, "Decimal"), "Decimal <- cap[Decimal]([0-9]+)");
}

#[test]
fn captures_bracket_terminal_regions_in_mixed_bodies() {
    let grammar = captures::add_captures(charsets::add_charsets(parsed(indoc! {"
        Signed <- ('-' / '+') Signed / Decimal
        Decimal <- [0-9]+
    "})));
    assert_eq!(
        def_text(&grammar, "Signed"),
        "Signed <- cap[Signed](cap(cap([+-]) Signed / Decimal))"
    );
}

#[test]
fn captures_lift_out_of_predicate_guarded_loops() {
    // (!Q .)* captures as one region, not one capture per iteration.
    let grammar = captures::add_captures(parsed(indoc! {r#"
        Str <- '"' (!Q .)* '"'
        Q <- '"'
    "#}));
    assert_eq!(
        def_text(&grammar, "Str"),
        r#"Str <- cap[Str](cap('"' (!Q .)* '"'))"#
    );
}

#[test]
fn captures_leave_bare_predicate_bodies_unwrapped() {
    let grammar = captures::add_captures(parsed(indoc! {"
        NotDone <- !Stop
        AtWord <- &Word
        Stop <- ';'
        Word <- [a-z]+
    "}));
    // The named wrap still applies, but the predicate itself stays
    // bare: predicates are never wrapped.
    assert_eq!(def_text(&grammar, "NotDone"), "NotDone <- cap[NotDone](!Stop)");
    assert_eq!(def_text(&grammar, "AtWord"), "AtWord <- cap[AtWord](&Word)");
}

#[test]
fn captures_are_idempotent() {
    let once = captures::add_captures(parsed("G <- 'a' H\nH <- 'h'\n"));
    let twice = captures::add_captures(once.clone());
    assert_eq!(once.defs, twice.defs);
}

#[test]
fn builtins_merge_once() {
    let once = builtins::add_builtins(parsed("G <- 'a'"));
    let twice = builtins::add_builtins(once.clone());
    assert_eq!(once.defs.len(), twice.defs.len());
    assert!(once.get("Spacing").is_some());
    assert!(once.get("EOF").is_some());
}

#[test]
fn full_pipeline_defaults() {
    let grammar = transform::apply(parsed("G <- 'x' G / 'y'"), &GrammarConfig::default());
    // Builtins merged, definition wrapped, spacing injected.
    assert!(grammar.get("Spacing").is_some());
    let text = def_text(&grammar, "G");
    assert!(text.starts_with("G <- cap[G]("), "got: {text}");
    assert!(text.contains("Spacing"), "got: {text}");
}

#[test]
fn pipeline_with_everything_off_is_identity() {
    let config = GrammarConfig {
        add_builtins: false,
        add_charsets: false,
        captures: false,
        capture_spaces: true,
        handle_spaces: false,
    };
    let before = parsed("G <- 'x' G / 'y'");
    let after = transform::apply(before.clone(), &config);
    assert_eq!(before.defs, after.defs);
}
