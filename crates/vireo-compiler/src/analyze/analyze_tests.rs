//! Tests for the semantic analyses.

use indoc::indoc;

use vireo_core::FileId;

use crate::analyze::{
    check_loops, check_refs, definition_size, left_recursive_set, nullable_set,
    recursive_set,
};
use crate::analyze::nullable::always_succeeds_set;
use crate::ast::Grammar;
use crate::diagnostics::Diagnostics;
use crate::parser::parse;

fn parsed(source: &str) -> Grammar {
    let outcome = parse(source, FileId(0));
    assert!(!outcome.diagnostics.has_errors());
    outcome.grammar
}

#[test]
fn nullable_propagates_through_rules() {
    let grammar = parsed(indoc! {"
        A <- 'a'?
        B <- A A
        C <- 'c'
        D <- C B
    "});
    let nullable = nullable_set(&grammar);
    assert!(nullable.contains("A"));
    assert!(nullable.contains("B"));
    assert!(!nullable.contains("C"));
    assert!(!nullable.contains("D"));
}

#[test]
fn always_succeeds_excludes_predicates() {
    let grammar = parsed(indoc! {"
        Star <- 'a'*
        Pred <- !'z'
        Both <- Star Pred
        Opt <- Star Star
    "});
    let always = always_succeeds_set(&grammar);
    assert!(always.contains("Star"));
    assert!(!always.contains("Pred"));
    assert!(!always.contains("Both"));
    assert!(always.contains("Opt"));
}

#[test]
fn recursion_finds_direct_and_mutual_cycles() {
    let grammar = parsed(indoc! {"
        Direct <- 'x' Direct / 'x'
        Ping <- 'p' Pong
        Pong <- 'q' Ping / 'q'
        Plain <- 'z'
    "});
    let recursive = recursive_set(&grammar);
    assert!(recursive.contains("Direct"));
    assert!(recursive.contains("Ping"));
    assert!(recursive.contains("Pong"));
    assert!(!recursive.contains("Plain"));
}

#[test]
fn left_recursion_direct() {
    let grammar = parsed("A <- A 'a' / 'a'\n");
    let left = left_recursive_set(&grammar, &nullable_set(&grammar));
    assert!(left.contains("A"));
}

#[test]
fn left_recursion_through_nullable_prefix() {
    let grammar = parsed(indoc! {"
        A <- P A 'x' / 'x'
        P <- 'p'?
    "});
    let left = left_recursive_set(&grammar, &nullable_set(&grammar));
    assert!(left.contains("A"));
    assert!(!left.contains("P"));
}

#[test]
fn right_recursion_is_not_left_recursion() {
    let grammar = parsed("Signed <- ('-' / '+') Signed / 'd'\n");
    let left = left_recursive_set(&grammar, &nullable_set(&grammar));
    assert!(left.is_empty());
}

#[test]
fn undefined_reference_is_an_error() {
    let grammar = parsed("G <- Missing\n");
    let mut diag = Diagnostics::new();
    check_refs(&grammar, &mut diag);
    assert!(diag.has_errors());
    let rendered: Vec<String> = diag.iter().map(|d| d.message.clone()).collect();
    assert!(rendered.iter().any(|m| m.contains("Missing")), "{rendered:?}");
}

#[test]
fn unreachable_rule_is_a_warning() {
    let grammar = parsed(indoc! {"
        G <- 'g'
        Orphan <- 'o'
    "});
    let mut diag = Diagnostics::new();
    check_refs(&grammar, &mut diag);
    assert!(!diag.has_errors());
    assert_eq!(diag.warning_count(), 1);
}

#[test]
fn recovery_rules_count_as_reachable() {
    let grammar = parsed(indoc! {"
        G <- 'a'^oops
        oops <- .
    "});
    let mut diag = Diagnostics::new();
    check_refs(&grammar, &mut diag);
    assert_eq!(diag.warning_count(), 0, "{:?}", diag.iter().collect::<Vec<_>>());
}

#[test]
fn label_without_recovery_rule_warns() {
    let grammar = parsed("G <- 'a'^oops\n");
    let mut diag = Diagnostics::new();
    check_refs(&grammar, &mut diag);
    assert!(!diag.has_errors());
    assert!(diag.iter().any(|d| d.message.contains("oops")));
}

#[test]
fn nullable_loop_body_warns() {
    let grammar = parsed("G <- (!'x' 'a'?)*\n");
    let mut diag = Diagnostics::new();
    check_loops(&grammar, &mut diag);
    assert!(!diag.has_errors());
    assert_eq!(diag.warning_count(), 1);
}

#[test]
fn unfailing_nullable_loop_body_is_an_error() {
    let grammar = parsed("G <- ('a'?)*\n");
    let mut diag = Diagnostics::new();
    check_loops(&grammar, &mut diag);
    assert!(diag.has_errors());
}

#[test]
fn definition_size_counts_encoded_bytes() {
    let grammar = parsed(indoc! {"
        Two <- 'ab'
        Digits <- [0-9] [0-9]*
    "});
    // Two chars at 3 bytes each.
    assert_eq!(definition_size(&grammar, "Two"), Some(6));
    assert!(definition_size(&grammar, "Digits").unwrap() > 0);
    assert_eq!(definition_size(&grammar, "Nope"), None);
}
