//! Parser and whole-pipeline tests.

use indoc::indoc;

use vireo_core::FileId;

use crate::ast::{ClassItem, ExprKind, Grammar};
use crate::parser::parse;

fn parsed(source: &str) -> Grammar {
    let outcome = parse(source, FileId(0));
    assert!(
        !outcome.diagnostics.has_errors(),
        "unexpected diagnostics: {:?}",
        outcome.diagnostics.iter().collect::<Vec<_>>()
    );
    outcome.grammar
}

fn body(source: &str) -> ExprKind {
    parsed(source).entry().expect("one rule").body.kind.clone()
}

#[test]
fn sequence_binds_tighter_than_choice() {
    match body("G <- 'a' 'b' / 'c'") {
        ExprKind::Choice(items) => {
            assert_eq!(items.len(), 2);
            assert!(matches!(items[0].kind, ExprKind::Sequence(_)));
            assert!(matches!(items[1].kind, ExprKind::Literal(_)));
        }
        other => panic!("expected choice, got {other:?}"),
    }
}

#[test]
fn prefix_applies_to_suffixed_expression() {
    // !e* parses as !(e*)
    match body("G <- !'a'*") {
        ExprKind::Not(inner) => {
            assert!(matches!(inner.kind, ExprKind::ZeroOrMore(_)));
        }
        other => panic!("expected not, got {other:?}"),
    }
}

#[test]
fn suffixes_stack() {
    match body("G <- 'a'?+") {
        ExprKind::OneOrMore(inner) => {
            assert!(matches!(inner.kind, ExprKind::Optional(_)));
        }
        other => panic!("expected one-or-more, got {other:?}"),
    }
}

#[test]
fn lexification_and_labels_parse() {
    match body("G <- #('a' 'b')^oops") {
        ExprKind::Lex(inner) => match &inner.kind {
            ExprKind::Labeled { label, expr } => {
                assert_eq!(label, "oops");
                assert!(matches!(expr.kind, ExprKind::Sequence(_)));
            }
            other => panic!("expected labeled under lex, got {other:?}"),
        },
        other => panic!("expected lex, got {other:?}"),
    }
}

#[test]
fn classes_parse_ranges_and_singles() {
    match body("G <- [a-z0-9_]") {
        ExprKind::Class(items) => {
            assert_eq!(
                items,
                vec![
                    ClassItem::Range('a', 'z'),
                    ClassItem::Range('0', '9'),
                    ClassItem::Literal("_".to_string()),
                ]
            );
        }
        other => panic!("expected class, got {other:?}"),
    }
}

#[test]
fn literal_escapes_resolve() {
    match body(r"G <- 'a\n\t\\\''") {
        ExprKind::Literal(s) => assert_eq!(s, "a\n\t\\'"),
        other => panic!("expected literal, got {other:?}"),
    }
}

#[test]
fn double_quoted_literals_work() {
    match body(r#"G <- "hi""#) {
        ExprKind::Literal(s) => assert_eq!(s, "hi"),
        other => panic!("expected literal, got {other:?}"),
    }
}

#[test]
fn imports_parse_with_name_lists() {
    let grammar = parsed(indoc! {r#"
        @import Number, Digit from "./nums.peg"
        G <- Number
    "#});
    assert_eq!(grammar.imports.len(), 1);
    assert_eq!(grammar.imports[0].path, "./nums.peg");
    assert_eq!(grammar.imports[0].names, vec!["Number", "Digit"]);
}

#[test]
fn consecutive_definitions_split_correctly() {
    // `B` is the next rule's head, not a reference inside A's body.
    let grammar = parsed("A <- 'a' B <- 'b'");
    assert_eq!(grammar.defs.len(), 2);
    assert!(matches!(
        grammar.get("A").unwrap().body.kind,
        ExprKind::Literal(_)
    ));
}

#[test]
fn inverted_class_range_is_reported() {
    let outcome = parse("G <- [z-a]", FileId(0));
    assert!(outcome.diagnostics.has_errors());
    assert!(
        outcome
            .diagnostics
            .iter()
            .any(|d| d.message.contains("inverted"))
    );
}

#[test]
fn duplicate_definitions_are_reported_with_related_site() {
    let outcome = parse("G <- 'a'\nG <- 'b'\n", FileId(0));
    assert!(outcome.diagnostics.has_errors());
    let dup = outcome
        .diagnostics
        .iter()
        .find(|d| d.message.contains("twice"))
        .expect("duplicate diagnostic");
    assert_eq!(dup.related.len(), 1);
    // The first definition survives.
    assert!(matches!(
        outcome.grammar.get("G").unwrap().body.kind,
        ExprKind::Literal(ref s) if s == "a"
    ));
}

#[test]
fn parser_recovers_and_reports_multiple_errors() {
    let outcome = parse(
        indoc! {"
            A <- )))
            B <- 'ok'
            C <- [z-a]
        "},
        FileId(0),
    );
    assert!(outcome.diagnostics.error_count() >= 2);
    // Recovery still collected the healthy rule.
    assert!(outcome.grammar.get("B").is_some());
}

#[test]
fn locations_track_lines_and_columns() {
    let grammar = parsed("A <- 'a'\nBee <- 'b'\n");
    let bee = grammar.get("Bee").unwrap();
    assert_eq!(bee.loc.file, FileId(0));
    assert_eq!(bee.loc.span.start.line, 2);
    assert_eq!(bee.loc.span.start.column, 1);
    // Body literal sits after the arrow.
    assert_eq!(bee.body.loc.span.start.line, 2);
    assert_eq!(bee.body.loc.span.start.column, 8);
}
