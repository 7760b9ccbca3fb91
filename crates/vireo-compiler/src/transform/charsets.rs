//! Charset folding.
//!
//! Shrinks tree depth and unlocks the `set`/`span` opcodes:
//!
//! - `Sequence[x]` becomes `x`
//! - a `Class` of ranges and single-codepoint literals becomes a
//!   `Charset` of their union
//! - adjacent `Choice` alternatives that are charsets or
//!   single-codepoint literals merge into one charset
//!
//! Only all-ASCII material folds; `set`/`span` are byte opcodes, so
//! non-ASCII classes stay as ordered `char`/`range` alternatives.

use vireo_core::Charset;

use crate::ast::{ClassItem, Expr, ExprKind, Grammar};

pub fn add_charsets(mut grammar: Grammar) -> Grammar {
    for def in grammar.defs.values_mut() {
        let body = std::mem::replace(&mut def.body, Expr::synthetic(ExprKind::Any));
        def.body = rewrite(body);
    }
    grammar
}

fn rewrite(expr: Expr) -> Expr {
    let Expr { kind, loc } = expr;
    let kind = match kind {
        ExprKind::Class(items) => match class_to_charset(&items) {
            Some(set) => ExprKind::Charset(set),
            None => ExprKind::Class(items),
        },
        ExprKind::Sequence(items) => {
            let mut items: Vec<Expr> = items.into_iter().map(rewrite).collect();
            if items.len() == 1 {
                return items.pop().expect("one item");
            }
            ExprKind::Sequence(items)
        }
        ExprKind::Choice(items) => {
            let mut folded: Vec<Expr> = Vec::new();
            for item in items.into_iter().map(rewrite) {
                if let (Some(prev), Some(set)) = (folded.last_mut(), as_charset(&item)) {
                    if let ExprKind::Charset(prev_set) = &mut prev.kind {
                        prev_set.union(&set);
                        continue;
                    }
                    if let Some(mut prev_set) = as_charset(prev) {
                        prev_set.union(&set);
                        prev.kind = ExprKind::Charset(prev_set);
                        continue;
                    }
                }
                folded.push(item);
            }
            if folded.len() == 1 {
                return folded.pop().expect("one item");
            }
            ExprKind::Choice(folded)
        }
        ExprKind::Optional(e) => ExprKind::Optional(Box::new(rewrite(*e))),
        ExprKind::ZeroOrMore(e) => ExprKind::ZeroOrMore(Box::new(rewrite(*e))),
        ExprKind::OneOrMore(e) => ExprKind::OneOrMore(Box::new(rewrite(*e))),
        ExprKind::And(e) => ExprKind::And(Box::new(rewrite(*e))),
        ExprKind::Not(e) => ExprKind::Not(Box::new(rewrite(*e))),
        ExprKind::Lex(e) => ExprKind::Lex(Box::new(rewrite(*e))),
        ExprKind::Labeled { label, expr } => ExprKind::Labeled {
            label,
            expr: Box::new(rewrite(*expr)),
        },
        ExprKind::Capture { name, expr } => ExprKind::Capture {
            name,
            expr: Box::new(rewrite(*expr)),
        },
        leaf => leaf,
    };
    Expr::new(kind, loc)
}

/// Fold a class into a charset if every item is ASCII.
fn class_to_charset(items: &[ClassItem]) -> Option<Charset> {
    let mut set = Charset::new();
    for item in items {
        match item {
            ClassItem::Range(lo, hi) if lo.is_ascii() && hi.is_ascii() => {
                set.add_range(*lo, *hi);
            }
            ClassItem::Literal(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii() => set.add(c),
                    _ => return None,
                }
            }
            _ => return None,
        }
    }
    Some(set)
}

/// View an expression as a charset, if it is one or is a
/// single-ASCII-codepoint literal.
fn as_charset(expr: &Expr) -> Option<Charset> {
    match &expr.kind {
        ExprKind::Charset(set) => Some(set.clone()),
        ExprKind::Literal(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() => Some(Charset::of([c])),
                _ => None,
            }
        }
        _ => None,
    }
}
