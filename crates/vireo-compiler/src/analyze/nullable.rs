//! Nullability and always-succeeds, by fixed-point iteration.

use indexmap::IndexSet;

use crate::ast::{Expr, ExprKind, Grammar};

/// Rules whose body can match the empty string.
pub fn nullable_set(grammar: &Grammar) -> IndexSet<String> {
    fixed_point(grammar, expr_nullable)
}

/// Rules whose body can never fail. Predicates always count as able to
/// fail.
pub fn always_succeeds_set(grammar: &Grammar) -> IndexSet<String> {
    fixed_point(grammar, expr_always_succeeds)
}

fn fixed_point(
    grammar: &Grammar,
    property: fn(&Expr, &IndexSet<String>) -> bool,
) -> IndexSet<String> {
    let mut set = IndexSet::new();
    loop {
        let mut changed = false;
        for def in grammar.iter() {
            if !set.contains(&def.name) && property(&def.body, &set) {
                set.insert(def.name.clone());
                changed = true;
            }
        }
        if !changed {
            return set;
        }
    }
}

/// Whether `expr` can match the empty string, given the rules already
/// known nullable.
pub fn expr_nullable(expr: &Expr, nullable: &IndexSet<String>) -> bool {
    match &expr.kind {
        ExprKind::Any | ExprKind::Range(..) | ExprKind::Class(_) | ExprKind::Charset(_) => {
            false
        }
        ExprKind::Literal(s) => s.is_empty(),
        ExprKind::Identifier(name) => nullable.contains(name),
        ExprKind::Sequence(items) => items.iter().all(|e| expr_nullable(e, nullable)),
        ExprKind::Choice(items) => items.iter().any(|e| expr_nullable(e, nullable)),
        ExprKind::Optional(_)
        | ExprKind::ZeroOrMore(_)
        | ExprKind::And(_)
        | ExprKind::Not(_) => true,
        ExprKind::OneOrMore(e) => expr_nullable(e, nullable),
        ExprKind::Lex(e) => expr_nullable(e, nullable),
        ExprKind::Labeled { expr, .. } | ExprKind::Capture { expr, .. } => {
            expr_nullable(expr, nullable)
        }
        ExprKind::Error { .. } => false,
    }
}

/// Whether `expr` can never fail, given the rules already known to
/// always succeed.
pub fn expr_always_succeeds(expr: &Expr, always: &IndexSet<String>) -> bool {
    match &expr.kind {
        ExprKind::Any | ExprKind::Range(..) | ExprKind::Class(_) | ExprKind::Charset(_) => {
            false
        }
        ExprKind::Literal(s) => s.is_empty(),
        ExprKind::Identifier(name) => always.contains(name),
        ExprKind::Sequence(items) => {
            items.iter().all(|e| expr_always_succeeds(e, always))
        }
        ExprKind::Choice(items) => items.iter().any(|e| expr_always_succeeds(e, always)),
        ExprKind::Optional(_) | ExprKind::ZeroOrMore(_) => true,
        ExprKind::And(_) | ExprKind::Not(_) => false,
        ExprKind::OneOrMore(e) => expr_always_succeeds(e, always),
        ExprKind::Lex(e) => expr_always_succeeds(e, always),
        ExprKind::Labeled { expr, .. } | ExprKind::Capture { expr, .. } => {
            expr_always_succeeds(expr, always)
        }
        ExprKind::Error { .. } => false,
    }
}
