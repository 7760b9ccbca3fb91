//! Capture wrapping.
//!
//! Every definition is wrapped in a capture named after it. A
//! non-syntactic body additionally gets an unnamed capture, and each
//! maximal terminal-only region inside it gets its own unnamed capture
//! so the matcher can materialise leaves without calling back into the
//! tree builder per codepoint. Predicates are never wrapped, and a
//! repetition whose body is terminal-only modulo predicates is wrapped
//! as a whole rather than per iteration.

use crate::ast::{Definition, Expr, ExprKind, Grammar};

use super::is_syntactic;

pub fn add_captures(mut grammar: Grammar) -> Grammar {
    for def in grammar.defs.values_mut() {
        if already_wrapped(def) {
            continue;
        }
        let body = std::mem::replace(&mut def.body, Expr::synthetic(ExprKind::Any));
        let inner = if is_syntactic(&body) {
            body
        } else {
            let walked = walk(body);
            match &walked.kind {
                // Already a single bracket, or a bare predicate that
                // `walk` left alone; predicates are never wrapped, not
                // even at the top of a definition.
                ExprKind::Capture { name: None, .. }
                | ExprKind::And(_)
                | ExprKind::Not(_) => walked,
                _ => anonymous(walked),
            }
        };
        def.body = Expr::synthetic(ExprKind::Capture {
            name: Some(def.name.clone()),
            expr: Box::new(inner),
        });
    }
    grammar
}

fn already_wrapped(def: &Definition) -> bool {
    matches!(
        &def.body.kind,
        ExprKind::Capture { name: Some(n), .. } if *n == def.name
    )
}

fn anonymous(expr: Expr) -> Expr {
    Expr::synthetic(ExprKind::Capture {
        name: None,
        expr: Box::new(expr),
    })
}

/// Whether an expression can be bracketed by a single capture: every
/// part outside a predicate is a terminal, and no capture exists inside
/// yet. Identifiers keep their own rule captures, so they end a region.
fn capturable(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Identifier(_) | ExprKind::Capture { .. } => false,
        // Predicate contents never capture, whatever they contain.
        ExprKind::And(_) | ExprKind::Not(_) => true,
        ExprKind::Any
        | ExprKind::Literal(_)
        | ExprKind::Range(..)
        | ExprKind::Class(_)
        | ExprKind::Charset(_) => true,
        ExprKind::Sequence(items) | ExprKind::Choice(items) => items.iter().all(capturable),
        ExprKind::Optional(e) | ExprKind::ZeroOrMore(e) | ExprKind::OneOrMore(e) => {
            capturable(e)
        }
        ExprKind::Lex(e) => capturable(e),
        ExprKind::Labeled { expr, .. } => capturable(expr),
        ExprKind::Error { .. } => false,
    }
}

fn walk(expr: Expr) -> Expr {
    if matches!(expr.kind, ExprKind::And(_) | ExprKind::Not(_)) {
        return expr;
    }
    if capturable(&expr) {
        return anonymous(expr);
    }
    let Expr { kind, loc } = expr;
    let kind = match kind {
        ExprKind::Sequence(items) => {
            ExprKind::Sequence(items.into_iter().map(walk).collect())
        }
        ExprKind::Choice(items) => ExprKind::Choice(items.into_iter().map(walk).collect()),
        ExprKind::Optional(e) => ExprKind::Optional(Box::new(walk(*e))),
        ExprKind::ZeroOrMore(e) => ExprKind::ZeroOrMore(Box::new(walk(*e))),
        ExprKind::OneOrMore(e) => ExprKind::OneOrMore(Box::new(walk(*e))),
        ExprKind::Lex(e) => ExprKind::Lex(Box::new(walk(*e))),
        ExprKind::Labeled { label, expr } => ExprKind::Labeled {
            label,
            expr: Box::new(walk(*expr)),
        },
        // Existing captures (idempotence) and identifiers stay as-is.
        other => other,
    };
    Expr::new(kind, loc)
}
