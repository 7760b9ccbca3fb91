//! Infinite-loop risk detection for repetitions.

use indexmap::IndexSet;

use crate::ast::{Expr, ExprKind, Grammar};
use crate::diagnostics::Diagnostics;

use super::nullable::{
    always_succeeds_set, expr_always_succeeds, expr_nullable, nullable_set,
};

/// Flag every `*`/`+` whose body is nullable: a warning when the body
/// can still fail (the loop exits through that failure), an error when
/// it also always succeeds (the loop can never exit).
pub fn check_loops(grammar: &Grammar, diag: &mut Diagnostics) {
    let nullable = nullable_set(grammar);
    let always = always_succeeds_set(grammar);
    for def in grammar.iter() {
        walk(&def.body, &nullable, &always, diag);
    }
}

fn walk(
    expr: &Expr,
    nullable: &IndexSet<String>,
    always: &IndexSet<String>,
    diag: &mut Diagnostics,
) {
    if let ExprKind::ZeroOrMore(body) | ExprKind::OneOrMore(body) = &expr.kind {
        if expr_nullable(body, nullable) {
            let file = expr.loc.file;
            let range = expr.loc.span.range();
            if expr_always_succeeds(body, always) {
                diag.error(
                    "repetition body matches the empty string and never fails; \
                     the loop cannot exit",
                    file,
                    range,
                )
                .emit();
            } else {
                diag.warning(
                    "repetition body can match the empty string; \
                     possible infinite loop",
                    file,
                    range,
                )
                .emit();
            }
        }
    }
    match &expr.kind {
        ExprKind::Sequence(items) | ExprKind::Choice(items) => {
            for item in items {
                walk(item, nullable, always, diag);
            }
        }
        ExprKind::Optional(e)
        | ExprKind::ZeroOrMore(e)
        | ExprKind::OneOrMore(e)
        | ExprKind::And(e)
        | ExprKind::Not(e)
        | ExprKind::Lex(e) => walk(e, nullable, always, diag),
        ExprKind::Labeled { expr, .. } | ExprKind::Capture { expr, .. } => {
            walk(expr, nullable, always, diag)
        }
        _ => {}
    }
}
