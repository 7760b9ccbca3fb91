//! Automatic whitespace injection.
//!
//! Non-syntactic definition bodies get an implicit `Spacing` call
//! between sequence items, lifted out of choices and prefixed onto
//! repetition bodies so it runs on every iteration. Nothing is
//! injected under `#` (lex) subtrees, next to items that are
//! themselves lexified or already start with a `Spacing` call, or into
//! rules that `Spacing` itself depends on.

use indexmap::IndexSet;

use crate::analyze::refs::expr_refs;
use crate::ast::{Expr, ExprKind, Grammar};

use super::is_syntactic;

pub const SPACING: &str = "Spacing";

pub fn inject_whitespaces(mut grammar: Grammar) -> Grammar {
    let protected = spacing_closure(&grammar);
    for def in grammar.defs.values_mut() {
        if protected.contains(def.name.as_str()) || is_syntactic(&def.body) {
            continue;
        }
        let body = std::mem::replace(&mut def.body, Expr::synthetic(ExprKind::Any));
        def.body = inject(body);
    }
    grammar
}

/// Rules reachable from `Spacing`, including itself. Injecting a
/// `Spacing` call into these would recurse forever.
fn spacing_closure(grammar: &Grammar) -> IndexSet<String> {
    let mut closure = IndexSet::new();
    closure.insert(SPACING.to_string());
    let mut queue = vec![SPACING.to_string()];
    while let Some(name) = queue.pop() {
        let Some(def) = grammar.get(&name) else {
            continue;
        };
        let mut refs = IndexSet::new();
        expr_refs(&def.body, &mut refs);
        for name in refs {
            if closure.insert(name.to_string()) {
                queue.push(name.to_string());
            }
        }
    }
    closure
}

fn spacing_call() -> Expr {
    Expr::synthetic(ExprKind::Identifier(SPACING.to_string()))
}

/// Whether injecting a `Spacing` call next to this item is suppressed:
/// the item is lexified, or its first effect is already a `Spacing`
/// call.
fn is_lexish(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Lex(_)) || starts_with_spacing(expr)
}

fn starts_with_spacing(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Identifier(name) => name == SPACING,
        ExprKind::Sequence(items) => items.first().is_some_and(starts_with_spacing),
        ExprKind::Labeled { expr, .. } | ExprKind::Capture { expr, .. } => {
            starts_with_spacing(expr)
        }
        _ => false,
    }
}

fn inject(expr: Expr) -> Expr {
    let Expr { kind, loc } = expr;
    let kind = match kind {
        // Lexified subtrees are left exactly as written.
        lex @ ExprKind::Lex(_) => lex,
        ExprKind::Sequence(items) => {
            let items: Vec<Expr> = items.into_iter().map(inject).collect();
            let mut out: Vec<Expr> = Vec::with_capacity(items.len() * 2);
            for item in items {
                if let Some(prev) = out.last()
                    && !is_lexish(prev)
                    && !is_lexish(&item)
                {
                    out.push(spacing_call());
                }
                out.push(item);
            }
            ExprKind::Sequence(out)
        }
        // Injection lifts out of choices: branches are rewritten, but
        // no leading call is added per branch.
        ExprKind::Choice(items) => {
            ExprKind::Choice(items.into_iter().map(inject).collect())
        }
        ExprKind::ZeroOrMore(e) => ExprKind::ZeroOrMore(Box::new(loop_body(inject(*e)))),
        ExprKind::OneOrMore(e) => ExprKind::OneOrMore(Box::new(loop_body(inject(*e)))),
        ExprKind::Optional(e) => ExprKind::Optional(Box::new(inject(*e))),
        ExprKind::And(e) => ExprKind::And(Box::new(inject(*e))),
        ExprKind::Not(e) => ExprKind::Not(Box::new(inject(*e))),
        ExprKind::Labeled { label, expr } => ExprKind::Labeled {
            label,
            expr: Box::new(inject(*expr)),
        },
        ExprKind::Capture { name, expr } => ExprKind::Capture {
            name,
            expr: Box::new(inject(*expr)),
        },
        leaf => leaf,
    };
    Expr::new(kind, loc)
}

/// Prefix a repeated body with a `Spacing` call so the skip runs on
/// every iteration, unless the body is lexified or already does.
fn loop_body(body: Expr) -> Expr {
    if is_lexish(&body) {
        return body;
    }
    Expr::synthetic(ExprKind::Sequence(vec![spacing_call(), body]))
}
