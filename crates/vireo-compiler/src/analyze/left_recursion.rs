//! Left-recursion detection.
//!
//! Builds the left-call graph: `A -> B` iff some alternative of `A`
//! can reach `B` as its first consumed non-terminal, accounting for
//! nullable prefixes. Any rule in a cycle of that graph is
//! left-recursive; the compiler rejects them.

use indexmap::{IndexMap, IndexSet};

use crate::ast::{Expr, ExprKind, Grammar};

use super::nullable::expr_nullable;
use super::recursion::sccs;

/// Rules that are left-recursive, directly or through other rules.
pub fn left_recursive_set(grammar: &Grammar, nullable: &IndexSet<String>) -> IndexSet<String> {
    let graph: IndexMap<&str, IndexSet<&str>> = grammar
        .defs
        .values()
        .map(|def| {
            let mut refs = IndexSet::new();
            left_refs(&def.body, nullable, &mut refs);
            (def.name.as_str(), refs)
        })
        .collect();

    let mut out = IndexSet::new();
    for scc in sccs(&graph) {
        if scc.len() > 1 {
            out.extend(scc.iter().map(|s| s.to_string()));
        } else if let Some(&name) = scc.first()
            && graph.get(name).is_some_and(|refs| refs.contains(name))
        {
            out.insert(name.to_string());
        }
    }
    out
}

/// Identifiers reachable at the left edge of `expr` before any input
/// is necessarily consumed.
fn left_refs<'a>(expr: &'a Expr, nullable: &IndexSet<String>, out: &mut IndexSet<&'a str>) {
    match &expr.kind {
        ExprKind::Identifier(name) => {
            out.insert(name.as_str());
        }
        ExprKind::Sequence(items) => {
            for item in items {
                left_refs(item, nullable, out);
                if !expr_nullable(item, nullable) {
                    break;
                }
            }
        }
        ExprKind::Choice(items) => {
            for item in items {
                left_refs(item, nullable, out);
            }
        }
        // A predicate calls its body at the current position, so a
        // rule recursing into itself through `&`/`!` still loops.
        ExprKind::Optional(e)
        | ExprKind::ZeroOrMore(e)
        | ExprKind::OneOrMore(e)
        | ExprKind::And(e)
        | ExprKind::Not(e)
        | ExprKind::Lex(e) => left_refs(e, nullable, out),
        ExprKind::Labeled { expr, .. } | ExprKind::Capture { expr, .. } => {
            left_refs(expr, nullable, out)
        }
        _ => {}
    }
}
