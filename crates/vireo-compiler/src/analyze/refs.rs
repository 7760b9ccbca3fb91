//! Rule references: the call graph and its diagnostics.

use indexmap::{IndexMap, IndexSet};

use crate::ast::{Expr, ExprKind, Grammar};
use crate::diagnostics::Diagnostics;

/// Collect every identifier referenced from `expr` into `out`.
pub fn expr_refs<'a>(expr: &'a Expr, out: &mut IndexSet<&'a str>) {
    match &expr.kind {
        ExprKind::Identifier(name) => {
            out.insert(name.as_str());
        }
        ExprKind::Sequence(items) | ExprKind::Choice(items) => {
            for item in items {
                expr_refs(item, out);
            }
        }
        ExprKind::Optional(e)
        | ExprKind::ZeroOrMore(e)
        | ExprKind::OneOrMore(e)
        | ExprKind::And(e)
        | ExprKind::Not(e)
        | ExprKind::Lex(e) => expr_refs(e, out),
        ExprKind::Labeled { expr, .. } | ExprKind::Capture { expr, .. } => {
            expr_refs(expr, out)
        }
        _ => {}
    }
}

/// Collect every `^label` name used anywhere in `expr`.
pub fn expr_labels<'a>(expr: &'a Expr, out: &mut IndexSet<&'a str>) {
    match &expr.kind {
        ExprKind::Labeled { label, expr } => {
            out.insert(label.as_str());
            expr_labels(expr, out);
        }
        ExprKind::Sequence(items) | ExprKind::Choice(items) => {
            for item in items {
                expr_labels(item, out);
            }
        }
        ExprKind::Optional(e)
        | ExprKind::ZeroOrMore(e)
        | ExprKind::OneOrMore(e)
        | ExprKind::And(e)
        | ExprKind::Not(e)
        | ExprKind::Lex(e) => expr_labels(e, out),
        ExprKind::Capture { expr, .. } => expr_labels(expr, out),
        _ => {}
    }
}

/// The rule call graph, in definition order.
pub fn call_graph(grammar: &Grammar) -> IndexMap<&str, IndexSet<&str>> {
    grammar
        .defs
        .values()
        .map(|def| {
            let mut refs = IndexSet::new();
            expr_refs(&def.body, &mut refs);
            (def.name.as_str(), refs)
        })
        .collect()
}

/// Reference diagnostics: undefined rules (error), rules unreachable
/// from the entry definition (warning), and thrown labels that have no
/// recovery rule (warning).
pub fn check_refs(grammar: &Grammar, diag: &mut Diagnostics) {
    let graph = call_graph(grammar);

    for def in grammar.iter() {
        let mut refs = IndexSet::new();
        expr_refs(&def.body, &mut refs);
        for name in refs {
            if grammar.get(name).is_none() {
                diag.error(
                    format!("rule `{}` references undefined rule `{name}`", def.name),
                    def.loc.file,
                    def.loc.span.range(),
                )
                .emit();
            }
        }
    }

    // Reachability from the entry rule. Recovery rules for thrown
    // labels are reachable through the throw, not the call graph.
    let mut labels = IndexSet::new();
    for def in grammar.iter() {
        expr_labels(&def.body, &mut labels);
    }

    if let Some(entry) = grammar.entry() {
        let mut reachable: IndexSet<&str> = IndexSet::new();
        reachable.insert(entry.name.as_str());
        for &label in &labels {
            reachable.insert(label);
        }
        let mut queue: Vec<&str> = reachable.iter().copied().collect();
        while let Some(name) = queue.pop() {
            if let Some(refs) = graph.get(name) {
                for &next in refs {
                    if reachable.insert(next) {
                        queue.push(next);
                    }
                }
            }
        }
        for def in grammar.iter() {
            // Builtins are injected later than they are referenced and
            // are exempt from the unused warning.
            if !def.loc.file.is_real() {
                continue;
            }
            if !reachable.contains(def.name.as_str()) {
                diag.warning(
                    format!("rule `{}` is never used", def.name),
                    def.loc.file,
                    def.loc.span.range(),
                )
                .emit();
            }
        }
    }

    for label in labels {
        if grammar.get(label).is_none() {
            if let Some(def) = grammar
                .iter()
                .find(|def| {
                    let mut used = IndexSet::new();
                    expr_labels(&def.body, &mut used);
                    used.contains(label)
                })
            {
                diag.warning(
                    format!("label `{label}` has no recovery rule"),
                    def.loc.file,
                    def.loc.span.range(),
                )
                .emit();
            }
        }
    }
}
