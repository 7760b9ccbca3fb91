//! IR transforms.
//!
//! An ordered pipeline of `Grammar -> Grammar` passes, each idempotent
//! and language-preserving (modulo the intentional rewrites each pass
//! exists for): built-in rules, charset folding, automatic whitespace
//! injection, capture wrapping.

pub mod builtins;
pub mod captures;
pub mod charsets;
pub mod whitespace;

#[cfg(test)]
mod transform_tests;

use crate::ast::{Expr, ExprKind, Grammar};

/// Grammar-stage knobs (spec'd defaults: everything on).
#[derive(Clone, Copy, Debug)]
pub struct GrammarConfig {
    /// Merge the embedded built-in grammar.
    pub add_builtins: bool,
    /// Fold classes and choices of single-codepoint literals into
    /// charsets.
    pub add_charsets: bool,
    /// Wrap definitions in named captures and emit capture opcodes.
    pub captures: bool,
    /// Keep `Spacing` captures in the output tree (off suppresses them
    /// at run time; this knob is read by the facade, not by a pass).
    pub capture_spaces: bool,
    /// Inject implicit `Spacing` calls.
    pub handle_spaces: bool,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            add_builtins: true,
            add_charsets: true,
            captures: true,
            capture_spaces: true,
            handle_spaces: true,
        }
    }
}

/// Run the configured passes in their fixed order.
pub fn apply(grammar: Grammar, config: &GrammarConfig) -> Grammar {
    let mut grammar = grammar;
    if config.add_builtins {
        grammar = builtins::add_builtins(grammar);
    }
    if config.add_charsets {
        grammar = charsets::add_charsets(grammar);
    }
    if config.handle_spaces {
        grammar = whitespace::inject_whitespaces(grammar);
    }
    if config.captures {
        grammar = captures::add_captures(grammar);
    }
    grammar
}

/// Whether an expression refers only to terminals, recursively: no
/// non-terminal call anywhere underneath.
pub(crate) fn is_syntactic(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Identifier(_) => false,
        ExprKind::Any
        | ExprKind::Literal(_)
        | ExprKind::Range(..)
        | ExprKind::Class(_)
        | ExprKind::Charset(_) => true,
        ExprKind::Sequence(items) | ExprKind::Choice(items) => {
            items.iter().all(is_syntactic)
        }
        ExprKind::Optional(e)
        | ExprKind::ZeroOrMore(e)
        | ExprKind::OneOrMore(e)
        | ExprKind::And(e)
        | ExprKind::Not(e)
        | ExprKind::Lex(e) => is_syntactic(e),
        ExprKind::Labeled { expr, .. } | ExprKind::Capture { expr, .. } => is_syntactic(expr),
        ExprKind::Error { expr, .. } => expr.as_deref().is_none_or(is_syntactic),
    }
}
