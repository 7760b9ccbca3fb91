//! Definition size, via the compiler's dry-run mode.

use crate::ast::Grammar;
use crate::compile::{CompilerConfig, body_size};

/// Compiled size of a definition's body in bytes, or `None` if the
/// rule does not exist or does not compile. Feeds the inliner and the
/// diagnostics surface.
pub fn definition_size(grammar: &Grammar, name: &str) -> Option<usize> {
    let def = grammar.get(name)?;
    body_size(grammar, def, CompilerConfig::default()).ok()
}
