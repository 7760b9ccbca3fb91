//! Built-in rule injection.

use vireo_core::FileId;

use crate::ast::Grammar;
use crate::parser::parse;

/// The embedded built-in grammar. Parsed with [`FileId::BUILTIN`] so
/// go-to-definition style queries can tell these rules apart from user
/// code.
pub const BUILTINS: &str = "\
Spacing <- (' ' / '\\t' / '\\r' / '\\n')*
EOL <- '\\r\\n' / '\\n' / '\\r'
EOF <- !.
";

/// Merge the built-in rules into a grammar. User definitions take
/// precedence; an existing `Spacing` is never overwritten.
pub fn add_builtins(mut grammar: Grammar) -> Grammar {
    let outcome = parse(BUILTINS, FileId::BUILTIN);
    debug_assert!(
        !outcome.diagnostics.has_errors(),
        "embedded builtins failed to parse"
    );
    for def in outcome.grammar.defs.into_values() {
        grammar.add_def(def);
    }
    grammar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ExprKind;

    #[test]
    fn builtins_parse_and_merge() {
        let grammar = add_builtins(Grammar::new());
        assert!(grammar.get("Spacing").is_some());
        assert!(grammar.get("EOL").is_some());
        assert!(grammar.get("EOF").is_some());
        assert_eq!(
            grammar.get("Spacing").unwrap().loc.file,
            FileId::BUILTIN
        );
    }

    #[test]
    fn user_definitions_win() {
        let user = parse("Spacing <- ';'*", FileId(0)).grammar;
        let merged = add_builtins(user);
        // The user body is a repetition over ';', not the builtin one.
        match &merged.get("Spacing").unwrap().body.kind {
            ExprKind::ZeroOrMore(inner) => {
                assert_eq!(inner.kind, ExprKind::Literal(";".into()));
            }
            other => panic!("user Spacing was overwritten: {other:?}"),
        }
    }
}
