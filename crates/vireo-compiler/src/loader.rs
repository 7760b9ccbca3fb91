//! Cross-file grammar imports.
//!
//! `@import A, B from "./other.peg"` pulls the named rules (plus their
//! local dependency closure) out of another grammar file. Paths are
//! resolved relative to the importing file and must be written with a
//! leading `./`. The merged grammar owns every definition; cross-file
//! origins stay visible through each node's `SourceLocation` file id.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;

use vireo_core::FileRegistry;

use crate::ast::Grammar;
use crate::diagnostics::Diagnostics;
use crate::parser::parse;
use crate::analyze::refs::expr_refs;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("import path must start with `./`: \"{0}\"")]
    MissingDotSlash(String),

    #[error("import path is too short: \"{0}\"")]
    PathTooShort(String),

    #[error("cannot resolve `{0}` relative to its importing file")]
    Unrelated(String),

    #[error("import cycle through `{0}`")]
    ImportCycle(String),

    #[error("`{path}` does not define rule `{name}`")]
    MissingRule { path: String, name: String },

    #[error("grammar text has imports but no file path to resolve them from")]
    NoBasePath,
}

/// Result of loading: the merged grammar and every diagnostic found in
/// any of the files involved.
#[derive(Debug)]
pub struct LoadOutcome {
    pub grammar: Grammar,
    pub diagnostics: Diagnostics,
}

/// Loads grammar files and resolves their imports through a shared
/// file registry.
#[derive(Debug, Default)]
pub struct Loader {
    registry: FileRegistry,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a grammar from a file, resolving imports recursively.
    pub fn load_file(mut self, path: impl AsRef<Path>) -> Result<LoadOutcome, LoadError> {
        let mut diagnostics = Diagnostics::new();
        let mut stack = IndexSet::new();
        let mut grammar = self.load_rec(path.as_ref(), &mut stack, &mut diagnostics)?;
        grammar.files = self.registry;
        Ok(LoadOutcome {
            grammar,
            diagnostics,
        })
    }

    /// Load a grammar from an in-memory string. Imports cannot be
    /// resolved without a base path and are rejected.
    pub fn load_source(
        mut self,
        source: &str,
        name: &str,
    ) -> Result<LoadOutcome, LoadError> {
        let file_id = self.registry.register(name);
        let outcome = parse(source, file_id);
        if !outcome.grammar.imports.is_empty() {
            return Err(LoadError::NoBasePath);
        }
        let mut grammar = outcome.grammar;
        grammar.files = self.registry;
        Ok(LoadOutcome {
            grammar,
            diagnostics: outcome.diagnostics,
        })
    }

    fn load_rec(
        &mut self,
        path: &Path,
        stack: &mut IndexSet<PathBuf>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Grammar, LoadError> {
        let key = path.to_path_buf();
        if !stack.insert(key.clone()) {
            return Err(LoadError::ImportCycle(path.display().to_string()));
        }

        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file_id = self.registry.register(path);
        let outcome = parse(&text, file_id);
        diagnostics.extend(outcome.diagnostics);
        let mut grammar = outcome.grammar;

        let imports = std::mem::take(&mut grammar.imports);
        for import in imports {
            let target = resolve(path, &import.path)?;
            let imported = self.load_rec(&target, stack, diagnostics)?;
            merge_import(&mut grammar, &imported, &import.names, &import.path)?;
        }

        stack.swap_remove(&key);
        Ok(grammar)
    }
}

/// Resolve an import path relative to the importing file.
fn resolve(importer: &Path, rel: &str) -> Result<PathBuf, LoadError> {
    if rel.len() < 3 {
        return Err(LoadError::PathTooShort(rel.to_string()));
    }
    let Some(stripped) = rel.strip_prefix("./") else {
        return Err(LoadError::MissingDotSlash(rel.to_string()));
    };
    let parent = importer
        .parent()
        .ok_or_else(|| LoadError::Unrelated(rel.to_string()))?;
    Ok(parent.join(stripped))
}

/// Copy the named rules plus their local dependency closure into the
/// importing grammar. Existing definitions are never overwritten.
fn merge_import(
    grammar: &mut Grammar,
    imported: &Grammar,
    names: &[String],
    import_path: &str,
) -> Result<(), LoadError> {
    let mut wanted: IndexSet<String> = IndexSet::new();
    let mut queue: Vec<String> = Vec::new();
    for name in names {
        if imported.get(name).is_none() {
            return Err(LoadError::MissingRule {
                path: import_path.to_string(),
                name: name.clone(),
            });
        }
        if wanted.insert(name.clone()) {
            queue.push(name.clone());
        }
    }
    while let Some(name) = queue.pop() {
        let Some(def) = imported.get(&name) else {
            continue; // dangling refs surface via check_refs later
        };
        let mut refs = IndexSet::new();
        expr_refs(&def.body, &mut refs);
        for r in refs {
            if wanted.insert(r.to_string()) {
                queue.push(r.to_string());
            }
        }
    }
    for name in wanted {
        if let Some(def) = imported.get(&name) {
            grammar.add_def(def.clone());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("vireo-loader-tests")
            .join(format!("{tag}-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn imports_pull_named_rules_and_closure() {
        let dir = temp_dir("closure");
        fs::write(
            dir.join("num.peg"),
            "Number <- Digit+\nDigit <- [0-9]\nUnrelated <- 'u'\n",
        )
        .unwrap();
        fs::write(
            dir.join("main.peg"),
            "@import Number from \"./num.peg\"\nG <- Number\n",
        )
        .unwrap();

        let outcome = Loader::new().load_file(dir.join("main.peg")).unwrap();
        assert!(outcome.grammar.get("G").is_some());
        assert!(outcome.grammar.get("Number").is_some());
        // Digit comes along as Number's dependency...
        assert!(outcome.grammar.get("Digit").is_some());
        // ...but unrequested, unreferenced rules do not.
        assert!(outcome.grammar.get("Unrelated").is_none());
        // The entry stays the importing file's first rule.
        assert_eq!(outcome.grammar.entry().unwrap().name, "G");
    }

    #[test]
    fn import_path_must_be_dot_relative() {
        let dir = temp_dir("dotslash");
        fs::write(
            dir.join("main.peg"),
            "@import N from \"num.peg\"\nG <- N\n",
        )
        .unwrap();
        let err = Loader::new().load_file(dir.join("main.peg")).unwrap_err();
        assert!(matches!(err, LoadError::MissingDotSlash(_)));
    }

    #[test]
    fn import_cycles_are_detected() {
        let dir = temp_dir("cycle");
        fs::write(dir.join("a.peg"), "@import B from \"./b.peg\"\nA <- B\n").unwrap();
        fs::write(dir.join("b.peg"), "@import A from \"./a.peg\"\nB <- A\n").unwrap();
        let err = Loader::new().load_file(dir.join("a.peg")).unwrap_err();
        assert!(matches!(err, LoadError::ImportCycle(_)));
    }

    #[test]
    fn missing_rule_in_import_errors() {
        let dir = temp_dir("missing");
        fs::write(dir.join("lib.peg"), "X <- 'x'\n").unwrap();
        fs::write(
            dir.join("main.peg"),
            "@import Nope from \"./lib.peg\"\nG <- Nope\n",
        )
        .unwrap();
        let err = Loader::new().load_file(dir.join("main.peg")).unwrap_err();
        assert!(matches!(err, LoadError::MissingRule { .. }));
    }

    #[test]
    fn in_memory_sources_reject_imports() {
        let err = Loader::new()
            .load_source("@import X from \"./x.peg\"\nG <- X\n", "<memory>")
            .unwrap_err();
        assert!(matches!(err, LoadError::NoBasePath));
    }
}
