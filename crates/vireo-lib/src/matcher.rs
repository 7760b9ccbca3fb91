//! The matcher: grammar in, parse trees out.
//!
//! Construction runs the full pipeline (parse, resolve imports,
//! transform, analyse, compile, encode) and fails with rendered
//! diagnostics if anything error-level surfaces. The matcher owns a
//! reusable machine; each [`Matcher::parse`] invalidates the previous
//! borrowed tree.

use std::path::Path;

use vireo_bytecode::Module;
use vireo_compiler::diagnostics::DiagnosticsPrinter;
use vireo_compiler::loader::{LoadOutcome, Loader};
use vireo_compiler::{CompileError, EmitError, LoadError, analyze, compile, emit, transform};
use vireo_core::FileId;
use vireo_vm::{Machine, MachineConfig, Match, ParseError};

use crate::config::Config;

/// A matcher build failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Syntax or semantic errors; the payload is the rendered
    /// diagnostic report.
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// A compiled grammar plus a reusable machine.
///
/// The bytecode module is immutable after construction; cloning the
/// matcher shares nothing and is not provided; build once, match
/// many times.
#[derive(Debug)]
pub struct Matcher {
    module: Module,
    machine: Machine,
    /// Warnings that survived the build (errors abort it).
    warnings: Vec<String>,
}

impl Matcher {
    /// Build a matcher from grammar text. Imports are rejected here;
    /// use [`Matcher::from_file`] for grammars that import.
    pub fn from_source(source: &str, config: Config) -> Result<Self, Error> {
        let outcome = Loader::new().load_source(source, "<source>")?;
        Self::build(outcome, Some(source), config)
    }

    /// Build a matcher from a grammar file, resolving imports relative
    /// to it.
    pub fn from_file(path: impl AsRef<Path>, config: Config) -> Result<Self, Error> {
        let outcome = Loader::new().load_file(path)?;
        Self::build(outcome, None, config)
    }

    fn build(
        outcome: LoadOutcome,
        source: Option<&str>,
        config: Config,
    ) -> Result<Self, Error> {
        let LoadOutcome {
            grammar,
            mut diagnostics,
        } = outcome;

        let grammar = transform::apply(grammar, &config.grammar);
        analyze::check_refs(&grammar, &mut diagnostics);
        analyze::check_loops(&grammar, &mut diagnostics);

        if diagnostics.has_errors() {
            let printer = DiagnosticsPrinter::new(&diagnostics);
            let rendered = match source {
                Some(text) => printer.source(text, FileId(0)).render(),
                None => printer.render(),
            };
            return Err(Error::Invalid(rendered));
        }
        let warnings = diagnostics
            .iter()
            .filter(|d| d.is_warning())
            .map(|d| d.message.clone())
            .collect();

        let program = compile::compile(&grammar, config.compiler)?;
        let module = emit::encode(&program)?;

        let mut machine_config = MachineConfig::new();
        machine_config.show_fails = config.vm.show_fails;
        if !config.grammar.capture_spaces
            && let Some(id) = module.str_id(transform::whitespace::SPACING)
        {
            machine_config.suppressed.push(id);
        }
        for (label, message) in &config.labels {
            if let Some(id) = module.str_id(label) {
                machine_config.messages.insert(id, message.clone());
            }
        }

        Ok(Self {
            module,
            machine: Machine::new(machine_config),
            warnings,
        })
    }

    /// Match input bytes against the grammar's entry rule.
    ///
    /// The returned [`Match`] borrows this matcher and the input; it is
    /// valid until the next `parse` call. Use
    /// [`vireo_vm::ParseTree::to_owned`] for a tree that outlives both.
    pub fn parse<'a>(&'a mut self, input: &'a [u8]) -> Result<Match<'a>, ParseError> {
        self.machine.exec(&self.module, input)
    }

    /// The encoded module backing this matcher.
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Disassembly of the compiled grammar.
    pub fn dump(&self) -> String {
        vireo_bytecode::dump::dump(&self.module)
    }

    /// Build warnings (unused rules, nullable loop bodies, ...).
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}
