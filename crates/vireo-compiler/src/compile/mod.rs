//! The compiler: IR to abstract program.
//!
//! Owns a per-instance label allocator (never global state, so
//! concurrent compilations are isolated and builds reproducible), the
//! program string table, and the recovery table. `optimize = 0` emits
//! naive choice/commit forms; `optimize = 1` uses `partial_commit`,
//! `back_commit` and `fail_twice` where legal.

pub mod program;

#[cfg(test)]
mod compile_tests;

use indexmap::IndexSet;

use crate::analyze::{left_recursive_set, nullable_set, recursive_set};
use crate::analyze::refs::{call_graph, expr_labels};
use crate::ast::{ClassItem, Definition, Expr, ExprKind, Grammar};

pub use program::{Inst, LabelId, Program, RecoveryEntry, StrId};

/// Compiler knobs (spec'd defaults).
#[derive(Clone, Copy, Debug)]
pub struct CompilerConfig {
    /// 0 = naive lowering, 1 = commit-family optimisations.
    pub optimize: u8,
    pub inline: InlineConfig,
}

#[derive(Clone, Copy, Debug)]
pub struct InlineConfig {
    pub enabled: bool,
    /// Byte budget: rules whose compiled body is larger stay calls.
    pub max_size: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            optimize: 1,
            inline: InlineConfig {
                enabled: true,
                max_size: 50,
            },
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CompileError {
    #[error("grammar has no definitions")]
    EmptyGrammar,

    #[error("reference to undefined rule `{0}`")]
    UndefinedRule(String),

    #[error("left-recursive rules are not supported: {}", .0.join(", "))]
    LeftRecursion(Vec<String>),
}

/// Compile a transformed grammar into an abstract program.
pub fn compile(grammar: &Grammar, config: CompilerConfig) -> Result<Program, CompileError> {
    Compiler::new(grammar, config).compile()
}

/// Compiled size of one definition's body, in bytes, as it would be
/// emitted inline. Used by the inliner and exposed through
/// `analyze::definition_size`.
pub fn body_size(
    grammar: &Grammar,
    def: &Definition,
    config: CompilerConfig,
) -> Result<usize, CompileError> {
    let mut scratch = Compiler::new(
        grammar,
        CompilerConfig {
            inline: InlineConfig {
                enabled: false,
                max_size: 0,
            },
            ..config
        },
    );
    scratch.dry = true;
    scratch.compile_expr(&def.body)?;
    Ok(scratch.program.encoded_size())
}

pub struct Compiler<'g> {
    grammar: &'g Grammar,
    config: CompilerConfig,
    program: Program,
    next_label: u32,
    def_labels: indexmap::IndexMap<String, LabelId>,
    inlinable: IndexSet<String>,
    /// Dry-run mode: identifiers compile to dummy calls so bodies can
    /// be sized before any address exists.
    dry: bool,
}

impl<'g> Compiler<'g> {
    pub fn new(grammar: &'g Grammar, config: CompilerConfig) -> Self {
        Self {
            grammar,
            config,
            program: Program::new(),
            next_label: 0,
            def_labels: indexmap::IndexMap::new(),
            inlinable: IndexSet::new(),
            dry: false,
        }
    }

    fn fresh(&mut self) -> LabelId {
        let label = LabelId(self.next_label);
        self.next_label += 1;
        label
    }

    fn emit(&mut self, inst: Inst) {
        self.program.code.push(inst);
    }

    fn compile(mut self) -> Result<Program, CompileError> {
        let entry_name = self
            .grammar
            .entry()
            .ok_or(CompileError::EmptyGrammar)?
            .name
            .clone();

        for refs in call_graph(self.grammar).into_values() {
            for name in refs {
                if self.grammar.get(name).is_none() {
                    return Err(CompileError::UndefinedRule(name.to_string()));
                }
            }
        }

        let nullable = nullable_set(self.grammar);
        let left = left_recursive_set(self.grammar, &nullable);
        if !left.is_empty() {
            let mut names: Vec<String> = left.into_iter().collect();
            names.sort();
            return Err(CompileError::LeftRecursion(names));
        }

        // Labels that are also rule names become recovery targets.
        let mut thrown = IndexSet::new();
        for def in self.grammar.iter() {
            expr_labels(&def.body, &mut thrown);
        }
        let recovery_names: Vec<String> = thrown
            .iter()
            .filter(|name| self.grammar.get(name).is_some())
            .map(|name| name.to_string())
            .collect();

        // A rule is inlined iff it is not the entry, not recursive, not
        // a recovery target, and its compiled body fits the budget.
        if self.config.inline.enabled {
            let recursive = recursive_set(self.grammar);
            for def in self.grammar.iter() {
                if def.name == entry_name
                    || recursive.contains(&def.name)
                    || recovery_names.contains(&def.name)
                {
                    continue;
                }
                if body_size(self.grammar, def, self.config)?
                    <= self.config.inline.max_size
                {
                    self.inlinable.insert(def.name.clone());
                }
            }
        }

        // Allocate every standalone definition's label up front so
        // calls resolve regardless of emission order.
        for def in self.grammar.iter() {
            if !self.inlinable.contains(&def.name) {
                let label = self.fresh();
                self.def_labels.insert(def.name.clone(), label);
            }
        }

        let entry_label = self.def_labels[&entry_name];
        self.emit(Inst::Call(entry_label));
        self.emit(Inst::Halt);

        for def in self.grammar.iter() {
            if !self.inlinable.contains(&def.name) {
                self.compile_definition(def)?;
            }
        }

        for (index, name) in recovery_names.iter().enumerate() {
            let label_id = self.program.intern(name);
            let target = self.def_labels[name];
            self.program.recovery.insert(
                label_id,
                RecoveryEntry {
                    target,
                    precedence: index as u16 + 1,
                },
            );
        }

        for (_, path) in self.grammar.files.iter() {
            self.program.source_files.push(path.display().to_string());
        }

        Ok(self.program)
    }

    fn compile_definition(&mut self, def: &Definition) -> Result<(), CompileError> {
        let label = self.def_labels[&def.name];
        self.emit(Inst::Label(label));
        let name_id = self.program.intern(&def.name);
        self.program
            .identifiers
            .insert(self.program.code.len(), name_id);

        match &def.body.kind {
            ExprKind::Capture {
                name: Some(capture_name),
                expr,
            } if *capture_name == def.name => {
                // Same fixed-length gate as the generic Capture arm: a
                // body with a known byte length brackets with the
                // offset form and the procedure ends in a plain return,
                // since no capture frame was opened.
                match fixed_len(expr) {
                    Some(len) if len > 0 && len <= u16::MAX as usize => {
                        self.compile_expr(expr)?;
                        self.emit(Inst::CapNonTerm(name_id, len as u16));
                        self.emit(Inst::Return);
                    }
                    _ => {
                        self.emit(Inst::CapBegin(name_id));
                        self.compile_expr(expr)?;
                        self.emit(Inst::CapReturn);
                    }
                }
            }
            _ => {
                self.compile_expr(&def.body)?;
                self.emit(Inst::Return);
            }
        }
        Ok(())
    }

    fn compile_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match &expr.kind {
            ExprKind::Any => self.emit(Inst::Any),
            ExprKind::Literal(s) => {
                for c in s.chars() {
                    self.emit(Inst::Char(c));
                }
            }
            ExprKind::Identifier(name) => self.compile_identifier(name)?,
            ExprKind::Range(lo, hi) => self.emit(Inst::Range(*lo, *hi)),
            ExprKind::Class(items) => {
                let exprs: Vec<Expr> = items.iter().map(class_item_expr).collect();
                self.compile_choice(&exprs)?;
            }
            ExprKind::Charset(set) => self.emit(Inst::Set(set.clone())),
            ExprKind::Sequence(items) => {
                for item in items {
                    self.compile_expr(item)?;
                }
            }
            ExprKind::Choice(items) => self.compile_choice(items)?,
            ExprKind::Optional(e) => {
                let out = self.fresh();
                self.emit(Inst::Choice(out));
                self.compile_expr(e)?;
                self.emit(Inst::Commit(out));
                self.emit(Inst::Label(out));
            }
            ExprKind::ZeroOrMore(e) => self.compile_zero_or_more(e)?,
            ExprKind::OneOrMore(e) => {
                // One mandatory pass, then the loop. A charset body
                // fuses into set + span.
                if let ExprKind::Charset(set) = &e.kind {
                    self.emit(Inst::Set(set.clone()));
                    self.emit(Inst::Span(set.clone()));
                } else {
                    self.compile_expr(e)?;
                    self.compile_zero_or_more(e)?;
                }
            }
            ExprKind::Not(e) => {
                if self.config.optimize >= 1 {
                    let escape = self.fresh();
                    self.emit(Inst::ChoicePred(escape));
                    self.compile_expr(e)?;
                    self.emit(Inst::FailTwice);
                    self.emit(Inst::Label(escape));
                } else {
                    self.compile_not_naive(|c| c.compile_expr(e))?;
                }
            }
            ExprKind::And(e) => {
                if self.config.optimize >= 1 {
                    let escape = self.fresh();
                    let ok = self.fresh();
                    self.emit(Inst::ChoicePred(escape));
                    self.compile_expr(e)?;
                    self.emit(Inst::BackCommit(ok));
                    self.emit(Inst::Label(escape));
                    self.emit(Inst::Fail);
                    self.emit(Inst::Label(ok));
                } else {
                    self.compile_not_naive(|c| c.compile_not_naive(|c| c.compile_expr(e)))?;
                }
            }
            // Lexification only matters to whitespace injection; the
            // subtree compiles as written.
            ExprKind::Lex(e) => self.compile_expr(e)?,
            ExprKind::Labeled { label, expr } => {
                let on_fail = self.fresh();
                let out = self.fresh();
                self.emit(Inst::Choice(on_fail));
                self.compile_expr(expr)?;
                self.emit(Inst::Commit(out));
                self.emit(Inst::Label(on_fail));
                let label_id = self.program.intern(label);
                self.emit(Inst::Throw(label_id));
                self.emit(Inst::Label(out));
            }
            // A grammar-syntax error placeholder; builds that reach the
            // compiler with one compile it as an unconditional failure.
            ExprKind::Error { .. } => self.emit(Inst::Fail),
            ExprKind::Capture { name, expr } => {
                // Fixed-size bodies bracket with offset captures and
                // skip the capture frame entirely.
                match fixed_len(expr) {
                    Some(len) if len > 0 && len <= u16::MAX as usize => {
                        self.compile_expr(expr)?;
                        match name {
                            None => self.emit(Inst::CapTerm(len as u16)),
                            Some(n) => {
                                let id = self.program.intern(n);
                                self.emit(Inst::CapNonTerm(id, len as u16));
                            }
                        }
                    }
                    _ => {
                        let id = match name {
                            None => StrId::EMPTY,
                            Some(n) => self.program.intern(n),
                        };
                        self.emit(Inst::CapBegin(id));
                        self.compile_expr(expr)?;
                        self.emit(Inst::CapEnd);
                    }
                }
            }
        }
        Ok(())
    }

    fn compile_identifier(&mut self, name: &str) -> Result<(), CompileError> {
        if self.dry {
            let dummy = self.fresh();
            self.emit(Inst::Call(dummy));
            return Ok(());
        }
        if self.inlinable.contains(name) {
            let def = self
                .grammar
                .get(name)
                .ok_or_else(|| CompileError::UndefinedRule(name.to_string()))?;
            return self.compile_expr(&def.body);
        }
        let label = *self
            .def_labels
            .get(name)
            .ok_or_else(|| CompileError::UndefinedRule(name.to_string()))?;
        self.emit(Inst::Call(label));
        Ok(())
    }

    fn compile_choice(&mut self, items: &[Expr]) -> Result<(), CompileError> {
        match items {
            [] => {}
            [single] => self.compile_expr(single)?,
            _ => {
                let out = self.fresh();
                let last = items.len() - 1;
                for item in &items[..last] {
                    let next = self.fresh();
                    self.emit(Inst::Choice(next));
                    self.compile_expr(item)?;
                    self.emit(Inst::Commit(out));
                    self.emit(Inst::Label(next));
                }
                self.compile_expr(&items[last])?;
                self.emit(Inst::Label(out));
            }
        }
        Ok(())
    }

    fn compile_zero_or_more(&mut self, body: &Expr) -> Result<(), CompileError> {
        // A charset body collapses into one span instruction.
        if let ExprKind::Charset(set) = &body.kind {
            self.emit(Inst::Span(set.clone()));
            return Ok(());
        }
        if self.config.optimize >= 1 {
            let out = self.fresh();
            let again = self.fresh();
            self.emit(Inst::Choice(out));
            self.emit(Inst::Label(again));
            self.compile_expr(body)?;
            self.emit(Inst::PartialCommit(again));
            self.emit(Inst::Label(out));
        } else {
            let top = self.fresh();
            let out = self.fresh();
            self.emit(Inst::Label(top));
            self.emit(Inst::Choice(out));
            self.compile_expr(body)?;
            self.emit(Inst::Commit(top));
            self.emit(Inst::Label(out));
        }
        Ok(())
    }

    /// Naive negative lookahead: used at `O0`, and twice for `&e`.
    fn compile_not_naive(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<(), CompileError>,
    ) -> Result<(), CompileError> {
        let escape = self.fresh();
        let through = self.fresh();
        self.emit(Inst::ChoicePred(escape));
        body(self)?;
        self.emit(Inst::Commit(through));
        self.emit(Inst::Label(through));
        self.emit(Inst::Fail);
        self.emit(Inst::Label(escape));
        Ok(())
    }
}

/// Promote a class item to an expression for choice lowering.
fn class_item_expr(item: &ClassItem) -> Expr {
    match item {
        ClassItem::Range(lo, hi) => Expr::synthetic(ExprKind::Range(*lo, *hi)),
        ClassItem::Literal(s) => Expr::synthetic(ExprKind::Literal(s.clone())),
    }
}

/// Statically-known consumed byte length, when one exists.
fn fixed_len(expr: &Expr) -> Option<usize> {
    match &expr.kind {
        ExprKind::Literal(s) => Some(s.len()),
        ExprKind::Charset(set) if set.is_ascii() => Some(1),
        ExprKind::Range(lo, hi) if lo.is_ascii() && hi.is_ascii() => Some(1),
        ExprKind::And(_) | ExprKind::Not(_) => Some(0),
        ExprKind::Lex(e) => fixed_len(e),
        ExprKind::Sequence(items) => {
            items.iter().map(fixed_len).sum::<Option<usize>>()
        }
        ExprKind::Choice(items) => {
            let mut lens = items.iter().map(fixed_len);
            let first = lens.next()??;
            for len in lens {
                if len? != first {
                    return None;
                }
            }
            Some(first)
        }
        _ => None,
    }
}
