//! The grammar intermediate representation.
//!
//! Expressions are a tagged enum rather than a visitor hierarchy, so
//! transforms and the compiler dispatch with plain `match`. Every node
//! carries a [`SourceLocation`]; nodes synthesised by transforms use
//! [`SourceLocation::synthetic`].
//!
//! `Display` prints grammar surface syntax back out. Capture nodes have
//! no surface form and print as `cap(..)` / `cap[Name](..)`; that form
//! exists for transform tests and debug output only.

use indexmap::IndexMap;

use vireo_core::{Charset, FileRegistry, SourceLocation};

/// One item of a `[...]` class before charset folding.
#[derive(Clone, Debug, PartialEq)]
pub enum ClassItem {
    Range(char, char),
    Literal(String),
}

/// A parsing expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: SourceLocation,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    /// `.`: one codepoint, fails at end of input.
    Any,
    /// `'abc'`: a fixed codepoint sequence.
    Literal(String),
    /// A non-terminal call.
    Identifier(String),
    /// One codepoint in `[lo, hi]`.
    Range(char, char),
    /// `[...]`: ordered alternation of ranges and literals.
    Class(Vec<ClassItem>),
    /// Optimised class: O(1) membership bitmap.
    Charset(Charset),
    Sequence(Vec<Expr>),
    /// Prioritised ordered choice.
    Choice(Vec<Expr>),
    Optional(Box<Expr>),
    ZeroOrMore(Box<Expr>),
    OneOrMore(Box<Expr>),
    /// `&e`: positive lookahead, consumes nothing.
    And(Box<Expr>),
    /// `!e`: negative lookahead, consumes nothing.
    Not(Box<Expr>),
    /// `#e`: no automatic whitespace handling underneath.
    Lex(Box<Expr>),
    /// `e^label`: `e / throw(label)`.
    Labeled { label: String, expr: Box<Expr> },
    /// Tree-construction bracket added by the capture transform.
    Capture {
        name: Option<String>,
        expr: Box<Expr>,
    },
    /// Placeholder for a syntax error in the grammar text. The message
    /// is also reported through diagnostics; if the parser salvaged a
    /// partial expression it is kept as the child. Compiles to an
    /// unconditional failure.
    Error {
        message: String,
        expr: Option<Box<Expr>>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, loc: SourceLocation) -> Self {
        Self { kind, loc }
    }

    /// A node with no source of its own (transform output).
    pub fn synthetic(kind: ExprKind) -> Self {
        Self {
            kind,
            loc: SourceLocation::synthetic(),
        }
    }

    /// Binding strength for the surface printer.
    fn precedence(&self) -> u8 {
        match &self.kind {
            ExprKind::Choice(_) => 1,
            ExprKind::Sequence(_) => 2,
            ExprKind::And(_) | ExprKind::Not(_) | ExprKind::Lex(_) => 3,
            ExprKind::Optional(_)
            | ExprKind::ZeroOrMore(_)
            | ExprKind::OneOrMore(_)
            | ExprKind::Labeled { .. } => 4,
            _ => 5,
        }
    }

    fn fmt_at(&self, f: &mut std::fmt::Formatter<'_>, min: u8) -> std::fmt::Result {
        let prec = self.precedence();
        if prec < min {
            write!(f, "(")?;
            self.fmt_at(f, 0)?;
            return write!(f, ")");
        }
        match &self.kind {
            ExprKind::Any => write!(f, "."),
            ExprKind::Literal(s) => write!(f, "'{}'", escape_literal(s)),
            ExprKind::Identifier(name) => write!(f, "{name}"),
            ExprKind::Range(lo, hi) => write!(f, "[{lo}-{hi}]"),
            ExprKind::Class(items) => {
                write!(f, "[")?;
                for item in items {
                    match item {
                        ClassItem::Range(lo, hi) => write!(f, "{lo}-{hi}")?,
                        ClassItem::Literal(s) => write!(f, "{}", escape_literal(s))?,
                    }
                }
                write!(f, "]")
            }
            ExprKind::Charset(set) => write!(f, "{set}"),
            ExprKind::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    item.fmt_at(f, 3)?;
                }
                Ok(())
            }
            ExprKind::Choice(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " / ")?;
                    }
                    item.fmt_at(f, 2)?;
                }
                Ok(())
            }
            ExprKind::Optional(e) => {
                e.fmt_at(f, 5)?;
                write!(f, "?")
            }
            ExprKind::ZeroOrMore(e) => {
                e.fmt_at(f, 5)?;
                write!(f, "*")
            }
            ExprKind::OneOrMore(e) => {
                e.fmt_at(f, 5)?;
                write!(f, "+")
            }
            ExprKind::And(e) => {
                write!(f, "&")?;
                e.fmt_at(f, 4)
            }
            ExprKind::Not(e) => {
                write!(f, "!")?;
                e.fmt_at(f, 4)
            }
            ExprKind::Lex(e) => {
                write!(f, "#")?;
                e.fmt_at(f, 4)
            }
            ExprKind::Labeled { label, expr } => {
                expr.fmt_at(f, 5)?;
                write!(f, "^{label}")
            }
            ExprKind::Capture { name, expr } => {
                match name {
                    Some(n) => write!(f, "cap[{n}](")?,
                    None => write!(f, "cap(")?,
                }
                expr.fmt_at(f, 0)?;
                write!(f, ")")
            }
            ExprKind::Error { .. } => write!(f, "<error>"),
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_at(f, 0)
    }
}

fn escape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            c => out.push(c),
        }
    }
    out
}

/// A grammar production.
#[derive(Clone, Debug, PartialEq)]
pub struct Definition {
    pub name: String,
    pub body: Expr,
    pub loc: SourceLocation,
}

/// An `@import A, B from "./path"` declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct Import {
    pub path: String,
    pub names: Vec<String>,
    pub loc: SourceLocation,
}

/// Top-level container. The [`IndexMap`] keeps the name index and the
/// definition order consistent by construction.
#[derive(Clone, Debug, Default)]
pub struct Grammar {
    pub imports: Vec<Import>,
    pub defs: IndexMap<String, Definition>,
    pub files: FileRegistry,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition unless the name is already taken. Returns
    /// whether the definition was added.
    pub fn add_def(&mut self, def: Definition) -> bool {
        if self.defs.contains_key(&def.name) {
            return false;
        }
        self.defs.insert(def.name.clone(), def);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.defs.get(name)
    }

    /// The match entry point: the first definition.
    pub fn entry(&self) -> Option<&Definition> {
        self.defs.first().map(|(_, def)| def)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Definition> {
        self.defs.values()
    }
}

impl std::fmt::Display for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for import in &self.imports {
            write!(f, "@import ")?;
            for (i, name) in import.names.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{name}")?;
            }
            writeln!(f, " from \"{}\"", import.path)?;
        }
        for def in self.defs.values() {
            writeln!(f, "{} <- {}", def.name, def.body)?;
        }
        Ok(())
    }
}
