//! Recursive-descent parser for the grammar surface language.
//!
//! Builds the IR directly. Syntax errors are collected as diagnostics
//! and the parser resynchronises at the next definition header, so
//! several errors can surface from one pass.

use vireo_core::{FileId, LineIndex, Range, SourceLocation};

use crate::ast::{ClassItem, Definition, Expr, ExprKind, Grammar, Import};
use crate::diagnostics::Diagnostics;
use crate::lexer::{Token, TokenKind, lex, token_text};

/// Result of parsing one source text.
#[derive(Debug)]
pub struct ParseOutcome {
    pub grammar: Grammar,
    pub diagnostics: Diagnostics,
}

/// Parse a grammar text. `file` is recorded in every node's source
/// location; register it with the caller's [`vireo_core::FileRegistry`].
pub fn parse(source: &str, file: FileId) -> ParseOutcome {
    let tokens = lex(source);
    let parser = Parser {
        source,
        tokens,
        pos: 0,
        file,
        line_index: LineIndex::new(source),
        diagnostics: Diagnostics::new(),
        grammar: Grammar::new(),
    };
    parser.run()
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    file: FileId,
    line_index: LineIndex,
    diagnostics: Diagnostics,
    grammar: Grammar,
}

impl<'s> Parser<'s> {
    fn run(mut self) -> ParseOutcome {
        while !self.at_eof() {
            if self.at(TokenKind::ImportKw) {
                self.parse_import();
            } else if self.at_definition_start() {
                self.parse_definition();
            } else {
                let token = self.tokens[self.pos];
                self.error("expected a definition", token.span);
                self.recover();
            }
        }
        ParseOutcome {
            grammar: self.grammar,
            diagnostics: self.diagnostics,
        }
    }

    // Token plumbing --------------------------------------------------

    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    fn peek2(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == Some(kind)
    }

    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos];
        self.pos += 1;
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Option<Token> {
        if self.at(kind) {
            return Some(self.bump());
        }
        let span = self.here();
        self.error(format!("expected {what}"), span);
        None
    }

    /// Span to anchor an error at: the current token, or a point at the
    /// end of input.
    fn here(&self) -> Range {
        match self.tokens.get(self.pos) {
            Some(t) => t.span,
            None => Range::new(self.source.len(), self.source.len()),
        }
    }

    fn prev_end(&self) -> usize {
        self.tokens[..self.pos]
            .last()
            .map(|t| t.span.end)
            .unwrap_or(0)
    }

    fn error(&mut self, msg: impl Into<String>, span: Range) {
        self.diagnostics.error(msg, self.file, span).emit();
    }

    fn loc(&self, start: usize, end: usize) -> SourceLocation {
        SourceLocation::new(self.file, self.line_index.span(self.source, start, end))
    }

    fn at_definition_start(&self) -> bool {
        self.at(TokenKind::Identifier) && self.peek2() == Some(TokenKind::Arrow)
    }

    /// Skip forward to the next plausible definition or import header.
    fn recover(&mut self) {
        while !self.at_eof() && !self.at(TokenKind::ImportKw) && !self.at_definition_start() {
            self.pos += 1;
        }
    }

    // Grammar items ---------------------------------------------------

    fn parse_import(&mut self) {
        let start = self.bump().span.start; // @import
        let mut names = Vec::new();
        loop {
            match self.expect(TokenKind::Identifier, "an imported rule name") {
                Some(token) => names.push(token_text(self.source, &token).to_string()),
                None => {
                    self.recover();
                    return;
                }
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        match self.peek() {
            Some(TokenKind::Identifier)
                if token_text(self.source, &self.tokens[self.pos]) == "from" =>
            {
                self.pos += 1;
            }
            _ => {
                let span = self.here();
                self.error("expected `from`", span);
                self.recover();
                return;
            }
        }
        let Some(path_token) = self.expect(TokenKind::Literal, "a quoted import path") else {
            self.recover();
            return;
        };
        let path = self.unescape_literal(&path_token);
        let end = path_token.span.end;
        self.grammar.imports.push(Import {
            path,
            names,
            loc: self.loc(start, end),
        });
    }

    fn parse_definition(&mut self) {
        let name_token = self.bump();
        let name = token_text(self.source, &name_token).to_string();
        self.bump(); // <-
        let body = self.parse_choice();
        let loc = self.loc(name_token.span.start, self.prev_end());
        if let Some(first) = self.grammar.get(&name) {
            let first_loc = first.loc;
            self.diagnostics
                .error(
                    format!("rule `{name}` is defined twice"),
                    self.file,
                    name_token.span,
                )
                .related_to(
                    "first defined here",
                    first_loc.file,
                    first_loc.span.range(),
                )
                .emit();
            return;
        }
        self.grammar.add_def(Definition { name, body, loc });
    }

    // Expressions -----------------------------------------------------

    fn parse_choice(&mut self) -> Expr {
        let start = self.here().start;
        let mut items = vec![self.parse_sequence()];
        while self.eat(TokenKind::Slash) {
            items.push(self.parse_sequence());
        }
        if items.len() == 1 {
            items.pop().expect("one item")
        } else {
            Expr::new(
                ExprKind::Choice(items),
                self.loc(start, self.prev_end()),
            )
        }
    }

    fn parse_sequence(&mut self) -> Expr {
        let start = self.here().start;
        let mut items = Vec::new();
        while self.starts_expr() {
            items.push(self.parse_prefix());
        }
        match items.len() {
            0 => {
                let span = self.here();
                self.error("expected an expression", span);
                Expr::new(
                    ExprKind::Error {
                        message: "expected an expression".to_string(),
                        expr: None,
                    },
                    self.loc(start, start),
                )
            }
            1 => items.pop().expect("one item"),
            _ => Expr::new(
                ExprKind::Sequence(items),
                self.loc(start, self.prev_end()),
            ),
        }
    }

    fn starts_expr(&self) -> bool {
        match self.peek() {
            Some(
                TokenKind::Amp
                | TokenKind::Bang
                | TokenKind::Hash
                | TokenKind::LParen
                | TokenKind::Literal
                | TokenKind::Class
                | TokenKind::Dot,
            ) => true,
            Some(TokenKind::Identifier) => self.peek2() != Some(TokenKind::Arrow),
            _ => false,
        }
    }

    fn parse_prefix(&mut self) -> Expr {
        let start = self.here().start;
        let kind = match self.peek() {
            Some(TokenKind::Amp) => ExprKind::And,
            Some(TokenKind::Bang) => ExprKind::Not,
            Some(TokenKind::Hash) => ExprKind::Lex,
            _ => return self.parse_suffix(),
        };
        self.pos += 1;
        let inner = self.parse_prefix();
        let loc = self.loc(start, self.prev_end());
        Expr::new(kind(Box::new(inner)), loc)
    }

    fn parse_suffix(&mut self) -> Expr {
        let start = self.here().start;
        let mut expr = self.parse_primary();
        loop {
            let kind = match self.peek() {
                Some(TokenKind::Question) => {
                    self.pos += 1;
                    ExprKind::Optional(Box::new(expr))
                }
                Some(TokenKind::Star) => {
                    self.pos += 1;
                    ExprKind::ZeroOrMore(Box::new(expr))
                }
                Some(TokenKind::Plus) => {
                    self.pos += 1;
                    ExprKind::OneOrMore(Box::new(expr))
                }
                Some(TokenKind::Caret) => {
                    self.pos += 1;
                    match self.expect(TokenKind::Identifier, "a label name after `^`") {
                        Some(token) => ExprKind::Labeled {
                            label: token_text(self.source, &token).to_string(),
                            expr: Box::new(expr),
                        },
                        None => return expr,
                    }
                }
                _ => return expr,
            };
            expr = Expr::new(kind, self.loc(start, self.prev_end()));
        }
    }

    fn parse_primary(&mut self) -> Expr {
        let token = match self.tokens.get(self.pos) {
            Some(t) => *t,
            None => {
                let span = self.here();
                self.error("expected an expression", span);
                return Expr::new(
                    ExprKind::Error {
                        message: "expected an expression".to_string(),
                        expr: None,
                    },
                    self.loc(self.source.len(), self.source.len()),
                );
            }
        };
        let loc = self.loc(token.span.start, token.span.end);
        match token.kind {
            TokenKind::Dot => {
                self.pos += 1;
                Expr::new(ExprKind::Any, loc)
            }
            TokenKind::Identifier => {
                self.pos += 1;
                let name = token_text(self.source, &token).to_string();
                Expr::new(ExprKind::Identifier(name), loc)
            }
            TokenKind::Literal => {
                self.pos += 1;
                let value = self.unescape_literal(&token);
                Expr::new(ExprKind::Literal(value), loc)
            }
            TokenKind::Class => {
                self.pos += 1;
                let items = self.parse_class(&token);
                Expr::new(ExprKind::Class(items), loc)
            }
            TokenKind::LParen => {
                let start = token.span.start;
                self.pos += 1;
                let inner = self.parse_choice();
                self.expect(TokenKind::RParen, "`)`");
                Expr::new(inner.kind, self.loc(start, self.prev_end()))
            }
            _ => {
                self.pos += 1;
                self.error("expected an expression", token.span);
                Expr::new(
                    ExprKind::Error {
                        message: "expected an expression".to_string(),
                        expr: None,
                    },
                    loc,
                )
            }
        }
    }

    // Token payloads --------------------------------------------------

    /// Strip quotes and process escapes of a literal token.
    fn unescape_literal(&mut self, token: &Token) -> String {
        let text = token_text(self.source, token);
        let inner = &text[1..text.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.char_indices();
        while let Some((offset, c)) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some((_, escaped)) => match unescape_char(escaped) {
                    Some(resolved) => out.push(resolved),
                    None => {
                        let at = token.span.start + 1 + offset;
                        self.error(
                            format!("unknown escape `\\{escaped}`"),
                            Range::new(at, at + 1 + escaped.len_utf8()),
                        );
                        out.push(escaped);
                    }
                },
                None => out.push('\\'),
            }
        }
        out
    }

    /// Parse the inside of a `[...]` token into class items.
    fn parse_class(&mut self, token: &Token) -> Vec<ClassItem> {
        let text = token_text(self.source, token);
        let inner = &text[1..text.len() - 1];

        // Decode escapes first, keeping the source offset of each
        // resulting character for error spans. The bool marks escaped
        // characters, so `\-` never acts as a range separator.
        let mut chars: Vec<(usize, char, bool)> = Vec::new();
        let mut iter = inner.char_indices();
        while let Some((offset, c)) = iter.next() {
            if c != '\\' {
                chars.push((offset, c, false));
                continue;
            }
            match iter.next() {
                Some((_, escaped)) => match unescape_char(escaped) {
                    Some(resolved) => chars.push((offset, resolved, true)),
                    None => {
                        let at = token.span.start + 1 + offset;
                        self.error(
                            format!("unknown escape `\\{escaped}`"),
                            Range::new(at, at + 1 + escaped.len_utf8()),
                        );
                        chars.push((offset, escaped, true));
                    }
                },
                None => chars.push((offset, '\\', true)),
            }
        }

        let mut items = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            // `a-z` range: an unescaped dash with a character on both sides.
            if i + 2 < chars.len() && chars[i + 1].1 == '-' && !chars[i + 1].2 {
                let (lo_off, lo, _) = chars[i];
                let (hi_off, hi, _) = chars[i + 2];
                if lo > hi {
                    let start = token.span.start + 1 + lo_off;
                    let end = token.span.start + 1 + hi_off + hi.len_utf8();
                    self.error(
                        format!("inverted character range `{lo}-{hi}`"),
                        Range::new(start, end),
                    );
                } else {
                    items.push(ClassItem::Range(lo, hi));
                }
                i += 3;
            } else {
                let (_, c, _) = chars[i];
                items.push(ClassItem::Literal(c.to_string()));
                i += 1;
            }
        }
        items
    }
}

fn unescape_char(c: char) -> Option<char> {
    Some(match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        '\\' => '\\',
        '\'' => '\'',
        '"' => '"',
        '[' => '[',
        ']' => ']',
        '-' => '-',
        '/' => '/',
        _ => return None,
    })
}
