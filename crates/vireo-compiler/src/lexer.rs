//! Lexer for the grammar surface language.
//!
//! Produces span-based tokens; text is sliced from the source only when
//! the parser needs it. Consecutive unrecognised characters coalesce
//! into single `Garbage` tokens so malformed input stays manageable.

use logos::Logos;

use vireo_core::Range;

/// Token kinds, derived with `logos`. Whitespace and `//` comments are
/// trivia and never reach the parser.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
pub enum TokenKind {
    #[token("<-")]
    Arrow,
    #[token("/")]
    Slash,
    #[token("&")]
    Amp,
    #[token("!")]
    Bang,
    #[token("?")]
    Question,
    #[token("*")]
    Star,
    #[token("+")]
    Plus,
    #[token("#")]
    Hash,
    #[token("^")]
    Caret,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token("@import")]
    ImportKw,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,
    #[regex(r"'(?:\\.|[^'\\])*'")]
    #[regex(r#""(?:\\.|[^"\\])*""#)]
    Literal,
    #[regex(r"\[(?:\\.|[^\]\\])*\]")]
    Class,
    /// Coalesced run of unrecognised characters.
    Garbage,
}

/// A token: kind plus byte span into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range,
}

impl Token {
    pub fn new(kind: TokenKind, span: Range) -> Self {
        Self { kind, span }
    }
}

/// Slice the source text a token covers.
pub fn token_text<'s>(source: &'s str, token: &Token) -> &'s str {
    &source[token.span.start..token.span.end]
}

/// Tokenize, coalescing lexer errors into `Garbage` tokens.
pub fn lex(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);
    let mut garbage_start: Option<usize> = None;

    loop {
        match lexer.next() {
            Some(Ok(kind)) => {
                if let Some(start) = garbage_start.take() {
                    tokens.push(Token::new(
                        TokenKind::Garbage,
                        Range::new(start, lexer.span().start),
                    ));
                }
                let span = lexer.span();
                tokens.push(Token::new(kind, Range::new(span.start, span.end)));
            }
            Some(Err(())) => {
                if garbage_start.is_none() {
                    garbage_start = Some(lexer.span().start);
                }
            }
            None => {
                if let Some(start) = garbage_start.take() {
                    tokens.push(Token::new(
                        TokenKind::Garbage,
                        Range::new(start, source.len()),
                    ));
                }
                break;
            }
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_a_definition() {
        assert_eq!(
            kinds("G <- 'a' / [0-9]+ . // trailing\n"),
            vec![
                TokenKind::Identifier,
                TokenKind::Arrow,
                TokenKind::Literal,
                TokenKind::Slash,
                TokenKind::Class,
                TokenKind::Plus,
                TokenKind::Dot,
            ]
        );
    }

    #[test]
    fn lexes_imports_and_labels() {
        assert_eq!(
            kinds("@import A, B from \"./x.peg\"\nG <- A^err"),
            vec![
                TokenKind::ImportKw,
                TokenKind::Identifier,
                TokenKind::Comma,
                TokenKind::Identifier,
                TokenKind::Identifier, // `from` is contextual
                TokenKind::Literal,
                TokenKind::Identifier,
                TokenKind::Arrow,
                TokenKind::Identifier,
                TokenKind::Caret,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn escaped_quotes_stay_in_one_literal() {
        let tokens = lex(r"'a\'b'");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Literal);
    }

    #[test]
    fn garbage_runs_coalesce() {
        let tokens = lex("G <- $$$'a'");
        let garbage: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Garbage)
            .collect();
        assert_eq!(garbage.len(), 1);
        assert_eq!(garbage[0].span, Range::new(5, 8));
    }
}
