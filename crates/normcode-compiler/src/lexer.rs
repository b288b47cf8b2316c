//! Lexer for concept-text bodies.
//!
//! Plan sources are line-oriented; the line parser strips indentation,
//! marker, and annotations, then hands the concept text to this lexer.
//! Tokens are span-based; text is sliced from the line only when needed.
//!
//! Composite clausal markers (`<:{N}>`, `<$!{axis}>`, `<$(x)%>`, `*N`)
//! lex as single tokens so bracket balancing and name extraction can
//! treat them atomically.

use logos::Logos;

use crate::span::Span;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Clausal markers, longest-match before the single-char tokens.
    /// `<:{N}>` value binding.
    #[regex(r"<:\{[0-9]+\}>")]
    ValueBinding,
    /// `<$!{axis}>` axis tag.
    #[regex(r"<\$!\{[^}]*\}>")]
    AxisTag,
    /// `<$(x)%>` face-value tag. One level of nested parens is allowed so
    /// literal wrappers like `%(1)` survive inside the tag.
    #[regex(r"<\$\(([^()]|\([^)]*\))*\)%>")]
    FaceTag,
    /// `*N` in-loop iteration offset.
    #[regex(r"\*[0-9]+")]
    LoopOffset,

    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("<")]
    LAngle,
    #[token(">")]
    RAngle,

    #[token("::")]
    DoubleColon,
    #[token(":")]
    Colon,
    #[token("$")]
    Dollar,
    #[token("&")]
    Amp,
    #[token("@")]
    At,
    #[token("*")]
    Star,

    /// Free text between structural tokens.
    #[regex(r"[^{}\[\]()<>*$&@:]+")]
    Text,

    /// Coalesced unlexable input.
    Garbage,
}

impl TokenKind {
    pub fn is_clausal(self) -> bool {
        matches!(
            self,
            TokenKind::ValueBinding | TokenKind::AxisTag | TokenKind::FaceTag | TokenKind::LoopOffset
        )
    }

    pub fn open_bracket(self) -> Option<TokenKind> {
        match self {
            TokenKind::RBrace => Some(TokenKind::LBrace),
            TokenKind::RBracket => Some(TokenKind::LBracket),
            TokenKind::RParen => Some(TokenKind::LParen),
            TokenKind::RAngle => Some(TokenKind::LAngle),
            _ => None,
        }
    }

    pub fn is_open_bracket(self) -> bool {
        matches!(
            self,
            TokenKind::LBrace | TokenKind::LBracket | TokenKind::LParen | TokenKind::LAngle
        )
    }
}

/// Span-based token; text is retrieved via [`token_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Tokenize one concept text. Consecutive lexer errors coalesce into single
/// `Garbage` tokens so malformed input stays manageable.
pub fn lex(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(text);
    let mut error_start: Option<usize> = None;

    loop {
        match lexer.next() {
            Some(Ok(kind)) => {
                if let Some(start) = error_start.take() {
                    tokens.push(Token {
                        kind: TokenKind::Garbage,
                        span: Span::new(start, lexer.span().start),
                    });
                }
                tokens.push(Token {
                    kind,
                    span: lexer.span().into(),
                });
            }
            Some(Err(())) => {
                if error_start.is_none() {
                    error_start = Some(lexer.span().start);
                }
            }
            None => {
                if let Some(start) = error_start.take() {
                    tokens.push(Token {
                        kind: TokenKind::Garbage,
                        span: Span::new(start, text.len()),
                    });
                }
                break;
            }
        }
    }

    tokens
}

/// O(1) slice into the lexed text.
#[inline]
pub fn token_text<'t>(text: &'t str, token: &Token) -> &'t str {
    &text[std::ops::Range::<usize>::from(token.span)]
}
