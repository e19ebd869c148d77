use std::ops::Range;

use logos::Logos;

use crate::error::{AdError, Result};

/// Token types for expression text.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub(crate) enum Token {
    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    // Python-style `**`, with `^` accepted as a synonym.
    #[token("**")]
    #[token("^")]
    Pow,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(",")]
    Comma,
}

/// Tokenize `src`, keeping the byte span of every token.
pub(crate) fn tokenize(src: &str) -> Result<Vec<(Token, Range<usize>)>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(src);
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                return Err(AdError::Parse {
                    position: lexer.span().start,
                    message: format!("unexpected input '{}'", lexer.slice()),
                })
            }
        }
    }
    Ok(tokens)
}
