/*
Tokenizer for monitor expressions.

The rule table is ordered: at each position the first rule that matches
*at that position* wins, so more specific patterns come first (registers,
then hex before decimal, then two char operators before '!').

'-' and '*' are ambiguous, they get reclassified as negate / dereference
when they start the expression or follow another operator or a '('.
*/

use crate::{expr::error::ExprError, log::trace};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

pub const MAX_TOKENS: usize = 32;
pub const MAX_TOKEN_LEN: usize = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    Deref,
    Neg,
    Not,
    Mul,
    Div,
    Plus,
    Minus,
    Eq,
    NotEq,
    And,
    Or,
    Number,
    Hex,
    Register,
}

impl TokenKind {
    pub fn is_operator(self) -> bool {
        self.priority().is_some()
    }
    pub fn is_unary(self) -> bool {
        matches!(self, TokenKind::Deref | TokenKind::Neg | TokenKind::Not)
    }
    // bigger number = binds looser = evaluated later
    pub fn priority(self) -> Option<u8> {
        match self {
            TokenKind::Deref | TokenKind::Neg | TokenKind::Not => Some(1),
            TokenKind::Mul | TokenKind::Div => Some(2),
            TokenKind::Plus | TokenKind::Minus => Some(3),
            TokenKind::Eq | TokenKind::NotEq => Some(4),
            TokenKind::And => Some(5),
            TokenKind::Or => Some(6),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Register => write!(f, "${}", self.text),
            TokenKind::Hex => write!(f, "0x{}", self.text),
            _ => write!(f, "{}", self.text),
        }
    }
}

// None = whitespace, matched and dropped
static RULES: Lazy<Vec<(Regex, Option<TokenKind>)>> = Lazy::new(|| {
    [
        (r"\$[a-zA-Z]+", Some(TokenKind::Register)),
        (r"0[xX][0-9a-fA-F]+", Some(TokenKind::Hex)),
        (r"[0-9]+", Some(TokenKind::Number)),
        (r"[ \t]+", None),
        (r"\+", Some(TokenKind::Plus)),
        (r"-", Some(TokenKind::Minus)),
        (r"\*", Some(TokenKind::Mul)),
        (r"/", Some(TokenKind::Div)),
        (r"\(", Some(TokenKind::LeftParen)),
        (r"\)", Some(TokenKind::RightParen)),
        (r"==", Some(TokenKind::Eq)),
        (r"!=", Some(TokenKind::NotEq)),
        (r"&&", Some(TokenKind::And)),
        (r"\|\|", Some(TokenKind::Or)),
        (r"!", Some(TokenKind::Not)),
    ]
    .into_iter()
    .map(|(pattern, kind)| {
        let re = Regex::new(&format!("^(?:{})", pattern)).expect("bad lexer rule");
        (re, kind)
    })
    .collect()
});

// can a '-' or '*' at this point only be a prefix operator?
fn prefix_position(prev: Option<&Token>) -> bool {
    match prev {
        None => true,
        Some(t) => t.kind.is_operator() || t.kind == TokenKind::LeftParen,
    }
}

pub fn tokenize(text: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut position = 0;
    while position < text.len() {
        let rest = &text[position..];
        let (len, kind) = RULES
            .iter()
            .find_map(|(re, kind)| re.find(rest).map(|m| (m.end(), *kind)))
            .ok_or_else(|| ExprError::Lex {
                text: text.to_string(),
                position,
            })?;
        let matched = &rest[..len];
        trace!(
            "match {:?} at position {} with len {}: {}",
            kind,
            position,
            len,
            matched
        );

        if let Some(kind) = kind {
            let text = match kind {
                TokenKind::Register => &matched[1..],
                TokenKind::Hex => &matched[2..],
                _ => matched,
            };
            if text.len() > MAX_TOKEN_LEN {
                return Err(ExprError::TokenTooLong {
                    position,
                    max: MAX_TOKEN_LEN,
                });
            }
            if tokens.len() == MAX_TOKENS {
                return Err(ExprError::TooManyTokens(MAX_TOKENS));
            }
            let kind = match kind {
                TokenKind::Minus if prefix_position(tokens.last()) => TokenKind::Neg,
                TokenKind::Mul if prefix_position(tokens.last()) => TokenKind::Deref,
                k => k,
            };
            tokens.push(Token {
                kind,
                text: text.to_string(),
            });
        }
        position += len;
    }
    Ok(tokens)
}
