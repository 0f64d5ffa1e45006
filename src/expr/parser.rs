/*
Reduces a token range to an expression tree.

No grammar as such. A range is either
- a single operand (number, hex number, register)
- a sub expression wrapped in one matching pair of parens
- <lhs> op <rhs> or op <operand>, split at the dominant operator

The dominant operator is the one evaluated last: the loosest binding
operator outside any parens, rightmost one on a tie so that
a-b-c is (a-b)-c. Prefix operators nest the other way, the leftmost
one is outermost so --x is -(-x)

The tree is built once and can be evaluated many times (watchpoints)
*/

use crate::{
    expr::{
        error::ExprError,
        lexer::{tokenize, Token, TokenKind},
    },
    log::trace,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Deref,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Mul,
    Div,
    Add,
    Sub,
    Eq,
    NotEq,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Value(u32),
    Register(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

pub fn parse(text: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(text)?;
    reduce(&tokens)
}

pub fn reduce(tokens: &[Token]) -> Result<Expr, ExprError> {
    trace!(
        "reduce: {}",
        tokens
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    );
    match tokens {
        [] => Err(ExprError::MissingOperand),
        [tok] => operand(tok),
        _ => {
            check_parens(tokens)?;
            if wrapped(tokens) {
                return reduce(&tokens[1..tokens.len() - 1]);
            }
            let dom = dominant_op(tokens)?;
            let op = &tokens[dom];
            if op.kind.is_unary() {
                // something in front of a prefix operator with no binary
                // operator to join them, eg "3 !4"
                if dom != 0 {
                    return Err(ExprError::MissingOperator(op.to_string()));
                }
                let inner = reduce(&tokens[1..])?;
                Ok(Expr::Unary(unary_op(op.kind), Box::new(inner)))
            } else {
                let lhs = reduce(&tokens[..dom])?;
                let rhs = reduce(&tokens[dom + 1..])?;
                Ok(Expr::Binary(bin_op(op.kind), Box::new(lhs), Box::new(rhs)))
            }
        }
    }
}

fn operand(tok: &Token) -> Result<Expr, ExprError> {
    match tok.kind {
        TokenKind::Number => Ok(Expr::Value(parse_radix(&tok.text, 10))),
        TokenKind::Hex => Ok(Expr::Value(parse_radix(&tok.text, 16))),
        TokenKind::Register => Ok(Expr::Register(tok.text.clone())),
        _ => Err(ExprError::BadOperand(tok.to_string())),
    }
}

// the lexer guarantees the digits, overflow just wraps
fn parse_radix(digits: &str, radix: u32) -> u32 {
    digits
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0u32, |n, d| n.wrapping_mul(radix).wrapping_add(d))
}

fn check_parens(tokens: &[Token]) -> Result<(), ExprError> {
    let mut depth = 0i32;
    for tok in tokens {
        match tok.kind {
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return Err(ExprError::UnbalancedParens);
        }
    }
    if depth != 0 {
        return Err(ExprError::UnbalancedParens);
    }
    Ok(())
}

// is the whole range inside one matching pair?
// (1)+(2) starts and ends with parens but is not wrapped
fn wrapped(tokens: &[Token]) -> bool {
    let last = tokens.len() - 1;
    if tokens[0].kind != TokenKind::LeftParen || tokens[last].kind != TokenKind::RightParen {
        return false;
    }
    let mut depth = 0;
    for tok in &tokens[..last] {
        match tok.kind {
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen => depth -= 1,
            _ => {}
        }
        if depth == 0 {
            return false;
        }
    }
    true
}

fn dominant_op(tokens: &[Token]) -> Result<usize, ExprError> {
    let mut depth = 0;
    let mut dominant: Option<(usize, u8)> = None;
    for (i, tok) in tokens.iter().enumerate().rev() {
        match tok.kind {
            TokenKind::RightParen => {
                depth += 1;
                continue;
            }
            TokenKind::LeftParen => {
                depth -= 1;
                continue;
            }
            _ => {}
        }
        if depth != 0 {
            continue;
        }
        let Some(priority) = tok.kind.priority() else {
            continue;
        };
        dominant = match dominant {
            None => Some((i, priority)),
            Some((_, p)) if priority > p => Some((i, priority)),
            // a prefix operator further left wraps the one already found
            Some((d, _)) if tok.kind.is_unary() && tokens[d].kind.is_unary() => Some((i, priority)),
            keep => keep,
        };
    }
    dominant.map(|(i, _)| i).ok_or(ExprError::NoOperator)
}

fn unary_op(kind: TokenKind) -> UnaryOp {
    match kind {
        TokenKind::Neg => UnaryOp::Neg,
        TokenKind::Not => UnaryOp::Not,
        _ => UnaryOp::Deref,
    }
}

fn bin_op(kind: TokenKind) -> BinOp {
    match kind {
        TokenKind::Mul => BinOp::Mul,
        TokenKind::Div => BinOp::Div,
        TokenKind::Plus => BinOp::Add,
        TokenKind::Minus => BinOp::Sub,
        TokenKind::Eq => BinOp::Eq,
        TokenKind::NotEq => BinOp::NotEq,
        TokenKind::And => BinOp::And,
        _ => BinOp::Or,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn val(v: u32) -> Box<Expr> {
        Box::new(Expr::Value(v))
    }

    #[test]
    fn precedence_shapes_tree() {
        assert_eq!(
            parse("1+2*3").unwrap(),
            Expr::Binary(
                BinOp::Add,
                val(1),
                Box::new(Expr::Binary(BinOp::Mul, val(2), val(3)))
            )
        );
    }

    #[test]
    fn left_associative() {
        assert_eq!(
            parse("10-3-2").unwrap(),
            Expr::Binary(
                BinOp::Sub,
                Box::new(Expr::Binary(BinOp::Sub, val(10), val(3))),
                val(2)
            )
        );
    }

    #[test]
    fn prefix_chains_nest_outer_to_inner() {
        assert_eq!(
            parse("--5").unwrap(),
            Expr::Unary(
                UnaryOp::Neg,
                Box::new(Expr::Unary(UnaryOp::Neg, val(5)))
            )
        );
        assert_eq!(
            parse("-*8").unwrap(),
            Expr::Unary(
                UnaryOp::Neg,
                Box::new(Expr::Unary(UnaryOp::Deref, val(8)))
            )
        );
    }

    #[test]
    fn prefix_binds_tighter_than_binary() {
        assert_eq!(
            parse("-1*2").unwrap(),
            Expr::Binary(
                BinOp::Mul,
                Box::new(Expr::Unary(UnaryOp::Neg, val(1))),
                val(2)
            )
        );
    }

    #[test]
    fn operands() {
        assert_eq!(parse("0x1f").unwrap(), Expr::Value(0x1f));
        assert_eq!(parse("0XFF").unwrap(), Expr::Value(0xff));
        assert_eq!(parse("$eax").unwrap(), Expr::Register("eax".to_string()));
        // wraps at 32 bits
        assert_eq!(parse("4294967297").unwrap(), Expr::Value(1));
        assert_eq!(parse("0x100000001").unwrap(), Expr::Value(1));
    }

    #[test]
    fn parens() {
        assert_eq!(parse("((7))").unwrap(), Expr::Value(7));
        assert_eq!(
            parse("(1)+(2)").unwrap(),
            Expr::Binary(BinOp::Add, val(1), val(2))
        );
        assert_eq!(parse("(1"), Err(ExprError::UnbalancedParens));
        assert_eq!(parse("1)"), Err(ExprError::UnbalancedParens));
        assert_eq!(parse(")1("), Err(ExprError::UnbalancedParens));
        assert_eq!(parse("()"), Err(ExprError::MissingOperand));
    }

    #[test]
    fn malformed() {
        assert_eq!(parse(""), Err(ExprError::MissingOperand));
        assert_eq!(parse("1+"), Err(ExprError::MissingOperand));
        assert_eq!(parse("+1"), Err(ExprError::MissingOperand));
        assert_eq!(parse("-"), Err(ExprError::BadOperand("-".to_string())));
        assert_eq!(parse("1 2"), Err(ExprError::NoOperator));
        assert_eq!(parse("(1)(2)"), Err(ExprError::NoOperator));
        assert_eq!(parse("3 !4"), Err(ExprError::MissingOperator("!".to_string())));
        assert_eq!(
            parse("1 + @"),
            Err(ExprError::Lex {
                text: "1 + @".to_string(),
                position: 4
            })
        );
    }
}
