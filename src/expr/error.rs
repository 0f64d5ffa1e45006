use thiserror::Error;

use crate::monitor::machine::MemError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    // lexing
    #[error("no match at position {}\n  {}\n  {}", .position, .text, caret(.position))]
    Lex { text: String, position: usize },
    #[error("expression has more than {0} tokens")]
    TooManyTokens(usize),
    #[error("token at position {position} is longer than {max} characters")]
    TokenTooLong { position: usize, max: usize },

    // parsing
    #[error("unbalanced parentheses")]
    UnbalancedParens,
    #[error("missing operand")]
    MissingOperand,
    #[error("missing operator before '{0}'")]
    MissingOperator(String),
    #[error("'{0}' is not a value")]
    BadOperand(String),
    #[error("no operator found in sub expression")]
    NoOperator,

    // evaluation
    #[error("division by zero")]
    DivisionByZero,
    #[error("unknown register '${0}'")]
    UnknownRegister(String),
    #[error(transparent)]
    Memory(#[from] MemError),
}

// points at the column a lex error happened at
fn caret(position: &usize) -> String {
    format!("{:>1$}", "^", position + 1)
}

impl ExprError {
    /// Errors raised before any machine state is consulted.
    pub fn is_syntax(&self) -> bool {
        !matches!(
            self,
            ExprError::DivisionByZero | ExprError::UnknownRegister(_) | ExprError::Memory(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_points_at_column() {
        let e = ExprError::Lex {
            text: "1 + @".to_string(),
            position: 4,
        };
        assert_eq!(e.to_string(), "no match at position 4\n  1 + @\n      ^");
        assert!(e.is_syntax());
    }
}
