use crate::lexer::{Token, TokenKind};

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompileError>;

/// Where in the token stream an error was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    At(String),
    AtEnd,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::At(lexeme) => write!(f, " at '{}'", lexeme),
            Location::AtEnd => write!(f, " at end"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[line {line}] Error{location}: {message}")]
pub struct CompileError {
    pub line: usize,
    pub location: Location,
    pub message: String,
}

impl CompileError {
    pub fn at<S>(token: &Token, message: S) -> CompileError
    where
        S: Into<String>,
    {
        let location = match token.kind {
            TokenKind::Eof => Location::AtEnd,
            _ => Location::At(token.lexeme.clone()),
        };

        CompileError {
            line: token.line,
            location,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let token = Token::new(TokenKind::Identifier, "foo", 3);
        let error = CompileError::at(&token, "Expect ';' after value.");

        assert_eq!(
            error.to_string(),
            "[line 3] Error at 'foo': Expect ';' after value."
        );

        let error = CompileError::at(&Token::eof(7), "Expect expression.");

        assert_eq!(error.to_string(), "[line 7] Error at end: Expect expression.")
    }
}
