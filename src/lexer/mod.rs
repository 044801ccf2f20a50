mod error;
mod lexer;
mod token;

pub use error::{Result, ScanError};
pub use lexer::Lexer;
pub use token::{Literal, Token, TokenKind};
