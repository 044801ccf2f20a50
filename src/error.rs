use crate::compiler::CompileError;
use crate::lexer::ScanError;
use crate::vm::RuntimeError;

use itertools::Itertools;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PuntError>;

/// Everything that can go wrong between reading source text and finishing
/// its execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PuntError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("{}", .0.iter().join("\n"))]
    Compile(Vec<CompileError>),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl From<Vec<CompileError>> for PuntError {
    fn from(errors: Vec<CompileError>) -> Self {
        PuntError::Compile(errors)
    }
}
