use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// A failure while executing a chunk, tagged with the source line of the
/// instruction that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}\n[line {line}] in script")]
pub struct RuntimeError {
    pub message: String,
    pub line: usize,
}

impl RuntimeError {
    pub fn new<S>(message: S, line: usize) -> RuntimeError
    where
        S: Into<String>,
    {
        RuntimeError {
            message: message.into(),
            line,
        }
    }
}
