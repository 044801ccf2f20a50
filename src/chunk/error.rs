use thiserror::Error;

pub type Result<T> = std::result::Result<T, DecodeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode {byte} at offset {offset}")]
    Unknown { byte: u8, offset: usize },

    #[error("reserved opcode {name} at offset {offset}")]
    Reserved { name: &'static str, offset: usize },

    #[error("truncated instruction at offset {offset}")]
    Truncated { offset: usize },
}
