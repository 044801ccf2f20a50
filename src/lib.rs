pub mod chunk;
pub mod compiler;
pub mod debug;
pub mod error;
pub mod lexer;
pub mod repl;
pub mod value;
pub mod vm;

pub use error::{PuntError, Result};
pub use vm::{InterpretResult, VirtualMachine};
