mod compiler;
mod error;
mod rules;
mod unit;

pub use compiler::{compile, Compiler};
pub use error::{CompileError, Location, Result};
pub use rules::Precedence;
pub use unit::{FunctionKind, MAX_LOCALS};
