mod error;
mod vm;

pub use error::{Result, RuntimeError};
pub use vm::{InterpretResult, VirtualMachine, FRAMES_MAX, STACK_MAX};
