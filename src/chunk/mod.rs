mod chunk;
mod error;
mod op;

pub use chunk::{Chunk, MAX_CONSTANTS};
pub use error::{DecodeError, Result};
pub use op::{Offset, Op, Reference, Slot};
