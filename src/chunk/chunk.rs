use crate::chunk::{Op, Reference, Result};
use crate::value::Value;

/// Constant pool entries are addressed by a single byte.
pub const MAX_CONSTANTS: usize = u8::MAX as usize + 1;

/// Instruction bytes, the source line of every byte and the constant pool.
/// `code` and `lines` always have the same length.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    pub code: Vec<u8>,
    pub lines: Vec<usize>,
    pub constants: Vec<Value>,
}

impl Chunk {
    pub fn new() -> Chunk {
        Chunk::default()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn write(&mut self, byte: u8, line: usize) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Appends `op` and returns the offset it was written at.
    pub fn emit(&mut self, op: Op, line: usize) -> usize {
        let offset = self.code.len();
        for byte in op.encode() {
            self.write(byte, line);
        }
        offset
    }

    /// Returns `None` once the pool is full.
    pub fn add_constant(&mut self, value: Value) -> Option<Reference> {
        if self.constants.len() >= MAX_CONSTANTS {
            return None;
        }

        self.constants.push(value);
        Some((self.constants.len() - 1) as Reference)
    }

    /// Overwrites the two bytes at `offset` with `value`, big-endian.
    pub fn patch_u16(&mut self, offset: usize, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.code[offset] = hi;
        self.code[offset + 1] = lo;
    }

    pub fn read_u8(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        match (self.code.get(offset), self.code.get(offset + 1)) {
            (Some(hi), Some(lo)) => Some(u16::from_be_bytes([*hi, *lo])),
            _ => None,
        }
    }

    pub fn line(&self, offset: usize) -> usize {
        self.lines.get(offset).copied().unwrap_or(0)
    }

    pub fn decode(&self) -> Result<Vec<Op>> {
        let mut ops = vec![];
        let mut offset = 0;

        while offset < self.code.len() {
            let op = Op::decode(&self.code, offset)?;
            offset += op.width();
            ops.push(op);
        }

        Ok(ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_follow_every_byte() {
        let mut chunk = Chunk::new();
        chunk.emit(Op::Constant(0), 1);
        chunk.emit(Op::Jump(3), 2);
        chunk.emit(Op::Return, 3);

        assert_eq!(chunk.code.len(), chunk.lines.len());
        assert_eq!(chunk.lines, vec![1, 1, 2, 2, 2, 3])
    }

    #[test]
    fn emit_returns_offset() {
        let mut chunk = Chunk::new();

        assert_eq!(chunk.emit(Op::Nil, 1), 0);
        assert_eq!(chunk.emit(Op::JumpIfFalse(0xffff), 1), 1);
        assert_eq!(chunk.emit(Op::Pop, 1), 4)
    }

    #[test]
    fn patch_and_decode() {
        let mut chunk = Chunk::new();
        let jump = chunk.emit(Op::JumpIfFalse(0xffff), 1);
        chunk.emit(Op::Pop, 1);
        chunk.patch_u16(jump + 1, 1);
        chunk.emit(Op::Return, 1);

        assert_eq!(chunk.read_u16(jump + 1), Some(1));
        assert_eq!(
            chunk.decode().unwrap(),
            vec![Op::JumpIfFalse(1), Op::Pop, Op::Return]
        )
    }

    #[test]
    fn constant_pool_is_byte_addressed() {
        let mut chunk = Chunk::new();

        for i in 0..MAX_CONSTANTS {
            assert_eq!(chunk.add_constant(Value::number(i as f64)), Some(i as u8));
        }

        assert_eq!(chunk.add_constant(Value::Nil), None);
        assert_eq!(chunk.constants.len(), MAX_CONSTANTS)
    }
}
