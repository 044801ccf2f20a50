use crate::chunk::{DecodeError, Result};

use std::fmt;

/// Index into the constant pool.
pub type Reference = u8;
/// Stack slot relative to the current frame.
pub type Slot = u8;
/// Unsigned jump distance.
pub type Offset = u16;

/// The executable subset of the instruction set, with decoded operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Constant(Reference),

    // Literals
    Nil,
    True,
    False,

    Pop,

    // Local Bindings
    GetLocal(Slot),
    SetLocal(Slot),

    // Global Bindings
    GetGlobal(Reference),
    DefineGlobal(Reference),
    SetGlobal(Reference),

    // Binary Operations
    Equal,
    Greater,
    Less,
    Add,
    Subtract,
    Multiply,
    Divide,

    // Unary Operations
    Not,
    Negate,

    Print,

    // Jumps
    Jump(Offset),
    JumpIfFalse(Offset),
    Loop(Offset),

    Return,
}

impl Op {
    pub const CONSTANT: u8 = 0;
    pub const NIL: u8 = 1;
    pub const TRUE: u8 = 2;
    pub const FALSE: u8 = 3;
    pub const POP: u8 = 4;
    pub const GET_LOCAL: u8 = 5;
    pub const SET_LOCAL: u8 = 6;
    pub const GET_GLOBAL: u8 = 7;
    pub const DEFINE_GLOBAL: u8 = 8;
    pub const SET_GLOBAL: u8 = 9;
    pub const GET_UPVALUE: u8 = 10;
    pub const SET_UPVALUE: u8 = 11;
    pub const GET_PROPERTY: u8 = 12;
    pub const SET_PROPERTY: u8 = 13;
    pub const GET_SUPER: u8 = 14;
    pub const EQUAL: u8 = 15;
    pub const GREATER: u8 = 16;
    pub const LESS: u8 = 17;
    pub const ADD: u8 = 18;
    pub const SUBTRACT: u8 = 19;
    pub const MULTIPLY: u8 = 20;
    pub const DIVIDE: u8 = 21;
    pub const NOT: u8 = 22;
    pub const NEGATE: u8 = 23;
    pub const PRINT: u8 = 24;
    pub const JUMP: u8 = 25;
    pub const JUMP_IF_FALSE: u8 = 26;
    pub const LOOP: u8 = 27;
    pub const CALL: u8 = 28;
    pub const INVOKE: u8 = 29;
    pub const SUPER_INVOKE: u8 = 30;
    pub const CLOSURE: u8 = 31;
    pub const CLOSE_UPVALUE: u8 = 32;
    pub const RETURN: u8 = 33;
    pub const CLASS: u8 = 34;
    pub const INHERIT: u8 = 35;
    pub const METHOD: u8 = 36;

    /// Mnemonic of any assigned opcode byte, reserved ones included.
    pub fn name(byte: u8) -> Option<&'static str> {
        #[rustfmt::skip]
        let name = match byte {
            Op::CONSTANT      => "OP_CONSTANT",
            Op::NIL           => "OP_NIL",
            Op::TRUE          => "OP_TRUE",
            Op::FALSE         => "OP_FALSE",
            Op::POP           => "OP_POP",
            Op::GET_LOCAL     => "OP_GET_LOCAL",
            Op::SET_LOCAL     => "OP_SET_LOCAL",
            Op::GET_GLOBAL    => "OP_GET_GLOBAL",
            Op::DEFINE_GLOBAL => "OP_DEFINE_GLOBAL",
            Op::SET_GLOBAL    => "OP_SET_GLOBAL",
            Op::GET_UPVALUE   => "OP_GET_UPVALUE",
            Op::SET_UPVALUE   => "OP_SET_UPVALUE",
            Op::GET_PROPERTY  => "OP_GET_PROPERTY",
            Op::SET_PROPERTY  => "OP_SET_PROPERTY",
            Op::GET_SUPER     => "OP_GET_SUPER",
            Op::EQUAL         => "OP_EQUAL",
            Op::GREATER       => "OP_GREATER",
            Op::LESS          => "OP_LESS",
            Op::ADD           => "OP_ADD",
            Op::SUBTRACT      => "OP_SUBTRACT",
            Op::MULTIPLY      => "OP_MULTIPLY",
            Op::DIVIDE        => "OP_DIVIDE",
            Op::NOT           => "OP_NOT",
            Op::NEGATE        => "OP_NEGATE",
            Op::PRINT         => "OP_PRINT",
            Op::JUMP          => "OP_JUMP",
            Op::JUMP_IF_FALSE => "OP_JUMP_IF_FALSE",
            Op::LOOP          => "OP_LOOP",
            Op::CALL          => "OP_CALL",
            Op::INVOKE        => "OP_INVOKE",
            Op::SUPER_INVOKE  => "OP_SUPER_INVOKE",
            Op::CLOSURE       => "OP_CLOSURE",
            Op::CLOSE_UPVALUE => "OP_CLOSE_UPVALUE",
            Op::RETURN        => "OP_RETURN",
            Op::CLASS         => "OP_CLASS",
            Op::INHERIT       => "OP_INHERIT",
            Op::METHOD        => "OP_METHOD",
            _ => return None,
        };

        Some(name)
    }

    /// Whether `byte` names an opcode whose operands and semantics are not
    /// defined yet (calls, closures, classes).
    pub fn is_reserved(byte: u8) -> bool {
        matches!(
            byte,
            Op::GET_UPVALUE..=Op::GET_SUPER
                | Op::CALL..=Op::CLOSE_UPVALUE
                | Op::CLASS..=Op::METHOD
        )
    }

    pub fn opcode(&self) -> u8 {
        match self {
            Op::Constant(_) => Op::CONSTANT,
            Op::Nil => Op::NIL,
            Op::True => Op::TRUE,
            Op::False => Op::FALSE,
            Op::Pop => Op::POP,
            Op::GetLocal(_) => Op::GET_LOCAL,
            Op::SetLocal(_) => Op::SET_LOCAL,
            Op::GetGlobal(_) => Op::GET_GLOBAL,
            Op::DefineGlobal(_) => Op::DEFINE_GLOBAL,
            Op::SetGlobal(_) => Op::SET_GLOBAL,
            Op::Equal => Op::EQUAL,
            Op::Greater => Op::GREATER,
            Op::Less => Op::LESS,
            Op::Add => Op::ADD,
            Op::Subtract => Op::SUBTRACT,
            Op::Multiply => Op::MULTIPLY,
            Op::Divide => Op::DIVIDE,
            Op::Not => Op::NOT,
            Op::Negate => Op::NEGATE,
            Op::Print => Op::PRINT,
            Op::Jump(_) => Op::JUMP,
            Op::JumpIfFalse(_) => Op::JUMP_IF_FALSE,
            Op::Loop(_) => Op::LOOP,
            Op::Return => Op::RETURN,
        }
    }

    /// Encoded size in bytes, opcode included.
    pub fn width(&self) -> usize {
        match self {
            Op::Constant(_)
            | Op::GetLocal(_)
            | Op::SetLocal(_)
            | Op::GetGlobal(_)
            | Op::DefineGlobal(_)
            | Op::SetGlobal(_) => 2,
            Op::Jump(_) | Op::JumpIfFalse(_) | Op::Loop(_) => 3,
            _ => 1,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![self.opcode()];

        match self {
            Op::Constant(operand)
            | Op::GetLocal(operand)
            | Op::SetLocal(operand)
            | Op::GetGlobal(operand)
            | Op::DefineGlobal(operand)
            | Op::SetGlobal(operand) => bytes.push(*operand),
            Op::Jump(offset) | Op::JumpIfFalse(offset) | Op::Loop(offset) => {
                bytes.extend_from_slice(&offset.to_be_bytes())
            }
            _ => {}
        }

        bytes
    }

    /// Decodes the instruction starting at `offset`.
    pub fn decode(bytes: &[u8], offset: usize) -> Result<Op> {
        let byte = *bytes
            .get(offset)
            .ok_or(DecodeError::Truncated { offset })?;

        let u8_operand = || {
            bytes
                .get(offset + 1)
                .copied()
                .ok_or(DecodeError::Truncated { offset })
        };
        let u16_operand = || match (bytes.get(offset + 1), bytes.get(offset + 2)) {
            (Some(hi), Some(lo)) => Ok(u16::from_be_bytes([*hi, *lo])),
            _ => Err(DecodeError::Truncated { offset }),
        };

        let op = match byte {
            Op::CONSTANT => Op::Constant(u8_operand()?),
            Op::NIL => Op::Nil,
            Op::TRUE => Op::True,
            Op::FALSE => Op::False,
            Op::POP => Op::Pop,
            Op::GET_LOCAL => Op::GetLocal(u8_operand()?),
            Op::SET_LOCAL => Op::SetLocal(u8_operand()?),
            Op::GET_GLOBAL => Op::GetGlobal(u8_operand()?),
            Op::DEFINE_GLOBAL => Op::DefineGlobal(u8_operand()?),
            Op::SET_GLOBAL => Op::SetGlobal(u8_operand()?),
            Op::EQUAL => Op::Equal,
            Op::GREATER => Op::Greater,
            Op::LESS => Op::Less,
            Op::ADD => Op::Add,
            Op::SUBTRACT => Op::Subtract,
            Op::MULTIPLY => Op::Multiply,
            Op::DIVIDE => Op::Divide,
            Op::NOT => Op::Not,
            Op::NEGATE => Op::Negate,
            Op::PRINT => Op::Print,
            Op::JUMP => Op::Jump(u16_operand()?),
            Op::JUMP_IF_FALSE => Op::JumpIfFalse(u16_operand()?),
            Op::LOOP => Op::Loop(u16_operand()?),
            Op::RETURN => Op::Return,
            byte => match Op::name(byte) {
                Some(name) => return Err(DecodeError::Reserved { name, offset }),
                None => return Err(DecodeError::Unknown { byte, offset }),
            },
        };

        Ok(op)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = Op::name(self.opcode()).unwrap_or("OP_UNKNOWN");

        match self {
            Op::Constant(operand)
            | Op::GetLocal(operand)
            | Op::SetLocal(operand)
            | Op::GetGlobal(operand)
            | Op::DefineGlobal(operand)
            | Op::SetGlobal(operand) => write!(f, "{} {}", name, operand),
            Op::Jump(offset) | Op::JumpIfFalse(offset) | Op::Loop(offset) => {
                write!(f, "{} {}", name, offset)
            }
            _ => write!(f, "{}", name),
        }
    }
}
