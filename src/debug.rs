use crate::chunk::{Chunk, DecodeError, Op};

use std::fmt::Write;

/// Renders every instruction of `chunk` under a `== name ==` header.
pub fn disassemble(chunk: &Chunk, name: &str) -> String {
    let mut out = format!("== {} ==\n", name);

    let mut offset = 0;
    while offset < chunk.len() {
        let (line, next) = disassemble_instruction(chunk, offset);
        out.push_str(&line);
        out.push('\n');
        offset = next;
    }

    out
}

/// Renders the instruction at `offset` and returns the offset of the next
/// one. Bytes that do not decode are shown one at a time.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize) -> (String, usize) {
    let mut out = format!("{:04} ", offset);

    if offset > 0 && chunk.line(offset) == chunk.line(offset - 1) {
        out.push_str("   | ");
    } else {
        let _ = write!(out, "{:4} ", chunk.line(offset));
    }

    let op = match Op::decode(&chunk.code, offset) {
        Ok(op) => op,
        Err(DecodeError::Reserved { name, .. }) => {
            out.push_str(name);
            return (out, offset + 1);
        }
        Err(DecodeError::Unknown { byte, .. }) => {
            let _ = write!(out, "Unknown opcode {}", byte);
            return (out, offset + 1);
        }
        Err(DecodeError::Truncated { .. }) => {
            out.push_str("<truncated>");
            return (out, chunk.len());
        }
    };

    let name = Op::name(op.opcode()).unwrap_or("OP_UNKNOWN");

    let _ = match op {
        Op::Constant(reference)
        | Op::GetGlobal(reference)
        | Op::DefineGlobal(reference)
        | Op::SetGlobal(reference) => match chunk.constants.get(reference as usize) {
            Some(value) => write!(out, "{:<16} {:4} '{}'", name, reference, value),
            None => write!(out, "{:<16} {:4} <missing>", name, reference),
        },
        Op::GetLocal(slot) | Op::SetLocal(slot) => write!(out, "{:<16} {:4}", name, slot),
        Op::Jump(jump) | Op::JumpIfFalse(jump) => {
            write!(out, "{:<16} {:4} -> {}", name, offset, offset + 3 + jump as usize)
        }
        Op::Loop(jump) => {
            let target = (offset + 3) as i64 - jump as i64;
            write!(out, "{:<16} {:4} -> {}", name, offset, target)
        }
        _ => write!(out, "{}", name),
    };

    (out, offset + op.width())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::compiler::compile;
    use crate::value::Value;

    use test_case::test_case;

    fn chunk_of(ops: &[(Op, usize)], constants: Vec<Value>) -> Chunk {
        let mut chunk = Chunk::new();
        for (op, line) in ops {
            chunk.emit(*op, *line);
        }
        chunk.constants = constants;
        chunk
    }

    #[test_case(Op::Return, "0000    1 OP_RETURN" ; "simple")]
    #[test_case(Op::Constant(0), "0000    1 OP_CONSTANT         0 '1.5'" ; "constant")]
    #[test_case(Op::DefineGlobal(1), "0000    1 OP_DEFINE_GLOBAL    1 'name'" ; "global")]
    #[test_case(Op::GetLocal(3), "0000    1 OP_GET_LOCAL        3" ; "local slot")]
    #[test_case(Op::JumpIfFalse(7), "0000    1 OP_JUMP_IF_FALSE    0 -> 10" ; "forward jump")]
    #[test_case(Op::Loop(3), "0000    1 OP_LOOP             0 -> 0" ; "loop")]
    fn test_instruction(op: Op, expected: &str) {
        let chunk = chunk_of(&[(op, 1)], vec![Value::number(1.5), Value::string("name")]);

        assert_eq!(disassemble_instruction(&chunk, 0), (expected.to_string(), op.width()))
    }

    #[test]
    fn same_line_marker() {
        let chunk = chunk_of(&[(Op::Nil, 1), (Op::Pop, 1), (Op::Return, 2)], vec![]);

        assert_eq!(
            disassemble(&chunk, "code"),
            "== code ==\n\
             0000    1 OP_NIL\n\
             0001    | OP_POP\n\
             0002    2 OP_RETURN\n"
        )
    }

    #[test]
    fn reserved_and_unknown_bytes() {
        let mut chunk = Chunk::new();
        chunk.write(Op::CALL, 1);
        chunk.write(200, 1);

        assert_eq!(
            disassemble_instruction(&chunk, 0),
            ("0000    1 OP_CALL".to_string(), 1)
        );
        assert_eq!(
            disassemble_instruction(&chunk, 1),
            ("0001    | Unknown opcode 200".to_string(), 2)
        )
    }

    #[test]
    fn compiled_program() {
        let chunk = compile("var a = 1;\nwhile (a < 3) a = a + 1;").unwrap();
        let listing = disassemble(&chunk, "script");

        assert!(listing.starts_with("== script ==\n0000    1 OP_CONSTANT         1 '1'\n"));
        assert!(listing.contains("OP_LOOP"));
        assert!(listing.ends_with("OP_RETURN\n"))
    }
}
