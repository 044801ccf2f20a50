use crate::chunk::{Chunk, Op};
use crate::compiler::compile;
use crate::debug::disassemble_instruction;
use crate::error::PuntError;
use crate::value::Value;
use crate::vm::{Result, RuntimeError};

use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use itertools::Itertools;
use tracing::{trace, Level};

pub const FRAMES_MAX: usize = 64;
pub const STACK_MAX: usize = FRAMES_MAX * (u8::MAX as usize + 1);

/// Outcome of `VirtualMachine::interpret`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretResult {
    Ok,
    CompileError,
    RuntimeError,
}

impl InterpretResult {
    /// Process exit status, sysexits style.
    pub fn exit_code(&self) -> i32 {
        match self {
            InterpretResult::Ok => 0,
            InterpretResult::CompileError => 65,
            InterpretResult::RuntimeError => 70,
        }
    }
}

struct CallFrame {
    ip: usize,
    slots: usize,
}

pub struct VirtualMachine<W = io::Stdout> {
    stack: Vec<Value>,
    globals: HashMap<Rc<str>, Value>,
    frame: CallFrame,
    line: usize,
    output: W,
}

impl VirtualMachine {
    pub fn new() -> VirtualMachine {
        VirtualMachine::with_output(io::stdout())
    }
}

impl Default for VirtualMachine {
    fn default() -> Self {
        VirtualMachine::new()
    }
}

impl<W: Write> VirtualMachine<W> {
    /// `print` statements write to `output`.
    pub fn with_output(output: W) -> VirtualMachine<W> {
        VirtualMachine {
            stack: Vec::with_capacity(STACK_MAX),
            globals: HashMap::new(),
            frame: CallFrame { ip: 0, slots: 0 },
            line: 0,
            output,
        }
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Compiles and runs `source`, printing any diagnostic to stderr.
    pub fn interpret(&mut self, source: &str) -> InterpretResult {
        match self.execute(source) {
            Ok(()) => InterpretResult::Ok,
            Err(error) => {
                eprintln!("{}", error);

                match error {
                    PuntError::Runtime(_) => InterpretResult::RuntimeError,
                    PuntError::Scan(_) | PuntError::Compile(_) => InterpretResult::CompileError,
                }
            }
        }
    }

    pub fn execute(&mut self, source: &str) -> crate::error::Result<()> {
        let chunk = compile(source)?;
        self.run(&chunk)?;
        Ok(())
    }

    /// Executes `chunk` from its first byte until `OP_RETURN`. Globals
    /// survive between runs, the operand stack does not.
    pub fn run(&mut self, chunk: &Chunk) -> Result<()> {
        self.stack.clear();
        self.frame = CallFrame { ip: 0, slots: 0 };

        loop {
            if tracing::enabled!(Level::TRACE) {
                let (instruction, _) = disassemble_instruction(chunk, self.frame.ip);
                trace!(stack = %format!("[{}]", self.stack.iter().join(", ")), "{}", instruction);
            }

            self.line = chunk.line(self.frame.ip);
            let op = self.read_u8(chunk)?;

            match op {
                Op::CONSTANT => {
                    let value = self.read_constant(chunk)?;
                    self.push(value)?
                }
                Op::NIL => self.push(Value::Nil)?,
                Op::TRUE => self.push(Value::Bool(true))?,
                Op::FALSE => self.push(Value::Bool(false))?,
                Op::POP => {
                    self.pop()?;
                }
                Op::GET_LOCAL => self.get_local(chunk)?,
                Op::SET_LOCAL => self.set_local(chunk)?,
                Op::GET_GLOBAL => self.get_global(chunk)?,
                Op::DEFINE_GLOBAL => self.define_global(chunk)?,
                Op::SET_GLOBAL => self.set_global(chunk)?,
                Op::EQUAL => {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    self.push(Value::Bool(left == right))?
                }
                Op::GREATER
                | Op::LESS
                | Op::ADD
                | Op::SUBTRACT
                | Op::MULTIPLY
                | Op::DIVIDE => self.bin_op(op)?,
                Op::NOT => {
                    let value = self.pop()?;
                    self.push(Value::Bool(value.is_falsey()))?
                }
                Op::NEGATE => self.negate()?,
                Op::PRINT => self.print()?,
                Op::JUMP => {
                    let offset = self.read_u16(chunk)?;
                    self.frame.ip += offset as usize;
                }
                Op::JUMP_IF_FALSE => {
                    let offset = self.read_u16(chunk)?;
                    if self.peek()?.is_falsey() {
                        self.frame.ip += offset as usize;
                    }
                }
                Op::LOOP => {
                    let offset = self.read_u16(chunk)?;
                    self.frame.ip = self
                        .frame
                        .ip
                        .checked_sub(offset as usize)
                        .ok_or_else(|| self.error("Loop target before start of chunk."))?;
                }
                Op::RETURN => return Ok(()),
                op => {
                    return Err(match Op::name(op) {
                        Some(name) if Op::is_reserved(op) => {
                            self.error(format!("Unimplemented opcode {}.", name))
                        }
                        _ => self.error(format!("Unknown opcode {}.", op)),
                    })
                }
            }
        }
    }

    fn error<S: Into<String>>(&self, message: S) -> RuntimeError {
        RuntimeError::new(message, self.line)
    }

    fn read_u8(&mut self, chunk: &Chunk) -> Result<u8> {
        let byte = chunk
            .read_u8(self.frame.ip)
            .ok_or_else(|| self.error("Unexpected end of bytecode."))?;
        self.frame.ip += 1;
        Ok(byte)
    }

    fn read_u16(&mut self, chunk: &Chunk) -> Result<u16> {
        let value = chunk
            .read_u16(self.frame.ip)
            .ok_or_else(|| self.error("Unexpected end of bytecode."))?;
        self.frame.ip += 2;
        Ok(value)
    }

    fn read_constant(&mut self, chunk: &Chunk) -> Result<Value> {
        let reference = self.read_u8(chunk)? as usize;
        chunk
            .constants
            .get(reference)
            .cloned()
            .ok_or_else(|| self.error(format!("Invalid constant {}.", reference)))
    }

    fn read_name(&mut self, chunk: &Chunk) -> Result<Rc<str>> {
        match self.read_constant(chunk)? {
            Value::String(name) => Ok(name),
            value => Err(self.error(format!("Expect variable name, got {}.", value.type_name()))),
        }
    }

    fn push(&mut self, value: Value) -> Result<()> {
        if self.stack.len() >= STACK_MAX {
            Err(self.error("Stack overflow."))
        } else {
            self.stack.push(value);
            Ok(())
        }
    }

    fn pop(&mut self) -> Result<Value> {
        self.stack.pop().ok_or_else(|| self.error("Stack underflow."))
    }

    fn peek(&self) -> Result<&Value> {
        self.stack.last().ok_or_else(|| self.error("Stack underflow."))
    }

    fn slot(&mut self, chunk: &Chunk) -> Result<usize> {
        let slot = self.frame.slots + self.read_u8(chunk)? as usize;

        if slot < self.stack.len() {
            Ok(slot)
        } else {
            Err(self.error(format!("Invalid local slot {}.", slot)))
        }
    }

    fn get_local(&mut self, chunk: &Chunk) -> Result<()> {
        let slot = self.slot(chunk)?;
        let value = self.stack[slot].clone();
        self.push(value)
    }

    fn set_local(&mut self, chunk: &Chunk) -> Result<()> {
        let slot = self.slot(chunk)?;
        let value = self.peek()?.clone();
        self.stack[slot] = value;
        Ok(())
    }

    fn get_global(&mut self, chunk: &Chunk) -> Result<()> {
        let name = self.read_name(chunk)?;

        match self.globals.get(&name) {
            Some(value) => {
                let value = value.clone();
                self.push(value)
            }
            None => Err(self.error(format!("Undefined variable '{}'.", name))),
        }
    }

    fn define_global(&mut self, chunk: &Chunk) -> Result<()> {
        let name = self.read_name(chunk)?;
        let value = self.pop()?;
        self.globals.insert(name, value);
        Ok(())
    }

    // assignment never creates a binding
    fn set_global(&mut self, chunk: &Chunk) -> Result<()> {
        let name = self.read_name(chunk)?;
        let value = self.peek()?.clone();

        match self.globals.get_mut(&name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(self.error(format!("Undefined variable '{}'.", name))),
        }
    }

    // both operands are consumed before the type check
    fn bin_op(&mut self, op: u8) -> Result<()> {
        let right = self.pop()?;
        let left = self.pop()?;

        #[rustfmt::skip]
        let value = match (left, op, right) {
            (Value::Number(a), Op::ADD     , Value::Number(b)) => Value::Number(a + b),
            (Value::Number(a), Op::SUBTRACT, Value::Number(b)) => Value::Number(a - b),
            (Value::Number(a), Op::MULTIPLY, Value::Number(b)) => Value::Number(a * b),
            (Value::Number(a), Op::DIVIDE  , Value::Number(b)) => Value::Number(a / b),
            (Value::Number(a), Op::GREATER , Value::Number(b)) => Value::Bool(a > b),
            (Value::Number(a), Op::LESS    , Value::Number(b)) => Value::Bool(a < b),

            (Value::String(a), Op::ADD     , Value::String(b)) => Value::string(format!("{}{}", a, b)),

            (_, Op::ADD, _) => return Err(self.error("Operands must be two numbers or two strings.")),
            _               => return Err(self.error("Operands must be numbers.")),
        };

        self.push(value)
    }

    fn negate(&mut self) -> Result<()> {
        match self.pop()? {
            Value::Number(n) => self.push(Value::Number(-n)),
            _ => Err(self.error("Operand must be a number.")),
        }
    }

    fn print(&mut self) -> Result<()> {
        let value = self.pop()?;

        writeln!(self.output, "{}", value).map_err(|e| self.error(format!("Print failed: {}.", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_case::test_case;

    fn run(input: &str) -> (crate::error::Result<()>, String, VirtualMachine<Vec<u8>>) {
        let mut vm = VirtualMachine::with_output(vec![]);
        let result = vm.execute(input);
        let output = String::from_utf8(vm.output().clone()).unwrap();

        (result, output, vm)
    }

    fn runtime_error(input: &str) -> (RuntimeError, VirtualMachine<Vec<u8>>) {
        match run(input) {
            (Err(PuntError::Runtime(error)), _, vm) => (error, vm),
            (result, _, _) => panic!("expected a runtime error, got {:?}", result),
        }
    }

    #[test_case("print 1 + 2;", "3\n" ; "arithmetic 01")]
    #[test_case("print -2 + 3 * 4;", "10\n" ; "arithmetic 02")]
    #[test_case("print (1 + 2) * 3;", "9\n" ; "arithmetic 03")]
    #[test_case("print 1 - 2 - 3;", "-4\n" ; "arithmetic 04")]
    #[test_case("print 10 / 4;", "2.5\n" ; "arithmetic 05")]
    #[test_case("print --1;", "1\n" ; "arithmetic 06")]
    #[test_case("print 1 / 0;", "inf\n" ; "division by zero")]
    #[test_case("print !nil;", "true\n" ; "boolean 01")]
    #[test_case("print !0;", "false\n" ; "zero is truthy")]
    #[test_case("print !\"\";", "false\n" ; "empty string is truthy")]
    #[test_case("print nil == nil;", "true\n" ; "boolean 02")]
    #[test_case("print 1 == \"1\";", "false\n" ; "boolean 03")]
    #[test_case("print true != false;", "true\n" ; "boolean 04")]
    #[test_case("print 1 < 2;", "true\n" ; "comparison 01")]
    #[test_case("print 1 <= 1;", "true\n" ; "comparison 02")]
    #[test_case("print 2 >= 3;", "false\n" ; "comparison 03")]
    #[test_case("print 3 > 2 == true;", "true\n" ; "comparison 04")]
    #[test_case("print \"a\" + \"b\";", "ab\n" ; "string concatenation")]
    #[test_case("print \"ab\" == \"a\" + \"b\";", "true\n" ; "string equality")]
    #[test_case("print \"a\" != \"b\";", "true\n" ; "string inequality")]
    #[test_case("print nil;", "nil\n" ; "nil")]
    fn test_expressions(input: &str, expected: &str) {
        let (result, output, vm) = run(input);

        assert_eq!(result, Ok(()));
        assert_eq!(output, expected);
        assert!(vm.stack().is_empty())
    }

    #[test_case("var a = 1; { var a = 2; print a; } print a;", "2\n1\n" ; "shadowing")]
    #[test_case("var a; print a;", "nil\n" ; "default nil")]
    #[test_case("var a = 1; a = a + 1; print a;", "2\n" ; "global assignment")]
    #[test_case("var a = 1; var a = 2; print a;", "2\n" ; "global redefinition")]
    #[test_case("{ var a = 1; var b = 2; a = b = 3; print a; print b; }", "3\n3\n" ; "chained local assignment")]
    #[test_case("{ var a = 1; { var b = a + 1; print b; } print a; }", "2\n1\n" ; "nested blocks")]
    #[test_case("var a = \"x\"; { var b = a; a = \"y\"; print b; } print a;", "x\ny\n" ; "locals copy values")]
    fn test_variables(input: &str, expected: &str) {
        let (result, output, vm) = run(input);

        assert_eq!(result, Ok(()));
        assert_eq!(output, expected);
        assert!(vm.stack().is_empty())
    }

    #[test_case("for (var i = 0; i < 3; i = i + 1) print i;", "0\n1\n2\n" ; "for loop")]
    #[test_case("var i = 0; while (i < 3) { print i; i = i + 1; }", "0\n1\n2\n" ; "while loop")]
    #[test_case("var i = 0; for (; i < 2;) i = i + 1; print i;", "2\n" ; "for without initializer")]
    #[test_case("for (var i = 0; i < 2; i = i + 1) { var j = i * 10; print j; }", "0\n10\n" ; "for body locals")]
    #[test_case("if (1 > 2) print \"yes\"; else print \"no\";", "no\n" ; "if else")]
    #[test_case("if (true) print \"yes\"; else print \"no\";", "yes\n" ; "if then")]
    #[test_case("if (nil) print 1;", "" ; "if falsey")]
    #[test_case("print false and 1;", "false\n" ; "and 01")]
    #[test_case("print 1 and 2;", "2\n" ; "and 02")]
    #[test_case("print nil or \"x\";", "x\n" ; "or 01")]
    #[test_case("print 1 or 2;", "1\n" ; "or 02")]
    #[test_case("var x = 0; false and (x = 1); print x;", "0\n" ; "and skips right operand")]
    #[test_case("var x = 0; true or (x = 1); print x;", "0\n" ; "or skips right operand")]
    #[test_case("false and (1/0); true or (1/0);", "" ; "short circuit expression statements")]
    fn test_control_flow(input: &str, expected: &str) {
        let (result, output, vm) = run(input);

        assert_eq!(result, Ok(()));
        assert_eq!(output, expected);
        assert!(vm.stack().is_empty())
    }

    #[test_case("1 + \"b\";", "Operands must be two numbers or two strings." ; "add mismatch")]
    #[test_case("nil + nil;", "Operands must be two numbers or two strings." ; "add nil")]
    #[test_case("1 < nil;", "Operands must be numbers." ; "compare mismatch")]
    #[test_case("\"a\" * 2;", "Operands must be numbers." ; "multiply string")]
    #[test_case("\"a\" - \"b\";", "Operands must be numbers." ; "subtract strings")]
    #[test_case("-\"a\";", "Operand must be a number." ; "negate string")]
    #[test_case("print x;", "Undefined variable 'x'." ; "undefined read")]
    #[test_case("x = 1;", "Undefined variable 'x'." ; "undefined assignment")]
    #[test_case("for (var i = 0; i < 3; i = i + 1) {} print i;", "Undefined variable 'i'." ; "loop variable does not leak")]
    fn test_runtime_error(input: &str, expected: &str) {
        let (error, _) = runtime_error(input);

        assert_eq!(error, RuntimeError::new(expected, 1))
    }

    #[test]
    fn operands_are_consumed() {
        let (_, vm) = runtime_error("1 + \"b\";");

        assert!(vm.stack().is_empty())
    }

    #[test]
    fn assignment_does_not_define() {
        let (_, vm) = runtime_error("x = 1;");

        assert_eq!(vm.global("x"), None)
    }

    #[test]
    fn error_reports_line() {
        let (result, output, _) = run("print 1;\n\nprint 1 + nil;");

        assert_eq!(output, "1\n");
        assert_eq!(
            result.unwrap_err().to_string(),
            "Operands must be two numbers or two strings.\n[line 3] in script"
        )
    }

    #[test]
    fn globals_persist_between_runs() {
        let mut vm = VirtualMachine::with_output(vec![]);

        assert_eq!(vm.execute("var a = 1;"), Ok(()));
        assert_eq!(vm.execute("a = a + 1; print a;"), Ok(()));
        assert_eq!(vm.global("a"), Some(&Value::number(2.0)));
        assert_eq!(vm.into_output(), b"2\n".to_vec())
    }

    #[test]
    fn stack_overflow() {
        let mut chunk = Chunk::new();
        chunk.add_constant(Value::nil());
        chunk.emit(Op::Constant(0), 1);
        chunk.emit(Op::Loop(5), 1);

        let mut vm = VirtualMachine::with_output(vec![]);

        assert_eq!(vm.run(&chunk), Err(RuntimeError::new("Stack overflow.", 1)));
        assert_eq!(vm.stack().len(), STACK_MAX)
    }

    #[test]
    fn reserved_opcode() {
        let mut chunk = Chunk::new();
        chunk.emit(Op::Nil, 1);
        chunk.write(Op::CLOSURE, 2);

        let mut vm = VirtualMachine::with_output(vec![]);

        assert_eq!(
            vm.run(&chunk),
            Err(RuntimeError::new("Unimplemented opcode OP_CLOSURE.", 2))
        )
    }

    #[test]
    fn unknown_opcode() {
        let mut chunk = Chunk::new();
        chunk.write(Op::METHOD + 1, 4);

        let mut vm = VirtualMachine::with_output(vec![]);

        assert_eq!(
            vm.run(&chunk),
            Err(RuntimeError::new("Unknown opcode 37.", 4))
        )
    }

    #[test]
    fn missing_return() {
        let mut chunk = Chunk::new();
        chunk.emit(Op::Nil, 1);

        let mut vm = VirtualMachine::with_output(vec![]);

        assert_eq!(
            vm.run(&chunk),
            Err(RuntimeError::new("Unexpected end of bytecode.", 0))
        )
    }

    #[test]
    fn compile_errors_do_not_run() {
        let (result, output, _) = run("print 1;\nprint ;");

        assert_eq!(output, "");
        assert!(matches!(result, Err(PuntError::Compile(errors)) if errors.len() == 1))
    }

    #[test_case("print 1;", InterpretResult::Ok ; "ok")]
    #[test_case("print ;", InterpretResult::CompileError ; "compile error")]
    #[test_case("\"open", InterpretResult::CompileError ; "scan error")]
    #[test_case("print -nil;", InterpretResult::RuntimeError ; "runtime error")]
    fn test_interpret(input: &str, expected: InterpretResult) {
        let mut vm = VirtualMachine::with_output(vec![]);

        assert_eq!(vm.interpret(input), expected)
    }

    #[test]
    fn exit_codes() {
        assert_eq!(InterpretResult::Ok.exit_code(), 0);
        assert_eq!(InterpretResult::CompileError.exit_code(), 65);
        assert_eq!(InterpretResult::RuntimeError.exit_code(), 70)
    }
}
