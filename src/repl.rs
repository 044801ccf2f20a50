use crate::vm::{InterpretResult, VirtualMachine};

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

const PROMPT: &str = "> ";
const QUIT: &str = "quit";

/// Reads lines from stdin until `quit` or end of input. Every line runs on
/// the same VM, so globals carry over.
pub fn repl() -> io::Result<()> {
    let stdin = io::stdin();
    let mut vm = VirtualMachine::new();

    session(stdin.lock(), io::stdout(), &mut vm)
}

pub fn session<R, P, W>(mut input: R, mut prompt: P, vm: &mut VirtualMachine<W>) -> io::Result<()>
where
    R: BufRead,
    P: Write,
    W: Write,
{
    let mut buffer = String::new();

    loop {
        write!(prompt, "{}", PROMPT)?;
        prompt.flush()?;

        if input.read_line(&mut buffer)? == 0 {
            writeln!(prompt)?;
            return Ok(());
        }

        match buffer.trim() {
            QUIT => return Ok(()),
            "" => {}
            line => {
                vm.interpret(line);
            }
        }

        buffer.clear();
    }
}

/// Runs a whole script file on a fresh VM.
pub fn run_file<P: AsRef<Path>>(path: P) -> io::Result<InterpretResult> {
    let source = fs::read_to_string(path)?;
    let mut vm = VirtualMachine::new();

    Ok(vm.interpret(&source))
}
