use crate::chunk::{Chunk, Op, Reference, Slot};
use crate::compiler::rules::{get_rule, Precedence};
use crate::compiler::unit::{CompileUnit, FunctionKind};
use crate::compiler::{CompileError, Result};
use crate::debug::disassemble;
use crate::error::PuntError;
use crate::lexer::{Lexer, Literal, Token, TokenKind};
use crate::value::{Function, Value};

use std::mem;
use std::vec;

use tracing::{debug, trace, warn, Level};

/// Scans and compiles `source` into a chunk ready for the VM.
pub fn compile(source: &str) -> crate::error::Result<Chunk> {
    let tokens = Lexer::tokenize(source)?;
    Compiler::new(tokens).compile().map_err(PuntError::from)
}

/*
   Single pass: statements are parsed by recursive descent and expressions
   by the precedence table in `rules`, emitting bytecode as tokens are
   consumed. There is no syntax tree.

   Every parsing function returns `Err` on the first problem it finds. The
   error unwinds to the closest `declaration`, which records it, skips to the
   next statement boundary and carries on, so one pass reports every
   independent error.
*/
pub struct Compiler {
    tokens: vec::IntoIter<Token>,
    previous: Token,
    current: Token,
    unit: CompileUnit,
    enclosing: Vec<CompileUnit>,
    errors: Vec<CompileError>,
}

impl Compiler {
    /// `tokens` is expected to end in an `Eof` token, as produced by
    /// `Lexer::tokenize`.
    pub fn new(tokens: Vec<Token>) -> Compiler {
        let mut compiler = Compiler {
            tokens: tokens.into_iter(),
            previous: Token::eof(1),
            current: Token::eof(1),
            unit: CompileUnit::new(FunctionKind::Script),
            enclosing: vec![],
            errors: vec![],
        };

        compiler.advance();

        compiler
    }

    // <declaration>* <eof>
    pub fn compile(mut self) -> std::result::Result<Chunk, Vec<CompileError>> {
        while !self.matches(TokenKind::Eof) {
            self.declaration();
        }

        let function = self.end_unit();

        debug!(
            bytes = function.chunk.len(),
            constants = function.chunk.constants.len(),
            errors = self.errors.len(),
            "compiled script"
        );

        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        if tracing::enabled!(Level::TRACE) {
            trace!("\n{}", disassemble(&function.chunk, "code"));
        }

        Ok(function.chunk)
    }

    fn end_unit(&mut self) -> Function {
        self.emit(Op::Return);

        let unit = match self.enclosing.pop() {
            Some(outer) => mem::replace(&mut self.unit, outer),
            None => mem::take(&mut self.unit),
        };

        trace!(kind = ?unit.kind, locals = unit.locals.len(), "closed compile unit");

        unit.function
    }

    fn chunk(&mut self) -> &mut Chunk {
        &mut self.unit.function.chunk
    }

    // Tokens

    fn advance(&mut self) {
        let line = self.current.line;
        let next = self.tokens.next().unwrap_or_else(|| Token::eof(line));
        self.previous = mem::replace(&mut self.current, next);
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<()> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_at_current(message))
        }
    }

    fn error(&self, message: &str) -> CompileError {
        CompileError::at(&self.previous, message)
    }

    fn error_at_current(&self, message: &str) -> CompileError {
        CompileError::at(&self.current, message)
    }

    // Skips tokens until a statement boundary: right after a `;` or right
    // before a keyword that starts a statement.
    fn synchronize(&mut self) {
        while !self.check(TokenKind::Eof) {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }

            match self.current.kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => self.advance(),
            }
        }
    }

    // Emitting

    fn emit(&mut self, op: Op) -> usize {
        let line = self.previous.line;
        self.chunk().emit(op, line)
    }

    fn make_constant(&mut self, value: Value) -> Result<Reference> {
        match self.chunk().add_constant(value) {
            Some(reference) => Ok(reference),
            None => Err(self.error("Too many constants in one chunk.")),
        }
    }

    fn emit_constant(&mut self, value: Value) -> Result<()> {
        let reference = self.make_constant(value)?;
        self.emit(Op::Constant(reference));
        Ok(())
    }

    /// Emits `op` with a placeholder distance and returns the offset of the
    /// operand for `patch_jump`.
    fn emit_jump(&mut self, op: fn(u16) -> Op) -> usize {
        self.emit(op(u16::MAX)) + 1
    }

    fn patch_jump(&mut self, operand: usize) -> Result<()> {
        // the distance is measured from the end of the 3-byte instruction
        let distance = self.chunk().len() - operand - 2;

        match u16::try_from(distance) {
            Ok(distance) => {
                self.chunk().patch_u16(operand, distance);
                Ok(())
            }
            Err(_) => Err(self.error("Too much code to jump over.")),
        }
    }

    fn emit_loop(&mut self, loop_start: usize) -> Result<()> {
        // +3 skips over the loop instruction itself
        let distance = self.chunk().len() - loop_start + 3;

        match u16::try_from(distance) {
            Ok(distance) => {
                self.emit(Op::Loop(distance));
                Ok(())
            }
            Err(_) => Err(self.error("Loop body too large.")),
        }
    }

    // Scopes and variables

    fn begin_scope(&mut self) {
        self.unit.begin_scope();
    }

    fn end_scope(&mut self) {
        for _ in 0..self.unit.end_scope() {
            self.emit(Op::Pop);
        }
    }

    // Runs `f` inside a fresh block scope. The scope is closed even when `f`
    // fails, so recovery continues with consistent local slots.
    fn scoped<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Compiler) -> Result<()>,
    {
        self.begin_scope();
        let result = f(self);
        self.end_scope();
        result
    }

    fn identifier_constant(&mut self, name: &str) -> Result<Reference> {
        self.make_constant(Value::string(name))
    }

    fn declare_variable(&mut self) -> Result<()> {
        if self.unit.scope_depth == 0 {
            return Ok(());
        }

        let name = self.previous.lexeme.clone();

        if self.unit.is_declared_in_scope(&name) {
            return Err(self.error("Already a variable with this name in this scope."));
        }

        if self.unit.is_full() {
            return Err(self.error("Too many local variables in function."));
        }

        self.unit.declare(&name);

        Ok(())
    }

    /// Returns the name constant for a global, `None` for a local.
    fn parse_variable(&mut self, message: &str) -> Result<Option<Reference>> {
        self.consume(TokenKind::Identifier, message)?;

        self.declare_variable()?;

        if self.unit.scope_depth > 0 {
            return Ok(None);
        }

        let name = self.previous.lexeme.clone();
        self.identifier_constant(&name).map(Some)
    }

    fn define_variable(&mut self, global: Option<Reference>) {
        match global {
            Some(reference) => {
                self.emit(Op::DefineGlobal(reference));
            }
            None => self.unit.mark_initialized(),
        }
    }

    fn resolve_local(&self, name: &str) -> Result<Option<Slot>> {
        match self.unit.resolve(name) {
            Some((_, local)) if local.depth.is_none() => {
                Err(self.error("Can't read local variable in its own initializer."))
            }
            Some((slot, _)) => Ok(Some(slot)),
            None => Ok(None),
        }
    }

    fn named_variable(&mut self, name: &str, can_assign: bool) -> Result<()> {
        let (get, set) = match self.resolve_local(name)? {
            Some(slot) => (Op::GetLocal(slot), Op::SetLocal(slot)),
            None => {
                let reference = self.identifier_constant(name)?;
                (Op::GetGlobal(reference), Op::SetGlobal(reference))
            }
        };

        if can_assign && self.matches(TokenKind::Equal) {
            self.expression()?;
            self.emit(set);
        } else {
            self.emit(get);
        }

        Ok(())
    }

    // Declarations and statements

    // <var_decl> | <stmt>
    fn declaration(&mut self) {
        let result = if self.matches(TokenKind::Var) {
            self.var_declaration()
        } else {
            self.statement()
        };

        if let Err(error) = result {
            warn!(%error, "compile error");
            self.errors.push(error);
            self.synchronize();
        }
    }

    // <var><name>(<=><expr>)?<;>
    //
    // Once declared, the variable is defined even if its initializer fails,
    // so later statements in the block can still read it.
    fn var_declaration(&mut self) -> Result<()> {
        let global = self.parse_variable("Expect variable name.")?;

        let initializer = self.var_initializer();
        self.define_variable(global);

        initializer
    }

    fn var_initializer(&mut self) -> Result<()> {
        if self.matches(TokenKind::Equal) {
            self.expression()?;
        } else {
            self.emit(Op::Nil);
        }

        self.consume(
            TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        )
    }

    fn statement(&mut self) -> Result<()> {
        if self.matches(TokenKind::Print) {
            self.print_statement()
        } else if self.matches(TokenKind::For) {
            self.scoped(|compiler| compiler.for_statement())
        } else if self.matches(TokenKind::If) {
            self.if_statement()
        } else if self.matches(TokenKind::While) {
            self.while_statement()
        } else if self.matches(TokenKind::LeftBrace) {
            self.scoped(|compiler| compiler.block())
        } else {
            self.expression_statement()
        }
    }

    // <declaration>*<}>
    fn block(&mut self) -> Result<()> {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }

        self.consume(TokenKind::RightBrace, "Expect '}' after block.")
    }

    // <print><expr><;>
    fn print_statement(&mut self) -> Result<()> {
        self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
        self.emit(Op::Print);
        Ok(())
    }

    // <expr><;>
    fn expression_statement(&mut self) -> Result<()> {
        self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
        self.emit(Op::Pop);
        Ok(())
    }

    // <if><(><expr><)><stmt>(<else><stmt>)?
    fn if_statement(&mut self) -> Result<()> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;

        let then_jump = self.emit_jump(Op::JumpIfFalse);
        self.emit(Op::Pop);
        self.statement()?;

        let else_jump = self.emit_jump(Op::Jump);

        self.patch_jump(then_jump)?;
        self.emit(Op::Pop);

        if self.matches(TokenKind::Else) {
            self.statement()?;
        }

        self.patch_jump(else_jump)
    }

    // <while><(><expr><)><stmt>
    fn while_statement(&mut self) -> Result<()> {
        let loop_start = self.chunk().len();

        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;

        let exit_jump = self.emit_jump(Op::JumpIfFalse);
        self.emit(Op::Pop);
        self.statement()?;
        self.emit_loop(loop_start)?;

        self.patch_jump(exit_jump)?;
        self.emit(Op::Pop);

        Ok(())
    }

    // <for><(>(<var_decl>|<expr_stmt>|<;>)<expr>?<;><expr>?<)><stmt>
    //
    // Runs inside its own scope so the initializer's variable ends with the
    // loop.
    fn for_statement(&mut self) -> Result<()> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        if self.matches(TokenKind::Semicolon) {
            // no initializer
        } else if self.matches(TokenKind::Var) {
            self.var_declaration()?;
        } else {
            self.expression_statement()?;
        }

        let mut loop_start = self.chunk().len();

        let mut exit_jump = None;
        if !self.matches(TokenKind::Semicolon) {
            self.expression()?;
            self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

            exit_jump = Some(self.emit_jump(Op::JumpIfFalse));
            self.emit(Op::Pop);
        }

        if !self.matches(TokenKind::RightParen) {
            // the increment is compiled before the body but runs after it
            let body_jump = self.emit_jump(Op::Jump);
            let increment_start = self.chunk().len();

            self.expression()?;
            self.emit(Op::Pop);
            self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

            self.emit_loop(loop_start)?;
            loop_start = increment_start;
            self.patch_jump(body_jump)?;
        }

        self.statement()?;
        self.emit_loop(loop_start)?;

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump)?;
            self.emit(Op::Pop);
        }

        Ok(())
    }

    // Expressions

    fn expression(&mut self) -> Result<()> {
        self.parse_precedence(Precedence::Assignment)
    }

    fn parse_precedence(&mut self, precedence: Precedence) -> Result<()> {
        self.advance();

        let prefix = match get_rule(self.previous.kind).prefix {
            Some(prefix) => prefix,
            None => return Err(self.error("Expect expression.")),
        };

        // `=` may only bind in a context loose enough for an assignment, so
        // `a * b = c` never assigns to `b`
        let can_assign = precedence <= Precedence::Assignment;
        prefix(self, can_assign)?;

        while precedence <= get_rule(self.current.kind).precedence {
            self.advance();

            if let Some(infix) = get_rule(self.previous.kind).infix {
                infix(self, can_assign)?;
            }
        }

        if can_assign && self.matches(TokenKind::Equal) {
            return Err(self.error("Invalid assignment target."));
        }

        Ok(())
    }

    // <(><expr><)>
    pub(super) fn grouping(&mut self, _can_assign: bool) -> Result<()> {
        self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after expression.")
    }

    // <un_op><expr>
    pub(super) fn unary(&mut self, _can_assign: bool) -> Result<()> {
        let operator = self.previous.kind;

        self.parse_precedence(Precedence::Unary)?;

        match operator {
            TokenKind::Minus => self.emit(Op::Negate),
            TokenKind::Bang => self.emit(Op::Not),
            _ => return Err(self.error("Expect unary operator.")),
        };

        Ok(())
    }

    // <expr><bin_op><expr>
    pub(super) fn binary(&mut self, _can_assign: bool) -> Result<()> {
        let operator = self.previous.kind;
        let precedence = get_rule(operator).precedence;

        self.parse_precedence(precedence.next())?;

        #[rustfmt::skip]
        let ops: &[Op] = match operator {
            TokenKind::BangEqual    => &[Op::Equal, Op::Not],
            TokenKind::EqualEqual   => &[Op::Equal],
            TokenKind::Greater      => &[Op::Greater],
            TokenKind::GreaterEqual => &[Op::Less, Op::Not],
            TokenKind::Less         => &[Op::Less],
            TokenKind::LessEqual    => &[Op::Greater, Op::Not],
            TokenKind::Plus         => &[Op::Add],
            TokenKind::Minus        => &[Op::Subtract],
            TokenKind::Star         => &[Op::Multiply],
            TokenKind::Slash        => &[Op::Divide],
            _ => return Err(self.error("Expect binary operator.")),
        };

        for op in ops {
            self.emit(*op);
        }

        Ok(())
    }

    // <expr><and><expr>
    pub(super) fn and(&mut self, _can_assign: bool) -> Result<()> {
        let end_jump = self.emit_jump(Op::JumpIfFalse);

        self.emit(Op::Pop);
        self.parse_precedence(Precedence::And)?;

        self.patch_jump(end_jump)
    }

    // <expr><or><expr>
    pub(super) fn or(&mut self, _can_assign: bool) -> Result<()> {
        let else_jump = self.emit_jump(Op::JumpIfFalse);
        let end_jump = self.emit_jump(Op::Jump);

        self.patch_jump(else_jump)?;
        self.emit(Op::Pop);

        self.parse_precedence(Precedence::Or)?;
        self.patch_jump(end_jump)
    }

    pub(super) fn number(&mut self, _can_assign: bool) -> Result<()> {
        let value = match &self.previous.literal {
            Some(Literal::Number(n)) => *n,
            _ => self
                .previous
                .lexeme
                .parse::<f64>()
                .map_err(|_| self.error("Invalid number literal."))?,
        };

        self.emit_constant(Value::number(value))
    }

    pub(super) fn string(&mut self, _can_assign: bool) -> Result<()> {
        let value = match &self.previous.literal {
            Some(Literal::String(s)) => Value::string(s),
            _ => Value::string(self.previous.lexeme.trim_matches('"')),
        };

        self.emit_constant(value)
    }

    pub(super) fn literal(&mut self, _can_assign: bool) -> Result<()> {
        match self.previous.kind {
            TokenKind::False => self.emit(Op::False),
            TokenKind::Nil => self.emit(Op::Nil),
            TokenKind::True => self.emit(Op::True),
            _ => return Err(self.error("Expect literal.")),
        };

        Ok(())
    }

    pub(super) fn variable(&mut self, can_assign: bool) -> Result<()> {
        let name = self.previous.lexeme.clone();
        self.named_variable(&name, can_assign)
    }
}
