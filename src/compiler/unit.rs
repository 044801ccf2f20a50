use crate::chunk::Slot;
use crate::value::Function;

/// Local slots are addressed by a single byte.
pub const MAX_LOCALS: usize = u8::MAX as usize + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FunctionKind {
    #[default]
    Script,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local {
    pub name: String,
    /// `None` until the initializer has been compiled.
    pub depth: Option<usize>,
}

/// Per-function compiler state: the function being built, its locals in
/// slot order and the current block depth.
#[derive(Debug, Default)]
pub struct CompileUnit {
    pub kind: FunctionKind,
    pub function: Function,
    pub locals: Vec<Local>,
    pub scope_depth: usize,
}

impl CompileUnit {
    pub fn new(kind: FunctionKind) -> CompileUnit {
        CompileUnit {
            kind,
            ..CompileUnit::default()
        }
    }

    pub fn is_full(&self) -> bool {
        self.locals.len() >= MAX_LOCALS
    }

    /// Appends an uninitialized local. Callers check `is_full` first.
    pub fn declare(&mut self, name: &str) {
        self.locals.push(Local {
            name: name.to_string(),
            depth: None,
        });
    }

    /// Whether `name` is already declared in the innermost open block.
    pub fn is_declared_in_scope(&self, name: &str) -> bool {
        self.locals
            .iter()
            .rev()
            .take_while(|local| match local.depth {
                Some(depth) => depth >= self.scope_depth,
                None => true,
            })
            .any(|local| local.name == name)
    }

    pub fn mark_initialized(&mut self) {
        let depth = self.scope_depth;
        if let Some(local) = self.locals.last_mut() {
            local.depth = Some(depth);
        }
    }

    /// Searches the most recent declaration first, so inner locals shadow
    /// outer ones.
    pub fn resolve(&self, name: &str) -> Option<(Slot, &Local)> {
        self.locals
            .iter()
            .enumerate()
            .rev()
            .find(|(_, local)| local.name == name)
            .map(|(slot, local)| (slot as Slot, local))
    }

    pub fn begin_scope(&mut self) {
        self.scope_depth += 1;
    }

    /// Closes the innermost block and returns how many locals went out of
    /// scope.
    pub fn end_scope(&mut self) -> usize {
        self.scope_depth = self.scope_depth.saturating_sub(1);

        let mut popped = 0;
        while let Some(local) = self.locals.last() {
            match local.depth {
                Some(depth) if depth <= self.scope_depth => break,
                _ => {
                    self.locals.pop();
                    popped += 1;
                }
            }
        }

        popped
    }
}
