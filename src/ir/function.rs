//! Functions at the IR boundary.

use hashbrown::HashSet;

use super::instruction::Instruction;
use super::shape::Signature;
use crate::error::{CompileError, CompileResult};

/// One IR function: an ordered instruction sequence, a signature, and the id
/// of the instruction producing the return value.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    id: i64,
    name: String,
    signature: Signature,
    instructions: Vec<Instruction>,
    return_id: i64,
}

impl Function {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        signature: Signature,
        instructions: Vec<Instruction>,
        return_id: i64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            signature,
            instructions,
            return_id,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn instructions_mut(&mut self) -> &mut [Instruction] {
        &mut self.instructions
    }

    /// Id of the instruction whose value the function returns.
    pub fn return_id(&self) -> i64 {
        self.return_id
    }

    pub fn instruction(&self, id: i64) -> Option<&Instruction> {
        self.instructions.iter().find(|inst| inst.id() == id)
    }

    /// Largest instruction id in use; new instructions get ids above this.
    pub fn max_instruction_id(&self) -> i64 {
        self.instructions
            .iter()
            .map(Instruction::id)
            .max()
            .unwrap_or(0)
    }

    /// Drop every instruction failing the predicate; returns how many were
    /// removed. Order of the survivors is preserved.
    pub fn retain_instructions(&mut self, keep: impl FnMut(&Instruction) -> bool) -> usize {
        let before = self.instructions.len();
        self.instructions.retain(keep);
        before - self.instructions.len()
    }

    /// Replace the instruction with id `at` by `replacement`, spliced into
    /// its position in the sequence. Returns `false` when `at` is absent.
    ///
    /// Callers keep operand references valid by reusing `at` as the id of the
    /// final replacement instruction.
    pub fn splice_instruction(&mut self, at: i64, replacement: Vec<Instruction>) -> bool {
        let Some(index) = self.instructions.iter().position(|inst| inst.id() == at) else {
            return false;
        };
        self.instructions.splice(index..=index, replacement);
        true
    }

    /// Check the boundary invariants the compiler entry relies on: unique
    /// instruction ids, resolvable operand and control references, and a
    /// present return instruction.
    pub fn verify(&self) -> CompileResult<()> {
        let mut ids = HashSet::with_capacity(self.instructions.len());
        for inst in &self.instructions {
            if !ids.insert(inst.id()) {
                return Err(CompileError::DuplicateInstruction {
                    function: self.name.clone(),
                    id: inst.id(),
                });
            }
        }

        for inst in &self.instructions {
            for &operand in inst.operands() {
                if !ids.contains(&operand) {
                    return Err(CompileError::DanglingOperand {
                        function: self.name.clone(),
                        inst: inst.id(),
                        operand,
                    });
                }
            }
            for &target in inst
                .ctrl_predecessors()
                .iter()
                .chain(inst.ctrl_successors())
            {
                if !ids.contains(&target) {
                    return Err(CompileError::DanglingControlEdge {
                        function: self.name.clone(),
                        inst: inst.id(),
                        target,
                    });
                }
            }
        }

        if !ids.contains(&self.return_id) {
            return Err(CompileError::MissingReturn {
                function: self.name.clone(),
                return_id: self.return_id,
            });
        }
        Ok(())
    }
}
