//! Modules at the IR boundary.

use super::function::Function;
use crate::error::{CompileError, CompileResult};

/// One IR module: a named collection of functions.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    name: String,
    functions: Vec<Function>,
    entry_function_id: Option<i64>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
            entry_function_id: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_function(&mut self, function: Function) {
        if self.entry_function_id.is_none() {
            self.entry_function_id = Some(function.id());
        }
        self.functions.push(function);
    }

    pub fn set_entry_function(&mut self, id: i64) {
        self.entry_function_id = Some(id);
    }

    pub fn entry_function_id(&self) -> Option<i64> {
        self.entry_function_id
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut [Function] {
        &mut self.functions
    }

    pub fn function(&self, id: i64) -> Option<&Function> {
        self.functions.iter().find(|f| f.id() == id)
    }

    pub fn function_by_name(&self, name: &str) -> CompileResult<&Function> {
        self.functions
            .iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| CompileError::FunctionNotFound {
                name: name.to_string(),
            })
    }

    /// Total instruction count over all functions.
    pub fn instruction_count(&self) -> usize {
        self.functions.iter().map(|f| f.instructions().len()).sum()
    }

    /// Check the boundary invariants of every function. A module with no
    /// functions is rejected: there is nothing to compile.
    pub fn verify(&self) -> CompileResult<()> {
        if self.functions.is_empty() {
            return Err(CompileError::EmptyModule {
                module: self.name.clone(),
            });
        }
        for function in &self.functions {
            function.verify()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ElementType, Instruction, OpCode, Shape, Signature};

    fn scalar_sig() -> Signature {
        Signature::new(
            vec![Shape::scalar(ElementType::F32)],
            vec!["x"],
            Shape::scalar(ElementType::F32),
        )
    }

    #[test]
    fn empty_module_is_rejected() {
        let module = Module::new("empty");
        assert_eq!(
            module.verify(),
            Err(CompileError::EmptyModule {
                module: "empty".to_string()
            })
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let f32s = Shape::scalar(ElementType::F32);
        let instructions = vec![
            Instruction::parameter(1, "x.1", 0, f32s.clone()),
            Instruction::new(1, "exp.1", OpCode::Exp, f32s).with_operands(vec![1]),
        ];
        let mut module = Module::new("dup");
        module.add_function(Function::new(10, "f", scalar_sig(), instructions, 1));
        assert!(matches!(
            module.verify(),
            Err(CompileError::DuplicateInstruction { id: 1, .. })
        ));
    }

    #[test]
    fn dangling_operand_is_rejected() {
        let f32s = Shape::scalar(ElementType::F32);
        let instructions = vec![
            Instruction::parameter(1, "x.1", 0, f32s.clone()),
            Instruction::new(2, "exp.2", OpCode::Exp, f32s).with_operands(vec![99]),
        ];
        let mut module = Module::new("dangling");
        module.add_function(Function::new(10, "f", scalar_sig(), instructions, 2));
        assert!(matches!(
            module.verify(),
            Err(CompileError::DanglingOperand {
                inst: 2,
                operand: 99,
                ..
            })
        ));
    }

    #[test]
    fn missing_return_is_rejected() {
        let f32s = Shape::scalar(ElementType::F32);
        let instructions = vec![Instruction::parameter(1, "x.1", 0, f32s)];
        let mut module = Module::new("noret");
        module.add_function(Function::new(10, "f", scalar_sig(), instructions, 7));
        assert!(matches!(
            module.verify(),
            Err(CompileError::MissingReturn { return_id: 7, .. })
        ));
    }

    #[test]
    fn well_formed_module_verifies() {
        let f32s = Shape::scalar(ElementType::F32);
        let instructions = vec![
            Instruction::parameter(1, "x.1", 0, f32s.clone()),
            Instruction::new(2, "exp.2", OpCode::Exp, f32s).with_operands(vec![1]),
        ];
        let mut module = Module::new("ok");
        module.add_function(Function::new(10, "f", scalar_sig(), instructions, 2));
        assert_eq!(module.verify(), Ok(()));
        assert_eq!(module.instruction_count(), 2);
        assert_eq!(module.entry_function_id(), Some(10));
    }
}
