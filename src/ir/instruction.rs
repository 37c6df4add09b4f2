//! Instructions at the IR boundary.
//!
//! An instruction exposes its op-code, operand references (by instruction
//! id) and its control predecessor and successor sets. Control edges are
//! what the dead-code transform inspects; operand references are what the
//! liveness analysis walks.

use super::opcode::OpCode;
use super::shape::Shape;

/// One IR instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    id: i64,
    name: String,
    opcode: OpCode,
    shape: Shape,
    operands: Vec<i64>,
    ctrl_predecessors: Vec<i64>,
    ctrl_successors: Vec<i64>,
    parameter_number: Option<i64>,
}

impl Instruction {
    pub fn new(id: i64, name: impl Into<String>, opcode: OpCode, shape: Shape) -> Self {
        Self {
            id,
            name: name.into(),
            opcode,
            shape,
            operands: Vec::new(),
            ctrl_predecessors: Vec::new(),
            ctrl_successors: Vec::new(),
            parameter_number: None,
        }
    }

    /// A function parameter instruction.
    pub fn parameter(id: i64, name: impl Into<String>, number: i64, shape: Shape) -> Self {
        let mut inst = Self::new(id, name, OpCode::Parameter, shape);
        inst.parameter_number = Some(number);
        inst
    }

    pub fn with_operands(mut self, operands: Vec<i64>) -> Self {
        self.operands = operands;
        self
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn operands(&self) -> &[i64] {
        &self.operands
    }

    pub fn ctrl_predecessors(&self) -> &[i64] {
        &self.ctrl_predecessors
    }

    pub fn ctrl_successors(&self) -> &[i64] {
        &self.ctrl_successors
    }

    pub fn parameter_number(&self) -> Option<i64> {
        self.parameter_number
    }

    pub fn is_parameter(&self) -> bool {
        self.opcode == OpCode::Parameter
    }

    pub fn has_ctrl_edges(&self) -> bool {
        !self.ctrl_predecessors.is_empty() || !self.ctrl_successors.is_empty()
    }

    pub fn add_ctrl_predecessor(&mut self, id: i64) {
        self.ctrl_predecessors.push(id);
    }

    pub fn add_ctrl_successor(&mut self, id: i64) {
        self.ctrl_successors.push(id);
    }

    /// Transplant control edges wholesale, used when one instruction replaces
    /// another in the sequence.
    pub fn set_ctrl_edges(&mut self, predecessors: Vec<i64>, successors: Vec<i64>) {
        self.ctrl_predecessors = predecessors;
        self.ctrl_successors = successors;
    }

    /// Split off this instruction's control edges, leaving both sets empty.
    pub fn take_ctrl_edges(&mut self) -> (Vec<i64>, Vec<i64>) {
        (
            std::mem::take(&mut self.ctrl_predecessors),
            std::mem::take(&mut self.ctrl_successors),
        )
    }
}
