// This module is the narrow boundary to the tensor IR data layer, which is an external
// collaborator of this core: it exposes exactly the structure the pass system needs —
// modules enumerating functions, functions exposing an ordered instruction sequence and
// a signature, instructions exposing an op-code, operand references and control edge
// sets — plus the verification of the boundary invariants the compiler entry relies on
// (unique ids, resolvable references, a present return instruction). IR persistence,
// shape inference and operator semantics live outside this crate.

//! Minimal tensor-IR boundary consumed by the pass system.

pub mod function;
pub mod instruction;
pub mod module;
pub mod opcode;
pub mod shape;

pub use function::Function;
pub use instruction::Instruction;
pub use module::Module;
pub use opcode::OpCode;
pub use shape::{ElementType, Shape, Signature};
