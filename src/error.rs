// This module defines error types for the tensorc compiler core using the thiserror
// crate for idiomatic Rust error handling. CompileError covers the recoverable,
// caller-reported failure class: modules rejected at the compilation boundary
// (duplicate instruction ids, dangling operand or control references, missing return
// instructions), lookups of unknown functions, and compilation units lost to a worker
// failure. Each variant carries the context needed to name the offending component in
// a diagnostic. Abort-class conditions (arena exhaustion, IR invariants violated
// mid-pass) are deliberately absent: those terminate the compilation with a panic, as
// documented in the arena and pass modules. CompileResult<T> is the crate-wide result
// alias.

//! Error types for the tensorc compiler core.
//!
//! Using thiserror for more idiomatic error handling.

use thiserror::Error;

/// Recoverable errors reported to callers of the compilation boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("module `{module}` contains no functions")]
    EmptyModule { module: String },

    #[error("function `{function}`: duplicate instruction id {id}")]
    DuplicateInstruction { function: String, id: i64 },

    #[error("function `{function}`: instruction {inst} references missing operand {operand}")]
    DanglingOperand {
        function: String,
        inst: i64,
        operand: i64,
    },

    #[error("function `{function}`: instruction {inst} has control edge to missing instruction {target}")]
    DanglingControlEdge {
        function: String,
        inst: i64,
        target: i64,
    },

    #[error("function `{function}`: return instruction {return_id} not found")]
    MissingReturn { function: String, return_id: i64 },

    #[error("function not found: {name}")]
    FunctionNotFound { name: String },

    #[error("compilation of module `{module}` was lost by its worker")]
    UnitLost { module: String },
}

/// Result type alias for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;
