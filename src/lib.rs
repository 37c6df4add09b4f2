//! tensorc - Compiler infrastructure for a tensor-graph optimizer.
//!
//! This crate provides the infrastructure layer of the compiler: arena
//! memory for single-compilation-unit working sets, per-thread nested
//! compilation contexts, a closed statically-registered optimization-pass
//! system with a composite dead-code-elimination pass, and a bounded worker
//! pool scheduling independent compilation units.
//!
//! # Primary Usage
//!
//! ```
//! use tensorc::{Compiler, ThreadPool};
//! # use tensorc::ir::Module;
//!
//! // One module, compiled in the calling thread's own context.
//! # let mut module = Module::new("unit");
//! let compiler = Compiler::new();
//! let _ = compiler.compile_module(&mut module);
//!
//! // Independent modules fan out across a worker pool.
//! # let batch: Vec<Module> = Vec::new();
//! let pool = ThreadPool::new(4);
//! let _results = compiler.compile_modules_parallel(batch, &pool);
//! pool.shutdown();
//! ```
//!
//! # Architecture
//!
//! - [`arena`] - Bump-pointer memory for compilation units
//! - [`context`] - Nested per-thread compilation contexts
//! - [`pass`] - Pass contract, closed registry, DCE and expansion passes
//! - [`pool`] - Worker threads for independent compilation units
//! - [`compiler`] - Top-level pipeline driver
//! - [`ir`] - Narrow boundary to the external tensor-IR layer

pub mod arena;
pub mod compiler;
pub mod context;
pub mod error;
pub mod ir;
pub mod pass;
pub mod pool;

// Re-export the component surface.
pub use arena::{Arena, DEFAULT_GRANULE, MAX_ARENA_SIZE};
pub use compiler::Compiler;
pub use context::{CompilerContext, CompilerThread, ContextScope};
pub use error::{CompileError, CompileResult};
pub use pass::{make_pass, Pass, PassHandle, PassId, PassKind};
pub use pool::{Task, ThreadPool};
