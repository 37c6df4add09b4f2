// This module is the top-level compilation entry. Compiler owns a pass pipeline (the
// canonical registry order by default), verifies a module's boundary invariants, then
// enters a fresh CompilerContext and runs each pass constructed in that context's
// arena — the whole batch of pass objects and analysis scratch dies with the unit.
// CompilerTask binds one module compilation to one thread-pool task so independent
// modules optimize in parallel, each inside its own context and arena on its own
// worker; compile_modules_parallel fans a batch out and collects results in
// submission order. Results report whether the pipeline changed each module;
// boundary-invariant violations come back as errors instead of entering the pass
// pipeline at all.

//! Top-level compilation driver.
//!
//! ```
//! use tensorc::{Compiler, ir};
//!
//! let mut module = ir::Module::new("unit");
//! // ... populate the module ...
//! let compiler = Compiler::new();
//! match compiler.compile_module(&mut module) {
//!     Ok(changed) => println!("optimized in place, changed: {changed}"),
//!     Err(e) => eprintln!("rejected: {e}"),
//! }
//! ```

use std::rc::Rc;

use crossbeam_channel::{unbounded, Sender};

use crate::context::{CompilerContext, ContextScope};
use crate::error::{CompileError, CompileResult};
use crate::ir::Module;
use crate::pass::{make_pass, Pass, PassId};
use crate::pool::{Task, ThreadPool};

/// Drives the configured pass pipeline over modules.
#[derive(Clone)]
pub struct Compiler {
    pipeline: Vec<PassId>,
}

impl Compiler {
    /// Compiler with the canonical pipeline ([`PassId::ALL`] order).
    pub fn new() -> Self {
        Self {
            pipeline: PassId::ALL.to_vec(),
        }
    }

    /// Compiler with an explicit pipeline.
    pub fn with_pipeline(pipeline: Vec<PassId>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &[PassId] {
        &self.pipeline
    }

    /// Run the pipeline over `module` inside a fresh context.
    ///
    /// Returns whether any pass changed the module. Boundary-invariant
    /// violations are reported as errors before any pass runs.
    pub fn compile_module(&self, module: &mut Module) -> CompileResult<bool> {
        module.verify()?;

        let scope = ContextScope::enter(CompilerContext::new());
        let cc = Rc::clone(scope.context());
        let mut changed = false;
        for &id in &self.pipeline {
            let mut pass = make_pass(id, Some(cc.as_ref()));
            log::debug!(
                "running pass `{}` on module `{}`",
                pass.name(),
                module.name(),
            );
            let pass_changed = pass.run(cc.as_ref(), module);
            log::debug!(
                "pass `{}` {} module `{}`",
                pass.name(),
                if pass_changed { "changed" } else { "did not change" },
                module.name(),
            );
            changed |= pass_changed;
        }
        log::info!(
            "compiled module `{}`: {} pass(es), {} instruction(s) remain, arena used {} byte(s)",
            module.name(),
            self.pipeline.len(),
            module.instruction_count(),
            cc.arena().pos(),
        );
        Ok(changed)
    }

    /// Compile independent modules in parallel, one pool task per module.
    ///
    /// Results come back in submission order. A module whose worker failed
    /// before reporting — or that was rejected by a shutting-down pool — is
    /// reported as [`CompileError::UnitLost`].
    pub fn compile_modules_parallel(
        &self,
        modules: Vec<Module>,
        pool: &ThreadPool,
    ) -> Vec<CompileResult<(Module, bool)>> {
        let names: Vec<String> = modules.iter().map(|m| m.name().to_string()).collect();
        let count = modules.len();
        let (reply, results) = unbounded();

        for (index, module) in modules.into_iter().enumerate() {
            let task = CompilerTask {
                pipeline: self.pipeline.clone(),
                module,
                index,
                reply: reply.clone(),
            };
            if !pool.run(Box::new(task)) {
                let _ = reply.send((
                    index,
                    Err(CompileError::UnitLost {
                        module: names[index].clone(),
                    }),
                ));
            }
        }
        drop(reply);

        let mut collected: Vec<Option<CompileResult<(Module, bool)>>> =
            (0..count).map(|_| None).collect();
        // The channel disconnects once every task has reported or dropped
        // its sender, so this cannot wait on a lost unit forever.
        while let Ok((index, result)) = results.recv() {
            collected[index] = Some(result);
        }
        collected
            .into_iter()
            .enumerate()
            .map(|(index, result)| {
                result.unwrap_or_else(|| {
                    Err(CompileError::UnitLost {
                        module: names[index].clone(),
                    })
                })
            })
            .collect()
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// One module compilation bound to one pool task.
struct CompilerTask {
    pipeline: Vec<PassId>,
    module: Module,
    index: usize,
    reply: Sender<(usize, CompileResult<(Module, bool)>)>,
}

impl Task for CompilerTask {
    fn run(self: Box<Self>) {
        let CompilerTask {
            pipeline,
            mut module,
            index,
            reply,
        } = *self;
        let compiler = Compiler::with_pipeline(pipeline);
        let result = compiler
            .compile_module(&mut module)
            .map(|changed| (module, changed));
        let _ = reply.send((index, result));
    }
}
