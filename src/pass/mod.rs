// This module defines the optimization-pass abstraction and its closed registry. Every
// pass exposes the uniform {kind, name, run} contract; run reports whether the pass
// changed its input. The registry is the PassId enum: a finite, exhaustively matched
// set fixed when the crate is built, so requesting an unregistered pass is not a
// run-time condition — it cannot be written down. make_pass constructs a registered
// pass either on the heap (caller owned) or inside a CompilerContext's arena, where
// the storage lives until whole-arena teardown and is never individually freed; the
// PassHandle enum carries that ownership distinction explicitly and derefs to the
// pass object either way. Pass pipelines stay auditable and reproducible because the
// one canonical pass table below is the only place passes are enumerated.

//! Optimization passes and the closed pass registry.
//!
//! Construct passes through [`make_pass`]; the set of constructible passes is
//! [`PassId`], fixed at build time. Pass objects placed in a context's arena
//! must not outlive that context and are released only at arena teardown.

use std::ops::{Deref, DerefMut};

use crate::context::CompilerContext;
use crate::ir::Module;

pub mod dce;
pub mod expand_batch_norm;

pub use dce::{AuditFacts, DceTransform, FunctionDce, Liveness, LivenessAnalysis, ModuleAudit, ModuleDce};
pub use expand_batch_norm::ExpandBatchNorm;

/// What a pass operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Operates on one function at a time.
    Function,
    /// Operates on a whole module.
    Module,
    /// Module-scoped pass composed of sub-analyses and a transform.
    Composite,
}

/// Uniform contract of every optimization pass.
pub trait Pass {
    fn kind(&self) -> PassKind;

    /// Stable, non-empty identifier used for logging and diagnostics.
    fn name(&self) -> &'static str;

    /// Run over `module`; returns whether anything changed. A `false` return
    /// is a normal outcome, not a failure. Violated IR invariants encountered
    /// mid-run are fatal.
    fn run(&mut self, cc: &CompilerContext, module: &mut Module) -> bool;
}

/// The closed set of registered passes.
///
/// This is the crate's one canonical pass table. Extending the optimizer
/// means adding a variant here and an arm in [`make_pass`]; the compiler
/// enforces exhaustiveness of both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    ExpandBatchNorm,
    FunctionDce,
    ModuleDce,
}

impl PassId {
    /// Every registered pass, in canonical pipeline order.
    pub const ALL: [PassId; 3] = [PassId::ExpandBatchNorm, PassId::FunctionDce, PassId::ModuleDce];

    /// Stable name, identical to the constructed pass's `name()`.
    pub fn name(self) -> &'static str {
        match self {
            PassId::ExpandBatchNorm => ExpandBatchNorm::NAME,
            PassId::FunctionDce => FunctionDce::NAME,
            PassId::ModuleDce => ModuleDce::NAME,
        }
    }

    /// Kind of the pass this id constructs.
    pub fn kind(self) -> PassKind {
        match self {
            PassId::ExpandBatchNorm => PassKind::Module,
            PassId::FunctionDce => PassKind::Function,
            PassId::ModuleDce => PassKind::Composite,
        }
    }
}

/// A constructed pass together with where its storage lives.
pub enum PassHandle<'cc> {
    /// Heap-constructed; owned by the caller.
    Heap(Box<dyn Pass>),
    /// Placement-constructed in a context's arena; the arena owns the
    /// storage and releases it only at teardown. Never individually freed.
    Arena(&'cc mut (dyn Pass + 'static)),
}

impl Deref for PassHandle<'_> {
    type Target = dyn Pass;

    fn deref(&self) -> &Self::Target {
        match self {
            PassHandle::Heap(pass) => pass.as_ref(),
            PassHandle::Arena(pass) => &**pass,
        }
    }
}

impl DerefMut for PassHandle<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            PassHandle::Heap(pass) => pass.as_mut(),
            PassHandle::Arena(pass) => &mut **pass,
        }
    }
}

/// Construct the registered pass `id`.
///
/// With `cc` absent the pass is heap-allocated; with `cc` present it is
/// placed in that context's arena and must not outlive the context.
pub fn make_pass(id: PassId, cc: Option<&CompilerContext>) -> PassHandle<'_> {
    match id {
        PassId::ExpandBatchNorm => construct(cc, ExpandBatchNorm::new()),
        PassId::FunctionDce => construct(cc, FunctionDce::new()),
        PassId::ModuleDce => construct(cc, ModuleDce::new()),
    }
}

fn construct<P: Pass + 'static>(cc: Option<&CompilerContext>, pass: P) -> PassHandle<'_> {
    match cc {
        None => PassHandle::Heap(Box::new(pass)),
        Some(cc) => PassHandle::Arena(cc.arena().alloc(pass)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_names_are_stable_and_nonempty() {
        for &id in &PassId::ALL {
            let pass = make_pass(id, None);
            assert!(!pass.name().is_empty());
            assert_eq!(pass.name(), id.name());
            assert_eq!(pass.kind(), id.kind());

            // A second construction reports the identical name.
            let again = make_pass(id, None);
            assert_eq!(again.name(), pass.name());
        }
    }

    #[test]
    fn arena_constructed_passes_match_heap_constructed() {
        let cc = CompilerContext::new();
        for &id in &PassId::ALL {
            let heap = make_pass(id, None);
            let arena = make_pass(id, Some(&cc));
            assert_eq!(heap.name(), arena.name());
            assert_eq!(heap.kind(), arena.kind());
        }
        assert!(cc.arena().pos() > 0);
    }
}
