// This module provides the per-thread nested compilation state. A CompilerContext is
// the state hub for exactly one compilation unit: it owns the unit's Arena and lives
// only while its owning scope is active. Contexts nest strictly LIFO per thread; the
// CompilerThread handle materializes lazily in a thread-local and holds the stack of
// live contexts whose top is the thread's current context. Entering is done through
// ContextScope, a guard that pushes on construction and restores the exact previous
// top on drop — on every exit path, including unwinding — which replaces raw
// previous-pointer swapping with scoped acquisition. Contexts are reference-counted
// within their thread and are not Send: a context and its arena never migrate across
// threads, so no locking is involved anywhere in this module.

//! Per-thread nested compilation contexts.
//!
//! Passes and sub-analyses reach "the current compilation's arena" implicitly
//! through [`CompilerContext::current`] instead of threading a handle through
//! every call. Reentrancy (compiling a unit from within another unit) works by
//! nesting scopes; isolation across worker threads comes from the thread-local
//! context stack itself.

use std::cell::RefCell;
use std::rc::Rc;

use crate::arena::Arena;

thread_local! {
    static CURRENT_THREAD: CompilerThread = CompilerThread::new();
}

/// Per-compilation-unit state. Owns the unit's [`Arena`].
pub struct CompilerContext {
    arena: Arena,
}

impl CompilerContext {
    /// Create a context with a default-sized arena.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            arena: Arena::new(),
        })
    }

    /// Create a context whose arena starts with at least `bytes` of capacity.
    pub fn with_arena_capacity(bytes: usize) -> Rc<Self> {
        Rc::new(Self {
            arena: Arena::with_capacity(bytes),
        })
    }

    /// The arena owned by this context.
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// The innermost context entered on this thread.
    ///
    /// Calling this with no live scope on the thread is a programming error
    /// and aborts the compilation with a diagnostic.
    pub fn current() -> Rc<CompilerContext> {
        Self::try_current()
            .unwrap_or_else(|| panic!("compiler context: no context entered on this thread"))
    }

    /// The innermost context entered on this thread, if any.
    pub fn try_current() -> Option<Rc<CompilerContext>> {
        CompilerThread::with_current(|thread| thread.current_context())
    }
}

/// Per-OS-thread compiler state: the stack of live contexts.
///
/// Exactly one instance exists per thread of execution; it is created the
/// first time the thread touches compiler state and lives until thread exit.
pub struct CompilerThread {
    contexts: RefCell<Vec<Rc<CompilerContext>>>,
}

impl CompilerThread {
    fn new() -> Self {
        Self {
            contexts: RefCell::new(Vec::new()),
        }
    }

    /// Run `f` with this thread's `CompilerThread` handle.
    pub fn with_current<R>(f: impl FnOnce(&CompilerThread) -> R) -> R {
        CURRENT_THREAD.with(f)
    }

    /// Number of live contexts on this thread.
    pub fn context_depth(&self) -> usize {
        self.contexts.borrow().len()
    }

    /// The top of the context stack, if any.
    pub fn current_context(&self) -> Option<Rc<CompilerContext>> {
        self.contexts.borrow().last().cloned()
    }

    fn push(&self, ctx: Rc<CompilerContext>) {
        self.contexts.borrow_mut().push(ctx);
    }

    fn pop(&self, expected: &Rc<CompilerContext>) {
        let popped = self
            .contexts
            .borrow_mut()
            .pop()
            .unwrap_or_else(|| panic!("compiler context: scope exited with empty context stack"));
        if !Rc::ptr_eq(&popped, expected) && !std::thread::panicking() {
            panic!("compiler context: non-LIFO scope exit");
        }
    }
}

/// Guard that keeps a context current for the duration of a scope.
///
/// Dropping the guard restores the previous current context, whatever the
/// exit path.
pub struct ContextScope {
    ctx: Rc<CompilerContext>,
}

impl ContextScope {
    /// Install `ctx` as the thread's current context.
    pub fn enter(ctx: Rc<CompilerContext>) -> Self {
        CompilerThread::with_current(|thread| {
            log::trace!(
                "entering compilation context at depth {}",
                thread.context_depth(),
            );
            thread.push(Rc::clone(&ctx));
        });
        Self { ctx }
    }

    /// The context held current by this scope.
    pub fn context(&self) -> &Rc<CompilerContext> {
        &self.ctx
    }
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        CompilerThread::with_current(|thread| thread.pop(&self.ctx));
    }
}
