// This module implements the worker thread pool that fans independent compilation
// units out across OS threads. The pool owns a FIFO task queue (a crossbeam channel
// with its single sender behind a mutex) and a small amount of worker bookkeeping
// (idle/running/alive counts and join handles) behind one parking_lot mutex — the only
// synchronized structures in the crate. Workers are spawned lazily: a submission
// spawns a new worker only when nobody is idle and the pool is below its bound, so an
// underused pool stays small. Each worker binds one CompilerThread for its lifetime
// and executes tasks to completion; a panicking task is caught at the worker boundary,
// counted and logged, and the worker keeps serving — task failures stay confined to
// their own unit of work. Shutdown is a one-way transition: acceptance stops, the
// queue is closed, in-flight and already-queued tasks drain, and every worker is
// joined. Dropping the pool performs the same drain-join.

//! Bounded worker pool for independent compilation units.
//!
//! Tasks are served in submission order to the next available worker;
//! completion order across workers is not guaranteed. The pool provides no
//! cross-unit synchronization: each task confines its context and arena to
//! the worker executing it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::context::CompilerThread;

/// A unit of work executed to completion on one worker.
pub trait Task: Send {
    fn run(self: Box<Self>);
}

impl<F: FnOnce() + Send> Task for F {
    fn run(self: Box<Self>) {
        (*self)()
    }
}

struct PoolState {
    idle: usize,
    running: usize,
    alive: usize,
    spawned_total: usize,
    handles: Vec<JoinHandle<()>>,
}

struct PoolShared {
    receiver: Receiver<Box<dyn Task>>,
    state: Mutex<PoolState>,
    shutting_down: AtomicBool,
    panicked_tasks: AtomicUsize,
}

/// Bounded set of worker threads executing queued compilation tasks.
pub struct ThreadPool {
    shared: Arc<PoolShared>,
    sender: Mutex<Option<Sender<Box<dyn Task>>>>,
    max_pool_size: usize,
}

impl ThreadPool {
    /// Create a pool that may grow up to `max_pool_size` workers.
    ///
    /// `0` selects the policy default: one worker per available CPU.
    pub fn new(max_pool_size: usize) -> Self {
        let max_pool_size = if max_pool_size == 0 {
            num_cpus::get().max(1)
        } else {
            max_pool_size
        };
        let (sender, receiver) = unbounded();
        Self {
            shared: Arc::new(PoolShared {
                receiver,
                state: Mutex::new(PoolState {
                    idle: 0,
                    running: 0,
                    alive: 0,
                    spawned_total: 0,
                    handles: Vec::new(),
                }),
                shutting_down: AtomicBool::new(false),
                panicked_tasks: AtomicUsize::new(0),
            }),
            sender: Mutex::new(Some(sender)),
            max_pool_size,
        }
    }

    /// Upper bound on concurrently live workers.
    pub fn max_pool_size(&self) -> usize {
        self.max_pool_size
    }

    /// Submit a task. Returns whether it was accepted; tasks are rejected
    /// only after shutdown has begun.
    pub fn run(&self, task: Box<dyn Task>) -> bool {
        {
            let guard = self.sender.lock();
            let Some(sender) = guard.as_ref() else {
                return false;
            };
            if sender.send(task).is_err() {
                return false;
            }
        }
        self.spawn_if_needed();
        true
    }

    /// Submit a closure as a task.
    pub fn run_fn<F: FnOnce() + Send + 'static>(&self, f: F) -> bool {
        self.run(Box::new(f))
    }

    /// Workers currently executing a task.
    pub fn running_workers(&self) -> usize {
        self.shared.state.lock().running
    }

    /// Workers currently waiting for a task.
    pub fn idle_workers(&self) -> usize {
        self.shared.state.lock().idle
    }

    /// Workers spawned over the pool's lifetime.
    pub fn spawned_workers(&self) -> usize {
        self.shared.state.lock().spawned_total
    }

    /// Tasks that panicked and were contained at the worker boundary.
    pub fn panicked_tasks(&self) -> usize {
        self.shared.panicked_tasks.load(Ordering::Relaxed)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shutting_down.load(Ordering::Acquire)
    }

    /// Stop accepting tasks, drain in-flight and queued work, and join every
    /// worker. One-way and idempotent.
    pub fn shutdown(&self) {
        self.shared.shutting_down.store(true, Ordering::Release);
        // Dropping the only sender closes the queue; workers exit once the
        // backlog is drained.
        let sender = self.sender.lock().take();
        drop(sender);

        loop {
            let handles = {
                let mut state = self.shared.state.lock();
                std::mem::take(&mut state.handles)
            };
            let joined_any = !handles.is_empty();
            for handle in handles {
                let _ = handle.join();
            }
            let state = self.shared.state.lock();
            if state.handles.is_empty() && state.alive == 0 {
                break;
            }
            drop(state);
            if !joined_any {
                // A racing submission may still be spawning its worker.
                thread::yield_now();
            }
        }
        log::debug!("thread pool: shut down");
    }

    fn spawn_if_needed(&self) {
        let mut state = self.shared.state.lock();
        if state.idle > 0 || state.alive >= self.max_pool_size {
            return;
        }
        let index = state.spawned_total;
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(format!("tensorc-worker-{index}"))
            .spawn(move || worker_main(shared))
            .unwrap_or_else(|e| panic!("thread pool: failed to spawn worker: {e}"));
        state.spawned_total += 1;
        state.alive += 1;
        state.idle += 1;
        state.handles.push(handle);
        log::debug!("thread pool: spawned worker {index}");
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_main(shared: Arc<PoolShared>) {
    // Bind this worker's CompilerThread for the thread's lifetime.
    CompilerThread::with_current(|_| {});
    loop {
        let task = match shared.receiver.recv() {
            Ok(task) => task,
            Err(_) => break,
        };
        {
            let mut state = shared.state.lock();
            state.idle -= 1;
            state.running += 1;
        }
        // Task failures are the task's own responsibility; contain them so
        // the worker keeps serving other units.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| task.run()));
        if outcome.is_err() {
            shared.panicked_tasks.fetch_add(1, Ordering::Relaxed);
            log::error!("thread pool: task panicked; worker continues");
        }
        {
            let mut state = shared.state.lock();
            state.running -= 1;
            state.idle += 1;
        }
    }
    let mut state = shared.state.lock();
    state.idle -= 1;
    state.alive -= 1;
}
