//! Worker Queue, Dependency Resolver, Worker Thread, and the Termination
//! Barrier's shared counter: everything that lives behind the runtime's
//! single lock.

use crate::handle::HandleRegistry;
use crate::task::{AccessMode, Task, TaskId};
use log::{debug, error, info, trace};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

/// A worker's execution state, per §4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerState {
    Idle,
    Executing(TaskId),
    Stopped,
}

/// A worker's FIFO-by-task-id pending queue.
///
/// Only the head is ever a candidate for execution; this in-order-per-worker
/// constraint is the Run-In-Order refinement's central simplification.
#[derive(Debug)]
pub(crate) struct WorkerQueue {
    pub id: usize,
    pub state: WorkerState,
    pub pending: VecDeque<Task>,
}

impl WorkerQueue {
    fn new(id: usize) -> Self {
        Self {
            id,
            state: WorkerState::Idle,
            pending: VecDeque::new(),
        }
    }
}

/// The state shared by the submitter and every worker thread, behind one
/// lock.
///
/// A single global lock (rather than per-handle or per-worker locks) is
/// the baseline this crate ships: it is trivially correct, and the lock is
/// never held across a kernel invocation (§5, Lock discipline), so
/// contention only ever covers bookkeeping, not kernel runtime. Finer
/// locking is a valid refinement the spec leaves open for workloads whose
/// task granularity falls below roughly a microsecond; see `DESIGN.md`.
#[derive(Debug)]
pub(crate) struct Inner {
    pub handles: HandleRegistry,
    pub workers: Vec<WorkerQueue>,
    pub next_task_id: u64,
    pub outstanding: usize,
    pub shutdown_requested: bool,
}

impl Inner {
    pub fn new(num_workers: usize) -> Self {
        Self {
            handles: HandleRegistry::default(),
            workers: (0..num_workers).map(WorkerQueue::new).collect(),
            next_task_id: 0,
            outstanding: 0,
            shutdown_requested: false,
        }
    }

    /// The readiness predicate of §4.4, evaluated against the current
    /// `minA`/`minW` aggregates.
    fn is_ready(&self, task: &Task) -> bool {
        task.access.iter().all(|(handle, mode)| match mode {
            AccessMode::Read => self
                .handles
                .min_writer(*handle)
                .is_none_or(|writer| writer >= task.id),
            AccessMode::Write => self
                .handles
                .min_accessor(*handle)
                .is_none_or(|accessor| accessor >= task.id),
        })
    }

    /// Pops the head of `worker_id`'s queue if it is ready, marking the
    /// worker `Executing`.
    fn try_take_ready(&mut self, worker_id: usize) -> Option<Task> {
        let ready = match self.workers[worker_id].pending.front() {
            Some(task) => self.is_ready(task),
            None => false,
        };
        if !ready {
            return None;
        }
        let task = self.workers[worker_id]
            .pending
            .pop_front()
            .expect("front() returned Some above");
        trace!("worker {worker_id} taking task {}", task.id);
        self.workers[worker_id].state = WorkerState::Executing(task.id);
        Some(task)
    }
}

/// Spawns one OS thread per worker and returns their join handles.
///
/// Each thread runs [`worker_loop`] against the shared, lock-protected
/// [`Inner`] state and the shared wake-up [`Condvar`], per §5's
/// true-parallelism, one-thread-per-worker scheduling model.
pub(crate) fn spawn_workers(
    num_workers: usize,
    inner: Arc<Mutex<Inner>>,
    condvar: Arc<Condvar>,
) -> Vec<JoinHandle<()>> {
    (0..num_workers)
        .map(|id| {
            let inner = Arc::clone(&inner);
            let condvar = Arc::clone(&condvar);
            std::thread::Builder::new()
                .name(format!("rio-worker-{id}"))
                .spawn(move || worker_loop(id, inner, condvar))
                .expect("failed to spawn rio worker thread")
        })
        .collect()
}

fn worker_loop(id: usize, inner: Arc<Mutex<Inner>>, condvar: Arc<Condvar>) {
    info!("worker {id} started");
    loop {
        let task = {
            let mut guard = inner.lock();
            loop {
                if let Some(task) = guard.try_take_ready(id) {
                    break Some(task);
                }
                if guard.shutdown_requested && guard.workers[id].pending.is_empty() {
                    trace!("worker {id} draining, no more pending tasks");
                    guard.workers[id].state = WorkerState::Stopped;
                    break None;
                }
                trace!("worker {id} parking, head not ready");
                condvar.wait(&mut guard);
            }
        };

        let Some(task) = task else {
            break;
        };

        let Task { id: tid, kernel, access } = task;
        debug!("worker {id} running task {tid}");

        // Kernels run with no runtime lock held (§5, Lock discipline).
        let result = panic::catch_unwind(AssertUnwindSafe(kernel));

        {
            let mut guard = inner.lock();
            for (handle, _) in &access {
                guard.handles.clear_access(*handle, tid);
            }
            guard.workers[id].state = WorkerState::Idle;
            guard.outstanding -= 1;
            condvar.notify_all();
        }

        if let Err(payload) = result {
            error!("task {tid} panicked on worker {id}, propagating");
            // The runtime's own bookkeeping above already ran, so resuming
            // the unwind here only terminates this worker thread (and, under
            // the default panic hook, the process) without corrupting state
            // for tasks that were never touched by the panicking kernel.
            panic::resume_unwind(payload);
        }
    }
    info!("worker {id} stopped");
}
