//! Mapping Function: the deterministic, fixed-for-the-runtime's-lifetime
//! assignment from task identifier to worker.

use crate::task::TaskId;
use std::fmt::Debug;

/// A deterministic, total function from task identifier to worker index.
///
/// Determinism of the mapping is what lets a worker decide readiness from
/// purely local state — its own queue and the handles the tasks in it
/// touch — instead of consulting a central scheduler. The mapping must
/// stay fixed for the lifetime of the [`Runtime`](crate::Runtime) it was
/// built with.
pub trait TaskMapping: Debug + Send + Sync {
    /// Returns the worker index `task` is assigned to.
    ///
    /// Must return a value in `0..num_workers` and must be a pure function
    /// of its arguments: the same `(task, num_workers)` pair always maps
    /// to the same worker for the lifetime of a runtime.
    fn worker_for(&self, task: TaskId, num_workers: usize) -> usize;
}

/// The canonical mapping: `task_id mod num_workers`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModuloMapping;

impl TaskMapping for ModuloMapping {
    fn worker_for(&self, task: TaskId, num_workers: usize) -> usize {
        (task.value() % num_workers as u64) as usize
    }
}
