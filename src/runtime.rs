//! Public API: the `Builder` and `Runtime` entry points described in §4.7.

use crate::error::{Result, RioError};
use crate::handle::Handle;
use crate::mapping::{ModuloMapping, TaskMapping};
use crate::task::{validate_access, Access, Kernel, Task, TaskId};
use crate::worker::{spawn_workers, Inner};
use log::{info, trace};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Builds a [`Runtime`] with a chosen worker count and task mapping.
#[derive(Debug)]
pub struct Builder {
    workers: Option<usize>,
    mapping: Arc<dyn TaskMapping>,
}

impl Builder {
    /// Defaults to one worker per available hardware thread.
    pub const DEFAULT_NUM_WORKERS: Option<usize> = None;

    /// Creates a new builder with the default settings.
    pub fn new() -> Self {
        Self {
            workers: Self::DEFAULT_NUM_WORKERS,
            mapping: Arc::new(ModuloMapping),
        }
    }

    /// Sets the number of worker threads.
    ///
    /// Defaults to [`num_cpus::get`] when left unset. Values are clamped to
    /// at least 1.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers.max(1));
        self
    }

    /// Overrides the task-to-worker mapping.
    ///
    /// Defaults to [`ModuloMapping`]. The chosen mapping is fixed for the
    /// lifetime of the built runtime (§4.3).
    pub fn mapping(mut self, mapping: impl TaskMapping + 'static) -> Self {
        self.mapping = Arc::new(mapping);
        self
    }

    /// Builds the runtime, spawning one thread per worker.
    pub fn build(self) -> Runtime {
        let num_workers = self.workers.unwrap_or_else(num_cpus::get).max(1);
        Runtime::new(num_workers, self.mapping)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

/// A Run-In-Order Sequential Task Flow runtime.
///
/// Register handles with [`register`](Runtime::register), submit tasks with
/// [`submit`](Runtime::submit), and wait for them with
/// [`wait_for_all`](Runtime::wait_for_all). Dropping the runtime (or calling
/// [`shutdown`](Runtime::shutdown) explicitly) drains every worker's queue
/// and joins its thread.
#[derive(Debug)]
pub struct Runtime {
    inner: Arc<Mutex<Inner>>,
    condvar: Arc<Condvar>,
    mapping: Arc<dyn TaskMapping>,
    num_workers: usize,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Runtime {
    fn new(num_workers: usize, mapping: Arc<dyn TaskMapping>) -> Self {
        info!("starting rio runtime with {num_workers} workers");
        let inner = Arc::new(Mutex::new(Inner::new(num_workers)));
        let condvar = Arc::new(Condvar::new());
        let threads = spawn_workers(num_workers, Arc::clone(&inner), Arc::clone(&condvar));
        Self {
            inner,
            condvar,
            mapping,
            num_workers,
            threads: Mutex::new(threads),
        }
    }

    /// The number of worker threads this runtime was built with.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Registers a new handle with an empty outstanding-access list.
    pub fn register(&self) -> Handle {
        let mut guard = self.inner.lock();
        guard.handles.register()
    }

    /// Unregisters a handle.
    ///
    /// # Errors
    ///
    /// Returns [`RioError::HandleBusy`] if the handle still has outstanding
    /// accesses, and [`RioError::UnknownHandle`] if it was never registered
    /// or was already unregistered.
    pub fn unregister(&self, handle: Handle) -> Result<()> {
        let mut guard = self.inner.lock();
        guard.handles.unregister(handle)
    }

    /// Submits a task for execution and returns its identifier.
    ///
    /// The identifier is assigned from a single monotonically increasing
    /// counter and defines the global sequential order (§4.2); submission
    /// is **not** safe to call concurrently from multiple threads — this
    /// crate targets the single-submitter baseline the STF paradigm
    /// assumes, where one control thread issues the whole task stream.
    /// Serialize calls externally if more than one thread may submit.
    ///
    /// # Errors
    ///
    /// Returns [`RioError::RuntimeShutdown`] if [`shutdown`](Runtime::shutdown)
    /// was already requested, [`RioError::UnknownHandle`] if `access`
    /// references a handle that is not currently registered, and
    /// [`RioError::InvalidAccess`] if `access` names the same handle twice.
    pub fn submit(
        &self,
        kernel: impl FnOnce() + Send + 'static,
        access: &[Access],
    ) -> Result<TaskId> {
        self.submit_boxed(Box::new(kernel), access)
    }

    fn submit_boxed(&self, kernel: Kernel, access: &[Access]) -> Result<TaskId> {
        validate_access(access)?;

        let mut guard = self.inner.lock();
        if guard.shutdown_requested {
            return Err(RioError::RuntimeShutdown);
        }
        for (handle, _) in access {
            if !guard.handles.contains(*handle) {
                return Err(RioError::UnknownHandle);
            }
        }

        let id = TaskId(guard.next_task_id);
        guard.next_task_id += 1;
        trace!("submitting task {id} with {} accesses", access.len());

        for (handle, mode) in access {
            guard.handles.record_access(*handle, id, *mode);
        }

        let worker_id = self.mapping.worker_for(id, self.num_workers);
        guard.workers[worker_id].pending.push_back(Task {
            id,
            kernel,
            access: access.to_vec(),
        });
        guard.outstanding += 1;

        self.condvar.notify_all();
        Ok(id)
    }

    /// Blocks until every submitted task has terminated.
    pub fn wait_for_all(&self) {
        let mut guard = self.inner.lock();
        while guard.outstanding != 0 {
            self.condvar.wait(&mut guard);
        }
    }

    /// Waits for all outstanding tasks, then shuts the runtime down.
    ///
    /// Equivalent to calling [`wait_for_all`](Runtime::wait_for_all) and
    /// then dropping the runtime, which requests worker shutdown and joins
    /// every worker thread.
    pub fn shutdown(self) {
        self.wait_for_all();
        // `Drop` performs the actual teardown.
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        info!("shutting down rio runtime");
        {
            let mut guard = self.inner.lock();
            guard.shutdown_requested = true;
        }
        self.condvar.notify_all();

        let mut threads = self.threads.lock();
        for thread in threads.drain(..) {
            let _ = thread.join();
        }
    }
}
