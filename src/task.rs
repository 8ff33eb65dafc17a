//! Task Descriptor: the immutable record of a task's kernel and its access
//! list, plus the strictly increasing identifier that defines submission
//! order.

use crate::error::{Result, RioError};
use crate::handle::Handle;
use rustc_hash::FxHashSet;
use std::fmt;

/// The user-provided computation of a task.
///
/// Invoked with no runtime-visible arguments other than whatever the
/// caller's closure captured; the kernel must not touch a handle outside
/// its declared access list. The runtime does not inspect the kernel's
/// return value, and assumes it is total: a kernel that panics terminates
/// the worker thread (see [`Runtime::submit`](crate::Runtime::submit)).
pub type Kernel = Box<dyn FnOnce() + Send + 'static>;

/// How a task uses one of its declared handles.
///
/// There is no `None` variant: a handle simply absent from a task's access
/// list *is* the "does not touch" case, so a third variant would only add
/// an unreachable arm to every match on this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// The task reads the handle's data.
    Read,
    /// The task reads and/or writes the handle's data.
    Write,
}

/// A strictly increasing identifier assigned to a task at submission.
///
/// Defines the global sequential order the runtime's readiness predicate
/// and the [`TaskMapping`](crate::mapping::TaskMapping) are phrased over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    /// The raw sequence number, for implementing a custom
    /// [`TaskMapping`](crate::mapping::TaskMapping).
    pub fn value(self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An access list entry: which handle, and in which mode.
pub type Access = (Handle, AccessMode);

pub(crate) struct Task {
    pub id: TaskId,
    pub kernel: Kernel,
    pub access: Vec<Access>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

/// Rejects an access list that names the same handle twice, per §4.4: "A
/// task that accesses the same handle twice ... must be rejected at
/// submission as `InvalidAccess`."
pub(crate) fn validate_access(access: &[Access]) -> Result<()> {
    let mut seen = FxHashSet::default();
    for (handle, _) in access {
        if !seen.insert(*handle) {
            return Err(RioError::InvalidAccess);
        }
    }
    Ok(())
}
