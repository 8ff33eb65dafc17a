//! Rio: a Run-In-Order Sequential Task Flow runtime.
//!
//! Tasks declare, up front, which [`Handle`]s they touch and how
//! ([`AccessMode::Read`] or [`AccessMode::Write`]). The runtime assigns each
//! task to a fixed worker by a deterministic [`TaskMapping`] and then runs
//! tasks on each worker strictly in submission order, skipping ahead only
//! when a task's declared accesses prove it cannot race with any
//! lower-numbered task still outstanding on the same handle. The result is
//! the same data-race freedom and sequential consistency a single thread
//! running every task in submission order would give you, with as much
//! parallelism as the dependency graph allows.
//!
//! ```
//! use rio::{AccessMode, Builder};
//! use std::sync::{Arc, Mutex};
//!
//! let runtime = Builder::new().workers(2).build();
//! let total = Arc::new(Mutex::new(0));
//! let handle = runtime.register();
//!
//! for i in 0..10 {
//!     let total = Arc::clone(&total);
//!     runtime
//!         .submit(move || *total.lock().unwrap() += i, &[(handle, AccessMode::Write)])
//!         .unwrap();
//! }
//!
//! runtime.wait_for_all();
//! assert_eq!(*total.lock().unwrap(), 45);
//! ```

mod error;
mod handle;
mod mapping;
mod runtime;
mod task;
mod worker;

pub use error::{Result, RioError};
pub use handle::Handle;
pub use mapping::{ModuloMapping, TaskMapping};
pub use runtime::{Builder, Runtime};
pub use task::{Access, AccessMode, Kernel, TaskId};
