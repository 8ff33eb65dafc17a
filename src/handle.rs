//! Data Handle Registry: stable identities for shared data objects plus the
//! per-handle outstanding-access bookkeeping the dependency resolver reads.

use crate::error::{Result, RioError};
use crate::task::{AccessMode, TaskId};
use log::trace;
use std::collections::{BTreeSet, VecDeque};

/// Opaque identity for a data object registered with a [`Runtime`](crate::Runtime).
///
/// The runtime never sees the payload behind a handle; kernels reach the
/// actual memory through closure capture. A handle carries a generation
/// counter so a freed and reused slot can never alias a handle a caller
/// still holds a stale copy of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct HandleSlot {
    generation: u32,
    occupied: bool,
    accessors: BTreeSet<TaskId>,
    writers: BTreeSet<TaskId>,
}

impl HandleSlot {
    fn new(generation: u32) -> Self {
        Self {
            generation,
            occupied: true,
            accessors: BTreeSet::new(),
            writers: BTreeSet::new(),
        }
    }
}

/// Assigns handles and tracks, per handle, the outstanding `(task_id, mode)`
/// accesses submitted but not yet terminated.
///
/// `minA`/`minW` in the dependency resolver are the minimums of `accessors`
/// and `writers` respectively; a `BTreeSet` keeps insertion, removal, and
/// minimum lookup all `O(log n)` in the number of outstanding accesses on
/// that handle, which in practice stays small.
#[derive(Debug, Default)]
pub(crate) struct HandleRegistry {
    slots: Vec<HandleSlot>,
    free: VecDeque<u32>,
}

impl HandleRegistry {
    pub fn register(&mut self) -> Handle {
        if let Some(index) = self.free.pop_front() {
            let slot = &mut self.slots[index as usize];
            slot.occupied = true;
            trace!("reusing handle slot {index} at generation {}", slot.generation);
            Handle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(HandleSlot::new(0));
            trace!("registered new handle slot {index}");
            Handle {
                index,
                generation: 0,
            }
        }
    }

    pub fn unregister(&mut self, handle: Handle) -> Result<()> {
        if self.slot(handle).is_none() {
            return Err(RioError::UnknownHandle);
        }
        if !self.slot(handle).unwrap().accessors.is_empty() {
            return Err(RioError::HandleBusy);
        }

        let slot = &mut self.slots[handle.index as usize];
        slot.occupied = false;
        // Discard the slot for good once the generation counter saturates,
        // rather than wrapping it back to zero and risking an alias.
        if slot.generation != u32::MAX {
            slot.generation += 1;
            self.free.push_back(handle.index);
        }
        trace!("unregistered handle slot {}", handle.index);
        Ok(())
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.slot(handle).is_some()
    }

    pub fn record_access(&mut self, handle: Handle, task: TaskId, mode: AccessMode) {
        let slot = self
            .slot_mut(handle)
            .expect("handle was validated before submission");
        slot.accessors.insert(task);
        if mode == AccessMode::Write {
            slot.writers.insert(task);
        }
    }

    pub fn clear_access(&mut self, handle: Handle, task: TaskId) {
        if let Some(slot) = self.slot_mut(handle) {
            slot.accessors.remove(&task);
            slot.writers.remove(&task);
        }
    }

    /// `minA(H)`: the smallest outstanding task identifier accessing `H`.
    pub fn min_accessor(&self, handle: Handle) -> Option<TaskId> {
        self.slot(handle).and_then(|s| s.accessors.first().copied())
    }

    /// `minW(H)`: the smallest outstanding task identifier writing `H`.
    pub fn min_writer(&self, handle: Handle) -> Option<TaskId> {
        self.slot(handle).and_then(|s| s.writers.first().copied())
    }

    fn slot(&self, handle: Handle) -> Option<&HandleSlot> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.occupied && s.generation == handle.generation)
    }

    fn slot_mut(&mut self, handle: Handle) -> Option<&mut HandleSlot> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.occupied && s.generation == handle.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_unregister_roundtrip_is_a_noop() {
        let mut registry = HandleRegistry::default();
        let h = registry.register();
        assert!(registry.contains(h));
        registry.unregister(h).unwrap();
        assert!(!registry.contains(h));
    }

    #[test]
    fn unregister_unknown_handle_fails() {
        let mut registry = HandleRegistry::default();
        let h = registry.register();
        registry.unregister(h).unwrap();
        assert_eq!(registry.unregister(h), Err(RioError::UnknownHandle));
    }

    #[test]
    fn unregister_busy_handle_fails() {
        let mut registry = HandleRegistry::default();
        let h = registry.register();
        registry.record_access(h, TaskId::new_for_test(0), AccessMode::Read);
        assert_eq!(registry.unregister(h), Err(RioError::HandleBusy));
        registry.clear_access(h, TaskId::new_for_test(0));
        assert!(registry.unregister(h).is_ok());
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut registry = HandleRegistry::default();
        let h1 = registry.register();
        registry.unregister(h1).unwrap();
        let h2 = registry.register();
        assert_ne!(h1, h2);
        assert!(!registry.contains(h1));
        assert!(registry.contains(h2));
    }

    #[test]
    fn min_aggregates_track_outstanding_accesses() {
        let mut registry = HandleRegistry::default();
        let h = registry.register();
        let t0 = TaskId::new_for_test(0);
        let t1 = TaskId::new_for_test(1);
        let t2 = TaskId::new_for_test(2);

        registry.record_access(h, t1, AccessMode::Read);
        registry.record_access(h, t2, AccessMode::Write);
        assert_eq!(registry.min_accessor(h), Some(t1));
        assert_eq!(registry.min_writer(h), Some(t2));

        registry.record_access(h, t0, AccessMode::Write);
        assert_eq!(registry.min_accessor(h), Some(t0));
        assert_eq!(registry.min_writer(h), Some(t0));

        registry.clear_access(h, t0);
        assert_eq!(registry.min_accessor(h), Some(t1));
        assert_eq!(registry.min_writer(h), Some(t2));
    }
}
