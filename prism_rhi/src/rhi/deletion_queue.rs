/// DeletionQueue - deferred destruction of GPU resources
///
/// Resources that an in-flight frame may still reference are parked here with
/// the frame generation at which they stopped being referenced. Once the device
/// has finished every frame up to that generation they can be freed.

use crate::rhi::{ResourceType, RhiHandle};

/// A parked resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDeletion {
    pub resource_type: ResourceType,
    pub handle: RhiHandle,
    /// Frame generation at which the resource became unreferenced
    pub generation: u64,
}

/// Generation-keyed deferred deletion queue
#[derive(Debug, Default)]
pub struct DeletionQueue {
    pending: Vec<PendingDeletion>,
}

impl DeletionQueue {
    pub fn new() -> Self {
        Self { pending: Vec::new() }
    }

    /// Park a resource that became unreferenced at `generation`
    pub fn add(&mut self, resource_type: ResourceType, handle: RhiHandle, generation: u64) {
        if handle.is_null() {
            return;
        }

        self.pending.push(PendingDeletion {
            resource_type,
            handle,
            generation,
        });
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of parked resources of one type
    pub fn count(&self, resource_type: ResourceType) -> usize {
        self.pending
            .iter()
            .filter(|p| p.resource_type == resource_type)
            .count()
    }

    /// Free every resource whose generation the device has completed
    ///
    /// `destroy` is called once per freed resource, in insertion order.
    /// Returns how many were freed.
    pub fn drain_completed<F>(&mut self, completed_generation: u64, mut destroy: F) -> usize
    where
        F: FnMut(ResourceType, RhiHandle),
    {
        let before = self.pending.len();

        self.pending.retain(|p| {
            if p.generation <= completed_generation {
                destroy(p.resource_type, p.handle);
                false
            } else {
                true
            }
        });

        before - self.pending.len()
    }

    /// Free everything, for use after a full device idle
    pub fn drain_all<F>(&mut self, destroy: F) -> usize
    where
        F: FnMut(ResourceType, RhiHandle),
    {
        self.drain_completed(u64::MAX, destroy)
    }
}

#[cfg(test)]
#[path = "deletion_queue_tests.rs"]
mod tests;
