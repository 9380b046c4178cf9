/// SyncPrimitive - GPU-signalable/waitable semaphores and fences

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::rhi::{RhiHandle, SyncPrimitiveType};

/// Backend operations on raw sync handles
///
/// Implemented by the device backend. `SyncPrimitive` owns one handle and
/// calls back into this to wait on and destroy it.
pub trait SyncBackend: Send + Sync {
    /// Create a semaphore, timeline semaphore or fence
    fn create_sync_primitive(&self, kind: SyncPrimitiveType, name: &str) -> Result<RhiHandle>;

    /// Destroy a handle created by `create_sync_primitive`
    fn destroy_sync_primitive(&self, kind: SyncPrimitiveType, handle: RhiHandle);

    /// Block until the fence is signaled; `Ok(false)` on timeout
    fn wait_fence(&self, fence: RhiHandle, timeout: Duration) -> Result<bool>;

    /// Non-blocking fence status
    fn fence_signaled(&self, fence: RhiHandle) -> Result<bool>;

    /// Return the fence to the unsignaled state
    fn reset_fence(&self, fence: RhiHandle) -> Result<()>;

    /// Block until the timeline reaches `value`; `Ok(false)` on timeout
    fn wait_timeline(&self, semaphore: RhiHandle, value: u64, timeout: Duration) -> Result<bool>;

    /// Current timeline counter
    fn timeline_value(&self, semaphore: RhiHandle) -> Result<u64>;
}

/// A semaphore or fence owned by one component
///
/// The `has_been_waited_for` flag records that a wait on the current signal has
/// already been queued, so the same signal is never awaited twice. The backend
/// handle is destroyed when the primitive is dropped.
pub struct SyncPrimitive {
    kind: SyncPrimitiveType,
    name: String,
    rhi_resource: RhiHandle,
    has_been_waited_for: AtomicBool,
    wait_value: AtomicU64,
    backend: Arc<dyn SyncBackend>,
}

impl SyncPrimitive {
    /// Create a new sync primitive
    ///
    /// # Arguments
    ///
    /// * `backend` - Backend that owns the raw handle
    /// * `kind` - Semaphore, timeline semaphore or fence
    /// * `name` - Debug name
    pub fn new(backend: Arc<dyn SyncBackend>, kind: SyncPrimitiveType, name: &str) -> Result<Self> {
        let rhi_resource = backend.create_sync_primitive(kind, name)?;

        Ok(Self {
            kind,
            name: name.to_string(),
            rhi_resource,
            has_been_waited_for: AtomicBool::new(false),
            wait_value: AtomicU64::new(0),
            backend,
        })
    }

    pub fn primitive_type(&self) -> SyncPrimitiveType {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw backend handle
    pub fn rhi_resource(&self) -> RhiHandle {
        self.rhi_resource
    }

    /// Whether a wait on the current signal has already been queued
    pub fn has_been_waited_for(&self) -> bool {
        self.has_been_waited_for.load(Ordering::Acquire)
    }

    pub fn set_waited_for(&self, waited: bool) {
        self.has_been_waited_for.store(waited, Ordering::Release);
    }

    /// Timeline value the next wait targets
    pub fn wait_value(&self) -> u64 {
        self.wait_value.load(Ordering::Acquire)
    }

    pub fn set_wait_value(&self, value: u64) {
        self.wait_value.store(value, Ordering::Release);
    }

    /// CPU wait on a fence or timeline semaphore
    ///
    /// Binary semaphores can only be waited on by the GPU.
    pub fn wait(&self, timeout: Duration) -> Result<bool> {
        match self.kind {
            SyncPrimitiveType::Fence => self.backend.wait_fence(self.rhi_resource, timeout),
            SyncPrimitiveType::SemaphoreTimeline => {
                self.backend.wait_timeline(self.rhi_resource, self.wait_value(), timeout)
            }
            SyncPrimitiveType::Semaphore => Err(Error::ContractViolation(format!(
                "binary semaphore '{}' cannot be waited on by the CPU",
                self.name
            ))),
        }
    }

    /// Non-blocking signal check for fences and timeline semaphores
    pub fn is_signaled(&self) -> Result<bool> {
        match self.kind {
            SyncPrimitiveType::Fence => self.backend.fence_signaled(self.rhi_resource),
            SyncPrimitiveType::SemaphoreTimeline => {
                Ok(self.backend.timeline_value(self.rhi_resource)? >= self.wait_value())
            }
            SyncPrimitiveType::Semaphore => Err(Error::ContractViolation(format!(
                "binary semaphore '{}' has no CPU-visible state",
                self.name
            ))),
        }
    }

    /// Reset a fence so it can be signaled again
    pub fn reset(&self) -> Result<()> {
        match self.kind {
            SyncPrimitiveType::Fence => {
                self.backend.reset_fence(self.rhi_resource)?;
                self.set_waited_for(false);
                Ok(())
            }
            _ => Err(Error::ContractViolation(format!(
                "only fences can be reset, '{}' is a {:?}",
                self.name, self.kind
            ))),
        }
    }
}

impl fmt::Debug for SyncPrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncPrimitive")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("rhi_resource", &self.rhi_resource)
            .field("has_been_waited_for", &self.has_been_waited_for())
            .finish()
    }
}

impl Drop for SyncPrimitive {
    fn drop(&mut self) {
        self.backend.destroy_sync_primitive(self.kind, self.rhi_resource);
    }
}

#[cfg(test)]
#[path = "sync_primitive_tests.rs"]
mod tests;
