/// VulkanContext - Shared Vulkan state for every backend object
///
/// Holds the instance, the logical device and the extension loaders. Queues,
/// command lists and sync primitives keep an `Arc<VulkanContext>`, so the
/// device and instance are destroyed only after the last of them is gone.

use std::ffi::CString;
use std::time::Duration;
use ash::vk;
use prism_rhi::prism::Result;
use prism_rhi::prism::rhi::{RhiHandle, SyncBackend, SyncPrimitiveType};
use prism_rhi::{engine_err, engine_error};

use crate::vulkan_conversions::{from_rhi, to_rhi};

pub(crate) const LOG_SOURCE: &str = "prism::vulkan";

/// Shared Vulkan context
pub struct VulkanContext {
    /// Kept alive for as long as the instance exists
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: ash::Device,

    pub(crate) surface_loader: ash::khr::surface::Instance,
    pub(crate) swapchain_loader: ash::khr::swapchain::Device,
    /// `None` when VK_EXT_hdr_metadata is not available
    pub(crate) hdr_metadata_loader: Option<ash::ext::hdr_metadata::Device>,

    /// Debug utils loaders (validation builds only)
    pub(crate) debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    pub(crate) debug_utils_device: Option<ash::ext::debug_utils::Device>,
    pub(crate) debug_messenger: Option<vk::DebugUtilsMessengerEXT>,

    pub(crate) graphics_family: u32,
    pub(crate) compute_family: u32,
    pub(crate) copy_family: u32,

    /// Largest 2D image dimension the adapter supports
    pub(crate) max_image_dimension: u32,
}

/// Vulkan timeouts are in nanoseconds, saturated to `u64::MAX`
pub(crate) fn timeout_ns(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX)
}

impl VulkanContext {
    /// Attach a debug name to a raw object (no-op without debug utils)
    pub(crate) fn set_object_name(&self, object_type: vk::ObjectType, handle: u64, name: &str) {
        let Some(debug_utils) = &self.debug_utils_device else {
            return;
        };
        if handle == 0 {
            return;
        }

        let Ok(c_name) = CString::new(name) else {
            engine_error!(LOG_SOURCE, "Resource name '{}' contains a NUL byte", name);
            return;
        };

        let mut info = vk::DebugUtilsObjectNameInfoEXT::default().object_name(&c_name);
        info.object_type = object_type;
        info.object_handle = handle;

        unsafe {
            if let Err(e) = debug_utils.set_debug_utils_object_name(&info) {
                engine_error!(LOG_SOURCE, "Failed to name object '{}': {:?}", name, e);
            }
        }
    }
}

impl SyncBackend for VulkanContext {
    fn create_sync_primitive(&self, kind: SyncPrimitiveType, name: &str) -> Result<RhiHandle> {
        unsafe {
            let handle = match kind {
                SyncPrimitiveType::Semaphore => {
                    let info = vk::SemaphoreCreateInfo::default();
                    let semaphore = self.device.create_semaphore(&info, None).map_err(|e| {
                        engine_err!(BackendError, LOG_SOURCE, "Failed to create semaphore '{}': {:?}", name, e)
                    })?;
                    self.set_object_name(vk::ObjectType::SEMAPHORE, vk::Handle::as_raw(semaphore), name);
                    to_rhi(semaphore)
                }
                SyncPrimitiveType::SemaphoreTimeline => {
                    let mut type_info = vk::SemaphoreTypeCreateInfo::default()
                        .semaphore_type(vk::SemaphoreType::TIMELINE)
                        .initial_value(0);
                    let info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);
                    let semaphore = self.device.create_semaphore(&info, None).map_err(|e| {
                        engine_err!(BackendError, LOG_SOURCE, "Failed to create timeline semaphore '{}': {:?}", name, e)
                    })?;
                    self.set_object_name(vk::ObjectType::SEMAPHORE, vk::Handle::as_raw(semaphore), name);
                    to_rhi(semaphore)
                }
                SyncPrimitiveType::Fence => {
                    let info = vk::FenceCreateInfo::default();
                    let fence = self.device.create_fence(&info, None).map_err(|e| {
                        engine_err!(BackendError, LOG_SOURCE, "Failed to create fence '{}': {:?}", name, e)
                    })?;
                    self.set_object_name(vk::ObjectType::FENCE, vk::Handle::as_raw(fence), name);
                    to_rhi(fence)
                }
            };

            Ok(handle)
        }
    }

    fn destroy_sync_primitive(&self, kind: SyncPrimitiveType, handle: RhiHandle) {
        if handle.is_null() {
            return;
        }

        unsafe {
            match kind {
                SyncPrimitiveType::Semaphore | SyncPrimitiveType::SemaphoreTimeline => {
                    self.device.destroy_semaphore(from_rhi(handle), None);
                }
                SyncPrimitiveType::Fence => {
                    self.device.destroy_fence(from_rhi(handle), None);
                }
            }
        }
    }

    fn wait_fence(&self, fence: RhiHandle, timeout: Duration) -> Result<bool> {
        let fences = [from_rhi::<vk::Fence>(fence)];
        match unsafe { self.device.wait_for_fences(&fences, true, timeout_ns(timeout)) } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(e) => Err(engine_err!(BackendError, LOG_SOURCE, "Failed to wait for fence {}: {:?}", fence, e)),
        }
    }

    fn fence_signaled(&self, fence: RhiHandle) -> Result<bool> {
        unsafe {
            self.device.get_fence_status(from_rhi(fence)).map_err(|e| {
                engine_err!(BackendError, LOG_SOURCE, "Failed to query fence {}: {:?}", fence, e)
            })
        }
    }

    fn reset_fence(&self, fence: RhiHandle) -> Result<()> {
        let fences = [from_rhi::<vk::Fence>(fence)];
        unsafe {
            self.device.reset_fences(&fences).map_err(|e| {
                engine_err!(BackendError, LOG_SOURCE, "Failed to reset fence {}: {:?}", fence, e)
            })
        }
    }

    fn wait_timeline(&self, semaphore: RhiHandle, value: u64, timeout: Duration) -> Result<bool> {
        let semaphores = [from_rhi::<vk::Semaphore>(semaphore)];
        let values = [value];
        let info = vk::SemaphoreWaitInfo::default()
            .semaphores(&semaphores)
            .values(&values);

        match unsafe { self.device.wait_semaphores(&info, timeout_ns(timeout)) } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(e) => Err(engine_err!(BackendError, LOG_SOURCE, "Failed to wait for timeline {} to reach {}: {:?}", semaphore, value, e)),
        }
    }

    fn timeline_value(&self, semaphore: RhiHandle) -> Result<u64> {
        unsafe {
            self.device
                .get_semaphore_counter_value(from_rhi(semaphore))
                .map_err(|e| {
                    engine_err!(BackendError, LOG_SOURCE, "Failed to read timeline {}: {:?}", semaphore, e)
                })
        }
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();
            self.device.destroy_device(None);

            #[cfg(feature = "vulkan-validation")]
            crate::debug::cleanup();

            // Messenger goes after the device (it reports device destruction) but before the instance
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils_loader, self.debug_messenger) {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}
