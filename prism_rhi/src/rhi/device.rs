/// Collaborator traits the swapchain drives
///
/// A backend crate implements `Device`, `Queue` and `CommandList` on top of a
/// native graphics API. `Window`, `Display` and `FramePacer` come from the
/// windowing and timing side of the application.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::Result;
use crate::rhi::{
    AcquireStatus, CommandListState, Format, HdrMetadata, ImageLayout, ObjectId, PresentMode,
    QueueType, ResourceType, RhiHandle, SurfaceCapabilities, SurfaceFormat, SwapchainCreateDesc,
    SyncBackend, SyncPrimitive,
};

// ============================================================================
// Window / display / timing collaborators
// ============================================================================

/// Native window a surface can be created for
pub trait Window: HasWindowHandle + HasDisplayHandle + Send + Sync {
    /// Current client area size in physical pixels
    fn size(&self) -> (u32, u32);
}

impl Window for winit::window::Window {
    fn size(&self) -> (u32, u32) {
        let size = self.inner_size();
        (size.width, size.height)
    }
}

/// Information about the monitor the window is on
pub trait Display: Send + Sync {
    /// Whether the display can show HDR content
    fn hdr_supported(&self) -> bool;

    /// Peak luminance in nits
    fn luminance_max(&self) -> f32;
}

/// Plain display description
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayInfo {
    pub hdr: bool,
    pub luminance_max: f32,
}

impl Default for DisplayInfo {
    fn default() -> Self {
        Self {
            hdr: false,
            luminance_max: 300.0,
        }
    }
}

impl Display for DisplayInfo {
    fn hdr_supported(&self) -> bool {
        self.hdr
    }

    fn luminance_max(&self) -> f32 {
        self.luminance_max
    }
}

/// Frame pacing collaborator told about vsync changes
pub trait FramePacer: Send + Sync {
    fn on_vsync_toggled(&self, enabled: bool);
}

// ============================================================================
// Command list / queue
// ============================================================================

/// The slice of command list functionality the swapchain consumes
pub trait CommandList: Send {
    fn name(&self) -> &str;

    fn state(&self) -> CommandListState;

    /// Record a layout transition for a single-mip, single-layer color image
    fn insert_barrier_texture(
        &mut self,
        image: RhiHandle,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
    ) -> Result<()>;

    /// Swapchain this command list renders into, if any
    fn swapchain_id(&self) -> Option<ObjectId>;

    fn set_swapchain_id(&mut self, id: ObjectId);

    /// Semaphore signaled when this command list finishes executing
    fn rendering_complete_semaphore(&self) -> Option<Arc<SyncPrimitive>>;
}

/// GPU queue
pub trait Queue: Send + Sync {
    fn queue_type(&self) -> QueueType;

    /// Command list currently being recorded or most recently submitted
    fn command_list(&self) -> Arc<Mutex<dyn CommandList>>;

    /// Queue a present of `image_index` once every semaphore in `wait_semaphores` is signaled
    fn present(
        &self,
        swapchain: RhiHandle,
        image_index: u32,
        wait_semaphores: &[Arc<SyncPrimitive>],
    ) -> Result<()>;

    /// Block until the queue is idle
    fn wait(&self) -> Result<()>;
}

// ============================================================================
// Device
// ============================================================================

/// Device / adapter services used by the swapchain
pub trait Device: Send + Sync {
    /// Whether the adapter can render at this resolution
    fn is_valid_resolution(&self, width: u32, height: u32) -> bool;

    fn queue_family_index(&self, queue_type: QueueType) -> u32;

    fn queue(&self, queue_type: QueueType) -> Arc<dyn Queue>;

    /// Backend used to create and destroy sync primitives
    fn sync_backend(&self) -> Arc<dyn SyncBackend>;

    // ----- surface -----

    fn create_surface(&self, window: &dyn Window) -> Result<RhiHandle>;

    fn destroy_surface(&self, surface: RhiHandle);

    /// Whether `queue_family` can present to `surface`
    fn surface_present_support(&self, surface: RhiHandle, queue_family: u32) -> Result<bool>;

    fn surface_capabilities(&self, surface: RhiHandle) -> Result<SurfaceCapabilities>;

    fn surface_formats(&self, surface: RhiHandle) -> Result<Vec<SurfaceFormat>>;

    fn surface_present_modes(&self, surface: RhiHandle) -> Result<Vec<PresentMode>>;

    // ----- swapchain -----

    fn create_swapchain(&self, desc: &SwapchainCreateDesc) -> Result<RhiHandle>;

    fn destroy_swapchain(&self, swapchain: RhiHandle);

    fn swapchain_images(&self, swapchain: RhiHandle) -> Result<Vec<RhiHandle>>;

    /// Advisory static HDR metadata
    fn set_hdr_metadata(&self, swapchain: RhiHandle, metadata: &HdrMetadata) -> Result<()>;

    /// One driver acquire call, signaling `semaphore` when the image is ready
    fn acquire_next_image(
        &self,
        swapchain: RhiHandle,
        semaphore: &SyncPrimitive,
        timeout: Duration,
    ) -> AcquireStatus;

    fn create_image_view(&self, image: RhiHandle, format: Format) -> Result<RhiHandle>;

    // ----- submission / lifetime -----

    /// Record into a one-shot command list, submit it and wait for completion
    fn immediate_submit(
        &self,
        queue_type: QueueType,
        record: &mut dyn FnMut(&mut dyn CommandList) -> Result<()>,
    ) -> Result<()>;

    /// Destroy a resource once no in-flight frame can reference it
    fn deletion_queue_add(&self, resource_type: ResourceType, handle: RhiHandle);

    /// Block until every queue of the device is idle
    fn wait_all_queues(&self) -> Result<()>;

    /// Attach a debug name to a resource
    fn set_resource_name(&self, handle: RhiHandle, resource_type: ResourceType, name: &str);
}
