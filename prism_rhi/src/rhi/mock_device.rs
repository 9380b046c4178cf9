/// Mock device for unit tests (no GPU required)
///
/// Hands out fake handles, records every call the swapchain makes and lets a
/// test script the driver's acquire results.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};

use crate::error::{Error, Result};
use crate::rhi::{
    AcquireStatus, ColorSpace, CommandList, CommandListState, CompositeAlphaFlags, Device, Extent2D,
    Format, FramePacer, HdrMetadata, ImageLayout, ObjectId, PresentMode, Queue, QueueType,
    ResourceType, RhiHandle, SurfaceCapabilities, SurfaceFormat, SwapchainCreateDesc, SyncBackend,
    SyncPrimitive, SyncPrimitiveType, Window,
};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(0x1000);

fn next_handle() -> RhiHandle {
    RhiHandle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
}

// ============================================================================
// Mock Window
// ============================================================================

/// Window without a native handle; the mock device never looks at it
pub struct MockWindow {
    pub size: Mutex<(u32, u32)>,
}

impl MockWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Mutex::new((width, height)),
        }
    }

    pub fn set_size(&self, width: u32, height: u32) {
        *self.size.lock().unwrap() = (width, height);
    }
}

impl HasWindowHandle for MockWindow {
    fn window_handle(&self) -> std::result::Result<WindowHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl HasDisplayHandle for MockWindow {
    fn display_handle(&self) -> std::result::Result<DisplayHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl Window for MockWindow {
    fn size(&self) -> (u32, u32) {
        *self.size.lock().unwrap()
    }
}

// ============================================================================
// Mock Frame Pacer
// ============================================================================

#[derive(Default)]
pub struct MockFramePacer {
    pub toggles: Mutex<Vec<bool>>,
}

impl FramePacer for MockFramePacer {
    fn on_vsync_toggled(&self, enabled: bool) {
        self.toggles.lock().unwrap().push(enabled);
    }
}

// ============================================================================
// Mock Sync Backend
// ============================================================================

/// Tracks live sync handles so tests can check for leaks
#[derive(Default)]
pub struct MockSyncBackend {
    pub live: Mutex<HashSet<RhiHandle>>,
    pub created: Mutex<Vec<(SyncPrimitiveType, String)>>,
    pub destroyed: Mutex<Vec<RhiHandle>>,
    pub signaled_fences: Mutex<HashSet<RhiHandle>>,
    pub timeline_values: Mutex<std::collections::HashMap<RhiHandle, u64>>,
}

impl MockSyncBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    pub fn signal_fence(&self, fence: RhiHandle) {
        self.signaled_fences.lock().unwrap().insert(fence);
    }

    pub fn set_timeline_value(&self, semaphore: RhiHandle, value: u64) {
        self.timeline_values.lock().unwrap().insert(semaphore, value);
    }
}

impl SyncBackend for MockSyncBackend {
    fn create_sync_primitive(&self, kind: SyncPrimitiveType, name: &str) -> Result<RhiHandle> {
        let handle = next_handle();
        self.live.lock().unwrap().insert(handle);
        self.created.lock().unwrap().push((kind, name.to_string()));
        Ok(handle)
    }

    fn destroy_sync_primitive(&self, _kind: SyncPrimitiveType, handle: RhiHandle) {
        self.live.lock().unwrap().remove(&handle);
        self.destroyed.lock().unwrap().push(handle);
    }

    fn wait_fence(&self, fence: RhiHandle, _timeout: Duration) -> Result<bool> {
        self.fence_signaled(fence)
    }

    fn fence_signaled(&self, fence: RhiHandle) -> Result<bool> {
        Ok(self.signaled_fences.lock().unwrap().contains(&fence))
    }

    fn reset_fence(&self, fence: RhiHandle) -> Result<()> {
        self.signaled_fences.lock().unwrap().remove(&fence);
        Ok(())
    }

    fn wait_timeline(&self, semaphore: RhiHandle, value: u64, _timeout: Duration) -> Result<bool> {
        Ok(self.timeline_value(semaphore)? >= value)
    }

    fn timeline_value(&self, semaphore: RhiHandle) -> Result<u64> {
        Ok(self.timeline_values.lock().unwrap().get(&semaphore).copied().unwrap_or(0))
    }
}

// ============================================================================
// Mock Command List
// ============================================================================

pub struct MockCommandList {
    pub name: String,
    pub barriers: Vec<(RhiHandle, ImageLayout, ImageLayout)>,
    pub swapchain_id: Option<ObjectId>,
    pub rendering_complete: Option<Arc<SyncPrimitive>>,
}

impl MockCommandList {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            barriers: Vec::new(),
            swapchain_id: None,
            rendering_complete: None,
        }
    }
}

impl CommandList for MockCommandList {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> CommandListState {
        CommandListState::Recording
    }

    fn insert_barrier_texture(
        &mut self,
        image: RhiHandle,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
    ) -> Result<()> {
        self.barriers.push((image, old_layout, new_layout));
        Ok(())
    }

    fn swapchain_id(&self) -> Option<ObjectId> {
        self.swapchain_id
    }

    fn set_swapchain_id(&mut self, id: ObjectId) {
        self.swapchain_id = Some(id);
    }

    fn rendering_complete_semaphore(&self) -> Option<Arc<SyncPrimitive>> {
        self.rendering_complete.clone()
    }
}

// ============================================================================
// Mock Queue
// ============================================================================

/// A recorded present: swapchain, image index and the handles it waited on
#[derive(Debug, Clone, PartialEq)]
pub struct PresentRecord {
    pub swapchain: RhiHandle,
    pub image_index: u32,
    pub wait_semaphores: Vec<RhiHandle>,
}

pub struct MockQueue {
    pub queue_type: QueueType,
    pub command_list: Arc<Mutex<MockCommandList>>,
    pub presents: Mutex<Vec<PresentRecord>>,
    pub waits: Mutex<u32>,
}

impl MockQueue {
    pub fn new(queue_type: QueueType) -> Self {
        Self {
            queue_type,
            command_list: Arc::new(Mutex::new(MockCommandList::new("queue_cmd_list"))),
            presents: Mutex::new(Vec::new()),
            waits: Mutex::new(0),
        }
    }
}

impl Queue for MockQueue {
    fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    fn command_list(&self) -> Arc<Mutex<dyn CommandList>> {
        self.command_list.clone()
    }

    fn present(
        &self,
        swapchain: RhiHandle,
        image_index: u32,
        wait_semaphores: &[Arc<SyncPrimitive>],
    ) -> Result<()> {
        self.presents.lock().unwrap().push(PresentRecord {
            swapchain,
            image_index,
            wait_semaphores: wait_semaphores.iter().map(|s| s.rhi_resource()).collect(),
        });
        Ok(())
    }

    fn wait(&self) -> Result<()> {
        *self.waits.lock().unwrap() += 1;
        Ok(())
    }
}

// ============================================================================
// Mock Device
// ============================================================================

/// What the mock surface reports and how the mock driver behaves
#[derive(Debug, Clone)]
pub struct MockDeviceConfig {
    pub present_modes: Vec<PresentMode>,
    pub surface_formats: Vec<SurfaceFormat>,
    pub capabilities: SurfaceCapabilities,
    /// Images the driver creates regardless of the requested count
    pub image_count: Option<u32>,
    pub graphics_family: u32,
    pub compute_family: u32,
    pub present_support: bool,
    pub hdr_metadata_fails: bool,
    pub max_resolution: (u32, u32),
}

impl Default for MockDeviceConfig {
    fn default() -> Self {
        Self {
            present_modes: vec![PresentMode::Fifo, PresentMode::Immediate, PresentMode::Mailbox],
            surface_formats: vec![
                SurfaceFormat {
                    format: Format::R8G8B8A8_UNORM,
                    color_space: ColorSpace::SrgbNonlinear,
                },
                SurfaceFormat {
                    format: Format::R10G10B10A2_UNORM,
                    color_space: ColorSpace::Hdr10St2084,
                },
            ],
            capabilities: SurfaceCapabilities {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: Extent2D::new(1280, 720),
                min_image_extent: Extent2D::new(1, 1),
                max_image_extent: Extent2D::new(16384, 16384),
                supported_composite_alpha: CompositeAlphaFlags::OPAQUE | CompositeAlphaFlags::INHERIT,
                current_transform: 1,
            },
            image_count: None,
            graphics_family: 0,
            compute_family: 0,
            present_support: true,
            hdr_metadata_fails: false,
            max_resolution: (16384, 16384),
        }
    }
}

/// Everything the mock device saw
#[derive(Debug, Default)]
pub struct MockDeviceLog {
    pub surfaces_created: u32,
    pub surfaces_destroyed: u32,
    pub swapchains_created: Vec<SwapchainCreateDesc>,
    pub swapchains_destroyed: u32,
    pub image_views_created: u32,
    pub deletion_queue: Vec<(ResourceType, RhiHandle)>,
    pub wait_all_queues: u32,
    pub hdr_metadata: Vec<HdrMetadata>,
    pub resource_names: Vec<(ResourceType, String)>,
    pub immediate_barriers: Vec<(RhiHandle, ImageLayout, ImageLayout)>,
    /// Semaphore handle handed to each acquire call
    pub acquire_semaphores: Vec<RhiHandle>,
}

pub struct MockDevice {
    pub config: Mutex<MockDeviceConfig>,
    pub log: Mutex<MockDeviceLog>,
    /// Acquire results to return before falling back to round-robin success
    pub acquire_script: Mutex<VecDeque<AcquireStatus>>,
    pub sync_backend: Arc<MockSyncBackend>,
    pub graphics_queue: Arc<MockQueue>,
    pub compute_queue: Arc<MockQueue>,
    images: Mutex<Vec<RhiHandle>>,
    next_image: Mutex<u32>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::with_config(MockDeviceConfig::default())
    }

    pub fn with_config(config: MockDeviceConfig) -> Self {
        Self {
            config: Mutex::new(config),
            log: Mutex::new(MockDeviceLog::default()),
            acquire_script: Mutex::new(VecDeque::new()),
            sync_backend: Arc::new(MockSyncBackend::new()),
            graphics_queue: Arc::new(MockQueue::new(QueueType::Graphics)),
            compute_queue: Arc::new(MockQueue::new(QueueType::Compute)),
            images: Mutex::new(Vec::new()),
            next_image: Mutex::new(0),
        }
    }

    /// Queue up acquire results
    pub fn script_acquire(&self, results: impl IntoIterator<Item = AcquireStatus>) {
        self.acquire_script.lock().unwrap().extend(results);
    }

    pub fn presents(&self) -> Vec<PresentRecord> {
        self.graphics_queue.presents.lock().unwrap().clone()
    }
}

impl Device for MockDevice {
    fn is_valid_resolution(&self, width: u32, height: u32) -> bool {
        let (max_w, max_h) = self.config.lock().unwrap().max_resolution;
        width > 0 && height > 0 && width <= max_w && height <= max_h
    }

    fn queue_family_index(&self, queue_type: QueueType) -> u32 {
        let config = self.config.lock().unwrap();
        match queue_type {
            QueueType::Compute => config.compute_family,
            _ => config.graphics_family,
        }
    }

    fn queue(&self, queue_type: QueueType) -> Arc<dyn Queue> {
        match queue_type {
            QueueType::Compute => self.compute_queue.clone(),
            _ => self.graphics_queue.clone(),
        }
    }

    fn sync_backend(&self) -> Arc<dyn SyncBackend> {
        self.sync_backend.clone()
    }

    fn create_surface(&self, _window: &dyn Window) -> Result<RhiHandle> {
        self.log.lock().unwrap().surfaces_created += 1;
        Ok(next_handle())
    }

    fn destroy_surface(&self, _surface: RhiHandle) {
        self.log.lock().unwrap().surfaces_destroyed += 1;
    }

    fn surface_present_support(&self, _surface: RhiHandle, _queue_family: u32) -> Result<bool> {
        Ok(self.config.lock().unwrap().present_support)
    }

    fn surface_capabilities(&self, _surface: RhiHandle) -> Result<SurfaceCapabilities> {
        Ok(self.config.lock().unwrap().capabilities)
    }

    fn surface_formats(&self, _surface: RhiHandle) -> Result<Vec<SurfaceFormat>> {
        Ok(self.config.lock().unwrap().surface_formats.clone())
    }

    fn surface_present_modes(&self, _surface: RhiHandle) -> Result<Vec<PresentMode>> {
        Ok(self.config.lock().unwrap().present_modes.clone())
    }

    fn create_swapchain(&self, desc: &SwapchainCreateDesc) -> Result<RhiHandle> {
        let count = self
            .config
            .lock()
            .unwrap()
            .image_count
            .unwrap_or(desc.min_image_count);

        *self.images.lock().unwrap() = (0..count).map(|_| next_handle()).collect();
        *self.next_image.lock().unwrap() = 0;
        self.log.lock().unwrap().swapchains_created.push(desc.clone());

        Ok(next_handle())
    }

    fn destroy_swapchain(&self, _swapchain: RhiHandle) {
        self.log.lock().unwrap().swapchains_destroyed += 1;
    }

    fn swapchain_images(&self, _swapchain: RhiHandle) -> Result<Vec<RhiHandle>> {
        Ok(self.images.lock().unwrap().clone())
    }

    fn set_hdr_metadata(&self, _swapchain: RhiHandle, metadata: &HdrMetadata) -> Result<()> {
        self.log.lock().unwrap().hdr_metadata.push(*metadata);
        if self.config.lock().unwrap().hdr_metadata_fails {
            return Err(Error::BackendError("vkSetHdrMetadataEXT unavailable".to_string()));
        }
        Ok(())
    }

    fn acquire_next_image(
        &self,
        _swapchain: RhiHandle,
        semaphore: &SyncPrimitive,
        _timeout: Duration,
    ) -> AcquireStatus {
        self.log.lock().unwrap().acquire_semaphores.push(semaphore.rhi_resource());

        if let Some(status) = self.acquire_script.lock().unwrap().pop_front() {
            return status;
        }

        let image_count = self.images.lock().unwrap().len() as u32;
        let mut next_image = self.next_image.lock().unwrap();
        let index = *next_image;
        *next_image = (index + 1) % image_count.max(1);
        AcquireStatus::Success(index)
    }

    fn create_image_view(&self, _image: RhiHandle, _format: Format) -> Result<RhiHandle> {
        self.log.lock().unwrap().image_views_created += 1;
        Ok(next_handle())
    }

    fn immediate_submit(
        &self,
        _queue_type: QueueType,
        record: &mut dyn FnMut(&mut dyn CommandList) -> Result<()>,
    ) -> Result<()> {
        let mut cmd_list = MockCommandList::new("immediate");
        record(&mut cmd_list)?;
        self.log.lock().unwrap().immediate_barriers.extend(cmd_list.barriers);
        Ok(())
    }

    fn deletion_queue_add(&self, resource_type: ResourceType, handle: RhiHandle) {
        self.log.lock().unwrap().deletion_queue.push((resource_type, handle));
    }

    fn wait_all_queues(&self) -> Result<()> {
        self.log.lock().unwrap().wait_all_queues += 1;
        Ok(())
    }

    fn set_resource_name(&self, _handle: RhiHandle, resource_type: ResourceType, name: &str) {
        self.log.lock().unwrap().resource_names.push((resource_type, name.to_string()));
    }
}
