/// SwapChain - presentable image chain for one window
///
/// Owns the driver swapchain, its images and views, one recorded layout per
/// image and one acquire semaphore per buffer slot. The whole chain is
/// destroyed and rebuilt on resize, HDR and vsync changes.
///
/// Two cursors are tracked:
/// - `buffer_index` advances round-robin on every acquire call and selects the
///   acquire semaphore. The semaphore has to be handed to the driver before the
///   image it pairs with is known, so it can never be indexed by image.
/// - `image_index` is whatever the driver returned from the last successful
///   acquire. Per-image state (layouts, views) is indexed by it.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use winit::event::WindowEvent;

use crate::config::{AcquireRetryPolicy, SwapChainDesc};
use crate::error::{Error, Result};
use crate::rhi::surface::{
    clamp_extent, clamp_image_count, color_space_for_format, resolve_surface_format,
    select_composite_alpha, select_present_mode, select_sharing_mode,
};
use crate::rhi::{
    AcquireStatus, ColorSpace, CommandList, Device, Display, Format, FramePacer, HdrMetadata,
    ImageLayout, ImageUsageFlags, ObjectId, PresentMode, QueueType, ResourceType, RhiHandle,
    SwapchainCreateDesc, SyncPrimitive, SyncPrimitiveType, Window,
};
use crate::{engine_bail, engine_debug, engine_err, engine_error, engine_info, engine_trace, engine_warn};

const LOG_SOURCE: &str = "prism::SwapChain";

/// Lifetime counters, mostly useful to observe recreation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapChainStats {
    /// Successful create() calls
    pub creations: u32,
    /// destroy() calls that released a live chain
    pub destructions: u32,
    /// Sleeps taken while waiting for a "not ready" image
    pub acquire_retries: u32,
    /// Successful presents
    pub presents: u64,
}

/// Presentable image chain
pub struct SwapChain {
    device: Arc<dyn Device>,
    window: Arc<dyn Window>,
    display: Arc<dyn Display>,
    frame_pacer: Option<Arc<dyn FramePacer>>,

    id: ObjectId,
    name: String,

    width: u32,
    height: u32,
    buffer_count: u32,
    /// Requested present mode (what vsync toggles)
    present_mode: PresentMode,
    /// Present mode the chain was actually created with
    active_present_mode: PresentMode,
    /// Requested format (SDR or HDR default)
    format: Format,
    /// Format the chain was actually created with (may be channel-swapped)
    surface_format: Format,
    color_space: ColorSpace,

    acquire_timeout: Duration,
    acquire_retry: AcquireRetryPolicy,

    surface: RhiHandle,
    swapchain: RhiHandle,
    images: Vec<RhiHandle>,
    image_views: Vec<RhiHandle>,
    layouts: Vec<ImageLayout>,
    image_acquired_semaphores: Vec<Arc<SyncPrimitive>>,

    image_index: u32,
    buffer_index: u32,

    stats: SwapChainStats,
}

impl SwapChain {
    /// Create a swapchain for `window` and build its image chain
    ///
    /// # Errors
    ///
    /// - `InvalidConfiguration` for an unsupported resolution, fewer than two
    ///   buffers, or a format/color space the surface cannot present even after
    ///   the channel-order fallback
    /// - Any backend error raised while building the chain
    pub fn new(
        device: Arc<dyn Device>,
        window: Arc<dyn Window>,
        display: Arc<dyn Display>,
        desc: SwapChainDesc,
    ) -> Result<Self> {
        if !device.is_valid_resolution(desc.width, desc.height) {
            engine_bail!(
                InvalidConfiguration,
                LOG_SOURCE,
                "Invalid resolution {}x{} for swapchain '{}'",
                desc.width,
                desc.height,
                desc.name
            );
        }

        if desc.buffer_count < 2 {
            engine_bail!(
                InvalidConfiguration,
                LOG_SOURCE,
                "Buffer count can't be less than 2 (got {}) for swapchain '{}'",
                desc.buffer_count,
                desc.name
            );
        }

        let format = if desc.hdr { Format::HDR } else { Format::SDR };

        let mut swap_chain = Self {
            device,
            window,
            display,
            frame_pacer: None,
            id: ObjectId::next(),
            name: desc.name,
            width: desc.width,
            height: desc.height,
            buffer_count: desc.buffer_count,
            present_mode: desc.present_mode,
            active_present_mode: desc.present_mode,
            format,
            surface_format: format,
            color_space: color_space_for_format(format),
            acquire_timeout: desc.acquire_timeout,
            acquire_retry: desc.acquire_retry,
            surface: RhiHandle::NULL,
            swapchain: RhiHandle::NULL,
            images: Vec::new(),
            image_views: Vec::new(),
            layouts: Vec::new(),
            image_acquired_semaphores: Vec::new(),
            image_index: 0,
            buffer_index: 0,
            stats: SwapChainStats::default(),
        };

        swap_chain.create()?;

        Ok(swap_chain)
    }

    /// Set the collaborator told about vsync changes
    pub fn set_frame_pacer(&mut self, frame_pacer: Option<Arc<dyn FramePacer>>) {
        self.frame_pacer = frame_pacer;
    }

    // ===== LIFECYCLE =====

    /// Build the surface, chain, views and acquire semaphores
    ///
    /// On failure everything built so far is released again.
    pub fn create(&mut self) -> Result<()> {
        if self.is_created() {
            engine_bail!(
                ContractViolation,
                LOG_SOURCE,
                "create() called on live swapchain '{}', call destroy() first",
                self.name
            );
        }

        if let Err(e) = self.create_resources() {
            if let Err(cleanup) = self.destroy() {
                engine_error!(LOG_SOURCE, "Cleanup after failed create() failed: {}", cleanup);
            }
            return Err(e);
        }

        self.stats.creations += 1;
        engine_debug!(
            LOG_SOURCE,
            "Created '{}': {}x{}, {} images, {} buffers, {:?}, {:?}/{:?}",
            self.name,
            self.width,
            self.height,
            self.images.len(),
            self.buffer_count,
            self.active_present_mode,
            self.surface_format,
            self.color_space
        );

        Ok(())
    }

    fn create_resources(&mut self) -> Result<()> {
        // surface
        self.surface = self.device.create_surface(self.window.as_ref())?;

        let graphics_family = self.device.queue_family_index(QueueType::Graphics);
        let compute_family = self.device.queue_family_index(QueueType::Compute);

        if !self.device.surface_present_support(self.surface, graphics_family)? {
            engine_bail!(
                InitializationFailed,
                LOG_SOURCE,
                "The device does not support presenting to this kind of surface"
            );
        }

        let capabilities = self.device.surface_capabilities(self.surface)?;

        // format + color space
        let color_space = color_space_for_format(self.format);
        let supported_formats = self.device.surface_formats(self.surface)?;
        let surface_format = match resolve_surface_format(&supported_formats, self.format, color_space) {
            Some(format) => format,
            None => engine_bail!(
                InvalidConfiguration,
                LOG_SOURCE,
                "The surface doesn't support {:?} with {:?}",
                self.format,
                color_space
            ),
        };
        if surface_format != self.format {
            engine_debug!(
                LOG_SOURCE,
                "Using {:?} instead of {:?} for '{}'",
                surface_format,
                self.format,
                self.name
            );
        }

        // size
        let extent = clamp_extent(self.width, self.height, &capabilities);
        self.width = extent.width;
        self.height = extent.height;

        // chain
        let present_modes = self.device.surface_present_modes(self.surface)?;
        let present_mode = select_present_mode(&present_modes, self.present_mode);

        let desc = SwapchainCreateDesc {
            surface: self.surface,
            min_image_count: clamp_image_count(self.buffer_count, &capabilities),
            format: surface_format,
            color_space,
            extent,
            usage: ImageUsageFlags::COLOR_ATTACHMENT | ImageUsageFlags::TRANSFER_DST,
            sharing_mode: select_sharing_mode(graphics_family, compute_family),
            pre_transform: capabilities.current_transform,
            composite_alpha: select_composite_alpha(capabilities.supported_composite_alpha),
            present_mode,
            clipped: true,
        };

        self.swapchain = self.device.create_swapchain(&desc)?;
        self.surface_format = surface_format;
        self.color_space = color_space;
        self.active_present_mode = present_mode;

        if self.format.is_hdr() {
            let metadata = HdrMetadata::rec2020(self.display.luminance_max());
            if let Err(e) = self.device.set_hdr_metadata(self.swapchain, &metadata) {
                engine_warn!(LOG_SOURCE, "Failed to set HDR metadata for '{}': {}", self.name, e);
            }
        }

        // images, transitioned so the chain is render-ready on return
        self.images = self.device.swapchain_images(self.swapchain)?;
        if self.images.is_empty() {
            engine_bail!(InitializationFailed, LOG_SOURCE, "Swapchain '{}' has no images", self.name);
        }
        self.layouts = vec![ImageLayout::Undefined; self.images.len()];

        let images = self.images.clone();
        self.device.immediate_submit(
            QueueType::Graphics,
            &mut |cmd_list: &mut dyn CommandList| -> Result<()> {
                for &image in &images {
                    cmd_list.insert_barrier_texture(image, ImageLayout::Undefined, ImageLayout::Attachment)?;
                }
                Ok(())
            },
        )?;
        self.layouts.fill(ImageLayout::Attachment);

        // views
        for (i, &image) in self.images.iter().enumerate() {
            self.device
                .set_resource_name(image, ResourceType::Texture, &format!("swapchain_image_{}", i));
            let view = self.device.create_image_view(image, surface_format)?;
            self.image_views.push(view);
        }

        // one acquire semaphore per buffer slot
        let sync_backend = self.device.sync_backend();
        for i in 0..self.buffer_count {
            let semaphore = SyncPrimitive::new(
                Arc::clone(&sync_backend),
                SyncPrimitiveType::Semaphore,
                &format!("swapchain_{}", i),
            )?;
            self.device
                .set_resource_name(semaphore.rhi_resource(), ResourceType::Semaphore, semaphore.name());
            // no signal to wait on until an acquire succeeds on this slot
            semaphore.set_waited_for(true);
            self.image_acquired_semaphores.push(Arc::new(semaphore));
        }

        Ok(())
    }

    /// Release the chain and everything built on it
    ///
    /// Blocks until every queue is idle, since the acquire semaphores are
    /// destroyed immediately. Image views go through the deferred deletion
    /// queue. Resets both cursors to 0.
    pub fn destroy(&mut self) -> Result<()> {
        let had_resources = !self.surface.is_null()
            || !self.swapchain.is_null()
            || !self.image_views.is_empty()
            || !self.image_acquired_semaphores.is_empty();

        if had_resources {
            self.device.wait_all_queues()?;
        }

        for view in self.image_views.drain(..) {
            self.device.deletion_queue_add(ResourceType::TextureView, view);
        }

        self.image_acquired_semaphores.clear();

        if !self.swapchain.is_null() {
            self.device.destroy_swapchain(self.swapchain);
            self.swapchain = RhiHandle::NULL;
        }

        if !self.surface.is_null() {
            self.device.destroy_surface(self.surface);
            self.surface = RhiHandle::NULL;
        }

        self.images.clear();
        self.layouts.clear();

        self.image_index = 0;
        self.buffer_index = 0;

        if had_resources {
            self.stats.destructions += 1;
            engine_trace!(LOG_SOURCE, "Destroyed '{}'", self.name);
        }

        Ok(())
    }

    fn recreate(&mut self) -> Result<()> {
        self.destroy()?;
        self.create()
    }

    // ===== RECONFIGURATION =====

    /// Rebuild the chain at a new resolution
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if !self.device.is_valid_resolution(width, height) {
            engine_bail!(
                InvalidConfiguration,
                LOG_SOURCE,
                "Invalid resolution {}x{} for swapchain '{}'",
                width,
                height,
                self.name
            );
        }

        self.width = width;
        self.height = height;

        self.recreate()?;

        engine_info!(LOG_SOURCE, "Resolution has been set to {}x{}", width, height);

        Ok(())
    }

    /// Rebuild the chain at the window's current size
    pub fn resize_to_window_size(&mut self) -> Result<()> {
        let (width, height) = self.window.size();
        self.resize(width, height)
    }

    /// React to a window event
    ///
    /// Returns `true` when the chain was rebuilt. Zero-sized (minimized)
    /// windows are ignored.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> Result<bool> {
        match event {
            WindowEvent::Resized(size) => {
                if size.width == 0 || size.height == 0 {
                    engine_debug!(LOG_SOURCE, "Ignoring resize of '{}' to zero area", self.name);
                    return Ok(false);
                }

                self.resize(size.width, size.height)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Switch between the SDR and HDR format
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when enabling HDR on a display that can't show it.
    pub fn set_hdr(&mut self, enabled: bool) -> Result<()> {
        if self.is_hdr() == enabled {
            return Ok(());
        }

        if enabled && !self.display.hdr_supported() {
            engine_bail!(InvalidConfiguration, LOG_SOURCE, "This display doesn't support HDR");
        }

        self.format = if enabled { Format::HDR } else { Format::SDR };
        self.recreate()?;

        engine_info!(LOG_SOURCE, "HDR has been {}", if enabled { "enabled" } else { "disabled" });

        Ok(())
    }

    /// Switch between Fifo (vsync) and Immediate presentation
    pub fn set_vsync(&mut self, enabled: bool) -> Result<()> {
        if self.get_vsync() == enabled {
            return Ok(());
        }

        self.present_mode = if enabled { PresentMode::Fifo } else { PresentMode::Immediate };
        self.recreate()?;

        if let Some(frame_pacer) = &self.frame_pacer {
            frame_pacer.on_vsync_toggled(enabled);
        }

        engine_info!(LOG_SOURCE, "VSync has been {}", if enabled { "enabled" } else { "disabled" });

        Ok(())
    }

    /// Vsync is on when the requested present mode is Fifo
    pub fn get_vsync(&self) -> bool {
        self.present_mode == PresentMode::Fifo
    }

    // ===== FRAME LOOP =====

    /// Acquire the next presentable image
    ///
    /// Advances `buffer_index` first and hands that slot's semaphore to the
    /// driver. Only "not ready" sleeps and retries per the acquire retry
    /// policy; a driver timeout or any other failure is returned at once.
    /// Returns the driver-chosen image index.
    pub fn acquire_next_image(&mut self) -> Result<u32> {
        self.ensure_created("acquire_next_image")?;

        self.buffer_index = (self.buffer_index + 1) % self.buffer_count;
        let semaphore = Arc::clone(&self.image_acquired_semaphores[self.buffer_index as usize]);

        let start = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.device.acquire_next_image(self.swapchain, &semaphore, self.acquire_timeout) {
                AcquireStatus::Success(index) => return self.on_image_acquired(index),
                AcquireStatus::Suboptimal(index) => {
                    engine_debug!(LOG_SOURCE, "Swapchain '{}' is suboptimal for its surface", self.name);
                    return self.on_image_acquired(index);
                }
                AcquireStatus::NotReady => {
                    match self.acquire_retry.next_delay(attempts, start.elapsed()) {
                        Some(delay) => {
                            self.stats.acquire_retries += 1;
                            engine_trace!(
                                LOG_SOURCE,
                                "Image not ready (attempt {}), retrying in {:?}",
                                attempts,
                                delay
                            );
                            thread::sleep(delay);
                        }
                        None => {
                            engine_error!(
                                LOG_SOURCE,
                                "Swapchain '{}' image not ready after {} attempts",
                                self.name,
                                attempts
                            );
                            return Err(Error::AcquireTimedOut { attempts });
                        }
                    }
                }
                AcquireStatus::Timeout => {
                    engine_error!(
                        LOG_SOURCE,
                        "Swapchain '{}' acquire timed out after {:?}",
                        self.name,
                        self.acquire_timeout
                    );
                    return Err(Error::AcquireTimedOut { attempts });
                }
                AcquireStatus::OutOfDate => {
                    return Err(engine_err!(
                        SurfaceLost,
                        LOG_SOURCE,
                        "Swapchain '{}' out of date during acquire",
                        self.name
                    ));
                }
                AcquireStatus::Error(message) => {
                    engine_bail!(BackendError, LOG_SOURCE, "Failed to acquire next swapchain image: {}", message);
                }
            }
        }
    }

    fn on_image_acquired(&mut self, index: u32) -> Result<u32> {
        if index as usize >= self.images.len() {
            engine_bail!(
                BackendError,
                LOG_SOURCE,
                "Driver returned image index {} but '{}' has {} images",
                index,
                self.name,
                self.images.len()
            );
        }

        self.image_index = index;
        self.image_acquired_semaphores[self.buffer_index as usize].set_waited_for(false);
        Ok(index)
    }

    /// Present the current image
    ///
    /// The image must already be in `PresentSource` and must have been acquired
    /// since the last present. Presentation waits on the graphics queue's
    /// rendering-complete semaphore when its current command list rendered into
    /// this swapchain, and always on the acquire semaphore of the current buffer
    /// slot.
    pub fn present(&mut self) -> Result<()> {
        self.ensure_created("present")?;

        let layout = self.get_layout();
        if layout != ImageLayout::PresentSource {
            engine_bail!(
                ContractViolation,
                LOG_SOURCE,
                "Image {} of '{}' is in {:?}, expected PresentSource (missing barrier before present)",
                self.image_index,
                self.name,
                layout
            );
        }

        let acquire_semaphore = Arc::clone(&self.image_acquired_semaphores[self.buffer_index as usize]);
        if acquire_semaphore.has_been_waited_for() {
            engine_bail!(
                ContractViolation,
                LOG_SOURCE,
                "Image {} of '{}' was already presented, acquire the next image first",
                self.image_index,
                self.name
            );
        }

        let queue = self.device.queue(QueueType::Graphics);
        let mut wait_semaphores: Vec<Arc<SyncPrimitive>> = Vec::with_capacity(2);

        {
            let cmd_list = queue.command_list();
            let cmd_list = cmd_list
                .lock()
                .map_err(|_| engine_err!(BackendError, LOG_SOURCE, "Command list lock poisoned"))?;

            if cmd_list.swapchain_id() == Some(self.id) {
                if let Some(semaphore) = cmd_list.rendering_complete_semaphore() {
                    if semaphore.has_been_waited_for() {
                        engine_warn!(
                            LOG_SOURCE,
                            "Rendering-complete semaphore '{}' already waited for, not waiting again",
                            semaphore.name()
                        );
                    } else {
                        semaphore.set_waited_for(true);
                        wait_semaphores.push(semaphore);
                    }
                }
            }
        }

        wait_semaphores.push(Arc::clone(&acquire_semaphore));

        queue.present(self.swapchain, self.image_index, &wait_semaphores)?;
        acquire_semaphore.set_waited_for(true);
        self.stats.presents += 1;

        Ok(())
    }

    /// Transition the current image to `layout` through `cmd_list`
    ///
    /// This is the only path that changes recorded layouts. Does nothing when
    /// the image is already in `layout`.
    pub fn set_layout(&mut self, layout: ImageLayout, cmd_list: &mut dyn CommandList) -> Result<()> {
        self.ensure_created("set_layout")?;

        let index = self.image_index as usize;
        let current = self.layouts[index];

        if current == layout {
            return Ok(());
        }

        if !current.can_transition_to(layout) {
            engine_bail!(
                ContractViolation,
                LOG_SOURCE,
                "Image {} of '{}' can't transition from {:?} to {:?}",
                index,
                self.name,
                current,
                layout
            );
        }

        cmd_list.insert_barrier_texture(self.images[index], current, layout)?;
        cmd_list.set_swapchain_id(self.id);
        self.layouts[index] = layout;

        Ok(())
    }

    /// Recorded layout of the current image (`Undefined` when destroyed)
    pub fn get_layout(&self) -> ImageLayout {
        self.layouts
            .get(self.image_index as usize)
            .copied()
            .unwrap_or(ImageLayout::Undefined)
    }

    fn ensure_created(&self, operation: &str) -> Result<()> {
        if !self.is_created() {
            engine_bail!(
                ContractViolation,
                LOG_SOURCE,
                "{}() called on destroyed swapchain '{}'",
                operation,
                self.name
            );
        }
        Ok(())
    }

    // ===== ACCESSORS =====

    pub fn is_created(&self) -> bool {
        !self.swapchain.is_null()
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Format the chain was created with
    pub fn format(&self) -> Format {
        self.surface_format
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn is_hdr(&self) -> bool {
        self.format.is_hdr()
    }

    /// Present mode the chain was created with (after fallback)
    pub fn present_mode(&self) -> PresentMode {
        self.active_present_mode
    }

    pub fn image_index(&self) -> u32 {
        self.image_index
    }

    pub fn buffer_index(&self) -> u32 {
        self.buffer_index
    }

    /// Backend swapchain handle
    pub fn rhi_swapchain(&self) -> RhiHandle {
        self.swapchain
    }

    /// Backend surface handle
    pub fn rhi_surface(&self) -> RhiHandle {
        self.surface
    }

    /// Current image
    pub fn rhi_image(&self) -> Option<RhiHandle> {
        self.images.get(self.image_index as usize).copied()
    }

    /// View of the current image
    pub fn rhi_image_view(&self) -> Option<RhiHandle> {
        self.image_views.get(self.image_index as usize).copied()
    }

    pub fn image_views(&self) -> &[RhiHandle] {
        &self.image_views
    }

    /// Acquire semaphores, one per buffer slot
    pub fn image_acquired_semaphores(&self) -> &[Arc<SyncPrimitive>] {
        &self.image_acquired_semaphores
    }

    pub fn stats(&self) -> SwapChainStats {
        self.stats
    }
}

impl Drop for SwapChain {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            engine_error!(LOG_SOURCE, "Failed to destroy swapchain '{}': {}", self.name, e);
        }
    }
}

#[cfg(test)]
#[path = "swap_chain_tests.rs"]
mod tests;
