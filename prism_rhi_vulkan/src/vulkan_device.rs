/// VulkanDevice - Vulkan implementation of the Device trait

use std::ffi::{CStr, CString};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use rustc_hash::FxHashMap;
use prism_rhi::prism::{DeviceConfig, Error, Result};
use prism_rhi::prism::rhi::{
    AcquireStatus, CommandList, DeletionQueue, Device, Format, HdrMetadata, Queue, QueueType,
    ResourceType, RhiHandle, SurfaceCapabilities, SurfaceFormat, PresentMode, SwapchainCreateDesc,
    SyncBackend, SyncPrimitive, Window,
};
use prism_rhi::{engine_debug, engine_err, engine_error, engine_info, engine_warn};

use crate::vulkan_context::{timeout_ns, VulkanContext, LOG_SOURCE};
use crate::vulkan_conversions::*;
use crate::vulkan_queue::{VulkanQueue, COMMAND_LIST_RING_SIZE};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Physical device selection result
struct AdapterInfo {
    physical_device: vk::PhysicalDevice,
    graphics_family: u32,
    compute_family: u32,
    copy_family: u32,
    max_image_dimension: u32,
    hdr_metadata: bool,
}

fn has_extension(properties: &[vk::ExtensionProperties], name: &CStr) -> bool {
    properties
        .iter()
        .any(|p| p.extension_name_as_c_str().is_ok_and(|n| n == name))
}

/// Vulkan device
///
/// Owns the queues and the deferred deletion queue. Everything else lives in
/// the shared `VulkanContext`.
pub struct VulkanDevice {
    context: Arc<VulkanContext>,
    graphics_queue: Arc<VulkanQueue>,
    compute_queue: Arc<VulkanQueue>,
    copy_queue: Arc<VulkanQueue>,
    deletion_queue: Mutex<DeletionQueue>,
    /// Incremented by `end_frame`
    frame_generation: AtomicU64,
}

impl VulkanDevice {
    /// Create a new Vulkan device
    ///
    /// # Arguments
    ///
    /// * `window` - Window the device must be able to present to
    /// * `config` - Device configuration
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: DeviceConfig) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                engine_err!(InitializationFailed, LOG_SOURCE, "Failed to load Vulkan library: {:?}", e)
            })?;

            let validation = Self::validation_enabled(&entry, &config);
            let instance = Self::create_instance(&entry, window, &config, validation)?;

            #[cfg(feature = "vulkan-validation")]
            let (debug_utils_loader, debug_messenger) = if validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
                match crate::debug::create_messenger(&debug_utils, &config) {
                    Ok(messenger) => (Some(debug_utils), Some(messenger)),
                    Err(e) => {
                        instance.destroy_instance(None);
                        return Err(e);
                    }
                }
            } else {
                (None, None)
            };
            #[cfg(not(feature = "vulkan-validation"))]
            let (debug_utils_loader, debug_messenger): (Option<ash::ext::debug_utils::Instance>, Option<vk::DebugUtilsMessengerEXT>) = (None, None);

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let adapter = match Self::select_adapter(&entry, &instance, &surface_loader, window) {
                Ok(adapter) => adapter,
                Err(e) => {
                    if let (Some(debug_utils), Some(messenger)) = (&debug_utils_loader, debug_messenger) {
                        debug_utils.destroy_debug_utils_messenger(messenger, None);
                    }
                    instance.destroy_instance(None);
                    return Err(e);
                }
            };

            let device = match Self::create_logical_device(&instance, &adapter) {
                Ok(device) => device,
                Err(e) => {
                    if let (Some(debug_utils), Some(messenger)) = (&debug_utils_loader, debug_messenger) {
                        debug_utils.destroy_debug_utils_messenger(messenger, None);
                    }
                    instance.destroy_instance(None);
                    return Err(e);
                }
            };

            // From here on VulkanContext::drop owns the cleanup
            let context = Arc::new(VulkanContext {
                swapchain_loader: ash::khr::swapchain::Device::new(&instance, &device),
                hdr_metadata_loader: adapter
                    .hdr_metadata
                    .then(|| ash::ext::hdr_metadata::Device::new(&instance, &device)),
                debug_utils_device: debug_utils_loader
                    .as_ref()
                    .map(|_| ash::ext::debug_utils::Device::new(&instance, &device)),
                debug_utils_loader,
                debug_messenger,
                surface_loader,
                physical_device: adapter.physical_device,
                device,
                instance,
                entry,
                graphics_family: adapter.graphics_family,
                compute_family: adapter.compute_family,
                copy_family: adapter.copy_family,
                max_image_dimension: adapter.max_image_dimension,
            });

            // Queue objects on the same family share one vk::Queue, hence one lock
            let mut locks: FxHashMap<u32, Arc<Mutex<()>>> = FxHashMap::default();
            let mut lock_for = |family: u32| locks.entry(family).or_default().clone();

            let graphics_queue = Arc::new(VulkanQueue::new(
                context.clone(),
                QueueType::Graphics,
                adapter.graphics_family,
                lock_for(adapter.graphics_family),
            )?);
            let compute_queue = Arc::new(VulkanQueue::new(
                context.clone(),
                QueueType::Compute,
                adapter.compute_family,
                lock_for(adapter.compute_family),
            )?);
            let copy_queue = Arc::new(VulkanQueue::new(
                context.clone(),
                QueueType::Copy,
                adapter.copy_family,
                lock_for(adapter.copy_family),
            )?);

            engine_info!(
                LOG_SOURCE,
                "Vulkan device created (graphics family {}, compute family {}, copy family {}, validation {})",
                adapter.graphics_family,
                adapter.compute_family,
                adapter.copy_family,
                if validation { "on" } else { "off" }
            );

            Ok(Self {
                context,
                graphics_queue,
                compute_queue,
                copy_queue,
                deletion_queue: Mutex::new(DeletionQueue::new()),
                frame_generation: AtomicU64::new(0),
            })
        }
    }

    /// Validation is on when requested, compiled in, and the layer is installed
    fn validation_enabled(entry: &ash::Entry, config: &DeviceConfig) -> bool {
        if !config.enable_validation {
            return false;
        }

        if !cfg!(feature = "vulkan-validation") {
            engine_warn!(
                LOG_SOURCE,
                "Validation requested but prism_rhi_vulkan was built without the vulkan-validation feature"
            );
            return false;
        }

        let layers = unsafe { entry.enumerate_instance_layer_properties() }.unwrap_or_default();
        let available = layers
            .iter()
            .any(|l| l.layer_name_as_c_str().is_ok_and(|n| n == VALIDATION_LAYER));
        if !available {
            engine_warn!(LOG_SOURCE, "{:?} is not installed, running without validation", VALIDATION_LAYER);
        }
        available
    }

    unsafe fn create_instance<W: HasDisplayHandle>(
        entry: &ash::Entry,
        window: &W,
        config: &DeviceConfig,
        validation: bool,
    ) -> Result<ash::Instance> {
        let app_name = CString::new(config.app_name.as_str()).map_err(|_| {
            engine_err!(InvalidConfiguration, LOG_SOURCE, "Application name '{}' contains a NUL byte", config.app_name)
        })?;
        let (major, minor, patch) = config.app_version;

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, major, minor, patch))
            .engine_name(c"Prism")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_3);

        let display_handle = window.display_handle().map_err(|e| {
            engine_err!(InitializationFailed, LOG_SOURCE, "Failed to get display handle: {}", e)
        })?;
        let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
            .map_err(|e| {
                engine_err!(InitializationFailed, LOG_SOURCE, "Failed to get required extensions: {}", e)
            })?
            .to_vec();

        // HDR10 color spaces come from VK_EXT_swapchain_colorspace
        let available = entry.enumerate_instance_extension_properties(None).unwrap_or_default();
        if has_extension(&available, ash::ext::swapchain_colorspace::NAME) {
            extension_names.push(ash::ext::swapchain_colorspace::NAME.as_ptr());
        }
        if validation {
            extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        let layer_names = if validation {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names);

        entry.create_instance(&create_info, None).map_err(|e| {
            engine_err!(InitializationFailed, LOG_SOURCE, "Failed to create Vulkan instance: {:?}", e)
        })
    }

    /// Pick a Vulkan 1.3 adapter whose graphics family can present to `window`
    ///
    /// Discrete GPUs are preferred.
    unsafe fn select_adapter<W: HasDisplayHandle + HasWindowHandle>(
        entry: &ash::Entry,
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        window: &W,
    ) -> Result<AdapterInfo> {
        let display_handle = window.display_handle().map_err(|e| {
            engine_err!(InitializationFailed, LOG_SOURCE, "Failed to get display handle: {}", e)
        })?;
        let window_handle = window.window_handle().map_err(|e| {
            engine_err!(InitializationFailed, LOG_SOURCE, "Failed to get window handle: {}", e)
        })?;

        // Temporary surface, only used to check present support
        let surface = ash_window::create_surface(
            entry,
            instance,
            display_handle.as_raw(),
            window_handle.as_raw(),
            None,
        )
        .map_err(|e| {
            engine_err!(InitializationFailed, LOG_SOURCE, "Failed to create surface: {:?}", e)
        })?;

        let result = Self::find_adapter(instance, surface_loader, surface);
        surface_loader.destroy_surface(surface, None);
        result
    }

    unsafe fn find_adapter(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<AdapterInfo> {
        let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
            engine_err!(InitializationFailed, LOG_SOURCE, "Failed to enumerate physical devices: {:?}", e)
        })?;

        let mut candidates: Vec<(AdapterInfo, bool)> = Vec::new();

        for physical_device in physical_devices {
            let properties = instance.get_physical_device_properties(physical_device);
            let name = properties
                .device_name_as_c_str()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            if vk::api_version_major(properties.api_version) < 1
                || (vk::api_version_major(properties.api_version) == 1
                    && vk::api_version_minor(properties.api_version) < 3)
            {
                engine_debug!(LOG_SOURCE, "Skipping '{}': Vulkan 1.3 is not supported", name);
                continue;
            }

            let families = instance.get_physical_device_queue_family_properties(physical_device);
            let find_family = |wanted: vk::QueueFlags, excluded: vk::QueueFlags| {
                families
                    .iter()
                    .position(|f| f.queue_flags.contains(wanted) && !f.queue_flags.intersects(excluded))
                    .map(|i| i as u32)
            };

            let Some(graphics_family) = find_family(vk::QueueFlags::GRAPHICS, vk::QueueFlags::empty()) else {
                engine_debug!(LOG_SOURCE, "Skipping '{}': no graphics queue family", name);
                continue;
            };

            let can_present = surface_loader
                .get_physical_device_surface_support(physical_device, graphics_family, surface)
                .unwrap_or(false);
            if !can_present {
                engine_debug!(LOG_SOURCE, "Skipping '{}': graphics family cannot present", name);
                continue;
            }

            let compute_family = find_family(vk::QueueFlags::COMPUTE, vk::QueueFlags::GRAPHICS)
                .unwrap_or(graphics_family);
            let copy_family = find_family(
                vk::QueueFlags::TRANSFER,
                vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
            )
            .unwrap_or(compute_family);

            let extensions = instance
                .enumerate_device_extension_properties(physical_device)
                .unwrap_or_default();
            if !has_extension(&extensions, ash::khr::swapchain::NAME) {
                engine_debug!(LOG_SOURCE, "Skipping '{}': VK_KHR_swapchain missing", name);
                continue;
            }

            candidates.push((
                AdapterInfo {
                    physical_device,
                    graphics_family,
                    compute_family,
                    copy_family,
                    max_image_dimension: properties.limits.max_image_dimension2_d,
                    hdr_metadata: has_extension(&extensions, ash::ext::hdr_metadata::NAME),
                },
                properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU,
            ));
        }

        let index = candidates
            .iter()
            .position(|(_, discrete)| *discrete)
            .or_else(|| (!candidates.is_empty()).then_some(0));

        match index {
            Some(i) => Ok(candidates.swap_remove(i).0),
            None => Err(engine_err!(InitializationFailed, LOG_SOURCE, "No suitable Vulkan 1.3 GPU found")),
        }
    }

    unsafe fn create_logical_device(instance: &ash::Instance, adapter: &AdapterInfo) -> Result<ash::Device> {
        let queue_priorities = [1.0];
        let mut families = vec![adapter.graphics_family, adapter.compute_family, adapter.copy_family];
        families.sort_unstable();
        families.dedup();

        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        let mut extension_names = vec![ash::khr::swapchain::NAME.as_ptr()];
        if adapter.hdr_metadata {
            extension_names.push(ash::ext::hdr_metadata::NAME.as_ptr());
        }

        let mut features12 = vk::PhysicalDeviceVulkan12Features::default().timeline_semaphore(true);
        let mut features13 = vk::PhysicalDeviceVulkan13Features::default().synchronization2(true);

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .push_next(&mut features12)
            .push_next(&mut features13);

        instance
            .create_device(adapter.physical_device, &create_info, None)
            .map_err(|e| {
                engine_err!(InitializationFailed, LOG_SOURCE, "Failed to create logical device: {:?}", e)
            })
    }

    /// Concrete graphics queue (for `begin_frame` / `submit`)
    pub fn graphics_queue(&self) -> Arc<VulkanQueue> {
        self.graphics_queue.clone()
    }

    fn vulkan_queue(&self, queue_type: QueueType) -> &Arc<VulkanQueue> {
        match queue_type {
            QueueType::Graphics => &self.graphics_queue,
            QueueType::Compute => &self.compute_queue,
            QueueType::Copy => &self.copy_queue,
        }
    }

    pub fn frame_generation(&self) -> u64 {
        self.frame_generation.load(Ordering::Acquire)
    }

    /// Mark the end of a frame and free resources no in-flight frame can still use
    pub fn end_frame(&self) {
        let generation = self.frame_generation.fetch_add(1, Ordering::AcqRel) + 1;
        let completed = generation.saturating_sub(COMMAND_LIST_RING_SIZE as u64);

        let mut queue = self.deletion_queue.lock().unwrap_or_else(|p| p.into_inner());
        let freed = queue.drain_completed(completed, |kind, handle| self.destroy_resource(kind, handle));
        if freed > 0 {
            engine_debug!(LOG_SOURCE, "Freed {} deferred resource(s) at frame {}", freed, generation);
        }
    }

    /// Wait for every queue, then free every deferred resource
    pub fn flush_deletion_queue(&self) -> Result<()> {
        self.wait_all_queues()?;
        let mut queue = self.deletion_queue.lock().unwrap_or_else(|p| p.into_inner());
        queue.drain_all(|kind, handle| self.destroy_resource(kind, handle));
        Ok(())
    }

    /// Number of resources waiting for deferred destruction
    pub fn pending_deletions(&self) -> usize {
        self.deletion_queue.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    fn destroy_resource(&self, resource_type: ResourceType, handle: RhiHandle) {
        let ctx = &self.context;
        unsafe {
            match resource_type {
                ResourceType::Texture => ctx.device.destroy_image(from_rhi(handle), None),
                ResourceType::TextureView => ctx.device.destroy_image_view(from_rhi(handle), None),
                ResourceType::Semaphore => ctx.device.destroy_semaphore(from_rhi(handle), None),
                ResourceType::Fence => ctx.device.destroy_fence(from_rhi(handle), None),
                ResourceType::Swapchain => ctx.swapchain_loader.destroy_swapchain(from_rhi(handle), None),
                ResourceType::Surface => ctx.surface_loader.destroy_surface(from_rhi(handle), None),
                ResourceType::CommandPool => ctx.device.destroy_command_pool(from_rhi(handle), None),
            }
        }
    }
}

impl Device for VulkanDevice {
    fn is_valid_resolution(&self, width: u32, height: u32) -> bool {
        width > 0
            && height > 0
            && width <= self.context.max_image_dimension
            && height <= self.context.max_image_dimension
    }

    fn queue_family_index(&self, queue_type: QueueType) -> u32 {
        match queue_type {
            QueueType::Graphics => self.context.graphics_family,
            QueueType::Compute => self.context.compute_family,
            QueueType::Copy => self.context.copy_family,
        }
    }

    fn queue(&self, queue_type: QueueType) -> Arc<dyn Queue> {
        self.vulkan_queue(queue_type).clone()
    }

    fn sync_backend(&self) -> Arc<dyn SyncBackend> {
        self.context.clone()
    }

    fn create_surface(&self, window: &dyn Window) -> Result<RhiHandle> {
        let display_handle = window.display_handle().map_err(|e| {
            engine_err!(InitializationFailed, LOG_SOURCE, "Failed to get display handle: {}", e)
        })?;
        let window_handle = window.window_handle().map_err(|e| {
            engine_err!(InitializationFailed, LOG_SOURCE, "Failed to get window handle: {}", e)
        })?;

        let surface = unsafe {
            ash_window::create_surface(
                &self.context.entry,
                &self.context.instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
        }
        .map_err(|e| {
            engine_err!(InitializationFailed, LOG_SOURCE, "Failed to create surface: {:?}", e)
        })?;

        Ok(to_rhi(surface))
    }

    fn destroy_surface(&self, surface: RhiHandle) {
        if surface.is_null() {
            return;
        }
        unsafe {
            self.context.surface_loader.destroy_surface(from_rhi(surface), None);
        }
    }

    fn surface_present_support(&self, surface: RhiHandle, queue_family: u32) -> Result<bool> {
        unsafe {
            self.context
                .surface_loader
                .get_physical_device_surface_support(self.context.physical_device, queue_family, from_rhi(surface))
                .map_err(|e| {
                    engine_err!(BackendError, LOG_SOURCE, "Failed to query present support: {:?}", e)
                })
        }
    }

    fn surface_capabilities(&self, surface: RhiHandle) -> Result<SurfaceCapabilities> {
        let caps = unsafe {
            self.context
                .surface_loader
                .get_physical_device_surface_capabilities(self.context.physical_device, from_rhi(surface))
        }
        .map_err(|e| {
            engine_err!(BackendError, LOG_SOURCE, "Failed to query surface capabilities: {:?}", e)
        })?;

        Ok(vk_to_surface_capabilities(&caps))
    }

    fn surface_formats(&self, surface: RhiHandle) -> Result<Vec<SurfaceFormat>> {
        let formats = unsafe {
            self.context
                .surface_loader
                .get_physical_device_surface_formats(self.context.physical_device, from_rhi(surface))
        }
        .map_err(|e| {
            engine_err!(BackendError, LOG_SOURCE, "Failed to query surface formats: {:?}", e)
        })?;

        Ok(vk_to_surface_formats(&formats))
    }

    fn surface_present_modes(&self, surface: RhiHandle) -> Result<Vec<PresentMode>> {
        let modes = unsafe {
            self.context
                .surface_loader
                .get_physical_device_surface_present_modes(self.context.physical_device, from_rhi(surface))
        }
        .map_err(|e| {
            engine_err!(BackendError, LOG_SOURCE, "Failed to query present modes: {:?}", e)
        })?;

        Ok(vk_to_present_modes(&modes))
    }

    fn create_swapchain(&self, desc: &SwapchainCreateDesc) -> Result<RhiHandle> {
        let (sharing_mode, families) = sharing_mode_to_vk(&desc.sharing_mode);

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(from_rhi(desc.surface))
            .min_image_count(desc.min_image_count)
            .image_format(format_to_vk(desc.format))
            .image_color_space(color_space_to_vk(desc.color_space))
            .image_extent(vk::Extent2D {
                width: desc.extent.width,
                height: desc.extent.height,
            })
            .image_array_layers(1)
            .image_usage(image_usage_to_vk(desc.usage))
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(families)
            .pre_transform(vk::SurfaceTransformFlagsKHR::from_raw(desc.pre_transform))
            .composite_alpha(composite_alpha_to_vk(desc.composite_alpha))
            .present_mode(present_mode_to_vk(desc.present_mode))
            .clipped(desc.clipped);

        let swapchain = unsafe { self.context.swapchain_loader.create_swapchain(&create_info, None) }
            .map_err(|e| match e {
                vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
                    engine_error!(LOG_SOURCE, "Out of memory while creating swapchain");
                    Error::OutOfMemory
                }
                vk::Result::ERROR_SURFACE_LOST_KHR => {
                    engine_err!(SurfaceLost, LOG_SOURCE, "Surface lost while creating swapchain")
                }
                e => engine_err!(InitializationFailed, LOG_SOURCE, "Failed to create swapchain: {:?}", e),
            })?;

        Ok(to_rhi(swapchain))
    }

    fn destroy_swapchain(&self, swapchain: RhiHandle) {
        if swapchain.is_null() {
            return;
        }
        unsafe {
            self.context.swapchain_loader.destroy_swapchain(from_rhi(swapchain), None);
        }
    }

    fn swapchain_images(&self, swapchain: RhiHandle) -> Result<Vec<RhiHandle>> {
        let images = unsafe { self.context.swapchain_loader.get_swapchain_images(from_rhi(swapchain)) }
            .map_err(|e| {
                engine_err!(BackendError, LOG_SOURCE, "Failed to get swapchain images: {:?}", e)
            })?;

        Ok(images.into_iter().map(to_rhi).collect())
    }

    fn set_hdr_metadata(&self, swapchain: RhiHandle, metadata: &HdrMetadata) -> Result<()> {
        let Some(loader) = &self.context.hdr_metadata_loader else {
            return Err(Error::BackendError("VK_EXT_hdr_metadata is not available".to_string()));
        };

        let swapchains = [from_rhi::<vk::SwapchainKHR>(swapchain)];
        let metadata = [hdr_metadata_to_vk(metadata)];
        unsafe {
            loader.set_hdr_metadata(&swapchains, &metadata);
        }
        Ok(())
    }

    fn acquire_next_image(
        &self,
        swapchain: RhiHandle,
        semaphore: &SyncPrimitive,
        timeout: Duration,
    ) -> AcquireStatus {
        let result = unsafe {
            self.context.swapchain_loader.acquire_next_image(
                from_rhi(swapchain),
                timeout_ns(timeout),
                from_rhi(semaphore.rhi_resource()),
                vk::Fence::null(),
            )
        };

        acquire_result_to_status(result)
    }

    fn create_image_view(&self, image: RhiHandle, format: Format) -> Result<RhiHandle> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(from_rhi(image))
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format_to_vk(format))
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        let view = unsafe { self.context.device.create_image_view(&create_info, None) }.map_err(|e| {
            engine_err!(BackendError, LOG_SOURCE, "Failed to create image view: {:?}", e)
        })?;

        Ok(to_rhi(view))
    }

    fn immediate_submit(
        &self,
        queue_type: QueueType,
        record: &mut dyn FnMut(&mut dyn CommandList) -> Result<()>,
    ) -> Result<()> {
        self.vulkan_queue(queue_type).immediate_submit(record)
    }

    fn deletion_queue_add(&self, resource_type: ResourceType, handle: RhiHandle) {
        let generation = self.frame_generation();
        self.deletion_queue
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .add(resource_type, handle, generation);
    }

    fn wait_all_queues(&self) -> Result<()> {
        self.graphics_queue.wait()?;
        self.compute_queue.wait()?;
        self.copy_queue.wait()
    }

    fn set_resource_name(&self, handle: RhiHandle, resource_type: ResourceType, name: &str) {
        self.context
            .set_object_name(resource_type_to_vk(resource_type), handle.0, name);
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe {
            self.context.device.device_wait_idle().ok();
        }

        let queue = self.deletion_queue.get_mut().unwrap_or_else(|p| p.into_inner());
        let mut pending = Vec::new();
        queue.drain_all(|kind, handle| pending.push((kind, handle)));
        for (kind, handle) in pending {
            self.destroy_resource(kind, handle);
        }
        // Queues and the context are released with the remaining fields
    }
}
