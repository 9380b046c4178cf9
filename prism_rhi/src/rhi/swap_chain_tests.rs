//! Unit tests for swap_chain.rs
//!
//! Drives SwapChain against the mock device: creation, acquire/present
//! protocol, layout tracking and every recreation path.
//!
//! Tests that install a capturing logger are #[serial] since the logger is global.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use serial_test::serial;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;

use crate::config::{AcquireRetryPolicy, SwapChainDesc};
use crate::error::Error;
use crate::prism::Engine;
use crate::log::{Logger, LogEntry};
use crate::rhi::mock_device::{MockDevice, MockDeviceConfig, MockFramePacer, MockWindow};
use crate::rhi::{
    AcquireStatus, ColorSpace, CompositeAlpha, DisplayInfo, Extent2D, Format, FramePacer, ImageLayout,
    ImageUsageFlags, PresentMode, ResourceType, SharingMode, SurfaceFormat, SwapChain,
    SyncPrimitive, SyncPrimitiveType,
};

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        let mut entries = self.entries.lock().unwrap();
        entries.push(format!("{:?}: {}", entry.severity, entry.message));
    }
}

fn capture_logs() -> Arc<Mutex<Vec<String>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(TestLogger { entries: entries.clone() });
    entries
}

fn logged(entries: &Arc<Mutex<Vec<String>>>, needle: &str) -> bool {
    entries.lock().unwrap().iter().any(|e| e.contains(needle))
}

/// Descriptor that never sleeps between acquire attempts
fn desc(width: u32, height: u32) -> SwapChainDesc {
    SwapChainDesc {
        width,
        height,
        name: "test_swapchain".to_string(),
        acquire_retry: AcquireRetryPolicy::Linear {
            max_attempts: 3,
            delay: Duration::ZERO,
        },
        ..Default::default()
    }
}

fn create_with(device: &Arc<MockDevice>, display: DisplayInfo, desc: SwapChainDesc) -> crate::error::Result<SwapChain> {
    SwapChain::new(
        device.clone(),
        Arc::new(MockWindow::new(desc.width, desc.height)),
        Arc::new(display),
        desc,
    )
}

fn create_swap_chain(width: u32, height: u32) -> (Arc<MockDevice>, SwapChain) {
    let device = Arc::new(MockDevice::new());
    let swap_chain = create_with(&device, DisplayInfo::default(), desc(width, height)).unwrap();
    (device, swap_chain)
}

fn hdr_display() -> DisplayInfo {
    DisplayInfo {
        hdr: true,
        luminance_max: 1000.0,
    }
}

/// Move the current image to PresentSource through the queue's command list
fn transition_to_present(device: &Arc<MockDevice>, swap_chain: &mut SwapChain) {
    let mut cmd_list = device.graphics_queue.command_list.lock().unwrap();
    swap_chain.set_layout(ImageLayout::PresentSource, &mut *cmd_list).unwrap();
}

// ============================================================================
// CREATION TESTS
// ============================================================================

#[test]
fn test_create_800x600_fifo() {
    let (device, swap_chain) = create_swap_chain(800, 600);

    assert!(swap_chain.is_created());
    assert_eq!(swap_chain.width(), 800);
    assert_eq!(swap_chain.height(), 600);
    assert_eq!(swap_chain.buffer_count(), 2);
    assert_eq!(swap_chain.image_count(), 2);
    assert_eq!(swap_chain.image_views().len(), 2);
    assert_eq!(swap_chain.image_acquired_semaphores().len(), 2);
    assert_eq!(swap_chain.image_index(), 0);
    assert_eq!(swap_chain.buffer_index(), 0);
    assert_eq!(swap_chain.present_mode(), PresentMode::Fifo);
    assert!(swap_chain.get_vsync());
    assert_eq!(swap_chain.get_layout(), ImageLayout::Attachment);
    assert_eq!(swap_chain.stats().creations, 1);

    let log = device.log.lock().unwrap();
    assert_eq!(log.surfaces_created, 1);
    assert_eq!(log.swapchains_created.len(), 1);

    let create_desc = &log.swapchains_created[0];
    assert_eq!(create_desc.extent, Extent2D::new(800, 600));
    assert_eq!(create_desc.min_image_count, 2);
    assert_eq!(create_desc.format, Format::R8G8B8A8_UNORM);
    assert_eq!(create_desc.color_space, ColorSpace::SrgbNonlinear);
    assert_eq!(create_desc.present_mode, PresentMode::Fifo);
    assert_eq!(create_desc.composite_alpha, CompositeAlpha::Opaque);
    assert_eq!(create_desc.sharing_mode, SharingMode::Exclusive);
    assert_eq!(create_desc.pre_transform, 1);
    assert!(create_desc.clipped);
    assert!(create_desc.usage.contains(ImageUsageFlags::COLOR_ATTACHMENT | ImageUsageFlags::TRANSFER_DST));
}

#[test]
fn test_create_transitions_every_image_to_attachment() {
    let (device, _swap_chain) = create_swap_chain(800, 600);

    let log = device.log.lock().unwrap();
    assert_eq!(log.immediate_barriers.len(), 2);
    for (_, old, new) in &log.immediate_barriers {
        assert_eq!(*old, ImageLayout::Undefined);
        assert_eq!(*new, ImageLayout::Attachment);
    }
}

#[test]
fn test_create_names_images_and_semaphores() {
    let (device, _swap_chain) = create_swap_chain(800, 600);

    let log = device.log.lock().unwrap();
    let names: Vec<&str> = log.resource_names.iter().map(|(_, n)| n.as_str()).collect();
    assert!(names.contains(&"swapchain_image_0"));
    assert!(names.contains(&"swapchain_image_1"));
    assert!(names.contains(&"swapchain_0"));
    assert!(names.contains(&"swapchain_1"));

    let created = device.sync_backend.created.lock().unwrap();
    assert!(created.iter().all(|(kind, _)| *kind == SyncPrimitiveType::Semaphore));
}

#[test]
fn test_create_rejects_single_buffer() {
    let device = Arc::new(MockDevice::new());
    let mut d = desc(800, 600);
    d.buffer_count = 1;

    let result = create_with(&device, DisplayInfo::default(), d);
    assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    assert_eq!(device.log.lock().unwrap().surfaces_created, 0);
}

#[test]
fn test_create_rejects_invalid_resolution() {
    let device = Arc::new(MockDevice::new());

    let result = create_with(&device, DisplayInfo::default(), desc(0, 600));
    assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
}

#[test]
fn test_create_clamps_extent_to_surface() {
    let mut config = MockDeviceConfig::default();
    config.capabilities.max_image_extent = Extent2D::new(1920, 1080);
    let device = Arc::new(MockDevice::with_config(config));

    let swap_chain = create_with(&device, DisplayInfo::default(), desc(4000, 3000)).unwrap();
    assert_eq!(swap_chain.width(), 1920);
    assert_eq!(swap_chain.height(), 1080);
}

#[test]
fn test_create_falls_back_to_channel_swapped_format() {
    let mut config = MockDeviceConfig::default();
    config.surface_formats = vec![SurfaceFormat {
        format: Format::B8G8R8A8_UNORM,
        color_space: ColorSpace::SrgbNonlinear,
    }];
    let device = Arc::new(MockDevice::with_config(config));

    let swap_chain = create_with(&device, DisplayInfo::default(), desc(800, 600)).unwrap();
    assert_eq!(swap_chain.format(), Format::B8G8R8A8_UNORM);
    assert!(!swap_chain.is_hdr());
}

#[test]
fn test_create_fails_on_unsupported_format_and_cleans_up() {
    let mut config = MockDeviceConfig::default();
    config.surface_formats = vec![SurfaceFormat {
        format: Format::R16G16B16A16_SFLOAT,
        color_space: ColorSpace::ExtendedSrgbLinear,
    }];
    let device = Arc::new(MockDevice::with_config(config));

    let result = create_with(&device, DisplayInfo::default(), desc(800, 600));
    assert!(matches!(result, Err(Error::InvalidConfiguration(_))));

    let log = device.log.lock().unwrap();
    assert_eq!(log.surfaces_created, 1);
    assert_eq!(log.surfaces_destroyed, 1);
    assert!(log.swapchains_created.is_empty());
    assert_eq!(device.sync_backend.live_count(), 0);
}

#[test]
fn test_create_fails_without_present_support() {
    let mut config = MockDeviceConfig::default();
    config.present_support = false;
    let device = Arc::new(MockDevice::with_config(config));

    let result = create_with(&device, DisplayInfo::default(), desc(800, 600));
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
    assert_eq!(device.log.lock().unwrap().surfaces_destroyed, 1);
}

#[test]
fn test_create_concurrent_sharing_across_families() {
    let mut config = MockDeviceConfig::default();
    config.graphics_family = 0;
    config.compute_family = 1;
    let device = Arc::new(MockDevice::with_config(config));

    let _swap_chain = create_with(&device, DisplayInfo::default(), desc(800, 600)).unwrap();
    let log = device.log.lock().unwrap();
    assert_eq!(log.swapchains_created[0].sharing_mode, SharingMode::Concurrent(vec![1, 0]));
}

#[test]
fn test_driver_may_return_more_images_than_buffers() {
    let mut config = MockDeviceConfig::default();
    config.image_count = Some(3);
    let device = Arc::new(MockDevice::with_config(config));

    let swap_chain = create_with(&device, DisplayInfo::default(), desc(800, 600)).unwrap();
    assert_eq!(swap_chain.image_count(), 3);
    assert_eq!(swap_chain.image_views().len(), 3);
    assert_eq!(swap_chain.image_acquired_semaphores().len(), 2);
    assert_eq!(device.log.lock().unwrap().immediate_barriers.len(), 3);
}

#[test]
fn test_create_on_live_swap_chain_is_rejected() {
    let (_device, mut swap_chain) = create_swap_chain(800, 600);

    let result = swap_chain.create();
    assert!(matches!(result, Err(Error::ContractViolation(_))));
    assert_eq!(swap_chain.stats().creations, 1);
}

#[test]
#[serial]
fn test_unsupported_present_mode_falls_back_to_fifo() {
    let entries = capture_logs();

    let mut config = MockDeviceConfig::default();
    config.present_modes = vec![PresentMode::Fifo];
    let device = Arc::new(MockDevice::with_config(config));

    let mut d = desc(800, 600);
    d.present_mode = PresentMode::Mailbox;
    let swap_chain = create_with(&device, DisplayInfo::default(), d).unwrap();

    assert_eq!(swap_chain.present_mode(), PresentMode::Fifo);
    assert_eq!(device.log.lock().unwrap().swapchains_created[0].present_mode, PresentMode::Fifo);
    assert!(logged(&entries, "Warn: Requested present mode Mailbox is not supported"));

    Engine::reset_logger();
}

// ============================================================================
// ACQUIRE TESTS
// ============================================================================

#[test]
fn test_acquire_cycles_buffer_index() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    let semaphores: Vec<_> = swap_chain
        .image_acquired_semaphores()
        .iter()
        .map(|s| s.rhi_resource())
        .collect();

    swap_chain.acquire_next_image().unwrap();
    assert_eq!(swap_chain.buffer_index(), 1);
    swap_chain.acquire_next_image().unwrap();
    assert_eq!(swap_chain.buffer_index(), 0);
    swap_chain.acquire_next_image().unwrap();
    assert_eq!(swap_chain.buffer_index(), 1);

    let used = device.log.lock().unwrap().acquire_semaphores.clone();
    assert_eq!(used, vec![semaphores[1], semaphores[0], semaphores[1]]);
}

#[test]
fn test_acquire_follows_driver_image_order() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    device.script_acquire([AcquireStatus::Success(1), AcquireStatus::Success(0)]);

    assert_eq!(swap_chain.acquire_next_image().unwrap(), 1);
    assert_eq!(swap_chain.image_index(), 1);
    assert_eq!(swap_chain.buffer_index(), 1);

    assert_eq!(swap_chain.acquire_next_image().unwrap(), 0);
    assert_eq!(swap_chain.image_index(), 0);
    assert_eq!(swap_chain.buffer_index(), 0);
}

#[test]
fn test_acquire_retries_not_ready() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    device.script_acquire([
        AcquireStatus::NotReady,
        AcquireStatus::NotReady,
        AcquireStatus::Success(1),
    ]);

    assert_eq!(swap_chain.acquire_next_image().unwrap(), 1);
    assert_eq!(swap_chain.stats().acquire_retries, 2);
    // Every retry reuses the same buffer slot
    let used = device.log.lock().unwrap().acquire_semaphores.clone();
    assert_eq!(used.len(), 3);
    assert!(used.iter().all(|&s| s == used[0]));
}

#[test]
fn test_acquire_timeout_is_not_retried() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    device.script_acquire([AcquireStatus::Timeout, AcquireStatus::Success(1)]);

    let result = swap_chain.acquire_next_image();
    assert_eq!(result, Err(Error::AcquireTimedOut { attempts: 1 }));
    assert_eq!(swap_chain.stats().acquire_retries, 0);
    assert_eq!(device.log.lock().unwrap().acquire_semaphores.len(), 1);
}

#[test]
fn test_acquire_gives_up_after_max_attempts() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    device.script_acquire(std::iter::repeat(AcquireStatus::NotReady).take(3));

    let result = swap_chain.acquire_next_image();
    assert_eq!(result, Err(Error::AcquireTimedOut { attempts: 3 }));
    assert_eq!(swap_chain.stats().acquire_retries, 2);
    // buffer_index advanced even though the acquire failed
    assert_eq!(swap_chain.buffer_index(), 1);
}

#[test]
fn test_acquire_suboptimal_counts_as_success() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    device.script_acquire([AcquireStatus::Suboptimal(1)]);

    assert_eq!(swap_chain.acquire_next_image().unwrap(), 1);
    assert_eq!(swap_chain.image_index(), 1);
}

#[test]
fn test_acquire_out_of_date_is_surface_lost() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    device.script_acquire([AcquireStatus::OutOfDate]);

    assert!(matches!(swap_chain.acquire_next_image(), Err(Error::SurfaceLost(_))));
}

#[test]
fn test_acquire_driver_error_is_backend_error() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    device.script_acquire([AcquireStatus::Error("VK_ERROR_DEVICE_LOST".to_string())]);

    match swap_chain.acquire_next_image() {
        Err(Error::BackendError(msg)) => assert!(msg.contains("VK_ERROR_DEVICE_LOST")),
        other => panic!("Expected BackendError, got {:?}", other),
    }
}

#[test]
fn test_acquire_rejects_out_of_range_index() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    device.script_acquire([AcquireStatus::Success(7)]);

    assert!(matches!(swap_chain.acquire_next_image(), Err(Error::BackendError(_))));
    assert_eq!(swap_chain.image_index(), 0);
}

// ============================================================================
// LAYOUT TESTS
// ============================================================================

#[test]
fn test_set_layout_records_barrier_and_tags_command_list() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    swap_chain.acquire_next_image().unwrap();

    transition_to_present(&device, &mut swap_chain);

    assert_eq!(swap_chain.get_layout(), ImageLayout::PresentSource);
    let cmd_list = device.graphics_queue.command_list.lock().unwrap();
    assert_eq!(cmd_list.barriers.len(), 1);
    assert_eq!(cmd_list.barriers[0].1, ImageLayout::Attachment);
    assert_eq!(cmd_list.barriers[0].2, ImageLayout::PresentSource);
    assert_eq!(cmd_list.swapchain_id, Some(swap_chain.id()));
}

#[test]
fn test_set_layout_same_layout_is_noop() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    swap_chain.acquire_next_image().unwrap();

    transition_to_present(&device, &mut swap_chain);
    transition_to_present(&device, &mut swap_chain);

    assert_eq!(device.graphics_queue.command_list.lock().unwrap().barriers.len(), 1);
}

#[test]
fn test_set_layout_to_undefined_is_rejected() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    let mut cmd_list = device.graphics_queue.command_list.lock().unwrap();

    let result = swap_chain.set_layout(ImageLayout::Undefined, &mut *cmd_list);
    assert!(matches!(result, Err(Error::ContractViolation(_))));
    assert!(cmd_list.barriers.is_empty());
}

#[test]
fn test_layouts_are_tracked_per_image() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    device.script_acquire([AcquireStatus::Success(1), AcquireStatus::Success(0)]);

    swap_chain.acquire_next_image().unwrap();
    transition_to_present(&device, &mut swap_chain);
    assert_eq!(swap_chain.get_layout(), ImageLayout::PresentSource);

    swap_chain.acquire_next_image().unwrap();
    assert_eq!(swap_chain.image_index(), 0);
    assert_eq!(swap_chain.get_layout(), ImageLayout::Attachment);
}

// ============================================================================
// PRESENT TESTS
// ============================================================================

#[test]
fn test_present_requires_present_source() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    swap_chain.acquire_next_image().unwrap();

    let result = swap_chain.present();
    assert!(matches!(result, Err(Error::ContractViolation(_))));
    assert!(device.presents().is_empty());
    assert_eq!(swap_chain.stats().presents, 0);
}

#[test]
fn test_present_waits_on_acquire_semaphore() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    swap_chain.acquire_next_image().unwrap();
    transition_to_present(&device, &mut swap_chain);

    swap_chain.present().unwrap();

    let presents = device.presents();
    assert_eq!(presents.len(), 1);
    assert_eq!(presents[0].swapchain, swap_chain.rhi_swapchain());
    assert_eq!(presents[0].image_index, swap_chain.image_index());
    assert_eq!(
        presents[0].wait_semaphores,
        vec![swap_chain.image_acquired_semaphores()[1].rhi_resource()]
    );
    assert_eq!(swap_chain.stats().presents, 1);
}

#[test]
fn test_present_waits_on_rendering_complete_once() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    let rendering_complete = Arc::new(
        SyncPrimitive::new(device.sync_backend.clone(), SyncPrimitiveType::Semaphore, "rendering_complete")
            .unwrap(),
    );
    device.graphics_queue.command_list.lock().unwrap().rendering_complete = Some(rendering_complete.clone());

    swap_chain.acquire_next_image().unwrap();
    transition_to_present(&device, &mut swap_chain);
    swap_chain.present().unwrap();

    let acquire_semaphore = swap_chain.image_acquired_semaphores()[1].rhi_resource();
    assert_eq!(
        device.presents()[0].wait_semaphores,
        vec![rendering_complete.rhi_resource(), acquire_semaphore]
    );
    assert!(rendering_complete.has_been_waited_for());

    // Same signal again on the next frame: only the acquire semaphore is waited on
    swap_chain.acquire_next_image().unwrap();
    transition_to_present(&device, &mut swap_chain);
    swap_chain.present().unwrap();
    assert_eq!(
        device.presents()[1].wait_semaphores,
        vec![swap_chain.image_acquired_semaphores()[0].rhi_resource()]
    );
}

#[test]
fn test_present_twice_without_acquire_is_rejected() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    swap_chain.acquire_next_image().unwrap();
    transition_to_present(&device, &mut swap_chain);
    swap_chain.present().unwrap();

    let result = swap_chain.present();
    assert!(matches!(result, Err(Error::ContractViolation(_))));
    assert_eq!(device.presents().len(), 1);
    assert_eq!(swap_chain.stats().presents, 1);
}

#[test]
fn test_present_before_first_acquire_is_rejected() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    transition_to_present(&device, &mut swap_chain);

    assert!(matches!(swap_chain.present(), Err(Error::ContractViolation(_))));
    assert!(device.presents().is_empty());
}

#[test]
fn test_failed_acquire_does_not_allow_present() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    swap_chain.acquire_next_image().unwrap();
    transition_to_present(&device, &mut swap_chain);
    swap_chain.present().unwrap();

    device.script_acquire([AcquireStatus::OutOfDate]);
    assert!(swap_chain.acquire_next_image().is_err());

    assert!(matches!(swap_chain.present(), Err(Error::ContractViolation(_))));
    assert_eq!(device.presents().len(), 1);
}

#[test]
fn test_present_ignores_command_list_of_other_swap_chain() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    let rendering_complete = Arc::new(
        SyncPrimitive::new(device.sync_backend.clone(), SyncPrimitiveType::Semaphore, "rendering_complete")
            .unwrap(),
    );

    swap_chain.acquire_next_image().unwrap();
    transition_to_present(&device, &mut swap_chain);
    {
        let mut cmd_list = device.graphics_queue.command_list.lock().unwrap();
        cmd_list.rendering_complete = Some(rendering_complete.clone());
        cmd_list.swapchain_id = Some(crate::rhi::ObjectId::next());
    }

    swap_chain.present().unwrap();

    assert_eq!(device.presents()[0].wait_semaphores.len(), 1);
    assert!(!rendering_complete.has_been_waited_for());
}

// ============================================================================
// DESTROY TESTS
// ============================================================================

#[test]
fn test_destroy_releases_everything() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    swap_chain.acquire_next_image().unwrap();
    let views = swap_chain.image_views().to_vec();

    swap_chain.destroy().unwrap();

    assert!(!swap_chain.is_created());
    assert_eq!(swap_chain.image_index(), 0);
    assert_eq!(swap_chain.buffer_index(), 0);
    assert_eq!(swap_chain.image_count(), 0);
    assert!(swap_chain.image_views().is_empty());
    assert!(swap_chain.image_acquired_semaphores().is_empty());
    assert!(swap_chain.rhi_surface().is_null());
    assert_eq!(swap_chain.get_layout(), ImageLayout::Undefined);
    assert_eq!(device.sync_backend.live_count(), 0);

    let log = device.log.lock().unwrap();
    assert_eq!(log.wait_all_queues, 1);
    assert_eq!(log.swapchains_destroyed, 1);
    assert_eq!(log.surfaces_destroyed, 1);
    let deferred: Vec<_> = log
        .deletion_queue
        .iter()
        .filter(|(t, _)| *t == ResourceType::TextureView)
        .map(|(_, h)| *h)
        .collect();
    assert_eq!(deferred, views);
}

#[test]
fn test_destroy_twice_is_noop() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);

    swap_chain.destroy().unwrap();
    swap_chain.destroy().unwrap();

    assert_eq!(swap_chain.stats().destructions, 1);
    assert_eq!(device.log.lock().unwrap().wait_all_queues, 1);
}

#[test]
fn test_operations_on_destroyed_swap_chain_are_rejected() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    swap_chain.destroy().unwrap();

    assert!(matches!(swap_chain.acquire_next_image(), Err(Error::ContractViolation(_))));
    assert!(matches!(swap_chain.present(), Err(Error::ContractViolation(_))));
    let mut cmd_list = device.graphics_queue.command_list.lock().unwrap();
    assert!(matches!(
        swap_chain.set_layout(ImageLayout::PresentSource, &mut *cmd_list),
        Err(Error::ContractViolation(_))
    ));
}

#[test]
fn test_create_after_destroy() {
    let (_device, mut swap_chain) = create_swap_chain(800, 600);
    swap_chain.destroy().unwrap();

    swap_chain.create().unwrap();
    assert!(swap_chain.is_created());
    assert_eq!(swap_chain.stats().creations, 2);
    assert_eq!(swap_chain.get_layout(), ImageLayout::Attachment);
}

#[test]
fn test_drop_releases_everything() {
    let (device, swap_chain) = create_swap_chain(800, 600);
    drop(swap_chain);

    assert_eq!(device.sync_backend.live_count(), 0);
    let log = device.log.lock().unwrap();
    assert_eq!(log.swapchains_destroyed, 1);
    assert_eq!(log.surfaces_destroyed, 1);
}

// ============================================================================
// RESIZE TESTS
// ============================================================================

#[test]
#[serial]
fn test_resize_recreates_chain() {
    let entries = capture_logs();
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    swap_chain.acquire_next_image().unwrap();

    swap_chain.resize(1024, 768).unwrap();

    assert_eq!(swap_chain.width(), 1024);
    assert_eq!(swap_chain.height(), 768);
    assert_eq!(swap_chain.stats().creations, 2);
    assert_eq!(swap_chain.stats().destructions, 1);
    assert_eq!(swap_chain.buffer_index(), 0);
    assert_eq!(swap_chain.image_index(), 0);
    assert_eq!(swap_chain.get_layout(), ImageLayout::Attachment);
    assert_eq!(device.log.lock().unwrap().surfaces_created, 2);
    assert!(logged(&entries, "Info: Resolution has been set to 1024x768"));

    Engine::reset_logger();
}

#[test]
fn test_resize_then_acquire_and_present() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    swap_chain.acquire_next_image().unwrap();
    transition_to_present(&device, &mut swap_chain);
    swap_chain.present().unwrap();

    swap_chain.resize(1920, 1080).unwrap();

    swap_chain.acquire_next_image().unwrap();
    transition_to_present(&device, &mut swap_chain);
    swap_chain.present().unwrap();

    assert_eq!(swap_chain.get_layout(), ImageLayout::PresentSource);
    assert_eq!(swap_chain.stats().creations, 2);
    assert_eq!(swap_chain.stats().presents, 2);
    let presents = device.presents();
    assert_eq!(presents.len(), 2);
    assert_eq!(presents[1].swapchain, swap_chain.rhi_swapchain());
}

#[test]
fn test_resize_invalid_resolution_keeps_chain() {
    let (_device, mut swap_chain) = create_swap_chain(800, 600);

    let result = swap_chain.resize(0, 0);
    assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    assert!(swap_chain.is_created());
    assert_eq!(swap_chain.width(), 800);
    assert_eq!(swap_chain.stats().creations, 1);
}

#[test]
fn test_resize_to_window_size() {
    let device = Arc::new(MockDevice::new());
    let window = Arc::new(MockWindow::new(800, 600));
    let mut swap_chain = SwapChain::new(
        device.clone(),
        window.clone(),
        Arc::new(DisplayInfo::default()),
        desc(800, 600),
    )
    .unwrap();

    window.set_size(1280, 1024);
    swap_chain.resize_to_window_size().unwrap();

    assert_eq!(swap_chain.width(), 1280);
    assert_eq!(swap_chain.height(), 1024);
}

#[test]
fn test_window_resize_event() {
    let (_device, mut swap_chain) = create_swap_chain(800, 600);

    let minimized = WindowEvent::Resized(PhysicalSize::new(0, 0));
    assert!(!swap_chain.handle_window_event(&minimized).unwrap());
    assert_eq!(swap_chain.stats().creations, 1);

    let resized = WindowEvent::Resized(PhysicalSize::new(640, 480));
    assert!(swap_chain.handle_window_event(&resized).unwrap());
    assert_eq!(swap_chain.width(), 640);
    assert_eq!(swap_chain.height(), 480);

    assert!(!swap_chain.handle_window_event(&WindowEvent::Focused(true)).unwrap());
}

// ============================================================================
// VSYNC TESTS
// ============================================================================

#[test]
fn test_set_vsync_same_value_is_noop() {
    let (_device, mut swap_chain) = create_swap_chain(800, 600);

    swap_chain.set_vsync(true).unwrap();
    assert_eq!(swap_chain.stats().creations, 1);
}

#[test]
fn test_set_vsync_toggles_present_mode_and_notifies_pacer() {
    let (device, mut swap_chain) = create_swap_chain(800, 600);
    let pacer = Arc::new(MockFramePacer::default());
    swap_chain.set_frame_pacer(Some(pacer.clone() as Arc<dyn FramePacer>));

    swap_chain.set_vsync(false).unwrap();
    assert!(!swap_chain.get_vsync());
    assert_eq!(swap_chain.present_mode(), PresentMode::Immediate);
    assert_eq!(swap_chain.stats().creations, 2);
    assert_eq!(
        device.log.lock().unwrap().swapchains_created[1].present_mode,
        PresentMode::Immediate
    );

    swap_chain.set_vsync(true).unwrap();
    assert!(swap_chain.get_vsync());
    assert_eq!(swap_chain.present_mode(), PresentMode::Fifo);

    assert_eq!(*pacer.toggles.lock().unwrap(), vec![false, true]);
}

// ============================================================================
// HDR TESTS
// ============================================================================

#[test]
fn test_set_hdr_on_sdr_display_fails() {
    let (_device, mut swap_chain) = create_swap_chain(800, 600);

    let result = swap_chain.set_hdr(true);
    assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    assert!(!swap_chain.is_hdr());
    assert_eq!(swap_chain.stats().creations, 1);
}

#[test]
fn test_set_hdr_same_value_is_noop() {
    let (_device, mut swap_chain) = create_swap_chain(800, 600);

    swap_chain.set_hdr(false).unwrap();
    assert_eq!(swap_chain.stats().creations, 1);
}

#[test]
fn test_set_hdr_switches_format_and_pushes_metadata() {
    let device = Arc::new(MockDevice::new());
    let mut swap_chain = create_with(&device, hdr_display(), desc(800, 600)).unwrap();

    swap_chain.set_hdr(true).unwrap();

    assert!(swap_chain.is_hdr());
    assert_eq!(swap_chain.format(), Format::R10G10B10A2_UNORM);
    assert_eq!(swap_chain.color_space(), ColorSpace::Hdr10St2084);
    assert_eq!(swap_chain.stats().creations, 2);

    {
        let log = device.log.lock().unwrap();
        assert_eq!(log.hdr_metadata.len(), 1);
        assert_eq!(log.hdr_metadata[0].max_luminance, 1000.0);
        assert_eq!(log.hdr_metadata[0].max_content_light_level, 2000.0);
        assert_eq!(log.hdr_metadata[0].max_frame_average_light_level, 500.0);
    }

    swap_chain.set_hdr(true).unwrap();
    assert_eq!(swap_chain.stats().creations, 2);

    swap_chain.set_hdr(false).unwrap();
    assert_eq!(swap_chain.format(), Format::R8G8B8A8_UNORM);
    assert_eq!(swap_chain.color_space(), ColorSpace::SrgbNonlinear);
}

#[test]
#[serial]
fn test_hdr_metadata_failure_is_not_fatal() {
    let entries = capture_logs();

    let mut config = MockDeviceConfig::default();
    config.hdr_metadata_fails = true;
    let device = Arc::new(MockDevice::with_config(config));

    let mut d = desc(800, 600);
    d.hdr = true;
    let swap_chain = create_with(&device, hdr_display(), d).unwrap();

    assert!(swap_chain.is_created());
    assert!(logged(&entries, "Warn: Failed to set HDR metadata"));

    Engine::reset_logger();
}
