/*!
# Prism RHI - Vulkan Backend

Vulkan implementation of the `prism_rhi` collaborator traits, built on `ash`.

- **VulkanDevice**: instance, adapter and logical device, surfaces, swapchains,
  image views, deferred deletion
- **VulkanQueue**: command list ring, submit, present
- **VulkanCommandList**: layout barriers for presentable images
- **VulkanContext**: shared device state, implements `SyncBackend`

Validation layer support (debug messenger routed through the engine logger,
validation statistics) is compiled in with the `vulkan-validation` feature.

# Example

```no_run
use std::sync::Arc;
use prism_rhi::prism::{DeviceConfig, SwapChainDesc};
use prism_rhi::prism::rhi::{DisplayInfo, SwapChain};
use prism_rhi_vulkan::VulkanDevice;
# fn run(window: winit::window::Window) -> prism_rhi::prism::Result<()> {
let window = Arc::new(window);
let device = Arc::new(VulkanDevice::new(window.as_ref(), DeviceConfig::default())?);
let graphics = device.graphics_queue();

let mut swap_chain = SwapChain::new(
    device.clone(),
    window.clone(),
    Arc::new(DisplayInfo::default()),
    SwapChainDesc::default(),
)?;

swap_chain.acquire_next_image()?;
let cmd_list = graphics.begin_frame()?;
{
    let mut cmd = cmd_list.lock().unwrap();
    swap_chain.set_layout(prism_rhi::prism::rhi::ImageLayout::Attachment, &mut *cmd)?;
    // ... record rendering ...
    swap_chain.set_layout(prism_rhi::prism::rhi::ImageLayout::PresentSource, &mut *cmd)?;
}
graphics.submit()?;
swap_chain.present()?;
device.end_frame();
# Ok(())
# }
```
*/

mod vulkan_context;
mod vulkan_conversions;
mod vulkan_command_list;
mod vulkan_queue;
mod vulkan_device;

#[cfg(feature = "vulkan-validation")]
mod debug;

pub use vulkan_context::VulkanContext;
pub use vulkan_command_list::VulkanCommandList;
pub use vulkan_queue::{VulkanQueue, COMMAND_LIST_RING_SIZE};
pub use vulkan_device::VulkanDevice;

// Validation statistics
#[cfg(feature = "vulkan-validation")]
pub use debug::{print_validation_stats_report, validation_stats, ValidationStats};
