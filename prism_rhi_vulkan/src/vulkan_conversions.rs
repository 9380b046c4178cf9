/// Conversions between prism RHI types and Vulkan types
///
/// Every function here is pure so it can be tested without a GPU.

use ash::vk;
use ash::vk::Handle;
use prism_rhi::prism::rhi::{
    AcquireStatus, ColorSpace, CompositeAlpha, CompositeAlphaFlags, Extent2D, Format, HdrMetadata,
    ImageLayout, ImageUsageFlags, PresentMode, ResourceType, RhiHandle, SharingMode,
    SurfaceCapabilities, SurfaceFormat,
};

// ============================================================================
// Handles
// ============================================================================

/// Wrap a Vulkan handle
pub fn to_rhi<H: Handle>(handle: H) -> RhiHandle {
    RhiHandle(handle.as_raw())
}

/// Unwrap a Vulkan handle
pub fn from_rhi<H: Handle>(handle: RhiHandle) -> H {
    H::from_raw(handle.0)
}

pub fn resource_type_to_vk(resource_type: ResourceType) -> vk::ObjectType {
    match resource_type {
        ResourceType::Texture => vk::ObjectType::IMAGE,
        ResourceType::TextureView => vk::ObjectType::IMAGE_VIEW,
        ResourceType::Semaphore => vk::ObjectType::SEMAPHORE,
        ResourceType::Fence => vk::ObjectType::FENCE,
        ResourceType::Swapchain => vk::ObjectType::SWAPCHAIN_KHR,
        ResourceType::Surface => vk::ObjectType::SURFACE_KHR,
        ResourceType::CommandPool => vk::ObjectType::COMMAND_POOL,
    }
}

// ============================================================================
// Formats / color spaces
// ============================================================================

pub fn format_to_vk(format: Format) -> vk::Format {
    match format {
        Format::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        Format::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        Format::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        Format::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        Format::R10G10B10A2_UNORM => vk::Format::A2R10G10B10_UNORM_PACK32,
        Format::A2B10G10R10_UNORM => vk::Format::A2B10G10R10_UNORM_PACK32,
        Format::R16G16B16A16_SFLOAT => vk::Format::R16G16B16A16_SFLOAT,
    }
}

/// Inverse of `format_to_vk`, `None` for formats a swapchain never uses
pub fn vk_to_format(format: vk::Format) -> Option<Format> {
    match format {
        vk::Format::R8G8B8A8_UNORM => Some(Format::R8G8B8A8_UNORM),
        vk::Format::B8G8R8A8_UNORM => Some(Format::B8G8R8A8_UNORM),
        vk::Format::R8G8B8A8_SRGB => Some(Format::R8G8B8A8_SRGB),
        vk::Format::B8G8R8A8_SRGB => Some(Format::B8G8R8A8_SRGB),
        vk::Format::A2R10G10B10_UNORM_PACK32 => Some(Format::R10G10B10A2_UNORM),
        vk::Format::A2B10G10R10_UNORM_PACK32 => Some(Format::A2B10G10R10_UNORM),
        vk::Format::R16G16B16A16_SFLOAT => Some(Format::R16G16B16A16_SFLOAT),
        _ => None,
    }
}

pub fn color_space_to_vk(color_space: ColorSpace) -> vk::ColorSpaceKHR {
    match color_space {
        ColorSpace::SrgbNonlinear => vk::ColorSpaceKHR::SRGB_NONLINEAR,
        ColorSpace::Hdr10St2084 => vk::ColorSpaceKHR::HDR10_ST2084_EXT,
        ColorSpace::ExtendedSrgbLinear => vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
    }
}

pub fn vk_to_color_space(color_space: vk::ColorSpaceKHR) -> Option<ColorSpace> {
    match color_space {
        vk::ColorSpaceKHR::SRGB_NONLINEAR => Some(ColorSpace::SrgbNonlinear),
        vk::ColorSpaceKHR::HDR10_ST2084_EXT => Some(ColorSpace::Hdr10St2084),
        vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT => Some(ColorSpace::ExtendedSrgbLinear),
        _ => None,
    }
}

/// Surface formats the RHI can express; the rest are dropped
pub fn vk_to_surface_formats(formats: &[vk::SurfaceFormatKHR]) -> Vec<SurfaceFormat> {
    formats
        .iter()
        .filter_map(|f| {
            Some(SurfaceFormat {
                format: vk_to_format(f.format)?,
                color_space: vk_to_color_space(f.color_space)?,
            })
        })
        .collect()
}

// ============================================================================
// Present modes / composite alpha / usage
// ============================================================================

pub fn present_mode_to_vk(mode: PresentMode) -> vk::PresentModeKHR {
    match mode {
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
        PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
    }
}

pub fn vk_to_present_modes(modes: &[vk::PresentModeKHR]) -> Vec<PresentMode> {
    modes
        .iter()
        .filter_map(|&mode| match mode {
            vk::PresentModeKHR::IMMEDIATE => Some(PresentMode::Immediate),
            vk::PresentModeKHR::MAILBOX => Some(PresentMode::Mailbox),
            vk::PresentModeKHR::FIFO => Some(PresentMode::Fifo),
            _ => None,
        })
        .collect()
}

pub fn composite_alpha_to_vk(alpha: CompositeAlpha) -> vk::CompositeAlphaFlagsKHR {
    match alpha {
        CompositeAlpha::Opaque => vk::CompositeAlphaFlagsKHR::OPAQUE,
        CompositeAlpha::PreMultiplied => vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
        CompositeAlpha::PostMultiplied => vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
        CompositeAlpha::Inherit => vk::CompositeAlphaFlagsKHR::INHERIT,
    }
}

pub fn vk_to_composite_alpha_flags(flags: vk::CompositeAlphaFlagsKHR) -> CompositeAlphaFlags {
    let mut result = CompositeAlphaFlags::empty();
    for alpha in [
        CompositeAlpha::Opaque,
        CompositeAlpha::PreMultiplied,
        CompositeAlpha::PostMultiplied,
        CompositeAlpha::Inherit,
    ] {
        if flags.contains(composite_alpha_to_vk(alpha)) {
            result |= alpha.flag();
        }
    }
    result
}

pub fn image_usage_to_vk(usage: ImageUsageFlags) -> vk::ImageUsageFlags {
    let mut result = vk::ImageUsageFlags::empty();
    if usage.contains(ImageUsageFlags::COLOR_ATTACHMENT) {
        result |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(ImageUsageFlags::TRANSFER_DST) {
        result |= vk::ImageUsageFlags::TRANSFER_DST;
    }
    if usage.contains(ImageUsageFlags::TRANSFER_SRC) {
        result |= vk::ImageUsageFlags::TRANSFER_SRC;
    }
    result
}

/// Sharing mode plus the queue families it lists
pub fn sharing_mode_to_vk(mode: &SharingMode) -> (vk::SharingMode, &[u32]) {
    match mode {
        SharingMode::Exclusive => (vk::SharingMode::EXCLUSIVE, &[]),
        SharingMode::Concurrent(families) => (vk::SharingMode::CONCURRENT, families.as_slice()),
    }
}

pub fn vk_to_surface_capabilities(caps: &vk::SurfaceCapabilitiesKHR) -> SurfaceCapabilities {
    SurfaceCapabilities {
        min_image_count: caps.min_image_count,
        max_image_count: caps.max_image_count,
        current_extent: Extent2D::new(caps.current_extent.width, caps.current_extent.height),
        min_image_extent: Extent2D::new(caps.min_image_extent.width, caps.min_image_extent.height),
        max_image_extent: Extent2D::new(caps.max_image_extent.width, caps.max_image_extent.height),
        supported_composite_alpha: vk_to_composite_alpha_flags(caps.supported_composite_alpha),
        current_transform: caps.current_transform.as_raw(),
    }
}

// ============================================================================
// Layouts / barriers
// ============================================================================

pub fn image_layout_to_vk(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::Undefined => vk::ImageLayout::UNDEFINED,
        ImageLayout::Attachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ImageLayout::PresentSource => vk::ImageLayout::PRESENT_SRC_KHR,
    }
}

/// Stage and access scope of an image in `layout`, for synchronization2 barriers
pub fn layout_scope(layout: ImageLayout) -> (vk::PipelineStageFlags2, vk::AccessFlags2) {
    match layout {
        ImageLayout::Undefined => (vk::PipelineStageFlags2::TOP_OF_PIPE, vk::AccessFlags2::NONE),
        ImageLayout::Attachment => (
            vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags2::COLOR_ATTACHMENT_READ | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
        ),
        ImageLayout::PresentSource => (vk::PipelineStageFlags2::BOTTOM_OF_PIPE, vk::AccessFlags2::NONE),
    }
}

// ============================================================================
// HDR metadata
// ============================================================================

pub fn hdr_metadata_to_vk(metadata: &HdrMetadata) -> vk::HdrMetadataEXT<'static> {
    let xy = |v: [f32; 2]| vk::XYColorEXT { x: v[0], y: v[1] };

    vk::HdrMetadataEXT::default()
        .display_primary_red(xy(metadata.display_primary_red))
        .display_primary_green(xy(metadata.display_primary_green))
        .display_primary_blue(xy(metadata.display_primary_blue))
        .white_point(xy(metadata.white_point))
        .max_luminance(metadata.max_luminance)
        .min_luminance(metadata.min_luminance)
        .max_content_light_level(metadata.max_content_light_level)
        .max_frame_average_light_level(metadata.max_frame_average_light_level)
}

// ============================================================================
// Acquire results
// ============================================================================

/// Map the result of `vkAcquireNextImageKHR` (as returned by ash) to an `AcquireStatus`
pub fn acquire_result_to_status(result: std::result::Result<(u32, bool), vk::Result>) -> AcquireStatus {
    match result {
        Ok((index, false)) => AcquireStatus::Success(index),
        Ok((index, true)) => AcquireStatus::Suboptimal(index),
        Err(vk::Result::NOT_READY) => AcquireStatus::NotReady,
        Err(vk::Result::TIMEOUT) => AcquireStatus::Timeout,
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => AcquireStatus::OutOfDate,
        Err(e) => AcquireStatus::Error(format!("{:?}", e)),
    }
}

#[cfg(test)]
#[path = "vulkan_conversions_tests.rs"]
mod tests;
