/// Surface capability negotiation
///
/// Pure functions: they take what the surface reports and return what the
/// swapchain should ask for. No device access, no state.

use crate::rhi::{
    ColorSpace, CompositeAlpha, CompositeAlphaFlags, Extent2D, Format, PresentMode, SharingMode,
    SurfaceCapabilities, SurfaceFormat,
};
use crate::engine_warn;

/// Composite alpha modes in order of preference
pub const COMPOSITE_ALPHA_PREFERENCE: [CompositeAlpha; 4] = [
    CompositeAlpha::Opaque,
    CompositeAlpha::PreMultiplied,
    CompositeAlpha::PostMultiplied,
    CompositeAlpha::Inherit,
];

/// Color space a swapchain format is presented in
pub fn color_space_for_format(format: Format) -> ColorSpace {
    if format.is_hdr() {
        ColorSpace::Hdr10St2084
    } else {
        ColorSpace::SrgbNonlinear
    }
}

/// Pick `requested` if the surface supports it, Fifo otherwise
///
/// Fifo is the one mode every surface must support.
pub fn select_present_mode(supported: &[PresentMode], requested: PresentMode) -> PresentMode {
    if supported.contains(&requested) {
        return requested;
    }

    engine_warn!(
        "prism::surface",
        "Requested present mode {:?} is not supported. Falling back to {:?}",
        requested,
        PresentMode::Fifo
    );
    PresentMode::Fifo
}

/// Whether the exact format + color space pair is supported
pub fn is_format_supported(supported: &[SurfaceFormat], format: Format, color_space: ColorSpace) -> bool {
    supported
        .iter()
        .any(|f| f.format == format && f.color_space == color_space)
}

/// Resolve the format to create the swapchain with
///
/// Tries `format` first, then its byte-order-swapped variant. Returns `None`
/// when neither is supported with `color_space`.
pub fn resolve_surface_format(
    supported: &[SurfaceFormat],
    format: Format,
    color_space: ColorSpace,
) -> Option<Format> {
    if is_format_supported(supported, format, color_space) {
        return Some(format);
    }

    format
        .channel_swapped()
        .filter(|&swapped| is_format_supported(supported, swapped, color_space))
}

/// First supported composite alpha in `COMPOSITE_ALPHA_PREFERENCE`, opaque when none is reported
pub fn select_composite_alpha(supported: CompositeAlphaFlags) -> CompositeAlpha {
    if let Some(mode) = COMPOSITE_ALPHA_PREFERENCE
        .iter()
        .copied()
        .find(|mode| supported.contains(mode.flag()))
    {
        if mode != COMPOSITE_ALPHA_PREFERENCE[0] {
            engine_warn!(
                "prism::surface",
                "Composite alpha {:?} is not supported, falling back to {:?}",
                COMPOSITE_ALPHA_PREFERENCE[0],
                mode
            );
        }
        return mode;
    }

    engine_warn!(
        "prism::surface",
        "Surface reports no composite alpha mode ({:?}), assuming opaque",
        supported
    );
    CompositeAlpha::Opaque
}

/// Clamp a requested size into the surface's min/max image extent
pub fn clamp_extent(width: u32, height: u32, capabilities: &SurfaceCapabilities) -> Extent2D {
    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;

    Extent2D {
        width: width.clamp(min.width, max.width.max(min.width)),
        height: height.clamp(min.height, max.height.max(min.height)),
    }
}

/// Number of images to request, honoring the surface bounds
pub fn clamp_image_count(buffer_count: u32, capabilities: &SurfaceCapabilities) -> u32 {
    let count = buffer_count.max(capabilities.min_image_count);
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// Concurrent sharing when graphics and compute live in different families
pub fn select_sharing_mode(graphics_family: u32, compute_family: u32) -> SharingMode {
    if graphics_family != compute_family {
        SharingMode::Concurrent(vec![compute_family, graphics_family])
    } else {
        SharingMode::Exclusive
    }
}

#[cfg(test)]
#[path = "surface_tests.rs"]
mod tests;
