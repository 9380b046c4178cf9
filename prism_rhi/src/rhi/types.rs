/// Plain data types shared by the presentation layer and its backends

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use bitflags::bitflags;

/// Raw backend handle (Vulkan handles are 64-bit on every platform)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RhiHandle(pub u64);

impl RhiHandle {
    /// The null handle
    pub const NULL: RhiHandle = RhiHandle(0);

    /// Whether this is the null handle
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for RhiHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Process-unique object identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

impl ObjectId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Presentation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentMode {
    /// Unthrottled, may tear
    Immediate,
    /// Latest frame wins, no tearing
    Mailbox,
    /// Vsync-locked queue, always supported
    Fifo,
}

/// Swapchain pixel formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Format {
    R8G8B8A8_UNORM,
    B8G8R8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_SRGB,
    R10G10B10A2_UNORM,
    A2B10G10R10_UNORM,
    R16G16B16A16_SFLOAT,
}

impl Format {
    /// Default SDR swapchain format
    pub const SDR: Format = Format::R8G8B8A8_UNORM;

    /// Default HDR swapchain format
    pub const HDR: Format = Format::R10G10B10A2_UNORM;

    /// Same channels in swapped byte order, if such a variant exists
    ///
    /// Some vendors only expose BGRA for 8-bit swapchains.
    pub fn channel_swapped(&self) -> Option<Format> {
        match self {
            Format::R8G8B8A8_UNORM => Some(Format::B8G8R8A8_UNORM),
            Format::B8G8R8A8_UNORM => Some(Format::R8G8B8A8_UNORM),
            Format::R8G8B8A8_SRGB => Some(Format::B8G8R8A8_SRGB),
            Format::B8G8R8A8_SRGB => Some(Format::R8G8B8A8_SRGB),
            Format::R10G10B10A2_UNORM => Some(Format::A2B10G10R10_UNORM),
            Format::A2B10G10R10_UNORM => Some(Format::R10G10B10A2_UNORM),
            Format::R16G16B16A16_SFLOAT => None,
        }
    }

    /// Whether this format is used for HDR output
    pub fn is_hdr(&self) -> bool {
        matches!(
            self,
            Format::R10G10B10A2_UNORM | Format::A2B10G10R10_UNORM | Format::R16G16B16A16_SFLOAT
        )
    }
}

/// Surface color spaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// sRGB non-linear (SDR)
    SrgbNonlinear,
    /// HDR10 with the ST2084 (PQ) transfer function
    Hdr10St2084,
    /// Extended sRGB linear (scRGB)
    ExtendedSrgbLinear,
}

/// A format + color space pair the surface can present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceFormat {
    pub format: Format,
    pub color_space: ColorSpace,
}

bitflags! {
    /// Composite alpha modes a surface supports
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CompositeAlphaFlags: u32 {
        const OPAQUE = 1 << 0;
        const PRE_MULTIPLIED = 1 << 1;
        const POST_MULTIPLIED = 1 << 2;
        const INHERIT = 1 << 3;
    }
}

/// A single composite alpha mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeAlpha {
    Opaque,
    PreMultiplied,
    PostMultiplied,
    Inherit,
}

impl CompositeAlpha {
    /// Matching flag bit
    pub fn flag(&self) -> CompositeAlphaFlags {
        match self {
            CompositeAlpha::Opaque => CompositeAlphaFlags::OPAQUE,
            CompositeAlpha::PreMultiplied => CompositeAlphaFlags::PRE_MULTIPLIED,
            CompositeAlpha::PostMultiplied => CompositeAlphaFlags::POST_MULTIPLIED,
            CompositeAlpha::Inherit => CompositeAlphaFlags::INHERIT,
        }
    }
}

bitflags! {
    /// How swapchain images may be used
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsageFlags: u32 {
        const COLOR_ATTACHMENT = 1 << 0;
        const TRANSFER_DST = 1 << 1;
        const TRANSFER_SRC = 1 << 2;
    }
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// What a surface reports about itself
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceCapabilities {
    pub min_image_count: u32,
    /// 0 means no upper bound
    pub max_image_count: u32,
    pub current_extent: Extent2D,
    pub min_image_extent: Extent2D,
    pub max_image_extent: Extent2D,
    pub supported_composite_alpha: CompositeAlphaFlags,
    /// Backend transform value, passed back untouched as pre-transform
    pub current_transform: u32,
}

/// Queue ownership of swapchain images
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharingMode {
    /// Owned by one queue family at a time
    Exclusive,
    /// Accessed concurrently by the listed queue families
    Concurrent(Vec<u32>),
}

/// Image layout of a presentable image
///
/// Swapchain images only move between these three states; transitions back to
/// `Undefined` are not allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    /// Contents undefined (freshly created)
    Undefined,
    /// Writable as a color attachment
    Attachment,
    /// Ready for the presentation engine
    PresentSource,
}

impl ImageLayout {
    /// Whether a barrier from `self` to `new` is legal
    pub fn can_transition_to(&self, new: ImageLayout) -> bool {
        new != ImageLayout::Undefined
    }
}

/// Queue kinds exposed by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    Graphics,
    Compute,
    Copy,
}

/// Kinds of resources handed to the deferred deletion queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Texture,
    TextureView,
    Semaphore,
    Fence,
    Swapchain,
    Surface,
    CommandPool,
}

/// Sync primitive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncPrimitiveType {
    /// Binary GPU-GPU semaphore
    Semaphore,
    /// Timeline semaphore with a monotonically increasing value
    SemaphoreTimeline,
    /// GPU-CPU fence
    Fence,
}

/// Static HDR metadata pushed to the display after swapchain creation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HdrMetadata {
    pub display_primary_red: [f32; 2],
    pub display_primary_green: [f32; 2],
    pub display_primary_blue: [f32; 2],
    pub white_point: [f32; 2],
    /// Nits
    pub max_luminance: f32,
    /// Nits
    pub min_luminance: f32,
    pub max_content_light_level: f32,
    pub max_frame_average_light_level: f32,
}

impl HdrMetadata {
    /// Rec.2020 primaries with a D65 white point
    pub fn rec2020(max_luminance: f32) -> Self {
        Self {
            display_primary_red: [0.708, 0.292],
            display_primary_green: [0.170, 0.797],
            display_primary_blue: [0.131, 0.046],
            white_point: [0.3127, 0.3290],
            max_luminance,
            min_luminance: 0.001,
            max_content_light_level: 2000.0,
            max_frame_average_light_level: 500.0,
        }
    }
}

/// Everything the backend needs to build a swapchain
#[derive(Debug, Clone, PartialEq)]
pub struct SwapchainCreateDesc {
    pub surface: RhiHandle,
    pub min_image_count: u32,
    pub format: Format,
    pub color_space: ColorSpace,
    pub extent: Extent2D,
    pub usage: ImageUsageFlags,
    pub sharing_mode: SharingMode,
    pub pre_transform: u32,
    pub composite_alpha: CompositeAlpha,
    pub present_mode: PresentMode,
    pub clipped: bool,
}

/// Outcome of a single driver acquire call
#[derive(Debug, Clone, PartialEq)]
pub enum AcquireStatus {
    /// Image acquired
    Success(u32),
    /// Image acquired but the chain no longer matches the surface exactly
    Suboptimal(u32),
    /// No image available yet
    NotReady,
    /// No image available within the timeout
    Timeout,
    /// The chain no longer matches the surface and must be rebuilt
    OutOfDate,
    /// Anything else
    Error(String),
}

/// Command list lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandListState {
    Idle,
    Recording,
    Submitted,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
