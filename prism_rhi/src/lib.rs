/*!
# Prism RHI

Backend-agnostic presentation layer for the Prism renderer.

This crate owns the swapchain lifecycle: acquiring presentable images,
tracking their layouts, collecting the GPU signals a present must wait on, and
rebuilding the chain on resize, HDR or vsync changes. Everything that talks to
the driver goes through the collaborator traits in [`rhi`], implemented by a
backend crate (see `prism_rhi_vulkan`).

## Architecture

- **SwapChain**: image chain state machine (acquire, present, layouts, recreate)
- **SyncPrimitive**: semaphores and fences with a "waited for" flag
- **surface**: pure capability negotiation helpers
- **DeletionQueue**: generation-keyed deferred destruction
- **Device / Queue / CommandList / Window / Display**: collaborator traits
*/

// Internal modules
mod error;
mod engine;
pub mod config;
pub mod log;
pub mod rhi;
pub mod timer;

// Main prism namespace module
pub mod prism {
    // Error types
    pub use crate::error::{Error, Result};

    // Global log sink
    pub use crate::engine::Engine;

    // Configuration
    pub use crate::config::{AcquireRetryPolicy, DeviceConfig, SwapChainDesc, ValidationSeverity};

    // Frame pacing
    pub use crate::timer::Timer;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Render hardware interface types and traits
    pub mod rhi {
        pub use crate::rhi::*;
    }
}
