//! Error types for the Prism presentation layer
//!
//! This module defines the error types used throughout the crate,
//! including configuration, backend and swapchain contract failures.

use std::fmt;

/// Result type for Prism operations
pub type Result<T> = std::result::Result<T, Error>;

/// Prism errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (Vulkan, DirectX, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (image, view, semaphore, etc.)
    InvalidResource(String),

    /// Initialization failed (device, surface, swapchain)
    InitializationFailed(String),

    /// Invalid configuration (resolution, buffer count, unsupported format, HDR on SDR display)
    InvalidConfiguration(String),

    /// A caller broke an API contract (missing barrier before present, use after destroy)
    ContractViolation(String),

    /// The driver timed out acquiring an image, or kept reporting "not ready"
    /// until the retry policy ran out
    AcquireTimedOut {
        /// Number of acquire attempts made
        attempts: u32,
    },

    /// The surface or swapchain was lost/out of date and must be rebuilt
    SurfaceLost(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::ContractViolation(msg) => write!(f, "Contract violation: {}", msg),
            Error::AcquireTimedOut { attempts } => {
                write!(f, "Swapchain image not ready after {} attempts", attempts)
            }
            Error::SurfaceLost(msg) => write!(f, "Surface lost: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
