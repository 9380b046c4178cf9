/// Configuration types for devices and swapchains

use std::time::Duration;
use crate::rhi::PresentMode;

/// Validation message severity forwarded to the engine logger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Only errors
    ErrorsOnly,
    /// Errors and warnings
    ErrorsAndWarnings,
    /// Everything the layers emit (info and verbose included)
    All,
}

/// Device configuration
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Which validation messages reach the logger
    pub validation_severity: ValidationSeverity,
    /// Trigger a debugger break on validation errors
    pub break_on_validation_error: bool,
    /// Panic on validation errors (useful in CI)
    pub panic_on_validation_error: bool,
    /// Count validation messages per severity
    pub enable_validation_stats: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Prism Application".to_string(),
            app_version: (1, 0, 0),
            validation_severity: ValidationSeverity::ErrorsAndWarnings,
            break_on_validation_error: false,
            panic_on_validation_error: false,
            enable_validation_stats: true,
        }
    }
}

/// How `SwapChain::acquire_next_image` waits out transient "not ready" results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireRetryPolicy {
    /// Fixed sleep between attempts, bounded attempt count
    Linear {
        /// Total attempts, the first one included
        max_attempts: u32,
        /// Sleep between attempts
        delay: Duration,
    },
    /// Doubling sleep between attempts, bounded by a total deadline
    ExponentialBackoff {
        /// Sleep after the first failed attempt
        initial_delay: Duration,
        /// Upper bound for a single sleep
        max_delay: Duration,
        /// Retries stop once the next sleep would cross this much elapsed time
        deadline: Duration,
    },
}

impl Default for AcquireRetryPolicy {
    fn default() -> Self {
        AcquireRetryPolicy::Linear {
            max_attempts: 10,
            delay: Duration::from_millis(16),
        }
    }
}

impl AcquireRetryPolicy {
    /// Sleep to take before the next attempt, or `None` to give up
    ///
    /// # Arguments
    ///
    /// * `attempts` - Attempts made so far (>= 1)
    /// * `elapsed` - Time spent since the first attempt
    pub fn next_delay(&self, attempts: u32, elapsed: Duration) -> Option<Duration> {
        match *self {
            AcquireRetryPolicy::Linear { max_attempts, delay } => {
                if attempts >= max_attempts {
                    None
                } else {
                    Some(delay)
                }
            }
            AcquireRetryPolicy::ExponentialBackoff { initial_delay, max_delay, deadline } => {
                let shift = attempts.saturating_sub(1).min(16);
                let delay = initial_delay.saturating_mul(1u32 << shift).min(max_delay);
                if elapsed + delay > deadline {
                    None
                } else {
                    Some(delay)
                }
            }
        }
    }
}

/// Swapchain creation parameters
#[derive(Debug, Clone)]
pub struct SwapChainDesc {
    /// Requested width in pixels (clamped to the surface extent)
    pub width: u32,
    /// Requested height in pixels (clamped to the surface extent)
    pub height: u32,
    /// Requested present mode (falls back to Fifo when unsupported)
    pub present_mode: PresentMode,
    /// Number of buffer slots, at least 2
    pub buffer_count: u32,
    /// Use the HDR format and color space
    pub hdr: bool,
    /// Debug name
    pub name: String,
    /// Driver-side timeout for a single acquire attempt
    pub acquire_timeout: Duration,
    /// Retry policy for transient acquire failures
    pub acquire_retry: AcquireRetryPolicy,
}

impl Default for SwapChainDesc {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            present_mode: PresentMode::Fifo,
            buffer_count: 2,
            hdr: false,
            name: "swapchain".to_string(),
            acquire_timeout: Duration::from_millis(16),
            acquire_retry: AcquireRetryPolicy::default(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
