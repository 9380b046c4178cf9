/// Vulkan validation messenger
///
/// Routes validation layer messages through the engine logger, counts them per
/// severity and groups repeated messages. Only compiled with the
/// `vulkan-validation` feature.

use std::borrow::Cow;
use std::ffi::CStr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use ash::vk;
use colored::*;
use rustc_hash::FxHashMap;
use prism_rhi::prism::{DeviceConfig, Result, ValidationSeverity};
use prism_rhi::{engine_err, engine_error, engine_info, engine_trace, engine_warn};

const LOG_SOURCE: &str = "prism::vulkan::validation";

/// Global messenger configuration (read by the callback)
static DEBUG_CONFIG: Mutex<Option<Config>> = Mutex::new(None);

/// Global validation statistics
static VALIDATION_STATS: ValidationStatsTracker = ValidationStatsTracker::new();

/// Occurrence count per message text
static MESSAGE_TRACKER: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

/// Messenger configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub severity: ValidationSeverity,
    pub break_on_error: bool,
    pub panic_on_error: bool,
    pub enable_stats: bool,
}

impl From<&DeviceConfig> for Config {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            severity: config.validation_severity,
            break_on_error: config.break_on_validation_error,
            panic_on_error: config.panic_on_validation_error,
            enable_stats: config.enable_validation_stats,
        }
    }
}

/// Validation message counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

struct ValidationStatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl ValidationStatsTracker {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
        }
    }

    fn record(&self, severity: vk::DebugUtilsMessageSeverityFlagsEXT) {
        let counter = if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            &self.errors
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            &self.warnings
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            &self.info
        } else {
            &self.verbose
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn get(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.info.store(0, Ordering::Relaxed);
        self.verbose.store(0, Ordering::Relaxed);
    }
}

/// Severity flags the messenger subscribes to
pub fn severity_flags(severity: ValidationSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    match severity {
        ValidationSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        ValidationSeverity::ErrorsAndWarnings => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        }
        ValidationSeverity::All => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        }
    }
}

/// Reset statistics and install the callback configuration
pub fn init(config: Config) {
    VALIDATION_STATS.reset();
    *MESSAGE_TRACKER.lock().unwrap_or_else(|p| p.into_inner()) = Some(FxHashMap::default());
    *DEBUG_CONFIG.lock().unwrap_or_else(|p| p.into_inner()) = Some(config);
}

/// Stop forwarding messages (called before the messenger is destroyed)
pub fn cleanup() {
    *DEBUG_CONFIG.lock().unwrap_or_else(|p| p.into_inner()) = None;
}

/// Create the debug messenger for `instance`
pub(crate) fn create_messenger(
    debug_utils: &ash::ext::debug_utils::Instance,
    config: &DeviceConfig,
) -> Result<vk::DebugUtilsMessengerEXT> {
    init(Config::from(config));

    let info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(severity_flags(config.validation_severity))
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback));

    unsafe {
        debug_utils.create_debug_utils_messenger(&info, None).map_err(|e| {
            engine_err!(InitializationFailed, LOG_SOURCE, "Failed to create debug messenger: {:?}", e)
        })
    }
}

/// Current validation statistics
pub fn validation_stats() -> ValidationStats {
    VALIDATION_STATS.get()
}

/// Print a colored summary of the validation statistics
pub fn print_validation_stats_report() {
    let stats = validation_stats();

    if stats.total() == 0 {
        println!("\n{}", "✓ No validation messages".green().bold());
        return;
    }

    println!("\n{}", "=== Validation Statistics Report ===".bright_blue().bold());
    if stats.errors > 0 {
        println!("  {} {}", "Errors:".red().bold(), stats.errors);
    }
    if stats.warnings > 0 {
        println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
    }
    if stats.info > 0 {
        println!("  {} {}", "Info:".cyan(), stats.info);
    }
    if stats.verbose > 0 {
        println!("  {} {}", "Verbose:".bright_black(), stats.verbose);
    }
    println!("  {} {}", "Total:".white().bold(), stats.total());

    let duplicates = MESSAGE_TRACKER
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .as_ref()
        .map(|messages| messages.values().filter(|&&count| count > 1).count())
        .unwrap_or(0);
    if duplicates > 0 {
        println!("\n  {} {} message(s) appeared multiple times", "ℹ".cyan(), duplicates);
    }

    println!("{}\n", "====================================".bright_blue().bold());
}

/// Whether `config` lets a message of this severity through
pub(crate) fn should_display(severity: ValidationSeverity, message_severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> bool {
    match severity {
        ValidationSeverity::ErrorsOnly => {
            message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR)
        }
        ValidationSeverity::ErrorsAndWarnings => {
            message_severity.intersects(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
            )
        }
        ValidationSeverity::All => true,
    }
}

fn track_message(message: &str) -> u32 {
    let mut tracker = MESSAGE_TRACKER.lock().unwrap_or_else(|p| p.into_inner());
    let count = tracker
        .get_or_insert_with(FxHashMap::default)
        .entry(message.to_string())
        .or_insert(0);
    *count += 1;
    *count
}

fn message_type_name(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

/// Debug messenger callback
pub(crate) unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    let Some(config) = *DEBUG_CONFIG.lock().unwrap_or_else(|p| p.into_inner()) else {
        return vk::FALSE;
    };

    if !should_display(config.severity, message_severity) || p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = &*p_callback_data;
    let message_id = if callback_data.p_message_id_name.is_null() {
        Cow::Borrowed("Unknown")
    } else {
        CStr::from_ptr(callback_data.p_message_id_name).to_string_lossy()
    };
    let message = if callback_data.p_message.is_null() {
        Cow::Borrowed("No message")
    } else {
        CStr::from_ptr(callback_data.p_message).to_string_lossy()
    };

    let repeat = if config.enable_stats {
        VALIDATION_STATS.record(message_severity);
        match track_message(&message) {
            1 => String::new(),
            n => format!(" [x{}]", n),
        }
    } else {
        String::new()
    };

    let type_name = message_type_name(message_type);

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        engine_error!(LOG_SOURCE, "[{}]{} {}: {}", type_name, repeat, message_id, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        engine_warn!(LOG_SOURCE, "[{}]{} {}: {}", type_name, repeat, message_id, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        engine_info!(LOG_SOURCE, "[{}]{} {}: {}", type_name, repeat, message_id, message);
    } else {
        engine_trace!(LOG_SOURCE, "[{}]{} {}: {}", type_name, repeat, message_id, message);
    }

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        if config.panic_on_error {
            panic!("Vulkan validation error ({}): {}", message_id, message);
        }
        if config.break_on_error {
            eprintln!("{}", "Break on validation error, aborting".red().bold());
            std::process::abort();
        }
    }

    vk::FALSE
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
