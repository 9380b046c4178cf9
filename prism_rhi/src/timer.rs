/// Timer - frame delta measurement and frame pacing target
///
/// With vsync on, the target frame time follows the display refresh rate.
/// With vsync off, it follows the optional FPS limit (unbounded without one).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::engine_debug;
use crate::rhi::FramePacer;

pub struct Timer {
    refresh_rate: f64,
    vsync: AtomicBool,
    /// FPS cap bits (f64), 0 when uncapped
    fps_limit: AtomicU64,
    /// Target frame time in nanoseconds, 0 when unbounded
    target_frame_time_ns: AtomicU64,
    last_tick: Mutex<Instant>,
    delta_ns: AtomicU64,
    frame_count: AtomicU64,
}

impl Timer {
    /// Create a timer for a display refreshing at `refresh_rate` Hz
    pub fn new(refresh_rate: f64, vsync: bool) -> Self {
        let timer = Self {
            refresh_rate,
            vsync: AtomicBool::new(vsync),
            fps_limit: AtomicU64::new(0),
            target_frame_time_ns: AtomicU64::new(0),
            last_tick: Mutex::new(Instant::now()),
            delta_ns: AtomicU64::new(0),
            frame_count: AtomicU64::new(0),
        };
        timer.recalibrate();
        timer
    }

    /// Cap the frame rate while vsync is off (`None` removes the cap)
    pub fn set_fps_limit(&self, limit: Option<f64>) {
        let bits = match limit {
            Some(fps) if fps > 0.0 => fps.to_bits(),
            _ => 0,
        };
        self.fps_limit.store(bits, Ordering::Release);
        self.recalibrate();
    }

    pub fn fps_limit(&self) -> Option<f64> {
        match self.fps_limit.load(Ordering::Acquire) {
            0 => None,
            bits => Some(f64::from_bits(bits)),
        }
    }

    pub fn vsync(&self) -> bool {
        self.vsync.load(Ordering::Acquire)
    }

    /// Frame time the application should aim for, `None` when unbounded
    pub fn target_frame_time(&self) -> Option<Duration> {
        match self.target_frame_time_ns.load(Ordering::Acquire) {
            0 => None,
            ns => Some(Duration::from_nanos(ns)),
        }
    }

    /// Mark the start of a new frame and return the time since the previous one
    pub fn tick(&self) -> Duration {
        let now = Instant::now();
        let mut last_tick = self.last_tick.lock().unwrap_or_else(|e| e.into_inner());
        let delta = now.saturating_duration_since(*last_tick);
        *last_tick = now;

        self.delta_ns.store(delta.as_nanos() as u64, Ordering::Release);
        self.frame_count.fetch_add(1, Ordering::Relaxed);
        delta
    }

    /// Time between the last two ticks
    pub fn delta(&self) -> Duration {
        Duration::from_nanos(self.delta_ns.load(Ordering::Acquire))
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Relaxed)
    }

    /// Time left in the current frame before the target is reached
    pub fn remaining(&self) -> Duration {
        let Some(target) = self.target_frame_time() else {
            return Duration::ZERO;
        };
        let last_tick = *self.last_tick.lock().unwrap_or_else(|e| e.into_inner());
        target.saturating_sub(last_tick.elapsed())
    }

    fn recalibrate(&self) {
        let rate = if self.vsync() {
            Some(self.refresh_rate).filter(|r| *r > 0.0)
        } else {
            self.fps_limit()
        };

        let ns = rate.map(|r| (1_000_000_000.0 / r) as u64).unwrap_or(0);
        self.target_frame_time_ns.store(ns, Ordering::Release);
    }
}

impl FramePacer for Timer {
    fn on_vsync_toggled(&self, enabled: bool) {
        self.vsync.store(enabled, Ordering::Release);
        self.recalibrate();

        engine_debug!(
            "prism::Timer",
            "Target frame time is now {:?}",
            self.target_frame_time()
        );
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
