//! Frame timing and performance tracking.
//!
//! The simulation integrates whatever delta it is handed, so the only
//! protection against long stalls is the clamp applied here.

use std::collections::VecDeque;
use std::time::Duration;

/// Frame timing manager.
#[derive(Debug)]
pub struct FrameTiming {
    /// Target frames per second
    target_fps: u32,
    /// Time budget per frame
    frame_budget: Duration,
    /// Maximum delta handed out
    max_dt: f32,
    /// Recent frame times for averaging
    frame_times: VecDeque<f32>,
    /// Maximum samples for averaging
    max_samples: usize,
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new(60)
    }
}

impl FrameTiming {
    /// Create a new frame timing manager.
    #[must_use]
    pub fn new(target_fps: u32) -> Self {
        let target_fps = target_fps.max(1);
        Self {
            target_fps,
            frame_budget: Duration::from_secs_f64(1.0 / f64::from(target_fps)),
            max_dt: 0.25,
            frame_times: VecDeque::with_capacity(120),
            max_samples: 120,
        }
    }

    /// Set the largest delta handed out.
    #[must_use]
    pub fn with_max_dt(mut self, max_dt: f32) -> Self {
        self.max_dt = max_dt.max(0.001);
        self
    }

    /// Nominal delta of one frame at the target rate.
    #[must_use]
    pub fn nominal_dt(&self) -> f32 {
        self.frame_budget.as_secs_f32()
    }

    /// Clamp a delta to `[0, max_dt]` and record it for averaging.
    pub fn record(&mut self, dt: f32) -> f32 {
        let clamped = dt.clamp(0.0, self.max_dt);
        self.frame_times.push_back(clamped);
        if self.frame_times.len() > self.max_samples {
            self.frame_times.pop_front();
        }
        clamped
    }

    /// Get the current FPS (averaged over recent frames).
    #[must_use]
    pub fn current_fps(&self) -> f32 {
        let avg = self.average_frame_time();
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }

    /// Get the average frame time in milliseconds.
    #[must_use]
    pub fn average_frame_time_ms(&self) -> f32 {
        self.average_frame_time() * 1000.0
    }

    fn average_frame_time(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32
    }

    /// Get the target FPS.
    #[must_use]
    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    /// Forget recorded frame times.
    pub fn reset(&mut self) {
        self.frame_times.clear();
    }
}
