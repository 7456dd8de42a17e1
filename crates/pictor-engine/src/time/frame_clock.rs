use std::time::Duration;

use web_time::Instant;

/// Longest interval reported between two ticks. A window that sat minimized
/// resumes with this instead of the real gap.
const MAX_INTERVAL: Duration = Duration::from_millis(250);

/// Weight of the newest interval in the smoothed frame rate.
const SMOOTHING: f64 = 0.1;

/// What the clock observed at one presented frame.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, capped at 250ms.
    pub dt: f32,
    pub now: Instant,
    pub frame_index: u64,
    /// Exponentially smoothed frames per second; 0 before the second tick.
    pub fps: f32,
}

/// Ticked once per presented frame of a window.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    frames: u64,
    smoothed: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: None,
            frames: 0,
            smoothed: None,
        }
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let interval = self
            .last
            .map(|last| now.saturating_duration_since(last).min(MAX_INTERVAL));
        self.last = Some(now);

        if let Some(secs) = interval.map(|d| d.as_secs_f64()).filter(|s| *s > 0.0) {
            self.smoothed = Some(match self.smoothed {
                Some(avg) => avg + SMOOTHING * (secs - avg),
                None => secs,
            });
        }

        let frame_index = self.frames;
        self.frames = self.frames.wrapping_add(1);
        FrameTime {
            dt: interval.unwrap_or_default().as_secs_f32(),
            now,
            frame_index,
            fps: self.smoothed.map_or(0.0, |avg| (1.0 / avg) as f32),
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
