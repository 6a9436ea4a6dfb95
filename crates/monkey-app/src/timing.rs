//! Frame timing: delta time, averaged FPS and the frame rate limiter.

use std::time::{Duration, Instant};

/// Number of frames averaged for the displayed FPS.
pub const FPS_SAMPLES: usize = 20;

/// How often the window title is refreshed.
const TITLE_INTERVAL: Duration = Duration::from_secs(1);

/// Tracks frame durations and paces the loop to an optional FPS cap.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    last_frame: Instant,
    last_title: Instant,
    samples: [f32; FPS_SAMPLES],
    cursor: usize,
    filled: usize,
    max_fps: u32,
}

impl FrameTimer {
    /// Create a timer. `max_fps == 0` means unlimited.
    pub fn new(max_fps: u32) -> Self {
        Self::starting_at(Instant::now(), max_fps)
    }

    /// Create a timer whose first frame starts at `now`.
    pub fn starting_at(now: Instant, max_fps: u32) -> Self {
        Self {
            last_frame: now,
            last_title: now,
            samples: [0.0; FPS_SAMPLES],
            cursor: 0,
            filled: 0,
            max_fps,
        }
    }

    /// Seconds elapsed since the previous tick.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    /// [`tick`](Self::tick) with an explicit clock reading.
    pub fn tick_at(&mut self, now: Instant) -> f32 {
        let dt = now.saturating_duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.record(dt);
        dt
    }

    fn record(&mut self, dt: f32) {
        self.samples[self.cursor] = dt;
        self.cursor = (self.cursor + 1) % FPS_SAMPLES;
        self.filled = (self.filled + 1).min(FPS_SAMPLES);
    }

    /// Frames per second over the last [`FPS_SAMPLES`] frames.
    pub fn average_fps(&self) -> f32 {
        if self.filled == 0 {
            return 0.0;
        }
        let total: f32 = self.samples[..self.filled].iter().sum();
        if total <= 0.0 {
            return 0.0;
        }
        self.filled as f32 / total
    }

    /// Frame rate cap, 0 when unlimited.
    pub fn max_fps(&self) -> u32 {
        self.max_fps
    }

    pub fn set_max_fps(&mut self, max_fps: u32) {
        self.max_fps = max_fps;
    }

    /// Minimum duration of one frame, if capped.
    pub fn target_frame_time(&self) -> Option<Duration> {
        (self.max_fps > 0).then(|| Duration::from_secs(1) / self.max_fps)
    }

    /// How long to sleep after a frame that took `elapsed`.
    pub fn limiter_delay(&self, elapsed: Duration) -> Option<Duration> {
        self.target_frame_time()
            .and_then(|target| target.checked_sub(elapsed))
            .filter(|delay| !delay.is_zero())
    }

    /// Start time of the current frame.
    pub fn frame_start(&self) -> Instant {
        self.last_frame
    }

    /// Returns `true` once per second.
    pub fn title_due(&mut self) -> bool {
        self.title_due_at(Instant::now())
    }

    /// [`title_due`](Self::title_due) with an explicit clock reading.
    pub fn title_due_at(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_title) >= TITLE_INTERVAL {
            self.last_title = now;
            true
        } else {
            false
        }
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Window title showing the GPU, the FPS cap and the averaged FPS.
pub fn window_title(gpu_name: &str, max_fps: u32, fps: f32) -> String {
    let limit = if max_fps == 0 {
        "MAX".to_string()
    } else {
        max_fps.to_string()
    };
    format!("{gpu_name}    Max FPS limit: {limit}  -  AVRG FPS: {fps:.0}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tick_reports_elapsed_seconds() {
        let start = Instant::now();
        let mut timer = FrameTimer::starting_at(start, 0);
        let dt = timer.tick_at(start + Duration::from_millis(250));
        assert_relative_eq!(dt, 0.25, epsilon = 1e-6);
    }

    #[test]
    fn average_fps_uses_last_twenty_frames() {
        let start = Instant::now();
        let mut timer = FrameTimer::starting_at(start, 0);
        assert_relative_eq!(timer.average_fps(), 0.0);

        let mut now = start;
        // Slow frames that will be pushed out of the window
        for _ in 0..5 {
            now += Duration::from_millis(100);
            timer.tick_at(now);
        }
        for _ in 0..FPS_SAMPLES {
            now += Duration::from_millis(10);
            timer.tick_at(now);
        }
        assert_relative_eq!(timer.average_fps(), 100.0, epsilon = 1e-2);
    }

    #[test]
    fn average_before_window_fills() {
        let start = Instant::now();
        let mut timer = FrameTimer::starting_at(start, 0);
        timer.tick_at(start + Duration::from_millis(20));
        timer.tick_at(start + Duration::from_millis(40));
        assert_relative_eq!(timer.average_fps(), 50.0, epsilon = 1e-2);
    }

    #[test]
    fn limiter_targets_frame_time() {
        let mut timer = FrameTimer::new(0);
        assert_eq!(timer.target_frame_time(), None);
        assert_eq!(timer.limiter_delay(Duration::ZERO), None);

        timer.set_max_fps(50);
        assert_eq!(timer.target_frame_time(), Some(Duration::from_millis(20)));
        assert_eq!(
            timer.limiter_delay(Duration::from_millis(5)),
            Some(Duration::from_millis(15))
        );
        assert_eq!(timer.limiter_delay(Duration::from_millis(20)), None);
        assert_eq!(timer.limiter_delay(Duration::from_millis(30)), None);
    }

    #[test]
    fn title_due_once_per_second() {
        let start = Instant::now();
        let mut timer = FrameTimer::starting_at(start, 0);
        assert!(!timer.title_due_at(start + Duration::from_millis(500)));
        assert!(timer.title_due_at(start + Duration::from_millis(1000)));
        assert!(!timer.title_due_at(start + Duration::from_millis(1500)));
        assert!(timer.title_due_at(start + Duration::from_millis(2100)));
    }

    #[test]
    fn title_format() {
        assert_eq!(
            window_title("GeForce", 0, 59.6),
            "GeForce    Max FPS limit: MAX  -  AVRG FPS: 60"
        );
        assert_eq!(
            window_title("GeForce", 120, 118.0),
            "GeForce    Max FPS limit: 120  -  AVRG FPS: 118"
        );
    }
}
