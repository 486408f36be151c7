use std::time::{Duration, Instant};

/// Frame timing with FPS calculation
#[derive(Debug)]
pub struct FrameTiming {
    /// Process start, for shader time uniforms
    start: Instant,
    /// Last frame timestamp
    last_frame: Instant,
    /// Last time the frame rate was logged
    last_report: Instant,
    /// Seconds between FPS log lines (`Duration::ZERO` = never)
    report_interval: Duration,
    /// Smoothed FPS using exponential moving average
    smoothed_fps: f32,
    /// Smoothing factor (lower = smoother, 0.0-1.0)
    smoothing: f32,
}

impl FrameTiming {
    /// Create a new frame timer that logs the frame rate every
    /// `report_interval` seconds (0 = never).
    #[must_use]
    pub fn new(report_interval: f32) -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            last_report: now,
            report_interval: Duration::try_from_secs_f32(report_interval)
                .unwrap_or(Duration::ZERO),
            smoothed_fps: 60.0, // Start with reasonable default
            smoothing: 0.05,    // 5% new value, 95% old value
        }
    }

    /// Seconds since the timer was created.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }

    /// Call after rendering to update timing.
    pub fn end_frame(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.last_frame = now;

        let frame_time = elapsed.as_secs_f32();
        if frame_time > 0.0 {
            let instant_fps = 1.0 / frame_time;
            self.smoothed_fps = self.smoothed_fps * (1.0 - self.smoothing)
                + instant_fps * self.smoothing;
        }

        if !self.report_interval.is_zero()
            && now.duration_since(self.last_report) >= self.report_interval
        {
            self.last_report = now;
            log::info!("{:.1} fps", self.smoothed_fps);
        }
    }

    /// Get the current FPS (smoothed)
    #[must_use]
    pub const fn fps(&self) -> f32 {
        self.smoothed_fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_monotonic() {
        let timing = FrameTiming::new(0.0);
        let a = timing.elapsed();
        std::thread::sleep(Duration::from_millis(2));
        assert!(timing.elapsed() > a);
    }

    #[test]
    fn fps_moves_toward_frame_rate() {
        let mut timing = FrameTiming::new(0.0);
        std::thread::sleep(Duration::from_millis(50));
        timing.end_frame();
        // One 50 ms frame pulls the 60 fps seed down.
        assert!(timing.fps() < 60.0);
    }

    #[test]
    fn negative_interval_disables_reporting() {
        let timing = FrameTiming::new(-1.0);
        assert!(timing.report_interval.is_zero());
    }
}
