//! Frame timing for renderers

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Frames averaged over
const WINDOW: usize = 120;

/// Tracks render performance over a sliding window of frames
pub struct RenderMetrics {
    frame_times: VecDeque<Duration>,
    frame_start: Instant,
    pub frames: u64,
    pub entity_count: usize,
}

impl Default for RenderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderMetrics {
    pub fn new() -> Self {
        Self {
            frame_times: VecDeque::with_capacity(WINDOW),
            frame_start: Instant::now(),
            frames: 0,
            entity_count: 0,
        }
    }

    pub fn begin_frame(&mut self) {
        self.frame_start = Instant::now();
    }

    pub fn end_frame(&mut self, entity_count: usize) {
        self.record(self.frame_start.elapsed(), entity_count);
    }

    /// Record a frame that took `elapsed`
    pub fn record(&mut self, elapsed: Duration, entity_count: usize) {
        self.frames += 1;
        self.entity_count = entity_count;
        self.frame_times.push_back(elapsed);
        if self.frame_times.len() > WINDOW {
            self.frame_times.pop_front();
        }
    }

    /// Average render time in milliseconds over the window
    pub fn avg_frame_time_ms(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        let sum: Duration = self.frame_times.iter().sum();
        sum.as_secs_f32() * 1000.0 / self.frame_times.len() as f32
    }

    pub fn max_frame_time_ms(&self) -> f32 {
        self.frame_times
            .iter()
            .max()
            .map(|d| d.as_secs_f32() * 1000.0)
            .unwrap_or(0.0)
    }

    pub fn last_frame_time_ms(&self) -> f32 {
        self.frame_times
            .back()
            .map(|d| d.as_secs_f32() * 1000.0)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_and_max() {
        let mut metrics = RenderMetrics::new();
        metrics.record(Duration::from_millis(2), 3);
        metrics.record(Duration::from_millis(4), 5);

        assert!((metrics.avg_frame_time_ms() - 3.0).abs() < 0.01);
        assert!((metrics.max_frame_time_ms() - 4.0).abs() < 0.01);
        assert!((metrics.last_frame_time_ms() - 4.0).abs() < 0.01);
        assert_eq!(metrics.frames, 2);
        assert_eq!(metrics.entity_count, 5);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut metrics = RenderMetrics::new();
        for _ in 0..WINDOW {
            metrics.record(Duration::from_millis(10), 0);
        }
        for _ in 0..WINDOW {
            metrics.record(Duration::from_millis(1), 0);
        }
        assert!((metrics.avg_frame_time_ms() - 1.0).abs() < 0.01);
        assert_eq!(metrics.frames, 2 * WINDOW as u64);
    }
}
