//! Pipeline configuration

use std::time::Duration;

use crate::detect::{DEFAULT_DETECTION_PERCENT_MIN, DEFAULT_MOVEMENT_THRESHOLD};
use crate::frame::queue::DEFAULT_QUEUE_CAPACITY;

/// Pipeline configuration options
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Interval between acquisition trigger firings
    pub acquire_interval: Duration,

    /// Interval between processing trigger firings
    pub process_interval: Duration,

    /// Bound on a single capture call
    pub capture_timeout: Duration,

    /// Frame queue bound (oldest frame dropped on overflow)
    pub queue_capacity: usize,

    /// Per-channel delta below which a pixel change is noise
    pub movement_threshold: u8,

    /// Minimum changed-pixel fraction to broadcast a frame
    pub detection_percent_min: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            acquire_interval: Duration::from_secs(5),
            process_interval: Duration::from_millis(500),
            capture_timeout: Duration::from_millis(500),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            movement_threshold: DEFAULT_MOVEMENT_THRESHOLD,
            detection_percent_min: DEFAULT_DETECTION_PERCENT_MIN,
        }
    }
}

impl PipelineConfig {
    /// Set the acquisition interval
    pub fn acquire_interval(mut self, interval: Duration) -> Self {
        self.acquire_interval = interval;
        self
    }

    /// Set the processing interval
    pub fn process_interval(mut self, interval: Duration) -> Self {
        self.process_interval = interval;
        self
    }

    /// Set the capture timeout
    pub fn capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout = timeout;
        self
    }

    /// Set the frame queue bound
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the per-channel movement threshold
    pub fn movement_threshold(mut self, threshold: u8) -> Self {
        self.movement_threshold = threshold;
        self
    }

    /// Set the detection minimum; clamped into `[0, 1]` at detector
    /// construction
    pub fn detection_percent_min(mut self, min: f64) -> Self {
        self.detection_percent_min = min;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();

        assert_eq!(config.acquire_interval, Duration::from_secs(5));
        assert_eq!(config.process_interval, Duration::from_millis(500));
        assert_eq!(config.capture_timeout, Duration::from_millis(500));
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.movement_threshold, DEFAULT_MOVEMENT_THRESHOLD);
        assert_eq!(config.detection_percent_min, DEFAULT_DETECTION_PERCENT_MIN);
    }

    #[test]
    fn test_builder_chaining() {
        let config = PipelineConfig::default()
            .acquire_interval(Duration::from_secs(1))
            .process_interval(Duration::from_millis(100))
            .capture_timeout(Duration::from_millis(250))
            .queue_capacity(8)
            .movement_threshold(32)
            .detection_percent_min(0.05);

        assert_eq!(config.acquire_interval, Duration::from_secs(1));
        assert_eq!(config.process_interval, Duration::from_millis(100));
        assert_eq!(config.capture_timeout, Duration::from_millis(250));
        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.movement_threshold, 32);
        assert_eq!(config.detection_percent_min, 0.05);
    }
}
