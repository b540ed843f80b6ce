//! Motion detection
//!
//! Pure functions over two same-sized pixel grids, no state beyond the two
//! tuning parameters and no I/O. The algorithm is a per-channel absolute
//! delta with threshold suppression followed by a changed-pixel percentage
//! test. It is O(pixels) with only integer subtraction and comparison, cheap
//! enough to run every processing tick on embedded hardware.
//!
//! The channel threshold suppresses sensor noise and lighting flicker; the
//! percentage test suppresses single-pixel false positives.

use crate::frame::{PixelGrid, Rgb};

/// Default per-channel delta below which a pixel change is treated as noise
pub const DEFAULT_MOVEMENT_THRESHOLD: u8 = 64;

/// Default minimum fraction of changed pixels to report movement
pub const DEFAULT_DETECTION_PERCENT_MIN: f64 = 0.1;

/// Error type for frame comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    /// The two frames have different dimensions
    ///
    /// A configuration bug, not a transient condition: a fixed-position
    /// camera produces a fixed capture size.
    DimensionMismatch {
        prev: (u32, u32),
        curr: (u32, u32),
    },
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectError::DimensionMismatch { prev, curr } => write!(
                f,
                "frames must be the same size: {}x{} vs {}x{}",
                prev.0, prev.1, curr.0, curr.1
            ),
        }
    }
}

impl std::error::Error for DetectError {}

/// Threshold-filtered per-pixel movement detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionDetector {
    movement_threshold: u8,
    detection_percent_min: f64,
}

impl MotionDetector {
    /// Create a detector with the given tuning parameters
    ///
    /// `movement_threshold` is a full-range byte and needs no validation.
    /// `detection_percent_min` is clamped into `[0, 1]`; a NaN falls back to
    /// the default.
    pub fn new(movement_threshold: u8, detection_percent_min: f64) -> Self {
        let detection_percent_min = if detection_percent_min.is_nan() {
            DEFAULT_DETECTION_PERCENT_MIN
        } else {
            detection_percent_min.clamp(0.0, 1.0)
        };

        Self {
            movement_threshold,
            detection_percent_min,
        }
    }

    pub fn movement_threshold(&self) -> u8 {
        self.movement_threshold
    }

    pub fn detection_percent_min(&self) -> f64 {
        self.detection_percent_min
    }

    pub fn set_movement_threshold(&mut self, threshold: u8) {
        self.movement_threshold = threshold;
    }

    /// Update the detection minimum from untrusted input
    ///
    /// Values outside `[0, 1]` (and NaN) are silently ignored and the
    /// previous value is retained.
    pub fn set_detection_percent_min(&mut self, value: f64) {
        if (0.0..=1.0).contains(&value) {
            self.detection_percent_min = value;
        }
    }

    /// Compute the suppressed per-pixel delta grid of two frames
    ///
    /// Each channel is the absolute difference of the corresponding input
    /// channels; a channel delta strictly below the movement threshold is
    /// zeroed. A fully black output pixel means "no change".
    pub fn delta_grid(&self, prev: &PixelGrid, curr: &PixelGrid) -> Result<PixelGrid, DetectError> {
        if prev.dimensions() != curr.dimensions() {
            return Err(DetectError::DimensionMismatch {
                prev: prev.dimensions(),
                curr: curr.dimensions(),
            });
        }

        let threshold = self.movement_threshold;
        let suppress = |delta: u8| if delta < threshold { 0 } else { delta };

        let pixels = prev
            .pixels()
            .iter()
            .zip(curr.pixels())
            .map(|(p, c)| {
                Rgb::new(
                    suppress(p.r.abs_diff(c.r)),
                    suppress(p.g.abs_diff(c.g)),
                    suppress(p.b.abs_diff(c.b)),
                )
            })
            .collect();

        Ok(PixelGrid::from_raw(curr.width(), curr.height(), pixels))
    }

    /// Fraction of non-black pixels in a delta grid, in `[0, 1]`
    pub fn grid_movement_percent(grid: &PixelGrid) -> f64 {
        let total = grid.pixel_count();
        if total == 0 {
            return 0.0;
        }

        let moving = grid.pixels().iter().filter(|px| !px.is_black()).count();
        moving as f64 / total as f64
    }

    /// Fraction of pixels that changed between two frames
    pub fn movement_percent(&self, prev: &PixelGrid, curr: &PixelGrid) -> Result<f64, DetectError> {
        Ok(Self::grid_movement_percent(&self.delta_grid(prev, curr)?))
    }

    /// True if the changed-pixel fraction reaches the detection minimum
    ///
    /// The boundary is inclusive: a fraction exactly equal to the minimum
    /// reports movement.
    pub fn has_movement(&self, prev: &PixelGrid, curr: &PixelGrid) -> Result<bool, DetectError> {
        Ok(self.movement_percent(prev, curr)? >= self.detection_percent_min)
    }
}

impl Default for MotionDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MOVEMENT_THRESHOLD, DEFAULT_DETECTION_PERCENT_MIN)
    }
}
