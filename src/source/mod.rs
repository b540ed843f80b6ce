//! Frame acquisition seam
//!
//! The pipeline does not know how frames are produced; it drives any
//! [`FrameSource`] on its acquisition trigger. Implementations wrap a real
//! camera stack (V4L2, libcamera, a vendor SDK) or a synthetic generator for
//! tests and demos.

use std::future::Future;

use crate::frame::Frame;

/// Error type for frame acquisition
///
/// All variants are recovered locally by the pipeline: the failed cycle is
/// skipped and the next scheduled trigger retries. No retry storm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The device did not produce a frame within the acquisition window
    Timeout,
    /// The device is held by another consumer
    Busy,
    /// Device-level failure, with driver detail
    Device(String),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::Timeout => write!(f, "frame capture timed out"),
            CaptureError::Busy => write!(f, "capture device is busy"),
            CaptureError::Device(detail) => write!(f, "capture device error: {}", detail),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Produces decoded frames on demand
///
/// `capture` is awaited under the pipeline's acquisition guard and bounded
/// timeout; only one capture is in flight per pipeline. If the underlying
/// device can be contended by other processes, the implementation must hold
/// the device-level lock itself (e.g. an exclusive device handle).
pub trait FrameSource: Send + Sync + 'static {
    /// Capture a single decoded frame
    fn capture(&self) -> impl Future<Output = Result<Frame, CaptureError>> + Send;
}
