//! Frame encoding seam
//!
//! The broadcast subsystem moves opaque bytes; a [`FrameCodec`] turns a
//! decoded frame into those bytes. [`PngCodec`] is the stock implementation,
//! matching the still-image format the wire protocol was designed around.

use bytes::Bytes;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::frame::Frame;

/// Error type for frame encoding
#[derive(Debug)]
pub enum CodecError {
    /// The underlying encoder rejected the frame
    Encode(image::ImageError),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Encode(e) => write!(f, "frame encoding failed: {}", e),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Encode(e) => Some(e),
        }
    }
}

/// Encodes frames into an opaque byte-stream payload
pub trait FrameCodec: Send + Sync {
    fn encode(&self, frame: &Frame) -> Result<Bytes, CodecError>;
}

/// PNG encoder backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct PngCodec;

impl FrameCodec for PngCodec {
    fn encode(&self, frame: &Frame) -> Result<Bytes, CodecError> {
        let (width, height) = frame.dimensions();
        let raw = frame.pixels.to_rgb_bytes();

        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(&raw, width, height, ExtendedColorType::Rgb8)
            .map_err(CodecError::Encode)?;

        Ok(Bytes::from(out))
    }
}
