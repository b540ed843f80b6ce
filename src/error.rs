//! Crate-level error type
//!
//! Each subsystem defines its own error enum; this type collects them for
//! callers that drive the whole pipeline.

use crate::broadcast::BroadcastError;
use crate::codec::CodecError;
use crate::detect::DetectError;
use crate::discovery::DiscoveryError;
use crate::source::CaptureError;

/// Convenience result type for pipeline-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for pipeline-level operations
#[derive(Debug)]
pub enum Error {
    /// I/O error outside any subsystem
    Io(std::io::Error),
    /// Frame comparison failed
    Detect(DetectError),
    /// Frame capture failed
    Capture(CaptureError),
    /// Frame encoding failed
    Codec(CodecError),
    /// Broadcast subsystem error
    Broadcast(BroadcastError),
    /// Port discovery file error
    Discovery(DiscoveryError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Detect(e) => write!(f, "{}", e),
            Error::Capture(e) => write!(f, "{}", e),
            Error::Codec(e) => write!(f, "{}", e),
            Error::Broadcast(e) => write!(f, "{}", e),
            Error::Discovery(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Detect(e) => Some(e),
            Error::Capture(e) => Some(e),
            Error::Codec(e) => Some(e),
            Error::Broadcast(e) => Some(e),
            Error::Discovery(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<DetectError> for Error {
    fn from(e: DetectError) -> Self {
        Error::Detect(e)
    }
}

impl From<CaptureError> for Error {
    fn from(e: CaptureError) -> Self {
        Error::Capture(e)
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Error::Codec(e)
    }
}

impl From<BroadcastError> for Error {
    fn from(e: BroadcastError) -> Self {
        Error::Broadcast(e)
    }
}

impl From<DiscoveryError> for Error {
    fn from(e: DiscoveryError) -> Self {
        Error::Discovery(e)
    }
}
