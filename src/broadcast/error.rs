//! Broadcast error types

/// Error type for broadcast operations
#[derive(Debug)]
pub enum BroadcastError {
    /// Binding or configuring the listening socket failed
    Io(std::io::Error),
    /// Payload exceeds the framed-mode length prefix (65535 bytes)
    PayloadTooLarge { len: usize },
}

impl std::fmt::Display for BroadcastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BroadcastError::Io(e) => write!(f, "broadcast I/O error: {}", e),
            BroadcastError::PayloadTooLarge { len } => {
                write!(
                    f,
                    "payload of {} bytes exceeds the framed-mode maximum of {}",
                    len,
                    super::MAX_FRAMED_PAYLOAD
                )
            }
        }
    }
}

impl std::error::Error for BroadcastError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BroadcastError::Io(e) => Some(e),
            BroadcastError::PayloadTooLarge { .. } => None,
        }
    }
}

impl From<std::io::Error> for BroadcastError {
    fn from(e: std::io::Error) -> Self {
        BroadcastError::Io(e)
    }
}
