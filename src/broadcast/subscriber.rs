//! Subscriber state and connection events

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::io::AsyncReadExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinHandle;

/// Fired once per newly accepted connection
///
/// Cheap to clone; delivered fire-and-forget on the server's event channel.
/// Delivery order relative to a concurrent broadcast write is not
/// guaranteed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberEvent {
    /// Server-assigned subscriber id
    pub subscriber_id: u64,
    /// Remote address of the connection
    pub peer_addr: SocketAddr,
}

/// A live subscriber connection
///
/// The server's subscriber map owns these exclusively. The write half stays
/// here for fan-out; the read half is owned by the liveness monitor task,
/// which flips `alive` when the peer closes the connection.
pub(super) struct Subscriber {
    pub(super) peer_addr: SocketAddr,
    pub(super) writer: OwnedWriteHalf,
    pub(super) alive: Arc<AtomicBool>,
    pub(super) monitor: JoinHandle<()>,
    pub(super) connected_at: Instant,
}

impl Subscriber {
    pub(super) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub(super) fn mark_dead(&self) {
        self.alive.store(false, Ordering::Release);
    }

    /// Release without closing the transport gracefully; used when pruning
    /// an already-disconnected subscriber.
    pub(super) fn release(self) {
        self.monitor.abort();
    }
}

/// Watch the read half for EOF or error and mark the subscriber dead
///
/// Subscribers are receive-only; any inbound bytes are drained and ignored.
pub(super) async fn monitor_liveness(
    subscriber_id: u64,
    mut reader: OwnedReadHalf,
    alive: Arc<AtomicBool>,
) {
    let mut buf = [0u8; 512];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
    }

    alive.store(false, Ordering::Release);
    tracing::debug!(subscriber_id = subscriber_id, "subscriber transport closed");
}
