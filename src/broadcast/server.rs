//! Broadcast server
//!
//! Owns the listening socket and the live subscriber set. The accept loop
//! runs independently of and concurrently with broadcast writes.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Mutex};

use super::config::BroadcastConfig;
use super::error::BroadcastError;
use super::subscriber::{monitor_liveness, Subscriber, SubscriberEvent};

/// Fan-out TCP broadcast server
///
/// Binding starts the accept loop immediately; the server moves from
/// Listening to Stopped once [`shutdown`](Self::shutdown) runs. Liveness is
/// tracked per subscriber, not at the server level.
pub struct BroadcastServer {
    inner: Arc<Inner>,
    accept_task: tokio::task::JoinHandle<()>,
}

struct Inner {
    config: BroadcastConfig,
    local_addr: SocketAddr,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
    next_subscriber_id: AtomicU64,
    events_tx: broadcast::Sender<SubscriberEvent>,
    stopped: AtomicBool,
}

impl BroadcastServer {
    /// Bind the listening socket and start accepting subscribers
    ///
    /// With port 0 in the config an ephemeral port is chosen; the bound
    /// address is available from [`local_addr`](Self::local_addr).
    pub async fn bind(config: BroadcastConfig) -> Result<Self, BroadcastError> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "broadcast server listening");

        let (events_tx, _) = broadcast::channel(config.event_capacity);

        let inner = Arc::new(Inner {
            config,
            local_addr,
            subscribers: Mutex::new(HashMap::new()),
            next_subscriber_id: AtomicU64::new(1),
            events_tx,
            stopped: AtomicBool::new(false),
        });

        let accept_task = tokio::spawn(Arc::clone(&inner).accept_loop(listener));

        Ok(Self { inner, accept_task })
    }

    /// The bound listening address
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// The bound TCP port
    pub fn port(&self) -> u16 {
        self.inner.local_addr.port()
    }

    /// Subscribe to new-connection events
    ///
    /// Any number of listeners may subscribe; the accept loop never waits
    /// for them. A lagging listener drops events rather than blocking
    /// accepts.
    pub fn events(&self) -> broadcast::Receiver<SubscriberEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Advisory count of subscribers presumed alive
    pub async fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .await
            .values()
            .filter(|s| s.is_alive())
            .count()
    }

    /// Broadcast a payload to every live subscriber
    ///
    /// Disconnected subscribers are pruned first. In framed mode a
    /// little-endian u16 length prefix is written before the payload; the
    /// 65535-byte cap is enforced before any subscriber is touched. A write
    /// failure marks that subscriber for the next prune and does not stop
    /// delivery to the others.
    ///
    /// Returns the number of subscribers the payload was written to.
    pub async fn write(&self, payload: Bytes) -> Result<usize, BroadcastError> {
        let wire = self.frame_payload(payload)?;

        let mut subscribers = self.inner.subscribers.lock().await;

        // Prune before iterating so removal never races the fan-out below
        let dead: Vec<u64> = subscribers
            .iter()
            .filter(|(_, sub)| !sub.is_alive())
            .map(|(id, _)| *id)
            .collect();
        for id in dead {
            if let Some(sub) = subscribers.remove(&id) {
                tracing::debug!(
                    subscriber_id = id,
                    peer = %sub.peer_addr,
                    session_secs = sub.connected_at.elapsed().as_secs(),
                    "pruned disconnected subscriber"
                );
                sub.release();
            }
        }

        let mut delivered = 0;
        for (id, sub) in subscribers.iter_mut() {
            match sub.writer.write_all(&wire).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        subscriber_id = *id,
                        peer = %sub.peer_addr,
                        error = %e,
                        "subscriber write failed, marking for prune"
                    );
                    sub.mark_dead();
                }
            }
        }

        Ok(delivered)
    }

    /// Stop accepting and forcibly close every subscriber transport
    ///
    /// Idempotent. Writes still queued in a peer's direction may be lost;
    /// delivery is best-effort.
    pub async fn shutdown(&self) {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        self.accept_task.abort();

        let mut subscribers = self.inner.subscribers.lock().await;
        let closing = subscribers.len();
        for (_, mut sub) in subscribers.drain() {
            sub.monitor.abort();
            let _ = sub.writer.shutdown().await;
        }

        tracing::info!(
            addr = %self.inner.local_addr,
            subscribers = closing,
            "broadcast server stopped"
        );
    }

    fn frame_payload(&self, payload: Bytes) -> Result<Bytes, BroadcastError> {
        if !self.inner.config.write_length_prefix {
            return Ok(payload);
        }

        let len = u16::try_from(payload.len()).map_err(|_| BroadcastError::PayloadTooLarge {
            len: payload.len(),
        })?;

        let mut wire = BytesMut::with_capacity(2 + payload.len());
        wire.put_u16_le(len);
        wire.extend_from_slice(&payload);
        Ok(wire.freeze())
    }
}

impl Drop for BroadcastServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

impl Inner {
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.register(socket, peer_addr).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to accept connection");
                }
            }
        }
    }

    async fn register(&self, socket: TcpStream, peer_addr: SocketAddr) {
        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::debug!(peer = %peer_addr, error = %e, "failed to set TCP_NODELAY");
            }
        }

        let mut subscribers = self.subscribers.lock().await;

        if self.config.max_subscribers > 0 && subscribers.len() >= self.config.max_subscribers {
            tracing::warn!(peer = %peer_addr, "connection rejected: subscriber limit reached");
            return; // dropping the socket closes it
        }

        let subscriber_id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let (reader, writer) = socket.into_split();
        let alive = Arc::new(AtomicBool::new(true));
        let monitor = tokio::spawn(monitor_liveness(subscriber_id, reader, Arc::clone(&alive)));

        subscribers.insert(
            subscriber_id,
            Subscriber {
                peer_addr,
                writer,
                alive,
                monitor,
                connected_at: Instant::now(),
            },
        );
        drop(subscribers);

        tracing::debug!(
            subscriber_id = subscriber_id,
            peer = %peer_addr,
            "subscriber connected"
        );

        // Fire-and-forget; send only fails when no listener is subscribed
        let _ = self.events_tx.send(SubscriberEvent {
            subscriber_id,
            peer_addr,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;
    use tokio::time::timeout;
    use tokio_test::assert_ok;

    use crate::broadcast::MAX_FRAMED_PAYLOAD;

    use super::*;

    async fn bind_local(config: BroadcastConfig) -> BroadcastServer {
        let config = config.bind("127.0.0.1:0".parse().unwrap());
        BroadcastServer::bind(config).await.unwrap()
    }

    async fn wait_for_subscribers(server: &BroadcastServer, count: usize) {
        for _ in 0..200 {
            if server.subscriber_count().await == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {} subscribers, found {}",
            count,
            server.subscriber_count().await
        );
    }

    #[tokio::test]
    async fn test_connection_fires_event() {
        let server = bind_local(BroadcastConfig::default()).await;
        let mut events = server.events();

        let client = TcpStream::connect(server.local_addr()).await.unwrap();

        let event = timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("no connection event within timeout")
            .unwrap();
        assert_eq!(event.peer_addr, client.local_addr().unwrap());
        assert_eq!(server.subscriber_count().await, 1);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_raw_write_reaches_subscriber() {
        let server = bind_local(BroadcastConfig::default()).await;
        let mut events = server.events();

        let mut client = TcpStream::connect(server.local_addr()).await.unwrap();
        events.recv().await.unwrap();

        let delivered = server.write(Bytes::from_static(b"hello")).await.unwrap();
        assert_eq!(delivered, 1);

        let mut buf = [0u8; 5];
        timeout(Duration::from_secs(2), client.read_exact(&mut buf))
            .await
            .expect("payload not received within timeout")
            .unwrap();
        assert_eq!(&buf, b"hello");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_framed_write_prefixes_length() {
        let server = bind_local(BroadcastConfig::default().write_length_prefix(true)).await;
        let mut events = server.events();

        let mut client = TcpStream::connect(server.local_addr()).await.unwrap();
        events.recv().await.unwrap();

        let payload = Bytes::from_static(b"This is supposed to be image data.");
        assert_ok!(server.write(payload.clone()).await);

        let mut len_buf = [0u8; 2];
        client.read_exact(&mut len_buf).await.unwrap();
        assert_eq!(u16::from_le_bytes(len_buf) as usize, payload.len());

        let mut read_back = vec![0u8; payload.len()];
        client.read_exact(&mut read_back).await.unwrap();
        assert_eq!(read_back, payload);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_disconnected_subscriber_is_pruned() {
        let server = bind_local(BroadcastConfig::default()).await;
        let mut events = server.events();

        let mut staying = TcpStream::connect(server.local_addr()).await.unwrap();
        events.recv().await.unwrap();
        let leaving = TcpStream::connect(server.local_addr()).await.unwrap();
        events.recv().await.unwrap();
        wait_for_subscribers(&server, 2).await;

        drop(leaving);
        // The liveness monitor notices EOF and clears the flag
        wait_for_subscribers(&server, 1).await;

        let delivered = server.write(Bytes::from_static(b"ping")).await.unwrap();
        assert_eq!(delivered, 1);

        let mut buf = [0u8; 4];
        staying.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_framed_payload_too_large() {
        let server = bind_local(BroadcastConfig::default().write_length_prefix(true)).await;

        let oversized = Bytes::from(vec![0u8; MAX_FRAMED_PAYLOAD + 1]);
        let err = server.write(oversized).await.unwrap_err();
        assert!(matches!(
            err,
            BroadcastError::PayloadTooLarge {
                len
            } if len == MAX_FRAMED_PAYLOAD + 1
        ));

        // Unframed mode has no cap
        let raw_server = bind_local(BroadcastConfig::default()).await;
        let oversized = Bytes::from(vec![0u8; MAX_FRAMED_PAYLOAD + 1]);
        assert_ok!(raw_server.write(oversized).await);

        server.shutdown().await;
        raw_server.shutdown().await;
    }

    #[tokio::test]
    async fn test_subscriber_limit_rejects_excess() {
        let server = bind_local(BroadcastConfig::default().max_subscribers(1)).await;
        let mut events = server.events();

        let _first = TcpStream::connect(server.local_addr()).await.unwrap();
        events.recv().await.unwrap();

        let mut second = TcpStream::connect(server.local_addr()).await.unwrap();
        let mut buf = [0u8; 1];
        let n = timeout(Duration::from_secs(2), second.read(&mut buf))
            .await
            .expect("rejected connection was not closed")
            .unwrap();
        assert_eq!(n, 0, "rejected connection should see EOF");
        assert_eq!(server.subscriber_count().await, 1);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_subscribers() {
        let server = bind_local(BroadcastConfig::default()).await;
        let mut events = server.events();

        let mut client = TcpStream::connect(server.local_addr()).await.unwrap();
        events.recv().await.unwrap();

        server.shutdown().await;
        server.shutdown().await; // idempotent

        let n = timeout(Duration::from_secs(2), client.read(&mut [0u8; 1]))
            .await
            .expect("subscriber not closed by shutdown")
            .unwrap();
        assert_eq!(n, 0);
        assert_eq!(server.subscriber_count().await, 0);
    }
}
