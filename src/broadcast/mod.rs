//! Multi-client TCP broadcast
//!
//! The server owns a listening socket, a mutex-guarded set of live
//! subscribers, and the accept/prune/fan-out logic. Broadcast is a live tap,
//! not replay: a subscriber that connects mid-broadcast receives the next
//! payload, never a retroactive one.
//!
//! # Architecture
//!
//! ```text
//!                       BroadcastServer
//!                 ┌───────────────────────────┐
//!                 │ accept loop (spawned)     │──► SubscriberEvent fan-out
//!                 │ subscribers: Mutex<       │     (tokio broadcast channel)
//!                 │   HashMap<u64, Subscriber>│
//!                 │ >                         │
//!                 └────────────┬──────────────┘
//!                              │ write(payload)
//!            ┌─────────────────┼─────────────────┐
//!            ▼                 ▼                 ▼
//!       [Subscriber]      [Subscriber]      [Subscriber]
//!       write half        write half        write half
//!       (liveness         (liveness         (liveness
//!        monitor owns      monitor owns      monitor owns
//!        the read half)    the read half)    the read half)
//! ```
//!
//! # Wire contract
//!
//! In framed mode every payload is preceded by a **little-endian** `u16`
//! length, capping payloads at 65535 bytes; larger payloads are a
//! configuration error and are rejected before any subscriber is written to.
//! In unframed mode raw payload bytes are written directly and the
//! subscriber must know payload boundaries out-of-band.
//!
//! Delivery is best-effort: a write failure to one subscriber marks it for
//! pruning and never prevents delivery to the others, and writes still
//! queued at shutdown may be lost.

pub mod config;
pub mod error;
pub mod server;
pub mod subscriber;

pub use config::BroadcastConfig;
pub use error::BroadcastError;
pub use server::BroadcastServer;
pub use subscriber::SubscriberEvent;

/// Largest payload expressible in framed mode
pub const MAX_FRAMED_PAYLOAD: usize = u16::MAX as usize;
