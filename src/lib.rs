//! Motion detection and frame broadcast for fixed-position camera feeds.
//!
//! A single-node monitoring agent core: frames captured from a camera are
//! queued, compared against the previous frame with a cheap per-pixel delta
//! test, and broadcast to connected TCP subscribers when enough pixels
//! changed.
//!
//! # Architecture
//!
//! ```text
//!   [FrameSource]        [MotionPipeline]              [BroadcastServer]
//!   capture() ──► FrameQueue ──► MotionDetector ──► write() ──► TCP fan-out
//!      ▲               │              │                              │
//!   acquisition     try_pop()    previous-frame              Subscriber set
//!   trigger (5s)    trigger      reference                  (accept loop +
//!                   (500ms)                                  liveness prune)
//! ```
//!
//! The acquisition and processing triggers run on independent timers; the
//! queue decouples a slow, possibly-blocking capture from CPU-only
//! processing. Broadcast is a live tap: a subscriber that connects
//! mid-stream receives the next motion event, never a replay.
//!
//! # Wire protocol
//!
//! Payloads are opaque encoded frames (PNG by default). In framed mode each
//! payload is preceded by a little-endian `u16` length; in unframed mode raw
//! bytes are written and the subscriber must know payload boundaries
//! out-of-band. See [`broadcast`] for details.

pub mod broadcast;
pub mod codec;
pub mod detect;
pub mod discovery;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod source;

pub use broadcast::{BroadcastConfig, BroadcastError, BroadcastServer, SubscriberEvent};
pub use codec::{CodecError, FrameCodec, PngCodec};
pub use detect::{DetectError, MotionDetector};
pub use discovery::{DiscoveryError, DiscoveryFile};
pub use error::{Error, Result};
pub use frame::{Frame, FrameQueue, PixelGrid, Rgb};
pub use pipeline::{MotionPipeline, PipelineConfig, PipelineStats, StatsSnapshot};
pub use source::{CaptureError, FrameSource};
