//! Pipeline orchestration
//!
//! The [`MotionPipeline`] owns the queue, the detector, the previous-frame
//! reference, and the broadcast server, and drives them from two independent
//! periodic triggers:
//!
//! - the **acquisition trigger** (coarse interval) captures a frame from the
//!   [`FrameSource`](crate::source::FrameSource) and enqueues it;
//! - the **processing trigger** (fine interval) pops one frame, compares it
//!   against the retained previous frame, and broadcasts the encoded frame
//!   when the changed-pixel fraction reaches the detection minimum.
//!
//! Each trigger's cycle runs to completion before that trigger fires again,
//! but the two triggers run concurrently with each other and with the accept
//! loop. Shutdown is cooperative: triggers stop, in-flight cycles finish,
//! queued frames are released, and the broadcaster is torn down last.

pub mod config;
pub mod stats;

pub use config::PipelineConfig;
pub use stats::{PipelineStats, StatsSnapshot};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::time::{timeout, MissedTickBehavior};

use crate::broadcast::BroadcastServer;
use crate::codec::FrameCodec;
use crate::detect::MotionDetector;
use crate::error::Result;
use crate::frame::{Frame, FrameQueue};
use crate::source::FrameSource;

/// Frame pipeline: acquisition, detection, broadcast
///
/// Constructed once at process start; there is no ambient global state. The
/// broadcast server is owned by the pipeline and shut down with it.
pub struct MotionPipeline<S, C> {
    config: PipelineConfig,
    source: Arc<S>,
    codec: Arc<C>,
    detector: MotionDetector,
    queue: Arc<FrameQueue>,
    capture_guard: Arc<Mutex<()>>,
    server: Arc<BroadcastServer>,
    stats: Arc<PipelineStats>,
}

impl<S, C> MotionPipeline<S, C>
where
    S: FrameSource,
    C: FrameCodec + 'static,
{
    /// Wire a pipeline together from its collaborators
    pub fn new(config: PipelineConfig, source: S, codec: C, server: BroadcastServer) -> Self {
        let detector = MotionDetector::new(config.movement_threshold, config.detection_percent_min);
        let queue = Arc::new(FrameQueue::with_capacity(config.queue_capacity));

        Self {
            config,
            source: Arc::new(source),
            codec: Arc::new(codec),
            detector,
            queue,
            capture_guard: Arc::new(Mutex::new(())),
            server: Arc::new(server),
            stats: Arc::new(PipelineStats::new()),
        }
    }

    /// The broadcast server this pipeline feeds
    pub fn server(&self) -> &BroadcastServer {
        &self.server
    }

    /// The detector parameters in effect
    pub fn detector(&self) -> &MotionDetector {
        &self.detector
    }

    /// Advisory queue depth
    pub fn queued_frames(&self) -> usize {
        self.queue.len()
    }

    /// Point-in-time pipeline counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Run the pipeline until shut down externally
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the pipeline until the shutdown future resolves or a
    /// configuration fault surfaces
    ///
    /// Capture failures are logged and skipped; detector, codec, and framing
    /// errors indicate configuration bugs and abort the run. Either way the
    /// teardown order is the same: triggers stop, in-flight cycles finish,
    /// queued frames are released, the broadcaster shuts down.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (stop_tx, stop_rx) = watch::channel(false);

        let acquire_task = tokio::spawn(Self::acquire_loop(
            Arc::clone(&self.source),
            Arc::clone(&self.queue),
            Arc::clone(&self.capture_guard),
            self.config.acquire_interval,
            self.config.capture_timeout,
            Arc::clone(&self.stats),
            stop_rx.clone(),
        ));

        let mut process_task = tokio::spawn(Self::process_loop(
            Arc::clone(&self.queue),
            self.detector,
            Arc::clone(&self.codec),
            Arc::clone(&self.server),
            self.config.process_interval,
            Arc::clone(&self.stats),
            stop_rx,
        ));

        let early = tokio::select! {
            _ = shutdown => {
                tracing::info!("shutdown requested, stopping triggers");
                None
            }
            joined = &mut process_task => Some(joined),
        };

        // Stop both triggers; in-flight cycles run to completion
        let _ = stop_tx.send(true);
        let _ = acquire_task.await;
        let result = match early {
            Some(joined) => Self::flatten_join(joined),
            None => Self::flatten_join(process_task.await),
        };

        let drained = self.queue.drain();
        if !drained.is_empty() {
            tracing::debug!(frames = drained.len(), "released queued frames at shutdown");
        }

        self.server.shutdown().await;

        result
    }

    fn flatten_join(joined: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
        match joined {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "processing task aborted");
                Ok(())
            }
        }
    }

    async fn acquire_loop(
        source: Arc<S>,
        queue: Arc<FrameQueue>,
        guard: Arc<Mutex<()>>,
        interval: Duration,
        capture_timeout: Duration,
        stats: Arc<PipelineStats>,
        mut stop: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = stop.changed() => break,
            }

            // At most one capture in flight; a trigger that finds the guard
            // held abandons its cycle instead of queueing a second capture.
            // In-process only: device-level exclusivity against other
            // processes is the FrameSource's concern.
            let _guard = match guard.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    tracing::debug!("capture already in flight, skipping cycle");
                    continue;
                }
            };

            let frame = match timeout(capture_timeout, source.capture()).await {
                Ok(Ok(frame)) => frame,
                Ok(Err(e)) => {
                    stats.record_capture_failure();
                    tracing::warn!(error = %e, "frame capture failed, skipping cycle");
                    continue;
                }
                Err(_) => {
                    stats.record_capture_failure();
                    tracing::warn!(
                        timeout_ms = capture_timeout.as_millis() as u64,
                        "frame capture timed out, skipping cycle"
                    );
                    continue;
                }
            };

            stats.record_captured();
            if let Some(dropped) = queue.push(frame) {
                stats.record_dropped();
                tracing::warn!(
                    dropped_captured_at = ?dropped.captured_at,
                    "frame queue full, dropped oldest frame"
                );
            }
        }
    }

    async fn process_loop(
        queue: Arc<FrameQueue>,
        detector: MotionDetector,
        codec: Arc<C>,
        server: Arc<BroadcastServer>,
        interval: Duration,
        stats: Arc<PipelineStats>,
        mut stop: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Exactly one retained frame, empty until the first cycle
        let mut previous: Option<Frame> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = stop.changed() => break,
            }

            let Some(current) = queue.try_pop() else {
                continue;
            };

            let prev = match previous.take() {
                Some(prev) => prev,
                None => {
                    // The very first frame has nothing to compare against
                    tracing::debug!(
                        captured_at = ?current.captured_at,
                        "retained first frame as reference"
                    );
                    previous = Some(current);
                    continue;
                }
            };

            let percent = match detector.movement_percent(&prev.pixels, &current.pixels) {
                Ok(percent) => percent,
                Err(e) => {
                    tracing::error!(error = %e, "frame comparison failed");
                    return Err(e.into());
                }
            };
            stats.record_processed();
            tracing::info!(
                captured_at = ?current.captured_at,
                movement_percent = percent * 100.0,
                "frame processed"
            );

            if percent >= detector.detection_percent_min() {
                let payload = match codec.encode(&current) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!(error = %e, "frame encoding failed");
                        return Err(e.into());
                    }
                };

                match server.write(payload).await {
                    Ok(delivered) => {
                        stats.record_broadcast();
                        tracing::info!(
                            delivered = delivered,
                            movement_percent = percent * 100.0,
                            "movement detected, frame broadcast"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "broadcast write failed");
                        return Err(e.into());
                    }
                }
            }

            // Replacement is unconditional so drift never exceeds one interval
            previous = Some(current);
        }

        Ok(())
    }
}
