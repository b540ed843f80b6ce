//! End-to-end pipeline tests
//!
//! Drives the full acquire -> detect -> broadcast path with a scripted frame
//! source and a real TCP subscriber.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use motion_relay::{
    BroadcastConfig, BroadcastServer, CaptureError, DetectError, Error, Frame, FrameCodec,
    FrameSource, MotionPipeline, PipelineConfig, PixelGrid, PngCodec, Rgb,
};

/// Replays a fixed frame sequence, then reports the device busy
struct ScriptedSource {
    frames: Mutex<VecDeque<Frame>>,
}

impl ScriptedSource {
    fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: Mutex::new(frames.into()),
        }
    }
}

impl FrameSource for ScriptedSource {
    fn capture(&self) -> impl Future<Output = Result<Frame, CaptureError>> + Send {
        let next = self.frames.lock().unwrap().pop_front();
        async move { next.ok_or(CaptureError::Busy) }
    }
}

fn fast_config() -> PipelineConfig {
    PipelineConfig::default()
        .acquire_interval(Duration::from_millis(20))
        .process_interval(Duration::from_millis(10))
        .capture_timeout(Duration::from_millis(100))
}

async fn bind_framed() -> BroadcastServer {
    let config = BroadcastConfig::default()
        .bind("127.0.0.1:0".parse().unwrap())
        .write_length_prefix(true);
    BroadcastServer::bind(config).await.unwrap()
}

#[tokio::test]
async fn pipeline_broadcasts_exactly_one_motion_event() {
    // Frame A is all black; frame B changes 4 of 64 pixels beyond threshold
    let frame_a = Frame::new(PixelGrid::new(8, 8));
    let mut grid_b = PixelGrid::new(8, 8);
    for i in 0..4 {
        grid_b.set_pixel(i, i, Rgb::new(255, 255, 255));
    }
    let frame_b = Frame::new(grid_b.clone());

    let server = bind_framed().await;
    let mut events = server.events();
    let addr = server.local_addr();

    let config = fast_config()
        .movement_threshold(64)
        .detection_percent_min(3.0 / 64.0);
    let source = ScriptedSource::new(vec![frame_a, frame_b]);
    let pipeline = MotionPipeline::new(config, source, PngCodec, server);

    let mut client = TcpStream::connect(addr).await.unwrap();
    timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("subscriber not registered within timeout")
        .unwrap();

    let run = pipeline.run_until(tokio::time::sleep(Duration::from_millis(600)));
    let read = async {
        let mut len_buf = [0u8; 2];
        client.read_exact(&mut len_buf).await.unwrap();
        let len = u16::from_le_bytes(len_buf) as usize;

        let mut payload = vec![0u8; len];
        client.read_exact(&mut payload).await.unwrap();
        payload
    };

    let (run_result, payload) = tokio::join!(run, read);
    run_result.unwrap();

    // The payload is frame B's encoding; the first cycle (frame A becoming
    // the reference) produced no event
    let expected = PngCodec.encode(&Frame::new(grid_b)).unwrap();
    assert_eq!(payload, expected);

    // Shutdown closed the connection with nothing further buffered
    let mut rest = Vec::new();
    client.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty(), "expected exactly one broadcast event");

    let stats = pipeline.stats();
    assert_eq!(stats.frames_captured, 2);
    assert_eq!(stats.frames_processed, 1);
    assert_eq!(stats.broadcasts, 1);
    assert_eq!(stats.frames_dropped, 0);
}

#[tokio::test]
async fn pipeline_suppresses_motion_below_minimum() {
    let frame_a = Frame::new(PixelGrid::new(8, 8));
    let mut grid_b = PixelGrid::new(8, 8);
    for i in 0..4 {
        grid_b.set_pixel(i, i, Rgb::new(255, 255, 255));
    }
    let frame_b = Frame::new(grid_b);

    let server = bind_framed().await;
    let mut events = server.events();
    let addr = server.local_addr();

    // 4/64 changed pixels stays below a 0.5 minimum
    let config = fast_config()
        .movement_threshold(64)
        .detection_percent_min(0.5);
    let source = ScriptedSource::new(vec![frame_a, frame_b]);
    let pipeline = MotionPipeline::new(config, source, PngCodec, server);

    let mut client = TcpStream::connect(addr).await.unwrap();
    timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("subscriber not registered within timeout")
        .unwrap();

    pipeline
        .run_until(tokio::time::sleep(Duration::from_millis(400)))
        .await
        .unwrap();

    let mut rest = Vec::new();
    client.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty(), "no broadcast expected below the minimum");

    let stats = pipeline.stats();
    assert_eq!(stats.frames_processed, 1);
    assert_eq!(stats.broadcasts, 0);
}

#[tokio::test]
async fn pipeline_surfaces_dimension_mismatch() {
    // A fixed-position camera never changes size; a mismatch is a
    // configuration bug and must abort the run rather than be swallowed
    let frames = vec![
        Frame::new(PixelGrid::new(8, 8)),
        Frame::new(PixelGrid::new(4, 4)),
    ];

    let server = bind_framed().await;
    let pipeline = MotionPipeline::new(fast_config(), ScriptedSource::new(frames), PngCodec, server);

    let result = timeout(
        Duration::from_secs(5),
        pipeline.run_until(tokio::time::sleep(Duration::from_secs(4))),
    )
    .await
    .expect("pipeline did not stop on mismatch");

    match result {
        Err(Error::Detect(DetectError::DimensionMismatch { prev, curr })) => {
            assert_eq!(prev, (8, 8));
            assert_eq!(curr, (4, 4));
        }
        other => panic!("expected dimension mismatch, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn capture_failures_skip_cycles_without_stopping() {
    // An empty script fails every capture; the pipeline keeps running until
    // shut down and never processes or broadcasts anything
    let server = bind_framed().await;
    let pipeline = MotionPipeline::new(fast_config(), ScriptedSource::new(vec![]), PngCodec, server);

    pipeline
        .run_until(tokio::time::sleep(Duration::from_millis(200)))
        .await
        .unwrap();

    let stats = pipeline.stats();
    assert!(stats.capture_failures > 0);
    assert_eq!(stats.frames_captured, 0);
    assert_eq!(stats.frames_processed, 0);
    assert_eq!(stats.broadcasts, 0);
}
