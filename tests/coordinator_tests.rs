// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the capture coordinator
//!
//! Frames come from a scripted source; each frame is a flat gray image and
//! the fake decoder reads its value: 0 means no code, 1 a blank payload,
//! anything else the payload `code-<value>`. The frames are smaller than
//! the automatic scan window, so tests that decode set a manual one.

use qrcapture::backends::camera::{
    BackendError, BackendResult, CameraControls, CameraFrame, FrameSource, PixelFormat,
    ZoomCapabilities,
};
use qrcapture::capture::{CaptureCoordinator, ResultConsumer, ScanFeedback};
use qrcapture::config::{Config, DecodeFormat, DecodeHints};
use qrcapture::errors::{CaptureError, DecodeError};
use qrcapture::frame_processor::{DecodeResult, DecodedSymbol, LuminanceImage};
use qrcapture::framing::Resolution;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

const SIDE: u32 = 16;
const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(150);

#[derive(Clone, Default)]
struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }

    async fn wait_for(&self, entry: &str, times: usize) {
        timeout(WAIT, async {
            while self.count(entry) < times {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("'{}' not seen {} times", entry, times));
    }
}

fn gray_frame(value: u8) -> CameraFrame {
    CameraFrame::new(
        SIDE,
        SIDE,
        PixelFormat::Gray8,
        vec![value; (SIDE * SIDE) as usize],
    )
}

struct ScriptedSource {
    frames: VecDeque<CameraFrame>,
    /// Report end of stream once the script runs out (otherwise wait forever)
    end_when_empty: bool,
    fail_open: bool,
    open: bool,
    previewing: bool,
    auto_focus_supported: bool,
    continuous_focus_supported: bool,
    torch: bool,
    zoom: ZoomCapabilities,
    log: Log,
}

impl ScriptedSource {
    fn new(values: &[u8], log: Log) -> Self {
        Self {
            frames: values.iter().map(|&v| gray_frame(v)).collect(),
            end_when_empty: false,
            fail_open: false,
            open: false,
            previewing: false,
            auto_focus_supported: false,
            continuous_focus_supported: false,
            torch: false,
            zoom: ZoomCapabilities::default(),
            log,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn open_driver(&mut self) -> BackendResult<()> {
        self.log.push("open");
        if self.fail_open {
            return Err(BackendError::DeviceNotFound("scripted".to_string()));
        }
        self.open = true;
        Ok(())
    }

    fn close_driver(&mut self) {
        self.log.push("close");
        self.open = false;
        self.previewing = false;
        self.torch = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn camera_resolution(&self) -> Option<Resolution> {
        self.open.then(|| Resolution::new(SIDE, SIDE))
    }

    fn start_preview(&mut self) -> BackendResult<()> {
        self.previewing = true;
        Ok(())
    }

    fn stop_preview(&mut self) {
        self.previewing = false;
    }

    async fn next_frame(&mut self) -> Option<CameraFrame> {
        tokio::task::yield_now().await;
        match self.frames.pop_front() {
            Some(frame) => {
                self.log.push("frame");
                Some(frame)
            }
            None if self.end_when_empty => None,
            None => std::future::pending().await,
        }
    }
}

impl CameraControls for ScriptedSource {
    fn supports_auto_focus(&self) -> bool {
        self.auto_focus_supported
    }

    fn auto_focus(&mut self) -> BackendResult<()> {
        self.log.push("auto_focus");
        Ok(())
    }

    fn cancel_auto_focus(&mut self) {
        self.log.push("cancel_auto_focus");
    }

    fn supports_continuous_focus(&self) -> bool {
        self.continuous_focus_supported
    }

    fn set_continuous_focus(&mut self, on: bool) -> BackendResult<()> {
        self.log.push(if on { "continuous on" } else { "continuous off" });
        Ok(())
    }

    fn torch(&self) -> bool {
        self.torch
    }

    fn set_torch(&mut self, on: bool) -> BackendResult<()> {
        self.log.push(if on { "torch on" } else { "torch off" });
        self.torch = on;
        Ok(())
    }

    fn zoom_capabilities(&self) -> ZoomCapabilities {
        self.zoom
    }

    fn set_zoom(&mut self, zoom: u32) -> BackendResult<()> {
        self.log.push(format!("zoom {}", zoom));
        self.zoom.zoom = zoom;
        Ok(())
    }
}

fn pixel_decoder(image: &LuminanceImage, _hints: &DecodeHints) -> Result<DecodedSymbol, DecodeError> {
    match image.luma(0, 0) {
        0 => Err(DecodeError::NotFound),
        1 => Ok(DecodedSymbol::new(" ", DecodeFormat::QrCode)),
        v => Ok(DecodedSymbol::new(format!("code-{}", v), DecodeFormat::QrCode)),
    }
}

#[derive(Debug)]
enum Seen {
    Result(String),
    Error(CaptureError),
}

struct ChannelConsumer(mpsc::UnboundedSender<Seen>);

impl ResultConsumer for ChannelConsumer {
    fn on_result(&mut self, result: DecodeResult) {
        let _ = self.0.send(Seen::Result(result.text));
    }

    fn on_framework_error(&mut self, error: CaptureError) {
        let _ = self.0.send(Seen::Error(error));
    }
}

struct CountingFeedback(Arc<AtomicUsize>);

impl ScanFeedback for CountingFeedback {
    fn beep(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    fn vibrate(&mut self) {}
}

fn consumer() -> (ChannelConsumer, mpsc::UnboundedReceiver<Seen>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelConsumer(tx), rx)
}

async fn next_seen(rx: &mut mpsc::UnboundedReceiver<Seen>) -> Seen {
    timeout(WAIT, rx.recv())
        .await
        .expect("nothing reported in time")
        .expect("coordinator dropped the consumer")
}

#[tokio::test]
async fn test_scans_until_result_then_waits_for_restart() {
    let log = Log::default();
    let source = ScriptedSource::new(&[0, 0, 0, 7, 9], log.clone());
    let beeps = Arc::new(AtomicUsize::new(0));
    let (coordinator, handle) = CaptureCoordinator::new(source, pixel_decoder, Config::default(), None);
    let coordinator = coordinator.with_feedback(Box::new(CountingFeedback(beeps.clone())));
    let (consumer, mut seen) = consumer();
    let task = coordinator.spawn(consumer);

    handle.set_manual_framing_rect(8, 8).unwrap();
    handle.open().unwrap();

    assert!(matches!(next_seen(&mut seen).await, Seen::Result(text) if text == "code-7"));
    assert_eq!(beeps.load(Ordering::SeqCst), 1);

    // Paused on the result: no more frames pulled
    assert!(timeout(QUIET, seen.recv()).await.is_err());
    assert_eq!(log.count("frame"), 4);

    handle.restart_after_delay(0).unwrap();
    assert!(matches!(next_seen(&mut seen).await, Seen::Result(text) if text == "code-9"));
    assert_eq!(beeps.load(Ordering::SeqCst), 2);

    handle.shutdown().unwrap();
    timeout(WAIT, task).await.unwrap().unwrap();
    assert_eq!(log.count("close"), 1);
}

#[tokio::test]
async fn test_duplicate_restart_does_not_dismiss_next_result() {
    let log = Log::default();
    let source = ScriptedSource::new(&[7, 9, 11], log.clone());
    let (coordinator, handle) = CaptureCoordinator::new(source, pixel_decoder, Config::default(), None);
    let (consumer, mut seen) = consumer();
    let task = coordinator.spawn(consumer);

    handle.set_manual_framing_rect(8, 8).unwrap();
    handle.open().unwrap();
    assert!(matches!(next_seen(&mut seen).await, Seen::Result(text) if text == "code-7"));

    handle.restart_after_delay(0).unwrap();
    handle.restart_after_delay(100).unwrap();
    assert!(matches!(next_seen(&mut seen).await, Seen::Result(text) if text == "code-9"));

    // The 100ms timer was for "code-7"; "code-9" stays on show
    assert!(timeout(QUIET * 2, seen.recv()).await.is_err());
    assert_eq!(log.count("frame"), 2);

    handle.shutdown().unwrap();
    timeout(WAIT, task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_blank_payload_is_skipped() {
    let log = Log::default();
    let source = ScriptedSource::new(&[1, 1, 5], log.clone());
    let (coordinator, handle) = CaptureCoordinator::new(source, pixel_decoder, Config::default(), None);
    let (consumer, mut seen) = consumer();
    let task = coordinator.spawn(consumer);

    handle.set_manual_framing_rect(8, 8).unwrap();
    handle.open().unwrap();
    assert!(matches!(next_seen(&mut seen).await, Seen::Result(text) if text == "code-5"));

    drop(handle);
    timeout(WAIT, task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_one_frame_per_decode() {
    let log = Log::default();
    let source = ScriptedSource::new(&[0, 0, 0, 0, 3, 0, 0], log.clone());
    let decodes = Arc::new(AtomicUsize::new(0));
    let counter = decodes.clone();
    let slow_decoder = move |image: &LuminanceImage, hints: &DecodeHints| {
        counter.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(10));
        pixel_decoder(image, hints)
    };
    let (coordinator, handle) = CaptureCoordinator::new(source, slow_decoder, Config::default(), None);
    let (consumer, mut seen) = consumer();
    let task = coordinator.spawn(consumer);

    handle.set_manual_framing_rect(8, 8).unwrap();
    handle.open().unwrap();
    assert!(matches!(next_seen(&mut seen).await, Seen::Result(text) if text == "code-3"));
    assert!(timeout(QUIET, seen.recv()).await.is_err());
    assert_eq!(decodes.load(Ordering::SeqCst), 5);
    assert_eq!(log.count("frame"), 5);

    handle.shutdown().unwrap();
    timeout(WAIT, task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_open_failure_is_reported_once() {
    let log = Log::default();
    let mut source = ScriptedSource::new(&[7], log.clone());
    source.fail_open = true;
    let (coordinator, handle) = CaptureCoordinator::new(source, pixel_decoder, Config::default(), None);
    let (consumer, mut seen) = consumer();
    let task = coordinator.spawn(consumer);

    handle.open().unwrap();
    assert!(matches!(
        next_seen(&mut seen).await,
        Seen::Error(CaptureError::Framework(BackendError::DeviceNotFound(_)))
    ));
    assert!(timeout(QUIET, seen.recv()).await.is_err());
    assert_eq!(log.count("frame"), 0);

    handle.shutdown().unwrap();
    timeout(WAIT, task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_end_of_preview_closes_session() {
    let log = Log::default();
    let mut source = ScriptedSource::new(&[0, 0], log.clone());
    source.end_when_empty = true;
    let (coordinator, handle) = CaptureCoordinator::new(source, pixel_decoder, Config::default(), None);
    let (consumer, mut seen) = consumer();
    let task = coordinator.spawn(consumer);

    handle.open().unwrap();
    assert!(matches!(
        next_seen(&mut seen).await,
        Seen::Error(CaptureError::PreviewEnded)
    ));
    assert_eq!(log.count("close"), 1);

    // Closing again is a no-op
    handle.close().unwrap();
    handle.shutdown().unwrap();
    timeout(WAIT, task).await.unwrap().unwrap();
    assert_eq!(log.count("close"), 1);
}

#[tokio::test]
async fn test_close_and_reopen() {
    let log = Log::default();
    let source = ScriptedSource::new(&[], log.clone());
    let (coordinator, handle) = CaptureCoordinator::new(source, pixel_decoder, Config::default(), None);
    let (consumer, _seen) = consumer();
    let task = coordinator.spawn(consumer);

    handle.open().unwrap();
    handle.open().unwrap();
    handle.close().unwrap();
    handle.close().unwrap();
    handle.open().unwrap();
    log.wait_for("open", 2).await;

    handle.shutdown().unwrap();
    timeout(WAIT, task).await.unwrap().unwrap();
    assert_eq!(log.count("open"), 2);
    assert_eq!(log.count("close"), 2);
}

#[tokio::test]
async fn test_auto_focus_and_torch() {
    let log = Log::default();
    let mut source = ScriptedSource::new(&[0, 0, 4], log.clone());
    source.auto_focus_supported = true;
    let (coordinator, handle) = CaptureCoordinator::new(source, pixel_decoder, Config::default(), None);
    let coordinator = coordinator.with_auto_focus_interval(Duration::from_millis(5));
    let (consumer, mut seen) = consumer();
    let task = coordinator.spawn(consumer);

    handle.set_manual_framing_rect(8, 8).unwrap();
    handle.open().unwrap();
    assert!(matches!(next_seen(&mut seen).await, Seen::Result(text) if text == "code-4"));
    log.wait_for("cancel_auto_focus", 1).await;
    log.wait_for("auto_focus", 2).await;

    handle.set_torch(true).unwrap();
    handle.set_torch(true).unwrap();
    log.wait_for("torch on", 1).await;
    tokio::time::sleep(QUIET).await;
    assert_eq!(log.count("torch on"), 1);

    handle.shutdown().unwrap();
    timeout(WAIT, task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_continuous_focus_replaces_periodic_cycles() {
    for disable_continuous_focus in [false, true] {
        let log = Log::default();
        let mut source = ScriptedSource::new(&[], log.clone());
        source.auto_focus_supported = true;
        source.continuous_focus_supported = true;
        let config = Config {
            disable_continuous_focus,
            ..Config::default()
        };
        let (coordinator, handle) = CaptureCoordinator::new(source, pixel_decoder, config, None);
        let coordinator = coordinator.with_auto_focus_interval(Duration::from_millis(5));
        let (consumer, _seen) = consumer();
        let task = coordinator.spawn(consumer);

        handle.open().unwrap();
        if disable_continuous_focus {
            log.wait_for("auto_focus", 2).await;
            assert_eq!(log.count("continuous on"), 0);
        } else {
            log.wait_for("continuous on", 1).await;
            tokio::time::sleep(QUIET).await;
            assert_eq!(log.count("auto_focus"), 0);
        }

        handle.shutdown().unwrap();
        timeout(WAIT, task).await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn test_front_light_on_at_open() {
    let log = Log::default();
    let source = ScriptedSource::new(&[], log.clone());
    let config = Config {
        front_light_mode: qrcapture::config::FrontLightMode::On,
        ..Config::default()
    };
    let (coordinator, handle) = CaptureCoordinator::new(source, pixel_decoder, config, None);
    let (consumer, _seen) = consumer();
    let task = coordinator.spawn(consumer);

    handle.open().unwrap();
    log.wait_for("torch on", 1).await;

    handle.shutdown().unwrap();
    timeout(WAIT, task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_pinch_zoom_steps() {
    let log = Log::default();
    let mut source = ScriptedSource::new(&[], log.clone());
    source.zoom = ZoomCapabilities {
        supported: true,
        max_zoom: 2,
        zoom: 0,
    };
    let (coordinator, handle) = CaptureCoordinator::new(source, pixel_decoder, Config::default(), None);
    let (consumer, _seen) = consumer();
    let task = coordinator.spawn(consumer);

    handle.open().unwrap();
    for spacing in [100.0, 110.0, 120.0, 130.0, 125.0] {
        handle.pinch(spacing).unwrap();
    }
    handle.pinch_end().unwrap();
    log.wait_for("zoom 1", 2).await;
    log.wait_for("zoom 2", 1).await;

    handle.shutdown().unwrap();
    timeout(WAIT, task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_handle_fails_after_shutdown() {
    let source = ScriptedSource::new(&[], Log::default());
    let (coordinator, handle) = CaptureCoordinator::new(source, pixel_decoder, Config::default(), None);
    let (consumer, _seen) = consumer();
    let task = coordinator.spawn(consumer);

    handle.shutdown().unwrap();
    timeout(WAIT, task).await.unwrap().unwrap();
    assert_eq!(handle.open(), Err(CaptureError::Stopped));
}
