// SPDX-License-Identifier: GPL-3.0-only

//! Capture coordinator
//!
//! Drives a [`CaptureMachine`] against a real frame source, decode worker
//! and timers. Everything the coordinator reacts to comes through one
//! inbox, and frames are pulled from the source only while the machine has
//! a frame request armed.
//!
//! # Example
//!
//! ```ignore
//! let (coordinator, handle) =
//!     CaptureCoordinator::new(source, QrDecoder::new(), config, Some(screen));
//! let task = coordinator.spawn(consumer);
//! handle.open()?;
//! ```

use super::auto_focus::AutoFocusManager;
use super::feedback::{BeepManager, LogFeedback, ResultConsumer, ScanFeedback};
use super::machine::{CaptureMachine, CaptureState, Effect};
use super::session::SessionToken;
use crate::backends::camera::{CameraControls, CameraFrame, FrameSource};
use crate::config::{Config, DecodeFormat, DecodeHints};
use crate::constants::decode::THUMBNAIL_SCALE_FACTOR;
use crate::errors::{CaptureError, WorkerError};
use crate::frame_processor::{DecodeOutcome, DecodeWorker, Decoder};
use crate::framing::{Rect, Resolution};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Inputs to the coordinator
#[derive(Debug)]
pub(crate) enum CaptureMessage {
    Open,
    Close,
    SetTorch(bool),
    Pinch(f32),
    PinchEnd,
    SetManualFramingRect { width: u32, height: u32 },
    SetScanWindowOverride(Option<Rect>),
    RestartAfterDelay(Duration),
    DecodeReport {
        token: SessionToken,
        outcome: DecodeOutcome,
    },
    AutoFocusTick(SessionToken),
    RestartPreview {
        token: SessionToken,
        generation: u64,
    },
    Shutdown,
}

/// Commands for a running coordinator
///
/// Cheap to clone. Every command fails with [`CaptureError::Stopped`] once
/// the coordinator has exited.
#[derive(Clone, Debug)]
pub struct CaptureHandle {
    tx: UnboundedSender<CaptureMessage>,
}

impl CaptureHandle {
    fn send(&self, message: CaptureMessage) -> Result<(), CaptureError> {
        self.tx.send(message).map_err(|_| CaptureError::Stopped)
    }

    /// Open the camera and start scanning
    pub fn open(&self) -> Result<(), CaptureError> {
        self.send(CaptureMessage::Open)
    }

    /// Stop scanning and release the camera
    pub fn close(&self) -> Result<(), CaptureError> {
        self.send(CaptureMessage::Close)
    }

    pub fn set_torch(&self, on: bool) -> Result<(), CaptureError> {
        self.send(CaptureMessage::SetTorch(on))
    }

    /// One pinch gesture sample: distance between the two touch points
    pub fn pinch(&self, spacing: f32) -> Result<(), CaptureError> {
        self.send(CaptureMessage::Pinch(spacing))
    }

    pub fn pinch_end(&self) -> Result<(), CaptureError> {
        self.send(CaptureMessage::PinchEnd)
    }

    /// Scan through a fixed-size window, centred on screen
    pub fn set_manual_framing_rect(&self, width: u32, height: u32) -> Result<(), CaptureError> {
        self.send(CaptureMessage::SetManualFramingRect { width, height })
    }

    /// Scan through an on-screen view's bounds (`None` clears it)
    pub fn set_scan_window_override(&self, bounds: Option<Rect>) -> Result<(), CaptureError> {
        self.send(CaptureMessage::SetScanWindowOverride(bounds))
    }

    /// Resume scanning `delay_ms` after a result was shown
    pub fn restart_after_delay(&self, delay_ms: u64) -> Result<(), CaptureError> {
        self.send(CaptureMessage::RestartAfterDelay(Duration::from_millis(
            delay_ms,
        )))
    }

    /// Close the camera and end the coordinator task
    pub fn shutdown(&self) -> Result<(), CaptureError> {
        self.send(CaptureMessage::Shutdown)
    }
}

/// Async driver for one camera
pub struct CaptureCoordinator<S, D> {
    source: S,
    decoder: D,
    hints: DecodeHints,
    config: Config,
    machine: CaptureMachine,
    worker: Option<DecodeWorker>,
    auto_focus: AutoFocusManager,
    beep: BeepManager,
    inbox: UnboundedReceiver<CaptureMessage>,
    /// For the worker, timers and focus ticks; the handles keep the inbox alive
    inbox_tx: WeakUnboundedSender<CaptureMessage>,
}

impl<S, D> CaptureCoordinator<S, D>
where
    S: FrameSource + CameraControls,
    D: Decoder + Clone + 'static,
{
    /// Create a coordinator and the handle that controls it
    ///
    /// `screen` is the display resolution used for the scan window. Without
    /// it the preview size is used in its place.
    pub fn new(
        source: S,
        decoder: D,
        config: Config,
        screen: Option<Resolution>,
    ) -> (Self, CaptureHandle) {
        let (tx, inbox) = mpsc::unbounded_channel();
        let hints = config.decode_hints(None);
        let machine = CaptureMachine::new(screen, &config);
        let beep = BeepManager::new(&config, Box::new(LogFeedback));

        let coordinator = Self {
            source,
            decoder,
            hints,
            config,
            machine,
            worker: None,
            auto_focus: AutoFocusManager::default(),
            beep,
            inbox,
            inbox_tx: tx.downgrade(),
        };
        (coordinator, CaptureHandle { tx })
    }

    /// Send beeps and vibrations to `sink`
    pub fn with_feedback(mut self, sink: Box<dyn ScanFeedback>) -> Self {
        self.beep.set_sink(sink);
        self
    }

    /// Decode these formats instead of the ones enabled in the config
    pub fn with_decode_formats(mut self, formats: &[DecodeFormat]) -> Self {
        self.hints = self.config.decode_hints(Some(formats));
        self
    }

    pub fn with_auto_focus_interval(mut self, interval: Duration) -> Self {
        self.auto_focus = AutoFocusManager::new(interval);
        self
    }

    pub fn state(&self) -> CaptureState {
        self.machine.state()
    }

    /// Run until shut down or until every handle is dropped
    ///
    /// The camera is closed on the way out. Returns the consumer.
    pub async fn run<C: ResultConsumer>(mut self, mut consumer: C) -> C {
        info!("Capture coordinator started");

        loop {
            let request = self.machine.frame_request();
            tokio::select! {
                biased;

                message = self.inbox.recv() => match message {
                    Some(CaptureMessage::Shutdown) | None => break,
                    Some(message) => self.handle_message(message, &mut consumer),
                },
                frame = self.source.next_frame(), if request.is_some() => {
                    if let Some(token) = request {
                        self.handle_frame(token, frame, &mut consumer);
                    }
                }
            }
        }

        let effects = self.machine.on_close();
        self.apply(effects, &mut consumer);
        info!("Capture coordinator stopped");
        consumer
    }

    fn handle_message<C: ResultConsumer>(&mut self, message: CaptureMessage, consumer: &mut C) {
        trace!(?message, "Capture message");

        let effects = match message {
            CaptureMessage::Open => {
                self.open_session(consumer);
                return;
            }
            CaptureMessage::Close | CaptureMessage::Shutdown => self.machine.on_close(),
            CaptureMessage::SetTorch(on) => {
                let current = self.source.torch();
                self.machine.on_torch(on, current)
            }
            CaptureMessage::Pinch(spacing) => {
                let caps = self.source.zoom_capabilities();
                self.machine.on_pinch(spacing, caps)
            }
            CaptureMessage::PinchEnd => {
                self.machine.on_pinch_end();
                return;
            }
            CaptureMessage::SetManualFramingRect { width, height } => {
                self.machine.set_manual_framing_rect(width, height);
                return;
            }
            CaptureMessage::SetScanWindowOverride(bounds) => {
                self.machine.set_scan_window_override(bounds);
                return;
            }
            CaptureMessage::RestartAfterDelay(delay) => self.machine.on_restart_requested(delay),
            CaptureMessage::DecodeReport { token, outcome } => {
                self.machine.on_decode_report(token, outcome)
            }
            CaptureMessage::AutoFocusTick(token) => self.machine.on_auto_focus_tick(token),
            CaptureMessage::RestartPreview { token, generation } => {
                self.machine.on_restart_fired(token, generation)
            }
        };

        self.apply(effects, consumer);
    }

    fn handle_frame<C: ResultConsumer>(
        &mut self,
        token: SessionToken,
        frame: Option<CameraFrame>,
        consumer: &mut C,
    ) {
        let effects = match frame {
            Some(frame) => self.machine.on_frame(token, &frame),
            None => self.machine.on_fatal(token, CaptureError::PreviewEnded),
        };
        self.apply(effects, consumer);
    }

    fn open_session<C: ResultConsumer>(&mut self, consumer: &mut C) {
        let Some(token) = self.machine.begin_open() else {
            return;
        };

        if let Err(e) = self.source.open_driver() {
            let effects = self.machine.on_fatal(token, CaptureError::Framework(e));
            self.apply(effects, consumer);
            return;
        }
        self.machine
            .on_driver_opened(token, self.source.camera_resolution());

        let inbox = self.inbox_tx.clone();
        let report = move |outcome: DecodeOutcome| {
            if let Some(tx) = inbox.upgrade() {
                let _ = tx.send(CaptureMessage::DecodeReport { token, outcome });
            }
        };
        match DecodeWorker::start(self.decoder.clone(), self.hints.clone(), report) {
            Ok(worker) => self.worker = Some(worker),
            Err(e) => {
                let effects = self.machine.on_fatal(token, CaptureError::Worker(e));
                self.apply(effects, consumer);
                return;
            }
        }

        if self.config.torch_on_open()
            && let Err(e) = self.source.set_torch(true)
        {
            warn!(error = %e, "Failed to switch torch on");
        }

        if let Err(e) = self.source.start_preview() {
            let effects = self.machine.on_fatal(token, CaptureError::Framework(e));
            self.apply(effects, consumer);
            return;
        }

        let periodic_focus = self.source.supports_auto_focus() && !self.use_continuous_focus();
        let effects = self.machine.on_preview_started(token, periodic_focus);
        self.apply(effects, consumer);
    }

    /// Hand focusing over to the camera when it can do it alone
    fn use_continuous_focus(&mut self) -> bool {
        if !self.config.auto_focus
            || self.config.disable_continuous_focus
            || !self.source.supports_continuous_focus()
        {
            return false;
        }
        match self.source.set_continuous_focus(true) {
            Ok(()) => {
                debug!("Using continuous focus");
                true
            }
            Err(e) => {
                debug!(error = %e, "Continuous focus refused, falling back to auto-focus cycles");
                false
            }
        }
    }

    fn apply<C: ResultConsumer>(&mut self, effects: Vec<Effect>, consumer: &mut C) {
        for effect in effects {
            match effect {
                Effect::SubmitDecode { token, image } => {
                    let submitted = match &self.worker {
                        Some(worker) => worker.submit(image, THUMBNAIL_SCALE_FACTOR),
                        None => Err(WorkerError::ShuttingDown),
                    };
                    if let Err(e) = submitted {
                        let effects = self.machine.on_submit_failed(token, e);
                        self.apply(effects, consumer);
                    }
                }
                Effect::StartAutoFocus(token) => {
                    let inbox = self.inbox_tx.clone();
                    self.auto_focus.start(token, move |token| {
                        inbox
                            .upgrade()
                            .is_some_and(|tx| tx.send(CaptureMessage::AutoFocusTick(token)).is_ok())
                    });
                }
                Effect::StopAutoFocus => self.auto_focus.stop(),
                Effect::AutoFocus => {
                    if let Err(e) = self.source.auto_focus() {
                        debug!(error = %e, "Auto-focus request failed");
                    }
                }
                Effect::CancelAutoFocus => self.source.cancel_auto_focus(),
                Effect::SetTorch(on) => {
                    if let Err(e) = self.source.set_torch(on) {
                        warn!(on, error = %e, "Failed to switch torch");
                    }
                }
                Effect::SetZoom(zoom) => {
                    if let Err(e) = self.source.set_zoom(zoom) {
                        info!(zoom, error = %e, "Zoom request ignored");
                    }
                }
                Effect::PlayFeedback => self.beep.play_beep_sound_and_vibrate(),
                Effect::DeliverResult(result) => consumer.on_result(result),
                Effect::ScheduleRestart {
                    token,
                    generation,
                    delay,
                } => {
                    let inbox = self.inbox_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        if let Some(tx) = inbox.upgrade() {
                            let _ = tx.send(CaptureMessage::RestartPreview { token, generation });
                        }
                    });
                }
                Effect::StopWorker => {
                    if let Some(mut worker) = self.worker.take() {
                        worker.stop();
                    }
                }
                Effect::StopPreview => self.source.stop_preview(),
                Effect::CloseDriver => self.source.close_driver(),
                Effect::NotifyFrameworkError(error) => consumer.on_framework_error(error),
            }
        }
    }
}

impl<S, D> CaptureCoordinator<S, D>
where
    S: FrameSource + CameraControls + 'static,
    D: Decoder + Clone + 'static,
{
    /// Run on a new tokio task
    pub fn spawn<C: ResultConsumer + 'static>(self, consumer: C) -> JoinHandle<C> {
        tokio::spawn(self.run(consumer))
    }
}
