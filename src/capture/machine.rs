// SPDX-License-Identifier: GPL-3.0-only

//! Capture state machine
//!
//! Pure transition logic for one camera at a time. Every handler takes an
//! event, updates the state, and returns the [`Effect`]s the caller has to
//! carry out. Nothing here touches the camera, the worker thread or a timer,
//! so every interleaving of events can be driven directly from tests.
//!
//! ```text
//! Closed ─open─▶ Opening ─preview─▶ Previewing ◀──────────────┐
//!                                     │   ▲                   │
//!                                frame│   │not found / blank  │restart
//!                                     ▼   │                   │
//!                                   Decoding ─result─▶ ResultShown
//! ```
//!
//! Any state but `Closed` goes back to `Closed` on close or on a fatal
//! camera error.

use super::session::{CaptureSession, SessionToken};
use super::zoom::next_zoom;
use crate::backends::camera::{CameraFrame, ZoomCapabilities};
use crate::config::Config;
use crate::constants::timing::FRAME_LOG_INTERVAL;
use crate::errors::{CaptureError, DecodeError, WorkerError};
use crate::frame_processor::{DecodeOutcome, DecodeResult, LuminanceImage};
use crate::framing::{FramingCache, Rect, Resolution};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Where the capture pipeline is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Closed,
    Opening,
    Previewing,
    Decoding,
    ResultShown,
}

/// Work requested by a transition
#[derive(Debug)]
pub enum Effect {
    /// Hand a cropped image to the decode worker
    SubmitDecode {
        token: SessionToken,
        image: LuminanceImage,
    },
    StartAutoFocus(SessionToken),
    StopAutoFocus,
    /// Run one auto-focus cycle now
    AutoFocus,
    CancelAutoFocus,
    SetTorch(bool),
    SetZoom(u32),
    /// Beep and/or vibrate
    PlayFeedback,
    DeliverResult(DecodeResult),
    /// Post a restart for `token` and `generation` once `delay` has passed
    ScheduleRestart {
        token: SessionToken,
        generation: u64,
        delay: Duration,
    },
    StopWorker,
    StopPreview,
    CloseDriver,
    NotifyFrameworkError(CaptureError),
}

/// Capture state machine
#[derive(Debug, Clone)]
pub struct CaptureMachine {
    state: CaptureState,
    session: Option<CaptureSession>,
    last_token: SessionToken,
    screen: Option<Resolution>,
    /// Manual window size requested while no session could take it
    pending_manual_size: Option<(u32, u32)>,
    scan_window: Option<Rect>,
    auto_focus: bool,
    invert_scan: bool,
}

impl CaptureMachine {
    /// Create a closed machine
    ///
    /// Without a screen resolution the preview size stands in for it once
    /// the camera is open.
    pub fn new(screen: Option<Resolution>, config: &Config) -> Self {
        Self {
            state: CaptureState::Closed,
            session: None,
            last_token: SessionToken::new(0),
            screen,
            pending_manual_size: None,
            scan_window: None,
            auto_focus: config.auto_focus,
            invert_scan: config.invert_scan,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    /// Token of the live session
    pub fn token(&self) -> Option<SessionToken> {
        self.session.as_ref().map(|s| s.token)
    }

    /// Manual window size waiting for the next session
    pub fn pending_manual_size(&self) -> Option<(u32, u32)> {
        self.pending_manual_size
    }

    /// Session that wants a preview frame, if any
    ///
    /// Only one frame is ever asked for at a time, and none while a decode
    /// is in flight or a result is on show.
    pub fn frame_request(&self) -> Option<SessionToken> {
        match (&self.session, self.state) {
            (Some(session), CaptureState::Previewing)
                if session.is_previewing && !session.is_decode_in_flight =>
            {
                Some(session.token)
            }
            _ => None,
        }
    }

    /// Screen-space scan window of the live session
    pub fn framing_rect(&mut self) -> Option<Rect> {
        self.session.as_mut()?.framing.framing_rect()
    }

    /// Preview-space scan window of the live session
    pub fn framing_rect_in_preview(&mut self) -> Option<Rect> {
        self.session.as_mut()?.framing.framing_rect_in_preview()
    }

    fn set_state(&mut self, next: CaptureState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "Capture state change");
            self.state = next;
        }
    }

    fn live_session(&mut self, token: SessionToken) -> Option<&mut CaptureSession> {
        self.session.as_mut().filter(|s| s.token == token)
    }

    // ===== Session lifecycle =====

    /// Start opening the camera
    ///
    /// Returns the new session's token, or `None` if a session is already
    /// open or opening.
    pub fn begin_open(&mut self) -> Option<SessionToken> {
        if self.state != CaptureState::Closed {
            debug!(state = ?self.state, "Camera already open");
            return None;
        }

        let token = self.last_token.next();
        self.last_token = token;

        let mut framing = FramingCache::new(self.screen, None);
        framing.set_scan_window(self.scan_window);
        if let Some((width, height)) = self.pending_manual_size.take() {
            debug!(width, height, "Applying queued manual framing rect");
            framing.set_manual_size(width, height);
        }
        self.session = Some(CaptureSession::new(token, framing));
        self.set_state(CaptureState::Opening);
        info!(%token, "Opening capture session");
        Some(token)
    }

    /// The driver is open and reported its preview size
    pub fn on_driver_opened(&mut self, token: SessionToken, camera: Option<Resolution>) {
        if self.state != CaptureState::Opening {
            return;
        }

        let screen = self.screen.or(camera);
        let Some(session) = self.live_session(token) else {
            return;
        };
        session.framing.set_resolutions(screen, camera);

        info!(
            %token,
            camera = ?camera,
            screen = ?screen,
            "Camera driver opened"
        );
    }

    /// Preview is running; start asking for frames
    pub fn on_preview_started(
        &mut self,
        token: SessionToken,
        auto_focus_supported: bool,
    ) -> Vec<Effect> {
        if self.state != CaptureState::Opening {
            return Vec::new();
        }

        let auto_focus = self.auto_focus && auto_focus_supported;
        let Some(session) = self.live_session(token) else {
            return Vec::new();
        };
        session.is_previewing = true;
        session.auto_focus_active = auto_focus;
        self.set_state(CaptureState::Previewing);

        if auto_focus {
            vec![Effect::StartAutoFocus(token)]
        } else {
            Vec::new()
        }
    }

    /// Close the session (no-op when already closed)
    pub fn on_close(&mut self) -> Vec<Effect> {
        let Some(session) = self.session.take() else {
            return Vec::new();
        };

        let mut effects = vec![Effect::StopWorker];
        if session.auto_focus_active {
            effects.push(Effect::StopAutoFocus);
        }
        if session.is_previewing {
            effects.push(Effect::StopPreview);
        }
        effects.push(Effect::CloseDriver);

        self.set_state(CaptureState::Closed);
        info!(token = %session.token, frames = session.frames_seen, "Capture session closed");
        effects
    }

    /// The camera framework failed; the session ends
    pub fn on_fatal(&mut self, token: SessionToken, error: CaptureError) -> Vec<Effect> {
        if self.token() != Some(token) {
            debug!(%token, error = %error, "Ignoring error from stale session");
            return Vec::new();
        }

        warn!(%token, error = %error, "Capture session failed");
        let mut effects = self.on_close();
        effects.push(Effect::NotifyFrameworkError(error));
        effects
    }

    // ===== Frames and decoding =====

    /// A preview frame arrived
    pub fn on_frame(&mut self, token: SessionToken, frame: &CameraFrame) -> Vec<Effect> {
        if self.state != CaptureState::Previewing {
            trace!(state = ?self.state, "Dropping frame, not previewing");
            return Vec::new();
        }

        let invert = self.invert_scan;
        let Some(session) = self.live_session(token) else {
            trace!(%token, "Dropping frame from stale session");
            return Vec::new();
        };
        if session.is_decode_in_flight {
            return Vec::new();
        }

        session.frames_seen += 1;
        if session.frames_seen % FRAME_LOG_INTERVAL == 0 {
            trace!(
                frames = session.frames_seen,
                width = frame.width,
                height = frame.height,
                "Preview frames received"
            );
        }

        let Some(rect) = session.framing.framing_rect_in_preview() else {
            debug!("Framing rect not ready, dropping frame");
            return Vec::new();
        };

        let mut image = match LuminanceImage::crop_from_frame(frame, rect) {
            Ok(image) => image,
            Err(e) => {
                debug!(error = %e, %rect, "Dropping frame");
                return Vec::new();
            }
        };
        if invert {
            image.invert();
        }

        session.is_decode_in_flight = true;
        self.set_state(CaptureState::Decoding);
        vec![Effect::SubmitDecode { token, image }]
    }

    /// The decode worker finished with a frame
    pub fn on_decode_report(&mut self, token: SessionToken, outcome: DecodeOutcome) -> Vec<Effect> {
        if self.state != CaptureState::Decoding {
            trace!(%token, "Ignoring decode report outside decoding");
            return Vec::new();
        }
        let Some(session) = self.live_session(token) else {
            trace!(%token, "Ignoring decode report from stale session");
            return Vec::new();
        };
        session.is_decode_in_flight = false;

        match outcome {
            Ok(result) if !result.is_blank() => {
                session.last_result = Some(result.text.clone());
                session.result_generation += 1;
                let auto_focus = session.auto_focus_active;
                self.set_state(CaptureState::ResultShown);

                let mut effects = Vec::with_capacity(3);
                if auto_focus {
                    effects.push(Effect::CancelAutoFocus);
                }
                effects.push(Effect::PlayFeedback);
                effects.push(Effect::DeliverResult(result));
                effects
            }
            Ok(_) => {
                debug!("Decoded blank text, resuming preview");
                self.set_state(CaptureState::Previewing);
                Vec::new()
            }
            Err(DecodeError::NotFound) => {
                self.set_state(CaptureState::Previewing);
                Vec::new()
            }
            Err(e) => {
                trace!(error = %e, "Decode failed, resuming preview");
                self.set_state(CaptureState::Previewing);
                Vec::new()
            }
        }
    }

    /// The worker refused a frame; the session cannot go on
    pub fn on_submit_failed(
        &mut self,
        token: SessionToken,
        error: WorkerError,
    ) -> Vec<Effect> {
        self.on_fatal(token, CaptureError::Worker(error))
    }

    // ===== Restart =====

    /// The consumer is done with the result on show
    pub fn on_restart_requested(&mut self, delay: Duration) -> Vec<Effect> {
        match (&self.session, self.state) {
            (Some(session), CaptureState::ResultShown) => {
                debug!(
                    token = %session.token,
                    generation = session.result_generation,
                    delay_ms = delay.as_millis(),
                    "Scheduling preview restart"
                );
                vec![Effect::ScheduleRestart {
                    token: session.token,
                    generation: session.result_generation,
                    delay,
                }]
            }
            _ => {
                debug!(state = ?self.state, "Ignoring restart request, no result on show");
                Vec::new()
            }
        }
    }

    /// A scheduled restart fired
    ///
    /// Only a timer scheduled for the result currently on show resumes
    /// preview; one left over from an earlier result is ignored.
    pub fn on_restart_fired(&mut self, token: SessionToken, generation: u64) -> Vec<Effect> {
        if self.state != CaptureState::ResultShown {
            return Vec::new();
        }
        let Some(session) = self.live_session(token) else {
            trace!(%token, "Ignoring restart for stale session");
            return Vec::new();
        };
        if session.result_generation != generation {
            debug!(
                %token,
                generation,
                current = session.result_generation,
                "Ignoring restart scheduled for an earlier result"
            );
            return Vec::new();
        }
        session.last_result = None;
        self.set_state(CaptureState::Previewing);
        Vec::new()
    }

    // ===== Side controls =====

    /// An auto-focus tick arrived
    pub fn on_auto_focus_tick(&mut self, token: SessionToken) -> Vec<Effect> {
        let state = self.state;
        match self.live_session(token) {
            Some(session)
                if session.auto_focus_active
                    && matches!(
                        state,
                        CaptureState::Previewing
                            | CaptureState::Decoding
                            | CaptureState::ResultShown
                    ) =>
            {
                vec![Effect::AutoFocus]
            }
            _ => {
                trace!(%token, "Ignoring auto-focus tick");
                Vec::new()
            }
        }
    }

    /// Switch the torch; `current` is the camera's torch state
    pub fn on_torch(&mut self, on: bool, current: bool) -> Vec<Effect> {
        let Some(session) = &self.session else {
            debug!(on, "Ignoring torch request, camera closed");
            return Vec::new();
        };
        if self.state == CaptureState::Opening || on == current {
            return Vec::new();
        }

        if session.auto_focus_active {
            vec![
                Effect::StopAutoFocus,
                Effect::SetTorch(on),
                Effect::StartAutoFocus(session.token),
            ]
        } else {
            vec![Effect::SetTorch(on)]
        }
    }

    /// One pinch gesture sample (finger spacing in pixels)
    pub fn on_pinch(&mut self, spacing: f32, caps: ZoomCapabilities) -> Vec<Effect> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        let Some(step) = session.zoom.update(spacing) else {
            return Vec::new();
        };
        if !caps.supported {
            info!("Zoom not supported by camera, ignoring pinch");
            return Vec::new();
        }

        match next_zoom(step, caps) {
            Some(zoom) => {
                trace!(?step, zoom, "Pinch zoom");
                vec![Effect::SetZoom(zoom)]
            }
            None => {
                trace!(?step, zoom = caps.zoom, "Zoom already at limit");
                Vec::new()
            }
        }
    }

    /// The pinch gesture ended
    pub fn on_pinch_end(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.zoom.reset();
        }
    }

    // ===== Framing =====

    /// Use a fixed-size scan window
    ///
    /// Without a session the request is kept and applied when the next
    /// session starts.
    pub fn set_manual_framing_rect(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            warn!(width, height, "Ignoring empty manual framing rect");
            return;
        }

        match self.session.as_mut() {
            Some(session) => session.framing.set_manual_size(width, height),
            None => {
                debug!(width, height, "Queueing manual framing rect");
                self.pending_manual_size = Some((width, height));
            }
        }
    }

    /// Replace or clear the on-screen scan window
    pub fn set_scan_window_override(&mut self, bounds: Option<Rect>) {
        self.scan_window = bounds;
        if let Some(session) = self.session.as_mut() {
            session.framing.set_scan_window(bounds);
        }
    }
}
