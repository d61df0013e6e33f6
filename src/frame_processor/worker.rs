// SPDX-License-Identifier: GPL-3.0-only

//! Decode worker thread
//!
//! One dedicated thread per capture session with a single-slot job queue.
//! At most one image is ever being decoded; submitting while a decode is in
//! flight is refused with [`WorkerError::Busy`].
//!
//! Outcomes are handed to the `report` closure given at start. After
//! [`DecodeWorker::stop`] returns the closure is never called again.

use super::{DecodeOutcome, DecodeResult, Decoder, LuminanceImage};
use crate::config::DecodeHints;
use crate::constants::decode::WORKER_THREAD_NAME;
use crate::errors::{DecodeError, WorkerError};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Worker lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Waiting for an image
    Idle,
    /// An image is being decoded
    Decoding,
    /// Stop requested; no further reports
    ShuttingDown,
}

struct DecodeJob {
    image: LuminanceImage,
    thumbnail_scale: u32,
}

/// Handle to the decode worker thread
pub struct DecodeWorker {
    thread_handle: Option<JoinHandle<()>>,
    jobs: Option<Sender<DecodeJob>>,
    state: Arc<Mutex<WorkerState>>,
}

fn lock_state(state: &Mutex<WorkerState>) -> MutexGuard<'_, WorkerState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DecodeWorker {
    /// Spawn the worker thread
    ///
    /// `hints` are fixed here for the worker's whole lifetime. The worker
    /// starts out [`Idle`](WorkerState::Idle).
    pub fn start<D, R>(decoder: D, hints: DecodeHints, report: R) -> Result<Self, WorkerError>
    where
        D: Decoder + 'static,
        R: FnMut(DecodeOutcome) + Send + 'static,
    {
        let (jobs, job_rx) = mpsc::channel();
        let state = Arc::new(Mutex::new(WorkerState::Idle));
        let thread_state = Arc::clone(&state);

        info!(formats = ?hints.formats, "Starting decode worker");

        let thread_handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(decoder, hints, job_rx, thread_state, report))
            .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            jobs: Some(jobs),
            state,
        })
    }

    pub fn state(&self) -> WorkerState {
        *lock_state(&self.state)
    }

    /// Queue one image for decoding
    ///
    /// The thumbnail attached to a successful result is `thumbnail_scale`
    /// times smaller than `image` on each axis.
    pub fn submit(&self, image: LuminanceImage, thumbnail_scale: u32) -> Result<(), WorkerError> {
        let mut state = lock_state(&self.state);
        match *state {
            WorkerState::Decoding => return Err(WorkerError::Busy),
            WorkerState::ShuttingDown => return Err(WorkerError::ShuttingDown),
            WorkerState::Idle => {}
        }

        let jobs = self.jobs.as_ref().ok_or(WorkerError::ShuttingDown)?;
        *state = WorkerState::Decoding;
        if jobs
            .send(DecodeJob {
                image,
                thumbnail_scale,
            })
            .is_err()
        {
            *state = WorkerState::Idle;
            return Err(WorkerError::Disconnected);
        }
        Ok(())
    }

    /// Stop the worker and wait for its thread to exit
    ///
    /// A decode in progress runs to completion but its outcome is dropped.
    /// Calling this more than once is harmless.
    pub fn stop(&mut self) {
        *lock_state(&self.state) = WorkerState::ShuttingDown;
        self.jobs = None;

        if let Some(handle) = self.thread_handle.take() {
            debug!("Waiting for decode worker to finish");
            if let Err(e) = handle.join() {
                warn!("Decode worker thread panicked: {:?}", e);
            } else {
                debug!("Decode worker finished");
            }
        }
    }
}

impl Drop for DecodeWorker {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!("DecodeWorker dropped, stopping thread");
            self.stop();
        }
    }
}

fn run_worker<D, R>(
    mut decoder: D,
    hints: DecodeHints,
    jobs: Receiver<DecodeJob>,
    state: Arc<Mutex<WorkerState>>,
    mut report: R,
) where
    D: Decoder,
    R: FnMut(DecodeOutcome),
{
    debug!("Decode worker thread started");

    while let Ok(job) = jobs.recv() {
        let outcome = decode_job(&mut decoder, &hints, job);

        {
            let mut state = lock_state(&state);
            if *state == WorkerState::ShuttingDown {
                debug!("Dropping decode outcome, worker shutting down");
                break;
            }
            *state = WorkerState::Idle;
        }

        report(outcome);
    }

    info!("Decode worker thread exiting");
}

fn decode_job<D: Decoder>(decoder: &mut D, hints: &DecodeHints, job: DecodeJob) -> DecodeOutcome {
    let start = Instant::now();
    let DecodeJob {
        image,
        thumbnail_scale,
    } = job;

    let symbol = match catch_unwind(AssertUnwindSafe(|| decoder.decode(&image, hints))) {
        Ok(result) => result,
        Err(_) => {
            warn!("Decoder panicked, treating frame as unreadable");
            Err(DecodeError::NotFound)
        }
    };

    match symbol {
        Ok(symbol) => {
            let thumbnail = image.thumbnail(thumbnail_scale);
            let scale_factor = thumbnail.width() as f32 / image.width().max(1) as f32;
            debug!(
                format = %symbol.format,
                len = symbol.text.len(),
                elapsed_ms = start.elapsed().as_millis(),
                "Found barcode"
            );
            Ok(DecodeResult {
                text: symbol.text,
                format: symbol.format,
                points: symbol.points,
                thumbnail: Some(thumbnail),
                scale_factor,
            })
        }
        Err(e) => {
            trace!(error = %e, elapsed_ms = start.elapsed().as_millis(), "No barcode in frame");
            Err(e)
        }
    }
}
