// SPDX-License-Identifier: GPL-3.0-only

//! Scan feedback and result delivery

use crate::config::Config;
use crate::errors::CaptureError;
use crate::frame_processor::DecodeResult;
use tracing::debug;

/// Sound and vibration output
pub trait ScanFeedback: Send {
    fn beep(&mut self);
    fn vibrate(&mut self);
}

/// Feedback sink that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFeedback;

impl ScanFeedback for LogFeedback {
    fn beep(&mut self) {
        debug!("Beep");
    }

    fn vibrate(&mut self) {
        debug!("Vibrate");
    }
}

/// Plays the configured feedback when a code is read
pub struct BeepManager {
    play_beep: bool,
    vibrate: bool,
    sink: Box<dyn ScanFeedback>,
}

impl BeepManager {
    pub fn new(config: &Config, sink: Box<dyn ScanFeedback>) -> Self {
        Self {
            play_beep: config.play_beep,
            vibrate: config.vibrate,
            sink,
        }
    }

    pub fn set_sink(&mut self, sink: Box<dyn ScanFeedback>) {
        self.sink = sink;
    }

    pub fn play_beep_sound_and_vibrate(&mut self) {
        if self.play_beep {
            self.sink.beep();
        }
        if self.vibrate {
            self.sink.vibrate();
        }
    }
}

/// Receives what the capture pipeline produces
///
/// Called on the coordinator task. After [`on_result`](Self::on_result) the
/// pipeline stays paused until the consumer asks for a restart through its
/// [`CaptureHandle`](super::CaptureHandle).
pub trait ResultConsumer: Send {
    fn on_result(&mut self, result: DecodeResult);

    /// The session ended because the camera framework failed
    fn on_framework_error(&mut self, error: CaptureError);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<&'static str>>>);

    impl ScanFeedback for Recorder {
        fn beep(&mut self) {
            self.0.lock().unwrap().push("beep");
        }

        fn vibrate(&mut self) {
            self.0.lock().unwrap().push("vibrate");
        }
    }

    #[test]
    fn test_follows_config() {
        let recorder = Recorder::default();
        let mut beeper = BeepManager::new(&Config::default(), Box::new(recorder.clone()));
        beeper.play_beep_sound_and_vibrate();
        assert_eq!(*recorder.0.lock().unwrap(), vec!["beep"]);

        let config = Config {
            play_beep: false,
            vibrate: true,
            ..Config::default()
        };
        let recorder = Recorder::default();
        let mut beeper = BeepManager::new(&config, Box::new(recorder.clone()));
        beeper.play_beep_sound_and_vibrate();
        assert_eq!(*recorder.0.lock().unwrap(), vec!["vibrate"]);
    }
}
