// SPDX-License-Identifier: GPL-3.0-only

//! Periodic auto-focus requests
//!
//! While a session previews, a tokio task asks for one focus cycle every
//! [`AUTO_FOCUS_INTERVAL`]. Each tick carries the session token so the
//! coordinator can drop ticks that outlive their session.

use super::session::SessionToken;
use crate::constants::timing::AUTO_FOCUS_INTERVAL;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

pub struct AutoFocusManager {
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl Default for AutoFocusManager {
    fn default() -> Self {
        Self::new(AUTO_FOCUS_INTERVAL)
    }
}

impl AutoFocusManager {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start ticking for `token`, replacing any running ticker
    ///
    /// The first tick fires right away. `on_tick` returning `false` ends the
    /// task. Must be called from within a tokio runtime.
    pub fn start<F>(&mut self, token: SessionToken, mut on_tick: F)
    where
        F: FnMut(SessionToken) -> bool + Send + 'static,
    {
        self.stop();
        let period = self.interval;
        debug!(%token, interval_ms = period.as_millis(), "Starting auto-focus");

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !on_tick(token) {
                    break;
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Stopped auto-focus");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for AutoFocusManager {
    fn drop(&mut self) {
        self.stop();
    }
}
