// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single proactive refresh timer, owned by one client.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

struct ArmedTimer {
    cancel: CancellationToken,
    delay: Duration,
    armed_at: Instant,
}

/// Holds at most one live timer. Re-arming cancels the previous timer before
/// the new one is spawned.
#[derive(Default)]
pub struct RefreshScheduler {
    timer: Mutex<Option<ArmedTimer>>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` once `delay` elapses unless cancelled or re-armed first.
    ///
    /// Outside a Tokio runtime nothing can be spawned: any previous timer is
    /// cancelled and no new one is armed.
    pub fn arm<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.cancel();
            warn!("no tokio runtime, proactive refresh not armed");
            return;
        };
        let cancel = CancellationToken::new();
        {
            let mut slot = self.timer.lock();
            if let Some(prev) = slot.take() {
                prev.cancel.cancel();
            }
            *slot = Some(ArmedTimer { cancel: cancel.clone(), delay, armed_at: Instant::now() });
        }
        debug!(delay_ms = delay.as_millis() as u64, "proactive refresh armed");

        runtime.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return,
            }
            task.await;
        });
    }

    pub fn cancel(&self) {
        if let Some(prev) = self.timer.lock().take() {
            prev.cancel.cancel();
            debug!("proactive refresh cancelled");
        }
    }

    /// Whether a timer is waiting to fire.
    pub fn is_armed(&self) -> bool {
        self.timer.lock().as_ref().is_some_and(|t| !t.cancel.is_cancelled() && !t.fired())
    }

    /// Delay the live timer was armed with.
    pub fn armed_delay(&self) -> Option<Duration> {
        self.timer.lock().as_ref().filter(|t| !t.cancel.is_cancelled()).map(|t| t.delay)
    }

    /// Time left before the live timer fires.
    pub fn remaining(&self) -> Option<Duration> {
        self.timer
            .lock()
            .as_ref()
            .filter(|t| !t.cancel.is_cancelled())
            .map(|t| t.delay.saturating_sub(t.armed_at.elapsed()))
    }
}

impl ArmedTimer {
    fn fired(&self) -> bool {
        self.armed_at.elapsed() >= self.delay
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            timer.cancel.cancel();
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
