// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared close signal for the WebSocket round-trip.
//
// Two independent sources may end the connection: the message path (a reply
// arrived, the peer hung up, an error) and a timer. Both fire the same
// handle. The first call wins and records why; later calls are no-ops.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Why the connection was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The server replied and the client closed in response.
    MessageReceived,
    /// The server closed first.
    PeerClosed,
    /// The hard time limit expired.
    Timeout,
    /// Sending or receiving failed.
    Error,
}

#[derive(Debug, Default)]
struct Inner {
    reason: OnceLock<CloseReason>,
    notify: Notify,
}

/// Cloneable, first-wins close signal.
#[derive(Debug, Clone, Default)]
pub struct CloseHandle {
    inner: Arc<Inner>,
}

impl CloseHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close with `reason`. Returns `true` only for the call that won.
    pub fn close(&self, reason: CloseReason) -> bool {
        let won = self.inner.reason.set(reason).is_ok();
        if won {
            debug!(?reason, "close handle fired");
            self.inner.notify.notify_waiters();
        }
        won
    }

    pub fn is_closed(&self) -> bool {
        self.inner.reason.get().is_some()
    }

    /// The winning reason, once closed.
    pub fn reason(&self) -> Option<CloseReason> {
        self.inner.reason.get().copied()
    }

    /// Resolve once the handle is closed, by anyone.
    pub async fn closed(&self) -> CloseReason {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a close in between is not missed.
            notified.as_mut().enable();
            if let Some(reason) = self.reason() {
                return reason;
            }
            notified.await;
        }
    }

    /// Spawn a timer that closes the handle with [`CloseReason::Timeout`]
    /// after `after`. Abort the returned task to disarm it.
    pub fn arm_timer(&self, after: Duration) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if handle.close(CloseReason::Timeout) {
                info!(after_secs = after.as_secs_f32(), "time limit reached, forcing close");
            }
        })
    }
}
