// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Caller-facing call handles.
//
// The host runtime hands every operation a call object and marshals whatever
// it is settled with back to the application. Both settle methods consume
// the call, so a call is resolved or rejected at most once by construction.

use serde_json::Value;
use tokio::sync::oneshot;

/// Outcome seen by the application: resolved data or a rejection reason.
pub type CallResult = std::result::Result<Value, String>;

/// A pending caller-facing operation.
pub trait PluginCall: Send {
    /// Settle successfully with `data`.
    fn resolve(self: Box<Self>, data: Value);

    /// Settle with a failure `reason`.
    fn reject(self: Box<Self>, reason: String);
}

/// `PluginCall` backed by a oneshot channel, for Rust callers.
pub struct ChannelCall {
    tx: oneshot::Sender<CallResult>,
}

impl PluginCall for ChannelCall {
    fn resolve(self: Box<Self>, data: Value) {
        // The caller may have stopped waiting; nothing to do then.
        let _ = self.tx.send(Ok(data));
    }

    fn reject(self: Box<Self>, reason: String) {
        let _ = self.tx.send(Err(reason));
    }
}

/// Receiving half of a [`ChannelCall`].
pub struct PendingCall {
    rx: oneshot::Receiver<CallResult>,
}

const DROPPED: &str = "call dropped without a result";

impl PendingCall {
    /// Wait for the call to settle.
    pub async fn wait(self) -> CallResult {
        self.rx.await.unwrap_or_else(|_| Err(DROPPED.to_string()))
    }

    /// The settled result, or `None` while still pending.
    pub fn try_result(&mut self) -> Option<CallResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(DROPPED.to_string())),
        }
    }
}

/// Create a connected call/pending pair.
pub fn channel_call() -> (Box<ChannelCall>, PendingCall) {
    let (tx, rx) = oneshot::channel();
    (Box::new(ChannelCall { tx }), PendingCall { rx })
}
