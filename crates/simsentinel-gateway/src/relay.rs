// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inbound SMS relay.
//
// The OS broadcast path has no handle to the plugin instance, so the plugin
// leaves a non-owning back-reference in a process-wide slot when it loads.
// One subscriber at most; the last one installed wins. Events that arrive
// with no live subscriber are dropped: no queue, no error.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use simsentinel_core::types::SmsEvent;
use tracing::{debug, error, trace, warn};

/// Receiver of module-to-application events (the host's plugin instance).
pub trait ListenerContext: Send + Sync {
    /// Deliver a named event. Must not block on the consumer.
    fn notify_listeners(&self, event: &str, payload: serde_json::Value);
}

/// What happened to one relayed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// No listener was registered, or it has already gone away.
    Dropped,
    /// The listener panicked; contained here.
    Faulted,
}

struct Registration {
    listener: Weak<dyn ListenerContext>,
    event_name: Arc<str>,
}

/// Single-subscriber registration slot.
///
/// Installs and clears swap the whole registration under one lock; relays
/// upgrade the handle under the lock and deliver after releasing it.
pub struct ListenerSlot {
    inner: Mutex<Option<Registration>>,
}

impl Default for ListenerSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenerSlot {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Registration>> {
        // A panicking holder cannot leave the Option half-written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `listener` under `event_name`, replacing any previous one.
    ///
    /// Returns `true` if a still-live listener was displaced.
    pub fn install(&self, listener: &Arc<dyn ListenerContext>, event_name: &str) -> bool {
        let next = Registration {
            listener: Arc::downgrade(listener),
            event_name: Arc::from(event_name),
        };
        let previous = self.lock().replace(next);
        let displaced = previous.is_some_and(|p| p.listener.strong_count() > 0);
        debug!(event_name, displaced, "sms listener installed");
        displaced
    }

    /// Clear the slot only if it still holds `listener`.
    ///
    /// A plugin instance tearing down after a newer one loaded must not
    /// unregister its successor.
    pub fn clear_if(&self, listener: &Arc<dyn ListenerContext>) -> bool {
        let target = Arc::downgrade(listener);
        let mut slot = self.lock();
        let matches = slot
            .as_ref()
            .is_some_and(|r| Weak::ptr_eq(&r.listener, &target));
        if matches {
            *slot = None;
            debug!("sms listener cleared");
        }
        matches
    }

    /// Unconditionally clear the slot.
    pub fn clear(&self) {
        self.lock().take();
    }

    /// Whether a live listener is registered.
    pub fn is_registered(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|r| r.listener.strong_count() > 0)
    }

    fn current(&self) -> Option<(Arc<dyn ListenerContext>, Arc<str>)> {
        let slot = self.lock();
        let registration = slot.as_ref()?;
        let listener = registration.listener.upgrade()?;
        Some((listener, Arc::clone(&registration.event_name)))
    }

    /// Forward one SMS to the registered listener, if any.
    ///
    /// Never blocks on the consumer and never fails outward.
    pub fn relay(&self, event: SmsEvent) -> Delivery {
        let Some((listener, event_name)) = self.current() else {
            trace!("no sms listener registered, dropping event");
            return Delivery::Dropped;
        };

        let payload = match serde_json::to_value(&event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "sms event could not be encoded, dropping");
                return Delivery::Dropped;
            }
        };

        debug!(
            event = %event_name,
            sender = %event.sender,
            received_at = ?event.received_at(),
            "relaying inbound sms"
        );

        match catch_unwind(AssertUnwindSafe(|| listener.notify_listeners(&event_name, payload))) {
            Ok(()) => Delivery::Delivered,
            Err(_) => {
                error!(event = %event_name, "sms listener panicked during delivery");
                Delivery::Faulted
            }
        }
    }
}

/// Owner of a host-created listener.
///
/// The slot only holds a weak handle, so a listener built on the native side
/// (with no application object keeping it alive) is parked here between the
/// host's load and unload.
pub struct ListenerAnchor<T> {
    held: Mutex<Option<Arc<T>>>,
}

impl<T> Default for ListenerAnchor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ListenerAnchor<T> {
    pub const fn new() -> Self {
        Self {
            held: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<T>>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: ListenerContext + 'static> ListenerAnchor<T> {
    /// Take ownership of `listener` and install it in `slot`.
    ///
    /// A previously anchored listener is released. Returns `true` if a live
    /// listener was displaced from the slot.
    pub fn attach(&self, slot: &ListenerSlot, listener: T, event_name: &str) -> bool {
        let listener = Arc::new(listener);
        let handle: Arc<dyn ListenerContext> = listener.clone();
        let mut held = self.lock();
        let displaced = slot.install(&handle, event_name);
        *held = Some(listener);
        displaced
    }

    /// Release the anchored listener if `is_owner` accepts it, clearing it
    /// from `slot` unless a newer registration already replaced it.
    pub fn detach_if(&self, slot: &ListenerSlot, is_owner: impl FnOnce(&T) -> bool) -> bool {
        let mut held = self.lock();
        let Some(listener) = held.as_ref() else {
            return false;
        };
        if !is_owner(listener) {
            debug!("detach requested by a listener that is no longer anchored");
            return false;
        }
        let handle: Arc<dyn ListenerContext> = listener.clone();
        slot.clear_if(&handle);
        held.take();
        true
    }

    pub fn is_attached(&self) -> bool {
        self.lock().is_some()
    }
}

/// Process-wide slot used by the native notification path.
static SMS_LISTENER: ListenerSlot = ListenerSlot::new();

/// The process-wide listener slot.
pub fn global_slot() -> &'static ListenerSlot {
    &SMS_LISTENER
}

/// Entry point for the OS SMS broadcast. Fire-and-forget.
pub fn on_sms_received(sender: &str, body: &str, timestamp_millis: i64) {
    let _ = SMS_LISTENER.relay(SmsEvent::new(sender, body, timestamp_millis));
}
