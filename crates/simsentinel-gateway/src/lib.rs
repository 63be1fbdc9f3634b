// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SIM Sentinel gateway. Sits between the OS privacy-gated subsystems and the
// application shell.
//
// - `permissions`: which categories to ask for, and whether the answer is enough.
// - `identifier`: hardware ID first where the OS still allows it, install ID otherwise.
// - `relay`: single-slot forwarding of inbound SMS to the registered listener.
// - `plugin`: caller-facing operations settled through `PluginCall`.

pub mod call;
pub mod identifier;
pub mod permissions;
pub mod plugin;
pub mod relay;
pub mod testing;

#[cfg(target_os = "android")]
pub mod android;

pub use call::{CallResult, ChannelCall, PendingCall, PluginCall, channel_call};
pub use identifier::resolve_identifier;
pub use permissions::{evaluate, resolve_categories};
pub use plugin::{PermissionRequest, SentinelPlugin};
pub use relay::{Delivery, ListenerAnchor, ListenerContext, ListenerSlot, on_sms_received};
