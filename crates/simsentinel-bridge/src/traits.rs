// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the native capabilities the
// gateway needs.

use simsentinel_core::error::Result;
use simsentinel_core::types::{GrantState, OsVersion};

/// Unified bridge that groups all native capabilities.
pub trait PlatformBridge:
    NativeTelephony + NativeSecureSettings + NativePermissions + Send + Sync
{
    /// Human-readable platform name (e.g. "Android").
    fn platform_name(&self) -> &str;

    /// Running OS API level. Fixed for the lifetime of the process.
    fn os_version(&self) -> Result<OsVersion>;
}

/// Hardware identity from the telephony stack.
pub trait NativeTelephony {
    /// Device hardware identifier (IMEI/MEID).
    ///
    /// Returns `Ok(None)` when the stack reports no value and
    /// `Err(AccessDenied)` when the OS refuses the caller.
    fn device_id(&self) -> Result<Option<String>>;
}

/// Identifiers kept in the OS secure settings store.
pub trait NativeSecureSettings {
    /// Identifier stable for one OS installation (`ANDROID_ID`).
    fn installation_id(&self) -> Result<Option<String>>;
}

/// Runtime permission checks and the OS permission dialog.
pub trait NativePermissions {
    /// Current grant state of one OS permission string.
    fn permission_state(&self, permission: &str) -> Result<GrantState>;

    /// Show the OS permission dialog for `permissions`.
    ///
    /// Returns once the dialog has been dispatched. The user's answer comes
    /// back later through the host's permission-result callback.
    fn launch_permission_dialog(&self, permissions: &[&str]) -> Result<()>;
}

impl<T: PlatformBridge + ?Sized> PlatformBridge for Box<T> {
    fn platform_name(&self) -> &str {
        (**self).platform_name()
    }

    fn os_version(&self) -> Result<OsVersion> {
        (**self).os_version()
    }
}

impl<T: NativeTelephony + ?Sized> NativeTelephony for Box<T> {
    fn device_id(&self) -> Result<Option<String>> {
        (**self).device_id()
    }
}

impl<T: NativeSecureSettings + ?Sized> NativeSecureSettings for Box<T> {
    fn installation_id(&self) -> Result<Option<String>> {
        (**self).installation_id()
    }
}

impl<T: NativePermissions + ?Sized> NativePermissions for Box<T> {
    fn permission_state(&self, permission: &str) -> Result<GrantState> {
        (**self).permission_state(permission)
    }

    fn launch_permission_dialog(&self, permissions: &[&str]) -> Result<()> {
        (**self).launch_permission_dialog(permissions)
    }
}
