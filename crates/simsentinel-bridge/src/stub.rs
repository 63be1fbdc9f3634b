// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for desktop/CI builds where native mobile APIs are unavailable.
//
// Every fallible method returns `PlatformUnavailable`; the real
// implementation lives in the `android` module.

use simsentinel_core::error::{Result, SentinelError};
use simsentinel_core::types::{GrantState, OsVersion};

use crate::traits::*;

/// No-op bridge returned on non-mobile platforms.
pub struct StubBridge;

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }

    fn os_version(&self) -> Result<OsVersion> {
        tracing::warn!("PlatformBridge::os_version called on stub bridge");
        Err(SentinelError::PlatformUnavailable)
    }
}

impl NativeTelephony for StubBridge {
    fn device_id(&self) -> Result<Option<String>> {
        Err(SentinelError::PlatformUnavailable)
    }
}

impl NativeSecureSettings for StubBridge {
    fn installation_id(&self) -> Result<Option<String>> {
        Err(SentinelError::PlatformUnavailable)
    }
}

impl NativePermissions for StubBridge {
    fn permission_state(&self, _permission: &str) -> Result<GrantState> {
        Err(SentinelError::PlatformUnavailable)
    }

    fn launch_permission_dialog(&self, _permissions: &[&str]) -> Result<()> {
        tracing::warn!("NativePermissions::launch_permission_dialog called on stub bridge");
        Err(SentinelError::PlatformUnavailable)
    }
}
