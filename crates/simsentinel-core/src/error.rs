// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for SIM Sentinel.

use thiserror::Error;

/// Top-level error type for all SIM Sentinel operations.
#[derive(Debug, Error)]
pub enum SentinelError {
    // -- Caller-facing rejections --
    /// The minimum viable permission set (SMS + phone state) was not granted.
    /// The payload is the human-readable rejection reason.
    #[error("{0}")]
    PermissionDenied(String),

    /// Every identifier source was exhausted with an unexpected fault.
    #[error("identifier unavailable: {0}")]
    IdentifierUnavailable(String),

    // -- Platform bridge --
    /// The OS refused access to a value even though the call itself worked
    /// (e.g. `SecurityException` from a hardware-ID getter).
    #[error("access denied by platform: {0}")]
    AccessDenied(String),

    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SentinelError {
    /// Whether this error is an expected platform denial rather than a fault.
    ///
    /// Denials make the identifier chain move on to the next source instead
    /// of failing the request.
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::AccessDenied(_) | Self::PlatformUnavailable)
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SentinelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denial_classification() {
        assert!(SentinelError::AccessDenied("getDeviceId".into()).is_denial());
        assert!(SentinelError::PlatformUnavailable.is_denial());
        assert!(!SentinelError::Bridge("jni attach failed".into()).is_denial());
        assert!(!SentinelError::IdentifierUnavailable("x".into()).is_denial());
    }

    #[test]
    fn permission_denied_displays_reason_verbatim() {
        let err = SentinelError::PermissionDenied("Required permissions (SMS, Phone) were denied.".into());
        assert_eq!(err.to_string(), "Required permissions (SMS, Phone) were denied.");
    }
}
