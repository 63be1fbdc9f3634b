// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device identifier resolution chain.
//
// 1. Hardware ID, only below the restriction threshold and only if non-empty.
// 2. Installation ID otherwise.
//
// From API 29 the OS withholds the hardware ID from ordinary apps even when
// READ_PHONE_STATE is granted, so a denied or empty primary is not an error;
// the chain just moves on. Only a fault in the last source fails the call; an
// unset installation ID resolves with an empty value rather than an error.
// Nothing is cached: every call queries the sources again.

use simsentinel_bridge::{NativeSecureSettings, NativeTelephony};
use simsentinel_core::error::{Result, SentinelError};
use simsentinel_core::policy::{Capability, VersionPolicy};
use simsentinel_core::types::{IdentifierResult, IdentifierSource, OsVersion};
use tracing::{debug, info, warn};

/// Resolve the best available identifier for this device at `os`.
pub fn resolve_identifier<S>(policy: &VersionPolicy, os: OsVersion, sources: &S) -> Result<IdentifierResult>
where
    S: NativeTelephony + NativeSecureSettings + ?Sized,
{
    if policy.has(os, Capability::HardwareIdRestricted) {
        debug!(%os, "hardware id restricted on this OS version, skipping");
    } else {
        match sources.device_id() {
            Ok(Some(value)) if !value.is_empty() => {
                info!(%os, "resolved hardware identifier");
                return Ok(IdentifierResult {
                    value,
                    source: IdentifierSource::PrimaryHardwareId,
                });
            }
            Ok(_) => debug!(%os, "hardware id source returned no value"),
            Err(e) if e.is_denial() => debug!(%os, error = %e, "hardware id denied"),
            Err(e) => warn!(%os, error = %e, "hardware id source faulted, using installation id"),
        }
    }

    match sources.installation_id() {
        Ok(value) => {
            let value = value.unwrap_or_default();
            if value.is_empty() {
                warn!(%os, "installation identifier is not set, resolving empty");
            } else {
                info!(%os, "resolved installation identifier");
            }
            Ok(IdentifierResult {
                value,
                source: IdentifierSource::FallbackInstallationId,
            })
        }
        Err(e) => {
            warn!(%os, error = %e, "installation id source faulted");
            Err(SentinelError::IdentifierUnavailable(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SimulatedDevice, SourceBehavior};

    const IMEI: &str = "123456789012345";
    const ANDROID_ID: &str = "9774d56d682e549c";

    fn device(os: u32, primary: SourceBehavior, fallback: SourceBehavior) -> SimulatedDevice {
        SimulatedDevice::new(os)
            .with_device_id(primary)
            .with_installation_id(fallback)
    }

    #[test]
    fn hardware_id_below_threshold() {
        let dev = device(28, SourceBehavior::Value(IMEI.into()), SourceBehavior::Value(ANDROID_ID.into()));
        let result = resolve_identifier(&VersionPolicy::default(), OsVersion(28), &dev).unwrap();
        assert_eq!(result.value, IMEI);
        assert_eq!(result.source, IdentifierSource::PrimaryHardwareId);
    }

    #[test]
    fn restricted_versions_never_touch_primary() {
        let dev = device(30, SourceBehavior::Value(IMEI.into()), SourceBehavior::Value(ANDROID_ID.into()));
        let result = resolve_identifier(&VersionPolicy::default(), OsVersion(30), &dev).unwrap();
        assert_eq!(result.value, ANDROID_ID);
        assert_eq!(result.source, IdentifierSource::FallbackInstallationId);
        assert_eq!(dev.device_id_queries(), 0);
    }

    #[test]
    fn empty_primary_falls_through() {
        let dev = device(28, SourceBehavior::Empty, SourceBehavior::Value(ANDROID_ID.into()));
        let result = resolve_identifier(&VersionPolicy::default(), OsVersion(28), &dev).unwrap();
        assert_eq!(result.source, IdentifierSource::FallbackInstallationId);
        assert_eq!(dev.device_id_queries(), 1);

        let blank = device(28, SourceBehavior::Value(String::new()), SourceBehavior::Value(ANDROID_ID.into()));
        let result = resolve_identifier(&VersionPolicy::default(), OsVersion(28), &blank).unwrap();
        assert_eq!(result.source, IdentifierSource::FallbackInstallationId);
    }

    #[test]
    fn denied_or_faulty_primary_falls_through() {
        for primary in [
            SourceBehavior::Denied,
            SourceBehavior::Fault("TelephonyManager missing".into()),
        ] {
            let dev = device(27, primary, SourceBehavior::Value(ANDROID_ID.into()));
            let result = resolve_identifier(&VersionPolicy::default(), OsVersion(27), &dev).unwrap();
            assert_eq!(result.value, ANDROID_ID);
        }
    }

    #[test]
    fn fallback_fault_is_reported() {
        let dev = device(31, SourceBehavior::Empty, SourceBehavior::Fault("content resolver gone".into()));
        match resolve_identifier(&VersionPolicy::default(), OsVersion(31), &dev) {
            Err(SentinelError::IdentifierUnavailable(detail)) => {
                assert!(detail.contains("content resolver gone"), "{detail}");
            }
            other => panic!("expected IdentifierUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn absent_installation_id_resolves_empty() {
        for fallback in [SourceBehavior::Empty, SourceBehavior::Value(String::new())] {
            let dev = device(30, SourceBehavior::Empty, fallback);
            let result = resolve_identifier(&VersionPolicy::default(), OsVersion(30), &dev).unwrap();
            assert_eq!(result.value, "");
            assert_eq!(result.source, IdentifierSource::FallbackInstallationId);
        }

        // Below the threshold an empty primary still ends on the empty fallback.
        let dev = device(28, SourceBehavior::Empty, SourceBehavior::Empty);
        let result = resolve_identifier(&VersionPolicy::default(), OsVersion(28), &dev).unwrap();
        assert_eq!(result.source, IdentifierSource::FallbackInstallationId);
        assert_eq!(dev.device_id_queries(), 1);
    }

    #[test]
    fn every_call_requeries() {
        let dev = device(28, SourceBehavior::Value(IMEI.into()), SourceBehavior::Value(ANDROID_ID.into()));
        let policy = VersionPolicy::default();
        resolve_identifier(&policy, OsVersion(28), &dev).unwrap();
        resolve_identifier(&policy, OsVersion(28), &dev).unwrap();
        assert_eq!(dev.device_id_queries(), 2);
    }
}
