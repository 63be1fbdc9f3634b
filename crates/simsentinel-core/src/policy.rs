// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OS-version policy table.
//
// Each row says "from this API level on, this capability changes". Resolution
// code asks the table which capabilities are active instead of comparing
// version numbers itself, so a new threshold is one more row.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::OsVersion;

/// Platform behaviour that switches on at a given OS version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Posting notifications needs a runtime grant (Android 13 / API 33).
    NotificationPermission,
    /// Hardware identifiers are withheld from non-system apps
    /// (Android 10 / API 29).
    HardwareIdRestricted,
}

/// One row of the policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionThreshold {
    /// First OS version at which `capability` applies.
    pub min_os_version: u32,
    pub capability: Capability,
}

/// Declarative threshold → capability table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionPolicy {
    pub thresholds: Vec<VersionThreshold>,
}

/// API level that introduced the `POST_NOTIFICATIONS` runtime permission.
pub const NOTIFICATION_PERMISSION_SDK: u32 = 33;

/// API level that restricted `TelephonyManager.getDeviceId()`.
pub const HARDWARE_ID_RESTRICTION_SDK: u32 = 29;

impl Default for VersionPolicy {
    fn default() -> Self {
        Self {
            thresholds: vec![
                VersionThreshold {
                    min_os_version: HARDWARE_ID_RESTRICTION_SDK,
                    capability: Capability::HardwareIdRestricted,
                },
                VersionThreshold {
                    min_os_version: NOTIFICATION_PERMISSION_SDK,
                    capability: Capability::NotificationPermission,
                },
            ],
        }
    }
}

impl VersionPolicy {
    /// Every capability active at `os`.
    pub fn capabilities_at(&self, os: OsVersion) -> BTreeSet<Capability> {
        self.thresholds
            .iter()
            .filter(|t| os.0 >= t.min_os_version)
            .map(|t| t.capability)
            .collect()
    }

    /// Whether `capability` is active at `os`.
    pub fn has(&self, os: OsVersion, capability: Capability) -> bool {
        self.thresholds
            .iter()
            .any(|t| t.capability == capability && os.0 >= t.min_os_version)
    }
}
