// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Permission set resolution and grant evaluation.
//
// SMS and phone state are the minimum viable set. Notifications are asked for
// on OS versions that gate them at runtime, but never decide the outcome.

use std::collections::BTreeSet;

use simsentinel_bridge::NativePermissions;
use simsentinel_core::config::GatewayConfig;
use simsentinel_core::error::Result;
use simsentinel_core::policy::{Capability, VersionPolicy};
use simsentinel_core::types::{GrantState, GrantStates, OsVersion, PermissionCategory, PermissionOutcome};
use tracing::debug;

/// Categories that must be granted for a request to succeed.
pub const REQUIRED: [PermissionCategory; 2] = [PermissionCategory::Sms, PermissionCategory::PhoneState];

/// Categories to request at `os`.
pub fn resolve_categories(policy: &VersionPolicy, os: OsVersion) -> BTreeSet<PermissionCategory> {
    let mut categories = BTreeSet::from(REQUIRED);
    if policy.has(os, Capability::NotificationPermission) {
        categories.insert(PermissionCategory::Notifications);
    }
    categories
}

/// Every OS permission string behind `categories`, in category order.
pub fn os_permissions(categories: &BTreeSet<PermissionCategory>) -> Vec<&'static str> {
    categories
        .iter()
        .flat_map(|c| c.os_permissions().iter().copied())
        .collect()
}

/// Decide whether the minimum viable set was granted.
///
/// Pure: the same grant states always give the same outcome.
pub fn evaluate(states: &GrantStates, config: &GatewayConfig) -> PermissionOutcome {
    let granted = REQUIRED
        .iter()
        .all(|c| states.get(*c) == GrantState::Granted);

    debug!(
        granted,
        sms = ?states.get(PermissionCategory::Sms),
        phone = ?states.get(PermissionCategory::PhoneState),
        notifications = ?states.get(PermissionCategory::Notifications),
        "permission grants evaluated"
    );

    let message = if granted {
        config.granted_message.clone()
    } else {
        config.denied_message.clone()
    };
    PermissionOutcome { granted, message }
}

/// Read the current grant state of each category from the platform.
pub fn read_grant_states<P>(bridge: &P, categories: &BTreeSet<PermissionCategory>) -> Result<GrantStates>
where
    P: NativePermissions + ?Sized,
{
    let mut states = GrantStates::new();
    for category in categories {
        let per_permission = category
            .os_permissions()
            .iter()
            .map(|p| bridge.permission_state(p))
            .collect::<Result<Vec<_>>>()?;
        states.set(*category, GrantState::combine(per_permission));
    }
    Ok(states)
}
