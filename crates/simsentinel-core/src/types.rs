// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the permission & identity gateway.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform API level (Android `Build.VERSION.SDK_INT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OsVersion(pub u32);

impl std::fmt::Display for OsVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "API {}", self.0)
    }
}

/// Correlates the two halves (prompt + callback) of one permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Groups of OS permissions requested together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionCategory {
    Sms,
    PhoneState,
    Notifications,
}

impl PermissionCategory {
    pub const ALL: [PermissionCategory; 3] = [Self::Sms, Self::PhoneState, Self::Notifications];

    /// Alias the application layer uses for this category.
    pub fn alias(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::PhoneState => "phone",
            Self::Notifications => "notifications",
        }
    }

    /// OS permission strings that must all be granted for the category.
    pub fn os_permissions(&self) -> &'static [&'static str] {
        match self {
            Self::Sms => &[
                "android.permission.READ_SMS",
                "android.permission.RECEIVE_SMS",
            ],
            Self::PhoneState => &["android.permission.READ_PHONE_STATE"],
            Self::Notifications => &["android.permission.POST_NOTIFICATIONS"],
        }
    }

    pub fn from_alias(alias: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.alias() == alias)
    }
}

/// Grant state of a single permission or category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GrantState {
    #[serde(rename = "granted")]
    Granted,
    #[serde(rename = "denied")]
    Denied,
    /// Not yet decided by the user; reported as "prompt" to the app layer.
    #[default]
    #[serde(rename = "prompt")]
    Unknown,
}

impl GrantState {
    /// Fold the states of every OS permission in a category.
    ///
    /// Any denial wins, then any unknown; granted only if all are granted.
    /// An empty input is unknown.
    pub fn combine(states: impl IntoIterator<Item = GrantState>) -> GrantState {
        let mut seen_any = false;
        let mut all_granted = true;
        for state in states {
            seen_any = true;
            match state {
                GrantState::Denied => return GrantState::Denied,
                GrantState::Unknown => all_granted = false,
                GrantState::Granted => {}
            }
        }
        if seen_any && all_granted {
            GrantState::Granted
        } else {
            GrantState::Unknown
        }
    }
}

/// Per-category grant states reported by the host after a permission dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantStates(BTreeMap<PermissionCategory, GrantState>);

impl GrantStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: PermissionCategory, state: GrantState) -> Self {
        self.set(category, state);
        self
    }

    pub fn set(&mut self, category: PermissionCategory, state: GrantState) {
        self.0.insert(category, state);
    }

    /// State of `category`; categories never reported are `Unknown`.
    pub fn get(&self, category: PermissionCategory) -> GrantState {
        self.0.get(&category).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PermissionCategory, GrantState)> + '_ {
        self.0.iter().map(|(c, s)| (*c, *s))
    }
}

impl FromIterator<(PermissionCategory, GrantState)> for GrantStates {
    fn from_iter<I: IntoIterator<Item = (PermissionCategory, GrantState)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Result of evaluating a permission request. Serialized as the caller-facing
/// `{granted, message}` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOutcome {
    pub granted: bool,
    pub message: String,
}

impl PermissionOutcome {
    /// A non-granted outcome becomes `PermissionDenied` carrying the message.
    pub fn into_result(self) -> crate::error::Result<PermissionOutcome> {
        if self.granted {
            Ok(self)
        } else {
            Err(crate::error::SentinelError::PermissionDenied(self.message))
        }
    }
}

/// Provenance of a resolved device identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierSource {
    /// Hardware identifier from telephony (IMEI/MEID).
    #[serde(rename = "IMEI")]
    PrimaryHardwareId,
    /// Identifier scoped to the OS installation (`Settings.Secure.ANDROID_ID`).
    #[serde(rename = "ANDROID_ID")]
    FallbackInstallationId,
}

/// A resolved device identifier. Serialized as the caller-facing
/// `{imei, type}` payload; the key is `imei` whichever source won.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierResult {
    #[serde(rename = "imei")]
    pub value: String,
    #[serde(rename = "type")]
    pub source: IdentifierSource,
}

/// One inbound SMS, serialized as the `{sender, message, timestamp}` event
/// payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsEvent {
    pub sender: String,
    #[serde(rename = "message")]
    pub body: String,
    #[serde(rename = "timestamp")]
    pub received_at_epoch_millis: i64,
}

impl SmsEvent {
    pub fn new(sender: impl Into<String>, body: impl Into<String>, received_at_epoch_millis: i64) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
            received_at_epoch_millis,
        }
    }

    /// Reception time as UTC, if the millisecond value is representable.
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.received_at_epoch_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn category_table() {
        assert_eq!(PermissionCategory::Sms.os_permissions().len(), 2);
        assert_eq!(
            PermissionCategory::PhoneState.os_permissions(),
            &["android.permission.READ_PHONE_STATE"]
        );
        assert_eq!(PermissionCategory::from_alias("phone"), Some(PermissionCategory::PhoneState));
        assert_eq!(PermissionCategory::from_alias("camera"), None);
    }

    #[test]
    fn combine_requires_every_permission() {
        use GrantState::*;
        assert_eq!(GrantState::combine([Granted, Granted]), Granted);
        assert_eq!(GrantState::combine([Granted, Denied]), Denied);
        assert_eq!(GrantState::combine([Unknown, Granted]), Unknown);
        assert_eq!(GrantState::combine([Unknown, Denied]), Denied);
        assert_eq!(GrantState::combine(std::iter::empty::<GrantState>()), Unknown);
    }

    #[test]
    fn unreported_category_is_unknown() {
        let states = GrantStates::new().with(PermissionCategory::Sms, GrantState::Granted);
        assert_eq!(states.get(PermissionCategory::Sms), GrantState::Granted);
        assert_eq!(states.get(PermissionCategory::Notifications), GrantState::Unknown);
    }

    #[test]
    fn identifier_wire_shape() {
        let result = IdentifierResult {
            value: "a1b2c3d4e5f60718".into(),
            source: IdentifierSource::FallbackInstallationId,
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"imei": "a1b2c3d4e5f60718", "type": "ANDROID_ID"})
        );
    }

    #[test]
    fn sms_event_wire_shape_and_time() {
        let event = SmsEvent::new("+1555", "OTP 482913", 1_700_000_000_000);
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"sender": "+1555", "message": "OTP 482913", "timestamp": 1_700_000_000_000i64})
        );
        let at = event.received_at().unwrap();
        assert_eq!(at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn grant_state_wire_names() {
        assert_eq!(serde_json::to_value(GrantState::Unknown).unwrap(), json!("prompt"));
        assert_eq!(serde_json::to_value(GrantState::Granted).unwrap(), json!("granted"));
    }
}
