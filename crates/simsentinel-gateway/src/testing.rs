// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process stand-ins for the device and the host listener.
//
// `SimulatedDevice` implements the full bridge from a scripted description,
// so the gateway can run in unit tests and on desktop without an ART
// runtime. `RecordingListener` captures relayed events.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use simsentinel_bridge::{NativePermissions, NativeSecureSettings, NativeTelephony, PlatformBridge};
use simsentinel_core::error::{Result, SentinelError};
use simsentinel_core::types::{GrantState, OsVersion, PermissionCategory, SmsEvent};

use crate::relay::ListenerContext;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How a simulated identifier source answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceBehavior {
    Value(String),
    /// The source exists but reports no value.
    Empty,
    /// The OS refuses the caller (`SecurityException`).
    Denied,
    /// An unexpected runtime fault.
    Fault(String),
}

impl SourceBehavior {
    fn answer(&self) -> Result<Option<String>> {
        match self {
            Self::Value(v) => Ok(Some(v.clone())),
            Self::Empty => Ok(None),
            Self::Denied => Err(SentinelError::AccessDenied("caller lacks privileged access".into())),
            Self::Fault(detail) => Err(SentinelError::Bridge(detail.clone())),
        }
    }
}

/// Serializable description of a simulated device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceScenario {
    pub os_version: u32,
    pub device_id: SourceBehavior,
    pub installation_id: SourceBehavior,
    /// Permission strings granted before any dialog is shown.
    pub pre_granted: Vec<String>,
    /// How the user answers the dialog, per permission string. Permissions
    /// not listed stay undecided.
    pub dialog_answers: BTreeMap<String, GrantState>,
    /// Inbound messages to replay through the relay.
    pub inbound_sms: Vec<SmsEvent>,
}

impl Default for DeviceScenario {
    fn default() -> Self {
        Self {
            os_version: 34,
            device_id: SourceBehavior::Denied,
            installation_id: SourceBehavior::Value("9774d56d682e549c".into()),
            pre_granted: Vec::new(),
            dialog_answers: BTreeMap::new(),
            inbound_sms: Vec::new(),
        }
    }
}

/// A scripted device implementing every bridge trait.
pub struct SimulatedDevice {
    os_version: u32,
    device_id: SourceBehavior,
    installation_id: SourceBehavior,
    grants: Mutex<BTreeMap<String, GrantState>>,
    dialog_answers: BTreeMap<String, GrantState>,
    dialogs: Mutex<Vec<Vec<String>>>,
    device_id_queries: AtomicUsize,
}

impl SimulatedDevice {
    /// A device at `os_version` with no identifiers and nothing granted.
    pub fn new(os_version: u32) -> Self {
        Self {
            os_version,
            device_id: SourceBehavior::Empty,
            installation_id: SourceBehavior::Empty,
            grants: Mutex::new(BTreeMap::new()),
            dialog_answers: BTreeMap::new(),
            dialogs: Mutex::new(Vec::new()),
            device_id_queries: AtomicUsize::new(0),
        }
    }

    pub fn from_scenario(scenario: &DeviceScenario) -> Self {
        let device = Self::new(scenario.os_version)
            .with_device_id(scenario.device_id.clone())
            .with_installation_id(scenario.installation_id.clone())
            .with_dialog_answers(scenario.dialog_answers.clone());
        for permission in &scenario.pre_granted {
            device.answer(permission, GrantState::Granted);
        }
        device
    }

    pub fn with_device_id(mut self, behavior: SourceBehavior) -> Self {
        self.device_id = behavior;
        self
    }

    pub fn with_installation_id(mut self, behavior: SourceBehavior) -> Self {
        self.installation_id = behavior;
        self
    }

    /// Answers applied automatically whenever a dialog is launched.
    pub fn with_dialog_answers(mut self, answers: BTreeMap<String, GrantState>) -> Self {
        self.dialog_answers = answers;
        self
    }

    /// Set the state of one permission string.
    pub fn answer(&self, permission: &str, state: GrantState) {
        lock(&self.grants).insert(permission.to_string(), state);
    }

    /// Set every known permission string to `state`.
    pub fn answer_all(&self, state: GrantState) {
        let mut grants = lock(&self.grants);
        for category in PermissionCategory::ALL {
            for permission in category.os_permissions() {
                grants.insert((*permission).to_string(), state);
            }
        }
    }

    /// Permission lists of every dialog launched so far.
    pub fn dialogs(&self) -> Vec<Vec<String>> {
        lock(&self.dialogs).clone()
    }

    /// How many times the hardware-ID source was queried.
    pub fn device_id_queries(&self) -> usize {
        self.device_id_queries.load(Ordering::SeqCst)
    }
}

impl PlatformBridge for SimulatedDevice {
    fn platform_name(&self) -> &str {
        "Simulated"
    }

    fn os_version(&self) -> Result<OsVersion> {
        Ok(OsVersion(self.os_version))
    }
}

impl NativeTelephony for SimulatedDevice {
    fn device_id(&self) -> Result<Option<String>> {
        self.device_id_queries.fetch_add(1, Ordering::SeqCst);
        self.device_id.answer()
    }
}

impl NativeSecureSettings for SimulatedDevice {
    fn installation_id(&self) -> Result<Option<String>> {
        self.installation_id.answer()
    }
}

impl NativePermissions for SimulatedDevice {
    fn permission_state(&self, permission: &str) -> Result<GrantState> {
        Ok(lock(&self.grants).get(permission).copied().unwrap_or_default())
    }

    fn launch_permission_dialog(&self, permissions: &[&str]) -> Result<()> {
        lock(&self.dialogs).push(permissions.iter().map(|p| p.to_string()).collect());
        let mut grants = lock(&self.grants);
        for permission in permissions {
            if let Some(state) = self.dialog_answers.get(*permission) {
                grants.insert((*permission).to_string(), *state);
            }
        }
        Ok(())
    }
}

/// Listener that keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<(String, serde_json::Value)> {
        lock(&self.events).clone()
    }
}

impl ListenerContext for RecordingListener {
    fn notify_listeners(&self, event: &str, payload: serde_json::Value) {
        lock(&self.events).push((event.to_string(), payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_json_round_trips_into_device() {
        let json = r#"{
            "os_version": 28,
            "device_id": {"value": "123456789012345"},
            "installation_id": "empty",
            "pre_granted": ["android.permission.READ_SMS"],
            "dialog_answers": {"android.permission.READ_PHONE_STATE": "denied"}
        }"#;
        let scenario: DeviceScenario = serde_json::from_str(json).unwrap();
        let device = SimulatedDevice::from_scenario(&scenario);

        assert_eq!(device.os_version().unwrap(), OsVersion(28));
        assert_eq!(device.device_id().unwrap().as_deref(), Some("123456789012345"));
        assert_eq!(device.installation_id().unwrap(), None);
        assert_eq!(
            device.permission_state("android.permission.READ_SMS").unwrap(),
            GrantState::Granted
        );

        device
            .launch_permission_dialog(&["android.permission.READ_PHONE_STATE"])
            .unwrap();
        assert_eq!(
            device.permission_state("android.permission.READ_PHONE_STATE").unwrap(),
            GrantState::Denied
        );
        assert_eq!(device.dialogs().len(), 1);
    }
}
