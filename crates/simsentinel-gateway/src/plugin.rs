// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Caller-facing plugin operations.
//
// The host runtime dispatches `checkPermissions`, `requestPermissions` and
// `getIdentifiers` here and calls `permissions_callback` once the OS dialog
// has been answered. Results are settled through `PluginCall`.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use simsentinel_bridge::PlatformBridge;
use simsentinel_core::config::GatewayConfig;
use simsentinel_core::error::{Result, SentinelError};
use simsentinel_core::types::{GrantState, IdentifierResult, OsVersion, PermissionCategory, RequestId};
use tracing::{debug, info, instrument, warn};

use crate::call::PluginCall;
use crate::identifier::resolve_identifier;
use crate::permissions::{evaluate, os_permissions, read_grant_states, resolve_categories};
use crate::relay::{self, ListenerContext, ListenerSlot};

/// A permission request waiting for the OS dialog to be answered.
///
/// The host keeps this until its permission-result callback fires and then
/// passes it to [`SentinelPlugin::permissions_callback`]. Dropping it
/// unanswered rejects the caller, so no request stays pending forever.
pub struct PermissionRequest {
    id: RequestId,
    os_version: OsVersion,
    categories: BTreeSet<PermissionCategory>,
    call: Option<Box<dyn PluginCall>>,
}

impl PermissionRequest {
    fn new(os_version: OsVersion, categories: BTreeSet<PermissionCategory>, call: Box<dyn PluginCall>) -> Self {
        Self {
            id: RequestId::new(),
            os_version,
            categories,
            call: Some(call),
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn os_version(&self) -> OsVersion {
        self.os_version
    }

    /// Categories that were put to the user.
    pub fn categories(&self) -> &BTreeSet<PermissionCategory> {
        &self.categories
    }

    /// OS permission strings that were put to the user.
    pub fn permissions(&self) -> Vec<&'static str> {
        os_permissions(&self.categories)
    }

    fn resolve<T: Serialize>(mut self, data: &T) {
        if let Some(call) = self.call.take() {
            settle(call, data);
        }
    }

    fn reject(mut self, reason: String) {
        if let Some(call) = self.call.take() {
            call.reject(reason);
        }
    }
}

impl Drop for PermissionRequest {
    fn drop(&mut self) {
        if let Some(call) = self.call.take() {
            warn!(request = %self.id, "permission request dropped before the dialog was answered");
            call.reject("permission request abandoned".into());
        }
    }
}

/// Serialize `data` into the call, rejecting if it cannot be encoded.
fn settle<T: Serialize>(call: Box<dyn PluginCall>, data: &T) {
    match serde_json::to_value(data) {
        Ok(value) => call.resolve(value),
        Err(e) => call.reject(SentinelError::from(e).to_string()),
    }
}

/// The gateway as seen by the host plugin runtime.
pub struct SentinelPlugin<B> {
    bridge: B,
    config: GatewayConfig,
    listeners: &'static ListenerSlot,
}

impl<B: PlatformBridge> SentinelPlugin<B> {
    pub fn new(bridge: B, config: GatewayConfig) -> Self {
        Self {
            bridge,
            config,
            listeners: relay::global_slot(),
        }
    }

    /// Use `slot` instead of the process-wide listener slot.
    pub fn with_listener_slot(mut self, slot: &'static ListenerSlot) -> Self {
        self.listeners = slot;
        self
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    // -- Lifecycle ------------------------------------------------------------

    /// Register the host's listener context for inbound SMS events.
    pub fn load(&self, listener: &Arc<dyn ListenerContext>) {
        let displaced = self.listeners.install(listener, &self.config.sms_event_name);
        info!(
            platform = self.bridge.platform_name(),
            displaced, "sentinel plugin loaded"
        );
    }

    /// Unregister `listener`, unless a newer instance already replaced it.
    pub fn unload(&self, listener: &Arc<dyn ListenerContext>) {
        let cleared = self.listeners.clear_if(listener);
        info!(cleared, "sentinel plugin unloaded");
    }

    // -- Permissions ----------------------------------------------------------

    /// Categories applicable to the running OS version.
    pub fn categories(&self) -> Result<(OsVersion, BTreeSet<PermissionCategory>)> {
        let os = self.bridge.os_version()?;
        Ok((os, resolve_categories(&self.config.version_policy, os)))
    }

    /// Resolve with `{alias: "granted" | "denied" | "prompt"}` for each
    /// applicable category.
    #[instrument(skip_all)]
    pub fn check_permissions(&self, call: Box<dyn PluginCall>) {
        let states = self
            .categories()
            .and_then(|(_, categories)| read_grant_states(&self.bridge, &categories));

        match states {
            Ok(states) => {
                let by_alias: serde_json::Map<String, serde_json::Value> = states
                    .iter()
                    .map(|(c, s)| (c.alias().to_string(), grant_state_value(s)))
                    .collect();
                call.resolve(serde_json::Value::Object(by_alias));
            }
            Err(e) => call.reject(e.to_string()),
        }
    }

    /// Ask for the permission set of the running OS version.
    ///
    /// Returns the pending request when the OS dialog was shown; the host
    /// must hand it back through [`Self::permissions_callback`]. Returns
    /// `None` when the call has already been settled: every permission was
    /// granted beforehand, or the dialog could not be shown.
    #[instrument(skip_all)]
    pub fn request_permissions(&self, call: Box<dyn PluginCall>) -> Option<PermissionRequest> {
        let (os, categories) = match self.categories() {
            Ok(resolved) => resolved,
            Err(e) => {
                call.reject(e.to_string());
                return None;
            }
        };
        let request = PermissionRequest::new(os, categories, call);
        let permissions = request.permissions();

        let already_granted = permissions
            .iter()
            .all(|p| matches!(self.bridge.permission_state(p), Ok(GrantState::Granted)));
        if already_granted {
            debug!(request = %request.id, "all permissions already granted, skipping dialog");
            self.permissions_callback(request);
            return None;
        }

        match self.bridge.launch_permission_dialog(&permissions) {
            Ok(()) => {
                info!(request = %request.id, %os, ?permissions, "permission dialog shown");
                Some(request)
            }
            Err(e) => {
                warn!(request = %request.id, error = %e, "permission dialog could not be shown");
                request.reject(e.to_string());
                None
            }
        }
    }

    /// Settle `request` from the current grant states.
    ///
    /// Resolves with `{granted: true, message}` when SMS and phone state are
    /// granted; rejects with the denial message otherwise.
    #[instrument(skip_all, fields(request = %request.id))]
    pub fn permissions_callback(&self, request: PermissionRequest) {
        let states = match read_grant_states(&self.bridge, &request.categories) {
            Ok(states) => states,
            Err(e) => {
                warn!(error = %e, "could not read grant states");
                request.reject(e.to_string());
                return;
            }
        };

        match evaluate(&states, &self.config).into_result() {
            Ok(outcome) => {
                info!("required permissions granted");
                request.resolve(&outcome);
            }
            Err(e) => {
                info!("required permissions denied");
                request.reject(e.to_string());
            }
        }
    }

    // -- Identifiers ----------------------------------------------------------

    /// Resolve the device identifier for the running OS version.
    pub fn resolve_identifiers(&self) -> Result<IdentifierResult> {
        let os = self
            .bridge
            .os_version()
            .map_err(|e| SentinelError::IdentifierUnavailable(e.to_string()))?;
        resolve_identifier(&self.config.version_policy, os, &self.bridge)
    }

    /// Resolve with `{imei, type}` or reject with the underlying fault.
    #[instrument(skip_all)]
    pub fn get_identifiers(&self, call: Box<dyn PluginCall>) {
        match self.resolve_identifiers() {
            Ok(result) => settle(call, &result),
            Err(e) => {
                let detail = match e {
                    SentinelError::IdentifierUnavailable(detail) => detail,
                    other => other.to_string(),
                };
                call.reject(format!("{}{detail}", self.config.identifier_failure_prefix));
            }
        }
    }
}

fn grant_state_value(state: GrantState) -> serde_json::Value {
    serde_json::to_value(state).unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::channel_call;
    use crate::testing::{RecordingListener, SimulatedDevice, SourceBehavior};
    use serde_json::json;
    use simsentinel_core::types::SmsEvent;

    fn private_slot() -> &'static ListenerSlot {
        Box::leak(Box::new(ListenerSlot::new()))
    }

    fn plugin(device: SimulatedDevice) -> SentinelPlugin<SimulatedDevice> {
        SentinelPlugin::new(device, GatewayConfig::default()).with_listener_slot(private_slot())
    }

    #[tokio::test]
    async fn dialog_then_callback_resolves() {
        let plugin = plugin(SimulatedDevice::new(34));
        let (call, pending) = channel_call();

        let request = plugin.request_permissions(call).expect("dialog shown");
        assert_eq!(request.categories().len(), 3);
        assert_eq!(plugin.bridge().dialogs().len(), 1);

        plugin.bridge().answer_all(GrantState::Granted);
        plugin.permissions_callback(request);

        assert_eq!(
            pending.wait().await,
            Ok(json!({"granted": true, "message": "All required permissions granted"}))
        );
    }

    #[tokio::test]
    async fn denied_phone_rejects_with_reason() {
        let plugin = plugin(SimulatedDevice::new(30));
        let (call, pending) = channel_call();

        let request = plugin.request_permissions(call).expect("dialog shown");
        assert!(!request.categories().contains(&PermissionCategory::Notifications));

        plugin.bridge().answer("android.permission.READ_SMS", GrantState::Granted);
        plugin.bridge().answer("android.permission.RECEIVE_SMS", GrantState::Granted);
        plugin.bridge().answer("android.permission.READ_PHONE_STATE", GrantState::Denied);
        plugin.permissions_callback(request);

        assert_eq!(
            pending.wait().await,
            Err("Required permissions (SMS, Phone) were denied.".to_string())
        );
    }

    #[tokio::test]
    async fn denied_notifications_do_not_matter() {
        let plugin = plugin(SimulatedDevice::new(33));
        let (call, pending) = channel_call();

        let request = plugin.request_permissions(call).expect("dialog shown");
        plugin.bridge().answer_all(GrantState::Granted);
        plugin.bridge().answer("android.permission.POST_NOTIFICATIONS", GrantState::Denied);
        plugin.permissions_callback(request);

        assert!(pending.wait().await.is_ok());
    }

    #[tokio::test]
    async fn already_granted_skips_dialog() {
        let device = SimulatedDevice::new(29);
        device.answer_all(GrantState::Granted);
        let plugin = plugin(device);
        let (call, pending) = channel_call();

        assert!(plugin.request_permissions(call).is_none());
        assert!(plugin.bridge().dialogs().is_empty());
        assert!(pending.wait().await.is_ok());
    }

    #[tokio::test]
    async fn dropped_request_rejects() {
        let plugin = plugin(SimulatedDevice::new(31));
        let (call, pending) = channel_call();

        let request = plugin.request_permissions(call).expect("dialog shown");
        drop(request);

        assert_eq!(pending.wait().await, Err("permission request abandoned".to_string()));
    }

    #[test]
    fn check_permissions_reports_by_alias() {
        let device = SimulatedDevice::new(33);
        device.answer("android.permission.READ_SMS", GrantState::Granted);
        device.answer("android.permission.RECEIVE_SMS", GrantState::Granted);
        device.answer("android.permission.READ_PHONE_STATE", GrantState::Denied);
        let plugin = plugin(device);
        let (call, mut pending) = channel_call();

        plugin.check_permissions(call);

        assert_eq!(
            pending.try_result(),
            Some(Ok(json!({"sms": "granted", "phone": "denied", "notifications": "prompt"})))
        );
    }

    #[test]
    fn identifiers_payload_shapes() {
        let legacy = plugin(
            SimulatedDevice::new(28)
                .with_device_id(SourceBehavior::Value("123456789012345".into()))
                .with_installation_id(SourceBehavior::Value("9774d56d682e549c".into())),
        );
        let (call, mut pending) = channel_call();
        legacy.get_identifiers(call);
        assert_eq!(
            pending.try_result(),
            Some(Ok(json!({"imei": "123456789012345", "type": "IMEI"})))
        );

        let modern = plugin(
            SimulatedDevice::new(34)
                .with_device_id(SourceBehavior::Denied)
                .with_installation_id(SourceBehavior::Value("9774d56d682e549c".into())),
        );
        let (call, mut pending) = channel_call();
        modern.get_identifiers(call);
        assert_eq!(
            pending.try_result(),
            Some(Ok(json!({"imei": "9774d56d682e549c", "type": "ANDROID_ID"})))
        );
    }

    #[test]
    fn unset_installation_id_still_resolves() {
        let plugin = plugin(
            SimulatedDevice::new(31)
                .with_device_id(SourceBehavior::Empty)
                .with_installation_id(SourceBehavior::Empty),
        );
        let (call, mut pending) = channel_call();
        plugin.get_identifiers(call);
        assert_eq!(
            pending.try_result(),
            Some(Ok(json!({"imei": "", "type": "ANDROID_ID"})))
        );
    }

    #[test]
    fn identifier_fault_is_prefixed() {
        let plugin = plugin(
            SimulatedDevice::new(31).with_installation_id(SourceBehavior::Fault("resolver died".into())),
        );
        let (call, mut pending) = channel_call();
        plugin.get_identifiers(call);

        match pending.try_result() {
            Some(Err(reason)) => {
                assert!(reason.starts_with("Failed to retrieve identifiers: "), "{reason}");
                assert!(reason.contains("resolver died"), "{reason}");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn off_device_bridge_rejects_everything() {
        let plugin = SentinelPlugin::new(simsentinel_bridge::platform_bridge(), GatewayConfig::default())
            .with_listener_slot(private_slot());

        let (call, mut pending) = channel_call();
        plugin.get_identifiers(call);
        assert_eq!(
            pending.try_result(),
            Some(Err(
                "Failed to retrieve identifiers: feature not available on this platform".to_string()
            ))
        );

        let (call, mut pending) = channel_call();
        assert!(plugin.request_permissions(call).is_none());
        assert!(matches!(pending.try_result(), Some(Err(_))));
    }

    #[test]
    fn load_and_unload_drive_the_slot() {
        let slot = private_slot();
        let plugin = SentinelPlugin::new(SimulatedDevice::new(34), GatewayConfig::default())
            .with_listener_slot(slot);
        let recorder = Arc::new(RecordingListener::default());
        let listener: Arc<dyn ListenerContext> = recorder.clone();

        assert_eq!(slot.relay(SmsEvent::new("+1555", "early", 1)), relay::Delivery::Dropped);

        plugin.load(&listener);
        assert_eq!(slot.relay(SmsEvent::new("+1555", "OTP 482913", 2)), relay::Delivery::Delivered);

        plugin.unload(&listener);
        assert_eq!(slot.relay(SmsEvent::new("+1555", "late", 3)), relay::Delivery::Dropped);

        let events = recorder.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].1["message"], "OTP 482913");
    }
}
