// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end flow through the process-wide listener slot. Kept to a single
// test so nothing else in this binary touches the global slot concurrently.

use std::sync::Arc;

use serde_json::json;
use simsentinel_core::GatewayConfig;
use simsentinel_core::types::GrantState;
use simsentinel_gateway::testing::{RecordingListener, SimulatedDevice, SourceBehavior};
use simsentinel_gateway::{ListenerContext, SentinelPlugin, channel_call, on_sms_received};

#[tokio::test]
async fn full_session_against_simulated_device() {
    // Before any plugin loads, SMS events vanish without error.
    on_sms_received("+1555", "OTP 000000", 1_699_999_999_000);

    let device = SimulatedDevice::new(28)
        .with_device_id(SourceBehavior::Value("123456789012345".into()))
        .with_installation_id(SourceBehavior::Value("9774d56d682e549c".into()));
    let plugin = SentinelPlugin::new(device, GatewayConfig::default());

    let recorder = Arc::new(RecordingListener::default());
    let listener: Arc<dyn ListenerContext> = recorder.clone();
    plugin.load(&listener);

    // Permissions: dialog, user grants everything, host fires the callback.
    let (call, pending) = channel_call();
    let request = plugin.request_permissions(call).expect("dialog shown");
    assert_eq!(plugin.bridge().dialogs()[0].len(), 3);
    plugin.bridge().answer_all(GrantState::Granted);
    plugin.permissions_callback(request);
    assert_eq!(
        pending.wait().await,
        Ok(json!({"granted": true, "message": "All required permissions granted"}))
    );

    // Identifiers: below the restriction threshold the hardware ID wins.
    let (call, pending) = channel_call();
    plugin.get_identifiers(call);
    assert_eq!(
        pending.wait().await,
        Ok(json!({"imei": "123456789012345", "type": "IMEI"}))
    );

    // SMS relay reaches the registered listener exactly once.
    on_sms_received("+1555", "OTP 482913", 1_700_000_000_000);
    let events = recorder.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, "smsReceived");
    assert_eq!(
        events[0].1,
        json!({"sender": "+1555", "message": "OTP 482913", "timestamp": 1_700_000_000_000i64})
    );

    plugin.unload(&listener);
    on_sms_received("+1555", "OTP 111111", 1_700_000_001_000);
    assert_eq!(recorder.events().len(), 1);
}
