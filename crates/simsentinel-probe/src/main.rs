// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SIM Sentinel probe
//
// Runs the gateway's caller-facing operations against a simulated device and
// prints every result as JSON.
//
//   simsentinel-probe [scenario.json] [gateway.json]

use std::sync::Arc;

use simsentinel_core::GatewayConfig;
use simsentinel_gateway::testing::{DeviceScenario, SimulatedDevice};
use simsentinel_gateway::{CallResult, ListenerContext, SentinelPlugin, channel_call, on_sms_received};

/// Prints relayed events to stdout.
struct StdoutListener;

impl ListenerContext for StdoutListener {
    fn notify_listeners(&self, event: &str, payload: serde_json::Value) {
        println!("{}", serde_json::json!({ "event": event, "payload": payload }));
    }
}

fn print_result(operation: &str, result: CallResult) {
    let line = match result {
        Ok(data) => serde_json::json!({ "operation": operation, "resolved": data }),
        Err(reason) => serde_json::json!({ "operation": operation, "rejected": reason }),
    };
    println!("{line}");
}

fn load_scenario(path: Option<&str>) -> Result<DeviceScenario, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let data = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&data)?)
        }
        None => Ok(DeviceScenario::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let scenario = load_scenario(args.first().map(String::as_str))?;
    let config = match args.get(1) {
        Some(path) => GatewayConfig::load(path)?,
        None => GatewayConfig::default(),
    };

    tracing::info!(os_version = scenario.os_version, "SIM Sentinel probe starting");

    let plugin = SentinelPlugin::new(SimulatedDevice::from_scenario(&scenario), config);
    let listener: Arc<dyn ListenerContext> = Arc::new(StdoutListener);
    plugin.load(&listener);

    let (call, pending) = channel_call();
    plugin.check_permissions(call);
    print_result("checkPermissions", pending.wait().await);

    let (call, pending) = channel_call();
    if let Some(request) = plugin.request_permissions(call) {
        // The simulated user answered while the dialog was "shown".
        plugin.permissions_callback(request);
    }
    print_result("requestPermissions", pending.wait().await);

    let (call, pending) = channel_call();
    plugin.get_identifiers(call);
    print_result("getIdentifiers", pending.wait().await);

    for sms in &scenario.inbound_sms {
        on_sms_received(&sms.sender, &sms.body, sms.received_at_epoch_millis);
    }

    plugin.unload(&listener);
    Ok(())
}
