// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JNI entry points for the plugin lifecycle and the SMS broadcast path.
//
// `SIMSentinelPlugin.load()` calls `nativeLoad(this)`, which wraps the plugin
// object in a `JniListener` and anchors it in the process-wide slot;
// `handleOnDestroy()` calls `nativeUnload(this)`. The app's
// `BroadcastReceiver` for `SMS_RECEIVED` calls the static native method
// `SIMSentinelPlugin.nativeOnSmsReceived(String, String, long)`.
//
// Nothing may propagate back into Java: conversion errors and panics are
// logged and swallowed.

#![cfg(target_os = "android")]

use std::panic::{AssertUnwindSafe, catch_unwind};

use jni::objects::{GlobalRef, JClass, JObject, JString, JValue};
use jni::sys::jlong;
use jni::{JNIEnv, JavaVM};
use simsentinel_core::config::GatewayConfig;

use crate::relay::{self, ListenerAnchor, ListenerContext};

/// Capacitor's JSON object type, constructed from a JSON string.
const JS_OBJECT_CLASS: &str = "com/getcapacitor/JSObject";

/// `Plugin.notifyListeners(String, JSObject)`.
const NOTIFY_LISTENERS_SIG: &str = "(Ljava/lang/String;Lcom/getcapacitor/JSObject;)V";

/// Plugin instance registered by the most recent `nativeLoad`.
static LOADED_PLUGIN: ListenerAnchor<JniListener> = ListenerAnchor::new();

/// Forwards relay events to the Java plugin's `notifyListeners`.
pub struct JniListener {
    vm: JavaVM,
    plugin: GlobalRef,
}

impl JniListener {
    fn new(env: &mut JNIEnv<'_>, plugin: &JObject<'_>) -> jni::errors::Result<Self> {
        Ok(Self {
            vm: env.get_java_vm()?,
            plugin: env.new_global_ref(plugin)?,
        })
    }

    fn is_plugin(&self, env: &mut JNIEnv<'_>, plugin: &JObject<'_>) -> bool {
        env.is_same_object(self.plugin.as_obj(), plugin).unwrap_or(false)
    }

    fn deliver(&self, event: &str, payload: &serde_json::Value) -> jni::errors::Result<()> {
        let mut env = self.vm.attach_current_thread_permanently()?;
        // Delivery may run on a long-lived attached thread; keep its locals scoped.
        let delivered = env.with_local_frame(4, |env| -> jni::errors::Result<()> {
            let j_event = env.new_string(event)?;
            let j_json = env.new_string(payload.to_string())?;
            let data = env.new_object(
                JS_OBJECT_CLASS,
                "(Ljava/lang/String;)V",
                &[JValue::Object(&j_json)],
            )?;
            env.call_method(
                self.plugin.as_obj(),
                "notifyListeners",
                NOTIFY_LISTENERS_SIG,
                &[JValue::Object(&j_event), JValue::Object(&data)],
            )?;
            Ok(())
        });
        if delivered.is_err() && env.exception_check().unwrap_or(false) {
            let _ = env.exception_clear();
        }
        delivered
    }
}

impl ListenerContext for JniListener {
    fn notify_listeners(&self, event: &str, payload: serde_json::Value) {
        if let Err(e) = self.deliver(event, &payload) {
            tracing::warn!(event, error = %e, "event could not be handed to the plugin");
        }
    }
}

fn read_string(env: &mut JNIEnv<'_>, value: &JString<'_>) -> Result<String, String> {
    if value.is_null() {
        return Ok(String::new());
    }
    env.get_string(value)
        .map(Into::into)
        .map_err(|e| format!("get_string: {e}"))
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_simtinel_fraud_SIMSentinelPlugin_nativeLoad<'local>(
    mut env: JNIEnv<'local>,
    plugin: JObject<'local>,
) {
    let outcome = catch_unwind(AssertUnwindSafe(|| -> Result<bool, String> {
        let listener = JniListener::new(&mut env, &plugin).map_err(|e| format!("wrap plugin: {e}"))?;
        let event_name = GatewayConfig::default().sms_event_name;
        Ok(LOADED_PLUGIN.attach(relay::global_slot(), listener, &event_name))
    }));

    match outcome {
        Ok(Ok(displaced)) => tracing::info!(displaced, "sentinel plugin loaded"),
        Ok(Err(e)) => tracing::error!(error = %e, "sentinel plugin could not register for sms events"),
        Err(_) => tracing::error!("sentinel plugin load panicked"),
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_simtinel_fraud_SIMSentinelPlugin_nativeUnload<'local>(
    mut env: JNIEnv<'local>,
    plugin: JObject<'local>,
) {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        LOADED_PLUGIN.detach_if(relay::global_slot(), |listener| listener.is_plugin(&mut env, &plugin))
    }));

    match outcome {
        Ok(cleared) => tracing::info!(cleared, "sentinel plugin unloaded"),
        Err(_) => tracing::error!("sentinel plugin unload panicked"),
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_simtinel_fraud_SIMSentinelPlugin_nativeOnSmsReceived<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    sender: JString<'local>,
    message: JString<'local>,
    timestamp: jlong,
) {
    let outcome = catch_unwind(AssertUnwindSafe(|| -> Result<(), String> {
        let sender = read_string(&mut env, &sender)?;
        let body = read_string(&mut env, &message)?;
        relay::on_sms_received(&sender, &body, timestamp);
        Ok(())
    }));

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "inbound sms could not be read from JNI"),
        Err(_) => tracing::error!("sms relay panicked inside the broadcast receiver"),
    }
}
