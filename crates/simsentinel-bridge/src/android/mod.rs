// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android platform bridge via JNI.
//
// Requires the Android NDK and targets `aarch64-linux-android` or
// `armv7-linux-androideabi`. Each trait method calls the corresponding
// Android SDK API through JNI into the ART runtime.
//
// ## Architecture notes
//
// Reads (SDK level, telephony, secure settings, permission checks) complete
// synchronously. The permission dialog is launched through
// `ActivityCompat.requestPermissions`; the user's answer arrives in the host
// Activity's `onRequestPermissionsResult` with request code
// [`REQUEST_PERMISSIONS`], which must hand the pending request back to the
// gateway.

#![cfg(target_os = "android")]

use std::sync::OnceLock;

use jni::objects::{JObject, JString, JThrowable, JValue};
use jni::sys::jsize;
use jni::{JNIEnv, JavaVM};

use simsentinel_core::error::{Result, SentinelError};
use simsentinel_core::types::{GrantState, OsVersion};

use crate::traits::*;

// ---------------------------------------------------------------------------
// JNI bootstrap helpers
// ---------------------------------------------------------------------------

/// Request code for `ActivityCompat.requestPermissions`. The host Activity
/// must recognise it in `onRequestPermissionsResult`.
pub const REQUEST_PERMISSIONS: i32 = 0x5353_0001; // "SS" + 1

/// `Context.TELEPHONY_SERVICE`.
const TELEPHONY_SERVICE: &str = "phone";

/// `Settings.Secure.ANDROID_ID`.
const SECURE_ANDROID_ID: &str = "android_id";

/// `PackageManager.PERMISSION_GRANTED`.
const PERMISSION_GRANTED: i32 = 0;

static JAVA_VM: OnceLock<JavaVM> = OnceLock::new();

/// The process `JavaVM`, wrapped once from the NDK context.
fn java_vm() -> Result<&'static JavaVM> {
    if let Some(vm) = JAVA_VM.get() {
        return Ok(vm);
    }
    let ctx = ndk_context::android_context();
    // SAFETY: `ctx.vm()` returns the `JavaVM*` set by the NDK glue code.
    // The pointer is valid for the lifetime of the process.
    let vm = unsafe { JavaVM::from_raw(ctx.vm().cast()) }
        .map_err(|e| SentinelError::Bridge(format!("failed to obtain JavaVM: {e}")))?;
    Ok(JAVA_VM.get_or_init(|| vm))
}

/// Obtain a [`JNIEnv`] for the current thread, attaching it if needed.
fn jni_env() -> Result<JNIEnv<'static>> {
    java_vm()?
        .attach_current_thread_permanently()
        .map_err(|e| SentinelError::Bridge(format!("failed to attach JNI thread: {e}")))
}

/// Obtain the hosting Android `Activity` as a [`JObject`].
fn activity() -> Result<JObject<'static>> {
    let ptr = ndk_context::android_context().context();
    if ptr.is_null() {
        return Err(SentinelError::Bridge(
            "Android context is null, native activity not initialised".into(),
        ));
    }
    // SAFETY: the NDK guarantees this pointer is a valid global jobject for
    // the hosting Activity.
    Ok(unsafe { JObject::from_raw(ptr.cast()) })
}

/// Map any `jni::errors::Error` into `SentinelError::Bridge`.
fn jni_err(context: &str, e: jni::errors::Error) -> SentinelError {
    SentinelError::Bridge(format!("{context}: {e}"))
}

/// Map a failed call, clearing and classifying a pending Java exception.
///
/// `SecurityException` becomes `AccessDenied`; anything else is a bridge
/// fault carrying the exception message.
fn java_failure(env: &mut JNIEnv<'_>, context: &str, e: jni::errors::Error) -> SentinelError {
    if !matches!(e, jni::errors::Error::JavaException) {
        return jni_err(context, e);
    }
    let Ok(throwable) = env.exception_occurred() else {
        return jni_err(context, e);
    };
    if env.exception_clear().is_err() {
        return jni_err(context, e);
    }

    let denied = env
        .is_instance_of(&throwable, "java/lang/SecurityException")
        .unwrap_or(false);
    let detail = throwable_message(env, &throwable)
        .unwrap_or_else(|| "exception without message".to_string());

    if denied {
        SentinelError::AccessDenied(format!("{context}: {detail}"))
    } else {
        SentinelError::Bridge(format!("{context}: {detail}"))
    }
}

/// `throwable.getMessage()`, or `None` if absent or unreadable.
fn throwable_message(env: &mut JNIEnv<'_>, throwable: &JThrowable<'_>) -> Option<String> {
    let message = env
        .call_method(throwable, "getMessage", "()Ljava/lang/String;", &[])
        .ok()?
        .l()
        .ok()?;
    optional_string(env, message).ok().flatten()
}

/// Convert a possibly-null `java.lang.String` into an owned Rust string.
fn optional_string(env: &mut JNIEnv<'_>, obj: JObject<'_>) -> Result<Option<String>> {
    if obj.is_null() {
        return Ok(None);
    }
    let value: String = env
        .get_string(&JString::from(obj))
        .map_err(|e| jni_err("get_string", e))?
        .into();
    Ok(Some(value))
}

/// Map the two Android permission probes onto a [`GrantState`].
///
/// A rationale is only offered after the user has turned the permission down,
/// so not-granted without one reads as not yet decided. Android reports a
/// "don't ask again" refusal the same way; the dialog then returns at once and
/// the post-dialog read still fails evaluation.
fn classify_permission(granted: bool, rationale: bool) -> GrantState {
    match (granted, rationale) {
        (true, _) => GrantState::Granted,
        (false, true) => GrantState::Denied,
        (false, false) => GrantState::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Bridge struct
// ---------------------------------------------------------------------------

/// Android implementation of the platform bridge.
///
/// Zero-sized; all state lives on the Java side.
pub struct AndroidBridge;

impl AndroidBridge {
    /// Create a new Android bridge.
    ///
    /// This does **not** touch JNI; the first JNI call happens lazily when
    /// a trait method is invoked.
    pub fn new() -> Self {
        Self
    }
}

impl Default for AndroidBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformBridge for AndroidBridge {
    fn platform_name(&self) -> &str {
        "Android"
    }

    /// `Build.VERSION.SDK_INT`.
    fn os_version(&self) -> Result<OsVersion> {
        let mut env = jni_env()?;
        let sdk = env
            .get_static_field("android/os/Build$VERSION", "SDK_INT", "I")
            .map_err(|e| jni_err("Build.VERSION.SDK_INT", e))?
            .i()
            .map_err(|e| jni_err("SDK_INT->i", e))?;
        let sdk = u32::try_from(sdk)
            .map_err(|_| SentinelError::Bridge(format!("negative SDK_INT {sdk}")))?;
        Ok(OsVersion(sdk))
    }
}

// ---------------------------------------------------------------------------
// NativeTelephony: android.telephony.TelephonyManager
// ---------------------------------------------------------------------------

impl NativeTelephony for AndroidBridge {
    /// `TelephonyManager.getDeviceId()`.
    ///
    /// From API 29 the call throws `SecurityException` for non-system apps
    /// even with `READ_PHONE_STATE`; that surfaces as `AccessDenied`.
    fn device_id(&self) -> Result<Option<String>> {
        let mut env = jni_env()?;
        let activity = activity()?;

        let j_service: JString = env
            .new_string(TELEPHONY_SERVICE)
            .map_err(|e| jni_err("new_string(TELEPHONY_SERVICE)", e))?;

        let manager: JObject = env
            .call_method(
                &activity,
                "getSystemService",
                "(Ljava/lang/String;)Ljava/lang/Object;",
                &[JValue::Object(&j_service)],
            )
            .map_err(|e| java_failure(&mut env, "getSystemService(phone)", e))?
            .l()
            .map_err(|e| jni_err("getSystemService->l", e))?;

        if manager.is_null() {
            tracing::debug!("Android: no TelephonyManager on this device");
            return Ok(None);
        }

        let device_id: JObject = env
            .call_method(&manager, "getDeviceId", "()Ljava/lang/String;", &[])
            .map_err(|e| java_failure(&mut env, "TelephonyManager.getDeviceId", e))?
            .l()
            .map_err(|e| jni_err("getDeviceId->l", e))?;

        optional_string(&mut env, device_id)
    }
}

// ---------------------------------------------------------------------------
// NativeSecureSettings: android.provider.Settings.Secure
// ---------------------------------------------------------------------------

impl NativeSecureSettings for AndroidBridge {
    /// `Settings.Secure.getString(resolver, ANDROID_ID)`.
    fn installation_id(&self) -> Result<Option<String>> {
        let mut env = jni_env()?;
        let activity = activity()?;

        let resolver: JObject = env
            .call_method(
                &activity,
                "getContentResolver",
                "()Landroid/content/ContentResolver;",
                &[],
            )
            .map_err(|e| java_failure(&mut env, "getContentResolver", e))?
            .l()
            .map_err(|e| jni_err("getContentResolver->l", e))?;

        let j_key: JString = env
            .new_string(SECURE_ANDROID_ID)
            .map_err(|e| jni_err("new_string(ANDROID_ID)", e))?;

        let value: JObject = env
            .call_static_method(
                "android/provider/Settings$Secure",
                "getString",
                "(Landroid/content/ContentResolver;Ljava/lang/String;)Ljava/lang/String;",
                &[JValue::Object(&resolver), JValue::Object(&j_key)],
            )
            .map_err(|e| java_failure(&mut env, "Settings.Secure.getString", e))?
            .l()
            .map_err(|e| jni_err("Settings.Secure.getString->l", e))?;

        optional_string(&mut env, value)
    }
}

// ---------------------------------------------------------------------------
// NativePermissions: androidx.core ContextCompat / ActivityCompat
// ---------------------------------------------------------------------------

impl NativePermissions for AndroidBridge {
    /// `ContextCompat.checkSelfPermission(activity, permission)`, refined by
    /// `ActivityCompat.shouldShowRequestPermissionRationale` when not granted.
    fn permission_state(&self, permission: &str) -> Result<GrantState> {
        let mut env = jni_env()?;
        let activity = activity()?;

        let j_permission: JString = env
            .new_string(permission)
            .map_err(|e| jni_err("new_string(permission)", e))?;

        let result = env
            .call_static_method(
                "androidx/core/content/ContextCompat",
                "checkSelfPermission",
                "(Landroid/content/Context;Ljava/lang/String;)I",
                &[JValue::Object(&activity), JValue::Object(&j_permission)],
            )
            .map_err(|e| java_failure(&mut env, "ContextCompat.checkSelfPermission", e))?
            .i()
            .map_err(|e| jni_err("checkSelfPermission->i", e))?;

        let granted = result == PERMISSION_GRANTED;
        let rationale = if granted {
            false
        } else {
            env.call_static_method(
                "androidx/core/app/ActivityCompat",
                "shouldShowRequestPermissionRationale",
                "(Landroid/app/Activity;Ljava/lang/String;)Z",
                &[JValue::Object(&activity), JValue::Object(&j_permission)],
            )
            .map_err(|e| java_failure(&mut env, "ActivityCompat.shouldShowRequestPermissionRationale", e))?
            .z()
            .map_err(|e| jni_err("shouldShowRequestPermissionRationale->z", e))?
        };

        let state = classify_permission(granted, rationale);
        tracing::debug!(permission, ?state, "Android: permission checked");
        Ok(state)
    }

    /// `ActivityCompat.requestPermissions(activity, permissions, REQUEST_PERMISSIONS)`.
    fn launch_permission_dialog(&self, permissions: &[&str]) -> Result<()> {
        let mut env = jni_env()?;
        let activity = activity()?;

        tracing::info!(?permissions, "Android: launching permission dialog");

        let string_class = env
            .find_class("java/lang/String")
            .map_err(|e| jni_err("find_class(String)", e))?;

        let j_permissions = env
            .new_object_array(permissions.len() as jsize, &string_class, &JObject::null())
            .map_err(|e| jni_err("new_object_array(permissions)", e))?;

        for (i, permission) in permissions.iter().enumerate() {
            let j_permission: JString = env
                .new_string(permission)
                .map_err(|e| jni_err("new_string(permission[i])", e))?;
            env.set_object_array_element(&j_permissions, i as jsize, j_permission)
                .map_err(|e| jni_err("set_object_array_element", e))?;
        }

        env.call_static_method(
            "androidx/core/app/ActivityCompat",
            "requestPermissions",
            "(Landroid/app/Activity;[Ljava/lang/String;I)V",
            &[
                JValue::Object(&activity),
                JValue::Object(&j_permissions),
                JValue::Int(REQUEST_PERMISSIONS),
            ],
        )
        .map_err(|e| java_failure(&mut env, "ActivityCompat.requestPermissions", e))?;

        tracing::info!(
            request_code = REQUEST_PERMISSIONS,
            "Android: permission dialog dispatched, awaiting onRequestPermissionsResult"
        );
        Ok(())
    }
}
