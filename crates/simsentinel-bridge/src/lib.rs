// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native platform bridge abstractions.
//
// The gateway talks to telephony, secure settings and the runtime permission
// system only through the traits in `traits`. Android implements them over
// JNI; every other target gets a stub that reports `PlatformUnavailable`.

pub mod traits;

#[cfg(target_os = "android")]
pub mod android;

#[cfg(not(target_os = "android"))]
pub mod stub;

pub use traits::*;

/// Returns the bridge implementation for the target operating system.
pub fn platform_bridge() -> Box<dyn PlatformBridge> {
    #[cfg(target_os = "android")]
    {
        // Android: `jni-rs` calls into ART through the NDK-provided JavaVM.
        Box::new(android::AndroidBridge::new())
    }
    #[cfg(not(target_os = "android"))]
    {
        // Desktop/CI: no telephony, no runtime permissions.
        Box::new(stub::StubBridge)
    }
}
