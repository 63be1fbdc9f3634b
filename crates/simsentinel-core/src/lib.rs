// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SIM Sentinel: Core types, errors and configuration shared across all crates.

pub mod config;
pub mod error;
pub mod policy;
pub mod types;

pub use config::GatewayConfig;
pub use error::SentinelError;
pub use policy::{Capability, VersionPolicy, VersionThreshold};
pub use types::*;
