// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Gateway configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SentinelError};
use crate::policy::VersionPolicy;

/// Tunable gateway settings. Every field has a default, so a partial JSON
/// file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// OS-version threshold table.
    pub version_policy: VersionPolicy,
    /// Message returned when SMS and phone-state permissions are granted.
    pub granted_message: String,
    /// Rejection reason when either required category is missing.
    pub denied_message: String,
    /// Event name used when relaying inbound SMS to the app layer.
    pub sms_event_name: String,
    /// Prefix for identifier-resolution rejections.
    pub identifier_failure_prefix: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            version_policy: VersionPolicy::default(),
            granted_message: "All required permissions granted".into(),
            denied_message: "Required permissions (SMS, Phone) were denied.".into(),
            sms_event_name: "smsReceived".into(),
            identifier_failure_prefix: "Failed to retrieve identifiers: ".into(),
        }
    }
}

impl GatewayConfig {
    /// Read a config file. Missing fields fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file, or use defaults when it is absent or unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.sms_event_name.trim().is_empty() {
            return Err(SentinelError::Config("sms_event_name must not be empty".into()));
        }
        if self.version_policy.thresholds.iter().any(|t| t.min_os_version == 0) {
            return Err(SentinelError::Config(
                "version thresholds must be positive API levels".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.json");

        let mut config = GatewayConfig::default();
        config.sms_event_name = "inboundSms".into();
        config.save(&path).unwrap();

        let loaded = GatewayConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.json");
        std::fs::write(&path, r#"{"denied_message": "nope"}"#).unwrap();

        let loaded = GatewayConfig::load(&path).unwrap();
        assert_eq!(loaded.denied_message, "nope");
        assert_eq!(loaded.sms_event_name, "smsReceived");
        assert_eq!(loaded.version_policy, VersionPolicy::default());
    }

    #[test]
    fn missing_file_falls_back() {
        let config = GatewayConfig::load_or_default("/nonexistent/simsentinel/gateway.json");
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn empty_event_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.json");
        std::fs::write(&path, r#"{"sms_event_name": "  "}"#).unwrap();

        assert!(matches!(GatewayConfig::load(&path), Err(SentinelError::Config(_))));
    }
}
