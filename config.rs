/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! User preferences that steer the sync engine, stored as TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

pub const DEFAULT_STALE_GROUP_THRESHOLD_DAYS: u32 = 90;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncPreferences {
    /// Open groups created on other devices in the active window.
    pub auto_open_synced_groups: bool,
    /// Local groups untouched for longer than this are not uploaded at startup.
    pub stale_group_threshold_days: u32,
    /// Navigations in background tabs wait until the tab is shown.
    pub defer_background_navigations: bool,
}

impl Default for SyncPreferences {
    fn default() -> Self {
        Self {
            auto_open_synced_groups: true,
            stale_group_threshold_days: DEFAULT_STALE_GROUP_THRESHOLD_DAYS,
            defer_background_navigations: true,
        }
    }
}

impl SyncPreferences {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let preferences: Self =
            toml::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        preferences.validate()?;
        Ok(preferences)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|err| ConfigError::Serialize(err.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let rendered = self.to_toml_string()?;
        std::fs::write(path, rendered.as_bytes())
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))
    }

    pub(crate) fn stale_group_threshold(&self) -> time::Duration {
        time::Duration::days(i64::from(self.stale_group_threshold_days))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.stale_group_threshold_days == 0 {
            return Err(ConfigError::Invalid(
                "stale_group_threshold_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Invalid(String),
    Serialize(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {e}"),
            ConfigError::Parse(e) => write!(f, "Parse error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid preferences: {e}"),
            ConfigError::Serialize(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
