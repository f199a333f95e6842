//! The single settings record kept in the blob store.
use eyre::WrapErr;
use powder_traits::BlobStore;
use serde::{Deserialize, Serialize};

use crate::alarm::AlarmSettings;
use crate::error::Result;
use crate::hw_error::map_hw_error;
use crate::ledger::SessionLog;
use crate::profiles::Profile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsRecord {
    pub alarm_enabled: bool,
    pub low_threshold: f32,
    pub high_threshold: f32,
    pub current_config_index: i64,
    pub powder_configs: Vec<Profile>,
    pub session_logs: Vec<SessionLog>,
}

impl Default for SettingsRecord {
    fn default() -> Self {
        let alarm = AlarmSettings::default();
        Self {
            alarm_enabled: alarm.enabled,
            low_threshold: alarm.low_threshold,
            high_threshold: alarm.high_threshold,
            current_config_index: -1,
            powder_configs: Vec::new(),
            session_logs: Vec::new(),
        }
    }
}

impl SettingsRecord {
    pub const fn alarm(&self) -> AlarmSettings {
        AlarmSettings {
            enabled: self.alarm_enabled,
            low_threshold: self.low_threshold,
            high_threshold: self.high_threshold,
        }
    }
}

/// Read the settings record. Missing, empty, unreadable or corrupt records
/// yield defaults.
pub fn load_settings(store: &dyn BlobStore, key: &str) -> SettingsRecord {
    let bytes = match store.load(key) {
        Ok(Some(b)) => b,
        Ok(None) => {
            tracing::info!(key, "no settings record; using defaults");
            return SettingsRecord::default();
        }
        Err(e) => {
            tracing::warn!(key, error = %map_hw_error(e.as_ref()), "settings unreadable; using defaults");
            return SettingsRecord::default();
        }
    };
    if bytes.is_empty() {
        tracing::info!(key, "settings record empty; using defaults");
        return SettingsRecord::default();
    }
    match serde_json::from_slice::<SettingsRecord>(&bytes) {
        Ok(rec) => {
            tracing::info!(
                key,
                profiles = rec.powder_configs.len(),
                sessions = rec.session_logs.len(),
                "settings loaded"
            );
            rec
        }
        Err(e) => {
            tracing::warn!(key, error = %e, "settings record corrupt; using defaults");
            SettingsRecord::default()
        }
    }
}

pub fn save_settings(store: &mut dyn BlobStore, key: &str, record: &SettingsRecord) -> Result<()> {
    let bytes = serde_json::to_vec(record).wrap_err("encode settings")?;
    store
        .save(key, &bytes)
        .map_err(|e| eyre::eyre!(map_hw_error(e.as_ref())))
        .wrap_err_with(|| format!("write settings to {key}"))?;
    tracing::debug!(key, bytes = bytes.len(), "settings saved");
    Ok(())
}
