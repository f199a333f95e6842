//! Offline inspection of the persisted settings record.

use powder_config::Config;
use powder_core::hw_error::map_hw_error;
use powder_core::{BootError, SessionLedger, SessionLog, SettingsRecord, load_settings};
use powder_hardware::FsBlobStore;
use powder_traits::BlobStore;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub storage_dir: String,
    pub profiles: usize,
    pub calibrated_profiles: usize,
    pub current_config_index: i64,
    pub session_logs: usize,
    pub alarm_enabled: bool,
}

fn open_store(cfg: &Config) -> Result<FsBlobStore, BootError> {
    let mut store = FsBlobStore::new(&cfg.storage.dir);
    store
        .mount()
        .map_err(|e| BootError::Storage(map_hw_error(e.as_ref()).to_string()))?;
    Ok(store)
}

fn load(cfg: &Config) -> Result<SettingsRecord, BootError> {
    let store = open_store(cfg)?;
    Ok(load_settings(&store, &cfg.storage.settings_key))
}

/// Mount storage and summarize the settings record. The config has already
/// been validated by the loader.
pub fn self_check(cfg: &Config) -> eyre::Result<CheckReport> {
    let rec = load(cfg)?;
    let report = CheckReport {
        storage_dir: cfg.storage.dir.clone(),
        profiles: rec.powder_configs.len(),
        calibrated_profiles: rec
            .powder_configs
            .iter()
            .filter(|p| p.calibration.is_calibrated)
            .count(),
        current_config_index: rec.current_config_index,
        session_logs: rec.session_logs.len(),
        alarm_enabled: rec.alarm_enabled,
    };
    tracing::info!(?report, "self-check ok");
    Ok(report)
}

/// Persisted session logs, oldest first.
pub fn session_logs(cfg: &Config) -> eyre::Result<Vec<SessionLog>> {
    Ok(load(cfg)?.session_logs)
}

/// Summary export of one persisted session.
pub fn session_summary(cfg: &Config, index: i64) -> eyre::Result<String> {
    let mut ledger = SessionLedger::new(cfg.capacity.history, cfg.capacity.session_logs, 0);
    ledger.restore_logs(session_logs(cfg)?);
    ledger
        .session_summary_csv(index)
        .ok_or_else(|| eyre::eyre!("session {index} not found ({} logged)", ledger.logs().len()))
}

/// One human-readable line per session log.
pub fn format_logs(logs: &[SessionLog]) -> String {
    if logs.is_empty() {
        return "no sessions logged\n".to_string();
    }
    let mut out = String::from("index  start       end         bullets  total(gr)  avg(gr)\n");
    for (i, log) in logs.iter().enumerate() {
        out.push_str(&format!(
            "{i:<6} {:<11} {:<11} {:<8} {:<10.3} {:.3}\n",
            log.start_time,
            log.end_time,
            log.bullet_count,
            log.total_weight,
            log.average()
        ));
    }
    out
}
