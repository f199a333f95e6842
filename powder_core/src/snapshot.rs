//! Full-state document pushed to telemetry clients and served by the
//! state query.
use serde::Serialize;

use crate::calibration::CalibrationState;
use crate::history::BoundedHistory;
use crate::ledger::{Measurement, SessionLog};
use crate::profiles::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    pub average_weight: f32,
    pub standard_deviation: f32,
    pub min_weight: f32,
    pub max_weight: f32,
    pub total_measurements: u64,
    pub session_measurements: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot<'a> {
    pub current_weight: f32,
    pub current_adc: f32,
    pub alarm_active: bool,
    pub alarm_enabled: bool,
    pub low_threshold: f32,
    pub high_threshold: f32,
    pub wifi_connected: bool,
    pub rssi: i32,
    pub ip_address: String,
    /// Milliseconds since boot.
    pub uptime: u64,
    pub calibration_state: CalibrationState,
    pub is_calibrated: bool,
    pub is_stable: bool,
    pub current_config_index: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_config: Option<&'a Profile>,
    pub powder_configs: &'a [Profile],
    pub stats: StatsView,
    pub recent_measurements: &'a BoundedHistory<Measurement>,
    pub session_logs: &'a BoundedHistory<SessionLog>,
}

impl StateSnapshot<'_> {
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
