#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the PowderSense instrument.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Every section is optional; an empty file yields the factory defaults.
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceChoice {
    /// Precision external ADC on the I2C bus.
    #[default]
    External,
    /// The MCU's own ADC pin.
    Internal,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SamplerCfg {
    /// Moving-average window (number of raw readings).
    pub window: usize,
    /// Preferred analog source.
    pub primary: SourceChoice,
    /// Fall back to the other source when the primary fails its startup probe.
    pub fallback_on_probe_failure: bool,
}

impl Default for SamplerCfg {
    fn default() -> Self {
        Self {
            window: 5,
            primary: SourceChoice::External,
            fallback_on_probe_failure: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CalibrationCfg {
    /// Smallest raw difference accepted between zero and known-weight points.
    pub epsilon: f32,
    /// Alarm band half-width applied around a profile's target (grains).
    pub alarm_tolerance_gr: f32,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            epsilon: 0.01,
            alarm_tolerance_gr: 0.10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AutoMeasureCfg {
    pub tolerance_gr: f32,
    pub stable_ms: u64,
    pub max_stable_ms: u64,
    pub cooldown_ms: u64,
    pub reset_threshold_gr: f32,
}

impl Default for AutoMeasureCfg {
    fn default() -> Self {
        Self {
            tolerance_gr: 0.1,
            stable_ms: 750,
            max_stable_ms: 30_000,
            cooldown_ms: 10_000,
            reset_threshold_gr: 0.1,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScheduleCfg {
    pub display_interval_ms: u64,
    pub telemetry_interval_ms: u64,
    pub tick_delay_ms: u64,
    /// Events drained from each transport source per tick.
    pub max_events_per_tick: usize,
    pub touch_debounce_ms: u64,
    /// Time the indicator must stay green before the reading counts as stable.
    pub stable_indicator_ms: u64,
}

impl Default for ScheduleCfg {
    fn default() -> Self {
        Self {
            display_interval_ms: 100,
            telemetry_interval_ms: 500,
            tick_delay_ms: 5,
            max_events_per_tick: 8,
            touch_debounce_ms: 200,
            stable_indicator_ms: 1_500,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CapacityCfg {
    pub profiles: usize,
    pub history: usize,
    pub session_logs: usize,
}

impl Default for CapacityCfg {
    fn default() -> Self {
        Self {
            profiles: 20,
            history: 100,
            session_logs: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageCfg {
    /// Directory backing the blob store on hosted builds.
    pub dir: String,
    /// Key of the settings record.
    pub settings_key: String,
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            dir: "powdersense-data".to_string(),
            settings_key: "/settings.json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NetworkMode {
    #[default]
    Station,
    AccessPoint,
    Offline,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NetworkCfg {
    pub mode: NetworkMode,
    pub ip: String,
    pub rssi: i32,
}

impl Default for NetworkCfg {
    fn default() -> Self {
        Self {
            mode: NetworkMode::Station,
            ip: "192.168.4.1".to_string(),
            rssi: -60,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub sampler: SamplerCfg,
    pub calibration: CalibrationCfg,
    pub auto_measure: AutoMeasureCfg,
    pub schedule: ScheduleCfg,
    pub capacity: CapacityCfg,
    pub storage: StorageCfg,
    pub network: NetworkCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration: {e}"))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sampler
        if self.sampler.window == 0 {
            eyre::bail!("sampler.window must be >= 1");
        }
        if self.sampler.window > 64 {
            eyre::bail!("sampler.window is unreasonably large (>64)");
        }

        // Calibration
        if self.calibration.epsilon.is_nan() || self.calibration.epsilon <= 0.0 {
            eyre::bail!("calibration.epsilon must be > 0.0");
        }
        if self.calibration.alarm_tolerance_gr.is_sign_negative() {
            eyre::bail!("calibration.alarm_tolerance_gr must be >= 0");
        }

        // Auto-measure
        let am = &self.auto_measure;
        if am.tolerance_gr.is_sign_negative() {
            eyre::bail!("auto_measure.tolerance_gr must be >= 0");
        }
        if am.reset_threshold_gr.is_sign_negative() {
            eyre::bail!("auto_measure.reset_threshold_gr must be >= 0");
        }
        if am.stable_ms == 0 {
            eyre::bail!("auto_measure.stable_ms must be >= 1");
        }
        if am.max_stable_ms <= am.stable_ms {
            eyre::bail!("auto_measure.max_stable_ms must be greater than auto_measure.stable_ms");
        }

        // Schedule
        let s = &self.schedule;
        if s.display_interval_ms == 0 {
            eyre::bail!("schedule.display_interval_ms must be >= 1");
        }
        if s.telemetry_interval_ms < s.display_interval_ms {
            eyre::bail!("schedule.telemetry_interval_ms must be >= schedule.display_interval_ms");
        }
        if s.max_events_per_tick == 0 {
            eyre::bail!("schedule.max_events_per_tick must be >= 1");
        }
        if s.tick_delay_ms > 1_000 {
            eyre::bail!("schedule.tick_delay_ms is unreasonably large (>1s)");
        }

        // Capacity
        if self.capacity.profiles == 0 {
            eyre::bail!("capacity.profiles must be >= 1");
        }
        if self.capacity.history == 0 {
            eyre::bail!("capacity.history must be >= 1");
        }
        if self.capacity.session_logs == 0 {
            eyre::bail!("capacity.session_logs must be >= 1");
        }

        // Storage
        if self.storage.settings_key.trim().is_empty() {
            eyre::bail!("storage.settings_key must not be empty");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
