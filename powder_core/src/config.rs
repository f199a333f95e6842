//! Configuration types for the control loop.
//!
//! These are the runtime configuration structs used by `ControlLoop`.
//! They are separate from the TOML-deserialized config in `powder_config`.

#[derive(Debug, Clone)]
pub struct SamplerCfg {
    /// Moving-average window size.
    pub window: usize,
    /// Use the MCU's own ADC as the primary source.
    pub prefer_internal: bool,
    pub fallback_on_probe_failure: bool,
}

impl Default for SamplerCfg {
    fn default() -> Self {
        Self {
            window: 5,
            prefer_internal: false,
            fallback_on_probe_failure: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CalibrationCfg {
    /// Smallest raw span accepted by the known-grains step.
    pub epsilon: f32,
    /// Half-width of the alarm band set around a profile's target.
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

/// Auto-measurement trigger tuning.
#[derive(Debug, Clone)]
pub struct AutoMeasureCfg {
    /// Band half-width around the target (grains).
    pub tolerance_gr: f32,
    /// Time in band before a charge is recorded.
    pub stable_ms: u64,
    /// Time in band after which the timer restarts.
    pub max_stable_ms: u64,
    /// Minimum spacing between recorded charges.
    pub cooldown_ms: u64,
    /// Weight below which the pan counts as emptied.
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

#[derive(Debug, Clone)]
pub struct ScheduleCfg {
    pub display_interval_ms: u64,
    pub telemetry_interval_ms: u64,
    /// Cooperative delay at the end of each tick (0 disables it).
    pub tick_delay_ms: u64,
    pub max_events_per_tick: usize,
    pub touch_debounce_ms: u64,
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

#[derive(Debug, Clone)]
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

#[derive(Debug, Clone)]
pub struct CoreCfg {
    pub sampler: SamplerCfg,
    pub calibration: CalibrationCfg,
    pub auto_measure: AutoMeasureCfg,
    pub schedule: ScheduleCfg,
    pub capacity: CapacityCfg,
    /// Blob-store key of the settings record.
    pub settings_key: String,
}

impl Default for CoreCfg {
    fn default() -> Self {
        Self {
            sampler: SamplerCfg::default(),
            calibration: CalibrationCfg::default(),
            auto_measure: AutoMeasureCfg::default(),
            schedule: ScheduleCfg::default(),
            capacity: CapacityCfg::default(),
            settings_key: "/settings.json".to_string(),
        }
    }
}
