//! Raw-to-weight conversion and the `From` bridges from `powder_config`
//! types to the runtime config used by the control loop.

use crate::config::{AutoMeasureCfg, CalibrationCfg, CapacityCfg, CoreCfg, SamplerCfg, ScheduleCfg};
use crate::profiles::Profile;

/// Weight in grains for a raw average under `profile`'s calibration.
///
/// Zero when there is no profile or it is uncalibrated; never negative.
pub fn convert(raw_average: f32, profile: Option<&Profile>) -> f32 {
    match profile {
        Some(p) if p.calibration.is_calibrated => {
            let cal = &p.calibration;
            ((raw_average - cal.zero_raw_value) * cal.grains_per_raw_unit).max(0.0)
        }
        _ => 0.0,
    }
}

// ── SamplerCfg ───────────────────────────────────────────────────────────────

impl From<&powder_config::SamplerCfg> for SamplerCfg {
    fn from(c: &powder_config::SamplerCfg) -> Self {
        Self {
            window: c.window,
            prefer_internal: c.primary == powder_config::SourceChoice::Internal,
            fallback_on_probe_failure: c.fallback_on_probe_failure,
        }
    }
}

// ── CalibrationCfg ───────────────────────────────────────────────────────────

impl From<&powder_config::CalibrationCfg> for CalibrationCfg {
    fn from(c: &powder_config::CalibrationCfg) -> Self {
        Self {
            epsilon: c.epsilon,
            alarm_tolerance_gr: c.alarm_tolerance_gr,
        }
    }
}

// ── AutoMeasureCfg ───────────────────────────────────────────────────────────

impl From<&powder_config::AutoMeasureCfg> for AutoMeasureCfg {
    fn from(c: &powder_config::AutoMeasureCfg) -> Self {
        Self {
            tolerance_gr: c.tolerance_gr,
            stable_ms: c.stable_ms,
            max_stable_ms: c.max_stable_ms,
            cooldown_ms: c.cooldown_ms,
            reset_threshold_gr: c.reset_threshold_gr,
        }
    }
}

// ── ScheduleCfg ──────────────────────────────────────────────────────────────

impl From<&powder_config::ScheduleCfg> for ScheduleCfg {
    fn from(c: &powder_config::ScheduleCfg) -> Self {
        Self {
            display_interval_ms: c.display_interval_ms,
            telemetry_interval_ms: c.telemetry_interval_ms,
            tick_delay_ms: c.tick_delay_ms,
            max_events_per_tick: c.max_events_per_tick,
            touch_debounce_ms: c.touch_debounce_ms,
            stable_indicator_ms: c.stable_indicator_ms,
        }
    }
}

// ── CapacityCfg ──────────────────────────────────────────────────────────────

impl From<&powder_config::CapacityCfg> for CapacityCfg {
    fn from(c: &powder_config::CapacityCfg) -> Self {
        Self {
            profiles: c.profiles,
            history: c.history,
            session_logs: c.session_logs,
        }
    }
}

// ── CoreCfg ──────────────────────────────────────────────────────────────────

impl From<&powder_config::Config> for CoreCfg {
    fn from(c: &powder_config::Config) -> Self {
        Self {
            sampler: (&c.sampler).into(),
            calibration: (&c.calibration).into(),
            auto_measure: (&c.auto_measure).into(),
            schedule: (&c.schedule).into(),
            capacity: (&c.capacity).into(),
            settings_key: c.storage.settings_key.clone(),
        }
    }
}
