#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core measurement logic (hardware-agnostic).
//!
//! Everything outside the loop's own state is reached through the traits in
//! `powder_traits`, so the same core runs against the simulated rig and real
//! drivers.
//!
//! ## Architecture
//!
//! - **Sampling**: moving-average window over one analog source (`sampler`)
//! - **Calibration**: two-point wizard per profile (`calibration`)
//! - **Conversion**: raw average to grains (`conversions::convert`)
//! - **Auto-measure**: stability trigger with cooldown and pan-reset (`detector`)
//! - **Sessions**: history, statistics, archive, CSV (`ledger`)
//! - **Profiles**: bounded profile collection (`profiles`)
//! - **Control**: the cooperative tick (`ControlLoop`)
//!
//! Inbound transport text frames are JSON commands (`command`); outbound
//! telemetry is the state snapshot (`snapshot`).

pub mod alarm;
pub mod builder;
pub mod calibration;
pub mod command;
pub mod config;
pub mod control;
pub mod conversions;
pub mod detector;
pub mod error;
pub mod history;
pub mod hw_error;
pub mod ledger;
pub mod mocks;
pub mod persist;
pub mod profiles;
pub mod runner;
pub mod sampler;
pub mod snapshot;
pub mod transport;
pub mod update;
pub mod util;

pub use alarm::{AlarmMonitor, AlarmSettings};
pub use builder::ControlLoopBuilder;
pub use calibration::{CalibrationEngine, CalibrationOutcome, CalibrationState};
pub use command::{CalibrationStep, Command, decode};
pub use config::{AutoMeasureCfg, CalibrationCfg, CapacityCfg, CoreCfg, SamplerCfg, ScheduleCfg};
pub use control::{AP_SSID, ControlLoop, Peripherals, TickOutcome};
pub use conversions::convert;
pub use detector::{AutoMeasureDetector, DetectorStep};
pub use error::{BootError, CommandError, PowderError, Report, Result, UpdateError};
pub use history::BoundedHistory;
pub use ledger::{Measurement, SessionLedger, SessionLog, SessionStats};
pub use persist::{SettingsRecord, load_settings, save_settings};
pub use profiles::{ConfigStore, Profile, ProfileCalibration, ProfileDraft};
pub use runner::{RunEnd, RunSummary, run};
pub use sampler::{AnalogSampler, SourceKind};
pub use snapshot::StateSnapshot;
pub use transport::{ChannelSource, channel_source};
pub use update::UpdateTracker;
