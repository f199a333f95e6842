//! Two-point calibration wizard for the active profile.
//!
//! `None -> ZeroStep -> KnownGrainsStep -> None` on success; `cancel()` returns
//! to `None` from anywhere. The engine only touches the profile's calibration
//! block; persistence, alarm bands and session clearing are the caller's job.
use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::CommandError;
use crate::profiles::ProfileCalibration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalibrationState {
    #[default]
    None,
    ZeroStep,
    KnownGrainsStep,
}

impl CalibrationState {
    /// Numeric code published in snapshots.
    pub const fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::ZeroStep => 1,
            Self::KnownGrainsStep => 2,
        }
    }

    pub const fn is_active(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for CalibrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "idle",
            Self::ZeroStep => "waiting for zero point",
            Self::KnownGrainsStep => "waiting for known grains",
        })
    }
}

impl Serialize for CalibrationState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// Parameters written by a successful known-grains step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationOutcome {
    pub zero_raw_value: f32,
    pub grains_per_raw_unit: f32,
}

#[derive(Debug, Clone)]
pub struct CalibrationEngine {
    state: CalibrationState,
    epsilon: f32,
}

impl CalibrationEngine {
    /// `epsilon` is the smallest raw span accepted between the two points.
    pub const fn new(epsilon: f32) -> Self {
        Self {
            state: CalibrationState::None,
            epsilon,
        }
    }

    pub const fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn start_wizard(&mut self, has_active_profile: bool) -> Result<(), CommandError> {
        if !has_active_profile {
            return Err(CommandError::NoActiveProfile);
        }
        self.state = CalibrationState::ZeroStep;
        Ok(())
    }

    /// Capture `raw_average` as the profile's zero point.
    pub fn set_zero_point(
        &mut self,
        profile: Option<&mut ProfileCalibration>,
        raw_average: f32,
    ) -> Result<(), CommandError> {
        if !self.state.is_active() {
            return Err(CommandError::OutOfSequence { state: self.state });
        }
        let cal = profile.ok_or(CommandError::NoActiveProfile)?;
        cal.zero_raw_value = raw_average;
        self.state = CalibrationState::KnownGrainsStep;
        Ok(())
    }

    /// Derive grains per raw unit from a reading taken with `known_grains`
    /// of powder. On a rejected span the wizard stays in the known-grains step.
    pub fn set_known_grains(
        &mut self,
        profile: Option<&mut ProfileCalibration>,
        raw_average: f32,
        known_grains: f32,
    ) -> Result<CalibrationOutcome, CommandError> {
        if self.state != CalibrationState::KnownGrainsStep {
            return Err(CommandError::OutOfSequence { state: self.state });
        }
        let cal = profile.ok_or(CommandError::NoActiveProfile)?;
        let raw_difference = raw_average - cal.zero_raw_value;
        if !(raw_difference > self.epsilon && known_grains > 0.0) {
            return Err(CommandError::CalibrationGuard {
                raw_difference,
                known_weight: known_grains,
            });
        }
        cal.grains_per_raw_unit = known_grains / raw_difference;
        cal.is_calibrated = true;
        self.state = CalibrationState::None;
        Ok(CalibrationOutcome {
            zero_raw_value: cal.zero_raw_value,
            grains_per_raw_unit: cal.grains_per_raw_unit,
        })
    }

    pub fn cancel(&mut self) {
        self.state = CalibrationState::None;
    }
}
