use thiserror::Error;

use crate::calibration::CalibrationState;

/// Faults reported by collaborators behind the trait boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PowderError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("analog source unavailable: {0}")]
    Unavailable(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("storage error: {0}")]
    Storage(String),
}

/// Why a transport command was not applied. State is unchanged when one of
/// these is returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    #[error("malformed command: {0}")]
    Malformed(String),
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("profile index {0} out of range")]
    InvalidIndex(i64),
    #[error("profile store is full ({0} profiles)")]
    CapacityReached(usize),
    #[error("no active profile")]
    NoActiveProfile,
    #[error("calibration step not allowed while {state}")]
    OutOfSequence { state: CalibrationState },
    #[error(
        "calibration rejected: raw difference {raw_difference:.3}, known weight {known_weight:.3}"
    )]
    CalibrationGuard {
        raw_difference: f32,
        known_weight: f32,
    },
    #[error("not allowed while calibration is in progress")]
    CalibrationActive,
    #[error(transparent)]
    Update(#[from] UpdateError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpdateError {
    #[error("an update is already in progress")]
    AlreadyInProgress,
    #[error("unknown update type {0:?}")]
    UnknownKind(String),
    #[error("update image is empty")]
    EmptyImage,
    #[error("no update in progress")]
    NotInProgress,
    #[error("update sink: {0}")]
    Sink(String),
}

/// Conditions that stop the instrument before the loop starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BootError {
    #[error("missing analog sampler")]
    MissingSampler,
    #[error("missing peripherals")]
    MissingPeripherals,
    #[error("storage mount failed: {0}")]
    Storage(String),
    #[error("display initialization failed: {0}")]
    Display(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
