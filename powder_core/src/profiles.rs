//! Bounded collection of named measurement profiles.
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CommandError;
use crate::util::truncate_chars;

/// Longest stored display name, in characters.
pub const NAME_MAX: usize = 31;
pub const CALIBER_MAX: usize = 23;
pub const BULLET_WEIGHT_MAX: usize = 9;
pub const POWDER_NAME_MAX: usize = 23;

/// Per-profile linear calibration. Serialized with the field names the web
/// client and stored settings already use.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileCalibration {
    #[serde(rename = "potMinAdc", alias = "zeroRawValue")]
    pub zero_raw_value: f32,
    #[serde(rename = "grainsPerMmFactor", alias = "grainsPerRawUnit")]
    pub grains_per_raw_unit: f32,
    #[serde(rename = "isCalibrated")]
    pub is_calibrated: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    #[serde(deserialize_with = "loose_string")]
    pub name: String,
    #[serde(deserialize_with = "loose_string")]
    pub caliber: String,
    #[serde(deserialize_with = "loose_string")]
    pub bullet_weight: String,
    #[serde(deserialize_with = "loose_string")]
    pub powder_name: String,
    pub target_grain: f32,
    #[serde(flatten)]
    pub calibration: ProfileCalibration,
}

impl Profile {
    /// Clamp every text field to its stored length.
    fn clamped(mut self) -> Self {
        self.name = truncate_chars(&self.name, NAME_MAX);
        self.caliber = truncate_chars(&self.caliber, CALIBER_MAX);
        self.bullet_weight = truncate_chars(&self.bullet_weight, BULLET_WEIGHT_MAX);
        self.powder_name = truncate_chars(&self.powder_name, POWDER_NAME_MAX);
        self
    }
}

/// Payload of a `saveConfig` command.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileDraft {
    pub index: i64,
    #[serde(deserialize_with = "loose_string")]
    pub caliber: String,
    #[serde(deserialize_with = "loose_string")]
    pub bullet_weight: String,
    #[serde(deserialize_with = "loose_string")]
    pub powder_name: String,
    pub target_grain: f32,
}

/// Accept strings, numbers or null for free-text fields (clients send
/// bullet weights both ways).
fn loose_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Display name derived from a profile's fields.
pub fn make_name(caliber: &str, bullet_weight: &str, powder_name: &str, target: f32) -> String {
    let full = format!("{caliber} {bullet_weight}gr {powder_name} {target:.2}gr");
    truncate_chars(&full, NAME_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Added(usize),
    Updated(usize),
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    profiles: Vec<Profile>,
    capacity: usize,
    active: Option<usize>,
}

impl ConfigStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            profiles: Vec::new(),
            capacity: capacity.max(1),
            active: None,
        }
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub const fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// Active index in the wire encoding (`-1` when none).
    pub fn active_index_wire(&self) -> i64 {
        self.active.map_or(-1, |i| i as i64)
    }

    pub fn active(&self) -> Option<&Profile> {
        self.active.and_then(|i| self.profiles.get(i))
    }

    pub fn active_calibration_mut(&mut self) -> Option<&mut ProfileCalibration> {
        self.active
            .and_then(|i| self.profiles.get_mut(i))
            .map(|p| &mut p.calibration)
    }

    fn checked_index(&self, index: i64) -> Result<usize, CommandError> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < self.profiles.len())
            .ok_or(CommandError::InvalidIndex(index))
    }

    /// Make `index` active; `-1` deselects. Returns the newly active profile.
    pub fn select(&mut self, index: i64) -> Result<Option<&Profile>, CommandError> {
        if index == -1 {
            self.active = None;
            return Ok(None);
        }
        let i = self.checked_index(index)?;
        self.active = Some(i);
        Ok(self.profiles.get(i))
    }

    /// Add (`index == len`) or update (`index < len`) a profile.
    ///
    /// New profiles start uncalibrated; updates keep their calibration.
    pub fn save(&mut self, draft: &ProfileDraft) -> Result<SaveOutcome, CommandError> {
        let len = self.profiles.len();
        let i = usize::try_from(draft.index).map_err(|_| CommandError::InvalidIndex(draft.index))?;
        let outcome = if i < len {
            SaveOutcome::Updated(i)
        } else if i == len {
            if len >= self.capacity {
                return Err(CommandError::CapacityReached(self.capacity));
            }
            self.profiles.push(Profile::default());
            SaveOutcome::Added(i)
        } else {
            return Err(CommandError::InvalidIndex(draft.index));
        };

        let p = &mut self.profiles[i];
        p.caliber = truncate_chars(&draft.caliber, CALIBER_MAX);
        p.bullet_weight = truncate_chars(&draft.bullet_weight, BULLET_WEIGHT_MAX);
        p.powder_name = truncate_chars(&draft.powder_name, POWDER_NAME_MAX);
        p.target_grain = draft.target_grain;
        p.name = make_name(&p.caliber, &p.bullet_weight, &p.powder_name, p.target_grain);
        Ok(outcome)
    }

    /// Remove the profile at `index`, shifting later ones down and keeping
    /// the active selection pointed at the same profile.
    pub fn delete(&mut self, index: i64) -> Result<Profile, CommandError> {
        let i = self.checked_index(index)?;
        let removed = self.profiles.remove(i);
        self.active = match self.active {
            Some(a) if a == i => None,
            Some(a) if a > i => Some(a - 1),
            other => other,
        };
        Ok(removed)
    }

    /// Replace every profile with `incoming`, keeping at most `capacity`.
    /// Returns how many were kept.
    pub fn import(&mut self, incoming: Vec<Profile>) -> usize {
        let offered = incoming.len();
        self.profiles = incoming
            .into_iter()
            .take(self.capacity)
            .map(Profile::clamped)
            .collect();
        if offered > self.profiles.len() {
            tracing::warn!(
                offered,
                kept = self.profiles.len(),
                "profile import truncated at capacity"
            );
        }
        self.revalidate_active();
        self.profiles.len()
    }

    /// Advance the selection to the next existing profile, wrapping around.
    pub fn cycle_next(&mut self) -> Option<usize> {
        if self.profiles.is_empty() {
            self.active = None;
            return None;
        }
        let next = self.active.map_or(0, |a| (a + 1) % self.profiles.len());
        self.active = Some(next);
        self.active
    }

    /// Restore persisted profiles and selection; an invalid index deselects.
    pub fn restore(&mut self, profiles: Vec<Profile>, active: i64) {
        self.profiles = profiles
            .into_iter()
            .take(self.capacity)
            .map(Profile::clamped)
            .collect();
        self.active = usize::try_from(active).ok();
        self.revalidate_active();
    }

    fn revalidate_active(&mut self) {
        if self.active.is_some_and(|a| a >= self.profiles.len()) {
            self.active = None;
        }
    }
}
