//! JSON command messages arriving as text frames.
use serde::Deserialize;
use serde_json::Value;

use crate::error::CommandError;
use crate::profiles::{Profile, ProfileDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CalibrationStep {
    StartWizard,
    SetZeroPoint,
    SetKnownGrains,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    tag = "command",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    Zero,
    Measure,
    Calibrate {
        step: CalibrationStep,
        #[serde(default)]
        known_weight: Option<f32>,
    },
    SelectConfig {
        index: i64,
    },
    SaveConfig {
        data: ProfileDraft,
    },
    DeleteConfig {
        index: i64,
    },
    SetAlarms {
        enabled: bool,
        low_threshold: f32,
        high_threshold: f32,
    },
    AcknowledgeAlarm,
    ResetSession,
    StartSession,
    EndSession,
    FactoryReset,
    ImportConfigs {
        configs: Vec<Profile>,
    },
    UpdateFirmware {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        filename: String,
        size: usize,
    },
    /// Accepted for compatibility; changes nothing.
    SetSetting {
        #[serde(default)]
        key: String,
        #[serde(default)]
        value: Option<Value>,
    },
}

const KNOWN: &[&str] = &[
    "zero",
    "measure",
    "calibrate",
    "selectConfig",
    "saveConfig",
    "deleteConfig",
    "setAlarms",
    "acknowledgeAlarm",
    "resetSession",
    "startSession",
    "endSession",
    "factoryReset",
    "importConfigs",
    "updateFirmware",
    "setSetting",
];

impl Command {
    /// Wire name, for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::Measure => "measure",
            Self::Calibrate { .. } => "calibrate",
            Self::SelectConfig { .. } => "selectConfig",
            Self::SaveConfig { .. } => "saveConfig",
            Self::DeleteConfig { .. } => "deleteConfig",
            Self::SetAlarms { .. } => "setAlarms",
            Self::AcknowledgeAlarm => "acknowledgeAlarm",
            Self::ResetSession => "resetSession",
            Self::StartSession => "startSession",
            Self::EndSession => "endSession",
            Self::FactoryReset => "factoryReset",
            Self::ImportConfigs { .. } => "importConfigs",
            Self::UpdateFirmware { .. } => "updateFirmware",
            Self::SetSetting { .. } => "setSetting",
        }
    }
}

/// Decode one text frame.
///
/// Distinguishes payloads that are not a command object at all (or carry
/// bad fields) from well-formed objects naming a command we do not know.
pub fn decode(payload: &str) -> Result<Command, CommandError> {
    let value: Value =
        serde_json::from_str(payload).map_err(|e| CommandError::Malformed(e.to_string()))?;
    let name = value
        .get("command")
        .and_then(Value::as_str)
        .ok_or_else(|| CommandError::Malformed("missing \"command\" field".into()))?;
    if !KNOWN.contains(&name) {
        return Err(CommandError::Unknown(name.to_string()));
    }
    serde_json::from_value(value).map_err(|e| CommandError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{"command":"zero"}"#, Command::Zero)]
    #[case(r#"{"command":"acknowledgeAlarm"}"#, Command::AcknowledgeAlarm)]
    #[case(r#"{"command":"selectConfig","index":-1}"#, Command::SelectConfig { index: -1 })]
    #[case(
        r#"{"command":"calibrate","step":"setKnownGrains","knownWeight":5.0}"#,
        Command::Calibrate { step: CalibrationStep::SetKnownGrains, known_weight: Some(5.0) }
    )]
    #[case(
        r#"{"command":"calibrate","step":"startWizard"}"#,
        Command::Calibrate { step: CalibrationStep::StartWizard, known_weight: None }
    )]
    #[case(
        r#"{"command":"setAlarms","enabled":true,"lowThreshold":1.5,"highThreshold":2.5}"#,
        Command::SetAlarms { enabled: true, low_threshold: 1.5, high_threshold: 2.5 }
    )]
    fn decodes(#[case] json: &str, #[case] expected: Command) {
        assert_eq!(decode(json).unwrap(), expected);
    }

    #[test]
    fn save_config_accepts_numeric_bullet_weight() {
        let cmd = decode(
            r#"{"command":"saveConfig","data":{"index":0,"caliber":"308","bulletWeight":168,"powderName":"Varget","targetGrain":42.5}}"#,
        )
        .unwrap();
        let Command::SaveConfig { data } = cmd else {
            panic!("wrong variant");
        };
        assert_eq!(data.bullet_weight, "168");
        assert_eq!(data.target_grain, 42.5);
    }

    #[test]
    fn update_firmware_fields() {
        let cmd = decode(r#"{"command":"updateFirmware","type":"firmware","filename":"fw.bin","size":1024}"#)
            .unwrap();
        assert_eq!(
            cmd,
            Command::UpdateFirmware {
                kind: "firmware".into(),
                filename: "fw.bin".into(),
                size: 1024
            }
        );
        assert_eq!(cmd.name(), "updateFirmware");
    }

    #[rstest]
    #[case("not json")]
    #[case(r#"{"index":1}"#)]
    #[case(r#"{"command":7}"#)]
    #[case(r#"{"command":"selectConfig"}"#)]
    #[case(r#"{"command":"calibrate","step":"dance"}"#)]
    fn malformed(#[case] json: &str) {
        assert!(matches!(decode(json), Err(CommandError::Malformed(_))));
    }

    #[test]
    fn unknown_command_is_named() {
        assert_eq!(
            decode(r#"{"command":"selfDestruct"}"#),
            Err(CommandError::Unknown("selfDestruct".into()))
        );
    }
}
