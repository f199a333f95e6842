use std::fs;

use powder_config::{NetworkMode, SourceChoice, load_file, load_toml};
use rstest::rstest;
use tempfile::tempdir;

#[test]
fn empty_file_yields_factory_defaults() {
    let cfg = load_toml("").expect("parse empty TOML");
    cfg.validate().expect("defaults must validate");
    assert_eq!(cfg.sampler.window, 5);
    assert_eq!(cfg.sampler.primary, SourceChoice::External);
    assert_eq!(cfg.auto_measure.stable_ms, 750);
    assert_eq!(cfg.auto_measure.max_stable_ms, 30_000);
    assert_eq!(cfg.auto_measure.cooldown_ms, 10_000);
    assert_eq!(cfg.schedule.display_interval_ms, 100);
    assert_eq!(cfg.schedule.telemetry_interval_ms, 500);
    assert_eq!(cfg.capacity.profiles, 20);
    assert_eq!(cfg.capacity.history, 100);
    assert_eq!(cfg.capacity.session_logs, 50);
    assert_eq!(cfg.storage.settings_key, "/settings.json");
    assert_eq!(cfg.network.mode, NetworkMode::Station);
}

#[test]
fn partial_sections_keep_other_defaults() {
    let toml = r#"
[sampler]
window = 8
primary = "internal"

[network]
mode = "access_point"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid");
    assert_eq!(cfg.sampler.window, 8);
    assert_eq!(cfg.sampler.primary, SourceChoice::Internal);
    assert!(cfg.sampler.fallback_on_probe_failure);
    assert_eq!(cfg.network.mode, NetworkMode::AccessPoint);
    assert_eq!(cfg.network.ip, "192.168.4.1");
}

#[rstest]
#[case("[sampler]\nwindow = 0", "sampler.window must be >= 1")]
#[case("[calibration]\nepsilon = 0.0", "calibration.epsilon must be > 0.0")]
#[case("[auto_measure]\nstable_ms = 0", "auto_measure.stable_ms must be >= 1")]
#[case(
    "[auto_measure]\nstable_ms = 800\nmax_stable_ms = 700",
    "max_stable_ms must be greater"
)]
#[case(
    "[schedule]\ndisplay_interval_ms = 600\ntelemetry_interval_ms = 500",
    "telemetry_interval_ms must be >="
)]
#[case("[capacity]\nhistory = 0", "capacity.history must be >= 1")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation must be one of")]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "unexpected message: {err}"
    );
}

#[test]
fn unknown_source_is_a_parse_error() {
    let err = load_toml("[sampler]\nprimary = \"spi\"").expect_err("should fail");
    assert!(format!("{err}").contains("unknown variant"));
}

#[test]
fn load_file_reads_and_validates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("powdersense.toml");
    fs::write(&path, "[schedule]\ntick_delay_ms = 2\n").unwrap();
    let cfg = load_file(&path).expect("load");
    assert_eq!(cfg.schedule.tick_delay_ms, 2);

    fs::write(&path, "[capacity]\nprofiles = 0\n").unwrap();
    let err = load_file(&path).expect_err("invalid capacity");
    assert!(format!("{err}").contains("capacity.profiles"));
}

#[test]
fn load_file_reports_missing_path() {
    let dir = tempdir().unwrap();
    let err = load_file(&dir.path().join("nope.toml")).expect_err("missing file");
    assert!(format!("{err}").contains("read config"));
}
