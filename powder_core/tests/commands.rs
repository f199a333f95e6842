mod common;

use common::{Rig, calibrated_profile, ticks};
use powder_core::{CalibrationState, CoreCfg, TickOutcome};
use powder_traits::{InboundEvent, Query};
use rstest::rstest;
use serde_json::Value;

fn save(rig: &Rig, index: usize, caliber: &str, target: f32) {
    rig.send(&format!(
        r#"{{"command":"saveConfig","data":{{"index":{index},"caliber":"{caliber}","bulletWeight":"150","powderName":"IMR4064","targetGrain":{target}}}}}"#
    ));
}

fn binary(rig: &Rig, bytes: &[u8]) {
    rig.events.push(InboundEvent::Binary {
        client: 0,
        payload: bytes.to_vec(),
    });
}

fn update_statuses(rig: &Rig) -> Vec<Value> {
    rig.sink
        .broadcasts()
        .iter()
        .filter_map(|b| serde_json::from_str::<Value>(b).ok())
        .filter(|v| v.get("updateStatus").is_some())
        .collect()
}

fn stored_settings(rig: &Rig) -> Value {
    let raw = rig.store.get("/settings.json").expect("settings written");
    serde_json::from_slice(&raw).expect("settings are json")
}

// ── Queries ──────────────────────────────────────────────────────────────────

#[rstest]
#[case(Query::ExportSessionCsv { index: None }, 400, "Missing session index parameter")]
#[case(Query::ExportSessionCsv { index: Some(0) }, 404, "Session not found")]
#[case(Query::ExportSessionCsv { index: Some(-1) }, 404, "Session not found")]
#[case(Query::SessionSummary { index: 3 }, 404, "Session not found")]
fn query_errors(#[case] query: Query, #[case] status: u16, #[case] body: &str) {
    let rig = Rig::new();
    let mut ctl = rig.boot();
    rig.query(4, query);
    ctl.tick();
    let replies = rig.sink.replies();
    assert_eq!(replies.len(), 1);
    let (client, reply) = &replies[0];
    assert_eq!(*client, 4);
    assert_eq!(reply.status, status);
    assert!(reply.body.contains(body), "body was {:?}", reply.body);
}

#[test]
fn state_query_returns_snapshot() {
    let rig = Rig::new();
    let mut ctl = rig.boot();
    rig.query(1, Query::State);
    ctl.tick();
    let (_, reply) = rig.sink.replies().remove(0);
    assert_eq!(reply.status, 200);
    assert_eq!(reply.content_type, "application/json");
    let v: Value = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(v["currentConfigIndex"], -1);
    assert!(v["powderConfigs"].as_array().unwrap().is_empty());
    assert!(v["stats"].get("standardDeviation").is_some());
}

#[test]
fn measurement_query_reports_current_weight() {
    let rig = Rig::new();
    let mut ctl = rig.boot();
    calibrated_profile(&rig, &mut ctl, 24.5);
    rig.probe.set_raw(345);
    ticks(&mut ctl, 5);
    rig.sink.clear();
    rig.query(2, Query::Measurement);
    ctl.tick();
    let (client, reply) = rig.sink.replies().remove(0);
    assert_eq!(client, 2);
    assert_eq!(reply.status, 200);
    assert_eq!(reply.content_type, "application/json");
    let v: Value = serde_json::from_str(&reply.body).unwrap();
    assert!((v["powderWeight"].as_f64().unwrap() - 24.5).abs() < 1e-3);
}

#[test]
fn exports_follow_the_session_lifecycle() {
    let rig = Rig::new();
    let mut ctl = rig.boot();
    calibrated_profile(&rig, &mut ctl, 24.5);
    rig.probe.set_raw(345);
    ticks(&mut ctl, 5);
    rig.send(r#"{"command":"measure"}"#);
    rig.send(r#"{"command":"measure"}"#);
    rig.query(0, Query::ExportCsv);
    ctl.tick();

    let (_, live) = rig.sink.replies().remove(0);
    assert_eq!(live.content_type, "text/csv");
    let lines: Vec<&str> = live.body.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Timestamp,Weight(grains)"));
    assert!(lines[1].contains(",24.500,308 168gr Varget"), "{}", lines[1]);

    rig.send(r#"{"command":"endSession"}"#);
    ctl.tick();
    rig.sink.clear();
    rig.query(0, Query::ExportCsv);
    rig.query(0, Query::ExportSessionCsv { index: Some(0) });
    rig.query(0, Query::SessionSummary { index: 0 });
    ctl.tick();
    let replies = rig.sink.replies();
    assert_eq!(replies[0].1.body.lines().count(), 1, "history drained");
    assert_eq!(replies[1].1.status, 200);
    assert_eq!(replies[1].1.body.lines().count(), 3);
    let summary = &replies[2].1.body;
    assert!(summary.starts_with("PowderSense Session Export"));
    assert!(summary.contains("Total Bullets,2"));
    assert!(summary.contains("Average Weight (gr),24.500"));
}

#[test]
fn out_of_range_session_log_is_dropped_at_boot() {
    let rig = Rig::new();
    rig.store.insert(
        "/settings.json",
        br#"{"sessionLogs":[{"startTime":1,"endTime":2,"bulletCount":1,"totalWeight":24.5,
            "measurementStart":18446744073709551615,"measurementCount":1}]}"#,
    );
    let mut ctl = rig.boot();
    assert!(ctl.ledger().logs().is_empty());

    calibrated_profile(&rig, &mut ctl, 24.5);
    rig.probe.set_raw(345);
    ticks(&mut ctl, 5);
    rig.send(r#"{"command":"measure"}"#);
    rig.send(r#"{"command":"endSession"}"#);
    rig.query(0, Query::ExportSessionCsv { index: Some(0) });
    ctl.tick();
    let (_, reply) = rig.sink.replies().remove(0);
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body.lines().count(), 2);
    assert!(reply.body.contains(",24.500,"));
}

#[test]
fn empty_session_is_not_logged() {
    let rig = Rig::new();
    let mut ctl = rig.boot();
    rig.send(r#"{"command":"endSession"}"#);
    rig.send(r#"{"command":"startSession"}"#);
    rig.send(r#"{"command":"resetSession"}"#);
    ctl.tick();
    assert!(ctl.ledger().logs().is_empty());
    assert_eq!(rig.last_state()["sessionLogs"].as_array().unwrap().len(), 0);
}

// ── Update streaming ─────────────────────────────────────────────────────────

#[test]
fn update_streams_then_requests_restart() {
    let rig = Rig::new();
    let mut ctl = rig.boot();
    rig.send(r#"{"command":"updateFirmware","type":"firmware","filename":"fw.bin","size":6}"#);
    ctl.tick();
    assert_eq!(update_statuses(&rig), vec![serde_json::json!({"updateStatus": "started"})]);
    assert!(ctl.update().is_active());

    binary(&rig, &[1, 2, 3, 4]);
    assert_eq!(ctl.tick(), TickOutcome::Continue);
    // trailing bytes past the announced size are dropped
    binary(&rig, &[5, 6, 7, 8]);
    assert_eq!(ctl.tick(), TickOutcome::RestartRequested);

    assert_eq!(rig.update.bytes(), vec![1, 2, 3, 4, 5, 6]);
    assert!(rig.update.finished());
    assert_eq!(
        update_statuses(&rig).last().unwrap(),
        &serde_json::json!({"updateStatus": "success"})
    );
    assert!(ctl.restart_requested());
}

#[test]
fn failed_finish_reports_error_and_stays_up() {
    let rig = Rig::new();
    let mut ctl = rig.boot();
    rig.update.set_fail_finish(true);
    rig.send(r#"{"command":"updateFirmware","type":"filesystem","size":2}"#);
    ctl.tick();
    binary(&rig, &[9, 9]);
    assert_eq!(ctl.tick(), TickOutcome::Continue);

    let last = update_statuses(&rig).pop().unwrap();
    assert_eq!(last["updateStatus"], "error");
    assert!(last["message"].as_str().unwrap().contains("update sink"));
    assert!(rig.update.aborted());
    assert!(!ctl.update().is_active());
}

#[rstest]
#[case(r#"{"command":"updateFirmware","type":"bootloader","size":10}"#)]
#[case(r#"{"command":"updateFirmware","type":"firmware","size":0}"#)]
fn rejected_update_never_starts(#[case] frame: &str) {
    let rig = Rig::new();
    let mut ctl = rig.boot();
    rig.send(frame);
    ctl.tick();
    assert!(update_statuses(&rig).is_empty());
    assert!(!ctl.update().is_active());
    // binary frames without an update are ignored
    binary(&rig, &[1, 2, 3]);
    assert_eq!(ctl.tick(), TickOutcome::Continue);
    assert!(rig.update.bytes().is_empty());
}

#[test]
fn second_update_is_refused_while_one_runs() {
    let rig = Rig::new();
    let mut ctl = rig.boot();
    rig.send(r#"{"command":"updateFirmware","type":"firmware","size":4}"#);
    rig.send(r#"{"command":"updateFirmware","type":"filesystem","size":8}"#);
    ctl.tick();
    assert_eq!(update_statuses(&rig).len(), 1);
    assert_eq!(ctl.update().progress().unwrap().size, 4);
}

// ── Profiles ─────────────────────────────────────────────────────────────────

#[test]
fn select_out_of_range_keeps_selection() {
    let rig = Rig::new();
    let mut ctl = rig.boot();
    save(&rig, 0, "30-06", 50.0);
    rig.send(r#"{"command":"selectConfig","index":0}"#);
    rig.send(r#"{"command":"selectConfig","index":5}"#);
    ctl.tick();
    assert_eq!(ctl.profiles().active_index(), Some(0));
    assert_eq!(rig.last_state()["currentConfigIndex"], 0);

    rig.send(r#"{"command":"selectConfig","index":-1}"#);
    ctl.tick();
    assert_eq!(ctl.profiles().active_index(), None);
}

#[test]
fn save_stops_at_capacity() {
    let rig = Rig::new();
    let mut cfg = CoreCfg::default();
    cfg.capacity.profiles = 2;
    let mut ctl = rig.boot_with(cfg);
    save(&rig, 0, "a", 1.0);
    save(&rig, 1, "b", 2.0);
    save(&rig, 2, "c", 3.0);
    ctl.tick();
    assert_eq!(ctl.profiles().len(), 2);

    // updating an existing slot still works
    save(&rig, 1, "bb", 2.5);
    ctl.tick();
    assert_eq!(ctl.profiles().profiles()[1].caliber, "bb");
}

#[test]
fn deleting_active_profile_cancels_calibration() {
    let rig = Rig::new();
    let mut ctl = rig.boot();
    save(&rig, 0, "243", 38.0);
    save(&rig, 1, "6.5", 41.0);
    rig.send(r#"{"command":"selectConfig","index":0}"#);
    rig.send(r#"{"command":"calibrate","step":"startWizard"}"#);
    ctl.tick();
    assert_eq!(ctl.calibration_state(), CalibrationState::ZeroStep);

    rig.send(r#"{"command":"deleteConfig","index":0}"#);
    ctl.tick();
    assert_eq!(ctl.calibration_state(), CalibrationState::None);
    assert_eq!(ctl.profiles().active_index(), None);
    assert_eq!(ctl.profiles().profiles()[0].caliber, "6.5");
    assert_eq!(stored_settings(&rig)["powderConfigs"].as_array().unwrap().len(), 1);
}

#[test]
fn deleting_earlier_profile_keeps_selection() {
    let rig = Rig::new();
    let mut ctl = rig.boot();
    save(&rig, 0, "243", 38.0);
    save(&rig, 1, "6.5", 41.0);
    rig.send(r#"{"command":"selectConfig","index":1}"#);
    rig.send(r#"{"command":"deleteConfig","index":0}"#);
    ctl.tick();
    assert_eq!(ctl.profiles().active().unwrap().caliber, "6.5");
    assert_eq!(ctl.profiles().active_index(), Some(0));
}

#[test]
fn empty_import_cancels_calibration() {
    let rig = Rig::new();
    let mut ctl = rig.boot();
    save(&rig, 0, "243", 38.0);
    rig.send(r#"{"command":"selectConfig","index":0}"#);
    rig.send(r#"{"command":"calibrate","step":"startWizard"}"#);
    ctl.tick();
    rig.send(r#"{"command":"importConfigs","configs":[]}"#);
    ctl.tick();
    assert!(ctl.profiles().is_empty());
    assert_eq!(ctl.calibration_state(), CalibrationState::None);
}

#[test]
fn import_replaces_profiles_and_persists() {
    let rig = Rig::new();
    let mut ctl = rig.boot();
    save(&rig, 0, "243", 38.0);
    ctl.tick();
    rig.send(
        r#"{"command":"importConfigs","configs":[
            {"name":"A","caliber":"223","bulletWeight":"55","powderName":"H335","targetGrain":25.0},
            {"name":"B","caliber":"308","bulletWeight":"175","powderName":"Varget","targetGrain":43.0}
        ]}"#,
    );
    ctl.tick();
    assert_eq!(ctl.profiles().len(), 2);
    let stored = stored_settings(&rig);
    assert_eq!(stored["powderConfigs"][1]["caliber"], "308");
}

// ── Alarm and settings ───────────────────────────────────────────────────────

#[test]
fn set_alarms_persists_and_acknowledge_clears() {
    let rig = Rig::new();
    let mut ctl = rig.boot();
    rig.send(r#"{"command":"setAlarms","enabled":true,"lowThreshold":10.0,"highThreshold":20.0}"#);
    ctl.tick();
    let stored = stored_settings(&rig);
    assert_eq!(stored["lowThreshold"], 10.0);
    assert_eq!(stored["highThreshold"], 20.0);
    assert_eq!(stored["alarmEnabled"], true);

    // weight 0 sits below the band
    ticks(&mut ctl, 2);
    assert!(ctl.alarm().is_active());
    rig.send(r#"{"command":"acknowledgeAlarm"}"#);
    ctl.tick();
    assert_eq!(rig.last_state()["alarmActive"], false);
}

#[test]
fn set_setting_is_accepted_but_changes_nothing() {
    let rig = Rig::new();
    let mut ctl = rig.boot();
    ctl.tick();
    let saves = rig.store.save_count();
    rig.sink.clear();
    rig.send(r#"{"command":"setSetting","key":"brightness","value":80}"#);
    ctl.tick();
    assert_eq!(rig.store.save_count(), saves);
    assert_eq!(rig.sink.broadcasts().len(), 1, "decoded commands publish");
}

#[rstest]
#[case("not json")]
#[case(r#"{"command":"selfDestruct"}"#)]
#[case(r#"{"index":2}"#)]
#[case(r#"{"command":"selectConfig"}"#)]
fn undecodable_frames_do_not_publish(#[case] frame: &str) {
    let rig = Rig::new();
    let mut ctl = rig.boot();
    ctl.tick();
    rig.sink.clear();
    rig.send(frame);
    ctl.tick();
    assert!(rig.sink.broadcasts().is_empty());
}

#[test]
fn failed_persist_keeps_state_in_memory() {
    let rig = Rig::new();
    let mut ctl = rig.boot();
    rig.store.set_fail_saves(true);
    save(&rig, 0, "243", 38.0);
    ctl.tick();
    assert_eq!(ctl.profiles().len(), 1);
    assert!(rig.store.get("/settings.json").is_none());
}
