use powder_hardware::{ChargeCycle, CycleProbe, FsBlobStore, HwError, SimulatedProbe};
use powder_traits::clock::test_clock::TestClock;
use powder_traits::{AnalogSource, BlobStore};
use rstest::rstest;

#[rstest]
#[case(0, 500)]
#[case(999, 500)]
#[case(2_000, 625)]
#[case(3_000, 750)]
#[case(4_999, 750)]
#[case(5_000, 500)]
fn cycle_probe_tracks_phase(#[case] at_ms: u64, #[case] expected: i32) {
    let clock = TestClock::new();
    let cycle = ChargeCycle {
        zero_raw: 500,
        plateau_raw: 750,
        ..ChargeCycle::default()
    };
    let mut probe = CycleProbe::new(clock.clone(), cycle);
    clock.advance_ms(at_ms);
    assert_eq!(probe.read_raw().unwrap(), expected);
}

#[test]
fn probe_errors_downcast_to_hw_error() {
    let mut probe = SimulatedProbe::new(1);
    probe.fail_next(1);
    let err = probe.read_raw().expect_err("timeout");
    match err.downcast_ref::<HwError>() {
        Some(HwError::Timeout) => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn fs_store_survives_remount() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("store");
    {
        let mut store = FsBlobStore::new(&root);
        store.mount().unwrap();
        store.save("/settings.json", br#"{"alarmEnabled":false}"#).unwrap();
    }
    let mut again = FsBlobStore::new(&root);
    again.mount().unwrap();
    let bytes = again.load("/settings.json").unwrap().expect("persisted");
    assert_eq!(bytes, br#"{"alarmEnabled":false}"#);
}
