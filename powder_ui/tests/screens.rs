use powder_hardware::RecordingDisplay;
use powder_traits::{Color, DisplaySurface};
use powder_ui::{
    AccessPointView, CalibrationPrompt, CalibrationView, MainAction, MainButtons,
    MeasurementView, draw_access_point, draw_calibration, draw_measurement,
};
use rstest::rstest;

fn view(weight: f32, profile: Option<(&str, f32)>) -> MeasurementView<'_> {
    MeasurementView {
        weight,
        alarm_active: false,
        alarm_enabled: true,
        low: 24.4,
        high: 24.6,
        profile,
        ip: "10.0.0.7",
    }
}

#[rstest]
#[case(24.5, Some(("308 Win", 24.5)), "PERFECT", Color::Green)]
#[case(24.0, Some(("308 Win", 24.5)), "LOW", Color::Blue)]
#[case(25.0, Some(("308 Win", 24.5)), "HIGH", Color::Red)]
#[case(25.0, None, "Powdersense", Color::White)]
fn verdict_follows_thresholds(
    #[case] weight: f32,
    #[case] profile: Option<(&'static str, f32)>,
    #[case] word: &str,
    #[case] color: Color,
) {
    assert_eq!(view(weight, profile).verdict(), (word, color));
}

#[test]
fn measurement_screen_prints_weight_profile_and_ip() {
    let handle = RecordingDisplay::default();
    let mut d = handle.clone();
    let buttons = MainButtons::for_panel(d.height());
    draw_measurement(&mut d, &view(24.5, Some(("308 Win 168gr", 24.5))), &buttons);
    d.push_frame().unwrap();
    assert!(handle.last_frame_contains("24.500 grain"));
    assert!(handle.last_frame_contains("308 Win 168gr"));
    assert!(handle.last_frame_contains("T: 24.500 gr"));
    assert!(handle.last_frame_contains("10.0.0.7"));
    assert!(handle.last_frame_contains("CAL"));
}

#[test]
fn measurement_screen_without_profile() {
    let handle = RecordingDisplay::default();
    let mut d = handle.clone();
    let buttons = MainButtons::for_panel(d.height());
    draw_measurement(&mut d, &view(0.0, None), &buttons);
    d.push_frame().unwrap();
    assert!(handle.last_frame_contains("No Config"));
    assert!(handle.last_frame_contains("T: ---"));
}

#[rstest]
#[case(CalibrationPrompt::Zero, "Step 1/2: Set Zero")]
#[case(CalibrationPrompt::KnownGrains, "Step 2/2: Known Grains")]
fn calibration_screen_shows_step(#[case] prompt: CalibrationPrompt, #[case] title: &str) {
    let handle = RecordingDisplay::default();
    let mut d = handle.clone();
    draw_calibration(
        &mut d,
        &CalibrationView {
            prompt,
            raw_average: 1234.0,
            weight: 3.25,
        },
    );
    d.push_frame().unwrap();
    assert!(handle.last_frame_contains(title));
    assert!(handle.last_frame_contains("Cancel via Web UI."));
}

#[test]
fn access_point_screen_shows_ssid_and_ip() {
    let handle = RecordingDisplay::default();
    let mut d = handle.clone();
    draw_access_point(
        &mut d,
        &AccessPointView {
            ssid: "PowderSense",
            ip: "192.168.4.1",
        },
    );
    d.push_frame().unwrap();
    assert!(handle.last_frame_contains("SSID: PowderSense"));
    assert!(handle.last_frame_contains("IP: 192.168.4.1"));
}

#[test]
fn buttons_hit_test_bottom_row() {
    let b = MainButtons::for_panel(172);
    let y = b.calibrate.y + 5;
    assert_eq!(b.hit_test(b.calibrate.x + 1, y), Some(MainAction::Calibrate));
    assert_eq!(b.hit_test(b.profile.x + 1, y), Some(MainAction::CycleProfile));
    assert_eq!(b.hit_test(b.settings.x + b.settings.w, y), Some(MainAction::Settings));
    assert_eq!(b.hit_test(300, 10), None);
}
