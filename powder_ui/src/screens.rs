use powder_traits::{Color, DisplaySurface};

use crate::layout::{MainButtons, font_height, map_range, text_width};

/// Which layout is on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Measurement,
    Calibration,
    AccessPoint,
}

/// Everything the measurement screen shows.
#[derive(Debug, Clone, Copy)]
pub struct MeasurementView<'a> {
    pub weight: f32,
    pub alarm_active: bool,
    pub alarm_enabled: bool,
    pub low: f32,
    pub high: f32,
    /// Name and target of the active profile.
    pub profile: Option<(&'a str, f32)>,
    pub ip: &'a str,
}

impl MeasurementView<'_> {
    /// Verdict word and its colour.
    pub const fn verdict(&self) -> (&'static str, Color) {
        if self.profile.is_none() {
            ("Powdersense", Color::White)
        } else if self.weight < self.low {
            ("LOW", Color::Blue)
        } else if self.weight > self.high {
            ("HIGH", Color::Red)
        } else {
            ("PERFECT", Color::Green)
        }
    }

    pub const fn bar_color(&self) -> Color {
        if self.alarm_active {
            Color::Red
        } else if self.alarm_enabled && self.weight < self.low {
            Color::Blue
        } else if self.alarm_enabled && self.weight > self.high {
            Color::Red
        } else {
            Color::Green
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPrompt {
    Zero,
    KnownGrains,
}

#[derive(Debug, Clone, Copy)]
pub struct CalibrationView {
    pub prompt: CalibrationPrompt,
    pub raw_average: f32,
    pub weight: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct AccessPointView<'a> {
    pub ssid: &'a str,
    pub ip: &'a str,
}

fn centered(d: &mut dyn DisplaySurface, y: i32, size: u8, color: Color, text: &str) {
    let x = (d.width() - text_width(text, size)) / 2;
    d.set_text(size, color);
    d.cursor_to(x, y);
    d.print(text);
}

fn line(d: &mut dyn DisplaySurface, x: i32, y: i32, size: u8, color: Color, text: &str) {
    d.set_text(size, color);
    d.cursor_to(x, y);
    d.print(text);
}

pub fn draw_measurement(d: &mut dyn DisplaySurface, v: &MeasurementView<'_>, buttons: &MainButtons) {
    let (width, height) = (d.width(), d.height());

    centered(d, 5, 3, Color::White, &format!("{:.3} grain", v.weight));

    match v.profile {
        Some((name, target)) => {
            line(d, 5, 45, 2, Color::Cyan, name);
            line(d, 5, 70, 2, Color::Cyan, &format!("T: {target:.3} gr"));
        }
        None => {
            line(d, 5, 45, 2, Color::Cyan, "No Config");
            line(d, 5, 70, 2, Color::Cyan, "T: ---");
        }
    }

    let (word, color) = v.verdict();
    centered(d, height - font_height(3) - 25, 3, color, word);

    buttons.draw(d);
    let ip_x = buttons.settings.x + buttons.settings.w + 10;
    line(d, ip_x, height - 12, 1, Color::White, v.ip);

    // vertical bar on the right edge
    let (bar_x, bar_y, bar_w, bar_h) = (width - 50, 5, 40, height - 10);
    d.draw_rect(bar_x, bar_y, bar_w, bar_h, Color::White);
    let max = (v.high * 1.2).max(10.0);
    let fill = map_range(v.weight, 0.0, max, 0, bar_h).clamp(0, bar_h);
    if fill > 2 {
        d.fill_rect(
            bar_x + 1,
            bar_y + bar_h - fill + 1,
            bar_w - 2,
            fill - 2,
            v.bar_color(),
        );
    }
    if v.alarm_enabled {
        for threshold in [v.low, v.high] {
            let y = bar_y + bar_h - map_range(threshold, 0.0, max, 0, bar_h).clamp(0, bar_h);
            d.draw_line(bar_x, y, bar_x + bar_w - 1, y, Color::Blue);
        }
    }
}

pub fn draw_calibration(d: &mut dyn DisplaySurface, v: &CalibrationView) {
    let height = d.height();
    line(d, 5, 5, 1, Color::White, "--- CALIBRATION WIZARD ---");
    match v.prompt {
        CalibrationPrompt::Zero => {
            line(d, 5, 30, 2, Color::White, "Step 1/2: Set Zero");
            line(d, 5, 60, 1, Color::White, "Place probe at 0mm");
            line(d, 5, 75, 1, Color::White, "(empty container).");
            line(d, 5, 100, 1, Color::White, &format!("ADC: {:.0}", v.raw_average));
            line(d, 5, 120, 1, Color::White, "Confirm on Web UI.");
        }
        CalibrationPrompt::KnownGrains => {
            line(d, 5, 30, 2, Color::White, "Step 2/2: Known Grains");
            line(d, 5, 60, 1, Color::White, "Insert probe into");
            line(d, 5, 75, 1, Color::White, "container w/ powder.");
            line(d, 5, 100, 1, Color::White, &format!("Weight: {:.3} gr", v.weight));
            line(d, 5, 120, 1, Color::White, "Enter weight on Web UI.");
        }
    }
    line(d, 5, height - 15, 1, Color::White, "Cancel via Web UI.");
}

pub fn draw_access_point(d: &mut dyn DisplaySurface, v: &AccessPointView<'_>) {
    line(d, 5, 5, 1, Color::White, "--- AP MODE ACTIVE ---");
    line(d, 5, 30, 2, Color::White, &format!("SSID: {}", v.ssid));
    line(d, 5, 60, 2, Color::White, &format!("IP: {}", v.ip));
    line(d, 5, 90, 1, Color::White, "Connect to this network");
    line(d, 5, 105, 1, Color::White, "to configure Wi-Fi.");
}
