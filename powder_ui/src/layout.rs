use powder_traits::{Color, DisplaySurface};

/// Width in pixels of `text` in the built-in 6x8 font at `size`.
pub fn text_width(text: &str, size: u8) -> i32 {
    text.chars().count() as i32 * 6 * i32::from(size)
}

pub fn font_height(size: u8) -> i32 {
    8 * i32::from(size)
}

/// Integer linear map, as the display library's `map()` does it.
pub fn map_range(value: f32, in_min: f32, in_max: f32, out_min: i32, out_max: i32) -> i32 {
    if (in_max - in_min).abs() < f32::EPSILON {
        return out_min;
    }
    let t = (value - in_min) / (in_max - in_min);
    out_min + (t * (out_max - out_min) as f32) as i32
}

/// Rectangular touch target with a centered label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Button {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub label: &'static str,
    pub color: Color,
    pub enabled: bool,
}

impl Button {
    /// Edges are inclusive.
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        self.enabled && x >= self.x && x <= self.x + self.w && y >= self.y && y <= self.y + self.h
    }

    pub fn draw(&self, d: &mut dyn DisplaySurface, pressed: bool) {
        let bg = if pressed { Color::DarkGrey } else { Color::Black };
        let (border, text) = if self.enabled {
            (self.color, Color::White)
        } else {
            (Color::DarkGrey, Color::DarkGrey)
        };
        d.fill_rect(self.x, self.y, self.w, self.h, bg);
        d.draw_rect(self.x, self.y, self.w, self.h, border);
        d.set_text(1, text);
        let tx = self.x + (self.w - text_width(self.label, 1)) / 2;
        let ty = self.y + (self.h - font_height(1)) / 2;
        d.cursor_to(tx, ty);
        d.print(self.label);
    }
}

/// What a press on the measurement screen asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainAction {
    Calibrate,
    CycleProfile,
    Settings,
}

/// The three buttons along the bottom-left of the measurement screen.
#[derive(Debug, Clone, Copy)]
pub struct MainButtons {
    pub calibrate: Button,
    pub profile: Button,
    pub settings: Button,
}

pub const BUTTON_W: i32 = 50;
pub const BUTTON_H: i32 = 18;

impl MainButtons {
    pub fn for_panel(height: i32) -> Self {
        let y = height - BUTTON_H - 2;
        let mk = |x: i32, label: &'static str, color: Color| Button {
            x,
            y,
            w: BUTTON_W,
            h: BUTTON_H,
            label,
            color,
            enabled: true,
        };
        Self {
            calibrate: mk(5, "CAL", Color::Orange),
            profile: mk(5 + BUTTON_W + 5, "PROF", Color::Cyan),
            settings: mk(5 + 2 * (BUTTON_W + 5), "SET", Color::White),
        }
    }

    pub const fn hit_test(&self, x: i32, y: i32) -> Option<MainAction> {
        if self.calibrate.contains(x, y) {
            Some(MainAction::Calibrate)
        } else if self.profile.contains(x, y) {
            Some(MainAction::CycleProfile)
        } else if self.settings.contains(x, y) {
            Some(MainAction::Settings)
        } else {
            None
        }
    }

    pub fn draw(&self, d: &mut dyn DisplaySurface) {
        self.calibrate.draw(d, false);
        self.profile.draw(d, false);
        self.settings.draw(d, false);
    }
}
