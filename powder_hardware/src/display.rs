use std::cell::RefCell;
use std::rc::Rc;

use powder_traits::{Color, DisplaySurface};

use crate::error::HwError;

/// Panel geometry of the instrument's landscape display.
pub const PANEL_WIDTH: i32 = 320;
pub const PANEL_HEIGHT: i32 = 172;

#[derive(Debug, Default)]
struct Recording {
    fail_init: bool,
    frames: u32,
    clears: u32,
    rects: u32,
    lines: u32,
    text: Vec<String>,
    last_frame: Vec<String>,
}

/// Off-screen surface that records what was drawn instead of driving a panel.
///
/// Text printed since the last `push_frame` becomes the frame's text when the
/// frame is pushed; tests inspect it through any clone.
#[derive(Debug, Clone)]
pub struct RecordingDisplay {
    width: i32,
    height: i32,
    rec: Rc<RefCell<Recording>>,
}

impl Default for RecordingDisplay {
    fn default() -> Self {
        Self::new(PANEL_WIDTH, PANEL_HEIGHT)
    }
}

impl RecordingDisplay {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            rec: Rc::new(RefCell::new(Recording::default())),
        }
    }

    /// A display whose initialization fails (no panel attached).
    pub fn broken() -> Self {
        let d = Self::default();
        d.rec.borrow_mut().fail_init = true;
        d
    }

    pub fn frames(&self) -> u32 {
        self.rec.borrow().frames
    }

    pub fn clears(&self) -> u32 {
        self.rec.borrow().clears
    }

    pub fn shapes(&self) -> u32 {
        let r = self.rec.borrow();
        r.rects + r.lines
    }

    pub fn last_frame_text(&self) -> Vec<String> {
        self.rec.borrow().last_frame.clone()
    }

    pub fn last_frame_contains(&self, needle: &str) -> bool {
        self.rec
            .borrow()
            .last_frame
            .iter()
            .any(|t| t.contains(needle))
    }
}

impl DisplaySurface for RecordingDisplay {
    fn init(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.rec.borrow().fail_init {
            return Err(HwError::Display("panel did not respond".into()).into());
        }
        Ok(())
    }

    fn width(&self) -> i32 {
        self.width
    }

    fn height(&self) -> i32 {
        self.height
    }

    fn clear(&mut self, _color: Color) {
        let mut r = self.rec.borrow_mut();
        r.clears += 1;
        r.text.clear();
    }

    fn set_text(&mut self, _size: u8, _color: Color) {}

    fn cursor_to(&mut self, _x: i32, _y: i32) {}

    fn print(&mut self, text: &str) {
        self.rec.borrow_mut().text.push(text.to_string());
    }

    fn fill_rect(&mut self, _x: i32, _y: i32, _w: i32, _h: i32, _color: Color) {
        self.rec.borrow_mut().rects += 1;
    }

    fn draw_rect(&mut self, _x: i32, _y: i32, _w: i32, _h: i32, _color: Color) {
        self.rec.borrow_mut().rects += 1;
    }

    fn draw_line(&mut self, _x0: i32, _y0: i32, _x1: i32, _y1: i32, _color: Color) {
        self.rec.borrow_mut().lines += 1;
    }

    fn push_frame(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut guard = self.rec.borrow_mut();
        let r = &mut *guard;
        r.frames += 1;
        r.last_frame = std::mem::take(&mut r.text);
        tracing::trace!(frame = r.frames, "frame pushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_frame_captures_printed_text() {
        let handle = RecordingDisplay::default();
        let mut d = handle.clone();
        d.clear(Color::Black);
        d.print("12.34");
        d.print("gr");
        d.push_frame().unwrap();
        assert_eq!(handle.frames(), 1);
        assert!(handle.last_frame_contains("12.34"));
        d.print("next");
        assert_eq!(handle.last_frame_text(), vec!["12.34", "gr"]);
    }

    #[test]
    fn broken_display_fails_init() {
        let mut d = RecordingDisplay::broken();
        assert!(d.init().is_err());
    }
}
