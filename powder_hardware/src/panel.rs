//! Front-panel peripherals: network link status, touch input, status LED.
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use powder_traits::{Color, LinkMode, LinkStatus, NetworkLink, StatusIndicator, TouchInput};

/// Link whose status is fixed at construction but can be toggled by tests.
#[derive(Debug, Clone)]
pub struct StaticLink {
    status: Rc<RefCell<LinkStatus>>,
}

impl StaticLink {
    pub fn new(status: LinkStatus) -> Self {
        Self {
            status: Rc::new(RefCell::new(status)),
        }
    }

    pub fn station(ip: &str, rssi: i32) -> Self {
        Self::new(LinkStatus {
            mode: LinkMode::Station,
            connected: true,
            ip: ip.to_string(),
            rssi,
        })
    }

    pub fn access_point(ip: &str) -> Self {
        Self::new(LinkStatus {
            mode: LinkMode::AccessPoint,
            connected: false,
            ip: ip.to_string(),
            rssi: 0,
        })
    }

    pub fn offline() -> Self {
        Self::new(LinkStatus {
            mode: LinkMode::Offline,
            connected: false,
            ip: String::new(),
            rssi: 0,
        })
    }

    pub fn set_connected(&self, connected: bool) {
        self.status.borrow_mut().connected = connected;
    }

    pub fn set_mode(&self, mode: LinkMode) {
        self.status.borrow_mut().mode = mode;
    }
}

impl NetworkLink for StaticLink {
    fn status(&self) -> LinkStatus {
        self.status.borrow().clone()
    }
}

/// Touch controller fed from a queue of pre-decoded presses.
#[derive(Debug, Clone, Default)]
pub struct QueuedTouch {
    presses: Rc<RefCell<VecDeque<(i32, i32)>>>,
}

impl QueuedTouch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, x: i32, y: i32) {
        self.presses.borrow_mut().push_back((x, y));
    }

    pub fn pending(&self) -> usize {
        self.presses.borrow().len()
    }
}

impl TouchInput for QueuedTouch {
    fn poll_touch(&mut self) -> Option<(i32, i32)> {
        self.presses.borrow_mut().pop_front()
    }
}

/// Status LED that remembers its current colour and how often it changed.
#[derive(Debug, Clone, Default)]
pub struct RecordingIndicator {
    color: Rc<Cell<Option<Color>>>,
    changes: Rc<Cell<u32>>,
}

impl RecordingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color(&self) -> Option<Color> {
        self.color.get()
    }

    pub fn changes(&self) -> u32 {
        self.changes.get()
    }
}

impl StatusIndicator for RecordingIndicator {
    fn show(&mut self, color: Color) {
        if self.color.get() != Some(color) {
            self.color.set(Some(color));
            self.changes.set(self.changes.get() + 1);
            tracing::trace!(?color, "indicator changed");
        }
    }
}
