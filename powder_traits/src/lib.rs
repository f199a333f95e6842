//! Collaborator interfaces for the PowderSense instrument.
//!
//! Everything the control loop touches outside its own state goes through one
//! of these traits: the analog probe, the display surface, the key-value
//! store, the network link, touch input, the status indicator, the update
//! sink, and the transport (event source + telemetry sink).
pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Raw analog depth source (external ADC or the MCU's internal ADC).
pub trait AnalogSource {
    /// One raw conversion in device counts.
    fn read_raw(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>>;

    /// Check once at startup whether the source is usable.
    fn probe(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// Palette understood by the display surface and the status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    White,
    Red,
    Green,
    Blue,
    Cyan,
    Orange,
    DarkGrey,
}

/// Opaque off-screen drawing surface; `push_frame` swaps it to the panel.
pub trait DisplaySurface {
    fn init(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
    fn width(&self) -> i32;
    fn height(&self) -> i32;
    fn clear(&mut self, color: Color);
    fn set_text(&mut self, size: u8, color: Color);
    fn cursor_to(&mut self, x: i32, y: i32);
    fn print(&mut self, text: &str);
    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color);
    fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color);
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color);
    fn push_frame(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Persistent key-value blob store (flash filesystem on the device).
pub trait BlobStore {
    fn mount(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, Box<dyn std::error::Error + Send + Sync>>;
    fn save(&mut self, key: &str, data: &[u8])
    -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn exists(&self, key: &str) -> bool;
    /// Remove every stored blob (factory reset).
    fn erase_all(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Which radio mode the network collaborator is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    Station,
    AccessPoint,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStatus {
    pub mode: LinkMode,
    pub connected: bool,
    pub ip: String,
    pub rssi: i32,
}

impl LinkStatus {
    /// Station mode with an established association.
    pub fn is_online(&self) -> bool {
        self.mode == LinkMode::Station && self.connected
    }
}

pub trait NetworkLink {
    fn status(&self) -> LinkStatus;
}

/// Touch controller, already decoded to screen coordinates.
pub trait TouchInput {
    fn poll_touch(&mut self) -> Option<(i32, i32)>;
}

/// Single RGB status LED.
pub trait StatusIndicator {
    fn show(&mut self, color: Color);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Firmware,
    Filesystem,
}

/// Destination for an update image streamed over the transport.
pub trait UpdateSink {
    fn begin(
        &mut self,
        kind: UpdateKind,
        size: usize,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn write(&mut self, chunk: &[u8]) -> Result<usize, Box<dyn std::error::Error + Send + Sync>>;
    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn abort(&mut self);
}

/// Request/response style queries (the HTTP side of the transport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    State,
    ExportCsv,
    /// Archived session export; `None` when the index parameter was missing.
    ExportSessionCsv { index: Option<i64> },
    SessionSummary { index: i64 },
    /// Current weight only, as `{"powderWeight": ...}`.
    Measurement,
}

/// Everything the transport can hand to the loop during one service call.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    ClientConnected { client: u8 },
    ClientDisconnected { client: u8 },
    /// A text frame carrying a JSON command.
    Text { client: u8, payload: String },
    /// A binary frame (update image chunk).
    Binary { client: u8, payload: Vec<u8> },
    Query { client: u8, query: Query },
}

/// Reply to a `Query`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    pub fn ok(content_type: &'static str, body: String) -> Self {
        Self {
            status: 200,
            content_type,
            body,
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: message.to_string(),
        }
    }
}

/// Non-blocking source of inbound events; returns `None` when drained.
pub trait EventSource {
    fn poll_event(&mut self) -> Option<InboundEvent>;
}

/// Outbound side of the transport.
pub trait TelemetrySink {
    /// Push a text frame to every connected client.
    fn broadcast(&mut self, text: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn reply(
        &mut self,
        client: u8,
        reply: Reply,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
