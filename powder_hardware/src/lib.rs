//! Hosted implementations of the instrument's collaborators.
//!
//! Every simulated peripheral is a cheap handle over shared state: clone it,
//! give one clone to the control loop and keep the other to drive or inspect it.
pub mod display;
pub mod error;
pub mod panel;
pub mod probe;
pub mod store;
pub mod transport;
pub mod update;

pub use display::RecordingDisplay;
pub use error::HwError;
pub use panel::{QueuedTouch, RecordingIndicator, StaticLink};
pub use probe::{ChargeCycle, CycleProbe, SimulatedProbe};
pub use store::{FsBlobStore, MemoryBlobStore};
pub use transport::{RecordingSink, ScriptedEvents};
pub use update::{MemoryUpdateSink, StagingUpdateSink};
