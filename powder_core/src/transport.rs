//! Event source fed from another thread over a bounded channel.
use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded};
use powder_traits::{EventSource, InboundEvent};

pub struct ChannelSource {
    rx: Receiver<InboundEvent>,
    disconnected: bool,
}

/// Bounded channel whose receiving half plugs into the control loop.
pub fn channel_source(capacity: usize) -> (Sender<InboundEvent>, ChannelSource) {
    let (tx, rx) = bounded(capacity.max(1));
    (
        tx,
        ChannelSource {
            rx,
            disconnected: false,
        },
    )
}

impl ChannelSource {
    /// All senders dropped and the queue drained.
    pub const fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

impl EventSource for ChannelSource {
    fn poll_event(&mut self) -> Option<InboundEvent> {
        match self.rx.try_recv() {
            Ok(ev) => Some(ev),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                if !self.disconnected {
                    tracing::debug!("event channel closed");
                    self.disconnected = true;
                }
                None
            }
        }
    }
}
