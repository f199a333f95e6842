//! Scripted transport for tests and demos.
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use powder_traits::{EventSource, InboundEvent, Reply, TelemetrySink};

use crate::error::HwError;

/// Event source replaying a queue of inbound events.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEvents {
    queue: Rc<RefCell<VecDeque<InboundEvent>>>,
}

impl ScriptedEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: InboundEvent) {
        self.queue.borrow_mut().push_back(event);
    }

    /// Queue a JSON text frame from client 0.
    pub fn push_text(&self, payload: &str) {
        self.push(InboundEvent::Text {
            client: 0,
            payload: payload.to_string(),
        });
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl EventSource for ScriptedEvents {
    fn poll_event(&mut self) -> Option<InboundEvent> {
        self.queue.borrow_mut().pop_front()
    }
}

#[derive(Debug, Default)]
struct SinkLog {
    broadcasts: Vec<String>,
    replies: Vec<(u8, Reply)>,
    failing: bool,
}

/// Telemetry sink that keeps every frame and reply it was given.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    log: Rc<RefCell<SinkLog>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.log.borrow_mut().failing = failing;
    }

    pub fn broadcasts(&self) -> Vec<String> {
        self.log.borrow().broadcasts.clone()
    }

    pub fn last_broadcast(&self) -> Option<String> {
        self.log.borrow().broadcasts.last().cloned()
    }

    pub fn replies(&self) -> Vec<(u8, Reply)> {
        self.log.borrow().replies.clone()
    }

    pub fn clear(&self) {
        let mut log = self.log.borrow_mut();
        log.broadcasts.clear();
        log.replies.clear();
    }
}

impl TelemetrySink for RecordingSink {
    fn broadcast(&mut self, text: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut log = self.log.borrow_mut();
        if log.failing {
            return Err(HwError::Transport("socket closed".into()).into());
        }
        log.broadcasts.push(text.to_string());
        Ok(())
    }

    fn reply(
        &mut self,
        client: u8,
        reply: Reply,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut log = self.log.borrow_mut();
        if log.failing {
            return Err(HwError::Transport("socket closed".into()).into());
        }
        log.replies.push((client, reply));
        Ok(())
    }
}
