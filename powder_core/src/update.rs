//! One-shot firmware/filesystem update fed by binary transport frames.
use powder_traits::{UpdateKind, UpdateSink};

use crate::error::UpdateError;
use crate::hw_error::map_hw_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateProgress {
    pub kind: UpdateKind,
    pub received: usize,
    pub size: usize,
}

/// What a fed chunk did to the update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    /// More bytes expected.
    Partial,
    /// Image complete and accepted by the sink.
    Complete(UpdateKind),
}

#[derive(Debug, Default)]
pub struct UpdateTracker {
    active: Option<UpdateProgress>,
}

pub fn parse_kind(kind: &str) -> Result<UpdateKind, UpdateError> {
    match kind {
        "firmware" => Ok(UpdateKind::Firmware),
        "filesystem" => Ok(UpdateKind::Filesystem),
        other => Err(UpdateError::UnknownKind(other.to_string())),
    }
}

impl UpdateTracker {
    pub const fn new() -> Self {
        Self { active: None }
    }

    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub const fn progress(&self) -> Option<UpdateProgress> {
        self.active
    }

    pub fn begin(
        &mut self,
        kind: &str,
        filename: &str,
        size: usize,
        sink: &mut dyn UpdateSink,
    ) -> Result<UpdateKind, UpdateError> {
        if self.active.is_some() {
            return Err(UpdateError::AlreadyInProgress);
        }
        let kind = parse_kind(kind)?;
        if size == 0 {
            return Err(UpdateError::EmptyImage);
        }
        sink.begin(kind, size)
            .map_err(|e| UpdateError::Sink(map_hw_error(e.as_ref()).to_string()))?;
        tracing::info!(?kind, filename, size, "update started");
        self.active = Some(UpdateProgress {
            kind,
            received: 0,
            size,
        });
        Ok(kind)
    }

    /// Append a chunk, clamped to the bytes still expected. Any sink failure
    /// aborts the update and returns the tracker to idle.
    pub fn feed(
        &mut self,
        chunk: &[u8],
        sink: &mut dyn UpdateSink,
    ) -> Result<FeedOutcome, UpdateError> {
        let Some(mut p) = self.active else {
            return Err(UpdateError::NotInProgress);
        };
        let take = chunk.len().min(p.size - p.received);
        if take < chunk.len() {
            tracing::debug!(dropped = chunk.len() - take, "update chunk clamped to image size");
        }
        let mut rest = &chunk[..take];
        while !rest.is_empty() {
            match sink.write(rest) {
                Ok(0) => {
                    return Err(self.fail(sink, "update sink accepted no bytes".to_string()));
                }
                Ok(n) => {
                    let n = n.min(rest.len());
                    p.received += n;
                    rest = &rest[n..];
                }
                Err(e) => return Err(self.fail(sink, map_hw_error(e.as_ref()).to_string())),
            }
        }
        tracing::debug!(received = p.received, size = p.size, "update chunk written");
        if p.received < p.size {
            self.active = Some(p);
            return Ok(FeedOutcome::Partial);
        }
        if let Err(e) = sink.finish() {
            return Err(self.fail(sink, map_hw_error(e.as_ref()).to_string()));
        }
        self.active = None;
        tracing::info!(kind = ?p.kind, size = p.size, "update complete");
        Ok(FeedOutcome::Complete(p.kind))
    }

    fn fail(&mut self, sink: &mut dyn UpdateSink, message: String) -> UpdateError {
        tracing::warn!(error = %message, "update failed; aborting");
        sink.abort();
        self.active = None;
        UpdateError::Sink(message)
    }
}
