//! Analog acquisition with a fixed moving-average window.
//!
//! One raw read per `sample()` call. The average covers however many readings
//! exist until the window fills, then exactly `window` readings. A failed read
//! repeats the previous raw value so the average never sees a gap.
use powder_traits::AnalogSource;

use crate::hw_error::map_hw_error;

/// Which of the two analog sources the sampler settled on at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Primary,
    Secondary,
}

pub struct AnalogSampler {
    source: Box<dyn AnalogSource>,
    active: SourceKind,
    ring: Vec<i32>,
    next: usize,
    filled: usize,
    last_raw: i32,
    read_failures: u64,
}

impl AnalogSampler {
    /// Sample `source` directly, without a startup probe.
    pub fn new(source: Box<dyn AnalogSource>, window: usize) -> Self {
        Self::from_source(source, SourceKind::Primary, window)
    }

    /// Probe `primary` once; if it is unusable, use `secondary` for the
    /// sampler's lifetime.
    pub fn with_fallback(
        mut primary: Box<dyn AnalogSource>,
        secondary: Box<dyn AnalogSource>,
        window: usize,
    ) -> Self {
        match primary.probe() {
            Ok(()) => {
                tracing::info!("primary analog source ready");
                Self::from_source(primary, SourceKind::Primary, window)
            }
            Err(e) => {
                let err = map_hw_error(e.as_ref());
                tracing::warn!(error = %err, "primary analog source unavailable; using secondary");
                Self::from_source(secondary, SourceKind::Secondary, window)
            }
        }
    }

    fn from_source(source: Box<dyn AnalogSource>, active: SourceKind, window: usize) -> Self {
        Self {
            source,
            active,
            ring: vec![0; window.max(1)],
            next: 0,
            filled: 0,
            last_raw: 0,
            read_failures: 0,
        }
    }

    /// Take one raw reading and return the updated average.
    pub fn sample(&mut self) -> f32 {
        let raw = match self.source.read_raw() {
            Ok(v) => v,
            Err(e) => {
                self.read_failures += 1;
                tracing::debug!(
                    error = %map_hw_error(e.as_ref()),
                    repeated = self.last_raw,
                    "analog read failed; repeating last value"
                );
                self.last_raw
            }
        };
        self.last_raw = raw;
        self.ring[self.next] = raw;
        self.next = (self.next + 1) % self.ring.len();
        self.filled = (self.filled + 1).min(self.ring.len());
        self.average()
    }

    /// Current average without reading; 0 before the first sample.
    pub fn average(&self) -> f32 {
        if self.filled == 0 {
            return 0.0;
        }
        // Before the ring wraps, the readings sit in 0..filled.
        let sum: i64 = self.ring[..self.filled].iter().map(|&v| i64::from(v)).sum();
        sum as f32 / self.filled as f32
    }

    pub const fn active_source(&self) -> SourceKind {
        self.active
    }

    pub const fn window(&self) -> usize {
        self.ring.len()
    }

    pub const fn last_raw(&self) -> i32 {
        self.last_raw
    }

    pub const fn read_failures(&self) -> u64 {
        self.read_failures
    }
}
