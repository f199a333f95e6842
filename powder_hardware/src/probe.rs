//! Simulated analog depth probes.
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use powder_traits::{AnalogSource, Clock};

use crate::error::HwError;

/// Probe whose raw value is set from the outside through a shared handle.
///
/// Clones share the same state, so a test keeps one clone and hands the other
/// to the sampler.
#[derive(Debug, Clone)]
pub struct SimulatedProbe {
    raw: Rc<Cell<i32>>,
    available: Rc<Cell<bool>>,
    failing_reads: Rc<Cell<u32>>,
}

impl SimulatedProbe {
    pub fn new(raw: i32) -> Self {
        Self {
            raw: Rc::new(Cell::new(raw)),
            available: Rc::new(Cell::new(true)),
            failing_reads: Rc::new(Cell::new(0)),
        }
    }

    /// A probe that fails its startup check (absent external ADC).
    pub fn unavailable() -> Self {
        let p = Self::new(0);
        p.available.set(false);
        p
    }

    pub fn set_raw(&self, raw: i32) {
        self.raw.set(raw);
    }

    pub fn raw(&self) -> i32 {
        self.raw.get()
    }

    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }

    /// Make the next `n` reads time out.
    pub fn fail_next(&self, n: u32) {
        self.failing_reads.set(n);
    }
}

impl AnalogSource for SimulatedProbe {
    fn read_raw(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        if !self.available.get() {
            return Err(HwError::Unavailable("no response on bus".into()).into());
        }
        let pending = self.failing_reads.get();
        if pending > 0 {
            self.failing_reads.set(pending - 1);
            return Err(HwError::Timeout.into());
        }
        Ok(self.raw.get())
    }

    fn probe(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.available.get() {
            Ok(())
        } else {
            Err(HwError::Unavailable("no response on bus".into()).into())
        }
    }
}

/// Timing of one simulated charge: the pan rests empty, powder is poured in
/// over `ramp_ms`, the charge sits for `hold_ms`, then the pan is emptied.
#[derive(Debug, Clone, Copy)]
pub struct ChargeCycle {
    pub zero_raw: i32,
    pub plateau_raw: i32,
    pub rest_ms: u64,
    pub ramp_ms: u64,
    pub hold_ms: u64,
}

impl Default for ChargeCycle {
    fn default() -> Self {
        Self {
            zero_raw: 1_000,
            plateau_raw: 1_250,
            rest_ms: 1_000,
            ramp_ms: 2_000,
            hold_ms: 2_000,
        }
    }
}

impl ChargeCycle {
    pub const fn period_ms(&self) -> u64 {
        self.rest_ms + self.ramp_ms + self.hold_ms
    }

    /// Raw value `t` milliseconds into the repeating cycle.
    pub fn raw_at(&self, t: u64) -> i32 {
        let period = self.period_ms().max(1);
        let phase = t % period;
        if phase < self.rest_ms {
            return self.zero_raw;
        }
        let into_ramp = phase - self.rest_ms;
        if into_ramp < self.ramp_ms {
            let span = i64::from(self.plateau_raw) - i64::from(self.zero_raw);
            let step = span * into_ramp as i64 / self.ramp_ms as i64;
            return (i64::from(self.zero_raw) + step) as i32;
        }
        self.plateau_raw
    }
}

/// Probe driven by a clock through a repeating [`ChargeCycle`].
pub struct CycleProbe<C: Clock> {
    clock: C,
    epoch: Instant,
    cycle: ChargeCycle,
}

impl<C: Clock> CycleProbe<C> {
    pub fn new(clock: C, cycle: ChargeCycle) -> Self {
        let epoch = clock.now();
        tracing::debug!(
            zero = cycle.zero_raw,
            plateau = cycle.plateau_raw,
            period_ms = cycle.period_ms(),
            "cycle probe armed"
        );
        Self {
            clock,
            epoch,
            cycle,
        }
    }
}

impl<C: Clock> AnalogSource for CycleProbe<C> {
    fn read_raw(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        let t = self.clock.ms_since(self.epoch);
        let raw = self.cycle.raw_at(t);
        tracing::trace!(raw, t_ms = t, "cycle probe sample");
        Ok(raw)
    }
}
