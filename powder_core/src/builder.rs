//! Type-state builder for `ControlLoop`.
//!
//! `boot()` only exists once both the sampler and the peripherals are
//! supplied; `try_boot()` is always available and reports what is missing.
use std::marker::PhantomData;
use std::sync::Arc;

use powder_traits::{AnalogSource, Clock, MonotonicClock};

use crate::config::CoreCfg;
use crate::control::{ControlLoop, Peripherals};
use crate::error::BootError;
use crate::sampler::AnalogSampler;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

pub struct ControlLoopBuilder<S, P> {
    cfg: Option<CoreCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    sampler: Option<AnalogSampler>,
    io: Option<Peripherals>,
    _s: PhantomData<S>,
    _p: PhantomData<P>,
}

impl Default for ControlLoopBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            cfg: None,
            clock: None,
            sampler: None,
            io: None,
            _s: PhantomData,
            _p: PhantomData,
        }
    }
}

impl ControlLoop {
    /// Start building a control loop.
    pub fn builder() -> ControlLoopBuilder<Missing, Missing> {
        ControlLoopBuilder::default()
    }
}

impl<S, P> ControlLoopBuilder<S, P> {
    /// Fallible boot available in any type-state.
    pub fn try_boot(self) -> Result<ControlLoop, BootError> {
        let sampler = self.sampler.ok_or(BootError::MissingSampler)?;
        let io = self.io.ok_or(BootError::MissingPeripherals)?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        ControlLoop::boot(self.cfg.unwrap_or_default(), clock, sampler, io)
    }

    pub fn with_config(mut self, cfg: CoreCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    /// Defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<P> ControlLoopBuilder<Missing, P> {
    pub fn with_sampler(self, sampler: AnalogSampler) -> ControlLoopBuilder<Set, P> {
        ControlLoopBuilder {
            cfg: self.cfg,
            clock: self.clock,
            sampler: Some(sampler),
            io: self.io,
            _s: PhantomData,
            _p: PhantomData,
        }
    }

    /// Build the sampler from the configured window and source preference.
    ///
    /// `external` is the dedicated converter and `internal` the MCU's own
    /// ADC. When probing is enabled the preferred source is probed once and
    /// the other one takes over if it fails.
    pub fn with_sources(
        self,
        external: Box<dyn AnalogSource>,
        internal: Box<dyn AnalogSource>,
    ) -> ControlLoopBuilder<Set, P> {
        let sc = self.cfg.clone().unwrap_or_default().sampler;
        let (primary, secondary) = if sc.prefer_internal {
            (internal, external)
        } else {
            (external, internal)
        };
        let sampler = if sc.fallback_on_probe_failure {
            AnalogSampler::with_fallback(primary, secondary, sc.window)
        } else {
            AnalogSampler::new(primary, sc.window)
        };
        self.with_sampler(sampler)
    }
}

impl<S> ControlLoopBuilder<S, Missing> {
    pub fn with_peripherals(self, io: Peripherals) -> ControlLoopBuilder<S, Set> {
        ControlLoopBuilder {
            cfg: self.cfg,
            clock: self.clock,
            sampler: self.sampler,
            io: Some(io),
            _s: PhantomData,
            _p: PhantomData,
        }
    }
}

impl ControlLoopBuilder<Set, Set> {
    /// Mount storage, initialize the display and restore settings.
    pub fn boot(self) -> Result<ControlLoop, BootError> {
        self.try_boot()
    }
}
