//! Auto-measurement trigger: records a charge once the weight has sat inside
//! the target band long enough, then waits for the pan to be emptied.
use crate::config::AutoMeasureCfg;
use crate::util::elapsed_ms;

/// What one detector tick decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorStep {
    /// A charge was just recorded and the pan has not been emptied since.
    AwaitingReset,
    OutOfRange,
    /// In band, timer running.
    Settling,
    /// Stable long enough but a recent charge is still cooling down.
    CoolingDown,
    /// In band for longer than the maximum; the timer restarted.
    TimedOut,
    /// Record a measurement now.
    Fire,
}

#[derive(Debug, Clone)]
pub struct AutoMeasureDetector {
    cfg: AutoMeasureCfg,
    timer_start: Option<u64>,
    last_measurement: Option<u64>,
    awaiting_reset: bool,
}

impl AutoMeasureDetector {
    pub const fn new(cfg: AutoMeasureCfg) -> Self {
        Self {
            cfg,
            timer_start: None,
            last_measurement: None,
            awaiting_reset: false,
        }
    }

    pub fn tick(&mut self, now_ms: u64, current: f32, target: f32) -> DetectorStep {
        if self.awaiting_reset && current < self.cfg.reset_threshold_gr {
            self.awaiting_reset = false;
            tracing::debug!(current, "pan emptied; auto-measure re-armed");
        }
        if self.awaiting_reset {
            return DetectorStep::AwaitingReset;
        }

        let lower = target - self.cfg.tolerance_gr;
        let upper = target + self.cfg.tolerance_gr;
        if !(lower..=upper).contains(&current) {
            self.timer_start = None;
            return DetectorStep::OutOfRange;
        }

        let Some(start) = self.timer_start else {
            self.timer_start = Some(now_ms);
            tracing::debug!(lower, upper, "entered auto-measure band");
            return DetectorStep::Settling;
        };

        let held = elapsed_ms(now_ms, start);
        if held >= self.cfg.max_stable_ms {
            tracing::debug!(held_ms = held, "auto-measure band held too long; restarting timer");
            self.timer_start = None;
            return DetectorStep::TimedOut;
        }
        if held < self.cfg.stable_ms {
            return DetectorStep::Settling;
        }
        let cooled = self
            .last_measurement
            .is_none_or(|last| elapsed_ms(now_ms, last) >= self.cfg.cooldown_ms);
        if !cooled {
            return DetectorStep::CoolingDown;
        }

        self.timer_start = None;
        self.awaiting_reset = true;
        self.last_measurement = Some(now_ms);
        DetectorStep::Fire
    }

    /// Guard does not hold (offline, no profile, or calibrating).
    pub fn idle(&mut self) {
        self.timer_start = None;
    }

    pub const fn is_awaiting_reset(&self) -> bool {
        self.awaiting_reset
    }

    pub const fn timer_running(&self) -> bool {
        self.timer_start.is_some()
    }
}
