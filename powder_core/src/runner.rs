use crate::control::{ControlLoop, TickOutcome};

/// Why `run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// The stop check reported true.
    Stopped,
    /// `max_ticks` reached.
    TickLimit,
    /// The loop asked for a restart (factory reset or applied update).
    RestartRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub end: RunEnd,
}

/// Drive `ctl` tick by tick until `should_stop` returns true, `max_ticks`
/// ticks have run, or a restart is requested.
///
/// `should_stop` is checked before every tick.
pub fn run(
    ctl: &mut ControlLoop,
    max_ticks: Option<u64>,
    should_stop: &dyn Fn() -> bool,
) -> RunSummary {
    let mut ticks = 0u64;
    let end = loop {
        if should_stop() {
            break RunEnd::Stopped;
        }
        if max_ticks.is_some_and(|max| ticks >= max) {
            break RunEnd::TickLimit;
        }
        let outcome = ctl.tick();
        ticks += 1;
        if outcome == TickOutcome::RestartRequested {
            break RunEnd::RestartRequested;
        }
    };
    tracing::info!(ticks, ?end, "control loop stopped");
    RunSummary { ticks, end }
}
