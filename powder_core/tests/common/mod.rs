#![allow(dead_code)]

use std::sync::Arc;

use powder_core::{AnalogSampler, ControlLoop, CoreCfg, Peripherals};
use powder_hardware::{
    MemoryBlobStore, MemoryUpdateSink, QueuedTouch, RecordingDisplay, RecordingIndicator,
    RecordingSink, ScriptedEvents, SimulatedProbe, StaticLink,
};
use powder_traits::clock::test_clock::TestClock;
use powder_traits::{InboundEvent, Query};
use serde_json::Value;

/// Simulated instrument: every handle is shared with the booted loop.
pub struct Rig {
    pub clock: TestClock,
    pub probe: SimulatedProbe,
    pub display: RecordingDisplay,
    pub store: MemoryBlobStore,
    pub link: StaticLink,
    pub touch: QueuedTouch,
    pub indicator: RecordingIndicator,
    pub update: MemoryUpdateSink,
    pub events: ScriptedEvents,
    pub sink: RecordingSink,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_link(StaticLink::station("192.168.1.50", -55))
    }

    pub fn with_link(link: StaticLink) -> Self {
        Self {
            clock: TestClock::new(),
            probe: SimulatedProbe::new(0),
            display: RecordingDisplay::default(),
            store: MemoryBlobStore::new(),
            link,
            touch: QueuedTouch::new(),
            indicator: RecordingIndicator::new(),
            update: MemoryUpdateSink::new(),
            events: ScriptedEvents::new(),
            sink: RecordingSink::new(),
        }
    }

    pub fn peripherals(&self) -> Peripherals {
        Peripherals {
            display: Box::new(self.display.clone()),
            store: Box::new(self.store.clone()),
            link: Box::new(self.link.clone()),
            touch: Some(Box::new(self.touch.clone())),
            indicator: Some(Box::new(self.indicator.clone())),
            update: Box::new(self.update.clone()),
            sources: vec![Box::new(self.events.clone())],
            telemetry: Box::new(self.sink.clone()),
        }
    }

    pub fn boot(&self) -> ControlLoop {
        self.boot_with(CoreCfg::default())
    }

    pub fn boot_with(&self, cfg: CoreCfg) -> ControlLoop {
        let window = cfg.sampler.window;
        ControlLoop::builder()
            .with_config(cfg)
            .with_clock(Arc::new(self.clock.clone()))
            .with_sampler(AnalogSampler::new(Box::new(self.probe.clone()), window))
            .with_peripherals(self.peripherals())
            .boot()
            .expect("boot")
    }

    pub fn send(&self, json: &str) {
        self.events.push_text(json);
    }

    pub fn query(&self, client: u8, query: Query) {
        self.events.push(InboundEvent::Query { client, query });
    }

    /// Latest state snapshot broadcast (skips update status frames).
    pub fn last_state(&self) -> Value {
        self.sink
            .broadcasts()
            .iter()
            .rev()
            .filter_map(|b| serde_json::from_str::<Value>(b).ok())
            .find(|v| v.get("currentWeight").is_some())
            .expect("no state broadcast yet")
    }
}

pub fn ticks(ctl: &mut ControlLoop, n: usize) {
    for _ in 0..n {
        ctl.tick();
    }
}

/// Profile 0 at `target` grains, selected and calibrated to
/// zero = 100 raw, 0.1 grains per raw unit.
pub fn calibrated_profile(rig: &Rig, ctl: &mut ControlLoop, target: f32) {
    rig.send(&format!(
        r#"{{"command":"saveConfig","data":{{"index":0,"caliber":"308","bulletWeight":"168","powderName":"Varget","targetGrain":{target}}}}}"#
    ));
    rig.send(r#"{"command":"selectConfig","index":0}"#);
    rig.send(r#"{"command":"calibrate","step":"startWizard"}"#);
    ctl.tick();
    rig.probe.set_raw(100);
    ticks(ctl, 5);
    rig.send(r#"{"command":"calibrate","step":"setZeroPoint"}"#);
    ctl.tick();
    rig.probe.set_raw(150);
    ticks(ctl, 5);
    rig.send(r#"{"command":"calibrate","step":"setKnownGrains","knownWeight":5.0}"#);
    ctl.tick();
}
