//! Hosted instrument assembly: simulated peripherals, stdin command feed and
//! JSON-lines telemetry on stdout.

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::Sender;
use eyre::WrapErr;
use powder_config::{Config, NetworkMode, SourceChoice};
use powder_core::{ControlLoop, CoreCfg, Peripherals, RunSummary, channel_source};
use powder_hardware::{
    ChargeCycle, CycleProbe, FsBlobStore, RecordingDisplay, RecordingIndicator, SimulatedProbe,
    StagingUpdateSink, StaticLink,
};
use powder_traits::{InboundEvent, MonotonicClock, Query, Reply, TelemetrySink};

use crate::cli::SimArgs;

type BoxErr = Box<dyn std::error::Error + Send + Sync>;

/// Client id used for everything typed on stdin.
pub const STDIN_CLIENT: u8 = 0;
const STDIN_QUEUE: usize = 64;

/// Prints broadcasts and query replies to stdout, one JSON document per line.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl TelemetrySink for StdoutSink {
    fn broadcast(&mut self, text: &str) -> Result<(), BoxErr> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{text}")?;
        Ok(())
    }

    fn reply(&mut self, client: u8, reply: Reply) -> Result<(), BoxErr> {
        let line = serde_json::json!({
            "reply": {
                "client": client,
                "status": reply.status,
                "contentType": reply.content_type,
                "body": reply.body,
            }
        });
        let mut out = std::io::stdout().lock();
        writeln!(out, "{line}")?;
        Ok(())
    }
}

/// Turn one stdin line into an inbound event.
///
/// Lines starting with `?` are queries (`?state`, `?export`, `?session I`,
/// `?summary I`); any other non-empty line is a JSON command frame.
pub fn parse_line(line: &str) -> Option<InboundEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(q) = line.strip_prefix('?') else {
        return Some(InboundEvent::Text {
            client: STDIN_CLIENT,
            payload: line.to_string(),
        });
    };
    let mut parts = q.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let index = parts.next().and_then(|s| s.parse::<i64>().ok());
    let query = match name {
        "state" => Query::State,
        "export" => Query::ExportCsv,
        "session" => Query::ExportSessionCsv { index },
        "summary" => Query::SessionSummary { index: index? },
        "weight" => Query::Measurement,
        other => {
            tracing::warn!(query = other, "unknown query");
            return None;
        }
    };
    Some(InboundEvent::Query {
        client: STDIN_CLIENT,
        query,
    })
}

fn spawn_stdin_reader(tx: Sender<InboundEvent>) -> eyre::Result<()> {
    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                let Some(event) = parse_line(&line) else {
                    continue;
                };
                if tx.send(event).is_err() {
                    break;
                }
            }
            tracing::debug!("stdin closed");
        })
        .wrap_err("spawn stdin reader")?;
    Ok(())
}

fn link_for(cfg: &Config) -> StaticLink {
    let net = &cfg.network;
    match net.mode {
        NetworkMode::Station => StaticLink::station(&net.ip, net.rssi),
        NetworkMode::AccessPoint => StaticLink::access_point(&net.ip),
        NetworkMode::Offline => StaticLink::offline(),
    }
}

fn charge_cycle(sim: &SimArgs) -> ChargeCycle {
    ChargeCycle {
        zero_raw: sim.zero,
        plateau_raw: sim.plateau,
        ramp_ms: sim.ramp_ms,
        hold_ms: sim.hold_ms,
        ..ChargeCycle::default()
    }
}

/// Boot the loop on simulated hardware and drive it until `shutdown` is
/// set, `ticks` ticks have run or a restart is requested.
pub fn run_instrument(
    cfg: &Config,
    ticks: Option<u64>,
    no_delay: bool,
    sim: &SimArgs,
    shutdown: &Arc<AtomicBool>,
) -> eyre::Result<RunSummary> {
    let mut core_cfg = CoreCfg::from(cfg);
    if no_delay {
        core_cfg.schedule.tick_delay_ms = 0;
    }

    let (tx, source) = channel_source(STDIN_QUEUE);
    spawn_stdin_reader(tx)?;

    let display = RecordingDisplay::default();
    let io = Peripherals {
        display: Box::new(display.clone()),
        store: Box::new(FsBlobStore::new(&cfg.storage.dir)),
        link: Box::new(link_for(cfg)),
        touch: None,
        indicator: Some(Box::new(RecordingIndicator::new())),
        update: Box::new(StagingUpdateSink::new(
            Path::new(&cfg.storage.dir).join("staging"),
        )),
        sources: vec![Box::new(source)],
        telemetry: Box::new(StdoutSink),
    };

    // the charge cycle drives the external converter; the internal ADC idles at zero
    let external = CycleProbe::new(MonotonicClock::new(), charge_cycle(sim));
    let internal = SimulatedProbe::new(sim.zero);
    tracing::info!(
        primary = ?cfg.sampler.primary,
        fallback = cfg.sampler.fallback_on_probe_failure,
        "analog sources ready"
    );
    if cfg.sampler.primary == SourceChoice::Internal {
        tracing::warn!("internal ADC preferred; the simulated charge cycle only drives the external converter");
    }

    let mut ctl = ControlLoop::builder()
        .with_config(core_cfg)
        .with_sources(Box::new(external), Box::new(internal))
        .with_peripherals(io)
        .boot()?;
    tracing::info!(
        storage = %cfg.storage.dir,
        ticks = ?ticks,
        profiles = ctl.profiles().len(),
        "instrument running"
    );

    let stop = Arc::clone(shutdown);
    let summary = powder_core::run(&mut ctl, ticks, &move || stop.load(Ordering::Relaxed));
    let frames = display.frames();
    tracing::info!(frames, "display frames rendered");
    Ok(summary)
}
