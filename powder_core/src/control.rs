//! The cooperative control loop (`ControlLoop`).
//!
//! One `tick()` services the transport, polls touch, samples and converts the
//! analog reading, runs the auto-measure detector, redraws the panel, evaluates
//! the alarm, and pushes telemetry. All state lives here and is only mutated
//! from inside a tick.
use std::sync::Arc;
use std::time::{Duration, Instant};

use powder_traits::{
    BlobStore, Clock, Color, DisplaySurface, EventSource, InboundEvent, LinkMode, LinkStatus,
    NetworkLink, Query, Reply, StatusIndicator, TelemetrySink, TouchInput, UpdateSink,
};
use powder_ui::{
    AccessPointView, CalibrationPrompt, CalibrationView, MainAction, MainButtons,
    MeasurementView, Screen, draw_access_point, draw_calibration, draw_measurement,
};

use crate::alarm::{AlarmMonitor, AlarmSettings};
use crate::calibration::{CalibrationEngine, CalibrationState};
use crate::command::{CalibrationStep, Command, decode};
use crate::config::CoreCfg;
use crate::conversions::convert;
use crate::detector::{AutoMeasureDetector, DetectorStep};
use crate::error::{BootError, CommandError};
use crate::hw_error::map_hw_error;
use crate::ledger::SessionLedger;
use crate::persist::{SettingsRecord, load_settings, save_settings};
use crate::profiles::{ConfigStore, SaveOutcome};
use crate::sampler::AnalogSampler;
use crate::snapshot::{StateSnapshot, StatsView};
use crate::update::{FeedOutcome, UpdateTracker};
use crate::util::is_due;

/// SSID shown while the radio runs its own access point.
pub const AP_SSID: &str = "PowderSense";

/// Collaborators the loop drives. Touch and the status LED are optional
/// board features.
pub struct Peripherals {
    pub display: Box<dyn DisplaySurface>,
    pub store: Box<dyn BlobStore>,
    pub link: Box<dyn NetworkLink>,
    pub touch: Option<Box<dyn TouchInput>>,
    pub indicator: Option<Box<dyn StatusIndicator>>,
    pub update: Box<dyn UpdateSink>,
    pub sources: Vec<Box<dyn EventSource>>,
    pub telemetry: Box<dyn TelemetrySink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// A factory reset or a completed update wants the device restarted.
    RestartRequested,
}

pub struct ControlLoop {
    cfg: CoreCfg,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    io: Peripherals,
    sampler: AnalogSampler,
    profiles: ConfigStore,
    ledger: SessionLedger,
    calibration: CalibrationEngine,
    detector: AutoMeasureDetector,
    alarm: AlarmMonitor,
    update: UpdateTracker,
    buttons: MainButtons,
    screen: Option<Screen>,
    current_raw: f32,
    current_weight: f32,
    zero_requested: bool,
    indicator_color: Option<Color>,
    last_frame: Option<u64>,
    last_telemetry: Option<u64>,
    last_touch: Option<u64>,
    restart_requested: bool,
}

impl core::fmt::Debug for ControlLoop {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControlLoop")
            .field("weight_gr", &self.current_weight)
            .field("raw", &self.current_raw)
            .field("calibration", &self.calibration.state())
            .field("active_profile", &self.profiles.active_index())
            .finish_non_exhaustive()
    }
}

/// Unusable hardware at boot: hold the indicator red and hand the error to
/// the caller, which must not run the loop.
fn fatal(io: &mut Peripherals, err: BootError) -> BootError {
    tracing::error!(error = %err, "boot failed; instrument halted");
    if let Some(ind) = io.indicator.as_mut() {
        ind.show(Color::Red);
    }
    err
}

impl ControlLoop {
    /// Mount storage, initialize the display and restore persisted settings.
    pub fn boot(
        cfg: CoreCfg,
        clock: Arc<dyn Clock + Send + Sync>,
        sampler: AnalogSampler,
        mut io: Peripherals,
    ) -> Result<Self, BootError> {
        if let Err(e) = io.store.mount() {
            return Err(fatal(&mut io, BootError::Storage(map_hw_error(e.as_ref()).to_string())));
        }
        if let Err(e) = io.display.init() {
            return Err(fatal(&mut io, BootError::Display(map_hw_error(e.as_ref()).to_string())));
        }

        let record = load_settings(io.store.as_ref(), &cfg.settings_key);
        let alarm = AlarmMonitor::new(record.alarm(), cfg.schedule.stable_indicator_ms);
        let mut profiles = ConfigStore::new(cfg.capacity.profiles);
        profiles.restore(record.powder_configs, record.current_config_index);
        let mut ledger =
            SessionLedger::new(cfg.capacity.history, cfg.capacity.session_logs, clock.unix_secs());
        ledger.restore_logs(record.session_logs);
        let buttons = MainButtons::for_panel(io.display.height());
        let epoch = clock.now();

        tracing::info!(
            profiles = profiles.len(),
            active = profiles.active_index_wire(),
            sessions = ledger.logs().len(),
            source = ?sampler.active_source(),
            "control loop ready"
        );

        Ok(Self {
            calibration: CalibrationEngine::new(cfg.calibration.epsilon),
            detector: AutoMeasureDetector::new(cfg.auto_measure.clone()),
            cfg,
            clock,
            epoch,
            io,
            sampler,
            profiles,
            ledger,
            alarm,
            update: UpdateTracker::new(),
            buttons,
            screen: None,
            current_raw: 0.0,
            current_weight: 0.0,
            zero_requested: false,
            indicator_color: None,
            last_frame: None,
            last_telemetry: None,
            last_touch: None,
            restart_requested: false,
        })
    }

    fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    /// One pass of the loop.
    pub fn tick(&mut self) -> TickOutcome {
        let now = self.now_ms();
        self.service_events();
        self.poll_touch(now);

        self.current_raw = self.sampler.sample();
        self.current_weight = convert(self.current_raw, self.profiles.active());
        if std::mem::take(&mut self.zero_requested) {
            self.current_weight = 0.0;
        }

        let link = self.io.link.status();
        self.run_detector(now, &link);
        self.refresh_display(now, &link);
        self.refresh_indicator(now);

        if link.is_online() && is_due(now, self.last_telemetry, self.cfg.schedule.telemetry_interval_ms) {
            self.last_telemetry = Some(now);
            self.publish();
        }

        if self.cfg.schedule.tick_delay_ms > 0 {
            self.clock
                .sleep(Duration::from_millis(self.cfg.schedule.tick_delay_ms));
        }
        if self.restart_requested {
            TickOutcome::RestartRequested
        } else {
            TickOutcome::Continue
        }
    }

    // ── Transport ────────────────────────────────────────────────────────────

    fn service_events(&mut self) {
        let budget = self.cfg.schedule.max_events_per_tick;
        for i in 0..self.io.sources.len() {
            for _ in 0..budget {
                let Some(ev) = self.io.sources[i].poll_event() else {
                    break;
                };
                self.handle_event(ev);
            }
        }
    }

    pub fn handle_event(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::ClientConnected { client } => {
                tracing::info!(client, "client connected");
                self.publish();
            }
            InboundEvent::ClientDisconnected { client } => {
                tracing::info!(client, "client disconnected");
            }
            InboundEvent::Text { client, payload } => match decode(&payload) {
                Ok(cmd) => {
                    let name = cmd.name();
                    tracing::debug!(client, command = name, "command received");
                    if let Err(e) = self.handle_command(cmd) {
                        tracing::warn!(client, command = name, error = %e, "command rejected");
                    }
                    self.publish();
                }
                Err(e) => tracing::warn!(client, error = %e, "ignoring text frame"),
            },
            InboundEvent::Binary { client, payload } => self.feed_update(client, &payload),
            InboundEvent::Query { client, query } => {
                let reply = self.answer(&query);
                tracing::debug!(client, ?query, status = reply.status, "query answered");
                if let Err(e) = self.io.telemetry.reply(client, reply) {
                    tracing::warn!(client, error = %map_hw_error(e.as_ref()), "reply failed");
                }
            }
        }
    }

    fn feed_update(&mut self, client: u8, payload: &[u8]) {
        if !self.update.is_active() {
            tracing::debug!(client, bytes = payload.len(), "binary frame without update; ignored");
            return;
        }
        match self.update.feed(payload, self.io.update.as_mut()) {
            Ok(FeedOutcome::Partial) => {}
            Ok(FeedOutcome::Complete(kind)) => {
                tracing::info!(?kind, "update applied; restart requested");
                self.broadcast(&serde_json::json!({ "updateStatus": "success" }).to_string());
                self.restart_requested = true;
            }
            Err(e) => {
                self.broadcast(
                    &serde_json::json!({ "updateStatus": "error", "message": e.to_string() })
                        .to_string(),
                );
            }
        }
    }

    /// Apply one decoded command. State is unchanged when an error is
    /// returned. Does not publish; `handle_event` does that.
    pub fn handle_command(&mut self, cmd: Command) -> Result<(), CommandError> {
        match cmd {
            Command::Zero => {
                tracing::info!("zero requested");
                self.current_weight = 0.0;
                self.zero_requested = true;
            }
            Command::Measure => {
                if self.calibration.state().is_active() {
                    return Err(CommandError::CalibrationActive);
                }
                self.record_measurement();
            }
            Command::Calibrate { step, known_weight } => self.calibrate(step, known_weight)?,
            Command::SelectConfig { index } => {
                match self.profiles.select(index)? {
                    Some(p) => {
                        let (name, target) = (p.name.clone(), p.target_grain);
                        self.alarm
                            .center_on(target, self.cfg.calibration.alarm_tolerance_gr);
                        tracing::info!(index, name = %name, target, "profile selected");
                    }
                    None => tracing::info!("profile deselected"),
                }
                self.persist();
            }
            Command::SaveConfig { data } => {
                match self.profiles.save(&data)? {
                    SaveOutcome::Added(i) => tracing::info!(index = i, "profile added"),
                    SaveOutcome::Updated(i) => tracing::info!(index = i, "profile updated"),
                }
                self.persist();
            }
            Command::DeleteConfig { index } => {
                let was_active = self.profiles.active_index_wire() == index;
                let removed = self.profiles.delete(index)?;
                if was_active && self.calibration.state().is_active() {
                    tracing::warn!("active profile deleted; calibration cancelled");
                    self.calibration.cancel();
                }
                tracing::info!(index, name = %removed.name, "profile deleted");
                self.persist();
            }
            Command::SetAlarms {
                enabled,
                low_threshold,
                high_threshold,
            } => {
                self.alarm.set(AlarmSettings {
                    enabled,
                    low_threshold,
                    high_threshold,
                });
                tracing::info!(enabled, low_threshold, high_threshold, "alarm settings changed");
                self.persist();
            }
            Command::AcknowledgeAlarm => {
                tracing::info!("alarm acknowledged");
                self.alarm.clear();
            }
            Command::ResetSession => {
                self.ledger.reset_session(self.clock.unix_secs());
                self.persist();
            }
            Command::StartSession => {
                self.ledger.start_session(self.clock.unix_secs());
                tracing::info!("session started");
                self.persist();
            }
            Command::EndSession => {
                self.ledger.end_session(self.clock.unix_secs());
                self.persist();
            }
            Command::FactoryReset => {
                tracing::warn!("factory reset: erasing storage");
                if let Err(e) = self.io.store.erase_all() {
                    tracing::error!(error = %map_hw_error(e.as_ref()), "storage erase failed");
                }
                self.restart_requested = true;
            }
            Command::ImportConfigs { configs } => {
                let had_active = self.profiles.active_index().is_some();
                let kept = self.profiles.import(configs);
                if had_active
                    && self.profiles.active_index().is_none()
                    && self.calibration.state().is_active()
                {
                    tracing::warn!("active profile replaced by import; calibration cancelled");
                    self.calibration.cancel();
                }
                tracing::info!(kept, "profiles imported");
                self.persist();
            }
            Command::UpdateFirmware {
                kind,
                filename,
                size,
            } => {
                self.update
                    .begin(&kind, &filename, size, self.io.update.as_mut())?;
                self.broadcast(&serde_json::json!({ "updateStatus": "started" }).to_string());
            }
            Command::SetSetting { key, .. } => {
                tracing::info!(key = %key, "setSetting ignored");
            }
        }
        Ok(())
    }

    fn calibrate(
        &mut self,
        step: CalibrationStep,
        known_weight: Option<f32>,
    ) -> Result<(), CommandError> {
        match step {
            CalibrationStep::StartWizard => {
                self.calibration
                    .start_wizard(self.profiles.active().is_some())?;
                self.alarm.clear();
                tracing::info!(profile = self.profiles.active_index_wire(), "calibration started");
            }
            CalibrationStep::SetZeroPoint => {
                self.calibration
                    .set_zero_point(self.profiles.active_calibration_mut(), self.current_raw)?;
                self.alarm.clear();
                tracing::info!(zero_raw = self.current_raw, "zero point captured");
            }
            CalibrationStep::SetKnownGrains => {
                let known = known_weight.unwrap_or(0.0);
                let outcome = self.calibration.set_known_grains(
                    self.profiles.active_calibration_mut(),
                    self.current_raw,
                    known,
                )?;
                tracing::info!(
                    zero_raw = outcome.zero_raw_value,
                    grains_per_raw = outcome.grains_per_raw_unit,
                    known,
                    "calibration complete"
                );
                if let Some(target) = self.profiles.active().map(|p| p.target_grain) {
                    self.alarm
                        .center_on(target, self.cfg.calibration.alarm_tolerance_gr);
                }
                // the calibration charge must not count toward the session
                self.ledger.clear_session(self.clock.unix_secs());
                self.alarm.clear();
                self.persist();
            }
            CalibrationStep::Cancel => {
                self.calibration.cancel();
                self.alarm.clear();
                tracing::info!("calibration cancelled");
            }
        }
        Ok(())
    }

    fn record_measurement(&mut self) {
        let now = self.clock.unix_secs();
        self.ledger
            .record_measurement(self.current_weight, self.profiles.active(), now);
        self.persist();
    }

    /// Answer a request/response query.
    pub fn answer(&self, query: &Query) -> Reply {
        match query {
            Query::State => match self.snapshot().to_json() {
                Ok(body) => Reply::ok("application/json", body),
                Err(e) => {
                    tracing::warn!(error = %e, "snapshot encoding failed");
                    Reply::error(500, "Failed to encode state")
                }
            },
            Query::ExportCsv => match self.ledger.export_csv() {
                Ok(body) => Reply::ok("text/csv", body),
                Err(e) => {
                    tracing::warn!(error = %e, "csv export failed");
                    Reply::error(500, "Failed to export data")
                }
            },
            Query::ExportSessionCsv { index: None } => {
                Reply::error(400, "Missing session index parameter")
            }
            Query::ExportSessionCsv { index: Some(i) } => {
                match self.ledger.export_session_csv(*i) {
                    Ok(Some(body)) => Reply::ok("text/csv", body),
                    Ok(None) => Reply::error(404, "Session not found"),
                    Err(e) => {
                        tracing::warn!(index = i, error = %e, "session export failed");
                        Reply::error(500, "Failed to export session")
                    }
                }
            }
            Query::SessionSummary { index } => match self.ledger.session_summary_csv(*index) {
                Some(body) => Reply::ok("text/csv", body),
                None => Reply::error(404, "Session not found"),
            },
            Query::Measurement => Reply::ok(
                "application/json",
                serde_json::json!({ "powderWeight": self.current_weight }).to_string(),
            ),
        }
    }

    // ── Per-tick stages ──────────────────────────────────────────────────────

    fn poll_touch(&mut self, now: u64) {
        let Some(touch) = self.io.touch.as_mut() else {
            return;
        };
        let Some((x, y)) = touch.poll_touch() else {
            return;
        };
        if self.screen != Some(Screen::Measurement) {
            return;
        }
        if !is_due(now, self.last_touch, self.cfg.schedule.touch_debounce_ms) {
            tracing::debug!(x, y, "touch debounced");
            return;
        }
        self.last_touch = Some(now);
        let Some(action) = self.buttons.hit_test(x, y) else {
            return;
        };
        match action {
            MainAction::Calibrate => {
                match self.calibration.start_wizard(self.profiles.active().is_some()) {
                    Ok(()) => {
                        self.alarm.clear();
                        tracing::info!("calibration started from panel");
                    }
                    Err(e) => tracing::warn!(error = %e, "calibration button ignored"),
                }
                self.publish();
            }
            MainAction::CycleProfile => {
                if let Some(i) = self.profiles.cycle_next() {
                    if let Some(target) = self.profiles.active().map(|p| p.target_grain) {
                        self.alarm
                            .center_on(target, self.cfg.calibration.alarm_tolerance_gr);
                    }
                    tracing::info!(index = i, "profile cycled from panel");
                    self.persist();
                    self.publish();
                }
            }
            MainAction::Settings => tracing::info!("settings button pressed"),
        }
    }

    fn run_detector(&mut self, now: u64, link: &LinkStatus) {
        let target = match self.profiles.active() {
            Some(p) if link.is_online() && !self.calibration.state().is_active() => p.target_grain,
            _ => {
                self.detector.idle();
                return;
            }
        };
        match self.detector.tick(now, self.current_weight, target) {
            DetectorStep::Fire => {
                tracing::info!(weight = self.current_weight, target, "auto-measure triggered");
                self.record_measurement();
                self.publish();
            }
            DetectorStep::TimedOut => {
                tracing::debug!("auto-measure window expired");
            }
            _ => {}
        }
    }

    fn screen_for(&self, link: &LinkStatus) -> Screen {
        if link.mode == LinkMode::AccessPoint {
            Screen::AccessPoint
        } else if self.calibration.state().is_active() {
            Screen::Calibration
        } else {
            Screen::Measurement
        }
    }

    fn refresh_display(&mut self, now: u64, link: &LinkStatus) {
        let screen = self.screen_for(link);
        if self.screen != Some(screen) {
            tracing::debug!(?screen, "screen changed");
            self.screen = Some(screen);
            self.io.display.clear(Color::Black);
            self.last_frame = None;
        }
        if !is_due(now, self.last_frame, self.cfg.schedule.display_interval_ms) {
            return;
        }
        self.last_frame = Some(now);

        let d = self.io.display.as_mut();
        d.clear(Color::Black);
        match screen {
            Screen::Measurement => {
                let settings = self.alarm.settings();
                let view = MeasurementView {
                    weight: self.current_weight,
                    alarm_active: self.alarm.is_active(),
                    alarm_enabled: settings.enabled,
                    low: settings.low_threshold,
                    high: settings.high_threshold,
                    profile: self
                        .profiles
                        .active()
                        .map(|p| (p.name.as_str(), p.target_grain)),
                    ip: &link.ip,
                };
                draw_measurement(d, &view, &self.buttons);
            }
            Screen::Calibration => {
                let prompt = if self.calibration.state() == CalibrationState::KnownGrainsStep {
                    CalibrationPrompt::KnownGrains
                } else {
                    CalibrationPrompt::Zero
                };
                draw_calibration(
                    d,
                    &CalibrationView {
                        prompt,
                        raw_average: self.current_raw,
                        weight: self.current_weight,
                    },
                );
            }
            Screen::AccessPoint => draw_access_point(
                d,
                &AccessPointView {
                    ssid: AP_SSID,
                    ip: &link.ip,
                },
            ),
        }
        if let Err(e) = d.push_frame() {
            tracing::warn!(error = %map_hw_error(e.as_ref()), "frame push failed");
        }
    }

    fn refresh_indicator(&mut self, now: u64) {
        let color = self.alarm.evaluate(now, self.current_weight);
        if self.indicator_color == Some(color) {
            return;
        }
        self.indicator_color = Some(color);
        if let Some(ind) = self.io.indicator.as_mut() {
            ind.show(color);
        }
    }

    // ── Outbound ─────────────────────────────────────────────────────────────

    fn broadcast(&mut self, text: &str) {
        if let Err(e) = self.io.telemetry.broadcast(text) {
            tracing::warn!(error = %map_hw_error(e.as_ref()), "broadcast failed");
        }
    }

    /// Push a full state snapshot to every client.
    pub fn publish(&mut self) {
        match self.snapshot().to_json() {
            Ok(json) => self.broadcast(&json),
            Err(e) => tracing::warn!(error = %e, "snapshot encoding failed"),
        }
    }

    pub fn snapshot(&self) -> StateSnapshot<'_> {
        let link = self.io.link.status();
        let settings = self.alarm.settings();
        let stats = self.ledger.stats();
        StateSnapshot {
            current_weight: self.current_weight,
            current_adc: self.current_raw,
            alarm_active: self.alarm.is_active(),
            alarm_enabled: settings.enabled,
            low_threshold: settings.low_threshold,
            high_threshold: settings.high_threshold,
            wifi_connected: link.is_online(),
            rssi: link.rssi,
            ip_address: link.ip,
            uptime: self.now_ms(),
            calibration_state: self.calibration.state(),
            is_calibrated: self
                .profiles
                .active()
                .is_some_and(|p| p.calibration.is_calibrated),
            is_stable: self.alarm.is_stable(),
            current_config_index: self.profiles.active_index_wire(),
            current_config: self.profiles.active(),
            powder_configs: self.profiles.profiles(),
            stats: StatsView {
                average_weight: stats.mean(),
                standard_deviation: self.ledger.standard_deviation(),
                min_weight: stats.min,
                max_weight: stats.max,
                total_measurements: self.ledger.lifetime_count(),
                session_measurements: stats.count,
            },
            recent_measurements: self.ledger.measurements(),
            session_logs: self.ledger.logs(),
        }
    }

    fn persist(&mut self) {
        let settings = self.alarm.settings();
        let record = SettingsRecord {
            alarm_enabled: settings.enabled,
            low_threshold: settings.low_threshold,
            high_threshold: settings.high_threshold,
            current_config_index: self.profiles.active_index_wire(),
            powder_configs: self.profiles.profiles().to_vec(),
            session_logs: self.ledger.logs().iter().cloned().collect(),
        };
        if let Err(e) = save_settings(self.io.store.as_mut(), &self.cfg.settings_key, &record) {
            tracing::warn!(error = %e, "settings not persisted");
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub const fn current_weight(&self) -> f32 {
        self.current_weight
    }

    pub const fn current_raw(&self) -> f32 {
        self.current_raw
    }

    pub const fn profiles(&self) -> &ConfigStore {
        &self.profiles
    }

    pub const fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    pub const fn calibration_state(&self) -> CalibrationState {
        self.calibration.state()
    }

    pub const fn alarm(&self) -> &AlarmMonitor {
        &self.alarm
    }

    pub const fn update(&self) -> &UpdateTracker {
        &self.update
    }

    pub const fn screen(&self) -> Option<Screen> {
        self.screen
    }

    pub const fn sampler(&self) -> &AnalogSampler {
        &self.sampler
    }

    pub const fn restart_requested(&self) -> bool {
        self.restart_requested
    }

    pub const fn config(&self) -> &CoreCfg {
        &self.cfg
    }
}
