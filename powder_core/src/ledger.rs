//! Session bookkeeping: measurement history, running statistics, the
//! session-log archive and CSV export.
//!
//! Every measurement gets a sequence number that only ever grows. A closed
//! session's log remembers its `[start, start + count)` range, and the
//! measurements of closed sessions stay in a bounded archive so a logged
//! session can still be exported by that range.

use eyre::WrapErr;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Result;
use crate::history::BoundedHistory;
use crate::profiles::Profile;

pub const CSV_HEADER: [&str; 7] = [
    "Timestamp",
    "Weight(grains)",
    "Config Name",
    "Caliber",
    "Bullet Weight",
    "Powder Name",
    "Target Grain",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    #[serde(skip)]
    pub seq: u64,
    pub timestamp: i64,
    pub weight: f32,
    /// Value copy of the profile active when the charge was recorded.
    #[serde(
        rename = "config",
        skip_serializing_if = "Option::is_none",
        serialize_with = "profile_summary"
    )]
    pub profile: Option<Profile>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileSummary<'a> {
    name: &'a str,
    caliber: &'a str,
    bullet_weight: &'a str,
    powder_name: &'a str,
    target_grain: f32,
}

fn profile_summary<S: Serializer>(p: &Option<Profile>, s: S) -> std::result::Result<S::Ok, S::Error> {
    p.as_ref()
        .map(|p| ProfileSummary {
            name: &p.name,
            caliber: &p.caliber,
            bullet_weight: &p.bullet_weight,
            powder_name: &p.powder_name,
            target_grain: p.target_grain,
        })
        .serialize(s)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLog {
    #[serde(default)]
    pub start_time: i64,
    #[serde(default)]
    pub end_time: i64,
    #[serde(default)]
    pub bullet_count: u32,
    #[serde(default)]
    pub total_weight: f32,
    /// First sequence number of the session's measurements.
    #[serde(default)]
    pub measurement_start: u64,
    #[serde(default)]
    pub measurement_count: u32,
}

impl SessionLog {
    pub fn average(&self) -> f32 {
        if self.bullet_count == 0 {
            0.0
        } else {
            self.total_weight / self.bullet_count as f32
        }
    }

    fn covers(&self, seq: u64) -> bool {
        seq >= self.measurement_start
            && seq < self
                .measurement_start
                .saturating_add(u64::from(self.measurement_count))
    }
}

/// Running statistics of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SessionStats {
    pub count: u32,
    pub sum: f32,
    pub min: f32,
    pub max: f32,
}

impl SessionStats {
    pub fn mean(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f32
        }
    }

    fn add(&mut self, weight: f32) {
        if self.count == 0 {
            self.min = weight;
            self.max = weight;
        } else {
            self.min = self.min.min(weight);
            self.max = self.max.max(weight);
        }
        self.sum += weight;
        self.count += 1;
    }
}

#[derive(Debug, Clone)]
pub struct SessionLedger {
    history: BoundedHistory<Measurement>,
    archive: BoundedHistory<Measurement>,
    logs: BoundedHistory<SessionLog>,
    stats: SessionStats,
    lifetime: u64,
    next_seq: u64,
    session_start_time: i64,
    session_start_seq: u64,
}

impl SessionLedger {
    pub fn new(history_capacity: usize, log_capacity: usize, now: i64) -> Self {
        Self {
            history: BoundedHistory::new(history_capacity),
            archive: BoundedHistory::new(history_capacity),
            logs: BoundedHistory::new(log_capacity),
            stats: SessionStats::default(),
            lifetime: 0,
            next_seq: 0,
            session_start_time: now,
            session_start_seq: 0,
        }
    }

    /// Reinstate persisted session logs. New sequence numbers start past
    /// every restored range so old ranges never match new measurements.
    /// Logs whose range does not fit in the sequence space are dropped.
    pub fn restore_logs(&mut self, logs: Vec<SessionLog>) {
        self.logs.clear();
        for log in logs {
            let Some(end) = log
                .measurement_start
                .checked_add(u64::from(log.measurement_count))
                .filter(|end| *end < u64::MAX)
            else {
                tracing::warn!(
                    start = log.measurement_start,
                    count = log.measurement_count,
                    "dropping session log with out-of-range measurements"
                );
                continue;
            };
            self.next_seq = self.next_seq.max(end);
            self.logs.push(log);
        }
        self.session_start_seq = self.next_seq;
    }

    pub fn record_measurement(
        &mut self,
        weight: f32,
        profile: Option<&Profile>,
        now: i64,
    ) -> Measurement {
        let m = Measurement {
            seq: self.next_seq,
            timestamp: now,
            weight,
            profile: profile.cloned(),
        };
        self.next_seq = self.next_seq.saturating_add(1);
        self.lifetime += 1;
        self.stats.add(weight);
        if let Some(evicted) = self.history.push(m.clone()) {
            // keep the session exportable past the history window
            self.archive.push(evicted);
        }
        tracing::info!(
            weight,
            session = self.stats.count,
            profile = profile.map_or("-", |p| p.name.as_str()),
            "measurement recorded"
        );
        m
    }

    /// Sample standard deviation (N-1) of the session measurements still in
    /// history; 0 for fewer than two.
    pub fn standard_deviation(&self) -> f32 {
        let n = self.history.len();
        if n <= 1 {
            return 0.0;
        }
        let mean = self.history.iter().map(|m| m.weight).sum::<f32>() / n as f32;
        let sq: f32 = self
            .history
            .iter()
            .map(|m| (m.weight - mean) * (m.weight - mean))
            .sum();
        (sq / (n - 1) as f32).sqrt()
    }

    /// Close the current session. Writes a log only when it has measurements.
    pub fn end_session(&mut self, now: i64) -> Option<&SessionLog> {
        if self.stats.count == 0 {
            tracing::debug!("no measurements in current session to log");
            return None;
        }
        let log = SessionLog {
            start_time: self.session_start_time,
            end_time: now,
            bullet_count: self.stats.count,
            total_weight: self.stats.sum,
            measurement_start: self.session_start_seq,
            measurement_count: u32::try_from(self.next_seq.saturating_sub(self.session_start_seq))
                .unwrap_or(u32::MAX),
        };
        tracing::info!(
            bullets = log.bullet_count,
            total = log.total_weight,
            start = log.start_time,
            end = log.end_time,
            "session logged"
        );
        if self.logs.push(log).is_some() {
            tracing::debug!("session log archive full; dropped oldest");
        }
        for m in self.history.drain() {
            self.archive.push(m);
        }
        self.begin(now);
        self.logs.last()
    }

    /// End the current session (logging it if non-empty) and begin a new one.
    pub fn start_session(&mut self, now: i64) {
        self.end_session(now);
        self.begin(now);
    }

    /// Same transition as `start_session`, issued as an explicit reset.
    pub fn reset_session(&mut self, now: i64) {
        tracing::info!(measurements = self.stats.count, "session reset");
        self.end_session(now);
        self.begin(now);
    }

    /// Drop the current session without logging it.
    pub fn clear_session(&mut self, now: i64) {
        self.history.clear();
        self.begin(now);
    }

    fn begin(&mut self, now: i64) {
        self.stats = SessionStats::default();
        self.session_start_time = now;
        self.session_start_seq = self.next_seq;
    }

    pub const fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Measurements recorded since boot.
    pub const fn lifetime_count(&self) -> u64 {
        self.lifetime
    }

    pub const fn measurements(&self) -> &BoundedHistory<Measurement> {
        &self.history
    }

    pub const fn logs(&self) -> &BoundedHistory<SessionLog> {
        &self.logs
    }

    pub fn log(&self, index: i64) -> Option<&SessionLog> {
        usize::try_from(index).ok().and_then(|i| self.logs.get(i))
    }

    pub const fn session_start_time(&self) -> i64 {
        self.session_start_time
    }

    /// CSV of the current session's measurements.
    pub fn export_csv(&self) -> Result<String> {
        write_csv(self.history.iter())
    }

    /// CSV of an archived session's measurements; `None` for an unknown index.
    pub fn export_session_csv(&self, index: i64) -> Result<Option<String>> {
        let Some(log) = self.log(index) else {
            return Ok(None);
        };
        let rows: Vec<&Measurement> = self.archive.iter().filter(|m| log.covers(m.seq)).collect();
        if rows.len() < log.measurement_count as usize {
            tracing::warn!(
                index,
                expected = log.measurement_count,
                retained = rows.len(),
                "session partially evicted; exporting retained measurements"
            );
        }
        write_csv(rows.into_iter()).map(Some)
    }

    /// Human-readable summary of an archived session; `None` for an unknown index.
    pub fn session_summary_csv(&self, index: i64) -> Option<String> {
        let log = self.log(index)?;
        let avg = log.average();
        Some(format!(
            "PowderSense Session Export\n\
             Session Start: {start}\n\
             Total Bullets: {bullets}\n\
             Total Weight: {total:.3} grains\n\
             Average Weight: {avg:.3} grains\n\
             \n\
             Session Summary\n\
             Metric,Value\n\
             Total Bullets,{bullets}\n\
             Total Weight (gr),{total:.3}\n\
             Average Weight (gr),{avg:.3}\n\
             Start Time,{start}\n\
             End Time,{end}\n\
             Duration (seconds),{duration}\n",
            start = log.start_time,
            end = log.end_time,
            bullets = log.bullet_count,
            total = log.total_weight,
            duration = log.end_time.saturating_sub(log.start_time),
        ))
    }
}

fn write_csv<'a>(rows: impl Iterator<Item = &'a Measurement>) -> Result<String> {
    let mut w = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    w.write_record(CSV_HEADER).wrap_err("write csv header")?;
    for m in rows {
        let ts = m.timestamp.to_string();
        let weight = format!("{:.3}", m.weight);
        match &m.profile {
            Some(p) => {
                let target = format!("{:.3}", p.target_grain);
                w.write_record([
                    ts.as_str(),
                    weight.as_str(),
                    p.name.as_str(),
                    p.caliber.as_str(),
                    p.bullet_weight.as_str(),
                    p.powder_name.as_str(),
                    target.as_str(),
                ])
            }
            None => w.write_record([ts.as_str(), weight.as_str(), "", "", "", "", ""]),
        }
        .wrap_err("write csv row")?;
    }
    let bytes = w.into_inner().wrap_err("flush csv")?;
    String::from_utf8(bytes).wrap_err("csv is not utf-8")
}
