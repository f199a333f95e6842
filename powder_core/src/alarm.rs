//! Alarm band, alarm flag and the status indicator colour.
use powder_traits::Color;

use crate::util::elapsed_ms;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlarmSettings {
    pub enabled: bool,
    pub low_threshold: f32,
    pub high_threshold: f32,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            low_threshold: 0.0,
            high_threshold: 100.0,
        }
    }
}

impl AlarmSettings {
    pub fn contains(&self, weight: f32) -> bool {
        (self.low_threshold..=self.high_threshold).contains(&weight)
    }
}

/// Evaluates the current weight against the alarm band once per tick.
///
/// The reading counts as stable once the indicator has stayed green for
/// `stable_ms`.
#[derive(Debug, Clone)]
pub struct AlarmMonitor {
    settings: AlarmSettings,
    active: bool,
    green_since: Option<u64>,
    stable: bool,
    stable_ms: u64,
}

impl AlarmMonitor {
    pub const fn new(settings: AlarmSettings, stable_ms: u64) -> Self {
        Self {
            settings,
            active: false,
            green_since: None,
            stable: false,
            stable_ms,
        }
    }

    pub const fn settings(&self) -> &AlarmSettings {
        &self.settings
    }

    pub fn set(&mut self, settings: AlarmSettings) {
        self.settings = settings;
    }

    /// Centre the band on `target` with half-width `tolerance`.
    pub fn center_on(&mut self, target: f32, tolerance: f32) {
        self.settings.low_threshold = target - tolerance;
        self.settings.high_threshold = target + tolerance;
    }

    pub const fn is_active(&self) -> bool {
        self.active
    }

    pub const fn is_stable(&self) -> bool {
        self.stable
    }

    /// Drop the alarm flag until the next evaluation.
    pub fn clear(&mut self) {
        self.active = false;
    }

    pub fn evaluate(&mut self, now_ms: u64, weight: f32) -> Color {
        let (color, green) = if !self.settings.enabled {
            (Color::Blue, false)
        } else if self.settings.contains(weight) {
            (Color::Green, true)
        } else {
            (Color::Red, false)
        };
        self.active = self.settings.enabled && !green;

        match (green, self.green_since) {
            (true, None) => {
                self.green_since = Some(now_ms);
                self.stable = false;
            }
            (true, Some(since)) => {
                if elapsed_ms(now_ms, since) >= self.stable_ms {
                    self.stable = true;
                }
            }
            (false, _) => {
                self.green_since = None;
                self.stable = false;
            }
        }
        color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn band(enabled: bool) -> AlarmSettings {
        AlarmSettings {
            enabled,
            low_threshold: 24.4,
            high_threshold: 24.6,
        }
    }

    #[rstest]
    #[case(true, 24.5, Color::Green, false)]
    #[case(true, 24.0, Color::Red, true)]
    #[case(true, 25.0, Color::Red, true)]
    #[case(false, 99.0, Color::Blue, false)]
    fn colour_and_flag(
        #[case] enabled: bool,
        #[case] weight: f32,
        #[case] color: Color,
        #[case] active: bool,
    ) {
        let mut m = AlarmMonitor::new(band(enabled), 1_500);
        assert_eq!(m.evaluate(0, weight), color);
        assert_eq!(m.is_active(), active);
    }

    #[test]
    fn stable_after_green_held() {
        let mut m = AlarmMonitor::new(band(true), 1_500);
        m.evaluate(0, 24.5);
        m.evaluate(1_499, 24.5);
        assert!(!m.is_stable());
        m.evaluate(1_500, 24.5);
        assert!(m.is_stable());
        m.evaluate(1_600, 30.0);
        assert!(!m.is_stable());
        m.evaluate(1_700, 24.5);
        assert!(!m.is_stable());
    }

    #[test]
    fn centering_and_clear() {
        let mut m = AlarmMonitor::new(AlarmSettings::default(), 1_500);
        m.center_on(42.0, 0.1);
        assert!((m.settings().low_threshold - 41.9).abs() < 1e-4);
        assert!((m.settings().high_threshold - 42.1).abs() < 1e-4);
        m.evaluate(0, 50.0);
        assert!(m.is_active());
        m.clear();
        assert!(!m.is_active());
    }
}
