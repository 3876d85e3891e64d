use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ThemeError;

/// Theme mode, one of exactly three states matching the companion app's
/// lighting schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Day,
    Evening,
    Night,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Day, Mode::Evening, Mode::Night];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Day => "day",
            Mode::Evening => "evening",
            Mode::Night => "night",
        }
    }

    /// Parses a mode name. Anything outside the three known names is an error.
    pub fn parse(s: &str) -> Result<Mode, ThemeError> {
        match s {
            "day" => Ok(Mode::Day),
            "evening" => Ok(Mode::Evening),
            "night" => Ok(Mode::Night),
            other => Err(ThemeError::InvalidMode(other.to_string())),
        }
    }

    /// Fixed successor ring: day -> evening -> night -> day.
    pub fn next(&self) -> Mode {
        match self {
            Mode::Day => Mode::Evening,
            Mode::Evening => Mode::Night,
            Mode::Night => Mode::Day,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Daily schedule boundaries in fractional hours on a 24-hour clock.
///
/// The three buckets partition the day: `[day_start, evening_start)` is day,
/// `[evening_start, night_start)` is evening, everything else is night
/// (night wraps across midnight). Boundaries are configuration; the defaults
/// mirror the companion desktop app (07:00 / 17:30 / 19:00).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default = "default_day_start")]
    pub day_start: f64,
    #[serde(default = "default_evening_start")]
    pub evening_start: f64,
    #[serde(default = "default_night_start")]
    pub night_start: f64,
}

fn default_day_start() -> f64 {
    7.0
}

fn default_evening_start() -> f64 {
    17.5
}

fn default_night_start() -> f64 {
    19.0
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            day_start: default_day_start(),
            evening_start: default_evening_start(),
            night_start: default_night_start(),
        }
    }
}

/// Upcoming schedule boundary for a given mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub next_mode: Mode,
    /// Start hour of the next mode, normalized to `[0, 24)`.
    pub at_hour: f64,
    /// Milliseconds until the next mode starts.
    pub eta_ms: i64,
}

impl Transition {
    /// Clock-style rendering of the transition hour, e.g. "17:30".
    pub fn format_clock(&self) -> String {
        let hour = self.at_hour.floor() as u32;
        let minute = ((self.at_hour - self.at_hour.floor()) * 60.0).round() as u32;
        format!("{}:{:02}", hour, minute)
    }
}

impl Schedule {
    /// Validates that the boundaries are strictly ascending within [0, 24).
    pub fn validate(&self) -> Result<(), ThemeError> {
        let in_range = |h: f64| (0.0..24.0).contains(&h);
        if !in_range(self.day_start) || !in_range(self.evening_start) || !in_range(self.night_start)
        {
            return Err(ThemeError::Schedule(format!(
                "boundaries must be within [0, 24): {}/{}/{}",
                self.day_start, self.evening_start, self.night_start
            )));
        }
        if !(self.day_start < self.evening_start && self.evening_start < self.night_start) {
            return Err(ThemeError::Schedule(format!(
                "boundaries must be strictly ascending: {}/{}/{}",
                self.day_start, self.evening_start, self.night_start
            )));
        }
        Ok(())
    }

    /// Classifies a fractional hour into a mode. Total over all inputs;
    /// out-of-range hours are normalized into the 24-hour cycle.
    pub fn mode_at_hour(&self, hour: f64) -> Mode {
        let h = hour.rem_euclid(24.0);
        if h >= self.day_start && h < self.evening_start {
            Mode::Day
        } else if h >= self.evening_start && h < self.night_start {
            Mode::Evening
        } else {
            Mode::Night
        }
    }

    /// Mode for the given wall-clock instant.
    pub fn current_mode(&self, now: DateTime<Local>) -> Mode {
        self.mode_at_hour(fractional_hour(now))
    }

    /// Start hour of a mode's bucket.
    pub fn start_of(&self, mode: Mode) -> f64 {
        match mode {
            Mode::Day => self.day_start,
            Mode::Evening => self.evening_start,
            Mode::Night => self.night_start,
        }
    }

    /// Next transition after `now`, assuming `mode` is the active mode.
    pub fn next_transition(&self, mode: Mode, now: DateTime<Local>) -> Transition {
        self.next_transition_at_hour(mode, fractional_hour(now))
    }

    /// Same as [`next_transition`](Self::next_transition) but against an
    /// explicit fractional hour, which keeps the math testable.
    pub fn next_transition_at_hour(&self, mode: Mode, hour: f64) -> Transition {
        let next_mode = mode.next();
        let next_start = self.start_of(next_mode);
        let mut eta_ms = ((next_start - hour.rem_euclid(24.0)) * 3_600_000.0).round() as i64;
        if eta_ms <= 0 {
            // Next start already passed today; it happens tomorrow.
            eta_ms += 24 * 3_600_000;
        }
        Transition {
            next_mode,
            at_hour: next_start.rem_euclid(24.0),
            eta_ms,
        }
    }
}

/// Hour plus minutes as a fraction, e.g. 17:45 -> 17.75.
pub fn fractional_hour(now: DateTime<Local>) -> f64 {
    f64::from(now.hour()) + f64::from(now.minute()) / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_buckets() {
        let s = Schedule::default();
        assert_eq!(s.mode_at_hour(7.0), Mode::Day);
        assert_eq!(s.mode_at_hour(12.0), Mode::Day);
        assert_eq!(s.mode_at_hour(17.49), Mode::Day);
        assert_eq!(s.mode_at_hour(17.5), Mode::Evening);
        assert_eq!(s.mode_at_hour(18.99), Mode::Evening);
        assert_eq!(s.mode_at_hour(19.0), Mode::Night);
        assert_eq!(s.mode_at_hour(23.999), Mode::Night);
        assert_eq!(s.mode_at_hour(0.0), Mode::Night);
        assert_eq!(s.mode_at_hour(6.99), Mode::Night);
    }

    #[test]
    fn test_mode_at_hour_is_total() {
        let s = Schedule::default();
        assert_eq!(s.mode_at_hour(24.0), Mode::Night);
        assert_eq!(s.mode_at_hour(31.0), Mode::Day);
        assert_eq!(s.mode_at_hour(-1.0), Mode::Night);
    }

    #[test]
    fn test_successor_ring() {
        assert_eq!(Mode::Day.next(), Mode::Evening);
        assert_eq!(Mode::Evening.next(), Mode::Night);
        assert_eq!(Mode::Night.next(), Mode::Day);
    }

    #[test]
    fn test_next_transition_from_day() {
        let s = Schedule::default();
        let t = s.next_transition_at_hour(Mode::Day, 8.0);
        assert_eq!(t.next_mode, Mode::Evening);
        assert_eq!(t.at_hour, 17.5);
        assert_eq!(t.eta_ms, (9.5 * 3_600_000.0) as i64);
    }

    #[test]
    fn test_next_transition_wraps_midnight() {
        let s = Schedule::default();
        // 20:00 in night mode: day starts at 07:00 the next morning, 11h away.
        let t = s.next_transition_at_hour(Mode::Night, 20.0);
        assert_eq!(t.next_mode, Mode::Day);
        assert_eq!(t.at_hour, 7.0);
        assert_eq!(t.eta_ms, 11 * 3_600_000);
    }

    #[test]
    fn test_next_transition_early_morning_night() {
        let s = Schedule::default();
        // 02:00, still night: day starts at 07:00 the same morning.
        let t = s.next_transition_at_hour(Mode::Night, 2.0);
        assert_eq!(t.next_mode, Mode::Day);
        assert_eq!(t.eta_ms, 5 * 3_600_000);
    }

    #[test]
    fn test_transition_format_clock() {
        let s = Schedule::default();
        let t = s.next_transition_at_hour(Mode::Day, 8.0);
        assert_eq!(t.format_clock(), "17:30");
    }

    #[test]
    fn test_mode_parse_round_trip() {
        for mode in Mode::ALL {
            assert_eq!(Mode::parse(mode.as_str()).unwrap(), mode);
        }
        assert!(Mode::parse("dusk").is_err());
        assert!(Mode::parse("Day").is_err());
    }

    #[test]
    fn test_schedule_validation() {
        assert!(Schedule::default().validate().is_ok());
        let bad = Schedule {
            day_start: 9.0,
            evening_start: 8.0,
            night_start: 19.0,
        };
        assert!(bad.validate().is_err());
        let out_of_range = Schedule {
            day_start: 7.0,
            evening_start: 17.5,
            night_start: 24.5,
        };
        assert!(out_of_range.validate().is_err());
    }
}
