//! Time-of-day schedule windows for playlists
//!
//! A window opens at `start` local time on each listed weekday and closes at
//! `end`. Windows whose end is not after their start run past midnight into
//! the following day.

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// When a scheduled playlist should be running
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,

    #[serde(with = "hhmm")]
    pub end: NaiveTime,

    /// Days the window opens on; empty means every day
    #[serde(default)]
    pub days: Vec<Weekday>,

    /// Start the playlist looped
    #[serde(default = "default_true")]
    pub looping: bool,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ScheduleWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start,
            end,
            days: Vec::new(),
            looping: true,
            enabled: true,
        }
    }

    pub fn runs_on(&self, day: Weekday) -> bool {
        self.days.is_empty() || self.days.contains(&day)
    }

    /// Whether `now` falls inside an occurrence of this window, with the
    /// occurrence's end pushed out by `extra_minutes`.
    pub fn is_active(&self, now: NaiveDateTime, extra_minutes: u32) -> bool {
        if !self.enabled {
            return false;
        }

        // An occurrence that started yesterday may still be open
        let today = now.date();
        [today.pred_opt(), Some(today)]
            .into_iter()
            .flatten()
            .any(|day| {
                if !self.runs_on(day.weekday()) {
                    return false;
                }
                let open = day.and_time(self.start);
                let mut close = day.and_time(self.end);
                if close <= open {
                    close += Duration::days(1);
                }
                close += Duration::minutes(i64::from(extra_minutes));
                now >= open && now < close
            })
    }
}

/// `HH:MM` serde representation for `NaiveTime`
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_same_day_window() {
        let window = ScheduleWindow::new(hm(17, 0), hm(23, 0));
        assert!(!window.is_active(at(2026, 12, 24, 16, 59), 0));
        assert!(window.is_active(at(2026, 12, 24, 17, 0), 0));
        assert!(window.is_active(at(2026, 12, 24, 22, 59), 0));
        assert!(!window.is_active(at(2026, 12, 24, 23, 0), 0));
    }

    #[test]
    fn test_window_crossing_midnight() {
        let window = ScheduleWindow::new(hm(22, 0), hm(1, 0));
        assert!(window.is_active(at(2026, 12, 24, 23, 30), 0));
        assert!(window.is_active(at(2026, 12, 25, 0, 30), 0));
        assert!(!window.is_active(at(2026, 12, 25, 1, 0), 0));
        assert!(!window.is_active(at(2026, 12, 25, 12, 0), 0));
    }

    #[test]
    fn test_extension_pushes_close() {
        let window = ScheduleWindow::new(hm(17, 0), hm(23, 0));
        assert!(!window.is_active(at(2026, 12, 24, 23, 10), 0));
        assert!(window.is_active(at(2026, 12, 24, 23, 10), 15));
    }

    #[test]
    fn test_weekday_filter_and_disabled() {
        // 2026-12-24 is a Thursday
        let mut window = ScheduleWindow::new(hm(17, 0), hm(23, 0));
        window.days = vec![Weekday::Fri, Weekday::Sat];
        assert!(!window.is_active(at(2026, 12, 24, 18, 0), 0));
        assert!(window.is_active(at(2026, 12, 25, 18, 0), 0));

        window.enabled = false;
        assert!(!window.is_active(at(2026, 12, 25, 18, 0), 0));
    }

    #[test]
    fn test_hhmm_roundtrip_through_toml() {
        let mut window = ScheduleWindow::new(hm(17, 30), hm(23, 5));
        window.days = vec![Weekday::Sat];
        let text = toml::to_string(&window).unwrap();
        assert!(text.contains("start = \"17:30\""));
        let parsed: ScheduleWindow = toml::from_str(&text).unwrap();
        assert_eq!(parsed, window);
    }
}
