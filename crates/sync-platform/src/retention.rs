//! `DD:HH:MM` retention-period parsing (spec.md §4.6).
//!
//! `00:00:00` disables tombstone cleanup entirely.

use std::fmt;

use chrono::Duration as ChronoDuration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetentionParseError {
    #[error("expected DD:HH:MM, got {0:?}")]
    Malformed(String),
    #[error("hours must be in [0,23], got {0}")]
    HoursOutOfRange(u32),
    #[error("minutes must be in [0,59], got {0}")]
    MinutesOutOfRange(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPeriod {
    days: u32,
    hours: u32,
    minutes: u32,
}

impl RetentionPeriod {
    pub fn parse(raw: &str) -> Result<Self, RetentionParseError> {
        let parts: Vec<&str> = raw.trim().split(':').collect();
        let [days_s, hours_s, minutes_s] = parts[..] else {
            return Err(RetentionParseError::Malformed(raw.to_string()));
        };

        let days: u32 = days_s
            .parse()
            .map_err(|_| RetentionParseError::Malformed(raw.to_string()))?;
        let hours: u32 = hours_s
            .parse()
            .map_err(|_| RetentionParseError::Malformed(raw.to_string()))?;
        let minutes: u32 = minutes_s
            .parse()
            .map_err(|_| RetentionParseError::Malformed(raw.to_string()))?;

        if hours > 23 {
            return Err(RetentionParseError::HoursOutOfRange(hours));
        }
        if minutes > 59 {
            return Err(RetentionParseError::MinutesOutOfRange(minutes));
        }

        Ok(Self {
            days,
            hours,
            minutes,
        })
    }

    /// `00:00:00` — cleanup is disabled and nothing is ever expired.
    pub fn is_disabled(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0
    }

    pub fn to_chrono_duration(self) -> ChronoDuration {
        ChronoDuration::days(self.days as i64)
            + ChronoDuration::hours(self.hours as i64)
            + ChronoDuration::minutes(self.minutes as i64)
    }
}

impl fmt::Display for RetentionPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.days, self.hours, self.minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_period() {
        let p = RetentionPeriod::parse("07:12:30").unwrap();
        assert_eq!(p.to_chrono_duration(), ChronoDuration::hours(7 * 24 + 12) + ChronoDuration::minutes(30));
    }

    #[test]
    fn zero_period_is_disabled() {
        let p = RetentionPeriod::parse("00:00:00").unwrap();
        assert!(p.is_disabled());
    }

    #[test]
    fn rejects_bad_hours() {
        assert_eq!(
            RetentionPeriod::parse("01:24:00"),
            Err(RetentionParseError::HoursOutOfRange(24))
        );
    }

    #[test]
    fn rejects_bad_minutes() {
        assert_eq!(
            RetentionPeriod::parse("01:00:60"),
            Err(RetentionParseError::MinutesOutOfRange(60))
        );
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!(RetentionPeriod::parse("1:2").is_err());
        assert!(RetentionPeriod::parse("a:b:c").is_err());
    }
}
