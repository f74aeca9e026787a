use chrono::{Local, NaiveDateTime};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub const DEFAULT_PREFIX: &str = "Auto commit ";

/// Source of the local wall-clock time used for commit messages.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[cfg(test)]
pub struct FixedClock(pub NaiveDateTime);

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// `YYYY-MM-DD HH:MM`, zero padded.
pub fn stamp(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%d %H:%M").to_string()
}

pub fn commit_message(prefix: &str, t: NaiveDateTime) -> String {
    format!("{prefix}{}", stamp(t))
}

pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

pub fn iso(dt: OffsetDateTime) -> String {
    dt.format(&Rfc3339).unwrap_or_else(|_| dt.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, 42).unwrap()
    }

    #[test]
    fn message_pads_hour_and_minute() {
        assert_eq!(commit_message(DEFAULT_PREFIX, at(2024, 3, 7, 9, 5)), "Auto commit 2024-03-07 09:05");
    }

    #[test]
    fn message_drops_seconds() {
        assert_eq!(stamp(at(2023, 12, 31, 23, 59)), "2023-12-31 23:59");
    }

    #[test]
    fn custom_prefix_is_used_verbatim() {
        assert_eq!(commit_message("wip: ", at(2025, 1, 1, 0, 0)), "wip: 2025-01-01 00:00");
    }

    #[test]
    fn fixed_clock_returns_its_value() {
        let t = at(2024, 6, 1, 12, 30);
        assert_eq!(FixedClock(t).now(), t);
    }

    #[test]
    fn stamp_has_fixed_width() {
        for h in 0..24 {
            for mi in [0, 5, 30, 59] {
                assert_eq!(stamp(at(2024, 1, 2, h, mi)).len(), 16);
            }
        }
    }

    #[test]
    fn iso_is_rfc3339() {
        let s = iso(now_utc());
        assert!(OffsetDateTime::parse(&s, &Rfc3339).is_ok());
    }
}
