//! # Day Window
//!
//! A reconciliation day is `[local midnight, next local midnight)` in one
//! fixed operational timezone, converted to UTC for storage queries. The
//! host's local time is never consulted.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Max minutes past midnight scanned when midnight falls into a DST gap.
const DAY_START_SCAN_MINUTES: i64 = 180;

/// Half-open UTC interval covering one operational calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }

    pub fn length(&self) -> Duration {
        self.end - self.start
    }
}

/// Resolves calendar dates into [`DayWindow`]s for an operational timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindowPolicy {
    tz: Tz,
}

impl DayWindowPolicy {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn utc() -> Self {
        Self::new(Tz::UTC)
    }

    /// Build from an IANA name such as `"Asia/Ho_Chi_Minh"`.
    pub fn from_name(name: &str) -> CoreResult<Self> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|_| CoreError::InvalidTimezone(name.to_string()))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn window(&self, date: NaiveDate) -> CoreResult<DayWindow> {
        let next = date
            .succ_opt()
            .ok_or_else(|| self.unresolvable(date))?;

        Ok(DayWindow {
            date,
            start: self.day_start(date)?,
            end: self.day_start(next)?,
        })
    }

    /// First instant of `date` in the policy timezone.
    ///
    /// An ambiguous midnight takes the earlier instant; a skipped midnight
    /// takes the first valid minute after it.
    pub fn day_start(&self, date: NaiveDate) -> CoreResult<DateTime<Utc>> {
        let midnight = date.and_time(NaiveTime::MIN);

        for minutes in 0..=DAY_START_SCAN_MINUTES {
            let local = midnight + Duration::minutes(minutes);
            match self.tz.from_local_datetime(&local) {
                LocalResult::Single(at) => return Ok(at.with_timezone(&Utc)),
                LocalResult::Ambiguous(earliest, _) => return Ok(earliest.with_timezone(&Utc)),
                LocalResult::None => continue,
            }
        }

        Err(self.unresolvable(date))
    }

    fn unresolvable(&self, date: NaiveDate) -> CoreError {
        CoreError::UnresolvableDayStart {
            date,
            timezone: self.tz.name().to_string(),
        }
    }
}

impl Default for DayWindowPolicy {
    fn default() -> Self {
        Self::utc()
    }
}
