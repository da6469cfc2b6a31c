//! Conversion between storage (UTC) instants and local wall-clock time.
//!
//! Local time is a fixed offset from storage time. Day boundaries and weekdays
//! are always computed on the local side; persistence comparisons happen on
//! the storage side.

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::error::AgendaError;

/// Offset used by the booking product when nothing else is configured: UTC-3.
pub const DEFAULT_OFFSET_MINUTES: i32 = -180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimezoneAdapter {
    offset: FixedOffset,
}

impl Default for TimezoneAdapter {
    fn default() -> Self {
        Self {
            offset: FixedOffset::east_opt(DEFAULT_OFFSET_MINUTES * 60).unwrap_or(Utc.fix()),
        }
    }
}

impl TimezoneAdapter {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn from_offset_minutes(minutes: i32) -> Result<Self, AgendaError> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Self::new)
            .ok_or_else(|| AgendaError::Config(format!("UTC offset of {minutes} minutes is out of range")))
    }

    /// Pin an IANA zone to the offset it has at `at`.
    pub fn from_zone_name(name: &str, at: DateTime<Utc>) -> Result<Self, AgendaError> {
        let tz: Tz = name
            .parse()
            .map_err(|_| AgendaError::Config(format!("Unknown timezone: '{name}'")))?;
        Ok(Self::new(tz.offset_from_utc_datetime(&at.naive_utc()).fix()))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn to_storage(&self, local: NaiveDateTime) -> DateTime<Utc> {
        local.and_utc() - TimeDelta::seconds(self.offset.local_minus_utc() as i64)
    }

    pub fn to_local(&self, storage: DateTime<Utc>) -> NaiveDateTime {
        storage.with_timezone(&self.offset).naive_local()
    }

    pub fn local_today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.to_local(now).date()
    }

    /// Storage instants of local midnight on `date` and on the following day.
    pub fn storage_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.to_storage(date.and_time(NaiveTime::MIN));
        (start, start + TimeDelta::days(1))
    }
}
