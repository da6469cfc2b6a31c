//! Fixed-size discretization of a day into ticks aligned to midnight.

use chrono::{NaiveTime, TimeDelta, Timelike};

use crate::error::AgendaError;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickGrid {
    size_minutes: u32,
}

impl TickGrid {
    pub fn new(size_minutes: u32) -> Result<Self, AgendaError> {
        if size_minutes == 0 || size_minutes > MINUTES_PER_DAY {
            return Err(AgendaError::InvalidRange(format!(
                "Tick size must be between 1 and {MINUTES_PER_DAY} minutes, got {size_minutes}"
            )));
        }
        if MINUTES_PER_DAY % size_minutes != 0 {
            return Err(AgendaError::InvalidRange(format!(
                "Tick size {size_minutes} does not divide a day evenly"
            )));
        }
        Ok(Self { size_minutes })
    }

    pub fn size_minutes(&self) -> u32 {
        self.size_minutes
    }

    pub fn ticks_per_day(&self) -> usize {
        (MINUTES_PER_DAY / self.size_minutes) as usize
    }

    /// Local time at which tick `index` starts.
    pub fn time_of(&self, index: usize) -> NaiveTime {
        NaiveTime::MIN + TimeDelta::minutes((index as u32 * self.size_minutes) as i64)
    }

    /// Minute offset from midnight at which tick `index` starts.
    pub fn minute_of(&self, index: usize) -> u32 {
        index as u32 * self.size_minutes
    }

    /// Index of the tick containing `time`.
    pub fn index_of(&self, time: NaiveTime) -> usize {
        (minute_of_day(time) / self.size_minutes) as usize
    }

    /// Number of ticks a service of `duration_minutes` occupies, rounded up.
    pub fn required_ticks(&self, duration_minutes: u32) -> usize {
        duration_minutes.div_ceil(self.size_minutes) as usize
    }

    /// Whether the whole span of tick `index` lies inside `[start, end)`, where
    /// `end` is a minute offset that may be 1440 for "end of day".
    pub fn tick_within(&self, index: usize, start_minute: u32, end_minute: u32) -> bool {
        let tick_start = self.minute_of(index);
        tick_start >= start_minute && tick_start + self.size_minutes <= end_minute
    }
}

pub fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}
