//! Ticks of a local day already consumed by active appointments.
//!
//! An appointment blocks every tick it touches with its closed span
//! `[start, end]`: a tick starting exactly when an appointment ends is
//! conflicted. Downstream booking confirmation relies on this.

use chrono::{NaiveDate, NaiveTime, TimeDelta};

use super::tick::TickGrid;
use super::timezone::TimezoneAdapter;
use crate::booking::model::{Appointment, ProfessionalId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictSet {
    ticks: Vec<bool>,
}

impl ConflictSet {
    /// Build the conflicts of local `date` for `professional`, or for every
    /// professional of the establishment when none is given.
    pub fn build(
        appointments: &[Appointment],
        date: NaiveDate,
        professional: Option<&ProfessionalId>,
        tz: &TimezoneAdapter,
        grid: &TickGrid,
    ) -> Self {
        let mut ticks = vec![false; grid.ticks_per_day()];
        let day_start = date.and_time(NaiveTime::MIN);
        let day_end = day_start + TimeDelta::days(1);
        let tick_len = TimeDelta::minutes(grid.size_minutes() as i64);

        for appt in appointments
            .iter()
            .filter(|a| a.is_active())
            .filter(|a| professional.map_or(true, |p| *p == a.professional_id))
        {
            let start = tz.to_local(appt.start);
            let end = tz.to_local(appt.end());
            if end < day_start || start >= day_end {
                continue;
            }
            for (i, conflicted) in ticks.iter_mut().enumerate() {
                let tick_start = day_start + TimeDelta::minutes(grid.minute_of(i) as i64);
                if start < tick_start + tick_len && tick_start <= end {
                    *conflicted = true;
                }
            }
        }

        Self { ticks }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.ticks.get(index).copied().unwrap_or(false)
    }

    /// Number of conflicted ticks.
    pub fn count(&self) -> usize {
        self.ticks.iter().filter(|c| **c).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::model::{
        AppointmentId, AppointmentStatus, ClientId, EstablishmentId, ServiceId,
    };
    use chrono::{DateTime, TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn appointment(professional: ProfessionalId, start: DateTime<Utc>, minutes: u32) -> Appointment {
        Appointment {
            id: AppointmentId::new(),
            establishment_id: EstablishmentId::new(),
            professional_id: professional,
            service_id: ServiceId::new(),
            client_id: ClientId::new(),
            start,
            duration_minutes: minutes,
            status: AppointmentStatus::Active,
        }
    }

    fn conflicted(set: &ConflictSet, grid: &TickGrid) -> Vec<NaiveTime> {
        (0..grid.ticks_per_day())
            .filter(|i| set.contains(*i))
            .map(|i| grid.time_of(i))
            .collect()
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    #[test]
    fn closed_interval_blocks_the_end_tick() {
        let grid = TickGrid::new(30).unwrap();
        let tz = TimezoneAdapter::default();
        let ana = ProfessionalId::new();
        // 09:00-10:00 local is 12:00-13:00 UTC.
        let appts = vec![appointment(ana, utc(2025, 1, 6, 12, 0), 60)];
        let set = ConflictSet::build(&appts, date(2025, 1, 6), Some(&ana), &tz, &grid);
        assert_eq!(conflicted(&set, &grid), vec![t("09:00"), t("09:30"), t("10:00")]);
    }

    #[test]
    fn only_active_appointments_count() {
        let grid = TickGrid::new(30).unwrap();
        let tz = TimezoneAdapter::default();
        let ana = ProfessionalId::new();
        let mut canceled = appointment(ana, utc(2025, 1, 6, 12, 0), 60);
        canceled.status = AppointmentStatus::Canceled;
        let mut done = appointment(ana, utc(2025, 1, 6, 14, 0), 60);
        done.status = AppointmentStatus::Completed;
        let set = ConflictSet::build(&[canceled, done], date(2025, 1, 6), Some(&ana), &tz, &grid);
        assert_eq!(set.count(), 0);
    }

    #[test]
    fn professional_scope_and_establishment_scope() {
        let grid = TickGrid::new(30).unwrap();
        let tz = TimezoneAdapter::default();
        let ana = ProfessionalId::new();
        let bia = ProfessionalId::new();
        let appts = vec![
            appointment(ana, utc(2025, 1, 6, 12, 0), 30),
            appointment(bia, utc(2025, 1, 6, 15, 0), 30),
        ];
        let day = date(2025, 1, 6);
        let for_ana = ConflictSet::build(&appts, day, Some(&ana), &tz, &grid);
        assert_eq!(conflicted(&for_ana, &grid), vec![t("09:00"), t("09:30")]);

        let for_all = ConflictSet::build(&appts, day, None, &tz, &grid);
        assert_eq!(for_all.count(), 4);
    }

    #[test]
    fn unaligned_appointment_blocks_every_touched_tick() {
        let grid = TickGrid::new(30).unwrap();
        let tz = TimezoneAdapter::default();
        let ana = ProfessionalId::new();
        // 09:15-09:45 local.
        let appts = vec![appointment(ana, utc(2025, 1, 6, 12, 15), 30)];
        let set = ConflictSet::build(&appts, date(2025, 1, 6), Some(&ana), &tz, &grid);
        assert_eq!(conflicted(&set, &grid), vec![t("09:00"), t("09:30")]);
    }

    #[test]
    fn appointment_across_local_midnight_hits_both_days() {
        let grid = TickGrid::new(30).unwrap();
        let tz = TimezoneAdapter::default();
        let ana = ProfessionalId::new();
        // 23:30 local on the 6th for an hour.
        let appts = vec![appointment(ana, utc(2025, 1, 7, 2, 30), 60)];
        let first = ConflictSet::build(&appts, date(2025, 1, 6), Some(&ana), &tz, &grid);
        assert_eq!(conflicted(&first, &grid), vec![t("23:30")]);
        let second = ConflictSet::build(&appts, date(2025, 1, 7), Some(&ana), &tz, &grid);
        assert_eq!(conflicted(&second, &grid), vec![t("00:00"), t("00:30")]);
    }
}
