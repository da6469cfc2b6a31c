//! Restriction of candidate ticks to the active shifts of a weekday.

use chrono::Weekday;

use super::tick::{minute_of_day, TickGrid, MINUTES_PER_DAY};
use crate::booking::model::Shift;

/// Clear every candidate tick that lies outside all active shifts for
/// `weekday`.
///
/// `establishment_has_shifts` is true when any active shift exists on any
/// weekday. Without one the ticks pass through untouched; with one, a weekday
/// that has no shift of its own keeps no ticks at all.
pub fn apply_shifts(
    candidates: &mut [bool],
    shifts: &[Shift],
    weekday: Weekday,
    establishment_has_shifts: bool,
    grid: &TickGrid,
) {
    if !establishment_has_shifts {
        return;
    }

    let spans: Vec<(u32, u32)> = shifts
        .iter()
        .filter(|s| s.is_active() && s.weekdays.contains(weekday))
        .map(|s| {
            let end = match minute_of_day(s.end) {
                1439 => MINUTES_PER_DAY,
                m => m,
            };
            (minute_of_day(s.start), end)
        })
        .collect();

    for (i, open) in candidates.iter_mut().enumerate() {
        if *open && !spans.iter().any(|&(start, end)| grid.tick_within(i, start, end)) {
            *open = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::model::{EstablishmentId, RecordStatus, ShiftId, WeekdaySet};
    use chrono::NaiveTime;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn shift(name: &str, days: &[u8], start: &str, end: &str) -> Shift {
        Shift {
            id: ShiftId::new(),
            establishment_id: EstablishmentId::new(),
            name: name.to_string(),
            weekdays: WeekdaySet::from_numbers(days).unwrap(),
            start: t(start),
            end: t(end),
            status: RecordStatus::Active,
        }
    }

    fn open_range(grid: &TickGrid, from: &str, to: &str) -> Vec<bool> {
        let (a, b) = (grid.index_of(t(from)), grid.index_of(t(to)));
        (0..grid.ticks_per_day()).map(|i| i >= a && i < b).collect()
    }

    fn open_indices(ticks: &[bool]) -> Vec<usize> {
        ticks.iter().enumerate().filter(|(_, o)| **o).map(|(i, _)| i).collect()
    }

    #[test]
    fn no_shifts_is_passthrough() {
        let grid = TickGrid::new(30).unwrap();
        let mut ticks = open_range(&grid, "08:00", "12:00");
        let before = ticks.clone();
        apply_shifts(&mut ticks, &[], Weekday::Mon, false, &grid);
        assert_eq!(ticks, before);
    }

    #[test]
    fn weekday_without_shift_closes_when_establishment_has_shifts() {
        let grid = TickGrid::new(30).unwrap();
        let monday_only = [shift("Morning", &[1], "09:00", "10:00")];

        let mut tuesday = open_range(&grid, "08:00", "12:00");
        assert_eq!(open_indices(&tuesday).len(), 8);
        apply_shifts(&mut tuesday, &monday_only, Weekday::Tue, true, &grid);
        assert!(open_indices(&tuesday).is_empty());

        let mut monday = open_range(&grid, "08:00", "12:00");
        apply_shifts(&mut monday, &monday_only, Weekday::Mon, true, &grid);
        assert_eq!(open_indices(&monday), vec![18, 19]);
    }

    #[test]
    fn ticks_outside_every_shift_are_cleared() {
        let grid = TickGrid::new(30).unwrap();
        let mut ticks = open_range(&grid, "08:00", "12:00");
        let shifts = vec![
            shift("Morning", &[1], "09:00", "10:00"),
            shift("Late morning", &[1], "11:00", "13:00"),
        ];
        apply_shifts(&mut ticks, &shifts, Weekday::Mon, true, &grid);
        // 09:00, 09:30, 11:00, 11:30
        assert_eq!(open_indices(&ticks), vec![18, 19, 22, 23]);
    }

    #[test]
    fn inactive_shift_on_the_weekday_does_not_open_it() {
        let grid = TickGrid::new(30).unwrap();
        let mut ticks = open_range(&grid, "08:00", "12:00");
        let mut morning = shift("Morning", &[1], "09:00", "10:00");
        morning.status = RecordStatus::Inactive;
        let evening = shift("Evening", &[1], "11:00", "12:00");
        apply_shifts(&mut ticks, &[morning, evening], Weekday::Mon, true, &grid);
        assert_eq!(open_indices(&ticks), vec![22, 23]);
    }
}
