//! Effective open intervals for one weekday, merging establishment-wide and
//! professional-specific working windows.

use chrono::{NaiveTime, Weekday};

use super::tick::{minute_of_day, TickGrid, MINUTES_PER_DAY};
use crate::booking::model::{ProfessionalId, ServiceId, WorkingWindow};

/// Half-open `[start, end)` interval within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenInterval {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl OpenInterval {
    pub fn start_minute(&self) -> u32 {
        minute_of_day(self.start)
    }

    /// `23:59` is treated as the end of the day.
    pub fn end_minute(&self) -> u32 {
        match minute_of_day(self.end) {
            1439 => MINUTES_PER_DAY,
            m => m,
        }
    }

    pub fn overlaps(&self, other: &OpenInterval) -> bool {
        self.start_minute() < other.end_minute() && other.start_minute() < self.end_minute()
    }
}

impl From<&WorkingWindow> for OpenInterval {
    fn from(window: &WorkingWindow) -> Self {
        Self {
            start: window.start,
            end: window.end,
        }
    }
}

/// Resolve the open intervals for `weekday` from the establishment's windows.
///
/// Windows belonging to other professionals are ignored when a professional is
/// given. The service restriction falls back to every in-scope window when no
/// window admits the service. When the professional has windows of their own,
/// a general window survives only if it overlaps one of them; otherwise the
/// professional inherits every general window. Output order is unspecified.
pub fn resolve_windows(
    windows: &[WorkingWindow],
    weekday: Weekday,
    professional: Option<&ProfessionalId>,
    service: Option<&ServiceId>,
) -> Vec<OpenInterval> {
    let in_scope: Vec<&WorkingWindow> = windows
        .iter()
        .filter(|w| w.is_active() && w.weekdays.contains(weekday))
        .filter(|w| match (professional, &w.professional_id) {
            (Some(p), Some(owner)) => p == owner,
            _ => true,
        })
        .collect();

    let candidates: Vec<&WorkingWindow> = match service {
        Some(service_id) => {
            let matching: Vec<&WorkingWindow> = in_scope
                .iter()
                .copied()
                .filter(|w| w.allows_service(service_id))
                .collect();
            if matching.is_empty() {
                in_scope
            } else {
                matching
            }
        }
        None => in_scope,
    };

    let Some(professional_id) = professional else {
        return candidates.into_iter().map(OpenInterval::from).collect();
    };

    let own: Vec<OpenInterval> = candidates
        .iter()
        .filter(|w| w.professional_id.as_ref() == Some(professional_id))
        .map(|w| OpenInterval::from(*w))
        .collect();

    if own.is_empty() {
        return candidates.into_iter().map(OpenInterval::from).collect();
    }

    candidates
        .into_iter()
        .filter(|w| {
            w.professional_id.is_some() || {
                let interval = OpenInterval::from(*w);
                own.iter().any(|o| o.overlaps(&interval))
            }
        })
        .map(OpenInterval::from)
        .collect()
}

/// Mark every tick whose span lies inside at least one interval.
pub fn open_ticks(intervals: &[OpenInterval], grid: &TickGrid) -> Vec<bool> {
    (0..grid.ticks_per_day())
        .map(|i| {
            intervals
                .iter()
                .any(|iv| grid.tick_within(i, iv.start_minute(), iv.end_minute()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::model::{EstablishmentId, RecordStatus, WeekdaySet, WindowId};
    use std::collections::BTreeSet;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn window(
        professional: Option<ProfessionalId>,
        days: &[u8],
        start: &str,
        end: &str,
        services: &[ServiceId],
    ) -> WorkingWindow {
        WorkingWindow {
            id: WindowId::new(),
            establishment_id: EstablishmentId::new(),
            professional_id: professional,
            weekdays: WeekdaySet::from_numbers(days).unwrap(),
            start: t(start),
            end: t(end),
            service_ids: services.iter().copied().collect::<BTreeSet<_>>(),
            status: RecordStatus::Active,
        }
    }

    fn sorted(mut intervals: Vec<OpenInterval>) -> Vec<(NaiveTime, NaiveTime)> {
        intervals.sort_by_key(|iv| (iv.start, iv.end));
        intervals.into_iter().map(|iv| (iv.start, iv.end)).collect()
    }

    #[test]
    fn filters_by_weekday_and_status() {
        let mut closed = window(None, &[1], "13:00", "17:00", &[]);
        closed.status = RecordStatus::Inactive;
        let windows = vec![
            window(None, &[1, 2], "08:00", "12:00", &[]),
            window(None, &[3], "08:00", "18:00", &[]),
            closed,
        ];
        let got = sorted(resolve_windows(&windows, Weekday::Mon, None, None));
        assert_eq!(got, vec![(t("08:00"), t("12:00"))]);
    }

    #[test]
    fn service_restriction_keeps_unrestricted_and_matching() {
        let nails = ServiceId::new();
        let hair = ServiceId::new();
        let windows = vec![
            window(None, &[1], "08:00", "10:00", &[]),
            window(None, &[1], "10:00", "12:00", &[nails]),
            window(None, &[1], "14:00", "16:00", &[hair]),
        ];
        let got = sorted(resolve_windows(&windows, Weekday::Mon, None, Some(&nails)));
        assert_eq!(
            got,
            vec![(t("08:00"), t("10:00")), (t("10:00"), t("12:00"))]
        );
    }

    #[test]
    fn service_restriction_falls_back_to_all_windows() {
        let nails = ServiceId::new();
        let hair = ServiceId::new();
        let windows = vec![window(None, &[1], "14:00", "16:00", &[hair])];
        let got = sorted(resolve_windows(&windows, Weekday::Mon, None, Some(&nails)));
        assert_eq!(got, vec![(t("14:00"), t("16:00"))]);
    }

    #[test]
    fn professional_without_own_windows_inherits_all_general() {
        let ana = ProfessionalId::new();
        let windows = vec![
            window(None, &[1], "08:00", "12:00", &[]),
            window(None, &[1], "14:00", "18:00", &[]),
        ];
        let got = resolve_windows(&windows, Weekday::Mon, Some(&ana), None);
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn professional_keeps_only_overlapping_general_windows() {
        let ana = ProfessionalId::new();
        let windows = vec![
            window(None, &[1], "08:00", "12:00", &[]),
            window(None, &[1], "14:00", "18:00", &[]),
            window(Some(ana), &[1], "11:00", "13:00", &[]),
        ];
        let got = sorted(resolve_windows(&windows, Weekday::Mon, Some(&ana), None));
        assert_eq!(
            got,
            vec![(t("08:00"), t("12:00")), (t("11:00"), t("13:00"))]
        );
    }

    #[test]
    fn other_professionals_windows_are_ignored() {
        let ana = ProfessionalId::new();
        let bia = ProfessionalId::new();
        let windows = vec![
            window(None, &[1], "08:00", "12:00", &[]),
            window(Some(bia), &[1], "18:00", "20:00", &[]),
        ];
        let got = sorted(resolve_windows(&windows, Weekday::Mon, Some(&ana), None));
        assert_eq!(got, vec![(t("08:00"), t("12:00"))]);

        // Establishment-level queries see everyone's hours.
        let all = resolve_windows(&windows, Weekday::Mon, None, None);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn adjacent_windows_do_not_overlap() {
        let a = OpenInterval { start: t("08:00"), end: t("12:00") };
        let b = OpenInterval { start: t("12:00"), end: t("14:00") };
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn open_ticks_marks_contained_ticks() {
        let grid = TickGrid::new(30).unwrap();
        let ticks = open_ticks(
            &[OpenInterval { start: t("08:00"), end: t("12:00") }],
            &grid,
        );
        let open: Vec<usize> = ticks
            .iter()
            .enumerate()
            .filter(|(_, open)| **open)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(open, (16..24).collect::<Vec<_>>());
    }

    #[test]
    fn window_ending_at_2359_reaches_midnight() {
        let grid = TickGrid::new(30).unwrap();
        let ticks = open_ticks(
            &[OpenInterval { start: t("22:00"), end: t("23:59") }],
            &grid,
        );
        assert!(ticks[47]);
    }
}
