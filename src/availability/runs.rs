//! Contiguous free runs of a day and the service starts they admit.

use std::ops::Range;

use chrono::NaiveTime;

use super::conflicts::ConflictSet;
use super::tick::TickGrid;

/// Free/busy mask of one day's ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayTicks {
    free: Vec<bool>,
}

impl DayTicks {
    /// A tick is free when it is open and not conflicted.
    pub fn new(open: &[bool], conflicts: &ConflictSet) -> Self {
        Self::from_mask(
            open.iter()
                .enumerate()
                .map(|(i, open)| *open && !conflicts.contains(i))
                .collect(),
        )
    }

    pub fn from_mask(free: Vec<bool>) -> Self {
        Self { free }
    }

    /// Maximal runs of consecutive free ticks, in order.
    pub fn free_runs(&self) -> Vec<Range<usize>> {
        let mut runs = Vec::new();
        let mut run_start: Option<usize> = None;

        for (i, free) in self.free.iter().enumerate() {
            match (run_start, *free) {
                (None, true) => run_start = Some(i),
                (Some(start), false) => {
                    runs.push(start..i);
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            runs.push(start..self.free.len());
        }

        runs
    }

    /// Every tick index from which `required` consecutive free ticks remain
    /// inside the same run, ascending.
    pub fn start_ticks(&self, required: usize) -> Vec<usize> {
        let required = required.max(1);
        self.free_runs()
            .into_iter()
            .filter(|run| run.len() >= required)
            .flat_map(|run| run.start..=run.end - required)
            .collect()
    }
}

/// Start times on `grid` for a service needing `required` ticks.
pub fn extract_starts(day: &DayTicks, required: usize, grid: &TickGrid) -> Vec<NaiveTime> {
    let mut starts: Vec<NaiveTime> = day
        .start_ticks(required)
        .into_iter()
        .map(|i| grid.time_of(i))
        .collect();
    starts.sort();
    starts
}
