//! Day-by-day forward scan accumulating per-day start times.

use std::sync::Arc;

use chrono::{Datelike, Days, NaiveDate, NaiveTime};
use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};

use super::conflicts::ConflictSet;
use super::runs::{extract_starts, DayTicks};
use super::shifts::apply_shifts;
use super::tick::TickGrid;
use super::timezone::TimezoneAdapter;
use super::windows::{open_ticks, resolve_windows};
use super::Snapshot;
use crate::booking::model::{ProfessionalId, ServiceId};
use crate::error::AgendaError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_slots")]
    pub slots: Vec<NaiveTime>,
}

fn serialize_slots<S: serde::Serializer>(slots: &[NaiveTime], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(slots.iter().map(|t| t.format("%H:%M").to_string()))
}

/// Result of a scan. A deadline hit is not an error: the days folded before
/// it are returned as a partial result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityOutcome {
    Complete(Vec<DayAvailability>),
    PartialResult(Vec<DayAvailability>),
}

impl AvailabilityOutcome {
    pub fn days(&self) -> &[DayAvailability] {
        match self {
            Self::Complete(days) | Self::PartialResult(days) => days,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Self::PartialResult(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayPlan {
    pub date: NaiveDate,
    /// At least one working window applies to the weekday.
    pub open: bool,
    pub slots: Vec<NaiveTime>,
}

/// Evaluates single days against an immutable snapshot.
#[derive(Debug)]
pub struct DayPlanner {
    snapshot: Arc<Snapshot>,
    professional: Option<ProfessionalId>,
    service: ServiceId,
    required_ticks: usize,
    grid: TickGrid,
    tz: TimezoneAdapter,
}

impl DayPlanner {
    pub fn new(
        snapshot: Arc<Snapshot>,
        professional: Option<ProfessionalId>,
        service: ServiceId,
        duration_minutes: u32,
        grid: TickGrid,
        tz: TimezoneAdapter,
    ) -> Self {
        Self {
            snapshot,
            professional,
            service,
            required_ticks: grid.required_ticks(duration_minutes),
            grid,
            tz,
        }
    }

    pub fn plan_day(&self, date: NaiveDate) -> DayPlan {
        let weekday = date.weekday();
        let intervals = resolve_windows(
            self.snapshot.windows_on(weekday),
            weekday,
            self.professional.as_ref(),
            Some(&self.service),
        );
        if intervals.is_empty() {
            return DayPlan {
                date,
                open: false,
                slots: Vec::new(),
            };
        }

        let mut open = open_ticks(&intervals, &self.grid);
        apply_shifts(
            &mut open,
            self.snapshot.shifts_on(weekday),
            weekday,
            self.snapshot.has_shifts(),
            &self.grid,
        );
        let conflicts = ConflictSet::build(
            self.snapshot.appointments_on(date),
            date,
            self.professional.as_ref(),
            &self.tz,
            &self.grid,
        );
        tracing::trace!(%date, conflicted = conflicts.count(), "built conflict set");
        let day = DayTicks::new(&open, &conflicts);

        DayPlan {
            date,
            open: true,
            slots: extract_starts(&day, self.required_ticks, &self.grid),
        }
    }
}

/// Evaluation of a single day, run on the blocking pool by the scanner.
pub trait PlanDay: Send + Sync + 'static {
    fn plan_day(&self, date: NaiveDate) -> DayPlan;
}

impl PlanDay for DayPlanner {
    fn plan_day(&self, date: NaiveDate) -> DayPlan {
        Self::plan_day(self, date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    /// Safety ceiling on scanned days.
    pub horizon_days: u32,
    /// Days with at least one slot collected before stopping.
    pub target_days: usize,
    /// Days computed in parallel per batch.
    pub workers: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            horizon_days: 365,
            target_days: 7,
            workers: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Scanning,
    Collecting,
    Done,
}

/// Folds day plans in date order.
#[derive(Debug)]
struct Accumulator {
    limits: ScanLimits,
    state: ScanState,
    scanned: u32,
    non_empty: usize,
    days: Vec<DayAvailability>,
}

impl Accumulator {
    fn new(limits: ScanLimits) -> Self {
        Self {
            limits,
            state: ScanState::Scanning,
            scanned: 0,
            non_empty: 0,
            days: Vec::new(),
        }
    }

    fn push(&mut self, plan: DayPlan) {
        if self.state == ScanState::Done {
            return;
        }
        self.scanned += 1;
        tracing::debug!(date = %plan.date, open = plan.open, slots = plan.slots.len(), "scanned day");

        if plan.open {
            if !plan.slots.is_empty() {
                self.non_empty += 1;
            }
            self.days.push(DayAvailability {
                date: plan.date,
                slots: plan.slots,
            });
            self.state = ScanState::Collecting;
        }

        if self.non_empty >= self.limits.target_days || self.scanned >= self.limits.horizon_days {
            self.state = ScanState::Done;
        }
    }
}

pub struct HorizonScanner<P: PlanDay = DayPlanner> {
    planner: Arc<P>,
    limits: ScanLimits,
}

impl<P: PlanDay> HorizonScanner<P> {
    pub fn new(planner: P, limits: ScanLimits) -> Self {
        Self {
            planner: Arc::new(planner),
            limits,
        }
    }

    /// Walk forward from `from` in batches of parallel day computations.
    ///
    /// Results are folded strictly in date order. When `deadline` passes, the
    /// completed prefix of days is returned as a partial result.
    pub async fn scan(
        &self,
        from: NaiveDate,
        deadline: Option<Instant>,
    ) -> Result<AvailabilityOutcome, AgendaError> {
        let mut acc = Accumulator::new(self.limits);
        let workers = self.limits.workers.max(1) as u32;
        let mut offset = 0u32;

        while acc.state != ScanState::Done && offset < self.limits.horizon_days {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::warn!(scanned = acc.scanned, "availability scan hit its deadline");
                return Ok(AvailabilityOutcome::PartialResult(acc.days));
            }

            let batch_len = workers.min(self.limits.horizon_days - offset) as usize;
            let mut set = JoinSet::new();
            for k in 0..batch_len {
                let Some(date) = from.checked_add_days(Days::new((offset as usize + k) as u64))
                else {
                    break;
                };
                let planner = Arc::clone(&self.planner);
                set.spawn_blocking(move || (k, planner.plan_day(date)));
            }

            let mut plans: Vec<Option<DayPlan>> = (0..batch_len).map(|_| None).collect();
            let mut timed_out = false;
            loop {
                let next = match deadline {
                    Some(d) => match timeout_at(d, set.join_next()).await {
                        Ok(next) => next,
                        Err(_) => {
                            timed_out = true;
                            break;
                        }
                    },
                    None => set.join_next().await,
                };
                let Some(joined) = next else { break };
                let (k, plan) = joined
                    .map_err(|e| AgendaError::Internal(format!("Day worker failed: {e}")))?;
                plans[k] = Some(plan);
            }

            let mut folded = 0usize;
            for plan in plans.into_iter().map_while(|p| p) {
                acc.push(plan);
                folded += 1;
            }

            if timed_out && acc.state != ScanState::Done {
                tracing::warn!(scanned = acc.scanned, "availability scan hit its deadline");
                return Ok(AvailabilityOutcome::PartialResult(acc.days));
            }
            if folded < batch_len {
                // Calendar overflow: no later dates exist.
                break;
            }
            offset += batch_len as u32;
        }

        Ok(AvailabilityOutcome::Complete(acc.days))
    }
}
