//! Availability resolution: given an establishment, an optional professional,
//! a service and a date, find the start times at which the service can be
//! booked over the coming days.
//!
//! The pipeline per day is working windows → shifts → conflicts → runs. All
//! reads happen up front; the per-day computation is pure.

pub mod conflicts;
pub mod horizon;
pub mod runs;
pub mod shifts;
pub mod tick;
pub mod timezone;
pub mod windows;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc, Weekday};

use crate::booking::model::{
    Appointment, Establishment, EstablishmentId, Professional, ProfessionalId, Service, ServiceId,
    Shift, WorkingWindow,
};
use crate::config::AgendaConfig;
use crate::error::AgendaError;
use horizon::{DayPlanner, HorizonScanner, ScanLimits};
use tick::TickGrid;
use timezone::TimezoneAdapter;

pub use horizon::{AvailabilityOutcome, DayAvailability};

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Read-only collaborator supplying the data the engine works on.
#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    async fn establishment(&self, id: &EstablishmentId) -> Result<Establishment, AgendaError>;

    async fn service(&self, id: &ServiceId) -> Result<Service, AgendaError>;

    async fn professional(&self, id: &ProfessionalId) -> Result<Professional, AgendaError>;

    /// Active windows of the establishment open on `weekday`, both general and
    /// professional-scoped.
    async fn active_working_windows(
        &self,
        establishment: &EstablishmentId,
        weekday: Weekday,
    ) -> Result<Vec<WorkingWindow>, AgendaError>;

    async fn active_shifts(
        &self,
        establishment: &EstablishmentId,
        weekday: Weekday,
    ) -> Result<Vec<Shift>, AgendaError>;

    /// Active appointments whose closed span `[start, end]` touches the storage
    /// interval `[from, to)`.
    async fn active_appointments(
        &self,
        establishment: &EstablishmentId,
        professional: Option<&ProfessionalId>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AgendaError>;
}

/// Immutable data read once per request and shared by every day of a scan.
#[derive(Debug, Default)]
pub struct Snapshot {
    windows: [Vec<WorkingWindow>; 7],
    shifts: [Vec<Shift>; 7],
    has_shifts: bool,
    /// Keyed by every local date an appointment's closed span touches.
    appointments: BTreeMap<NaiveDate, Vec<Appointment>>,
}

impl Snapshot {
    /// Bucket windows and shifts by the weekdays they cover, and appointments
    /// by the local dates they touch.
    pub fn new(
        windows: Vec<WorkingWindow>,
        shifts: Vec<Shift>,
        appointments: Vec<Appointment>,
        tz: &TimezoneAdapter,
    ) -> Self {
        let mut snapshot = Self {
            has_shifts: shifts.iter().any(|s| s.is_active()),
            ..Self::default()
        };
        for (i, weekday) in WEEKDAYS.iter().enumerate() {
            snapshot.windows[i] = windows
                .iter()
                .filter(|w| w.weekdays.contains(*weekday))
                .cloned()
                .collect();
            snapshot.shifts[i] = shifts
                .iter()
                .filter(|s| s.weekdays.contains(*weekday))
                .cloned()
                .collect();
        }
        for appointment in appointments {
            let last = tz.to_local(appointment.end()).date();
            let mut day = tz.to_local(appointment.start).date();
            while day <= last {
                snapshot
                    .appointments
                    .entry(day)
                    .or_default()
                    .push(appointment.clone());
                match day.succ_opt() {
                    Some(next) => day = next,
                    None => break,
                }
            }
        }
        snapshot
    }

    pub fn windows_on(&self, weekday: Weekday) -> &[WorkingWindow] {
        &self.windows[weekday.num_days_from_sunday() as usize]
    }

    pub fn shifts_on(&self, weekday: Weekday) -> &[Shift] {
        &self.shifts[weekday.num_days_from_sunday() as usize]
    }

    /// At least one active shift exists on some weekday.
    pub fn has_shifts(&self) -> bool {
        self.has_shifts
    }

    /// Appointments touching local `date`.
    pub fn appointments_on(&self, date: NaiveDate) -> &[Appointment] {
        self.appointments
            .get(&date)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct AvailabilityRequest {
    pub establishment_id: EstablishmentId,
    pub professional_id: Option<ProfessionalId>,
    pub service_id: ServiceId,
    pub from_date: NaiveDate,
    /// Falls back to the configured tick size.
    pub tick_minutes: Option<u32>,
    /// Falls back to the configured scan deadline.
    pub deadline: Option<Duration>,
}

/// Check that the service and professional may be used together in the
/// establishment. Returns the service duration in minutes.
pub fn validate_booking_pair(
    establishment: &Establishment,
    service: &Service,
    professional: Option<&Professional>,
) -> Result<u32, AgendaError> {
    if service.establishment_id != establishment.id || !service.is_active() {
        return Err(AgendaError::NotFound(format!(
            "Service {} in establishment {}",
            service.id, establishment.id
        )));
    }
    let duration = service.duration_minutes();
    if duration == 0 {
        return Err(AgendaError::InvalidRange(format!(
            "Service {} has no duration",
            service.id
        )));
    }
    if let Some(professional) = professional {
        if professional.establishment_id != establishment.id || !professional.is_active() {
            return Err(AgendaError::NotFound(format!(
                "Professional {} in establishment {}",
                professional.id, establishment.id
            )));
        }
        if !professional.offers(&service.id) {
            return Err(AgendaError::NotOffered(format!(
                "Professional {} does not offer service {}",
                professional.id, service.id
            )));
        }
    }
    Ok(duration)
}

pub struct AvailabilityService<S: AvailabilitySource> {
    source: Arc<S>,
    tick_minutes: u32,
    tz: TimezoneAdapter,
    limits: ScanLimits,
    scan_deadline: Option<Duration>,
    clock: fn() -> DateTime<Utc>,
}

impl<S: AvailabilitySource> AvailabilityService<S> {
    pub fn new(source: Arc<S>, config: &AgendaConfig) -> Self {
        Self {
            source,
            tick_minutes: config.tick_minutes,
            tz: config.timezone,
            limits: config.limits,
            scan_deadline: config.scan_deadline,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn timezone(&self) -> &TimezoneAdapter {
        &self.tz
    }

    pub fn default_tick_minutes(&self) -> u32 {
        self.tick_minutes
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub async fn resolve_availability(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<AvailabilityOutcome, AgendaError> {
        let grid = TickGrid::new(request.tick_minutes.unwrap_or(self.tick_minutes))?;
        let today = self.tz.local_today(self.now());
        if request.from_date < today {
            return Err(AgendaError::InvalidRange(format!(
                "Start date {} is before today ({today})",
                request.from_date
            )));
        }

        let (duration, snapshot) = self.read_snapshot(request).await?;
        let planner = DayPlanner::new(
            Arc::new(snapshot),
            request.professional_id,
            request.service_id,
            duration,
            grid,
            self.tz,
        );
        let deadline = request
            .deadline
            .or(self.scan_deadline)
            .map(|d| tokio::time::Instant::now() + d);

        let outcome = HorizonScanner::new(planner, self.limits)
            .scan(request.from_date, deadline)
            .await?;

        tracing::info!(
            establishment = %request.establishment_id,
            professional = ?request.professional_id.map(|p| p.to_string()),
            service = %request.service_id,
            from = %request.from_date,
            days = outcome.days().len(),
            partial = outcome.is_partial(),
            "resolved availability"
        );
        Ok(outcome)
    }

    /// Issue the independent reads jointly, then validate before any scanning.
    async fn read_snapshot(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<(u32, Snapshot), AgendaError> {
        let source = self.source.as_ref();
        let establishment_id = &request.establishment_id;
        let professional_id = request.professional_id.as_ref();

        let (from, _) = self.tz.storage_bounds(request.from_date);
        let last_day = request
            .from_date
            .checked_add_days(Days::new(self.limits.horizon_days as u64 + 1))
            .ok_or_else(|| {
                AgendaError::InvalidRange(format!("Start date {} is too far ahead", request.from_date))
            })?;
        let (to, _) = self.tz.storage_bounds(last_day);

        let (establishment, service, professional, windows, shifts, appointments) = tokio::try_join!(
            source.establishment(establishment_id),
            source.service(&request.service_id),
            async {
                match professional_id {
                    Some(id) => source.professional(id).await.map(Some),
                    None => Ok(None),
                }
            },
            async {
                let mut all = Vec::new();
                for weekday in WEEKDAYS {
                    for window in source.active_working_windows(establishment_id, weekday).await? {
                        if !all.iter().any(|w: &WorkingWindow| w.id == window.id) {
                            all.push(window);
                        }
                    }
                }
                Ok::<_, AgendaError>(all)
            },
            async {
                let mut all = Vec::new();
                for weekday in WEEKDAYS {
                    for shift in source.active_shifts(establishment_id, weekday).await? {
                        if !all.iter().any(|s: &Shift| s.id == shift.id) {
                            all.push(shift);
                        }
                    }
                }
                Ok::<_, AgendaError>(all)
            },
            source.active_appointments(establishment_id, professional_id, from, to),
        )?;

        let duration = validate_booking_pair(&establishment, &service, professional.as_ref())?;
        Ok((duration, Snapshot::new(windows, shifts, appointments, &self.tz)))
    }
}
